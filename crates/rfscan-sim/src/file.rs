//! Recorded Capture Files
//!
//! Captures are stored as interleaved little-endian `f32` I/Q pairs
//! (`cf32_le`), the layout used by `.iq` dumps and SigMF `.sigmf-data`
//! files. The format carries no metadata, so sample rate and center
//! frequency are supplied by the caller.

use crate::device::{SampleSource, SourceError, SourceResult};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use rfscan_core::types::IQSample;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

/// Bytes per stored sample (I and Q as f32)
pub const BYTES_PER_SAMPLE: u64 = 8;

/// Write samples as interleaved f32 I/Q
pub fn write_iq_f32<W: Write>(writer: &mut W, samples: &[IQSample]) -> SourceResult<()> {
    for sample in samples {
        writer.write_f32::<LittleEndian>(sample.re as f32)?;
        writer.write_f32::<LittleEndian>(sample.im as f32)?;
    }
    Ok(())
}

/// Read exactly `num_samples` interleaved f32 I/Q pairs
pub fn read_iq_f32<R: Read>(reader: &mut R, num_samples: usize) -> SourceResult<Vec<IQSample>> {
    let mut samples = Vec::with_capacity(num_samples);
    for _ in 0..num_samples {
        let re = reader.read_f32::<LittleEndian>()? as f64;
        let im = reader.read_f32::<LittleEndian>()? as f64;
        samples.push(IQSample::new(re, im));
    }
    Ok(samples)
}

/// Write a whole capture file
pub fn write_samples_f32(path: impl AsRef<Path>, samples: &[IQSample]) -> SourceResult<()> {
    let file = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);
    write_iq_f32(&mut writer, samples)?;
    writer.flush()?;
    tracing::debug!(path = %path.as_ref().display(), samples = samples.len(), "Wrote capture");
    Ok(())
}

/// Read a whole capture file
pub fn read_samples_f32(path: impl AsRef<Path>) -> SourceResult<Vec<IQSample>> {
    let mut source = FileSource::open(path, 1.0, 0.0)?;
    let remaining = source.remaining() as usize;
    if remaining == 0 {
        return Ok(Vec::new());
    }
    source.read_buffer(remaining)
}

/// Sequential reader over a capture file
#[derive(Debug)]
pub struct FileSource {
    name: String,
    path: PathBuf,
    reader: BufReader<File>,
    sample_rate: f64,
    center_frequency: f64,
    /// Whole samples not yet read
    remaining: u64,
}

impl FileSource {
    /// Open a capture recorded at `sample_rate`, tuned to `center_frequency`
    pub fn open(
        path: impl AsRef<Path>,
        sample_rate: f64,
        center_frequency: f64,
    ) -> SourceResult<Self> {
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(SourceError::InvalidConfig(format!(
                "sample rate must be positive, got {}",
                sample_rate
            )));
        }

        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        let len = file.metadata()?.len();
        if len % BYTES_PER_SAMPLE != 0 {
            tracing::warn!(
                path = %path.display(),
                trailing_bytes = len % BYTES_PER_SAMPLE,
                "Capture length is not a whole number of samples, ignoring trailing bytes"
            );
        }

        Ok(Self {
            name: format!("File {}", path.display()),
            path,
            reader: BufReader::new(file),
            sample_rate,
            center_frequency,
            remaining: len / BYTES_PER_SAMPLE,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Samples left before end of stream
    pub fn remaining(&self) -> u64 {
        self.remaining
    }
}

impl SampleSource for FileSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    fn center_frequency(&self) -> f64 {
        self.center_frequency
    }

    fn read_buffer(&mut self, num_samples: usize) -> SourceResult<Vec<IQSample>> {
        if self.remaining == 0 {
            return Err(SourceError::EndOfStream);
        }
        let count = (num_samples as u64).min(self.remaining) as usize;
        match read_iq_f32(&mut self.reader, count) {
            Ok(samples) => {
                self.remaining -= count as u64;
                Ok(samples)
            }
            Err(err) => {
                // Stream position is unknown after a partial read
                self.remaining = 0;
                tracing::warn!(path = %self.path.display(), error = %err, "Capture read failed");
                Err(err)
            }
        }
    }
}
