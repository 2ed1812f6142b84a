//! Spectrum Analysis
//!
//! FFT-based power spectrum of an I/Q buffer, plus a Welch averaged
//! periodogram for lower-variance PSD estimates.

use crate::fft_utils::FftProcessor;
use crate::types::{DspError, DspResult, IQSample};
use rustfft::num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::str::FromStr;

/// Window functions for spectral analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WindowFunction {
    /// No windowing (rectangular)
    #[default]
    None,
    /// Hann window - good general purpose
    Hann,
    /// Hamming window - slightly less sidelobe suppression than Hann
    Hamming,
    /// Blackman window - excellent sidelobe suppression
    Blackman,
    /// Blackman-Harris window - very low sidelobes
    BlackmanHarris,
    /// Flat-top window - accurate amplitude measurement
    FlatTop,
}

impl WindowFunction {
    /// Generate (periodic) window coefficients for the given size
    pub fn generate(&self, size: usize) -> Vec<f64> {
        let cosine_sum = |coeffs: &[f64]| -> Vec<f64> {
            (0..size)
                .map(|i| {
                    let n = i as f64 / size as f64;
                    coeffs
                        .iter()
                        .enumerate()
                        .map(|(k, &a)| {
                            let sign = if k % 2 == 0 { 1.0 } else { -1.0 };
                            sign * a * (2.0 * PI * k as f64 * n).cos()
                        })
                        .sum()
                })
                .collect()
        };

        match self {
            WindowFunction::None => vec![1.0; size],
            WindowFunction::Hann => cosine_sum(&[0.5, 0.5]),
            WindowFunction::Hamming => cosine_sum(&[0.54, 0.46]),
            WindowFunction::Blackman => cosine_sum(&[0.42, 0.5, 0.08]),
            WindowFunction::BlackmanHarris => cosine_sum(&[0.35875, 0.48829, 0.14128, 0.01168]),
            WindowFunction::FlatTop => cosine_sum(&[
                0.21557895,
                0.41663158,
                0.277263158,
                0.083578947,
                0.006947368,
            ]),
        }
    }

    /// Canonical lowercase name
    pub fn name(&self) -> &'static str {
        match self {
            WindowFunction::None => "none",
            WindowFunction::Hann => "hann",
            WindowFunction::Hamming => "hamming",
            WindowFunction::Blackman => "blackman",
            WindowFunction::BlackmanHarris => "blackman-harris",
            WindowFunction::FlatTop => "flat-top",
        }
    }
}

impl FromStr for WindowFunction {
    type Err = DspError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" | "rectangular" | "rect" => Ok(WindowFunction::None),
            "hann" | "hanning" => Ok(WindowFunction::Hann),
            "hamming" => Ok(WindowFunction::Hamming),
            "blackman" => Ok(WindowFunction::Blackman),
            "blackman-harris" | "blackmanharris" => Ok(WindowFunction::BlackmanHarris),
            "flat-top" | "flattop" => Ok(WindowFunction::FlatTop),
            other => Err(DspError::InvalidParameter(format!(
                "unknown window function '{}'",
                other
            ))),
        }
    }
}

/// One (frequency, power) bin of a spectrum
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpectrumPoint {
    /// Frequency in Hz
    pub frequency: f64,
    /// Power in dB
    pub power: f64,
}

/// A power spectrum, frequency-ascending (DC at center)
///
/// Deserialized spectra pass the same checks as [`Spectrum::from_parts`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SpectrumRecord")]
pub struct Spectrum {
    /// Frequency bins in Hz, strictly ascending
    pub frequencies: Vec<f64>,
    /// Power per bin in dB
    pub power_db: Vec<f64>,
    /// FFT size used
    pub fft_size: usize,
    /// Sample rate in Hz
    pub sample_rate: f64,
    /// Frequency resolution in Hz
    pub freq_resolution: f64,
    /// Number of frames averaged (1 for a single FFT)
    pub num_averages: usize,
}

/// Wire form of [`Spectrum`], validated on conversion
#[derive(Deserialize)]
struct SpectrumRecord {
    frequencies: Vec<f64>,
    power_db: Vec<f64>,
    fft_size: usize,
    sample_rate: f64,
    #[serde(default)]
    num_averages: Option<usize>,
}

impl TryFrom<SpectrumRecord> for Spectrum {
    type Error = DspError;

    fn try_from(record: SpectrumRecord) -> DspResult<Self> {
        let mut spectrum =
            Spectrum::from_parts(record.frequencies, record.power_db, record.sample_rate)?;
        if record.fft_size != spectrum.len() {
            return Err(DspError::InvalidSpectrum(format!(
                "fft_size {} does not match {} bins",
                record.fft_size,
                spectrum.len()
            )));
        }
        spectrum.num_averages = record.num_averages.unwrap_or(1).max(1);
        Ok(spectrum)
    }
}

impl Spectrum {
    /// Build a spectrum from externally computed bins.
    ///
    /// The bin width is taken as `sample_rate / len`.
    pub fn from_parts(
        frequencies: Vec<f64>,
        power_db: Vec<f64>,
        sample_rate: f64,
    ) -> DspResult<Self> {
        DspError::require_sample_rate(sample_rate)?;
        DspError::require_len(power_db.len(), 1)?;

        if frequencies.len() != power_db.len() {
            return Err(DspError::InvalidSpectrum(format!(
                "{} frequencies but {} power values",
                frequencies.len(),
                power_db.len()
            )));
        }
        if frequencies.iter().chain(power_db.iter()).any(|v| !v.is_finite()) {
            return Err(DspError::InvalidSpectrum(
                "frequencies and powers must be finite".to_string(),
            ));
        }
        if frequencies.windows(2).any(|w| w[1] <= w[0]) {
            return Err(DspError::InvalidSpectrum(
                "frequencies must be strictly ascending".to_string(),
            ));
        }

        let fft_size = power_db.len();
        Ok(Self {
            frequencies,
            power_db,
            fft_size,
            sample_rate,
            freq_resolution: sample_rate / fft_size as f64,
            num_averages: 1,
        })
    }

    /// Number of bins
    pub fn len(&self) -> usize {
        self.power_db.len()
    }

    /// True if the spectrum has no bins
    pub fn is_empty(&self) -> bool {
        self.power_db.is_empty()
    }

    /// Width of one bin in Hz (`sample_rate / N`)
    pub fn bin_width(&self) -> f64 {
        self.freq_resolution
    }

    /// Full spectrum span in Hz
    pub fn span(&self) -> f64 {
        self.bin_width() * self.len() as f64
    }

    /// Iterate (frequency, power) pairs in ascending frequency
    pub fn points(&self) -> impl Iterator<Item = SpectrumPoint> + '_ {
        self.frequencies
            .iter()
            .zip(self.power_db.iter())
            .map(|(&frequency, &power)| SpectrumPoint { frequency, power })
    }

    /// Get the strongest bin as (frequency, power).
    ///
    /// Ties resolve to the lowest frequency.
    pub fn find_peak(&self) -> Option<(f64, f64)> {
        let mut best: Option<usize> = None;
        for (i, &power) in self.power_db.iter().enumerate() {
            match best {
                Some(b) if self.power_db[b] >= power => {}
                _ => best = Some(i),
            }
        }
        best.map(|i| (self.frequencies[i], self.power_db[i]))
    }

    /// Mean power in dB across all bins
    pub fn mean_power_db(&self) -> f64 {
        if self.is_empty() {
            return f64::NAN;
        }
        self.power_db.iter().sum::<f64>() / self.len() as f64
    }

    /// Format spectrum as text table (strongest 20 bins)
    pub fn to_text(&self) -> String {
        let mut output = String::new();
        output.push_str(&format!(
            "Spectrum Analysis (FFT size: {}, averages: {})\n",
            self.fft_size, self.num_averages
        ));
        output.push_str(&format!(
            "Sample rate: {:.0} Hz, Resolution: {:.2} Hz\n",
            self.sample_rate, self.freq_resolution
        ));
        output.push_str(&"─".repeat(50));
        output.push('\n');
        output.push_str("  Frequency (Hz)    Power (dB)\n");
        output.push_str(&"─".repeat(50));
        output.push('\n');

        let mut indices: Vec<usize> = (0..self.len()).collect();
        indices.sort_by(|&a, &b| self.power_db[b].total_cmp(&self.power_db[a]));

        for &i in indices.iter().take(20) {
            output.push_str(&format!(
                "{:>14.2}    {:>10.2}\n",
                self.frequencies[i], self.power_db[i]
            ));
        }

        output
    }

    /// Format spectrum as JSON
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// Format spectrum as CSV
    pub fn to_csv(&self) -> String {
        let mut output = String::from("frequency_hz,power_db\n");
        for point in self.points() {
            output.push_str(&format!("{},{}\n", point.frequency, point.power));
        }
        output
    }

    /// Format spectrum as ASCII art
    pub fn to_ascii(&self, width: usize, height: usize) -> String {
        let mut output = String::new();
        let n = self.len();
        if n == 0 || width == 0 || height == 0 {
            return output;
        }

        let max_power = self
            .power_db
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        let min_power = (max_power - 60.0).max(
            self.power_db
                .iter()
                .copied()
                .fold(f64::INFINITY, f64::min),
        );
        let power_range = (max_power - min_power).max(1e-9);

        // Bin the spectrum to fit width
        let columns = width.min(n);
        let bins_per_col = n / columns;
        let binned: Vec<f64> = (0..columns)
            .map(|col| {
                let start = col * bins_per_col;
                let end = if col + 1 == columns {
                    n
                } else {
                    (col + 1) * bins_per_col
                };
                self.power_db[start..end]
                    .iter()
                    .copied()
                    .fold(f64::NEG_INFINITY, f64::max)
            })
            .collect();

        let chars = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];
        let row_height = power_range / height as f64;
        for row in 0..height {
            let threshold = max_power - (row as f64 + 1.0) * row_height;
            for &power in &binned {
                if power >= threshold {
                    let frac = (power - threshold) / row_height;
                    let char_idx = ((frac * 8.0) as usize).min(7);
                    output.push(chars[char_idx]);
                } else {
                    output.push(' ');
                }
            }
            output.push('\n');
        }

        output.push_str(&"─".repeat(columns));
        output.push('\n');

        let min_freq = self.frequencies.first().copied().unwrap_or(0.0);
        let max_freq = self.frequencies.last().copied().unwrap_or(0.0);
        let third = (columns / 3).max(1);
        output.push_str(&format!("{:<third$}", format!("{:.0}", min_freq)));
        output.push_str(&format!(
            "{:^third$}",
            format!("{:.0} Hz", (min_freq + max_freq) / 2.0)
        ));
        output.push_str(&format!("{:>third$}", format!("{:.0}", max_freq)));
        output.push('\n');

        output
    }
}

/// Builds the magnitude spectrum of a whole buffer (one bin per sample)
#[derive(Debug, Clone, Default)]
pub struct SpectrumBuilder {
    window: WindowFunction,
}

impl SpectrumBuilder {
    /// Create a builder with a rectangular window
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a window before the FFT
    pub fn with_window(mut self, window: WindowFunction) -> Self {
        self.window = window;
        self
    }

    /// Get the window function
    pub fn window(&self) -> WindowFunction {
        self.window
    }

    /// Compute the spectrum of `samples`.
    ///
    /// Power is `20·log10(|X[k]| + 1e-10)`, bins run from `-fs/2` upward.
    pub fn build(&self, samples: &[IQSample], sample_rate: f64) -> DspResult<Spectrum> {
        DspError::require_len(samples.len(), 1)?;
        DspError::require_sample_rate(sample_rate)?;

        let n = samples.len();
        let coeffs = self.window.generate(n);
        let mut frame: Vec<Complex64> = samples
            .iter()
            .zip(coeffs.iter())
            .map(|(&s, &w)| s * w)
            .collect();

        let mut processor = FftProcessor::new(n);
        processor.fft_inplace(&mut frame);

        let power_db = FftProcessor::fft_shift(&FftProcessor::magnitude_db(&frame));
        let frequencies = FftProcessor::shifted_frequencies(n, sample_rate);

        tracing::debug!(
            fft_size = n,
            sample_rate,
            window = self.window.name(),
            "Built spectrum"
        );

        Ok(Spectrum {
            frequencies,
            power_db,
            fft_size: n,
            sample_rate,
            freq_resolution: sample_rate / n as f64,
            num_averages: 1,
        })
    }
}

/// Welch PSD configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WelchConfig {
    /// Samples per segment
    pub segment_len: usize,
    /// Overlap between segments (defaults to half a segment)
    pub overlap: Option<usize>,
    /// Window applied to each segment
    pub window: WindowFunction,
}

impl Default for WelchConfig {
    fn default() -> Self {
        Self {
            segment_len: 1024,
            overlap: None,
            window: WindowFunction::Hann,
        }
    }
}

/// Welch averaged-periodogram PSD estimator
#[derive(Debug, Clone, Default)]
pub struct WelchEstimator {
    config: WelchConfig,
}

impl WelchEstimator {
    /// Create an estimator with the given segment length (Hann, 50 % overlap)
    pub fn new(segment_len: usize) -> Self {
        Self {
            config: WelchConfig {
                segment_len,
                ..Default::default()
            },
        }
    }

    /// Create an estimator from a full configuration
    pub fn from_config(config: WelchConfig) -> Self {
        Self { config }
    }

    /// Set the overlap in samples
    pub fn with_overlap(mut self, overlap: usize) -> Self {
        self.config.overlap = Some(overlap);
        self
    }

    /// Set the per-segment window
    pub fn with_window(mut self, window: WindowFunction) -> Self {
        self.config.window = window;
        self
    }

    /// Current configuration
    pub fn config(&self) -> &WelchConfig {
        &self.config
    }

    /// Estimate the two-sided power spectral density of `samples`.
    ///
    /// Returns a spectrum whose power is `10·log10(Pxx + 1e-10)` in dB/Hz.
    pub fn estimate(&self, samples: &[IQSample], sample_rate: f64) -> DspResult<Spectrum> {
        DspError::require_len(samples.len(), 1)?;
        DspError::require_sample_rate(sample_rate)?;

        if self.config.segment_len == 0 {
            return Err(DspError::InvalidParameter(
                "Welch segment length must be non-zero".to_string(),
            ));
        }

        let mut segment_len = self.config.segment_len;
        if samples.len() < segment_len {
            tracing::warn!(
                requested = segment_len,
                available = samples.len(),
                "Welch segment longer than input, shrinking to input length"
            );
            segment_len = samples.len();
        }

        let overlap = match self.config.overlap {
            Some(o) if o >= self.config.segment_len => {
                return Err(DspError::InvalidParameter(format!(
                    "Welch overlap {} must be less than segment length {}",
                    o, self.config.segment_len
                )));
            }
            Some(o) => o.min(segment_len - 1),
            None => segment_len / 2,
        };
        let hop = segment_len - overlap;

        // A periodic taper of length 1 is only its endpoint value
        let window_fn = if segment_len == 1 && self.config.window != WindowFunction::None {
            tracing::warn!(
                window = self.config.window.name(),
                "Single-sample Welch segment, using a rectangular window"
            );
            WindowFunction::None
        } else {
            self.config.window
        };
        let window = window_fn.generate(segment_len);
        let window_energy: f64 = window.iter().map(|w| w * w).sum();
        if window_energy <= 0.0 {
            return Err(DspError::InvalidParameter(format!(
                "{} window has zero energy at length {}",
                window_fn.name(),
                segment_len
            )));
        }
        let scale = 1.0 / (sample_rate * window_energy);

        let mut processor = FftProcessor::new(segment_len);
        let mut accumulated = vec![0.0f64; segment_len];
        let mut segments = 0usize;

        let mut pos = 0;
        while pos + segment_len <= samples.len() {
            let segment = &samples[pos..pos + segment_len];
            let mean: IQSample = segment.iter().sum::<IQSample>() / segment_len as f64;

            let mut frame: Vec<Complex64> = segment
                .iter()
                .zip(window.iter())
                .map(|(&s, &w)| (s - mean) * w)
                .collect();
            processor.fft_inplace(&mut frame);

            for (acc, bin) in accumulated.iter_mut().zip(frame.iter()) {
                *acc += bin.norm_sqr() * scale;
            }

            segments += 1;
            pos += hop;
        }

        let density: Vec<f64> = accumulated
            .iter()
            .map(|&p| p / segments.max(1) as f64)
            .collect();

        tracing::debug!(segment_len, overlap, segments, "Welch PSD estimated");

        Ok(Spectrum {
            frequencies: FftProcessor::shifted_frequencies(segment_len, sample_rate),
            power_db: FftProcessor::fft_shift(&FftProcessor::power_to_db(&density)),
            fft_size: segment_len,
            sample_rate,
            freq_resolution: sample_rate / segment_len as f64,
            num_averages: segments,
        })
    }
}
