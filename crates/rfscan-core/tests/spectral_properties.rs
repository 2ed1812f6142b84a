//! Property tests for spectrum building, peak detection and anomaly scoring

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use rfscan_core::analysis::{AnomalyScorer, PeakDetector, Spectrum, SpectrumBuilder};
use rfscan_core::types::{DspError, IQSample};
use std::f64::consts::PI;

fn spectrum_from(power: Vec<f64>, bin_width: f64) -> Spectrum {
    let n = power.len();
    let frequencies: Vec<f64> = (0..n)
        .map(|i| (i as f64 - (n / 2) as f64) * bin_width)
        .collect();
    Spectrum::from_parts(frequencies, power, bin_width * n as f64).unwrap()
}

fn tone(n: usize, sample_rate: f64, freq: f64, amplitude: f64) -> Vec<IQSample> {
    (0..n)
        .map(|i| {
            let phase = 2.0 * PI * freq * i as f64 / sample_rate;
            IQSample::new(amplitude * phase.cos(), amplitude * phase.sin())
        })
        .collect()
}

fn power_vec() -> impl Strategy<Value = Vec<f64>> {
    proptest::collection::vec(-120.0f64..40.0, 3..512)
}

proptest! {
    #[test]
    fn tone_located_within_one_bin(
        log2_n in 8u32..=11,
        fraction in -0.45f64..0.45,
        amplitude in 0.1f64..10.0,
    ) {
        let n = 1usize << log2_n;
        let sample_rate = 1_000_000.0;
        let freq = fraction * sample_rate;

        let spectrum = SpectrumBuilder::new()
            .build(&tone(n, sample_rate, freq, amplitude), sample_rate)
            .unwrap();
        let peaks = PeakDetector::new().find_peaks(&spectrum);
        let strongest = peaks
            .iter()
            .max_by(|a, b| a.power.total_cmp(&b.power))
            .unwrap();

        prop_assert!(
            (strongest.frequency - freq).abs() <= spectrum.bin_width(),
            "tone {} Hz, detected {} Hz, bin width {}",
            freq,
            strongest.frequency,
            spectrum.bin_width()
        );
    }

    #[test]
    fn raising_threshold_never_adds_peaks(
        power in power_vec(),
        low in -120.0f64..40.0,
        raise in 0.0f64..60.0,
        min_separation in 1usize..20,
    ) {
        let spectrum = spectrum_from(power, 10.0);
        let base = PeakDetector::new().with_min_separation(min_separation);

        let loose = base.clone().with_threshold(low).find_peaks(&spectrum);
        let strict = base.with_threshold(low + raise).find_peaks(&spectrum);
        prop_assert!(strict.len() <= loose.len());
    }

    #[test]
    fn peaks_respect_min_separation(power in power_vec(), min_separation in 1usize..40) {
        let spectrum = spectrum_from(power, 10.0);
        let peaks = PeakDetector::new()
            .with_threshold(-200.0)
            .with_min_separation(min_separation)
            .find_peaks(&spectrum);

        for (i, a) in peaks.iter().enumerate() {
            for b in &peaks[i + 1..] {
                prop_assert!(a.bin_index.abs_diff(b.bin_index) >= min_separation);
            }
        }
    }

    #[test]
    fn bandwidth_within_bounds(
        power in power_vec(),
        bin_width in 1.0f64..10_000.0,
        drop_db in 0.5f64..30.0,
    ) {
        let spectrum = spectrum_from(power, bin_width);
        let peaks = PeakDetector::new()
            .with_threshold(-200.0)
            .with_min_separation(1)
            .with_bandwidth_drop(drop_db)
            .find_peaks(&spectrum);

        for peak in &peaks {
            prop_assert!(peak.bandwidth >= spectrum.bin_width());
            prop_assert!(peak.bandwidth <= spectrum.sample_rate);
        }
    }

    #[test]
    fn single_outlier_is_only_anomaly(seed in any::<u64>(), len in 64usize..1024, pick in any::<prop::sample::Index>()) {
        let (mean, sigma): (f64, f64) = (50.0, 5.0);
        let noise = Normal::new(mean, sigma).unwrap();
        let mut rng = StdRng::seed_from_u64(seed);

        let mut power: Vec<f64> = (0..len)
            .map(|_| noise.sample(&mut rng).clamp(mean - 2.5 * sigma, mean + 2.5 * sigma))
            .collect();
        let outlier = pick.index(len);
        power[outlier] = mean + 10.0 * sigma;

        let flags = AnomalyScorer::new().score(&spectrum_from(power, 10.0));
        prop_assert_eq!(flags.len(), 1);
        prop_assert_eq!(flags[0].bin_index, outlier);
    }

    #[test]
    fn flat_spectrum_has_no_peaks_or_anomalies(level in -150.0f64..50.0, len in 1usize..2048) {
        let spectrum = spectrum_from(vec![level; len], 10.0);
        prop_assert!(PeakDetector::new().with_threshold(-500.0).find_peaks(&spectrum).is_empty());
        prop_assert!(AnomalyScorer::new().score(&spectrum).is_empty());
    }
}

#[test]
fn silent_capture_is_degenerate() {
    let spectrum = SpectrumBuilder::new()
        .build(&vec![IQSample::new(0.0, 0.0); 1024], 48_000.0)
        .unwrap();
    assert!(PeakDetector::new().find_peaks(&spectrum).is_empty());
    assert!(AnomalyScorer::new().score(&spectrum).is_empty());
}

#[test]
fn empty_input_is_insufficient_data() {
    let result = SpectrumBuilder::new().build(&[], 48_000.0);
    assert_eq!(
        result,
        Err(DspError::InsufficientData {
            expected: 1,
            actual: 0
        })
    );
}
