//! Frequency Sweep
//!
//! Steps a tunable source across a frequency range, capturing one buffer
//! per step and recording the strongest bin and mean power seen there.

use crate::device::{SampleSource, SourceError, SourceResult};
use rfscan_core::analysis::SpectrumAnalysis;
use serde::{Deserialize, Serialize};

/// Default samples captured at each step
pub const DEFAULT_DWELL_SAMPLES: usize = 4096;
/// Largest number of steps a plan may hold
pub const MAX_SWEEP_STEPS: usize = 1_000_000;

/// Range to sweep; `stop_hz` is exclusive
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SweepPlan {
    pub start_hz: f64,
    pub stop_hz: f64,
    pub step_hz: f64,
    /// Samples captured at each center frequency
    #[serde(default = "default_dwell")]
    pub dwell_samples: usize,
}

fn default_dwell() -> usize {
    DEFAULT_DWELL_SAMPLES
}

impl SweepPlan {
    pub fn new(start_hz: f64, stop_hz: f64, step_hz: f64) -> SourceResult<Self> {
        let plan = Self {
            start_hz,
            stop_hz,
            step_hz,
            dwell_samples: DEFAULT_DWELL_SAMPLES,
        };
        plan.validate()?;
        Ok(plan)
    }

    pub fn with_dwell(mut self, dwell_samples: usize) -> Self {
        self.dwell_samples = dwell_samples;
        self
    }

    pub fn validate(&self) -> SourceResult<()> {
        if ![self.start_hz, self.stop_hz, self.step_hz]
            .iter()
            .all(|v| v.is_finite())
        {
            return Err(SourceError::InvalidConfig(
                "sweep bounds must be finite".to_string(),
            ));
        }
        if self.stop_hz <= self.start_hz {
            return Err(SourceError::InvalidConfig(format!(
                "sweep stop {} Hz must be above start {} Hz",
                self.stop_hz, self.start_hz
            )));
        }
        if self.step_hz <= 0.0 {
            return Err(SourceError::InvalidConfig(format!(
                "sweep step must be positive, got {}",
                self.step_hz
            )));
        }
        let steps = ((self.stop_hz - self.start_hz) / self.step_hz).ceil();
        if !steps.is_finite() || steps > MAX_SWEEP_STEPS as f64 {
            return Err(SourceError::InvalidConfig(format!(
                "sweep of {} Hz in {} Hz steps exceeds {} steps",
                self.stop_hz - self.start_hz,
                self.step_hz,
                MAX_SWEEP_STEPS
            )));
        }
        if self.dwell_samples == 0 {
            return Err(SourceError::InvalidConfig(
                "dwell must be at least one sample".to_string(),
            ));
        }
        Ok(())
    }

    /// Number of steps, capped at [`MAX_SWEEP_STEPS`]
    pub fn len(&self) -> usize {
        let steps = ((self.stop_hz - self.start_hz) / self.step_hz).ceil();
        if steps.is_finite() && steps > 0.0 {
            (steps as usize).min(MAX_SWEEP_STEPS)
        } else {
            0
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Center frequencies in ascending order
    pub fn frequencies(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.len())
            .map(move |i| self.start_hz + i as f64 * self.step_hz)
            .filter(move |&f| f < self.stop_hz)
    }
}

/// Result of one sweep step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SweepPoint {
    /// Frequency the source was tuned to
    pub center_frequency: f64,
    /// Absolute frequency of the strongest bin
    pub peak_frequency: f64,
    /// Power of the strongest bin in dB
    pub peak_power: f64,
    /// Mean power across the capture in dB
    pub mean_power: f64,
}

/// Sweep `source` across `plan`, analysing one buffer per step
pub fn sweep(
    source: &mut dyn SampleSource,
    plan: &SweepPlan,
    analysis: &SpectrumAnalysis,
) -> SourceResult<Vec<SweepPoint>> {
    plan.validate()?;
    let mut points = Vec::new();

    for center in plan.frequencies() {
        source.tune(center)?;
        let samples = source.read_buffer(plan.dwell_samples)?;
        let spectrum = analysis.spectrum(&samples, source.sample_rate())?;

        // A built spectrum always has at least one bin
        let (offset, peak_power) = spectrum.find_peak().unwrap_or((0.0, f64::NEG_INFINITY));
        let point = SweepPoint {
            center_frequency: center,
            peak_frequency: center + offset,
            peak_power,
            mean_power: spectrum.mean_power_db(),
        };
        tracing::debug!(
            center_frequency = center,
            peak_frequency = point.peak_frequency,
            peak_power,
            "Sweep step"
        );
        points.push(point);
    }

    tracing::info!(steps = points.len(), "Sweep complete");
    Ok(points)
}

/// Format sweep results as text table
pub fn format_text(points: &[SweepPoint]) -> String {
    let mut output = String::new();
    output.push_str("Frequency Sweep\n");
    output.push_str(&"═".repeat(64));
    output.push('\n');
    output.push_str(&format!(
        "{:>16}  {:>16}  {:>12}  {:>12}\n",
        "Center (Hz)", "Peak (Hz)", "Peak (dB)", "Mean (dB)"
    ));
    output.push_str(&"─".repeat(64));
    output.push('\n');

    for point in points {
        output.push_str(&format!(
            "{:>16.0}  {:>16.0}  {:>12.2}  {:>12.2}\n",
            point.center_frequency, point.peak_frequency, point.peak_power, point.mean_power
        ));
    }

    if let Some(best) = points.iter().max_by(|a, b| a.peak_power.total_cmp(&b.peak_power)) {
        output.push_str(&format!(
            "\nStrongest: {:.0} Hz at {:.2} dB\n",
            best.peak_frequency, best.peak_power
        ));
    }

    output
}

/// Format sweep results as CSV
pub fn format_csv(points: &[SweepPoint]) -> String {
    let mut output =
        String::from("center_frequency_hz,peak_frequency_hz,peak_power_db,mean_power_db\n");
    for point in points {
        output.push_str(&format!(
            "{},{},{},{}\n",
            point.center_frequency, point.peak_frequency, point.peak_power, point.mean_power
        ));
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::ChannelConfig;
    use crate::device::SourceConfig;
    use crate::simulator::{SimulatedSource, Tone};

    #[test]
    fn test_plan_frequencies_exclusive_stop() {
        let plan = SweepPlan::new(100.0e6, 103.0e6, 1.0e6).unwrap();
        let freqs: Vec<f64> = plan.frequencies().collect();
        assert_eq!(freqs, vec![100.0e6, 101.0e6, 102.0e6]);

        let plan = SweepPlan::new(0.0, 2.5, 1.0).unwrap();
        assert_eq!(plan.frequencies().collect::<Vec<_>>(), vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_plan_validation() {
        assert!(SweepPlan::new(10.0, 5.0, 1.0).is_err());
        assert!(SweepPlan::new(0.0, 5.0, 0.0).is_err());
        assert!(SweepPlan::new(0.0, f64::INFINITY, 1.0).is_err());
    }

    #[test]
    fn test_plan_rejects_oversized_step_count() {
        // Ratio overflows to infinity
        assert!(matches!(
            SweepPlan::new(0.0, 1e300, 1e-300),
            Err(SourceError::InvalidConfig(_))
        ));
        assert!(matches!(
            SweepPlan::new(0.0, 6.0e9, 1.0),
            Err(SourceError::InvalidConfig(_))
        ));

        let plan = SweepPlan::new(0.0, MAX_SWEEP_STEPS as f64, 1.0).unwrap();
        assert_eq!(plan.len(), MAX_SWEEP_STEPS);

        let unchecked = SweepPlan {
            start_hz: 0.0,
            stop_hz: 1e300,
            step_hz: 1e-300,
            dwell_samples: 16,
        };
        assert_eq!(unchecked.len(), MAX_SWEEP_STEPS);
        let mut source = SimulatedSource::new(SourceConfig::default(), ChannelConfig::ideal())
            .unwrap();
        assert!(sweep(&mut source, &unchecked, &SpectrumAnalysis::default()).is_err());
    }

    #[test]
    fn test_sweep_finds_emitter() {
        let mut source = SimulatedSource::new(
            SourceConfig::tuned(0.0),
            ChannelConfig::with_noise(0.01).seeded(3),
        )
        .unwrap()
        .with_tone(Tone::new(102.2e6, 1.0));

        let plan = SweepPlan::new(100.0e6, 105.0e6, 1.0e6).unwrap().with_dwell(1000);
        let points = sweep(&mut source, &plan, &SpectrumAnalysis::default()).unwrap();
        assert_eq!(points.len(), 5);

        let best = points
            .iter()
            .max_by(|a, b| a.peak_power.total_cmp(&b.peak_power))
            .unwrap();
        assert!(best.center_frequency == 102.0e6 || best.center_frequency == 103.0e6);
        assert!((best.peak_frequency - 102.2e6).abs() <= 1000.0);
        assert!(best.peak_power > best.mean_power + 20.0);
    }

    #[test]
    fn test_sweep_requires_tunable_source() {
        struct Fixed;
        impl SampleSource for Fixed {
            fn name(&self) -> &str {
                "fixed"
            }
            fn sample_rate(&self) -> f64 {
                1000.0
            }
            fn center_frequency(&self) -> f64 {
                0.0
            }
            fn read_buffer(&mut self, n: usize) -> SourceResult<Vec<rfscan_core::IQSample>> {
                Ok(vec![rfscan_core::IQSample::new(0.0, 0.0); n])
            }
        }

        let plan = SweepPlan::new(0.0, 10.0, 1.0).unwrap();
        let result = sweep(&mut Fixed, &plan, &SpectrumAnalysis::default());
        assert!(matches!(result, Err(SourceError::Unsupported(_))));
    }

    #[test]
    fn test_formats() {
        let points = vec![SweepPoint {
            center_frequency: 1e6,
            peak_frequency: 1.1e6,
            peak_power: 40.0,
            mean_power: -10.0,
        }];
        assert!(format_csv(&points).contains("1000000,1100000,40,-10"));
        assert!(format_text(&points).contains("Strongest: 1100000 Hz"));
    }
}
