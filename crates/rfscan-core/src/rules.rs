//! Watch Rules
//!
//! Typed predicates evaluated against an [`AnalysisReport`]. Rules are
//! plain data, so a rule set can be loaded from JSON:
//!
//! ```json
//! [
//!   { "name": "ism-carrier",
//!     "condition": { "type": "all", "conditions": [
//!       { "type": "peak_in_band", "low_hz": 433050000.0, "high_hz": 434790000.0 },
//!       { "type": "max_peak_power_above", "power_db": 20.0 }
//!     ] } }
//! ]
//! ```
//!
//! Peak frequencies in a report are baseband offsets. Band conditions are
//! written in absolute RF and evaluated with the capture's center frequency.

use crate::analysis::AnalysisReport;
use serde::{Deserialize, Serialize};

/// A predicate over one analysis report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Condition {
    /// At least `count` peaks were detected
    PeakCountAtLeast { count: usize },
    /// At least `count` bins were flagged as anomalous
    AnomalyCountAtLeast { count: usize },
    /// The strongest peak exceeds `power_db`
    MaxPeakPowerAbove { power_db: f64 },
    /// Some peak lies inside `[low_hz, high_hz]` (absolute RF)
    PeakInBand { low_hz: f64, high_hz: f64 },
    /// Some peak is at least `min_bandwidth_hz` wide
    WideSignal { min_bandwidth_hz: f64 },
    /// Every inner condition holds (true when empty)
    All { conditions: Vec<Condition> },
    /// Any inner condition holds (false when empty)
    Any { conditions: Vec<Condition> },
    /// The inner condition does not hold
    Not { condition: Box<Condition> },
}

impl Condition {
    /// Evaluate against a report captured at `center_frequency`
    pub fn evaluate(&self, report: &AnalysisReport, center_frequency: f64) -> bool {
        match self {
            Condition::PeakCountAtLeast { count } => report.peaks.len() >= *count,
            Condition::AnomalyCountAtLeast { count } => report.anomalies.len() >= *count,
            Condition::MaxPeakPowerAbove { power_db } => report
                .strongest_peak()
                .is_some_and(|peak| peak.power > *power_db),
            Condition::PeakInBand { low_hz, high_hz } => report.peaks.iter().any(|peak| {
                let rf = center_frequency + peak.frequency;
                rf >= *low_hz && rf <= *high_hz
            }),
            Condition::WideSignal { min_bandwidth_hz } => report
                .peaks
                .iter()
                .any(|peak| peak.bandwidth >= *min_bandwidth_hz),
            Condition::All { conditions } => conditions
                .iter()
                .all(|c| c.evaluate(report, center_frequency)),
            Condition::Any { conditions } => conditions
                .iter()
                .any(|c| c.evaluate(report, center_frequency)),
            Condition::Not { condition } => !condition.evaluate(report, center_frequency),
        }
    }

    pub fn all(conditions: Vec<Condition>) -> Self {
        Condition::All { conditions }
    }

    pub fn any(conditions: Vec<Condition>) -> Self {
        Condition::Any { conditions }
    }

    pub fn negate(condition: Condition) -> Self {
        Condition::Not {
            condition: Box::new(condition),
        }
    }
}

/// A named condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchRule {
    pub name: String,
    pub condition: Condition,
}

/// A rule that held for a report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleMatch {
    pub rule: String,
    /// Report timestamp the match refers to
    pub timestamp: String,
    pub num_peaks: usize,
    pub num_anomalies: usize,
    /// Absolute RF frequency of the strongest peak
    pub strongest_peak_hz: Option<f64>,
}

impl WatchRule {
    pub fn new(name: impl Into<String>, condition: Condition) -> Self {
        Self {
            name: name.into(),
            condition,
        }
    }

    /// Returns a match when the condition holds
    pub fn check(&self, report: &AnalysisReport, center_frequency: f64) -> Option<RuleMatch> {
        if !self.condition.evaluate(report, center_frequency) {
            return None;
        }
        tracing::debug!(rule = %self.name, "Watch rule matched");
        Some(RuleMatch {
            rule: self.name.clone(),
            timestamp: report.timestamp.clone(),
            num_peaks: report.peaks.len(),
            num_anomalies: report.anomalies.len(),
            strongest_peak_hz: report
                .strongest_peak()
                .map(|peak| center_frequency + peak.frequency),
        })
    }
}

/// Evaluate a rule set, keeping rule order
pub fn evaluate_rules(
    rules: &[WatchRule],
    report: &AnalysisReport,
    center_frequency: f64,
) -> Vec<RuleMatch> {
    rules
        .iter()
        .filter_map(|rule| rule.check(report, center_frequency))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{AnomalyFlag, Peak, Spectrum};

    fn report_with(peaks: Vec<Peak>, anomalies: usize) -> AnalysisReport {
        let spectrum =
            Spectrum::from_parts(vec![-500.0, 0.0, 500.0], vec![-80.0, -80.0, -80.0], 1500.0)
                .unwrap();
        AnalysisReport {
            timestamp: "2024-01-01T00:00:00+00:00".to_string(),
            sample_rate: 1500.0,
            fft_size: 3,
            spectrum,
            psd: None,
            peaks,
            anomalies: (0..anomalies)
                .map(|i| AnomalyFlag {
                    frequency: 0.0,
                    power: 0.0,
                    deviation: 4.0,
                    bin_index: i,
                })
                .collect(),
        }
    }

    fn peak(frequency: f64, power: f64, bandwidth: f64) -> Peak {
        Peak {
            frequency,
            power,
            bandwidth,
            bin_index: 0,
        }
    }

    #[test]
    fn test_counts() {
        let report = report_with(vec![peak(0.0, -10.0, 100.0); 3], 2);
        assert!(Condition::PeakCountAtLeast { count: 3 }.evaluate(&report, 0.0));
        assert!(!Condition::PeakCountAtLeast { count: 4 }.evaluate(&report, 0.0));
        assert!(Condition::AnomalyCountAtLeast { count: 2 }.evaluate(&report, 0.0));
        assert!(!Condition::AnomalyCountAtLeast { count: 3 }.evaluate(&report, 0.0));
    }

    #[test]
    fn test_max_power_and_bandwidth() {
        let report = report_with(vec![peak(-200.0, -30.0, 50.0), peak(300.0, 5.0, 400.0)], 0);
        assert!(Condition::MaxPeakPowerAbove { power_db: 0.0 }.evaluate(&report, 0.0));
        assert!(!Condition::MaxPeakPowerAbove { power_db: 5.0 }.evaluate(&report, 0.0));
        assert!(Condition::WideSignal { min_bandwidth_hz: 400.0 }.evaluate(&report, 0.0));
        assert!(!Condition::WideSignal { min_bandwidth_hz: 401.0 }.evaluate(&report, 0.0));

        let empty = report_with(vec![], 0);
        assert!(!Condition::MaxPeakPowerAbove { power_db: -500.0 }.evaluate(&empty, 0.0));
    }

    #[test]
    fn test_band_uses_center_frequency() {
        let report = report_with(vec![peak(250.0, -10.0, 10.0)], 0);
        let band = Condition::PeakInBand {
            low_hz: 100_200.0,
            high_hz: 100_300.0,
        };
        assert!(band.evaluate(&report, 100_000.0));
        assert!(!band.evaluate(&report, 0.0));
    }

    #[test]
    fn test_combinators() {
        let report = report_with(vec![peak(0.0, -10.0, 10.0)], 0);
        let yes = Condition::PeakCountAtLeast { count: 1 };
        let no = Condition::AnomalyCountAtLeast { count: 1 };

        assert!(Condition::all(vec![yes.clone()]).evaluate(&report, 0.0));
        assert!(!Condition::all(vec![yes.clone(), no.clone()]).evaluate(&report, 0.0));
        assert!(Condition::any(vec![no.clone(), yes.clone()]).evaluate(&report, 0.0));
        assert!(Condition::negate(no.clone()).evaluate(&report, 0.0));
        assert!(Condition::all(vec![]).evaluate(&report, 0.0));
        assert!(!Condition::any(vec![]).evaluate(&report, 0.0));
    }

    #[test]
    fn test_rules_from_json() {
        let json = r#"[
            { "name": "busy", "condition": { "type": "peak_count_at_least", "count": 1 } },
            { "name": "quiet", "condition": { "type": "not",
                "condition": { "type": "peak_count_at_least", "count": 1 } } }
        ]"#;
        let rules: Vec<WatchRule> = serde_json::from_str(json).unwrap();
        let report = report_with(vec![peak(100.0, -10.0, 10.0)], 0);

        let matches = evaluate_rules(&rules, &report, 1_000.0);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].rule, "busy");
        assert_eq!(matches[0].strongest_peak_hz, Some(1_100.0));
        assert_eq!(matches[0].num_peaks, 1);
    }

    #[test]
    fn test_condition_serializes_tagged() {
        let value = serde_json::to_value(Condition::PeakInBand {
            low_hz: 1.0,
            high_hz: 2.0,
        })
        .unwrap();
        assert_eq!(value["type"], "peak_in_band");
        assert_eq!(value["low_hz"], 1.0);
    }
}
