//! Capture Monitor
//!
//! Repeatedly pulls buffers from a source, analyzes them and checks watch
//! rules. The monitor does no scheduling of its own; the caller decides
//! how often to [`Monitor::poll`] and when to stop.

use crate::device::{SampleSource, SourceError, SourceResult};
use rfscan_core::analysis::{AnalysisReport, SpectrumAnalysis};
use rfscan_core::rules::{evaluate_rules, RuleMatch, WatchRule};
use serde::Serialize;

/// Outcome of one poll
#[derive(Debug, Clone, Serialize)]
pub struct MonitorEvent {
    /// Poll counter, starting at 1
    pub sequence: u64,
    /// Frequency the capture was taken at
    pub center_frequency: f64,
    pub report: AnalysisReport,
    pub matches: Vec<RuleMatch>,
}

impl MonitorEvent {
    /// One-line summary
    pub fn summary(&self) -> String {
        let strongest = match self.report.strongest_peak() {
            Some(peak) => format!(
                "{:.0} Hz @ {:.1} dB",
                self.center_frequency + peak.frequency,
                peak.power
            ),
            None => "-".to_string(),
        };
        let mut line = format!(
            "#{:<5} {}  peaks={:<3} anomalies={:<4} strongest={}",
            self.sequence,
            self.report.timestamp,
            self.report.peaks.len(),
            self.report.anomalies.len(),
            strongest
        );
        if !self.matches.is_empty() {
            let names: Vec<&str> = self.matches.iter().map(|m| m.rule.as_str()).collect();
            line.push_str(&format!("  MATCH [{}]", names.join(", ")));
        }
        line
    }

    /// Format as single-line JSON
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Source, analysis and rules wired together
pub struct Monitor {
    source: Box<dyn SampleSource>,
    analysis: SpectrumAnalysis,
    rules: Vec<WatchRule>,
    buffer_size: usize,
    sequence: u64,
}

impl Monitor {
    pub fn new(
        source: Box<dyn SampleSource>,
        analysis: SpectrumAnalysis,
        buffer_size: usize,
    ) -> SourceResult<Self> {
        if buffer_size == 0 {
            return Err(SourceError::InvalidConfig(
                "monitor buffer size must be at least one sample".to_string(),
            ));
        }
        Ok(Self {
            source,
            analysis,
            rules: Vec::new(),
            buffer_size,
            sequence: 0,
        })
    }

    pub fn with_rules(mut self, rules: Vec<WatchRule>) -> Self {
        self.rules = rules;
        self
    }

    pub fn add_rule(&mut self, rule: WatchRule) {
        self.rules.push(rule);
    }

    pub fn rules(&self) -> &[WatchRule] {
        &self.rules
    }

    pub fn source(&self) -> &dyn SampleSource {
        self.source.as_ref()
    }

    /// Number of completed polls
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Read one buffer, analyze it and evaluate the rules.
    ///
    /// Returns `SourceError::EndOfStream` once a finite source is drained.
    pub fn poll(&mut self) -> SourceResult<MonitorEvent> {
        let samples = self.source.read_buffer(self.buffer_size)?;
        let center_frequency = self.source.center_frequency();
        let report = self.analysis.run(&samples, self.source.sample_rate())?;
        let matches = evaluate_rules(&self.rules, &report, center_frequency);

        self.sequence += 1;
        for m in &matches {
            tracing::info!(
                rule = %m.rule,
                sequence = self.sequence,
                strongest_peak_hz = ?m.strongest_peak_hz,
                "Watch rule triggered"
            );
        }

        Ok(MonitorEvent {
            sequence: self.sequence,
            center_frequency,
            report,
            matches,
        })
    }
}
