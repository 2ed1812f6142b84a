//! # rfscan Capture Sources
//!
//! This crate feeds I/Q buffers into the rfscan analysis pipeline and
//! drives it over time and frequency.
//!
//! ## Sources
//!
//! - **Simulator**: Synthetic emitters with an AWGN/CFO channel
//! - **File I/O**: Interleaved little-endian f32 captures (`.iq`, `.sigmf-data`)
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐
//! │  Simulator   │   │  FileSource  │
//! └──────┬───────┘   └──────┬───────┘
//!        └────────┬─────────┘
//!                 ▼
//!          SampleSource trait
//!                 │
//!        ┌────────┴─────────┐
//!        ▼                  ▼
//!   sweep(plan)      Monitor::poll()
//!        │                  │
//!        ▼                  ▼
//!   SweepPoint[]     MonitorEvent (report + rule matches)
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use rfscan_core::analysis::SpectrumAnalysis;
//! use rfscan_sim::{ChannelConfig, Monitor, SimulatedSource, SourceConfig, Tone};
//!
//! let source = SimulatedSource::new(SourceConfig::tuned(433.0e6), ChannelConfig::default())?
//!     .with_tone(Tone::new(433.92e6, 1.0));
//! let mut monitor = Monitor::new(Box::new(source), SpectrumAnalysis::default(), 4096)?;
//! let event = monitor.poll()?;
//! println!("{}", event.summary());
//! # Ok::<(), rfscan_sim::SourceError>(())
//! ```

pub mod channel;
pub mod device;
pub mod file;
pub mod monitor;
pub mod simulator;
pub mod sweep;

// Re-exports
pub use channel::{Channel, ChannelConfig, ChannelModel};
pub use device::{SampleSource, SourceConfig, SourceError, SourceResult};
pub use file::{read_samples_f32, write_samples_f32, FileSource};
pub use monitor::{Monitor, MonitorEvent};
pub use simulator::{SimulatedSource, Tone};
pub use sweep::{sweep, SweepPlan, SweepPoint};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::channel::{Channel, ChannelConfig};
    pub use crate::device::{SampleSource, SourceConfig};
    pub use crate::monitor::Monitor;
    pub use crate::simulator::{SimulatedSource, Tone};
}
