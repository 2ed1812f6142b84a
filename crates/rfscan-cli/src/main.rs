//! rfscan Command-Line Interface
//!
//! This CLI provides tools for:
//! - Generating simulated I/Q capture files
//! - Analyzing captures (spectrum, PSD, peaks, anomalies, statistics)
//! - Monitoring a live or recorded source against watch rules
//! - Sweeping a simulated receiver across a frequency range

use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use rfscan_core::analysis::{
    AnalysisConfig, AnomalyScorer, PeakDetector, SignalStats, SpectralFeatures, Spectrum,
    SpectrumAnalysis, SpectrumBuilder, WelchConfig, WelchEstimator, WindowFunction,
};
use rfscan_core::rules::WatchRule;
use rfscan_core::types::IQSample;
use rfscan_sim::{
    read_samples_f32, sweep, write_samples_f32, ChannelConfig, FileSource, Monitor, SampleSource,
    SimulatedSource, SourceConfig, SourceError, SweepPlan, Tone,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "rfscan")]
#[command(author, version, about = "Spectral peak and anomaly scanner", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a simulated I/Q capture file
    #[command(allow_negative_numbers = true)]
    Generate {
        /// Output file for I/Q samples
        #[arg(short, long, default_value = "capture.iq")]
        output: PathBuf,

        /// Sample rate in Hz
        #[arg(long, default_value = "1000000")]
        sample_rate: f64,

        /// Number of samples to generate
        #[arg(long, default_value = "65536")]
        samples: usize,

        /// Center frequency in Hz (tones are absolute frequencies)
        #[arg(long, default_value = "0")]
        center_freq: f64,

        #[command(flatten)]
        sim: SimArgs,
    },

    /// Analyze I/Q samples (spectrum, psd, peaks, anomalies, stats, features, report)
    #[command(allow_negative_numbers = true)]
    Analyze {
        /// Input file with interleaved f32 I/Q samples
        #[arg(short, long)]
        input: PathBuf,

        /// Sample rate in Hz
        #[arg(long, default_value = "1000000")]
        sample_rate: f64,

        /// Number of samples to analyze (0 = all)
        #[arg(long, default_value = "0")]
        samples: usize,

        /// Analysis mode: spectrum, psd, peaks, anomalies, stats, features, report
        #[arg(long, default_value = "report")]
        mode: String,

        /// Output format: text, json, csv, ascii
        #[arg(long, short = 'o', default_value = "text")]
        output_format: String,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        tuning: TuningArgs,
    },

    /// Poll a source repeatedly and report watch rule matches
    #[command(allow_negative_numbers = true)]
    Monitor {
        /// Read buffers from an I/Q file
        #[arg(short, long, required_unless_present = "simulate", conflicts_with = "simulate")]
        input: Option<PathBuf>,

        /// Use the simulated receiver
        #[arg(long)]
        simulate: bool,

        /// Sample rate in Hz
        #[arg(long, default_value = "1000000")]
        sample_rate: f64,

        /// Center frequency in Hz
        #[arg(long, default_value = "100000000")]
        center_freq: f64,

        /// Samples per poll
        #[arg(long, default_value = "4096")]
        buffer_size: usize,

        /// Number of polls (0 = until stopped or end of input)
        #[arg(long, default_value = "0")]
        count: u64,

        /// Delay between polls in milliseconds
        #[arg(long, default_value = "1000")]
        interval_ms: u64,

        /// JSON file with a list of watch rules
        #[arg(long)]
        rules: Option<PathBuf>,

        /// Print one JSON object per poll
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        sim: SimArgs,

        #[command(flatten)]
        tuning: TuningArgs,
    },

    /// Sweep the simulated receiver across a frequency range
    #[command(allow_negative_numbers = true)]
    Sweep {
        /// Start frequency in Hz
        #[arg(long)]
        start: f64,

        /// Stop frequency in Hz (exclusive)
        #[arg(long)]
        stop: f64,

        /// Step in Hz
        #[arg(long, default_value = "1000000")]
        step: f64,

        /// Sample rate in Hz
        #[arg(long, default_value = "1000000")]
        sample_rate: f64,

        /// Samples captured at each step
        #[arg(long, default_value = "4096")]
        samples: usize,

        /// Window function: none, hann, hamming, blackman, blackman-harris, flat-top
        #[arg(long, default_value = "none")]
        window: String,

        /// Output format: text, json, csv
        #[arg(long, short = 'o', default_value = "text")]
        output_format: String,

        #[command(flatten)]
        sim: SimArgs,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Simulated receiver options
#[derive(Args, Debug, Clone)]
struct SimArgs {
    /// Emitter as HZ[:AMPLITUDE]; repeat for several
    #[arg(long = "tone", value_name = "HZ[:AMP]", allow_hyphen_values = true)]
    tones: Vec<Tone>,

    /// Noise standard deviation per I/Q component
    #[arg(long, default_value = "0.1")]
    noise: f64,

    /// Carrier frequency offset in Hz
    #[arg(long, default_value = "0")]
    cfo: f64,

    /// Receiver gain in dB
    #[arg(long, default_value = "0")]
    gain: f64,

    /// RNG seed for reproducible noise
    #[arg(long)]
    seed: Option<u64>,
}

/// Analysis tuning; flags override values from --config
#[derive(Args, Debug, Clone)]
struct TuningArgs {
    /// JSON analysis configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Peak power threshold in dB
    #[arg(long)]
    threshold: Option<f64>,

    /// Minimum bin separation between peaks
    #[arg(long)]
    min_separation: Option<usize>,

    /// Bandwidth drop below peak power in dB
    #[arg(long)]
    bandwidth_drop: Option<f64>,

    /// Keep only the strongest N peaks
    #[arg(long)]
    max_peaks: Option<usize>,

    /// Anomaly threshold in standard deviations
    #[arg(long)]
    sigma: Option<f64>,

    /// Window function: none, hann, hamming, blackman, blackman-harris, flat-top
    #[arg(long)]
    window: Option<String>,

    /// Welch segment length (enables the PSD)
    #[arg(long)]
    segment: Option<usize>,
}

impl TuningArgs {
    /// Load the config file (if any) and apply flag overrides
    fn resolve(&self) -> Result<AnalysisConfig> {
        let mut config = match &self.config {
            Some(path) => load_json::<AnalysisConfig>(path, "analysis config")?,
            None => AnalysisConfig::default(),
        };

        if let Some(threshold) = self.threshold {
            config.threshold_db = threshold;
        }
        if let Some(min_separation) = self.min_separation {
            config.min_separation = min_separation;
        }
        if let Some(drop) = self.bandwidth_drop {
            config.bandwidth_drop_db = drop;
        }
        if let Some(max_peaks) = self.max_peaks {
            config.max_peaks = Some(max_peaks);
        }
        if let Some(sigma) = self.sigma {
            config.sigma_multiple = sigma;
        }
        if let Some(window) = &self.window {
            config.window = window.parse()?;
        }
        if let Some(segment) = self.segment {
            let welch = config.welch.unwrap_or_default();
            config.welch = Some(WelchConfig {
                segment_len: segment,
                ..welch
            });
        }

        info!(?config, "Resolved analysis configuration");
        Ok(config)
    }
}

impl SimArgs {
    fn channel(&self) -> ChannelConfig {
        let mut channel = if self.cfo != 0.0 {
            ChannelConfig::with_cfo(self.noise, self.cfo)
        } else {
            ChannelConfig::with_noise(self.noise)
        };
        channel.seed = self.seed;
        channel
    }

    fn source(&self, config: SourceConfig) -> Result<SimulatedSource> {
        let tones = if self.tones.is_empty() {
            default_tones(&config)
        } else {
            self.tones.clone()
        };
        let source = SimulatedSource::new(
            SourceConfig {
                gain_db: self.gain,
                ..config
            },
            self.channel(),
        )
        .context("Failed to create simulated source")?
        .with_tones(tones);
        Ok(source)
    }
}

/// A strong carrier above center and a weak interferer below it
fn default_tones(config: &SourceConfig) -> Vec<Tone> {
    vec![
        Tone::new(config.center_frequency + config.sample_rate / 8.0, 1.0),
        Tone::new(config.center_frequency - config.sample_rate / 4.0, 0.05),
    ]
}

fn load_json<T: serde::de::DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {} {:?}", what, path))?;
    serde_json::from_str(&text).with_context(|| format!("Failed to parse {} {:?}", what, path))
}

fn emit(text: &str, output: &Option<PathBuf>, what: &str) -> Result<()> {
    if let Some(output_path) = output {
        std::fs::write(output_path, text)
            .with_context(|| format!("Failed to write {:?}", output_path))?;
        println!("{} written to {:?}", what, output_path);
    } else {
        println!("{}", text);
    }
    Ok(())
}

fn format_spectrum(spectrum: &Spectrum, output_format: &str) -> String {
    match output_format {
        "json" => spectrum.to_json(),
        "csv" => spectrum.to_csv(),
        "ascii" => spectrum.to_ascii(80, 20),
        _ => spectrum.to_text(),
    }
}

fn cmd_generate(
    output: PathBuf,
    sample_rate: f64,
    samples: usize,
    center_freq: f64,
    sim: SimArgs,
) -> Result<()> {
    let config = SourceConfig::tuned(center_freq).with_sample_rate(sample_rate);
    let mut source = sim.source(config)?;
    let iq = source.read_buffer(samples)?;

    write_samples_f32(&output, &iq)
        .with_context(|| format!("Failed to write samples to {:?}", output))?;

    println!("Generated {} samples at {} Hz", iq.len(), sample_rate);
    for tone in source.tones() {
        println!(
            "  Tone: {:.0} Hz (offset {:+.0} Hz), amplitude {}",
            tone.frequency,
            tone.frequency - center_freq,
            tone.amplitude
        );
    }
    println!("  Noise std: {}", sim.noise);
    println!("Written to {:?}", output);
    Ok(())
}

/// Arguments for the analyze command
struct AnalyzeArgs {
    input: PathBuf,
    sample_rate: f64,
    samples: usize,
    mode: String,
    output_format: String,
    output: Option<PathBuf>,
    tuning: TuningArgs,
}

fn cmd_analyze(args: AnalyzeArgs) -> Result<()> {
    // SigMF keeps samples next to the metadata file
    let input_ext = args.input.extension().and_then(|e| e.to_str()).unwrap_or("");
    let data_path = if input_ext == "sigmf-meta" {
        args.input.with_extension("sigmf-data")
    } else {
        args.input.clone()
    };

    let samples = read_samples_f32(&data_path)
        .with_context(|| format!("Failed to read samples from {:?}", data_path))?;
    let analyze_count = if args.samples == 0 {
        samples.len()
    } else {
        args.samples.min(samples.len())
    };
    let analyze_samples: &[IQSample] = &samples[..analyze_count];
    info!(total = samples.len(), analyzing = analyze_count, "Loaded capture");

    let config = args.tuning.resolve()?;
    let analysis = SpectrumAnalysis::new(&config);
    let format = args.output_format.as_str();

    match args.mode.as_str() {
        "spectrum" => {
            let spectrum = analysis.spectrum(analyze_samples, args.sample_rate)?;
            emit(&format_spectrum(&spectrum, format), &args.output, "Spectrum")?;
        }

        "psd" => {
            let welch = config.welch.unwrap_or_default();
            let psd = WelchEstimator::from_config(welch).estimate(analyze_samples, args.sample_rate)?;
            emit(&format_spectrum(&psd, format), &args.output, "PSD")?;
        }

        "peaks" => {
            let spectrum = analysis.spectrum(analyze_samples, args.sample_rate)?;
            let peaks = analysis.detector().find_peaks(&spectrum);
            let text = match format {
                "json" => PeakDetector::format_json(&peaks),
                "csv" => PeakDetector::format_csv(&peaks),
                _ => PeakDetector::format_text(&peaks),
            };
            emit(&text, &args.output, "Peaks")?;
        }

        "anomalies" => {
            let spectrum = analysis.spectrum(analyze_samples, args.sample_rate)?;
            let anomalies = analysis.scorer().score(&spectrum);
            let text = match format {
                "json" => AnomalyScorer::format_json(&anomalies),
                "csv" => AnomalyScorer::format_csv(&anomalies),
                _ => AnomalyScorer::format_text(&anomalies),
            };
            emit(&text, &args.output, "Anomalies")?;
        }

        "stats" => {
            let stats = SignalStats::compute(analyze_samples, args.sample_rate)?;
            let text = match format {
                "json" => stats.to_json(),
                _ => stats.to_text(),
            };
            emit(&text, &args.output, "Statistics")?;
        }

        "features" => {
            let spectrum = analysis.spectrum(analyze_samples, args.sample_rate)?;
            let features = SpectralFeatures::compute(&spectrum)?;
            let text = match format {
                "json" => features.to_json(),
                _ => features.to_text(),
            };
            emit(&text, &args.output, "Features")?;
        }

        "report" => {
            let report = analysis.run(analyze_samples, args.sample_rate)?;
            let text = match format {
                "json" => report.to_json(),
                _ => report.to_text(),
            };
            emit(&text, &args.output, "Report")?;
        }

        _ => {
            anyhow::bail!(
                "Unknown analysis mode: '{}'. Use: spectrum, psd, peaks, anomalies, stats, features, report",
                args.mode
            );
        }
    }

    Ok(())
}

/// Arguments for the monitor command
struct MonitorArgs {
    input: Option<PathBuf>,
    sample_rate: f64,
    center_freq: f64,
    buffer_size: usize,
    count: u64,
    interval_ms: u64,
    rules: Option<PathBuf>,
    json: bool,
    sim: SimArgs,
    tuning: TuningArgs,
}

fn cmd_monitor(args: MonitorArgs) -> Result<()> {
    let source: Box<dyn SampleSource> = match &args.input {
        Some(path) => Box::new(
            FileSource::open(path, args.sample_rate, args.center_freq)
                .with_context(|| format!("Failed to open {:?}", path))?,
        ),
        None => {
            let config = SourceConfig::tuned(args.center_freq)
                .with_sample_rate(args.sample_rate)
                .with_buffer_size(args.buffer_size);
            Box::new(args.sim.source(config)?)
        }
    };

    let rules: Vec<WatchRule> = match &args.rules {
        Some(path) => load_json(path, "watch rules")?,
        None => Vec::new(),
    };

    let config = args.tuning.resolve()?;
    let source_name = source.name().to_string();
    let mut monitor = Monitor::new(source, SpectrumAnalysis::new(&config), args.buffer_size)?
        .with_rules(rules);

    // Setup Ctrl+C handler
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .context("Failed to set Ctrl+C handler")?;

    if !args.json {
        println!("rfscan Monitor");
        println!("==============");
        println!("Source:       {}", source_name);
        println!("Center:       {} Hz", args.center_freq);
        println!("Sample Rate:  {} Hz", args.sample_rate);
        println!("Rules:        {}", monitor.rules().len());
        println!();
        println!("Press Ctrl+C to stop\n");
    }

    let interval = Duration::from_millis(args.interval_ms);
    let mut total_matches = 0usize;

    while running.load(Ordering::SeqCst) {
        match monitor.poll() {
            Ok(event) => {
                total_matches += event.matches.len();
                if args.json {
                    println!("{}", event.to_json());
                } else {
                    println!("{}", event.summary());
                }
            }
            Err(SourceError::EndOfStream) => {
                info!("Input exhausted");
                break;
            }
            Err(e) => return Err(e).context("Monitor poll failed"),
        }

        if args.count > 0 && monitor.sequence() >= args.count {
            break;
        }
        if !interval.is_zero() && running.load(Ordering::SeqCst) {
            std::thread::sleep(interval);
        }
    }

    if !running.load(Ordering::SeqCst) {
        warn!("Interrupted");
    }
    if !args.json {
        println!();
        println!("Polls: {}, rule matches: {}", monitor.sequence(), total_matches);
    }
    Ok(())
}

/// Arguments for the sweep command
struct SweepArgs {
    start: f64,
    stop: f64,
    step: f64,
    sample_rate: f64,
    samples: usize,
    window: String,
    output_format: String,
    sim: SimArgs,
}

fn cmd_sweep(args: SweepArgs) -> Result<()> {
    let plan = SweepPlan::new(args.start, args.stop, args.step)?.with_dwell(args.samples);
    let window: WindowFunction = args.window.parse()?;
    let analysis = SpectrumAnalysis::from_components(
        SpectrumBuilder::new().with_window(window),
        PeakDetector::new(),
        AnomalyScorer::new(),
        None,
    );

    // Without explicit tones, place the default emitters mid-range
    let config = SourceConfig::tuned(args.start + (args.stop - args.start) / 2.0)
        .with_sample_rate(args.sample_rate);
    let mut source = args.sim.source(config)?;

    info!(steps = plan.len(), "Starting sweep");
    let points = sweep(&mut source, &plan, &analysis)?;

    let text = match args.output_format.as_str() {
        "json" => serde_json::to_string_pretty(&points)?,
        "csv" => rfscan_sim::sweep::format_csv(&points),
        _ => rfscan_sim::sweep::format_text(&points),
    };
    println!("{}", text);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = match cli.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Generate {
            output,
            sample_rate,
            samples,
            center_freq,
            sim,
        } => cmd_generate(output, sample_rate, samples, center_freq, sim),

        Commands::Analyze {
            input,
            sample_rate,
            samples,
            mode,
            output_format,
            output,
            tuning,
        } => cmd_analyze(AnalyzeArgs {
            input,
            sample_rate,
            samples,
            mode,
            output_format,
            output,
            tuning,
        }),

        Commands::Monitor {
            input,
            simulate: _,
            sample_rate,
            center_freq,
            buffer_size,
            count,
            interval_ms,
            rules,
            json,
            sim,
            tuning,
        } => cmd_monitor(MonitorArgs {
            input,
            sample_rate,
            center_freq,
            buffer_size,
            count,
            interval_ms,
            rules,
            json,
            sim,
            tuning,
        }),

        Commands::Sweep {
            start,
            stop,
            step,
            sample_rate,
            samples,
            window,
            output_format,
            sim,
        } => cmd_sweep(SweepArgs {
            start,
            stop,
            step,
            sample_rate,
            samples,
            window,
            output_format,
            sim,
        }),

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let bin_name = cmd.get_name().to_string();
            generate(shell, &mut cmd, bin_name, &mut std::io::stdout());
            Ok(())
        }
    }
}
