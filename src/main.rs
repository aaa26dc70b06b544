// src/main.rs
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use ppg_vitals::dsp::{
    analyze_recording, read_signal, FilterMode, SampleSource, StreamingSession, SyntheticSource,
    TextFileSource,
};
use ppg_vitals::{save_signal, ChannelLayout, PpgConfig, VitalsRecorder};

/// PPG heart-rate / SpO2 estimation
#[derive(Parser, Debug)]
#[command(name = "ppg-vitals", version)]
#[command(about = "Streaming PPG filtering, peak detection and vital-sign estimation")]
struct Cli {
    /// JSON configuration file; missing keys keep their defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay text recordings sample by sample through the streaming scheduler
    Stream {
        /// Red channel, one sample per line
        #[arg(long)]
        red: PathBuf,
        /// Infrared channel; enables ratiometric SpO2
        #[arg(long)]
        ir: Option<PathBuf>,
        /// Write each cycle's vitals as JSON lines
        #[arg(long)]
        output: Option<PathBuf>,
        /// Sleep between samples to mimic the sample rate
        #[arg(long)]
        realtime: bool,
    },
    /// Analyse a whole recording at once
    Offline {
        #[arg(long)]
        red: PathBuf,
        #[arg(long)]
        ir: Option<PathBuf>,
        /// Samples read per channel; 0 reads the whole file
        #[arg(long, default_value_t = 2100)]
        max_samples: usize,
        /// Forward-backward filtering instead of a single causal pass
        #[arg(long)]
        zero_phase: bool,
        /// Directory for the filtered signals
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Run the scheduler on a synthetic PPG signal
    Simulate {
        #[arg(long, default_value_t = 30.0)]
        seconds: f64,
        #[arg(long, default_value_t = 75.0)]
        heart_rate: f64,
        #[arg(long, default_value_t = 42)]
        seed: u64,
        /// Red channel only
        #[arg(long)]
        single: bool,
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn load_config(path: Option<&Path>) -> Result<PpgConfig> {
    match path {
        Some(path) => PpgConfig::from_json_file(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(PpgConfig::default()),
    }
}

fn layout_for(has_ir: bool) -> ChannelLayout {
    if has_ir { ChannelLayout::Dual } else { ChannelLayout::Single }
}

fn run_session<S: SampleSource>(source: S, config: PpgConfig, output: Option<&Path>) -> Result<()> {
    let mut session = StreamingSession::new(source, config).context("invalid configuration")?;
    let mut recorder = match output {
        Some(path) => Some(
            VitalsRecorder::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?,
        ),
        None => None,
    };
    let cycles = session.run(|vitals| match recorder.as_mut() {
        Some(rec) => rec.record(vitals),
        None => Ok(()),
    })?;
    if let Some(rec) = recorder {
        rec.finish().context("failed to flush vitals output")?;
    }
    if cycles == 0 {
        warn!("input ended before the first analysis window filled");
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Stream { red, ir, output, realtime } => {
            config.channels = layout_for(ir.is_some());
            config.simulate_realtime |= realtime;
            let source = TextFileSource::open(&red, ir.as_deref())
                .with_context(|| format!("failed to open {}", red.display()))?;
            run_session(source, config, output.as_deref())?;
        }
        Commands::Offline { red, ir, max_samples, zero_phase, output_dir } => {
            let red_signal = read_signal(&red, Some(max_samples))
                .with_context(|| format!("failed to read {}", red.display()))?;
            let ir_signal = match &ir {
                Some(path) => Some(
                    read_signal(path, Some(max_samples))
                        .with_context(|| format!("failed to read {}", path.display()))?,
                ),
                None => None,
            };
            info!("loaded {} red samples", red_signal.len());
            let mode = if zero_phase { FilterMode::ZeroPhase } else { FilterMode::OneWay };
            let report = analyze_recording(&red_signal, ir_signal.as_deref(), &config, mode)?;
            if let Some(dir) = output_dir {
                fs::create_dir_all(&dir)
                    .with_context(|| format!("failed to create {}", dir.display()))?;
                save_signal(dir.join("filtered_red.txt"), &report.red.filtered, 6)?;
                if let Some(ir) = &report.infrared {
                    save_signal(dir.join("filtered_ir.txt"), &ir.filtered, 6)?;
                }
            }
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Simulate { seconds, heart_rate, seed, single, output } => {
            config.channels = layout_for(!single);
            let mut source = SyntheticSource::new(config.sample_rate_hz, heart_rate, seed)?
                .with_duration_secs(seconds);
            if single {
                source = source.with_infrared(None);
            }
            info!("simulating {seconds} s at {heart_rate} BPM (seed {seed})");
            run_session(source, config, output.as_deref())?;
        }
    }
    Ok(())
}
