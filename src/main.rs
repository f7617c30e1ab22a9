// src/main.rs
use std::path::PathBuf;
use std::sync::Arc;
use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use log::{debug, error, info};
use eegspec::batch::{self, read_band_powers, write_json, ChannelSource, LogReporter, RunConfig};
use eegspec::spectral::{band_changes, ChangeMode, FreqRange, WindowKind};
/// EEG spectral analysis toolkit
#[derive(Parser, Debug)]
#[command(name = "eegspec", version, about, long_about = None)]
struct Cli {
    /// Logging verbosity (error, warn, info, debug, trace); RUST_LOG wins when set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
    #[command(subcommand)]
    command: Commands,
}
#[derive(Subcommand, Debug)]
enum Commands {
    /// Analyze a folder of subject JSONs or a single subject JSON
    Analyze(AnalyzeArgs),
    /// Task-related power between two metrics files
    Trp {
        /// Metrics JSON of the baseline condition
        #[arg(long)]
        baseline: PathBuf,
        /// Metrics JSON of the task condition
        #[arg(long)]
        task: PathBuf,
        /// ratio or db
        #[arg(long, default_value = "ratio")]
        mode: String,
        /// Write the result here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
}
#[derive(clap::Args, Debug)]
struct AnalyzeArgs {
    /// Folder with many subject.json files or a single subject.json
    #[arg(long)]
    input: PathBuf,
    /// Sample rate in Hz (required unless given by --config)
    #[arg(long)]
    sfreq: Option<f64>,
    #[arg(long)]
    out_dir: PathBuf,
    /// Welch segment length in samples [default: 1024]
    #[arg(long)]
    nperseg: Option<usize>,
    /// Segment overlap in samples [default: nperseg / 2]
    #[arg(long)]
    noverlap: Option<usize>,
    /// hann, hamming, blackman, blackmanharris, nuttall, flattop, bartlett, triang
    /// or boxcar [default: hann]
    #[arg(long)]
    window: Option<WindowKind>,
    /// Plain text, .csv or .locs montage; built-in 63-channel cap when omitted
    #[arg(long)]
    channels_file: Option<PathBuf>,
    /// Alpha band as "fmin,fmax" [default: 8,13]
    #[arg(long)]
    alpha: Option<FreqRange>,
    /// Report frontal alpha asymmetry in dB instead of natural log
    #[arg(long)]
    faa_db: bool,
    /// Worker pool size [default: 4]
    #[arg(long)]
    max_processors: Option<usize>,
    /// JSON run configuration; flags above override it
    #[arg(long)]
    config: Option<PathBuf>,
}
impl AnalyzeArgs {
    fn run_config(&self) -> anyhow::Result<RunConfig> {
        let mut config = match (&self.config, self.sfreq) {
            (Some(path), _) => RunConfig::from_json_file(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            (None, Some(sfreq)) => RunConfig::new(sfreq),
            (None, None) => bail!("--sfreq is required when no --config is given"),
        };
        if let Some(sfreq) = self.sfreq {
            config.sample_rate_hz = sfreq;
        }
        if let Some(nperseg) = self.nperseg {
            config.segment_len = nperseg;
        }
        if self.noverlap.is_some() {
            config.overlap = self.noverlap;
        }
        if let Some(window) = self.window {
            config.window = window;
        }
        if let Some(alpha) = self.alpha {
            config = config.with_alpha(alpha);
        }
        if self.faa_db {
            config.faa_db = true;
        }
        if let Some(workers) = self.max_processors {
            config.workers = workers;
        }
        Ok(config)
    }
}
fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&cli.log_level))
        .init();
    match cli.command {
        Commands::Analyze(args) => analyze(args),
        Commands::Trp {
            baseline,
            task,
            mode,
            out,
        } => trp(baseline, task, &mode, out),
    }
}
fn analyze(args: AnalyzeArgs) -> anyhow::Result<()> {
    info!("Analyze entry");
    let config = args.run_config()?;
    let channels = args
        .channels_file
        .clone()
        .map(ChannelSource::File)
        .unwrap_or_default();
    let report = batch::analyze(
        config,
        &args.input,
        &args.out_dir,
        &channels,
        Arc::new(LogReporter),
    )
    .map_err(|e| {
        error!("Analyze failed: {e}");
        e
    })?;
    info!(
        "Wrote summary to {} ({} of {} task(s) succeeded)",
        report.summary_path.display(),
        report.total - report.failures.len(),
        report.total
    );
    // Each failure was already logged when it happened.
    for failure in &report.failures {
        debug!("Dropped from summary: subject={} task={}", failure.subject, failure.task);
    }
    Ok(())
}
fn trp(
    baseline: PathBuf,
    task: PathBuf,
    mode: &str,
    out: Option<PathBuf>,
) -> anyhow::Result<()> {
    let mode: ChangeMode = mode.parse()?;
    let base = read_band_powers(&baseline)
        .with_context(|| format!("reading baseline {}", baseline.display()))?;
    let active =
        read_band_powers(&task).with_context(|| format!("reading task {}", task.display()))?;
    let changes = band_changes(&base, &active, mode)?;
    let document = serde_json::json!({
        "baseline": baseline,
        "task": task,
        "mode": mode.to_string(),
        "trp": changes,
    });
    match out {
        Some(path) => {
            write_json(&path, &document)?;
            info!("TRP written: {}", path.display());
        }
        None => println!("{}", serde_json::to_string_pretty(&document)?),
    }
    Ok(())
}
