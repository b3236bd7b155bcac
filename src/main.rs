//! Sensor Resampler CLI
//!
//! Downsamples bearing and KBM vibration datasets.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use sensor_resampler::{
    cleaning::{check_kbm, clean_kbm, label_kbm},
    config::Config,
    DatasetKind, Resampler, RunLog, VERSION,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "resampler")]
#[command(version = VERSION)]
#[command(about = "Downsample high-frequency vibration recordings", long_about = None)]
struct Cli {
    /// Log at debug level (overridden by RUST_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resample a dataset to one or more window counts
    Resample {
        /// Dataset directory (bearing) or base table stem (KBM)
        #[arg(long)]
        data_path: Option<PathBuf>,

        /// Comma-separated window counts (default: 10,30,100,300,1000)
        #[arg(long)]
        sizes: Option<String>,

        /// Channels per sample
        #[arg(long)]
        features: Option<usize>,

        /// Samples per KBM measurement
        #[arg(long)]
        base_rate: Option<usize>,

        /// Dataset layout (bearing or kbm); inferred from the path if omitted
        #[arg(long)]
        dataset: Option<DatasetKind>,

        /// Configuration file (default: user config dir)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Write a JSON run report to this file
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Clean a raw KBM export
    Clean {
        #[arg(long, short)]
        input: PathBuf,

        #[arg(long, short)]
        output: PathBuf,
    },

    /// Check a cleaned KBM table for timestamp irregularities
    Check {
        #[arg(long, short)]
        input: PathBuf,
    },

    /// Flag rows matching known anomaly timestamps
    Label {
        #[arg(long, short)]
        input: PathBuf,

        #[arg(long, short)]
        output: PathBuf,

        /// Anomaly timestamps in dd/mm/yy HH:MM:SS form
        #[arg(long, num_args = 1.., required = true)]
        timestamps: Vec<String>,
    },

    /// Show a run report written by `resample --report`
    Report {
        #[arg(long, short)]
        input: PathBuf,

        /// Print the raw JSON instead of the summary
        #[arg(long)]
        json: bool,
    },

    /// Show configuration
    Config {
        /// Configuration file (default: user config dir)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Resample {
            data_path,
            sizes,
            features,
            base_rate,
            dataset,
            config,
            report,
        } => cmd_resample(
            data_path,
            sizes.as_deref(),
            features,
            base_rate,
            dataset,
            config.as_deref(),
            report.as_deref(),
        ),
        Commands::Clean { input, output } => cmd_clean(&input, &output),
        Commands::Check { input } => cmd_check(&input),
        Commands::Label {
            input,
            output,
            timestamps,
        } => cmd_label(&input, &output, &timestamps),
        Commands::Report { input, json } => cmd_report(&input, json),
        Commands::Config { config } => cmd_config(config.as_deref()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    match path {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("could not load config {}", path.display())),
        None => Config::load().context("could not load default config"),
    }
}

fn cmd_resample(
    data_path: Option<PathBuf>,
    sizes: Option<&str>,
    features: Option<usize>,
    base_rate: Option<usize>,
    dataset: Option<DatasetKind>,
    config_path: Option<&Path>,
    report_path: Option<&Path>,
) -> anyhow::Result<()> {
    let mut config = load_config(config_path)?;

    // Flags take precedence over the config file
    if let Some(path) = data_path {
        config.data_path = path;
    }
    if let Some(sizes) = sizes {
        config.resample_sizes = Config::parse_sizes(sizes)?;
    }
    if let Some(features) = features {
        config.num_features = features;
    }
    if let Some(base_rate) = base_rate {
        config.base_rate = base_rate;
    }
    if dataset.is_some() {
        config.dataset = dataset;
    }
    if config.resample_sizes.is_empty() {
        bail!("no window counts to resample to");
    }

    let resampler = Resampler::from_config(&config);
    let mut log = RunLog::new();

    for &size in &config.resample_sizes {
        let report = resampler.resample_data(size).with_context(|| {
            format!(
                "resampling {} to {} windows failed",
                config.data_path.display(),
                size
            )
        })?;
        log.record(report);
    }

    if let Some(path) = report_path {
        log.save(path)
            .with_context(|| format!("could not write report {}", path.display()))?;
        println!("Report written to {}", path.display());
    }

    println!("{}", log.summary());
    Ok(())
}

fn cmd_clean(input: &Path, output: &Path) -> anyhow::Result<()> {
    let cleaned = clean_kbm(input, output)?;
    println!("Cleaned {} rows into {}", cleaned.rows.len(), output.display());
    Ok(())
}

fn cmd_check(input: &Path) -> anyhow::Result<()> {
    let issues = check_kbm(input)?;
    if issues.is_empty() {
        println!("No timestamp irregularities in {}", input.display());
    }
    for issue in &issues {
        println!("{} {:?} ({:+}s)", issue.time_sec, issue.kind, issue.delta_secs);
    }
    Ok(())
}

fn cmd_label(input: &Path, output: &Path, timestamps: &[String]) -> anyhow::Result<()> {
    let labeled = label_kbm(input, output, timestamps)?;
    println!("Labeled {labeled} rows, written to {}", output.display());
    Ok(())
}

fn cmd_report(input: &Path, json: bool) -> anyhow::Result<()> {
    let log = RunLog::load(input)
        .with_context(|| format!("could not read report {}", input.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&log)?);
    } else {
        println!("Report started {}", log.started_at.format("%Y-%m-%d %H:%M:%S UTC"));
        println!("{}", log.summary());
    }
    Ok(())
}

fn cmd_config(config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;

    println!("Configuration");
    println!("=============");
    println!();
    println!(
        "Config file: {:?}",
        config_path.map(Path::to_path_buf).unwrap_or_else(Config::config_path)
    );
    println!("Dataset: {}", config.dataset_kind());
    println!();
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
