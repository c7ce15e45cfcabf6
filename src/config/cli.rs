//! CLI argument parsing and configuration

use clap::Parser;
use std::path::PathBuf;

/// batcall - Simulated bat call detection
///
/// Takes one audio recording, runs it through the timed upload and analysis
/// pipeline and prints the detection results. The analysis is simulated:
/// detections are drawn at random, not computed from the audio.
#[derive(Parser, Debug)]
#[command(name = "batcall")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Audio file to analyze (repeatable; only the first one is used)
    #[arg(short, long, value_name = "FILE", required = true)]
    pub input: Vec<PathBuf>,

    /// JSON file with species reference profiles
    #[arg(long, value_name = "PATH")]
    pub species_table: Option<PathBuf>,

    /// Species shown when a detected label has no profile
    #[arg(long, value_name = "LABEL")]
    pub fallback_species: Option<String>,

    /// Seed for the simulated analyzer and the synthetic spectrogram
    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,

    /// Multiply every pipeline delay by this factor (0 disables delays)
    #[arg(long, value_name = "FACTOR", default_value = "1.0")]
    pub time_scale: f64,

    /// Upload size ceiling in megabytes
    #[arg(long, value_name = "MB", default_value = "50")]
    pub max_size_mb: u64,

    /// Detection to show in detail (0-based index into the timeline)
    #[arg(long, value_name = "INDEX")]
    pub select: Option<usize>,

    /// Write the analysis report as JSON
    #[arg(long, value_name = "PATH")]
    pub json: Option<PathBuf>,

    /// Write the synthetic spectrogram as a PGM image
    #[arg(long, value_name = "PATH")]
    pub spectrogram: Option<PathBuf>,

    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress progress bars)
    #[arg(short, long, default_value = "false")]
    pub quiet: bool,
}

impl Cli {
    /// Get the log level based on verbosity flags
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            return tracing::Level::ERROR;
        }
        match self.verbose {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }
}
