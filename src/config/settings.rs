//! Runtime configuration settings

use crate::pipeline::PipelineTiming;
use crate::types::MAX_UPLOAD_BYTES;
use std::path::PathBuf;

/// Runtime settings for one intake-to-results session
#[derive(Debug, Clone)]
pub struct Settings {
    /// Files handed in by the user; only the first is used
    pub inputs: Vec<PathBuf>,
    /// Species table override
    pub species_table: Option<PathBuf>,
    /// Fallback species label override
    pub fallback_species: Option<String>,
    /// Seed for simulation and visualization
    pub seed: Option<u64>,
    /// Pipeline delays and ceilings
    pub timing: PipelineTiming,
    /// Upload size ceiling in bytes
    pub max_upload_bytes: u64,
    /// Detection to show in detail
    pub select: Option<usize>,
    /// JSON report path
    pub json_output: Option<PathBuf>,
    /// PGM spectrogram path
    pub spectrogram_output: Option<PathBuf>,
    /// Show progress bars
    pub show_progress: bool,
}

impl Settings {
    /// Create settings from CLI arguments
    pub fn from_cli(cli: &super::cli::Cli) -> Self {
        Self {
            inputs: cli.input.clone(),
            species_table: cli.species_table.clone(),
            fallback_species: cli.fallback_species.clone(),
            seed: cli.seed,
            timing: PipelineTiming::default().scaled(cli.time_scale),
            max_upload_bytes: cli.max_size_mb.saturating_mul(1024 * 1024),
            select: cli.select,
            json_output: cli.json.clone(),
            spectrogram_output: cli.spectrogram.clone(),
            show_progress: !cli.quiet,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            inputs: Vec::new(),
            species_table: None,
            fallback_species: None,
            seed: None,
            timing: PipelineTiming::default(),
            max_upload_bytes: MAX_UPLOAD_BYTES,
            select: None,
            json_output: None,
            spectrogram_output: None,
            show_progress: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Cli;
    use clap::Parser;
    use std::time::Duration;

    #[test]
    fn test_time_scale_applies_to_delays() {
        let cli = Cli::parse_from(["batcall", "-i", "a.wav", "--time-scale", "0.5"]);
        let settings = Settings::from_cli(&cli);
        assert_eq!(settings.timing.upload_step, Duration::from_millis(100));
        assert_eq!(settings.timing.processing_step, Duration::from_millis(500));
        assert_eq!(settings.max_upload_bytes, MAX_UPLOAD_BYTES);
    }

    #[test]
    fn test_negative_time_scale_disables_delays() {
        let cli = Cli::parse_from(["batcall", "-i", "a.wav", "--time-scale=-3"]);
        let settings = Settings::from_cli(&cli);
        assert_eq!(settings.timing.upload_step, Duration::ZERO);
    }
}
