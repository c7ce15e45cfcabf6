//! One intake-to-results session
//!
//! Wires the components together for the command line: resolve the species
//! table, select and confirm the input, follow the run on a progress bar,
//! then hand the delivered result to a presenter and write any requested
//! exports.

use crate::analysis::{Analyzer, SimulatedAnalyzer};
use crate::config::Settings;
use crate::error::{BatcallError, Result};
use crate::export::{write_pgm, write_report};
use crate::intake::{Intake, IntakePolicy};
use crate::media::{LocalMediaResolver, MediaResolver};
use crate::pipeline::{PhaseKind, PipelineEvent};
use crate::presenter::{ResultsPresenter, SpectrogramConfig};
use crate::species::{SpeciesCatalog, SpeciesTable};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What a finished session hands back for display
#[derive(Debug)]
pub struct SessionOutcome {
    pub presenter: ResultsPresenter,
    pub catalog: SpeciesTable,
    /// Playable location of the analyzed audio, if it came from disk
    pub audio_uri: Option<String>,
}

/// Run a full session as described by `settings`
pub fn run(settings: &Settings) -> Result<SessionOutcome> {
    let catalog = SpeciesTable::resolve(
        settings.species_table.as_deref(),
        settings.fallback_species.as_deref(),
    )?;
    debug!(
        "Species table has {} profiles, fallback '{}'",
        catalog.len(),
        catalog.fallback_label()
    );

    let labels = catalog.labels();
    let analyzer: Arc<dyn Analyzer> = Arc::new(match settings.seed {
        Some(seed) => SimulatedAnalyzer::with_seed(seed, labels)?,
        None => SimulatedAnalyzer::new(labels)?,
    });

    let Some((first, rest)) = settings.inputs.split_first() else {
        return Err(BatcallError::ConfigError("no input file given".to_string()));
    };
    if !rest.is_empty() {
        warn!(
            "Only one file is analyzed at a time, ignoring {} more",
            rest.len()
        );
    }

    let policy = IntakePolicy {
        max_bytes: settings.max_upload_bytes,
    };
    let mut intake = Intake::new(policy, settings.timing);
    let candidate = intake.select_path(first)?;
    info!(
        "Selected {} ({:.2} MB, {})",
        candidate.name,
        candidate.size_mb(),
        candidate.media_type
    );

    let mut resolver = LocalMediaResolver::new();
    resolver.register(candidate);

    let run = intake.confirm(analyzer)?;
    let progress_bar = if settings.show_progress {
        let pb = ProgressBar::new(100);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}% {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        Some(pb)
    } else {
        None
    };

    let outcome = run.wait_with(|event| {
        if let Some(pb) = &progress_bar {
            show_event(pb, event);
        }
    });

    let result = match outcome {
        Ok(result) => {
            if let Some(pb) = &progress_bar {
                pb.finish_with_message("Analysis complete");
            }
            result
        }
        Err(e) => {
            if let Some(pb) = &progress_bar {
                pb.abandon_with_message("Analysis failed");
            }
            return Err(e);
        }
    };

    let audio_uri = resolver.resolve(&result.audio);
    let mut presenter = ResultsPresenter::new(result);
    if let Some(index) = settings.select {
        if !presenter.select(index) {
            warn!(
                "No detection #{} ({} detections), keeping the first",
                index,
                presenter.result().detections.len()
            );
        }
    }

    if let Some(path) = &settings.json_output {
        write_report(&presenter, path)?;
    }
    if let Some(path) = &settings.spectrogram_output {
        let seed = settings.seed.unwrap_or_else(rand::random);
        let field = presenter.intensity_field(SpectrogramConfig::default(), seed);
        write_pgm(&field, path)?;
    }

    Ok(SessionOutcome {
        presenter,
        catalog,
        audio_uri,
    })
}

fn show_event(pb: &ProgressBar, event: &PipelineEvent) {
    match event {
        PipelineEvent::PhaseEntered(PhaseKind::Uploading) => {
            pb.set_position(0);
            pb.set_message("Uploading");
        }
        PipelineEvent::PhaseEntered(PhaseKind::Processing) => {
            pb.set_position(0);
            pb.set_message("Processing");
        }
        PipelineEvent::PhaseEntered(PhaseKind::Complete) => {
            pb.set_position(100);
            pb.set_message("Finalizing");
        }
        PipelineEvent::PhaseEntered(_) => {}
        PipelineEvent::Progress { percent, step, .. } => {
            pb.set_position(percent.round() as u64);
            if let Some(step) = step {
                pb.set_message(*step);
            }
        }
        PipelineEvent::Delivered(_) => {}
        PipelineEvent::Failed { message } => pb.set_message(message.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::PipelineTiming;
    use tempfile::TempDir;

    fn quiet_settings(dir: &TempDir, name: &str, bytes: usize) -> Settings {
        let path = dir.path().join(name);
        std::fs::write(&path, vec![0u8; bytes]).unwrap();
        Settings {
            inputs: vec![path],
            seed: Some(11),
            timing: PipelineTiming::immediate(),
            show_progress: false,
            ..Settings::default()
        }
    }

    #[test]
    fn test_session_delivers_and_resolves_audio() {
        let dir = TempDir::new().unwrap();
        let outcome = run(&quiet_settings(&dir, "colony.wav", 2048)).unwrap();
        let result = outcome.presenter.result();
        assert!(result.bat_detected);
        assert_eq!(result.file_name, "colony.wav");
        assert!(outcome.audio_uri.unwrap().ends_with("/colony.wav"));
    }

    #[test]
    fn test_session_rejects_unsupported_file() {
        let dir = TempDir::new().unwrap();
        let err = run(&quiet_settings(&dir, "notes.txt", 16)).unwrap_err();
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_session_writes_exports() {
        let dir = TempDir::new().unwrap();
        let mut settings = quiet_settings(&dir, "colony.flac", 4096);
        settings.json_output = Some(dir.path().join("report.json"));
        settings.spectrogram_output = Some(dir.path().join("field.pgm"));
        settings.select = Some(99);

        let outcome = run(&settings).unwrap();
        assert_eq!(outcome.presenter.selected(), Some(0));
        assert!(dir.path().join("report.json").is_file());
        assert!(dir.path().join("field.pgm").is_file());
    }

    #[test]
    fn test_session_requires_input() {
        let settings = Settings {
            timing: PipelineTiming::immediate(),
            show_progress: false,
            ..Settings::default()
        };
        assert!(matches!(run(&settings), Err(BatcallError::ConfigError(_))));
    }
}
