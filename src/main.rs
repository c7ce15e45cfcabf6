//! batcall CLI entry point

use batcall::config::{Cli, Settings};
use batcall::presenter::{format_time, frequency_labels, MAX_FREQUENCY_KHZ};
use batcall::session::{self, SessionOutcome};
use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(&cli);

    let settings = Settings::from_cli(&cli);

    match session::run(&settings) {
        Ok(outcome) => {
            print_outcome(&outcome, &settings);
            ExitCode::SUCCESS
        }
        Err(e) if e.is_recoverable() => {
            eprintln!(
                "Error: {}\n  Upload limit: {} MB\n  Example: batcall -i ./recordings/colony.wav",
                e, cli.max_size_mb
            );
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("Fatal error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(cli: &Cli) {
    let filter = cli.log_level().to_string().to_lowercase();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();
}

fn print_outcome(outcome: &SessionOutcome, settings: &Settings) {
    let presenter = &outcome.presenter;
    let summary = presenter.summary();

    println!();
    println!("{}: {}", summary.headline, summary.file_name);
    println!(
        "  Confidence: {} ({})",
        summary.confidence_percent, summary.tier
    );
    println!("  Detections: {}", summary.detection_count);
    println!("  Duration:   {}", summary.duration_label);
    if let Some(species) = &summary.primary_species {
        println!("  Primary:    {}", species);
    }
    if let Some(uri) = &outcome.audio_uri {
        println!("  Audio:      {}", uri);
    }

    if let Some(path) = &settings.spectrogram_output {
        println!(
            "  Spectrogram: {} (synthetic; {} to {})",
            path.display(),
            frequency_labels(MAX_FREQUENCY_KHZ)[4],
            frequency_labels(MAX_FREQUENCY_KHZ)[0]
        );
    }
    if let Some(path) = &settings.json_output {
        println!("  Report:     {}", path.display());
    }

    let timeline = presenter.timeline();
    if !timeline.is_empty() {
        println!();
        println!("Detection timeline ({}):", presenter.axis_labels().join(" | "));
        for entry in &timeline {
            println!(
                "  {} #{} {}  {}  {} confidence",
                if entry.selected { ">" } else { " " },
                entry.index,
                entry.time_label,
                entry.species,
                entry.confidence_percent
            );
        }
    }

    if let Some(detection) = presenter.selected_detection() {
        println!();
        println!(
            "Selected detection at {}: {}",
            format_time(detection.timestamp),
            detection.species
        );
    }

    if let (Some(primary), Some(profile)) = (
        presenter.result().primary_species.as_deref(),
        presenter.species_profile(&outcome.catalog),
    ) {
        println!();
        println!("Primary species: {}", primary);
        if profile.label != primary {
            println!("  (no profile for this label, showing {})", profile.label);
        }
        println!("  {} ({})", profile.label, profile.scientific_name);
        println!("  {}", profile.description);
        println!("  Habitat:        {}", profile.habitat);
        println!("  Diet:           {}", profile.diet);
        println!("  Size:           {}", profile.size);
        println!("  Call frequency: {}", profile.call_frequency);
        println!("  Conservation:   {}", profile.conservation_status);
        for fact in &profile.facts {
            println!("  - {}", fact);
        }
        for link in &profile.links {
            println!("  {}: {}", link.title, link.url);
        }
    }
}
