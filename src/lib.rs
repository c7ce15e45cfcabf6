//! batcall - Simulated bat call detection
//!
//! Takes one audio recording through a timed upload and analysis pipeline
//! and shapes the result for display. The analysis is a stand-in: detections
//! come from an injectable [`analysis::Analyzer`], and the shipped one draws
//! them at random.
//!
//! # Architecture
//!
//! The library is organized into several key modules:
//!
//! - `intake`: file validation and the single submission slot
//! - `pipeline`: phase state machine, cancellation and the timed run
//! - `analysis`: analyzer trait and the simulated backend
//! - `presenter`: summary, detection timeline and synthetic spectrogram
//! - `species`: species reference profiles with a configurable fallback
//! - `media`: resolving media references to local URIs
//! - `export`: JSON report and PGM image output
//! - `config`: CLI argument parsing and runtime settings
//!
//! # Example
//!
//! ```no_run
//! use batcall::analysis::SimulatedAnalyzer;
//! use batcall::intake::Intake;
//! use batcall::presenter::ResultsPresenter;
//! use batcall::types::FileRef;
//! use std::sync::Arc;
//!
//! let mut intake = Intake::default();
//! intake.select(FileRef::new("colony.wav", 10 * 1024 * 1024)).expect("rejected");
//! let analyzer = SimulatedAnalyzer::new(vec!["Big Brown Bat".to_string()]).expect("labels");
//! let result = intake.confirm(Arc::new(analyzer)).expect("no run").wait().expect("failed");
//! let presenter = ResultsPresenter::new(result);
//! println!("{}", presenter.summary().headline);
//! ```

pub mod analysis;
pub mod config;
pub mod error;
pub mod export;
pub mod intake;
pub mod media;
pub mod pipeline;
pub mod presenter;
pub mod session;
pub mod species;
pub mod types;

// Re-export key types at crate root
pub use error::{BatcallError, Result};
pub use types::{AnalysisResult, DetectionEvent, FileRef, MediaRef, SpeciesProfile, UploadCandidate};
