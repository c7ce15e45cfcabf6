//! Simulated analysis pipeline
//!
//! A two-stage job (upload, processing) with progress feedback and a
//! finalizing beat before the result is delivered. The result itself comes
//! from an injected [`Analyzer`](crate::analysis::Analyzer).

pub mod cancel;
pub mod orchestrator;
pub mod phase;

pub use cancel::CancellationToken;
pub use orchestrator::{start, PhaseCell, PipelineEvent, PipelineRun, PipelineTiming};
pub use phase::{PhaseKind, PipelinePhase, PROCESSING_STEPS};
