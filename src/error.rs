//! Unified error types for batcall
//!
//! Error strategy:
//! - Intake errors (validation): Recoverable, surfaced to the user, no run is affected
//! - Start errors (no candidate, run in progress): Fatal to that start attempt only
//! - Run errors (failed, timed out, cancelled): Terminate the run, nothing is delivered
//!
//! Nothing is retried automatically; the user has to go back through intake.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Supported audio formats for helpful error messages
pub const SUPPORTED_FORMATS: &str = "WAV, MP3, FLAC, AAC";

/// Top-level error type for batcall operations
#[derive(Debug, Error)]
pub enum BatcallError {
    // =========================================================================
    // Intake errors - recovered locally
    // =========================================================================
    #[error("Cannot accept '{name}': {reason}\n  Supported formats: {SUPPORTED_FORMATS}")]
    Validation { name: String, reason: String },

    #[error("No audio file selected\n  Tip: Select a recording before starting the analysis")]
    NoCandidateSelected,

    #[error("An analysis is already running\n  Tip: Wait for it to finish or select a new file to cancel it")]
    RunInProgress,

    // =========================================================================
    // Run errors - terminate the run
    // =========================================================================
    #[error("Analysis failed: {message}")]
    PipelineFailed { message: String },

    #[error("Analysis cancelled")]
    Cancelled,

    #[error("{phase} phase exceeded its {}s ceiling", .limit.as_secs_f64())]
    PhaseTimeout { phase: String, limit: Duration },

    #[error("Invalid phase transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Analyzer error: {reason}")]
    AnalysisError { reason: String },

    // =========================================================================
    // Setup and output errors
    // =========================================================================
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Cannot write output to '{path}': {reason}\n  Tip: Check write permissions for the output directory")]
    OutputError { path: PathBuf, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for batcall operations
pub type Result<T> = std::result::Result<T, BatcallError>;

impl BatcallError {
    /// Returns true if this error is recovered at intake (does not touch any run)
    pub fn is_recoverable(&self) -> bool {
        matches!(self, BatcallError::Validation { .. })
    }

    /// Returns true if this error ended a run that had already started
    pub fn is_run_failure(&self) -> bool {
        matches!(
            self,
            BatcallError::PipelineFailed { .. }
                | BatcallError::Cancelled
                | BatcallError::PhaseTimeout { .. }
        )
    }

    /// Create a validation error for a named file
    pub fn validation(name: impl Into<String>, reason: impl Into<String>) -> Self {
        BatcallError::Validation {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create a pipeline failure carrying a user-visible message
    pub fn pipeline_failed(message: impl Into<String>) -> Self {
        BatcallError::PipelineFailed {
            message: message.into(),
        }
    }

    /// Create an output error, checking for common issues
    pub fn output_error(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        let path = path.into();
        let reason = match err.kind() {
            std::io::ErrorKind::PermissionDenied => {
                format!("Permission denied. Check that you have write access to {}", path.display())
            }
            std::io::ErrorKind::NotFound => {
                format!(
                    "Directory does not exist: {}",
                    path.parent().map(|p| p.display().to_string()).unwrap_or_default()
                )
            }
            _ => err.to_string(),
        };
        BatcallError::OutputError { path, reason }
    }
}
