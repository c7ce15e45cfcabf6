//! Analysis trait abstractions
//!
//! The pipeline only knows this interface, so a backend that really listens
//! to the recording can replace the simulator without touching the state
//! machine.

use crate::error::Result;
use crate::types::{AnalysisResult, UploadCandidate};

/// Bat call detection backend
pub trait Analyzer: Send + Sync {
    /// Produce the complete result for a confirmed candidate
    ///
    /// Called once per run, after every processing step was visited. A
    /// result that fails [`AnalysisResult::validate`] fails the run.
    fn analyze(&self, candidate: &UploadCandidate) -> Result<AnalysisResult>;

    /// Get the name of this analyzer (for logging)
    fn name(&self) -> &'static str;
}
