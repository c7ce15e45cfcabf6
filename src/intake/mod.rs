//! Intake: the single "current submission" slot
//!
//! Holds at most one candidate and at most one active run. Policy for the
//! slot:
//! - a new selection replaces the held candidate and cancels an active run
//!   (a rejected selection touches neither the run nor anything else but the
//!   error message);
//! - confirming while a run is active is rejected with `RunInProgress`.

pub mod candidate;

use crate::analysis::Analyzer;
use crate::error::{BatcallError, Result};
use crate::pipeline::{self, CancellationToken, PhaseCell, PipelinePhase, PipelineRun, PipelineTiming};
use crate::types::{FileRef, UploadCandidate};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub use candidate::{file_ref_from_path, IntakePolicy};

/// Link to the run started from this intake
#[derive(Debug)]
struct ActiveRun {
    token: CancellationToken,
    phase: PhaseCell,
}

impl ActiveRun {
    fn is_running(&self) -> bool {
        !self.token.is_cancelled() && !self.phase.get().is_terminal()
    }
}

/// Intake component
#[derive(Debug)]
pub struct Intake {
    policy: IntakePolicy,
    timing: PipelineTiming,
    candidate: Option<UploadCandidate>,
    error: Option<String>,
    active: Option<ActiveRun>,
}

impl Intake {
    pub fn new(policy: IntakePolicy, timing: PipelineTiming) -> Self {
        Self {
            policy,
            timing,
            candidate: None,
            error: None,
            active: None,
        }
    }

    /// Select a file, replacing any held candidate
    ///
    /// On success the error is cleared and the reported phase goes back to
    /// `Idle`. On failure the error message is recorded and no candidate is
    /// held afterwards.
    pub fn select(&mut self, file: FileRef) -> Result<&UploadCandidate> {
        match self.policy.validate(file) {
            Ok(candidate) => {
                if self.cancel() {
                    info!("New file selected, cancelled the running analysis");
                }
                self.active = None;
                self.error = None;
                Ok(self.candidate.insert(candidate))
            }
            Err(e) => Err(self.reject(e)),
        }
    }

    /// Select from a multi-file drop; only the first file is kept
    ///
    /// An empty drop changes nothing and returns `Ok(None)`.
    pub fn select_many<I>(&mut self, files: I) -> Result<Option<&UploadCandidate>>
    where
        I: IntoIterator<Item = FileRef>,
    {
        let mut files = files.into_iter();
        let Some(first) = files.next() else {
            return Ok(None);
        };
        let ignored = files.count();
        if ignored > 0 {
            debug!("Ignoring {} additional file(s), only one is accepted", ignored);
        }
        self.select(first).map(Some)
    }

    /// Select a file from the local filesystem
    pub fn select_path(&mut self, path: &Path) -> Result<&UploadCandidate> {
        match file_ref_from_path(path) {
            Ok(file) => self.select(file),
            Err(e) => Err(self.reject(e)),
        }
    }

    /// Hand the held candidate to a new pipeline run
    pub fn confirm(&mut self, analyzer: Arc<dyn Analyzer>) -> Result<PipelineRun> {
        if self.active.as_ref().is_some_and(ActiveRun::is_running) {
            return Err(BatcallError::RunInProgress);
        }
        let candidate = self
            .candidate
            .take()
            .ok_or(BatcallError::NoCandidateSelected)?;

        let run = pipeline::start(candidate, analyzer, self.timing)?;
        self.active = Some(ActiveRun {
            token: run.cancel_handle(),
            phase: run.phase_cell(),
        });
        Ok(run)
    }

    /// Abort the active run, if any; returns true if one was running
    pub fn cancel(&mut self) -> bool {
        match self.active.take() {
            Some(active) if active.is_running() => {
                active.token.cancel();
                true
            }
            _ => false,
        }
    }

    /// Candidate awaiting confirmation
    pub fn candidate(&self) -> Option<&UploadCandidate> {
        self.candidate.as_ref()
    }

    /// Whether a run started here is still in progress
    pub fn is_running(&self) -> bool {
        self.active.as_ref().is_some_and(ActiveRun::is_running)
    }

    /// Phase reported by the active run; `Idle` when there is none
    pub fn phase(&self) -> PipelinePhase {
        match &self.active {
            Some(active) if !active.token.is_cancelled() => active.phase.get(),
            _ => PipelinePhase::Idle,
        }
    }

    /// User-visible error: the last rejected selection, or the run failure
    pub fn error(&self) -> Option<String> {
        if let Some(message) = &self.error {
            return Some(message.clone());
        }
        match self.phase() {
            PipelinePhase::Failed { message } => Some(message),
            _ => None,
        }
    }

    fn reject(&mut self, error: BatcallError) -> BatcallError {
        warn!("{}", error);
        self.candidate = None;
        self.error = Some(error.to_string());
        error
    }
}

impl Default for Intake {
    fn default() -> Self {
        Self::new(IntakePolicy::default(), PipelineTiming::default())
    }
}
