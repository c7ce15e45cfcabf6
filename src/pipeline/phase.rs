//! Pipeline phase state machine
//!
//! `Idle -> Uploading -> Processing -> Complete`, with `Failed` reachable from
//! `Uploading` and `Processing`. `Complete` and `Failed` are terminal.
//! Progress only exists while a phase that reports it is active.

use crate::error::{BatcallError, Result};
use serde::Serialize;
use std::fmt;

/// Ordered labels of the processing sub-steps
pub const PROCESSING_STEPS: [&str; 6] = [
    "Converting audio format",
    "Generating spectrogram",
    "Applying noise reduction",
    "Running bat detection model",
    "Identifying species",
    "Finalizing analysis",
];

/// Payload-free view of a phase, used for transition checks and events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PhaseKind {
    Idle,
    Uploading,
    Processing,
    Complete,
    Failed,
}

impl PhaseKind {
    /// Whether the state machine allows moving from `self` to `next`
    pub fn can_transition_to(self, next: PhaseKind) -> bool {
        use PhaseKind::*;
        matches!(
            (self, next),
            (Idle, Uploading)
                | (Uploading, Processing)
                | (Processing, Complete)
                | (Uploading, Failed)
                | (Processing, Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, PhaseKind::Complete | PhaseKind::Failed)
    }
}

impl fmt::Display for PhaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PhaseKind::Idle => "Idle",
            PhaseKind::Uploading => "Uploading",
            PhaseKind::Processing => "Processing",
            PhaseKind::Complete => "Complete",
            PhaseKind::Failed => "Failed",
        };
        f.write_str(name)
    }
}

/// Current state of one submission
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub enum PipelinePhase {
    #[default]
    Idle,
    Uploading {
        /// Percent, 0 - 100
        progress: f64,
    },
    Processing {
        /// Percent, 0 - 100
        progress: f64,
        /// Index into `PROCESSING_STEPS` of the last visited step
        step: Option<usize>,
    },
    Complete,
    Failed {
        message: String,
    },
}

impl PipelinePhase {
    pub fn kind(&self) -> PhaseKind {
        match self {
            PipelinePhase::Idle => PhaseKind::Idle,
            PipelinePhase::Uploading { .. } => PhaseKind::Uploading,
            PipelinePhase::Processing { .. } => PhaseKind::Processing,
            PipelinePhase::Complete => PhaseKind::Complete,
            PipelinePhase::Failed { .. } => PhaseKind::Failed,
        }
    }

    /// Progress of the active phase, if it reports any
    pub fn progress(&self) -> Option<f64> {
        match self {
            PipelinePhase::Uploading { progress } | PipelinePhase::Processing { progress, .. } => {
                Some(*progress)
            }
            _ => None,
        }
    }

    /// Label of the last visited processing step
    pub fn step_label(&self) -> Option<&'static str> {
        match self {
            PipelinePhase::Processing { step: Some(i), .. } => PROCESSING_STEPS.get(*i).copied(),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.kind().is_terminal()
    }

    fn transition(&self, next: PipelinePhase) -> Result<PipelinePhase> {
        if self.kind().can_transition_to(next.kind()) {
            Ok(next)
        } else {
            Err(BatcallError::InvalidTransition {
                from: self.kind().to_string(),
                to: next.kind().to_string(),
            })
        }
    }

    /// Enter `Uploading` with progress reset to 0
    pub fn begin_upload(&self) -> Result<PipelinePhase> {
        self.transition(PipelinePhase::Uploading { progress: 0.0 })
    }

    /// Enter `Processing` with progress reset to 0
    ///
    /// Only allowed once the upload reached 100.
    pub fn begin_processing(&self) -> Result<PipelinePhase> {
        if let PipelinePhase::Uploading { progress } = self {
            if *progress < 100.0 {
                return Err(BatcallError::InvalidTransition {
                    from: format!("Uploading at {}%", progress),
                    to: PhaseKind::Processing.to_string(),
                });
            }
        }
        self.transition(PipelinePhase::Processing {
            progress: 0.0,
            step: None,
        })
    }

    /// Enter `Complete`
    ///
    /// Only allowed once every processing step was visited.
    pub fn complete(&self) -> Result<PipelinePhase> {
        if let PipelinePhase::Processing { step, .. } = self {
            if *step != Some(PROCESSING_STEPS.len() - 1) {
                return Err(BatcallError::InvalidTransition {
                    from: format!("Processing at step {:?}", step),
                    to: PhaseKind::Complete.to_string(),
                });
            }
        }
        self.transition(PipelinePhase::Complete)
    }

    /// Enter `Failed` with a user-visible message
    pub fn fail(&self, message: impl Into<String>) -> Result<PipelinePhase> {
        self.transition(PipelinePhase::Failed {
            message: message.into(),
        })
    }

    /// Record upload progress
    ///
    /// Progress is clamped to [0, 100] and may not go backwards.
    pub fn with_upload_progress(&self, percent: f64) -> Result<PipelinePhase> {
        match self {
            PipelinePhase::Uploading { progress } => Ok(PipelinePhase::Uploading {
                progress: advance(*progress, percent, PhaseKind::Uploading)?,
            }),
            other => Err(not_reporting(other.kind(), PhaseKind::Uploading)),
        }
    }

    /// Record that processing step `index` was reached
    ///
    /// Steps must be visited in order, one at a time. Progress is
    /// `(index + 1) * 100 / steps`, which lands exactly on 100 for the last one.
    pub fn with_processing_step(&self, index: usize) -> Result<PipelinePhase> {
        match self {
            PipelinePhase::Processing { progress, step } => {
                let expected = step.map_or(0, |s| s + 1);
                if index != expected || index >= PROCESSING_STEPS.len() {
                    return Err(BatcallError::InvalidTransition {
                        from: format!("Processing at step {:?}", step),
                        to: format!("Processing step {}", index),
                    });
                }
                let target = (index + 1) as f64 * 100.0 / PROCESSING_STEPS.len() as f64;
                Ok(PipelinePhase::Processing {
                    progress: advance(*progress, target, PhaseKind::Processing)?,
                    step: Some(index),
                })
            }
            other => Err(not_reporting(other.kind(), PhaseKind::Processing)),
        }
    }
}

fn advance(current: f64, next: f64, phase: PhaseKind) -> Result<f64> {
    let next = next.clamp(0.0, 100.0);
    if next < current {
        return Err(BatcallError::InvalidTransition {
            from: format!("{} at {}%", phase, current),
            to: format!("{} at {}%", phase, next),
        });
    }
    Ok(next)
}

fn not_reporting(actual: PhaseKind, wanted: PhaseKind) -> BatcallError {
    BatcallError::InvalidTransition {
        from: actual.to_string(),
        to: format!("{} progress", wanted),
    }
}
