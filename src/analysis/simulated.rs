//! Simulated analyzer
//!
//! Fabricates plausible detections at random. It never looks at the audio;
//! it only stands in for a real classifier behind the [`Analyzer`] trait.

use crate::analysis::primary::primary_species;
use crate::analysis::traits::Analyzer;
use crate::error::{BatcallError, Result};
use crate::types::{AnalysisResult, DetectionEvent, MediaRef, UploadCandidate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;
use tracing::debug;

/// Recording length reported for every simulated run, in seconds
pub const DEFAULT_DURATION_SECS: f64 = 12.5;

/// Detection count range per run
const MIN_DETECTIONS: usize = 1;
const MAX_DETECTIONS: usize = 5;

/// Confidence range of a single simulated detection
const MIN_CONFIDENCE: f64 = 0.6;
const MAX_CONFIDENCE: f64 = 0.98;

/// Random result source
pub struct SimulatedAnalyzer {
    rng: Mutex<StdRng>,
    labels: Vec<String>,
    duration: f64,
}

impl SimulatedAnalyzer {
    /// Entropy-seeded simulator drawing labels from `labels`
    pub fn new(labels: Vec<String>) -> Result<Self> {
        Self::from_rng(StdRng::from_os_rng(), labels)
    }

    /// Reproducible simulator
    pub fn with_seed(seed: u64, labels: Vec<String>) -> Result<Self> {
        Self::from_rng(StdRng::seed_from_u64(seed), labels)
    }

    fn from_rng(rng: StdRng, labels: Vec<String>) -> Result<Self> {
        if labels.is_empty() {
            return Err(BatcallError::ConfigError(
                "simulated analyzer needs at least one species label".to_string(),
            ));
        }
        Ok(Self {
            rng: Mutex::new(rng),
            labels,
            duration: DEFAULT_DURATION_SECS,
        })
    }

    /// Report a different recording length
    pub fn with_duration(mut self, seconds: f64) -> Result<Self> {
        if !seconds.is_finite() || seconds <= 0.0 {
            return Err(BatcallError::ConfigError(format!(
                "simulated duration must be positive, got {}",
                seconds
            )));
        }
        self.duration = seconds;
        Ok(self)
    }
}

impl Analyzer for SimulatedAnalyzer {
    fn analyze(&self, candidate: &UploadCandidate) -> Result<AnalysisResult> {
        let mut rng = self
            .rng
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let count = rng.random_range(MIN_DETECTIONS..=MAX_DETECTIONS);
        let mut timestamps: Vec<f64> = (0..count)
            .map(|_| round_to(rng.random_range(0.0..=self.duration), 10.0).min(self.duration))
            .collect();
        timestamps.sort_by(f64::total_cmp);

        let detections: Vec<DetectionEvent> = timestamps
            .into_iter()
            .map(|timestamp| {
                let confidence = round_to(rng.random_range(MIN_CONFIDENCE..MAX_CONFIDENCE), 100.0);
                let label = &self.labels[rng.random_range(0..self.labels.len())];
                DetectionEvent::new(timestamp, confidence, label.clone())
            })
            .collect();

        let confidence = if detections.is_empty() {
            0.0
        } else {
            detections.iter().map(|d| d.confidence).sum::<f64>() / detections.len() as f64
        };

        debug!(
            "Simulated {} detections for {} (confidence {:.2})",
            detections.len(),
            candidate.name,
            confidence
        );

        Ok(AnalysisResult {
            bat_detected: !detections.is_empty(),
            confidence,
            primary_species: primary_species(&detections),
            detections,
            audio: MediaRef::audio_for(candidate),
            file_name: candidate.name.clone(),
            duration: self.duration,
            visualization: MediaRef::visualization_for(candidate),
            analyzer: self.name().to_string(),
            analyzed_at: chrono::Utc::now(),
        })
    }

    fn name(&self) -> &'static str {
        "simulated"
    }
}

fn round_to(value: f64, scale: f64) -> f64 {
    (value * scale).round() / scale
}
