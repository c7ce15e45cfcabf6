//! Results presenter
//!
//! Shapes one delivered [`AnalysisResult`] for display: a summary, a
//! selectable detection timeline, timeline markers and the species profile of
//! the primary species. The result itself is never modified.

pub mod format;
pub mod spectrogram;

use crate::species::SpeciesCatalog;
use crate::types::{AnalysisResult, DetectionEvent, SpeciesProfile};
use serde::Serialize;

pub use format::{axis_labels, format_percent, format_time, frequency_labels, ConfidenceTier};
pub use spectrogram::{marker_x, IntensityField, SpectrogramConfig, MAX_FREQUENCY_KHZ};

/// Headline figures of a result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultSummary {
    pub headline: String,
    pub file_name: String,
    pub confidence_percent: String,
    pub tier: ConfidenceTier,
    pub detection_count: usize,
    pub duration_label: String,
    pub primary_species: Option<String>,
}

/// One row of the detection timeline
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineEntry {
    pub index: usize,
    pub time_label: String,
    pub species: String,
    pub confidence_percent: String,
    pub tier: ConfidenceTier,
    pub selected: bool,
}

/// Vertical markers over the time axis
#[derive(Debug, Clone, PartialEq)]
pub struct Markers {
    /// Playback position
    pub cursor: f64,
    /// One per detection, in timeline order
    pub detections: Vec<f64>,
}

/// Presenter for a single result
#[derive(Debug, Clone)]
pub struct ResultsPresenter {
    result: AnalysisResult,
    selected: Option<usize>,
}

impl ResultsPresenter {
    /// Selection starts at the first detection, if any
    pub fn new(result: AnalysisResult) -> Self {
        let selected = if result.detections.is_empty() {
            None
        } else {
            Some(0)
        };
        Self { result, selected }
    }

    pub fn result(&self) -> &AnalysisResult {
        &self.result
    }

    /// Index of the selected detection
    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    /// Select detection `index`
    ///
    /// Out of range leaves the current selection alone and returns false.
    pub fn select(&mut self, index: usize) -> bool {
        if index < self.result.detections.len() {
            self.selected = Some(index);
            true
        } else {
            false
        }
    }

    pub fn selected_detection(&self) -> Option<&DetectionEvent> {
        self.selected.and_then(|i| self.result.detections.get(i))
    }

    pub fn summary(&self) -> ResultSummary {
        let result = &self.result;
        ResultSummary {
            headline: if result.bat_detected {
                "Bats detected".to_string()
            } else {
                "No bats detected".to_string()
            },
            file_name: result.file_name.clone(),
            confidence_percent: format_percent(result.confidence),
            tier: ConfidenceTier::from_confidence(result.confidence),
            detection_count: result.detections.len(),
            duration_label: format_time(result.duration),
            primary_species: result.primary_species.clone(),
        }
    }

    pub fn timeline(&self) -> Vec<TimelineEntry> {
        self.result
            .detections
            .iter()
            .enumerate()
            .map(|(index, d)| TimelineEntry {
                index,
                time_label: format_time(d.timestamp),
                species: d.species.clone(),
                confidence_percent: format_percent(d.confidence),
                tier: ConfidenceTier::from_confidence(d.confidence),
                selected: self.selected == Some(index),
            })
            .collect()
    }

    /// Profile of the result's primary species
    ///
    /// Labels missing from the catalog get its fallback profile. `None` when
    /// the result has no primary species.
    pub fn species_profile<'a>(&self, catalog: &'a dyn SpeciesCatalog) -> Option<&'a SpeciesProfile> {
        let label = self.result.primary_species.as_deref()?;
        Some(catalog.profile_for(label))
    }

    /// Profile for the species of the selected detection
    pub fn selected_profile<'a>(&self, catalog: &'a dyn SpeciesCatalog) -> Option<&'a SpeciesProfile> {
        self.selected_detection()
            .map(|d| catalog.profile_for(&d.species))
    }

    /// Marker positions on a track `width` units wide
    pub fn markers(&self, current_time: f64, width: f64) -> Markers {
        let duration = self.result.duration;
        Markers {
            cursor: marker_x(current_time, duration, width),
            detections: self
                .result
                .detections
                .iter()
                .map(|d| marker_x(d.timestamp, duration, width))
                .collect(),
        }
    }

    pub fn axis_labels(&self) -> [String; 5] {
        axis_labels(self.result.duration)
    }

    /// Synthetic field for this result
    pub fn intensity_field(&self, config: SpectrogramConfig, seed: u64) -> IntensityField {
        IntensityField::generate(config, self.result.duration, &self.result.detections, seed)
    }
}
