//! Core data types for batcall
//!
//! These types represent the domain model and flow from intake, through the
//! pipeline, to the results presenter.

use crate::error::{BatcallError, Result};
use hash32::FnvHasher;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hasher;
use std::path::{Path, PathBuf};

/// Upload size ceiling: 50 MiB
pub const MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;

// =============================================================================
// Supported formats
// =============================================================================

/// Audio formats accepted at intake
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaType {
    Wav,
    Mp3,
    Flac,
    Aac,
}

impl MediaType {
    /// Detect format from file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "wav" => Some(MediaType::Wav),
            "mp3" => Some(MediaType::Mp3),
            "flac" => Some(MediaType::Flac),
            "aac" => Some(MediaType::Aac),
            _ => None,
        }
    }

    /// Detect format from a MIME type such as `audio/x-wav`
    ///
    /// `audio/mp4` is ambiguous (it also covers ALAC and others) and is
    /// only accepted when the extension says AAC.
    pub fn from_mime(mime: &str, extension: Option<&str>) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or("").trim().to_lowercase();
        match essence.as_str() {
            "audio/wav" | "audio/x-wav" | "audio/wave" | "audio/vnd.wave" => Some(MediaType::Wav),
            "audio/mpeg" | "audio/mp3" => Some(MediaType::Mp3),
            "audio/flac" | "audio/x-flac" => Some(MediaType::Flac),
            "audio/aac" | "audio/x-aac" | "audio/aacp" => Some(MediaType::Aac),
            "audio/mp4" => extension
                .and_then(Self::from_extension)
                .filter(|t| *t == MediaType::Aac),
            _ => None,
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MediaType::Wav => "WAV",
            MediaType::Mp3 => "MP3",
            MediaType::Flac => "FLAC",
            MediaType::Aac => "AAC",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Intake
// =============================================================================

/// A file reference as handed over by the user, before validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRef {
    /// Display name, usually the file name
    pub name: String,
    /// Size in bytes
    pub size_bytes: u64,
    /// Declared MIME type, if the source provided one
    pub mime: Option<String>,
    /// Location on disk, if the file came from the local filesystem
    pub path: Option<PathBuf>,
}

impl FileRef {
    pub fn new(name: impl Into<String>, size_bytes: u64) -> Self {
        Self {
            name: name.into(),
            size_bytes,
            mime: None,
            path: None,
        }
    }

    /// Attach a declared MIME type
    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }

    /// Extension of the display name, if any
    pub fn extension(&self) -> Option<&str> {
        Path::new(&self.name).extension().and_then(|e| e.to_str())
    }
}

/// A validated file awaiting confirmation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadCandidate {
    pub name: String,
    pub size_bytes: u64,
    pub media_type: MediaType,
    /// Location on disk, if known; never read by the core
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<PathBuf>,
}

impl UploadCandidate {
    /// Size in mebibytes, for display
    pub fn size_mb(&self) -> f64 {
        self.size_bytes as f64 / (1024.0 * 1024.0)
    }
}

// =============================================================================
// Media references
// =============================================================================

/// Opaque reference to media served by a resolver
///
/// The core only creates and passes these around; it never looks inside.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaRef(String);

impl MediaRef {
    /// Reference to the uploaded audio of a candidate
    pub fn audio_for(candidate: &UploadCandidate) -> Self {
        MediaRef(format!(
            "media:audio/{:08x}/{}",
            candidate_id(candidate),
            candidate.name
        ))
    }

    /// Reference to the visualization generated for a candidate
    pub fn visualization_for(candidate: &UploadCandidate) -> Self {
        MediaRef(format!("media:visualization/{:08x}", candidate_id(candidate)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MediaRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Deterministic 32-bit id for a candidate
///
/// FNV-1a over the lowercased name and the size, so the same file selected
/// twice maps to the same references.
pub fn candidate_id(candidate: &UploadCandidate) -> u32 {
    use hash32::Hasher as Hash32Hasher;

    let mut hasher = FnvHasher::default();
    hasher.write(candidate.name.to_lowercase().as_bytes());
    hasher.write(&candidate.size_bytes.to_le_bytes());
    hasher.finish32()
}

// =============================================================================
// Analysis results
// =============================================================================

/// One timestamped classification outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionEvent {
    /// Seconds from the start of the recording
    pub timestamp: f64,
    /// Confidence score (0.0 - 1.0)
    pub confidence: f64,
    /// Species label
    pub species: String,
}

impl DetectionEvent {
    pub fn new(timestamp: f64, confidence: f64, species: impl Into<String>) -> Self {
        Self {
            timestamp,
            confidence,
            species: species.into(),
        }
    }
}

/// Terminal artifact of a successful pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Whether any bat call was detected
    pub bat_detected: bool,
    /// Overall run confidence (0.0 - 1.0)
    pub confidence: f64,
    /// Detection events in chronological order
    pub detections: Vec<DetectionEvent>,
    /// Representative species label; absent when nothing was detected
    pub primary_species: Option<String>,
    /// Reference to the analyzed audio
    pub audio: MediaRef,
    /// Name of the source file
    pub file_name: String,
    /// Total length in seconds
    pub duration: f64,
    /// Reference to the visualization
    pub visualization: MediaRef,
    /// Backend that produced the result
    pub analyzer: String,
    /// Timestamp of analysis
    pub analyzed_at: chrono::DateTime<chrono::Utc>,
}

impl AnalysisResult {
    /// Latest detection timestamp, if any
    pub fn last_detection_time(&self) -> Option<f64> {
        self.detections
            .iter()
            .map(|d| d.timestamp)
            .fold(None, |acc, t| Some(acc.map_or(t, |a: f64| a.max(t))))
    }

    /// Check the invariants the presenter relies on
    ///
    /// A result that fails here is never delivered.
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: String| Err(BatcallError::AnalysisError { reason });

        if !self.duration.is_finite() || self.duration < 0.0 {
            return invalid(format!("duration {} is not a valid length", self.duration));
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return invalid(format!("overall confidence {} outside [0, 1]", self.confidence));
        }
        if self.bat_detected == self.detections.is_empty() {
            return invalid(format!(
                "bat_detected is {} but there are {} detections",
                self.bat_detected,
                self.detections.len()
            ));
        }
        if self.primary_species.is_some() == self.detections.is_empty() {
            return invalid("primary species must be set exactly when detections exist".to_string());
        }
        for (i, d) in self.detections.iter().enumerate() {
            if !(0.0..=self.duration).contains(&d.timestamp) {
                return invalid(format!(
                    "detection {} at {}s lies outside [0, {}]",
                    i, d.timestamp, self.duration
                ));
            }
            if !(0.0..=1.0).contains(&d.confidence) {
                return invalid(format!(
                    "detection {} confidence {} outside [0, 1]",
                    i, d.confidence
                ));
            }
        }
        Ok(())
    }
}

// =============================================================================
// Species reference data
// =============================================================================

/// External link shown alongside a species profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceLink {
    pub title: String,
    pub url: String,
}

/// Static descriptive data for one species
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeciesProfile {
    /// Common name, used as the lookup key
    pub label: String,
    pub scientific_name: String,
    pub description: String,
    pub habitat: String,
    pub diet: String,
    pub size: String,
    /// Echolocation band, e.g. "25-30 kHz"
    pub call_frequency: String,
    pub conservation_status: String,
    #[serde(default)]
    pub facts: Vec<String>,
    #[serde(default)]
    pub links: Vec<ReferenceLink>,
}
