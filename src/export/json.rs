//! JSON report for interoperability with other tools

use crate::error::{BatcallError, Result};
use crate::presenter::{ResultSummary, ResultsPresenter};
use crate::types::AnalysisResult;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tracing::{debug, info};

/// JSON report schema version
const SCHEMA_VERSION: &str = "1.0";

/// Top-level report structure
#[derive(Debug, Serialize)]
pub struct BatcallReport<'a> {
    /// Schema version for forward compatibility
    pub version: &'static str,
    pub metadata: ReportMetadata,
    pub result: &'a AnalysisResult,
    pub summary: ResultSummary,
}

/// Report metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// batcall version that generated this file
    pub generator_version: String,
    /// RFC 3339 timestamp of export
    pub exported_at: String,
}

/// Owned form of a report, as read back from disk
#[derive(Debug, Deserialize)]
pub struct StoredReport {
    pub version: String,
    pub metadata: ReportMetadata,
    pub result: AnalysisResult,
}

/// Write a report for the presenter's result
///
/// Uses atomic write pattern: writes to a temp file first, then renames.
pub fn write_report(presenter: &ResultsPresenter, output_path: &Path) -> Result<()> {
    // Same directory keeps the rename on one filesystem
    let temp_path = output_path.with_extension("json.tmp");

    let file = File::create(&temp_path).map_err(|e| BatcallError::OutputError {
        path: output_path.to_path_buf(),
        reason: format!("Failed to create temp file: {}", e),
    })?;

    let report = BatcallReport {
        version: SCHEMA_VERSION,
        metadata: ReportMetadata {
            generator_version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: chrono::Utc::now().to_rfc3339(),
        },
        result: presenter.result(),
        summary: presenter.summary(),
    };

    serde_json::to_writer_pretty(BufWriter::new(file), &report).map_err(|e| {
        let _ = std::fs::remove_file(&temp_path);
        BatcallError::OutputError {
            path: output_path.to_path_buf(),
            reason: e.to_string(),
        }
    })?;

    std::fs::rename(&temp_path, output_path).map_err(|e| {
        let _ = std::fs::remove_file(&temp_path);
        BatcallError::OutputError {
            path: output_path.to_path_buf(),
            reason: format!("Failed to finalize file: {}", e),
        }
    })?;

    info!(
        "Wrote report for {} to {}",
        report.result.file_name,
        output_path.display()
    );
    Ok(())
}

/// Read a report back
pub fn read_report(path: &Path) -> Result<StoredReport> {
    let file = File::open(path).map_err(|e| BatcallError::OutputError {
        path: path.to_path_buf(),
        reason: format!("Failed to open report: {}", e),
    })?;
    let report: StoredReport =
        serde_json::from_reader(BufReader::new(file)).map_err(|e| BatcallError::OutputError {
            path: path.to_path_buf(),
            reason: format!("Failed to parse report: {}", e),
        })?;
    debug!(
        "Read report v{} for {} from {}",
        report.version,
        report.result.file_name,
        path.display()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{Analyzer, SimulatedAnalyzer};
    use crate::types::{MediaType, UploadCandidate};
    use tempfile::TempDir;

    fn presenter() -> ResultsPresenter {
        let candidate = UploadCandidate {
            name: "colony.wav".to_string(),
            size_bytes: 10 * 1024 * 1024,
            media_type: MediaType::Wav,
            source: None,
        };
        let analyzer = SimulatedAnalyzer::with_seed(9, vec!["Big Brown Bat".to_string()]).unwrap();
        ResultsPresenter::new(analyzer.analyze(&candidate).unwrap())
    }

    #[test]
    fn test_write_and_read_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("report.json");
        let presenter = presenter();

        write_report(&presenter, &path).unwrap();
        assert!(!dir.path().join("report.json.tmp").exists());

        let stored = read_report(&path).unwrap();
        assert_eq!(stored.version, SCHEMA_VERSION);
        assert_eq!(stored.metadata.generator_version, env!("CARGO_PKG_VERSION"));
        assert_eq!(stored.result.file_name, "colony.wav");
        assert_eq!(
            stored.result.detections.len(),
            presenter.result().detections.len()
        );

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["summary"]["headline"], "Bats detected");
        assert_eq!(
            raw["summary"]["tier"],
            serde_json::to_value(presenter.summary().tier).unwrap()
        );
        assert_eq!(raw["result"]["audio"], presenter.result().audio.as_str());
    }

    #[test]
    fn test_unwritable_destination() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("report.json");
        assert!(matches!(
            write_report(&presenter(), &path),
            Err(BatcallError::OutputError { .. })
        ));
    }
}
