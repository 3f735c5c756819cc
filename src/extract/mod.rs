//! Structural extraction, one strategy per fidelity tier.
//!
//! ```text
//! SourceFile ──▶ read (bounded) ──▶ ExactParse   (tree-sitter)
//!                                 ├▶ PatternParse (line regexes)
//!                                 └▶ BasicDetect  (line/keyword counts)
//!                                          │
//!                                          ▼
//!                                   ExtractionRecord
//! ```
//!
//! Every entry point returns a record; nothing here returns an error or
//! panics past the file boundary.

pub mod basic;
pub mod exact;
mod facts;
pub mod pattern;

pub use facts::{
    ExtractionError, ExtractionOutcome, ExtractionRecord, FailureReason, FunctionSignature,
    ImportReference, PresenceSignals, StructuralData, Structure, TypeDeclaration, TypeKind,
};

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::classify::{FidelityTier, SourceFile};
use crate::config::AnalysisConfig;

/// Read and extract one file relative to `root`.
pub fn extract_file(root: &Path, file: &SourceFile, config: &AnalysisConfig) -> ExtractionRecord {
    match read_bounded(&root.join(&file.path), config.max_file_bytes) {
        Ok(source) => extract_source(file, &source, config),
        Err(err) => {
            tracing::warn!(path = %file.path, error = %err, "read failed");
            ExtractionRecord::failed(
                &file.path,
                &file.language,
                file.tier,
                ExtractionError::new(FailureReason::ReadFailed, err.to_string()),
            )
        }
    }
}

/// Extract from source text already in memory.
pub fn extract_source(file: &SourceFile, source: &str, config: &AnalysisConfig) -> ExtractionRecord {
    let (structure, outcome) = match file.tier {
        FidelityTier::ExactParse => exact::extract(&file.language, source),
        FidelityTier::PatternParse => pattern::extract(&file.language, source, config.max_line_bytes),
        FidelityTier::BasicDetect => basic::extract(&file.language, source),
    };

    if let Some(err) = match &outcome {
        ExtractionOutcome::Complete => None,
        ExtractionOutcome::Partial(e) | ExtractionOutcome::Failed(e) => Some(e),
    } {
        tracing::debug!(path = %file.path, language = %file.language, reason = %err.reason, "extraction incomplete");
    }

    ExtractionRecord {
        path: file.path.clone(),
        language: file.language.clone(),
        tier: file.tier,
        structure,
        outcome,
    }
}

/// Read at most `max_bytes` and decode lossily.
///
/// The file was size-checked at classification time; reading one byte past
/// the limit catches files that grew in between.
pub fn read_bounded(path: &Path, max_bytes: u64) -> std::io::Result<String> {
    let file = File::open(path)?;
    let mut buf = Vec::new();
    file.take(max_bytes.saturating_add(1)).read_to_end(&mut buf)?;
    if buf.len() as u64 > max_bytes {
        return Err(std::io::Error::other(format!(
            "file grew beyond {max_bytes} bytes after classification"
        )));
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn source_file(path: &str, language: &str, tier: FidelityTier) -> SourceFile {
        SourceFile {
            path: path.to_string(),
            language: language.to_string(),
            size: 0,
            tier,
        }
    }

    #[test]
    fn test_missing_file_is_read_failure() {
        let temp = TempDir::new().unwrap();
        let file = source_file("gone.py", "python", FidelityTier::ExactParse);
        let record = extract_file(temp.path(), &file, &AnalysisConfig::default());
        assert!(record.is_failed());
        assert_eq!(record.error().unwrap().reason, FailureReason::ReadFailed);
    }

    #[test]
    fn test_grown_file_is_read_failure() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("big.go"), "package main\n").unwrap();
        let config = AnalysisConfig {
            max_file_bytes: 4,
            ..AnalysisConfig::default()
        };
        let file = source_file("big.go", "go", FidelityTier::ExactParse);
        let record = extract_file(temp.path(), &file, &config);
        assert_eq!(record.error().unwrap().reason, FailureReason::ReadFailed);
    }

    #[test]
    fn test_invalid_utf8_is_decoded_lossily() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("x.rb"), b"def a\n\xff\xfe\nend\n").unwrap();
        let file = source_file("x.rb", "ruby", FidelityTier::BasicDetect);
        let record = extract_file(temp.path(), &file, &AnalysisConfig::default());
        assert_eq!(record.outcome, ExtractionOutcome::Complete);
        match record.structure {
            Structure::Signals(signals) => assert_eq!(signals.line_count, 3),
            other => panic!("unexpected structure: {other:?}"),
        }
    }
}
