//! File classification.
//!
//! Maps a file to a language tag and a fidelity tier using only its path and
//! size. Nothing here reads file contents.

mod walk;

pub use walk::{scan, Candidate, Inventory};

use serde::{Deserialize, Serialize};

use crate::config::AnalysisConfig;

/// How an extractor treats a file, from most to least trustworthy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FidelityTier {
    /// Full syntax tree from a bundled grammar.
    ExactParse,
    /// Line-oriented regex recognition.
    PatternParse,
    /// Line and keyword counts only.
    BasicDetect,
}

impl std::fmt::Display for FidelityTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FidelityTier::ExactParse => write!(f, "exact_parse"),
            FidelityTier::PatternParse => write!(f, "pattern_parse"),
            FidelityTier::BasicDetect => write!(f, "basic_detect"),
        }
    }
}

/// The language and tier an extension resolves to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageMapping {
    pub language: String,
    pub tier: FidelityTier,
}

static DEFAULT_EXTENSIONS: phf::Map<&'static str, (&'static str, FidelityTier)> = phf::phf_map! {
    "py" => ("python", FidelityTier::ExactParse),
    "go" => ("go", FidelityTier::ExactParse),
    "rs" => ("rust", FidelityTier::ExactParse),
    "js" => ("javascript", FidelityTier::PatternParse),
    "jsx" => ("javascript", FidelityTier::PatternParse),
    "mjs" => ("javascript", FidelityTier::PatternParse),
    "cjs" => ("javascript", FidelityTier::PatternParse),
    "ts" => ("typescript", FidelityTier::PatternParse),
    "tsx" => ("typescript", FidelityTier::PatternParse),
    "mts" => ("typescript", FidelityTier::PatternParse),
    "java" => ("java", FidelityTier::PatternParse),
    "c" => ("c", FidelityTier::BasicDetect),
    "h" => ("c", FidelityTier::BasicDetect),
    "cpp" => ("cpp", FidelityTier::BasicDetect),
    "cc" => ("cpp", FidelityTier::BasicDetect),
    "cxx" => ("cpp", FidelityTier::BasicDetect),
    "hpp" => ("cpp", FidelityTier::BasicDetect),
    "hh" => ("cpp", FidelityTier::BasicDetect),
    "cs" => ("csharp", FidelityTier::BasicDetect),
    "kt" => ("kotlin", FidelityTier::BasicDetect),
    "kts" => ("kotlin", FidelityTier::BasicDetect),
    "rb" => ("ruby", FidelityTier::BasicDetect),
    "php" => ("php", FidelityTier::BasicDetect),
    "swift" => ("swift", FidelityTier::BasicDetect),
};

/// Look up the built-in mapping for a lowercase extension.
pub fn default_mapping(extension: &str) -> Option<LanguageMapping> {
    DEFAULT_EXTENSIONS
        .get(extension)
        .map(|(language, tier)| LanguageMapping {
            language: (*language).to_string(),
            tier: *tier,
        })
}

/// A file accepted for extraction.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceFile {
    /// Path relative to the analyzed root, `/`-separated.
    pub path: String,
    pub language: String,
    pub size: u64,
    pub tier: FidelityTier,
}

/// Why a single file was not classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Exclusion {
    UnsupportedExtension,
    TooLarge,
}

/// Per-reason counts of files that were seen but not analyzed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExclusionCounts {
    pub unsupported_extension: usize,
    pub too_large: usize,
    pub over_file_cap: usize,
    pub excluded_by_pattern: usize,
}

impl ExclusionCounts {
    pub fn total(&self) -> usize {
        self.unsupported_extension + self.too_large + self.over_file_cap + self.excluded_by_pattern
    }
}

/// Result of classifying a whole candidate set.
#[derive(Debug, Clone, Default)]
pub struct Classification {
    /// Accepted files, sorted by path, at most `max_files` long.
    pub files: Vec<SourceFile>,
    pub exclusions: ExclusionCounts,
    /// Set when eligible files were dropped by the file cap.
    pub truncated: bool,
}

/// Classify one file from its relative path and size.
pub fn classify(path: &str, size: u64, config: &AnalysisConfig) -> Result<SourceFile, Exclusion> {
    let mapping = extension_of(path)
        .and_then(|ext| config.language_for(ext))
        .ok_or(Exclusion::UnsupportedExtension)?;

    if size > config.max_file_bytes {
        return Err(Exclusion::TooLarge);
    }

    Ok(SourceFile {
        path: path.to_string(),
        language: mapping.language,
        size,
        tier: mapping.tier,
    })
}

/// Classify a candidate set and apply the file cap.
///
/// Candidates are sorted by path first, so which files survive the cap does
/// not depend on enumeration order.
pub fn classify_all(mut candidates: Vec<Candidate>, config: &AnalysisConfig) -> Classification {
    candidates.sort_by(|a, b| a.path.cmp(&b.path));

    let mut result = Classification::default();
    for candidate in candidates {
        match classify(&candidate.path, candidate.size, config) {
            Ok(file) if result.files.len() < config.max_files => result.files.push(file),
            Ok(_) => {
                result.exclusions.over_file_cap += 1;
                result.truncated = true;
            }
            Err(Exclusion::UnsupportedExtension) => result.exclusions.unsupported_extension += 1,
            Err(Exclusion::TooLarge) => {
                tracing::debug!(path = %candidate.path, size = candidate.size, "file exceeds max_file_bytes");
                result.exclusions.too_large += 1;
            }
        }
    }
    result
}

/// Extension of the final path component, without the dot.
fn extension_of(path: &str) -> Option<&str> {
    let name = path.rsplit('/').next().unwrap_or(path);
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => Some(ext),
        _ => None,
    }
}
