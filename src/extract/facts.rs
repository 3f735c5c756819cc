//! Records produced by the structural extractors.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::classify::FidelityTier;

/// A function, method or arrow-function binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionSignature {
    pub name: String,
    /// Parameter names in declaration order, as written.
    pub parameters: Vec<String>,
    /// 1-indexed line of the definition.
    pub start_line: usize,
    /// Leading doc comment or docstring, markers stripped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_comment: Option<String>,
}

/// Kind of type declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    Class,
    Interface,
    Struct,
    Enum,
}

impl TypeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeKind::Class => "class",
            TypeKind::Interface => "interface",
            TypeKind::Struct => "struct",
            TypeKind::Enum => "enum",
        }
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A class, interface, struct or trait.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDeclaration {
    pub name: String,
    pub kind: TypeKind,
    /// Superclasses, implemented interfaces, trait bounds or embedded types.
    pub base_names: Vec<String>,
    /// Methods, fields and nested declarations directly in the body.
    pub member_count: usize,
    pub start_line: usize,
}

/// An import, use, require or re-export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReference {
    pub module: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    pub is_relative: bool,
    pub line: usize,
}

/// Structural facts from ExactParse or PatternParse.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuralData {
    pub functions: Vec<FunctionSignature>,
    pub types: Vec<TypeDeclaration>,
    pub imports: Vec<ImportReference>,
}

impl StructuralData {
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty() && self.types.is_empty() && self.imports.is_empty()
    }
}

/// Presence signals from BasicDetect. Never counted as structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceSignals {
    pub line_count: usize,
    /// Whole-word occurrences per keyword.
    pub keyword_counts: BTreeMap<String, usize>,
}

/// A record's payload, fixed by the file's tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "data")]
pub enum Structure {
    Parsed(StructuralData),
    Signals(PresenceSignals),
}

/// Why extraction stopped or lost data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    SyntaxError,
    ReadFailed,
    LineTooLong,
    ParserUnavailable,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::SyntaxError => write!(f, "syntax error"),
            FailureReason::ReadFailed => write!(f, "read failed"),
            FailureReason::LineTooLong => write!(f, "line too long"),
            FailureReason::ParserUnavailable => write!(f, "parser unavailable"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionError {
    pub reason: FailureReason,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

impl ExtractionError {
    pub fn new(reason: FailureReason, message: impl Into<String>) -> Self {
        Self {
            reason,
            message: message.into(),
            line: None,
        }
    }

    pub fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }
}

impl fmt::Display for ExtractionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{} at line {}: {}", self.reason, line, self.message),
            None => write!(f, "{}: {}", self.reason, self.message),
        }
    }
}

/// Per-file outcome. Partial keeps whatever was collected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionOutcome {
    Complete,
    Partial(ExtractionError),
    Failed(ExtractionError),
}

/// The single extraction result for one SourceFile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionRecord {
    pub path: String,
    pub language: String,
    pub tier: FidelityTier,
    pub structure: Structure,
    pub outcome: ExtractionOutcome,
}

impl ExtractionRecord {
    /// A failed record with no structural data.
    pub fn failed(path: &str, language: &str, tier: FidelityTier, error: ExtractionError) -> Self {
        let structure = match tier {
            FidelityTier::BasicDetect => Structure::Signals(PresenceSignals::default()),
            _ => Structure::Parsed(StructuralData::default()),
        };
        Self {
            path: path.to_string(),
            language: language.to_string(),
            tier,
            structure,
            outcome: ExtractionOutcome::Failed(error),
        }
    }

    /// Structural data, if this record carries any.
    pub fn parsed(&self) -> Option<&StructuralData> {
        match &self.structure {
            Structure::Parsed(data) => Some(data),
            Structure::Signals(_) => None,
        }
    }

    pub fn function_count(&self) -> usize {
        self.parsed().map_or(0, |d| d.functions.len())
    }

    pub fn type_count(&self) -> usize {
        self.parsed().map_or(0, |d| d.types.len())
    }

    pub fn import_count(&self) -> usize {
        self.parsed().map_or(0, |d| d.imports.len())
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, ExtractionOutcome::Failed(_))
    }

    pub fn is_partial(&self) -> bool {
        matches!(self.outcome, ExtractionOutcome::Partial(_))
    }

    pub fn error(&self) -> Option<&ExtractionError> {
        match &self.outcome {
            ExtractionOutcome::Complete => None,
            ExtractionOutcome::Partial(e) | ExtractionOutcome::Failed(e) => Some(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signals_never_count_as_structure() {
        let record = ExtractionRecord {
            path: "a.rb".into(),
            language: "ruby".into(),
            tier: FidelityTier::BasicDetect,
            structure: Structure::Signals(PresenceSignals {
                line_count: 40,
                keyword_counts: BTreeMap::from([("def".to_string(), 12)]),
            }),
            outcome: ExtractionOutcome::Complete,
        };
        assert_eq!(record.function_count(), 0);
        assert!(record.parsed().is_none());
    }

    #[test]
    fn test_failed_record_is_empty() {
        let err = ExtractionError::new(FailureReason::SyntaxError, "unexpected token").at_line(3);
        let record = ExtractionRecord::failed("x.py", "python", FidelityTier::ExactParse, err);
        assert!(record.is_failed());
        assert_eq!(record.function_count(), 0);
        assert_eq!(record.error().unwrap().line, Some(3));
        assert_eq!(
            record.error().unwrap().to_string(),
            "syntax error at line 3: unexpected token"
        );
    }
}
