//! Non-fatal diagnostics collected during a run.

use serde::{Deserialize, Serialize};

/// Which stage produced a warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// Directory traversal below the root failed for one entry.
    Walk,
    /// A dependency manifest could not be parsed or read.
    Manifest,
    /// The root README could not be read.
    Readme,
    /// The text-generation service failed and the report fell back.
    Generation,
}

impl std::fmt::Display for WarningKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WarningKind::Walk => write!(f, "walk"),
            WarningKind::Manifest => write!(f, "manifest"),
            WarningKind::Readme => write!(f, "readme"),
            WarningKind::Generation => write!(f, "generation"),
        }
    }
}

/// A recorded, non-fatal problem.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Warning {
    pub kind: WarningKind,
    /// Relative path of the offending file, when there is one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub message: String,
}

impl Warning {
    pub fn new(kind: WarningKind, path: Option<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            path,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.path {
            Some(path) => write!(f, "[{}] {}: {}", self.kind, path, self.message),
            None => write!(f, "[{}] {}", self.kind, self.message),
        }
    }
}
