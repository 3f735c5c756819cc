//! Dependency manifest parsing.
//!
//! Parsers are pure functions from manifest text to a [`ParsedManifest`].
//! A parser failure never aborts a run: the caller records zero
//! declarations for that manifest plus a warning.
//!
//! ```text
//! ManifestParser trait
//!     ├── NpmManifest           package.json
//!     ├── RequirementsManifest  requirements*.txt
//!     ├── PyProjectManifest     pyproject.toml
//!     ├── PipfileManifest       Pipfile
//!     ├── MavenManifest         pom.xml
//!     ├── CargoManifest         Cargo.toml
//!     └── GoModManifest         go.mod
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

mod cargo;
mod golang;
mod maven;
mod npm;
mod python;

pub use cargo::CargoManifest;
pub use golang::GoModManifest;
pub use maven::MavenManifest;
pub use npm::NpmManifest;
pub use python::{PipfileManifest, PyProjectManifest, RequirementsManifest};

use crate::warning::{Warning, WarningKind};

/// Package ecosystem a declaration belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ecosystem {
    Npm,
    Pip,
    Maven,
    Other,
}

impl fmt::Display for Ecosystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ecosystem::Npm => write!(f, "npm"),
            Ecosystem::Pip => write!(f, "pip"),
            Ecosystem::Maven => write!(f, "maven"),
            Ecosystem::Other => write!(f, "other"),
        }
    }
}

/// Declared scope of a dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyScope {
    Runtime,
    Dev,
    Unspecified,
}

impl fmt::Display for DependencyScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DependencyScope::Runtime => write!(f, "runtime"),
            DependencyScope::Dev => write!(f, "dev"),
            DependencyScope::Unspecified => write!(f, "unspecified"),
        }
    }
}

/// One declared dependency.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DependencyDeclaration {
    /// Relative path of the manifest that declared it.
    pub manifest: String,
    pub ecosystem: Ecosystem,
    pub name: String,
    /// Version constraint exactly as written; empty when absent.
    pub version_constraint: String,
    pub scope: DependencyScope,
}

/// Project metadata a manifest carries besides its dependencies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestSummary {
    pub path: String,
    pub ecosystem: Ecosystem,
    /// Manifest format, e.g. "package.json".
    pub format: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Named commands (npm scripts, console entry points).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub scripts: BTreeMap<String, String>,
    /// Engine or toolchain constraints (node, python, java, go, rust).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub engines: BTreeMap<String, String>,
}

impl ManifestSummary {
    pub fn new(path: &str, ecosystem: Ecosystem, format: &str) -> Self {
        Self {
            path: path.to_string(),
            ecosystem,
            format: format.to_string(),
            name: None,
            version: None,
            description: None,
            scripts: BTreeMap::new(),
            engines: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedManifest {
    pub summary: ManifestSummary,
    pub dependencies: Vec<DependencyDeclaration>,
}

impl ParsedManifest {
    pub fn new(summary: ManifestSummary) -> Self {
        Self {
            summary,
            dependencies: Vec::new(),
        }
    }

    /// Record a dependency against this manifest.
    pub fn declare(&mut self, name: &str, version_constraint: &str, scope: DependencyScope) {
        self.dependencies.push(DependencyDeclaration {
            manifest: self.summary.path.clone(),
            ecosystem: self.summary.ecosystem,
            name: name.to_string(),
            version_constraint: version_constraint.trim().to_string(),
            scope,
        });
    }
}

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("malformed manifest: {0}")]
    Malformed(String),
    #[error("manifest is {size} bytes, over the {limit} byte limit")]
    TooLarge { size: u64, limit: u64 },
    #[error("cannot read manifest: {0}")]
    Io(#[from] std::io::Error),
}

/// Parser for one manifest format.
pub trait ManifestParser: Send + Sync {
    /// Format name, used in summaries and setup hints.
    fn format(&self) -> &'static str;

    fn ecosystem(&self) -> Ecosystem;

    /// Whether this parser handles a file with the given name.
    fn matches(&self, file_name: &str) -> bool;

    /// Parse manifest text. `path` is the manifest's relative path.
    fn parse(&self, path: &str, content: &str) -> Result<ParsedManifest, ManifestError>;
}

static PARSERS: &[&dyn ManifestParser] = &[
    &NpmManifest,
    &RequirementsManifest,
    &PyProjectManifest,
    &PipfileManifest,
    &MavenManifest,
    &CargoManifest,
    &GoModManifest,
];

/// Find the parser for a file name.
pub fn parser_for(file_name: &str) -> Option<&'static dyn ManifestParser> {
    PARSERS.iter().copied().find(|p| p.matches(file_name))
}

/// Whether a file name is a recognized manifest.
pub fn is_manifest(file_name: &str) -> bool {
    parser_for(file_name).is_some()
}

/// Parse manifest text, dispatching on the path's file name.
pub fn parse_manifest(path: &str, content: &str) -> Result<ParsedManifest, ManifestError> {
    let file_name = path.rsplit('/').next().unwrap_or(path);
    let parser = parser_for(file_name)
        .ok_or_else(|| ManifestError::Malformed(format!("{file_name} is not a recognized manifest")))?;
    parser.parse(path, content)
}

/// Read and parse one manifest under `root`, turning any failure into a
/// warning.
pub fn load_manifest(root: &Path, path: &str, size: u64, max_bytes: u64) -> Result<ParsedManifest, Warning> {
    let result = if size > max_bytes {
        Err(ManifestError::TooLarge {
            size,
            limit: max_bytes,
        })
    } else {
        crate::extract::read_bounded(&root.join(path), max_bytes)
            .map_err(ManifestError::from)
            .and_then(|content| parse_manifest(path, &content))
    };

    result.map_err(|err| {
        tracing::warn!(path = %path, error = %err, "manifest skipped");
        Warning::new(WarningKind::Manifest, Some(path.to_string()), err.to_string())
    })
}

/// Common utility functions for manifest parsing.
pub mod utils {
    /// Extract the package name from a requirement string.
    ///
    /// - `requests>=2.0` → `requests`
    /// - `package[extra]>=1.0` → `package`
    /// - `name @ https://...` → `name`
    pub fn extract_package_name(req: &str) -> String {
        req.split(|c: char| matches!(c, '=' | '>' | '<' | '~' | '!' | '[' | ';' | ',' | '@' | '(') || c.is_whitespace())
            .next()
            .unwrap_or("")
            .trim()
            .to_string()
    }

    /// Split a PEP 508 requirement into name and raw constraint.
    ///
    /// Extras and environment markers are dropped; the constraint keeps its
    /// operators as written. Returns None for options (`-r`, `-e`),
    /// comments and bare URLs.
    pub fn parse_requirement(line: &str) -> Option<(String, String)> {
        let line = match line.find(" #") {
            Some(idx) => &line[..idx],
            None => line,
        }
        .trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('-') || line.contains("://") && !line.contains('@') {
            return None;
        }

        let spec = line.split(';').next().unwrap_or("").trim();
        let name = extract_package_name(spec);
        if name.is_empty() || !name.starts_with(|c: char| c.is_ascii_alphanumeric()) {
            return None;
        }

        let mut rest = spec[name.len()..].trim_start();
        if rest.starts_with('[') {
            rest = rest.find(']').map_or("", |end| &rest[end + 1..]).trim_start();
        }
        let constraint = rest.trim_start_matches('(').trim_end_matches(')').trim();
        Some((name, constraint.to_string()))
    }

    /// Group names that hold development-only dependencies.
    pub fn is_dev_group(name: &str) -> bool {
        let lower = name.to_ascii_lowercase();
        matches!(
            lower.as_str(),
            "dev" | "develop" | "development" | "test" | "tests" | "testing" | "lint" | "linting" | "docs" | "doc" | "typing"
        )
    }

}
