//! Directory traversal.

use std::fs;
use std::path::Path;

use walkdir::{DirEntry, WalkDir};

use crate::config::AnalysisConfig;
use crate::error::PipelineError;
use crate::manifest;
use crate::warning::{Warning, WarningKind};

/// Directory names that never contain first-party sources.
const PRUNED_DIRS: &[&str] = &[
    "node_modules",
    "vendor",
    "target",
    "dist",
    "build",
    "__pycache__",
    "venv",
    ".venv",
    ".git",
];

/// A file found by the walk, before classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Path relative to the root, `/`-separated.
    pub path: String,
    pub size: u64,
}

/// Everything the walk found, routed by consumer.
#[derive(Debug, Default)]
pub struct Inventory {
    /// Files for the classifier.
    pub candidates: Vec<Candidate>,
    /// Recognized dependency manifests, sorted by path.
    pub manifests: Vec<Candidate>,
    /// README at the root, if any.
    pub readme: Option<Candidate>,
    pub excluded_by_pattern: usize,
    pub warnings: Vec<Warning>,
}

/// Walk `root` and sort what it contains.
///
/// Fails only when the root itself is missing, unreadable or not a
/// directory. Errors further down become warnings.
pub fn scan(root: &Path, config: &AnalysisConfig) -> Result<Inventory, PipelineError> {
    let display = root.display().to_string();
    let metadata = fs::metadata(root).map_err(|source| PipelineError::RootUnreadable {
        path: display.clone(),
        source,
    })?;
    if !metadata.is_dir() {
        return Err(PipelineError::RootNotDirectory(display));
    }
    fs::read_dir(root).map_err(|source| PipelineError::RootUnreadable {
        path: display.clone(),
        source,
    })?;

    // validate() already rejected bad globs; an unbuildable set excludes nothing.
    let exclusions = config.exclusion_set().unwrap_or_else(|_| globset::GlobSet::empty());
    let mut inventory = Inventory::default();

    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_pruned(entry));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                if err.depth() == 0 {
                    let source = err
                        .into_io_error()
                        .unwrap_or_else(|| std::io::Error::other("walk failed at root"));
                    return Err(PipelineError::RootUnreadable {
                        path: display,
                        source,
                    });
                }
                let path = err
                    .path()
                    .and_then(|p| relative_path(root, p));
                tracing::warn!(path = ?path, error = %err, "skipping unreadable entry");
                inventory
                    .warnings
                    .push(Warning::new(WarningKind::Walk, path, err.to_string()));
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }
        let Some(rel) = relative_path(root, entry.path()) else {
            continue;
        };

        if exclusions.is_match(&rel) {
            inventory.excluded_by_pattern += 1;
            continue;
        }

        let size = match entry.metadata() {
            Ok(metadata) => metadata.len(),
            Err(err) => {
                tracing::warn!(path = %rel, error = %err, "cannot stat file");
                inventory
                    .warnings
                    .push(Warning::new(WarningKind::Walk, Some(rel), err.to_string()));
                continue;
            }
        };

        let name = entry.file_name().to_string_lossy();
        let candidate = Candidate { path: rel, size };
        if manifest::is_manifest(&name) {
            inventory.manifests.push(candidate);
        } else if entry.depth() == 1 && is_readme(&name) && inventory.readme.is_none() {
            inventory.readme = Some(candidate);
        } else {
            inventory.candidates.push(candidate);
        }
    }

    inventory.manifests.sort_by(|a, b| a.path.cmp(&b.path));
    tracing::debug!(
        candidates = inventory.candidates.len(),
        manifests = inventory.manifests.len(),
        "walk complete"
    );
    Ok(inventory)
}

fn is_pruned(entry: &DirEntry) -> bool {
    if !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || PRUNED_DIRS.contains(&name.as_ref())
}

/// Whether a root-level file name is a README.
pub fn is_readme(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    matches!(
        lower.as_str(),
        "readme" | "readme.md" | "readme.markdown" | "readme.rst" | "readme.txt"
    )
}

fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<_> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}
