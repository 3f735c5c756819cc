//! Aggregation of per-file records into one [`ProjectAnalysis`].
//!
//! Workers fold records into [`PartialAggregate`]s which are merged in any
//! order; [`PartialAggregate::finalize`] sorts everything so the result
//! does not depend on scheduling.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::classify::{ExclusionCounts, FidelityTier, SourceFile};
use crate::extract::{ExtractionOutcome, ExtractionRecord, Structure};
use crate::manifest::{DependencyDeclaration, ManifestSummary, ParsedManifest};
use crate::warning::Warning;

/// Lines of the root README kept in the analysis.
pub const README_EXCERPT_LINES: usize = 50;

/// Files listed under "largest files".
pub const LARGEST_FILES: usize = 5;

/// File names that mark a program entry point, per language.
static ENTRY_POINTS: phf::Map<&'static str, &'static [&'static str]> = phf::phf_map! {
    "python" => &["__main__.py", "main.py", "app.py", "manage.py", "wsgi.py", "asgi.py", "cli.py"],
    "javascript" => &["index.js", "main.js", "app.js", "server.js", "index.jsx", "index.mjs"],
    "typescript" => &["index.ts", "main.ts", "app.ts", "server.ts", "index.tsx", "main.tsx"],
    "go" => &["main.go"],
    "rust" => &["main.rs", "lib.rs"],
    "java" => &["Main.java", "Application.java", "App.java"],
    "c" => &["main.c"],
    "cpp" => &["main.cpp", "main.cc"],
    "csharp" => &["Program.cs"],
    "kotlin" => &["Main.kt", "Application.kt"],
};

/// Whether `path` is a recognized entry point for `language`.
pub fn is_entry_point(language: &str, path: &str) -> bool {
    let name = path.rsplit('/').next().unwrap_or(path);
    ENTRY_POINTS
        .get(language)
        .is_some_and(|names| names.contains(&name))
}

/// Summed structural counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuralTotals {
    pub functions: usize,
    pub types: usize,
    pub imports: usize,
    /// Parsed-tier files that extracted completely.
    pub files_parsed: usize,
    pub files_partial: usize,
    pub files_failed: usize,
    /// BasicDetect files that were read successfully.
    pub files_signal_only: usize,
}

impl StructuralTotals {
    fn add(&mut self, record: &ExtractionRecord) {
        self.functions += record.function_count();
        self.types += record.type_count();
        self.imports += record.import_count();
        match (&record.outcome, &record.structure) {
            (ExtractionOutcome::Failed(_), _) => self.files_failed += 1,
            (ExtractionOutcome::Partial(_), _) => self.files_partial += 1,
            (ExtractionOutcome::Complete, Structure::Parsed(_)) => self.files_parsed += 1,
            (ExtractionOutcome::Complete, Structure::Signals(_)) => self.files_signal_only += 1,
        }
    }

    fn merge(&mut self, other: &StructuralTotals) {
        self.functions += other.functions;
        self.types += other.types;
        self.imports += other.imports;
        self.files_parsed += other.files_parsed;
        self.files_partial += other.files_partial;
        self.files_failed += other.files_failed;
        self.files_signal_only += other.files_signal_only;
    }

    /// Number of records these totals were built from.
    pub fn files(&self) -> usize {
        self.files_parsed + self.files_partial + self.files_failed + self.files_signal_only
    }
}

/// Why an analysis covers fewer files than the tree holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TruncationCause {
    FileCapExceeded,
    Cancelled,
}

impl std::fmt::Display for TruncationCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TruncationCause::FileCapExceeded => write!(f, "file cap exceeded"),
            TruncationCause::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Why a file was picked as important. Variant order is priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportanceReason {
    Manifest,
    EntryPoint,
    Readme,
}

impl std::fmt::Display for ImportanceReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImportanceReason::Manifest => write!(f, "dependency manifest"),
            ImportanceReason::EntryPoint => write!(f, "entry point"),
            ImportanceReason::Readme => write!(f, "readme"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportantFile {
    pub path: String,
    pub reason: ImportanceReason,
}

/// Per-worker accumulator. Merging is commutative up to the ordering that
/// `finalize` imposes.
#[derive(Debug, Default)]
pub struct PartialAggregate {
    files: Vec<SourceFile>,
    records: Vec<ExtractionRecord>,
    languages: BTreeMap<String, usize>,
    tiers: BTreeMap<FidelityTier, usize>,
    totals: StructuralTotals,
}

impl PartialAggregate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one processed file into the accumulator.
    pub fn add(mut self, file: SourceFile, record: ExtractionRecord) -> Self {
        *self.languages.entry(file.language.clone()).or_insert(0) += 1;
        *self.tiers.entry(file.tier).or_insert(0) += 1;
        self.totals.add(&record);
        self.files.push(file);
        self.records.push(record);
        self
    }

    pub fn merge(mut self, other: PartialAggregate) -> Self {
        for (language, count) in other.languages {
            *self.languages.entry(language).or_insert(0) += count;
        }
        for (tier, count) in other.tiers {
            *self.tiers.entry(tier).or_insert(0) += count;
        }
        self.totals.merge(&other.totals);
        self.files.extend(other.files);
        self.records.extend(other.records);
        self
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Combine with the run-level facts into the final, sorted analysis.
    pub fn finalize(self, run: RunFacts) -> ProjectAnalysis {
        let PartialAggregate {
            mut files,
            mut records,
            languages,
            tiers,
            totals,
        } = self;
        files.sort();
        records.sort_by(|a, b| a.path.cmp(&b.path));

        let mut dependencies = Vec::new();
        let mut manifests = Vec::new();
        for parsed in run.manifests {
            dependencies.extend(parsed.dependencies);
            manifests.push(parsed.summary);
        }
        dependencies.sort();
        manifests.sort_by(|a, b| a.path.cmp(&b.path));

        let mut warnings = run.warnings;
        warnings.sort();

        let mut truncation_causes = Vec::new();
        if run.file_cap_exceeded {
            truncation_causes.push(TruncationCause::FileCapExceeded);
        }
        if run.cancelled {
            truncation_causes.push(TruncationCause::Cancelled);
        }

        let important_files = select_important(
            &run.manifest_paths,
            &files,
            run.readme.as_ref().map(|r| r.path.as_str()),
            run.important_files_cap,
        );

        let mut largest_files = files.clone();
        largest_files.sort_by(|a, b| b.size.cmp(&a.size).then_with(|| a.path.cmp(&b.path)));
        largest_files.truncate(LARGEST_FILES);

        let project_name = manifests
            .iter()
            .filter(|m| !m.path.contains('/'))
            .find_map(|m| m.name.clone())
            .unwrap_or(run.root_name);

        ProjectAnalysis {
            project_name,
            files,
            records,
            languages,
            tiers,
            totals,
            dependencies,
            manifests,
            warnings,
            exclusions: run.exclusions,
            truncated: !truncation_causes.is_empty(),
            truncation_causes,
            important_files,
            readme_excerpt: run.readme.and_then(|r| excerpt(&r.text)),
            largest_files,
        }
    }
}

/// The root README as read by the pipeline.
#[derive(Debug, Clone)]
pub struct ReadmeText {
    pub path: String,
    pub text: String,
}

/// Run-level inputs to [`PartialAggregate::finalize`].
#[derive(Debug, Default)]
pub struct RunFacts {
    /// Name of the analyzed directory; used when no root manifest names the project.
    pub root_name: String,
    pub manifests: Vec<ParsedManifest>,
    /// Every recognized manifest, parsed or not.
    pub manifest_paths: Vec<String>,
    pub readme: Option<ReadmeText>,
    pub warnings: Vec<Warning>,
    pub exclusions: ExclusionCounts,
    pub file_cap_exceeded: bool,
    pub cancelled: bool,
    pub important_files_cap: usize,
}

/// The aggregate of one run. Never mutated after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectAnalysis {
    pub project_name: String,
    /// Files that were processed, sorted by path.
    pub files: Vec<SourceFile>,
    /// One record per processed file, sorted by path.
    pub records: Vec<ExtractionRecord>,
    /// Processed files per language, failed ones included.
    pub languages: BTreeMap<String, usize>,
    pub tiers: BTreeMap<FidelityTier, usize>,
    pub totals: StructuralTotals,
    pub dependencies: Vec<DependencyDeclaration>,
    pub manifests: Vec<ManifestSummary>,
    pub warnings: Vec<Warning>,
    pub exclusions: ExclusionCounts,
    pub truncated: bool,
    pub truncation_causes: Vec<TruncationCause>,
    pub important_files: Vec<ImportantFile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readme_excerpt: Option<String>,
    pub largest_files: Vec<SourceFile>,
}

impl ProjectAnalysis {
    pub fn record(&self, path: &str) -> Option<&ExtractionRecord> {
        self.records
            .binary_search_by(|r| r.path.as_str().cmp(path))
            .ok()
            .map(|idx| &self.records[idx])
    }

    /// Records whose extraction failed.
    pub fn failures(&self) -> impl Iterator<Item = &ExtractionRecord> {
        self.records.iter().filter(|r| r.is_failed())
    }

    /// Languages by descending file count, ties by name.
    pub fn languages_by_count(&self) -> Vec<(&str, usize)> {
        let mut langs: Vec<_> = self.languages.iter().map(|(l, c)| (l.as_str(), *c)).collect();
        langs.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        langs
    }

    pub fn truncated_by(&self, cause: TruncationCause) -> bool {
        self.truncation_causes.contains(&cause)
    }
}

fn depth(path: &str) -> usize {
    path.matches('/').count()
}

fn select_important(
    manifest_paths: &[String],
    files: &[SourceFile],
    readme: Option<&str>,
    cap: usize,
) -> Vec<ImportantFile> {
    let mut picked: Vec<ImportantFile> = manifest_paths
        .iter()
        .map(|path| ImportantFile {
            path: path.clone(),
            reason: ImportanceReason::Manifest,
        })
        .chain(
            files
                .iter()
                .filter(|f| is_entry_point(&f.language, &f.path))
                .map(|f| ImportantFile {
                    path: f.path.clone(),
                    reason: ImportanceReason::EntryPoint,
                }),
        )
        .chain(readme.map(|path| ImportantFile {
            path: path.to_string(),
            reason: ImportanceReason::Readme,
        }))
        .collect();

    picked.sort_by(|a, b| {
        a.reason
            .cmp(&b.reason)
            .then_with(|| depth(&a.path).cmp(&depth(&b.path)))
            .then_with(|| a.path.cmp(&b.path))
    });
    picked.dedup_by(|a, b| a.path == b.path);
    picked.truncate(cap);
    picked
}

fn excerpt(text: &str) -> Option<String> {
    let lines: Vec<&str> = text.lines().take(README_EXCERPT_LINES).collect();
    let joined = lines.join("\n").trim().to_string();
    (!joined.is_empty()).then_some(joined)
}
