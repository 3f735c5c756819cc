//! Run orchestration: walk, classify, extract, parse manifests, aggregate.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use indicatif::ProgressBar;
use rayon::prelude::*;

use crate::aggregate::{PartialAggregate, ProjectAnalysis, ReadmeText, RunFacts};
use crate::classify::{self, Candidate, Inventory, SourceFile};
use crate::config::AnalysisConfig;
use crate::error::PipelineError;
use crate::extract::{self, ExtractionError, ExtractionRecord, FailureReason};
use crate::manifest::{self, ParsedManifest};
use crate::warning::{Warning, WarningKind};

/// Shared flag checked before each file is extracted.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// One analysis run over a directory.
pub struct Pipeline {
    root: PathBuf,
    config: AnalysisConfig,
    cancel: CancellationToken,
    progress: ProgressBar,
}

impl Pipeline {
    /// Create a pipeline for `root`. The config is expected to be validated.
    pub fn new<P: AsRef<Path>>(root: P, config: AnalysisConfig) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            config,
            cancel: CancellationToken::new(),
            progress: ProgressBar::hidden(),
        }
    }

    /// Use an externally owned cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Report per-file progress on `bar`. Its length is set by `run`.
    pub fn with_progress(mut self, bar: ProgressBar) -> Self {
        self.progress = bar;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Run the analysis.
    ///
    /// Fails only when the root cannot be read. Everything else ends up as
    /// data on the returned analysis.
    pub fn run(&self) -> Result<ProjectAnalysis, PipelineError> {
        tracing::info!(root = %self.root.display(), "starting analysis");

        let Inventory {
            candidates,
            manifests,
            readme,
            excluded_by_pattern,
            mut warnings,
        } = classify::scan(&self.root, &self.config)?;

        let classification = classify::classify_all(candidates, &self.config);
        let mut exclusions = classification.exclusions;
        exclusions.excluded_by_pattern = excluded_by_pattern;
        let files = classification.files;
        if classification.truncated {
            tracing::warn!(
                max_files = self.config.max_files,
                dropped = exclusions.over_file_cap,
                "file cap reached, analysis truncated"
            );
        }

        self.progress.set_length(files.len() as u64);

        let work = || {
            rayon::join(
                || self.extract_all(&files),
                || self.parse_manifests(&manifests),
            )
        };
        let (partial, (parsed_manifests, manifest_warnings)) =
            match rayon::ThreadPoolBuilder::new().num_threads(self.config.workers).build() {
                Ok(pool) => pool.install(work),
                Err(err) => {
                    tracing::warn!(error = %err, "cannot build worker pool, using the global pool");
                    work()
                }
            };
        self.progress.finish_and_clear();
        warnings.extend(manifest_warnings);

        let cancelled = partial.len() < files.len();
        if cancelled {
            tracing::warn!(
                processed = partial.len(),
                classified = files.len(),
                "analysis cancelled"
            );
        }

        let readme = readme.and_then(|candidate| match self.read_readme(&candidate) {
            Ok(text) => Some(ReadmeText {
                path: candidate.path,
                text,
            }),
            Err(warning) => {
                warnings.push(warning);
                None
            }
        });

        let analysis = partial.finalize(RunFacts {
            root_name: root_name(&self.root),
            manifests: parsed_manifests,
            manifest_paths: manifests.into_iter().map(|m| m.path).collect(),
            readme,
            warnings,
            exclusions,
            file_cap_exceeded: classification.truncated,
            cancelled,
            important_files_cap: self.config.important_files_cap,
        });

        tracing::info!(
            files = analysis.records.len(),
            functions = analysis.totals.functions,
            types = analysis.totals.types,
            dependencies = analysis.dependencies.len(),
            warnings = analysis.warnings.len(),
            "analysis complete"
        );
        Ok(analysis)
    }

    fn extract_all(&self, files: &[SourceFile]) -> PartialAggregate {
        files
            .par_iter()
            .fold(PartialAggregate::new, |acc, file| {
                if self.cancel.is_cancelled() {
                    return acc;
                }
                let record = self.extract_isolated(file);
                self.progress.inc(1);
                acc.add(file.clone(), record)
            })
            .reduce(PartialAggregate::new, PartialAggregate::merge)
    }

    /// Extract one file; a panicking extractor fails only that file.
    fn extract_isolated(&self, file: &SourceFile) -> ExtractionRecord {
        catch_unwind(AssertUnwindSafe(|| extract::extract_file(&self.root, file, &self.config)))
            .unwrap_or_else(|_| {
                tracing::error!(path = %file.path, language = %file.language, "extractor panicked");
                ExtractionRecord::failed(
                    &file.path,
                    &file.language,
                    file.tier,
                    ExtractionError::new(FailureReason::ParserUnavailable, "extractor panicked"),
                )
            })
    }

    fn parse_manifests(&self, manifests: &[Candidate]) -> (Vec<ParsedManifest>, Vec<Warning>) {
        let mut parsed = Vec::new();
        let mut warnings = Vec::new();
        for candidate in manifests {
            match manifest::load_manifest(&self.root, &candidate.path, candidate.size, self.config.max_file_bytes) {
                Ok(manifest) => {
                    tracing::debug!(
                        path = %candidate.path,
                        dependencies = manifest.dependencies.len(),
                        "manifest parsed"
                    );
                    parsed.push(manifest);
                }
                Err(warning) => warnings.push(warning),
            }
        }
        (parsed, warnings)
    }

    fn read_readme(&self, candidate: &Candidate) -> Result<String, Warning> {
        extract::read_bounded(&self.root.join(&candidate.path), self.config.max_file_bytes).map_err(|err| {
            tracing::warn!(path = %candidate.path, error = %err, "cannot read README");
            Warning::new(WarningKind::Readme, Some(candidate.path.clone()), err.to_string())
        })
    }
}

/// Final component of the root path, resolving `.` and friends.
fn root_name(root: &Path) -> String {
    root.canonicalize()
        .ok()
        .as_deref()
        .and_then(Path::file_name)
        .or_else(|| root.file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "project".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let temp = TempDir::new().unwrap();
        let result = Pipeline::new(temp.path().join("nope"), AnalysisConfig::default()).run();
        assert!(matches!(result, Err(PipelineError::RootUnreadable { .. })));
    }

    #[test]
    fn test_file_root_is_fatal() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "a.py", "x = 1\n");
        let result = Pipeline::new(temp.path().join("a.py"), AnalysisConfig::default()).run();
        assert!(matches!(result, Err(PipelineError::RootNotDirectory(_))));
    }

    #[test]
    fn test_cancelled_before_start() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "a.py", "def a():\n    pass\n");
        write(temp.path(), "b.py", "def b():\n    pass\n");

        let token = CancellationToken::new();
        token.cancel();
        let analysis = Pipeline::new(temp.path(), AnalysisConfig::default())
            .with_cancellation(token)
            .run()
            .unwrap();
        assert!(analysis.records.is_empty());
        assert!(analysis.truncated);
        assert!(analysis.truncated_by(crate::aggregate::TruncationCause::Cancelled));
    }

    #[test]
    fn test_manifest_and_readme_flow_through() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "README.md", "# Tool\n\nDoes things.\n");
        write(temp.path(), "requirements.txt", "requests==2.31.0\n");
        write(temp.path(), "pkg/broken/package.json", "{");
        write(temp.path(), "main.py", "import requests\n\ndef main():\n    pass\n");

        let analysis = Pipeline::new(temp.path(), AnalysisConfig::default()).run().unwrap();
        assert_eq!(analysis.dependencies.len(), 1);
        assert_eq!(analysis.dependencies[0].name, "requests");
        assert_eq!(analysis.warnings.len(), 1);
        assert_eq!(analysis.warnings[0].kind, WarningKind::Manifest);
        assert_eq!(analysis.readme_excerpt.as_deref(), Some("# Tool\n\nDoes things."));
        assert_eq!(analysis.totals.functions, 1);
        assert_eq!(analysis.totals.imports, 1);
        assert!(analysis
            .important_files
            .iter()
            .any(|f| f.path == "main.py"));
    }

    #[test]
    fn test_single_worker_matches_default() {
        let temp = TempDir::new().unwrap();
        for i in 0..12 {
            write(temp.path(), &format!("m{i}.py"), &format!("def f{i}(a, b):\n    return a\n"));
        }
        let config = AnalysisConfig {
            workers: 1,
            ..AnalysisConfig::default()
        };
        let one = Pipeline::new(temp.path(), config).run().unwrap();
        let many = Pipeline::new(temp.path(), AnalysisConfig::default()).run().unwrap();
        assert_eq!(one, many);
        assert_eq!(one.totals.functions, 12);
    }
}
