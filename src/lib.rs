//! repolens - polyglot repository analysis and documentation synthesis.
//!
//! repolens walks a directory tree, extracts structural facts from each
//! source file, parses dependency manifests, and synthesizes a ten-section
//! project report.
//!
//! # Architecture
//!
//! A run flows through these stages:
//!
//! - `classify`: walk the tree, apply exclusions, assign a language and a fidelity tier
//! - `extract`: per-file extraction (Exact via tree-sitter, Pattern via regex, Basic presence signals)
//! - `manifest`: dependency manifest parsers (npm, pip, Maven, Cargo, Go)
//! - `aggregate`: order-independent merge of per-file records into a `ProjectAnalysis`
//! - `pipeline`: drives the stages on a bounded worker pool, with cancellation
//! - `report`: Structured or Enhanced report synthesis and rendering
//!
//! # Adding a New Language
//!
//! Exact languages live in `src/extract/exact/languages/`. Implement
//! `SyntaxExtractor`, wire it into `exact::syntax_for` and `exact::has_grammar`,
//! then map the extension in `classify::default_mapping`.

pub mod aggregate;
pub mod classify;
pub mod cli;
pub mod config;
pub mod error;
pub mod extract;
pub mod manifest;
pub mod pipeline;
pub mod report;
pub mod warning;

use std::path::Path;

pub use aggregate::{ImportanceReason, ImportantFile, ProjectAnalysis, StructuralTotals, TruncationCause};
pub use classify::{FidelityTier, SourceFile};
pub use config::{AnalysisConfig, ConfigError};
pub use error::PipelineError;
pub use extract::{ExtractionOutcome, ExtractionRecord};
pub use manifest::{DependencyDeclaration, DependencyScope, Ecosystem, ParsedManifest};
pub use pipeline::{CancellationToken, Pipeline};
pub use report::{Report, ReportMode, ReportSynthesizer, Section, SectionKind};
pub use warning::{Warning, WarningKind};

/// Analyze `root` with `config` and no cancellation.
pub fn analyze<P: AsRef<Path>>(root: P, config: AnalysisConfig) -> Result<ProjectAnalysis, PipelineError> {
    Pipeline::new(root, config).run()
}
