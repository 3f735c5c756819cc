//! Report synthesis.
//!
//! A report always has the same ten sections in the same order. Structured
//! mode fills them from the analysis alone; Enhanced mode asks a
//! [`TextGenerator`] for prose and falls back to Structured on any failure.

pub mod enhanced;
pub mod generator;
pub mod render;
mod structured;

use serde::{Deserialize, Serialize};

use crate::aggregate::ProjectAnalysis;
use crate::warning::{Warning, WarningKind};
use generator::{GenerationBudget, TextGenerator};

/// Body prefix of every placeholder section.
pub const NOT_DETECTED: &str = "Not detected.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    ProjectOverview,
    KeyFeatures,
    ProjectStructure,
    TechnologyStack,
    Dependencies,
    ImportantFiles,
    SetupAndInstallation,
    UsageGuide,
    DevelopmentGuidelines,
    KnownIssues,
}

impl SectionKind {
    /// Every section, in report order.
    pub const ALL: [SectionKind; 10] = [
        SectionKind::ProjectOverview,
        SectionKind::KeyFeatures,
        SectionKind::ProjectStructure,
        SectionKind::TechnologyStack,
        SectionKind::Dependencies,
        SectionKind::ImportantFiles,
        SectionKind::SetupAndInstallation,
        SectionKind::UsageGuide,
        SectionKind::DevelopmentGuidelines,
        SectionKind::KnownIssues,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            SectionKind::ProjectOverview => "Project Overview",
            SectionKind::KeyFeatures => "Key Features",
            SectionKind::ProjectStructure => "Project Structure",
            SectionKind::TechnologyStack => "Technology Stack",
            SectionKind::Dependencies => "Dependencies",
            SectionKind::ImportantFiles => "Important Files",
            SectionKind::SetupAndInstallation => "Setup & Installation",
            SectionKind::UsageGuide => "Usage Guide",
            SectionKind::DevelopmentGuidelines => "Development Guidelines",
            SectionKind::KnownIssues => "Known Issues & Future Improvements",
        }
    }
}

impl std::fmt::Display for SectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.title())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionStatus {
    Populated,
    Placeholder,
}

/// Where a section's body came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionOrigin {
    /// Filled from the analysis by template.
    Derived,
    /// Written by the text generator.
    Generated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub kind: SectionKind,
    pub title: String,
    pub status: SectionStatus,
    pub origin: SectionOrigin,
    /// Markdown body, without the heading.
    pub body: String,
}

impl Section {
    pub fn populated(kind: SectionKind, body: impl Into<String>) -> Self {
        Self {
            kind,
            title: kind.title().to_string(),
            status: SectionStatus::Populated,
            origin: SectionOrigin::Derived,
            body: body.into(),
        }
    }

    /// A section with nothing to show. `hint` says what was looked for.
    pub fn placeholder(kind: SectionKind, hint: &str) -> Self {
        Self {
            kind,
            title: kind.title().to_string(),
            status: SectionStatus::Placeholder,
            origin: SectionOrigin::Derived,
            body: format!("{NOT_DETECTED} {hint}"),
        }
    }

    pub fn generated(kind: SectionKind, body: impl Into<String>) -> Self {
        Self {
            origin: SectionOrigin::Generated,
            ..Self::populated(kind, body)
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.status == SectionStatus::Placeholder
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportMode {
    Structured,
    Enhanced,
}

/// The emitted document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub project_name: String,
    /// Enhanced only when generated text was actually used.
    pub mode: ReportMode,
    pub sections: Vec<Section>,
    /// Problems during synthesis. Analysis warnings stay on the analysis.
    pub warnings: Vec<Warning>,
}

impl Report {
    pub fn section(&self, kind: SectionKind) -> Option<&Section> {
        self.sections.iter().find(|s| s.kind == kind)
    }

    pub fn placeholder_count(&self) -> usize {
        self.sections.iter().filter(|s| s.is_placeholder()).count()
    }
}

enum Mode {
    Structured,
    Enhanced {
        generator: Box<dyn TextGenerator>,
        budget: GenerationBudget,
        context_budget_chars: usize,
    },
}

/// Turns a [`ProjectAnalysis`] into a [`Report`].
pub struct ReportSynthesizer {
    mode: Mode,
}

impl ReportSynthesizer {
    pub fn structured() -> Self {
        Self { mode: Mode::Structured }
    }

    pub fn enhanced(generator: Box<dyn TextGenerator>, budget: GenerationBudget, context_budget_chars: usize) -> Self {
        Self {
            mode: Mode::Enhanced {
                generator,
                budget,
                context_budget_chars,
            },
        }
    }

    /// Build the report. Never fails: generator problems become a warning
    /// on a Structured report.
    pub fn synthesize(&self, analysis: &ProjectAnalysis) -> Report {
        let sections = structured::sections(analysis);
        let Mode::Enhanced {
            generator,
            budget,
            context_budget_chars,
        } = &self.mode
        else {
            return Report {
                project_name: analysis.project_name.clone(),
                mode: ReportMode::Structured,
                sections,
                warnings: Vec::new(),
            };
        };

        match enhanced::enhance(analysis, &sections, generator.as_ref(), budget, *context_budget_chars) {
            Ok(sections) => Report {
                project_name: analysis.project_name.clone(),
                mode: ReportMode::Enhanced,
                sections,
                warnings: Vec::new(),
            },
            Err(message) => {
                tracing::warn!(error = %message, "enhanced synthesis failed, using structured report");
                Report {
                    project_name: analysis.project_name.clone(),
                    mode: ReportMode::Structured,
                    sections,
                    warnings: vec![Warning::new(
                        WarningKind::Generation,
                        None,
                        format!("enhanced report unavailable, structured report used: {message}"),
                    )],
                }
            }
        }
    }
}
