//! Output formatting.
//!
//! - Markdown: the report as a document
//! - JSON: the report or the raw analysis, for programmatic consumption
//! - Summary: colored terminal overview, written to stderr

use std::fmt::Write;

use colored::*;
use serde::Serialize;

use crate::aggregate::ProjectAnalysis;

use super::{Report, SectionStatus};

/// Render the report as Markdown. Output depends only on the report, so
/// identical reports render byte-identically.
pub fn to_markdown(report: &Report) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# {}\n", report.project_name);

    for section in &report.sections {
        let _ = writeln!(out, "## {}\n", section.title);
        let body = section.body.trim();
        if section.status == SectionStatus::Placeholder {
            let _ = writeln!(out, "_{body}_\n");
        } else {
            let _ = writeln!(out, "{body}\n");
        }
    }

    if !report.warnings.is_empty() {
        out.push_str("---\n\n");
        for warning in &report.warnings {
            let _ = writeln!(out, "> **Note:** {warning}");
        }
    }
    let trimmed = out.trim_end().len();
    out.truncate(trimmed);
    out.push('\n');
    out
}

/// Pretty-printed JSON for a report or an analysis.
pub fn to_json<T: Serialize>(value: &T) -> serde_json::Result<String> {
    let mut json = serde_json::to_string_pretty(value)?;
    json.push('\n');
    Ok(json)
}

/// Print a short colored overview of a run to stderr.
pub fn write_summary(path: &str, analysis: &ProjectAnalysis, report: &Report) {
    eprintln!();
    eprint!("  ");
    eprint!("{}", "repolens".cyan().bold());
    eprintln!(" v{}", env!("CARGO_PKG_VERSION"));
    eprintln!();

    eprint!("  {}", "Analyzed: ".dimmed());
    eprintln!("{}", path);
    eprint!("  {}", "Project:  ".dimmed());
    eprintln!("{}", analysis.project_name);
    eprintln!();

    let t = &analysis.totals;
    eprintln!(
        "  {} files  {} functions  {} types  {} imports  {} dependencies",
        analysis.records.len().to_string().bold(),
        t.functions.to_string().bold(),
        t.types.to_string().bold(),
        t.imports.to_string().bold(),
        analysis.dependencies.len().to_string().bold()
    );

    let langs: Vec<String> = analysis
        .languages_by_count()
        .iter()
        .map(|(l, c)| format!("{l} {c}"))
        .collect();
    if !langs.is_empty() {
        eprintln!("  {}{}", "Languages: ".dimmed(), langs.join(", "));
    }

    if t.files_failed > 0 || t.files_partial > 0 {
        eprintln!(
            "  {} {} failed, {} partial",
            "!".yellow().bold(),
            t.files_failed,
            t.files_partial
        );
    }
    if analysis.truncated {
        let causes: Vec<String> = analysis
            .truncation_causes
            .iter()
            .map(|c| c.to_string())
            .collect();
        eprintln!("  {} truncated: {}", "!".yellow().bold(), causes.join(", "));
    }
    for warning in analysis.warnings.iter().chain(&report.warnings) {
        eprintln!("  {} {}", "warning:".yellow(), warning);
    }

    let placeholders = report.placeholder_count();
    eprintln!();
    eprintln!(
        "  {} {}/{} sections populated",
        "✓".green().bold(),
        report.sections.len() - placeholders,
        report.sections.len()
    );
    eprintln!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{ReportMode, Section, SectionKind};
    use crate::warning::{Warning, WarningKind};

    fn report() -> Report {
        Report {
            project_name: "demo".to_string(),
            mode: ReportMode::Structured,
            sections: vec![
                Section::populated(SectionKind::ProjectOverview, "A demo.\n"),
                Section::placeholder(SectionKind::Dependencies, "No dependency manifest was found."),
            ],
            warnings: vec![Warning::new(WarningKind::Generation, None, "timed out")],
        }
    }

    #[test]
    fn test_markdown_layout() {
        let md = to_markdown(&report());
        assert_eq!(
            md,
            "# demo\n\n## Project Overview\n\nA demo.\n\n## Dependencies\n\n_Not detected. No dependency manifest was found._\n\n---\n\n> **Note:** [generation] timed out\n"
        );
    }

    #[test]
    fn test_json_round_trip_fields() {
        let json = to_json(&report()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["mode"], "structured");
        assert_eq!(value["sections"][1]["status"], "placeholder");
        assert_eq!(value["sections"][1]["kind"], "dependencies");
        assert_eq!(value["warnings"][0]["kind"], "generation");
    }
}
