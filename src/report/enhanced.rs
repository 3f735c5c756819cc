//! Enhanced mode: a bounded context bundle goes to a [`TextGenerator`] and
//! the returned Markdown is split back into sections.

use std::collections::BTreeMap;
use std::fmt::Write;

use crate::aggregate::ProjectAnalysis;
use crate::extract::ExtractionRecord;

use super::generator::{GenerationBudget, TextGenerator};
use super::{Section, SectionKind};

/// Records described in detail, beyond the important files.
const MAX_DETAILED_RECORDS: usize = 40;

/// Functions and types listed per record.
const MAX_SYMBOLS_PER_RECORD: usize = 15;

/// Generate prose for every section and merge it over `structured`.
///
/// Sections the response does not cover keep their structured body. An
/// error, or a response matching no section at all, is returned as a
/// message for the caller's warning.
pub fn enhance(
    analysis: &ProjectAnalysis,
    structured: &[Section],
    generator: &dyn TextGenerator,
    budget: &GenerationBudget,
    context_budget_chars: usize,
) -> Result<Vec<Section>, String> {
    let prompt = build_context(analysis, context_budget_chars);
    let response = generator.generate(&prompt, budget).map_err(|e| e.to_string())?;

    let mut generated = split_sections(&response);
    if generated.is_empty() {
        return Err("response contained none of the expected section headings".to_string());
    }
    tracing::debug!(sections = generated.len(), "merged generated sections");

    Ok(structured
        .iter()
        .map(|section| match generated.remove(&section.kind) {
            Some(body) => Section::generated(section.kind, body),
            None => section.clone(),
        })
        .collect())
}

/// Build the prompt: instructions and totals first, then important files,
/// the highest-signal records, dependencies and the README. Whatever does
/// not fit in `budget_chars` is cut and replaced by an omission note.
pub fn build_context(analysis: &ProjectAnalysis, budget_chars: usize) -> String {
    let mut bundle = ContextBundle::new(budget_chars);

    let mut head = String::new();
    let _ = writeln!(
        head,
        "Write documentation for the project \"{}\" with exactly these sections, each under a `##` heading:",
        analysis.project_name
    );
    for kind in SectionKind::ALL {
        let _ = writeln!(head, "- {}", kind.title());
    }
    bundle.push(&head);

    let mut stats = String::from("\n# Analysis\n");
    let t = &analysis.totals;
    let _ = writeln!(
        stats,
        "files: {}, functions: {}, types: {}, imports: {}, failed files: {}",
        analysis.records.len(),
        t.functions,
        t.types,
        t.imports,
        t.files_failed
    );
    let langs: Vec<String> = analysis
        .languages_by_count()
        .iter()
        .map(|(l, c)| format!("{l} ({c})"))
        .collect();
    let _ = writeln!(stats, "languages: {}", langs.join(", "));
    if analysis.truncated {
        let _ = writeln!(stats, "note: only part of the repository was analyzed");
    }
    for manifest in &analysis.manifests {
        let _ = write!(stats, "manifest {} ({})", manifest.path, manifest.format);
        if let Some(name) = &manifest.name {
            let _ = write!(stats, " name={name}");
        }
        if let Some(description) = &manifest.description {
            let _ = write!(stats, " description={description:?}");
        }
        stats.push('\n');
    }
    if !bundle.push(&stats) {
        return bundle.finish();
    }

    let important: Vec<&str> = analysis.important_files.iter().map(|f| f.path.as_str()).collect();
    let mut section = String::from("\n# Important files\n");
    for file in &analysis.important_files {
        let _ = writeln!(section, "- {} ({})", file.path, file.reason);
        if let Some(record) = analysis.record(&file.path) {
            describe_record(&mut section, record);
        }
    }
    if !bundle.push(&section) {
        return bundle.finish();
    }

    let mut ranked: Vec<&ExtractionRecord> = analysis
        .records
        .iter()
        .filter(|r| r.parsed().is_some() && !important.contains(&r.path.as_str()))
        .collect();
    ranked.sort_by(|a, b| {
        signal(b)
            .cmp(&signal(a))
            .then_with(|| a.path.cmp(&b.path))
    });
    let mut section = String::from("\n# Source files\n");
    for record in ranked.into_iter().take(MAX_DETAILED_RECORDS) {
        let _ = writeln!(section, "- {} [{}]", record.path, record.language);
        describe_record(&mut section, record);
    }
    if !bundle.push(&section) {
        return bundle.finish();
    }

    if !analysis.dependencies.is_empty() {
        let mut section = String::from("\n# Dependencies\n");
        for dep in &analysis.dependencies {
            let _ = writeln!(
                section,
                "- {} {} ({}, {}, {})",
                dep.name, dep.version_constraint, dep.ecosystem, dep.scope, dep.manifest
            );
        }
        if !bundle.push(&section) {
            return bundle.finish();
        }
    }

    if let Some(readme) = &analysis.readme_excerpt {
        bundle.push(&format!("\n# README excerpt\n{readme}\n"));
    }
    bundle.finish()
}

fn signal(record: &ExtractionRecord) -> usize {
    record.function_count() + record.type_count()
}

fn describe_record(out: &mut String, record: &ExtractionRecord) {
    let Some(data) = record.parsed() else {
        return;
    };
    for t in data.types.iter().take(MAX_SYMBOLS_PER_RECORD) {
        let _ = writeln!(out, "  {} {} ({} members)", t.kind, t.name, t.member_count);
    }
    for f in data.functions.iter().take(MAX_SYMBOLS_PER_RECORD) {
        let _ = write!(out, "  fn {}({})", f.name, f.parameters.join(", "));
        if let Some(doc) = f.doc_comment.as_deref().and_then(|d| d.lines().next()) {
            let _ = write!(out, " - {doc}");
        }
        out.push('\n');
    }
    let extra = data.functions.len().saturating_sub(MAX_SYMBOLS_PER_RECORD)
        + data.types.len().saturating_sub(MAX_SYMBOLS_PER_RECORD);
    if extra > 0 {
        let _ = writeln!(out, "  ...{extra} more symbols");
    }
}

/// Prompt text that stops growing at a character budget.
struct ContextBundle {
    text: String,
    budget: usize,
    omitted: usize,
}

impl ContextBundle {
    fn new(budget: usize) -> Self {
        Self {
            text: String::new(),
            budget,
            omitted: 0,
        }
    }

    /// Append `chunk`, cutting it at the budget. Returns false once full.
    fn push(&mut self, chunk: &str) -> bool {
        if self.omitted > 0 {
            self.omitted += chunk.chars().count();
            return false;
        }
        let used = self.text.chars().count();
        let room = self.budget.saturating_sub(used);
        let len = chunk.chars().count();
        if len <= room {
            self.text.push_str(chunk);
            return true;
        }
        let cut = chunk.char_indices().nth(room).map_or(chunk.len(), |(idx, _)| idx);
        self.text.push_str(&chunk[..cut]);
        self.omitted = len - room;
        false
    }

    /// The note counts against the budget, so kept text is cut back to fit it.
    fn finish(mut self) -> String {
        if self.omitted > 0 {
            let note = format!(
                "\n\n[context truncated: remaining analysis omitted to fit the {} character budget]\n",
                self.budget
            );
            truncate_chars(&mut self.text, self.budget.saturating_sub(note.chars().count()));
            self.text.push_str(&note);
            truncate_chars(&mut self.text, self.budget);
        }
        self.text
    }
}

fn truncate_chars(text: &mut String, max_chars: usize) {
    if let Some((idx, _)) = text.char_indices().nth(max_chars) {
        text.truncate(idx);
    }
}

/// Split Markdown on `#`/`##` headings and map each heading to a section.
/// Unrecognized headings and text before the first heading are dropped;
/// deeper headings stay inside their section's body.
pub fn split_sections(markdown: &str) -> BTreeMap<SectionKind, String> {
    let mut sections = BTreeMap::new();
    let mut current: Option<SectionKind> = None;
    let mut body = String::new();

    let mut flush = |current: Option<SectionKind>, body: &mut String| {
        if let Some(kind) = current {
            let text = body.trim();
            if !text.is_empty() {
                sections.entry(kind).or_insert_with(|| text.to_string());
            }
        }
        body.clear();
    };

    for line in markdown.lines() {
        if let Some(heading) = top_heading(line) {
            flush(current, &mut body);
            current = match_heading(heading);
            continue;
        }
        body.push_str(line);
        body.push('\n');
    }
    flush(current, &mut body);
    sections
}

fn top_heading(line: &str) -> Option<&str> {
    let line = line.trim_end();
    line.strip_prefix("## ")
        .or_else(|| line.strip_prefix("# "))
        .map(str::trim)
}

/// Match a heading to a section by keyword.
fn match_heading(heading: &str) -> Option<SectionKind> {
    let h = heading
        .trim_start_matches(|c: char| c.is_ascii_digit() || c == '.' || c.is_whitespace())
        .to_ascii_lowercase();
    let has = |words: &[&str]| words.iter().any(|w| h.contains(w));

    if has(&["overview", "introduction", "about"]) {
        Some(SectionKind::ProjectOverview)
    } else if has(&["feature"]) {
        Some(SectionKind::KeyFeatures)
    } else if has(&["structure", "layout", "architecture"]) {
        Some(SectionKind::ProjectStructure)
    } else if has(&["technolog", "stack", "tech "]) {
        Some(SectionKind::TechnologyStack)
    } else if has(&["dependenc"]) {
        Some(SectionKind::Dependencies)
    } else if has(&["important", "key files"]) {
        Some(SectionKind::ImportantFiles)
    } else if has(&["setup", "install", "getting started"]) {
        Some(SectionKind::SetupAndInstallation)
    } else if has(&["usage", "how to use"]) {
        Some(SectionKind::UsageGuide)
    } else if has(&["guideline", "development", "contribut"]) {
        Some(SectionKind::DevelopmentGuidelines)
    } else if has(&["issue", "improvement", "limitation", "roadmap"]) {
        Some(SectionKind::KnownIssues)
    } else {
        None
    }
}
