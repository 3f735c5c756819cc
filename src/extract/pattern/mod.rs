//! PatternParse: single-pass, line-oriented regex extraction.
//!
//! Each line is matched against a curated pattern set after comments and
//! string contents are blanked out. Brace depth is tracked across lines so
//! class and interface bodies can attribute members to their type. All
//! patterns use the `regex` crate, which matches in linear time.
//!
//! Known gaps: destructured exports, decorators on their own line,
//! signatures spanning several lines, generic parameter lists spanning
//! lines, and braces inside regex literals or template substitutions.

mod java;
mod javascript;

pub use java::JavaPatterns;
pub use javascript::JavaScriptPatterns;

use super::{
    ExtractionError, ExtractionOutcome, FailureReason, StructuralData, Structure, TypeDeclaration,
    TypeKind,
};

static JAVASCRIPT: JavaScriptPatterns = JavaScriptPatterns { typescript: false };
static TYPESCRIPT: JavaScriptPatterns = JavaScriptPatterns { typescript: true };
static JAVA: JavaPatterns = JavaPatterns;

/// A pattern set for one language family.
pub trait PatternSet: Sync {
    /// Inspect one line that has code on it.
    fn scan(&self, line: &Line, state: &mut ScanState, out: &mut StructuralData);
}

/// Whether a bundled pattern set exists for a language.
pub fn has_patterns(language: &str) -> bool {
    patterns_for(language).is_some()
}

pub fn patterns_for(language: &str) -> Option<&'static dyn PatternSet> {
    match language {
        "javascript" => Some(&JAVASCRIPT),
        "typescript" => Some(&TYPESCRIPT),
        "java" => Some(&JAVA),
        _ => None,
    }
}

/// One source line as seen by a pattern set.
pub struct Line<'a> {
    /// 1-indexed.
    pub number: usize,
    pub raw: &'a str,
    /// The line with comments removed and string contents emptied.
    pub code: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Class,
    Interface,
}

/// A type body being tracked.
#[derive(Debug, Clone)]
pub struct Scope {
    pub kind: ScopeKind,
    pub name: String,
    /// Index into `StructuralData::types`.
    pub type_index: usize,
    /// Brace depth of lines directly inside the body.
    pub body_depth: usize,
    opened: bool,
}

/// Cross-line state for one file.
#[derive(Debug, Default)]
pub struct ScanState {
    depth: usize,
    scopes: Vec<Scope>,
    in_block_comment: bool,
    in_template: bool,
    doc: DocTracker,
}

impl ScanState {
    /// The type whose body this line sits directly in, if any.
    pub fn member_scope(&self) -> Option<&Scope> {
        self.scopes
            .last()
            .filter(|s| s.opened && s.body_depth == self.depth)
    }

    /// Record a type declaration and start tracking its body.
    pub fn open_type(&mut self, out: &mut StructuralData, decl: TypeDeclaration) {
        self.scopes.retain(|s| s.opened);
        let kind = match decl.kind {
            TypeKind::Interface => ScopeKind::Interface,
            TypeKind::Class | TypeKind::Struct | TypeKind::Enum => ScopeKind::Class,
        };
        self.scopes.push(Scope {
            kind,
            name: decl.name.clone(),
            type_index: out.types.len(),
            body_depth: self.depth + 1,
            opened: false,
        });
        out.types.push(decl);
    }

    /// Count one member against the innermost tracked type.
    pub fn add_member(&self, out: &mut StructuralData) {
        if let Some(scope) = self.member_scope() {
            if let Some(decl) = out.types.get_mut(scope.type_index) {
                decl.member_count += 1;
            }
        }
    }

    /// Take the doc comment that ended just above the current line.
    pub fn take_doc(&mut self) -> Option<String> {
        self.doc.pending.take()
    }

    fn apply_braces(&mut self, code: &str) {
        for c in code.chars() {
            match c {
                '{' => {
                    self.depth += 1;
                    let depth = self.depth;
                    for scope in self.scopes.iter_mut().rev() {
                        if !scope.opened && scope.body_depth == depth {
                            scope.opened = true;
                        }
                    }
                }
                '}' => {
                    self.depth = self.depth.saturating_sub(1);
                    while let Some(last) = self.scopes.last() {
                        if !last.opened || last.body_depth > self.depth {
                            self.scopes.pop();
                        } else {
                            break;
                        }
                    }
                }
                _ => {}
            }
        }
    }
}

/// Collects `/** ... */` blocks so the next declaration can claim them.
#[derive(Debug, Default)]
struct DocTracker {
    lines: Option<Vec<String>>,
    pending: Option<String>,
}

impl DocTracker {
    fn observe(&mut self, raw: &str) {
        let trimmed = raw.trim();
        if self.lines.is_none() {
            let Some(rest) = trimmed.strip_prefix("/**") else {
                return;
            };
            self.lines = Some(Vec::new());
            self.push(rest);
        } else {
            self.push(trimmed);
        }
    }

    fn push(&mut self, text: &str) {
        let (content, closed) = match text.find("*/") {
            Some(end) => (&text[..end], true),
            None => (text, false),
        };
        let content = content.trim().trim_start_matches('*').trim();
        if let Some(lines) = self.lines.as_mut() {
            lines.push(content.to_string());
        }
        if closed {
            let doc = self.lines.take().unwrap_or_default().join("\n").trim().to_string();
            self.pending = if doc.is_empty() { None } else { Some(doc) };
        }
    }
}

/// Run PatternParse on `source`. Lines longer than `max_line_bytes` are
/// skipped and make the outcome Partial.
pub fn extract(language: &str, source: &str, max_line_bytes: usize) -> (Structure, ExtractionOutcome) {
    let Some(patterns) = patterns_for(language) else {
        let err = ExtractionError::new(
            FailureReason::ParserUnavailable,
            format!("no pattern set bundled for {language}"),
        );
        return (Structure::Parsed(StructuralData::default()), ExtractionOutcome::Failed(err));
    };

    let mut out = StructuralData::default();
    let mut state = ScanState::default();
    let mut skipped = 0usize;
    let mut first_skipped = None;

    for (idx, raw) in source.lines().enumerate() {
        let number = idx + 1;
        if raw.len() > max_line_bytes {
            skipped += 1;
            first_skipped.get_or_insert(number);
            state.doc.pending = None;
            continue;
        }

        state.doc.observe(raw);
        let code = strip_code(raw, &mut state.in_block_comment, &mut state.in_template);
        let has_code = !code.trim().is_empty();
        let annotation = code.trim_start().starts_with('@');
        let line = Line { number, raw, code };
        if has_code {
            patterns.scan(&line, &mut state, &mut out);
            if !annotation {
                state.doc.pending = None;
            }
        }
        state.apply_braces(&line.code);
    }

    let outcome = match first_skipped {
        Some(line) => ExtractionOutcome::Partial(
            ExtractionError::new(
                FailureReason::LineTooLong,
                format!("{skipped} line(s) longer than {max_line_bytes} bytes skipped"),
            )
            .at_line(line),
        ),
        None => ExtractionOutcome::Complete,
    };
    (Structure::Parsed(out), outcome)
}

/// Remove comments and empty out string literals, carrying block-comment
/// and template-literal state across lines. Quotes are kept so `""` still
/// marks a string.
pub fn strip_code(raw: &str, in_block_comment: &mut bool, in_template: &mut bool) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    if *in_template && skip_literal(&mut chars, '`') {
        *in_template = false;
        out.push('`');
    } else if *in_template {
        return out;
    }
    while let Some(c) = chars.next() {
        if *in_block_comment {
            if c == '*' && chars.peek() == Some(&'/') {
                chars.next();
                *in_block_comment = false;
                out.push(' ');
            }
            continue;
        }
        match c {
            '/' if chars.peek() == Some(&'/') => break,
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                *in_block_comment = true;
            }
            '"' | '\'' | '`' => {
                out.push(c);
                if skip_literal(&mut chars, c) {
                    out.push(c);
                } else if c == '`' {
                    // only template literals span lines
                    *in_template = true;
                }
            }
            _ => out.push(c),
        }
    }
    out
}

/// Consume a literal body up to the closing `quote`. Returns false when the
/// line ends first.
fn skip_literal(chars: &mut std::iter::Peekable<std::str::Chars<'_>>, quote: char) -> bool {
    while let Some(inner) = chars.next() {
        if inner == '\\' {
            chars.next();
        } else if inner == quote {
            return true;
        }
    }
    false
}

/// Remove `<...>` sections, including nested ones.
pub fn strip_generics(text: &str) -> String {
    let mut depth = 0usize;
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => depth += 1,
            '>' if depth > 0 => depth -= 1,
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out
}

/// Split a comma-separated list at top level, ignoring commas nested in
/// brackets or generics.
pub fn split_top_level(list: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    let mut prev = ' ';
    for (i, c) in list.char_indices() {
        match c {
            '>' if prev == '=' => {}
            '(' | '[' | '{' | '<' => depth += 1,
            ')' | ']' | '}' | '>' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(list[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
        prev = c;
    }
    parts.push(list[start..].trim());
    parts.into_iter().filter(|p| !p.is_empty()).collect()
}

/// Base type names from an `extends`/`implements` list.
pub fn split_bases(list: &str) -> Vec<String> {
    strip_generics(list)
        .split(',')
        .map(|s| s.trim().trim_end_matches('{').trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
