//! ExactParse: tree-sitter backed extraction.
//!
//! Each language implements [`SyntaxExtractor`], which inspects one node at a
//! time. The engine here parses the file, rejects trees containing ERROR or
//! MISSING nodes, and drives an iterative cursor walk over every named node.
//!
//! # Adding a Language
//!
//! 1. Add a module in `languages/` implementing `SyntaxExtractor`
//! 2. Register it in [`syntax_for`] and [`has_grammar`]
//! 3. Map its extensions to `exact_parse` in the classifier table

mod languages;

pub use languages::{GoSyntax, PythonSyntax, RustSyntax};

use once_cell::sync::OnceCell;
use tree_sitter::{Language, Node, Parser, Tree};

use super::{
    ExtractionError, ExtractionOutcome, FailureReason, StructuralData, Structure,
};

/// A parsed tree plus the source it was parsed from.
pub struct ParsedSource<'a> {
    pub tree: Tree,
    pub source: &'a str,
}

impl<'a> ParsedSource<'a> {
    /// Text for a node.
    pub fn node_text(&self, node: Node) -> &'a str {
        self.source.get(node.byte_range()).unwrap_or("")
    }

    /// Text of a named field, if present.
    pub fn field_text(&self, node: Node, field: &str) -> Option<&'a str> {
        node.child_by_field_name(field).map(|n| self.node_text(n))
    }
}

/// Language-specific structural extraction over a syntax tree.
///
/// Implementations are stateless; `tree_sitter::Parser` is not `Sync`, so
/// the engine creates a parser per file.
pub trait SyntaxExtractor: Send + Sync {
    /// Language tag, matching the classifier's language names.
    fn language_id(&self) -> &'static str;

    fn grammar(&self) -> &Language;

    /// Inspect one named node and record any definition it introduces.
    fn visit(&self, node: Node, parsed: &ParsedSource, out: &mut StructuralData);
}

static PYTHON: OnceCell<PythonSyntax> = OnceCell::new();
static GO: OnceCell<GoSyntax> = OnceCell::new();
static RUST: OnceCell<RustSyntax> = OnceCell::new();

/// Whether a bundled grammar exists for a language.
pub fn has_grammar(language: &str) -> bool {
    matches!(language, "python" | "go" | "rust")
}

/// Get the extractor for a language.
pub fn syntax_for(language: &str) -> Option<&'static dyn SyntaxExtractor> {
    match language {
        "python" => Some(PYTHON.get_or_init(PythonSyntax::new) as &'static dyn SyntaxExtractor),
        "go" => Some(GO.get_or_init(GoSyntax::new) as &'static dyn SyntaxExtractor),
        "rust" => Some(RUST.get_or_init(RustSyntax::new) as &'static dyn SyntaxExtractor),
        _ => None,
    }
}

/// Run ExactParse on `source`.
///
/// A tree with any syntax error yields `Failed(SyntaxError)` and no data.
pub fn extract(language: &str, source: &str) -> (Structure, ExtractionOutcome) {
    let empty = Structure::Parsed(StructuralData::default());
    let Some(syntax) = syntax_for(language) else {
        let err = ExtractionError::new(
            FailureReason::ParserUnavailable,
            format!("no grammar bundled for {language}"),
        );
        return (empty, ExtractionOutcome::Failed(err));
    };

    let parsed = match parse(syntax, source) {
        Ok(parsed) => parsed,
        Err(err) => return (empty, ExtractionOutcome::Failed(err)),
    };

    if let Some(node) = first_syntax_error(parsed.tree.root_node()) {
        let pos = node.start_position();
        let what = if node.is_missing() {
            format!("missing {}", node.kind())
        } else {
            "unexpected syntax".to_string()
        };
        let err = ExtractionError::new(
            FailureReason::SyntaxError,
            format!("{} at {}:{}", what, pos.row + 1, pos.column + 1),
        )
        .at_line(pos.row + 1);
        return (empty, ExtractionOutcome::Failed(err));
    }

    let mut data = StructuralData::default();
    walk_named(parsed.tree.root_node(), |node| syntax.visit(node, &parsed, &mut data));
    (Structure::Parsed(data), ExtractionOutcome::Complete)
}

fn parse<'a>(syntax: &dyn SyntaxExtractor, source: &'a str) -> Result<ParsedSource<'a>, ExtractionError> {
    let mut parser = Parser::new();
    parser.set_language(syntax.grammar()).map_err(|e| {
        ExtractionError::new(FailureReason::ParserUnavailable, e.to_string())
    })?;
    let tree = parser.parse(source, None).ok_or_else(|| {
        ExtractionError::new(
            FailureReason::ParserUnavailable,
            format!("{} parser produced no tree", syntax.language_id()),
        )
    })?;
    Ok(ParsedSource { tree, source })
}

/// Pre-order traversal of named nodes without recursion.
pub fn walk_named<'t>(root: Node<'t>, mut f: impl FnMut(Node<'t>)) {
    let mut cursor = root.walk();
    let mut descending = true;
    loop {
        if descending {
            let node = cursor.node();
            if node.is_named() {
                f(node);
            }
            if cursor.goto_first_child() {
                continue;
            }
        }
        if cursor.goto_next_sibling() {
            descending = true;
            continue;
        }
        if !cursor.goto_parent() {
            break;
        }
        descending = false;
    }
}

/// First ERROR or MISSING node in document order, descending only into
/// subtrees that contain one.
pub fn first_syntax_error(root: Node) -> Option<Node> {
    if !root.has_error() {
        return None;
    }
    let mut cursor = root.walk();
    loop {
        let node = cursor.node();
        if node.is_error() || node.is_missing() {
            return Some(node);
        }
        if node.has_error() && cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return None;
            }
        }
    }
}

pub(crate) fn is_comment(kind: &str) -> bool {
    matches!(kind, "comment" | "line_comment" | "block_comment")
}

/// Parameter names from a parameter list node.
///
/// Prefers `name` fields (possibly several, as in Go's `a, b int`), then a
/// `pattern` field, then the first identifier child, then the raw text.
pub(crate) fn parameter_names(params: Node, parsed: &ParsedSource) -> Vec<String> {
    let mut names = Vec::new();
    let mut cursor = params.walk();
    for param in params.named_children(&mut cursor) {
        let kind = param.kind();
        if is_comment(kind)
            || matches!(kind, "keyword_separator" | "positional_separator" | "attribute_item")
        {
            continue;
        }
        if kind == "identifier" {
            names.push(parsed.node_text(param).to_string());
            continue;
        }

        let mut field_cursor = param.walk();
        let named: Vec<String> = param
            .children_by_field_name("name", &mut field_cursor)
            .map(|n| parsed.node_text(n).to_string())
            .collect();
        if !named.is_empty() {
            names.extend(named);
            continue;
        }
        if let Some(pattern) = param.child_by_field_name("pattern") {
            names.push(parsed.node_text(pattern).to_string());
            continue;
        }
        if kind.contains("splat") {
            names.push(parsed.node_text(param).to_string());
            continue;
        }

        let mut child_cursor = param.walk();
        let first_ident = param
            .named_children(&mut child_cursor)
            .find(|c| c.kind() == "identifier");
        match first_ident {
            Some(ident) => names.push(parsed.node_text(ident).to_string()),
            None => names.push(parsed.node_text(param).to_string()),
        }
    }
    names
}

/// Count named children of a body node, skipping comments and the given kinds.
pub(crate) fn count_members(body: Node, skip: &[&str]) -> usize {
    let mut cursor = body.walk();
    body.named_children(&mut cursor)
        .filter(|c| !is_comment(c.kind()) && !skip.contains(&c.kind()))
        .count()
}

/// Join comment lines into a doc string, or None when empty.
pub(crate) fn join_doc(lines: Vec<String>) -> Option<String> {
    let text = lines.join("\n").trim().to_string();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}
