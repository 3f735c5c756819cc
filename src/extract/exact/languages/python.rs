//! Python extraction.

use tree_sitter::{Language, Node};

use crate::extract::exact::{count_members, parameter_names, ParsedSource, SyntaxExtractor};
use crate::extract::{FunctionSignature, ImportReference, StructuralData, TypeDeclaration, TypeKind};

pub struct PythonSyntax {
    language: Language,
}

impl PythonSyntax {
    pub fn new() -> Self {
        Self {
            language: tree_sitter_python::LANGUAGE.into(),
        }
    }

    fn function(&self, node: Node, parsed: &ParsedSource) -> Option<FunctionSignature> {
        let name = parsed.field_text(node, "name")?;
        let parameters = node
            .child_by_field_name("parameters")
            .map(|p| parameter_names(p, parsed))
            .unwrap_or_default();
        let doc_comment = node
            .child_by_field_name("body")
            .and_then(|body| docstring(body, parsed));
        Some(FunctionSignature {
            name: name.to_string(),
            parameters,
            start_line: node.start_position().row + 1,
            doc_comment,
        })
    }

    fn class(&self, node: Node, parsed: &ParsedSource) -> Option<TypeDeclaration> {
        let name = parsed.field_text(node, "name")?;

        let mut base_names = Vec::new();
        if let Some(bases) = node.child_by_field_name("superclasses") {
            let mut cursor = bases.walk();
            for base in bases.named_children(&mut cursor) {
                if matches!(base.kind(), "keyword_argument" | "comment") {
                    continue;
                }
                base_names.push(parsed.node_text(base).to_string());
            }
        }

        let member_count = node
            .child_by_field_name("body")
            .map(|body| {
                let mut cursor = body.walk();
                body.named_children(&mut cursor)
                    .filter(|stmt| is_member(*stmt))
                    .count()
            })
            .unwrap_or(0);

        Some(TypeDeclaration {
            name: name.to_string(),
            kind: TypeKind::Class,
            base_names,
            member_count,
            start_line: node.start_position().row + 1,
        })
    }

    fn imports(&self, node: Node, parsed: &ParsedSource, out: &mut Vec<ImportReference>) {
        let line = node.start_position().row + 1;
        match node.kind() {
            "import_statement" => {
                let mut cursor = node.walk();
                for name in node.children_by_field_name("name", &mut cursor) {
                    let (module, alias) = if name.kind() == "aliased_import" {
                        (
                            parsed.field_text(name, "name").unwrap_or_default(),
                            parsed.field_text(name, "alias").map(str::to_string),
                        )
                    } else {
                        (parsed.node_text(name), None)
                    };
                    out.push(ImportReference {
                        module: module.to_string(),
                        alias,
                        is_relative: false,
                        line,
                    });
                }
            }
            // one reference per statement; a lone `from x import a as b` keeps `b`
            "import_from_statement" => {
                if let Some(module) = node.child_by_field_name("module_name") {
                    let mut cursor = node.walk();
                    let names: Vec<Node> = node.children_by_field_name("name", &mut cursor).collect();
                    let alias = match names.as_slice() {
                        [only] if only.kind() == "aliased_import" => {
                            parsed.field_text(*only, "alias").map(str::to_string)
                        }
                        _ => None,
                    };
                    out.push(ImportReference {
                        module: parsed.node_text(module).to_string(),
                        alias,
                        is_relative: module.kind() == "relative_import",
                        line,
                    });
                }
            }
            "future_import_statement" => out.push(ImportReference {
                module: "__future__".to_string(),
                alias: None,
                is_relative: false,
                line,
            }),
            _ => {}
        }
    }
}

impl Default for PythonSyntax {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntaxExtractor for PythonSyntax {
    fn language_id(&self) -> &'static str {
        "python"
    }

    fn grammar(&self) -> &Language {
        &self.language
    }

    fn visit(&self, node: Node, parsed: &ParsedSource, out: &mut StructuralData) {
        match node.kind() {
            "function_definition" => out.functions.extend(self.function(node, parsed)),
            "class_definition" => out.types.extend(self.class(node, parsed)),
            "import_statement" | "import_from_statement" | "future_import_statement" => {
                self.imports(node, parsed, &mut out.imports)
            }
            _ => {}
        }
    }
}

/// Methods, nested classes and class-level assignments.
fn is_member(stmt: Node) -> bool {
    match stmt.kind() {
        "function_definition" | "class_definition" | "decorated_definition" => true,
        "expression_statement" => stmt
            .named_child(0)
            .is_some_and(|e| matches!(e.kind(), "assignment" | "augmented_assignment")),
        _ => false,
    }
}

/// The first statement of a block, when it is a string literal.
fn docstring(body: Node, parsed: &ParsedSource) -> Option<String> {
    let first = body.named_child(0)?;
    if first.kind() != "expression_statement" || count_members(first, &[]) != 1 {
        return None;
    }
    let literal = first.named_child(0)?;
    if literal.kind() != "string" {
        return None;
    }
    clean_docstring(parsed.node_text(literal))
}

/// Strip prefix letters and quotes, then dedent and trim.
fn clean_docstring(raw: &str) -> Option<String> {
    let unprefixed = raw.trim_start_matches(|c: char| c.is_ascii_alphabetic());
    let inner = ["\"\"\"", "'''", "\"", "'"]
        .iter()
        .find_map(|q| {
            unprefixed
                .strip_prefix(q)
                .and_then(|s| s.strip_suffix(q))
        })
        .unwrap_or(unprefixed);

    let lines: Vec<&str> = inner.lines().map(str::trim).collect();
    let text = lines.join("\n").trim().to_string();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use crate::extract::exact::extract;
    use crate::extract::{ExtractionOutcome, StructuralData, Structure, TypeKind};

    fn parse(source: &str) -> StructuralData {
        let (structure, outcome) = extract("python", source);
        assert_eq!(outcome, ExtractionOutcome::Complete);
        match structure {
            Structure::Parsed(data) => data,
            Structure::Signals(_) => panic!("expected parsed data"),
        }
    }

    #[test]
    fn test_extract_functions() {
        let data = parse(
            r#"
def greet(name, greeting="hi", *args, flag: bool = False, **kwargs):
    """Say hello.

    Longer text.
    """
    return f"{greeting} {name}"

async def fetch(url: str):
    pass
"#,
        );
        assert_eq!(data.functions.len(), 2);
        let greet = &data.functions[0];
        assert_eq!(greet.name, "greet");
        assert_eq!(greet.parameters, vec!["name", "greeting", "*args", "flag", "**kwargs"]);
        assert_eq!(greet.start_line, 2);
        assert_eq!(greet.doc_comment.as_deref(), Some("Say hello.\n\nLonger text."));

        let fetch = &data.functions[1];
        assert_eq!(fetch.parameters, vec!["url"]);
        assert!(fetch.doc_comment.is_none());
    }

    #[test]
    fn test_extract_classes() {
        let data = parse(
            r#"
class Repo(Base, mixins.Audit, metaclass=Meta):
    """A repository."""
    table = "repos"

    def __init__(self, path):
        self.path = path

    @property
    def name(self):
        return self.path

    class Config:
        pass
"#,
        );
        assert_eq!(data.types.len(), 2);
        let repo = &data.types[0];
        assert_eq!(repo.name, "Repo");
        assert_eq!(repo.kind, TypeKind::Class);
        assert_eq!(repo.base_names, vec!["Base", "mixins.Audit"]);
        assert_eq!(repo.member_count, 4);
        // methods, including decorated ones, are functions too
        assert_eq!(data.functions.len(), 2);
        assert_eq!(data.functions[0].parameters, vec!["self", "path"]);
    }

    #[test]
    fn test_extract_imports() {
        let data = parse(
            r#"
import os
import numpy as np, sys
from collections import OrderedDict
from . import sibling
from ..pkg.mod import thing
"#,
        );
        let modules: Vec<_> = data.imports.iter().map(|i| i.module.as_str()).collect();
        assert_eq!(modules, vec!["os", "numpy", "sys", "collections", ".", "..pkg.mod"]);
        assert_eq!(data.imports[1].alias.as_deref(), Some("np"));
        assert!(!data.imports[3].is_relative);
        assert!(data.imports[4].is_relative);
        assert!(data.imports[5].is_relative);
        assert_eq!(data.imports[5].line, 6);
    }

    #[test]
    fn test_from_import_alias() {
        let data = parse("from typing import Dict as D\nfrom os import path as p, sep\n");
        assert_eq!(data.imports.len(), 2);
        assert_eq!(data.imports[0].module, "typing");
        assert_eq!(data.imports[0].alias.as_deref(), Some("D"));
        assert_eq!(data.imports[1].alias, None);
    }
}
