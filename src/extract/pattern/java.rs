//! Java patterns.

use lazy_static::lazy_static;
use regex::Regex;

use super::{split_bases, split_top_level, strip_generics, Line, PatternSet, ScanState, ScopeKind};
use crate::extract::{FunctionSignature, ImportReference, StructuralData, TypeDeclaration, TypeKind};

lazy_static! {
    static ref IMPORT_RE: Regex = Regex::new(r"^\s*import\s+(static\s+)?([\w.]+(?:\.\*)?)\s*;").unwrap();
    static ref TYPE_RE: Regex = Regex::new(
        r"^\s*(?:@\w+(?:\([^)]*\))?\s+)*(?:(?:public|protected|private|abstract|final|static|sealed|non-sealed|strictfp)\s+)*(class|interface|enum|record)\s+([A-Za-z_$][\w$]*)(.*)$"
    ).unwrap();
    static ref EXTENDS_RE: Regex = Regex::new(r"\bextends\s+(.+?)(?:\s+implements\b|\s+permits\b|\{|$)").unwrap();
    static ref IMPLEMENTS_RE: Regex = Regex::new(r"\bimplements\s+(.+?)(?:\s+permits\b|\{|$)").unwrap();
    static ref METHOD_RE: Regex = Regex::new(
        r"^\s*(?:@\w+(?:\([^)]*\))?\s+)*(?:(?:public|protected|private|static|final|abstract|synchronized|native|default|strictfp)\s+)*(?:<[^>]*>\s+)?([\w$.]+(?:<[^;{}()]*>)?(?:\[\])*)\s+([A-Za-z_$][\w$]*)\s*\(([^)]*)"
    ).unwrap();
    static ref CONSTRUCTOR_RE: Regex = Regex::new(
        r"^\s*(?:@\w+(?:\([^)]*\))?\s+)*(?:(?:public|protected|private)\s+)?([A-Za-z_$][\w$]*)\s*\(([^)]*)"
    ).unwrap();
    static ref FIELD_RE: Regex = Regex::new(
        r"^\s*(?:@\w+(?:\([^)]*\))?\s+)*(?:(?:public|protected|private|static|final|transient|volatile)\s+)*[\w$.]+(?:<[^;(){}]*>)?(?:\[\])*\s+[A-Za-z_$][\w$]*\s*(?:=[^;]*)?;"
    ).unwrap();
}

/// Words METHOD_RE can mistake for a return type.
const STATEMENT_KEYWORDS: &[&str] = &["return", "new", "throw", "else", "case", "package"];

pub struct JavaPatterns;

impl PatternSet for JavaPatterns {
    fn scan(&self, line: &Line, state: &mut ScanState, out: &mut StructuralData) {
        let code = line.code.as_str();

        if let Some(caps) = IMPORT_RE.captures(line.raw) {
            out.imports.push(ImportReference {
                module: caps[2].to_string(),
                alias: None,
                is_relative: false,
                line: line.number,
            });
            return;
        }

        if let Some(scope) = state.member_scope() {
            let kind = scope.kind;
            let class_name = scope.name.clone();
            if TYPE_RE.is_match(code) {
                // nested type: a member of the outer type, then tracked itself
                state.add_member(out);
            } else if kind == ScopeKind::Class && self.class_member(line, &class_name, state, out) {
                return;
            } else if kind == ScopeKind::Interface {
                self.interface_member(line, state, out);
                return;
            }
        }

        if let Some(caps) = TYPE_RE.captures(code) {
            let kind = match &caps[1] {
                "interface" => TypeKind::Interface,
                _ => TypeKind::Class,
            };
            let rest = strip_generics(caps.get(3).map_or("", |m| m.as_str()));
            let mut base_names = Vec::new();
            if let Some(ext) = EXTENDS_RE.captures(&rest) {
                base_names.extend(split_bases(&ext[1]));
            }
            if let Some(imp) = IMPLEMENTS_RE.captures(&rest) {
                base_names.extend(split_bases(&imp[1]));
            }
            let decl = TypeDeclaration {
                name: caps[2].to_string(),
                kind,
                base_names,
                member_count: 0,
                start_line: line.number,
            };
            state.open_type(out, decl);
        }
    }
}

impl JavaPatterns {
    fn class_member(
        &self,
        line: &Line,
        class_name: &str,
        state: &mut ScanState,
        out: &mut StructuralData,
    ) -> bool {
        let code = line.code.as_str();
        if let Some(caps) = CONSTRUCTOR_RE.captures(code).filter(|c| &c[1] == class_name) {
            state.add_member(out);
            push_method(out, state, &caps[1], &caps[2], line.number);
            return true;
        }
        if let Some(caps) = METHOD_RE.captures(code) {
            if !STATEMENT_KEYWORDS.contains(&&caps[1]) {
                state.add_member(out);
                push_method(out, state, &caps[2], &caps[3], line.number);
                return true;
            }
        }
        if FIELD_RE.is_match(code) {
            state.add_member(out);
            return true;
        }
        false
    }

    /// Interface members are abstract unless they carry a body.
    fn interface_member(&self, line: &Line, state: &mut ScanState, out: &mut StructuralData) {
        let code = line.code.as_str();
        if let Some(caps) = METHOD_RE.captures(code) {
            state.add_member(out);
            if !code.trim_end().ends_with(';') {
                push_method(out, state, &caps[2], &caps[3], line.number);
            }
        } else if FIELD_RE.is_match(code) {
            state.add_member(out);
        }
    }
}

fn push_method(out: &mut StructuralData, state: &mut ScanState, name: &str, params: &str, line: usize) {
    out.functions.push(FunctionSignature {
        name: name.to_string(),
        parameters: parameter_names(params),
        start_line: line,
        doc_comment: state.take_doc(),
    });
}

/// The last word of each parameter, after annotations and the type.
fn parameter_names(list: &str) -> Vec<String> {
    split_top_level(list)
        .into_iter()
        .filter_map(|param| {
            param
                .split_whitespace()
                .filter(|w| !w.starts_with('@'))
                .last()
                .map(|w| w.trim_start_matches("...").to_string())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use crate::extract::pattern::extract;
    use crate::extract::{ExtractionOutcome, StructuralData, Structure, TypeKind};

    fn parse(source: &str) -> StructuralData {
        let (structure, outcome) = extract("java", source, 4096);
        assert_eq!(outcome, ExtractionOutcome::Complete);
        match structure {
            Structure::Parsed(data) => data,
            Structure::Signals(_) => panic!("expected parsed data"),
        }
    }

    #[test]
    fn test_class_with_members() {
        let data = parse(
            r#"package com.example.shop;

import java.util.List;
import static java.util.Objects.requireNonNull;
import com.example.core.*;

/**
 * Holds items.
 */
@Entity
public class Cart extends BaseEntity<Long> implements Serializable, Comparable<Cart> {
    private static final long serialVersionUID = 1L;
    private final List<Item> items = new ArrayList<>();

    public Cart(String owner) {
        super(owner);
    }

    /** Adds an item. */
    @Override
    public <T extends Item> void add(final T item, int... counts) {
        if (item == null) {
            return;
        }
        items.add(item);
    }

    public Map<String, List<Item>> byCategory() {
        return null;
    }

    static class Line {
        int qty;
    }
}
"#,
        );
        let modules: Vec<_> = data.imports.iter().map(|i| i.module.as_str()).collect();
        assert_eq!(
            modules,
            vec!["java.util.List", "java.util.Objects.requireNonNull", "com.example.core.*"]
        );

        assert_eq!(data.types.len(), 2);
        let cart = &data.types[0];
        assert_eq!(cart.name, "Cart");
        assert_eq!(cart.kind, TypeKind::Class);
        assert_eq!(cart.base_names, vec!["BaseEntity", "Serializable", "Comparable"]);
        assert_eq!(cart.start_line, 11);
        // two fields, constructor, two methods, nested class
        assert_eq!(cart.member_count, 6);
        assert_eq!(data.types[1].name, "Line");
        assert_eq!(data.types[1].member_count, 1);

        let names: Vec<_> = data.functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Cart", "add", "byCategory"]);
        assert_eq!(data.functions[1].parameters, vec!["item", "counts"]);
        assert_eq!(data.functions[1].doc_comment.as_deref(), Some("Adds an item."));
        assert!(data.functions[0].doc_comment.is_none());
    }

    #[test]
    fn test_interface() {
        let data = parse(
            r#"
public interface Repository<T> extends Closeable, Iterable<T> {
    int LIMIT = 10;
    T find(String id);
    default boolean exists(String id) {
        return find(id) != null;
    }
}
"#,
        );
        assert_eq!(data.types.len(), 1);
        let repo = &data.types[0];
        assert_eq!(repo.kind, TypeKind::Interface);
        assert_eq!(repo.base_names, vec!["Closeable", "Iterable"]);
        assert_eq!(repo.member_count, 3);
        assert_eq!(data.functions.len(), 1);
        assert_eq!(data.functions[0].name, "exists");
    }
}
