//! JavaScript and TypeScript patterns.

use lazy_static::lazy_static;
use regex::{Captures, Regex};

use super::{split_bases, split_top_level, Line, PatternSet, ScanState, ScopeKind};
use crate::extract::{FunctionSignature, ImportReference, StructuralData, TypeDeclaration, TypeKind};

lazy_static! {
    static ref FUNCTION_RE: Regex = Regex::new(
        r"^\s*(?:export\s+)?(?:default\s+)?(?:declare\s+)?(?:async\s+)?function\s*\*?\s*([A-Za-z_$][\w$]*)\s*(?:<[^>]*>)?\s*\(([^)]*)"
    ).unwrap();
    static ref BINDING_RE: Regex = Regex::new(
        r"^\s*(?:export\s+)?(?:const|let|var)\s+([A-Za-z_$][\w$]*)\s*(?::[^=]+)?=\s*(?:async\s+)?(?:function\b\s*\*?\s*(?:[A-Za-z_$][\w$]*)?\s*\(([^)]*)|\(([^)]*)\)\s*(?::[^=]+)?=>|([A-Za-z_$][\w$]*)\s*=>)"
    ).unwrap();
    static ref OBJECT_METHOD_RE: Regex = Regex::new(
        r"^\s*([A-Za-z_$][\w$]*)\s*:\s*(?:async\s+)?(?:function\b\s*\*?\s*(?:[A-Za-z_$][\w$]*)?\s*\(([^)]*)|\(([^)]*)\)\s*=>|([A-Za-z_$][\w$]*)\s*=>)"
    ).unwrap();
    static ref CLASS_RE: Regex = Regex::new(
        r"^\s*(?:export\s+)?(?:default\s+)?(?:declare\s+)?(?:abstract\s+)?class\s+([A-Za-z_$][\w$]*)(?:\s*<[^>]*>)?(?:\s+extends\s+([A-Za-z_$][\w$.]*)(?:\s*<[^>]*>)?)?(?:\s+implements\s+([^{]+))?"
    ).unwrap();
    static ref INTERFACE_RE: Regex = Regex::new(
        r"^\s*(?:export\s+)?(?:default\s+)?(?:declare\s+)?interface\s+([A-Za-z_$][\w$]*)(?:\s*<[^>]*>)?(?:\s+extends\s+([^{]+))?"
    ).unwrap();
    static ref CLASS_METHOD_RE: Regex = Regex::new(
        r"^\s*(?:(?:public|private|protected|static|async|readonly|override|abstract|get|set)\s+)*\*?\s*(#?[A-Za-z_$][\w$]*)\s*\??\s*(?:<[^>]*>)?\s*\(([^)]*)"
    ).unwrap();
    static ref CLASS_FIELD_RE: Regex = Regex::new(
        r"^\s*(?:(?:public|private|protected|static|readonly|declare|override|abstract)\s+)*(#?[A-Za-z_$][\w$]*)\s*[?!]?\s*(?::|=|;|$)"
    ).unwrap();
    static ref ARROW_VALUE_RE: Regex = Regex::new(
        r"=\s*(?:async\s+)?(?:\(([^)]*)\)|([A-Za-z_$][\w$]*))\s*(?::[^=]+)?=>"
    ).unwrap();
    static ref IMPORT_FROM_RE: Regex = Regex::new(
        r#"^\s*import\s+(?:type\s+)?([^'"]+?)\s+from\s+['"]([^'"]+)['"]"#
    ).unwrap();
    static ref IMPORT_BARE_RE: Regex = Regex::new(r#"^\s*import\s+['"]([^'"]+)['"]"#).unwrap();
    static ref FROM_TAIL_RE: Regex = Regex::new(r#"^\s*\}\s*from\s+['"]([^'"]+)['"]"#).unwrap();
    static ref EXPORT_FROM_RE: Regex = Regex::new(
        r#"^\s*export\s+(?:type\s+)?(?:\*(?:\s+as\s+([A-Za-z_$][\w$]*))?|\{[^}]*\})\s*from\s+['"]([^'"]+)['"]"#
    ).unwrap();
    static ref REQUIRE_RE: Regex = Regex::new(
        r#"(?:\b(?:const|let|var)\s+([A-Za-z_$][\w$]*)\s*=\s*)?\brequire\s*\(\s*['"]([^'"]+)['"]\s*\)"#
    ).unwrap();
    static ref DYNAMIC_IMPORT_RE: Regex = Regex::new(r#"\bimport\s*\(\s*['"]([^'"]+)['"]\s*\)"#).unwrap();
    static ref NAMESPACE_RE: Regex = Regex::new(r"\*\s+as\s+([A-Za-z_$][\w$]*)").unwrap();
    static ref DEFAULT_BINDING_RE: Regex = Regex::new(r"^([A-Za-z_$][\w$]*)\s*(?:,|$)").unwrap();
}

/// Words that look like method names at the start of a class-body line but
/// never are.
const NOT_METHODS: &[&str] = &[
    "if", "for", "while", "switch", "catch", "return", "function", "new", "typeof", "super",
];

/// Patterns for `.js`/`.ts` family files.
pub struct JavaScriptPatterns {
    /// Also recognize `interface` declarations.
    pub typescript: bool,
}

impl PatternSet for JavaScriptPatterns {
    fn scan(&self, line: &Line, state: &mut ScanState, out: &mut StructuralData) {
        scan_imports(line, out);

        if let Some(kind) = state.member_scope().map(|s| s.kind) {
            match kind {
                ScopeKind::Interface => {
                    let first = line.code.trim_start().chars().next();
                    if first.is_some_and(|c| c.is_alphabetic() || matches!(c, '_' | '$' | '[' | '(')) {
                        state.add_member(out);
                    }
                    return;
                }
                ScopeKind::Class => {
                    if self.class_member(line, state, out) {
                        return;
                    }
                }
            }
        }

        let code = line.code.as_str();
        if let Some(caps) = CLASS_RE.captures(code) {
            let mut base_names: Vec<String> = caps
                .get(2)
                .map(|m| vec![m.as_str().to_string()])
                .unwrap_or_default();
            if let Some(implements) = caps.get(3) {
                base_names.extend(split_bases(implements.as_str()));
            }
            let decl = TypeDeclaration {
                name: caps[1].to_string(),
                kind: TypeKind::Class,
                base_names,
                member_count: 0,
                start_line: line.number,
            };
            state.open_type(out, decl);
        } else if let Some(caps) = INTERFACE_RE.captures(code).filter(|_| self.typescript) {
            let decl = TypeDeclaration {
                name: caps[1].to_string(),
                kind: TypeKind::Interface,
                base_names: caps.get(2).map(|m| split_bases(m.as_str())).unwrap_or_default(),
                member_count: 0,
                start_line: line.number,
            };
            state.open_type(out, decl);
        } else if let Some(caps) = FUNCTION_RE.captures(code) {
            push_function(out, state, &caps[1], caps.get(2).map(|m| m.as_str()), line.number);
        } else if let Some(caps) = BINDING_RE.captures(code).or_else(|| OBJECT_METHOD_RE.captures(code)) {
            let params = callable_params(&caps);
            push_function(out, state, &caps[1], params, line.number);
        }
    }
}

impl JavaScriptPatterns {
    /// Handle a line directly inside a class body. Returns true when the
    /// line was a member.
    fn class_member(&self, line: &Line, state: &mut ScanState, out: &mut StructuralData) -> bool {
        let code = line.code.as_str();
        if let Some(caps) = CLASS_METHOD_RE.captures(code) {
            let name = &caps[1];
            if !NOT_METHODS.contains(&name) {
                state.add_member(out);
                push_function(out, state, name, caps.get(2).map(|m| m.as_str()), line.number);
                return true;
            }
        }
        if let Some(caps) = CLASS_FIELD_RE.captures(code) {
            state.add_member(out);
            if let Some(arrow) = ARROW_VALUE_RE.captures(code) {
                let params = arrow.get(1).or_else(|| arrow.get(2)).map(|m| m.as_str());
                push_function(out, state, &caps[1], params, line.number);
            }
            return true;
        }
        false
    }
}

/// Parameter list from whichever alternative of a binding pattern matched.
fn callable_params<'t>(caps: &Captures<'t>) -> Option<&'t str> {
    caps.get(2)
        .or_else(|| caps.get(3))
        .or_else(|| caps.get(4))
        .map(|m| m.as_str())
}

fn push_function(
    out: &mut StructuralData,
    state: &mut ScanState,
    name: &str,
    params: Option<&str>,
    line: usize,
) {
    out.functions.push(FunctionSignature {
        name: name.to_string(),
        parameters: params.map(parameter_names).unwrap_or_default(),
        start_line: line,
        doc_comment: state.take_doc(),
    });
}

/// Names from a JS/TS parameter list: defaults and type annotations are
/// dropped, destructuring patterns are kept as written.
fn parameter_names(list: &str) -> Vec<String> {
    split_top_level(list)
        .into_iter()
        .map(|param| {
            let cut = if param.starts_with('{') || param.starts_with('[') {
                param.len()
            } else {
                param.find([':', '=']).unwrap_or(param.len())
            };
            param[..cut].trim().trim_end_matches('?').to_string()
        })
        .filter(|p| !p.is_empty())
        .collect()
}

fn scan_imports(line: &Line, out: &mut StructuralData) {
    let raw = line.raw;
    let mut push = |module: &str, alias: Option<String>| {
        out.imports.push(ImportReference {
            module: module.to_string(),
            alias,
            is_relative: module.starts_with('.') || module.starts_with('/'),
            line: line.number,
        });
    };

    if let Some(caps) = IMPORT_FROM_RE.captures(raw) {
        push(&caps[2], import_alias(caps[1].trim()));
    } else if let Some(caps) = IMPORT_BARE_RE.captures(raw) {
        push(&caps[1], None);
    } else if let Some(caps) = EXPORT_FROM_RE.captures(raw) {
        push(&caps[2], caps.get(1).map(|m| m.as_str().to_string()));
    } else if let Some(caps) = FROM_TAIL_RE.captures(raw) {
        push(&caps[1], None);
    }

    for caps in REQUIRE_RE.captures_iter(raw) {
        push(&caps[2], caps.get(1).map(|m| m.as_str().to_string()));
    }
    for caps in DYNAMIC_IMPORT_RE.captures_iter(raw) {
        push(&caps[1], None);
    }
}

/// `* as ns` or a default binding names the module; `{ a, b }` does not.
fn import_alias(clause: &str) -> Option<String> {
    if let Some(caps) = NAMESPACE_RE.captures(clause) {
        return Some(caps[1].to_string());
    }
    DEFAULT_BINDING_RE
        .captures(clause)
        .map(|caps| caps[1].to_string())
        .filter(|name| name != "type")
}

#[cfg(test)]
mod tests {
    use crate::extract::pattern::extract;
    use crate::extract::{ExtractionOutcome, StructuralData, Structure, TypeKind};

    fn parse(language: &str, source: &str) -> StructuralData {
        let (structure, outcome) = extract(language, source, 4096);
        assert_eq!(outcome, ExtractionOutcome::Complete);
        match structure {
            Structure::Parsed(data) => data,
            Structure::Signals(_) => panic!("expected parsed data"),
        }
    }

    #[test]
    fn test_functions() {
        let data = parse(
            "javascript",
            r#"
/**
 * Add two numbers.
 */
export function add(a, b = 2) {
  return a + b;
}

const double = (x) => x * 2;
export const fetchUser = async ({ id }, opts) => {
  const url = "/users/" + id;
};
let legacy = function (cb) {};
const handlers = {
  onClick: function (event) {},
  onKey: (e) => e,
};
"#,
        );
        let names: Vec<_> = data.functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["add", "double", "fetchUser", "legacy", "onClick", "onKey"]);
        assert_eq!(data.functions[0].parameters, vec!["a", "b"]);
        assert_eq!(data.functions[0].doc_comment.as_deref(), Some("Add two numbers."));
        assert_eq!(data.functions[0].start_line, 5);
        assert_eq!(data.functions[2].parameters, vec!["{ id }", "opts"]);
        assert!(data.functions[1].doc_comment.is_none());
    }

    #[test]
    fn test_classes_and_members() {
        let data = parse(
            "javascript",
            r#"
class Cart extends Base {
  items = [];
  #secret = 1;

  constructor(owner) {
    super();
    if (owner) {
      this.owner = owner;
    }
  }

  static from(json) {
    return new Cart(json.owner);
  }

  total = () => this.items.length;
}

function helper() {}
"#,
        );
        assert_eq!(data.types.len(), 1);
        let cart = &data.types[0];
        assert_eq!(cart.name, "Cart");
        assert_eq!(cart.kind, TypeKind::Class);
        assert_eq!(cart.base_names, vec!["Base"]);
        assert_eq!(cart.member_count, 5);

        let names: Vec<_> = data.functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["constructor", "from", "total", "helper"]);
    }

    #[test]
    fn test_typescript_declarations() {
        let data = parse(
            "typescript",
            r#"
export interface Repo extends Named, Timestamped<Date> {
  id: string;
  fetch(ref?: string): Promise<void>;
}

export abstract class GitRepo<T> extends Base<T> implements Repo, Disposable {
  private readonly id: string;
  public async fetch(ref?: string, depth: number = 1): Promise<void> {}
}
"#,
        );
        assert_eq!(data.types.len(), 2);
        let repo = &data.types[0];
        assert_eq!(repo.kind, TypeKind::Interface);
        assert_eq!(repo.base_names, vec!["Named", "Timestamped"]);
        assert_eq!(repo.member_count, 2);

        let git = &data.types[1];
        assert_eq!(git.base_names, vec!["Base", "Repo", "Disposable"]);
        assert_eq!(git.member_count, 2);
        assert_eq!(data.functions.len(), 1);
        assert_eq!(data.functions[0].parameters, vec!["ref", "depth"]);
    }

    #[test]
    fn test_interface_ignored_in_javascript() {
        let data = parse("javascript", "interface Foo {\n  bar: 1\n}\n");
        assert!(data.types.is_empty());
    }

    #[test]
    fn test_imports() {
        let data = parse(
            "typescript",
            r#"
import React, { useState } from 'react';
import * as path from "path";
import { helper } from './util/helper';
import './styles.css';
import {
  a,
  b,
} from '../shared';
export * from './types';
const fs = require('fs');
// import ignored from 'commented';
const lazy = () => import('./lazy');
"#,
        );
        let modules: Vec<_> = data.imports.iter().map(|i| i.module.as_str()).collect();
        assert_eq!(
            modules,
            vec!["react", "path", "./util/helper", "./styles.css", "../shared", "./types", "fs", "./lazy"]
        );
        assert_eq!(data.imports[0].alias.as_deref(), Some("React"));
        assert_eq!(data.imports[1].alias.as_deref(), Some("path"));
        assert!(data.imports[2].alias.is_none());
        assert!(data.imports[2].is_relative);
        assert_eq!(data.imports[4].line, 9);
        assert_eq!(data.imports[6].alias.as_deref(), Some("fs"));
        assert!(!data.imports[6].is_relative);
    }
}
