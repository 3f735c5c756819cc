//! Rust extraction.

use tree_sitter::{Language, Node};

use crate::extract::exact::{
    count_members, is_comment, join_doc, parameter_names, ParsedSource, SyntaxExtractor,
};
use crate::extract::{FunctionSignature, ImportReference, StructuralData, TypeDeclaration, TypeKind};

/// Children of a field list that are not fields.
const NON_MEMBERS: &[&str] = &["attribute_item", "visibility_modifier"];

pub struct RustSyntax {
    language: Language,
}

impl RustSyntax {
    pub fn new() -> Self {
        Self {
            language: tree_sitter_rust::LANGUAGE.into(),
        }
    }

    fn function(&self, node: Node, parsed: &ParsedSource) -> Option<FunctionSignature> {
        let name = parsed.field_text(node, "name")?;
        let parameters = node
            .child_by_field_name("parameters")
            .map(|p| parameter_names(p, parsed))
            .unwrap_or_default();
        Some(FunctionSignature {
            name: name.to_string(),
            parameters,
            start_line: node.start_position().row + 1,
            doc_comment: doc_comment(node, parsed),
        })
    }

    fn struct_item(&self, node: Node, parsed: &ParsedSource) -> Option<TypeDeclaration> {
        let name = parsed.field_text(node, "name")?;
        let member_count = node
            .child_by_field_name("body")
            .map(|body| count_members(body, NON_MEMBERS))
            .unwrap_or(0);
        Some(TypeDeclaration {
            name: name.to_string(),
            kind: TypeKind::Struct,
            base_names: Vec::new(),
            member_count,
            start_line: node.start_position().row + 1,
        })
    }

    fn enum_item(&self, node: Node, parsed: &ParsedSource) -> Option<TypeDeclaration> {
        let name = parsed.field_text(node, "name")?;
        let member_count = node
            .child_by_field_name("body")
            .map(|body| count_members(body, NON_MEMBERS))
            .unwrap_or(0);
        Some(TypeDeclaration {
            name: name.to_string(),
            kind: TypeKind::Enum,
            base_names: Vec::new(),
            member_count,
            start_line: node.start_position().row + 1,
        })
    }

    fn trait_item(&self, node: Node, parsed: &ParsedSource) -> Option<TypeDeclaration> {
        let name = parsed.field_text(node, "name")?;
        let base_names = node
            .child_by_field_name("bounds")
            .map(|bounds| {
                let mut cursor = bounds.walk();
                bounds
                    .named_children(&mut cursor)
                    .map(|b| parsed.node_text(b).to_string())
                    .collect()
            })
            .unwrap_or_default();
        let member_count = node
            .child_by_field_name("body")
            .map(|body| count_members(body, NON_MEMBERS))
            .unwrap_or(0);
        Some(TypeDeclaration {
            name: name.to_string(),
            kind: TypeKind::Interface,
            base_names,
            member_count,
            start_line: node.start_position().row + 1,
        })
    }

    fn use_declaration(&self, node: Node, parsed: &ParsedSource) -> Option<ImportReference> {
        let argument = node.child_by_field_name("argument")?;
        let (module, alias) = if argument.kind() == "use_as_clause" {
            (
                parsed.field_text(argument, "path")?.to_string(),
                parsed.field_text(argument, "alias").map(str::to_string),
            )
        } else {
            (parsed.node_text(argument).to_string(), None)
        };
        Some(ImportReference {
            is_relative: is_relative_path(&module),
            module,
            alias,
            line: node.start_position().row + 1,
        })
    }
}

impl Default for RustSyntax {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntaxExtractor for RustSyntax {
    fn language_id(&self) -> &'static str {
        "rust"
    }

    fn grammar(&self) -> &Language {
        &self.language
    }

    fn visit(&self, node: Node, parsed: &ParsedSource, out: &mut StructuralData) {
        let line = node.start_position().row + 1;
        match node.kind() {
            "function_item" | "function_signature_item" => {
                out.functions.extend(self.function(node, parsed))
            }
            "struct_item" => out.types.extend(self.struct_item(node, parsed)),
            "enum_item" => out.types.extend(self.enum_item(node, parsed)),
            "trait_item" => out.types.extend(self.trait_item(node, parsed)),
            "use_declaration" => out.imports.extend(self.use_declaration(node, parsed)),
            // `mod foo;` pulls in a sibling file
            "mod_item" if node.child_by_field_name("body").is_none() => {
                if let Some(name) = parsed.field_text(node, "name") {
                    out.imports.push(ImportReference {
                        module: name.to_string(),
                        alias: None,
                        is_relative: true,
                        line,
                    });
                }
            }
            "extern_crate_declaration" => {
                if let Some(name) = parsed.field_text(node, "name") {
                    out.imports.push(ImportReference {
                        module: name.to_string(),
                        alias: parsed.field_text(node, "alias").map(str::to_string),
                        is_relative: false,
                        line,
                    });
                }
            }
            _ => {}
        }
    }
}

fn is_relative_path(path: &str) -> bool {
    let head = path.split("::").next().unwrap_or(path).trim();
    matches!(head, "crate" | "self" | "super")
}

/// Outer doc comments (`///`, `/** */`) above an item, skipping attributes.
fn doc_comment(node: Node, parsed: &ParsedSource) -> Option<String> {
    let mut lines = Vec::new();
    let mut prev = node.prev_named_sibling();
    while let Some(sibling) = prev {
        let kind = sibling.kind();
        if kind == "attribute_item" {
            prev = sibling.prev_named_sibling();
            continue;
        }
        if !is_comment(kind) {
            break;
        }
        let text = parsed.node_text(sibling).trim_end();
        if let Some(body) = text.strip_prefix("///") {
            if body.starts_with('/') {
                break;
            }
            lines.push(body.strip_prefix(' ').unwrap_or(body).to_string());
        } else if let Some(body) = text.strip_prefix("/**") {
            let body = body.strip_suffix("*/").unwrap_or(body);
            let block: Vec<String> = body
                .lines()
                .map(|l| l.trim().trim_start_matches('*').trim().to_string())
                .collect();
            lines.extend(block.into_iter().rev());
        } else {
            break;
        }
        prev = sibling.prev_named_sibling();
    }
    lines.reverse();
    join_doc(lines)
}
