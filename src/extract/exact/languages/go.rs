//! Go extraction.

use tree_sitter::{Language, Node};

use crate::extract::exact::{
    count_members, is_comment, join_doc, parameter_names, ParsedSource, SyntaxExtractor,
};
use crate::extract::{FunctionSignature, ImportReference, StructuralData, TypeDeclaration, TypeKind};

pub struct GoSyntax {
    language: Language,
}

impl GoSyntax {
    pub fn new() -> Self {
        Self {
            language: tree_sitter_go::LANGUAGE.into(),
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

    fn type_spec(&self, node: Node, parsed: &ParsedSource) -> Option<TypeDeclaration> {
        let name = parsed.field_text(node, "name")?;
        let ty = node.child_by_field_name("type")?;

        let (kind, base_names, member_count) = match ty.kind() {
            "struct_type" => {
                let fields = ty
                    .named_children(&mut ty.walk())
                    .find(|c| c.kind() == "field_declaration_list");
                let mut embedded = Vec::new();
                let mut members = 0;
                if let Some(fields) = fields {
                    let mut cursor = fields.walk();
                    for field in fields.named_children(&mut cursor) {
                        if field.kind() != "field_declaration" {
                            continue;
                        }
                        members += 1;
                        if field.child_by_field_name("name").is_none() {
                            if let Some(embedded_type) = parsed.field_text(field, "type") {
                                embedded.push(embedded_type.trim_start_matches('*').to_string());
                            }
                        }
                    }
                }
                (TypeKind::Struct, embedded, members)
            }
            "interface_type" => {
                let mut embedded = Vec::new();
                let mut cursor = ty.walk();
                for elem in ty.named_children(&mut cursor) {
                    if elem.kind() == "type_elem" {
                        embedded.push(parsed.node_text(elem).to_string());
                    }
                }
                (TypeKind::Interface, embedded, count_members(ty, &[]))
            }
            _ => return None,
        };

        Some(TypeDeclaration {
            name: name.to_string(),
            kind,
            base_names,
            member_count,
            start_line: node.start_position().row + 1,
        })
    }

    fn import_spec(&self, node: Node, parsed: &ParsedSource) -> Option<ImportReference> {
        let path = parsed.field_text(node, "path")?;
        let module = path.trim_matches(|c| c == '"' || c == '`').to_string();
        Some(ImportReference {
            is_relative: module.starts_with("./") || module.starts_with("../"),
            module,
            alias: parsed.field_text(node, "name").map(str::to_string),
            line: node.start_position().row + 1,
        })
    }
}

impl Default for GoSyntax {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntaxExtractor for GoSyntax {
    fn language_id(&self) -> &'static str {
        "go"
    }

    fn grammar(&self) -> &Language {
        &self.language
    }

    fn visit(&self, node: Node, parsed: &ParsedSource, out: &mut StructuralData) {
        match node.kind() {
            "function_declaration" | "method_declaration" => {
                out.functions.extend(self.function(node, parsed))
            }
            "type_spec" => out.types.extend(self.type_spec(node, parsed)),
            "import_spec" => out.imports.extend(self.import_spec(node, parsed)),
            _ => {}
        }
    }
}

/// `//` comment lines directly above a declaration.
fn doc_comment(node: Node, parsed: &ParsedSource) -> Option<String> {
    let mut lines = Vec::new();
    let mut expected_row = node.start_position().row;
    let mut prev = node.prev_named_sibling();
    while let Some(sibling) = prev {
        if !is_comment(sibling.kind()) || sibling.end_position().row + 1 != expected_row {
            break;
        }
        let text = parsed.node_text(sibling);
        let Some(body) = text.strip_prefix("//") else {
            break;
        };
        lines.push(body.strip_prefix(' ').unwrap_or(body).trim_end().to_string());
        expected_row = sibling.start_position().row;
        prev = sibling.prev_named_sibling();
    }
    lines.reverse();
    join_doc(lines)
}
