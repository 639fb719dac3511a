//! Declared types of a Java source file, read with tree-sitter.

use tree_sitter::{Node, Parser};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredType {
    /// Dotted binary name, e.g. `org.example.Outer$Inner`.
    pub binary_name: String,
    pub deprecated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JavaUnit {
    pub package: String,
    pub types: Vec<DeclaredType>,
}

const TYPE_DECLARATIONS: [&str; 5] = [
    "class_declaration",
    "interface_declaration",
    "enum_declaration",
    "record_declaration",
    "annotation_type_declaration",
];

pub fn parse_java_unit(source: &str) -> Option<JavaUnit> {
    if source.trim().is_empty() {
        return None;
    }

    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_java::LANGUAGE.into())
        .ok()?;
    let tree = parser.parse(source, None)?;
    let root = tree.root_node();
    let bytes = source.as_bytes();

    let mut unit = JavaUnit::default();
    let mut cursor = root.walk();
    for child in root.children(&mut cursor) {
        match child.kind() {
            "package_declaration" => {
                unit.package = extract_package(&child, bytes);
            }
            kind if TYPE_DECLARATIONS.contains(&kind) => {
                let prefix = if unit.package.is_empty() {
                    String::new()
                } else {
                    format!("{}.", unit.package)
                };
                collect_type(&child, bytes, &prefix, &mut unit.types);
            }
            _ => {}
        }
    }

    Some(unit)
}

fn extract_package(node: &Node, source: &[u8]) -> String {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() == "scoped_identifier" || child.kind() == "identifier" {
            return node_text(&child, source).to_string();
        }
    }
    String::new()
}

/// Records `node` under `prefix` and recurses into member types with `$`.
fn collect_type(node: &Node, source: &[u8], prefix: &str, out: &mut Vec<DeclaredType>) {
    let Some(name) = node.child_by_field_name("name") else {
        return;
    };
    let binary_name = format!("{prefix}{}", node_text(&name, source));
    out.push(DeclaredType {
        binary_name: binary_name.clone(),
        deprecated: has_deprecated_annotation(node, source),
    });

    let Some(body) = node.child_by_field_name("body") else {
        return;
    };
    let nested_prefix = format!("{binary_name}$");
    let mut cursor = body.walk();
    for member in body.children(&mut cursor) {
        if TYPE_DECLARATIONS.contains(&member.kind()) {
            collect_type(&member, source, &nested_prefix, out);
        } else if member.kind() == "enum_body_declarations" {
            let mut inner_cursor = member.walk();
            for inner in member.children(&mut inner_cursor) {
                if TYPE_DECLARATIONS.contains(&inner.kind()) {
                    collect_type(&inner, source, &nested_prefix, out);
                }
            }
        }
    }
}

fn has_deprecated_annotation(node: &Node, source: &[u8]) -> bool {
    let mut cursor = node.walk();
    let Some(modifiers) = node.children(&mut cursor).find(|c| c.kind() == "modifiers") else {
        return false;
    };

    let mut cursor = modifiers.walk();
    modifiers.children(&mut cursor).any(|m| {
        matches!(m.kind(), "marker_annotation" | "annotation")
            && m.child_by_field_name("name")
                .is_some_and(|n| matches!(node_text(&n, source), "Deprecated" | "java.lang.Deprecated"))
    })
}

fn node_text<'a>(node: &Node, source: &'a [u8]) -> &'a str {
    node.utf8_text(source).unwrap_or("")
}
