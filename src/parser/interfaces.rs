//! Public-interface extraction for strict modules.
//!
//! A module's interface is its `__all__` export list when one is declared,
//! otherwise the public names defined at its top level (a leading underscore
//! marks a name private).

use crate::filesystem::{self, read_file_content};
use crate::parser::{ParseError, parse_python_source};
use std::path::PathBuf;
use tree_sitter::Node;

/// Return the names a module's public surface exposes.
pub fn parse_interface_members(
    source_roots: &[PathBuf],
    module_path: &str,
) -> Result<Vec<String>, ParseError> {
    let file_path = filesystem::module_to_file_path(source_roots, module_path).ok_or_else(|| {
        ParseError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("No source file for module '{module_path}'"),
        ))
    })?;
    let source = read_file_content(&file_path)?;
    parse_interface_members_from_source(&source)
}

pub(crate) fn parse_interface_members_from_source(source: &str) -> Result<Vec<String>, ParseError> {
    let tree = parse_python_source(source)?;
    let root = tree.root_node();
    let bytes = source.as_bytes();

    if let Some(exports) = collect_dunder_all(root, bytes) {
        return Ok(exports);
    }
    Ok(collect_public_definitions(root, bytes))
}

/// Gather the string elements of `__all__ = [...]` plus any `__all__ += [...]`
/// extensions. Returns None when the module declares no `__all__`.
fn collect_dunder_all(root: Node, source: &[u8]) -> Option<Vec<String>> {
    let mut found = false;
    let mut exports: Vec<String> = Vec::new();

    let mut cursor = root.walk();
    for child in root.children(&mut cursor) {
        if child.kind() != "expression_statement" {
            continue;
        }
        let Some(expr) = child.child(0) else { continue };
        let (left, right) = match expr.kind() {
            "assignment" => (
                expr.child_by_field_name("left"),
                expr.child_by_field_name("right"),
            ),
            "augmented_assignment" => (
                expr.child_by_field_name("left"),
                expr.child_by_field_name("right"),
            ),
            _ => continue,
        };
        let is_dunder_all = left
            .map(|l| l.utf8_text(source).unwrap_or("") == "__all__")
            .unwrap_or(false);
        if !is_dunder_all {
            continue;
        }
        found = true;
        if let Some(value) = right {
            collect_string_elements(value, source, &mut exports);
        }
    }

    found.then_some(exports)
}

fn collect_string_elements(node: Node, source: &[u8], out: &mut Vec<String>) {
    if node.kind() == "string" {
        let mut cursor = node.walk();
        for part in node.children(&mut cursor) {
            if part.kind() == "string_content" {
                out.push(part.utf8_text(source).unwrap_or("").to_string());
            }
        }
        return;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_string_elements(child, source, out);
    }
}

fn collect_public_definitions(root: Node, source: &[u8]) -> Vec<String> {
    let mut names = Vec::new();
    let mut cursor = root.walk();
    for child in root.children(&mut cursor) {
        match child.kind() {
            "function_definition" | "class_definition" => {
                push_definition_name(child, source, &mut names);
            }
            "decorated_definition" => {
                let mut inner_cursor = child.walk();
                for inner in child.children(&mut inner_cursor) {
                    if matches!(inner.kind(), "function_definition" | "class_definition") {
                        push_definition_name(inner, source, &mut names);
                    }
                }
            }
            "expression_statement" => {
                if let Some(expr) = child.child(0) {
                    if expr.kind() == "assignment" {
                        if let Some(left) = expr.child_by_field_name("left") {
                            if left.kind() == "identifier" {
                                let name = left.utf8_text(source).unwrap_or("");
                                if is_public(name) {
                                    names.push(name.to_string());
                                }
                            }
                        }
                    }
                }
            }
            _ => {}
        }
    }
    names.dedup();
    names
}

fn push_definition_name(node: Node, source: &[u8], out: &mut Vec<String>) {
    if let Some(name_node) = node.child_by_field_name("name") {
        let name = name_node.utf8_text(source).unwrap_or("");
        if is_public(name) {
            out.push(name.to_string());
        }
    }
}

/// Names starting with `_` are considered private.
fn is_public(name: &str) -> bool {
    !name.is_empty() && !name.starts_with('_')
}
