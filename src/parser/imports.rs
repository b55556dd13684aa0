//! Import extraction.
//!
//! Walks a Python syntax tree and produces one [`ImportReference`] per
//! imported name, with relative imports resolved against the importing
//! file's own package. Imports guarded by `if TYPE_CHECKING:` blocks can be
//! excluded, matching how type-only imports behave at runtime.

use crate::filesystem::{self, read_file_content};
use crate::parser::{ParseError, parse_python_source};
use std::path::{Path, PathBuf};
use tree_sitter::Node;

/// One imported module path and the line it appears on.
///
/// References are emitted in file-appearance order. A multi-name statement
/// yields one reference per name; each records the line of its own name, so
/// parenthesized multi-line imports stay precise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportReference {
    pub module_path: String,
    pub line_number: usize,
}

/// Extract every import as a root-relative module path (project imports) or
/// raw package identifier (external imports).
pub fn get_normalized_imports(
    source_roots: &[PathBuf],
    file_path: &Path,
    ignore_type_checking_imports: bool,
) -> Result<Vec<ImportReference>, ParseError> {
    let source = read_file_content(file_path)?;
    get_normalized_imports_from_source(source_roots, file_path, &source, ignore_type_checking_imports)
}

/// Extract only imports that resolve to code under the source roots.
pub fn get_project_imports(
    source_roots: &[PathBuf],
    file_path: &Path,
    ignore_type_checking_imports: bool,
) -> Result<Vec<ImportReference>, ParseError> {
    let mut imports = get_normalized_imports(source_roots, file_path, ignore_type_checking_imports)?;
    imports.retain(|import| filesystem::is_project_import(source_roots, &import.module_path));
    Ok(imports)
}

/// Extract only imports of packages outside the source roots.
pub fn get_external_imports(
    source_roots: &[PathBuf],
    file_path: &Path,
    ignore_type_checking_imports: bool,
) -> Result<Vec<ImportReference>, ParseError> {
    let mut imports = get_normalized_imports(source_roots, file_path, ignore_type_checking_imports)?;
    imports.retain(|import| !filesystem::is_project_import(source_roots, &import.module_path));
    Ok(imports)
}

pub fn get_normalized_imports_from_source(
    source_roots: &[PathBuf],
    file_path: &Path,
    source: &str,
    ignore_type_checking_imports: bool,
) -> Result<Vec<ImportReference>, ParseError> {
    let module_path = filesystem::file_to_module_path(source_roots, file_path)?;
    let is_package = file_path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n == filesystem::PACKAGE_FILE_NAME);

    let mut package_parts: Vec<String> = if module_path == filesystem::ROOT_MODULE_PATH {
        Vec::new()
    } else {
        module_path.split('.').map(str::to_string).collect()
    };
    // A plain module's relative imports resolve against its containing
    // package; a package's `__init__.py` resolves against itself.
    if !is_package {
        package_parts.pop();
    }

    let tree = parse_python_source(source)?;
    let mut collector = ImportCollector {
        source: source.as_bytes(),
        package_parts,
        ignore_type_checking_imports,
        imports: Vec::new(),
    };
    collector.visit(tree.root_node());
    Ok(collector.imports)
}

struct ImportCollector<'a> {
    source: &'a [u8],
    package_parts: Vec<String>,
    ignore_type_checking_imports: bool,
    imports: Vec<ImportReference>,
}

impl ImportCollector<'_> {
    fn visit(&mut self, node: Node) {
        match node.kind() {
            "import_statement" => self.handle_import(node),
            "import_from_statement" => self.handle_import_from(node),
            "if_statement" => self.handle_if(node),
            _ => self.visit_children(node),
        }
    }

    fn visit_children(&mut self, node: Node) {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.visit(child);
        }
    }

    fn node_text(&self, node: Node) -> &str {
        node.utf8_text(self.source).unwrap_or("")
    }

    fn push(&mut self, module_path: String, node: Node) {
        self.imports.push(ImportReference {
            module_path,
            line_number: node.start_position().row + 1,
        });
    }

    /// `import a.b as x, c`
    fn handle_import(&mut self, node: Node) {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            match child.kind() {
                "dotted_name" => {
                    let path = self.node_text(child).to_string();
                    self.push(path, child);
                }
                "aliased_import" => {
                    if let Some(name) = child.child_by_field_name("name") {
                        let path = self.node_text(name).to_string();
                        self.push(path, name);
                    }
                }
                _ => {}
            }
        }
    }

    /// `from a.b import c, d as e` and relative/wildcard forms.
    fn handle_import_from(&mut self, node: Node) {
        let Some(module_node) = node.child_by_field_name("module_name") else {
            return;
        };

        let (dots, base) = if module_node.kind() == "relative_import" {
            let text = self.node_text(module_node);
            let dots = text.chars().take_while(|c| *c == '.').count();
            (dots, text[dots..].to_string())
        } else {
            (0, self.node_text(module_node).to_string())
        };

        // `from a import *` refers to the module itself.
        let mut cursor = node.walk();
        let has_wildcard = node
            .children(&mut cursor)
            .any(|child| child.kind() == "wildcard_import");
        if has_wildcard {
            if let Some(path) = self.resolve(dots, &base, None) {
                self.push(path, module_node);
            }
            return;
        }

        let mut cursor = node.walk();
        let names: Vec<Node> = node.children_by_field_name("name", &mut cursor).collect();
        for name_node in names {
            let target = match name_node.kind() {
                "aliased_import" => name_node.child_by_field_name("name"),
                _ => Some(name_node),
            };
            let Some(target) = target else { continue };
            let name = self.node_text(target).to_string();
            if let Some(path) = self.resolve(dots, &base, Some(&name)) {
                self.push(path, target);
            }
        }
    }

    /// Resolve a possibly-relative import to an absolute module path.
    /// Returns None when the relative prefix escapes the top-level package;
    /// such an import cannot succeed at runtime either.
    fn resolve(&self, dots: usize, base: &str, name: Option<&str>) -> Option<String> {
        let mut parts: Vec<String> = if dots == 0 {
            if base.is_empty() {
                Vec::new()
            } else {
                base.split('.').map(str::to_string).collect()
            }
        } else {
            let mut parts = self.package_parts.clone();
            for _ in 1..dots {
                parts.pop()?;
            }
            if !base.is_empty() {
                parts.extend(base.split('.').map(str::to_string));
            }
            parts
        };

        if let Some(name) = name {
            parts.extend(name.split('.').map(str::to_string));
        }

        if parts.is_empty() {
            None
        } else {
            Some(parts.join("."))
        }
    }

    /// `if TYPE_CHECKING:` guards. The guarded block is skipped when
    /// type-checking imports are ignored; `elif`/`else` arms are still
    /// visited on their own terms.
    fn handle_if(&mut self, node: Node) {
        let guarded = self.ignore_type_checking_imports
            && node
                .child_by_field_name("condition")
                .is_some_and(|cond| is_type_checking_condition(self.node_text(cond)));

        if !guarded {
            if let Some(consequence) = node.child_by_field_name("consequence") {
                self.visit(consequence);
            }
        }

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            match child.kind() {
                "elif_clause" => {
                    let elif_guarded = self.ignore_type_checking_imports
                        && child
                            .child_by_field_name("condition")
                            .is_some_and(|cond| is_type_checking_condition(self.node_text(cond)));
                    if !elif_guarded {
                        if let Some(consequence) = child.child_by_field_name("consequence") {
                            self.visit(consequence);
                        }
                    }
                }
                "else_clause" => {
                    if let Some(body) = child.child_by_field_name("body") {
                        self.visit(body);
                    }
                }
                _ => {}
            }
        }
    }
}

fn is_type_checking_condition(condition: &str) -> bool {
    let condition = condition.trim();
    condition == "TYPE_CHECKING" || condition.ends_with(".TYPE_CHECKING")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        root: PathBuf,
    }

    impl Fixture {
        fn new(files: &[(&str, &str)]) -> Self {
            let dir = TempDir::new().unwrap();
            let root = dir.path().to_path_buf();
            for (path, content) in files {
                let full = root.join(path);
                fs::create_dir_all(full.parent().unwrap()).unwrap();
                fs::write(full, content).unwrap();
            }
            Self { _dir: dir, root }
        }

        fn roots(&self) -> Vec<PathBuf> {
            vec![self.root.clone()]
        }
    }

    fn refs(imports: &[ImportReference]) -> Vec<(&str, usize)> {
        imports
            .iter()
            .map(|i| (i.module_path.as_str(), i.line_number))
            .collect()
    }

    #[test]
    fn extracts_plain_and_aliased_imports() {
        let fx = Fixture::new(&[(
            "app.py",
            "import os\nimport pkg.util as u, json\n",
        )]);
        let imports =
            get_normalized_imports(&fx.roots(), &fx.root.join("app.py"), true).unwrap();
        assert_eq!(
            refs(&imports),
            vec![("os", 1), ("pkg.util", 2), ("json", 2)]
        );
    }

    #[test]
    fn from_import_yields_one_reference_per_name() {
        let fx = Fixture::new(&[(
            "app.py",
            "from pkg.util import helper, OTHER as o\n",
        )]);
        let imports =
            get_normalized_imports(&fx.roots(), &fx.root.join("app.py"), true).unwrap();
        assert_eq!(
            refs(&imports),
            vec![("pkg.util.helper", 1), ("pkg.util.OTHER", 1)]
        );
    }

    #[test]
    fn parenthesized_imports_record_each_name_line() {
        let fx = Fixture::new(&[(
            "app.py",
            "from pkg import (\n    first,\n    second,\n)\n",
        )]);
        let imports =
            get_normalized_imports(&fx.roots(), &fx.root.join("app.py"), true).unwrap();
        assert_eq!(
            refs(&imports),
            vec![("pkg.first", 2), ("pkg.second", 3)]
        );
    }

    #[test]
    fn resolves_relative_imports_against_containing_package() {
        let fx = Fixture::new(&[
            ("pkg/__init__.py", ""),
            ("pkg/sub/__init__.py", ""),
            ("pkg/sub/mod.py", "from . import sibling\nfrom ..other import thing\n"),
        ]);
        let imports =
            get_normalized_imports(&fx.roots(), &fx.root.join("pkg/sub/mod.py"), true).unwrap();
        assert_eq!(
            refs(&imports),
            vec![("pkg.sub.sibling", 1), ("pkg.other.thing", 2)]
        );
    }

    #[test]
    fn package_init_resolves_relative_to_itself() {
        let fx = Fixture::new(&[
            ("pkg/__init__.py", "from .core import api\n"),
            ("pkg/core.py", ""),
        ]);
        let imports =
            get_normalized_imports(&fx.roots(), &fx.root.join("pkg/__init__.py"), true).unwrap();
        assert_eq!(refs(&imports), vec![("pkg.core.api", 1)]);
    }

    #[test]
    fn wildcard_import_records_the_module() {
        let fx = Fixture::new(&[("app.py", "from pkg.util import *\n")]);
        let imports =
            get_normalized_imports(&fx.roots(), &fx.root.join("app.py"), true).unwrap();
        assert_eq!(refs(&imports), vec![("pkg.util", 1)]);
    }

    #[test]
    fn type_checking_imports_follow_the_flag() {
        let source = "\
from typing import TYPE_CHECKING

if TYPE_CHECKING:
    from pkg.types import Model
else:
    from pkg.runtime import Model

import pkg.always
";
        let fx = Fixture::new(&[("app.py", source)]);

        let ignored =
            get_normalized_imports(&fx.roots(), &fx.root.join("app.py"), true).unwrap();
        assert_eq!(
            refs(&ignored),
            vec![
                ("typing.TYPE_CHECKING", 1),
                ("pkg.runtime.Model", 6),
                ("pkg.always", 8),
            ]
        );

        let included =
            get_normalized_imports(&fx.roots(), &fx.root.join("app.py"), false).unwrap();
        assert!(
            included
                .iter()
                .any(|i| i.module_path == "pkg.types.Model" && i.line_number == 4)
        );
    }

    #[test]
    fn qualified_type_checking_guard_is_recognized() {
        let source = "\
import typing

if typing.TYPE_CHECKING:
    import pkg.types
";
        let fx = Fixture::new(&[("app.py", source)]);
        let imports =
            get_normalized_imports(&fx.roots(), &fx.root.join("app.py"), true).unwrap();
        assert_eq!(refs(&imports), vec![("typing", 1)]);
    }

    #[test]
    fn imports_nested_in_functions_are_found() {
        let source = "\
def handler():
    import pkg.lazy
    return pkg.lazy
";
        let fx = Fixture::new(&[("app.py", source)]);
        let imports =
            get_normalized_imports(&fx.roots(), &fx.root.join("app.py"), true).unwrap();
        assert_eq!(refs(&imports), vec![("pkg.lazy", 2)]);
    }

    #[test]
    fn project_and_external_flavors_partition_imports() {
        let fx = Fixture::new(&[
            ("pkg/__init__.py", ""),
            ("pkg/util.py", ""),
            ("app.py", "import requests\nfrom pkg.util import helper\n"),
        ]);

        let project =
            get_project_imports(&fx.roots(), &fx.root.join("app.py"), true).unwrap();
        assert_eq!(refs(&project), vec![("pkg.util.helper", 2)]);

        let external =
            get_external_imports(&fx.roots(), &fx.root.join("app.py"), true).unwrap();
        assert_eq!(refs(&external), vec![("requests", 1)]);
    }

    #[test]
    fn syntax_errors_surface_as_parse_errors() {
        let fx = Fixture::new(&[("bad.py", "def broken(:\n")]);
        let err = get_normalized_imports(&fx.roots(), &fx.root.join("bad.py"), true).unwrap_err();
        assert!(matches!(err, ParseError::Syntax(_)));
    }
}
