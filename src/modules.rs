//! The declared module hierarchy.
//!
//! Owning-module lookups are longest-prefix queries over dot-delimited
//! paths, so the declared modules are indexed as a trie rather than a
//! general graph.

use crate::config::ModuleConfig;
use crate::filesystem::{self, ROOT_MODULE_PATH};
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, Default)]
struct ModuleTreeNode {
    children: HashMap<String, ModuleTreeNode>,
    config: Option<ModuleConfig>,
}

/// Trie over declared module paths, answering "which declared module owns
/// this module path" via longest-prefix match.
#[derive(Debug, Default)]
pub struct ModuleTree {
    root: ModuleTreeNode,
}

impl ModuleTree {
    pub fn build(modules: &[ModuleConfig]) -> Self {
        let mut tree = Self::default();
        for module in modules {
            tree.insert(module.clone());
        }
        tree
    }

    fn insert(&mut self, module: ModuleConfig) {
        if module.path == ROOT_MODULE_PATH {
            self.root.config = Some(module);
            return;
        }
        let mut node = &mut self.root;
        for segment in module.path.split('.') {
            node = node.children.entry(segment.to_string()).or_default();
        }
        node.config = Some(module);
    }

    /// The nearest declared module containing `module_path`, if any.
    pub fn find_nearest(&self, module_path: &str) -> Option<&ModuleConfig> {
        let mut nearest = self.root.config.as_ref();
        if module_path == ROOT_MODULE_PATH {
            return nearest;
        }
        let mut node = &self.root;
        for segment in module_path.split('.') {
            match node.children.get(segment) {
                Some(child) => {
                    node = child;
                    if node.config.is_some() {
                        nearest = node.config.as_ref();
                    }
                }
                None => break,
            }
        }
        nearest
    }

    pub fn contains(&self, module_path: &str) -> bool {
        self.find_nearest(module_path)
            .is_some_and(|config| config.path == module_path)
    }
}

/// Whether one module path contains the other (or they are equal) in the
/// dot-delimited hierarchy.
pub fn paths_share_hierarchy(left: &str, right: &str) -> bool {
    left == right || is_path_prefix(left, right) || is_path_prefix(right, left)
}

fn is_path_prefix(prefix: &str, path: &str) -> bool {
    if prefix == ROOT_MODULE_PATH {
        return true;
    }
    path.strip_prefix(prefix)
        .is_some_and(|rest| rest.starts_with('.'))
}

pub struct ModuleValidation {
    pub valid: Vec<ModuleConfig>,
    pub warnings: Vec<String>,
}

/// Split declared modules into those that resolve to real source files and
/// those that do not. Missing modules are advisory; they are ignored rather
/// than failing the run.
pub fn validate_project_modules(
    source_roots: &[PathBuf],
    modules: &[ModuleConfig],
) -> ModuleValidation {
    let mut valid = Vec::with_capacity(modules.len());
    let mut warnings = Vec::new();

    for module in modules {
        let exists = module.path == ROOT_MODULE_PATH
            || filesystem::module_to_file_path(source_roots, &module.path).is_some();
        if exists {
            valid.push(module.clone());
        } else {
            warnings.push(format!(
                "Module '{}' not found under any source root. It will be ignored.",
                module.path
            ));
        }
    }

    ModuleValidation { valid, warnings }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree(paths: &[&str]) -> ModuleTree {
        let modules: Vec<ModuleConfig> = paths.iter().copied().map(ModuleConfig::new).collect();
        ModuleTree::build(&modules)
    }

    #[test]
    fn find_nearest_prefers_deepest_declared_prefix() {
        let tree = tree(&["pkg", "pkg.api", "other"]);

        assert_eq!(tree.find_nearest("pkg.api.handlers").unwrap().path, "pkg.api");
        assert_eq!(tree.find_nearest("pkg.util").unwrap().path, "pkg");
        assert_eq!(tree.find_nearest("other").unwrap().path, "other");
        assert!(tree.find_nearest("unrelated").is_none());
    }

    #[test]
    fn root_module_owns_everything_undeclared() {
        let tree = tree(&[".", "pkg"]);

        assert_eq!(tree.find_nearest("stray.helper").unwrap().path, ".");
        assert_eq!(tree.find_nearest("pkg.util").unwrap().path, "pkg");
    }

    #[test]
    fn hierarchy_check_requires_segment_boundary() {
        assert!(paths_share_hierarchy("pkg", "pkg.api"));
        assert!(paths_share_hierarchy("pkg.api", "pkg"));
        assert!(paths_share_hierarchy("pkg", "pkg"));
        assert!(!paths_share_hierarchy("pkg", "pkgextra"));
        assert!(!paths_share_hierarchy("pkg.api", "pkg.apiv2"));
    }
}
