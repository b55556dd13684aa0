//! Filesystem concerns: walking source roots and mapping between file paths
//! and dot-delimited module paths.

use crate::exclude::PathExclusions;
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const PYTHON_EXTENSION: &str = "py";
pub const PACKAGE_FILE_NAME: &str = "__init__.py";

/// Module path of the root package of a source root.
pub const ROOT_MODULE_PATH: &str = ".";

#[derive(Debug, Error)]
pub enum LocateError {
    #[error("File '{0}' is not contained in any configured source root")]
    OutsideSourceRoots(PathBuf),
}

pub fn read_file_content(path: &Path) -> std::io::Result<String> {
    std::fs::read_to_string(path)
}

/// Map a file path to its module path, relative to the matching source root.
///
/// When roots are nested the most specific (longest) match wins; ties are
/// broken by declaration order, first root listed winning.
pub fn file_to_module_path(source_roots: &[PathBuf], file_path: &Path) -> Result<String, LocateError> {
    let mut best: Option<(usize, &PathBuf)> = None;
    for root in source_roots {
        if file_path.starts_with(root) {
            let depth = root.components().count();
            let better = match best {
                Some((best_depth, _)) => depth > best_depth,
                None => true,
            };
            if better {
                best = Some((depth, root));
            }
        }
    }

    let (_, root) = best.ok_or_else(|| LocateError::OutsideSourceRoots(file_path.to_path_buf()))?;
    let relative = file_path
        .strip_prefix(root)
        .expect("matched root must be a prefix");

    let mut parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();

    if let Some(file_name) = parts.pop() {
        let stem = file_name
            .strip_suffix(".py")
            .unwrap_or(file_name.as_str())
            .to_string();
        if stem != "__init__" {
            parts.push(stem);
        }
    }

    if parts.is_empty() {
        Ok(ROOT_MODULE_PATH.to_string())
    } else {
        Ok(parts.join("."))
    }
}

/// Map a module path to the file that defines it: either `<path>.py` or the
/// package's `__init__.py`. The first root containing such a file wins.
pub fn module_to_file_path(source_roots: &[PathBuf], module_path: &str) -> Option<PathBuf> {
    for root in source_roots {
        if module_path == ROOT_MODULE_PATH {
            let init = root.join(PACKAGE_FILE_NAME);
            if init.exists() {
                return Some(init);
            }
            continue;
        }

        let base = root.join(module_path.replace('.', std::path::MAIN_SEPARATOR_STR));
        let as_file = base.with_extension(PYTHON_EXTENSION);
        if as_file.is_file() {
            return Some(as_file);
        }
        let as_package = base.join(PACKAGE_FILE_NAME);
        if as_package.is_file() {
            return Some(as_package);
        }
    }
    None
}

/// Whether a module path refers to code under one of the source roots.
///
/// Extracted import paths may end in a symbol name rather than a module
/// (`from a.b import name` yields `a.b.name`), so every dot-prefix of the
/// path is tried, longest first.
pub fn is_project_import(source_roots: &[PathBuf], module_path: &str) -> bool {
    let parts: Vec<&str> = module_path.split('.').collect();
    for end in (1..=parts.len()).rev() {
        let prefix = parts[..end].join(".");
        if module_to_file_path(source_roots, &prefix).is_some() {
            return true;
        }
    }
    false
}

/// Walk every source root and collect the Python files subject to checking,
/// skipping excluded paths. The result is sorted so traversal order does not
/// depend on filesystem iteration order.
pub fn walk_project_files(
    project_root: &Path,
    source_roots: &[PathBuf],
    exclusions: &PathExclusions,
) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for root in source_roots {
        if !root.is_dir() {
            continue;
        }
        let walker = WalkBuilder::new(root).hidden(true).git_ignore(true).build();
        for entry in walker.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if path.extension().and_then(|e| e.to_str()) != Some(PYTHON_EXTENSION) {
                continue;
            }
            let relative = path.strip_prefix(project_root).unwrap_or(path);
            if exclusions.is_excluded(relative) {
                continue;
            }
            files.push(path.to_path_buf());
        }
    }

    files.sort();
    files.dedup();
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    #[test]
    fn maps_file_to_module_path() {
        let roots = vec![PathBuf::from("/repo/src")];

        assert_eq!(
            file_to_module_path(&roots, Path::new("/repo/src/pkg/mod_a.py")).unwrap(),
            "pkg.mod_a"
        );
        assert_eq!(
            file_to_module_path(&roots, Path::new("/repo/src/pkg/__init__.py")).unwrap(),
            "pkg"
        );
        assert_eq!(
            file_to_module_path(&roots, Path::new("/repo/src/__init__.py")).unwrap(),
            ROOT_MODULE_PATH
        );
    }

    #[test]
    fn locate_fails_outside_all_roots() {
        let roots = vec![PathBuf::from("/repo/src")];
        let err = file_to_module_path(&roots, Path::new("/elsewhere/x.py")).unwrap_err();
        assert!(matches!(err, LocateError::OutsideSourceRoots(_)));
    }

    #[test]
    fn nested_roots_prefer_longest_match() {
        let roots = vec![PathBuf::from("/repo/src"), PathBuf::from("/repo/src/vendored")];
        assert_eq!(
            file_to_module_path(&roots, Path::new("/repo/src/vendored/lib.py")).unwrap(),
            "lib"
        );
    }

    #[test]
    fn equal_roots_prefer_first_declared() {
        // Two identical roots: the first listed must win the tie.
        let roots = vec![PathBuf::from("/repo/a"), PathBuf::from("/repo/a")];
        assert_eq!(
            file_to_module_path(&roots, Path::new("/repo/a/m.py")).unwrap(),
            "m"
        );
    }

    #[test]
    fn resolves_module_to_file_or_package() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().to_path_buf();
        touch(&root.join("pkg/__init__.py"));
        touch(&root.join("pkg/util.py"));

        let roots = vec![root.clone()];
        assert_eq!(
            module_to_file_path(&roots, "pkg").unwrap(),
            root.join("pkg/__init__.py")
        );
        assert_eq!(
            module_to_file_path(&roots, "pkg.util").unwrap(),
            root.join("pkg/util.py")
        );
        assert_eq!(module_to_file_path(&roots, "missing"), None);
    }

    #[test]
    fn project_import_matches_symbol_suffix() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().to_path_buf();
        touch(&root.join("pkg/__init__.py"));
        touch(&root.join("pkg/util.py"));

        let roots = vec![root];
        assert!(is_project_import(&roots, "pkg.util"));
        // `from pkg.util import helper` extracts `pkg.util.helper`
        assert!(is_project_import(&roots, "pkg.util.helper"));
        assert!(!is_project_import(&roots, "requests.sessions"));
    }
}
