//! External dependency checking.
//!
//! Maps each external import to candidate installable distribution names and
//! flags those the project never declares. Declared distributions come from
//! the `[project]` tables of `pyproject.toml` at the project root.

use crate::check::{BoundaryError, CheckError, CheckResult, ErrorInfo};
use crate::config::ProjectConfig;
use crate::exclude::PathExclusions;
use crate::filesystem;
use crate::parser;
use rayon::prelude::*;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

pub const PYPROJECT_FILE_NAME: &str = "pyproject.toml";

/// Outcome of an external dependency check.
#[derive(Debug, Default)]
pub struct ExternalCheckResult {
    /// Undeclared distribution names, keyed by the importing file's module
    /// path. Names are sorted and deduplicated per module.
    pub undeclared: BTreeMap<String, Vec<String>>,
    /// One error per offending import, with file and line attribution.
    pub errors: Vec<BoundaryError>,
    /// Files that could not be analyzed.
    pub warnings: Vec<String>,
}

/// Check every external import in the project against the declared
/// distributions. `module_mappings` translates import names to the
/// distributions that provide them (e.g. `yaml` -> `PyYAML`); imports with
/// no mapping are checked under their own name, never silently dropped.
pub fn check_external_dependencies(
    project_root: &Path,
    project_config: &ProjectConfig,
    module_mappings: &HashMap<String, Vec<String>>,
) -> Result<ExternalCheckResult, CheckError> {
    let source_roots = project_config.prepend_roots(project_root);
    let exclusions =
        PathExclusions::new(&project_config.exclude, project_config.use_regex_matching)?;

    let declared = declared_distributions(project_root)?;
    let excluded: HashSet<String> = project_config
        .external
        .exclude
        .iter()
        .map(|name| normalize_distribution_name(name))
        .collect();

    let files = filesystem::walk_project_files(project_root, &source_roots, &exclusions);

    let per_file: Vec<FileFindings> = files
        .par_iter()
        .map(|file_path| {
            check_file_externals(
                file_path,
                &source_roots,
                project_config,
                module_mappings,
                &declared,
                &excluded,
            )
        })
        .collect();

    let mut result = ExternalCheckResult::default();
    for findings in per_file {
        match findings {
            FileFindings::Skipped(warning) => result.warnings.push(warning),
            FileFindings::Checked { module_path, errors } => {
                for error in errors {
                    if let ErrorInfo::UndeclaredExternal { distributions } = &error.error_info {
                        result
                            .undeclared
                            .entry(module_path.clone())
                            .or_default()
                            .extend(distributions.iter().cloned());
                    }
                    result.errors.push(error);
                }
            }
        }
    }

    for names in result.undeclared.values_mut() {
        names.sort();
        names.dedup();
    }
    result
        .errors
        .sort_by(|a, b| (&a.file_path, a.line_number).cmp(&(&b.file_path, b.line_number)));
    Ok(result)
}

/// Fold an external check into a pass/fail `CheckResult` shape.
pub fn external_check_result(external: &ExternalCheckResult) -> CheckResult {
    CheckResult {
        errors: external.errors.clone(),
        deprecated_warnings: Vec::new(),
        warnings: external.warnings.clone(),
    }
}

enum FileFindings {
    Skipped(String),
    Checked {
        module_path: String,
        errors: Vec<BoundaryError>,
    },
}

fn check_file_externals(
    file_path: &Path,
    source_roots: &[PathBuf],
    project_config: &ProjectConfig,
    module_mappings: &HashMap<String, Vec<String>>,
    declared: &HashSet<String>,
    excluded: &HashSet<String>,
) -> FileFindings {
    let module_path = match filesystem::file_to_module_path(source_roots, file_path) {
        Ok(module_path) => module_path,
        Err(err) => {
            return FileFindings::Skipped(format!(
                "Skipping '{}': {}",
                file_path.display(),
                err
            ));
        }
    };

    let imports = match parser::get_external_imports(
        source_roots,
        file_path,
        project_config.ignore_type_checking_imports,
    ) {
        Ok(imports) => imports,
        Err(err) => {
            return FileFindings::Skipped(format!(
                "Skipping '{}': {}",
                file_path.display(),
                err
            ));
        }
    };

    let mut errors = Vec::new();
    for import in imports {
        let Some(top_level) = import.module_path.split('.').next() else {
            continue;
        };
        if is_standard_library(top_level) {
            continue;
        }

        let candidates: Vec<String> = match module_mappings.get(top_level) {
            Some(distributions) => distributions.clone(),
            None => vec![top_level.to_string()],
        };

        let satisfied = candidates.iter().any(|candidate| {
            let normalized = normalize_distribution_name(candidate);
            declared.contains(&normalized) || excluded.contains(&normalized)
        });
        if satisfied {
            continue;
        }

        errors.push(BoundaryError {
            file_path: file_path.to_path_buf(),
            line_number: import.line_number,
            import_mod_path: import.module_path.clone(),
            error_info: ErrorInfo::UndeclaredExternal {
                distributions: candidates,
            },
        });
    }

    FileFindings::Checked {
        module_path,
        errors,
    }
}

#[derive(Debug, Default, Deserialize)]
struct PyProject {
    #[serde(default)]
    project: PyProjectTables,
}

#[derive(Debug, Default, Deserialize)]
struct PyProjectTables {
    #[serde(default)]
    dependencies: Vec<String>,
    #[serde(default, rename = "optional-dependencies")]
    optional_dependencies: HashMap<String, Vec<String>>,
}

/// Distribution names declared in `pyproject.toml`, normalized. A missing
/// file means an empty declaration set, not an error.
fn declared_distributions(project_root: &Path) -> Result<HashSet<String>, CheckError> {
    let path = project_root.join(PYPROJECT_FILE_NAME);
    if !path.is_file() {
        return Ok(HashSet::new());
    }
    let content = std::fs::read_to_string(&path)?;
    let pyproject: PyProject = toml::from_str(&content)
        .map_err(|err| CheckError::Config(crate::config::ConfigError::Parse(err)))?;

    let mut declared = HashSet::new();
    for requirement in pyproject.project.dependencies.iter().chain(
        pyproject
            .project
            .optional_dependencies
            .values()
            .flatten(),
    ) {
        if let Some(name) = requirement_name(requirement) {
            declared.insert(normalize_distribution_name(&name));
        }
    }
    Ok(declared)
}

/// Extract the distribution name from a PEP 508 requirement string, i.e. the
/// leading token before any extras, version specifier, or marker.
fn requirement_name(requirement: &str) -> Option<String> {
    let name: String = requirement
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        .collect();
    (!name.is_empty()).then_some(name)
}

/// PEP 503 name normalization: case-insensitive, with runs of `-`, `_` and
/// `.` treated as a single `-`.
fn normalize_distribution_name(name: &str) -> String {
    let mut normalized = String::with_capacity(name.len());
    let mut previous_was_separator = false;
    for c in name.chars() {
        if matches!(c, '-' | '_' | '.') {
            if !previous_was_separator {
                normalized.push('-');
            }
            previous_was_separator = true;
        } else {
            normalized.extend(c.to_lowercase());
            previous_was_separator = false;
        }
    }
    normalized
}

/// Modules shipped with the interpreter never need declaring. This covers
/// the common cases; anything missed can be listed in `external.exclude`.
fn is_standard_library(top_level: &str) -> bool {
    const STDLIB: &[&str] = &[
        "abc", "argparse", "asyncio", "base64", "collections", "contextlib", "copy",
        "dataclasses", "datetime", "enum", "functools", "glob", "hashlib", "http", "importlib",
        "inspect", "io", "itertools", "json", "logging", "math", "os", "pathlib", "pickle",
        "platform", "queue", "random", "re", "shutil", "socket", "sqlite3", "string",
        "subprocess", "sys", "tempfile", "threading", "time", "traceback", "types", "typing",
        "unittest", "urllib", "uuid", "warnings", "weakref", "xml", "zipfile",
    ];
    STDLIB.contains(&top_level)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requirement_names_strip_specifiers() {
        assert_eq!(requirement_name("requests>=2.28"), Some("requests".into()));
        assert_eq!(
            requirement_name("uvicorn[standard]==0.20 ; python_version >= '3.8'"),
            Some("uvicorn".into())
        );
        assert_eq!(requirement_name("  Flask "), Some("Flask".into()));
        assert_eq!(requirement_name(""), None);
    }

    #[test]
    fn distribution_names_normalize_pep503_style() {
        assert_eq!(normalize_distribution_name("PyYAML"), "pyyaml");
        assert_eq!(normalize_distribution_name("typing_extensions"), "typing-extensions");
        assert_eq!(normalize_distribution_name("zope.interface"), "zope-interface");
        assert_eq!(normalize_distribution_name("a--b__c"), "a-b-c");
    }

    #[test]
    fn stdlib_modules_are_recognized() {
        assert!(is_standard_library("os"));
        assert!(is_standard_library("typing"));
        assert!(!is_standard_library("requests"));
    }
}
