//! The boundary checking engine.
//!
//! `check` walks the project, extracts each file's imports, and evaluates
//! them against the declared module policy. Per-file work is independent and
//! runs in parallel; results are merged and sorted so output order does not
//! depend on scheduling.

mod error;

pub use error::{BoundaryError, CheckError, CheckResult, ErrorInfo};

use crate::config::{ModuleConfig, ProjectConfig, parse_project_config};
use crate::exclude::PathExclusions;
use crate::filesystem;
use crate::graph::ModuleDependencyGraph;
use crate::modules::{self, ModuleTree, paths_share_hierarchy};
use crate::parser::{self, ImportReference};
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Run a full boundary check against the config stored at
/// `project_config_path`. `exclude_paths` supplements the config's own
/// exclusion patterns.
pub fn check(
    project_root: &Path,
    project_config_path: &Path,
    exclude_paths: &[String],
) -> Result<CheckResult, CheckError> {
    let project_config = parse_project_config(project_config_path)?;
    check_with_config(project_root, &project_config, exclude_paths)
}

/// Run a full boundary check with an already-parsed config.
pub fn check_with_config(
    project_root: &Path,
    project_config: &ProjectConfig,
    exclude_paths: &[String],
) -> Result<CheckResult, CheckError> {
    project_config.validate()?;
    let source_roots = project_config.prepend_roots(project_root);

    let mut patterns = project_config.exclude.clone();
    patterns.extend(exclude_paths.iter().cloned());
    let exclusions = PathExclusions::new(&patterns, project_config.use_regex_matching)?;

    let mut result = CheckResult::default();

    let validation = modules::validate_project_modules(&source_roots, &project_config.modules);
    result.warnings.extend(validation.warnings);

    let module_tree = ModuleTree::build(&validation.valid);
    let (graph, graph_warnings) = ModuleDependencyGraph::build(&validation.valid);
    result.warnings.extend(graph_warnings);

    // Strict interfaces are parsed once here; the parallel phase only reads.
    let interfaces = collect_strict_interfaces(&source_roots, &validation.valid);

    let files = filesystem::walk_project_files(project_root, &source_roots, &exclusions);
    debug!(files = files.len(), "collected project files for checking");

    let context = CheckContext {
        source_roots: &source_roots,
        project_config,
        module_tree: &module_tree,
        graph: &graph,
        interfaces: &interfaces,
    };

    let file_results: Vec<CheckResult> = files
        .par_iter()
        .map(|file_path| check_file(file_path, &context))
        .collect();
    for file_result in file_results {
        result.merge(file_result);
    }

    if project_config.forbid_circular_dependencies {
        result
            .errors
            .extend(circular_dependency_errors(&graph, &source_roots));
    }

    result.sort();
    Ok(result)
}

struct CheckContext<'a> {
    source_roots: &'a [PathBuf],
    project_config: &'a ProjectConfig,
    module_tree: &'a ModuleTree,
    graph: &'a ModuleDependencyGraph,
    interfaces: &'a HashMap<String, Result<Vec<String>, String>>,
}

fn collect_strict_interfaces(
    source_roots: &[PathBuf],
    module_configs: &[ModuleConfig],
) -> HashMap<String, Result<Vec<String>, String>> {
    module_configs
        .iter()
        .filter(|module| module.strict)
        .map(|module| {
            let members = parser::parse_interface_members(source_roots, &module.path)
                .map_err(|err| err.to_string());
            (module.path.clone(), members)
        })
        .collect()
}

fn check_file(file_path: &Path, context: &CheckContext<'_>) -> CheckResult {
    let mut result = CheckResult::default();

    let mod_path = match filesystem::file_to_module_path(context.source_roots, file_path) {
        Ok(mod_path) => mod_path,
        Err(err) => {
            result
                .warnings
                .push(format!("Skipping '{}': {}", file_path.display(), err));
            return result;
        }
    };

    // Files outside every declared module are not governed by the policy.
    let Some(module) = context.module_tree.find_nearest(&mod_path) else {
        return result;
    };

    let imports = match parser::get_project_imports(
        context.source_roots,
        file_path,
        context.project_config.ignore_type_checking_imports,
    ) {
        Ok(imports) => imports,
        Err(err) => {
            result
                .warnings
                .push(format!("Skipping '{}': {}", file_path.display(), err));
            return result;
        }
    };

    for import in imports {
        check_import(&import, file_path, module, context, &mut result);
    }
    result
}

fn check_import(
    import: &ImportReference,
    file_path: &Path,
    module: &ModuleConfig,
    context: &CheckContext<'_>,
    result: &mut CheckResult,
) {
    let Some(target) = context.module_tree.find_nearest(&import.module_path) else {
        let info = ErrorInfo::ModuleNotFound {
            module_path: import.module_path.clone(),
        };
        result.warnings.push(format!(
            "{}:{}: {}",
            file_path.display(),
            import.line_number,
            info
        ));
        return;
    };

    if target.path == module.path {
        return;
    }

    // Imports within one module hierarchy are implicitly allowed; `exact`
    // mode can opt out via `allow_hierarchy_imports = false`.
    if paths_share_hierarchy(&module.path, &target.path)
        && (!context.project_config.exact || context.project_config.allow_hierarchy_imports)
    {
        return;
    }

    let Some(edge) = context.graph.edge(&module.path, &target.path) else {
        result.errors.push(BoundaryError {
            file_path: file_path.to_path_buf(),
            line_number: import.line_number,
            import_mod_path: import.module_path.clone(),
            error_info: ErrorInfo::UndeclaredDependency {
                source_module: module.path.clone(),
                target_module: target.path.clone(),
            },
        });
        return;
    };

    if edge.deprecated {
        result.deprecated_warnings.push(BoundaryError {
            file_path: file_path.to_path_buf(),
            line_number: import.line_number,
            import_mod_path: import.module_path.clone(),
            error_info: ErrorInfo::DeprecatedDependency {
                source_module: module.path.clone(),
                target_module: target.path.clone(),
            },
        });
    }

    if target.strict {
        check_strict_import(import, file_path, target, context, result);
    }
}

/// Strict modules restrict imports to their declared public surface, not
/// merely to permitted module pairs.
fn check_strict_import(
    import: &ImportReference,
    file_path: &Path,
    target: &ModuleConfig,
    context: &CheckContext<'_>,
    result: &mut CheckResult,
) {
    // Importing the module itself is always within the interface.
    let Some(member) = strict_member(&import.module_path, &target.path) else {
        return;
    };

    match context.interfaces.get(&target.path) {
        Some(Ok(members)) => {
            if !members.iter().any(|m| m == member) {
                result.errors.push(BoundaryError {
                    file_path: file_path.to_path_buf(),
                    line_number: import.line_number,
                    import_mod_path: import.module_path.clone(),
                    error_info: ErrorInfo::PrivateImport {
                        target_module: target.path.clone(),
                        member: member.to_string(),
                    },
                });
            }
        }
        Some(Err(message)) => {
            result.errors.push(BoundaryError {
                file_path: file_path.to_path_buf(),
                line_number: import.line_number,
                import_mod_path: import.module_path.clone(),
                error_info: ErrorInfo::Configuration {
                    message: format!(
                        "Could not determine interface of strict module '{}': {message}",
                        target.path
                    ),
                },
            });
        }
        None => {}
    }
}

/// The first path segment past the strict module's own path, i.e. the member
/// being reached into. None when the import refers to the module itself.
fn strict_member<'a>(import_path: &'a str, module_path: &str) -> Option<&'a str> {
    import_path
        .strip_prefix(module_path)
        .and_then(|rest| rest.strip_prefix('.'))
        .and_then(|rest| rest.split('.').next())
        .filter(|member| !member.is_empty())
}

/// Circular dependencies are a property of the declared graph, found once
/// per run. Each participating edge produces one error attributed to the
/// source module's defining file.
fn circular_dependency_errors(
    graph: &ModuleDependencyGraph,
    source_roots: &[PathBuf],
) -> Vec<BoundaryError> {
    graph
        .cycle_edges()
        .into_iter()
        .map(|edge| {
            let file_path = filesystem::module_to_file_path(source_roots, &edge.from)
                .unwrap_or_else(|| PathBuf::from(&edge.from));
            BoundaryError {
                file_path,
                line_number: 1,
                import_mod_path: edge.to,
                error_info: ErrorInfo::CircularDependency { cycle: edge.cycle },
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_member_extraction() {
        assert_eq!(strict_member("pkg.core.engine", "pkg.core"), Some("engine"));
        assert_eq!(
            strict_member("pkg.core.engine.inner", "pkg.core"),
            Some("engine")
        );
        assert_eq!(strict_member("pkg.core", "pkg.core"), None);
        assert_eq!(strict_member("pkg.corelib.x", "pkg.core"), None);
    }
}
