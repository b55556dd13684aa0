//! Textual dependency reports.
//!
//! For a given path the report lists the imports its module makes on the
//! rest of the project and the imports the rest of the project makes on it.
//! Content and ordering are deterministic for identical input.

use crate::check::CheckError;
use crate::config::ProjectConfig;
use crate::exclude::PathExclusions;
use crate::filesystem::{self, ROOT_MODULE_PATH};
use crate::modules::paths_share_hierarchy;
use crate::parser;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default)]
pub struct ReportOptions {
    /// When non-empty, only dependencies on these modules are listed.
    pub include_dependency_modules: Vec<String>,
    /// When non-empty, only usages from these modules are listed.
    pub include_usage_modules: Vec<String>,
    pub skip_dependencies: bool,
    pub skip_usages: bool,
}

struct ReportEntry {
    module_path: String,
    file_path: PathBuf,
    line_number: usize,
}

/// Render the dependency/usage report for the module at `path` (a file or
/// directory under one of the source roots).
pub fn create_dependency_report(
    project_root: &Path,
    project_config: &ProjectConfig,
    path: &Path,
    options: &ReportOptions,
) -> Result<String, CheckError> {
    let source_roots = project_config.prepend_roots(project_root);
    let exclusions =
        PathExclusions::new(&project_config.exclude, project_config.use_regex_matching)?;

    let target = path_to_module_path(&source_roots, path)?;

    let mut dependencies: Vec<ReportEntry> = Vec::new();
    let mut usages: Vec<ReportEntry> = Vec::new();
    let mut warnings: Vec<String> = Vec::new();

    let files = filesystem::walk_project_files(project_root, &source_roots, &exclusions);
    for file_path in &files {
        let Ok(file_mod_path) = filesystem::file_to_module_path(&source_roots, file_path) else {
            continue;
        };
        let file_in_target = contains_path(&target, &file_mod_path);

        let imports = match parser::get_project_imports(
            &source_roots,
            file_path,
            project_config.ignore_type_checking_imports,
        ) {
            Ok(imports) => imports,
            Err(err) => {
                warnings.push(format!("Skipping '{}': {}", file_path.display(), err));
                continue;
            }
        };

        for import in imports {
            let import_in_target = contains_path(&target, &import.module_path);
            let relative = file_path.strip_prefix(project_root).unwrap_or(file_path);
            if file_in_target && !import_in_target {
                dependencies.push(ReportEntry {
                    module_path: import.module_path,
                    file_path: relative.to_path_buf(),
                    line_number: import.line_number,
                });
            } else if !file_in_target && import_in_target {
                usages.push(ReportEntry {
                    module_path: file_mod_path.clone(),
                    file_path: relative.to_path_buf(),
                    line_number: import.line_number,
                });
            }
        }
    }

    filter_entries(&mut dependencies, &options.include_dependency_modules);
    filter_entries(&mut usages, &options.include_usage_modules);

    Ok(render(
        &target,
        project_config,
        &dependencies,
        &usages,
        &warnings,
        options,
    ))
}

/// Resolve a file or directory path to the module path it represents.
fn path_to_module_path(source_roots: &[PathBuf], path: &Path) -> Result<String, CheckError> {
    if path.is_file() {
        return filesystem::file_to_module_path(source_roots, path).map_err(|err| {
            CheckError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, err.to_string()))
        });
    }
    // Directories map to the package they define.
    let init = path.join(filesystem::PACKAGE_FILE_NAME);
    filesystem::file_to_module_path(source_roots, &init).map_err(|err| {
        CheckError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, err.to_string()))
    })
}

fn contains_path(container: &str, module_path: &str) -> bool {
    container == ROOT_MODULE_PATH
        || container == module_path
        || (paths_share_hierarchy(container, module_path)
            && module_path.len() > container.len())
}

fn filter_entries(entries: &mut Vec<ReportEntry>, include: &[String]) {
    if include.is_empty() {
        return;
    }
    entries.retain(|entry| {
        include
            .iter()
            .any(|module| module == &entry.module_path || contains_path(module, &entry.module_path))
    });
}

fn render(
    target: &str,
    project_config: &ProjectConfig,
    dependencies: &[ReportEntry],
    usages: &[ReportEntry],
    warnings: &[String],
    options: &ReportOptions,
) -> String {
    let mut out = String::new();

    if !options.skip_dependencies {
        out.push_str(&format!("[ Dependencies of '{target}' ]\n"));
        if let Some(declared) = project_config.dependencies_for_module(target) {
            for dependency in declared {
                let marker = if dependency.deprecated { " (deprecated)" } else { "" };
                out.push_str(&format!("declared: '{}'{}\n", dependency.path, marker));
            }
        }
        if dependencies.is_empty() {
            out.push_str("no observed dependencies\n");
        }
        for entry in dependencies {
            out.push_str(&format!(
                "'{}' ({}:{})\n",
                entry.module_path,
                entry.file_path.display(),
                entry.line_number
            ));
        }
    }

    if !options.skip_usages {
        out.push_str(&format!("[ Usages of '{target}' ]\n"));
        if usages.is_empty() {
            out.push_str("no observed usages\n");
        }
        for entry in usages {
            out.push_str(&format!(
                "'{}' ({}:{})\n",
                entry.module_path,
                entry.file_path.display(),
                entry.line_number
            ));
        }
    }

    if !warnings.is_empty() {
        out.push_str("[ Warnings ]\n");
        for warning in warnings {
            out.push_str(warning);
            out.push('\n');
        }
    }

    out
}
