use crate::config::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Fatal failures that abort a check before any file is analyzed.
/// Per-file and per-edge findings never land here; they accumulate in
/// [`CheckResult`] instead.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// The reason a particular import was flagged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorInfo {
    /// The importing module declares no dependency on the target module.
    UndeclaredDependency {
        source_module: String,
        target_module: String,
    },
    /// The declared edge exists but is marked deprecated.
    DeprecatedDependency {
        source_module: String,
        target_module: String,
    },
    /// A strict module was imported past its public interface.
    PrivateImport {
        target_module: String,
        member: String,
    },
    /// The declared edge participates in a dependency cycle.
    CircularDependency { cycle: Vec<String> },
    /// An external import whose distribution is not declared for the project.
    UndeclaredExternal { distributions: Vec<String> },
    /// An import target that no declared module contains.
    ModuleNotFound { module_path: String },
    /// The module policy could not be applied (e.g. an unparseable strict
    /// interface).
    Configuration { message: String },
}

impl ErrorInfo {
    pub fn is_dependency_error(&self) -> bool {
        matches!(
            self,
            ErrorInfo::UndeclaredDependency { .. }
                | ErrorInfo::DeprecatedDependency { .. }
                | ErrorInfo::PrivateImport { .. }
                | ErrorInfo::CircularDependency { .. }
                | ErrorInfo::UndeclaredExternal { .. }
        )
    }

    pub fn is_deprecated(&self) -> bool {
        matches!(self, ErrorInfo::DeprecatedDependency { .. })
    }
}

impl fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorInfo::UndeclaredDependency {
                source_module,
                target_module,
            } => write!(
                f,
                "Module '{source_module}' does not declare a dependency on '{target_module}'"
            ),
            ErrorInfo::DeprecatedDependency {
                source_module,
                target_module,
            } => write!(
                f,
                "Dependency of '{source_module}' on '{target_module}' is deprecated"
            ),
            ErrorInfo::PrivateImport {
                target_module,
                member,
            } => write!(
                f,
                "'{member}' is not part of the public interface of strict module '{target_module}'"
            ),
            ErrorInfo::CircularDependency { cycle } => {
                write!(f, "Circular dependency: {}", cycle.join(" -> "))
            }
            ErrorInfo::UndeclaredExternal { distributions } => write!(
                f,
                "External dependency '{}' is not declared for this project",
                distributions.join("' / '")
            ),
            ErrorInfo::ModuleNotFound { module_path } => {
                write!(f, "Module containing '{module_path}' not found in project configuration")
            }
            ErrorInfo::Configuration { message } => write!(f, "{message}"),
        }
    }
}

/// One violation instance, attributed to an import at a specific line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundaryError {
    pub file_path: PathBuf,
    pub line_number: usize,
    pub import_mod_path: String,
    pub error_info: ErrorInfo,
}

impl fmt::Display for BoundaryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: {}",
            self.file_path.display(),
            self.line_number,
            self.error_info
        )
    }
}

/// Aggregate outcome of one check run. Created fresh per invocation and
/// immutable once returned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    pub errors: Vec<BoundaryError>,
    pub deprecated_warnings: Vec<BoundaryError>,
    pub warnings: Vec<String>,
}

impl CheckResult {
    /// Whether the run passed. Deprecation findings and advisory warnings
    /// never fail a run on their own.
    pub fn passed(&self) -> bool {
        self.errors.is_empty()
    }

    pub(crate) fn merge(&mut self, other: CheckResult) {
        self.errors.extend(other.errors);
        self.deprecated_warnings.extend(other.deprecated_warnings);
        self.warnings.extend(other.warnings);
    }

    /// Sort findings by file then line so result order is independent of
    /// scheduling.
    pub(crate) fn sort(&mut self) {
        self.errors
            .sort_by(|a, b| (&a.file_path, a.line_number).cmp(&(&b.file_path, b.line_number)));
        self.deprecated_warnings
            .sort_by(|a, b| (&a.file_path, a.line_number).cmp(&(&b.file_path, b.line_number)));
    }
}
