use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Duplicate module path in config: '{0}'")]
    DuplicateModule(String),
    #[error("Invalid exclude pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

/// One permitted dependency edge from an owning module.
///
/// Accepts both the shorthand string form (`depends_on = ["core"]`) and the
/// table form (`depends_on = [{ path = "core", deprecated = true }]`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyConfig {
    pub path: String,
    pub deprecated: bool,
}

impl DependencyConfig {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            deprecated: false,
        }
    }

    pub fn deprecated(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            deprecated: true,
        }
    }
}

impl<'de> Deserialize<'de> for DependencyConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Path(String),
            Full {
                path: String,
                #[serde(default)]
                deprecated: bool,
            },
        }

        match Raw::deserialize(deserializer)? {
            Raw::Path(path) => Ok(DependencyConfig {
                path,
                deprecated: false,
            }),
            Raw::Full { path, deprecated } => Ok(DependencyConfig { path, deprecated }),
        }
    }
}

impl Serialize for DependencyConfig {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if self.deprecated {
            use serde::ser::SerializeStruct;
            let mut s = serializer.serialize_struct("DependencyConfig", 2)?;
            s.serialize_field("path", &self.path)?;
            s.serialize_field("deprecated", &self.deprecated)?;
            s.end()
        } else {
            serializer.serialize_str(&self.path)
        }
    }
}

/// Policy for a single module: which modules it may depend on, and whether
/// imports into it are restricted to its public interface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModuleConfig {
    pub path: String,
    #[serde(default)]
    pub depends_on: Vec<DependencyConfig>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub strict: bool,
}

impl ModuleConfig {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            depends_on: Vec::new(),
            strict: false,
        }
    }
}

/// Cache backend selection. Only on-disk storage exists; the variant is an
/// enum so an unknown backend fails at config parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    #[default]
    Disk,
}

impl CacheBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheBackend::Disk => "disk",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    #[serde(default)]
    pub backend: CacheBackend,
    #[serde(default)]
    pub file_dependencies: Vec<String>,
    #[serde(default)]
    pub env_dependencies: Vec<String>,
}

impl CacheConfig {
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExternalDependencyConfig {
    /// Distribution names exempt from external dependency checking.
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl ExternalDependencyConfig {
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

pub const DEFAULT_EXCLUDE_PATHS: [&str; 5] = [
    "**/tests",
    "**/docs",
    "**/*__pycache__",
    "**/*egg-info",
    "**/venv",
];

fn default_excludes() -> Vec<String> {
    DEFAULT_EXCLUDE_PATHS.iter().map(|s| s.to_string()).collect()
}

fn default_source_roots() -> Vec<PathBuf> {
    vec![PathBuf::from(".")]
}

fn default_true() -> bool {
    true
}

fn is_false(value: &bool) -> bool {
    !*value
}

fn is_true(value: &bool) -> bool {
    *value
}

/// Central configuration for a checked project.
///
/// Parsed once per invocation from `modfence.toml` and immutable for the
/// duration of a check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    #[serde(default)]
    pub modules: Vec<ModuleConfig>,
    #[serde(default, skip_serializing_if = "CacheConfig::is_default")]
    pub cache: CacheConfig,
    #[serde(default, skip_serializing_if = "ExternalDependencyConfig::is_default")]
    pub external: ExternalDependencyConfig,
    #[serde(default = "default_excludes")]
    pub exclude: Vec<String>,
    #[serde(default = "default_source_roots")]
    pub source_roots: Vec<PathBuf>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub exact: bool,
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub ignore_type_checking_imports: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub forbid_circular_dependencies: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub use_regex_matching: bool,
    /// Whether imports between a module and its ancestors/descendants are
    /// implicitly allowed in `exact` mode. Outside `exact` mode the
    /// allowance always applies.
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub allow_hierarchy_imports: bool,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            modules: Vec::new(),
            cache: CacheConfig::default(),
            external: ExternalDependencyConfig::default(),
            exclude: default_excludes(),
            source_roots: default_source_roots(),
            exact: false,
            ignore_type_checking_imports: true,
            forbid_circular_dependencies: false,
            use_regex_matching: false,
            allow_hierarchy_imports: true,
        }
    }
}

impl ProjectConfig {
    /// Resolve the configured source roots against the project root.
    /// A root of `"."` means the project root itself.
    pub fn prepend_roots(&self, project_root: &Path) -> Vec<PathBuf> {
        self.source_roots
            .iter()
            .map(|root| {
                if root.as_os_str() == "." {
                    project_root.to_path_buf()
                } else {
                    project_root.join(root)
                }
            })
            .collect()
    }

    pub fn dependencies_for_module(&self, module: &str) -> Option<&[DependencyConfig]> {
        self.modules
            .iter()
            .find(|mod_config| mod_config.path == module)
            .map(|mod_config| mod_config.depends_on.as_slice())
    }

    pub fn module_paths(&self) -> Vec<&str> {
        self.modules.iter().map(|m| m.path.as_str()).collect()
    }

    /// Reject configs where two `[[modules]]` entries share a path.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen: HashSet<&str> = HashSet::new();
        for module in &self.modules {
            if !seen.insert(module.path.as_str()) {
                return Err(ConfigError::DuplicateModule(module.path.clone()));
            }
        }
        Ok(())
    }
}

/// Load and validate a project config from a TOML file.
pub fn parse_project_config(path: &Path) -> Result<ProjectConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config = parse_project_config_str(&content)?;
    Ok(config)
}

pub fn parse_project_config_str(content: &str) -> Result<ProjectConfig, ConfigError> {
    let config: ProjectConfig = toml::from_str(content)?;
    config.validate()?;
    Ok(config)
}

/// Render a config back to TOML, e.g. for tooling that rewrites the file.
pub fn dump_project_config(config: &ProjectConfig) -> Result<String, toml::ser::Error> {
    toml::to_string(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_config() {
        let config = parse_project_config_str(
            r#"
            [[modules]]
            path = "core"

            [[modules]]
            path = "api"
            depends_on = ["core"]
            "#,
        )
        .unwrap();

        assert_eq!(config.modules.len(), 2);
        assert_eq!(config.modules[1].depends_on[0].path, "core");
        assert!(!config.modules[1].depends_on[0].deprecated);
        assert!(config.ignore_type_checking_imports);
        assert_eq!(config.source_roots, vec![PathBuf::from(".")]);
    }

    #[test]
    fn parses_dependency_table_form() {
        let config = parse_project_config_str(
            r#"
            [[modules]]
            path = "api"
            depends_on = ["core", { path = "legacy", deprecated = true }]
            "#,
        )
        .unwrap();

        let deps = &config.modules[0].depends_on;
        assert_eq!(deps[0], DependencyConfig::new("core"));
        assert_eq!(deps[1], DependencyConfig::deprecated("legacy"));
    }

    #[test]
    fn rejects_duplicate_module_paths() {
        let err = parse_project_config_str(
            r#"
            [[modules]]
            path = "core"

            [[modules]]
            path = "core"
            "#,
        )
        .unwrap_err();

        assert!(matches!(err, ConfigError::DuplicateModule(path) if path == "core"));
    }

    #[test]
    fn rejects_unknown_cache_backend() {
        let err = parse_project_config_str(
            r#"
            [cache]
            backend = "redis"
            "#,
        )
        .unwrap_err();

        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn prepend_roots_resolves_dot_to_project_root() {
        let config = ProjectConfig {
            source_roots: vec![PathBuf::from("."), PathBuf::from("src")],
            ..Default::default()
        };

        let roots = config.prepend_roots(Path::new("/repo"));
        assert_eq!(roots[0], PathBuf::from("/repo"));
        assert_eq!(roots[1], PathBuf::from("/repo/src"));
    }

    #[test]
    fn dependency_roundtrips_through_toml() {
        let config = parse_project_config_str(
            r#"
            [[modules]]
            path = "api"
            depends_on = ["core", { path = "legacy", deprecated = true }]
            "#,
        )
        .unwrap();

        let dumped = dump_project_config(&config).unwrap();
        let reparsed = parse_project_config_str(&dumped).unwrap();
        assert_eq!(config.modules, reparsed.modules);
    }
}
