pub mod cache;
pub mod check;
pub mod config;
pub mod exclude;
pub mod external;
pub mod filesystem;
pub mod graph;
pub mod modules;
pub mod parser;
pub mod report;

pub use cache::{
    CacheEntry, CacheKey, check_computation_cache, create_computation_cache_key,
    update_computation_cache,
};
pub use check::{BoundaryError, CheckError, CheckResult, ErrorInfo, check, check_with_config};
pub use config::{
    CacheBackend, CacheConfig, ConfigError, DependencyConfig, ExternalDependencyConfig,
    ModuleConfig, ProjectConfig, parse_project_config,
};
pub use external::{ExternalCheckResult, check_external_dependencies};
pub use parser::{ImportReference, ParseError, parse_interface_members};
pub use report::{ReportOptions, create_dependency_report};
