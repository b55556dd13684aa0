//! The computation cache.
//!
//! A cache key digests every input the check result depends on: project
//! layout, the action being run, the interpreter version, tracked file
//! contents and environment values. Entries live as JSON files under the
//! project root and survive across invocations. Reads and writes both fail
//! open: a corrupt or unreadable store degrades to recomputation, never to a
//! failed check.

use crate::config::CacheBackend;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const CACHE_DIR: &str = ".modfence/cache";

/// Opaque digest identifying one computation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A stored computation result. The cache never interprets the payload; it
/// only stores and retrieves it by key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub diagnostics: Vec<(u32, String)>,
    pub exit_code: i32,
}

/// Derive the cache key for one action over the current project state.
///
/// The digest covers, in order: the project root, the source roots (sorted,
/// so declaration order does not perturb the key), the action identifier,
/// the runtime version string, each tracked file's path and the SHA-256 of
/// its bytes as read right now, each tracked environment variable's name and
/// current value, and the backend tag. Fields are separated by NUL so no
/// concatenation of distinct inputs can collide. A missing file and an unset
/// environment variable each contribute their own marker, distinct from
/// empty contents and from the empty string.
pub fn create_computation_cache_key(
    project_root: &Path,
    source_roots: &[PathBuf],
    action: &str,
    runtime_version: &str,
    file_dependencies: &[String],
    env_dependencies: &[String],
    backend: CacheBackend,
) -> CacheKey {
    let mut hasher = Sha256::new();
    let mut feed = |part: &[u8]| {
        hasher.update(part);
        hasher.update(b"\0");
    };

    feed(project_root.to_string_lossy().as_bytes());

    let mut roots: Vec<String> = source_roots
        .iter()
        .map(|root| root.to_string_lossy().into_owned())
        .collect();
    roots.sort();
    for root in &roots {
        feed(root.as_bytes());
    }

    feed(action.as_bytes());
    feed(runtime_version.as_bytes());

    for file in file_dependencies {
        feed(file.as_bytes());
        match std::fs::read(project_root.join(file)) {
            Ok(bytes) => {
                let digest = Sha256::digest(&bytes);
                feed(digest.as_slice());
            }
            Err(_) => feed(b"<missing>"),
        }
    }

    for name in env_dependencies {
        feed(name.as_bytes());
        match std::env::var(name) {
            Ok(value) => feed(value.as_bytes()),
            Err(_) => feed(b"<unset>"),
        }
    }

    feed(backend.as_str().as_bytes());

    CacheKey(hex::encode(hasher.finalize()))
}

/// Look up a previously stored result. Absence and unreadable or corrupt
/// storage are indistinguishable to the caller; both are a miss.
pub fn check_computation_cache(project_root: &Path, cache_key: &CacheKey) -> Option<CacheEntry> {
    let path = entry_path(project_root, cache_key);
    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(err) => {
            if err.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %path.display(), %err, "cache entry unreadable, treating as miss");
            }
            debug!(key = %cache_key, "cache miss");
            return None;
        }
    };
    match serde_json::from_str(&content) {
        Ok(entry) => {
            debug!(key = %cache_key, "cache hit");
            Some(entry)
        }
        Err(err) => {
            warn!(path = %path.display(), %err, "cache entry corrupt, treating as miss");
            None
        }
    }
}

/// Store a result under its key. Writes go to a temp sibling and are renamed
/// into place, so a concurrent reader sees either the old entry or the new
/// one, never a partial file. Last write wins. Failures are logged and
/// swallowed; the cache is an accelerator, not a dependency.
pub fn update_computation_cache(project_root: &Path, cache_key: &CacheKey, value: &CacheEntry) {
    let path = entry_path(project_root, cache_key);
    if let Err(err) = write_entry(&path, value) {
        warn!(path = %path.display(), %err, "failed to write cache entry");
    }
}

fn write_entry(path: &Path, value: &CacheEntry) -> std::io::Result<()> {
    let parent = path.parent().expect("cache entry path has a parent");
    std::fs::create_dir_all(parent)?;
    let serialized = serde_json::to_string(value)
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err))?;
    let temp = path.with_extension(format!("tmp.{}", std::process::id()));
    std::fs::write(&temp, serialized)?;
    std::fs::rename(&temp, path)
}

fn entry_path(project_root: &Path, cache_key: &CacheKey) -> PathBuf {
    project_root
        .join(CACHE_DIR)
        .join(format!("{}.json", cache_key.as_str()))
}
