//! Typed configuration.
//!
//! The library only defines the shapes and their defaults; the server binary
//! fills them from CLI flags and environment variables.

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::vfs::{Sandbox, VfsError};

/// Largest file `read_file` will load.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;
/// Wall-clock limit for one external search tool run.
pub const DEFAULT_SEARCH_TIMEOUT: Duration = Duration::from_secs(10);
/// Results kept per search response.
pub const DEFAULT_MAX_RESULTS: usize = 100;
/// Entries the in-memory search visits before giving up.
pub const DEFAULT_MAX_MEMORY_ENTRIES: usize = 10_000;

/// Errors raised while turning configuration into running state.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("base folder is not set (pass --folder or set LFV_DEFAULT_FOLDER)")]
    MissingBaseFolder,

    #[error("invalid sandbox: {0}")]
    Sandbox(#[from] VfsError),
}

/// Top-level configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub sandbox: SandboxConfig,
    pub tree: TreeConfig,
    pub search: SearchConfig,
}

/// Where the sandbox starts and how far it may reach.
#[derive(Debug, Clone, Default)]
pub struct SandboxConfig {
    /// Initial base directory. Required.
    pub base: Option<PathBuf>,
    /// Outer boundary; the base directory when unset.
    pub root: Option<PathBuf>,
}

impl SandboxConfig {
    /// Build the sandbox. Fails if the base is missing, either folder does
    /// not exist, or the root does not contain the base.
    pub fn build(&self) -> Result<Sandbox, ConfigError> {
        let base = self.base.as_ref().ok_or(ConfigError::MissingBaseFolder)?;
        let base = expand(base);
        let root = self.root.as_deref().map(expand);
        Ok(Sandbox::new(base, root.as_deref())?)
    }
}

fn expand(path: &Path) -> PathBuf {
    match path.to_str() {
        Some(s) => PathBuf::from(shellexpand::tilde(s).into_owned()),
        None => path.to_path_buf(),
    }
}

/// Cache and walk tuning.
#[derive(Debug, Clone)]
pub struct TreeConfig {
    /// Capacity of each cache table.
    pub cache_capacity: usize,
    /// Directories listed concurrently during a walk.
    pub walk_concurrency: usize,
    pub max_file_size: u64,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            cache_capacity: 1024,
            walk_concurrency: 16,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

/// Search cascade tuning.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub use_ripgrep: bool,
    pub use_find: bool,
    pub use_memory_search: bool,
    pub timeout: Duration,
    pub max_results: usize,
    pub max_memory_entries: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            use_ripgrep: true,
            use_find: true,
            use_memory_search: true,
            timeout: DEFAULT_SEARCH_TIMEOUT,
            max_results: DEFAULT_MAX_RESULTS,
            max_memory_entries: DEFAULT_MAX_MEMORY_ENTRIES,
        }
    }
}
