//! # lfv-kernel
//!
//! Sandboxed, read-only view of a host directory for a browser file viewer.
//!
//! - [`Sandbox`] holds the root boundary and the movable base directory, and
//!   is the only place external path strings become filesystem paths.
//! - [`DirectoryTree`] walks and memoizes directories, stats and file
//!   contents, and drops stale content when a file that was read changes.
//! - [`SearchEngine`] answers filename and content searches through an
//!   ordered cascade of external tools with an in-memory fallback.

pub mod complete;
pub mod config;
pub mod content;
pub mod search;
pub mod tree;
pub mod vfs;

pub use complete::{DirCompletion, complete_directory};
pub use config::{Config, ConfigError, SandboxConfig, SearchConfig, TreeConfig};
pub use content::TextStats;
pub use search::{
    MatchType, SearchEngine, SearchError, SearchHit, SearchResponse, SearchResult,
    SearchStrategy, SearchType,
};
pub use tree::{ChangeKind, ChangeWatcher, DirectoryTree, FileChange, UNBOUNDED};
pub use vfs::{
    Boundary, Encoding, FileAttr, FileData, FileType, Sandbox, VfsError, VfsResult, WalkDirItem,
};
