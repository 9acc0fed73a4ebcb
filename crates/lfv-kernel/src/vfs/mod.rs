//! Sandboxed view of the host filesystem.
//!
//! Key components:
//!
//! - [`Sandbox`] - root boundary plus the movable base directory
//! - [`Sandbox::resolve_within_root`] / [`Sandbox::resolve_within_base`] -
//!   the only way an external path string becomes a filesystem path
//! - [`WalkDirItem`], [`FileAttr`], [`FileData`] - values handed to callers
//!
//! ## Design Decisions
//!
//! - **Read-only**: nothing here writes, renames or deletes.
//! - **Canonical paths out**: resolution returns canonical absolute paths,
//!   which are also the cache keys used by the tree layer.

mod error;
mod resolve;
mod sandbox;
mod types;

pub use error::{Boundary, VfsError, VfsResult};
pub use resolve::{lexical_resolve, normalize};
pub use sandbox::Sandbox;
pub use types::{Encoding, FileAttr, FileData, FileType, WalkDirItem};
