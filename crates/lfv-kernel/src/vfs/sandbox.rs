//! Sandbox state: the root boundary and the currently active base directory.

use std::path::{Path, PathBuf};

use parking_lot::RwLock;

use super::error::{Boundary, VfsError, VfsResult};

/// Process-wide sandbox handle.
///
/// Constructed once at startup and shared behind an `Arc`. The root never
/// changes; the base directory moves via [`Sandbox::rebase`] (or
/// [`Sandbox::set_base_directory`] for callers that already validated the
/// target) and is always equal to or nested under the root.
#[derive(Debug)]
pub struct Sandbox {
    root: PathBuf,
    base: RwLock<PathBuf>,
}

impl Sandbox {
    /// Create a sandbox from a base folder and an optional wider root.
    ///
    /// Both are canonicalized (so `/tmp` → `/private/tmp` on macOS does not
    /// break prefix checks). Fails if either is missing or if the base is not
    /// inside the root.
    pub fn new(base: impl AsRef<Path>, root: Option<&Path>) -> VfsResult<Self> {
        let base = canonical_dir(base.as_ref())?;
        let root = match root {
            Some(root) => canonical_dir(root)?,
            None => base.clone(),
        };

        if !base.starts_with(&root) {
            return Err(VfsError::out_of_bounds(&base, Boundary::Root));
        }

        tracing::debug!(root = %root.display(), base = %base.display(), "sandbox created");

        Ok(Self {
            root,
            base: RwLock::new(base),
        })
    }

    /// The outermost boundary.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Snapshot of the current base directory.
    pub fn base(&self) -> PathBuf {
        self.base.read().clone()
    }

    /// Replace the base directory without validation.
    ///
    /// `dir` must come from [`Sandbox::resolve_within_root`] with
    /// `is_directory = true`. Caches are deliberately left alone: their keys
    /// are absolute paths, so entries under the old base stay correct.
    pub fn set_base_directory(&self, dir: PathBuf) {
        tracing::info!(base = %dir.display(), "base directory changed");
        *self.base.write() = dir;
    }

    /// Validate `raw` as a directory inside the root and make it the base.
    pub fn rebase(&self, raw: &str) -> VfsResult<PathBuf> {
        let dir = self.resolve_within_root(raw, true)?;
        self.set_base_directory(dir.clone());
        Ok(dir)
    }

    /// Express an absolute path relative to the root, for display.
    pub fn root_relative(&self, path: &Path) -> Option<PathBuf> {
        path.strip_prefix(&self.root).ok().map(Path::to_path_buf)
    }
}

fn canonical_dir(path: &Path) -> VfsResult<PathBuf> {
    let canonical = dunce::canonicalize(path).map_err(|e| VfsError::from_io(path, e))?;
    if !canonical.is_dir() {
        return Err(VfsError::not_a_directory(&canonical));
    }
    Ok(canonical)
}
