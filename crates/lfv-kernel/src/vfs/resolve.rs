//! Path resolution and confinement.
//!
//! Every externally supplied path goes through here before it touches the
//! filesystem. The check happens twice: once lexically on the normalized
//! path, and again on the canonical path so a symlink inside the sandbox
//! cannot point the caller outside of it.

use std::path::{Component, Path, PathBuf};

use super::error::{Boundary, VfsError, VfsResult};
use super::sandbox::Sandbox;

impl Sandbox {
    /// Resolve a user path, confined to the sandbox root.
    ///
    /// Relative input is resolved against the current base directory, and a
    /// leading `~` expands to the home directory.
    pub fn resolve_within_root(&self, raw: &str, is_directory: bool) -> VfsResult<PathBuf> {
        self.resolve_confined(raw, is_directory, self.root(), Boundary::Root)
    }

    /// Resolve a user path, confined to the current base directory.
    ///
    /// Used where the caller must stay inside the active folder even though
    /// the root may be wider (opening a preview, for example).
    pub fn resolve_within_base(&self, raw: &str, is_directory: bool) -> VfsResult<PathBuf> {
        let base = self.base();
        let resolved = self.resolve_within_root(raw, is_directory)?;
        if !resolved.starts_with(&base) {
            return Err(VfsError::out_of_bounds(&resolved, Boundary::Base));
        }
        Ok(resolved)
    }

    fn resolve_confined(
        &self,
        raw: &str,
        is_directory: bool,
        boundary_dir: &Path,
        boundary: Boundary,
    ) -> VfsResult<PathBuf> {
        if raw.trim().is_empty() {
            return Err(VfsError::invalid_path("no path provided"));
        }

        let candidate = lexical_resolve(&self.base(), raw);

        // Component-wise, so `/srv/root2` never passes for `/srv/root`.
        if !candidate.starts_with(boundary_dir) {
            return Err(VfsError::out_of_bounds(&candidate, boundary));
        }

        let canonical =
            dunce::canonicalize(&candidate).map_err(|e| VfsError::from_io(&candidate, e))?;
        if !canonical.starts_with(boundary_dir) {
            tracing::warn!(
                path = %candidate.display(),
                target = %canonical.display(),
                "symlink escapes sandbox"
            );
            return Err(VfsError::out_of_bounds(&candidate, boundary));
        }

        if is_directory && !canonical.is_dir() {
            return Err(VfsError::not_a_directory(&canonical));
        }

        Ok(canonical)
    }
}

/// Expand `~`, join onto `base` and normalize `.`/`..` without touching disk.
pub fn lexical_resolve(base: &Path, raw: &str) -> PathBuf {
    let expanded = shellexpand::tilde(raw);
    let path = Path::new(expanded.as_ref());
    if path.is_absolute() {
        normalize(path)
    } else {
        normalize(&base.join(path))
    }
}

/// Lexically normalize a path: drop `.`, fold `..` into its parent.
///
/// `..` at the filesystem root stays at the root, matching how the OS
/// treats `/..`.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(prefix) => out.push(prefix.as_os_str()),
            Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(name) => out.push(name),
        }
    }
    out
}
