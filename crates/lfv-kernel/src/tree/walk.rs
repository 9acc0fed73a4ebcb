//! Depth-bounded directory walk.
//!
//! The walk is a worklist of `(path, level)` jobs processed in breadth-first
//! waves. Each wave lists its directories with bounded fan-out, then the next
//! wave is built from the subdirectories that are still within depth. Nodes
//! live in a flat arena and are stitched into a [`WalkDirItem`] at the end.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use futures::StreamExt;
use futures::stream;

use super::DirectoryTree;
use crate::vfs::{VfsError, VfsResult, WalkDirItem};

/// Directory names never included in a walk.
pub const IGNORED_NAMES: &[&str] = &[".git", ".hg", ".svn", "node_modules"];

/// One listed entry, already filtered and classified.
#[derive(Debug)]
struct Listed {
    name: String,
    is_dir: bool,
    /// Directory that may be descended into. Symlinked directories are shown
    /// but never expanded, so link cycles cannot make the walk unbounded.
    expandable: bool,
}

struct Node {
    name: String,
    is_dir: bool,
    children: Option<Vec<usize>>,
}

struct Job {
    path: PathBuf,
    level: usize,
    node: usize,
}

impl DirectoryTree {
    pub(super) async fn walk_uncached(&self, dir: &Path, max_depth: usize) -> VfsResult<WalkDirItem> {
        let mut arena = vec![Node {
            name: display_name(dir),
            is_dir: true,
            children: None,
        }];
        let mut frontier = vec![Job {
            path: dir.to_path_buf(),
            level: 1,
            node: 0,
        }];

        while !frontier.is_empty() {
            let listings: Vec<(Job, VfsResult<Vec<Listed>>)> = stream::iter(frontier.drain(..))
                .map(|job| async move {
                    let listed = self.list_level(&job.path).await;
                    (job, listed)
                })
                .buffer_unordered(self.config.walk_concurrency.max(1))
                .collect()
                .await;

            let mut next = Vec::new();
            for (job, listed) in listings {
                let entries = match listed {
                    Ok(entries) => entries,
                    Err(e) if job.node == 0 => return Err(e),
                    Err(e) => {
                        tracing::warn!(path = %job.path.display(), error = %e, "skipping unreadable directory");
                        continue;
                    }
                };

                let mut ids = Vec::with_capacity(entries.len());
                for entry in entries {
                    let id = arena.len();
                    if entry.expandable && job.level <= max_depth {
                        next.push(Job {
                            path: job.path.join(&entry.name),
                            level: job.level.saturating_add(1),
                            node: id,
                        });
                    }
                    arena.push(Node {
                        name: entry.name,
                        is_dir: entry.is_dir,
                        children: None,
                    });
                    ids.push(id);
                }
                arena[job.node].children = Some(ids);
            }
            frontier = next;
        }

        Ok(assemble(&mut arena, 0))
    }

    /// List one directory: filter ignored names, stat every entry through the
    /// cache, sort directories first then files, both in natural order.
    async fn list_level(&self, dir: &Path) -> VfsResult<Vec<Listed>> {
        let mut read_dir = tokio::fs::read_dir(dir)
            .await
            .map_err(|e| VfsError::from_io(dir, e))?;

        let mut raw = Vec::new();
        while let Some(entry) = read_dir.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if IGNORED_NAMES.contains(&name.as_str()) {
                continue;
            }
            let is_link = entry
                .file_type()
                .await
                .map(|t| t.is_symlink())
                .unwrap_or(false);
            raw.push((name, is_link));
        }

        let stat_fanout = self.config.walk_concurrency.max(1) * 4;
        let stats: Vec<_> = stream::iter(raw)
            .map(|(name, is_link)| async move {
                let attr = self.stat(&dir.join(&name)).await;
                (name, is_link, attr)
            })
            .buffered(stat_fanout)
            .collect()
            .await;

        let mut dirs = Vec::new();
        let mut files = Vec::new();
        for (name, is_link, attr) in stats {
            let attr = match attr {
                Ok(attr) => attr,
                Err(e) => {
                    // dangling symlinks, races with deletion, permission errors
                    tracing::debug!(path = %dir.join(&name).display(), error = %e, "dropping entry");
                    continue;
                }
            };
            let is_dir = attr.is_dir();
            let listed = Listed {
                name,
                is_dir,
                expandable: is_dir && !is_link,
            };
            if is_dir {
                dirs.push(listed);
            } else {
                files.push(listed);
            }
        }

        dirs.sort_by(|a, b| natural_cmp(&a.name, &b.name));
        files.sort_by(|a, b| natural_cmp(&a.name, &b.name));
        dirs.extend(files);
        Ok(dirs)
    }
}

fn assemble(arena: &mut [Node], id: usize) -> WalkDirItem {
    let name = std::mem::take(&mut arena[id].name);
    let is_directory = arena[id].is_dir;
    let children = arena[id].children.take().map(|ids| {
        ids.into_iter()
            .map(|child| assemble(arena, child))
            .collect::<Vec<_>>()
    });
    WalkDirItem {
        name,
        is_directory,
        children,
    }
}

fn display_name(dir: &Path) -> String {
    dir.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| dir.to_string_lossy().into_owned())
}

/// Case-insensitive comparison that orders digit runs by numeric value, so
/// `file2` sorts before `file10`. Falls back to a plain comparison when two
/// names only differ in case or leading zeros, keeping the order total.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = a.chars().peekable();
    let mut right = b.chars().peekable();

    loop {
        let (l, r) = match (left.peek(), right.peek()) {
            (None, None) => break,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(&l), Some(&r)) => (l, r),
        };

        let ord = if l.is_ascii_digit() && r.is_ascii_digit() {
            let l_run = take_digits(&mut left);
            let r_run = take_digits(&mut right);
            cmp_digit_runs(&l_run, &r_run)
        } else {
            left.next();
            right.next();
            fold(l).cmp(&fold(r))
        };

        if ord != Ordering::Equal {
            return ord;
        }
    }

    a.cmp(b)
}

fn take_digits(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut run = String::new();
    while let Some(c) = chars.next_if(|c| c.is_ascii_digit()) {
        run.push(c);
    }
    run
}

fn cmp_digit_runs(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

fn fold(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}
