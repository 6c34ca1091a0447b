//! Source directory indexing.
//!
//! Walks the source root exactly once, top-down, and builds a [`SourceTree`]
//! whose directories mirror the filesystem and whose pages are the files with
//! a recognized extension.
//!
//! ## Walk Order
//!
//! For every directory the indexer:
//!
//! 1. records its modification time, then reads the listing once, in the
//!    order the filesystem returns it;
//! 2. attaches a child node for each readable subdirectory;
//! 3. creates a [`PageEntry`] for each recognized file;
//! 4. descends into the children, depth-first.
//!
//! File contents are never read. Only names, extensions and modification
//! times are consulted; the output file's modification time is read too, so a
//! fresh tree already carries build decisions.
//!
//! ## Skipped Entries
//!
//! - Names starting with `.` (hidden files and directories)
//! - Files whose extension is not in the [`FileTypes`] registry
//! - Symlinks pointing at directories (the tree stays acyclic)
//!
//! ## Unreadable Entries
//!
//! A subdirectory that cannot be listed, or a file that cannot be stat'ed
//! (permissions, deleted mid-walk, dangling symlink), follows the configured
//! [`OnUnreadable`] policy: `Skip` leaves it out of the tree with a warning and
//! records it in [`IndexStats::skipped`]; `Abort` fails the whole pass. The
//! source root itself must always be readable.

use crate::page::{FileTypes, OutputLayout, PageEntry, dest_modified_at, modified_utc};
use crate::tree::{NodeId, SourceTree};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Source directory not found: {0}")]
    MissingRoot(PathBuf),
    #[error("Source root is not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("Cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Policy for files and directories that cannot be read during the walk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnUnreadable {
    /// Leave the entry out of the tree and log a warning.
    #[default]
    Skip,
    /// Fail the indexing pass.
    Abort,
}

/// Counters collected during one indexing pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexStats {
    pub directories: usize,
    pub pages: usize,
    /// Files with no recognized extension.
    pub ignored: usize,
    /// Entries left out because they could not be read.
    pub skipped: Vec<PathBuf>,
}

/// Builds a [`SourceTree`] from a source directory.
pub struct TreeIndexer<'a> {
    types: &'a FileTypes,
    layout: &'a OutputLayout,
    on_unreadable: OnUnreadable,
}

/// Immediate contents of one directory, split by kind.
struct Listing {
    modified: DateTime<Utc>,
    dirs: Vec<PathBuf>,
    files: Vec<PathBuf>,
}

impl<'a> TreeIndexer<'a> {
    pub fn new(types: &'a FileTypes, layout: &'a OutputLayout) -> Self {
        Self {
            types,
            layout,
            on_unreadable: OnUnreadable::default(),
        }
    }

    pub fn on_unreadable(mut self, policy: OnUnreadable) -> Self {
        self.on_unreadable = policy;
        self
    }

    /// Index `source_root`, reading output timestamps under `dest_root`.
    pub fn index(&self, source_root: &Path, dest_root: &Path) -> Result<SourceTree, IndexError> {
        self.index_with_stats(source_root, dest_root)
            .map(|(tree, _)| tree)
    }

    pub fn index_with_stats(
        &self,
        source_root: &Path,
        dest_root: &Path,
    ) -> Result<(SourceTree, IndexStats), IndexError> {
        match fs::metadata(source_root) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => return Err(IndexError::NotADirectory(source_root.to_path_buf())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(IndexError::MissingRoot(source_root.to_path_buf()));
            }
            Err(source) => {
                return Err(IndexError::Io {
                    path: source_root.to_path_buf(),
                    source,
                });
            }
        }

        let mut walk = Walk {
            source_root,
            dest_root,
            tree: SourceTree::new(source_root.to_path_buf()),
            stats: IndexStats::default(),
        };

        let root_listing = self.read_listing(source_root, Path::new(""), &mut walk.stats)?;
        walk.tree.set_dir_modified(NodeId::ROOT, Some(root_listing.modified));
        walk.stats.directories += 1;
        self.walk(&mut walk, NodeId::ROOT, Path::new(""), root_listing)?;

        info!(
            "Indexed {} pages in {} directories ({} ignored, {} skipped)",
            walk.stats.pages,
            walk.stats.directories,
            walk.stats.ignored,
            walk.stats.skipped.len()
        );
        Ok((walk.tree, walk.stats))
    }

    fn walk(
        &self,
        walk: &mut Walk<'_>,
        node: NodeId,
        rel_dir: &Path,
        listing: Listing,
    ) -> Result<(), IndexError> {
        let mut pending = Vec::with_capacity(listing.dirs.len());
        for rel in listing.dirs {
            let abs = walk.source_root.join(&rel);
            match self.read_listing(&abs, &rel, &mut walk.stats) {
                Ok(child_listing) => {
                    let id = walk.tree.add_dir(node, rel.clone());
                    walk.tree.set_dir_modified(id, Some(child_listing.modified));
                    walk.stats.directories += 1;
                    pending.push((id, rel, child_listing));
                }
                // The directory itself could not be read.
                Err(IndexError::Io { path, source }) if path == abs => {
                    self.unreadable(&path, source, &mut walk.stats)?
                }
                Err(e) => return Err(e),
            }
        }

        for rel in listing.files {
            let Some(kind) = self.types.kind_of(&rel) else {
                debug!("Ignoring unsupported file {}", rel.display());
                walk.stats.ignored += 1;
                continue;
            };
            let abs = walk.source_root.join(&rel);
            let source_modified = match fs::metadata(&abs).and_then(|m| modified_utc(&m)) {
                Ok(t) => t,
                Err(e) => {
                    self.unreadable(&abs, e, &mut walk.stats)?;
                    continue;
                }
            };
            let dest_modified = dest_modified_at(&walk.dest_root.join(self.layout.dest_for(&rel)));
            walk.tree.add_entry(
                node,
                PageEntry::new(rel, kind, source_modified, dest_modified, self.layout),
            );
            walk.stats.pages += 1;
        }

        debug!("Indexed directory {}", rel_dir.display());
        for (id, rel, child_listing) in pending {
            self.walk(walk, id, &rel, child_listing)?;
        }
        Ok(())
    }

    /// List a directory's immediate children as root-relative paths.
    ///
    /// Errors reading the directory itself carry `abs_dir` as their path.
    /// Entries whose type cannot be read go through the unreadable policy.
    fn read_listing(
        &self,
        abs_dir: &Path,
        rel_dir: &Path,
        stats: &mut IndexStats,
    ) -> Result<Listing, IndexError> {
        let dir_error = |source| IndexError::Io {
            path: abs_dir.to_path_buf(),
            source,
        };
        // Stat before listing so a file added mid-walk still moves the time.
        let modified = fs::metadata(abs_dir)
            .and_then(|m| modified_utc(&m))
            .map_err(dir_error)?;
        let mut listing = Listing {
            modified,
            dirs: Vec::new(),
            files: Vec::new(),
        };
        for entry in fs::read_dir(abs_dir).map_err(dir_error)? {
            let entry = entry.map_err(dir_error)?;
            let name = entry.file_name();
            if name.to_string_lossy().starts_with('.') {
                continue;
            }
            let rel = rel_dir.join(&name);
            let file_type = match entry.file_type() {
                Ok(t) => t,
                Err(e) => {
                    self.unreadable(&entry.path(), e, stats)?;
                    continue;
                }
            };

            if file_type.is_dir() {
                listing.dirs.push(rel);
            } else if file_type.is_symlink() && entry.path().is_dir() {
                debug!("Not following directory symlink {}", rel.display());
            } else {
                listing.files.push(rel);
            }
        }
        Ok(listing)
    }

    fn unreadable(
        &self,
        path: &Path,
        source: io::Error,
        stats: &mut IndexStats,
    ) -> Result<(), IndexError> {
        match self.on_unreadable {
            OnUnreadable::Skip => {
                warn!("Skipping unreadable {}: {}", path.display(), source);
                stats.skipped.push(path.to_path_buf());
                Ok(())
            }
            OnUnreadable::Abort => Err(IndexError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}

/// Mutable state threaded through one walk.
struct Walk<'p> {
    source_root: &'p Path,
    dest_root: &'p Path,
    tree: SourceTree,
    stats: IndexStats,
}
