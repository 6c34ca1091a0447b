//! Removal of rendered files from the output root.
//!
//! Two operations share the same walk over the output directory:
//!
//! - [`clean_dest`] removes every rendered file (`--clean`).
//! - [`find_orphans`] lists rendered files whose source no longer exists,
//!   for the pipeline to report as `Deleted` and remove.
//!
//! Only files carrying the output extension are ever touched. Assets and
//! anything else a user keeps in the output root are left alone.

use crate::page::OutputLayout;
use crate::tree::SourceTree;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Rendered files under `dest_root`, root-relative, in sorted order.
///
/// A missing output root has no rendered files.
pub fn rendered_files(dest_root: &Path, layout: &OutputLayout) -> io::Result<Vec<PathBuf>> {
    if !dest_root.exists() {
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(dest_root).sort_by_file_name() {
        let entry = entry.map_err(io::Error::from)?;
        if entry.file_type().is_file() && layout.is_output(entry.path()) {
            if let Ok(rel) = entry.path().strip_prefix(dest_root) {
                files.push(rel.to_path_buf());
            }
        }
    }
    Ok(files)
}

/// Rendered files that no page in `tree` produces.
pub fn find_orphans(
    tree: &SourceTree,
    dest_root: &Path,
    layout: &OutputLayout,
) -> io::Result<Vec<PathBuf>> {
    let expected: HashSet<&Path> = tree.iter().map(|e| e.dest_path()).collect();
    Ok(rendered_files(dest_root, layout)?
        .into_iter()
        .filter(|rel| !expected.contains(rel.as_path()))
        .collect())
}

/// Delete root-relative `files` under `dest_root`.
///
/// Files already gone are skipped. Returns the number actually removed.
pub fn remove_files(dest_root: &Path, files: &[PathBuf]) -> io::Result<usize> {
    let mut removed = 0;
    for rel in files {
        match fs::remove_file(dest_root.join(rel)) {
            Ok(()) => {
                debug!("Removed {}", rel.display());
                removed += 1;
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
    }
    Ok(removed)
}

/// Remove every rendered file under `dest_root`, returning what was removed.
pub fn clean_dest(dest_root: &Path, layout: &OutputLayout) -> io::Result<Vec<PathBuf>> {
    let files = rendered_files(dest_root, layout)?;
    remove_files(dest_root, &files)?;
    Ok(files)
}
