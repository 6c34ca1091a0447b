//! Shared test utilities for the sitegen test suite.
//!
//! Provides file scaffolding, mtime control and tree lookups so tests can
//! describe a source directory in a few lines and assert on the
//! resulting [`SourceTree`].
//!
//! # Usage
//!
//! ```text
//! use crate::test_helpers::*;
//!
//! let tmp = setup_site(&[("index.md", "# Home"), ("blog/first.md", "")]);
//! set_mtime(&tmp.path().join("source/index.md"), 1_000);
//!
//! let tree = index_site(tmp.path());
//! assert_eq!(decisions(&tree)[0], ("index.md".to_string(), BuildDecision::Created));
//! ```

use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

use crate::indexer::TreeIndexer;
use crate::page::{BuildDecision, FileTypes, OutputLayout, PageEntry};
use crate::tree::SourceTree;

// =========================================================================
// Fixture setup
// =========================================================================

/// Create an empty file, along with any missing parent directories.
pub fn touch(path: &Path) {
    write_file(path, "");
}

/// Write `contents` to `path`, creating parent directories.
pub fn write_file(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

/// Set a file's or directory's modification time to `secs` after the Unix
/// epoch.
pub fn set_mtime(path: &Path, secs: i64) {
    let time = if secs >= 0 {
        SystemTime::UNIX_EPOCH + Duration::from_secs(secs as u64)
    } else {
        SystemTime::UNIX_EPOCH - Duration::from_secs(secs.unsigned_abs())
    };
    let file = if path.is_dir() {
        fs::File::open(path)
    } else {
        fs::File::options().write(true).open(path)
    };
    file.unwrap().set_modified(time).unwrap();
}

/// A temp working directory with `source/` populated from `(path, contents)`
/// pairs. No `sitegen.toml` is written, so stock defaults apply.
pub fn setup_site(files: &[(&str, &str)]) -> TempDir {
    let tmp = TempDir::new().unwrap();
    fs::create_dir_all(tmp.path().join("source")).unwrap();
    for (path, contents) in files {
        write_file(&tmp.path().join("source").join(path), contents);
    }
    tmp
}

/// Index `<dir>/source` against `<dir>/build` with stock file types.
pub fn index_site(dir: &Path) -> SourceTree {
    let types = FileTypes::default();
    let layout = OutputLayout::default();
    TreeIndexer::new(&types, &layout)
        .index(&dir.join("source"), &dir.join("build"))
        .unwrap()
}

// =========================================================================
// Tree lookups (panic with a clear message on miss)
// =========================================================================

/// Find a page by root-relative source path. Panics if not found.
pub fn find_entry<'a>(tree: &'a SourceTree, source: &str) -> &'a PageEntry {
    tree.entry(Path::new(source)).unwrap_or_else(|_| {
        let sources = source_paths(tree);
        panic!("entry '{source}' not found. Available: {sources:?}")
    })
}

/// All source paths in canonical order.
pub fn source_paths(tree: &SourceTree) -> Vec<String> {
    tree.iter()
        .map(|e| e.source_path().to_string_lossy().into_owned())
        .collect()
}

/// `(source path, decision)` for every page, in canonical order.
pub fn decisions(tree: &SourceTree) -> Vec<(String, BuildDecision)> {
    tree.iter()
        .map(|e| {
            (
                e.source_path().to_string_lossy().into_owned(),
                e.build_decision(),
            )
        })
        .collect()
}
