//! # sitegen
//!
//! An incremental static site generator. A directory of Markdown and HTML
//! documents is rendered into an output directory, and on every later run
//! only the pages whose sources are newer than their outputs are rebuilt.
//!
//! # Architecture: Index, Decide, Render
//!
//! ```text
//! 1. Index    source/  →  SourceTree        (one walk, or a cached snapshot)
//! 2. Decide   entry    →  BuildDecision     (source vs. output mtime)
//! 3. Render   entry    →  build/…/page.html (only pages that need work)
//! ```
//!
//! The tree is the unit of caching. A build first asks the [`cache`] for a
//! snapshot of the last index pass. A snapshot that is intact and of the
//! current schema is then checked against the source directory with one
//! `stat` per directory and page: a directory whose modification time moved
//! means files were added or removed, and the snapshot is dropped in favour
//! of a fresh walk. Source and output timestamps are always re-read before
//! deciding, so a cached tree never hides an edit or a page rendered after
//! the snapshot was taken.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`page`] | `PageEntry` records, page kinds, the extension registry and build decisions |
//! | [`tree`] | `SourceTree` arena of directory nodes; lookup, iteration and sorting |
//! | [`indexer`] | Single top-down walk of the source root into a `SourceTree` |
//! | [`cache`] | Versioned, digest-checked, atomically written tree snapshots |
//! | [`config`] | `sitegen.toml` loading, merging over stock defaults, validation |
//! | [`site`] | Working directory resolved into source, output and cache paths |
//! | [`render`] | `PageRenderer` seam and the stock Markdown/HTML renderer |
//! | [`clean`] | Removal of rendered files and detection of orphaned outputs |
//! | [`pipeline`] | The incremental build: cache or index, decide, render, report |
//! | [`output`] | CLI output formatting for builds and index listings |
//!
//! # Design Decisions
//!
//! ## Timestamps Over Content Hashes
//!
//! A page is rebuilt when its source is newer than its output. Comparing
//! modification times needs only a `stat` per file, which keeps a no-op build
//! close to free even on large sites. The index cache removes the remaining
//! cost, the directory walk.
//!
//! ## A Flat, Versioned Snapshot
//!
//! The cache stores the tree as plain records (parent index, path, pages)
//! encoded with postcard and compressed with zstd, guarded by a SHA-256 of the
//! uncompressed bytes and an explicit schema version. Any doubt about a
//! snapshot (age, digest, version, source root) means a fresh walk; a bad cache
//! can slow a build down but never change its output.

pub mod cache;
pub mod clean;
pub mod config;
pub mod indexer;
pub mod output;
pub mod page;
pub mod pipeline;
pub mod render;
pub mod site;
pub mod tree;

#[cfg(test)]
pub(crate) mod test_helpers;
