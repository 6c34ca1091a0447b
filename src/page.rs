//! Page records discovered in the source tree.
//!
//! A [`PageEntry`] describes one source file the site knows how to render:
//! where it lives, where its output goes, what URL it is served at, and the
//! timestamps needed to decide whether it must be rebuilt.
//!
//! ## Page Kinds
//!
//! The set of renderable kinds is closed ([`PageKind`]). Which extensions map
//! to which kind is decided by an explicit [`FileTypes`] registry, built once
//! at startup from `[types]` in `sitegen.toml` and handed to the indexer,
//! renderer and cleaner by reference:
//!
//! ```text
//! foo.md        → Markdown
//! notes.MARKDOWN → Markdown   (extensions are case-insensitive)
//! raw.htm       → Html
//! photo.jpg     → (not a page, never indexed)
//! ```
//!
//! ## Build Decisions
//!
//! [`PageEntry::build_decision`] is computed from the entry's fields every time
//! it is asked; nothing about the decision is persisted.
//!
//! | Condition | Decision |
//! |-----------|----------|
//! | validate-only flag set | `ValidationOnly` |
//! | no output file | `Created` |
//! | source newer than output | `Changed` |
//! | otherwise | `Unchanged` |
//!
//! `Deleted` is never produced here: it belongs to outputs whose source is
//! gone, which only the [`clean`](crate::clean) module can see.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// The closed set of source document kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageKind {
    Markdown,
    Html,
}

impl PageKind {
    pub const ALL: [PageKind; 2] = [PageKind::Markdown, PageKind::Html];

    pub fn name(self) -> &'static str {
        match self {
            PageKind::Markdown => "markdown",
            PageKind::Html => "html",
        }
    }
}

impl fmt::Display for PageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Registry mapping lowercase file extensions to page kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTypes {
    by_extension: BTreeMap<String, PageKind>,
}

impl FileTypes {
    /// An empty registry: nothing is recognized.
    pub fn empty() -> Self {
        Self {
            by_extension: BTreeMap::new(),
        }
    }

    /// Register `extension` (without the dot) as `kind`.
    ///
    /// Returns the kind previously registered for the extension, if any.
    pub fn register(&mut self, kind: PageKind, extension: &str) -> Option<PageKind> {
        let ext = extension.trim_start_matches('.').to_ascii_lowercase();
        self.by_extension.insert(ext, kind)
    }

    /// Kind of a path by its extension, or `None` for unsupported files.
    pub fn kind_of(&self, path: &Path) -> Option<PageKind> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        self.by_extension.get(&ext).copied()
    }

    /// Extensions registered for a kind, sorted.
    pub fn extensions(&self, kind: PageKind) -> Vec<&str> {
        self.by_extension
            .iter()
            .filter(|&(_, k)| *k == kind)
            .map(|(ext, _)| ext.as_str())
            .collect()
    }
}

impl Default for FileTypes {
    fn default() -> Self {
        let mut types = Self::empty();
        for ext in ["md", "markdown"] {
            types.register(PageKind::Markdown, ext);
        }
        for ext in ["html", "htm"] {
            types.register(PageKind::Html, ext);
        }
        types
    }
}

/// How source paths map to output paths and URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    /// Output extension without the dot.
    pub extension: String,
    /// Prefix of every URL; starts and ends with `/`.
    pub url_base: String,
    /// File name stripped from the end of URLs (`dir/index.html` → `dir/`).
    pub url_index: String,
}

impl Default for OutputLayout {
    fn default() -> Self {
        Self {
            extension: "html".to_string(),
            url_base: "/".to_string(),
            url_index: "index.html".to_string(),
        }
    }
}

impl OutputLayout {
    /// Destination path for a root-relative source path.
    pub fn dest_for(&self, source: &Path) -> PathBuf {
        source.with_extension(&self.extension)
    }

    /// URL for a root-relative destination path.
    pub fn url_for(&self, dest: &Path) -> String {
        let parts: Vec<String> = dest
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        let mut url = format!("{}{}", self.url_base, parts.join("/"));

        let keep = url
            .strip_suffix(self.url_index.as_str())
            .filter(|rest| rest.ends_with('/'))
            .map(str::len);
        if let Some(len) = keep {
            url.truncate(len);
        }
        url
    }

    /// Whether a path carries the output extension.
    pub fn is_output(&self, path: &Path) -> bool {
        path.extension()
            .map(|e| e.eq_ignore_ascii_case(self.extension.as_str()))
            .unwrap_or(false)
    }
}

/// Per-page classification that drives the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildDecision {
    Created,
    Changed,
    Unchanged,
    Deleted,
    ValidationOnly,
}

impl BuildDecision {
    /// Pages in these states have to go through the renderer.
    pub fn needs_work(self) -> bool {
        matches!(
            self,
            BuildDecision::Created | BuildDecision::Changed | BuildDecision::ValidationOnly
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            BuildDecision::Created => "created",
            BuildDecision::Changed => "changed",
            BuildDecision::Unchanged => "unchanged",
            BuildDecision::Deleted => "deleted",
            BuildDecision::ValidationOnly => "validate-only",
        }
    }
}

impl fmt::Display for BuildDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One discovered source file.
///
/// Paths, kind and URL are fixed at creation. The validate-only flag and the
/// two timestamps (re-read at decision time) may change during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageEntry {
    source_path: PathBuf,
    dest_path: PathBuf,
    kind: PageKind,
    url_path: String,
    source_modified: DateTime<Utc>,
    dest_modified: Option<DateTime<Utc>>,
    validate_only: bool,
}

impl PageEntry {
    /// Build an entry for a root-relative source path, deriving the
    /// destination path and URL from `layout`.
    pub fn new(
        source_path: PathBuf,
        kind: PageKind,
        source_modified: DateTime<Utc>,
        dest_modified: Option<DateTime<Utc>>,
        layout: &OutputLayout,
    ) -> Self {
        let dest_path = layout.dest_for(&source_path);
        let url_path = layout.url_for(&dest_path);
        Self {
            source_path,
            dest_path,
            kind,
            url_path,
            source_modified,
            dest_modified,
            validate_only: false,
        }
    }

    /// Reassemble an entry from persisted fields without recomputing paths.
    pub(crate) fn restore(
        source_path: PathBuf,
        dest_path: PathBuf,
        kind: PageKind,
        url_path: String,
        source_modified: DateTime<Utc>,
        dest_modified: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            source_path,
            dest_path,
            kind,
            url_path,
            source_modified,
            dest_modified,
            validate_only: false,
        }
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn dest_path(&self) -> &Path {
        &self.dest_path
    }

    pub fn kind(&self) -> PageKind {
        self.kind
    }

    pub fn url_path(&self) -> &str {
        &self.url_path
    }

    pub fn source_modified(&self) -> DateTime<Utc> {
        self.source_modified
    }

    pub fn dest_modified(&self) -> Option<DateTime<Utc>> {
        self.dest_modified
    }

    pub fn validate_only(&self) -> bool {
        self.validate_only
    }

    pub fn set_validate_only(&mut self, validate_only: bool) {
        self.validate_only = validate_only;
    }

    /// Absolute source file under `source_root`.
    pub fn source_file(&self, source_root: &Path) -> PathBuf {
        source_root.join(&self.source_path)
    }

    /// Absolute output file under `dest_root`.
    pub fn dest_file(&self, dest_root: &Path) -> PathBuf {
        dest_root.join(&self.dest_path)
    }

    /// Re-read the output file's modification time.
    pub fn refresh_destination(&mut self, dest_root: &Path) {
        self.dest_modified = dest_modified_at(&self.dest_file(dest_root));
    }

    /// Re-read the source file's modification time. Fails when the source
    /// is gone or is no longer a regular file.
    pub fn refresh_source(&mut self, source_root: &Path) -> io::Result<()> {
        let meta = fs::metadata(self.source_file(source_root))?;
        if !meta.is_file() {
            return Err(io::Error::other("source is not a regular file"));
        }
        self.source_modified = modified_utc(&meta)?;
        Ok(())
    }

    pub fn build_decision(&self) -> BuildDecision {
        if self.validate_only {
            return BuildDecision::ValidationOnly;
        }
        match self.dest_modified {
            None => BuildDecision::Created,
            Some(dest) if self.source_modified > dest => BuildDecision::Changed,
            Some(_) => BuildDecision::Unchanged,
        }
    }
}

/// Modification time of a file's metadata, in UTC.
pub fn modified_utc(meta: &fs::Metadata) -> io::Result<DateTime<Utc>> {
    meta.modified().map(DateTime::<Utc>::from)
}

/// Modification time of an output file, `None` when it does not exist.
///
/// An output whose mtime cannot be read is reported as absent so the page
/// is rebuilt.
pub fn dest_modified_at(path: &Path) -> Option<DateTime<Utc>> {
    let meta = fs::metadata(path).ok().filter(|m| m.is_file())?;
    modified_utc(&meta).ok()
}
