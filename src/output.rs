//! CLI output formatting.
//!
//! # Output Format
//!
//! ## Index
//!
//! The tree view mirrors the source directory, one page per line with its
//! URL and current build decision:
//!
//! ```text
//! source/
//!     index.md → / (unchanged)
//!     blog/
//!         first.md → /blog/first.html (changed)
//!         2024/
//!             deep.md → /blog/2024/deep.html (created)
//!
//! 3 pages in 3 directories
//! ```
//!
//! With `--sort` the pages are listed flat in the requested order:
//!
//! ```text
//! created       markdown blog/2024/deep.md → /blog/2024/deep.html
//! changed       markdown blog/first.md → /blog/first.html
//! unchanged     markdown index.md → /
//! ```
//!
//! ## Build
//!
//! ```text
//! Build finished successfully.
//! Processed 3 pages in 0.02s.
//!   Created   1
//!   Changed   1
//!   Unchanged 1
//! ```
//!
//! # Architecture
//!
//! Every view is a `format_*` function returning lines, paired with a
//! `print_*` wrapper for stdout. Only the wrappers do I/O.

use crate::page::{BuildDecision, PageEntry, PageKind};
use crate::tree::{NodeId, SourceTree};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn file_name(entry: &PageEntry) -> String {
    entry
        .source_path()
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

// ============================================================================
// Build summary
// ============================================================================

/// Per-build counters, one per page outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildStats {
    /// Pages in the tree.
    pub pages: usize,
    pub created: usize,
    pub changed: usize,
    pub unchanged: usize,
    pub deleted: usize,
    pub validated: usize,
    pub errors: usize,
    pub elapsed: Duration,
}

impl BuildStats {
    pub fn add(&mut self, decision: BuildDecision) {
        match decision {
            BuildDecision::Created => self.created += 1,
            BuildDecision::Changed => self.changed += 1,
            BuildDecision::Unchanged => self.unchanged += 1,
            BuildDecision::Deleted => self.deleted += 1,
            BuildDecision::ValidationOnly => self.validated += 1,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.errors == 0
    }
}

impl fmt::Display for BuildStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.pages == 0 && self.deleted == 0 {
            return write!(f, "Nothing to do.");
        }
        if self.errors > 0 {
            writeln!(f, "Build finished with errors.")?;
        } else {
            writeln!(f, "Build finished successfully.")?;
        }
        write!(
            f,
            "Processed {} pages in {:.2}s.",
            self.pages,
            self.elapsed.as_secs_f64()
        )?;

        let counters = [
            ("Created", self.created),
            ("Changed", self.changed),
            ("Unchanged", self.unchanged),
            ("Validated", self.validated),
            ("Deleted", self.deleted),
            ("Errors", self.errors),
        ];
        let width = counters.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
        for (name, value) in counters {
            if value > 0 {
                write!(f, "\n  {name:<width$} {value}")?;
            }
        }
        Ok(())
    }
}

// ============================================================================
// Index: tree view
// ============================================================================

/// Format the tree inventory grouped by directory.
pub fn format_tree_output(tree: &SourceTree) -> Vec<String> {
    let mut lines = Vec::new();
    let root_name = tree
        .root_path()
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| tree.root_path().display().to_string());
    lines.push(format!("{root_name}/"));
    format_node(tree, NodeId::ROOT, 1, &mut lines);

    lines.push(String::new());
    lines.push(format!(
        "{} pages in {} directories",
        tree.len(),
        tree.node_count()
    ));
    lines
}

fn format_node(tree: &SourceTree, id: NodeId, depth: usize, lines: &mut Vec<String>) {
    let Some(node) = tree.get(id) else {
        return;
    };
    for entry in node.entries() {
        lines.push(format!(
            "{}{} → {} ({})",
            indent(depth),
            file_name(entry),
            entry.url_path(),
            entry.build_decision()
        ));
    }
    for &child in node.children() {
        if let Some(dir) = tree.get(child).and_then(|c| c.path().file_name()) {
            lines.push(format!("{}{}/", indent(depth), dir.to_string_lossy()));
        }
        format_node(tree, child, depth + 1, lines);
    }
}

pub fn print_tree_output(tree: &SourceTree) {
    for line in format_tree_output(tree) {
        println!("{}", line);
    }
}

// ============================================================================
// Index: flat sorted view
// ============================================================================

/// Format pages as a flat list, one line each, in the given order.
pub fn format_page_list(entries: &[&PageEntry]) -> Vec<String> {
    entries
        .iter()
        .map(|e| {
            format!(
                "{:<13} {:<8} {} → {}",
                e.build_decision().label(),
                e.kind().name(),
                e.source_path().display(),
                e.url_path()
            )
        })
        .collect()
}

pub fn print_page_list(entries: &[&PageEntry]) {
    for line in format_page_list(entries) {
        println!("{}", line);
    }
}

// ============================================================================
// Index: JSON
// ============================================================================

/// Serializable view of one page for `index --json`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageSummary {
    pub source: PathBuf,
    pub dest: PathBuf,
    pub kind: PageKind,
    pub url: String,
    pub decision: BuildDecision,
    pub source_modified: DateTime<Utc>,
    pub dest_modified: Option<DateTime<Utc>>,
}

impl From<&PageEntry> for PageSummary {
    fn from(entry: &PageEntry) -> Self {
        Self {
            source: entry.source_path().to_path_buf(),
            dest: entry.dest_path().to_path_buf(),
            kind: entry.kind(),
            url: entry.url_path().to_string(),
            decision: entry.build_decision(),
            source_modified: entry.source_modified(),
            dest_modified: entry.dest_modified(),
        }
    }
}

pub fn format_json(entries: &[&PageEntry]) -> Result<String, serde_json::Error> {
    let summaries: Vec<PageSummary> = entries.iter().map(|&e| PageSummary::from(e)).collect();
    serde_json::to_string_pretty(&summaries)
}
