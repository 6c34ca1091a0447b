//! In-memory mirror of the source directory.
//!
//! A [`SourceTree`] owns every [`DirectoryNode`] in a flat arena; nodes refer
//! to each other by [`NodeId`]. Child links are the ownership edges (the order
//! in which directories were discovered), while `parent` is a plain index used
//! only to walk upwards. Node 0 is always the source root.
//!
//! ```text
//! source/                 NodeId(0)  path ""
//! ├── index.md            entry of 0
//! ├── blog/               NodeId(1)  path "blog"     parent 0
//! │   ├── first.md        entry of 1
//! │   └── 2024/           NodeId(3)  path "blog/2024" parent 1
//! └── docs/               NodeId(2)  path "docs"     parent 0
//! ```
//!
//! Iteration visits a node's own entries before descending into its children,
//! depth-first, in discovery order. Nothing here re-sorts the structure; use
//! [`SourceTree::sorted`] for an ordered copy.
//!
//! ## Staleness
//!
//! Each directory remembers its modification time from when it was listed.
//! Adding, removing or renaming a file bumps its directory's time, and editing
//! a file bumps only the file's. [`SourceTree::refresh_sources`] stats both
//! without listing anything, so a tree loaded from a snapshot can be checked
//! against the filesystem for the cost of one `stat` per directory and page.

use crate::page::{BuildDecision, PageEntry, modified_utc};
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TreeError {
    #[error("Path is not part of the source tree: {0}")]
    NotFound(PathBuf),
}

/// A difference between a tree and the source directory it was indexed from.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceDrift {
    #[error("directory '{}' changed since it was indexed", .0.display())]
    Directory(PathBuf),
    #[error("source '{}' can no longer be read", .0.display())]
    Source(PathBuf),
}

/// Index of a directory node inside its tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);

    pub fn index(self) -> usize {
        self.0
    }
}

/// One directory of the source tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryNode {
    path: PathBuf,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    entries: Vec<PageEntry>,
    modified: Option<DateTime<Utc>>,
}

impl DirectoryNode {
    fn new(path: PathBuf, parent: Option<NodeId>) -> Self {
        Self {
            path,
            parent,
            children: Vec::new(),
            entries: Vec::new(),
            modified: None,
        }
    }

    /// Path relative to the source root; empty for the root itself.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Pages directly inside this directory.
    pub fn entries(&self) -> &[PageEntry] {
        &self.entries
    }

    /// Directory modification time when it was listed, if recorded.
    pub fn modified(&self) -> Option<DateTime<Utc>> {
        self.modified
    }
}

/// Field to order pages by in [`SourceTree::sorted`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Decision,
    Kind,
    UrlPath,
    SourceModified,
    DestModified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl SortKey {
    fn compare(self, a: &PageEntry, b: &PageEntry) -> Ordering {
        match self {
            SortKey::Decision => a.build_decision().cmp(&b.build_decision()),
            SortKey::Kind => a.kind().cmp(&b.kind()),
            SortKey::UrlPath => a.url_path().cmp(b.url_path()),
            SortKey::SourceModified => a.source_modified().cmp(&b.source_modified()),
            SortKey::DestModified => a.dest_modified().cmp(&b.dest_modified()),
        }
    }
}

/// The indexed source directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceTree {
    root: PathBuf,
    nodes: Vec<DirectoryNode>,
}

impl SourceTree {
    /// A tree holding only the (empty) root directory.
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            nodes: vec![DirectoryNode::new(PathBuf::new(), None)],
        }
    }

    /// The source root this tree mirrors.
    pub fn root_path(&self) -> &Path {
        &self.root
    }

    pub fn root(&self) -> &DirectoryNode {
        &self.nodes[NodeId::ROOT.0]
    }

    /// Node for an id previously handed out by this tree.
    pub fn get(&self, id: NodeId) -> Option<&DirectoryNode> {
        self.nodes.get(id.0)
    }

    /// Id for an arena position, if the position exists.
    pub fn node_id(&self, index: usize) -> Option<NodeId> {
        (index < self.nodes.len()).then_some(NodeId(index))
    }

    /// All directories in arena order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &DirectoryNode)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Attach a new directory under `parent`. `path` is root-relative.
    pub fn add_dir(&mut self, parent: NodeId, path: PathBuf) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(DirectoryNode::new(path, Some(parent)));
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn set_dir_modified(&mut self, node: NodeId, modified: Option<DateTime<Utc>>) {
        self.nodes[node.0].modified = modified;
    }

    /// Add a page directly inside `node`.
    pub fn add_entry(&mut self, node: NodeId, entry: PageEntry) {
        self.nodes[node.0].entries.push(entry);
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(DirectoryNode::parent)
    }

    /// Number of pages in the whole tree.
    pub fn len(&self) -> usize {
        self.nodes.iter().map(|n| n.entries.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.iter().all(|n| n.entries.is_empty())
    }

    /// Every page in canonical order.
    pub fn iter(&self) -> Entries<'_> {
        self.iter_from(NodeId::ROOT)
    }

    /// Every page under `id`, including its own entries, in canonical order.
    pub fn iter_from(&self, id: NodeId) -> Entries<'_> {
        Entries {
            tree: self,
            stack: vec![id],
            current: Default::default(),
        }
    }

    /// Resolve a directory by absolute path under the root or by
    /// root-relative path.
    pub fn find_node(&self, path: &Path) -> Result<NodeId, TreeError> {
        let not_found = || TreeError::NotFound(path.to_path_buf());
        let relative = self.relative(path).ok_or_else(not_found)?;

        let mut current = NodeId::ROOT;
        for component in relative.components() {
            match component {
                Component::CurDir => continue,
                Component::Normal(name) => {
                    current = self.nodes[current.0]
                        .children
                        .iter()
                        .copied()
                        .find(|&child| self.nodes[child.0].path.file_name() == Some(name))
                        .ok_or_else(not_found)?;
                }
                _ => return Err(not_found()),
            }
        }
        Ok(current)
    }

    pub fn node(&self, path: &Path) -> Result<&DirectoryNode, TreeError> {
        self.find_node(path).map(|id| &self.nodes[id.0])
    }

    /// Resolve a page by its source path (absolute under the root, or
    /// root-relative).
    pub fn entry(&self, path: &Path) -> Result<&PageEntry, TreeError> {
        let not_found = || TreeError::NotFound(path.to_path_buf());
        let relative = self.relative(path).ok_or_else(not_found)?;
        let dir = relative.parent().unwrap_or(Path::new(""));
        let node = self.node(dir).map_err(|_| not_found())?;
        node.entries
            .iter()
            .find(|e| e.source_path() == relative)
            .ok_or_else(not_found)
    }

    /// All pages ordered by `key`. Ties keep canonical order.
    pub fn sorted(&self, key: SortKey, order: SortOrder) -> Vec<&PageEntry> {
        let mut entries: Vec<&PageEntry> = self.iter().collect();
        match order {
            SortOrder::Ascending => entries.sort_by(|a, b| key.compare(a, b)),
            SortOrder::Descending => entries.sort_by(|a, b| key.compare(b, a)),
        }
        entries
    }

    /// Pages whose decision matches `decision`, in canonical order.
    pub fn with_decision(&self, decision: BuildDecision) -> Vec<&PageEntry> {
        self.iter()
            .filter(|e| e.build_decision() == decision)
            .collect()
    }

    /// Re-read every output file's modification time.
    pub fn refresh_destinations(&mut self, dest_root: &Path) {
        for node in &mut self.nodes {
            for entry in &mut node.entries {
                entry.refresh_destination(dest_root);
            }
        }
    }

    /// Re-read every page's source time and check that no directory changed.
    ///
    /// Fails on the first directory whose modification time differs from the
    /// recorded one, or the first page whose source can no longer be
    /// stat'ed. Directories with no recorded time are not checked.
    pub fn refresh_sources(&mut self) -> Result<(), SourceDrift> {
        for node in &mut self.nodes {
            if let Some(recorded) = node.modified {
                let current = fs::metadata(self.root.join(&node.path))
                    .ok()
                    .filter(|m| m.is_dir())
                    .and_then(|m| modified_utc(&m).ok());
                if current != Some(recorded) {
                    return Err(SourceDrift::Directory(node.path.clone()));
                }
            }
            for entry in &mut node.entries {
                entry
                    .refresh_source(&self.root)
                    .map_err(|_| SourceDrift::Source(entry.source_path().to_path_buf()))?;
            }
        }
        Ok(())
    }

    pub fn set_validate_only(&mut self, validate_only: bool) {
        for node in &mut self.nodes {
            for entry in &mut node.entries {
                entry.set_validate_only(validate_only);
            }
        }
    }

    fn relative<'a>(&self, path: &'a Path) -> Option<&'a Path> {
        if path.is_absolute() {
            path.strip_prefix(&self.root).ok()
        } else {
            Some(path)
        }
    }
}

impl<'a> IntoIterator for &'a SourceTree {
    type Item = &'a PageEntry;
    type IntoIter = Entries<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Depth-first iterator over a tree's pages.
pub struct Entries<'a> {
    tree: &'a SourceTree,
    stack: Vec<NodeId>,
    current: std::slice::Iter<'a, PageEntry>,
}

impl<'a> Iterator for Entries<'a> {
    type Item = &'a PageEntry;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(entry) = self.current.next() {
                return Some(entry);
            }
            let node = self.tree.get(self.stack.pop()?)?;
            self.current = node.entries.iter();
            self.stack.extend(node.children.iter().rev());
        }
    }
}
