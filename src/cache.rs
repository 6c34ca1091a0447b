//! Persistent snapshot of the indexed source tree.
//!
//! Re-walking a large source directory on every build is the slow part of an
//! otherwise no-op run. [`IndexCache`] stores the [`SourceTree`] produced by
//! the indexer and hands it back on the next run, provided the snapshot is
//! still trustworthy.
//!
//! ## Storage
//!
//! Two files live side by side in the cache directory:
//!
//! ```text
//! .sitegen-cache/
//! ├── index.bin.zst          # zstd( postcard{ schema_version, tree } )
//! └── index.bin.zst.sha256   # hex SHA-256 of the uncompressed bytes
//! ```
//!
//! The tree is written as a flat list of directory records in arena order,
//! each carrying its parent's index, its modification time and its own pages. Children are rebuilt
//! from the parent column, so a snapshot decodes into exactly the tree that
//! was saved.
//!
//! ## Loading
//!
//! A snapshot is used only when all of these hold, checked in order:
//!
//! 1. both files exist
//! 2. the blob's modification time is within `max_age` (when one is set)
//! 3. the recomputed digest matches the digest file
//! 4. the schema version matches [`SCHEMA_VERSION`]
//! 5. the records decode into a well-formed tree
//! 6. the recorded source root is the one being built
//!
//! Every failure is a [`CacheMiss`]. None of them is an error for the build:
//! the caller simply re-indexes. A loaded tree still reflects the source
//! directory as it was when saved; callers check it with
//! [`SourceTree::refresh_sources`] before trusting it.
//!
//! ## Saving
//!
//! Both files are first written as temp files inside the cache directory and
//! then renamed into place, blob first. A crash before the first rename
//! leaves the old snapshot intact; a crash between the renames leaves a blob
//! that no longer matches its digest, which loads as a miss.

use crate::page::{PageEntry, PageKind};
use crate::tree::{NodeId, SourceTree};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Version of the snapshot layout. Bump this whenever the record structs
/// below change shape.
pub const SCHEMA_VERSION: u32 = 2;

pub const BLOB_FILENAME: &str = "index.bin.zst";
pub const DIGEST_FILENAME: &str = "index.bin.zst.sha256";

const ZSTD_LEVEL: i32 = 3;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cannot create cache directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Cannot encode index snapshot: {0}")]
    Encode(#[from] postcard::Error),
}

/// Why a snapshot could not be used.
#[derive(Debug)]
pub enum CacheMiss {
    /// No snapshot has been saved.
    Missing,
    /// Only one of the two files exists.
    Incomplete,
    /// The snapshot is older than the allowed age, or dated in the future.
    Expired { age: Option<Duration>, max_age: Duration },
    DigestMismatch,
    VersionMismatch { found: u32 },
    Corrupt(String),
    /// The snapshot was taken of a different source directory.
    RootMismatch { cached: PathBuf },
    Io(io::Error),
}

impl fmt::Display for CacheMiss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => write!(f, "no snapshot"),
            Self::Incomplete => write!(f, "snapshot is missing its digest or blob"),
            Self::Expired { age: Some(age), max_age } => write!(
                f,
                "snapshot is {}s old (limit {}s)",
                age.as_secs(),
                max_age.as_secs()
            ),
            Self::Expired { age: None, .. } => write!(f, "snapshot is dated in the future"),
            Self::DigestMismatch => write!(f, "digest does not match snapshot contents"),
            Self::VersionMismatch { found } => write!(
                f,
                "schema version {found} does not match expected {SCHEMA_VERSION}"
            ),
            Self::Corrupt(reason) => write!(f, "snapshot is corrupt: {reason}"),
            Self::RootMismatch { cached } => {
                write!(f, "snapshot was taken of {}", cached.display())
            }
            Self::Io(e) => write!(f, "IO error: {e}"),
        }
    }
}

impl From<io::Error> for CacheMiss {
    fn from(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::NotFound {
            CacheMiss::Missing
        } else {
            CacheMiss::Io(e)
        }
    }
}

// =========================================================================
// Persisted records
// =========================================================================

#[derive(Debug, Serialize)]
struct Snapshot<'a> {
    schema_version: u32,
    tree: &'a TreeRecord,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct TreeRecord {
    root: PathBuf,
    nodes: Vec<NodeRecord>,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct NodeRecord {
    parent: Option<u32>,
    path: PathBuf,
    modified: Option<(i64, u32)>,
    entries: Vec<EntryRecord>,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct EntryRecord {
    source: PathBuf,
    dest: PathBuf,
    kind: PageKind,
    url: String,
    source_modified: (i64, u32),
    dest_modified: Option<(i64, u32)>,
}

fn timestamp(t: DateTime<Utc>) -> (i64, u32) {
    (t.timestamp(), t.timestamp_subsec_nanos())
}

fn from_timestamp((secs, nanos): (i64, u32)) -> Result<DateTime<Utc>, String> {
    DateTime::from_timestamp(secs, nanos).ok_or_else(|| format!("invalid timestamp {secs}.{nanos}"))
}

impl TreeRecord {
    fn from_tree(tree: &SourceTree) -> Self {
        let nodes = tree
            .nodes()
            .map(|(_, node)| NodeRecord {
                parent: node.parent().map(|p| p.index() as u32),
                path: node.path().to_path_buf(),
                modified: node.modified().map(timestamp),
                entries: node
                    .entries()
                    .iter()
                    .map(|e| EntryRecord {
                        source: e.source_path().to_path_buf(),
                        dest: e.dest_path().to_path_buf(),
                        kind: e.kind(),
                        url: e.url_path().to_string(),
                        source_modified: timestamp(e.source_modified()),
                        dest_modified: e.dest_modified().map(timestamp),
                    })
                    .collect(),
            })
            .collect();
        Self {
            root: tree.root_path().to_path_buf(),
            nodes,
        }
    }

    fn into_tree(self) -> Result<SourceTree, String> {
        if self.nodes.is_empty() {
            return Err("no root record".into());
        }
        let mut tree = SourceTree::new(self.root);
        for (index, record) in self.nodes.into_iter().enumerate() {
            let node = match (index, record.parent) {
                (0, None) => NodeId::ROOT,
                (0, Some(_)) => return Err("root record has a parent".into()),
                (_, None) => return Err(format!("record {index} has no parent")),
                (_, Some(parent)) => {
                    // Parents always precede their children in arena order.
                    let parent = tree
                        .node_id(parent as usize)
                        .filter(|p| p.index() < index)
                        .ok_or_else(|| format!("record {index} has invalid parent {parent}"))?;
                    tree.add_dir(parent, record.path)
                }
            };
            tree.set_dir_modified(node, record.modified.map(from_timestamp).transpose()?);
            for entry in record.entries {
                let page = PageEntry::restore(
                    entry.source,
                    entry.dest,
                    entry.kind,
                    entry.url,
                    from_timestamp(entry.source_modified)?,
                    entry.dest_modified.map(from_timestamp).transpose()?,
                );
                tree.add_entry(node, page);
            }
        }
        Ok(tree)
    }
}

fn hex_digest(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

// =========================================================================
// Cache
// =========================================================================

/// The on-disk snapshot for one source root.
#[derive(Debug, Clone)]
pub struct IndexCache {
    dir: PathBuf,
    root: PathBuf,
}

impl IndexCache {
    /// `dir` holds the snapshot files; `root` is the source root the
    /// snapshot must describe.
    pub fn new(dir: impl Into<PathBuf>, root: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            root: root.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn blob_path(&self) -> PathBuf {
        self.dir.join(BLOB_FILENAME)
    }

    fn digest_path(&self) -> PathBuf {
        self.dir.join(DIGEST_FILENAME)
    }

    /// The cached tree, or `None` when the snapshot is unusable for any
    /// reason. The reason is logged.
    pub fn load(&self, max_age: Option<Duration>) -> Option<SourceTree> {
        match self.try_load(max_age) {
            Ok(tree) => {
                info!("Loaded index snapshot ({} pages)", tree.len());
                Some(tree)
            }
            Err(miss) => {
                match &miss {
                    CacheMiss::Missing => debug!("Index cache miss: {miss}"),
                    CacheMiss::DigestMismatch | CacheMiss::Incomplete | CacheMiss::Corrupt(_) => {
                        warn!("Index cache miss: {miss}")
                    }
                    CacheMiss::Io(_) => error!(
                        "Index cache miss reading {}: {miss}",
                        self.blob_path().display()
                    ),
                    _ => info!("Index cache miss: {miss}"),
                }
                None
            }
        }
    }

    /// Like [`load`](Self::load), reporting why a snapshot was rejected.
    pub fn try_load(&self, max_age: Option<Duration>) -> Result<SourceTree, CacheMiss> {
        let blob_path = self.blob_path();
        let digest_path = self.digest_path();
        let blob_meta = match fs::metadata(&blob_path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(if digest_path.exists() {
                    CacheMiss::Incomplete
                } else {
                    CacheMiss::Missing
                });
            }
            Err(e) => return Err(CacheMiss::Io(e)),
        };

        if let Some(max_age) = max_age {
            let age = SystemTime::now()
                .duration_since(blob_meta.modified()?)
                .ok();
            if max_age.is_zero() || age.is_none_or(|age| age > max_age) {
                return Err(CacheMiss::Expired { age, max_age });
            }
        }

        let expected = match fs::read_to_string(&digest_path) {
            Ok(s) => s,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(CacheMiss::Incomplete),
            Err(e) => return Err(CacheMiss::Io(e)),
        };
        let compressed = fs::read(&blob_path)?;
        let bytes = zstd::decode_all(compressed.as_slice())
            .map_err(|e| CacheMiss::Corrupt(format!("decompression failed: {e}")))?;

        if hex_digest(&bytes) != expected.trim() {
            return Err(CacheMiss::DigestMismatch);
        }

        let (version, rest) = postcard::take_from_bytes::<u32>(&bytes)
            .map_err(|e| CacheMiss::Corrupt(e.to_string()))?;
        if version != SCHEMA_VERSION {
            return Err(CacheMiss::VersionMismatch { found: version });
        }
        let record: TreeRecord =
            postcard::from_bytes(rest).map_err(|e| CacheMiss::Corrupt(e.to_string()))?;

        if record.root != self.root {
            return Err(CacheMiss::RootMismatch {
                cached: record.root,
            });
        }
        record.into_tree().map_err(CacheMiss::Corrupt)
    }

    /// Write `tree` as the new snapshot, replacing any previous one.
    pub fn save(&self, tree: &SourceTree) -> Result<(), CacheError> {
        self.stage(tree)?.commit()?;
        debug!("Saved index snapshot to {}", self.dir.display());
        Ok(())
    }

    /// Encode `tree` into temp files next to the snapshot without touching
    /// the current one. Dropping the result discards the temp files.
    pub fn stage(&self, tree: &SourceTree) -> Result<StagedSave, CacheError> {
        fs::create_dir_all(&self.dir).map_err(|source| CacheError::CreateDir {
            path: self.dir.clone(),
            source,
        })?;

        let record = TreeRecord::from_tree(tree);
        let bytes = postcard::to_stdvec(&Snapshot {
            schema_version: SCHEMA_VERSION,
            tree: &record,
        })?;
        let compressed = zstd::encode_all(bytes.as_slice(), ZSTD_LEVEL)?;

        let mut blob = NamedTempFile::new_in(&self.dir)?;
        blob.write_all(&compressed)?;
        blob.as_file().sync_all()?;

        let mut digest = NamedTempFile::new_in(&self.dir)?;
        writeln!(digest, "{}", hex_digest(&bytes))?;
        digest.as_file().sync_all()?;

        Ok(StagedSave {
            blob,
            digest,
            blob_path: self.blob_path(),
            digest_path: self.digest_path(),
        })
    }

    /// Remove the snapshot. Missing files are not an error.
    pub fn invalidate(&self) -> Result<(), CacheError> {
        for path in [self.blob_path(), self.digest_path()] {
            match fs::remove_file(&path) {
                Ok(()) => debug!("Removed {}", path.display()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

/// A fully written snapshot waiting to be renamed into place.
#[derive(Debug)]
pub struct StagedSave {
    blob: NamedTempFile,
    digest: NamedTempFile,
    blob_path: PathBuf,
    digest_path: PathBuf,
}

impl StagedSave {
    pub fn commit(self) -> Result<(), CacheError> {
        self.blob
            .persist(&self.blob_path)
            .map_err(|e| CacheError::Io(e.error))?;
        self.digest
            .persist(&self.digest_path)
            .map_err(|e| CacheError::Io(e.error))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexer::TreeIndexer;
    use crate::page::{FileTypes, OutputLayout};
    use crate::test_helpers::{set_mtime, touch};
    use tempfile::TempDir;

    struct Fixture {
        _tmp: TempDir,
        source: PathBuf,
        cache: IndexCache,
    }

    fn fixture() -> Fixture {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("source");
        touch(&source.join("index.md"));
        touch(&source.join("about.html"));
        touch(&source.join("blog/first.md"));
        touch(&source.join("blog/2024/deep.markdown"));
        touch(&tmp.path().join("build/index.html"));
        std::fs::create_dir_all(source.join("empty")).unwrap();
        let cache = IndexCache::new(tmp.path().join(".sitegen-cache"), &source);
        Fixture {
            _tmp: tmp,
            source,
            cache,
        }
    }

    fn index(source: &Path) -> SourceTree {
        let types = FileTypes::default();
        let layout = OutputLayout::default();
        let dest = source.parent().unwrap().join("build");
        TreeIndexer::new(&types, &layout).index(source, &dest).unwrap()
    }

    /// Overwrite the blob with `bytes` compressed, leaving the digest alone.
    fn write_blob(cache: &IndexCache, bytes: &[u8]) {
        let compressed = zstd::encode_all(bytes, ZSTD_LEVEL).unwrap();
        std::fs::write(cache.blob_path(), compressed).unwrap();
    }

    fn read_blob(cache: &IndexCache) -> Vec<u8> {
        zstd::decode_all(std::fs::read(cache.blob_path()).unwrap().as_slice()).unwrap()
    }

    // =========================================================================
    // Round trip
    // =========================================================================

    #[test]
    fn saved_tree_loads_back_identical() {
        let f = fixture();
        let tree = index(&f.source);
        f.cache.save(&tree).unwrap();

        let loaded = f.cache.try_load(None).unwrap();
        assert_eq!(loaded, tree);
        assert_eq!(loaded.len(), 4);
        assert_eq!(
            loaded.iter().map(|e| e.url_path()).collect::<Vec<_>>(),
            tree.iter().map(|e| e.url_path()).collect::<Vec<_>>()
        );
    }

    #[test]
    fn digest_file_is_hex_sha256_of_uncompressed_bytes() {
        let f = fixture();
        f.cache.save(&index(&f.source)).unwrap();

        let digest = std::fs::read_to_string(f.cache.digest_path()).unwrap();
        let digest = digest.trim();
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(digest, hex_digest(&read_blob(&f.cache)));
    }

    #[test]
    fn save_replaces_previous_snapshot() {
        let f = fixture();
        f.cache.save(&index(&f.source)).unwrap();
        touch(&f.source.join("added.md"));
        let tree = index(&f.source);
        f.cache.save(&tree).unwrap();

        let loaded = f.cache.try_load(None).unwrap();
        assert_eq!(loaded.len(), 5);
        assert!(loaded.entry(Path::new("added.md")).is_ok());
    }

    #[test]
    fn no_temp_files_survive_a_save() {
        let f = fixture();
        f.cache.save(&index(&f.source)).unwrap();
        let mut names: Vec<String> = std::fs::read_dir(f.cache.dir())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec![BLOB_FILENAME, DIGEST_FILENAME]);
    }

    // =========================================================================
    // Misses
    // =========================================================================

    #[test]
    fn missing_snapshot_is_a_miss() {
        let f = fixture();
        assert!(matches!(f.cache.try_load(None), Err(CacheMiss::Missing)));
        assert!(f.cache.load(None).is_none());
    }

    #[test]
    fn missing_digest_is_incomplete() {
        let f = fixture();
        f.cache.save(&index(&f.source)).unwrap();
        std::fs::remove_file(f.cache.digest_path()).unwrap();
        assert!(matches!(f.cache.try_load(None), Err(CacheMiss::Incomplete)));
    }

    #[test]
    fn unreadable_digest_is_an_io_miss() {
        let f = fixture();
        f.cache.save(&index(&f.source)).unwrap();
        std::fs::remove_file(f.cache.digest_path()).unwrap();
        std::fs::create_dir(f.cache.digest_path()).unwrap();

        assert!(matches!(f.cache.try_load(None), Err(CacheMiss::Io(_))));
        assert!(f.cache.load(None).is_none());
    }

    #[test]
    fn unreadable_blob_is_an_io_miss() {
        let f = fixture();
        f.cache.save(&index(&f.source)).unwrap();
        std::fs::remove_file(f.cache.blob_path()).unwrap();
        std::fs::create_dir(f.cache.blob_path()).unwrap();

        assert!(matches!(f.cache.try_load(None), Err(CacheMiss::Io(_))));
        assert!(f.cache.load(None).is_none());
    }

    #[test]
    fn directory_times_survive_a_round_trip() {
        let f = fixture();
        set_mtime(&f.source.join("blog"), 1_000);
        let tree = index(&f.source);
        f.cache.save(&tree).unwrap();

        let loaded = f.cache.try_load(None).unwrap();
        let blog = loaded.node(Path::new("blog")).unwrap();
        assert_eq!(blog.modified().map(|t| t.timestamp()), Some(1_000));
        assert_eq!(loaded.root().modified(), tree.root().modified());
    }

    #[test]
    fn tampered_payload_is_a_digest_mismatch() {
        let f = fixture();
        f.cache.save(&index(&f.source)).unwrap();

        let mut bytes = read_blob(&f.cache);
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        write_blob(&f.cache, &bytes);

        assert!(matches!(f.cache.try_load(None), Err(CacheMiss::DigestMismatch)));
        assert!(f.cache.load(None).is_none());
    }

    #[test]
    fn flipped_compressed_byte_is_a_miss_not_a_panic() {
        let f = fixture();
        f.cache.save(&index(&f.source)).unwrap();

        let mut raw = std::fs::read(f.cache.blob_path()).unwrap();
        let mid = raw.len() / 2;
        raw[mid] ^= 0xff;
        std::fs::write(f.cache.blob_path(), raw).unwrap();

        assert!(f.cache.load(None).is_none());
    }

    #[test]
    fn truncated_blob_is_a_miss() {
        let f = fixture();
        f.cache.save(&index(&f.source)).unwrap();
        let raw = std::fs::read(f.cache.blob_path()).unwrap();
        std::fs::write(f.cache.blob_path(), &raw[..raw.len() / 3]).unwrap();
        assert!(f.cache.load(None).is_none());
    }

    #[test]
    fn schema_version_mismatch_is_a_miss() {
        let f = fixture();
        let record = TreeRecord::from_tree(&index(&f.source));
        let bytes = postcard::to_stdvec(&Snapshot {
            schema_version: SCHEMA_VERSION + 1,
            tree: &record,
        })
        .unwrap();
        std::fs::create_dir_all(f.cache.dir()).unwrap();
        write_blob(&f.cache, &bytes);
        std::fs::write(f.cache.digest_path(), hex_digest(&bytes)).unwrap();

        assert!(matches!(
            f.cache.try_load(None),
            Err(CacheMiss::VersionMismatch { found }) if found == SCHEMA_VERSION + 1
        ));
    }

    #[test]
    fn malformed_parent_links_are_corrupt() {
        let f = fixture();
        let mut record = TreeRecord::from_tree(&index(&f.source));
        record.nodes[1].parent = Some(7);
        let bytes = postcard::to_stdvec(&Snapshot {
            schema_version: SCHEMA_VERSION,
            tree: &record,
        })
        .unwrap();
        std::fs::create_dir_all(f.cache.dir()).unwrap();
        write_blob(&f.cache, &bytes);
        std::fs::write(f.cache.digest_path(), hex_digest(&bytes)).unwrap();

        assert!(matches!(f.cache.try_load(None), Err(CacheMiss::Corrupt(_))));
    }

    #[test]
    fn snapshot_of_another_root_is_a_miss() {
        let f = fixture();
        f.cache.save(&index(&f.source)).unwrap();

        let other = IndexCache::new(f.cache.dir(), f.source.join("blog"));
        assert!(matches!(
            other.try_load(None),
            Err(CacheMiss::RootMismatch { cached }) if cached == f.source
        ));
    }

    // =========================================================================
    // Age
    // =========================================================================

    #[test]
    fn old_snapshot_is_expired() {
        let f = fixture();
        f.cache.save(&index(&f.source)).unwrap();
        let an_hour_ago = chrono::Utc::now().timestamp() - 3600;
        set_mtime(&f.cache.blob_path(), an_hour_ago);

        assert!(matches!(
            f.cache.try_load(Some(Duration::from_secs(60))),
            Err(CacheMiss::Expired { .. })
        ));
        assert!(f.cache.try_load(Some(Duration::from_secs(7200))).is_ok());
        assert!(f.cache.try_load(None).is_ok());
    }

    #[test]
    fn zero_max_age_always_expires() {
        let f = fixture();
        f.cache.save(&index(&f.source)).unwrap();
        assert!(matches!(
            f.cache.try_load(Some(Duration::ZERO)),
            Err(CacheMiss::Expired { .. })
        ));
    }

    #[test]
    fn snapshot_from_the_future_is_expired_when_age_is_bounded() {
        let f = fixture();
        f.cache.save(&index(&f.source)).unwrap();
        let tomorrow = chrono::Utc::now().timestamp() + 86_400;
        set_mtime(&f.cache.blob_path(), tomorrow);

        assert!(matches!(
            f.cache.try_load(Some(Duration::from_secs(3600))),
            Err(CacheMiss::Expired { age: None, .. })
        ));
        assert!(f.cache.try_load(None).is_ok());
    }

    // =========================================================================
    // Interrupted saves
    // =========================================================================

    #[test]
    fn abandoned_save_keeps_previous_snapshot() {
        let f = fixture();
        let before = index(&f.source);
        f.cache.save(&before).unwrap();

        touch(&f.source.join("new.md"));
        let staged = f.cache.stage(&index(&f.source)).unwrap();
        drop(staged);

        assert_eq!(f.cache.try_load(None).unwrap(), before);
        assert_eq!(std::fs::read_dir(f.cache.dir()).unwrap().count(), 2);
    }

    #[test]
    fn save_interrupted_between_renames_is_a_miss() {
        let f = fixture();
        f.cache.save(&index(&f.source)).unwrap();

        touch(&f.source.join("new.md"));
        let staged = f.cache.stage(&index(&f.source)).unwrap();
        staged.blob.persist(&staged.blob_path).unwrap();
        drop(staged.digest);

        assert!(matches!(f.cache.try_load(None), Err(CacheMiss::DigestMismatch)));
    }

    #[test]
    fn uncreatable_cache_dir_fails_save() {
        let f = fixture();
        let blocker = f.source.join("index.md");
        let cache = IndexCache::new(blocker.join("cache"), &f.source);
        assert!(matches!(
            cache.save(&index(&f.source)),
            Err(CacheError::CreateDir { .. })
        ));
    }

    #[test]
    fn invalidate_removes_snapshot() {
        let f = fixture();
        f.cache.save(&index(&f.source)).unwrap();
        f.cache.invalidate().unwrap();
        assert!(matches!(f.cache.try_load(None), Err(CacheMiss::Missing)));
        f.cache.invalidate().unwrap();
    }
}
