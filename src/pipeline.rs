//! The incremental build.
//!
//! ```text
//! [clean] → cache or index → re-stat outputs → orphans → render → report
//! ```
//!
//! 1. With `clean`, every rendered file is removed first.
//! 2. The tree comes from the index cache when a usable snapshot exists and
//!    still matches the source directory (no directory changed, every source
//!    still there). Otherwise it comes from a fresh walk that is then saved
//!    back. Source times of a cached tree are re-read either way.
//! 3. Output timestamps are re-read, so decisions reflect the outputs as
//!    they are now rather than when the snapshot was taken.
//! 4. Rendered files with no source are reported as `Deleted` and removed.
//! 5. Each page that needs work goes to the renderer. A failing page is
//!    logged and counted; the build carries on.
//!
//! A dry run takes the same path but marks every page validate-only and
//! writes nothing: no outputs, no deletions and no cache snapshot.

use crate::cache::{CacheError, IndexCache};
use crate::clean;
use crate::indexer::IndexError;
use crate::output::BuildStats;
use crate::render::PageRenderer;
use crate::site::Site;
use crate::tree::SourceTree;
use std::io;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, info, warn};

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Index error: {0}")]
    Index(#[from] IndexError),
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
    #[error("Cannot clean output directory: {0}")]
    Clean(#[source] io::Error),
}

/// How the index cache takes part in a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CacheMode {
    /// Load a usable snapshot; index and save on a miss.
    #[default]
    Use,
    /// Always index, then save the result.
    Refresh,
    /// Neither load nor save.
    Off,
}

#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Render every page regardless of its decision.
    pub force: bool,
    /// Remove all rendered files before building.
    pub clean: bool,
    /// Decide and render without writing anything.
    pub dry_run: bool,
    pub cache: CacheMode,
    /// Maximum snapshot age, `None` for unbounded.
    pub max_age: Option<Duration>,
}

/// A tree together with where it came from.
#[derive(Debug)]
pub struct LoadedTree {
    pub tree: SourceTree,
    pub from_cache: bool,
}

#[derive(Debug)]
pub struct BuildReport {
    pub stats: BuildStats,
    pub tree: SourceTree,
    pub from_cache: bool,
    /// Rendered files removed (or, on a dry run, that would be removed).
    pub deleted: Vec<PathBuf>,
}

/// Get the site's tree from the cache or a fresh index pass.
///
/// A cached tree is used only if [`SourceTree::refresh_sources`] finds no
/// drift. A snapshot is written after indexing when `save` is set and the mode
/// allows it. Only an uncreatable cache directory fails the call; any other
/// save error is logged.
pub fn load_tree(
    site: &Site,
    mode: CacheMode,
    max_age: Option<Duration>,
    save: bool,
) -> Result<LoadedTree, BuildError> {
    let cache = site.cache();
    if mode == CacheMode::Use {
        if let Some(mut tree) = cache.load(max_age) {
            match tree.refresh_sources() {
                Ok(()) => {
                    return Ok(LoadedTree {
                        tree,
                        from_cache: true,
                    });
                }
                Err(drift) => info!("Index snapshot is out of date: {drift}"),
            }
        }
    }

    let (tree, stats) = site
        .indexer()
        .index_with_stats(&site.source_root, &site.dest_root)?;
    debug!("Index pass: {:?}", stats);

    if save && mode != CacheMode::Off {
        save_snapshot(&cache, &tree)?;
    }
    Ok(LoadedTree {
        tree,
        from_cache: false,
    })
}

fn save_snapshot(cache: &IndexCache, tree: &SourceTree) -> Result<(), BuildError> {
    match cache.save(tree) {
        Ok(()) => Ok(()),
        Err(e @ CacheError::CreateDir { .. }) => Err(e.into()),
        Err(e) => {
            warn!("Could not save index snapshot: {e}");
            Ok(())
        }
    }
}

/// Run one incremental build of `site`.
pub fn build(
    site: &Site,
    options: &BuildOptions,
    renderer: &dyn PageRenderer,
) -> Result<BuildReport, BuildError> {
    let start = Instant::now();
    let mut stats = BuildStats::default();
    let mut deleted = Vec::new();

    if options.clean {
        let rendered = if options.dry_run {
            clean::rendered_files(&site.dest_root, &site.layout)
        } else {
            clean::clean_dest(&site.dest_root, &site.layout)
        }
        .map_err(BuildError::Clean)?;
        info!("Cleaned {} rendered files", rendered.len());
        deleted.extend(rendered);
    }

    let LoadedTree {
        mut tree,
        from_cache,
    } = load_tree(site, options.cache, options.max_age, !options.dry_run)?;

    tree.refresh_destinations(&site.dest_root);
    if options.dry_run {
        tree.set_validate_only(true);
    }

    // After a clean every rendered file is already accounted for.
    let orphans = if options.clean {
        Vec::new()
    } else {
        clean::find_orphans(&tree, &site.dest_root, &site.layout).map_err(BuildError::Clean)?
    };
    if !orphans.is_empty() {
        info!("{} rendered files have no source", orphans.len());
        if !options.dry_run {
            clean::remove_files(&site.dest_root, &orphans).map_err(BuildError::Clean)?;
        }
        deleted.extend(orphans);
    }
    stats.deleted = deleted.len();

    for entry in tree.iter() {
        let decision = entry.build_decision();
        if !decision.needs_work() && !options.force {
            debug!("Skipping {} ({decision})", entry.source_path().display());
            stats.add(decision);
            continue;
        }
        match renderer.render(entry, site) {
            Ok(bytes) => {
                debug!(
                    "Rendered {} → {} ({decision}, {bytes} bytes)",
                    entry.source_path().display(),
                    entry.dest_path().display()
                );
                stats.add(decision);
            }
            Err(e) => {
                error!("Failed to render {}: {e}", entry.source_path().display());
                stats.errors += 1;
            }
        }
    }

    stats.pages = tree.len();
    stats.elapsed = start.elapsed();
    Ok(BuildReport {
        stats,
        tree,
        from_cache,
        deleted,
    })
}

/// Remove all rendered output and the index snapshot.
pub fn clean(site: &Site) -> Result<usize, BuildError> {
    let removed = clean::clean_dest(&site.dest_root, &site.layout).map_err(BuildError::Clean)?;
    site.cache().invalidate()?;
    info!("Removed {} rendered files", removed.len());
    Ok(removed.len())
}
