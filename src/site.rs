//! A site working directory resolved into concrete paths.
//!
//! ```text
//! my-site/                 working directory
//! ├── sitegen.toml         optional configuration
//! ├── source/              source root (indexed)
//! ├── build/               output root (rendered pages)
//! └── .sitegen-cache/      index snapshot
//! ```
//!
//! [`Site::open`] loads the configuration and fixes every path the rest of
//! the pipeline needs, so nothing downstream joins paths against the working
//! directory again.

use crate::cache::IndexCache;
use crate::config::{self, ConfigError, SiteConfig};
use crate::indexer::TreeIndexer;
use crate::page::{FileTypes, OutputLayout};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SiteError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("Source directory not found: {0}")]
    MissingSource(PathBuf),
}

#[derive(Debug, Clone)]
pub struct Site {
    pub config: SiteConfig,
    pub working_dir: PathBuf,
    pub source_root: PathBuf,
    pub dest_root: PathBuf,
    pub cache_dir: PathBuf,
    pub types: FileTypes,
    pub layout: OutputLayout,
}

impl Site {
    /// Load `sitegen.toml` from `working_dir` and resolve the site's paths.
    ///
    /// The source root must exist; the output and cache directories are
    /// created on demand.
    pub fn open(working_dir: &Path) -> Result<Self, SiteError> {
        let config = config::load_config(working_dir)?;
        let site = Self::with_config(working_dir, config);
        if !site.source_root.is_dir() {
            return Err(SiteError::MissingSource(site.source_root));
        }
        Ok(site)
    }

    /// Resolve paths for an already loaded configuration.
    pub fn with_config(working_dir: &Path, config: SiteConfig) -> Self {
        let working_dir = working_dir.to_path_buf();
        Self {
            source_root: working_dir.join(&config.source_dir),
            dest_root: working_dir.join(&config.dest_dir),
            cache_dir: working_dir.join(&config.cache.dir),
            types: config.file_types(),
            layout: config.layout(),
            config,
            working_dir,
        }
    }

    pub fn indexer(&self) -> TreeIndexer<'_> {
        TreeIndexer::new(&self.types, &self.layout).on_unreadable(self.config.index.on_unreadable)
    }

    pub fn cache(&self) -> IndexCache {
        IndexCache::new(&self.cache_dir, &self.source_root)
    }
}
