//! Site configuration module.
//!
//! Handles loading, validating, and merging `sitegen.toml`. The file lives in
//! the site's working directory next to the source and output directories, and
//! every key is optional: user values are merged over the stock defaults.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! source_dir = "source"       # Source root, relative to the working directory
//! dest_dir = "build"          # Output root, relative to the working directory
//!
//! [output]
//! extension = "html"          # Extension of rendered files
//! url_base = "/"              # Prefix of every page URL
//! url_index = "index.html"    # Stripped from URLs: dir/index.html -> dir/
//!
//! [cache]
//! enabled = true
//! dir = ".sitegen-cache"
//! # max_age_secs = 3600      # Unset = never expires, 0 = always re-index
//!
//! [index]
//! on_unreadable = "skip"      # "skip" (warn, leave out) or "abort"
//!
//! [types]
//! markdown = ["md", "markdown"]
//! html = ["html", "htm"]
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::indexer::OnUnreadable;
use crate::page::{FileTypes, OutputLayout, PageKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Name of the config file inside the working directory.
pub const CONFIG_FILENAME: &str = "sitegen.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Site configuration loaded from `sitegen.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Source root, relative to the working directory.
    pub source_dir: String,
    /// Output root, relative to the working directory.
    pub dest_dir: String,
    /// Output paths and URLs.
    pub output: OutputConfig,
    /// Index cache settings.
    pub cache: CacheConfig,
    /// Directory walk settings.
    pub index: IndexConfig,
    /// Extension sets per page kind.
    pub types: TypesConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            source_dir: "source".to_string(),
            dest_dir: "build".to_string(),
            output: OutputConfig::default(),
            cache: CacheConfig::default(),
            index: IndexConfig::default(),
            types: TypesConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Validate values that serde cannot check on its own.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let dirs = [
            ("source_dir", &self.source_dir),
            ("dest_dir", &self.dest_dir),
            ("cache.dir", &self.cache.dir),
        ];
        for (key, value) in dirs {
            if value.trim().is_empty() {
                return Err(ConfigError::Validation(format!("{key} must not be empty")));
            }
        }
        let distinct: BTreeSet<&str> = dirs.iter().map(|(_, v)| v.as_str()).collect();
        if distinct.len() != dirs.len() {
            return Err(ConfigError::Validation(
                "source_dir, dest_dir and cache.dir must be different directories".into(),
            ));
        }

        let output = &self.output;
        if !output.url_base.starts_with('/') || !output.url_base.ends_with('/') {
            return Err(ConfigError::Validation(
                "output.url_base must start and end with '/'".into(),
            ));
        }
        if output.extension.is_empty() || output.extension.starts_with('.') {
            return Err(ConfigError::Validation(
                "output.extension must be non-empty and given without a leading dot".into(),
            ));
        }
        if output.url_index.is_empty() {
            return Err(ConfigError::Validation(
                "output.url_index must not be empty".into(),
            ));
        }

        let mut seen = BTreeSet::new();
        for kind in PageKind::ALL {
            let extensions = self.types.extensions(kind);
            if extensions.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "types.{kind} must list at least one extension"
                )));
            }
            for ext in extensions {
                let normalized = ext.trim_start_matches('.').to_ascii_lowercase();
                if normalized.is_empty() {
                    return Err(ConfigError::Validation(format!(
                        "types.{kind} contains an empty extension"
                    )));
                }
                if !seen.insert(normalized) {
                    return Err(ConfigError::Validation(format!(
                        "extension '{ext}' is listed for more than one page type"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Maximum cache age, `None` for unbounded.
    pub fn max_age(&self) -> Option<Duration> {
        self.cache.max_age_secs.map(Duration::from_secs)
    }

    pub fn layout(&self) -> OutputLayout {
        OutputLayout {
            extension: self.output.extension.clone(),
            url_base: self.output.url_base.clone(),
            url_index: self.output.url_index.clone(),
        }
    }

    /// Build the extension registry from `[types]`.
    pub fn file_types(&self) -> FileTypes {
        let mut types = FileTypes::empty();
        for kind in PageKind::ALL {
            for ext in self.types.extensions(kind) {
                types.register(kind, ext);
            }
        }
        types
    }
}

/// Output paths and URLs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub extension: String,
    pub url_base: String,
    pub url_index: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        let layout = OutputLayout::default();
        Self {
            extension: layout.extension,
            url_base: layout.url_base,
            url_index: layout.url_index,
        }
    }
}

/// Index cache settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    /// When false every build re-walks the source tree.
    pub enabled: bool,
    /// Cache directory, relative to the working directory.
    pub dir: String,
    /// Snapshots older than this are ignored. Absent means no limit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_age_secs: Option<u64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: ".sitegen-cache".to_string(),
            max_age_secs: None,
        }
    }
}

/// Directory walk settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IndexConfig {
    /// What to do with a file or directory that cannot be read mid-walk.
    pub on_unreadable: OnUnreadable,
}

/// Extension sets per page kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TypesConfig {
    pub markdown: Vec<String>,
    pub html: Vec<String>,
}

impl Default for TypesConfig {
    fn default() -> Self {
        let types = FileTypes::default();
        let owned = |kind: PageKind| -> Vec<String> {
            types
                .extensions(kind)
                .into_iter()
                .map(str::to_string)
                .collect()
        };
        Self {
            markdown: owned(PageKind::Markdown),
            html: owned(PageKind::Html),
        }
    }
}

impl TypesConfig {
    pub fn extensions(&self, kind: PageKind) -> &[String] {
        match kind {
            PageKind::Markdown => &self.markdown,
            PageKind::Html => &self.html,
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(SiteConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// Tables merge key-by-key; any other overlay value replaces the base value.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `sitegen.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join(CONFIG_FILENAME);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<SiteConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: SiteConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the config for a working directory, falling back to defaults.
pub fn load_config(dir: &Path) -> Result<SiteConfig, ConfigError> {
    resolve_config(stock_defaults_value(), load_raw_config(dir)?)
}

/// Returns a fully-commented stock `sitegen.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# sitegen configuration
# =====================
# All settings are optional. Values shown below are the defaults.
# Unknown keys will cause an error.

# Directory holding the source documents, relative to this file.
source_dir = "source"

# Directory the rendered pages are written to, relative to this file.
dest_dir = "build"

# ---------------------------------------------------------------------------
# Output paths and URLs
# ---------------------------------------------------------------------------
[output]
# Extension given to every rendered file (source extension is replaced).
extension = "html"

# Prefix of every page URL. Must start and end with '/'.
url_base = "/"

# File name dropped from the end of URLs, so dir/index.html is served as dir/.
url_index = "index.html"

# ---------------------------------------------------------------------------
# Index cache
# ---------------------------------------------------------------------------
[cache]
# Reuse the indexed source tree between runs instead of re-walking it.
enabled = true

# Where the cache snapshot is stored, relative to this file.
dir = ".sitegen-cache"

# Ignore snapshots older than this many seconds.
# Omit for no limit; 0 re-indexes on every run.
# max_age_secs = 3600

# ---------------------------------------------------------------------------
# Directory walk
# ---------------------------------------------------------------------------
[index]
# A file or directory that cannot be read while indexing is either left out
# with a warning ("skip") or stops the build ("abort").
on_unreadable = "skip"

# ---------------------------------------------------------------------------
# Page types
# ---------------------------------------------------------------------------
[types]
# File extensions (case-insensitive) recognized as each page type.
# Files matching none of these are ignored.
markdown = ["markdown", "md"]
html = ["htm", "html"]
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(dir: &Path, content: &str) {
        fs::write(dir.join(CONFIG_FILENAME), content).unwrap();
    }

    // =========================================================================
    // Defaults
    // =========================================================================

    #[test]
    fn default_config_is_valid() {
        SiteConfig::default().validate().unwrap();
    }

    #[test]
    fn missing_file_yields_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config, SiteConfig::default());
        assert_eq!(config.max_age(), None);
    }

    #[test]
    fn stock_toml_matches_defaults() {
        let value: toml::Value = toml::from_str(stock_config_toml()).unwrap();
        let config = resolve_config(stock_defaults_value(), Some(value)).unwrap();
        assert_eq!(config, SiteConfig::default());
    }

    #[test]
    fn default_types_register_both_kinds() {
        let types = SiteConfig::default().file_types();
        assert_eq!(types, FileTypes::default());
    }

    // =========================================================================
    // Loading and merging
    // =========================================================================

    #[test]
    fn partial_config_overrides_only_given_keys() {
        let tmp = TempDir::new().unwrap();
        write_config(
            tmp.path(),
            r#"
dest_dir = "public"

[cache]
max_age_secs = 600
"#,
        );
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.dest_dir, "public");
        assert_eq!(config.source_dir, "source");
        assert!(config.cache.enabled);
        assert_eq!(config.max_age(), Some(Duration::from_secs(600)));
    }

    #[test]
    fn on_unreadable_parses_abort() {
        let tmp = TempDir::new().unwrap();
        write_config(tmp.path(), "[index]\non_unreadable = \"abort\"\n");
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.index.on_unreadable, OnUnreadable::Abort);
    }

    #[test]
    fn unknown_key_is_rejected() {
        let tmp = TempDir::new().unwrap();
        write_config(tmp.path(), "[output]\nextention = \"htm\"\n");
        assert!(matches!(load_config(tmp.path()), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn invalid_toml_is_rejected() {
        let tmp = TempDir::new().unwrap();
        write_config(tmp.path(), "source_dir = ");
        assert!(matches!(load_config(tmp.path()), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn merge_replaces_arrays_instead_of_appending() {
        let base = stock_defaults_value();
        let overlay: toml::Value = toml::from_str("[types]\nmarkdown = [\"mdx\"]").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged["types"]["markdown"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn custom_types_feed_the_registry() {
        let tmp = TempDir::new().unwrap();
        write_config(tmp.path(), "[types]\nmarkdown = [\"txt\"]\n");
        let types = load_config(tmp.path()).unwrap().file_types();
        assert_eq!(types.kind_of(Path::new("a.txt")), Some(PageKind::Markdown));
        assert_eq!(types.kind_of(Path::new("a.md")), None);
        assert_eq!(types.kind_of(Path::new("a.html")), Some(PageKind::Html));
    }

    // =========================================================================
    // Validation
    // =========================================================================

    fn expect_invalid(config: SiteConfig) {
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn url_base_needs_slashes() {
        let mut config = SiteConfig::default();
        config.output.url_base = "/blog".into();
        expect_invalid(config);
    }

    #[test]
    fn extension_with_dot_is_invalid() {
        let mut config = SiteConfig::default();
        config.output.extension = ".html".into();
        expect_invalid(config);
    }

    #[test]
    fn overlapping_type_sets_are_invalid() {
        let mut config = SiteConfig::default();
        config.types.html.push("MD".into());
        expect_invalid(config);
    }

    #[test]
    fn empty_type_set_is_invalid() {
        let mut config = SiteConfig::default();
        config.types.markdown.clear();
        expect_invalid(config);
    }

    #[test]
    fn shared_directories_are_invalid() {
        let mut config = SiteConfig::default();
        config.dest_dir = config.source_dir.clone();
        expect_invalid(config);
    }

    #[test]
    fn layout_mirrors_output_section() {
        let mut config = SiteConfig::default();
        config.output.url_base = "/docs/".into();
        let layout = config.layout();
        assert_eq!(layout.url_base, "/docs/");
        assert_eq!(layout.extension, "html");
    }
}
