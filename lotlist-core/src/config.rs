//! Configuration file support for lotlist
//!
//! Loads settings from JSON files.
//!
//! Search order:
//! 1. Explicit path (--config CLI flag)
//! 2. `.lotlistrc.json` in the working directory
//! 3. `lotlist.config.json` in the working directory
//!
//! All fields are optional. CLI flags take precedence over config file values.

use crate::html::{Layout, RenderOptions, DEFAULT_HEADING, DEFAULT_IMAGE_WIDTH};
use crate::links::{SkuLinks, DEFAULT_IMAGE_BASE_URL, DEFAULT_PRODUCT_BASE_URL};
use crate::manifest::ColumnMap;
use crate::sink::OutputNaming;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable consulted when no API key is configured
pub const API_KEY_ENV: &str = "LOTLIST_CLOUDCONVERT_API_KEY";

pub const DEFAULT_MANIFEST_URL: &str = "https://techliquidators.ca/query2Excel.cfm?i={auction_id}";
pub const DEFAULT_CLOUDCONVERT_URL: &str = "https://api.cloudconvert.com/v2";
pub const DEFAULT_SHARED_DIRECTORY: &str = "Auction Lists";

const CONFIG_FILE_NAMES: &[&str] = &[".lotlistrc.json", "lotlist.config.json"];

/// lotlist configuration loaded from a JSON config file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LotlistConfig {
    /// Manifest header names
    #[serde(default)]
    pub columns: Option<ColumnConfig>,

    /// Item table column order (default: classic)
    #[serde(default)]
    pub layout: Option<Layout>,

    /// Page title and heading (default: "Items List")
    #[serde(default)]
    pub heading: Option<String>,

    /// Product page base URL; the SKU is appended
    #[serde(default)]
    pub product_base_url: Option<String>,

    /// Thumbnail host base URL
    #[serde(default)]
    pub image_base_url: Option<String>,

    /// Thumbnail width in pixels (default: 100)
    #[serde(default)]
    pub image_width: Option<u32>,

    /// Manifest download URL; must contain `{auction_id}`
    #[serde(default)]
    pub manifest_url: Option<String>,

    /// Where reports are written
    #[serde(default)]
    pub output: Option<OutputConfig>,

    /// Open the written report in a browser (default: true)
    #[serde(default)]
    pub open_browser: Option<bool>,

    /// XLS to CSV conversion service settings
    #[serde(default)]
    pub cloudconvert: Option<CloudConvertConfig>,
}

/// Manifest header names
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnConfig {
    /// Item title column (default: "Title")
    pub title: Option<String>,
    /// SKU column (default: "BBY SKU")
    pub sku: Option<String>,
    /// Manufacturer column (default: "MFG Name")
    pub manufacturer: Option<String>,
    /// Auction id column (default: "Auction ID")
    pub auction_id: Option<String>,
}

/// Report output location
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    /// `per_auction` (default) or `shared`
    pub naming: Option<OutputNaming>,
    /// Base directory (default: "." for per_auction, "Auction Lists" for shared)
    pub directory: Option<PathBuf>,
}

/// CloudConvert settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CloudConvertConfig {
    /// API key (default: $LOTLIST_CLOUDCONVERT_API_KEY)
    pub api_key: Option<String>,
    /// API base URL (default: https://api.cloudconvert.com/v2)
    pub api_url: Option<String>,
    /// Delay between job status checks (default: 1000)
    pub poll_interval_ms: Option<u64>,
    /// Give up on a conversion job after this long (default: 300)
    pub timeout_secs: Option<u64>,
}

/// Resolved CloudConvert settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloudConvertSettings {
    pub api_key: Option<String>,
    pub api_url: String,
    pub poll_interval: Duration,
    pub timeout: Duration,
}

/// Resolved configuration with defaults filled in
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub columns: ColumnMap,
    pub layout: Layout,
    pub heading: String,
    pub links: SkuLinks,
    pub image_width: u32,
    pub manifest_url: String,
    pub output_naming: OutputNaming,
    pub output_directory: PathBuf,
    pub open_browser: bool,
    pub cloudconvert: CloudConvertSettings,
    /// Path the config was loaded from (None if defaults)
    pub config_path: Option<PathBuf>,
}

fn validate_url(field: &str, url: &str) -> Result<()> {
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        anyhow::bail!("{} must be an http(s) URL (got {:?})", field, url);
    }
    Ok(())
}

impl LotlistConfig {
    /// Validate the configuration for logical errors
    pub fn validate(&self) -> Result<()> {
        if let Some(ref c) = self.columns {
            let defaults = ColumnMap::default();
            let names = [
                ("title", c.title.as_deref().unwrap_or(&defaults.title)),
                ("sku", c.sku.as_deref().unwrap_or(&defaults.sku)),
                (
                    "manufacturer",
                    c.manufacturer.as_deref().unwrap_or(&defaults.manufacturer),
                ),
                (
                    "auction_id",
                    c.auction_id.as_deref().unwrap_or(&defaults.auction_id),
                ),
            ];

            for (field, name) in names {
                if name.trim().is_empty() {
                    anyhow::bail!("columns.{} must not be empty", field);
                }
            }
            for (i, (field, name)) in names.iter().enumerate() {
                if let Some((other, _)) = names[i + 1..].iter().find(|(_, n)| n == name) {
                    anyhow::bail!(
                        "columns.{} and columns.{} both use header {:?}",
                        field,
                        other,
                        name
                    );
                }
            }
        }

        if let Some(ref h) = self.heading {
            if h.trim().is_empty() {
                anyhow::bail!("heading must not be empty");
            }
        }

        if let Some(ref url) = self.product_base_url {
            validate_url("product_base_url", url)?;
        }
        if let Some(ref url) = self.image_base_url {
            validate_url("image_base_url", url)?;
        }

        if self.image_width == Some(0) {
            anyhow::bail!("image_width must be positive");
        }

        if let Some(ref url) = self.manifest_url {
            validate_url("manifest_url", url)?;
            if !url.contains("{auction_id}") {
                anyhow::bail!(
                    "manifest_url must contain the {{auction_id}} placeholder (got {:?})",
                    url
                );
            }
        }

        if let Some(ref cc) = self.cloudconvert {
            if let Some(ref url) = cc.api_url {
                validate_url("cloudconvert.api_url", url)?;
            }
            if cc.poll_interval_ms == Some(0) {
                anyhow::bail!("cloudconvert.poll_interval_ms must be positive");
            }
            if cc.timeout_secs == Some(0) {
                anyhow::bail!("cloudconvert.timeout_secs must be positive");
            }
        }

        Ok(())
    }

    /// Resolve into a ResolvedConfig, reading the API key from the environment
    /// when the file does not set one
    pub fn resolve(&self) -> Result<ResolvedConfig> {
        self.resolve_with_env_key(std::env::var(API_KEY_ENV).ok())
    }

    /// Resolve into a ResolvedConfig with an explicit fallback API key
    pub fn resolve_with_env_key(&self, env_key: Option<String>) -> Result<ResolvedConfig> {
        self.validate()?;

        let default_columns = ColumnMap::default();
        let columns = match self.columns {
            Some(ref c) => ColumnMap {
                title: c.title.clone().unwrap_or(default_columns.title),
                sku: c.sku.clone().unwrap_or(default_columns.sku),
                manufacturer: c.manufacturer.clone().unwrap_or(default_columns.manufacturer),
                auction_id: c.auction_id.clone().unwrap_or(default_columns.auction_id),
            },
            None => default_columns,
        };

        let output_naming = self
            .output
            .as_ref()
            .and_then(|o| o.naming)
            .unwrap_or_default();
        let output_directory = self
            .output
            .as_ref()
            .and_then(|o| o.directory.clone())
            .unwrap_or_else(|| match output_naming {
                OutputNaming::PerAuction => PathBuf::from("."),
                OutputNaming::Shared => PathBuf::from(DEFAULT_SHARED_DIRECTORY),
            });

        let cc = self.cloudconvert.as_ref();
        let api_key = cc
            .and_then(|c| c.api_key.clone())
            .or(env_key)
            .filter(|k| !k.trim().is_empty());

        Ok(ResolvedConfig {
            columns,
            layout: self.layout.unwrap_or_default(),
            heading: self
                .heading
                .clone()
                .unwrap_or_else(|| DEFAULT_HEADING.to_string()),
            links: SkuLinks {
                product_base_url: self
                    .product_base_url
                    .clone()
                    .unwrap_or_else(|| DEFAULT_PRODUCT_BASE_URL.to_string()),
                image_base_url: self
                    .image_base_url
                    .clone()
                    .unwrap_or_else(|| DEFAULT_IMAGE_BASE_URL.to_string()),
            },
            image_width: self.image_width.unwrap_or(DEFAULT_IMAGE_WIDTH),
            manifest_url: self
                .manifest_url
                .clone()
                .unwrap_or_else(|| DEFAULT_MANIFEST_URL.to_string()),
            output_naming,
            output_directory,
            open_browser: self.open_browser.unwrap_or(true),
            cloudconvert: CloudConvertSettings {
                api_key,
                api_url: cc
                    .and_then(|c| c.api_url.clone())
                    .unwrap_or_else(|| DEFAULT_CLOUDCONVERT_URL.to_string()),
                poll_interval: Duration::from_millis(
                    cc.and_then(|c| c.poll_interval_ms).unwrap_or(1000),
                ),
                timeout: Duration::from_secs(cc.and_then(|c| c.timeout_secs).unwrap_or(300)),
            },
            config_path: None,
        })
    }
}

impl ResolvedConfig {
    /// Create a default resolved config
    pub fn defaults() -> Result<Self> {
        LotlistConfig::default().resolve()
    }

    /// Renderer settings derived from this configuration
    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            layout: self.layout,
            heading: self.heading.clone(),
            links: self.links.clone(),
            image_width: self.image_width,
        }
    }
}

/// Discover and load configuration from a directory
///
/// Returns the config and the path it was loaded from, or None if no config found.
pub fn discover_config(project_root: &Path) -> Result<Option<(LotlistConfig, PathBuf)>> {
    for name in CONFIG_FILE_NAMES {
        let path = project_root.join(name);
        if path.exists() {
            let config = load_config_file(&path)?;
            return Ok(Some((config, path)));
        }
    }

    Ok(None)
}

/// Load configuration from a specific file path
pub fn load_config_file(path: &Path) -> Result<LotlistConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;
    let config: LotlistConfig = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse config file: {}", path.display()))?;
    Ok(config)
}

/// Load, validate, and resolve configuration
///
/// If `config_path` is provided, loads from that path.
/// Otherwise, discovers config in `project_root`.
/// Falls back to defaults if no config found.
pub fn load_and_resolve(project_root: &Path, config_path: Option<&Path>) -> Result<ResolvedConfig> {
    let (config, path) = if let Some(explicit_path) = config_path {
        let config = load_config_file(explicit_path)?;
        (config, Some(explicit_path.to_path_buf()))
    } else if let Some((config, path)) = discover_config(project_root)? {
        (config, Some(path))
    } else {
        (LotlistConfig::default(), None)
    };

    let mut resolved = config.resolve()?;
    resolved.config_path = path;
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn parse(json: &str) -> LotlistConfig {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_default_config_is_valid() {
        let resolved = LotlistConfig::default().resolve_with_env_key(None).unwrap();
        assert_eq!(resolved.columns, ColumnMap::default());
        assert_eq!(resolved.layout, Layout::Classic);
        assert_eq!(resolved.heading, "Items List");
        assert_eq!(resolved.image_width, 100);
        assert_eq!(resolved.output_naming, OutputNaming::PerAuction);
        assert_eq!(resolved.output_directory, PathBuf::from("."));
        assert!(resolved.open_browser);
        assert_eq!(resolved.cloudconvert.api_key, None);
        assert_eq!(resolved.cloudconvert.poll_interval, Duration::from_secs(1));
        assert_eq!(resolved.cloudconvert.timeout, Duration::from_secs(300));
        assert!(resolved.config_path.is_none());
    }

    #[test]
    fn test_parse_full_config() {
        let config = parse(
            r#"{
            "columns": {"title": "Name", "sku": "Item", "manufacturer": "Brand", "auction_id": "Sale"},
            "layout": "compact",
            "heading": "Lot 12",
            "product_base_url": "https://shop.example/p/",
            "image_base_url": "https://img.example/",
            "image_width": 80,
            "manifest_url": "https://auctions.example/export?id={auction_id}",
            "output": {"naming": "shared", "directory": "reports"},
            "open_browser": false,
            "cloudconvert": {"api_key": "k", "api_url": "https://cc.example/v2", "poll_interval_ms": 250, "timeout_secs": 30}
        }"#,
        );
        let resolved = config.resolve_with_env_key(None).unwrap();
        assert_eq!(resolved.columns.sku, "Item");
        assert_eq!(resolved.layout, Layout::Compact);
        assert_eq!(resolved.links.product_base_url, "https://shop.example/p/");
        assert_eq!(resolved.output_naming, OutputNaming::Shared);
        assert_eq!(resolved.output_directory, PathBuf::from("reports"));
        assert!(!resolved.open_browser);
        assert_eq!(resolved.cloudconvert.api_key.as_deref(), Some("k"));
        assert_eq!(resolved.cloudconvert.poll_interval, Duration::from_millis(250));
        assert_eq!(resolved.render_options().image_width, 80);
    }

    #[test]
    fn test_reject_unknown_fields() {
        let result: Result<LotlistConfig, _> = serde_json::from_str(r#"{"colour": "red"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_reject_unknown_layout() {
        let result: Result<LotlistConfig, _> = serde_json::from_str(r#"{"layout": "wide"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_shared_naming_defaults_directory() {
        let resolved = parse(r#"{"output": {"naming": "shared"}}"#)
            .resolve_with_env_key(None)
            .unwrap();
        assert_eq!(resolved.output_directory, PathBuf::from("Auction Lists"));
    }

    #[test]
    fn test_partial_columns_use_defaults_for_rest() {
        let resolved = parse(r#"{"columns": {"sku": "SKU"}}"#)
            .resolve_with_env_key(None)
            .unwrap();
        assert_eq!(resolved.columns.sku, "SKU");
        assert_eq!(resolved.columns.title, "Title");
        assert_eq!(resolved.columns.manufacturer, "MFG Name");
    }

    #[test]
    fn test_reject_empty_column_name() {
        assert!(parse(r#"{"columns": {"title": " "}}"#).validate().is_err());
    }

    #[test]
    fn test_reject_duplicate_column_names() {
        let err = parse(r#"{"columns": {"title": "BBY SKU"}}"#)
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("columns.title and columns.sku"));
    }

    #[test]
    fn test_reject_manifest_url_without_placeholder() {
        let config = parse(r#"{"manifest_url": "https://auctions.example/export"}"#);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_reject_non_http_base_url() {
        assert!(parse(r#"{"image_base_url": "ftp://img"}"#).validate().is_err());
        assert!(parse(r#"{"product_base_url": "shop/"}"#).validate().is_err());
    }

    #[test]
    fn test_reject_zero_values() {
        assert!(parse(r#"{"image_width": 0}"#).validate().is_err());
        assert!(parse(r#"{"cloudconvert": {"poll_interval_ms": 0}}"#)
            .validate()
            .is_err());
        assert!(parse(r#"{"cloudconvert": {"timeout_secs": 0}}"#)
            .validate()
            .is_err());
    }

    #[test]
    fn test_env_key_fills_missing_api_key() {
        let resolved = LotlistConfig::default()
            .resolve_with_env_key(Some("from-env".to_string()))
            .unwrap();
        assert_eq!(resolved.cloudconvert.api_key.as_deref(), Some("from-env"));
    }

    #[test]
    fn test_file_api_key_beats_env_key() {
        let resolved = parse(r#"{"cloudconvert": {"api_key": "from-file"}}"#)
            .resolve_with_env_key(Some("from-env".to_string()))
            .unwrap();
        assert_eq!(resolved.cloudconvert.api_key.as_deref(), Some("from-file"));
    }

    #[test]
    fn test_blank_api_key_is_none() {
        let resolved = parse(r#"{"cloudconvert": {"api_key": ""}}"#)
            .resolve_with_env_key(None)
            .unwrap();
        assert_eq!(resolved.cloudconvert.api_key, None);
    }

    #[test]
    fn test_discover_lotlistrc() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join(".lotlistrc.json");
        fs::write(&config_path, r#"{"heading": "Found"}"#).unwrap();

        let (config, path) = discover_config(dir.path()).unwrap().unwrap();
        assert_eq!(config.heading.as_deref(), Some("Found"));
        assert_eq!(path, config_path);
    }

    #[test]
    fn test_discover_priority_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(".lotlistrc.json"), r#"{"image_width": 1}"#).unwrap();
        fs::write(
            dir.path().join("lotlist.config.json"),
            r#"{"image_width": 2}"#,
        )
        .unwrap();

        let (config, _) = discover_config(dir.path()).unwrap().unwrap();
        assert_eq!(
            config.image_width,
            Some(1),
            ".lotlistrc.json should take priority"
        );
    }

    #[test]
    fn test_no_config_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(discover_config(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_load_and_resolve_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("custom.json");
        fs::write(&config_path, r#"{"layout": "compact"}"#).unwrap();

        let resolved = load_and_resolve(dir.path(), Some(&config_path)).unwrap();
        assert_eq!(resolved.layout, Layout::Compact);
        assert_eq!(resolved.config_path, Some(config_path));
    }

    #[test]
    fn test_load_and_resolve_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("bad.json");
        fs::write(&config_path, r#"{"image_width": 0}"#).unwrap();
        assert!(load_and_resolve(dir.path(), Some(&config_path)).is_err());
    }

    #[test]
    fn test_malformed_json_names_file() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join(".lotlistrc.json");
        fs::write(&config_path, "{ not json").unwrap();
        let err = load_config_file(&config_path).unwrap_err();
        assert!(err.to_string().contains(".lotlistrc.json"));
    }
}
