//! Configuration loading
//!
//! Resolution order for every value: environment variable, then TOML config
//! file, then compiled default. The config file location itself follows the
//! same order (`LINGO_CONFIG`, then the platform config directory).

use crate::{Error, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

const DEFAULT_CATALOG_URL: &str = "https://api.modrinth.com/v2";

/// Threshold policy deciding whether a release+language pair has enough
/// accepted content to justify packaging.
///
/// Qualifies when at least `min_strings` items are translated OR coverage is
/// at least `min_percent`. With `enforce = false` every dirty pair is
/// packaged unconditionally.
#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseThreshold {
    #[serde(default = "default_min_strings")]
    pub min_strings: u32,
    #[serde(default = "default_min_percent")]
    pub min_percent: f64,
    #[serde(default = "default_enforce")]
    pub enforce: bool,
}

fn default_min_strings() -> u32 {
    45
}

fn default_min_percent() -> f64 {
    10.0
}

fn default_enforce() -> bool {
    true
}

impl Default for ReleaseThreshold {
    fn default() -> Self {
        Self {
            min_strings: default_min_strings(),
            min_percent: default_min_percent(),
            enforce: default_enforce(),
        }
    }
}

impl ReleaseThreshold {
    /// Whether a release+language with `translated` of `total` strings qualifies
    pub fn qualifies(&self, translated: u32, total: u32) -> bool {
        if !self.enforce {
            return true;
        }
        if total == 0 {
            return false;
        }
        let percent = f64::from(translated) / f64::from(total) * 100.0;
        translated >= self.min_strings || percent >= self.min_percent
    }
}

/// Raw TOML config file shape
#[derive(Debug, Clone, Default, Deserialize)]
struct TomlConfig {
    data_dir: Option<String>,
    pack_output_dir: Option<String>,
    catalog_url: Option<String>,
    source_language: Option<String>,
    sync_concurrency: Option<usize>,
    task_max_age_minutes: Option<u64>,
    #[serde(default)]
    packaging: Option<ReleaseThreshold>,
}

/// Resolved runtime configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the SQLite database
    pub data_dir: PathBuf,
    /// Directory where generated resource packs are written
    pub pack_output_dir: PathBuf,
    /// Upstream catalog API base URL
    pub catalog_url: String,
    /// Source language extracted from artifacts
    pub source_language: String,
    /// Bounded concurrency for artifact downloads during version sync
    pub sync_concurrency: usize,
    /// Age after which terminal tasks are evicted
    pub task_max_age: Duration,
    /// Packaging threshold policy
    pub packaging: ReleaseThreshold,
}

impl Config {
    /// Path to the SQLite database file
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("lingo.db")
    }

    /// Load configuration from the config file (if any) and environment
    pub fn load() -> Result<Self> {
        let toml_config = load_config_file()?;
        Ok(Self::from_parts(toml_config))
    }

    fn from_parts(toml_config: TomlConfig) -> Self {
        let data_dir = std::env::var("LINGO_DATA_DIR")
            .ok()
            .or(toml_config.data_dir)
            .map(PathBuf::from)
            .unwrap_or_else(default_data_dir);

        let pack_output_dir = std::env::var("LINGO_PACK_OUTPUT_DIR")
            .ok()
            .or(toml_config.pack_output_dir)
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("packs"));

        let catalog_url = std::env::var("LINGO_CATALOG_URL")
            .ok()
            .or(toml_config.catalog_url)
            .unwrap_or_else(|| DEFAULT_CATALOG_URL.to_string());

        Self {
            data_dir,
            pack_output_dir,
            catalog_url,
            source_language: toml_config
                .source_language
                .unwrap_or_else(|| "en_us".to_string()),
            sync_concurrency: toml_config.sync_concurrency.unwrap_or(5),
            task_max_age: Duration::from_secs(
                toml_config.task_max_age_minutes.unwrap_or(60) * 60,
            ),
            packaging: toml_config.packaging.unwrap_or_default(),
        }
    }
}

/// Locate and parse the TOML config file; missing file is not an error
fn load_config_file() -> Result<TomlConfig> {
    let path = match std::env::var("LINGO_CONFIG") {
        Ok(p) => PathBuf::from(p),
        Err(_) => match dirs::config_dir() {
            Some(d) => d.join("lingo").join("config.toml"),
            None => return Ok(TomlConfig::default()),
        },
    };

    if !path.exists() {
        return Ok(TomlConfig::default());
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: TomlConfig = toml::from_str(&contents)
        .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))?;

    info!("Loaded config from {}", path.display());
    Ok(config)
}

/// OS-dependent default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("lingo"))
        .unwrap_or_else(|| PathBuf::from("./lingo_data"))
}
