//! Application configuration for MapSweep.
//!
//! User config lives at `~/.mapsweep/mapsweep.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{MapSweepError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "mapsweep.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".mapsweep";

/// Deepest subdivision level accepted by [`ExploreConfig::validate`].
pub const MAX_DEPTH_LIMIT: u32 = 8;

/// Widest fan-out accepted by [`ExploreConfig::validate`].
pub const MAX_FANOUT: u32 = 16;

// ---------------------------------------------------------------------------
// Config structs (matching mapsweep.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Region subdivision policy.
    #[serde(default)]
    pub search: SearchConfig,

    /// Provider sidecar settings.
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Where results are written.
    #[serde(default)]
    pub output: OutputConfig,
}

/// `[search]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Maximum subdivision depth below the initial region.
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,

    /// Number of child regions per subdivision.
    #[serde(default = "default_fanout")]
    pub fanout: u32,

    /// Child radius = parent radius / factor.
    #[serde(default = "default_subdivision_factor")]
    pub subdivision_factor: f64,

    /// Result count at which a region is considered saturated.
    #[serde(default = "default_page_cap")]
    pub page_cap: usize,

    /// Regions processed in parallel.
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,

    /// Saturated regions are not split into children smaller than this.
    #[serde(default = "default_min_radius_m")]
    pub min_radius_m: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            fanout: default_fanout(),
            subdivision_factor: default_subdivision_factor(),
            page_cap: default_page_cap(),
            concurrency: default_concurrency(),
            min_radius_m: default_min_radius_m(),
        }
    }
}

fn default_max_depth() -> u32 {
    3
}
fn default_fanout() -> u32 {
    4
}
fn default_subdivision_factor() -> f64 {
    2.0
}
fn default_page_cap() -> usize {
    20
}
fn default_concurrency() -> u32 {
    1
}
fn default_min_radius_m() -> f64 {
    50.0
}

/// `[provider]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Base URL of the listing provider sidecar.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retries after the first failed attempt of a provider call.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base delay for exponential backoff between retries.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Minimum ms between any two provider calls.
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
            request_delay_ms: default_request_delay_ms(),
        }
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:4780".into()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    2
}
fn default_retry_backoff_ms() -> u64 {
    500
}
fn default_request_delay_ms() -> u64 {
    1000
}

/// `[output]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// libSQL database file.
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// Optional JSON export; empty disables it.
    #[serde(default)]
    pub json_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            json_path: String::new(),
        }
    }
}

fn default_db_path() -> String {
    "var/mapsweep.db".into()
}

// ---------------------------------------------------------------------------
// Explore config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime exploration policy consumed by the search engine.
#[derive(Debug, Clone)]
pub struct ExploreConfig {
    /// Maximum subdivision depth below the initial region.
    pub max_depth: u32,
    /// Number of child regions per subdivision.
    pub fanout: u32,
    /// Child radius = parent radius / factor. Must exceed 1.
    pub subdivision_factor: f64,
    /// Result count at which a region is considered saturated (`P`).
    pub page_cap: usize,
    /// Retries after the first failed provider call.
    pub max_retries: u32,
    /// Base exponential backoff delay in ms.
    pub retry_backoff_ms: u64,
    /// Minimum ms between provider calls.
    pub request_delay_ms: u64,
    /// Regions processed per batch.
    pub concurrency: u32,
    /// Smallest child radius, in meters, a subdivision may produce.
    pub min_radius_m: f64,
}

impl Default for ExploreConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for ExploreConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            max_depth: config.search.max_depth,
            fanout: config.search.fanout,
            subdivision_factor: config.search.subdivision_factor,
            page_cap: config.search.page_cap,
            max_retries: config.provider.max_retries,
            retry_backoff_ms: config.provider.retry_backoff_ms,
            request_delay_ms: config.provider.request_delay_ms,
            concurrency: config.search.concurrency,
            min_radius_m: config.search.min_radius_m,
        }
    }
}

impl ExploreConfig {
    /// Reject parameters that would break termination or make no sense.
    pub fn validate(&self) -> Result<()> {
        if self.max_depth > MAX_DEPTH_LIMIT {
            return Err(MapSweepError::config(format!(
                "max_depth {} exceeds the limit of {MAX_DEPTH_LIMIT}",
                self.max_depth
            )));
        }
        if !(2..=MAX_FANOUT).contains(&self.fanout) {
            return Err(MapSweepError::config(format!(
                "fanout must be between 2 and {MAX_FANOUT}, got {}",
                self.fanout
            )));
        }
        if !self.subdivision_factor.is_finite() || self.subdivision_factor <= 1.0 {
            return Err(MapSweepError::config(format!(
                "subdivision_factor must be greater than 1, got {}",
                self.subdivision_factor
            )));
        }
        if self.page_cap == 0 {
            return Err(MapSweepError::config("page_cap must be at least 1"));
        }
        if self.concurrency == 0 {
            return Err(MapSweepError::config("concurrency must be at least 1"));
        }
        if !self.min_radius_m.is_finite() || self.min_radius_m < 0.0 {
            return Err(MapSweepError::config(format!(
                "min_radius_m must be zero or positive, got {}",
                self.min_radius_m
            )));
        }
        Ok(())
    }

    /// Upper bound on regions a sweep can visit: `(k^(d+1) - 1) / (k - 1)`.
    pub fn region_budget(&self) -> u64 {
        let k = u64::from(self.fanout);
        (0..=self.max_depth).fold(0u64, |acc, d| acc.saturating_add(k.saturating_pow(d)))
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.mapsweep/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| MapSweepError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.mapsweep/mapsweep.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| MapSweepError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| MapSweepError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| MapSweepError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| MapSweepError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| MapSweepError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
