//! Daemon configuration, persisted as JSON in the data directory.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::error::{ArchiveError, ArchiveResult};

const CONFIG_FILE: &str = "config.json";

/// Default TAP endpoint of the NASA Exoplanet Archive.
pub const DEFAULT_TAP_URL: &str = "https://exoplanetarchive.ipac.caltech.edu/TAP/sync";

fn default_table() -> String {
    "ps".to_string()
}

fn default_tap_url() -> String {
    DEFAULT_TAP_URL.to_string()
}

fn default_sync_interval() -> u64 {
    86_400
}

fn default_notify_tick() -> u64 {
    60
}

fn default_render_slots() -> usize {
    5
}

fn default_columns() -> Vec<String> {
    [
        "pl_name",
        "hostname",
        "sy_snum",
        "sy_pnum",
        "discoverymethod",
        "disc_year",
        "pl_orbper",
        "pl_rade",
        "pl_radj",
        "pl_bmasse",
        "pl_bmassj",
        "pl_orbeccen",
        "st_teff",
        "st_rad",
        "st_mass",
        "st_logg",
        "sy_dist",
        "releasedate",
        "rowupdate",
    ]
    .iter()
    .map(|s| (*s).to_string())
    .collect()
}

/// Daemon configuration with sensible defaults for every field, so a
/// missing or partial config file never blocks startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// TAP sync endpoint base URL.
    #[serde(default = "default_tap_url")]
    pub tap_url: String,
    /// Remote/local table holding the planetary-systems records.
    #[serde(default = "default_table")]
    pub table: String,
    /// Columns mirrored from the remote table. The local schema adds a
    /// generated `id` primary key before them and a `last_write` marker
    /// column after them.
    #[serde(default = "default_columns")]
    pub columns: Vec<String>,
    /// Seconds between archive sync cycles.
    #[serde(default = "default_sync_interval")]
    pub sync_interval_secs: u64,
    /// Seconds between notification scheduler ticks.
    #[serde(default = "default_notify_tick")]
    pub notify_tick_secs: u64,
    /// Seconds between news refreshes.
    #[serde(default = "default_sync_interval")]
    pub news_interval_secs: u64,
    /// Concurrent external render invocations admitted at once.
    #[serde(default = "default_render_slots")]
    pub render_slots: usize,
    /// Optional URL the news refresher pulls from. Disabled when absent.
    #[serde(default)]
    pub news_feed_url: Option<String>,
}

impl AppConfig {
    /// Reject configs the daemon cannot run with. The first column is the
    /// entity identifier for diffing and deletion, so an empty column
    /// list has no meaning.
    pub fn validate(&self) -> ArchiveResult<()> {
        if self.columns.is_empty() {
            return Err(ArchiveError::Config(
                "columns must name at least the identifier column".into(),
            ));
        }
        if self.render_slots == 0 {
            return Err(ArchiveError::Config(
                "render_slots must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            tap_url: default_tap_url(),
            table: default_table(),
            columns: default_columns(),
            sync_interval_secs: default_sync_interval(),
            notify_tick_secs: default_notify_tick(),
            news_interval_secs: default_sync_interval(),
            render_slots: default_render_slots(),
            news_feed_url: None,
        }
    }
}

/// Resolve the data directory, honoring the `LEXARCHIVE_DATA_DIR` override.
pub fn get_data_dir() -> ArchiveResult<PathBuf> {
    if let Ok(dir) = std::env::var("LEXARCHIVE_DATA_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::data_dir()
        .map(|d| d.join("lexarchive"))
        .ok_or_else(|| ArchiveError::Config("could not resolve a data directory".into()))
}

/// Load the config from the data directory, falling back to defaults when
/// the file does not exist.
pub fn load_config() -> ArchiveResult<AppConfig> {
    let config_path = get_data_dir()?.join(CONFIG_FILE);
    if !config_path.exists() {
        return Ok(AppConfig::default());
    }
    let content = fs::read_to_string(&config_path)?;
    let config: AppConfig = serde_json::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

/// Save the config atomically (write to a temp file, then rename).
pub fn save_config(config: &AppConfig) -> ArchiveResult<()> {
    let data_dir = get_data_dir()?;
    fs::create_dir_all(&data_dir)?;
    let config_path = data_dir.join(CONFIG_FILE);
    let temp_path = data_dir.join(format!("{CONFIG_FILE}.tmp"));

    let content = serde_json::to_string_pretty(config)?;
    fs::write(&temp_path, content)?;
    fs::rename(&temp_path, &config_path)?;
    Ok(())
}
