//! Disk-backed configuration for the desktop client.
//!
//! Configuration never hard-fails: bad values are sanitized back to defaults
//! and reported as warnings so the application always starts with something
//! usable.

use std::fs;
use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const CONFIG_DIR_NAME: &str = "studyhelper";
const CONFIG_FILE_NAME: &str = "config.toml";
const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Every request goes through this one base; static files are derived from
/// its origin. Nothing else in the crate carries a host or port.
pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8000/api/v1";

const DEFAULT_STARTUP_TIMEOUT_SECS: u64 = 20;
const DEFAULT_PROBE_INTERVAL_MS: u64 = 250;
const DEFAULT_PAGE_SIZE: u32 = 10;
/// The backend rejects page sizes above this.
const MAX_PAGE_SIZE: u32 = 100;

/// Result returned by [`load_config`], capturing the source and any
/// non-fatal issues.
#[derive(Debug, Clone)]
pub struct ConfigLoadResult {
    pub config: FileConfig,
    pub warnings: Vec<String>,
    pub source: ConfigSource,
}

/// Indicates where the configuration was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    /// No persisted configuration was found or usable; defaults were
    /// synthesized.
    Default,
    /// Configuration was read from `config.toml`.
    File,
}

/// Errors that can occur when persisting configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("TOML serialization error: {0}")]
    Ser(#[from] toml::ser::Error),
}

/// Disk-backed configuration schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default = "FileConfig::schema_version")]
    pub schema_version: u32,
    #[serde(default)]
    pub backend: BackendSettings,
    #[serde(default)]
    pub ui: UiPreferences,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            backend: BackendSettings::default(),
            ui: UiPreferences::default(),
        }
    }
}

impl FileConfig {
    const fn schema_version() -> u32 {
        CURRENT_SCHEMA_VERSION
    }
}

/// Where the backend lives and how its lifecycle is handled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendSettings {
    /// Base URL of the backend API, `/api/v1` prefix included.
    #[serde(default = "BackendSettings::default_api_base_url")]
    pub api_base_url: String,
    /// When false the backend is assumed to be started externally and the
    /// supervisor never spawns a child.
    #[serde(default = "BackendSettings::default_manage_process")]
    pub manage_process: bool,
    /// Override for the backend executable path (`~` expanded).
    #[serde(default)]
    pub executable_override: Option<String>,
    /// Override for the data-root directory handed to the backend.
    #[serde(default)]
    pub data_root_override: Option<String>,
    /// Upper bound on the readiness probe after launching the backend.
    #[serde(default = "BackendSettings::default_startup_timeout_secs")]
    pub startup_timeout_secs: u64,
    /// Delay between readiness probe attempts.
    #[serde(default = "BackendSettings::default_probe_interval_ms")]
    pub probe_interval_ms: u64,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            api_base_url: Self::default_api_base_url(),
            manage_process: true,
            executable_override: None,
            data_root_override: None,
            startup_timeout_secs: DEFAULT_STARTUP_TIMEOUT_SECS,
            probe_interval_ms: DEFAULT_PROBE_INTERVAL_MS,
        }
    }
}

impl BackendSettings {
    fn default_api_base_url() -> String {
        DEFAULT_API_BASE_URL.to_string()
    }

    const fn default_manage_process() -> bool {
        true
    }

    const fn default_startup_timeout_secs() -> u64 {
        DEFAULT_STARTUP_TIMEOUT_SECS
    }

    const fn default_probe_interval_ms() -> u64 {
        DEFAULT_PROBE_INTERVAL_MS
    }
}

/// UI-only preferences the GUI persists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiPreferences {
    #[serde(default)]
    pub theme: ThemePreference,
    /// Page size for the score listing.
    #[serde(default = "UiPreferences::default_page_size")]
    pub page_size: u32,
    #[serde(default)]
    pub show_technical_log: bool,
}

impl Default for UiPreferences {
    fn default() -> Self {
        Self {
            theme: ThemePreference::Light,
            page_size: DEFAULT_PAGE_SIZE,
            show_technical_log: false,
        }
    }
}

impl UiPreferences {
    const fn default_page_size() -> u32 {
        DEFAULT_PAGE_SIZE
    }
}

/// Theme preference options.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ThemePreference {
    Light,
    Dark,
}

impl Default for ThemePreference {
    fn default() -> Self {
        ThemePreference::Light
    }
}

/// Path to the configuration directory.
pub fn config_directory() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR_NAME)
}

/// Path to `config.toml`.
pub fn config_path() -> PathBuf {
    config_directory().join(CONFIG_FILE_NAME)
}

/// Load the configuration, falling back to defaults on any problem.
pub fn load_config() -> ConfigLoadResult {
    let mut warnings = Vec::new();
    let path = config_path();

    if path.exists() {
        match fs::read_to_string(&path) {
            Ok(raw) => match toml::from_str::<FileConfig>(&raw) {
                Ok(cfg) => {
                    let (cfg, mut sanitize_warnings) = sanitize_config(cfg);
                    warnings.append(&mut sanitize_warnings);
                    return ConfigLoadResult {
                        config: cfg,
                        warnings,
                        source: ConfigSource::File,
                    };
                }
                Err(err) => warnings.push(format!(
                    "Failed to parse {} as TOML: {}. Falling back to defaults.",
                    CONFIG_FILE_NAME, err
                )),
            },
            Err(err) => warnings.push(format!(
                "Failed to read {}: {}. Falling back to defaults.",
                CONFIG_FILE_NAME, err
            )),
        }
    }

    ConfigLoadResult {
        config: FileConfig::default(),
        warnings,
        source: ConfigSource::Default,
    }
}

/// Persist the configuration to disk.
pub fn save_config(config: &FileConfig) -> Result<(), ConfigError> {
    let path = config_path();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let serialized = toml::to_string_pretty(config)?;
    fs::write(path, serialized)?;
    Ok(())
}

fn sanitize_config(mut config: FileConfig) -> (FileConfig, Vec<String>) {
    let mut warnings = Vec::new();

    if config.schema_version != CURRENT_SCHEMA_VERSION {
        warnings.push(format!(
            "Unknown config schema version {}. Resetting to {}.",
            config.schema_version, CURRENT_SCHEMA_VERSION
        ));
        return (FileConfig::default(), warnings);
    }

    let trimmed = config.backend.api_base_url.trim().trim_end_matches('/');
    match reqwest::Url::parse(trimmed) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {
            config.backend.api_base_url = trimmed.to_string();
        }
        _ => {
            warnings.push(format!(
                "API base URL '{}' is not a valid http(s) URL. Resetting to {}.",
                config.backend.api_base_url, DEFAULT_API_BASE_URL
            ));
            config.backend.api_base_url = DEFAULT_API_BASE_URL.to_string();
        }
    }

    if config.backend.startup_timeout_secs == 0 {
        warnings.push(format!(
            "Backend startup timeout must be at least one second. Resetting to {}.",
            DEFAULT_STARTUP_TIMEOUT_SECS
        ));
        config.backend.startup_timeout_secs = DEFAULT_STARTUP_TIMEOUT_SECS;
    }

    if config.backend.probe_interval_ms == 0 {
        warnings.push(format!(
            "Readiness probe interval must be non-zero. Resetting to {}ms.",
            DEFAULT_PROBE_INTERVAL_MS
        ));
        config.backend.probe_interval_ms = DEFAULT_PROBE_INTERVAL_MS;
    }

    if let Some(ref exe) = config.backend.executable_override {
        if exe.trim().is_empty() {
            config.backend.executable_override = None;
        }
    }
    if let Some(ref root) = config.backend.data_root_override {
        if root.trim().is_empty() {
            config.backend.data_root_override = None;
        }
    }

    if config.ui.page_size == 0 {
        warnings.push(format!(
            "Score listing page size must be at least 1. Resetting to {}.",
            DEFAULT_PAGE_SIZE
        ));
        config.ui.page_size = DEFAULT_PAGE_SIZE;
    } else if config.ui.page_size > MAX_PAGE_SIZE {
        warnings.push(format!(
            "Score listing page size {} exceeds the backend limit. Clamping to {}.",
            config.ui.page_size, MAX_PAGE_SIZE
        ));
        config.ui.page_size = MAX_PAGE_SIZE;
    }

    (config, warnings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_pass_sanitize_cleanly() {
        let (config, warnings) = sanitize_config(FileConfig::default());
        assert!(warnings.is_empty(), "unexpected warnings: {warnings:?}");
        assert_eq!(config, FileConfig::default());
    }

    #[test]
    fn wrong_schema_version_resets_everything() {
        let mut config = FileConfig::default();
        config.schema_version = 999;
        config.backend.api_base_url = "http://10.0.0.1:9999/api/v1".to_string();

        let (sanitized, warnings) = sanitize_config(config);

        assert_eq!(sanitized, FileConfig::default());
        assert!(
            warnings.iter().any(|w| w.contains("schema version")),
            "should warn about unknown schema version"
        );
    }

    #[test]
    fn bad_base_url_resets_to_default() {
        let mut config = FileConfig::default();
        config.backend.api_base_url = "not a url".to_string();

        let (sanitized, warnings) = sanitize_config(config);

        assert_eq!(sanitized.backend.api_base_url, DEFAULT_API_BASE_URL);
        assert!(warnings.iter().any(|w| w.contains("API base URL")));
    }

    #[test]
    fn non_http_scheme_is_rejected() {
        let mut config = FileConfig::default();
        config.backend.api_base_url = "ftp://127.0.0.1/api/v1".to_string();

        let (sanitized, warnings) = sanitize_config(config);

        assert_eq!(sanitized.backend.api_base_url, DEFAULT_API_BASE_URL);
        assert!(!warnings.is_empty());
    }

    #[test]
    fn trailing_slash_is_trimmed_without_warning() {
        let mut config = FileConfig::default();
        config.backend.api_base_url = "http://127.0.0.1:8000/api/v1/".to_string();

        let (sanitized, warnings) = sanitize_config(config);

        assert_eq!(sanitized.backend.api_base_url, "http://127.0.0.1:8000/api/v1");
        assert!(warnings.is_empty());
    }

    #[test]
    fn zero_timeout_and_interval_reset() {
        let mut config = FileConfig::default();
        config.backend.startup_timeout_secs = 0;
        config.backend.probe_interval_ms = 0;

        let (sanitized, warnings) = sanitize_config(config);

        assert_eq!(sanitized.backend.startup_timeout_secs, 20);
        assert_eq!(sanitized.backend.probe_interval_ms, 250);
        assert_eq!(warnings.len(), 2);
    }

    #[test]
    fn page_size_is_clamped_to_backend_limit() {
        let mut config = FileConfig::default();
        config.ui.page_size = 500;

        let (sanitized, warnings) = sanitize_config(config);

        assert_eq!(sanitized.ui.page_size, 100);
        assert!(warnings.iter().any(|w| w.contains("page size")));

        let mut config = FileConfig::default();
        config.ui.page_size = 0;
        let (sanitized, _) = sanitize_config(config);
        assert_eq!(sanitized.ui.page_size, 10);
    }

    #[test]
    fn empty_overrides_collapse_to_none() {
        let mut config = FileConfig::default();
        config.backend.executable_override = Some("   ".to_string());
        config.backend.data_root_override = Some(String::new());

        let (sanitized, _) = sanitize_config(config);

        assert!(sanitized.backend.executable_override.is_none());
        assert!(sanitized.backend.data_root_override.is_none());
    }

    #[test]
    fn config_round_trips_through_toml() {
        let mut config = FileConfig::default();
        config.backend.manage_process = false;
        config.backend.executable_override = Some("~/backend/study-helper-backend".to_string());
        config.ui.theme = ThemePreference::Dark;
        config.ui.page_size = 25;

        let serialized = toml::to_string_pretty(&config).unwrap();
        let parsed: FileConfig = toml::from_str(&serialized).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn missing_sections_take_defaults() {
        let parsed: FileConfig = toml::from_str("schema_version = 1\n").unwrap();
        assert_eq!(parsed, FileConfig::default());
    }
}
