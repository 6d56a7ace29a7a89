use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use super::cli::CliConfig;
use super::constants::{
    APP_DOT_FOLDER, CONFIG_FILE_NAME, DEFAULT_LENIENT_JSON, DEFAULT_SOURCE_CACHE_CAPACITY,
    DEFAULT_VENDOR_MAPPERS,
};
use crate::ingestion::ReaderOptions;

// =============================================================================
// File Configuration
// =============================================================================

#[derive(Debug, Default, Clone, Deserialize)]
pub struct IngestFileConfig {
    pub lenient_json: Option<bool>,
    pub vendor_mappers: Option<Vec<String>>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct SourceLocationFileConfig {
    pub cache_capacity: Option<u64>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct OutputFileConfig {
    pub pretty: Option<bool>,
}

/// File-based configuration (JSON)
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub ingest: Option<IngestFileConfig>,
    pub source_location: Option<SourceLocationFileConfig>,
    pub output: Option<OutputFileConfig>,
    #[serde(flatten)]
    pub extra: serde_json::Value,
}

impl FileConfig {
    /// Load configuration from a JSON file
    fn load_from_file(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "Loading config file");
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        tracing::trace!(config = ?config, "Parsed config file");
        Ok(config)
    }

    /// Warn about unknown fields in the config
    fn warn_unknown_fields(&self) {
        if let serde_json::Value::Object(map) = &self.extra
            && !map.is_empty()
        {
            let keys_str: String = map
                .keys()
                .map(|k| k.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            tracing::warn!(
                fields = %keys_str,
                "Unknown fields in config file (possible typos)"
            );
        }
    }

    /// Merge another FileConfig into this one (other takes precedence)
    fn merge(&mut self, other: FileConfig) {
        if let Some(ingest) = other.ingest {
            let current = self.ingest.get_or_insert_with(IngestFileConfig::default);
            if ingest.lenient_json.is_some() {
                tracing::trace!(lenient_json = ?ingest.lenient_json, "Merging ingest.lenient_json");
                current.lenient_json = ingest.lenient_json;
            }
            if ingest.vendor_mappers.is_some() {
                tracing::trace!(
                    vendor_mappers = ?ingest.vendor_mappers,
                    "Merging ingest.vendor_mappers"
                );
                current.vendor_mappers = ingest.vendor_mappers;
            }
        }

        if let Some(source_location) = other.source_location {
            let current = self
                .source_location
                .get_or_insert_with(SourceLocationFileConfig::default);
            if source_location.cache_capacity.is_some() {
                tracing::trace!(
                    cache_capacity = ?source_location.cache_capacity,
                    "Merging source_location.cache_capacity"
                );
                current.cache_capacity = source_location.cache_capacity;
            }
        }

        if let Some(output) = other.output {
            let current = self.output.get_or_insert_with(OutputFileConfig::default);
            if output.pretty.is_some() {
                tracing::trace!(pretty = ?output.pretty, "Merging output.pretty");
                current.pretty = output.pretty;
            }
        }
    }
}

// =============================================================================
// Resolved Configuration
// =============================================================================

#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub lenient_json: bool,
    /// Empty when vendor mapping is disabled
    pub vendor_mappers: Vec<String>,
}

impl IngestConfig {
    pub fn reader_options(&self) -> ReaderOptions {
        if self.lenient_json {
            ReaderOptions::lenient()
        } else {
            ReaderOptions::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct SourceLocationConfig {
    pub cache_capacity: u64,
}

#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub pretty: bool,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub ingest: IngestConfig,
    pub source_location: SourceLocationConfig,
    pub output: OutputConfig,
}

impl AppConfig {
    /// Load configuration from all sources
    ///
    /// Priority (lowest to highest):
    /// 1. Defaults
    /// 2. Profile directory config (~/.otlp-ingest/otlp-ingest.json)
    /// 3. Local directory config OR CLI-specified config path
    /// 4. CLI arguments (which include env var fallbacks via clap)
    pub fn load(cli: &CliConfig) -> Result<Self> {
        Self::load_layers(cli, get_profile_config_path())
    }

    fn load_layers(cli: &CliConfig, profile_path: Option<PathBuf>) -> Result<Self> {
        tracing::debug!("Loading application configuration");
        tracing::trace!(cli = ?cli, "CLI config");

        let mut file_config = FileConfig::default();
        let mut found_configs: Vec<String> = Vec::new();

        // 1. Profile dir, skipped if absent
        if let Some(profile_path) = profile_path
            && profile_path.exists()
        {
            let profile_config = FileConfig::load_from_file(&profile_path)?;
            profile_config.warn_unknown_fields();
            file_config.merge(profile_config);
            found_configs.push(profile_path.display().to_string());
        }

        // 2. CLI-specified path OR local directory
        let overlay_path = if let Some(ref path) = cli.config {
            let expanded = expand_path(path);
            if !expanded.exists() {
                anyhow::bail!("Config file not found: {}", expanded.display());
            }
            Some(expanded)
        } else {
            let local = PathBuf::from(CONFIG_FILE_NAME);
            if local.exists() { Some(local) } else { None }
        };

        if let Some(path) = overlay_path {
            let overlay_config = FileConfig::load_from_file(&path)?;
            overlay_config.warn_unknown_fields();
            file_config.merge(overlay_config);
            found_configs.push(path.display().to_string());
        }

        tracing::debug!(configs = ?found_configs, "Config files loaded");

        let file_ingest = file_config.ingest.unwrap_or_default();
        let file_source_location = file_config.source_location.unwrap_or_default();
        let file_output = file_config.output.unwrap_or_default();

        // 3. Layer: defaults -> file config -> CLI/env overrides
        let lenient_json = cli
            .lenient_json
            .or(file_ingest.lenient_json)
            .unwrap_or(DEFAULT_LENIENT_JSON);

        // --no-vendor-mapping wins over any list
        let vendor_mappers = if cli.no_vendor_mapping {
            Vec::new()
        } else {
            cli.vendor_mappers
                .clone()
                .or(file_ingest.vendor_mappers)
                .unwrap_or_else(|| DEFAULT_VENDOR_MAPPERS.iter().map(|s| s.to_string()).collect())
        };

        let cache_capacity = cli
            .cache_capacity
            .or(file_source_location.cache_capacity)
            .unwrap_or(DEFAULT_SOURCE_CACHE_CAPACITY);

        let pretty = cli.pretty || file_output.pretty.unwrap_or(false);

        let config = Self {
            ingest: IngestConfig {
                lenient_json,
                vendor_mappers,
            },
            source_location: SourceLocationConfig { cache_capacity },
            output: OutputConfig { pretty },
        };
        tracing::debug!(config = ?config, "Configuration resolved");
        Ok(config)
    }
}

/// Expand a leading `~` to the home directory
fn expand_path(path: &Path) -> PathBuf {
    match (path.to_str(), dirs::home_dir()) {
        (Some("~"), Some(home)) => home,
        (Some(text), Some(home)) => match text.strip_prefix("~/") {
            Some(rest) => home.join(rest),
            None => path.to_path_buf(),
        },
        _ => path.to_path_buf(),
    }
}

fn get_profile_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(APP_DOT_FOLDER).join(CONFIG_FILE_NAME))
}
