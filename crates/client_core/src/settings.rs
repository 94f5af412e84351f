use std::{collections::HashMap, fs, path::PathBuf, time::Duration};

use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

pub const SETTINGS_FILE: &str = "playground.toml";
const ENV_PREFIX: &str = "PLAYGROUND__";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse settings file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlaygroundSettings {
    pub edit_debounce_ms: u64,
    pub url_debounce_ms: u64,
    pub runtime_ready_timeout_secs: u64,
    pub artifact_freshness_secs: i64,
    pub registry_timeout_secs: u64,
    pub registry_base_url: String,
    pub registry_project: String,
    pub country_lookup_base_url: String,
    pub runtime_stylesheet_url: String,
    pub runtime_script_url: String,
    pub output_location_id: String,
    pub display_sink_id: String,
    pub cache_path: PathBuf,
}

impl Default for PlaygroundSettings {
    fn default() -> Self {
        Self {
            edit_debounce_ms: 400,
            url_debounce_ms: 600,
            runtime_ready_timeout_secs: 20,
            artifact_freshness_secs: 24 * 60 * 60,
            registry_timeout_secs: 10,
            registry_base_url: "https://pypi.org/pypi".into(),
            registry_project: "universalpython".into(),
            country_lookup_base_url: "https://restcountries.com/v3.1/alpha".into(),
            runtime_stylesheet_url: "https://pyscript.net/releases/2024.1.1/core.css".into(),
            runtime_script_url: "https://pyscript.net/releases/2024.1.1/core.js".into(),
            output_location_id: "translated-output-data".into(),
            display_sink_id: "output-terminal".into(),
            cache_path: PathBuf::from("./data/playground-cache.json"),
        }
    }
}

impl PlaygroundSettings {
    pub fn edit_debounce(&self) -> Duration {
        Duration::from_millis(self.edit_debounce_ms)
    }

    pub fn url_debounce(&self) -> Duration {
        Duration::from_millis(self.url_debounce_ms)
    }

    pub fn runtime_ready_timeout(&self) -> Duration {
        Duration::from_secs(self.runtime_ready_timeout_secs)
    }

    pub fn artifact_freshness(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.artifact_freshness_secs)
    }

    pub fn registry_timeout(&self) -> Duration {
        Duration::from_secs(self.registry_timeout_secs)
    }

    pub fn registry_json_url(&self) -> String {
        format!(
            "{}/{}/json",
            self.registry_base_url.trim_end_matches('/'),
            self.registry_project
        )
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    fn apply_overrides(&mut self, overrides: &HashMap<String, String>) {
        for (key, value) in overrides {
            let applied = match key.as_str() {
                "EDIT_DEBOUNCE_MS" => parse_into(value, &mut self.edit_debounce_ms),
                "URL_DEBOUNCE_MS" => parse_into(value, &mut self.url_debounce_ms),
                "RUNTIME_READY_TIMEOUT_SECS" => {
                    parse_into(value, &mut self.runtime_ready_timeout_secs)
                }
                "ARTIFACT_FRESHNESS_SECS" => parse_into(value, &mut self.artifact_freshness_secs),
                "REGISTRY_TIMEOUT_SECS" => parse_into(value, &mut self.registry_timeout_secs),
                "REGISTRY_BASE_URL" => set_string(value, &mut self.registry_base_url),
                "REGISTRY_PROJECT" => set_string(value, &mut self.registry_project),
                "COUNTRY_LOOKUP_BASE_URL" => set_string(value, &mut self.country_lookup_base_url),
                "RUNTIME_STYLESHEET_URL" => set_string(value, &mut self.runtime_stylesheet_url),
                "RUNTIME_SCRIPT_URL" => set_string(value, &mut self.runtime_script_url),
                "OUTPUT_LOCATION_ID" => set_string(value, &mut self.output_location_id),
                "DISPLAY_SINK_ID" => set_string(value, &mut self.display_sink_id),
                "CACHE_PATH" => {
                    self.cache_path = PathBuf::from(value);
                    true
                }
                _ => continue,
            };
            if !applied {
                warn!("settings: ignoring unparsable override {ENV_PREFIX}{key}={value}");
            }
        }
    }
}

fn parse_into<T: std::str::FromStr>(raw: &str, slot: &mut T) -> bool {
    match raw.trim().parse::<T>() {
        Ok(parsed) => {
            *slot = parsed;
            true
        }
        Err(_) => false,
    }
}

fn set_string(raw: &str, slot: &mut String) -> bool {
    if raw.trim().is_empty() {
        return false;
    }
    *slot = raw.trim().to_string();
    true
}

/// Reads a settings file. A missing file is not an error.
pub fn read_settings_file(
    path: impl Into<PathBuf>,
) -> Result<Option<PlaygroundSettings>, SettingsError> {
    let path = path.into();
    let raw = match fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => return Err(SettingsError::Read { path, source }),
    };
    PlaygroundSettings::from_toml_str(&raw)
        .map(Some)
        .map_err(|source| SettingsError::Parse { path, source })
}

pub fn load_settings() -> PlaygroundSettings {
    let mut settings = match read_settings_file(SETTINGS_FILE) {
        Ok(Some(file_settings)) => file_settings,
        Ok(None) => PlaygroundSettings::default(),
        Err(err) => {
            warn!("settings: {err}; falling back to defaults");
            PlaygroundSettings::default()
        }
    };

    let overrides: HashMap<String, String> = std::env::vars()
        .filter_map(|(k, v)| k.strip_prefix(ENV_PREFIX).map(|k| (k.to_string(), v)))
        .collect();
    settings.apply_overrides(&overrides);
    settings
}

#[cfg(test)]
#[path = "tests/settings_tests.rs"]
mod tests;
