use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryPackage {
    pub info: RegistryInfo,
    #[serde(default)]
    pub releases: HashMap<String, Vec<ReleaseFile>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryInfo {
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseFile {
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl ReleaseFile {
    pub fn is_binary_distribution(&self) -> bool {
        self.filename
            .as_deref()
            .is_some_and(|name| name.ends_with(".whl"))
    }
}

impl RegistryPackage {
    /// Asset of the latest version: the first binary distribution, else the
    /// first listed file. Returns `None` when that file carries no url.
    pub fn latest_artifact_url(&self) -> Option<&str> {
        let files = self.releases.get(&self.info.version)?;
        let chosen = files
            .iter()
            .find(|f| f.is_binary_distribution())
            .or_else(|| files.first())?;
        chosen.url.as_deref().filter(|url| !url.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountryRecord {
    #[serde(default)]
    pub languages: Map<String, Value>,
}

impl CountryRecord {
    /// Language keys, lower-cased, in the order the lookup returned them.
    pub fn language_codes(&self) -> Vec<String> {
        self.languages
            .keys()
            .map(|k| k.to_ascii_lowercase())
            .collect()
    }
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
