use std::{sync::Arc, time::Duration};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use shared::protocol::RegistryPackage;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    settings::PlaygroundSettings,
    store::{Clock, KeyValueStore},
};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("registry request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("registry returned status {0}")]
    Status(u16),
}

#[async_trait]
pub trait PackageRegistry: Send + Sync {
    async fn latest_package(&self) -> Result<RegistryPackage>;
}

pub struct HttpPackageRegistry {
    http: Client,
    json_url: String,
}

impl HttpPackageRegistry {
    pub fn new(json_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            json_url: json_url.into(),
        }
    }

    pub fn from_settings(settings: &PlaygroundSettings) -> Self {
        Self::new(settings.registry_json_url())
    }

    async fn fetch(&self) -> std::result::Result<RegistryPackage, RegistryError> {
        let res = self
            .http
            .get(&self.json_url)
            .header(reqwest::header::CACHE_CONTROL, "no-cache")
            .send()
            .await?;
        if !res.status().is_success() {
            return Err(RegistryError::Status(res.status().as_u16()));
        }
        Ok(res.json().await?)
    }
}

#[async_trait]
impl PackageRegistry for HttpPackageRegistry {
    async fn latest_package(&self) -> Result<RegistryPackage> {
        Ok(self.fetch().await?)
    }
}

pub struct ArtifactResolver {
    registry: Arc<dyn PackageRegistry>,
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    freshness: chrono::Duration,
    lookup_timeout: Duration,
    url_key: String,
    timestamp_key: String,
}

impl ArtifactResolver {
    pub fn new(
        settings: &PlaygroundSettings,
        registry: Arc<dyn PackageRegistry>,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let project = &settings.registry_project;
        Self {
            registry,
            store,
            clock,
            freshness: settings.artifact_freshness(),
            lookup_timeout: settings.registry_timeout(),
            url_key: format!("{project}_latest_wheel"),
            timestamp_key: format!("{project}_latest_wheel_ts"),
        }
    }

    pub async fn resolve_artifact_url(&self) -> Option<String> {
        if let Some(cached) = self.cached_url() {
            debug!("artifact: cache hit url={cached}");
            return Some(cached);
        }

        let lookup = tokio::time::timeout(self.lookup_timeout, self.registry.latest_package());
        let package = match lookup.await {
            Ok(Ok(package)) => package,
            Ok(Err(err)) => {
                warn!("artifact: registry lookup failed: {err:#}");
                return None;
            }
            Err(_) => {
                warn!(
                    "artifact: registry lookup timed out after {}s",
                    self.lookup_timeout.as_secs()
                );
                return None;
            }
        };

        let Some(url) = package.latest_artifact_url().map(str::to_string) else {
            warn!(
                "artifact: registry lists no usable asset for version {}",
                package.info.version
            );
            return None;
        };

        self.persist(&url);
        info!(
            "artifact: resolved version={} url={url}",
            package.info.version
        );
        Some(url)
    }

    fn cached_url(&self) -> Option<String> {
        let url = self.store.get(&self.url_key).ok().flatten()?;
        let fetched_ms = self
            .store
            .get(&self.timestamp_key)
            .ok()
            .flatten()?
            .parse::<i64>()
            .ok()?;
        let fetched_at = DateTime::<Utc>::from_timestamp_millis(fetched_ms)?;
        (self.clock.now() - fetched_at < self.freshness && !url.is_empty()).then_some(url)
    }

    fn persist(&self, url: &str) {
        let now_ms = self.clock.now().timestamp_millis().to_string();
        let stored = self
            .store
            .set(&self.url_key, url)
            .and_then(|_| self.store.set(&self.timestamp_key, &now_ms));
        if let Err(err) = stored {
            warn!("artifact: failed to persist cache entry: {err}");
        }
    }
}

#[cfg(test)]
#[path = "tests/artifact_tests.rs"]
mod tests;
