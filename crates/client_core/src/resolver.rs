use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use shared::{catalog, domain::Language, protocol::CountryRecord};
use thiserror::Error;
use tracing::{debug, info};

use crate::settings::PlaygroundSettings;

const ENGLISH_CODE2: &str = "en";
const ENGLISH_CODE3: &str = "eng";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionTier {
    UrlParameter,
    ManualSelection,
    BrowserLocale,
    CountryDefault,
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub language: &'static Language,
    pub detected: bool,
    pub tier: ResolutionTier,
}

#[derive(Debug, Default)]
pub struct LanguageResolver {
    settled: Option<Resolution>,
}

impl LanguageResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_complete(&self) -> bool {
        self.settled.is_some()
    }

    pub fn resolution(&self) -> Option<Resolution> {
        self.settled
    }

    fn settle(
        &mut self,
        language: &'static Language,
        detected: bool,
        tier: ResolutionTier,
    ) -> Option<Resolution> {
        if let Some(existing) = self.settled {
            debug!(
                "resolver: ignoring {tier:?} ({}); already settled by {:?}",
                language.id, existing.tier
            );
            return None;
        }
        let resolution = Resolution {
            language,
            detected,
            tier,
        };
        info!(
            "resolver: target={} detected={detected} tier={tier:?}",
            language.id
        );
        self.settled = Some(resolution);
        Some(resolution)
    }

    pub fn from_url(&mut self, language: &'static Language) -> Option<Resolution> {
        self.settle(language, false, ResolutionTier::UrlParameter)
    }

    pub fn from_manual(&mut self, language: &'static Language) -> Option<Resolution> {
        self.settle(language, false, ResolutionTier::ManualSelection)
    }

    pub fn from_locale(&mut self, locale: &str) -> Option<Resolution> {
        if self.is_complete() {
            return None;
        }
        let language = locale_candidate(locale)?;
        self.settle(language, true, ResolutionTier::BrowserLocale)
    }

    /// `codes` is `None` when the country lookup failed.
    pub fn from_country_languages(&mut self, codes: Option<&[String]>) -> Option<Resolution> {
        if self.is_complete() {
            return None;
        }
        match codes.and_then(country_candidate) {
            Some(language) => self.settle(language, true, ResolutionTier::CountryDefault),
            None => self.settle(catalog::default_target(), false, ResolutionTier::Fallback),
        }
    }
}

/// Primary subtag of a BCP 47 style locale, lower-cased: `ur-PK` -> `ur`.
pub fn primary_subtag(locale: &str) -> String {
    locale
        .trim()
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase()
}

pub fn locale_candidate(locale: &str) -> Option<&'static Language> {
    let subtag = primary_subtag(locale);
    if subtag.is_empty() || subtag == ENGLISH_CODE2 {
        return None;
    }
    catalog::by_code2(&subtag)
}

pub fn country_candidate(codes: &[String]) -> Option<&'static Language> {
    codes
        .iter()
        .map(|code| code.trim().to_ascii_lowercase())
        .filter(|code| code != ENGLISH_CODE2 && code != ENGLISH_CODE3)
        .find_map(|code| catalog::by_code2(&code).or_else(|| catalog::by_code3(&code)))
}

#[derive(Debug, Error)]
pub enum CountryLookupError {
    #[error("country lookup request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("country lookup returned status {0}")]
    Status(u16),
    #[error("country lookup returned no records for {0}")]
    Empty(String),
}

#[async_trait]
pub trait CountryLanguageLookup: Send + Sync {
    async fn official_languages(&self, country: &str) -> Result<Vec<String>>;
}

pub struct HttpCountryLookup {
    http: Client,
    base_url: String,
}

impl HttpCountryLookup {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into(),
        }
    }

    pub fn from_settings(settings: &PlaygroundSettings) -> Self {
        Self::new(settings.country_lookup_base_url.clone())
    }

    async fn fetch(&self, country: &str) -> std::result::Result<Vec<String>, CountryLookupError> {
        let res = self
            .http
            .get(format!(
                "{}/{}",
                self.base_url.trim_end_matches('/'),
                country.trim().to_ascii_lowercase()
            ))
            .send()
            .await?;
        if !res.status().is_success() {
            return Err(CountryLookupError::Status(res.status().as_u16()));
        }
        let records: Vec<CountryRecord> = res.json().await?;
        records
            .first()
            .map(CountryRecord::language_codes)
            .ok_or_else(|| CountryLookupError::Empty(country.to_string()))
    }
}

#[async_trait]
impl CountryLanguageLookup for HttpCountryLookup {
    async fn official_languages(&self, country: &str) -> Result<Vec<String>> {
        Ok(self.fetch(country).await?)
    }
}

pub struct MissingCountryLookup;

#[async_trait]
impl CountryLanguageLookup for MissingCountryLookup {
    async fn official_languages(&self, country: &str) -> Result<Vec<String>> {
        Err(anyhow::anyhow!(
            "country lookup is unavailable for {country}"
        ))
    }
}

#[cfg(test)]
#[path = "tests/resolver_tests.rs"]
mod tests;
