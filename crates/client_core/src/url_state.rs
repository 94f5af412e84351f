use std::sync::Mutex;

use anyhow::Result;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use shared::{catalog, domain::Language};
use url::Url;

use crate::session::Session;

pub const CODE_PARAM: &str = "code";
pub const SOURCE_PARAM: &str = "src";
pub const TARGET_PARAM: &str = "tgt";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedState {
    pub code: Option<String>,
    pub source: Option<&'static Language>,
    pub target: Option<&'static Language>,
}

impl DecodedState {
    pub fn is_empty(&self) -> bool {
        self.code.is_none() && self.source.is_none() && self.target.is_none()
    }
}

pub fn encode_code(text: &str) -> String {
    URL_SAFE_NO_PAD.encode(text.as_bytes())
}

/// Also accepts padding and the standard alphabet.
pub fn decode_code(raw: &str) -> Option<String> {
    let normalized: String = raw
        .trim()
        .trim_end_matches('=')
        .chars()
        .map(|c| match c {
            // form decoding turns a literal '+' into a space
            '+' | ' ' => '-',
            '/' => '_',
            c => c,
        })
        .collect();
    if normalized.is_empty() {
        return None;
    }
    let bytes = URL_SAFE_NO_PAD.decode(normalized).ok()?;
    String::from_utf8(bytes).ok()
}

pub fn encode_parts(
    base: &Url,
    code: &str,
    source: Option<&Language>,
    target: Option<&Language>,
) -> Url {
    let mut url = base.clone();
    let kept: Vec<(String, String)> = base
        .query_pairs()
        .filter(|(k, _)| !matches!(k.as_ref(), CODE_PARAM | SOURCE_PARAM | TARGET_PARAM))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let mut params = kept;
    if !code.is_empty() {
        params.push((CODE_PARAM.to_string(), encode_code(code)));
    }
    if let Some(source) = source.filter(|l| !l.code2.is_empty()) {
        params.push((SOURCE_PARAM.to_string(), source.code2.to_string()));
    }
    if let Some(target) = target.filter(|l| !l.code2.is_empty()) {
        params.push((TARGET_PARAM.to_string(), target.code2.to_string()));
    }

    if params.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(params);
    }
    url
}

pub fn encode(base: &Url, session: &Session) -> Url {
    encode_parts(
        base,
        &session.committed_code,
        Some(session.source_language),
        Some(session.target_language),
    )
}

pub fn decode(url: &Url) -> DecodedState {
    let mut decoded = DecodedState::default();
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            CODE_PARAM => decoded.code = decode_code(&value),
            SOURCE_PARAM => decoded.source = catalog::by_param(&value),
            TARGET_PARAM => decoded.target = catalog::by_param(&value),
            _ => {}
        }
    }
    decoded
}

/// `replace` never pushes a history entry.
pub trait AddressBar: Send + Sync {
    fn current(&self) -> Url;
    fn replace(&self, url: Url) -> Result<()>;
}

pub struct MemoryAddressBar {
    current: Mutex<Url>,
}

impl MemoryAddressBar {
    pub fn new(url: Url) -> Self {
        Self {
            current: Mutex::new(url),
        }
    }
}

impl AddressBar for MemoryAddressBar {
    fn current(&self) -> Url {
        self.current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn replace(&self, url: Url) -> Result<()> {
        *self
            .current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = url;
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/url_state_tests.rs"]
mod tests;
