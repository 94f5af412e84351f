//! Fakes shared by the unit tests.

use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
    time::Duration,
};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use shared::{
    catalog,
    domain::Language,
    protocol::{RegistryInfo, RegistryPackage, ReleaseFile},
};
use tokio::sync::watch;

use crate::{
    artifact::PackageRegistry,
    pipeline::{ExecutionRequest, RuntimeSink},
    resolver::CountryLanguageLookup,
    runtime_bridge::{RuntimeAsset, RuntimeHost},
    session::Clipboard,
    store::Clock,
};

/// Stand-in for the runtime's translation: tags text with the target code,
/// and strips a tag when translating back to the canonical language.
pub fn fake_translate(code: &str, target: &Language) -> String {
    let untagged = match code.strip_prefix('[').and_then(|rest| rest.split_once("] ")) {
        Some((tag, body)) if catalog::by_code2(tag).is_some() => body,
        _ => code,
    };
    if target.id == catalog::CANONICAL_LANGUAGE_ID {
        untagged.to_string()
    } else {
        format!("[{}] {untagged}", target.code2)
    }
}

pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap()),
        }
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

pub struct FakeRegistry {
    calls: AtomicUsize,
    package: Mutex<Option<RegistryPackage>>,
}

impl FakeRegistry {
    pub fn with_artifact(version: &str, url: &str) -> Self {
        let files = vec![
            ReleaseFile {
                filename: Some(format!("pkg-{version}.tar.gz")),
                url: Some("https://files.example/pkg.tar.gz".to_string()),
            },
            ReleaseFile {
                filename: Some(format!("pkg-{version}-py3-none-any.whl")),
                url: Some(url.to_string()),
            },
        ];
        let package = RegistryPackage {
            info: RegistryInfo {
                version: version.to_string(),
            },
            releases: HashMap::from([(version.to_string(), files)]),
        };
        Self {
            calls: AtomicUsize::new(0),
            package: Mutex::new(Some(package)),
        }
    }

    pub fn failing() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            package: Mutex::new(None),
        }
    }

    pub fn set_artifact(&self, version: &str, url: &str) {
        let replacement = Self::with_artifact(version, url);
        *self.package.lock().unwrap() = replacement.package.lock().unwrap().take();
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PackageRegistry for FakeRegistry {
    async fn latest_package(&self) -> Result<RegistryPackage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.package
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| anyhow!("registry unreachable"))
    }
}

/// Registry whose lookup never completes.
pub struct StalledRegistry;

#[async_trait]
impl PackageRegistry for StalledRegistry {
    async fn latest_package(&self) -> Result<RegistryPackage> {
        std::future::pending().await
    }
}

pub struct FakeRuntimeHost {
    present: Mutex<HashSet<RuntimeAsset>>,
    inserted: Mutex<Vec<RuntimeAsset>>,
    ready: watch::Sender<bool>,
    executed: Mutex<Vec<ExecutionRequest>>,
    execute_delay: Duration,
    fail_execute: bool,
}

impl FakeRuntimeHost {
    pub fn new() -> Self {
        let (ready, _) = watch::channel(false);
        Self {
            present: Mutex::new(HashSet::new()),
            inserted: Mutex::new(Vec::new()),
            ready,
            executed: Mutex::new(Vec::new()),
            execute_delay: Duration::ZERO,
            fail_execute: false,
        }
    }

    pub fn ready() -> Self {
        let host = Self::new();
        host.signal_ready();
        host
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.execute_delay = delay;
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail_execute = true;
        self
    }

    pub fn with_present(self, asset: RuntimeAsset) -> Self {
        self.present.lock().unwrap().insert(asset);
        self
    }

    pub fn signal_ready(&self) {
        self.ready.send_replace(true);
    }

    pub fn inserted(&self) -> Vec<RuntimeAsset> {
        self.inserted.lock().unwrap().clone()
    }

    pub fn executed(&self) -> Vec<ExecutionRequest> {
        self.executed.lock().unwrap().clone()
    }
}

#[async_trait]
impl RuntimeHost for FakeRuntimeHost {
    fn has_asset(&self, asset: &RuntimeAsset) -> bool {
        self.present.lock().unwrap().contains(asset)
    }

    fn insert_asset(&self, asset: &RuntimeAsset) -> Result<()> {
        self.present.lock().unwrap().insert(asset.clone());
        self.inserted.lock().unwrap().push(asset.clone());
        Ok(())
    }

    fn ready_signal(&self) -> watch::Receiver<bool> {
        self.ready.subscribe()
    }

    async fn execute(&self, request: &ExecutionRequest, sink: RuntimeSink) -> Result<()> {
        self.executed.lock().unwrap().push(request.clone());
        if !self.execute_delay.is_zero() {
            tokio::time::sleep(self.execute_delay).await;
        }
        if self.fail_execute {
            return Err(anyhow!("interpreter crashed"));
        }
        sink.display.show(format!("ran {}", request.code));
        sink.output.write(fake_translate(&request.code, request.target));
        Ok(())
    }
}

pub struct FakeCountries {
    codes: Option<Vec<String>>,
    calls: AtomicUsize,
}

impl FakeCountries {
    pub fn returning(codes: &[&str]) -> Self {
        Self {
            codes: Some(codes.iter().map(|c| c.to_string()).collect()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            codes: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CountryLanguageLookup for FakeCountries {
    async fn official_languages(&self, country: &str) -> Result<Vec<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.codes
            .clone()
            .ok_or_else(|| anyhow!("lookup failed for {country}"))
    }
}

pub struct RecordingClipboard {
    texts: Mutex<Vec<String>>,
    fail: bool,
}

impl RecordingClipboard {
    pub fn new() -> Self {
        Self {
            texts: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            texts: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn texts(&self) -> Vec<String> {
        self.texts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Clipboard for RecordingClipboard {
    async fn write_text(&self, text: &str) -> Result<()> {
        if self.fail {
            return Err(anyhow!("permission denied"));
        }
        self.texts.lock().unwrap().push(text.to_string());
        Ok(())
    }
}
