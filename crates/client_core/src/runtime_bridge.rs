use std::{
    future::Future,
    pin::Pin,
    sync::{Arc, Mutex},
    task::{Context, Poll},
    time::Duration,
};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use futures::{
    future::{BoxFuture, Shared},
    FutureExt,
};
use serde::Serialize;
use tokio::{sync::watch, task::JoinHandle};
use tracing::{debug, info, warn};

use crate::{
    pipeline::{DisplaySink, ExecutionRequest, RuntimeSink},
    settings::PlaygroundSettings,
};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RuntimeAsset {
    Stylesheet(String),
    ModuleScript(String),
}

impl RuntimeAsset {
    pub fn url(&self) -> &str {
        match self {
            RuntimeAsset::Stylesheet(url) | RuntimeAsset::ModuleScript(url) => url,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadState {
    Unstarted,
    Loading,
    Ready,
    Degraded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Ready,
    Degraded,
}

impl From<LoadOutcome> for LoadState {
    fn from(value: LoadOutcome) -> Self {
        match value {
            LoadOutcome::Ready => LoadState::Ready,
            LoadOutcome::Degraded => LoadState::Degraded,
        }
    }
}

#[async_trait]
pub trait RuntimeHost: Send + Sync {
    fn has_asset(&self, asset: &RuntimeAsset) -> bool;
    fn insert_asset(&self, asset: &RuntimeAsset) -> Result<()>;
    /// Becomes `true` once the runtime announces it is ready.
    fn ready_signal(&self) -> watch::Receiver<bool>;
    async fn execute(&self, request: &ExecutionRequest, sink: RuntimeSink) -> Result<()>;
}

pub struct MissingRuntimeHost;

#[async_trait]
impl RuntimeHost for MissingRuntimeHost {
    fn has_asset(&self, _asset: &RuntimeAsset) -> bool {
        false
    }

    fn insert_asset(&self, asset: &RuntimeAsset) -> Result<()> {
        Err(anyhow!("no document available to insert {}", asset.url()))
    }

    fn ready_signal(&self) -> watch::Receiver<bool> {
        let (_, rx) = watch::channel(false);
        rx
    }

    async fn execute(&self, _request: &ExecutionRequest, _sink: RuntimeSink) -> Result<()> {
        Err(anyhow!("runtime host is unavailable"))
    }
}

#[derive(Clone)]
pub struct RuntimeHandle {
    inner: Shared<BoxFuture<'static, LoadOutcome>>,
}

impl RuntimeHandle {
    pub fn ptr_eq(&self, other: &RuntimeHandle) -> bool {
        self.inner.ptr_eq(&other.inner)
    }

    pub fn peek(&self) -> Option<LoadOutcome> {
        self.inner.peek().copied()
    }
}

impl Future for RuntimeHandle {
    type Output = LoadOutcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.inner).poll(cx)
    }
}

pub struct RuntimeBridge {
    host: Arc<dyn RuntimeHost>,
    stylesheet: RuntimeAsset,
    script: RuntimeAsset,
    ready_timeout: Duration,
    handle: Mutex<Option<RuntimeHandle>>,
    state: Arc<watch::Sender<LoadState>>,
    display: DisplaySink,
}

impl RuntimeBridge {
    pub fn new(settings: &PlaygroundSettings, host: Arc<dyn RuntimeHost>) -> Self {
        let (state, _) = watch::channel(LoadState::Unstarted);
        Self {
            host,
            stylesheet: RuntimeAsset::Stylesheet(settings.runtime_stylesheet_url.clone()),
            script: RuntimeAsset::ModuleScript(settings.runtime_script_url.clone()),
            ready_timeout: settings.runtime_ready_timeout(),
            handle: Mutex::new(None),
            state: Arc::new(state),
            display: DisplaySink::new(&settings.display_sink_id),
        }
    }

    pub fn load_state(&self) -> LoadState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<LoadState> {
        self.state.subscribe()
    }

    pub fn display_sink(&self) -> DisplaySink {
        self.display.clone()
    }

    pub fn ensure_loaded(&self) -> RuntimeHandle {
        let mut slot = self.handle.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(handle) = slot.as_ref() {
            return handle.clone();
        }

        info!("runtime: bootstrap started");
        self.state.send_replace(LoadState::Loading);

        let mut insert_failed = false;
        for asset in [&self.stylesheet, &self.script] {
            if let Err(err) = self.insert_once(asset) {
                warn!("runtime: failed to insert {}: {err:#}", asset.url());
                insert_failed = true;
            }
        }

        let mut ready = self.host.ready_signal();
        let ready_timeout = self.ready_timeout;
        let state = Arc::clone(&self.state);

        let bootstrap = async move {
            let outcome = if insert_failed {
                LoadOutcome::Degraded
            } else {
                let signalled = tokio::time::timeout(ready_timeout, ready.wait_for(|r| *r))
                    .await
                    .map(|res| res.is_ok());
                match signalled {
                    Ok(true) => LoadOutcome::Ready,
                    Ok(false) => {
                        warn!("runtime: ready signal closed before firing; continuing degraded");
                        LoadOutcome::Degraded
                    }
                    Err(_) => {
                        warn!(
                            "runtime: no ready signal after {}s; continuing degraded",
                            ready_timeout.as_secs()
                        );
                        LoadOutcome::Degraded
                    }
                }
            };
            info!("runtime: bootstrap finished outcome={outcome:?}");
            state.send_replace(outcome.into());
            outcome
        }
        .boxed()
        .shared();

        // Drive the attempt even if no caller awaits it, so the timeout runs
        // from the moment loading starts.
        tokio::spawn(bootstrap.clone());

        let handle = RuntimeHandle { inner: bootstrap };
        *slot = Some(handle.clone());
        handle
    }

    fn insert_once(&self, asset: &RuntimeAsset) -> Result<()> {
        if self.host.has_asset(asset) {
            debug!("runtime: asset already present url={}", asset.url());
            return Ok(());
        }
        self.host.insert_asset(asset)
    }

    /// Failures go to the display sink, never to the caller.
    pub fn submit(&self, request: ExecutionRequest, sink: RuntimeSink) -> JoinHandle<()> {
        let handle = self.ensure_loaded();
        let host = Arc::clone(&self.host);
        tokio::spawn(async move {
            let outcome = handle.await;
            debug!(
                "runtime: executing request={} outcome={outcome:?} location={}",
                request.id,
                sink.output.id()
            );
            if let Err(err) = host.execute(&request, sink.clone()).await {
                warn!("runtime: execution failed request={}: {err:#}", request.id);
                sink.display.show(format!("[Runtime Error] {err}"));
            }
        })
    }
}

#[cfg(test)]
#[path = "tests/runtime_bridge_tests.rs"]
mod tests;
