use std::sync::{Arc, Weak};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::Serialize;
use shared::{catalog, domain::Language, error::CatalogError, presets};
use tokio::{
    sync::{broadcast, mpsc, Mutex},
    task::JoinHandle,
};
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

use crate::{
    artifact::ArtifactResolver,
    pipeline::{
        self, ExecutionRequest, OutputLocation, OutputSubscription, RequestInputs, RuntimeSink,
    },
    resolver::{CountryLanguageLookup, LanguageResolver, Resolution},
    runtime_bridge::{LoadState, RuntimeBridge},
    settings::PlaygroundSettings,
    url_state::{self, AddressBar, DecodedState},
};

const NBSP: char = '\u{a0}';

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub source_code: String,
    /// Debounced copy of `source_code`; the only code requests are built from.
    pub committed_code: String,
    pub translated_code: String,
    pub source_language: &'static Language,
    pub target_language: &'static Language,
    pub is_detected: bool,
    pub manual_target: bool,
    pub awaiting_commit: bool,
}

impl Default for Session {
    fn default() -> Self {
        let code = presets::initial().code.to_string();
        Self {
            source_code: code.clone(),
            committed_code: code,
            translated_code: String::new(),
            source_language: catalog::canonical(),
            target_language: catalog::default_target(),
            is_detected: false,
            manual_target: false,
            awaiting_commit: false,
        }
    }
}

impl Session {
    pub fn preset_id(&self) -> &'static str {
        presets::preset_for(&self.committed_code)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeSeverity {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub severity: NoticeSeverity,
    pub message: String,
}

impl Notice {
    fn new(severity: NoticeSeverity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum SessionEvent {
    SourceEdited,
    Committed(String),
    TranslatedChanged(String),
    LanguagesChanged {
        source: &'static Language,
        target: &'static Language,
        detected: bool,
    },
    TargetResolved(Resolution),
    Swapped,
    ExecutionSubmitted(Uuid),
    ArtifactResolved(Option<String>),
    RuntimeStateChanged(LoadState),
    UrlUpdated(Url),
    ShareFallback(Url),
    Notice(Notice),
}

#[async_trait]
pub trait Clipboard: Send + Sync {
    async fn write_text(&self, text: &str) -> Result<()>;
}

pub struct MissingClipboard;

#[async_trait]
impl Clipboard for MissingClipboard {
    async fn write_text(&self, _text: &str) -> Result<()> {
        Err(anyhow!("clipboard is unavailable"))
    }
}

#[async_trait]
pub trait ShareTarget: Send + Sync {
    fn can_share(&self, url: &Url) -> bool;
    async fn share(&self, url: &Url) -> Result<()>;
}

pub struct MissingShareTarget;

#[async_trait]
impl ShareTarget for MissingShareTarget {
    fn can_share(&self, _url: &Url) -> bool {
        false
    }

    async fn share(&self, _url: &Url) -> Result<()> {
        Err(anyhow!("native share is unavailable"))
    }
}

#[derive(Debug, Clone, Default)]
pub struct Startup {
    pub url: Option<Url>,
    pub locale: Option<String>,
}

pub struct SessionDependencies {
    pub settings: PlaygroundSettings,
    pub bridge: Arc<RuntimeBridge>,
    pub artifacts: Arc<ArtifactResolver>,
    pub countries: Arc<dyn CountryLanguageLookup>,
    pub address_bar: Arc<dyn AddressBar>,
    pub clipboard: Arc<dyn Clipboard>,
    pub share: Arc<dyn ShareTarget>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ArtifactState {
    Pending,
    Settled(Option<String>),
}

struct ActiveExecution {
    inputs: RequestInputs,
    location: OutputLocation,
    _subscription: OutputSubscription,
}

struct RuntimeOutput {
    generation: u64,
    text: String,
}

struct ControllerState {
    session: Session,
    resolver: LanguageResolver,
    external_loaded: bool,
    edit_generation: u64,
    edit_timer: Option<JoinHandle<()>>,
    url_timer: Option<JoinHandle<()>>,
    artifact: ArtifactState,
    request_generation: u64,
    active: Option<ActiveExecution>,
}

impl ControllerState {
    fn cancel_edit_timer(&mut self) {
        self.edit_generation += 1;
        if let Some(timer) = self.edit_timer.take() {
            timer.abort();
        }
        self.session.awaiting_commit = false;
    }
}

pub struct SessionController {
    settings: PlaygroundSettings,
    bridge: Arc<RuntimeBridge>,
    artifacts: Arc<ArtifactResolver>,
    countries: Arc<dyn CountryLanguageLookup>,
    address_bar: Arc<dyn AddressBar>,
    clipboard: Arc<dyn Clipboard>,
    share: Arc<dyn ShareTarget>,
    inner: Mutex<ControllerState>,
    events: broadcast::Sender<SessionEvent>,
    output_tx: mpsc::UnboundedSender<RuntimeOutput>,
}

impl SessionController {
    pub fn new(deps: SessionDependencies) -> Arc<Self> {
        let (events, _) = broadcast::channel(256);
        let (output_tx, output_rx) = mpsc::unbounded_channel();
        let controller = Arc::new(Self {
            settings: deps.settings,
            bridge: deps.bridge,
            artifacts: deps.artifacts,
            countries: deps.countries,
            address_bar: deps.address_bar,
            clipboard: deps.clipboard,
            share: deps.share,
            inner: Mutex::new(ControllerState {
                session: Session::default(),
                resolver: LanguageResolver::new(),
                external_loaded: false,
                edit_generation: 0,
                edit_timer: None,
                url_timer: None,
                artifact: ArtifactState::Pending,
                request_generation: 0,
                active: None,
            }),
            events,
            output_tx,
        });
        Self::spawn_output_pump(Arc::downgrade(&controller), output_rx);
        controller
    }

    fn spawn_output_pump(controller: Weak<Self>, mut rx: mpsc::UnboundedReceiver<RuntimeOutput>) {
        tokio::spawn(async move {
            while let Some(output) = rx.recv().await {
                let Some(controller) = controller.upgrade() else {
                    break;
                };
                controller
                    .apply_runtime_output(output.generation, output.text)
                    .await;
            }
        });
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn subscribe_display(&self) -> broadcast::Receiver<String> {
        self.bridge.display_sink().subscribe()
    }

    pub fn settings(&self) -> &PlaygroundSettings {
        &self.settings
    }

    pub fn load_state(&self) -> LoadState {
        self.bridge.load_state()
    }

    pub async fn snapshot(&self) -> Session {
        self.inner.lock().await.session.clone()
    }

    pub async fn resolution(&self) -> Option<Resolution> {
        self.inner.lock().await.resolver.resolution()
    }

    pub async fn output_text(&self) -> Option<String> {
        let guard = self.inner.lock().await;
        guard.active.as_ref().map(|active| active.location.read())
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }

    fn notify(&self, severity: NoticeSeverity, message: impl Into<String>) {
        self.emit(SessionEvent::Notice(Notice::new(severity, message)));
    }

    pub async fn start(self: &Arc<Self>, startup: Startup) {
        if let Some(url) = startup.url.as_ref() {
            self.load_external_state(url_state::decode(url)).await;
        }
        if let Some(locale) = startup.locale.as_deref() {
            self.apply_browser_locale(locale).await;
        }

        self.bridge.ensure_loaded();
        let mut states = self.bridge.subscribe_state();
        let controller = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                let state = *states.borrow_and_update();
                controller.emit(SessionEvent::RuntimeStateChanged(state));
                if matches!(state, LoadState::Ready | LoadState::Degraded) {
                    debug!("session: runtime bootstrap finished state={state:?}");
                    break;
                }
                if states.changed().await.is_err() {
                    break;
                }
            }
        });

        let controller = Arc::clone(self);
        tokio::spawn(async move {
            let artifact = controller.artifacts.resolve_artifact_url().await;
            controller.settle_artifact(artifact).await;
        });

        let mut guard = self.inner.lock().await;
        self.schedule_url_mirror(&mut guard);
    }

    pub async fn settle_artifact(&self, artifact: Option<String>) {
        let mut guard = self.inner.lock().await;
        guard.artifact = ArtifactState::Settled(artifact.clone());
        self.emit(SessionEvent::ArtifactResolved(artifact));
        self.refresh_execution(&mut guard);
    }

    pub async fn edit(self: &Arc<Self>, text: impl Into<String>) {
        let mut guard = self.inner.lock().await;
        guard.cancel_edit_timer();
        guard.session.source_code = text.into();
        guard.session.awaiting_commit = true;

        let generation = guard.edit_generation;
        let quiet = self.settings.edit_debounce();
        let controller = Arc::clone(self);
        guard.edit_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(quiet).await;
            controller.commit_edit(generation).await;
        }));
        self.emit(SessionEvent::SourceEdited);
    }

    async fn commit_edit(self: &Arc<Self>, generation: u64) {
        let mut guard = self.inner.lock().await;
        if guard.edit_generation != generation {
            return;
        }
        guard.edit_timer = None;
        guard.session.awaiting_commit = false;
        guard.session.committed_code = guard.session.source_code.clone();
        debug!(
            "session: committed {} bytes",
            guard.session.committed_code.len()
        );
        self.emit(SessionEvent::Committed(guard.session.committed_code.clone()));
        self.refresh_execution(&mut guard);
        self.schedule_url_mirror(&mut guard);
    }

    pub async fn change_source_language(self: &Arc<Self>, language: &'static Language) {
        let mut guard = self.inner.lock().await;
        if guard.session.source_language == language {
            return;
        }
        guard.session.source_language = language;
        guard.session.is_detected = false;
        self.languages_changed(&mut guard);
    }

    pub async fn change_target_language(self: &Arc<Self>, language: &'static Language) {
        let mut guard = self.inner.lock().await;
        guard.resolver.from_manual(language);
        guard.session.manual_target = true;
        guard.session.is_detected = false;
        guard.session.target_language = language;
        self.languages_changed(&mut guard);
    }

    fn languages_changed(self: &Arc<Self>, state: &mut ControllerState) {
        self.emit(SessionEvent::LanguagesChanged {
            source: state.session.source_language,
            target: state.session.target_language,
            detected: state.session.is_detected,
        });
        self.refresh_execution(state);
        self.schedule_url_mirror(state);
    }

    pub async fn swap(self: &Arc<Self>) {
        let mut guard = self.inner.lock().await;
        let output = guard
            .active
            .as_ref()
            .map(|active| active.location.read())
            .unwrap_or_default()
            .replace(NBSP, " ");
        let previous_source = guard.session.source_code.clone();
        let new_source = if output.is_empty() {
            previous_source.clone()
        } else {
            output
        };

        guard.cancel_edit_timer();
        let session = &mut guard.session;
        session.source_code = new_source.clone();
        session.committed_code = new_source;
        session.translated_code = previous_source;
        std::mem::swap(&mut session.source_language, &mut session.target_language);
        session.manual_target = true;
        session.is_detected = false;
        let new_target = session.target_language;
        guard.resolver.from_manual(new_target);

        info!(
            "session: swapped source={} target={}",
            guard.session.source_language.id, guard.session.target_language.id
        );
        self.emit(SessionEvent::Swapped);
        self.emit(SessionEvent::TranslatedChanged(
            guard.session.translated_code.clone(),
        ));
        self.languages_changed(&mut guard);
    }

    pub async fn runtime_output_changed(&self, text: String) {
        let mut guard = self.inner.lock().await;
        self.set_translated(&mut guard, text);
    }

    async fn apply_runtime_output(&self, generation: u64, text: String) {
        let mut guard = self.inner.lock().await;
        if guard.request_generation != generation {
            debug!("session: dropping output of superseded request generation={generation}");
            return;
        }
        self.set_translated(&mut guard, text);
    }

    fn set_translated(&self, state: &mut ControllerState, text: String) {
        if state.session.translated_code == text {
            return;
        }
        state.session.translated_code = text.clone();
        self.emit(SessionEvent::TranslatedChanged(text));
    }

    pub async fn load_external_state(self: &Arc<Self>, decoded: DecodedState) {
        let mut guard = self.inner.lock().await;
        if guard.external_loaded {
            warn!("session: external state already applied; ignoring");
            return;
        }
        guard.external_loaded = true;
        if decoded.is_empty() {
            return;
        }

        if let Some(code) = decoded.code {
            guard.cancel_edit_timer();
            guard.session.source_code = code.clone();
            guard.session.committed_code = code;
        }
        if let Some(source) = decoded.source {
            guard.session.source_language = source;
        }
        if let Some(target) = decoded.target {
            match guard.resolver.from_url(target) {
                Some(_) => {
                    guard.session.target_language = target;
                    guard.session.is_detected = false;
                }
                None => info!(
                    "session: url target {} ignored; target already chosen",
                    target.id
                ),
            }
        }
        info!("session: applied external state");
        self.languages_changed(&mut guard);
    }

    pub async fn apply_browser_locale(self: &Arc<Self>, locale: &str) {
        let mut guard = self.inner.lock().await;
        if let Some(resolution) = guard.resolver.from_locale(locale) {
            self.apply_resolution(&mut guard, resolution);
        }
    }

    pub async fn apply_geolocation(self: &Arc<Self>, country: &str) {
        if self.inner.lock().await.resolver.is_complete() {
            debug!("session: geolocation {country} arrived after resolution");
            return;
        }

        let codes = match self.countries.official_languages(country).await {
            Ok(codes) => Some(codes),
            Err(err) => {
                warn!("session: country lookup failed for {country}: {err:#}");
                None
            }
        };

        let mut guard = self.inner.lock().await;
        if let Some(resolution) = guard.resolver.from_country_languages(codes.as_deref()) {
            self.apply_resolution(&mut guard, resolution);
        }
    }

    fn apply_resolution(self: &Arc<Self>, state: &mut ControllerState, resolution: Resolution) {
        state.session.target_language = resolution.language;
        state.session.is_detected = resolution.detected;
        self.emit(SessionEvent::TargetResolved(resolution));
        self.languages_changed(state);
    }

    pub async fn load_preset(self: &Arc<Self>, id: &str) -> Result<(), CatalogError> {
        let preset = presets::by_id(id)?;
        let mut guard = self.inner.lock().await;
        guard.cancel_edit_timer();
        guard.session.source_code = preset.code.to_string();
        guard.session.committed_code = preset.code.to_string();
        self.emit(SessionEvent::Committed(preset.code.to_string()));
        self.refresh_execution(&mut guard);
        self.schedule_url_mirror(&mut guard);
        Ok(())
    }

    pub async fn copy_source(&self) {
        let text = self.inner.lock().await.session.source_code.clone();
        self.copy_with_notice(&text, "Original code copied to clipboard")
            .await;
    }

    pub async fn copy_translated(&self) {
        let text = self.inner.lock().await.session.translated_code.clone();
        self.copy_with_notice(&text, "Translated code copied to clipboard")
            .await;
    }

    pub async fn copy_share_url(&self, url: &Url) {
        self.copy_with_notice(url.as_str(), "Share URL copied to clipboard")
            .await;
    }

    async fn copy_with_notice(&self, text: &str, success: &str) {
        match self.clipboard.write_text(text).await {
            Ok(()) => self.notify(NoticeSeverity::Success, success),
            Err(err) => {
                warn!("session: clipboard write failed: {err:#}");
                self.notify(NoticeSeverity::Error, "Copy failed; please select and copy");
            }
        }
    }

    pub async fn share(&self) -> Url {
        let url = self.address_bar.current();
        if self.share.can_share(&url) {
            match self.share.share(&url).await {
                Ok(()) => return url,
                Err(err) => warn!("session: native share failed: {err:#}"),
            }
        }
        self.emit(SessionEvent::ShareFallback(url.clone()));
        url
    }

    pub fn attempt_edit_translated(&self) {
        self.notify(
            NoticeSeverity::Info,
            "This panel is read-only. Edit on the left, or swap languages to edit the translation.",
        );
    }

    fn refresh_execution(&self, state: &mut ControllerState) {
        let ArtifactState::Settled(artifact) = &state.artifact else {
            debug!("session: artifact unresolved; deferring execution");
            return;
        };
        let artifact = artifact.clone();

        let inputs = RequestInputs::of(&state.session, artifact.as_deref());
        if state
            .active
            .as_ref()
            .is_some_and(|active| active.inputs == inputs)
        {
            return;
        }

        let request = match pipeline::build_request(
            &state.session,
            artifact.as_deref(),
            &self.settings.output_location_id,
        ) {
            Ok(request) => request,
            Err(err) => {
                warn!("session: failed to build request: {err}");
                self.notify(NoticeSeverity::Error, "Could not prepare code for execution");
                return;
            }
        };

        state.request_generation += 1;
        let generation = state.request_generation;
        // Tear down the superseded observer before a new one attaches.
        state.active = None;

        let location = OutputLocation::new(&self.settings.output_location_id, generation);
        let output_tx = self.output_tx.clone();
        let subscription = pipeline::observe(&location, move |text| {
            let _ = output_tx.send(RuntimeOutput { generation, text });
        });

        self.submit(request, &location);
        state.active = Some(ActiveExecution {
            inputs,
            location,
            _subscription: subscription,
        });
    }

    fn submit(&self, request: ExecutionRequest, location: &OutputLocation) {
        let id = request.id;
        info!(
            "pipeline: submitting request={id} source={} target={} generation={}",
            request.source.id,
            request.target.id,
            location.generation()
        );
        self.bridge.submit(
            request,
            RuntimeSink {
                output: location.clone(),
                display: self.bridge.display_sink(),
            },
        );
        self.emit(SessionEvent::ExecutionSubmitted(id));
    }

    fn schedule_url_mirror(self: &Arc<Self>, state: &mut ControllerState) {
        if let Some(timer) = state.url_timer.take() {
            timer.abort();
        }
        let quiet = self.settings.url_debounce();
        let controller = Arc::clone(self);
        state.url_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(quiet).await;
            controller.mirror_url().await;
        }));
    }

    async fn mirror_url(&self) {
        let session = {
            let mut guard = self.inner.lock().await;
            guard.url_timer = None;
            guard.session.clone()
        };
        let current = self.address_bar.current();
        let next = url_state::encode(&current, &session);
        if next == current {
            return;
        }
        match self.address_bar.replace(next.clone()) {
            Ok(()) => {
                debug!("url: replaced address with {next}");
                self.emit(SessionEvent::UrlUpdated(next));
            }
            Err(err) => {
                warn!("url: failed to update address: {err:#}");
                self.notify(NoticeSeverity::Error, "Could not update the shareable link");
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
