pub mod artifact;
pub mod pipeline;
pub mod resolver;
pub mod runtime_bridge;
pub mod session;
pub mod settings;
pub mod store;
pub mod url_state;

pub use artifact::{ArtifactResolver, HttpPackageRegistry, PackageRegistry, RegistryError};
pub use pipeline::{
    build_request, observe, quote_literal, unquote_literal, DisplaySink, ExecutionRequest,
    LiteralError, OutputLocation, OutputSubscription, RequestInputs, RuntimeSink,
};
pub use resolver::{
    CountryLanguageLookup, CountryLookupError, HttpCountryLookup, LanguageResolver,
    MissingCountryLookup, Resolution, ResolutionTier,
};
pub use runtime_bridge::{
    LoadOutcome, LoadState, MissingRuntimeHost, RuntimeAsset, RuntimeBridge, RuntimeHandle,
    RuntimeHost,
};
pub use session::{
    Clipboard, MissingClipboard, MissingShareTarget, Notice, NoticeSeverity, Session,
    SessionController, SessionDependencies, SessionEvent, ShareTarget, Startup,
};
pub use settings::{load_settings, PlaygroundSettings, SettingsError};
pub use store::{Clock, JsonFileStore, KeyValueStore, MemoryStore, StoreError, SystemClock};
pub use url_state::{AddressBar, DecodedState, MemoryAddressBar};

#[cfg(test)]
#[path = "tests/support.rs"]
pub(crate) mod test_support;
