use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    build_request, load_settings, url_state, ArtifactResolver, HttpCountryLookup,
    HttpPackageRegistry, JsonFileStore, MemoryAddressBar, MissingClipboard, MissingRuntimeHost,
    MissingShareTarget, PlaygroundSettings, RuntimeBridge, Session, SessionController,
    SessionDependencies, SystemClock,
};
use serde_json::json;
use shared::catalog;
use tracing::info;
use tracing_subscriber::EnvFilter;
use url::Url;

#[derive(Parser, Debug)]
#[command(name = "playground", about = "Shareable links and payloads for the code playground")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the shareable URL for a program.
    Share {
        #[arg(long)]
        code: String,
        #[arg(long, default_value = "en")]
        src: String,
        #[arg(long)]
        tgt: Option<String>,
        #[arg(long, default_value = "http://localhost:8080/")]
        base: Url,
    },
    /// Apply a shareable URL to a fresh session and print it as JSON.
    Open {
        url: Url,
        #[arg(long)]
        locale: Option<String>,
        /// ISO country code to run the geolocation tier with.
        #[arg(long)]
        country: Option<String>,
    },
    /// Print the execution payload for a shareable URL.
    Payload {
        url: Url,
        #[arg(long)]
        artifact: Option<String>,
    },
    /// Resolve the runtime artifact URL through the persisted cache.
    Artifact,
    /// List the supported languages as JSON.
    Languages,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let args = Args::parse();
    let settings = load_settings();

    match args.command {
        Command::Share {
            code,
            src,
            tgt,
            base,
        } => {
            let source = catalog::require(&src)?;
            let target = match tgt {
                Some(tgt) => catalog::require(&tgt)?,
                None => catalog::default_target(),
            };
            println!(
                "{}",
                url_state::encode_parts(&base, &code, Some(source), Some(target))
            );
        }
        Command::Open {
            url,
            locale,
            country,
        } => {
            let controller = build_controller(&settings, url.clone())?;
            controller.load_external_state(url_state::decode(&url)).await;
            if let Some(locale) = locale {
                controller.apply_browser_locale(&locale).await;
            }
            if let Some(country) = country {
                controller.apply_geolocation(&country).await;
            }
            let session = controller.snapshot().await;
            let output = json!({
                "preset": session.preset_id(),
                "session": session,
                "resolution": controller.resolution().await,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Command::Payload { url, artifact } => {
            let decoded = url_state::decode(&url);
            let mut session = Session::default();
            if let Some(code) = decoded.code {
                session.source_code = code.clone();
                session.committed_code = code;
            }
            if let Some(source) = decoded.source {
                session.source_language = source;
            }
            if let Some(target) = decoded.target {
                session.target_language = target;
            }
            let request =
                build_request(&session, artifact.as_deref(), &settings.output_location_id)?;
            info!("payload: request={} target={}", request.id, request.target.id);
            println!("# {}", request.config_directive());
            println!("{}", request.script());
        }
        Command::Languages => {
            println!("{}", serde_json::to_string_pretty(catalog::all())?);
        }
        Command::Artifact => {
            let resolver = artifact_resolver(&settings)?;
            match resolver.resolve_artifact_url().await {
                Some(url) => println!("{url}"),
                None => println!("no artifact available; the runtime would start unpinned"),
            }
        }
    }

    Ok(())
}

fn artifact_resolver(settings: &PlaygroundSettings) -> Result<ArtifactResolver> {
    let store = JsonFileStore::open(&settings.cache_path)
        .with_context(|| format!("opening cache at {}", settings.cache_path.display()))?;
    Ok(ArtifactResolver::new(
        settings,
        Arc::new(HttpPackageRegistry::from_settings(settings)),
        Arc::new(store),
        Arc::new(SystemClock),
    ))
}

fn build_controller(settings: &PlaygroundSettings, url: Url) -> Result<Arc<SessionController>> {
    Ok(SessionController::new(SessionDependencies {
        artifacts: Arc::new(artifact_resolver(settings)?),
        bridge: Arc::new(RuntimeBridge::new(settings, Arc::new(MissingRuntimeHost))),
        countries: Arc::new(HttpCountryLookup::from_settings(settings)),
        address_bar: Arc::new(MemoryAddressBar::new(url)),
        clipboard: Arc::new(MissingClipboard),
        share: Arc::new(MissingShareTarget),
        settings: settings.clone(),
    }))
}
