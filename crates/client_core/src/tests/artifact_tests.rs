use super::*;
use crate::{
    store::MemoryStore,
    test_support::{FakeRegistry, ManualClock, StalledRegistry},
};
use axum::{http::StatusCode, routing::get, Json, Router};
use tokio::net::TcpListener;

const FIRST_URL: &str = "https://files.example/universalpython-1.0-py3-none-any.whl";
const SECOND_URL: &str = "https://files.example/universalpython-2.0-py3-none-any.whl";

fn resolver(
    registry: &Arc<FakeRegistry>,
    store: &Arc<MemoryStore>,
    clock: &Arc<ManualClock>,
) -> ArtifactResolver {
    ArtifactResolver::new(
        &PlaygroundSettings::default(),
        registry.clone(),
        store.clone(),
        clock.clone(),
    )
}

#[tokio::test]
async fn cached_artifact_is_reused_inside_freshness_window() {
    let registry = Arc::new(FakeRegistry::with_artifact("1.0", FIRST_URL));
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new());
    let resolver = resolver(&registry, &store, &clock);

    assert_eq!(resolver.resolve_artifact_url().await.as_deref(), Some(FIRST_URL));
    assert_eq!(registry.calls(), 1);

    clock.advance(chrono::Duration::hours(1));
    registry.set_artifact("2.0", SECOND_URL);
    assert_eq!(resolver.resolve_artifact_url().await.as_deref(), Some(FIRST_URL));
    assert_eq!(registry.calls(), 1);

    clock.advance(chrono::Duration::hours(24));
    assert_eq!(resolver.resolve_artifact_url().await.as_deref(), Some(SECOND_URL));
    assert_eq!(registry.calls(), 2);
}

#[tokio::test]
async fn cache_is_shared_through_the_store() {
    let registry = Arc::new(FakeRegistry::with_artifact("1.0", FIRST_URL));
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new());

    resolver(&registry, &store, &clock).resolve_artifact_url().await;
    let after_reload = resolver(&registry, &store, &clock);
    assert_eq!(
        after_reload.resolve_artifact_url().await.as_deref(),
        Some(FIRST_URL)
    );
    assert_eq!(registry.calls(), 1);
}

#[tokio::test]
async fn registry_failure_yields_no_artifact_and_caches_nothing() {
    let registry = Arc::new(FakeRegistry::failing());
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new());
    let resolver = resolver(&registry, &store, &clock);

    assert_eq!(resolver.resolve_artifact_url().await, None);
    assert_eq!(
        store.get("universalpython_latest_wheel").expect("get"),
        None
    );

    registry.set_artifact("1.0", FIRST_URL);
    assert_eq!(resolver.resolve_artifact_url().await.as_deref(), Some(FIRST_URL));
    assert_eq!(registry.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn stalled_registry_times_out_to_no_artifact() {
    let settings = PlaygroundSettings::default();
    let store = Arc::new(MemoryStore::new());
    let resolver = ArtifactResolver::new(
        &settings,
        Arc::new(StalledRegistry),
        store.clone(),
        Arc::new(ManualClock::new()),
    );

    let started = tokio::time::Instant::now();
    assert_eq!(resolver.resolve_artifact_url().await, None);
    assert!(started.elapsed() >= settings.registry_timeout());
    assert!(started.elapsed() < settings.registry_timeout() + Duration::from_secs(1));
    assert_eq!(
        store.get("universalpython_latest_wheel").expect("get"),
        None
    );
}

#[tokio::test]
async fn unparsable_cache_timestamp_forces_lookup() {
    let registry = Arc::new(FakeRegistry::with_artifact("1.0", FIRST_URL));
    let store = Arc::new(MemoryStore::new());
    store
        .set("universalpython_latest_wheel", "https://stale.example/x.whl")
        .expect("seed url");
    store
        .set("universalpython_latest_wheel_ts", "yesterday")
        .expect("seed ts");
    let clock = Arc::new(ManualClock::new());

    let resolved = resolver(&registry, &store, &clock).resolve_artifact_url().await;
    assert_eq!(resolved.as_deref(), Some(FIRST_URL));
    assert_eq!(registry.calls(), 1);
}

async fn spawn_registry_server(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn http_registry_reads_package_json() {
    let app = Router::new().route(
        "/universalpython/json",
        get(|| async {
            Json(serde_json::json!({
                "info": { "version": "0.3.1" },
                "releases": {
                    "0.3.1": [
                        { "filename": "universalpython-0.3.1.tar.gz", "url": "https://files.example/sdist.tar.gz" },
                        { "filename": "universalpython-0.3.1-py3-none-any.whl", "url": "https://files.example/wheel.whl" }
                    ]
                }
            }))
        }),
    );
    let base = spawn_registry_server(app).await;

    let registry = HttpPackageRegistry::new(format!("{base}/universalpython/json"));
    let package = registry.latest_package().await.expect("package");
    assert_eq!(
        package.latest_artifact_url(),
        Some("https://files.example/wheel.whl")
    );
}

#[tokio::test]
async fn http_registry_reports_error_status() {
    let app = Router::new().route(
        "/universalpython/json",
        get(|| async { StatusCode::SERVICE_UNAVAILABLE }),
    );
    let base = spawn_registry_server(app).await;

    let registry = HttpPackageRegistry::new(format!("{base}/universalpython/json"));
    let err = registry.latest_package().await.expect_err("status error");
    assert!(err.to_string().contains("503"));
}
