use super::*;
use std::time::{SystemTime, UNIX_EPOCH};

#[test]
fn defaults_carry_playground_constants() {
    let settings = PlaygroundSettings::default();
    assert_eq!(settings.edit_debounce(), Duration::from_millis(400));
    assert_eq!(settings.url_debounce(), Duration::from_millis(600));
    assert_eq!(settings.runtime_ready_timeout(), Duration::from_secs(20));
    assert_eq!(settings.artifact_freshness(), chrono::Duration::hours(24));
    assert_eq!(
        settings.registry_json_url(),
        "https://pypi.org/pypi/universalpython/json"
    );
}

#[test]
fn toml_file_overrides_only_named_fields() {
    let settings = PlaygroundSettings::from_toml_str(
        "edit_debounce_ms = 250\nregistry_base_url = \"http://localhost:9000/pypi/\"\n",
    )
    .expect("parse");
    assert_eq!(settings.edit_debounce_ms, 250);
    assert_eq!(settings.url_debounce_ms, 600);
    assert_eq!(
        settings.registry_json_url(),
        "http://localhost:9000/pypi/universalpython/json"
    );
}

#[test]
fn env_overrides_skip_unparsable_values() {
    let mut settings = PlaygroundSettings::default();
    let overrides = HashMap::from([
        ("URL_DEBOUNCE_MS".to_string(), "900".to_string()),
        ("EDIT_DEBOUNCE_MS".to_string(), "soon".to_string()),
        ("REGISTRY_PROJECT".to_string(), "otherpkg".to_string()),
        ("UNRELATED".to_string(), "1".to_string()),
    ]);
    settings.apply_overrides(&overrides);
    assert_eq!(settings.url_debounce_ms, 900);
    assert_eq!(settings.edit_debounce_ms, 400);
    assert_eq!(settings.registry_project, "otherpkg");
}

#[test]
fn missing_settings_file_is_not_an_error() {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let path = std::env::temp_dir().join(format!("playground_missing_{suffix}.toml"));
    assert!(read_settings_file(&path).expect("read").is_none());
}

#[test]
fn malformed_settings_file_reports_parse_error() {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let path = std::env::temp_dir().join(format!("playground_bad_{suffix}.toml"));
    fs::write(&path, "edit_debounce_ms = \"fast\"").expect("write");
    let err = read_settings_file(&path).expect_err("parse error");
    assert!(matches!(err, SettingsError::Parse { .. }));
    fs::remove_file(path).expect("cleanup");
}
