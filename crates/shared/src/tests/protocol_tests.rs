use super::*;

fn package(files: serde_json::Value) -> RegistryPackage {
    serde_json::from_value(serde_json::json!({
        "info": { "version": "1.2.0" },
        "releases": { "1.2.0": files, "1.1.0": [{ "filename": "old.whl", "url": "https://x/old.whl" }] }
    }))
    .expect("package json")
}

#[test]
fn prefers_binary_distribution() {
    let pkg = package(serde_json::json!([
        { "filename": "pkg-1.2.0.tar.gz", "url": "https://x/pkg.tar.gz" },
        { "filename": "pkg-1.2.0-py3-none-any.whl", "url": "https://x/pkg.whl" }
    ]));
    assert_eq!(pkg.latest_artifact_url(), Some("https://x/pkg.whl"));
}

#[test]
fn falls_back_to_first_asset() {
    let pkg = package(serde_json::json!([
        { "filename": "pkg-1.2.0.tar.gz", "url": "https://x/pkg.tar.gz" }
    ]));
    assert_eq!(pkg.latest_artifact_url(), Some("https://x/pkg.tar.gz"));
}

#[test]
fn missing_release_yields_none() {
    let pkg: RegistryPackage = serde_json::from_value(serde_json::json!({
        "info": { "version": "9.9.9" },
        "releases": {}
    }))
    .expect("package json");
    assert_eq!(pkg.latest_artifact_url(), None);
}

#[test]
fn country_codes_keep_response_order() {
    let record: CountryRecord =
        serde_json::from_str(r#"{ "languages": { "URD": "Urdu", "hin": "Hindi", "eng": "English" } }"#)
            .expect("country json");
    assert_eq!(record.language_codes(), vec!["urd", "hin", "eng"]);
}
