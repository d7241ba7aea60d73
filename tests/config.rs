use std::io::Write;

use assert_matches::assert_matches;

use railyard_browser::config::{Config, ConfigLoader, SourceOverride};
use railyard_browser::domain::{PageSize, RegistryKind};
use railyard_browser::error::RailyardError;

#[test]
fn defaults_point_at_the_public_registry() {
    let resolved = ConfigLoader::resolve_config(Config::default());
    assert_eq!(resolved.schema_version, 1);
    assert_eq!(resolved.concurrency, 16);
    assert_eq!(resolved.max_retries, 0);
    assert_eq!(resolved.page_size, PageSize::Medium);
    assert_eq!(
        resolved.source(RegistryKind::Maps).index_url,
        "https://raw.githubusercontent.com/Subway-Builder-Modded/The-Railyard/main/maps/index.json"
    );
    assert_eq!(
        resolved.source(RegistryKind::Mods).manifest_url("signals"),
        "https://raw.githubusercontent.com/Subway-Builder-Modded/The-Railyard/main/mods/signals/manifest.json"
    );
    assert_eq!(
        resolved.maps.cdn_base,
        "https://cdn.jsdelivr.net/gh/Subway-Builder-Modded/The-Railyard@main"
    );
}

#[test]
fn overrides_apply_per_kind() {
    let config = Config {
        branch: Some("staging".to_string()),
        mods: Some(SourceOverride {
            index_url: Some("http://localhost:8080/mods.json".to_string()),
            item_base_url: Some("http://localhost:8080/mods/".to_string()),
        }),
        concurrency: Some(0),
        ..Config::default()
    };
    let resolved = ConfigLoader::resolve_config(config);

    assert!(resolved.maps.index_url.contains("/staging/maps/index.json"));
    assert_eq!(resolved.mods.index_url, "http://localhost:8080/mods.json");
    assert_eq!(
        resolved.mods.manifest_url("a"),
        "http://localhost:8080/mods/a/manifest.json"
    );
    assert_eq!(resolved.concurrency, 1);
}

#[test]
fn reads_config_file_with_camel_case_keys() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{
            "repository": "someone/fork",
            "pageSize": 54,
            "maxRetries": 2,
            "placeholders": {{ "unknownAuthor": "Anonymous" }}
        }}"#
    )
    .unwrap();

    let resolved = ConfigLoader::resolve(file.path().to_str()).unwrap();
    assert_eq!(resolved.page_size, PageSize::Large);
    assert_eq!(resolved.max_retries, 2);
    assert_eq!(resolved.placeholders.unknown_author, "Anonymous");
    assert_eq!(resolved.placeholders.no_description, "No description provided.");
    assert!(resolved.maps.origin_base.ends_with("/someone/fork/main"));
}

#[test]
fn explicit_missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nope.json");
    let err = ConfigLoader::resolve(path.to_str()).unwrap_err();
    assert_matches!(err, RailyardError::ConfigRead(_));
}

#[test]
fn invalid_page_size_is_rejected() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{ "page_size": 10 }}"#).unwrap();
    let err = ConfigLoader::resolve(file.path().to_str()).unwrap_err();
    assert_matches!(err, RailyardError::ConfigParse(_));
}
