use serde_json::{Value, json};

use railyard_browser::config::ResolvedConfig;
use railyard_browser::domain::RegistryKind;
use railyard_browser::flatten::FieldRow;
use railyard_browser::manifest::{CanonicalItem, Field, ItemContext, resolve};

fn fixture(name: &str) -> Value {
    let raw = match name {
        "map" => include_str!("fixtures/map_manifest.json"),
        _ => include_str!("fixtures/mod_manifest.json"),
    };
    serde_json::from_str(raw).unwrap()
}

fn context(kind: RegistryKind) -> ItemContext {
    let config = ResolvedConfig::default();
    ItemContext::new(config.source(kind), config.placeholders.clone())
}

#[test]
fn map_manifest_with_alternate_field_names() {
    let manifest = fixture("map");
    let item = CanonicalItem::from_manifest("new-york", &manifest, &context(RegistryKind::Maps))
        .unwrap();

    assert_eq!(item.id, "new-york");
    assert_eq!(item.title, "New York City");
    assert_eq!(item.description, "Five boroughs, one subway.");
    assert_eq!(item.author, "transit-fan");
    assert_eq!(item.tags, vec!["north-america", "coastal"]);
    assert_eq!(item.population, Some(8_336_817.0));
    assert_eq!(
        item.download_url.as_deref(),
        Some("https://github.com/transit-fan/nyc-map/releases/download/v2/new-york.zip")
    );

    assert_eq!(item.images.len(), 2);
    assert_eq!(
        item.images[0],
        vec![
            "https://raw.githubusercontent.com/Subway-Builder-Modded/The-Railyard/main/maps/new-york/gallery/skyline.png",
            "https://cdn.jsdelivr.net/gh/Subway-Builder-Modded/The-Railyard@main/maps/new-york/gallery/skyline.png",
        ]
    );
    assert_eq!(
        item.images[1],
        vec![
            "https://github.com/transit-fan/nyc-map/blob/main/screens/lines.png",
            "https://raw.githubusercontent.com/transit-fan/nyc-map/main/screens/lines.png",
            "https://cdn.jsdelivr.net/gh/transit-fan/nyc-map@main/screens/lines.png",
        ]
    );
}

#[test]
fn every_manifest_field_is_kept_in_order() {
    let manifest = fixture("map");
    let item = CanonicalItem::from_manifest("new-york", &manifest, &context(RegistryKind::Maps))
        .unwrap();

    let keys: Vec<&str> = item.fields.iter().map(|row| row.key.as_str()).collect();
    assert_eq!(
        keys,
        vec![
            "id",
            "displayName",
            "summary",
            "creator",
            "categories",
            "cityPopulation",
            "gallery",
            "download_url",
            "details.bounds.north",
            "details.bounds.south",
            "details.stations",
        ]
    );
    assert!(item.fields.contains(&FieldRow::new(
        "categories",
        r#"["north-america","coastal"]"#
    )));
    assert!(item.fields.contains(&FieldRow::new("details.stations", "472")));
}

#[test]
fn mod_manifest_falls_back_to_placeholders() {
    let manifest = fixture("mod");
    let item = CanonicalItem::from_manifest("signals", &manifest, &context(RegistryKind::Mods))
        .unwrap();

    assert_eq!(item.title, "Better Signals");
    assert_eq!(item.description, "No description provided.");
    assert_eq!(item.author, "Unknown");
    assert_eq!(item.tags, vec!["signals", "quality-of-life"]);
    assert_eq!(item.population, None);
    assert_eq!(item.download_url, None);
    assert_eq!(
        item.images,
        vec![vec![
            "https://raw.githubusercontent.com/someone/signals/main/preview.png".to_string(),
            "https://cdn.jsdelivr.net/gh/someone/signals@main/preview.png".to_string(),
        ]]
    );
}

#[test]
fn first_present_alias_wins() {
    let manifest = json!({ "title": "Second", "name": null, "displayName": "Third" });
    assert_eq!(resolve(&manifest, Field::Title), Some(&json!("Second")));

    let manifest = json!({ "name": "First", "title": "Second" });
    assert_eq!(resolve(&manifest, Field::Title), Some(&json!("First")));

    let manifest = json!({ "label": "nothing here" });
    assert_eq!(resolve(&manifest, Field::Tags), None);
}

#[test]
fn missing_everything_yields_a_usable_item() {
    let item =
        CanonicalItem::from_manifest("bare", &json!({}), &context(RegistryKind::Maps)).unwrap();
    assert_eq!(item.title, "bare");
    assert!(item.tags.is_empty());
    assert!(item.images.is_empty());
    assert!(item.fields.is_empty());
    assert_eq!(item.population, None);
}
