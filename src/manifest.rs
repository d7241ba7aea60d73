use serde::Serialize;
use serde_json::Value;

use crate::config::{Placeholders, RegistrySource};
use crate::domain::RegistryKind;
use crate::error::RailyardError;
use crate::flatten::{FieldRow, flatten};
use crate::images::{ImageContext, normalize_images};

/// Logical manifest fields and the raw keys they may appear under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Title,
    Description,
    Author,
    Tags,
    Population,
    Images,
    DownloadUrl,
}

impl Field {
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Field::Title => &["name", "title", "displayName"],
            Field::Description => &["description", "summary"],
            Field::Author => &["author", "creator", "publisher"],
            Field::Tags => &["tags", "categories", "labels"],
            Field::Population => &["population", "cityPopulation", "populationEstimate"],
            Field::Images => &["images", "gallery", "screenshots", "thumbnails"],
            Field::DownloadUrl => &["downloadUrl", "download_url", "download"],
        }
    }
}

/// First alias present with a non-null value.
pub fn resolve(manifest: &Value, field: Field) -> Option<&Value> {
    let map = manifest.as_object()?;
    field
        .aliases()
        .iter()
        .filter_map(|alias| map.get(*alias))
        .find(|value| !value.is_null())
}

/// Normalized, display-ready record for one registry item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalItem {
    pub id: String,
    pub title: String,
    pub description: String,
    pub author: String,
    pub tags: Vec<String>,
    pub population: Option<f64>,
    pub images: Vec<Vec<String>>,
    pub download_url: Option<String>,
    pub fields: Vec<FieldRow>,
}

/// Per-load inputs shared by every item of one registry.
#[derive(Debug, Clone)]
pub struct ItemContext {
    pub images: ImageContext,
    pub placeholders: Placeholders,
}

impl ItemContext {
    pub fn new(source: &RegistrySource, placeholders: Placeholders) -> Self {
        Self {
            images: ImageContext::from(source),
            placeholders,
        }
    }

    pub fn kind(&self) -> RegistryKind {
        self.images.kind
    }
}

impl CanonicalItem {
    pub fn from_manifest(
        id: &str,
        manifest: &Value,
        context: &ItemContext,
    ) -> Result<Self, RailyardError> {
        let fields = flatten(manifest, "")?;
        let population = if context.kind().has_population() {
            resolve(manifest, Field::Population).and_then(parse_population)
        } else {
            None
        };

        Ok(Self {
            id: id.to_string(),
            title: resolve_text(manifest, Field::Title).unwrap_or_else(|| id.to_string()),
            description: resolve_text(manifest, Field::Description)
                .unwrap_or_else(|| context.placeholders.no_description.clone()),
            author: resolve_text(manifest, Field::Author)
                .unwrap_or_else(|| context.placeholders.unknown_author.clone()),
            tags: resolve(manifest, Field::Tags).map(parse_tags).unwrap_or_default(),
            population,
            images: normalize_images(manifest, id, &context.images),
            download_url: resolve(manifest, Field::DownloadUrl)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|url| !url.is_empty())
                .map(str::to_string),
            fields,
        })
    }
}

/// Scalar text for a display field; empty strings and containers count as
/// missing so the caller's fallback applies.
fn resolve_text(manifest: &Value, field: Field) -> Option<String> {
    match resolve(manifest, field)? {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

pub fn parse_tags(value: &Value) -> Vec<String> {
    match value {
        Value::Array(entries) => entries
            .iter()
            .filter_map(|entry| match entry {
                Value::String(text) => Some(text.clone()),
                Value::Number(number) => Some(number.to_string()),
                Value::Bool(flag) => Some(flag.to_string()),
                _ => None,
            })
            .filter(|tag| !tag.is_empty())
            .collect(),
        Value::String(text) => text
            .split(',')
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

pub fn parse_population(value: &Value) -> Option<f64> {
    let numeric = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                None
            } else {
                trimmed.parse::<f64>().ok()
            }
        }
        _ => None,
    }?;
    numeric.is_finite().then_some(numeric)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::config::ResolvedConfig;

    fn context(kind: RegistryKind) -> ItemContext {
        let config = ResolvedConfig::default();
        ItemContext::new(config.source(kind), Placeholders::default())
    }

    #[test]
    fn resolve_skips_null_aliases() {
        let manifest = json!({ "name": null, "title": "Second", "displayName": "Third" });
        assert_eq!(
            resolve(&manifest, Field::Title).and_then(Value::as_str),
            Some("Second")
        );
        assert!(resolve(&json!(["not", "an", "object"]), Field::Title).is_none());
    }

    #[test]
    fn empty_manifest_falls_back_everywhere() {
        let item = CanonicalItem::from_manifest("lonely", &json!({}), &context(RegistryKind::Maps))
            .unwrap();
        assert_eq!(item.title, "lonely");
        assert_eq!(item.description, "No description provided.");
        assert_eq!(item.author, "Unknown");
        assert!(item.tags.is_empty());
        assert!(item.population.is_none());
        assert!(item.images.is_empty());
        assert!(item.download_url.is_none());
        assert!(item.fields.is_empty());
    }

    #[test]
    fn population_parses_numbers_and_numeric_strings() {
        assert_eq!(parse_population(&json!(8_300_000)), Some(8_300_000.0));
        assert_eq!(parse_population(&json!(" 1200.5 ")), Some(1200.5));
        assert_eq!(parse_population(&json!("about a million")), None);
        assert_eq!(parse_population(&json!("")), None);
        assert_eq!(parse_population(&json!(["1"])), None);
    }

    #[test]
    fn mods_never_carry_population() {
        let manifest = json!({ "population": 100 });
        let item =
            CanonicalItem::from_manifest("m", &manifest, &context(RegistryKind::Mods)).unwrap();
        assert!(item.population.is_none());
    }

    #[test]
    fn tags_accept_arrays_and_comma_lists() {
        assert_eq!(parse_tags(&json!(["us", 3, "", null])), vec!["us", "3"]);
        assert_eq!(parse_tags(&json!("us, coastal ,,")), vec!["us", "coastal"]);
        assert!(parse_tags(&json!({ "us": true })).is_empty());
    }

    #[test]
    fn title_ignores_empty_and_structured_values() {
        let manifest = json!({ "name": "", "title": { "en": "Alpha" } });
        let item =
            CanonicalItem::from_manifest("alpha", &manifest, &context(RegistryKind::Maps)).unwrap();
        assert_eq!(item.title, "alpha");
    }
}
