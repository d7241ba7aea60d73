use std::sync::LazyLock;

use regex::Regex;
use reqwest::Url;
use serde_json::Value;

use crate::config::{CDN_HOST, RAW_HOST, RegistrySource};
use crate::domain::RegistryKind;
use crate::manifest::{Field, resolve};

const NESTED_IMAGE_KEYS: [&str; 4] = ["file", "src", "path", "url"];
const MAX_NESTED_IMAGE_DEPTH: usize = 4;

static GITHUB_FILE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https://github\.com/([^/]+)/([^/]+)/(?:blob|raw)/([^/]+)/(.+)$")
        .expect("github file pattern")
});
static RAW_CONTENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https://raw\.githubusercontent\.com/([^/]+)/([^/]+)/([^/]+)/(.+)$")
        .expect("raw content pattern")
});
static URI_SCHEME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*://").expect("uri scheme pattern"));

/// Everything needed to turn a relative gallery path into mirror URLs.
#[derive(Debug, Clone)]
pub struct ImageContext {
    pub kind: RegistryKind,
    pub origin_base: String,
    pub cdn_base: String,
}

impl From<&RegistrySource> for ImageContext {
    fn from(source: &RegistrySource) -> Self {
        Self {
            kind: source.kind,
            origin_base: source.origin_base.clone(),
            cdn_base: source.cdn_base.clone(),
        }
    }
}

/// Each image slot becomes an ordered list of URLs to try; slots that
/// resolve to nothing are dropped.
pub fn normalize_images(manifest: &Value, id: &str, context: &ImageContext) -> Vec<Vec<String>> {
    let Some(images) = resolve(manifest, Field::Images) else {
        return Vec::new();
    };

    match images {
        Value::Array(entries) => entries
            .iter()
            .map(|entry| image_candidates(entry, id, context))
            .filter(|candidates| !candidates.is_empty())
            .collect(),
        single => {
            let candidates = image_candidates(single, id, context);
            if candidates.is_empty() {
                Vec::new()
            } else {
                vec![candidates]
            }
        }
    }
}

/// Candidate URLs for one image entry (string or `{file|src|path|url}` object).
pub fn image_candidates(value: &Value, id: &str, context: &ImageContext) -> Vec<String> {
    entry_candidates(value, id, context, 0)
}

fn entry_candidates(value: &Value, id: &str, context: &ImageContext, depth: usize) -> Vec<String> {
    match value {
        Value::String(text) if text.is_empty() => Vec::new(),
        Value::String(text) if URI_SCHEME.is_match(text) => mirror_candidates(text),
        Value::String(text) => gallery_candidates(text, id, context),
        Value::Object(map) if depth < MAX_NESTED_IMAGE_DEPTH => NESTED_IMAGE_KEYS
            .iter()
            .filter_map(|key| map.get(*key))
            .find(|nested| is_truthy(nested))
            .map(|nested| entry_candidates(nested, id, context, depth + 1))
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

/// Candidates for an absolute URL: the cleaned URL first, then raw-content
/// and CDN mirrors when the URL points into a GitHub repository.
pub fn mirror_candidates(url: &str) -> Vec<String> {
    if url.is_empty() {
        return Vec::new();
    }

    let normalized = url.replacen("/refs/heads/", "/", 1).replacen("?raw=true", "", 1);
    let mut candidates = vec![encode_url(&normalized)];

    if let Some(caps) = GITHUB_FILE.captures(&normalized) {
        let (owner, repo, branch, path) = (&caps[1], &caps[2], &caps[3], &caps[4]);
        candidates.push(encode_url(&format!(
            "{RAW_HOST}/{owner}/{repo}/{branch}/{path}"
        )));
        candidates.push(encode_url(&format!(
            "{CDN_HOST}/{owner}/{repo}@{branch}/{path}"
        )));
    }

    if let Some(caps) = RAW_CONTENT.captures(&normalized) {
        let (owner, repo, branch, path) = (&caps[1], &caps[2], &caps[3], &caps[4]);
        candidates.push(encode_url(&format!(
            "{CDN_HOST}/{owner}/{repo}@{branch}/{path}"
        )));
    }

    dedup_preserving_order(candidates)
}

/// Candidates for a path inside `<kind>/<id>/gallery/` on origin and CDN.
pub fn gallery_candidates(path: &str, id: &str, context: &ImageContext) -> Vec<String> {
    let cleaned = clean_gallery_path(path, id, context.kind);
    let relative = format!("{}/{id}/gallery/{cleaned}", context.kind);
    vec![
        encode_url(&format!(
            "{}/{relative}",
            context.origin_base.trim_end_matches('/')
        )),
        encode_url(&format!(
            "{}/{relative}",
            context.cdn_base.trim_end_matches('/')
        )),
    ]
}

/// Strips the prefixes manifests commonly repeat, each at most once, in order.
pub fn clean_gallery_path(path: &str, id: &str, kind: RegistryKind) -> String {
    let kind_id_gallery = format!("{kind}/{id}/gallery/");
    let id_gallery = format!("{id}/gallery/");
    let kind_dir = format!("{kind}/");
    let prefixes = [
        "./",
        kind_id_gallery.as_str(),
        id_gallery.as_str(),
        "gallery/",
        kind_dir.as_str(),
        "/",
    ];

    let mut cleaned = path;
    for prefix in prefixes {
        if let Some(rest) = cleaned.strip_prefix(prefix) {
            cleaned = rest;
        }
    }
    cleaned.to_string()
}

/// Percent-encodes what a browser would; unparseable input is kept literal.
fn encode_url(raw: &str) -> String {
    Url::parse(raw)
        .map(|url| url.to_string())
        .unwrap_or_else(|_| raw.to_string())
}

fn dedup_preserving_order(candidates: Vec<String>) -> Vec<String> {
    let mut unique: Vec<String> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if !unique.contains(&candidate) {
            unique.push(candidate);
        }
    }
    unique
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::String(text) => !text.is_empty(),
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageDisplay<'a> {
    Candidate(&'a str),
    Placeholder,
}

/// Fallback state for one displayed image slot: the current candidate index
/// advances on every load failure and resets whenever the slot is pointed at
/// a different candidate list.
#[derive(Debug, Clone, Default)]
pub struct ImageCursor {
    candidates: Vec<String>,
    index: usize,
}

impl ImageCursor {
    pub fn new(candidates: &[String]) -> Self {
        Self {
            candidates: candidates.to_vec(),
            index: 0,
        }
    }

    pub fn sync(&mut self, candidates: &[String]) {
        if self.candidates != candidates {
            self.candidates = candidates.to_vec();
            self.index = 0;
        }
    }

    pub fn current(&self) -> ImageDisplay<'_> {
        match self.candidates.get(self.index) {
            Some(url) => ImageDisplay::Candidate(url),
            None => ImageDisplay::Placeholder,
        }
    }

    pub fn fail(&mut self) -> ImageDisplay<'_> {
        if self.index < self.candidates.len() {
            self.index += 1;
        }
        self.current()
    }

    pub fn is_exhausted(&self) -> bool {
        self.index >= self.candidates.len()
    }
}
