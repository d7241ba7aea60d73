use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::Serialize;
use serde_json::Value;

use crate::config::{Placeholders, RegistrySource};
use crate::domain::{ItemId, RegistryKind};
use crate::error::RailyardError;
use crate::manifest::{CanonicalItem, ItemContext};

const INDEX_ID_KEYS: [&str; 3] = ["id", "slug", "name"];

pub trait RegistryClient: Send + Sync {
    fn fetch_index(&self, source: &RegistrySource) -> Result<Value, RailyardError>;
    fn fetch_manifest(&self, source: &RegistrySource, id: &str) -> Result<Value, RailyardError>;
    fn download(&self, url: &str, destination: &Path) -> Result<(), RailyardError>;
}

#[derive(Clone)]
pub struct RegistryHttpClient {
    client: Client,
    max_retries: usize,
}

impl RegistryHttpClient {
    pub fn new(timeout_secs: u64, max_retries: usize) -> Result<Self, RailyardError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("railyard-browser/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| RailyardError::RegistryUnavailable(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|err| RailyardError::RegistryUnavailable(err.to_string()))?;
        Ok(Self {
            client,
            max_retries,
        })
    }

    /// Retries only transient failures, and only when `max_retries` allows it.
    fn send_with_retries<F>(
        &self,
        mut make_req: F,
    ) -> Result<reqwest::blocking::Response, reqwest::Error>
    where
        F: FnMut() -> reqwest::blocking::RequestBuilder,
    {
        const BASE_DELAY_MS: u64 = 200;
        let mut attempt = 0usize;
        loop {
            match make_req().send() {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if attempt < self.max_retries && is_retryable_status(status) {
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        tracing::debug!(status, attempt, "retrying registry request");
                        thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Ok(resp);
                }
                Err(err) => {
                    if attempt < self.max_retries && is_retryable_error(&err) {
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        tracing::debug!(error = %err, attempt, "retrying registry request");
                        thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Err(err);
                }
            }
        }
    }

    fn failure_message(response: reqwest::blocking::Response, fallback: &str) -> (u16, String) {
        let status = response.status().as_u16();
        let message = response.text().unwrap_or_else(|_| fallback.to_string());
        (status, message)
    }
}

impl RegistryClient for RegistryHttpClient {
    fn fetch_index(&self, source: &RegistrySource) -> Result<Value, RailyardError> {
        tracing::debug!(url = %source.index_url, "fetching registry index");
        let response = self
            .send_with_retries(|| self.client.get(&source.index_url))
            .map_err(|err| RailyardError::RegistryUnavailable(err.to_string()))?;
        if !response.status().is_success() {
            let (status, message) = Self::failure_message(response, "registry request failed");
            return Err(RailyardError::RegistryStatus { status, message });
        }
        response
            .json()
            .map_err(|err| RailyardError::RegistryUnavailable(err.to_string()))
    }

    fn fetch_manifest(&self, source: &RegistrySource, id: &str) -> Result<Value, RailyardError> {
        let url = source.manifest_url(id);
        tracing::debug!(id, url = %url, "fetching manifest");
        let response = self
            .send_with_retries(|| self.client.get(&url))
            .map_err(|err| RailyardError::ManifestHttp(err.to_string()))?;
        if !response.status().is_success() {
            let (status, message) = Self::failure_message(response, "manifest request failed");
            return Err(RailyardError::ManifestStatus { status, message });
        }
        response
            .json()
            .map_err(|err| RailyardError::ManifestParse(err.to_string()))
    }

    fn download(&self, url: &str, destination: &Path) -> Result<(), RailyardError> {
        tracing::debug!(url, "downloading item");
        let response = self
            .send_with_retries(|| self.client.get(url))
            .map_err(|err| RailyardError::DownloadHttp(err.to_string()))?;
        if !response.status().is_success() {
            let (status, message) = Self::failure_message(response, "download failed");
            return Err(RailyardError::DownloadStatus { status, message });
        }
        let mut response = response;
        let mut file =
            File::create(destination).map_err(|err| RailyardError::Filesystem(err.to_string()))?;
        std::io::copy(&mut response, &mut file)
            .map_err(|err| RailyardError::DownloadHttp(err.to_string()))?;
        Ok(())
    }
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}

/// Shared "the consumer went away" flag. Once set, a load stops issuing new
/// manifest requests and its outcome is reported as cancelled.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub concurrency: usize,
    pub placeholders: Placeholders,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            concurrency: crate::config::DEFAULT_CONCURRENCY,
            placeholders: Placeholders::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RegistryLoad {
    pub kind: RegistryKind,
    pub listed: usize,
    pub skipped: Vec<String>,
    pub items: Vec<CanonicalItem>,
    pub loaded_at: String,
}

#[derive(Debug, Clone)]
pub enum LoadOutcome {
    Loaded(RegistryLoad),
    Cancelled,
}

/// Fetches the index and every listed manifest. Only an index failure fails
/// the load; a manifest that cannot be fetched or parsed is skipped.
pub fn load_all<C: RegistryClient>(
    client: &C,
    source: &RegistrySource,
    options: &LoadOptions,
    cancel: &CancelFlag,
) -> Result<LoadOutcome, RailyardError> {
    if cancel.is_cancelled() {
        return Ok(LoadOutcome::Cancelled);
    }

    let index = client.fetch_index(source).map_err(|err| match err {
        RailyardError::RegistryUnavailable(_) => err,
        other => RailyardError::RegistryUnavailable(other.to_string()),
    })?;
    let ids = parse_index(&index, source.kind);
    let context = ItemContext::new(source, options.placeholders.clone());

    let results = fetch_manifests(client, source, &ids, &context, options.concurrency, cancel);
    if cancel.is_cancelled() {
        tracing::debug!(kind = %source.kind, "registry load cancelled");
        return Ok(LoadOutcome::Cancelled);
    }

    let mut items = Vec::with_capacity(ids.len());
    let mut skipped = Vec::new();
    for (id, result) in ids.iter().zip(results) {
        match result {
            Some(item) => items.push(item),
            None => skipped.push(id.clone()),
        }
    }

    tracing::info!(
        kind = %source.kind,
        listed = ids.len(),
        loaded = items.len(),
        skipped = skipped.len(),
        "registry loaded"
    );

    Ok(LoadOutcome::Loaded(RegistryLoad {
        kind: source.kind,
        listed: ids.len(),
        skipped,
        items,
        loaded_at: chrono::Utc::now().to_rfc3339(),
    }))
}

/// Item ids from an index document: a bare array, or an object holding the
/// array under the registry kind. Entries are ids or objects with
/// `id`/`slug`/`name`. Invalid and repeated ids are dropped.
pub fn parse_index(index: &Value, kind: RegistryKind) -> Vec<String> {
    let entries: &[Value] = match index {
        Value::Array(entries) => entries.as_slice(),
        Value::Object(map) => match map.get(kind.as_str()) {
            Some(Value::Array(entries)) => entries.as_slice(),
            _ => &[],
        },
        _ => &[],
    };

    let mut ids: Vec<String> = Vec::with_capacity(entries.len());
    for entry in entries {
        let Some(raw) = entry_id(entry) else {
            continue;
        };
        match raw.parse::<ItemId>() {
            Ok(id) if !ids.iter().any(|known| known == id.as_str()) => {
                ids.push(id.as_str().to_string());
            }
            Ok(_) => tracing::debug!(id = %raw, "duplicate index entry"),
            Err(err) => tracing::warn!(error = %err, "skipping index entry"),
        }
    }
    ids
}

fn entry_id(entry: &Value) -> Option<String> {
    match entry {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Object(map) => INDEX_ID_KEYS
            .iter()
            .filter_map(|key| map.get(*key))
            .find_map(|value| match value {
                Value::String(id) if !id.is_empty() => Some(id.clone()),
                Value::Number(number) => Some(number.to_string()),
                _ => None,
            }),
        _ => None,
    }
}

fn fetch_manifests<C: RegistryClient>(
    client: &C,
    source: &RegistrySource,
    ids: &[String],
    context: &ItemContext,
    concurrency: usize,
    cancel: &CancelFlag,
) -> Vec<Option<CanonicalItem>> {
    let mut results: Vec<Option<CanonicalItem>> = (0..ids.len()).map(|_| None).collect();
    if ids.is_empty() {
        return results;
    }

    let workers = concurrency.clamp(1, ids.len());
    let next = AtomicUsize::new(0);

    thread::scope(|scope| {
        let mut handles = Vec::with_capacity(workers);
        for _ in 0..workers {
            handles.push(
                scope.spawn(|| drain_queue(client, source, ids, context, &next, cancel)),
            );
        }
        for handle in handles {
            match handle.join() {
                Ok(loaded) => {
                    for (index, item) in loaded {
                        results[index] = item;
                    }
                }
                Err(_) => tracing::warn!("manifest worker panicked"),
            }
        }
    });

    results
}

fn drain_queue<C: RegistryClient>(
    client: &C,
    source: &RegistrySource,
    ids: &[String],
    context: &ItemContext,
    next: &AtomicUsize,
    cancel: &CancelFlag,
) -> Vec<(usize, Option<CanonicalItem>)> {
    let mut loaded = Vec::new();
    while !cancel.is_cancelled() {
        let index = next.fetch_add(1, Ordering::SeqCst);
        let Some(id) = ids.get(index) else {
            break;
        };
        loaded.push((index, load_item(client, source, id, context)));
    }
    loaded
}

fn load_item<C: RegistryClient>(
    client: &C,
    source: &RegistrySource,
    id: &str,
    context: &ItemContext,
) -> Option<CanonicalItem> {
    let result = client
        .fetch_manifest(source, id)
        .and_then(|manifest| CanonicalItem::from_manifest(id, &manifest, context));
    match result {
        Ok(item) => Some(item),
        Err(err) => {
            tracing::warn!(id, error = %err, "skipping manifest");
            None
        }
    }
}

/// What a view shows while a registry is loading.
#[derive(Debug, Clone, Default)]
pub struct LoadState {
    pub loading: bool,
    pub error: Option<String>,
    pub items: Vec<CanonicalItem>,
}

impl LoadState {
    pub fn begin(&mut self) {
        self.loading = true;
        self.error = None;
    }

    /// Applies a finished load. Cancelled outcomes leave the state untouched.
    pub fn apply(&mut self, result: Result<LoadOutcome, RailyardError>) {
        match result {
            Ok(LoadOutcome::Cancelled) => return,
            Ok(LoadOutcome::Loaded(load)) => {
                self.items = load.items;
                self.error = None;
            }
            Err(err) => {
                self.items.clear();
                self.error = Some(err.to_string());
            }
        }
        self.loading = false;
    }
}
