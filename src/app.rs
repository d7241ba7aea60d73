use std::time::{Duration, Instant};

use serde::Serialize;

use crate::config::ResolvedConfig;
use crate::domain::{ItemId, PageSize, RegistryKind, SortKey};
use crate::error::RailyardError;
use crate::manifest::CanonicalItem;
use crate::registry::{CancelFlag, LoadOptions, LoadOutcome, RegistryClient, RegistryLoad, load_all};
use crate::store::Store;
use crate::view::{ViewState, all_tags, title_case_tag, view};

#[derive(Debug, Clone, Default)]
pub struct BrowseQuery {
    pub query: Option<String>,
    pub tags: Vec<String>,
    pub sort: Option<SortKey>,
    pub page_size: Option<PageSize>,
    pub page: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListResult {
    pub kind: RegistryKind,
    pub query: String,
    pub tags: Vec<String>,
    pub sort: String,
    pub page_size: usize,
    pub page: usize,
    pub total_pages: usize,
    pub total: usize,
    pub listed: usize,
    pub skipped: Vec<String>,
    pub items: Vec<ItemSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ItemSummary {
    pub id: String,
    pub title: String,
    pub author: String,
    pub description: String,
    pub tags: Vec<String>,
    pub population: Option<f64>,
    pub image: Option<Vec<String>>,
    pub download_url: Option<String>,
}

impl From<&CanonicalItem> for ItemSummary {
    fn from(item: &CanonicalItem) -> Self {
        Self {
            id: item.id.clone(),
            title: item.title.clone(),
            author: item.author.clone(),
            description: item.description.clone(),
            tags: item.tags.clone(),
            population: item.population,
            image: item.images.first().cloned(),
            download_url: item.download_url.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TagsResult {
    pub kind: RegistryKind,
    pub tags: Vec<TagEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TagEntry {
    pub tag: String,
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DownloadResult {
    pub kind: RegistryKind,
    pub id: String,
    pub url: String,
    pub path: String,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

#[derive(Clone)]
pub struct App<C: RegistryClient> {
    config: ResolvedConfig,
    client: C,
}

impl<C: RegistryClient> App<C> {
    pub fn new(config: ResolvedConfig, client: C) -> Self {
        Self { config, client }
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    pub fn load(
        &self,
        kind: RegistryKind,
        sink: &dyn ProgressSink,
        cancel: &CancelFlag,
    ) -> Result<RegistryLoad, RailyardError> {
        let source = self.config.source(kind);
        sink.event(ProgressEvent {
            message: format!("phase=Index; {}", source.index_url),
            elapsed: None,
        });

        let started = Instant::now();
        let options = LoadOptions {
            concurrency: self.config.concurrency,
            placeholders: self.config.placeholders.clone(),
        };
        match load_all(&self.client, source, &options, cancel)? {
            LoadOutcome::Loaded(load) => {
                sink.event(ProgressEvent {
                    message: format!(
                        "phase=Ready; {} of {} {kind} loaded",
                        load.items.len(),
                        load.listed
                    ),
                    elapsed: Some(started.elapsed()),
                });
                Ok(load)
            }
            LoadOutcome::Cancelled => Err(RailyardError::Cancelled),
        }
    }

    pub fn list(
        &self,
        kind: RegistryKind,
        query: BrowseQuery,
        sink: &dyn ProgressSink,
    ) -> Result<ListResult, RailyardError> {
        let load = self.load(kind, sink, &CancelFlag::new())?;
        let state = self.view_state(kind, &query);
        let page = view(&load.items, &state);

        Ok(ListResult {
            kind,
            query: state.query().to_string(),
            tags: state.selected_tags().to_vec(),
            sort: state.sort_key().to_string(),
            page_size: state.page_size().get(),
            page: page.safe_page,
            total_pages: page.total_pages,
            total: page.total,
            listed: load.listed,
            skipped: load.skipped.clone(),
            items: page.items.into_iter().map(ItemSummary::from).collect(),
        })
    }

    pub fn show(
        &self,
        kind: RegistryKind,
        id: &ItemId,
        sink: &dyn ProgressSink,
    ) -> Result<CanonicalItem, RailyardError> {
        let load = self.load(kind, sink, &CancelFlag::new())?;
        load.items
            .into_iter()
            .find(|item| item.id == id.as_str())
            .ok_or_else(|| RailyardError::ItemNotFound(format!("{kind}:{id}")))
    }

    pub fn tags(
        &self,
        kind: RegistryKind,
        sink: &dyn ProgressSink,
    ) -> Result<TagsResult, RailyardError> {
        let load = self.load(kind, sink, &CancelFlag::new())?;
        let tags = all_tags(&load.items)
            .into_iter()
            .map(|tag| TagEntry {
                label: title_case_tag(&tag),
                count: load
                    .items
                    .iter()
                    .filter(|item| item.tags.contains(&tag))
                    .count(),
                tag,
            })
            .collect();
        Ok(TagsResult { kind, tags })
    }

    pub fn download(
        &self,
        kind: RegistryKind,
        id: &ItemId,
        store: &Store,
        force: bool,
        sink: &dyn ProgressSink,
    ) -> Result<DownloadResult, RailyardError> {
        let item = self.show(kind, id, sink)?;
        self.download_item(kind, &item, store, force, sink)
    }

    /// Saves an already loaded item's download into the store.
    pub fn download_item(
        &self,
        kind: RegistryKind,
        item: &CanonicalItem,
        store: &Store,
        force: bool,
        sink: &dyn ProgressSink,
    ) -> Result<DownloadResult, RailyardError> {
        let url = item
            .download_url
            .clone()
            .ok_or_else(|| RailyardError::NoDownloadUrl(format!("{kind}:{}", item.id)))?;
        let id: ItemId = item.id.parse()?;
        let path = store.item_path(kind, &id, &url);

        sink.event(ProgressEvent {
            message: format!("phase=Download; {url}"),
            elapsed: None,
        });
        let started = Instant::now();
        Store::write_atomic(&path, force, |temp| self.client.download(&url, temp))?;
        sink.event(ProgressEvent {
            message: format!("phase=Ready; saved {path}"),
            elapsed: Some(started.elapsed()),
        });

        Ok(DownloadResult {
            kind,
            id: item.id.clone(),
            url,
            path: path.to_string(),
        })
    }

    /// Initial view state for a registry, with any CLI overrides applied.
    pub fn view_state(&self, kind: RegistryKind, query: &BrowseQuery) -> ViewState {
        let mut state = ViewState::new(query.page_size.unwrap_or(self.config.page_size));
        if let Some(text) = &query.query {
            state.set_query(text.clone());
        }
        if !query.tags.is_empty() {
            state.set_selected_tags(query.tags.iter().cloned());
        }
        if let Some(sort) = query.sort {
            if kind.has_population() || !sort.is_population() {
                state.set_sort_key(sort);
            }
        }
        if let Some(page) = query.page {
            state.set_page(page);
        }
        state
    }
}
