use std::cmp::Ordering;

use serde::Serialize;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use crate::domain::{PageSize, SortKey};
use crate::manifest::CanonicalItem;

/// Browser state for one registry view. Changing what is shown (query, tags,
/// sort, page size) sends the user back to page 1; paging alone does not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    query: String,
    selected_tags: Vec<String>,
    sort_key: SortKey,
    page_size: PageSize,
    page: usize,
}

impl Default for ViewState {
    fn default() -> Self {
        Self::new(PageSize::default())
    }
}

impl ViewState {
    pub fn new(page_size: PageSize) -> Self {
        Self {
            query: String::new(),
            selected_tags: Vec::new(),
            sort_key: SortKey::default(),
            page_size,
            page: 1,
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn selected_tags(&self) -> &[String] {
        &self.selected_tags
    }

    pub fn sort_key(&self) -> SortKey {
        self.sort_key
    }

    pub fn page_size(&self) -> PageSize {
        self.page_size
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
        self.page = 1;
    }

    pub fn set_sort_key(&mut self, sort_key: SortKey) {
        self.sort_key = sort_key;
        self.page = 1;
    }

    pub fn set_page_size(&mut self, page_size: PageSize) {
        self.page_size = page_size;
        self.page = 1;
    }

    /// Adds the tag, or removes it if it is already selected.
    pub fn toggle_tag(&mut self, tag: &str) {
        if let Some(position) = self.selected_tags.iter().position(|t| t == tag) {
            self.selected_tags.remove(position);
        } else {
            self.selected_tags.push(tag.to_string());
        }
        self.page = 1;
    }

    pub fn set_selected_tags<I, S>(&mut self, tags: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selected_tags.clear();
        for tag in tags {
            let tag = tag.into();
            if !self.selected_tags.contains(&tag) {
                self.selected_tags.push(tag);
            }
        }
        self.page = 1;
    }

    pub fn clear_tags(&mut self) {
        self.set_selected_tags(Vec::<String>::new());
    }

    /// Requested page; `view` clamps it to what exists.
    pub fn set_page(&mut self, page: usize) {
        self.page = page.max(1);
    }

    pub fn next_page(&mut self, total_pages: usize) {
        self.page = (self.page + 1).min(total_pages.max(1));
    }

    pub fn prev_page(&mut self) {
        self.page = self.page.saturating_sub(1).max(1);
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ViewPage<'a> {
    pub items: Vec<&'a CanonicalItem>,
    pub total: usize,
    pub total_pages: usize,
    pub safe_page: usize,
}

/// Search, tag filter, sort and paginate `items` for `state`.
pub fn view<'a>(items: &'a [CanonicalItem], state: &ViewState) -> ViewPage<'a> {
    let mut filtered = filter_items(items, state);
    sort_items(&mut filtered, state.sort_key);

    let size = state.page_size.get();
    let total = filtered.len();
    let (total_pages, safe_page) = paginate(total, size, state.page);
    let start = (safe_page - 1) * size;
    let end = (start + size).min(total);
    let page_items = if start < total {
        filtered[start..end].to_vec()
    } else {
        Vec::new()
    };

    ViewPage {
        items: page_items,
        total,
        total_pages,
        safe_page,
    }
}

/// `(total_pages, safe_page)` for `total` rows at `size` per page.
pub fn paginate(total: usize, size: usize, page: usize) -> (usize, usize) {
    let size = size.max(1);
    let total_pages = total.div_ceil(size).max(1);
    (total_pages, page.clamp(1, total_pages))
}

pub fn filter_items<'a>(items: &'a [CanonicalItem], state: &ViewState) -> Vec<&'a CanonicalItem> {
    let needle = state.query.trim().to_lowercase();
    items
        .iter()
        .filter(|item| matches_query(item, &needle))
        .filter(|item| has_all_tags(item, &state.selected_tags))
        .collect()
}

/// Case-insensitive substring search over every text an item shows.
pub fn matches_query(item: &CanonicalItem, lowered_query: &str) -> bool {
    if lowered_query.is_empty() {
        return true;
    }
    search_haystack(item).contains(lowered_query)
}

fn search_haystack(item: &CanonicalItem) -> String {
    let fields = item
        .fields
        .iter()
        .map(|row| format!("{} {}", row.key, row.value))
        .collect::<Vec<_>>()
        .join(" ");
    let tags = item.tags.join(" ");
    [
        item.id.as_str(),
        item.title.as_str(),
        item.description.as_str(),
        item.author.as_str(),
        tags.as_str(),
        fields.as_str(),
    ]
    .join(" ")
    .to_lowercase()
}

pub fn has_all_tags(item: &CanonicalItem, selected: &[String]) -> bool {
    selected.iter().all(|tag| item.tags.contains(tag))
}

pub fn sort_items(items: &mut [&CanonicalItem], sort_key: SortKey) {
    items.sort_by(|a, b| compare_items(a, b, sort_key));
}

pub fn compare_items(a: &CanonicalItem, b: &CanonicalItem, sort_key: SortKey) -> Ordering {
    match sort_key {
        SortKey::NameAsc => natural_cmp(&a.title, &b.title),
        SortKey::NameDesc => natural_cmp(&b.title, &a.title),
        SortKey::PopulationAsc => compare_population(a.population, b.population, false),
        SortKey::PopulationDesc => compare_population(a.population, b.population, true),
        SortKey::IdAsc => natural_cmp(&a.id, &b.id),
        SortKey::IdDesc => natural_cmp(&b.id, &a.id),
    }
}

/// Missing populations sort last in either direction.
fn compare_population(a: Option<f64>, b: Option<f64>, descending: bool) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => {
            let ordering = a.partial_cmp(&b).unwrap_or(Ordering::Equal);
            if descending {
                ordering.reverse()
            } else {
                ordering
            }
        }
    }
}

/// Collation used for titles, ids and tags: accents and case are ignored,
/// punctuation and spaces sort before digits, digits before letters, and
/// digit runs compare by numeric value so `map2` sorts before `map10`.
/// Strings that differ only in case or accents compare equal.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let left = fold(a);
    let right = fold(b);
    let mut left = CollationElements::new(&left);
    let mut right = CollationElements::new(&right);
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let ordering = compare_elements(x, y);
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
        }
    }
}

/// Base letters only: decomposed, combining marks dropped, lowercased.
fn fold(value: &str) -> Vec<char> {
    value
        .nfd()
        .filter(|ch| !is_combining_mark(*ch))
        .flat_map(char::to_lowercase)
        .collect()
}

#[derive(Debug, Clone, Copy)]
enum Element<'a> {
    Number(&'a [char]),
    Char(char),
}

impl Element<'_> {
    /// Primary ordering group: symbols, then numbers, then letters.
    fn group(self) -> u8 {
        match self {
            Element::Number(_) => 1,
            Element::Char(ch) if ch.is_alphabetic() => 2,
            Element::Char(_) => 0,
        }
    }
}

struct CollationElements<'a> {
    rest: &'a [char],
}

impl<'a> CollationElements<'a> {
    fn new(folded: &'a [char]) -> Self {
        Self { rest: folded }
    }
}

impl<'a> Iterator for CollationElements<'a> {
    type Item = Element<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let first = *self.rest.first()?;
        if !first.is_ascii_digit() {
            self.rest = &self.rest[1..];
            return Some(Element::Char(first));
        }
        let end = self
            .rest
            .iter()
            .position(|ch| !ch.is_ascii_digit())
            .unwrap_or(self.rest.len());
        let (digits, rest) = self.rest.split_at(end);
        self.rest = rest;
        Some(Element::Number(digits))
    }
}

fn compare_elements(a: Element<'_>, b: Element<'_>) -> Ordering {
    match (a, b) {
        (Element::Number(x), Element::Number(y)) => {
            let x = trim_leading_zeros(x);
            let y = trim_leading_zeros(y);
            x.len().cmp(&y.len()).then_with(|| x.cmp(y))
        }
        (Element::Char(x), Element::Char(y)) => {
            a.group().cmp(&b.group()).then_with(|| x.cmp(&y))
        }
        _ => a.group().cmp(&b.group()),
    }
}

fn trim_leading_zeros(digits: &[char]) -> &[char] {
    let start = digits
        .iter()
        .position(|ch| *ch != '0')
        .unwrap_or(digits.len());
    &digits[start..]
}

/// Distinct tags across `items`, naturally sorted, for the tag bar.
pub fn all_tags(items: &[CanonicalItem]) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for tag in items.iter().flat_map(|item| item.tags.iter()) {
        if !tags.contains(tag) {
            tags.push(tag.clone());
        }
    }
    tags.sort_by(|a, b| natural_cmp(a, b));
    tags
}

/// `new-york` → `New York`.
pub fn title_case_tag(tag: &str) -> String {
    tag.split('-')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
