use std::collections::{HashMap, VecDeque};
use std::io;
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crossterm::ExecutableCommand;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use miette::IntoDiagnostic;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};

use crate::app::{App, DownloadResult, ProgressEvent, ProgressSink};
use crate::domain::{RegistryKind, SortKey};
use crate::error::RailyardError;
use crate::images::{ImageCursor, ImageDisplay};
use crate::manifest::CanonicalItem;
use crate::registry::{CancelFlag, LoadOutcome, LoadState, RegistryClient};
use crate::store::Store;
use crate::view::{ViewPage, ViewState, all_tags, title_case_tag, view};

const EVENTS_MAX: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputMode {
    Normal,
    Search,
    Tags,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowserAction {
    None,
    Quit,
    Reload,
    Download(String),
}

/// Everything the browser shows. Key handling is pure so it can be driven
/// without a terminal.
#[derive(Debug)]
pub struct BrowserState {
    kind: RegistryKind,
    load: LoadState,
    view: ViewState,
    input_mode: InputMode,
    selected: usize,
    tag_cursor: usize,
    show_fields: bool,
    image_index_by_id: HashMap<String, usize>,
    image_cursor: ImageCursor,
    status: String,
    events: VecDeque<String>,
}

impl BrowserState {
    pub fn new(kind: RegistryKind, view: ViewState) -> Self {
        Self {
            kind,
            load: LoadState::default(),
            view,
            input_mode: InputMode::Normal,
            selected: 0,
            tag_cursor: 0,
            show_fields: false,
            image_index_by_id: HashMap::new(),
            image_cursor: ImageCursor::default(),
            status: "ready".to_string(),
            events: VecDeque::new(),
        }
    }

    pub fn view_state(&self) -> &ViewState {
        &self.view
    }

    pub fn load_state(&self) -> &LoadState {
        &self.load
    }

    pub fn begin_load(&mut self) {
        self.load.begin();
        self.status = format!("Loading {} manifests…", self.kind);
    }

    pub fn finish_load(&mut self, result: Result<LoadOutcome, RailyardError>) {
        self.load.apply(result);
        self.status = match &self.load.error {
            Some(err) => err.clone(),
            None => format!("{} {} loaded", self.load.items.len(), self.kind),
        };
        self.selected = 0;
        self.tag_cursor = 0;
        self.sync_image_cursor();
    }

    pub fn page(&self) -> ViewPage<'_> {
        view(&self.load.items, &self.view)
    }

    pub fn selected_item(&self) -> Option<&CanonicalItem> {
        self.page().items.get(self.selected).copied()
    }

    pub fn tags(&self) -> Vec<String> {
        all_tags(&self.load.items)
    }

    /// Candidate list of the image currently shown for the selected item.
    pub fn active_image(&self) -> Option<&[String]> {
        let item = self.selected_item()?;
        let index = self.image_index_by_id.get(&item.id).copied().unwrap_or(0);
        item.images.get(index).map(Vec::as_slice)
    }

    pub fn image_display(&self) -> ImageDisplay<'_> {
        self.image_cursor.current()
    }

    fn sync_image_cursor(&mut self) {
        let candidates = self.active_image().map(<[String]>::to_vec).unwrap_or_default();
        self.image_cursor.sync(&candidates);
    }

    fn cycle_image(&mut self, direction: isize) {
        let Some(item) = self.selected_item() else {
            return;
        };
        let max = item.images.len();
        if max < 2 {
            return;
        }
        let id = item.id.clone();
        let start = self.image_index_by_id.get(&id).copied().unwrap_or(0) as isize;
        let next = (start + direction + max as isize).rem_euclid(max as isize) as usize;
        self.image_index_by_id.insert(id, next);
        self.sync_image_cursor();
    }

    fn move_selection(&mut self, delta: isize) {
        let len = self.page().items.len();
        if len == 0 {
            self.selected = 0;
            return;
        }
        let next = (self.selected as isize + delta).clamp(0, len as isize - 1);
        self.selected = next as usize;
        self.sync_image_cursor();
    }

    fn after_view_change(&mut self) {
        self.selected = 0;
        self.sync_image_cursor();
    }

    fn cycle_sort(&mut self) {
        let keys = SortKey::available(self.kind);
        let current = keys
            .iter()
            .position(|key| *key == self.view.sort_key())
            .unwrap_or(0);
        let next = keys[(current + 1) % keys.len()];
        self.view.set_sort_key(next);
        self.after_view_change();
    }

    fn push_event(&mut self, message: String) {
        self.events.push_back(message);
        while self.events.len() > EVENTS_MAX {
            self.events.pop_front();
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> BrowserAction {
        if key.kind != KeyEventKind::Press {
            return BrowserAction::None;
        }
        match self.input_mode {
            InputMode::Search => self.handle_search_key(key),
            InputMode::Tags => self.handle_tag_key(key),
            InputMode::Normal => self.handle_normal_key(key),
        }
    }

    fn handle_search_key(&mut self, key: KeyEvent) -> BrowserAction {
        match key.code {
            KeyCode::Enter | KeyCode::Esc => self.input_mode = InputMode::Normal,
            KeyCode::Backspace => {
                let mut query = self.view.query().to_string();
                query.pop();
                self.view.set_query(query);
                self.after_view_change();
            }
            KeyCode::Char(ch) => {
                let query = format!("{}{ch}", self.view.query());
                self.view.set_query(query);
                self.after_view_change();
            }
            _ => {}
        }
        BrowserAction::None
    }

    fn handle_tag_key(&mut self, key: KeyEvent) -> BrowserAction {
        let tags = self.tags();
        match key.code {
            KeyCode::Esc | KeyCode::Char('t') => self.input_mode = InputMode::Normal,
            KeyCode::Left => self.tag_cursor = self.tag_cursor.saturating_sub(1),
            KeyCode::Right => {
                if self.tag_cursor + 1 < tags.len() {
                    self.tag_cursor += 1;
                }
            }
            KeyCode::Char(' ') | KeyCode::Enter => {
                if let Some(tag) = tags.get(self.tag_cursor) {
                    self.view.toggle_tag(tag);
                    self.after_view_change();
                }
            }
            KeyCode::Char('c') => {
                self.view.clear_tags();
                self.after_view_change();
            }
            _ => {}
        }
        BrowserAction::None
    }

    fn handle_normal_key(&mut self, key: KeyEvent) -> BrowserAction {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return BrowserAction::Quit,
            KeyCode::Char('/') => self.input_mode = InputMode::Search,
            KeyCode::Char('t') => {
                if !self.load.items.is_empty() {
                    self.input_mode = InputMode::Tags;
                }
            }
            KeyCode::Char('s') => self.cycle_sort(),
            KeyCode::Char('p') => {
                self.view.set_page_size(self.view.page_size().next());
                self.after_view_change();
            }
            KeyCode::Right | KeyCode::Char('n') => {
                let total_pages = self.page().total_pages;
                self.view.next_page(total_pages);
                self.after_view_change();
            }
            KeyCode::Left | KeyCode::Char('b') => {
                // Resume from the clamped page, not the stale request.
                let safe_page = self.page().safe_page;
                self.view.set_page(safe_page);
                self.view.prev_page();
                self.after_view_change();
            }
            KeyCode::Up => self.move_selection(-1),
            KeyCode::Down => self.move_selection(1),
            KeyCode::Char('[') => self.cycle_image(-1),
            KeyCode::Char(']') => self.cycle_image(1),
            KeyCode::Char('m') => {
                self.image_cursor.fail();
            }
            KeyCode::Enter => self.show_fields = !self.show_fields,
            KeyCode::Char('r') => {
                if !self.load.loading {
                    return BrowserAction::Reload;
                }
            }
            KeyCode::Char('d') => {
                let Some(item) = self.selected_item() else {
                    return BrowserAction::None;
                };
                let id = item.id.clone();
                if item.download_url.is_some() {
                    return BrowserAction::Download(id);
                }
                self.status = format!("{id} has no download link");
            }
            _ => {}
        }
        BrowserAction::None
    }
}

struct TuiProgress {
    events: Arc<Mutex<VecDeque<String>>>,
}

impl ProgressSink for TuiProgress {
    fn event(&self, event: ProgressEvent) {
        if let Ok(mut events) = self.events.lock() {
            let message = match event.elapsed {
                Some(elapsed) => format!("{} ({} ms)", event.message, elapsed.as_millis()),
                None => event.message,
            };
            events.push_back(message);
            while events.len() > EVENTS_MAX {
                events.pop_front();
            }
        }
    }
}

struct PendingLoad {
    cancel: CancelFlag,
    rx: Receiver<Result<LoadOutcome, RailyardError>>,
}

pub struct Tui<C: RegistryClient + 'static> {
    app: Arc<App<C>>,
    store: Store,
    state: BrowserState,
    progress: Arc<Mutex<VecDeque<String>>>,
    pending: Option<PendingLoad>,
    download_rx: Option<Receiver<Result<DownloadResult, RailyardError>>>,
}

impl<C: RegistryClient + 'static> Tui<C> {
    pub fn new(app: App<C>, store: Store, kind: RegistryKind, view: ViewState) -> Self {
        Self {
            app: Arc::new(app),
            store,
            state: BrowserState::new(kind, view),
            progress: Arc::new(Mutex::new(VecDeque::new())),
            pending: None,
            download_rx: None,
        }
    }

    pub fn run(&mut self) -> miette::Result<()> {
        let mut stdout = io::stdout();
        enable_raw_mode().into_diagnostic()?;
        stdout.execute(EnterAlternateScreen).into_diagnostic()?;

        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).into_diagnostic()?;
        terminal.clear().into_diagnostic()?;

        let result = self.event_loop(&mut terminal);

        // The view is going away; a late load result must not be applied.
        if let Some(pending) = self.pending.take() {
            pending.cancel.cancel();
        }

        disable_raw_mode().into_diagnostic()?;
        let mut stdout = io::stdout();
        stdout.execute(LeaveAlternateScreen).into_diagnostic()?;
        result
    }

    fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> miette::Result<()> {
        self.start_load();
        let mut tick = 0usize;
        loop {
            self.poll_background();
            terminal
                .draw(|frame| draw_ui(frame, &self.state, tick))
                .into_diagnostic()?;

            if event::poll(Duration::from_millis(120)).into_diagnostic()? {
                if let Event::Key(key) = event::read().into_diagnostic()? {
                    match self.state.handle_key(key) {
                        BrowserAction::Quit => return Ok(()),
                        BrowserAction::Reload => self.start_load(),
                        BrowserAction::Download(id) => self.start_download(&id),
                        BrowserAction::None => {}
                    }
                }
            }

            tick = tick.wrapping_add(1);
        }
    }

    fn start_load(&mut self) {
        if let Some(previous) = self.pending.take() {
            previous.cancel.cancel();
        }
        self.state.begin_load();

        let (tx, rx) = mpsc::channel();
        let cancel = CancelFlag::new();
        let app = Arc::clone(&self.app);
        let kind = self.state.kind;
        let worker_cancel = cancel.clone();
        let sink = TuiProgress {
            events: Arc::clone(&self.progress),
        };
        thread::spawn(move || {
            let result = match app.load(kind, &sink, &worker_cancel) {
                Ok(load) => Ok(LoadOutcome::Loaded(load)),
                Err(RailyardError::Cancelled) => Ok(LoadOutcome::Cancelled),
                Err(err) => Err(err),
            };
            if !worker_cancel.is_cancelled() {
                let _ = tx.send(result);
            }
        });
        self.pending = Some(PendingLoad { cancel, rx });
    }

    fn start_download(&mut self, id: &str) {
        if self.download_rx.is_some() {
            self.state.status = "a download is already running".to_string();
            return;
        }
        let Some(item) = self
            .state
            .load
            .items
            .iter()
            .find(|item| item.id == id)
            .cloned()
        else {
            return;
        };

        let (tx, rx) = mpsc::channel();
        let app = Arc::clone(&self.app);
        let store = self.store.clone();
        let kind = self.state.kind;
        let sink = TuiProgress {
            events: Arc::clone(&self.progress),
        };
        self.state.status = format!("downloading {}…", item.id);
        thread::spawn(move || {
            let _ = tx.send(app.download_item(kind, &item, &store, false, &sink));
        });
        self.download_rx = Some(rx);
    }

    fn poll_background(&mut self) {
        if let Some(pending) = &self.pending {
            if let Ok(result) = pending.rx.try_recv() {
                self.pending = None;
                self.state.finish_load(result);
            }
        }

        if let Some(rx) = &self.download_rx {
            if let Ok(result) = rx.try_recv() {
                self.download_rx = None;
                self.state.status = match result {
                    Ok(done) => format!("saved {}", done.path),
                    Err(err) => err.to_string(),
                };
            }
        }

        let drained = self
            .progress
            .lock()
            .map(|mut events| events.drain(..).collect::<Vec<_>>())
            .unwrap_or_default();
        for message in drained {
            self.state.push_event(message);
        }
    }
}

fn draw_ui(frame: &mut ratatui::Frame, state: &BrowserState, tick: usize) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(3),
        ])
        .split(frame.area());

    frame.render_widget(draw_header(state, tick), chunks[0]);
    frame.render_widget(draw_controls(state), chunks[1]);

    let main = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(chunks[2]);
    draw_cards(frame, state, main[0]);
    frame.render_widget(draw_details(state), main[1]);

    frame.render_widget(draw_footer(state), chunks[3]);
}

fn draw_header(state: &BrowserState, tick: usize) -> Paragraph<'static> {
    let spinner = ["|", "/", "-", "\\"][tick % 4];
    let (status_text, status_color) = if state.load.loading {
        (format!("{spinner} {}", state.status), Color::Cyan)
    } else if state.load.error.is_some() {
        (state.status.clone(), Color::Red)
    } else {
        (state.status.clone(), Color::Green)
    };
    let title = match state.kind {
        RegistryKind::Maps => "Railyard Maps",
        RegistryKind::Mods => "Railyard Mods",
    };
    let header_line = Line::from(vec![
        Span::styled(
            title,
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
        Span::styled(env!("CARGO_PKG_VERSION"), Style::default().fg(Color::Gray)),
        Span::raw("   "),
        Span::styled(status_text, Style::default().fg(status_color)),
    ]);
    let event_line = Line::from(Span::styled(
        state.events.back().cloned().unwrap_or_default(),
        Style::default().fg(Color::Gray),
    ));
    Paragraph::new(vec![header_line, event_line])
        .block(Block::default().borders(Borders::BOTTOM))
}

fn draw_controls(state: &BrowserState) -> Paragraph<'static> {
    let search_style = if state.input_mode == InputMode::Search {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    let controls = Line::from(vec![
        Span::styled("Search: ", Style::default().fg(Color::Gray)),
        Span::styled(format!("{}_", state.view.query()), search_style),
        Span::styled("   Sort: ", Style::default().fg(Color::Gray)),
        Span::raw(state.view.sort_key().label()),
        Span::styled("   Cards per page: ", Style::default().fg(Color::Gray)),
        Span::raw(state.view.page_size().to_string()),
    ]);

    let mut tag_spans = vec![Span::styled("Tags: ", Style::default().fg(Color::Gray))];
    for (index, tag) in state.tags().iter().enumerate() {
        let active = state.view.selected_tags().contains(tag);
        let mut style = if active {
            Style::default().fg(Color::Black).bg(Color::Cyan)
        } else {
            Style::default().fg(Color::Gray)
        };
        if state.input_mode == InputMode::Tags && index == state.tag_cursor {
            style = style.add_modifier(Modifier::UNDERLINED | Modifier::BOLD);
        }
        tag_spans.push(Span::styled(title_case_tag(tag), style));
        tag_spans.push(Span::raw(" "));
    }

    Paragraph::new(vec![controls, Line::from(tag_spans)])
        .block(Block::default().borders(Borders::BOTTOM))
}

fn draw_cards(frame: &mut ratatui::Frame, state: &BrowserState, area: Rect) {
    let page = state.page();
    let items = page
        .items
        .iter()
        .map(|item| {
            let mut spans = vec![Span::styled(
                item.title.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            )];
            spans.push(Span::styled(
                format!("  {}", item.id),
                Style::default().fg(Color::Gray),
            ));
            if let Some(population) = item.population {
                spans.push(Span::styled(
                    format!("  pop {}", format_population(population)),
                    Style::default().fg(Color::Gray),
                ));
            }
            ListItem::new(Line::from(spans))
        })
        .collect::<Vec<_>>();

    let title = format!("{} results", page.total);
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");
    let mut list_state = ListState::default();
    if !page.items.is_empty() {
        list_state.select(Some(state.selected.min(page.items.len() - 1)));
    }
    frame.render_stateful_widget(list, area, &mut list_state);
}

fn draw_details(state: &BrowserState) -> Paragraph<'static> {
    let block = Block::default().borders(Borders::ALL).title("Details");
    let Some(item) = state.selected_item() else {
        let message = if state.load.loading {
            "Loading…"
        } else {
            "No matching items."
        };
        return Paragraph::new(message).block(block);
    };

    let label = |text: &'static str| Span::styled(text, Style::default().fg(Color::Gray));
    let mut lines = vec![
        Line::from(Span::styled(
            item.title.clone(),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(vec![label("ID: "), Span::raw(item.id.clone())]),
        Line::from(vec![label("Author: "), Span::raw(item.author.clone())]),
    ];
    if state.kind.has_population() {
        let population = item
            .population
            .map(format_population)
            .unwrap_or_else(|| "Unknown".to_string());
        lines.push(Line::from(vec![label("Population: "), Span::raw(population)]));
    }
    let tags = item
        .tags
        .iter()
        .map(|tag| title_case_tag(tag))
        .collect::<Vec<_>>()
        .join(", ");
    lines.push(Line::from(vec![label("Tags: "), Span::raw(tags)]));
    lines.push(Line::from(""));
    lines.push(Line::from(item.description.clone()));
    lines.push(Line::from(""));

    let image_index = state
        .image_index_by_id
        .get(&item.id)
        .copied()
        .unwrap_or(0);
    let image = match state.image_display() {
        ImageDisplay::Candidate(url) => url.to_string(),
        ImageDisplay::Placeholder => "(no preview)".to_string(),
    };
    lines.push(Line::from(vec![
        label("Image: "),
        Span::raw(format!(
            "{}/{} ",
            (image_index + 1).min(item.images.len()),
            item.images.len()
        )),
        Span::raw(image),
    ]));
    if let Some(url) = &item.download_url {
        lines.push(Line::from(vec![label("Download: "), Span::raw(url.clone())]));
    }

    if state.show_fields {
        lines.push(Line::from(""));
        lines.push(Line::from(label("All manifest fields")));
        for field in &item.fields {
            lines.push(Line::from(vec![
                Span::styled(format!("{}: ", field.key), Style::default().fg(Color::Gray)),
                Span::raw(field.value.clone()),
            ]));
        }
    }

    Paragraph::new(lines).block(block).wrap(Wrap { trim: true })
}

fn draw_footer(state: &BrowserState) -> Paragraph<'static> {
    let page = state.page();
    let hints = match state.input_mode {
        InputMode::Search => "type to search · Enter/Esc done",
        InputMode::Tags => "←/→ move · Space toggle · c clear · Esc done",
        InputMode::Normal => {
            "/ search · t tags · s sort · p page size · ←/→ page · [ ] image · m mirror · Enter fields · d download · r reload · q quit"
        }
    };
    Paragraph::new(vec![
        Line::from(format!("Page {} of {}", page.safe_page, page.total_pages)),
        Line::from(Span::styled(hints, Style::default().fg(Color::Gray))),
    ])
    .block(Block::default().borders(Borders::TOP))
}

fn format_population(value: f64) -> String {
    let rounded = value.round() as i64;
    let digits = rounded.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if rounded < 0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

#[cfg(test)]
mod tests {
    use crossterm::event::KeyModifiers;

    use super::*;
    use crate::domain::PageSize;
    use crate::registry::RegistryLoad;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn item(id: &str, tags: &[&str], images: usize) -> CanonicalItem {
        CanonicalItem {
            id: id.to_string(),
            title: id.to_uppercase(),
            description: String::new(),
            author: "someone".to_string(),
            tags: tags.iter().map(|tag| tag.to_string()).collect(),
            population: None,
            images: (0..images)
                .map(|i| vec![format!("https://a.test/{id}/{i}"), format!("https://b.test/{id}/{i}")])
                .collect(),
            download_url: (id == "alpha").then(|| "https://x.test/alpha.zip".to_string()),
            fields: Vec::new(),
        }
    }

    fn loaded_state(items: Vec<CanonicalItem>) -> BrowserState {
        let mut state = BrowserState::new(RegistryKind::Maps, ViewState::new(PageSize::Small));
        state.begin_load();
        state.finish_load(Ok(LoadOutcome::Loaded(RegistryLoad {
            kind: RegistryKind::Maps,
            listed: items.len(),
            skipped: Vec::new(),
            items,
            loaded_at: String::new(),
        })));
        state
    }

    #[test]
    fn typing_in_search_mode_filters_and_resets_page() {
        let items = (0..12).map(|i| item(&format!("map{i}"), &[], 0)).collect();
        let mut state = loaded_state(items);
        state.handle_key(key(KeyCode::Right));
        assert_eq!(state.view_state().page(), 2);

        state.handle_key(key(KeyCode::Char('/')));
        state.handle_key(key(KeyCode::Char('1')));
        assert_eq!(state.view_state().query(), "1");
        assert_eq!(state.view_state().page(), 1);
        // map1, map10, map11
        assert_eq!(state.page().total, 3);

        state.handle_key(key(KeyCode::Enter));
        assert_eq!(state.handle_key(key(KeyCode::Char('q'))), BrowserAction::Quit);
    }

    #[test]
    fn tag_mode_toggles_tags_with_and_semantics() {
        let mut state = loaded_state(vec![
            item("alpha", &["coastal", "us"], 0),
            item("beta", &["us"], 0),
        ]);
        state.handle_key(key(KeyCode::Char('t')));
        state.handle_key(key(KeyCode::Char(' ')));
        assert_eq!(state.view_state().selected_tags(), ["coastal"]);
        state.handle_key(key(KeyCode::Right));
        state.handle_key(key(KeyCode::Enter));
        assert_eq!(state.page().total, 1);
        state.handle_key(key(KeyCode::Char('c')));
        assert_eq!(state.page().total, 2);
    }

    #[test]
    fn image_carousel_and_mirror_fallback() {
        let mut state = loaded_state(vec![item("alpha", &[], 2)]);
        assert_eq!(
            state.image_display(),
            ImageDisplay::Candidate("https://a.test/alpha/0")
        );
        state.handle_key(key(KeyCode::Char('m')));
        assert_eq!(
            state.image_display(),
            ImageDisplay::Candidate("https://b.test/alpha/0")
        );
        state.handle_key(key(KeyCode::Char('m')));
        assert_eq!(state.image_display(), ImageDisplay::Placeholder);

        state.handle_key(key(KeyCode::Char(']')));
        assert_eq!(
            state.image_display(),
            ImageDisplay::Candidate("https://a.test/alpha/1")
        );
        state.handle_key(key(KeyCode::Char(']')));
        assert_eq!(
            state.image_display(),
            ImageDisplay::Candidate("https://a.test/alpha/0")
        );
    }

    #[test]
    fn download_requires_a_link() {
        let mut state = loaded_state(vec![item("alpha", &[], 0), item("beta", &[], 0)]);
        assert_eq!(
            state.handle_key(key(KeyCode::Char('d'))),
            BrowserAction::Download("alpha".to_string())
        );
        state.handle_key(key(KeyCode::Down));
        assert_eq!(state.handle_key(key(KeyCode::Char('d'))), BrowserAction::None);
    }

    #[test]
    fn sort_cycle_skips_population_for_mods() {
        let mut state = BrowserState::new(RegistryKind::Mods, ViewState::default());
        for _ in 0..4 {
            state.handle_key(key(KeyCode::Char('s')));
            assert!(!state.view_state().sort_key().is_population());
        }
        assert_eq!(state.view_state().sort_key(), SortKey::NameAsc);
    }

    #[test]
    fn population_is_grouped() {
        assert_eq!(format_population(8_336_817.0), "8,336,817");
        assert_eq!(format_population(950.0), "950");
    }
}
