use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Bar, BarChart, BarGroup, Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use status_tracker::{
    export_view, DashboardOverview, EntityKey, EntityListView, GoLiveConfirmation, GoLiveForm,
    ListKind, LoadState, Notice, NoticeKind, OverviewView, RemoteStore, Status, StatusBus,
    StatusChangeEvent, StatusChartView, StatusController, StatusCounts, TransitionOutcome,
};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::sync::Mutex as AsyncMutex;

const TICK: Duration = Duration::from_millis(100);
const NOTICE_TTL: Duration = Duration::from_secs(4);

// ============================================================================
// PAGES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    List(ListKind),
    Chart,
}

impl Page {
    pub const ALL: [Page; 5] = [
        Page::List(ListKind::Billers),
        Page::List(ListKind::Top50Billers),
        Page::List(ListKind::UnavailableIsp),
        Page::List(ListKind::UnavailableMfi),
        Page::Chart,
    ];

    fn index(&self) -> usize {
        Self::ALL.iter().position(|p| p == self).unwrap_or(0)
    }

    pub fn next(&self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    pub fn previous(&self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }

    pub fn title(&self) -> &'static str {
        match self {
            Page::List(list) => list.title(),
            Page::Chart => "Status Chart",
        }
    }
}

// ============================================================================
// THEME
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    pub dark: bool,
}

impl Default for Theme {
    fn default() -> Self {
        Theme { dark: true }
    }
}

impl Theme {
    pub fn toggle(&mut self) {
        self.dark = !self.dark;
    }

    fn background(&self) -> Color {
        if self.dark { Color::Black } else { Color::White }
    }

    fn text(&self) -> Color {
        if self.dark { Color::White } else { Color::Black }
    }

    fn muted(&self) -> Color {
        if self.dark { Color::DarkGray } else { Color::Gray }
    }

    fn accent(&self) -> Color {
        if self.dark { Color::Yellow } else { Color::Blue }
    }

    fn border(&self) -> Color {
        if self.dark { Color::Cyan } else { Color::Blue }
    }

    fn highlight(&self) -> Style {
        Style::default()
            .bg(if self.dark { Color::DarkGray } else { Color::Gray })
            .add_modifier(Modifier::BOLD)
    }
}

fn status_color(status: Status) -> Color {
    match status {
        Status::NotStarted => Color::Red,
        Status::InProgress => Color::Yellow,
        Status::GoLive => Color::Green,
    }
}

// ============================================================================
// INPUT MODES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DateField {
    Integration,
    Onboarding,
}

/// Confirmation step for the terminal transition
#[derive(Debug, Clone)]
pub struct GoLiveModal {
    confirmation: GoLiveConfirmation,
    form: GoLiveForm,
    field: DateField,
    error: Option<String>,
    submitting: bool,
}

impl GoLiveModal {
    fn new(confirmation: GoLiveConfirmation) -> Self {
        GoLiveModal {
            confirmation,
            form: GoLiveForm::default(),
            field: DateField::Integration,
            error: None,
            submitting: false,
        }
    }

    fn toggle_field(&mut self) {
        self.field = match self.field {
            DateField::Integration => DateField::Onboarding,
            DateField::Onboarding => DateField::Integration,
        };
    }

    fn field_mut(&mut self) -> &mut String {
        match self.field {
            DateField::Integration => &mut self.form.integration_date,
            DateField::Onboarding => &mut self.form.onboarding_date,
        }
    }
}

#[derive(Debug, Clone)]
pub enum InputMode {
    Normal,
    Search(String),
    GoLive(GoLiveModal),
}

// ============================================================================
// BACKGROUND RESULTS
// ============================================================================

/// Chart state copied out of the async side for rendering
#[derive(Debug, Clone, Default)]
pub struct ChartSnapshot {
    pub categories: Vec<String>,
    pub selected: String,
    pub counts: Option<StatusCounts>,
    pub error: Option<String>,
}

enum UiMessage {
    Loaded(ListKind, std::result::Result<usize, String>),
    Transition(std::result::Result<TransitionOutcome, String>),
    GoLiveCommitted(std::result::Result<StatusChangeEvent, String>),
    Chart(ChartSnapshot),
    Overview(std::result::Result<DashboardOverview, String>),
}

// ============================================================================
// APP
// ============================================================================

pub struct App {
    runtime: Handle,
    store: Arc<dyn RemoteStore>,
    controller: Arc<StatusController>,
    views: Vec<Arc<EntityListView>>,
    table_states: Vec<TableState>,
    chart: Arc<AsyncMutex<StatusChartView>>,
    chart_snapshot: ChartSnapshot,
    chart_refreshing: bool,
    overview: OverviewView,
    overview_error: Option<String>,
    pub current_page: Page,
    pub input: InputMode,
    pub theme: Theme,
    notice: Option<(Notice, Instant)>,
    export_dir: PathBuf,
    tx: UnboundedSender<UiMessage>,
    rx: UnboundedReceiver<UiMessage>,
    pub should_quit: bool,
}

fn list_index(list: ListKind) -> usize {
    ListKind::ALL.iter().position(|l| *l == list).unwrap_or(0)
}

impl App {
    pub fn new(runtime: Handle, store: Arc<dyn RemoteStore>, export_dir: PathBuf) -> Self {
        let bus = StatusBus::new();
        let controller = Arc::new(StatusController::new(Arc::clone(&store), bus.clone()));

        // Every list stays mounted for the session so cross-view sync is visible
        let views = ListKind::ALL
            .iter()
            .map(|list| Arc::new(EntityListView::mount(*list, &bus, Arc::clone(&store))))
            .collect();
        let table_states = ListKind::ALL.iter().map(|_| TableState::default()).collect();
        let chart = StatusChartView::mount(&bus, Arc::clone(&store), false);
        let (tx, rx) = unbounded_channel();

        Self {
            runtime,
            store,
            controller,
            views,
            table_states,
            chart: Arc::new(AsyncMutex::new(chart)),
            chart_snapshot: ChartSnapshot::default(),
            chart_refreshing: false,
            overview: OverviewView::new(),
            overview_error: None,
            current_page: Page::List(ListKind::Billers),
            input: InputMode::Normal,
            theme: Theme::default(),
            notice: None,
            export_dir,
            tx,
            rx,
            should_quit: false,
        }
    }

    fn view(&self, list: ListKind) -> &Arc<EntityListView> {
        &self.views[list_index(list)]
    }

    fn current_list(&self) -> Option<ListKind> {
        match self.current_page {
            Page::List(list) => Some(list),
            Page::Chart => None,
        }
    }

    /// Kick off the initial fetches
    pub fn start(&mut self) {
        for list in ListKind::ALL {
            self.spawn_load(list);
        }
        self.spawn_chart_refresh(false);
        self.spawn_overview();
    }

    fn flash(&mut self, kind: NoticeKind, message: impl Into<String>) {
        let message = message.into();
        self.notice = Some((Notice { kind, message }, Instant::now()));
    }

    // ------------------------------------------------------------------------
    // Background work
    // ------------------------------------------------------------------------

    fn spawn_load(&self, list: ListKind) {
        let view = Arc::clone(self.view(list));
        let tx = self.tx.clone();
        self.runtime.spawn(async move {
            let result = view.load().await.map_err(|e| e.to_string());
            let _ = tx.send(UiMessage::Loaded(list, result));
        });
    }

    fn spawn_search(&self, list: ListKind, query: String) {
        let view = Arc::clone(self.view(list));
        let tx = self.tx.clone();
        self.runtime.spawn(async move {
            let result = view.search(&query).await.map_err(|e| e.to_string());
            let _ = tx.send(UiMessage::Loaded(list, result));
        });
    }

    fn spawn_chart_refresh(&mut self, cycle: bool) {
        if self.chart_refreshing {
            return;
        }
        self.chart_refreshing = true;

        let chart = Arc::clone(&self.chart);
        let tx = self.tx.clone();
        self.runtime.spawn(async move {
            let mut chart = chart.lock().await;
            let result: status_tracker::Result<StatusCounts> = async {
                if chart.categories().len() <= 1 {
                    chart.load_categories().await?;
                }
                if cycle {
                    chart.cycle_category();
                }
                chart.refresh().await
            }
            .await;

            let snapshot = ChartSnapshot {
                categories: chart.categories().to_vec(),
                selected: chart.selected_category().to_string(),
                counts: chart.counts(),
                error: result.err().map(|e| e.to_string()),
            };
            let _ = tx.send(UiMessage::Chart(snapshot));
        });
    }

    fn spawn_overview(&self) {
        let store = Arc::clone(&self.store);
        let tx = self.tx.clone();
        self.runtime.spawn(async move {
            let result = store.dashboard_overview().await.map_err(|e| e.to_string());
            let _ = tx.send(UiMessage::Overview(result));
        });
    }

    /// Use the overview a go_live commit carried; fetch only if none came back
    fn sync_overview(&mut self) {
        match self.controller.take_dashboard() {
            Some(overview) => {
                self.overview.replace(overview);
                self.overview_error = None;
            }
            None => self.spawn_overview(),
        }
    }

    fn request_transition(&mut self, target: Status) {
        let Some(list) = self.current_list() else {
            return;
        };
        let Some(key) = self.selected_key(list) else {
            return;
        };
        if self.controller.is_in_flight(key) {
            self.flash(NoticeKind::Error, "An update for this row is already in progress");
            return;
        }

        let controller = Arc::clone(&self.controller);
        let view = Arc::clone(self.view(list));
        let tx = self.tx.clone();
        self.runtime.spawn(async move {
            let result = controller
                .request_transition(&view, key, target)
                .await
                .map_err(|e| e.to_string());
            let _ = tx.send(UiMessage::Transition(result));
        });
    }

    fn spawn_confirm(&self, confirmation: GoLiveConfirmation, form: GoLiveForm) {
        let controller = Arc::clone(&self.controller);
        let view = Arc::clone(self.view(confirmation.list));
        let tx = self.tx.clone();
        self.runtime.spawn(async move {
            let result = controller
                .confirm_go_live(&view, &confirmation, &form)
                .await
                .map_err(|e| e.to_string());
            let _ = tx.send(UiMessage::GoLiveCommitted(result));
        });
    }

    fn export_current(&mut self) {
        let Some(list) = self.current_list() else {
            return;
        };
        match export_view(self.view(list), &self.export_dir) {
            Ok(path) => self.flash(NoticeKind::Success, format!("Exported to {}", path.display())),
            Err(e) => self.flash(NoticeKind::Error, format!("Export failed: {}", e)),
        }
    }

    // ------------------------------------------------------------------------
    // Per-tick housekeeping
    // ------------------------------------------------------------------------

    pub fn tick(&mut self) {
        while let Ok(message) = self.rx.try_recv() {
            self.handle_message(message);
        }

        // Notices raised by views (commit success / failure)
        let raised: Vec<Notice> = self.views.iter().filter_map(|v| v.take_notice()).collect();
        if let Some(last) = raised.into_iter().last() {
            self.notice = Some((last, Instant::now()));
        }

        if let Some((_, at)) = &self.notice {
            if at.elapsed() > NOTICE_TTL {
                self.notice = None;
            }
        }

        if self.current_page == Page::Chart && !self.chart_refreshing {
            let stale = self.chart.try_lock().map(|c| c.is_stale()).unwrap_or(false);
            if stale {
                self.spawn_chart_refresh(false);
            }
        }
    }

    fn handle_message(&mut self, message: UiMessage) {
        match message {
            UiMessage::Loaded(list, Ok(count)) => {
                tracing::debug!(list = list.route(), count, "ui: list loaded");
                self.clamp_selection(list);
            }
            UiMessage::Loaded(list, Err(e)) => {
                self.clamp_selection(list);
                if self.current_list() == Some(list) {
                    self.flash(NoticeKind::Error, e);
                }
            }
            UiMessage::Transition(Ok(TransitionOutcome::Committed(_))) => {
                if let Some(overview) = self.controller.take_dashboard() {
                    self.overview.replace(overview);
                }
            }
            UiMessage::Transition(Ok(TransitionOutcome::ConfirmationRequired(confirmation))) => {
                self.input = InputMode::GoLive(GoLiveModal::new(confirmation));
            }
            UiMessage::Transition(Err(e)) => self.flash(NoticeKind::Error, e),
            UiMessage::GoLiveCommitted(Ok(_)) => {
                if let InputMode::GoLive(modal) = &self.input {
                    self.current_page = Page::List(modal.confirmation.list);
                    self.input = InputMode::Normal;
                }
                self.sync_overview();
            }
            UiMessage::GoLiveCommitted(Err(e)) => match &mut self.input {
                InputMode::GoLive(modal) => {
                    modal.submitting = false;
                    modal.error = Some(e);
                }
                _ => self.flash(NoticeKind::Error, e),
            },
            UiMessage::Chart(snapshot) => {
                self.chart_refreshing = false;
                self.chart_snapshot = snapshot;
            }
            UiMessage::Overview(Ok(overview)) => {
                self.overview.replace(overview);
                self.overview_error = None;
            }
            UiMessage::Overview(Err(e)) => self.overview_error = Some(e),
        }
    }

    // ------------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------------

    fn selected_key(&self, list: ListKind) -> Option<EntityKey> {
        let i = self.table_states[list_index(list)].selected()?;
        self.view(list).rows().get(i).map(|e| e.key())
    }

    fn clamp_selection(&mut self, list: ListKind) {
        let len = self.view(list).rows().len();
        let state = &mut self.table_states[list_index(list)];
        match (len, state.selected()) {
            (0, _) => state.select(None),
            (_, Some(i)) if i >= len => state.select(Some(len - 1)),
            (_, None) => state.select(Some(0)),
            _ => {}
        }
    }

    fn move_selection(&mut self, delta: isize) {
        let Some(list) = self.current_list() else {
            return;
        };
        let len = self.view(list).rows().len();
        if len == 0 {
            return;
        }
        let state = &mut self.table_states[list_index(list)];
        let current = state.selected().unwrap_or(0) as isize;
        let next = if delta.abs() == 1 {
            // Single steps wrap, page jumps clamp
            (current + delta).rem_euclid(len as isize)
        } else {
            (current + delta).clamp(0, len as isize - 1)
        };
        state.select(Some(next as usize));
    }

    fn select_edge(&mut self, last: bool) {
        let Some(list) = self.current_list() else {
            return;
        };
        let len = self.view(list).rows().len();
        if len > 0 {
            self.table_states[list_index(list)].select(Some(if last { len - 1 } else { 0 }));
        }
    }

    // ------------------------------------------------------------------------
    // Keys
    // ------------------------------------------------------------------------

    pub fn handle_key(&mut self, key: KeyEvent) {
        match self.input {
            InputMode::Normal => self.handle_normal_key(key),
            InputMode::Search(_) => self.handle_search_key(key),
            InputMode::GoLive(_) => self.handle_modal_key(key),
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent) {
        let on_list = self.current_list();
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Tab => self.current_page = self.current_page.next(),
            KeyCode::BackTab => self.current_page = self.current_page.previous(),
            KeyCode::Down | KeyCode::Char('j') => self.move_selection(1),
            KeyCode::Up | KeyCode::Char('k') => self.move_selection(-1),
            KeyCode::PageDown => self.move_selection(20),
            KeyCode::PageUp => self.move_selection(-20),
            KeyCode::Home => self.select_edge(false),
            KeyCode::End => self.select_edge(true),
            KeyCode::Char('1') => self.request_transition(Status::NotStarted),
            KeyCode::Char('2') => self.request_transition(Status::InProgress),
            KeyCode::Char('3') => self.request_transition(Status::GoLive),
            KeyCode::Char('t') => self.theme.toggle(),
            KeyCode::Char('/') => {
                if let Some(list) = on_list {
                    self.input = InputMode::Search(self.view(list).filter());
                }
            }
            KeyCode::Char('e') => self.export_current(),
            KeyCode::Char('r') => match on_list {
                Some(list) => self.spawn_load(list),
                None => {
                    self.spawn_chart_refresh(false);
                    self.spawn_overview();
                }
            },
            KeyCode::Char('c') => match on_list {
                Some(list) => self.spawn_search(list, String::new()),
                None => self.spawn_chart_refresh(true),
            },
            _ => {}
        }
    }

    fn handle_search_key(&mut self, key: KeyEvent) {
        let InputMode::Search(query) = &mut self.input else {
            return;
        };
        match key.code {
            KeyCode::Esc => self.input = InputMode::Normal,
            KeyCode::Backspace => {
                query.pop();
            }
            KeyCode::Char(c) => query.push(c),
            KeyCode::Enter => {
                let query = std::mem::take(query);
                self.input = InputMode::Normal;
                if let Some(list) = self.current_list() {
                    self.spawn_search(list, query);
                }
            }
            _ => {}
        }
    }

    fn handle_modal_key(&mut self, key: KeyEvent) {
        let InputMode::GoLive(modal) = &mut self.input else {
            return;
        };
        if modal.submitting {
            return;
        }

        match key.code {
            KeyCode::Esc => {
                if let InputMode::GoLive(modal) = std::mem::replace(&mut self.input, InputMode::Normal) {
                    let name = modal.confirmation.name.clone();
                    let list = self.controller.cancel_go_live(modal.confirmation);
                    self.current_page = Page::List(list);
                    self.flash(NoticeKind::Success, format!("Go-live for {} cancelled", name));
                }
            }
            KeyCode::Tab | KeyCode::BackTab => modal.toggle_field(),
            KeyCode::Backspace => {
                modal.field_mut().pop();
            }
            KeyCode::Char(c) if c.is_ascii_digit() || c == '-' => {
                let field = modal.field_mut();
                if field.len() < 10 {
                    field.push(c);
                }
            }
            KeyCode::Enter => match modal.form.validate() {
                Err(e) => modal.error = Some(e.to_string()),
                Ok(_) => {
                    modal.error = None;
                    modal.submitting = true;
                    let confirmation = modal.confirmation.clone();
                    let form = modal.form.clone();
                    self.spawn_confirm(confirmation, form);
                }
            },
            _ => {}
        }
    }
}

// ============================================================================
// LOOP
// ============================================================================

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("Error: {:?}", err);
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    app.start();
    loop {
        app.tick();
        terminal.draw(|f| ui(f, app))?;

        if event::poll(TICK)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key);
                }
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

// ============================================================================
// RENDERING
// ============================================================================

fn ui(f: &mut Frame, app: &mut App) {
    let theme = app.theme;
    let size = f.size();
    f.render_widget(
        Block::default().style(Style::default().bg(theme.background()).fg(theme.text())),
        size,
    );

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with navigation
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar
        ])
        .split(size);

    render_header(f, chunks[0], app);

    match app.current_page {
        Page::List(list) => render_list(f, chunks[1], app, list),
        Page::Chart => render_chart(f, chunks[1], app),
    }

    render_status_bar(f, chunks[2], app);

    if let InputMode::GoLive(modal) = &app.input {
        render_modal(f, size, modal, theme);
    }
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let theme = app.theme;
    let mut tab_spans = vec![];
    for (i, page) in Page::ALL.iter().enumerate() {
        if i > 0 {
            tab_spans.push(Span::raw(" │ "));
        }

        let style = if *page == app.current_page {
            Style::default()
                .fg(theme.accent())
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(theme.muted())
        };

        tab_spans.push(Span::styled(page.title(), style));
    }

    let header = Paragraph::new(vec![Line::from(tab_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.border()))
            .title(format!(" Status Tracker v{} ", status_tracker::VERSION)),
    );

    f.render_widget(header, area);
}

fn render_list(f: &mut Frame, area: Rect, app: &mut App, list: ListKind) {
    let theme = app.theme;
    let view = Arc::clone(app.view(list));
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.text()))
        .title(format!(" {} ", list.title()));

    match view.load_state() {
        LoadState::Idle | LoadState::Loading => {
            let loading = Paragraph::new(format!("  Loading {}...", list.title().to_lowercase()))
                .style(Style::default().fg(theme.muted()))
                .block(block);
            f.render_widget(loading, area);
            return;
        }
        LoadState::Failed(message) => {
            let failed = Paragraph::new(vec![
                Line::from(""),
                Line::from(Span::styled(
                    format!("  {}", message),
                    Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                )),
                Line::from(""),
                Line::from(vec![
                    Span::styled("  Press ", Style::default().fg(theme.muted())),
                    Span::styled("r", Style::default().fg(theme.accent())),
                    Span::styled(" to retry", Style::default().fg(theme.muted())),
                ]),
            ])
            .block(block);
            f.render_widget(failed, area);
            return;
        }
        LoadState::Ready => {}
    }

    let header_cells = ["ID", "Name", "Type", "Category", "Status", "Web", "Top 50"]
        .iter()
        .map(|h| {
            Cell::from(*h).style(
                Style::default()
                    .fg(theme.accent())
                    .add_modifier(Modifier::BOLD),
            )
        });

    let header = Row::new(header_cells)
        .style(Style::default().bg(theme.muted()))
        .height(1);

    let controller = Arc::clone(&app.controller);
    let entities = view.rows();
    let rows = entities.iter().map(|entity| {
        let status = if controller.is_in_flight(entity.key()) {
            Cell::from(format!("{} …", entity.status.label())).style(Style::default().fg(theme.muted()))
        } else {
            Cell::from(entity.status.label()).style(Style::default().fg(status_color(entity.status)))
        };

        let cells = vec![
            Cell::from(entity.id.to_string()),
            Cell::from(truncate(&entity.name, 30)),
            Cell::from(entity.kind().as_str()),
            Cell::from(truncate(entity.category.as_deref().unwrap_or("-"), 16)),
            status,
            Cell::from(truncate(&entity.web_url().unwrap_or_default(), 34)),
            Cell::from(if entity.is_top_50 { "★" } else { "" }),
        ];

        Row::new(cells).height(1)
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(6),
            Constraint::Length(32),
            Constraint::Length(7),
            Constraint::Length(18),
            Constraint::Length(15),
            Constraint::Length(36),
            Constraint::Length(7),
        ],
    )
    .header(header)
    .block(block)
    .highlight_style(theme.highlight())
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.table_states[list_index(list)]);
}

fn render_chart(f: &mut Frame, area: Rect, app: &App) {
    let theme = app.theme;
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);

    // Bars per status for the selected category
    let snapshot = &app.chart_snapshot;
    let counts = snapshot.counts.unwrap_or_default();
    let bars: Vec<Bar> = counts
        .bars()
        .into_iter()
        .map(|(status, label, value)| {
            Bar::default()
                .value(value.max(0) as u64)
                .label(Line::from(label))
                .style(Style::default().fg(status_color(status)))
                .value_style(Style::default().fg(Color::Black).bg(status_color(status)))
        })
        .collect();

    let title = match &snapshot.error {
        Some(e) => format!(" Status by category: {} (error: {}) ", snapshot.selected, e),
        None => format!(" Status by category: {} ", snapshot.selected),
    };

    let chart = BarChart::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.text()))
                .title(title),
        )
        .data(BarGroup::default().bars(&bars))
        .bar_width(13)
        .bar_gap(4);

    f.render_widget(chart, chunks[0]);
    render_overview(f, chunks[1], app);
}

fn render_overview(f: &mut Frame, area: Rect, app: &App) {
    let theme = app.theme;
    let label = |text: &'static str| {
        Span::styled(text, Style::default().fg(theme.border()).add_modifier(Modifier::BOLD))
    };

    let mut content = vec![Line::from("")];
    match (app.overview.overview(), &app.overview_error) {
        (Some(overview), _) => {
            let trend = overview.trend.unwrap_or_default();
            content.extend([
                Line::from(vec![
                    label("  Target Count:     "),
                    Span::raw(format!("{} ({:+})", overview.target_count, trend.target_count)),
                ]),
                Line::from(""),
                Line::from(vec![
                    label("  Unavailable ISP:  "),
                    Span::raw(format!("{} ({:+})", overview.unavailable_isp, trend.unavailable_isp)),
                ]),
                Line::from(""),
                Line::from(vec![
                    label("  Unavailable MFI:  "),
                    Span::raw(format!("{} ({:+})", overview.unavailable_mfi, trend.unavailable_mfi)),
                ]),
                Line::from(""),
                Line::from(vec![
                    label("  Updated:          "),
                    Span::styled(
                        overview
                            .last_updated
                            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                            .unwrap_or_else(|| "-".to_string()),
                        Style::default().fg(theme.muted()),
                    ),
                ]),
            ]);
        }
        (None, Some(error)) => content.push(Line::from(Span::styled(
            format!("  {}", error),
            Style::default().fg(Color::Red),
        ))),
        (None, None) => content.push(Line::from(Span::styled(
            "  Loading overview...",
            Style::default().fg(theme.muted()),
        ))),
    }

    let paragraph = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.text()))
            .title(" Dashboard Overview "),
    );

    f.render_widget(paragraph, area);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let theme = app.theme;
    let key = |k: &'static str| Span::styled(k, Style::default().fg(theme.accent()));
    let mut status_spans = vec![];

    if let InputMode::Search(query) = &app.input {
        status_spans.push(Span::styled(" Search: ", Style::default().fg(theme.border())));
        status_spans.push(Span::raw(format!("{}▏", query)));
        status_spans.push(Span::raw("  | "));
        status_spans.push(key("Enter"));
        status_spans.push(Span::raw(" Apply | "));
        status_spans.push(key("Esc"));
        status_spans.push(Span::raw(" Cancel"));
    } else if let Some((notice, _)) = &app.notice {
        let color = match notice.kind {
            NoticeKind::Success => Color::Green,
            NoticeKind::Error => Color::Red,
        };
        status_spans.push(Span::styled(
            format!(" {} ", notice.message),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ));
    } else {
        if let Some(list) = app.current_list() {
            let view = app.view(list);
            let selected = app.table_states[list_index(list)]
                .selected()
                .map(|i| i + 1)
                .unwrap_or(0);
            let counts = view.counts();
            status_spans.push(Span::styled(
                format!(" Row: {}/{} ", selected, counts.total()),
                Style::default().fg(theme.border()),
            ));
            for (status, label, value) in counts.bars() {
                status_spans.push(Span::styled(
                    format!(" {}: {}", label, value),
                    Style::default().fg(status_color(status)),
                ));
            }
            let filter = view.filter();
            if !filter.trim().is_empty() {
                status_spans.push(Span::raw(" | "));
                status_spans.push(Span::styled(
                    format!("Filter: {}", filter),
                    Style::default().fg(Color::Green),
                ));
            }
            status_spans.push(Span::raw(" | "));
            status_spans.push(key("1/2/3"));
            status_spans.push(Span::raw(" Status | "));
            status_spans.push(key("/"));
            status_spans.push(Span::raw(" Search | "));
            status_spans.push(key("e"));
            status_spans.push(Span::raw(" Export | "));
        } else {
            status_spans.push(key(" c"));
            status_spans.push(Span::raw(" Category | "));
        }
        status_spans.push(key("r"));
        status_spans.push(Span::raw(" Refresh | "));
        status_spans.push(key("t"));
        status_spans.push(Span::raw(" Theme | "));
        status_spans.push(key("Tab"));
        status_spans.push(Span::raw(" Page | "));
        status_spans.push(Span::styled("q", Style::default().fg(Color::Red)));
        status_spans.push(Span::raw(" Quit"));
    }

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.text())),
    );

    f.render_widget(status_bar, area);
}

fn render_modal(f: &mut Frame, area: Rect, modal: &GoLiveModal, theme: Theme) {
    let area = centered_rect(60, 45, area);
    f.render_widget(Clear, area);

    let field_line = |label: &'static str, value: &str, active: bool| {
        let style = if active {
            Style::default().fg(theme.accent()).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(theme.text())
        };
        Line::from(vec![
            Span::styled(label, Style::default().fg(theme.border())),
            Span::styled(
                format!("[{:<10}]{}", value, if active { "◂" } else { " " }),
                style,
            ),
        ])
    };

    let mut content = vec![
        Line::from(""),
        Line::from(vec![
            Span::raw("  Mark "),
            Span::styled(
                modal.confirmation.name.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw(" as "),
            Span::styled("Go Live", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)),
            Span::raw(format!(" (currently {})", modal.confirmation.previous.label())),
        ]),
        Line::from(""),
        field_line(
            "  Integration date: ",
            &modal.form.integration_date,
            modal.field == DateField::Integration,
        ),
        field_line(
            "  Onboarding date:  ",
            &modal.form.onboarding_date,
            modal.field == DateField::Onboarding,
        ),
        Line::from(""),
    ];

    if let Some(error) = &modal.error {
        content.push(Line::from(Span::styled(
            format!("  {}", error),
            Style::default().fg(Color::Red),
        )));
        content.push(Line::from(""));
    }

    content.push(if modal.submitting {
        Line::from(Span::styled("  Saving...", Style::default().fg(theme.muted())))
    } else {
        Line::from(Span::styled(
            "  YYYY-MM-DD · Tab switch field · Enter confirm · Esc cancel",
            Style::default().fg(theme.muted()).add_modifier(Modifier::ITALIC),
        ))
    });

    let paragraph = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.accent()))
            .style(Style::default().bg(theme.background()))
            .title(" Confirm Go Live "),
    );

    f.render_widget(paragraph, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}
