//! RFID attendance TUI - live scan log with location selection
//!
//! Runs the serial reader in a background task and displays:
//! - Current location, reader status and scan counters
//! - The scan log, re-read from disk on every refresh
//!
//! Keys: s = School, b = Bus Stop, c = clear log, r = reset directions,
//! arrows/PageUp/PageDown/Home/End scroll, q or Esc quits.

use clap::Parser;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction as LayoutDirection, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Row, Table},
    Frame, Terminal,
};
use rfid_attendance::domain::{Direction, Location};
use rfid_attendance::infra::{logging, Config};
use rfid_attendance::io::{LogEntry, LogSnapshot, ReaderExit, SerialReader};
use rfid_attendance::services::{ScanControls, ScanPipeline};
use std::io;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{error, info, warn};

/// How long a status line message stays visible
const STATUS_MESSAGE_TTL: Duration = Duration::from_secs(4);
/// Rows moved by PageUp/PageDown
const PAGE_ROWS: usize = 10;

/// RFID attendance terminal UI
#[derive(Parser, Debug)]
#[command(name = "rfid-attendance-tui", version, about)]
struct Args {
    /// Path to TOML configuration file [default: $CONFIG_FILE or config/dev.toml]
    #[arg(short, long)]
    config: Option<String>,
}

/// Reader task state as seen by the UI
#[derive(Debug, Clone, PartialEq)]
enum ReaderStatus {
    Running,
    Stopped(ReaderExit),
    Failed(String),
}

/// Last log read, replaced wholesale on every refresh
#[derive(Debug)]
enum LogView {
    Missing,
    Entries(Vec<LogEntry>),
    Unreadable(String),
}

struct App {
    controls: ScanControls,
    reader_status: watch::Receiver<ReaderStatus>,
    device: String,
    refresh_interval: Duration,
    log_view: LogView,
    last_refresh: Option<Instant>,
    /// Rows hidden below the visible window; 0 follows the newest scans
    scroll_back: usize,
    status_message: Option<(String, Instant)>,
}

impl App {
    fn refresh_due(&self) -> bool {
        self.last_refresh.map(|t| t.elapsed() >= self.refresh_interval).unwrap_or(true)
    }

    fn refresh_log(&mut self) {
        self.log_view = match self.controls.scan_log.snapshot() {
            Ok(LogSnapshot::Missing) => LogView::Missing,
            Ok(LogSnapshot::Entries(entries)) => LogView::Entries(entries),
            Err(e) => {
                warn!(error = %e, "scan_log_read_failed");
                LogView::Unreadable(e.to_string())
            }
        };
        self.scroll_back = self.scroll_back.min(self.row_count().saturating_sub(1));
        self.last_refresh = Some(Instant::now());
    }

    fn row_count(&self) -> usize {
        match &self.log_view {
            LogView::Entries(entries) => entries.len(),
            _ => 0,
        }
    }

    fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some((message.into(), Instant::now()));
    }

    fn select_location(&mut self, location: Location) {
        self.controls.location.set(location);
        self.set_status(format!("Location set to: {}", location.display_name()));
    }

    fn clear_log(&mut self) {
        match self.controls.clear_log() {
            Ok(()) => self.set_status("Scan log has been cleared."),
            Err(e) => {
                error!(error = %e, "scan_log_clear_failed");
                self.set_status(format!("Failed to clear scan log: {}", e));
            }
        }
        self.refresh_log();
    }

    fn reset_directions(&mut self) {
        self.controls.reset_directions();
        self.set_status("Direction state reset: the next scan of every tag is an arrival.");
    }

    fn scroll_up(&mut self, rows: usize) {
        self.scroll_back = (self.scroll_back + rows).min(self.row_count().saturating_sub(1));
    }

    fn scroll_down(&mut self, rows: usize) {
        self.scroll_back = self.scroll_back.saturating_sub(rows);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config_path = Config::resolve_config_path(args.config.as_deref());
    let loaded = Config::from_file(&config_path);
    let config = match &loaded {
        Ok(config) => config.clone(),
        Err(_) => Config::default(),
    };
    logging::init_file(config.log_file(), config.log_format())?;
    if let Err(e) = loaded {
        warn!(error = %format!("{:#}", e), "config_load_failed_using_defaults");
    }
    info!(
        version = %env!("CARGO_PKG_VERSION"),
        git_hash = %env!("GIT_HASH"),
        config_file = %config.config_file(),
        "rfid_attendance_tui_starting"
    );

    let ScanPipeline { processor, controls } = ScanPipeline::from_config(&config)?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (status_tx, status_rx) = watch::channel(ReaderStatus::Running);

    let reader = SerialReader::new(&config);
    let device = reader.device().to_string();
    let reader_handle = tokio::spawn(async move {
        let mut processor = processor;
        let status = match reader.run(&mut processor, shutdown_rx).await {
            Ok(exit) => {
                info!(exit = ?exit, "serial_reader_stopped");
                ReaderStatus::Stopped(exit)
            }
            Err(e) => {
                error!(error = %e, "serial_reader_failed");
                ReaderStatus::Failed(e.to_string())
            }
        };
        let _ = status_tx.send(status);
    });

    let mut app = App {
        controls,
        reader_status: status_rx,
        device,
        refresh_interval: Duration::from_millis(config.refresh_interval_ms()),
        log_view: LogView::Missing,
        last_refresh: None,
        scroll_back: 0,
        status_message: None,
    };

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_ui(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    let _ = shutdown_tx.send(true);
    if tokio::time::timeout(Duration::from_secs(2), reader_handle).await.is_err() {
        warn!("serial_reader_shutdown_timeout");
    }
    info!(metrics = ?app.controls.metrics.snapshot(), "rfid_attendance_tui_stopped");

    result
}

fn run_ui(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> anyhow::Result<()> {
    let tick_rate = Duration::from_millis(100);

    loop {
        if app.refresh_due() {
            app.refresh_log();
        }
        if app.status_message.as_ref().is_some_and(|(_, at)| at.elapsed() > STATUS_MESSAGE_TTL) {
            app.status_message = None;
        }

        terminal.draw(|f| draw_ui(f, app))?;

        if event::poll(tick_rate)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                        KeyCode::Char('s') => app.select_location(Location::School),
                        KeyCode::Char('b') => app.select_location(Location::Bus),
                        KeyCode::Char('c') => app.clear_log(),
                        KeyCode::Char('r') => app.reset_directions(),
                        KeyCode::Up => app.scroll_up(1),
                        KeyCode::Down => app.scroll_down(1),
                        KeyCode::PageUp => app.scroll_up(PAGE_ROWS),
                        KeyCode::PageDown => app.scroll_down(PAGE_ROWS),
                        KeyCode::Home => app.scroll_up(usize::MAX / 2),
                        KeyCode::End => app.scroll_back = 0,
                        _ => {}
                    }
                }
            }
        }
    }
}

fn draw_ui(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(LayoutDirection::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Length(3), // Location selector
            Constraint::Min(0),    // Scan log
            Constraint::Length(3), // Status line
        ])
        .split(f.area());

    draw_header(f, chunks[0], app);
    draw_location_panel(f, chunks[1], app);
    draw_log_panel(f, chunks[2], app);
    draw_status_line(f, chunks[3], app);
}

fn draw_header(f: &mut Frame, area: Rect, app: &App) {
    let (status_text, status_color) = match &*app.reader_status.borrow() {
        ReaderStatus::Running => (format!("READING {}", app.device), Color::Green),
        ReaderStatus::Stopped(exit) => (format!("STOPPED ({:?})", exit), Color::Yellow),
        ReaderStatus::Failed(reason) => (format!("STOPPED: {}", reason), Color::Red),
    };

    let metrics = app.controls.metrics.snapshot();

    let header = Paragraph::new(Line::from(vec![
        Span::styled("RFID Scanner ", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        Span::raw("| "),
        Span::styled(status_text, Style::default().fg(status_color)),
        Span::raw(" | Scans: "),
        Span::styled(metrics.scans_logged.to_string(), Style::default().fg(Color::Yellow)),
        Span::raw(" | Rejected: "),
        Span::styled(metrics.tags_rejected.to_string(), Style::default().fg(Color::DarkGray)),
        Span::raw(" | Known tags: "),
        Span::raw(app.controls.names.len().to_string()),
    ]))
    .block(Block::default().borders(Borders::ALL));

    f.render_widget(header, area);
}

fn draw_location_panel(f: &mut Frame, area: Rect, app: &App) {
    let current = app.controls.location.current();

    let mut spans = Vec::new();
    for (key, location) in [("s", Location::School), ("b", Location::Bus)] {
        let style = if location == current {
            Style::default().fg(Color::Black).bg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Cyan)
        };
        spans.push(Span::styled(format!(" [{}] {} ", key, location.display_name()), style));
        spans.push(Span::raw("  "));
    }
    spans.push(Span::styled(
        "[c] Clear Scan Log  [r] Reset Directions  [q] Quit",
        Style::default().fg(Color::DarkGray),
    ));

    let panel = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .title(" Location ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Blue)),
    );

    f.render_widget(panel, area);
}

fn direction_color(label: &str) -> Color {
    match Location::from_label(label) {
        Some((_, Direction::Enter)) => Color::Green,
        Some((_, Direction::Exit)) => Color::Yellow,
        None => Color::White,
    }
}

fn draw_log_panel(f: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .title(format!(" Scan Log: {} ", app.controls.scan_log.path().display()))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let entries = match &app.log_view {
        LogView::Missing => {
            f.render_widget(Paragraph::new("No scan log file found.").block(block), area);
            return;
        }
        LogView::Unreadable(reason) => {
            let text = Paragraph::new(Line::from(Span::styled(
                format!("Scan log unreadable: {}", reason),
                Style::default().fg(Color::Red),
            )));
            f.render_widget(text.block(block), area);
            return;
        }
        LogView::Entries(entries) => entries,
    };

    // Borders and the header row take three lines
    let visible = area.height.saturating_sub(3) as usize;
    let end = entries.len().saturating_sub(app.scroll_back);
    let start = end.saturating_sub(visible);

    let rows: Vec<Row> = entries[start..end]
        .iter()
        .map(|e| {
            Row::new(vec![e.timestamp.clone(), e.tag.clone(), e.name.clone(), e.direction.clone()])
                .style(Style::default().fg(direction_color(&e.direction)))
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(19), // Timestamp
            Constraint::Length(16), // Tag
            Constraint::Min(12),    // Name
            Constraint::Min(28),    // Direction
        ],
    )
    .header(
        Row::new(vec!["Timestamp", "Tag", "Name", "Direction"])
            .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
    )
    .block(block.title_bottom(format!(" {}-{} of {} ", (start + 1).min(end), end, entries.len())));

    f.render_widget(table, area);
}

fn draw_status_line(f: &mut Frame, area: Rect, app: &App) {
    let text = match &app.status_message {
        Some((message, _)) => Span::styled(message.clone(), Style::default().fg(Color::Yellow)),
        None => {
            let age = app
                .last_refresh
                .map(|t| format!("refreshed {}s ago", t.elapsed().as_secs()))
                .unwrap_or_else(|| "not refreshed yet".to_string());
            Span::styled(age, Style::default().fg(Color::DarkGray))
        }
    };

    f.render_widget(Paragraph::new(Line::from(text)).block(Block::default().borders(Borders::ALL)), area);
}
