//! Selenia TUI - interactive monitor for the sensor and alert unit
//!
//! Displays:
//! - Connection state and build hash
//! - Status pill (DANGER / SAFE / tracking count)
//! - Port, baud and mode selections (applied at connect time)
//! - Last raw sensor line and the session log

use clap::Parser;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame, Terminal,
};
use selenia_monitor::domain::{ClassificationStatus, LogEntry, Mode, SessionEvent, StatusLine};
use selenia_monitor::infra::Config;
use selenia_monitor::io::{create_event_channel, list_ports, SerialLinks, BAUD_CHOICES};
use selenia_monitor::services::{ConnectSettings, Session};
use std::collections::VecDeque;
use std::fs::OpenOptions;
use std::io;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// Maximum log lines kept on screen
const MAX_LOG_LINES: usize = 500;

/// Selenia TUI - interactive serial monitor
#[derive(Parser, Debug)]
#[command(name = "selenia-tui", version, about)]
struct Args {
    /// Path to TOML configuration file (falls back to $SELENIA_CONFIG)
    #[arg(short, long)]
    config: Option<String>,

    /// Write diagnostic logs to this file (the terminal is taken by the UI)
    #[arg(long)]
    log_file: Option<String>,
}

/// Everything the screen shows
struct AppState {
    connected: bool,
    status: StatusLine,
    last_line: Option<String>,
    log: VecDeque<String>,
    ports: Vec<String>,
    sensor_port: Option<String>,
    baud: u32,
    /// None: alert forwarding disabled
    alert_port: Option<String>,
    alert_baud: u32,
    mode: Mode,
}

impl AppState {
    fn new(config: &Config, ports: Vec<String>) -> Self {
        let sensor_port = if ports.iter().any(|p| p == config.sensor_port()) {
            Some(config.sensor_port().to_string())
        } else {
            ports.first().cloned()
        };

        Self {
            connected: false,
            status: StatusLine::Disconnected,
            last_line: None,
            log: VecDeque::with_capacity(MAX_LOG_LINES),
            ports,
            sensor_port,
            baud: config.sensor_baud(),
            alert_port: config.alert_port().map(str::to_string),
            alert_baud: config.alert_baud(),
            mode: config.mode(),
        }
    }

    fn push_log(&mut self, line: String) {
        if self.log.len() >= MAX_LOG_LINES {
            self.log.pop_front();
        }
        self.log.push_back(line);
    }

    fn apply(&mut self, event: &SessionEvent) {
        match event {
            SessionEvent::Log(entry) => self.push_log(entry.to_string()),
            SessionEvent::Status(status) => self.status = *status,
            SessionEvent::LastLine { line } => self.last_line = Some(line.clone()),
            SessionEvent::ReadLoopStopped => {}
        }
    }

    fn settings(&self) -> ConnectSettings {
        ConnectSettings {
            sensor_port: self.sensor_port.clone().unwrap_or_default(),
            sensor_baud: self.baud,
            alert_port: self.alert_port.clone(),
            alert_baud: self.alert_baud,
        }
    }

    fn cycle_sensor_port(&mut self) {
        self.sensor_port = next_in(&self.ports, self.sensor_port.as_deref());
    }

    fn cycle_alert_port(&mut self) {
        // None sits before the first port
        self.alert_port = match self.alert_port.as_deref() {
            None => self.ports.first().cloned(),
            Some(current) => match self.ports.iter().position(|p| p == current) {
                Some(idx) => self.ports.get(idx + 1).cloned(),
                None => None,
            },
        };
    }

    fn cycle_baud(&mut self) {
        let idx = BAUD_CHOICES.iter().position(|b| *b == self.baud);
        self.baud = match idx {
            Some(i) => BAUD_CHOICES[(i + 1) % BAUD_CHOICES.len()],
            None => BAUD_CHOICES[0],
        };
    }

    fn rescan(&mut self, ports: Vec<String>) {
        self.push_log(LogEntry::now(format!("Ports: {}", describe_ports(&ports))).to_string());
        if !self.sensor_port.as_ref().is_some_and(|p| ports.contains(p)) {
            self.sensor_port = ports.first().cloned();
        }
        self.ports = ports;
    }
}

/// Element after `current`, wrapping; first element if `current` is not listed
fn next_in(items: &[String], current: Option<&str>) -> Option<String> {
    if items.is_empty() {
        return None;
    }
    let next = match current.and_then(|c| items.iter().position(|p| p == c)) {
        Some(idx) => (idx + 1) % items.len(),
        None => 0,
    };
    items.get(next).cloned()
}

fn describe_ports(ports: &[String]) -> String {
    if ports.is_empty() {
        "none found".to_string()
    } else {
        ports.join(", ")
    }
}

fn init_tracing(log_file: Option<&str>) -> io::Result<()> {
    let Some(path) = log_file else {
        return Ok(());
    };
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_tracing(args.log_file.as_deref())?;
    info!(git_hash = env!("GIT_HASH"), "selenia-tui starting");

    let config = Config::load(args.config.as_deref());

    let (events, event_rx) = create_event_channel(config.event_buffer());
    let mut state = AppState::new(&config, list_ports());
    let links = SerialLinks::new(&config);
    let mut session = Session::new(config, links, events);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_ui(&mut terminal, &mut state, &mut session, event_rx).await;

    // Release both ports before handing the terminal back
    session.disconnect().await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    info!("selenia-tui shutdown complete");
    result
}

async fn run_ui(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    state: &mut AppState,
    session: &mut Session<SerialLinks>,
    mut event_rx: mpsc::Receiver<SessionEvent>,
) -> Result<(), Box<dyn std::error::Error>> {
    let tick_rate = Duration::from_millis(50);
    let mut last_tick = Instant::now();

    loop {
        let mut loop_stopped = false;
        while let Ok(event) = event_rx.try_recv() {
            state.apply(&event);
            loop_stopped |= event == SessionEvent::ReadLoopStopped;
        }
        // The stop event may have been dropped by a full channel
        if loop_stopped || session.read_loop_finished() {
            session.disconnect().await;
        }
        state.connected = session.is_connected();
        state.mode = session.mode();

        terminal.draw(|f| draw_ui(f, state))?;

        let timeout = tick_rate.saturating_sub(last_tick.elapsed());
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                        // Plain 'l' and Ctrl+L both arrive as Char('l')
                        KeyCode::Char('l') => state.log.clear(),
                        KeyCode::Char('c') => {
                            if session.is_connected() {
                                session.disconnect().await;
                            } else {
                                // Failures are reported through the event log
                                let _ = session.connect(&state.settings()).await;
                            }
                        }
                        KeyCode::Char('m') => session.set_mode(session.mode().toggled()),
                        // Port and baud selections are locked while connected
                        KeyCode::Char('p') if !session.is_connected() => state.cycle_sensor_port(),
                        KeyCode::Char('b') if !session.is_connected() => state.cycle_baud(),
                        KeyCode::Char('a') if !session.is_connected() => state.cycle_alert_port(),
                        KeyCode::Char('r') if !session.is_connected() => state.rescan(list_ports()),
                        _ => {}
                    }
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }
    }
}

fn draw_ui(f: &mut Frame, state: &AppState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Length(3), // Status pill
            Constraint::Length(3), // Settings
            Constraint::Length(3), // Last line
            Constraint::Min(0),    // Log
            Constraint::Length(1), // Key help
        ])
        .split(f.area());

    draw_header(f, chunks[0], state);
    draw_status(f, chunks[1], state);
    draw_settings(f, chunks[2], state);
    draw_last_line(f, chunks[3], state);
    draw_log(f, chunks[4], state);
    draw_help(f, chunks[5]);
}

fn draw_header(f: &mut Frame, area: Rect, state: &AppState) {
    let (conn_text, conn_color) =
        if state.connected { ("CONNECTED", Color::Green) } else { ("DISCONNECTED", Color::Red) };

    let header = Paragraph::new(Line::from(vec![
        Span::styled("Selenia Monitor ", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        Span::raw("| "),
        Span::styled(conn_text, Style::default().fg(conn_color)),
        Span::raw(" | Build: "),
        Span::styled(env!("GIT_HASH"), Style::default().fg(Color::DarkGray)),
    ]))
    .block(Block::default().borders(Borders::ALL));

    f.render_widget(header, area);
}

fn status_color(status: &StatusLine) -> Color {
    match status {
        StatusLine::Classification { value: ClassificationStatus::Danger } => Color::Red,
        StatusLine::Classification { value: ClassificationStatus::Safe } | StatusLine::Disconnected => {
            Color::Green
        }
        _ => Color::Magenta,
    }
}

fn draw_status(f: &mut Frame, area: Rect, state: &AppState) {
    let pill = Paragraph::new(Line::from(Span::styled(
        format!(" {} ", state.status),
        Style::default().fg(Color::Black).bg(status_color(&state.status)).add_modifier(Modifier::BOLD),
    )))
    .block(Block::default().title(" Status ").borders(Borders::ALL));

    f.render_widget(pill, area);
}

fn draw_settings(f: &mut Frame, area: Rect, state: &AppState) {
    let value = |text: String| Span::styled(text, Style::default().fg(Color::Yellow));

    let settings = Paragraph::new(Line::from(vec![
        Span::raw("Sensor: "),
        value(state.sensor_port.clone().unwrap_or_else(|| "(none)".to_string())),
        Span::raw(" @ "),
        value(state.baud.to_string()),
        Span::raw(" | Alert: "),
        value(state.alert_port.clone().unwrap_or_else(|| "(disabled)".to_string())),
        Span::raw(" | Mode: "),
        value(state.mode.to_string()),
    ]))
    .block(
        Block::default()
            .title(" Settings ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Blue)),
    );

    f.render_widget(settings, area);
}

fn draw_last_line(f: &mut Frame, area: Rect, state: &AppState) {
    let text = state.last_line.as_deref().unwrap_or("-");
    let last = Paragraph::new(Line::from(Span::styled(text, Style::default().fg(Color::DarkGray))))
        .block(Block::default().title(" Last line ").borders(Borders::ALL));

    f.render_widget(last, area);
}

fn draw_log(f: &mut Frame, area: Rect, state: &AppState) {
    // Newest lines at the bottom; show what fits
    let visible = area.height.saturating_sub(2) as usize;
    let skip = state.log.len().saturating_sub(visible);
    let items: Vec<ListItem> =
        state.log.iter().skip(skip).map(|line| ListItem::new(Line::from(line.as_str()))).collect();

    let list = List::new(items).block(
        Block::default()
            .title(format!(" Log ({}) ", state.log.len()))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );

    f.render_widget(list, area);
}

fn draw_help(f: &mut Frame, area: Rect) {
    let help = Paragraph::new(Line::from(Span::styled(
        " c connect/disconnect  m mode  p port  b baud  a alert port  r rescan  l clear  q quit",
        Style::default().fg(Color::DarkGray),
    )));
    f.render_widget(help, area);
}
