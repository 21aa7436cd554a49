//! Settings panel.
//!
//! Runs on a dedicated thread so terminal I/O never blocks the Tokio
//! runtime; the controller loop and the panel talk exclusively over
//! channels. The panel owns an editable copy of the configuration and
//! writes every edit straight back through the orchestrator, which
//! persists it.

use crate::cli::Cli;
use crate::controller::AutoSaveController;
use crate::host::ChannelNotifier;
use crate::hostfs::FileDocumentHost;
use crate::model::{AutoSaveConfig, ControllerEvent, Notice, NoticeLevel};
use crate::orchestrator::{self, UiCommand};
use crate::prefs::JsonPrefStore;
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph},
    Terminal,
};
use std::{io, time::Duration, time::Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

const NOTICE_LOG_CAP: usize = 200;
/// Interval step per keypress, matching the clamp floor.
const INTERVAL_STEP_SECS: f64 = 60.0;

struct UiState {
    /// Editable copy of the configuration; the controller's status events
    /// are authoritative and overwrite it (clamping included).
    config: AutoSaveConfig,
    seconds_until_save: f64,
    run_mode: bool,
    document: Option<String>,
    info: String,
    notices: Vec<Notice>,
}

impl UiState {
    fn new(config: AutoSaveConfig, document: Option<String>) -> Self {
        let seconds_until_save = if config.enabled {
            config.interval_seconds
        } else {
            -1.0
        };
        Self {
            config,
            seconds_until_save,
            run_mode: false,
            document,
            info: String::new(),
            notices: Vec::new(),
        }
    }

    fn push_notice(&mut self, notice: Notice) {
        self.info = notice.message.clone();
        self.notices.push(notice);
        if self.notices.len() > NOTICE_LOG_CAP {
            let excess = self.notices.len() - NOTICE_LOG_CAP;
            self.notices.drain(..excess);
        }
    }
}

pub(crate) async fn run(args: Cli, config: AutoSaveConfig, store: JsonPrefStore) -> Result<()> {
    // Unbounded channels: the controller must never block on a slow panel.
    let (event_tx, event_rx) = mpsc::unbounded_channel::<ControllerEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    let document = args
        .document
        .as_ref()
        .map(|p| p.display().to_string());

    // TUI runs in a dedicated thread to keep blocking I/O off the runtime.
    let ui_config = config.clone();
    let ui_handle = std::thread::spawn(move || run_threaded(ui_config, document, event_rx, cmd_tx));

    let host = FileDocumentHost::new(args.document.clone());
    let notifier = ChannelNotifier::new(event_tx.clone());
    let ctl = AutoSaveController::new(host, notifier, config);
    let res = orchestrator::run_controller(ctl, store, event_tx, cmd_rx).await;

    let join_res = tokio::task::spawn_blocking(move || ui_handle.join()).await;
    if let Ok(joined) = join_res {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(anyhow::anyhow!("TUI thread panicked")),
        }
    }

    res
}

/// Run the panel loop on a dedicated thread.
fn run_threaded(
    config: AutoSaveConfig,
    document: Option<String>,
    mut event_rx: UnboundedReceiver<ControllerEvent>,
    cmd_tx: UnboundedSender<UiCommand>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    let mut state = UiState::new(config, document);

    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    let res = loop {
        // Drain controller events without blocking to keep the panel live.
        while let Ok(ev) = event_rx.try_recv() {
            apply_event(&mut state, ev);
        }

        if last_tick.elapsed() >= tick_rate {
            terminal.draw(|f| draw(f.area(), f, &state)).ok();
            last_tick = Instant::now();
        }

        // Poll input with a short timeout to avoid blocking the render loop.
        if event::poll(Duration::from_millis(10)).unwrap_or(false) {
            if let Ok(Event::Key(k)) = event::read() {
                if k.kind != KeyEventKind::Press {
                    continue;
                }
                if handle_key(&mut state, &cmd_tx, k.modifiers, k.code) {
                    break Ok(());
                }
            }
        }
    };

    disable_raw_mode().ok();
    execute!(terminal.backend_mut(), LeaveAlternateScreen).ok();
    terminal.show_cursor().ok();
    res
}

fn apply_event(state: &mut UiState, ev: ControllerEvent) {
    match ev {
        ControllerEvent::Status(status) => {
            state.config = status.config;
            state.seconds_until_save = status.seconds_until_save;
        }
        ControllerEvent::Notice(notice) => state.push_notice(notice),
    }
}

/// Handle a keypress; returns true when the panel should exit.
fn handle_key(
    state: &mut UiState,
    cmd_tx: &UnboundedSender<UiCommand>,
    modifiers: KeyModifiers,
    code: KeyCode,
) -> bool {
    let mut apply = false;
    match (modifiers, code) {
        (_, KeyCode::Char('q')) | (KeyModifiers::CONTROL, KeyCode::Char('c')) => {
            let _ = cmd_tx.send(UiCommand::Quit);
            return true;
        }
        (_, KeyCode::Char('e')) => {
            state.config.enabled = !state.config.enabled;
            apply = true;
        }
        (_, KeyCode::Char('c')) => {
            state.config.save_copy = !state.config.save_copy;
            apply = true;
        }
        (_, KeyCode::Char('n')) => {
            state.config.notify = !state.config.notify;
            apply = true;
        }
        (_, KeyCode::Up) | (_, KeyCode::Char('+')) => {
            state
                .config
                .set_interval_seconds(state.config.interval_seconds + INTERVAL_STEP_SECS);
            apply = true;
        }
        (_, KeyCode::Down) | (_, KeyCode::Char('-')) => {
            state
                .config
                .set_interval_seconds(state.config.interval_seconds - INTERVAL_STEP_SECS);
            apply = true;
        }
        (_, KeyCode::Char('s')) => {
            let _ = cmd_tx.send(UiCommand::SaveNow);
        }
        (_, KeyCode::Char('t')) => {
            state.info = "Timer reset".into();
            let _ = cmd_tx.send(UiCommand::ResetTimer);
        }
        (_, KeyCode::Char('d')) => {
            let _ = cmd_tx.send(UiCommand::RestoreDefaults);
        }
        (_, KeyCode::Char('m')) => {
            state.run_mode = !state.run_mode;
            state.info = if state.run_mode {
                "Host entering run mode".into()
            } else {
                "Host back in edit mode".into()
            };
            let _ = cmd_tx.send(UiCommand::SetRunMode(state.run_mode));
        }
        _ => {}
    }
    if apply {
        let _ = cmd_tx.send(UiCommand::ApplyConfig(state.config.clone()));
    }
    false
}

fn draw(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(8),
            Constraint::Length(5),
            Constraint::Min(4),
            Constraint::Length(4),
        ])
        .split(area);

    draw_config(chunks[0], f, state);
    draw_status(chunks[1], f, state);
    draw_notices(chunks[2], f, state);
    draw_shortcuts(chunks[3], f);
}

fn on_off(v: bool) -> Span<'static> {
    if v {
        Span::styled("on", Style::default().fg(Color::Green))
    } else {
        Span::styled("off", Style::default().fg(Color::DarkGray))
    }
}

fn draw_config(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let cfg = &state.config;
    let mut lines = vec![
        Line::from(vec![Span::raw("Autosave       "), on_off(cfg.enabled)]),
        Line::from(vec![
            Span::raw("Interval       "),
            Span::styled(
                format!("{:.1} min", cfg.interval_seconds / 60.0),
                Style::default().add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(vec![Span::raw("Save as copy   "), on_off(cfg.save_copy)]),
        Line::from(vec![Span::raw("Notifications  "), on_off(cfg.notify)]),
    ];
    lines.push(Line::from(vec![
        Span::raw("Document       "),
        match &state.document {
            Some(doc) => Span::raw(doc.clone()),
            None => Span::styled("(not saved yet)", Style::default().fg(Color::Yellow)),
        },
    ]));
    if state.run_mode {
        lines.push(Line::from(Span::styled(
            "Host is in run mode, saves are paused",
            Style::default().fg(Color::Yellow),
        )));
    }
    let p = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title("AutoSave Settings"),
    );
    f.render_widget(p, area);
}

fn draw_status(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let block = Block::default().borders(Borders::ALL).title("Status");
    let inner = block.inner(area);
    f.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(inner);

    let label = countdown_label(state.config.enabled, state.seconds_until_save);
    f.render_widget(Paragraph::new(label), rows[0]);

    let ratio = progress_ratio(
        state.config.enabled,
        state.seconds_until_save,
        state.config.interval_seconds,
    );
    let gauge = Gauge::default()
        .gauge_style(Style::default().fg(if state.config.enabled {
            Color::Cyan
        } else {
            Color::DarkGray
        }))
        .ratio(ratio)
        .label("");
    f.render_widget(gauge, rows[1]);

    let info = Paragraph::new(state.info.clone()).style(Style::default().fg(Color::DarkGray));
    f.render_widget(info, rows[2]);
}

fn draw_notices(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let visible = (area.height as usize).saturating_sub(2);
    let start = state.notices.len().saturating_sub(visible);
    let lines: Vec<Line> = state.notices[start..]
        .iter()
        .map(|n| {
            let style = match n.level {
                NoticeLevel::Info => Style::default(),
                NoticeLevel::Warning => Style::default().fg(Color::Yellow),
                NoticeLevel::Error => Style::default().fg(Color::Red),
            };
            Line::from(Span::styled(n.message.clone(), style))
        })
        .collect();
    let p = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Notices"));
    f.render_widget(p, area);
}

fn draw_shortcuts(area: Rect, f: &mut ratatui::Frame) {
    let key = |k: &'static str| Span::styled(k, Style::default().fg(Color::Cyan));
    let lines = vec![
        Line::from(vec![
            key("e"),
            Span::raw(" enable  "),
            key("↑/↓"),
            Span::raw(" interval  "),
            key("c"),
            Span::raw(" copy  "),
            key("n"),
            Span::raw(" notify  "),
            key("d"),
            Span::raw(" defaults"),
        ]),
        Line::from(vec![
            key("s"),
            Span::raw(" save now  "),
            key("t"),
            Span::raw(" reset timer  "),
            key("m"),
            Span::raw(" run mode  "),
            key("q"),
            Span::raw(" quit"),
        ]),
    ];
    let p = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Keys"));
    f.render_widget(p, area);
}

/// Countdown text: `MM:SS` while waiting, a heads-up at zero, and a disabled
/// marker when autosave is off.
fn countdown_label(enabled: bool, seconds_until_save: f64) -> String {
    if !enabled || seconds_until_save < 0.0 {
        return "AutoSave is disabled".to_string();
    }
    if seconds_until_save == 0.0 {
        return "Auto-save will trigger soon...".to_string();
    }
    let total = seconds_until_save.ceil() as u64;
    format!("Next auto-save in: {:02}:{:02}", total / 60, total % 60)
}

/// Fraction of the interval already elapsed, for the progress gauge.
fn progress_ratio(enabled: bool, seconds_until_save: f64, interval_seconds: f64) -> f64 {
    if !enabled || seconds_until_save < 0.0 || interval_seconds <= 0.0 {
        return 0.0;
    }
    (1.0 - seconds_until_save / interval_seconds).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn countdown_formats_minutes_and_seconds() {
        assert_eq!(countdown_label(true, 125.0), "Next auto-save in: 02:05");
        assert_eq!(countdown_label(true, 60.0), "Next auto-save in: 01:00");
        assert_eq!(countdown_label(true, 0.0), "Auto-save will trigger soon...");
        assert_eq!(countdown_label(false, 30.0), "AutoSave is disabled");
        assert_eq!(countdown_label(true, -1.0), "AutoSave is disabled");
    }

    #[test]
    fn progress_ratio_tracks_elapsed_fraction() {
        assert_eq!(progress_ratio(true, 600.0, 600.0), 0.0);
        assert_eq!(progress_ratio(true, 150.0, 600.0), 0.75);
        assert_eq!(progress_ratio(true, 0.0, 600.0), 1.0);
        assert_eq!(progress_ratio(false, 150.0, 600.0), 0.0);
        assert_eq!(progress_ratio(true, -1.0, 600.0), 0.0);
    }

    #[test]
    fn notice_log_is_capped() {
        let mut state = UiState::new(AutoSaveConfig::default(), None);
        for i in 0..(NOTICE_LOG_CAP + 10) {
            state.push_notice(Notice::info(format!("notice {i}")));
        }
        assert_eq!(state.notices.len(), NOTICE_LOG_CAP);
        assert_eq!(state.notices.last().unwrap().message, "notice 209");
        assert_eq!(state.info, "notice 209");
    }

    #[test]
    fn toggling_enabled_sends_updated_config() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut state = UiState::new(AutoSaveConfig::default(), None);
        let quit = handle_key(&mut state, &tx, KeyModifiers::NONE, KeyCode::Char('e'));
        assert!(!quit);
        match rx.try_recv().unwrap() {
            UiCommand::ApplyConfig(cfg) => assert!(!cfg.enabled),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn interval_keys_step_by_a_minute_and_clamp() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut state = UiState::new(AutoSaveConfig::default(), None);
        handle_key(&mut state, &tx, KeyModifiers::NONE, KeyCode::Up);
        assert_eq!(state.config.interval_seconds, 660.0);
        state.config.set_interval_seconds(60.0);
        handle_key(&mut state, &tx, KeyModifiers::NONE, KeyCode::Down);
        assert_eq!(state.config.interval_seconds, 60.0);
        while rx.try_recv().is_ok() {}
    }

    #[test]
    fn quit_key_sends_quit_command() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut state = UiState::new(AutoSaveConfig::default(), None);
        assert!(handle_key(
            &mut state,
            &tx,
            KeyModifiers::NONE,
            KeyCode::Char('q')
        ));
        assert!(matches!(rx.try_recv().unwrap(), UiCommand::Quit));
    }
}
