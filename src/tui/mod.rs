mod help;
mod ring;
mod state;

use crate::ambient::{asset_search_dirs, AmbientLoop, FrameMediaSource};
use crate::cli::{build_config, build_engine, build_gate, Cli};
use crate::dialog::SurfaceDialog;
use crate::model::{ClearTrigger, UiCommand};
use crate::orchestrator::{self, ExecutionController};
use crate::surface::{ChannelSurface, SurfaceUpdate};
use anyhow::{Context, Result};
use crossterm::{
    event::{
        self, Event, KeyCode, KeyEventKind, KeyModifiers, KeyboardEnhancementFlags,
        PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use help::draw_help;
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::Line,
    widgets::{Block, Borders, Clear, Paragraph, Tabs, Wrap},
    Terminal,
};
use ring::{draw_ring, shade};
use state::UiState;
use std::{io, time::Duration, time::Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

const AMBIENT_FRAME_INTERVAL: Duration = Duration::from_millis(120);
/// Upper bound on waiting for the controller after quitting.
const QUIT_TIMEOUT: Duration = Duration::from_secs(10);

pub async fn run(args: Cli) -> Result<()> {
    // Unbounded channels avoid backpressure and task switching in the hot path.
    let (surface_tx, surface_rx) = mpsc::unbounded_channel::<SurfaceUpdate>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();
    let (media_tx, media_rx) = mpsc::unbounded_channel();

    let cfg = build_config(&args);
    let engine = build_engine(&cfg)?;
    let media = FrameMediaSource::new(
        asset_search_dirs(args.assets.as_deref()),
        AMBIENT_FRAME_INTERVAL,
        surface_tx.clone(),
        media_tx,
    );
    let controller = ExecutionController::new(
        Box::new(ChannelSurface::new(surface_tx.clone())),
        AmbientLoop::new(Box::new(media)),
        build_gate(&args),
        Box::new(engine),
    );
    let dialog = SurfaceDialog::new(surface_tx);

    // TUI runs in a dedicated thread to keep all blocking I/O out of the Tokio runtime.
    let ui_handle = std::thread::spawn(move || run_threaded(surface_rx, cmd_tx));

    let res =
        orchestrator::run_controller(controller, cmd_rx, media_rx, Box::new(dialog), None).await;

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

/// Run the TUI loop on a dedicated thread.
///
/// Exits once the controller has dropped every surface sender, so the
/// completion timeline of an aborted run stays visible after `q`.
pub fn run_threaded(
    mut surface_rx: UnboundedReceiver<SurfaceUpdate>,
    cmd_tx: UnboundedSender<UiCommand>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).ok();
    // Needed for key release events; terminals without support ignore it.
    execute!(
        stdout,
        PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
    )
    .ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    // UiState is owned by the UI thread only; no cross-thread mutation.
    let mut state = UiState::new(Instant::now());
    let tick_rate = Duration::from_millis(33);
    let mut last_tick = Instant::now();
    let mut quit_at: Option<Instant> = None;

    let res = loop {
        // Drain updates without blocking to keep the UI responsive.
        let now = Instant::now();
        let mut disconnected = false;
        loop {
            match surface_rx.try_recv() {
                Ok(update) => state.apply(update, now),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    disconnected = true;
                    break;
                }
            }
        }
        if disconnected {
            if quit_at.is_none() {
                tracing::warn!("controller stopped before the UI");
            }
            break Ok(());
        }
        if quit_at.is_some_and(|t| now.duration_since(t) >= QUIT_TIMEOUT) {
            tracing::warn!("controller did not finish after quit");
            break Ok(());
        }

        if let Some(phase) = state.long_press.expire(now) {
            let _ = cmd_tx.send(UiCommand::Clear(ClearTrigger::LongPress(phase)));
        }

        if last_tick.elapsed() >= tick_rate {
            terminal.draw(|f| draw(f.area(), f, &state)).ok();
            last_tick = Instant::now();
        }

        // Poll input with a short timeout to avoid blocking the render loop.
        if !event::poll(Duration::from_millis(10)).unwrap_or(false) {
            continue;
        }
        let Ok(Event::Key(k)) = event::read() else {
            continue;
        };

        if let KeyCode::Char('x') = k.code {
            if state.confirm.is_none() {
                if let Some(phase) = state.long_press.on_key(k.kind, Instant::now()) {
                    let _ = cmd_tx.send(UiCommand::Clear(ClearTrigger::LongPress(phase)));
                }
            }
            continue;
        }
        if k.kind != KeyEventKind::Press {
            continue;
        }

        if state.confirm.is_some() {
            match k.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => state.answer_confirm(true),
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    state.answer_confirm(false)
                }
                _ => {}
            }
            continue;
        }

        match (k.modifiers, k.code) {
            (_, KeyCode::Char('q')) | (KeyModifiers::CONTROL, KeyCode::Char('c')) => {
                if quit_at.is_none() {
                    let _ = cmd_tx.send(UiCommand::Quit);
                    state.quitting = true;
                    state.info = if state.processing {
                        "Aborting…".into()
                    } else {
                        "Quitting…".into()
                    };
                    quit_at = Some(Instant::now());
                }
            }
            (_, KeyCode::Char('r')) | (_, KeyCode::Enter) => {
                let _ = cmd_tx.send(UiCommand::Execute);
            }
            (_, KeyCode::Char('c')) => {
                let _ = cmd_tx.send(UiCommand::Clear(ClearTrigger::Tap));
            }
            (_, KeyCode::Tab) => {
                state.tab = (state.tab + 1) % 2;
            }
            (_, KeyCode::Char('?')) => {
                state.tab = 1;
            }
            _ => {}
        }
    };

    // A prompt left open reads as cancel.
    state.answer_confirm(false);
    let mut stdout = io::stdout();
    execute!(stdout, PopKeyboardEnhancementFlags).ok();
    disable_raw_mode().ok();
    execute!(stdout, LeaveAlternateScreen).ok();
    res
}

fn draw(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)].as_ref())
        .split(area);

    let tabs = Tabs::new(vec![Line::from("Run"), Line::from("Help")])
        .select(state.tab)
        .block(Block::default().borders(Borders::ALL).title("phonetic"))
        .highlight_style(Style::default().fg(Color::Yellow));
    f.render_widget(tabs, chunks[0]);

    match state.tab {
        0 => draw_run(chunks[1], f, state),
        _ => draw_help(chunks[1], f),
    }

    if let Some(pending) = state.confirm.as_ref() {
        draw_confirm(area, f, pending);
    }
}

fn draw_run(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let now = Instant::now();
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(8), Constraint::Length(3), Constraint::Length(3)].as_ref())
        .split(area);
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)].as_ref())
        .split(rows[0]);

    draw_ring(
        cols[0],
        f,
        state.progress_angle,
        &state.percentage_text,
        state.progress_opacity.value(now),
    );

    // The overlay is drawn as the brightness of the ambient panel.
    let overlay = state.overlay_opacity.value(now);
    let frame = state.ambient_frame.as_deref().unwrap_or("");
    let ambient = Paragraph::new(frame.to_string())
        .alignment(Alignment::Center)
        .style(Style::default().fg(shade((120, 160, 255), overlay)))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(shade((120, 120, 120), overlay.max(0.3))))
                .title("Ambient"),
        );
    f.render_widget(ambient, cols[1]);

    let output = Paragraph::new(state.output_text.clone())
        .alignment(Alignment::Center)
        .style(Style::default().fg(shade((255, 255, 255), state.output_opacity.value(now))))
        .block(Block::default().borders(Borders::ALL).title("Output"));
    f.render_widget(output, rows[1]);

    let status_color = if state.processing {
        Color::Yellow
    } else {
        Color::Gray
    };
    let status = Paragraph::new(state.info.clone())
        .style(Style::default().fg(status_color))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Status (r run, c clear, q quit, ? help)"),
        );
    f.render_widget(status, rows[2]);
}

fn draw_confirm(area: Rect, f: &mut ratatui::Frame, pending: &state::PendingConfirm) {
    let popup = centered(area, 60, 7);
    let prompt = &pending.prompt;
    let body = Paragraph::new(vec![
        Line::from(prompt.message.clone()),
        Line::from(""),
        Line::from(format!(
            "[y] {}    [n] {}",
            prompt.confirm_label, prompt.cancel_label
        )),
    ])
    .alignment(Alignment::Center)
    .wrap(Wrap { trim: true })
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Red))
            .title(prompt.title.clone()),
    );
    f.render_widget(Clear, popup);
    f.render_widget(body, popup);
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}
