use anyhow::{Context, Result};
use crossterm::{
    event::{
        self, DisableFocusChange, DisableMouseCapture, EnableFocusChange, EnableMouseCapture,
        Event as TermEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton,
        MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;
use std::io::{self, stdout};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{info, warn};

use wavestrip::controller::DoubleActivation;
use wavestrip::session::{SessionState, SpectrumProvider};
use wavestrip::settings::{MemoryStore, SettingsStore, TomlSettingsStore};
use wavestrip::{Engine, EngineStatus, Event};

use super::{pointer_in_strip, pointer_units, strip_area, StripSurface};
use crate::config::Config;
use crate::{discovery, ipc};

type Term = Terminal<CrosstermBackend<io::Stdout>>;

pub async fn run(config: Config) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture, EnableFocusChange)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let result = run_app(&mut terminal, config).await;

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        DisableFocusChange,
        DisableMouseCapture,
        LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;

    result
}

/// Persisted settings, or an in-memory store when the file is unusable.
fn open_settings() -> Box<dyn SettingsStore> {
    let Some(path) = TomlSettingsStore::default_path() else {
        warn!("No config directory, visual settings will not be saved");
        return Box::new(MemoryStore::new());
    };
    match TomlSettingsStore::open(&path) {
        Ok(store) => {
            info!("Visual settings at {}", path.display());
            Box::new(store)
        }
        Err(e) => {
            warn!("Ignoring settings at {}: {}", path.display(), e);
            Box::new(MemoryStore::new())
        }
    }
}

#[cfg(feature = "pulse")]
fn provider(config: &Config) -> crate::audio::PulseSpectrum {
    crate::audio::PulseSpectrum::new(crate::audio::AudioSettings::from(&config.audio))
}

#[cfg(not(feature = "pulse"))]
fn provider(_config: &Config) -> crate::audio::SilentSpectrum {
    crate::audio::SilentSpectrum
}

/// Mouse and focus state of the host window.
struct Pointer {
    pressed: bool,
    double: DoubleActivation,
}

impl Pointer {
    fn handle<P, S>(&mut self, engine: &mut Engine<P, S>, strip: Rect, event: TermEvent)
    where
        P: SpectrumProvider,
        S: SettingsStore,
    {
        match event {
            TermEvent::Mouse(MouseEvent {
                kind, column, row, ..
            }) => match kind {
                MouseEventKind::Down(MouseButton::Left) => {
                    let Some((x, y)) = pointer_in_strip(strip, column, row) else {
                        return;
                    };
                    if self.double.press(x, y, Instant::now()) {
                        engine.reset_to_defaults();
                    }
                    engine.notify_pointer_down(x, y);
                    self.pressed = true;
                }
                MouseEventKind::Drag(MouseButton::Left) if self.pressed => {
                    let (x, y) = pointer_units(strip, column, row);
                    engine.notify_pointer_move(x, y);
                }
                MouseEventKind::Up(MouseButton::Left) if self.pressed => self.release(engine),
                _ => {}
            },
            TermEvent::FocusLost if self.pressed => self.release(engine),
            _ => {}
        }
    }

    fn release<P, S>(&mut self, engine: &mut Engine<P, S>)
    where
        P: SpectrumProvider,
        S: SettingsStore,
    {
        self.pressed = false;
        engine.notify_pointer_up();
    }
}

fn is_quit(key: &KeyEvent) -> bool {
    matches!(
        key,
        KeyEvent {
            code: KeyCode::Char('q'),
            ..
        } | KeyEvent {
            code: KeyCode::Char('c'),
            modifiers: KeyModifiers::CONTROL,
            ..
        }
    )
}

async fn run_app(terminal: &mut Term, config: Config) -> Result<()> {
    let mut engine = Engine::new(
        provider(&config),
        open_settings(),
        config.visualizer.style(),
        config.control.tuning(),
    );

    let (media_tx, mut media_rx) = mpsc::channel::<Event>(64);
    discovery::start_discovery(config.discovery.poll_interval(), media_tx);

    let (ipc_tx, mut ipc_rx) = mpsc::channel::<ipc::IpcCommand>(16);
    let ipc_enabled = config.ipc.enabled;
    if ipc_enabled {
        let listener = ipc::bind()?;
        tokio::spawn(async move {
            if let Err(e) = ipc::serve(listener, ipc_tx).await {
                warn!("IPC server error: {}", e);
            }
        });
    }

    let mut surface = StripSurface::new();
    let mut pointer = Pointer {
        pressed: false,
        double: DoubleActivation::new(config.control.double_click_window()),
    };
    let frame_interval = config.display.frame_interval();
    let backdrop = config.visualizer.style().background_opacity;

    info!("Render loop started at {} fps", config.display.fps);

    let result = loop {
        let frame_start = Instant::now();

        while let Ok(event) = media_rx.try_recv() {
            engine.dispatch(event, &mut surface);
        }
        while let Ok(cmd) = ipc_rx.try_recv() {
            ipc::process_ipc_command(cmd, &mut engine);
        }

        let size = match terminal.size().context("Failed to query terminal size") {
            Ok(size) => size,
            Err(e) => break Err(e),
        };
        let area = Rect::new(0, 0, size.width, size.height);
        let strip = strip_area(area, config.display.strip_width);
        let (width, height) = surface.fit(strip);
        engine.dispatch(Event::Tick { width, height }, &mut surface);

        let status = engine.status();
        let show_strip = engine.is_visible()
            && (config.display.always_show || status.state != SessionState::Idle);
        if show_strip && status.state == SessionState::Idle {
            surface.blank(backdrop);
        }

        if let Err(e) = terminal.draw(|frame| {
            let area = frame.area();
            frame.render_widget(
                ratatui::widgets::Block::default().style(Style::default().bg(Color::Reset)),
                area,
            );
            if show_strip {
                surface.blit(strip, frame.buffer_mut());
            }
            render_status(frame, area, strip, &status);
        }) {
            break Err(e.into());
        }

        let timeout = frame_interval.saturating_sub(frame_start.elapsed());
        match poll_input(timeout) {
            Ok(Some(TermEvent::Key(key))) if key.kind == KeyEventKind::Press => {
                if is_quit(&key) {
                    break Ok(());
                }
                if key.code == KeyCode::Char('r') {
                    engine.reset_to_defaults();
                }
            }
            Ok(Some(other)) => pointer.handle(&mut engine, strip, other),
            Ok(None) => {}
            Err(e) => break Err(e),
        }
    };

    engine.shutdown();
    if ipc_enabled {
        ipc::cleanup();
    }
    info!("Render loop stopped");
    result
}

fn poll_input(timeout: Duration) -> Result<Option<TermEvent>> {
    if event::poll(timeout)? {
        Ok(Some(event::read()?))
    } else {
        Ok(None)
    }
}

fn render_status(frame: &mut Frame, area: Rect, strip: Rect, status: &EngineStatus) {
    let source = match status.active_source {
        Some(source) if status.degraded => format!("{} (no audio)", source),
        Some(source) => source.to_string(),
        None => "-".to_string(),
    };
    let line = format!(
        " {} {} | hue {:.0} | bars {} | drag strip: up/down hue, left/right bars | [r]eset [q]uit ",
        status.state, source, status.hue_rotation, status.bar_count,
    );

    let room = area.width.saturating_sub(strip.width) as usize;
    for (i, ch) in line.chars().take(room).enumerate() {
        if let Some(cell) = frame.buffer_mut().cell_mut((area.x + i as u16, area.y)) {
            cell.set_char(ch);
            cell.set_fg(Color::DarkGray);
        }
    }
}
