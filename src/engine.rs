//! The context object tying the core together.
//!
//! Everything the visualization needs lives in one `Engine`, driven by a
//! single `dispatch` call per event. The host feeds events in order from one
//! thread; nothing here locks.

use tracing::trace;

use crate::controller::{ControlTuning, ParameterController};
use crate::error::ProviderError;
use crate::mapping::{BarMapper, MappingStyle};
use crate::params::VisualParameters;
use crate::renderer::RenderSurface;
use crate::scheduler::{FrameClock, FrameScheduler};
use crate::session::{Session, SessionState, SpectrumProvider};
use crate::settings::{load_parameters, SettingsStore};
use crate::source::{SourceId, SourceRegistry};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Event {
    Play { source: SourceId, muted: bool },
    PauseOrEnd { source: SourceId },
    /// The source went away entirely; handled like an end.
    Forget { source: SourceId },
    PointerDown { x: f32, y: f32 },
    PointerMove { x: f32, y: f32 },
    /// Release or pointer leaving the window.
    PointerUp,
    Reset,
    Visibility(bool),
    Tick { width: f32, height: f32 },
}

/// Point-in-time summary for status lines and IPC.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineStatus {
    pub state: SessionState,
    pub active_source: Option<SourceId>,
    pub degraded: bool,
    pub visible: bool,
    pub hue_rotation: f32,
    pub bar_count: u32,
    pub tracked_sources: usize,
}

pub struct Engine<P: SpectrumProvider, S: SettingsStore> {
    session: Session<P>,
    sources: SourceRegistry,
    params: VisualParameters,
    controller: ParameterController,
    mapper: BarMapper,
    clock: FrameClock,
    store: S,
    magnitudes: Vec<u8>,
}

impl<P: SpectrumProvider, S: SettingsStore> Engine<P, S> {
    /// Build the engine, loading the persisted parameters from `store`.
    pub fn new(provider: P, store: S, style: MappingStyle, tuning: ControlTuning) -> Self {
        let params = load_parameters(&store);
        Self {
            session: Session::new(provider),
            sources: SourceRegistry::new(),
            mapper: BarMapper::new(style, &params),
            controller: ParameterController::new(tuning),
            clock: FrameClock::new(),
            params,
            store,
            magnitudes: Vec::new(),
        }
    }

    pub fn dispatch<R: RenderSurface + ?Sized>(&mut self, event: Event, surface: &mut R) {
        match event {
            Event::Play { source, muted } => {
                self.sources.mark_playing(source, muted);
                self.session.on_play(source, muted, &mut self.clock);
            }
            Event::PauseOrEnd { source } => {
                self.sources.mark_stopped(source);
                self.session
                    .on_pause_or_end(source, &self.sources, &mut self.clock);
            }
            Event::Forget { source } => {
                self.sources.forget(source);
                self.session
                    .on_pause_or_end(source, &self.sources, &mut self.clock);
            }
            Event::PointerDown { x, y } => self.controller.pointer_down(x, y),
            Event::PointerMove { x, y } => {
                self.controller.pointer_move(x, y, &mut self.params);
            }
            Event::PointerUp => self.controller.pointer_up(&self.params, &mut self.store),
            Event::Reset => self.controller.reset(&mut self.params, &mut self.store),
            Event::Visibility(visible) => self.clock.set_visible(visible),
            Event::Tick { width, height } => self.tick(surface, width, height),
        }
    }

    fn tick<R: RenderSurface + ?Sized>(&mut self, surface: &mut R, width: f32, height: f32) {
        if !self.clock.frame_due() {
            return;
        }
        match self.session.sample(&mut self.magnitudes) {
            Ok(()) => {}
            Err(ProviderError::SampleUnavailable) => {
                trace!("No spectrum this frame, drawing silence");
                self.magnitudes.clear();
            }
            Err(e) => {
                trace!("Sampling failed ({}), drawing silence", e);
                self.magnitudes.clear();
            }
        }
        let commands = self
            .mapper
            .render(&self.magnitudes, &self.params, width, height);
        surface.draw(&commands, width, height);
    }

    pub fn notify_pointer_down(&mut self, x: f32, y: f32) {
        self.controller.pointer_down(x, y);
    }

    pub fn notify_pointer_move(&mut self, x: f32, y: f32) {
        self.controller.pointer_move(x, y, &mut self.params);
    }

    pub fn notify_pointer_up(&mut self) {
        self.controller.pointer_up(&self.params, &mut self.store);
    }

    pub fn reset_to_defaults(&mut self) {
        self.controller.reset(&mut self.params, &mut self.store);
    }

    /// Release the connection and stop frames; for host shutdown.
    pub fn shutdown(&mut self) {
        if self.controller.is_dragging() || self.controller.is_dirty() {
            self.controller.pointer_up(&self.params, &mut self.store);
        }
        self.session.shutdown(&mut self.clock);
    }

    pub fn params(&self) -> &VisualParameters {
        &self.params
    }

    pub fn session(&self) -> &Session<P> {
        &self.session
    }

    pub fn sources(&self) -> &SourceRegistry {
        &self.sources
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn is_running(&self) -> bool {
        self.clock.is_running()
    }

    pub fn is_visible(&self) -> bool {
        self.clock.is_visible()
    }

    pub fn is_dragging(&self) -> bool {
        self.controller.is_dragging()
    }

    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            state: self.session.state(),
            active_source: self.session.active_source(),
            degraded: self.session.is_degraded(),
            visible: self.clock.is_visible(),
            hue_rotation: self.params.hue_rotation(),
            bar_count: self.params.bar_count(),
            tracked_sources: self.sources.len(),
        }
    }
}
