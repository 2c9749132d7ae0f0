//! Which single source feeds the visualization.
//!
//! The session holds at most one provider handle. A play event from a new
//! source switches the handle over; the handle is released once nothing
//! tracked is audibly playing. Provider failures are logged and resolve to
//! `Active` (degraded, no handle) or `Idle`, never to an intermediate state.

use std::collections::VecDeque;
use std::fmt;

use tracing::{debug, info, trace, warn};

use crate::error::ProviderError;
use crate::scheduler::FrameScheduler;
use crate::source::{SourceDirectory, SourceId};

/// Spectral analysis attached to one source at a time.
pub trait SpectrumProvider {
    type Handle;

    fn connect(&mut self, source: SourceId) -> Result<Self::Handle, ProviderError>;
    fn disconnect(&mut self, handle: Self::Handle) -> Result<(), ProviderError>;
    /// Fill `out` with the latest byte magnitudes (0-255).
    fn sample(&mut self, handle: &Self::Handle, out: &mut Vec<u8>) -> Result<(), ProviderError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connecting,
    Active,
    Switching,
    Teardown,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Connecting => "connecting",
            SessionState::Active => "active",
            SessionState::Switching => "switching",
            SessionState::Teardown => "teardown",
        };
        f.write_str(name)
    }
}

const HISTORY_LEN: usize = 32;

pub struct Session<P: SpectrumProvider> {
    provider: P,
    state: SessionState,
    active_source: Option<SourceId>,
    handle: Option<P::Handle>,
    is_running: bool,
    history: VecDeque<SessionState>,
}

impl<P: SpectrumProvider> Session<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            state: SessionState::Idle,
            active_source: None,
            handle: None,
            is_running: false,
            history: VecDeque::with_capacity(HISTORY_LEN),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn active_source(&self) -> Option<SourceId> {
        self.active_source
    }

    /// Frames are being driven for the active source.
    pub fn is_running(&self) -> bool {
        self.is_running
    }

    /// Active but without a handle because the provider refused to connect.
    pub fn is_degraded(&self) -> bool {
        self.state == SessionState::Active && self.handle.is_none()
    }

    pub fn has_handle(&self) -> bool {
        self.handle.is_some()
    }

    /// Whether `source` currently owns the connection.
    pub fn connected(&self, source: SourceId) -> bool {
        self.handle.is_some() && self.active_source == Some(source)
    }

    /// Most recent states, oldest first.
    pub fn history(&self) -> impl Iterator<Item = SessionState> + '_ {
        self.history.iter().copied()
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn provider_mut(&mut self) -> &mut P {
        &mut self.provider
    }

    pub fn on_play<F: FrameScheduler + ?Sized>(
        &mut self,
        source: SourceId,
        muted: bool,
        scheduler: &mut F,
    ) {
        if muted {
            debug!("Ignoring play from muted source {}", source);
            return;
        }

        if self.connected(source) {
            trace!("Source {} already connected", source);
            scheduler.start();
            self.is_running = true;
            return;
        }

        if let Some(previous) = self.active_source {
            if previous != source {
                self.enter(SessionState::Switching);
                info!("Switching from source {} to {}", previous, source);
            }
            self.release();
            self.active_source = None;
        }

        self.enter(SessionState::Connecting);
        match self.provider.connect(source) {
            Ok(handle) => {
                info!("Connected to source {}", source);
                self.handle = Some(handle);
            }
            Err(e) => {
                warn!("{}; visualizing without data", e);
                self.handle = None;
            }
        }
        self.active_source = Some(source);
        scheduler.start();
        self.is_running = true;
        self.enter(SessionState::Active);
    }

    pub fn on_pause_or_end<F, D>(&mut self, source: SourceId, sources: &D, scheduler: &mut F)
    where
        F: FrameScheduler + ?Sized,
        D: SourceDirectory + ?Sized,
    {
        if self.state == SessionState::Idle {
            scheduler.stop();
            return;
        }

        if sources.is_any_other_source_playing(source) {
            debug!(
                "Source {} stopped but another source is still playing; keeping {:?}",
                source, self.active_source
            );
            return;
        }

        self.teardown(scheduler);
    }

    /// Release everything; used on host shutdown.
    pub fn shutdown<F: FrameScheduler + ?Sized>(&mut self, scheduler: &mut F) {
        if self.state != SessionState::Idle || self.handle.is_some() {
            self.teardown(scheduler);
        }
    }

    /// Pull one frame of magnitudes through the held handle.
    pub fn sample(&mut self, out: &mut Vec<u8>) -> Result<(), ProviderError> {
        match &self.handle {
            Some(handle) => self.provider.sample(handle, out),
            None => Err(ProviderError::SampleUnavailable),
        }
    }

    fn teardown<F: FrameScheduler + ?Sized>(&mut self, scheduler: &mut F) {
        self.enter(SessionState::Teardown);
        scheduler.stop();
        self.release();
        if let Some(source) = self.active_source.take() {
            info!("No source playing, released {}", source);
        }
        self.is_running = false;
        self.enter(SessionState::Idle);
    }

    /// Best-effort disconnect of the held handle.
    fn release(&mut self) {
        if let Some(handle) = self.handle.take() {
            if let Err(e) = self.provider.disconnect(handle) {
                warn!("Ignoring disconnect failure: {}", e);
            }
        }
    }

    fn enter(&mut self, next: SessionState) {
        debug!("Session {} -> {}", self.state, next);
        self.state = next;
        if self.history.len() == HISTORY_LEN {
            self.history.pop_front();
        }
        self.history.push_back(next);
    }
}

impl<P: SpectrumProvider> fmt::Debug for Session<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state)
            .field("active_source", &self.active_source)
            .field("has_handle", &self.handle.is_some())
            .field("is_running", &self.is_running)
            .finish()
    }
}
