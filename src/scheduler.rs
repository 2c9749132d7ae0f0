//! Frame scheduling with visibility gating.

use tracing::debug;

/// Start/stop control over the per-refresh callback.
///
/// Both calls are idempotent.
pub trait FrameScheduler {
    fn start(&mut self);
    fn stop(&mut self);
    fn is_running(&self) -> bool;
}

/// Frame clock polled by the host loop once per refresh.
///
/// Frames are due only while started and visible. Hiding pauses the clock
/// without queueing; showing again asks for one fresh frame instead of
/// catching up.
#[derive(Debug, Clone)]
pub struct FrameClock {
    running: bool,
    visible: bool,
    fresh_tick: bool,
    frames: u64,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self {
            running: false,
            visible: true,
            fresh_tick: false,
            frames: 0,
        }
    }
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_visible(&mut self, visible: bool) {
        if self.visible == visible {
            return;
        }
        self.visible = visible;
        if visible && self.running {
            debug!("Frame clock resumed");
            self.fresh_tick = true;
        } else if !visible {
            debug!("Frame clock paused while hidden");
            self.fresh_tick = false;
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Whether the host should draw a frame now. Consumes a pending fresh tick.
    pub fn frame_due(&mut self) -> bool {
        if !(self.running && self.visible) {
            return false;
        }
        self.fresh_tick = false;
        self.frames += 1;
        true
    }

    /// A frame was requested by a resume or start and has not been drawn yet.
    pub fn has_fresh_tick(&self) -> bool {
        self.fresh_tick
    }

    /// Frames handed out since creation.
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl FrameScheduler for FrameClock {
    fn start(&mut self) {
        if self.running {
            return;
        }
        debug!("Frame clock started");
        self.running = true;
        self.fresh_tick = self.visible;
    }

    fn stop(&mut self) {
        if !self.running {
            return;
        }
        debug!("Frame clock stopped");
        self.running = false;
        self.fresh_tick = false;
    }

    fn is_running(&self) -> bool {
        self.running
    }
}
