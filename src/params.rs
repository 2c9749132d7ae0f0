//! User-tunable visual parameters.

pub const MIN_BARS: u32 = 10;
pub const MAX_BARS: u32 = 80;
pub const DEFAULT_BARS: u32 = 40;
pub const DEFAULT_HUE_ROTATION: f32 = 0.0;
pub const MAX_HALF_BARS: usize = (MAX_BARS / 2) as usize;

/// Hue rotation and bar density, shared between the controller (writer)
/// and the bar mapper (reader).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisualParameters {
    hue_rotation: f32,
    bar_count: u32,
}

impl Default for VisualParameters {
    fn default() -> Self {
        Self {
            hue_rotation: DEFAULT_HUE_ROTATION,
            bar_count: DEFAULT_BARS,
        }
    }
}

impl VisualParameters {
    /// Build from possibly out-of-range values: hue is wrapped, bar count clamped.
    pub fn new(hue_rotation: f32, bar_count: u32) -> Self {
        Self {
            hue_rotation: wrap_degrees(hue_rotation),
            bar_count: bar_count.clamp(MIN_BARS, MAX_BARS),
        }
    }

    /// Degrees in `[0, 360)`.
    pub fn hue_rotation(&self) -> f32 {
        self.hue_rotation
    }

    /// Bar count in `[MIN_BARS, MAX_BARS]`.
    pub fn bar_count(&self) -> u32 {
        self.bar_count
    }

    pub fn half_bars(&self) -> usize {
        (self.bar_count / 2) as usize
    }

    pub fn rotate_hue(&mut self, delta: f32) {
        self.hue_rotation = wrap_degrees(self.hue_rotation + delta);
    }

    /// Move the bar count one unit in the direction of `direction`'s sign.
    /// Returns true if the count changed.
    pub fn step_bars(&mut self, direction: f32) -> bool {
        let next = if direction > 0.0 {
            self.bar_count.saturating_add(1)
        } else if direction < 0.0 {
            self.bar_count.saturating_sub(1)
        } else {
            self.bar_count
        }
        .clamp(MIN_BARS, MAX_BARS);
        let changed = next != self.bar_count;
        self.bar_count = next;
        changed
    }
}

fn wrap_degrees(degrees: f32) -> f32 {
    if !degrees.is_finite() {
        return DEFAULT_HUE_ROTATION;
    }
    let wrapped = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}
