//! Pointer drag to hue rotation and bar count.
//!
//! Vertical motion rotates the hue, horizontal motion steps the bar count.
//! Changes apply immediately and are written to the store once, when the
//! drag ends.

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::params::VisualParameters;
use crate::settings::{save_parameters, SettingsStore};

/// Gesture sensitivity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlTuning {
    /// Degrees of hue per unit of upward motion.
    pub hue_sensitivity: f32,
    /// Horizontal travel that must be exceeded before the bar count steps.
    pub bar_step_threshold: f32,
}

impl Default for ControlTuning {
    fn default() -> Self {
        Self {
            hue_sensitivity: 0.5,
            bar_step_threshold: 2.0,
        }
    }
}

/// Origin of the gesture increment in progress.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragSession {
    pub origin_x: f32,
    pub origin_y: f32,
}

#[derive(Debug, Clone, Default)]
pub struct ParameterController {
    tuning: ControlTuning,
    drag: Option<DragSession>,
    dirty: bool,
}

impl ParameterController {
    pub fn new(tuning: ControlTuning) -> Self {
        Self {
            tuning,
            drag: None,
            dirty: false,
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    pub fn drag(&self) -> Option<DragSession> {
        self.drag
    }

    /// Parameters changed since the last write.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn pointer_down(&mut self, x: f32, y: f32) {
        self.drag = Some(DragSession {
            origin_x: x,
            origin_y: y,
        });
    }

    /// Apply one pointer move. Returns true if `params` changed.
    pub fn pointer_move(&mut self, x: f32, y: f32, params: &mut VisualParameters) -> bool {
        let Some(drag) = self.drag.as_mut() else {
            return false;
        };
        let mut changed = false;

        let delta_y = drag.origin_y - y;
        if delta_y != 0.0 {
            params.rotate_hue(delta_y * self.tuning.hue_sensitivity);
            drag.origin_y = y;
            changed = true;
        }

        let delta_x = x - drag.origin_x;
        if delta_x.abs() > self.tuning.bar_step_threshold {
            params.step_bars(delta_x);
            drag.origin_x = x;
            changed = true;
        }

        if changed {
            self.dirty = true;
        }
        changed
    }

    /// End the drag (release or pointer leaving the window) and write the
    /// parameters if anything changed.
    pub fn pointer_up<S: SettingsStore + ?Sized>(
        &mut self,
        params: &VisualParameters,
        store: &mut S,
    ) {
        self.drag = None;
        if self.dirty {
            self.persist(params, store);
        }
    }

    /// Restore defaults and write them immediately. The drag, if any, continues.
    pub fn reset<S: SettingsStore + ?Sized>(&mut self, params: &mut VisualParameters, store: &mut S) {
        *params = VisualParameters::default();
        info!("Visual settings reset to defaults");
        self.persist(params, store);
    }

    fn persist<S: SettingsStore + ?Sized>(&mut self, params: &VisualParameters, store: &mut S) {
        match save_parameters(store, params) {
            Ok(()) => debug!(
                "Saved hue {:.1}, bars {}",
                params.hue_rotation(),
                params.bar_count()
            ),
            Err(e) => warn!("Failed to save visual settings: {}, keeping them in memory", e),
        }
        self.dirty = false;
    }
}

/// Turns two quick presses at the same spot into one reset.
#[derive(Debug, Clone)]
pub struct DoubleActivation {
    window: Duration,
    slop: f32,
    last: Option<(Instant, f32, f32)>,
}

impl DoubleActivation {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            slop: 2.0,
            last: None,
        }
    }

    /// Record a press. Returns true when it completes a double activation.
    pub fn press(&mut self, x: f32, y: f32, at: Instant) -> bool {
        if let Some((when, lx, ly)) = self.last {
            let quick = at.saturating_duration_since(when) <= self.window;
            let close = (x - lx).abs() <= self.slop && (y - ly).abs() <= self.slop;
            if quick && close {
                self.last = None;
                return true;
            }
        }
        self.last = Some((at, x, y));
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{MemoryStore, SettingKey};
    use crate::testing::FailingStore;

    fn controller() -> ParameterController {
        ParameterController::new(ControlTuning::default())
    }

    #[test]
    fn vertical_then_horizontal_drag() {
        let mut c = controller();
        let mut params = VisualParameters::default();

        c.pointer_down(100.0, 100.0);
        assert!(c.pointer_move(100.0, 70.0, &mut params));
        assert!((params.hue_rotation() - 15.0).abs() < 1e-4);
        assert_eq!(params.bar_count(), 40);

        assert!(c.pointer_move(140.0, 70.0, &mut params));
        assert_eq!(params.bar_count(), 41);
        assert!((params.hue_rotation() - 15.0).abs() < 1e-4);
        assert!(c.is_dirty());
    }

    #[test]
    fn hue_is_per_increment_not_cumulative() {
        let mut c = controller();
        let mut params = VisualParameters::default();
        c.pointer_down(0.0, 100.0);
        c.pointer_move(0.0, 90.0, &mut params);
        c.pointer_move(0.0, 80.0, &mut params);
        // 10 + 10 units of travel, not 10 + 20
        assert!((params.hue_rotation() - 10.0).abs() < 1e-4);

        c.pointer_move(0.0, 100.0, &mut params);
        assert!((params.hue_rotation() - 0.0).abs() < 1e-4);
    }

    #[test]
    fn small_horizontal_motion_accumulates_until_threshold() {
        let mut c = controller();
        let mut params = VisualParameters::default();
        c.pointer_down(50.0, 50.0);
        assert!(!c.pointer_move(51.0, 50.0, &mut params));
        assert!(!c.pointer_move(52.0, 50.0, &mut params));
        assert!(c.pointer_move(53.0, 50.0, &mut params));
        assert_eq!(params.bar_count(), 41);

        assert!(c.pointer_move(10.0, 50.0, &mut params));
        assert_eq!(params.bar_count(), 40);
    }

    #[test]
    fn moves_without_drag_are_ignored() {
        let mut c = controller();
        let mut params = VisualParameters::default();
        assert!(!c.pointer_move(10.0, 10.0, &mut params));
        assert_eq!(params, VisualParameters::default());
        assert!(!c.is_dirty());
    }

    #[test]
    fn hue_wraps_during_drag() {
        let mut c = controller();
        let mut params = VisualParameters::new(350.0, 40);
        c.pointer_down(0.0, 100.0);
        c.pointer_move(0.0, 60.0, &mut params);
        assert!((params.hue_rotation() - 10.0).abs() < 1e-3);
    }

    #[test]
    fn bar_count_clamps_at_bounds() {
        let mut c = controller();
        let mut params = VisualParameters::new(0.0, 79);
        c.pointer_down(0.0, 0.0);
        for step in 1..10 {
            c.pointer_move(step as f32 * 5.0, 0.0, &mut params);
        }
        assert_eq!(params.bar_count(), 80);
    }

    #[test]
    fn dirty_release_writes_each_parameter_once() {
        let mut c = controller();
        let mut store = MemoryStore::new();
        let mut params = VisualParameters::default();

        c.pointer_down(100.0, 100.0);
        for y in (50..100).rev() {
            c.pointer_move(100.0, y as f32, &mut params);
        }
        assert_eq!(store.writes(), 0);

        c.pointer_up(&params, &mut store);
        assert_eq!(store.writes(), 2);
        assert!(!c.is_dirty());
        assert!(!c.is_dragging());
        let saved = store.get(SettingKey::HueRotation).unwrap().unwrap();
        assert!((saved as f32 - params.hue_rotation()).abs() < 1e-4);
        assert_eq!(store.get(SettingKey::BarCount).unwrap(), Some(40.0));
    }

    #[test]
    fn clean_release_writes_nothing() {
        let mut c = controller();
        let mut store = MemoryStore::new();
        let params = VisualParameters::default();
        c.pointer_down(1.0, 1.0);
        c.pointer_up(&params, &mut store);
        c.pointer_up(&params, &mut store);
        assert_eq!(store.writes(), 0);
    }

    #[test]
    fn reset_twice_matches_reset_once() {
        let mut c = controller();
        let mut once = MemoryStore::new();
        let mut twice = MemoryStore::new();
        let mut a = VisualParameters::new(200.0, 70);
        let mut b = a;

        c.reset(&mut a, &mut once);
        c.reset(&mut b, &mut twice);
        c.reset(&mut b, &mut twice);

        assert_eq!(a, b);
        assert_eq!(a, VisualParameters::default());
        for key in [SettingKey::HueRotation, SettingKey::BarCount] {
            assert_eq!(once.get(key).unwrap(), twice.get(key).unwrap());
        }
    }

    #[test]
    fn reset_during_drag_keeps_dragging_and_clears_dirty() {
        let mut c = controller();
        let mut store = MemoryStore::new();
        let mut params = VisualParameters::default();
        c.pointer_down(0.0, 100.0);
        c.pointer_move(0.0, 0.0, &mut params);
        c.reset(&mut params, &mut store);
        assert!(c.is_dragging());
        assert!(!c.is_dirty());
        assert_eq!(store.writes(), 2);

        c.pointer_up(&params, &mut store);
        assert_eq!(store.writes(), 2);
    }

    #[test]
    fn failed_save_keeps_values_in_memory() {
        let mut c = controller();
        let mut store = FailingStore::default();
        let mut params = VisualParameters::default();
        c.pointer_down(0.0, 10.0);
        c.pointer_move(0.0, 0.0, &mut params);
        c.pointer_up(&params, &mut store);
        assert_eq!(store.attempts, 2);
        assert!((params.hue_rotation() - 5.0).abs() < 1e-4);
    }

    #[test]
    fn double_activation_needs_two_close_quick_presses() {
        let mut detector = DoubleActivation::new(Duration::from_millis(400));
        let t0 = Instant::now();
        assert!(!detector.press(10.0, 10.0, t0));
        assert!(detector.press(11.0, 10.0, t0 + Duration::from_millis(200)));
        // consumed: a third press starts over
        assert!(!detector.press(11.0, 10.0, t0 + Duration::from_millis(300)));

        assert!(!detector.press(11.0, 10.0, t0 + Duration::from_millis(900)));
        assert!(!detector.press(30.0, 10.0, t0 + Duration::from_millis(950)));
    }
}
