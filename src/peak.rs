//! Per-bar peak hold with exponential decay.

use crate::params::MAX_HALF_BARS;

/// Decaying maximum per half-bar.
///
/// Storage is a fixed arena sized for the largest bar count; only the first
/// `live` slots take part in rendering.
#[derive(Debug, Clone)]
pub struct PeakTracker {
    peaks: [f32; MAX_HALF_BARS],
    live: usize,
    decay: f32,
}

impl PeakTracker {
    pub fn new(live: usize, decay: f32) -> Self {
        Self {
            peaks: [0.0; MAX_HALF_BARS],
            live: live.min(MAX_HALF_BARS),
            decay: decay.clamp(0.0, 1.0),
        }
    }

    /// Change the number of live slots. Prefix values survive, dropped
    /// slots are zeroed so a later grow starts them from silence.
    pub fn resize(&mut self, live: usize) {
        let live = live.min(MAX_HALF_BARS);
        if live < self.live {
            self.peaks[live..self.live].fill(0.0);
        }
        self.live = live;
    }

    /// Fold a normalized value into slot `index` and return the new peak.
    pub fn update(&mut self, index: usize, value: f32) -> f32 {
        if index >= self.live {
            return 0.0;
        }
        let peak = &mut self.peaks[index];
        if value > *peak {
            *peak = value.min(1.0);
        } else {
            *peak *= self.decay;
        }
        *peak
    }

    pub fn peaks(&self) -> &[f32] {
        &self.peaks[..self.live]
    }

    pub fn live(&self) -> usize {
        self.live
    }

    pub fn decay(&self) -> f32 {
        self.decay
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peak_jumps_up_then_decays() {
        let mut tracker = PeakTracker::new(4, 0.97);
        assert_eq!(tracker.update(0, 0.8), 0.8);
        let decayed = tracker.update(0, 0.1);
        assert!((decayed - 0.8 * 0.97).abs() < 1e-6);
        assert_eq!(tracker.update(0, 0.9), 0.9);
    }

    #[test]
    fn decay_never_drops_faster_than_factor() {
        let mut tracker = PeakTracker::new(1, 0.97);
        let inputs = [0.5, 0.2, 0.0, 0.9, 0.3, 0.3, 1.0, 0.0, 0.0, 0.6];
        let mut previous = 0.0f32;
        for value in inputs {
            let peak = tracker.update(0, value);
            assert!(peak >= previous * 0.97 - 1e-6);
            assert!((0.0..=1.0).contains(&peak));
            previous = peak;
        }
    }

    #[test]
    fn resize_keeps_prefix_and_zeroes_tail() {
        let mut tracker = PeakTracker::new(6, 0.97);
        for i in 0..6 {
            tracker.update(i, 0.5);
        }
        tracker.resize(3);
        assert_eq!(tracker.peaks(), &[0.5, 0.5, 0.5]);

        tracker.resize(6);
        assert_eq!(tracker.peaks(), &[0.5, 0.5, 0.5, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn out_of_range_slots_are_ignored() {
        let mut tracker = PeakTracker::new(2, 0.97);
        assert_eq!(tracker.update(5, 1.0), 0.0);
        tracker.resize(MAX_HALF_BARS + 10);
        assert_eq!(tracker.live(), MAX_HALF_BARS);
    }
}
