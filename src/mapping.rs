//! Magnitudes to mirrored bar geometry.
//!
//! The strip is split at its vertical centre. Half-bar 0 is one bar sitting
//! on the centerline; half-bars `1..half` stack outward above it and are
//! mirrored below it. Bars grow to the right from a fixed left margin.

use crate::color::{BaseColor, ColorCache, RgbColor};
use crate::params::VisualParameters;
use crate::peak::PeakTracker;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientStop {
    pub offset: f32,
    pub color: RgbColor,
}

/// Vertical linear gradient between `y0` and `y1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearGradient {
    pub y0: f32,
    pub y1: f32,
    pub stops: [GradientStop; 4],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Half {
    Top,
    Bottom,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Background {
        color: RgbColor,
        alpha: f32,
    },
    Bar {
        half: Half,
        index: usize,
        rect: Rect,
        gradient: LinearGradient,
    },
    /// Cosmetic halo around a loud bar.
    Glow {
        rect: Rect,
        color: RgbColor,
        blur: f32,
    },
    PeakMarker {
        half: Half,
        index: usize,
        rect: Rect,
        color: RgbColor,
    },
}

/// Fixed visual constants of the strip.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MappingStyle {
    pub peak_decay: f32,
    /// Horizontal space not available to bars; half of it sits on the left.
    pub margin: f32,
    /// Subtracted from both ends of each bar's slot.
    pub bar_spacing: f32,
    pub glow_threshold: f32,
    pub glow_blur: f32,
    pub peak_threshold: f32,
    pub peak_marker_width: f32,
    pub background_opacity: f32,
}

impl Default for MappingStyle {
    fn default() -> Self {
        Self {
            peak_decay: 0.97,
            margin: 10.0,
            bar_spacing: 2.0,
            glow_threshold: 20.0,
            glow_blur: 10.0,
            peak_threshold: 0.1,
            peak_marker_width: 2.0,
            background_opacity: 0.7,
        }
    }
}

const GRADIENT_OFFSETS: [f32; 4] = [0.0, 0.33, 0.66, 1.0];
const GRADIENT_COLORS: [BaseColor; 4] = [
    BaseColor::Pink,
    BaseColor::Violet,
    BaseColor::Azure,
    BaseColor::Spring,
];

/// Stateful renderer: owns the peak-hold arena and the rotated palette.
#[derive(Debug, Clone)]
pub struct BarMapper {
    style: MappingStyle,
    peaks: PeakTracker,
    colors: ColorCache,
}

impl BarMapper {
    pub fn new(style: MappingStyle, params: &VisualParameters) -> Self {
        Self {
            peaks: PeakTracker::new(params.half_bars(), style.peak_decay),
            colors: ColorCache::new(),
            style,
        }
    }

    pub fn style(&self) -> &MappingStyle {
        &self.style
    }

    pub fn peaks(&self) -> &[f32] {
        self.peaks.peaks()
    }

    /// Map one frame of byte magnitudes to draw commands.
    ///
    /// An empty `magnitudes` slice renders as silence so frame cadence holds
    /// when the provider has nothing.
    pub fn render(
        &mut self,
        magnitudes: &[u8],
        params: &VisualParameters,
        width: f32,
        height: f32,
    ) -> Vec<DrawCommand> {
        let half_bars = params.half_bars();
        if half_bars != self.peaks.live() {
            self.peaks.resize(half_bars);
        }

        let rotation = params.hue_rotation();
        let top_stops = self.gradient_stops(rotation, false);
        let bottom_stops = self.gradient_stops(rotation, true);
        let glow = self.colors.get(BaseColor::Glow, rotation);

        let width = width.max(0.0);
        let height = height.max(0.0);
        let center_y = height / 2.0;
        let bar_height = if half_bars == 0 {
            0.0
        } else {
            center_y / half_bars as f32
        };
        let drawn_height = (bar_height - self.style.bar_spacing * 2.0).max(0.0);
        let left = self.style.margin / 2.0;
        let max_width = (width - self.style.margin).max(0.0);

        let top_gradient = LinearGradient {
            y0: 0.0,
            y1: center_y,
            stops: top_stops,
        };
        let bottom_gradient = LinearGradient {
            y0: center_y,
            y1: height,
            stops: bottom_stops,
        };

        let mut commands = Vec::with_capacity(1 + half_bars * 6);
        commands.push(DrawCommand::Background {
            color: RgbColor::BLACK,
            alpha: self.style.background_opacity,
        });

        for i in 0..half_bars {
            let value = sample(magnitudes, i, half_bars);
            let peak = self.peaks.update(i, value);
            let bar_width = value * max_width;

            // slot top edge for the upper bar, measured from the centerline
            let top_slot = center_y - bar_height / 2.0 - i as f32 * bar_height;
            let bottom = (i > 0).then(|| {
                let bottom_slot = center_y + bar_height / 2.0 + (i - 1) as f32 * bar_height;
                (Half::Bottom, bottom_slot, bottom_gradient)
            });

            for (half, slot_y, gradient) in
                std::iter::once((Half::Top, top_slot, top_gradient)).chain(bottom)
            {
                let rect = Rect::new(
                    left,
                    slot_y + self.style.bar_spacing,
                    bar_width,
                    drawn_height,
                );
                commands.push(DrawCommand::Bar {
                    half,
                    index: i,
                    rect,
                    gradient,
                });

                if bar_width > self.style.glow_threshold {
                    commands.push(DrawCommand::Glow {
                        rect,
                        color: glow,
                        blur: self.style.glow_blur,
                    });
                }

                if peak > self.style.peak_threshold {
                    let marker_width = self.style.peak_marker_width;
                    let x = (left + peak * max_width - marker_width).max(left);
                    commands.push(DrawCommand::PeakMarker {
                        half,
                        index: i,
                        rect: Rect::new(x, rect.y, marker_width, drawn_height),
                        color: glow,
                    });
                }
            }
        }

        commands
    }

    fn gradient_stops(&mut self, rotation: f32, reversed: bool) -> [GradientStop; 4] {
        let mut stops = [GradientStop {
            offset: 0.0,
            color: RgbColor::BLACK,
        }; 4];
        for (slot, stop) in stops.iter_mut().enumerate() {
            let palette_index = if reversed { 3 - slot } else { slot };
            *stop = GradientStop {
                offset: GRADIENT_OFFSETS[slot],
                color: self.colors.get(GRADIENT_COLORS[palette_index], rotation),
            };
        }
        stops
    }
}

/// Normalized magnitude feeding half-bar `index`.
fn sample(magnitudes: &[u8], index: usize, half_bars: usize) -> f32 {
    if magnitudes.is_empty() || half_bars == 0 {
        return 0.0;
    }
    let data_index = (index * magnitudes.len()) / half_bars;
    magnitudes
        .get(data_index)
        .map(|&m| m as f32 / 255.0)
        .unwrap_or(0.0)
}
