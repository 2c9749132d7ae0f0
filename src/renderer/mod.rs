//! Pixel renderer for draw commands.
//!
//! The bar mapper speaks in logical units (the strip is ~120 units wide).
//! `Canvas` rasterizes those commands into an owned RGBA buffer at a
//! configurable pixels-per-unit scale; output backends convert the buffer to
//! their native format.

mod paint;

use crate::color::RgbColor;
use crate::mapping::DrawCommand;

/// Consumer of one frame of draw commands.
pub trait RenderSurface {
    fn draw(&mut self, commands: &[DrawCommand], width: f32, height: f32);
}

/// Owned RGBA pixel buffer.
///
/// Internal format is 4 bytes per pixel in **RGBA** order, straight (not
/// pre-multiplied) alpha.
pub struct Canvas {
    pub data: Vec<u8>,
    pub width: usize,
    pub height: usize,
    scale: f32,
}

impl Canvas {
    pub fn new(width: usize, height: usize) -> Self {
        Self::with_scale(width, height, 1.0)
    }

    /// `scale` is pixels per logical unit.
    pub fn with_scale(width: usize, height: usize, scale: f32) -> Self {
        Self {
            data: vec![0u8; width * height * 4],
            width,
            height,
            scale: if scale > 0.0 { scale } else { 1.0 },
        }
    }

    /// Resize the canvas, reallocating only when the buffer is too small.
    pub fn resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        let needed = width * height * 4;
        if self.data.len() < needed {
            self.data.resize(needed, 0);
        }
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Canvas size in logical units, as handed to the bar mapper.
    pub fn logical_size(&self) -> (f32, f32) {
        (
            self.width as f32 / self.scale,
            self.height as f32 / self.scale,
        )
    }

    /// Clear the canvas to fully transparent black.
    #[inline]
    pub fn clear(&mut self) {
        let len = self.width * self.height * 4;
        self.data[..len].fill(0);
    }

    /// Composite a color over the pixel at (x, y) with the given opacity.
    #[inline]
    pub fn blend_pixel(&mut self, x: usize, y: usize, color: RgbColor, opacity: f32) {
        if x >= self.width || y >= self.height {
            return;
        }
        let a = opacity.clamp(0.0, 1.0);
        if a <= 0.0 {
            return;
        }
        let idx = (y * self.width + x) * 4;
        let dst_a = self.data[idx + 3] as f32 / 255.0;
        let out_a = a + dst_a * (1.0 - a);
        let mix = |src: u8, dst: u8| {
            if out_a <= 0.0 {
                return 0;
            }
            ((src as f32 * a + dst as f32 * dst_a * (1.0 - a)) / out_a).round() as u8
        };
        self.data[idx] = mix(color.r, self.data[idx]);
        self.data[idx + 1] = mix(color.g, self.data[idx + 1]);
        self.data[idx + 2] = mix(color.b, self.data[idx + 2]);
        self.data[idx + 3] = (out_a * 255.0).round() as u8;
    }

    /// Read the RGBA values at (x, y).
    #[inline]
    pub fn get_pixel(&self, x: usize, y: usize) -> (u8, u8, u8, u8) {
        let idx = (y * self.width + x) * 4;
        if x < self.width && idx + 3 < self.data.len() {
            (self.data[idx], self.data[idx + 1], self.data[idx + 2], self.data[idx + 3])
        } else {
            (0, 0, 0, 0)
        }
    }

    /// Pixel color composited over black, or `None` where nothing was drawn.
    pub fn opaque_pixel(&self, x: usize, y: usize) -> Option<RgbColor> {
        let (r, g, b, a) = self.get_pixel(x, y);
        if a == 0 {
            return None;
        }
        let k = a as f32 / 255.0;
        let scale = |c: u8| (c as f32 * k).round() as u8;
        Some(RgbColor::new(scale(r), scale(g), scale(b)))
    }
}

impl RenderSurface for Canvas {
    fn draw(&mut self, commands: &[DrawCommand], _width: f32, _height: f32) {
        self.clear();
        for command in commands {
            match command {
                DrawCommand::Background { color, alpha } => {
                    paint::fill_all(self, *color, *alpha);
                }
                DrawCommand::Bar { rect, gradient, .. } => {
                    paint::fill_gradient(self, rect, gradient);
                }
                DrawCommand::Glow { rect, color, blur } => {
                    paint::glow(self, rect, *color, *blur);
                }
                DrawCommand::PeakMarker { rect, color, .. } => {
                    paint::fill_rect(self, rect, *color, 1.0);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::{BarMapper, MappingStyle};
    use crate::params::VisualParameters;

    #[test]
    fn blend_over_transparent_keeps_color() {
        let mut canvas = Canvas::new(2, 2);
        canvas.blend_pixel(0, 0, RgbColor::new(200, 100, 0), 0.5);
        assert_eq!(canvas.get_pixel(0, 0), (200, 100, 0, 128));
        assert_eq!(canvas.opaque_pixel(0, 0), Some(RgbColor::new(100, 50, 0)));
        assert_eq!(canvas.opaque_pixel(1, 1), None);
    }

    #[test]
    fn out_of_bounds_writes_are_dropped() {
        let mut canvas = Canvas::new(2, 2);
        canvas.blend_pixel(5, 0, RgbColor::new(1, 2, 3), 1.0);
        assert!(canvas.data.iter().all(|b| *b == 0));
        assert_eq!(canvas.get_pixel(2, 0), (0, 0, 0, 0));
    }

    #[test]
    fn logical_size_follows_scale() {
        let canvas = Canvas::with_scale(24, 100, 0.2);
        let (w, h) = canvas.logical_size();
        assert!((w - 120.0).abs() < 1e-3);
        assert!((h - 500.0).abs() < 1e-3);
    }

    #[test]
    fn loud_frame_lights_the_centerline() {
        let mut canvas = Canvas::with_scale(24, 100, 0.2);
        let (w, h) = canvas.logical_size();
        let params = VisualParameters::default();
        let mut mapper = BarMapper::new(MappingStyle::default(), &params);
        let commands = mapper.render(&[255; 128], &params, w, h);
        canvas.draw(&commands, w, h);

        // background everywhere, bars brighter than background on the centre row
        let (_, _, _, a) = canvas.get_pixel(23, 0);
        assert!(a > 0);
        let centre = canvas.opaque_pixel(10, 50).unwrap();
        assert!(centre.r as u16 + centre.g as u16 + centre.b as u16 > 100);
    }
}
