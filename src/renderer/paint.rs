//! Rasterization primitives for the canvas.

use super::Canvas;
use crate::color::{lerp_color, RgbColor};
use crate::mapping::{LinearGradient, Rect};

/// Peak opacity of the glow halo right next to the bar.
const GLOW_OPACITY: f32 = 0.35;

/// Pixel span `[start, end)` covered by a logical interval.
fn span(start: f32, length: f32, scale: f32, limit: usize) -> (usize, usize) {
    let a = (start * scale).round().max(0.0) as usize;
    let b = ((start + length) * scale).round().max(0.0) as usize;
    (a.min(limit), b.min(limit))
}

pub fn fill_all(canvas: &mut Canvas, color: RgbColor, opacity: f32) {
    for y in 0..canvas.height {
        for x in 0..canvas.width {
            canvas.blend_pixel(x, y, color, opacity);
        }
    }
}

pub fn fill_rect(canvas: &mut Canvas, rect: &Rect, color: RgbColor, opacity: f32) {
    let scale = canvas.scale();
    let (x0, x1) = span(rect.x, rect.width, scale, canvas.width);
    let (y0, y1) = span(rect.y, rect.height, scale, canvas.height);
    for y in y0..y1 {
        for x in x0..x1 {
            canvas.blend_pixel(x, y, color, opacity);
        }
    }
}

/// Color of a vertical gradient at logical height `y`.
pub fn gradient_color(gradient: &LinearGradient, y: f32) -> RgbColor {
    let extent = gradient.y1 - gradient.y0;
    let t = if extent.abs() <= f32::EPSILON {
        0.0
    } else {
        ((y - gradient.y0) / extent).clamp(0.0, 1.0)
    };

    let stops = &gradient.stops;
    if t <= stops[0].offset {
        return stops[0].color;
    }
    for pair in stops.windows(2) {
        let (lo, hi) = (pair[0], pair[1]);
        if t <= hi.offset {
            let width = hi.offset - lo.offset;
            let local = if width <= 0.0 { 1.0 } else { (t - lo.offset) / width };
            return lerp_color(lo.color, hi.color, local);
        }
    }
    stops[stops.len() - 1].color
}

pub fn fill_gradient(canvas: &mut Canvas, rect: &Rect, gradient: &LinearGradient) {
    let scale = canvas.scale();
    let (x0, x1) = span(rect.x, rect.width, scale, canvas.width);
    let (y0, y1) = span(rect.y, rect.height, scale, canvas.height);
    for y in y0..y1 {
        let color = gradient_color(gradient, (y as f32 + 0.5) / scale);
        for x in x0..x1 {
            canvas.blend_pixel(x, y, color, 1.0);
        }
    }
}

/// Soft halo around `rect`, fading out over `blur` logical units.
/// Pixels inside the rect are left alone.
pub fn glow(canvas: &mut Canvas, rect: &Rect, color: RgbColor, blur: f32) {
    let scale = canvas.scale();
    let reach = (blur * scale).max(0.0);
    if reach < 0.5 {
        return;
    }
    let (ix0, ix1) = span(rect.x, rect.width, scale, canvas.width);
    let (iy0, iy1) = span(rect.y, rect.height, scale, canvas.height);
    let (ox0, ox1) = span(rect.x - blur, rect.width + blur * 2.0, scale, canvas.width);
    let (oy0, oy1) = span(rect.y - blur, rect.height + blur * 2.0, scale, canvas.height);

    for y in oy0..oy1 {
        for x in ox0..ox1 {
            let inside = (ix0..ix1).contains(&x) && (iy0..iy1).contains(&y);
            if inside {
                continue;
            }
            let dx = distance_outside(x, ix0, ix1);
            let dy = distance_outside(y, iy0, iy1);
            let distance = ((dx * dx + dy * dy) as f32).sqrt();
            let falloff = 1.0 - distance / reach;
            if falloff > 0.0 {
                canvas.blend_pixel(x, y, color, GLOW_OPACITY * falloff);
            }
        }
    }
}

fn distance_outside(p: usize, lo: usize, hi: usize) -> usize {
    if p < lo {
        lo - p
    } else if p >= hi {
        p + 1 - hi
    } else {
        0
    }
}
