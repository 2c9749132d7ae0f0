pub mod terminal;

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Color;

use wavestrip::color::RgbColor;
use wavestrip::mapping::DrawCommand;
use wavestrip::renderer::{Canvas, RenderSurface};

/// Logical units per terminal column. A 24-column strip is 120 units wide.
pub const UNITS_PER_COLUMN: f32 = 5.0;
/// Logical units per terminal row; each row holds two half-block pixels.
pub const UNITS_PER_ROW: f32 = UNITS_PER_COLUMN * 2.0;

/// Surface for dispatches that never tick (IPC, discovery).
pub struct NullSurface;

impl RenderSurface for NullSurface {
    fn draw(&mut self, _commands: &[DrawCommand], _width: f32, _height: f32) {}
}

/// Canvas sized to a block of terminal cells, two pixels per cell.
pub struct StripSurface {
    canvas: Canvas,
}

impl StripSurface {
    pub fn new() -> Self {
        Self {
            canvas: Canvas::with_scale(0, 0, 1.0 / UNITS_PER_COLUMN),
        }
    }

    /// Match the canvas to `area` and return its logical size.
    pub fn fit(&mut self, area: Rect) -> (f32, f32) {
        let (w, h) = (area.width as usize, area.height as usize * 2);
        if (w, h) != (self.canvas.width, self.canvas.height) {
            self.canvas.resize(w, h);
            self.canvas.clear();
        }
        self.canvas.logical_size()
    }

    /// Replace the contents with the empty backdrop.
    pub fn blank(&mut self, opacity: f32) {
        self.canvas.clear();
        let (w, h) = (self.canvas.width, self.canvas.height);
        for y in 0..h {
            for x in 0..w {
                self.canvas.blend_pixel(x, y, RgbColor::BLACK, opacity);
            }
        }
    }

    /// Copy the canvas into `buf` at `area` using upper half blocks.
    pub fn blit(&self, area: Rect, buf: &mut Buffer) {
        let to_color = |c: Option<RgbColor>| match c {
            Some(c) => Color::Rgb(c.r, c.g, c.b),
            None => Color::Reset,
        };
        for row in 0..area.height {
            for col in 0..area.width {
                let (x, y) = (col as usize, row as usize * 2);
                let top = to_color(self.canvas.opaque_pixel(x, y));
                let bottom = to_color(self.canvas.opaque_pixel(x, y + 1));
                if let Some(cell) = buf.cell_mut((area.x + col, area.y + row)) {
                    cell.set_char('▀').set_fg(top).set_bg(bottom);
                }
            }
        }
    }
}

impl RenderSurface for StripSurface {
    fn draw(&mut self, commands: &[DrawCommand], width: f32, height: f32) {
        self.canvas.draw(commands, width, height);
    }
}

/// Right-hand strip of `width` columns inside `area`.
pub fn strip_area(area: Rect, width: u16) -> Rect {
    let width = width.min(area.width);
    Rect::new(area.x + area.width - width, area.y, width, area.height)
}

/// Pointer position in logical units relative to the strip, or `None`
/// outside it.
pub fn pointer_in_strip(strip: Rect, column: u16, row: u16) -> Option<(f32, f32)> {
    let inside = column >= strip.x
        && column < strip.x + strip.width
        && row >= strip.y
        && row < strip.y + strip.height;
    inside.then(|| pointer_units(strip, column, row))
}

/// Pointer position in logical units relative to the strip origin; may be
/// negative or beyond the strip while a drag continues outside it.
pub fn pointer_units(strip: Rect, column: u16, row: u16) -> (f32, f32) {
    (
        (column as f32 - strip.x as f32) * UNITS_PER_COLUMN,
        (row as f32 - strip.y as f32) * UNITS_PER_ROW,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use wavestrip::mapping::{BarMapper, MappingStyle};
    use wavestrip::params::VisualParameters;

    #[test]
    fn strip_hugs_the_right_edge() {
        let area = Rect::new(0, 0, 80, 30);
        assert_eq!(strip_area(area, 24), Rect::new(56, 0, 24, 30));
        assert_eq!(strip_area(Rect::new(0, 0, 10, 5), 24), Rect::new(0, 0, 10, 5));
    }

    #[test]
    fn pointer_maps_to_units() {
        let strip = Rect::new(56, 0, 24, 30);
        assert_eq!(pointer_in_strip(strip, 55, 3), None);
        assert_eq!(pointer_in_strip(strip, 56, 0), Some((0.0, 0.0)));
        assert_eq!(pointer_in_strip(strip, 60, 3), Some((20.0, 30.0)));
        assert_eq!(pointer_units(strip, 50, 3), (-30.0, 30.0));
    }

    #[test]
    fn fit_sizes_canvas_in_units() {
        let mut surface = StripSurface::new();
        let (w, h) = surface.fit(Rect::new(56, 0, 24, 30));
        assert!((w - 120.0).abs() < 1e-3);
        assert!((h - 300.0).abs() < 1e-3);
    }

    #[test]
    fn frame_is_blitted_as_half_blocks() {
        let area = Rect::new(0, 0, 24, 10);
        let mut surface = StripSurface::new();
        let (w, h) = surface.fit(area);
        let params = VisualParameters::default();
        let mut mapper = BarMapper::new(MappingStyle::default(), &params);
        let commands = mapper.render(&[255; 128], &params, w, h);
        surface.draw(&commands, w, h);

        let mut buf = Buffer::empty(area);
        surface.blit(area, &mut buf);
        let cell = &buf[(5, 5)];
        assert_eq!(cell.symbol(), "▀");
        assert_ne!(cell.fg, Color::Reset);

        surface.blank(0.7);
        surface.blit(area, &mut buf);
        assert_eq!(buf[(5, 5)].fg, Color::Rgb(0, 0, 0));
    }
}
