use palette::{Hsl, IntoColor, Srgb};
use std::fmt;
use std::str::FromStr;

/// 8-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RgbColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl RgbColor {
    pub const BLACK: RgbColor = RgbColor::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse from hex string like "#FF0000" or "FF0000"
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
        let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
        let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
        Some(Self { r, g, b })
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl fmt::Display for RgbColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for RgbColor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s).ok_or_else(|| format!("Invalid hex color: {}", s))
    }
}

/// The fixed palette every frame is painted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseColor {
    Pink,
    Violet,
    Azure,
    Spring,
    /// Glow and peak-marker accent
    Glow,
}

impl BaseColor {
    pub const COUNT: usize = 5;

    pub fn all() -> &'static [BaseColor; BaseColor::COUNT] {
        &[
            BaseColor::Pink,
            BaseColor::Violet,
            BaseColor::Azure,
            BaseColor::Spring,
            BaseColor::Glow,
        ]
    }

    /// Unrotated color.
    pub fn base(&self) -> RgbColor {
        match self {
            BaseColor::Pink => RgbColor::new(0xff, 0x00, 0x80),
            BaseColor::Violet => RgbColor::new(0x80, 0x00, 0xff),
            BaseColor::Azure => RgbColor::new(0x00, 0x80, 0xff),
            BaseColor::Spring => RgbColor::new(0x00, 0xff, 0x80),
            BaseColor::Glow => RgbColor::new(0x00, 0xff, 0x88),
        }
    }

    fn slot(&self) -> usize {
        *self as usize
    }
}

/// Rotate a color around the HSL hue wheel by `degrees`.
///
/// Saturation and lightness are kept; the result is rounded back to 8 bits.
pub fn rotate_hue(color: RgbColor, degrees: f32) -> RgbColor {
    let degrees = degrees.rem_euclid(360.0);
    if degrees == 0.0 || !degrees.is_finite() {
        return color;
    }

    let rgb = Srgb::new(
        color.r as f32 / 255.0,
        color.g as f32 / 255.0,
        color.b as f32 / 255.0,
    );
    let hsl: Hsl = rgb.into_color();
    let hue = (hsl.hue.into_positive_degrees() + degrees).rem_euclid(360.0);
    let rotated: Srgb = Hsl::new(hue, hsl.saturation, hsl.lightness).into_color();

    RgbColor::new(
        to_channel(rotated.red),
        to_channel(rotated.green),
        to_channel(rotated.blue),
    )
}

fn to_channel(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Rotated palette, memoized for the last rotation seen.
///
/// A rotation change drops every slot at once.
#[derive(Debug, Clone, Default)]
pub struct ColorCache {
    slots: [Option<RgbColor>; BaseColor::COUNT],
    rotation: Option<f32>,
}

impl ColorCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&mut self, color: BaseColor, rotation: f32) -> RgbColor {
        if self.rotation != Some(rotation) {
            self.slots = [None; BaseColor::COUNT];
            self.rotation = Some(rotation);
        }
        *self.slots[color.slot()].get_or_insert_with(|| rotate_hue(color.base(), rotation))
    }

    /// Rotation the cached slots belong to, if any.
    pub fn rotation(&self) -> Option<f32> {
        self.rotation
    }

    pub fn cached_slots(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }
}

/// Interpolate between two colors
pub fn lerp_color(a: RgbColor, b: RgbColor, t: f32) -> RgbColor {
    let t = t.clamp(0.0, 1.0);
    let mix = |x: u8, y: u8| (x as f32 + (y as f32 - x as f32) * t).round() as u8;
    RgbColor::new(mix(a.r, b.r), mix(a.g, b.g), mix(a.b, b.b))
}
