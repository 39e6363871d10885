//! `#RRGGBB` colour handling shared by the layout and both renderers.

use image::Rgba;

pub const WHITE: Rgb = Rgb(0xFF, 0xFF, 0xFF);
pub const BACKBONE_GREY: Rgb = Rgb(0xBA, 0xBD, 0xB6);
pub const AXIS_GREY: Rgb = Rgb(0xAA, 0xAA, 0xAA);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// Accepts `#RRGGBB` or `RRGGBB`, case-insensitive.
    pub fn parse(text: &str) -> Option<Self> {
        let hex = text.trim();
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some(Rgb(channel(0)?, channel(2)?, channel(4)?))
    }

    /// Straight per-channel average of two colours.
    pub fn blend(self, other: Rgb) -> Rgb {
        let mix = |a: u8, b: u8| ((u16::from(a) + u16::from(b)) / 2) as u8;
        Rgb(mix(self.0, other.0), mix(self.1, other.1), mix(self.2, other.2))
    }

    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.0, self.1, self.2)
    }

    pub fn with_alpha(self, alpha: u8) -> Rgba<u8> {
        Rgba([self.0, self.1, self.2, alpha])
    }

    pub fn opaque(self) -> Rgba<u8> {
        self.with_alpha(0xFF)
    }
}

/// Blends a feature colour halfway towards white; unparsable colours fall back to black.
pub fn blend_with_white(color: &str) -> String {
    Rgb::parse(color).unwrap_or_default().blend(WHITE).to_hex()
}

/// Raster colour for a `#RRGGBB` string, black when unparsable.
pub fn rgba_from_hex(color: &str) -> Rgba<u8> {
    Rgb::parse(color).unwrap_or_default().opaque()
}
