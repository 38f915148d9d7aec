//! RGBA colors with canonical hex encoding

use serde::{Deserialize, Serialize};

/// An sRGB color with a fractional alpha
///
/// Serialized as `#RRGGBB` when opaque and `#RRGGBBAA` otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

/// Error returned when a hex color string can't be parsed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid hex color: {0}")]
pub struct InvalidColor(pub String);

impl Color {
    pub const BLACK: Color = Color::rgb(0x00, 0x00, 0x00);
    pub const WHITE: Color = Color::rgb(0xFF, 0xFF, 0xFF);
    /// Platform link blue
    pub const LINK: Color = Color::rgb(0x00, 0x7A, 0xFF);
    /// Secondary label gray used for citations
    pub const SECONDARY: Color = Color::rgb(0x8A, 0x8A, 0x8E);

    /// Default highlighter palette (soft butter yellow, mint, sky, rose, peach)
    pub const PALETTE: [(&'static str, Color); 5] = [
        ("Yellow", Color::rgb(0xFE, 0xF3, 0xB5)),
        ("Green", Color::rgb(0xC8, 0xE6, 0xC9)),
        ("Blue", Color::rgb(0xBB, 0xDE, 0xFB)),
        ("Pink", Color::rgb(0xF8, 0xBB, 0xD9)),
        ("Orange", Color::rgb(0xFF, 0xE0, 0xB2)),
    ];

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Same color with a different alpha, clamped to `0.0..=1.0`
    pub fn with_alpha(self, alpha: f32) -> Self {
        Self {
            a: alpha.clamp(0.0, 1.0),
            ..self
        }
    }

    /// Parse `#RRGGBB`, `RRGGBB` or `#RRGGBBAA` (case-insensitive, surrounding whitespace ignored)
    pub fn from_hex(hex: &str) -> Option<Self> {
        let s = hex.trim();
        let s = s.strip_prefix('#').unwrap_or(s);
        if !s.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(s.get(i..i + 2)?, 16).ok();

        match s.len() {
            6 => Some(Color::rgb(channel(0)?, channel(2)?, channel(4)?)),
            8 => Some(
                Color::rgb(channel(0)?, channel(2)?, channel(4)?)
                    .with_alpha(f32::from(channel(6)?) / 255.0),
            ),
            _ => None,
        }
    }

    /// Canonical `#RRGGBB` form (alpha dropped); used for sorting and persistence
    pub fn to_hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    /// `#RRGGBB` when opaque, `#RRGGBBAA` otherwise
    pub fn to_hex_with_alpha(&self) -> String {
        if self.a >= 1.0 {
            self.to_hex()
        } else {
            format!("{}{:02X}", self.to_hex(), (self.a * 255.0).round() as u8)
        }
    }

    /// CSS `rgba()` notation
    pub fn to_css(&self) -> String {
        format!("rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::PALETTE[0].1
    }
}

impl TryFrom<String> for Color {
    type Error = InvalidColor;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Color::from_hex(&value).ok_or(InvalidColor(value))
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_hex_with_alpha()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex() {
        assert_eq!(Color::from_hex("#FEF3B5"), Some(Color::rgb(0xFE, 0xF3, 0xB5)));
        assert_eq!(Color::from_hex(" fef3b5 "), Some(Color::rgb(0xFE, 0xF3, 0xB5)));
        assert_eq!(Color::from_hex("#FEF"), None);
        assert_eq!(Color::from_hex("#GGGGGG"), None);
    }

    #[test]
    fn test_parse_hex_with_alpha() {
        let color = Color::from_hex("#FF000080").unwrap();
        assert_eq!(color.to_hex(), "#FF0000");
        assert!((color.a - 128.0 / 255.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_canonical_hex_is_uppercase() {
        assert_eq!(Color::rgb(0xab, 0x01, 0xff).to_hex(), "#AB01FF");
    }

    #[test]
    fn test_serde_string_form() {
        let json = serde_json::to_string(&Color::rgb(1, 2, 3)).unwrap();
        assert_eq!(json, "\"#010203\"");

        let tinted: Color = serde_json::from_str("\"#01020340\"").unwrap();
        assert_eq!(tinted.to_hex(), "#010203");
        assert!(tinted.a < 1.0);

        assert!(serde_json::from_str::<Color>("\"nope\"").is_err());
    }

    #[test]
    fn test_with_alpha_clamps() {
        assert_eq!(Color::BLACK.with_alpha(2.0).a, 1.0);
        assert_eq!(Color::BLACK.with_alpha(-1.0).a, 0.0);
    }
}
