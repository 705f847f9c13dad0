//! CSS hex color parsing for grid overlay colors

use std::fmt;

/// An opaque RGB color parsed from `#rgb` or `#rrggbb`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HexColor {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl HexColor {
    pub const WHITE: HexColor = HexColor::rgb(0xFF, 0xFF, 0xFF);

    pub const fn rgb(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }

    /// Parse a CSS hex color. The leading '#' is optional.
    /// Returns None for anything that isn't 3 or 6 hex digits.
    pub fn parse(input: &str) -> Option<Self> {
        let hex = input.trim();
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }

        match hex.len() {
            3 => {
                let mut digits = hex.chars().map(|c| c.to_digit(16).unwrap_or(0) as u8);
                let r = digits.next()?;
                let g = digits.next()?;
                let b = digits.next()?;
                // #abc expands to #aabbcc
                Some(Self::rgb(r * 17, g * 17, b * 17))
            }
            6 => {
                let value = u32::from_str_radix(hex, 16).ok()?;
                Some(Self::rgb(
                    ((value >> 16) & 0xFF) as u8,
                    ((value >> 8) & 0xFF) as u8,
                    (value & 0xFF) as u8,
                ))
            }
            _ => None,
        }
    }

    /// RGBA bytes with alpha derived from an opacity in [0, 1]
    pub fn with_opacity(&self, opacity: f32) -> [u8; 4] {
        let alpha = (opacity.clamp(0.0, 1.0) * 255.0).round() as u8;
        [self.red, self.green, self.blue, alpha]
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.red, self.green, self.blue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_six_digit() {
        assert_eq!(HexColor::parse("#ff8000"), Some(HexColor::rgb(255, 128, 0)));
        assert_eq!(HexColor::parse("00FF00"), Some(HexColor::rgb(0, 255, 0)));
    }

    #[test]
    fn test_parse_short_form() {
        assert_eq!(HexColor::parse("#fff"), Some(HexColor::WHITE));
        assert_eq!(HexColor::parse("#0a0"), Some(HexColor::rgb(0, 0xAA, 0)));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(HexColor::parse("white"), None);
        assert_eq!(HexColor::parse("#12345"), None);
        assert_eq!(HexColor::parse("#gg0000"), None);
    }

    #[test]
    fn test_display_round_trips_lowercase() {
        assert_eq!(HexColor::parse("#ABCDEF").map(|c| c.to_string()), Some("#abcdef".to_string()));
    }

    #[test]
    fn test_with_opacity() {
        assert_eq!(HexColor::WHITE.with_opacity(0.3), [255, 255, 255, 77]);
        assert_eq!(HexColor::WHITE.with_opacity(2.0)[3], 255);
    }
}
