//! Hex color values for the configuration file.
//!
//! Colors are stored as 8-bit RGB and serialized as `#rrggbb`. Parsing also
//! accepts the short `#rgb` form and the 16-bit `#rrrrggggbbbb` form; 16-bit
//! channels keep only their high byte, so a save/load cycle is lossless for
//! `#rrggbb` values and truncates wider ones.

use std::fmt;
use std::str::FromStr;

/// An RGB color as stored in the configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// Error returned when a color string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseColorError(String);

impl fmt::Display for ParseColorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid color string: {:?}", self.0)
    }
}

impl std::error::Error for ParseColorError {}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Default terminal foreground (light gray).
    pub const DEFAULT_FOREGROUND: Color = Color::rgb(0xc0, 0xc0, 0xc0);
    /// Default terminal background (black).
    pub const DEFAULT_BACKGROUND: Color = Color::rgb(0x00, 0x00, 0x00);

    /// Serialize as `#rrggbb`.
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Color {
    type Err = ParseColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s
            .strip_prefix('#')
            .ok_or_else(|| ParseColorError(s.to_string()))?;
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ParseColorError(s.to_string()));
        }

        let channel = |digits: &str| u16::from_str_radix(digits, 16).unwrap_or(0);

        match hex.len() {
            // #rgb: one digit per channel, replicated (0xf -> 0xff)
            3 => {
                let d = |i: usize| channel(&hex[i..i + 1]) as u8;
                Ok(Color::rgb(d(0) * 0x11, d(1) * 0x11, d(2) * 0x11))
            }
            // #rrggbb
            6 => {
                let d = |i: usize| channel(&hex[i..i + 2]) as u8;
                Ok(Color::rgb(d(0), d(2), d(4)))
            }
            // #rrrrggggbbbb: 16-bit channels, truncated to their high byte
            12 => {
                let d = |i: usize| (channel(&hex[i..i + 4]) >> 8) as u8;
                Ok(Color::rgb(d(0), d(4), d(8)))
            }
            _ => Err(ParseColorError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use test_case::test_case;

    #[test]
    fn parses_rrggbb() {
        let c: Color = "#c0c0c0".parse().unwrap();
        assert_eq!(c, Color::rgb(0xc0, 0xc0, 0xc0));
    }

    #[test]
    fn parses_short_form() {
        let c: Color = "#f0a".parse().unwrap();
        assert_eq!(c, Color::rgb(0xff, 0x00, 0xaa));
    }

    #[test]
    fn parses_16bit_form_truncating() {
        let c: Color = "#c000ffff0001".parse().unwrap();
        assert_eq!(c, Color::rgb(0xc0, 0xff, 0x00));
    }

    #[test_case("" ; "empty")]
    #[test_case("c0c0c0" ; "missing hash")]
    #[test_case("#c0c0c" ; "five digits")]
    #[test_case("#gggggg" ; "non hex digits")]
    #[test_case("#c0c0c0c0" ; "eight digits")]
    fn rejects_invalid(s: &str) {
        assert!(s.parse::<Color>().is_err());
    }

    #[test]
    fn hex_is_lowercase_rrggbb() {
        assert_eq!(Color::rgb(0xAB, 0xCD, 0xEF).to_hex(), "#abcdef");
    }

    proptest! {
        #[test]
        fn hex_round_trip(r: u8, g: u8, b: u8) {
            let color = Color::rgb(r, g, b);
            let parsed: Color = color.to_hex().parse().unwrap();
            prop_assert_eq!(parsed, color);
        }

        #[test]
        fn sixteen_bit_truncates_to_high_byte(r: u16, g: u16, b: u16) {
            let s = format!("#{:04x}{:04x}{:04x}", r, g, b);
            let parsed: Color = s.parse().unwrap();
            prop_assert_eq!(
                parsed,
                Color::rgb((r >> 8) as u8, (g >> 8) as u8, (b >> 8) as u8)
            );
        }
    }
}
