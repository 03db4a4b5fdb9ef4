//! Terminal color conversion utilities.
//!
//! Converts between alacritty_terminal colors and GPUI colors. The palette
//! is the configured foreground/background/cursor plus the standard xterm
//! ANSI colors; a terminal can override any slot at runtime via escape
//! sequences.

use alacritty_terminal::term::color::Colors as TermColors;
use alacritty_terminal::vte::ansi::{Color, NamedColor, Rgb};
use gpui::{hsla, Hsla, Rgba};

/// The resolved color set applied to every pane.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TerminalColors {
    pub foreground: Hsla,
    pub background: Hsla,
    pub cursor: Hsla,
    pub selection: Hsla,

    pub black: Hsla,
    pub red: Hsla,
    pub green: Hsla,
    pub yellow: Hsla,
    pub blue: Hsla,
    pub magenta: Hsla,
    pub cyan: Hsla,
    pub white: Hsla,

    pub bright_black: Hsla,
    pub bright_red: Hsla,
    pub bright_green: Hsla,
    pub bright_yellow: Hsla,
    pub bright_blue: Hsla,
    pub bright_magenta: Hsla,
    pub bright_cyan: Hsla,
    pub bright_white: Hsla,
}

/// Convert a configuration color to GPUI Hsla.
pub fn settings_color_to_hsla(color: settings::Color) -> Hsla {
    Hsla::from(Rgba {
        r: color.r as f32 / 255.0,
        g: color.g as f32 / 255.0,
        b: color.b as f32 / 255.0,
        a: 1.0,
    })
}

impl TerminalColors {
    /// Build the palette from the configured colors. A `None` cursor means
    /// "default": the cursor follows the foreground.
    pub fn from_config(
        foreground: settings::Color,
        background: settings::Color,
        cursor: Option<settings::Color>,
    ) -> Self {
        let fg = settings_color_to_hsla(foreground);
        let bg = settings_color_to_hsla(background);
        let cursor = cursor.map(settings_color_to_hsla).unwrap_or(fg);

        let c = |r: u8, g: u8, b: u8| settings_color_to_hsla(settings::Color::rgb(r, g, b));

        Self {
            foreground: fg,
            background: bg,
            cursor,
            selection: hsla(0.6, 0.5, 0.5, 0.35),

            // Standard xterm palette.
            black: c(0x00, 0x00, 0x00),
            red: c(0xcd, 0x00, 0x00),
            green: c(0x00, 0xcd, 0x00),
            yellow: c(0xcd, 0xcd, 0x00),
            blue: c(0x00, 0x00, 0xee),
            magenta: c(0xcd, 0x00, 0xcd),
            cyan: c(0x00, 0xcd, 0xcd),
            white: c(0xe5, 0xe5, 0xe5),

            bright_black: c(0x7f, 0x7f, 0x7f),
            bright_red: c(0xff, 0x00, 0x00),
            bright_green: c(0x00, 0xff, 0x00),
            bright_yellow: c(0xff, 0xff, 0x00),
            bright_blue: c(0x5c, 0x5c, 0xff),
            bright_magenta: c(0xff, 0x00, 0xff),
            bright_cyan: c(0x00, 0xff, 0xff),
            bright_white: c(0xff, 0xff, 0xff),
        }
    }
}

/// Convert RGB to Hsla.
pub fn rgb_to_hsla(rgb: Rgb) -> Hsla {
    Hsla::from(Rgba {
        r: rgb.r as f32 / 255.0,
        g: rgb.g as f32 / 255.0,
        b: rgb.b as f32 / 255.0,
        a: 1.0,
    })
}

/// Convert an alacritty color to Hsla, preferring runtime overrides from
/// the terminal itself over the configured palette.
pub fn color_to_hsla(color: Color, term_colors: &TermColors, palette: &TerminalColors) -> Hsla {
    match color {
        Color::Named(named) => {
            if let Some(rgb) = term_colors[named] {
                rgb_to_hsla(rgb)
            } else {
                named_color_to_hsla(named, palette)
            }
        }
        Color::Spec(rgb) => rgb_to_hsla(rgb),
        Color::Indexed(idx) => {
            if let Some(rgb) = term_colors[idx as usize] {
                rgb_to_hsla(rgb)
            } else {
                indexed_color_to_hsla(idx, palette)
            }
        }
    }
}

/// Convert a named ANSI color to Hsla using the configured palette.
pub fn named_color_to_hsla(color: NamedColor, palette: &TerminalColors) -> Hsla {
    match color {
        NamedColor::Black => palette.black,
        NamedColor::Red => palette.red,
        NamedColor::Green => palette.green,
        NamedColor::Yellow => palette.yellow,
        NamedColor::Blue => palette.blue,
        NamedColor::Magenta => palette.magenta,
        NamedColor::Cyan => palette.cyan,
        NamedColor::White => palette.white,
        NamedColor::BrightBlack => palette.bright_black,
        NamedColor::BrightRed => palette.bright_red,
        NamedColor::BrightGreen => palette.bright_green,
        NamedColor::BrightYellow => palette.bright_yellow,
        NamedColor::BrightBlue => palette.bright_blue,
        NamedColor::BrightMagenta => palette.bright_magenta,
        NamedColor::BrightCyan => palette.bright_cyan,
        NamedColor::BrightWhite => palette.bright_white,
        NamedColor::Foreground => palette.foreground,
        NamedColor::Background => palette.background,
        NamedColor::Cursor => palette.cursor,
        _ => palette.foreground,
    }
}

/// Convert an indexed color (0-255) to Hsla.
///
/// The 256-color palette: 0-15 named ANSI, 16-231 a 6x6x6 cube,
/// 232-255 a 24-step grayscale ramp.
pub fn indexed_color_to_hsla(idx: u8, palette: &TerminalColors) -> Hsla {
    match idx {
        0..=15 => {
            let named = match idx {
                0 => NamedColor::Black,
                1 => NamedColor::Red,
                2 => NamedColor::Green,
                3 => NamedColor::Yellow,
                4 => NamedColor::Blue,
                5 => NamedColor::Magenta,
                6 => NamedColor::Cyan,
                7 => NamedColor::White,
                8 => NamedColor::BrightBlack,
                9 => NamedColor::BrightRed,
                10 => NamedColor::BrightGreen,
                11 => NamedColor::BrightYellow,
                12 => NamedColor::BrightBlue,
                13 => NamedColor::BrightMagenta,
                14 => NamedColor::BrightCyan,
                _ => NamedColor::BrightWhite,
            };
            named_color_to_hsla(named, palette)
        }
        16..=231 => {
            let idx = idx - 16;
            let r = (idx / 36) as f32 / 5.0;
            let g = ((idx % 36) / 6) as f32 / 5.0;
            let b = (idx % 6) as f32 / 5.0;
            Hsla::from(Rgba { r, g, b, a: 1.0 })
        }
        232..=255 => {
            let gray = (idx - 232) as f32 / 23.0 * 0.9 + 0.08;
            hsla(0.0, 0.0, gray, 1.0)
        }
    }
}

/// Apply the DIM flag: reduce brightness by a third.
pub fn apply_dim(color: Hsla) -> Hsla {
    hsla(color.h, color.s, color.l * 0.66, color.a)
}

/// Bright variant of a named color, for BOLD cells.
pub fn get_bright_color(color: Color, term_colors: &TermColors, palette: &TerminalColors) -> Hsla {
    let bright = match color {
        Color::Named(NamedColor::Black) => NamedColor::BrightBlack,
        Color::Named(NamedColor::Red) => NamedColor::BrightRed,
        Color::Named(NamedColor::Green) => NamedColor::BrightGreen,
        Color::Named(NamedColor::Yellow) => NamedColor::BrightYellow,
        Color::Named(NamedColor::Blue) => NamedColor::BrightBlue,
        Color::Named(NamedColor::Magenta) => NamedColor::BrightMagenta,
        Color::Named(NamedColor::Cyan) => NamedColor::BrightCyan,
        Color::Named(NamedColor::White) => NamedColor::BrightWhite,
        other => return color_to_hsla(other, term_colors, palette),
    };
    if let Some(rgb) = term_colors[bright] {
        rgb_to_hsla(rgb)
    } else {
        named_color_to_hsla(bright, palette)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn palette() -> TerminalColors {
        TerminalColors::from_config(
            settings::Color::DEFAULT_FOREGROUND,
            settings::Color::DEFAULT_BACKGROUND,
            None,
        )
    }

    #[test]
    fn default_cursor_follows_foreground() {
        let p = palette();
        assert_eq!(p.cursor, p.foreground);
    }

    #[test]
    fn explicit_cursor_color_is_kept() {
        let p = TerminalColors::from_config(
            settings::Color::DEFAULT_FOREGROUND,
            settings::Color::DEFAULT_BACKGROUND,
            Some(settings::Color::rgb(0xff, 0, 0)),
        );
        assert_ne!(p.cursor, p.foreground);
    }

    #[test]
    fn grayscale_ramp_is_monotonic() {
        let p = palette();
        let low = indexed_color_to_hsla(232, &p);
        let high = indexed_color_to_hsla(255, &p);
        assert!(high.l > low.l);
    }

    #[test]
    fn dim_reduces_lightness() {
        let c = hsla(0.3, 0.5, 0.6, 1.0);
        assert!(apply_dim(c).l < c.l);
    }
}
