//! Centralized configuration constants for tabterm.
//!
//! Compile-time defaults and UI dimensions, organized by component.

/// Terminal pane configuration.
pub mod terminal {
    /// Default font size in pixels.
    pub const DEFAULT_FONT_SIZE: f32 = 14.0;
    /// Minimum allowed font size.
    pub const MIN_FONT_SIZE: f32 = 8.0;
    /// Maximum allowed font size.
    pub const MAX_FONT_SIZE: f32 = 32.0;

    /// Default monospace font family (macOS).
    #[cfg(target_os = "macos")]
    pub const FONT_FAMILY: &str = "Menlo";

    /// Default monospace font family (Windows).
    #[cfg(target_os = "windows")]
    pub const FONT_FAMILY: &str = "Consolas";

    /// Default monospace font family (Linux and others).
    /// "monospace" is the generic family that always resolves to something.
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    pub const FONT_FAMILY: &str = "monospace";

    /// Padding around terminal content.
    pub const PADDING: f32 = 2.0;

    /// Characters considered part of a word when selecting by word.
    pub const WORD_CHARS: &str = "-a-zA-Z0-9_./@~";
}

/// Tab bar configuration.
pub mod tab_bar {
    /// Tab bar height in pixels.
    pub const HEIGHT: f32 = 30.0;
    /// Minimum tab width.
    pub const TAB_MIN_WIDTH: f32 = 100.0;
    /// Maximum tab width.
    pub const TAB_MAX_WIDTH: f32 = 200.0;
    /// Close button size.
    pub const CLOSE_BUTTON_SIZE: f32 = 18.0;
}

/// Scrollback buffer configuration.
pub mod scrollback {
    /// Default scrollback buffer size in lines.
    /// Non-positive or unparsable configured values fall back to this.
    pub const DEFAULT_LINES: u32 = 100;
}

/// Settings file validation limits.
pub mod settings {
    /// Maximum settings file size in bytes (64 KB).
    /// Settings files should be tiny; anything larger is suspicious.
    pub const MAX_FILE_SIZE: u64 = 64 * 1024;
}

#[cfg(test)]
#[allow(clippy::assertions_on_constants)]
mod tests {
    use super::*;

    #[test]
    fn test_font_size_range_allows_zoom() {
        let zoom_range = terminal::MAX_FONT_SIZE / terminal::MIN_FONT_SIZE;
        assert!(
            zoom_range >= 2.0,
            "Font size range ({:.1}x) should allow at least 2x zoom",
            zoom_range
        );
    }

    #[test]
    fn test_close_button_fits_in_tab_height() {
        assert!(
            tab_bar::CLOSE_BUTTON_SIZE < tab_bar::HEIGHT,
            "CLOSE_BUTTON_SIZE ({}) should be less than tab bar HEIGHT ({})",
            tab_bar::CLOSE_BUTTON_SIZE,
            tab_bar::HEIGHT
        );
    }

    #[test]
    fn test_word_chars_cover_paths() {
        for ch in ['/', '.', '~', '_', '-'] {
            assert!(
                terminal::WORD_CHARS.contains(ch),
                "WORD_CHARS should include '{}'",
                ch
            );
        }
    }
}
