//! Modal dialog state.
//!
//! Dialogs are overlays owned by the workspace: a state value plus key
//! handling, rendered above the tab content. Dismissing any of them
//! without accepting is a silent no-op.

use crate::tabstrip::TabId;
use regex::Regex;
use settings::constants::terminal::{MAX_FONT_SIZE, MIN_FONT_SIZE};
use settings::{Color, FontSpec};

/// What a confirm dialog is about to close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseTarget {
    Tab(TabId),
    Quit,
}

/// "Set tab title" dialog.
pub struct TitleDialog {
    pub tab: TabId,
    pub input: String,
    /// Inverse of the ForceTabTitle option.
    pub allow_terminal_title: bool,
}

impl TitleDialog {
    /// An empty title cannot be accepted.
    pub fn can_accept(&self) -> bool {
        !self.input.is_empty()
    }
}

/// "Find" dialog. The entered pattern is validated live; an empty entry
/// is acceptable and clears the search.
pub struct SearchDialog {
    pub input: String,
    pub wrap: bool,
    /// After accepting with a pattern, run a search in this direction.
    pub then_search: Option<i32>,
}

impl SearchDialog {
    pub fn can_accept(&self) -> bool {
        self.input.is_empty() || Regex::new(&self.input).is_ok()
    }

    /// Compile the entered pattern; `None` clears the search.
    pub fn compile(&self) -> Option<Regex> {
        if self.input.is_empty() {
            None
        } else {
            Regex::new(&self.input).ok()
        }
    }
}

/// Common monospace families offered by the font dialog.
pub const FONT_FAMILIES: &[&str] = &[
    "JetBrains Mono",
    "Fira Code",
    "SF Mono",
    "Monaco",
    "Menlo",
    "Source Code Pro",
    "Cascadia Code",
    "Consolas",
    "Ubuntu Mono",
    "DejaVu Sans Mono",
    "monospace",
];

/// "Select font" dialog: family list plus adjustable size.
pub struct FontDialog {
    pub families: Vec<String>,
    pub family_index: usize,
    pub size: f32,
}

impl FontDialog {
    pub fn new(current: &FontSpec) -> Self {
        let mut families: Vec<String> = FONT_FAMILIES.iter().map(|f| f.to_string()).collect();
        let family_index = match families.iter().position(|f| *f == current.family) {
            Some(index) => index,
            None => {
                families.insert(0, current.family.clone());
                0
            }
        };
        Self {
            families,
            family_index,
            size: current.size,
        }
    }

    pub fn select_next_family(&mut self) {
        self.family_index = (self.family_index + 1) % self.families.len();
    }

    pub fn select_prev_family(&mut self) {
        self.family_index = self
            .family_index
            .checked_sub(1)
            .unwrap_or(self.families.len() - 1);
    }

    pub fn adjust_size(&mut self, delta: f32) {
        self.size = (self.size + delta).clamp(MIN_FONT_SIZE, MAX_FONT_SIZE);
    }

    pub fn chosen(&self) -> FontSpec {
        FontSpec {
            family: self.families[self.family_index].clone(),
            size: self.size,
        }
    }
}

/// Swatches offered by the color dialog.
pub const COLOR_CHOICES: &[Color] = &[
    Color::rgb(0x00, 0x00, 0x00),
    Color::rgb(0x30, 0x30, 0x30),
    Color::rgb(0x80, 0x80, 0x80),
    Color::rgb(0xc0, 0xc0, 0xc0),
    Color::rgb(0xff, 0xff, 0xff),
    Color::rgb(0xcd, 0x00, 0x00),
    Color::rgb(0x00, 0xcd, 0x00),
    Color::rgb(0xcd, 0xcd, 0x00),
    Color::rgb(0x1e, 0x90, 0xff),
    Color::rgb(0xcd, 0x00, 0xcd),
    Color::rgb(0x00, 0xcd, 0xcd),
    Color::rgb(0xff, 0xa5, 0x00),
];

/// Rows of the colors dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorRow {
    Foreground,
    Background,
    Cursor,
}

/// "Select colors" dialog: one swatch row each for foreground, background
/// and cursor, where the cursor row has an extra "default" state that
/// follows the foreground.
pub struct ColorsDialog {
    pub choices: Vec<Color>,
    pub foreground: usize,
    pub background: usize,
    /// `None` = default cursor (follows foreground).
    pub cursor: Option<usize>,
    pub row: ColorRow,
}

impl ColorsDialog {
    pub fn new(foreground: Color, background: Color, cursor: Option<Color>) -> Self {
        let mut choices: Vec<Color> = COLOR_CHOICES.to_vec();
        let mut index_of = |color: Color| -> usize {
            match choices.iter().position(|c| *c == color) {
                Some(index) => index,
                None => {
                    choices.push(color);
                    choices.len() - 1
                }
            }
        };
        let foreground = index_of(foreground);
        let background = index_of(background);
        let cursor = cursor.map(index_of);
        Self {
            choices,
            foreground,
            background,
            cursor,
            row: ColorRow::Foreground,
        }
    }

    pub fn next_row(&mut self) {
        self.row = match self.row {
            ColorRow::Foreground => ColorRow::Background,
            ColorRow::Background => ColorRow::Cursor,
            ColorRow::Cursor => ColorRow::Foreground,
        };
    }

    pub fn prev_row(&mut self) {
        self.row = match self.row {
            ColorRow::Foreground => ColorRow::Cursor,
            ColorRow::Background => ColorRow::Foreground,
            ColorRow::Cursor => ColorRow::Background,
        };
    }

    /// Cycle the selected row's swatch. On the cursor row, the position
    /// one past the last swatch is the "default" state.
    pub fn cycle(&mut self, delta: i32) {
        let len = self.choices.len() as i32;
        match self.row {
            ColorRow::Foreground => {
                self.foreground = (self.foreground as i32 + delta).rem_euclid(len) as usize;
            }
            ColorRow::Background => {
                self.background = (self.background as i32 + delta).rem_euclid(len) as usize;
            }
            ColorRow::Cursor => {
                // len swatches plus the trailing "default" slot.
                let slots = len + 1;
                let current = self.cursor.map(|i| i as i32).unwrap_or(len);
                let next = (current + delta).rem_euclid(slots);
                self.cursor = (next < len).then_some(next as usize);
            }
        }
    }

    /// Toggle the cursor row between "default" and the foreground swatch.
    pub fn toggle_cursor_default(&mut self) {
        self.cursor = match self.cursor {
            Some(_) => None,
            None => Some(self.foreground),
        };
    }

    pub fn chosen(&self) -> (Color, Color, Option<Color>) {
        (
            self.choices[self.foreground],
            self.choices[self.background],
            self.cursor.map(|i| self.choices[i]),
        )
    }
}

/// The active modal dialog, if any.
pub enum DialogState {
    Title(TitleDialog),
    Search(SearchDialog),
    Font(FontDialog),
    Colors(ColorsDialog),
    Confirm(CloseTarget),
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_title_cannot_be_accepted() {
        let dialog = TitleDialog {
            tab: 1,
            input: String::new(),
            allow_terminal_title: true,
        };
        assert!(!dialog.can_accept());
    }

    #[test]
    fn search_accepts_empty_and_valid_patterns_only() {
        let mut dialog = SearchDialog {
            input: String::new(),
            wrap: true,
            then_search: None,
        };
        assert!(dialog.can_accept());
        assert!(dialog.compile().is_none());

        dialog.input = "fo[o".into();
        assert!(!dialog.can_accept());

        dialog.input = "foo+".into();
        assert!(dialog.can_accept());
        assert!(dialog.compile().is_some());
    }

    #[test]
    fn font_dialog_injects_unknown_family() {
        let dialog = FontDialog::new(&FontSpec {
            family: "Custom Mono".into(),
            size: 13.0,
        });
        assert_eq!(dialog.families[dialog.family_index], "Custom Mono");
    }

    #[test]
    fn font_dialog_clamps_size() {
        let mut dialog = FontDialog::new(&FontSpec {
            family: "Menlo".into(),
            size: MAX_FONT_SIZE - 0.5,
        });
        dialog.adjust_size(5.0);
        assert_eq!(dialog.size, MAX_FONT_SIZE);
        dialog.adjust_size(-100.0);
        assert_eq!(dialog.size, MIN_FONT_SIZE);
    }

    #[test]
    fn colors_dialog_keeps_configured_colors_selectable() {
        let odd = Color::rgb(0x12, 0x34, 0x56);
        let dialog = ColorsDialog::new(odd, Color::rgb(0, 0, 0), None);
        assert_eq!(dialog.choices[dialog.foreground], odd);
        assert!(dialog.cursor.is_none());
    }

    #[test]
    fn cursor_row_cycles_through_default() {
        let mut dialog =
            ColorsDialog::new(Color::rgb(0xc0, 0xc0, 0xc0), Color::rgb(0, 0, 0), None);
        dialog.row = ColorRow::Cursor;
        // From default, stepping forward lands on the first swatch.
        dialog.cycle(1);
        assert_eq!(dialog.cursor, Some(0));
        // Stepping back returns to default.
        dialog.cycle(-1);
        assert_eq!(dialog.cursor, None);
    }

    #[test]
    fn toggle_cursor_default_round_trips() {
        let mut dialog =
            ColorsDialog::new(Color::rgb(0xc0, 0xc0, 0xc0), Color::rgb(0, 0, 0), None);
        dialog.toggle_cursor_default();
        assert_eq!(dialog.cursor, Some(dialog.foreground));
        dialog.toggle_cursor_default();
        assert_eq!(dialog.cursor, None);
    }

    #[test]
    fn chosen_maps_indices_back_to_colors() {
        let fg = Color::rgb(1, 2, 3);
        let bg = Color::rgb(4, 5, 6);
        let cursor = Color::rgb(7, 8, 9);
        let dialog = ColorsDialog::new(fg, bg, Some(cursor));
        assert_eq!(dialog.chosen(), (fg, bg, Some(cursor)));
    }
}
