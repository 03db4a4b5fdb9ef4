//! Frame data extraction for the terminal canvas.
//!
//! `build_render_data` walks the visible grid once and produces the cell
//! runs, merged background regions, and cursor info the paint phase draws.

use crate::colors::{apply_dim, color_to_hsla, get_bright_color, TerminalColors};
use alacritty_terminal::event::EventListener;
use alacritty_terminal::grid::Dimensions;
use alacritty_terminal::term::cell::Flags as CellFlags;
use alacritty_terminal::term::Term;
use alacritty_terminal::vte::ansi::CursorShape;
use gpui::{Bounds, Hsla, Pixels, SharedString};
use terminal::TermSize;

/// Consolidated display state shared between the view and its canvas
/// callbacks. Read-heavy; guarded by an RwLock at the pane level.
#[derive(Clone)]
pub struct DisplayState {
    /// Terminal dimensions in rows/columns.
    pub size: TermSize,
    /// Cell dimensions (width, height) from font metrics.
    pub cell_dims: (f32, f32),
    /// Element bounds in window coordinates, for mouse position mapping.
    pub bounds: Option<Bounds<Pixels>>,
    /// Current font size.
    pub font_size: f32,
    /// Font size bits + family of the cached cell_dims, to detect when
    /// recalculation is needed.
    pub cached_font_key: Option<(u32, SharedString)>,
}

impl Default for DisplayState {
    fn default() -> Self {
        Self {
            size: TermSize::default(),
            cell_dims: (8.4, 17.0),
            bounds: None,
            font_size: settings::constants::terminal::DEFAULT_FONT_SIZE,
            cached_font_key: None,
        }
    }
}

/// A single cell to render.
#[derive(Clone)]
pub struct RenderCell {
    pub row: usize,
    pub col: usize,
    pub c: char,
    pub fg: Hsla,
    pub flags: CellFlags,
}

/// A merged background region.
#[derive(Clone)]
pub struct BgRegion {
    pub row: usize,
    pub col_start: usize,
    pub col_end: usize,
    pub color: Hsla,
}

/// Cursor rendering info.
#[derive(Clone, Copy)]
pub struct CursorInfo {
    pub row: usize,
    pub col: usize,
    pub shape: CursorShape,
    pub color: Hsla,
}

/// Pre-computed render data for a single frame.
pub struct RenderData {
    pub cells: Vec<RenderCell>,
    pub bg_regions: Vec<BgRegion>,
    pub cursor: Option<CursorInfo>,
}

/// Extract everything the paint phase needs from the terminal state.
pub fn build_render_data<L: EventListener>(
    term: &Term<L>,
    palette: &TerminalColors,
) -> RenderData {
    let content = term.renderable_content();
    let term_colors = content.colors;
    let default_bg = palette.background;

    let term_cols = term.columns();
    let term_rows = term.screen_lines();

    let mut cells: Vec<RenderCell> = Vec::with_capacity((term_rows * term_cols) / 3);
    let mut bg_regions: Vec<BgRegion> = Vec::with_capacity(term_rows * 2);

    // Current background region for on-the-fly merging: (row, start, end, color).
    let mut current_bg: Option<(usize, usize, usize, Hsla)> = None;

    let display_offset = content.display_offset as i32;
    let cursor_visual_row = content.cursor.point.line.0 + display_offset;
    let cursor_col = content.cursor.point.column.0;
    let cursor = if cursor_visual_row >= 0
        && (cursor_visual_row as usize) < term_rows
        && cursor_col < term_cols
    {
        Some(CursorInfo {
            row: cursor_visual_row as usize,
            col: cursor_col,
            shape: content.cursor.shape,
            color: palette.cursor,
        })
    } else {
        // Scrolled off screen.
        None
    };

    for cell in content.display_iter {
        let row = (cell.point.line.0 + display_offset) as usize;
        let col = cell.point.column.0;
        if row >= term_rows || col >= term_cols {
            continue;
        }

        let flags = cell.flags;
        // Wide char spacers are placeholders.
        if flags.contains(CellFlags::WIDE_CHAR_SPACER) {
            continue;
        }

        let mut fg = color_to_hsla(cell.fg, term_colors, palette);
        let mut bg = color_to_hsla(cell.bg, term_colors, palette);

        if flags.contains(CellFlags::BOLD) {
            fg = get_bright_color(cell.fg, term_colors, palette);
        }
        if flags.contains(CellFlags::DIM) {
            fg = apply_dim(fg);
        }
        if flags.contains(CellFlags::INVERSE) {
            std::mem::swap(&mut fg, &mut bg);
        }
        if flags.contains(CellFlags::HIDDEN) {
            fg = bg;
        }

        if bg != default_bg {
            match &mut current_bg {
                Some((cur_row, _start, end, color))
                    if *cur_row == row && *end == col && *color == bg =>
                {
                    *end = col + 1;
                }
                Some((cur_row, start, end, color)) => {
                    bg_regions.push(BgRegion {
                        row: *cur_row,
                        col_start: *start,
                        col_end: *end,
                        color: *color,
                    });
                    current_bg = Some((row, col, col + 1, bg));
                }
                None => current_bg = Some((row, col, col + 1, bg)),
            }
        } else if let Some((cur_row, start, end, color)) = current_bg.take() {
            bg_regions.push(BgRegion {
                row: cur_row,
                col_start: start,
                col_end: end,
                color,
            });
        }

        if cell.c != ' ' && cell.c != '\0' {
            cells.push(RenderCell {
                row,
                col,
                c: cell.c,
                fg,
                flags,
            });
        }
    }

    if let Some((row, col_start, col_end, color)) = current_bg {
        bg_regions.push(BgRegion {
            row,
            col_start,
            col_end,
            color,
        });
    }

    RenderData {
        cells,
        bg_regions,
        cursor,
    }
}
