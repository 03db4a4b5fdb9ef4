//! Terminal pane component.
//!
//! Renders one [`Session`] on a GPUI canvas (batched text runs, merged
//! background quads) and routes keyboard and mouse input to it. Anything
//! that concerns the whole window (configured shortcuts, the popup menu,
//! URI opening) is surfaced as a [`PaneEvent`] for the workspace.

use crate::colors::TerminalColors;
use crate::render::{build_render_data, DisplayState};
use alacritty_terminal::grid::{Dimensions, Scroll};
use alacritty_terminal::index::{Column, Line, Point as TermPoint, Side};
use alacritty_terminal::selection::{Selection as TermSelection, SelectionType};
use alacritty_terminal::term::cell::Flags as CellFlags;
use alacritty_terminal::term::TermMode;
use alacritty_terminal::vte::ansi::CursorShape;
use gpui::*;
use parking_lot::RwLock;
use regex::Regex;
use settings::constants::terminal::PADDING;
use settings::{normalize_key, KeyBindings, Modifiers as BindingMods};
use std::fmt::Write as FmtWrite;
use std::sync::Arc;
use std::time::Duration;
use terminal::{MatchTag, Session, SessionEvent, TermSize};
use termwiz::input::{KeyCode, KeyCodeEncodeModes, KeyboardEncoding, Modifiers as TermwizMods};

/// Cursor blink period.
const BLINK_INTERVAL: Duration = Duration::from_millis(530);

/// Events the pane surfaces to the workspace.
#[derive(Clone, Debug)]
pub enum PaneEvent {
    /// The child process exited or its PTY hit EOF.
    Exited,
    /// The child changed (or reset) the window title.
    TitleChanged(Option<String>),
    Bell,
    /// A URI registered with this pane's own match tag was clicked.
    OpenUri(String),
    /// The user asked for the popup menu (right click or menu key).
    MenuRequested {
        position: Point<Pixels>,
        uri: Option<String>,
    },
    /// Font-size change request; applies to every tab.
    FontSizeDelta(f32),
}

impl EventEmitter<PaneEvent> for TerminalPane {}

/// Snapshot of the configured display options a pane needs to render.
#[derive(Clone)]
pub struct DisplaySettings {
    pub colors: TerminalColors,
    /// Raw background, for widget-side color queries.
    pub background: settings::Color,
    pub font_family: SharedString,
    pub font_size: f32,
    pub blink_cursor: bool,
    pub search_wrap: bool,
    pub keys: KeyBindings,
}

/// In-buffer search state. The pattern is pushed down from the workspace;
/// matches are recomputed lazily against the current grid.
struct SearchState {
    pattern: Option<Regex>,
    /// (grid line, start col, end col) per match.
    matches: Vec<(i32, usize, usize)>,
    current: Option<usize>,
}

impl SearchState {
    fn new() -> Self {
        Self {
            pattern: None,
            matches: Vec::new(),
            current: None,
        }
    }
}

/// Terminal pane that renders a PTY session.
pub struct TerminalPane {
    session: Session,
    /// Tag returned when registering the URI pattern; only matches with
    /// this tag are treated as clickable URIs.
    uri_tag: MatchTag,
    display: Arc<RwLock<DisplayState>>,
    settings: DisplaySettings,
    search: SearchState,
    dragging: bool,
    blink_visible: bool,
    pub focus_handle: FocusHandle,
    exit_emitted: bool,
}

impl TerminalPane {
    /// Wrap an already-spawned session. Registers the URI pattern with the
    /// widget and starts draining its output.
    pub fn new(
        mut session: Session,
        uri_pattern: &Regex,
        settings: DisplaySettings,
        cx: &mut Context<Self>,
    ) -> Self {
        let uri_tag = session.register_match(uri_pattern.clone());

        let mut display = DisplayState::default();
        display.font_size = settings.font_size;

        // Keep Tab out of GPUI's focus navigation; the shell wants it.
        let focus_handle = cx.focus_handle().tab_stop(false);

        Self::start_pump(cx);

        Self {
            session,
            uri_tag,
            display: Arc::new(RwLock::new(display)),
            settings,
            search: SearchState::new(),
            dragging: false,
            blink_visible: true,
            focus_handle,
            exit_emitted: false,
        }
    }

    /// Timer task that drains PTY output into the grid, forwards widget
    /// events, and toggles the cursor blink phase. Backs off while idle.
    fn start_pump(cx: &mut Context<Self>) {
        cx.spawn(async move |this, cx| {
            const ACTIVE_INTERVAL: u64 = 8;
            const IDLE_INTERVAL: u64 = 100;
            const IDLE_THRESHOLD: u32 = 5;
            let mut idle_count = 0u32;
            let mut since_blink = Duration::ZERO;

            loop {
                let interval = if idle_count >= IDLE_THRESHOLD {
                    IDLE_INTERVAL
                } else {
                    ACTIVE_INTERVAL
                };
                cx.background_executor()
                    .timer(Duration::from_millis(interval))
                    .await;
                since_blink += Duration::from_millis(interval);
                let toggle_blink = since_blink >= BLINK_INTERVAL;
                if toggle_blink {
                    since_blink = Duration::ZERO;
                }

                let (should_exit, had_data) = this
                    .update(cx, |pane, cx| {
                        let had_data = pane.session.pump();
                        for event in pane.session.take_events() {
                            match event {
                                SessionEvent::TitleChanged(title) => {
                                    cx.emit(PaneEvent::TitleChanged(title))
                                }
                                SessionEvent::Bell => cx.emit(PaneEvent::Bell),
                            }
                        }
                        if had_data {
                            cx.notify();
                        }
                        if toggle_blink && pane.settings.blink_cursor {
                            pane.blink_visible = !pane.blink_visible;
                            cx.notify();
                        }
                        if pane.session.has_exited() && !pane.exit_emitted {
                            pane.exit_emitted = true;
                            cx.emit(PaneEvent::Exited);
                            return (true, had_data);
                        }
                        (false, had_data)
                    })
                    .unwrap_or((true, false));

                if had_data {
                    idle_count = 0;
                } else {
                    idle_count = idle_count.saturating_add(1);
                }
                if should_exit {
                    break;
                }
            }
        })
        .detach();
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Title reported by the child, if any.
    pub fn title(&self) -> Option<String> {
        self.session.title()
    }

    /// Re-apply configured display options (colors, font, blink,
    /// scrollback, word boundaries).
    pub fn apply_settings(
        &mut self,
        settings: DisplaySettings,
        scrollback_lines: u32,
        word_chars: &str,
        cx: &mut Context<Self>,
    ) {
        self.display.write().font_size = settings.font_size;
        self.session.apply_options(
            scrollback_lines,
            word_chars,
            (
                settings.background.r,
                settings.background.g,
                settings.background.b,
            ),
        );
        if !settings.blink_cursor {
            self.blink_visible = true;
        }
        self.settings = settings;
        cx.notify();
    }

    /// Whether the match at the given cell carries this pane's URI tag.
    /// Matches from any other registered pattern are rejected.
    fn uri_at_cell(&self, col: usize, row: usize) -> Option<String> {
        let (text, tag) = self.session.match_at(col, row)?;
        (tag == self.uri_tag).then_some(text)
    }

    // === Clipboard ===

    /// Copy the selection, if there is one.
    pub fn copy_selection(&self, cx: &mut Context<Self>) {
        let text = self.session.term().lock().selection_to_string();
        if let Some(text) = text {
            if !text.is_empty() {
                cx.write_to_clipboard(ClipboardItem::new_string(text));
            }
        }
    }

    pub fn paste_clipboard(&mut self, cx: &mut Context<Self>) {
        if let Some(item) = cx.read_from_clipboard() {
            if let Some(text) = item.text() {
                self.send_paste(&text);
            }
        }
    }

    fn send_paste(&self, text: &str) {
        let bracketed = self
            .session
            .term()
            .lock()
            .mode()
            .contains(TermMode::BRACKETED_PASTE);
        if bracketed {
            self.session.write(b"\x1b[200~");
            self.session.write(text.as_bytes());
            self.session.write(b"\x1b[201~");
        } else {
            self.session.write(text.replace('\n', "\r").as_bytes());
        }
    }

    // === Search ===

    /// Replace the search pattern (push-down from the workspace).
    pub fn set_search_pattern(&mut self, pattern: Option<Regex>, cx: &mut Context<Self>) {
        self.search.pattern = pattern;
        self.search.current = None;
        self.find_matches();
        cx.notify();
    }

    pub fn has_search_pattern(&self) -> bool {
        self.search.pattern.is_some()
    }

    /// Move to the next match. No-op (returns false) without a pattern.
    pub fn search_next(&mut self, cx: &mut Context<Self>) -> bool {
        self.search_step(1, cx)
    }

    /// Move to the previous match. No-op (returns false) without a pattern.
    pub fn search_prev(&mut self, cx: &mut Context<Self>) -> bool {
        self.search_step(-1, cx)
    }

    fn search_step(&mut self, direction: i32, cx: &mut Context<Self>) -> bool {
        if self.search.pattern.is_none() {
            return false;
        }
        // The grid may have scrolled since the last lookup.
        self.find_matches();
        let len = self.search.matches.len();
        if len == 0 {
            return true;
        }
        let wrap = self.settings.search_wrap;
        self.search.current = match self.search.current {
            None => {
                if direction > 0 {
                    Some(0)
                } else {
                    Some(len - 1)
                }
            }
            Some(i) if direction > 0 => {
                if i + 1 < len {
                    Some(i + 1)
                } else if wrap {
                    Some(0)
                } else {
                    Some(i)
                }
            }
            Some(i) => {
                if i > 0 {
                    Some(i - 1)
                } else if wrap {
                    Some(len - 1)
                } else {
                    Some(i)
                }
            }
        };
        self.scroll_to_current_match();
        cx.notify();
        true
    }

    /// Scan the whole grid (screen + scrollback) for pattern matches.
    fn find_matches(&mut self) {
        self.search.matches.clear();
        let Some(pattern) = self.search.pattern.as_ref() else {
            return;
        };

        let term = self.session.term();
        let term = term.lock();
        let grid = term.grid();
        let screen_lines = grid.screen_lines() as i32;
        let total_lines = grid.total_lines() as i32;
        let cols = grid.columns();
        let start_line = -(total_lines - screen_lines);

        for line_idx in start_line..screen_lines {
            let row = &grid[Line(line_idx)];
            let chars: Vec<char> = (0..cols).map(|c| row[Column(c)].c).collect();
            let line_string: String = chars.iter().collect();

            let mut byte_to_col: Vec<usize> = Vec::with_capacity(line_string.len() + 1);
            for (col_idx, ch) in chars.iter().enumerate() {
                for _ in 0..ch.len_utf8() {
                    byte_to_col.push(col_idx);
                }
            }
            byte_to_col.push(chars.len());

            for matched in pattern.find_iter(&line_string) {
                let start_col = byte_to_col[matched.start()];
                let end_col = byte_to_col[matched.end()];
                if start_col < end_col {
                    self.search.matches.push((line_idx, start_col, end_col));
                }
            }
        }

        if let Some(current) = self.search.current {
            if current >= self.search.matches.len() {
                self.search.current = None;
            }
        }
    }

    /// Scroll the viewport so the current match is visible.
    fn scroll_to_current_match(&mut self) {
        let Some(current) = self.search.current else {
            return;
        };
        let Some(&(line, _, _)) = self.search.matches.get(current) else {
            return;
        };
        let target_offset = (-line).max(0);

        let term = self.session.term();
        let mut term = term.lock();
        let current_offset = term.grid().display_offset() as i32;
        let delta = target_offset - current_offset;
        if delta != 0 {
            term.scroll_display(Scroll::Delta(delta));
        }
    }

    // === Mouse ===

    /// Convert a window pixel position to terminal cell coordinates.
    fn pixel_to_cell(&self, position: Point<Pixels>) -> Option<(usize, usize)> {
        let display = self.display.read();
        let bounds = display.bounds.as_ref()?;

        let local_x = f32::from(position.x) - f32::from(bounds.origin.x);
        let local_y = f32::from(position.y) - f32::from(bounds.origin.y);
        let (cell_width, cell_height) = display.cell_dims;

        let cell_x = ((local_x - PADDING) / cell_width).floor() as i32;
        let cell_y = ((local_y - PADDING) / cell_height).floor() as i32;

        if cell_x >= 0
            && cell_y >= 0
            && cell_x < display.size.cols as i32
            && cell_y < display.size.rows as i32
        {
            Some((cell_x as usize, cell_y as usize))
        } else {
            None
        }
    }

    fn mouse_reporting_active(&self) -> bool {
        self.session.term().lock().mode().intersects(
            TermMode::MOUSE_REPORT_CLICK
                | TermMode::MOUSE_DRAG
                | TermMode::MOUSE_MOTION
                | TermMode::MOUSE_MODE,
        )
    }

    fn handle_mouse_down(&mut self, event: &MouseDownEvent, cx: &mut Context<Self>) {
        let Some((col, row)) = self.pixel_to_cell(event.position) else {
            return;
        };

        // The popup menu wins over everything, including mouse reporting.
        if event.button == MouseButton::Right {
            let uri = self.uri_at_cell(col, row);
            cx.emit(PaneEvent::MenuRequested {
                position: event.position,
                uri,
            });
            return;
        }

        if self.mouse_reporting_active() {
            let button = match event.button {
                MouseButton::Left => 0,
                MouseButton::Middle => 1,
                _ => return,
            };
            let sgr = self
                .session
                .term()
                .lock()
                .mode()
                .contains(TermMode::SGR_MOUSE);
            let seq = encode_mouse_event(button, col, row, sgr, false);
            self.session.write(seq.as_bytes());
            return;
        }

        match event.button {
            MouseButton::Middle => {
                // Open the URI under the cursor, if any.
                if let Some(uri) = self.uri_at_cell(col, row) {
                    cx.emit(PaneEvent::OpenUri(uri));
                }
            }
            MouseButton::Left => {
                // Start a selection at the clicked cell.
                let term = self.session.term();
                let mut term = term.lock();
                let display_offset = term.grid().display_offset() as i32;
                let point = TermPoint::new(Line(row as i32 - display_offset), Column(col));
                let selection_type = match event.click_count {
                    1 => {
                        if event.modifiers.alt {
                            SelectionType::Block
                        } else {
                            SelectionType::Simple
                        }
                    }
                    2 => SelectionType::Semantic,
                    _ => SelectionType::Lines,
                };
                term.selection = Some(TermSelection::new(selection_type, point, Side::Left));
                drop(term);
                self.dragging = true;
                cx.notify();
            }
            _ => {}
        }
    }

    fn handle_mouse_up(&mut self, event: &MouseUpEvent, cx: &mut Context<Self>) {
        let Some((col, row)) = self.pixel_to_cell(event.position) else {
            self.dragging = false;
            return;
        };

        if self.mouse_reporting_active() {
            let button = match event.button {
                MouseButton::Left => 0,
                MouseButton::Middle => 1,
                MouseButton::Right => 2,
                _ => return,
            };
            let sgr = self
                .session
                .term()
                .lock()
                .mode()
                .contains(TermMode::SGR_MOUSE);
            let seq = encode_mouse_event(button, col, row, sgr, true);
            self.session.write(seq.as_bytes());
        } else if event.button == MouseButton::Left && self.dragging {
            let term = self.session.term();
            let mut term = term.lock();
            let display_offset = term.grid().display_offset() as i32;
            let point = TermPoint::new(Line(row as i32 - display_offset), Column(col));
            if let Some(ref mut selection) = term.selection {
                selection.update(point, Side::Right);
            }
            drop(term);
            cx.notify();
        }
        self.dragging = false;
    }

    fn handle_mouse_move(&mut self, event: &MouseMoveEvent, cx: &mut Context<Self>) {
        let Some((col, row)) = self.pixel_to_cell(event.position) else {
            return;
        };

        let mode = *self.session.term().lock().mode();
        if self.dragging
            && mode.intersects(TermMode::MOUSE_DRAG | TermMode::MOUSE_MOTION | TermMode::MOUSE_MODE)
        {
            // Drag events use button code + 32.
            let seq = encode_mouse_event(32, col, row, mode.contains(TermMode::SGR_MOUSE), false);
            self.session.write(seq.as_bytes());
        } else if mode.contains(TermMode::MOUSE_MOTION) && !self.dragging {
            let seq = encode_mouse_event(35, col, row, mode.contains(TermMode::SGR_MOUSE), false);
            self.session.write(seq.as_bytes());
        } else if self.dragging {
            let term = self.session.term();
            let mut term = term.lock();
            let display_offset = term.grid().display_offset() as i32;
            let point = TermPoint::new(Line(row as i32 - display_offset), Column(col));
            if let Some(ref mut selection) = term.selection {
                selection.update(point, Side::Right);
            }
            drop(term);
            cx.notify();
        }
    }

    fn handle_scroll(&mut self, event: &ScrollWheelEvent, cx: &mut Context<Self>) {
        let Some((col, row)) = self.pixel_to_cell(event.position) else {
            return;
        };
        let mode = *self.session.term().lock().mode();
        let (_, cell_height) = self.display.read().cell_dims;
        let delta_y: f32 = event.delta.pixel_delta(px(cell_height)).y.into();

        if self.mouse_reporting_active() {
            let button = if delta_y < 0.0 { 64 } else { 65 };
            let seq = encode_mouse_event(button, col, row, mode.contains(TermMode::SGR_MOUSE), false);
            self.session.write(seq.as_bytes());
        } else if mode.contains(TermMode::ALT_SCREEN) {
            // Alternate screen without mouse mode: arrow keys.
            let lines = (delta_y.abs() / cell_height).ceil() as usize;
            let key = if delta_y < 0.0 { "\x1b[A" } else { "\x1b[B" };
            for _ in 0..lines.min(5) {
                self.session.write(key.as_bytes());
            }
        } else {
            // Scroll through history.
            let lines = (delta_y.abs() / cell_height).ceil() as i32;
            if lines > 0 {
                let scroll = if delta_y < 0.0 {
                    Scroll::Delta(lines)
                } else {
                    Scroll::Delta(-lines)
                };
                self.session.term().lock().scroll_display(scroll);
                cx.notify();
            }
        }
    }

    // === Keyboard ===

    fn handle_key_down(&mut self, event: &KeyDownEvent, cx: &mut Context<Self>) {
        let key = event.keystroke.key.as_str();
        let mods = &event.keystroke.modifiers;

        // Configured shortcuts and the menu key bubble up to the
        // workspace dispatcher; everything else belongs to the shell.
        let binding_mods = BindingMods {
            control: mods.control,
            alt: mods.alt,
            shift: mods.shift,
            platform: mods.platform,
        };
        let normalized = normalize_key(key);
        if self
            .settings
            .keys
            .action_for(binding_mods, &normalized)
            .is_some()
            || (binding_mods.is_empty() && normalized == "menu")
        {
            return;
        }

        // Font-size change requests are app-level, not shell input.
        if mods.control && !mods.alt && !mods.shift && !mods.platform {
            match key {
                "=" | "+" => {
                    cx.emit(PaneEvent::FontSizeDelta(1.0));
                    return;
                }
                "-" => {
                    cx.emit(PaneEvent::FontSizeDelta(-1.0));
                    return;
                }
                _ => {}
            }
        }

        // Keys GPUI likes to intercept for focus/navigation.
        match key {
            "tab" => {
                if mods.shift {
                    self.session.write(b"\x1b[Z");
                } else {
                    self.session.write(b"\t");
                }
                return;
            }
            "escape" => {
                self.session.write(b"\x1b");
                return;
            }
            "enter" if !mods.control && !mods.alt => {
                self.session.write(b"\r");
                return;
            }
            "space" if !mods.control && !mods.alt => {
                self.session.write(b" ");
                return;
            }
            _ => {}
        }

        // Typing clears the selection.
        if !key.is_empty() && !matches!(key, "shift" | "control" | "alt" | "platform") {
            self.session.term().lock().selection = None;
        }

        let app_cursor = self
            .session
            .term()
            .lock()
            .mode()
            .contains(TermMode::APP_CURSOR);
        let encode_modes = KeyCodeEncodeModes {
            encoding: KeyboardEncoding::Xterm,
            application_cursor_keys: app_cursor,
            newline_mode: false,
            modify_other_keys: None,
        };

        if let Some(keycode) = gpui_key_to_termwiz(key) {
            let termwiz_mods = gpui_mods_to_termwiz(mods);
            if let Ok(seq) = keycode.encode(termwiz_mods, encode_modes, true) {
                if !seq.is_empty() {
                    self.session.write(seq.as_bytes());
                    cx.notify();
                }
            }
        }
    }
}

/// Encode a mouse event for the PTY (SGR 1006 or legacy X11 format).
///
/// Button codes follow the xterm protocol: 0/1/2 press, +32 drag,
/// 64/65 wheel.
fn encode_mouse_event(button: u8, col: usize, row: usize, sgr_mode: bool, release: bool) -> String {
    let mut buf = String::with_capacity(24);
    if sgr_mode {
        let terminator = if release { 'm' } else { 'M' };
        let _ = write!(
            buf,
            "\x1b[<{};{};{}{}",
            button,
            col.saturating_add(1),
            row.saturating_add(1),
            terminator
        );
    } else {
        // Legacy single-byte encoding, 1-based, capped to fit in a byte.
        let cb: u8 = if release { 35 } else { button.saturating_add(32) };
        let cx = (col.min(222) as u8).saturating_add(33);
        let cy = (row.min(222) as u8).saturating_add(33);
        let _ = write!(buf, "\x1b[M{}{}{}", cb as char, cx as char, cy as char);
    }
    buf
}

/// Convert GPUI modifiers to termwiz modifiers.
fn gpui_mods_to_termwiz(mods: &Modifiers) -> TermwizMods {
    let mut tm = TermwizMods::NONE;
    if mods.shift {
        tm |= TermwizMods::SHIFT;
    }
    if mods.alt {
        tm |= TermwizMods::ALT;
    }
    if mods.control {
        tm |= TermwizMods::CTRL;
    }
    tm
}

/// Convert a GPUI key name to a termwiz KeyCode.
fn gpui_key_to_termwiz(key: &str) -> Option<KeyCode> {
    match key {
        "up" => Some(KeyCode::UpArrow),
        "down" => Some(KeyCode::DownArrow),
        "left" => Some(KeyCode::LeftArrow),
        "right" => Some(KeyCode::RightArrow),

        "home" => Some(KeyCode::Home),
        "end" => Some(KeyCode::End),
        "pageup" => Some(KeyCode::PageUp),
        "pagedown" => Some(KeyCode::PageDown),
        "insert" => Some(KeyCode::Insert),
        "delete" => Some(KeyCode::Delete),

        "tab" => Some(KeyCode::Tab),
        "enter" => Some(KeyCode::Enter),
        "escape" => Some(KeyCode::Escape),
        "backspace" => Some(KeyCode::Backspace),
        "space" => Some(KeyCode::Char(' ')),

        "f1" => Some(KeyCode::Function(1)),
        "f2" => Some(KeyCode::Function(2)),
        "f3" => Some(KeyCode::Function(3)),
        "f4" => Some(KeyCode::Function(4)),
        "f5" => Some(KeyCode::Function(5)),
        "f6" => Some(KeyCode::Function(6)),
        "f7" => Some(KeyCode::Function(7)),
        "f8" => Some(KeyCode::Function(8)),
        "f9" => Some(KeyCode::Function(9)),
        "f10" => Some(KeyCode::Function(10)),
        "f11" => Some(KeyCode::Function(11)),
        "f12" => Some(KeyCode::Function(12)),

        k if k.chars().count() == 1 => k.chars().next().map(KeyCode::Char),
        _ => None,
    }
}

/// Calculate cell dimensions from font metrics, using the same shaping
/// system as rendering for consistency.
fn calculate_cell_dimensions(
    window: &mut Window,
    font_size: f32,
    font_family: &SharedString,
) -> (f32, f32) {
    let font = Font {
        family: font_family.clone(),
        features: FontFeatures::default(),
        fallbacks: None,
        weight: FontWeight::NORMAL,
        style: FontStyle::Normal,
    };
    let font_size_px = px(font_size);
    let text_system = window.text_system();
    let font_id = text_system.resolve_font(&font);

    let cell_width: f32 = match text_system.advance(font_id, font_size_px, '0') {
        Ok(size) => size.width.into(),
        Err(_) => {
            let run = TextRun {
                len: 1,
                font: font.clone(),
                color: black(),
                background_color: None,
                underline: None,
                strikethrough: None,
            };
            let shaped = text_system.shape_line("0".into(), font_size_px, &[run], None);
            shaped.width.into()
        }
    };

    let ascent: f32 = text_system.ascent(font_id, font_size_px).into();
    let descent: f32 = text_system.descent(font_id, font_size_px).into();
    let cell_height = ascent + descent.abs();

    tracing::debug!(
        font = %font_family,
        size = font_size,
        cell_width,
        cell_height,
        "cell dimensions calculated"
    );
    (cell_width, cell_height)
}

impl Render for TerminalPane {
    fn render(&mut self, window: &mut Window, cx: &mut Context<Self>) -> impl IntoElement {
        let focus_handle = self.focus_handle.clone();
        let palette = self.settings.colors;
        let font_family = self.settings.font_family.clone();

        // Recalculate cell dimensions when font size or family changed.
        let current_font_size = self.settings.font_size;
        let font_size_bits = current_font_size.to_bits();
        let needs_recalc = {
            let display = self.display.read();
            match &display.cached_font_key {
                Some((cached_bits, cached_family)) => {
                    *cached_bits != font_size_bits || *cached_family != font_family
                }
                None => true,
            }
        };
        if needs_recalc {
            let dims = calculate_cell_dimensions(window, current_font_size, &font_family);
            let mut display = self.display.write();
            display.cell_dims = dims;
            display.font_size = current_font_size;
            display.cached_font_key = Some((font_size_bits, font_family.clone()));
        }

        // State for the canvas callbacks.
        let term = self.session.term();
        let resizer = self.session.resizer();
        let display_arc = self.display.clone();
        let search_matches = self.search.matches.clone();
        let search_current = self.search.current;
        let cursor_visible =
            !self.settings.blink_cursor || self.blink_visible || !focus_handle.is_focused(window);
        let font_family_clone = font_family.clone();

        div()
            .id("terminal-pane")
            .key_context("terminal")
            .track_focus(&focus_handle)
            .on_key_down(cx.listener(|this, event: &KeyDownEvent, _window, cx| {
                this.handle_key_down(event, cx);
            }))
            .on_mouse_down(
                MouseButton::Left,
                cx.listener(|this, event: &MouseDownEvent, _window, cx| {
                    this.handle_mouse_down(event, cx);
                }),
            )
            .on_mouse_down(
                MouseButton::Right,
                cx.listener(|this, event: &MouseDownEvent, _window, cx| {
                    this.handle_mouse_down(event, cx);
                }),
            )
            .on_mouse_down(
                MouseButton::Middle,
                cx.listener(|this, event: &MouseDownEvent, _window, cx| {
                    this.handle_mouse_down(event, cx);
                }),
            )
            .on_mouse_up(
                MouseButton::Left,
                cx.listener(|this, event: &MouseUpEvent, _window, cx| {
                    this.handle_mouse_up(event, cx);
                }),
            )
            .on_mouse_up(
                MouseButton::Middle,
                cx.listener(|this, event: &MouseUpEvent, _window, cx| {
                    this.handle_mouse_up(event, cx);
                }),
            )
            .on_mouse_up(
                MouseButton::Right,
                cx.listener(|this, event: &MouseUpEvent, _window, cx| {
                    this.handle_mouse_up(event, cx);
                }),
            )
            .on_mouse_move(cx.listener(|this, event: &MouseMoveEvent, _window, cx| {
                this.handle_mouse_move(event, cx);
            }))
            .on_scroll_wheel(cx.listener(|this, event: &ScrollWheelEvent, _window, cx| {
                this.handle_scroll(event, cx);
            }))
            .on_click(cx.listener(|this, _: &ClickEvent, window, _cx| {
                window.focus(&this.focus_handle);
            }))
            .size_full()
            .bg(palette.background)
            .child(
                canvas(
                    // Prepaint: track bounds, resize to fit, extract frame data.
                    move |bounds, _window, _cx| {
                        let (cell_width, cell_height) = {
                            let mut display = display_arc.write();
                            display.bounds = Some(bounds);
                            display.cell_dims
                        };

                        let bounds_width: f32 = bounds.size.width.into();
                        let bounds_height: f32 = bounds.size.height.into();
                        let new_cols =
                            (((bounds_width - PADDING * 2.0).max(0.0) / cell_width) as u16).max(10);
                        let new_rows = (((bounds_height - PADDING * 2.0).max(0.0) / cell_height)
                            as u16)
                            .max(3);

                        let needs_resize = {
                            let display = display_arc.read();
                            new_cols != display.size.cols || new_rows != display.size.rows
                        };
                        if needs_resize {
                            let new_size = TermSize {
                                cols: new_cols,
                                rows: new_rows,
                            };
                            display_arc.write().size = new_size;
                            resizer.resize(new_size, bounds_width as u16, bounds_height as u16);
                        }

                        let term_guard = term.lock();
                        let render_data = build_render_data(&term_guard, &palette);
                        let selection_range = term_guard.renderable_content().selection;
                        let display_offset = term_guard.grid().display_offset() as i32;
                        drop(term_guard);

                        let (cols, rows) = {
                            let display = display_arc.read();
                            (display.size.cols as usize, display.size.rows as usize)
                        };

                        (
                            render_data,
                            bounds,
                            cell_width,
                            cell_height,
                            selection_range,
                            cols,
                            rows,
                            display_offset,
                        )
                    },
                    // Paint: backgrounds, selection, search, cursor, text runs.
                    move |_bounds, data, window, cx| {
                        let (
                            render_data,
                            bounds,
                            cell_width,
                            cell_height,
                            selection_range,
                            cols,
                            rows,
                            display_offset,
                        ) = data;

                        let origin = bounds.origin;
                        let line_height = px(cell_height);
                        let cell_origin = |row: usize, col: usize| {
                            Point::new(
                                origin.x + px(PADDING + col as f32 * cell_width),
                                origin.y + px(PADDING + row as f32 * cell_height),
                            )
                        };

                        // 1. Background regions.
                        for region in &render_data.bg_regions {
                            window.paint_quad(fill(
                                Bounds::new(
                                    cell_origin(region.row, region.col_start),
                                    Size {
                                        width: px(
                                            (region.col_end - region.col_start) as f32 * cell_width
                                        ),
                                        height: line_height,
                                    },
                                ),
                                region.color,
                            ));
                        }

                        // 2. Selection highlight.
                        if let Some(sel) = selection_range {
                            let same_cell = sel.start.line == sel.end.line
                                && sel.start.column == sel.end.column;
                            if !same_cell {
                                let start_visual = sel.start.line.0 + display_offset;
                                let end_visual = sel.end.line.0 + display_offset;
                                let first_row = start_visual.max(0) as usize;
                                let last_row =
                                    (end_visual.max(0) as usize).min(rows.saturating_sub(1));

                                if first_row <= last_row
                                    && end_visual >= 0
                                    && start_visual < rows as i32
                                {
                                    for row in first_row..=last_row {
                                        let (col_start, col_end) = if sel.is_block {
                                            (sel.start.column.0, sel.end.column.0 + 1)
                                        } else {
                                            let cs = if row == first_row && start_visual >= 0 {
                                                sel.start.column.0
                                            } else {
                                                0
                                            };
                                            let ce =
                                                if row == last_row && end_visual == row as i32 {
                                                    sel.end.column.0 + 1
                                                } else {
                                                    cols
                                                };
                                            (cs, ce)
                                        };
                                        window.paint_quad(fill(
                                            Bounds::new(
                                                cell_origin(row, col_start),
                                                Size {
                                                    width: px(
                                                        (col_end - col_start) as f32 * cell_width,
                                                    ),
                                                    height: line_height,
                                                },
                                            ),
                                            palette.selection,
                                        ));
                                    }
                                }
                            }
                        }

                        // 3. Search match highlights.
                        for (idx, &(match_line, start_col, end_col)) in
                            search_matches.iter().enumerate()
                        {
                            let visual_row = match_line + display_offset;
                            if visual_row < 0 || visual_row >= rows as i32 {
                                continue;
                            }
                            let highlight = if Some(idx) == search_current {
                                hsla(0.14, 0.9, 0.5, 0.6)
                            } else {
                                hsla(0.14, 0.9, 0.5, 0.25)
                            };
                            window.paint_quad(fill(
                                Bounds::new(
                                    cell_origin(visual_row as usize, start_col),
                                    Size {
                                        width: px((end_col - start_col) as f32 * cell_width),
                                        height: line_height,
                                    },
                                ),
                                highlight,
                            ));
                        }

                        // 4. Cursor, under the text so the glyph stays visible.
                        if let Some(cursor) = render_data.cursor {
                            if cursor_visible {
                                let origin = cell_origin(cursor.row, cursor.col);
                                let cursor_bounds = match cursor.shape {
                                    CursorShape::Underline => Bounds::new(
                                        Point::new(
                                            origin.x,
                                            origin.y + line_height - px(2.0),
                                        ),
                                        Size {
                                            width: px(cell_width),
                                            height: px(2.0),
                                        },
                                    ),
                                    CursorShape::Beam => Bounds::new(
                                        origin,
                                        Size {
                                            width: px(2.0),
                                            height: line_height,
                                        },
                                    ),
                                    _ => Bounds::new(
                                        origin,
                                        Size {
                                            width: px(cell_width),
                                            height: line_height,
                                        },
                                    ),
                                };
                                window.paint_quad(fill(cursor_bounds, cursor.color));
                            }
                        }

                        // 5. Text, batched into same-style adjacent runs.
                        paint_text_runs(
                            &render_data.cells,
                            &font_family_clone,
                            current_font_size,
                            cell_width,
                            cell_height,
                            origin,
                            window,
                            cx,
                        );
                    },
                )
                .size_full(),
            )
    }
}

/// Paint cells as batched runs of adjacent same-style characters, each run
/// positioned at its first cell's grid coordinate so cursor-text alignment
/// is never lost.
fn paint_text_runs(
    cells: &[crate::render::RenderCell],
    font_family: &SharedString,
    font_size: f32,
    cell_width: f32,
    cell_height: f32,
    origin: Point<Pixels>,
    window: &mut Window,
    cx: &mut App,
) {
    let make_font = |flags: CellFlags| -> Font {
        Font {
            family: font_family.clone(),
            features: FontFeatures::default(),
            fallbacks: None,
            weight: if flags.contains(CellFlags::BOLD) {
                FontWeight::BOLD
            } else {
                FontWeight::NORMAL
            },
            style: if flags.contains(CellFlags::ITALIC) {
                FontStyle::Italic
            } else {
                FontStyle::Normal
            },
        }
    };
    let style_of = |flags: CellFlags| {
        flags.intersection(CellFlags::BOLD | CellFlags::ITALIC | CellFlags::UNDERLINE)
    };

    let mut run_text = String::with_capacity(32);
    let mut i = 0;
    while i < cells.len() {
        let start = &cells[i];
        let run_row = start.row;
        let run_col = start.col;
        let run_fg = start.fg;
        let run_style = style_of(start.flags);

        run_text.clear();
        run_text.push(start.c);
        let mut run_end_col = run_col;
        i += 1;

        while i < cells.len() {
            let cell = &cells[i];
            let expected_next = if cells[i - 1].flags.contains(CellFlags::WIDE_CHAR) {
                run_end_col + 2
            } else {
                run_end_col + 1
            };
            if cell.row != run_row
                || cell.col != expected_next
                || cell.fg != run_fg
                || style_of(cell.flags) != run_style
            {
                break;
            }
            run_text.push(cell.c);
            run_end_col = cell.col;
            i += 1;
        }

        let font = make_font(run_style);
        let underline = run_style.contains(CellFlags::UNDERLINE).then(|| {
            UnderlineStyle {
                thickness: px(1.0),
                color: Some(run_fg),
                wavy: false,
            }
        });
        let run = TextRun {
            len: run_text.len(),
            font,
            color: run_fg,
            background_color: None,
            underline,
            strikethrough: None,
        };

        let shaped = window.text_system().shape_line(
            SharedString::from(run_text.clone()),
            px(font_size),
            &[run],
            None,
        );
        let position = Point::new(
            origin.x + px(PADDING + run_col as f32 * cell_width),
            origin.y + px(PADDING + run_row as f32 * cell_height),
        );
        let _ = shaped.paint(position, px(cell_height), window, cx);
    }
}
