//! One terminal session: an alacritty grid fed by a PTY.
//!
//! The session owns the widget-side features the shell consumes: pattern
//! match registration (URI detection), cell-coordinate match lookup, and
//! the event funnel (title changes, bell, child exit).

use crate::pty_handler::PtyHandler;
use alacritty_terminal::event::{Event, EventListener, WindowSize};
use alacritty_terminal::grid::Dimensions;
use alacritty_terminal::index::{Column, Line};
use alacritty_terminal::term::{Config as TermConfig, Term};
use alacritty_terminal::vte::ansi::{Processor, Rgb};
use anyhow::Result;
use parking_lot::Mutex;
use regex::Regex;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Terminal dimensions in rows and columns.
///
/// Implements `Dimensions` for alacritty compatibility.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TermSize {
    pub cols: u16,
    pub rows: u16,
}

impl Default for TermSize {
    fn default() -> Self {
        Self { cols: 80, rows: 24 }
    }
}

impl Dimensions for TermSize {
    fn total_lines(&self) -> usize {
        self.rows as usize
    }

    fn screen_lines(&self) -> usize {
        self.rows as usize
    }

    fn columns(&self) -> usize {
        self.cols as usize
    }
}

/// Identifier handed out by [`Session::register_match`]; distinguishes
/// which registered pattern produced a given match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchTag(usize);

/// Events drained from the widget by the owning view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The child changed (or reset) the window title.
    TitleChanged(Option<String>),
    Bell,
}

/// Event listener wired into the alacritty terminal.
#[derive(Clone)]
pub struct Listener {
    title: Arc<Mutex<Option<String>>>,
    title_dirty: Arc<AtomicBool>,
    bell: Arc<AtomicBool>,
    background: Arc<Mutex<Rgb>>,
    size: Arc<Mutex<TermSize>>,
    pty: Arc<Mutex<Option<PtyHandler>>>,
}

impl Listener {
    fn new(pty: Arc<Mutex<Option<PtyHandler>>>, size: TermSize) -> Self {
        Self {
            title: Arc::new(Mutex::new(None)),
            title_dirty: Arc::new(AtomicBool::new(false)),
            bell: Arc::new(AtomicBool::new(false)),
            background: Arc::new(Mutex::new(Rgb { r: 0, g: 0, b: 0 })),
            size: Arc::new(Mutex::new(size)),
            pty,
        }
    }

    fn pty_write(&self, data: &[u8]) {
        let mut pty_guard = self.pty.lock();
        if let Some(ref mut pty) = *pty_guard {
            if let Err(e) = pty.write(data) {
                tracing::warn!(error = %e, "PTY write-back failed");
            }
        }
    }
}

impl EventListener for Listener {
    fn send_event(&self, event: Event) {
        match event {
            Event::Title(title) => {
                *self.title.lock() = Some(title);
                self.title_dirty.store(true, Ordering::Relaxed);
            }
            Event::ResetTitle => {
                *self.title.lock() = None;
                self.title_dirty.store(true, Ordering::Relaxed);
            }
            Event::Bell => self.bell.store(true, Ordering::Relaxed),
            Event::PtyWrite(text) => self.pty_write(text.as_bytes()),
            Event::ColorRequest(_index, formatter) => {
                // OSC 10/11/12 queries; reply with the configured background
                // so TUI apps detect dark/light mode correctly.
                let response = formatter(*self.background.lock());
                self.pty_write(response.as_bytes());
            }
            Event::TextAreaSizeRequest(formatter) => {
                let size = *self.size.lock();
                let response = formatter(WindowSize {
                    num_lines: size.rows,
                    num_cols: size.cols,
                    cell_width: 8,
                    cell_height: 16,
                });
                self.pty_write(response.as_bytes());
            }
            _ => {}
        }
    }
}

/// Options for spawning a session.
pub struct SpawnOptions {
    /// Program and arguments. Must not be empty.
    pub argv: Vec<String>,
    /// Working directory, or inherit when `None`.
    pub cwd: Option<PathBuf>,
    pub size: TermSize,
    /// Scrollback buffer size in lines.
    pub scrollback_lines: u32,
    /// Characters treated as part of a word for semantic selection.
    pub word_chars: String,
}

/// A live terminal: PTY child + grid + registered patterns.
pub struct Session {
    term: Arc<Mutex<Term<Listener>>>,
    processor: Arc<Mutex<Processor>>,
    pty: Arc<Mutex<Option<PtyHandler>>>,
    listener: Listener,
    matches: Vec<Regex>,
}

impl Session {
    /// Spawn the child and build the terminal around it. Spawn failures
    /// propagate so the caller can abandon the partially-created tab.
    pub fn spawn(options: SpawnOptions) -> Result<Self> {
        let pty = PtyHandler::spawn(
            &options.argv,
            options.cwd.as_deref(),
            options.size.rows,
            options.size.cols,
        )?;
        let pty = Arc::new(Mutex::new(Some(pty)));

        let listener = Listener::new(pty.clone(), options.size);
        let config = TermConfig {
            scrolling_history: options.scrollback_lines as usize,
            semantic_escape_chars: semantic_escape_chars(&options.word_chars),
            ..TermConfig::default()
        };
        let term = Term::new(config, &options.size, listener.clone());

        Ok(Self {
            term: Arc::new(Mutex::new(term)),
            processor: Arc::new(Mutex::new(Processor::new())),
            pty,
            listener,
            matches: Vec::new(),
        })
    }

    /// Shared handle to the terminal grid, for rendering and selection.
    pub fn term(&self) -> Arc<Mutex<Term<Listener>>> {
        self.term.clone()
    }

    /// Drain pending PTY output into the grid. Returns whether anything
    /// was processed (callers redraw on `true`).
    pub fn pump(&self) -> bool {
        let chunks = {
            let pty_guard = self.pty.lock();
            match &*pty_guard {
                Some(pty) => pty.read_output(),
                None => return false,
            }
        };
        if chunks.is_empty() {
            return false;
        }
        let mut term = self.term.lock();
        let mut processor = self.processor.lock();
        for chunk in &chunks {
            processor.advance(&mut *term, chunk);
        }
        true
    }

    /// Drain widget events accumulated since the last call.
    pub fn take_events(&self) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        if self.listener.title_dirty.swap(false, Ordering::Relaxed) {
            events.push(SessionEvent::TitleChanged(self.title()));
        }
        if self.listener.bell.swap(false, Ordering::Relaxed) {
            events.push(SessionEvent::Bell);
        }
        events
    }

    /// Title set by the child via escape sequences, if any.
    pub fn title(&self) -> Option<String> {
        self.listener.title.lock().clone()
    }

    /// Send input bytes to the child. A failed write means the child is
    /// gone; the handler is dropped so the session reads as exited.
    pub fn write(&self, data: &[u8]) {
        let mut pty_guard = self.pty.lock();
        if let Some(ref mut pty) = *pty_guard {
            if let Err(e) = pty.write(data) {
                tracing::warn!(error = %e, "PTY write failed, child likely exited");
                *pty_guard = None;
            }
        }
    }

    /// Resize both the PTY and the grid.
    pub fn resize(&self, size: TermSize, pixel_width: u16, pixel_height: u16) {
        self.resizer().resize(size, pixel_width, pixel_height);
    }

    /// Cheap cloneable handle for resizing from layout callbacks.
    pub fn resizer(&self) -> SessionResizer {
        SessionResizer {
            term: self.term.clone(),
            pty: self.pty.clone(),
            size: self.listener.size.clone(),
        }
    }

    /// Re-apply runtime-changeable widget options.
    pub fn apply_options(&self, scrollback_lines: u32, word_chars: &str, background: (u8, u8, u8)) {
        let config = TermConfig {
            scrolling_history: scrollback_lines as usize,
            semantic_escape_chars: semantic_escape_chars(word_chars),
            ..TermConfig::default()
        };
        self.term.lock().set_options(config);
        *self.listener.background.lock() = Rgb {
            r: background.0,
            g: background.1,
            b: background.2,
        };
    }

    /// Whether the child has exited (EOF, exit notification, or the
    /// handler was dropped after a failed write).
    pub fn has_exited(&self) -> bool {
        let pty_guard = self.pty.lock();
        match &*pty_guard {
            None => true,
            Some(pty) => pty.has_exited(),
        }
    }

    /// Force the "not running" sentinel: drops the PTY handle so the
    /// running-children check can no longer fire. Used when the widget
    /// reports child exit before the tab is torn down.
    pub fn mark_exited(&self) {
        self.pty.lock().take();
    }

    /// Best-effort: does the child have foreground work of its own?
    pub fn has_running_children(&self) -> bool {
        let pty_guard = self.pty.lock();
        match &*pty_guard {
            None => false,
            Some(pty) => pty.has_foreground_child(),
        }
    }

    /// Working directory of the child, when the platform exposes it.
    pub fn child_working_directory(&self) -> Option<PathBuf> {
        let pty_guard = self.pty.lock();
        pty_guard.as_ref()?.child_working_directory()
    }

    /// Register a pattern to be matched against terminal rows. The
    /// returned tag identifies this pattern in [`Session::match_at`].
    pub fn register_match(&mut self, pattern: Regex) -> MatchTag {
        self.matches.push(pattern);
        MatchTag(self.matches.len() - 1)
    }

    /// Find a registered-pattern match covering the given cell of the
    /// visible grid. Returns the matched text and the tag of the pattern
    /// that produced it.
    pub fn match_at(&self, col: usize, row: usize) -> Option<(String, MatchTag)> {
        let line = self.row_text(row);
        find_match_in_row(&line, col, &self.matches)
    }

    /// Text content of a visual terminal row (0 = top of viewport),
    /// accounting for scrollback offset.
    pub fn row_text(&self, visual_row: usize) -> String {
        let term = self.term.lock();
        let grid = term.grid();
        let display_offset = grid.display_offset() as i32;

        let line = Line(visual_row as i32 - display_offset);

        // The grid addresses scrollback with negative lines; valid range is
        // -(total - screen) .. screen.
        let total_lines = grid.total_lines() as i32;
        let screen_lines = grid.screen_lines() as i32;
        let min_line = -(total_lines - screen_lines);
        if line.0 < min_line || line.0 >= screen_lines {
            return String::new();
        }

        let cols = grid.columns();
        let row_data = &grid[line];
        (0..cols).map(|c| row_data[Column(c)].c).collect()
    }
}

/// Cloneable resize handle; layout code runs inside `'static` canvas
/// callbacks and cannot borrow the session itself.
#[derive(Clone)]
pub struct SessionResizer {
    term: Arc<Mutex<Term<Listener>>>,
    pty: Arc<Mutex<Option<PtyHandler>>>,
    size: Arc<Mutex<TermSize>>,
}

impl SessionResizer {
    pub fn resize(&self, size: TermSize, pixel_width: u16, pixel_height: u16) {
        {
            let pty_guard = self.pty.lock();
            if let Some(ref pty) = *pty_guard {
                if let Err(e) = pty.resize(size.rows, size.cols, pixel_width, pixel_height) {
                    tracing::warn!(
                        cols = size.cols,
                        rows = size.rows,
                        error = %e,
                        "PTY resize failed, child may have exited"
                    );
                }
            }
        }
        *self.size.lock() = size;
        self.term.lock().resize(size);
    }
}

/// Find the first registered pattern with a match covering `col`.
///
/// Column arithmetic is done in characters (grid cells), not bytes, so
/// multi-byte content keeps match spans aligned with the grid.
fn find_match_in_row(line: &str, col: usize, patterns: &[Regex]) -> Option<(String, MatchTag)> {
    if patterns.is_empty() || line.is_empty() {
        return None;
    }

    // byte offset -> column index
    let mut byte_to_col = vec![0usize; line.len() + 1];
    for (col_idx, (byte_idx, ch)) in line.char_indices().enumerate() {
        for b in byte_idx..byte_idx + ch.len_utf8() {
            byte_to_col[b] = col_idx;
        }
        byte_to_col[byte_idx + ch.len_utf8()] = col_idx + 1;
    }

    for (tag, pattern) in patterns.iter().enumerate() {
        for found in pattern.find_iter(line) {
            let start_col = byte_to_col[found.start()];
            let end_col = byte_to_col[found.end()];
            if (start_col..end_col).contains(&col) {
                return Some((found.as_str().to_string(), MatchTag(tag)));
            }
        }
    }
    None
}

/// Translate a word-character set (`-a-zA-Z0-9_./@~` syntax, with ranges)
/// into alacritty's semantic escape characters: the printable ASCII
/// characters that terminate a word, plus whitespace.
fn semantic_escape_chars(word_chars: &str) -> String {
    let wordy = |c: char| -> bool {
        if c.is_alphanumeric() {
            // Ranges like a-zA-Z0-9 cover these in practice; treating all
            // alphanumerics as wordy avoids surprises with non-ASCII text.
            return true;
        }
        let bytes: Vec<char> = word_chars.chars().collect();
        let mut i = 0;
        while i < bytes.len() {
            // A dash between two characters is a range, except leading/trailing.
            if i + 2 < bytes.len() && bytes[i + 1] == '-' {
                if (bytes[i]..=bytes[i + 2]).contains(&c) {
                    return true;
                }
                i += 3;
            } else {
                if bytes[i] == c {
                    return true;
                }
                i += 1;
            }
        }
        false
    };

    let mut escape: String = (0x21u8..0x7f)
        .map(|b| b as char)
        .filter(|&c| !wordy(c))
        .collect();
    escape.push(' ');
    escape.push('\t');
    escape
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn uri_regex() -> Regex {
        Regex::new(r"[a-zA-Z0-9+-]+://\S*[a-zA-Z0-9_/%&=]").unwrap()
    }

    #[test]
    fn term_size_default_is_80x24() {
        let size = TermSize::default();
        assert_eq!(size.columns(), 80);
        assert_eq!(size.screen_lines(), 24);
        assert_eq!(size.total_lines(), 24);
    }

    #[test]
    fn match_at_returns_tag_of_matching_pattern() {
        let patterns = vec![Regex::new("foo+").unwrap(), uri_regex()];
        let line = "see http://example.com/x for foo details";

        let (text, tag) = find_match_in_row(line, 8, &patterns).unwrap();
        assert_eq!(text, "http://example.com/x");
        assert_eq!(tag, MatchTag(1));

        let (text, tag) = find_match_in_row(line, 30, &patterns).unwrap();
        assert_eq!(text, "foo");
        assert_eq!(tag, MatchTag(0));
    }

    #[test_case(3 ; "just before the match")]
    #[test_case(24 ; "just after the match")]
    fn match_at_misses_outside_span(col: usize) {
        let patterns = vec![uri_regex()];
        let line = "see http://example.com/x for details";
        assert_eq!(find_match_in_row(line, col, &patterns), None);
    }

    #[test]
    fn match_at_start_and_end_columns_are_inclusive_exclusive() {
        let patterns = vec![uri_regex()];
        let line = "see http://example.com/x for details";
        // Match spans columns 4..24.
        assert!(find_match_in_row(line, 4, &patterns).is_some());
        assert!(find_match_in_row(line, 23, &patterns).is_some());
        assert!(find_match_in_row(line, 24, &patterns).is_none());
    }

    #[test]
    fn match_columns_are_cells_not_bytes() {
        let patterns = vec![uri_regex()];
        // Two 3-byte characters before the URI: columns shift by 2, bytes by 6.
        let line = "λλ http://a.example/ tail";
        let (text, _) = find_match_in_row(line, 5, &patterns).unwrap();
        assert_eq!(text, "http://a.example/");
        assert!(find_match_in_row(line, 1, &patterns).is_none());
    }

    #[test]
    fn no_patterns_no_match() {
        assert_eq!(find_match_in_row("anything", 0, &[]), None);
    }

    #[test]
    fn uri_pattern_matches_common_schemes() {
        let re = uri_regex();
        for uri in [
            "http://example.com",
            "https://example.com/a/b?q=1",
            "ftp://host/file",
            "ssh+git://host/repo",
        ] {
            let line = format!("before {} after", uri);
            assert!(re.is_match(&line), "{}", uri);
        }
        assert!(!re.is_match("not a uri at all"));
    }

    #[test]
    fn semantic_escape_chars_excludes_word_chars() {
        let escape = semantic_escape_chars("-a-zA-Z0-9_./@~");
        for c in ['_', '.', '/', '@', '~', '-'] {
            assert!(!escape.contains(c), "{:?} should be wordy", c);
        }
        for c in ['|', '"', '(', ')', '<', '>', ' ', '\t'] {
            assert!(escape.contains(c), "{:?} should be a boundary", c);
        }
    }

    #[test]
    fn semantic_escape_chars_treats_dash_ranges_as_ranges() {
        // "0-9" means digits, not the literal characters '0', '-', '9'.
        let escape = semantic_escape_chars("0-9");
        assert!(escape.contains('-'));
        assert!(!escape.contains('5'));
    }
}
