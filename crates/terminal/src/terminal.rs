//! Terminal-widget adapter for tabterm.
//!
//! Everything the GUI shell needs from the terminal stack lives behind this
//! crate: PTY process management, the alacritty_terminal grid and parser,
//! pattern-match registration (URI highlighting) and text search. No view
//! code here; this is the pure logic layer.

mod pty_handler;
mod session;

pub use pty_handler::{default_shell, PtyHandler};
pub use session::{
    Listener, MatchTag, Session, SessionEvent, SessionResizer, SpawnOptions, TermSize,
};
