//! Terminal pane view for tabterm.
//!
//! Renders a [`terminal::Session`] with GPUI and routes input to it.

mod colors;
mod pane;
mod render;

pub use colors::{settings_color_to_hsla, TerminalColors};
pub use pane::{DisplaySettings, PaneEvent, TerminalPane};
