//! Configuration system for tabterm.
//!
//! Provides compile-time constants, the typed configuration store, and the
//! value types it serializes: `#rrggbb` colors and accelerator key bindings.

pub mod constants;

mod color;
mod file;
mod keybinding;

pub use color::{Color, ParseColorError};
pub use file::{load_config, load_config_from, save_config, save_config_to, Config, FontSpec};
pub use keybinding::{
    normalize_key, BindingAction, BindingSpec, KeyBinding, KeyBindings, Modifiers,
    ParseAccelError, BINDINGS,
};
