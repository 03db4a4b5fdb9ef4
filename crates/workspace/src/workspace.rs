//! Workspace UI for tabterm.
//!
//! The window/tab container, popup menu, dialogs, and the key-binding
//! dispatcher.

mod dialogs;
mod menu;
mod tabstrip;
mod uri;
mod workspace_view;

pub use uri::{open_uri, uri_regex};
pub use workspace_view::{StartupTab, Workspace, WorkspaceParams};
