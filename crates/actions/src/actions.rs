//! Shared action definitions for tabterm.
//!
//! All gpui::actions! used across multiple crates are defined here
//! to avoid circular dependencies. The key-binding dispatcher and the
//! popup menu both funnel into these actions; the workspace handles them.

use gpui::{actions, Action};
use settings::BindingAction;

// Application lifecycle
actions!(tabterm, [Quit]);

// Tab management
actions!(tabterm, [NewTab, CloseTab, LeftTab, RightTab, PreviousTab]);

// Clipboard
actions!(tabterm, [CopySelection, Paste]);

// URI handling (the workspace stashes the URI under the popup menu)
actions!(tabterm, [OpenUri, CopyUri]);

// Dialogs
actions!(tabterm, [SetTabTitle, SelectFont, SelectColors]);

// Search
actions!(tabterm, [Find, FindNext, FindPrev]);

// Configuration
actions!(tabterm, [ReloadConfig, SaveConfigNow, ToggleSaveAtExit]);

/// Map a configurable binding to the action it dispatches.
pub fn action_for_binding(binding: BindingAction) -> Box<dyn Action> {
    match binding {
        BindingAction::NewTab => Box::new(NewTab),
        BindingAction::LeftTab => Box::new(LeftTab),
        BindingAction::RightTab => Box::new(RightTab),
        BindingAction::PreviousTab => Box::new(PreviousTab),
        BindingAction::Copy => Box::new(CopySelection),
        BindingAction::Paste => Box::new(Paste),
        BindingAction::Find => Box::new(Find),
        BindingAction::FindNext => Box::new(FindNext),
        BindingAction::FindPrev => Box::new(FindPrev),
    }
}
