//! Popup menu model.
//!
//! The menu is data: a list of (label, action) rows the workspace renders
//! as an overlay and dispatches through GPUI actions. The full variant is
//! used for right-clicks inside a terminal and the menu key; tab labels
//! get the reduced variant without the URI/clipboard group.

use actions::*;
use gpui::{Action, FocusHandle, Pixels, Point};

pub struct MenuItem {
    pub label: &'static str,
    pub action: Box<dyn Action>,
    /// Rendered as a check mark for boolean config entries.
    pub checked: Option<bool>,
    pub separator_before: bool,
}

impl MenuItem {
    fn plain(label: &'static str, action: Box<dyn Action>) -> Self {
        Self {
            label,
            action,
            checked: None,
            separator_before: false,
        }
    }

    fn after_separator(mut self) -> Self {
        self.separator_before = true;
        self
    }

    fn check(mut self, on: bool) -> Self {
        self.checked = Some(on);
        self
    }
}

/// An open popup menu.
pub struct MenuState {
    pub items: Vec<MenuItem>,
    pub position: Point<Pixels>,
    pub selected: Option<usize>,
    pub focus: FocusHandle,
}

impl MenuState {
    pub fn select_next(&mut self) {
        let len = self.items.len();
        if len == 0 {
            return;
        }
        self.selected = Some(match self.selected {
            Some(i) => (i + 1) % len,
            None => 0,
        });
    }

    pub fn select_prev(&mut self) {
        let len = self.items.len();
        if len == 0 {
            return;
        }
        self.selected = Some(match self.selected {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        });
    }
}

/// Build the menu item list.
///
/// `full` includes the URI/clipboard group (right-click in a terminal);
/// the reduced variant is for tab labels. `has_uri` reflects whether the
/// click landed on a detected URI.
pub fn build_menu(full: bool, has_uri: bool, save_at_exit: bool) -> Vec<MenuItem> {
    let mut items = Vec::new();

    if full {
        if has_uri {
            items.push(MenuItem::plain("Open URI…", Box::new(OpenUri)));
            items.push(MenuItem::plain("Copy URI", Box::new(CopyUri)));
        } else {
            items.push(MenuItem::plain("Copy", Box::new(CopySelection)));
        }
        items.push(MenuItem::plain("Paste", Box::new(Paste)));
    }

    let mut title = MenuItem::plain("Tab title…", Box::new(SetTabTitle));
    title.separator_before = full;
    items.push(title);
    items.push(MenuItem::plain("New tab", Box::new(NewTab)));
    items.push(MenuItem::plain("Close tab", Box::new(CloseTab)));

    items.push(MenuItem::plain("Select font…", Box::new(SelectFont)).after_separator());
    items.push(MenuItem::plain("Select colors…", Box::new(SelectColors)));

    items.push(MenuItem::plain("Reload configuration", Box::new(ReloadConfig)).after_separator());
    items.push(MenuItem::plain("Save configuration now", Box::new(SaveConfigNow)));
    items.push(
        MenuItem::plain("Save at exit", Box::new(ToggleSaveAtExit)).check(save_at_exit),
    );

    items
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(items: &[MenuItem]) -> Vec<&'static str> {
        items.iter().map(|i| i.label).collect()
    }

    #[test]
    fn full_menu_with_uri_offers_uri_entries() {
        let items = build_menu(true, true, true);
        let labels = labels(&items);
        assert!(labels.contains(&"Open URI…"));
        assert!(labels.contains(&"Copy URI"));
        assert!(!labels.contains(&"Copy"));
    }

    #[test]
    fn full_menu_without_uri_offers_copy() {
        let items = build_menu(true, false, true);
        let labels = labels(&items);
        assert!(labels.contains(&"Copy"));
        assert!(!labels.contains(&"Open URI…"));
        assert!(labels.contains(&"Paste"));
    }

    #[test]
    fn reduced_menu_has_no_clipboard_group() {
        let items = build_menu(false, false, true);
        let labels = labels(&items);
        assert!(!labels.contains(&"Copy"));
        assert!(!labels.contains(&"Paste"));
        assert!(!labels.contains(&"Open URI…"));
        assert_eq!(labels[0], "Tab title…");
    }

    #[test]
    fn save_at_exit_reflects_config() {
        let items = build_menu(true, false, false);
        let save = items.iter().find(|i| i.label == "Save at exit").unwrap();
        assert_eq!(save.checked, Some(false));
    }
}
