//! The main workspace view: tab bar, terminal panes, popup menu, dialogs,
//! and the key-binding dispatcher.

use crate::dialogs::{
    CloseTarget, ColorRow, ColorsDialog, DialogState, FontDialog, SearchDialog, TitleDialog,
};
use crate::menu::{build_menu, MenuState};
use crate::tabstrip::{TabId, TabStrip};
use crate::uri;
use actions::*;
use gpui::prelude::FluentBuilder;
use gpui::*;
use gpui_component::button::Button;
use gpui_component::{h_flex, v_flex, Disableable};
use regex::Regex;
use settings::constants::tab_bar;
use settings::constants::terminal::{MAX_FONT_SIZE, MIN_FONT_SIZE};
use settings::{load_config, normalize_key, save_config, Config, Modifiers as BindingMods};
use std::path::{Path, PathBuf};
use terminal::{default_shell, Session, SpawnOptions, TermSize};
use terminal_view::{settings_color_to_hsla, DisplaySettings, PaneEvent, TerminalColors, TerminalPane};

/// A tab requested on the command line (or the implicit default tab).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartupTab {
    pub title: Option<String>,
    pub cwd: Option<PathBuf>,
    pub command: Option<String>,
}

/// Everything the binary hands to the workspace at startup.
pub struct WorkspaceParams {
    pub config: Config,
    pub startup_tabs: Vec<StartupTab>,
}

/// One terminal session displayed as a page of the window.
struct Tab {
    label: String,
    /// Bell received while the tab was not focused.
    bell: bool,
    pane: Entity<TerminalPane>,
    _subscription: Subscription,
}

/// The application context: configuration, tabs, focus bookkeeping, and
/// transient menu/dialog state. Constructed once at startup and owned by
/// the window.
pub struct Workspace {
    config: Config,
    tabs: TabStrip<Tab>,
    /// Tab label counter (starting at 1).
    label_nb: u32,
    quitting: bool,
    search_regex: Option<Regex>,
    /// URI stashed for the currently open popup menu.
    menu_uri: Option<String>,
    menu: Option<MenuState>,
    dialog: Option<DialogState>,
    /// Focus target while a menu or dialog is open.
    overlay_focus: FocusHandle,
}

impl Workspace {
    pub fn new(params: WorkspaceParams, cx: &mut Context<Self>) -> Self {
        let mut this = Self {
            config: params.config,
            tabs: TabStrip::new(),
            label_nb: 1,
            quitting: false,
            search_regex: None,
            menu_uri: None,
            menu: None,
            dialog: None,
            overlay_focus: cx.focus_handle(),
        };

        for spec in &params.startup_tabs {
            match this.create_tab(spec.command.as_deref(), spec.cwd.as_deref(), cx) {
                Some(index) => {
                    if let Some(title) = &spec.title {
                        if let Some(id) = this.tabs.id_at(index) {
                            if let Some(tab) = this.tabs.get_mut(id) {
                                tab.label = title.clone();
                            }
                        }
                    }
                }
                None => {
                    tracing::error!(
                        "failed to create tab '{}'",
                        spec.title.as_deref().unwrap_or_default()
                    );
                }
            }
        }

        if this.tabs.is_empty() {
            tracing::error!("failed to create any tab");
            cx.defer(|cx| cx.quit());
        }

        this
    }

    // === Tab lifecycle ===

    /// Open a new tab. `command` is parsed as an argv-style vector (shell
    /// fallback on parse failure); the working directory falls back to the
    /// current tab's child directory, then to our own. On spawn failure no
    /// tab is created. The new tab becomes current.
    fn create_tab(
        &mut self,
        command: Option<&str>,
        cwd: Option<&Path>,
        cx: &mut Context<Self>,
    ) -> Option<usize> {
        let argv = match command {
            Some(cmd) => match shell_words::split(cmd) {
                Ok(argv) if !argv.is_empty() => argv,
                Ok(_) => vec![default_shell()],
                Err(e) => {
                    tracing::error!("cannot parse command: {}", e);
                    vec![default_shell()]
                }
            },
            None => vec![default_shell()],
        };

        let cwd = cwd.map(Path::to_path_buf).or_else(|| {
            self.tabs
                .current()
                .and_then(|tab| tab.pane.read(cx).session().child_working_directory())
        });

        let session = match Session::spawn(SpawnOptions {
            argv,
            cwd,
            size: TermSize::default(),
            scrollback_lines: self.config.buffer_lines,
            word_chars: self.config.word_chars.clone(),
        }) {
            Ok(session) => session,
            Err(e) => {
                tracing::error!("cannot run tab command: {:#}", e);
                return None;
            }
        };

        let display = self.display_settings();
        let search = self.search_regex.clone();
        let pane = cx.new(|cx| {
            let mut pane = TerminalPane::new(session, uri::uri_regex(), display, cx);
            if search.is_some() {
                pane.set_search_pattern(search, cx);
            }
            pane
        });
        let subscription = cx.subscribe(&pane, Self::on_pane_event);

        let label = format!("Term {}", self.label_nb);
        self.label_nb += 1;

        let id = self.tabs.push(Tab {
            label,
            bell: false,
            pane,
            _subscription: subscription,
        });
        let Some(index) = self.tabs.index_of(id) else {
            util::debug_panic!("freshly pushed tab {} missing from strip", id);
            return None;
        };
        self.focus_tab(index, cx);
        Some(index)
    }

    /// Make the tab at `index` current (render focuses its terminal).
    fn focus_tab(&mut self, index: usize, cx: &mut Context<Self>) {
        self.tabs.focus_index(index);
        if let Some(tab) = self.tabs.current_mut() {
            tab.bell = false;
        }
        cx.notify();
    }

    fn focus_relative(&mut self, n: i32, cx: &mut Context<Self>) {
        self.tabs.focus_relative(n);
        if let Some(tab) = self.tabs.current_mut() {
            tab.bell = false;
        }
        cx.notify();
    }

    fn focus_previous_tab(&mut self, cx: &mut Context<Self>) {
        if let Some(index) = self
            .tabs
            .previous_id()
            .and_then(|id| self.tabs.index_of(id))
        {
            self.focus_tab(index, cx);
        }
    }

    /// Close a tab, asking for confirmation first when its child still has
    /// foreground work (best-effort heuristic).
    fn request_close_tab(&mut self, id: TabId, cx: &mut Context<Self>) {
        let running = self
            .tabs
            .get(id)
            .map(|tab| tab.pane.read(cx).session().has_running_children())
            .unwrap_or(false);
        if running {
            self.dialog = Some(DialogState::Confirm(CloseTarget::Tab(id)));
            cx.notify();
        } else {
            self.close_tab(id, cx);
        }
    }

    /// Remove a tab unconditionally. Stale current/previous references are
    /// cleared by the strip before the slot disappears; removing the last
    /// tab quits the application.
    fn close_tab(&mut self, id: TabId, cx: &mut Context<Self>) {
        if self.tabs.remove(id).is_none() {
            return;
        }
        if self.tabs.is_empty() {
            self.quit(cx);
            return;
        }
        if let Some(tab) = self.tabs.current_mut() {
            tab.bell = false;
        }
        cx.notify();
    }

    /// Quit exactly once: save the configuration if configured to, then
    /// tear the application down. Subsequent calls are no-ops.
    fn quit(&mut self, cx: &mut Context<Self>) {
        if self.quitting {
            return;
        }
        self.quitting = true;
        if self.config.save_conf_at_exit {
            save_config(&self.config);
        }
        cx.quit();
    }

    /// Window-close request. Returns whether the window may close now;
    /// when a child still has running work a confirm dialog opens instead.
    pub fn request_quit(&mut self, cx: &mut Context<Self>) -> bool {
        if self.quitting {
            return true;
        }
        let running = self
            .tabs
            .iter()
            .any(|(_, tab)| tab.pane.read(cx).session().has_running_children());
        if running {
            self.dialog = Some(DialogState::Confirm(CloseTarget::Quit));
            cx.notify();
            false
        } else {
            self.quit(cx);
            false
        }
    }

    // === Pane events ===

    fn on_pane_event(
        &mut self,
        pane: Entity<TerminalPane>,
        event: &PaneEvent,
        cx: &mut Context<Self>,
    ) {
        let Some(id) = self
            .tabs
            .iter()
            .find(|(_, tab)| tab.pane == pane)
            .map(|(id, _)| id)
        else {
            return;
        };

        match event {
            PaneEvent::Exited => {
                // Force the "not running" sentinel so the close path skips
                // the running-children prompt.
                if let Some(tab) = self.tabs.get(id) {
                    tab.pane.read(cx).session().mark_exited();
                }
                self.close_tab(id, cx);
            }
            PaneEvent::TitleChanged(title) => {
                if !self.config.force_tab_title {
                    if let (Some(tab), Some(title)) = (self.tabs.get_mut(id), title.clone()) {
                        tab.label = title;
                        cx.notify();
                    }
                }
            }
            PaneEvent::Bell => {
                if self.config.visible_bell && self.tabs.current_id() != Some(id) {
                    if let Some(tab) = self.tabs.get_mut(id) {
                        tab.bell = true;
                        cx.notify();
                    }
                }
            }
            PaneEvent::OpenUri(uri) => uri::open_uri(uri),
            PaneEvent::MenuRequested { position, uri } => {
                if let Some(index) = self.tabs.index_of(id) {
                    self.focus_tab(index, cx);
                }
                self.menu_uri = uri.clone();
                self.open_menu(*position, true, cx);
            }
            PaneEvent::FontSizeDelta(delta) => {
                let size = (self.config.font.size + delta).clamp(MIN_FONT_SIZE, MAX_FONT_SIZE);
                if size != self.config.font.size {
                    self.config.font.size = size;
                    self.apply_display_settings(cx);
                }
            }
        }
    }

    // === Configuration plumbing ===

    fn display_settings(&self) -> DisplaySettings {
        DisplaySettings {
            colors: TerminalColors::from_config(
                self.config.foreground,
                self.config.background,
                self.config.cursor,
            ),
            background: self.config.background,
            font_family: SharedString::from(self.config.font.family.clone()),
            font_size: self.config.font.size,
            blink_cursor: self.config.blink_mode,
            search_wrap: self.config.search_wrap,
            keys: self.config.keys.clone(),
        }
    }

    /// Push the current display settings to every open tab.
    fn apply_display_settings(&mut self, cx: &mut Context<Self>) {
        let settings = self.display_settings();
        let scrollback = self.config.buffer_lines;
        let word_chars = self.config.word_chars.clone();
        let panes: Vec<_> = self.tabs.iter().map(|(_, tab)| tab.pane.clone()).collect();
        for pane in panes {
            let settings = settings.clone();
            let word_chars = word_chars.clone();
            pane.update(cx, move |pane, cx| {
                pane.apply_settings(settings, scrollback, &word_chars, cx);
            });
        }
        cx.notify();
    }

    fn reload_config(&mut self, cx: &mut Context<Self>) {
        self.config = load_config();
        self.apply_display_settings(cx);
    }

    // === Search ===

    fn open_search_dialog(&mut self, then_search: Option<i32>, cx: &mut Context<Self>) {
        self.dialog = Some(DialogState::Search(SearchDialog {
            input: self
                .search_regex
                .as_ref()
                .map(|r| r.as_str().to_string())
                .unwrap_or_default(),
            wrap: self.config.search_wrap,
            then_search,
        }));
        cx.notify();
    }

    /// Find next/previous in the focused tab, opening the dialog first if
    /// no pattern is set yet.
    fn find_step(&mut self, direction: i32, cx: &mut Context<Self>) {
        if self.search_regex.is_none() {
            self.open_search_dialog(Some(direction), cx);
            return;
        }
        if let Some(tab) = self.tabs.current() {
            let pane = tab.pane.clone();
            pane.update(cx, |pane, cx| {
                if direction > 0 {
                    pane.search_next(cx);
                } else {
                    pane.search_prev(cx);
                }
            });
        }
    }

    /// Push the (possibly cleared) search pattern to every open tab.
    fn propagate_search(&mut self, cx: &mut Context<Self>) {
        let pattern = self.search_regex.clone();
        let panes: Vec<_> = self.tabs.iter().map(|(_, tab)| tab.pane.clone()).collect();
        for pane in panes {
            let pattern = pattern.clone();
            pane.update(cx, move |pane, cx| pane.set_search_pattern(pattern, cx));
        }
    }

    // === Menu ===

    fn open_menu(&mut self, position: Point<Pixels>, full: bool, cx: &mut Context<Self>) {
        let has_uri = full && self.menu_uri.is_some();
        self.menu = Some(MenuState {
            items: build_menu(full, has_uri, self.config.save_conf_at_exit),
            position,
            selected: None,
            focus: self.overlay_focus.clone(),
        });
        cx.notify();
    }

    fn activate_menu_item(&mut self, index: usize, window: &mut Window, cx: &mut Context<Self>) {
        if let Some(menu) = self.menu.take() {
            if let Some(item) = menu.items.get(index) {
                window.dispatch_action(item.action.boxed_clone(), cx);
            }
        }
        cx.notify();
    }

    // === Key dispatch ===

    /// Compare the pressed key against each configured binding in table
    /// order; the first match dispatches. An unmatched bare menu key opens
    /// the popup menu. Anything else stays with the focused terminal.
    fn handle_key_down(
        &mut self,
        event: &KeyDownEvent,
        window: &mut Window,
        cx: &mut Context<Self>,
    ) {
        if self.menu.is_some() {
            self.handle_menu_key(event, window, cx);
            return;
        }
        if self.dialog.is_some() {
            self.handle_dialog_key(event, cx);
            return;
        }

        let mods = &event.keystroke.modifiers;
        let binding_mods = BindingMods {
            control: mods.control,
            alt: mods.alt,
            shift: mods.shift,
            platform: mods.platform,
        };
        let key = normalize_key(&event.keystroke.key);

        if let Some(action) = self.config.keys.action_for(binding_mods, &key) {
            window.dispatch_action(action_for_binding(action), cx);
        } else if binding_mods.is_empty() && key == "menu" {
            self.menu_uri = None;
            self.open_menu(Point::new(px(60.0), px(60.0)), true, cx);
        }
    }

    fn handle_menu_key(
        &mut self,
        event: &KeyDownEvent,
        window: &mut Window,
        cx: &mut Context<Self>,
    ) {
        match event.keystroke.key.as_str() {
            "escape" => {
                self.menu = None;
                cx.notify();
            }
            "up" => {
                if let Some(menu) = self.menu.as_mut() {
                    menu.select_prev();
                    cx.notify();
                }
            }
            "down" => {
                if let Some(menu) = self.menu.as_mut() {
                    menu.select_next();
                    cx.notify();
                }
            }
            "enter" => {
                if let Some(index) = self.menu.as_ref().and_then(|m| m.selected) {
                    self.activate_menu_item(index, window, cx);
                } else {
                    self.menu = None;
                    cx.notify();
                }
            }
            _ => {}
        }
    }

    fn handle_dialog_key(&mut self, event: &KeyDownEvent, cx: &mut Context<Self>) {
        let key = event.keystroke.key.as_str();
        match key {
            "escape" => {
                // Dismissal without acceptance is a silent no-op.
                self.dialog = None;
                cx.notify();
                return;
            }
            "enter" => {
                self.accept_dialog(cx);
                return;
            }
            _ => {}
        }

        let Some(dialog) = self.dialog.as_mut() else {
            return;
        };
        match dialog {
            DialogState::Title(d) => match key {
                "backspace" => {
                    d.input.pop();
                }
                "tab" => d.allow_terminal_title = !d.allow_terminal_title,
                _ => {
                    if let Some(text) = keystroke_text(event) {
                        d.input.push_str(&text);
                    }
                }
            },
            DialogState::Search(d) => match key {
                "backspace" => {
                    d.input.pop();
                }
                "tab" => d.wrap = !d.wrap,
                _ => {
                    if let Some(text) = keystroke_text(event) {
                        d.input.push_str(&text);
                    }
                }
            },
            DialogState::Font(d) => match key {
                "up" => d.select_prev_family(),
                "down" => d.select_next_family(),
                "left" | "-" => d.adjust_size(-1.0),
                "right" | "+" | "=" => d.adjust_size(1.0),
                _ => {}
            },
            DialogState::Colors(d) => match key {
                "up" => d.prev_row(),
                "down" => d.next_row(),
                "left" => d.cycle(-1),
                "right" => d.cycle(1),
                "d" => {
                    if d.row == ColorRow::Cursor {
                        d.toggle_cursor_default();
                    }
                }
                _ => {}
            },
            DialogState::Confirm(_) => {}
        }
        cx.notify();
    }

    /// Apply an accepted dialog. Dialogs that fail their validity check
    /// stay open.
    fn accept_dialog(&mut self, cx: &mut Context<Self>) {
        let Some(dialog) = self.dialog.take() else {
            return;
        };
        match dialog {
            DialogState::Title(d) => {
                if !d.can_accept() {
                    self.dialog = Some(DialogState::Title(d));
                    return;
                }
                if let Some(tab) = self.tabs.get_mut(d.tab) {
                    tab.label = d.input.clone();
                }
                self.config.force_tab_title = !d.allow_terminal_title;
            }
            DialogState::Search(d) => {
                if !d.can_accept() {
                    self.dialog = Some(DialogState::Search(d));
                    return;
                }
                self.config.search_wrap = d.wrap;
                self.search_regex = d.compile();
                self.apply_display_settings(cx);
                self.propagate_search(cx);
                if let Some(direction) = d.then_search {
                    if self.search_regex.is_some() {
                        self.find_step(direction, cx);
                    }
                }
            }
            DialogState::Font(d) => {
                self.config.font = d.chosen();
                self.apply_display_settings(cx);
            }
            DialogState::Colors(d) => {
                let (foreground, background, cursor) = d.chosen();
                self.config.foreground = foreground;
                self.config.background = background;
                self.config.cursor = cursor;
                self.apply_display_settings(cx);
            }
            DialogState::Confirm(target) => match target {
                CloseTarget::Tab(id) => self.close_tab(id, cx),
                CloseTarget::Quit => self.quit(cx),
            },
        }
        cx.notify();
    }

    // === Action handlers ===

    fn current_tab_id(&self) -> Option<TabId> {
        self.tabs.current_id()
    }

    fn on_new_tab(&mut self, cx: &mut Context<Self>) {
        self.create_tab(None, None, cx);
    }

    fn on_close_tab(&mut self, cx: &mut Context<Self>) {
        if let Some(id) = self.current_tab_id() {
            self.request_close_tab(id, cx);
        }
    }

    fn on_copy_selection(&mut self, cx: &mut Context<Self>) {
        if let Some(tab) = self.tabs.current() {
            let pane = tab.pane.clone();
            pane.update(cx, |pane, cx| pane.copy_selection(cx));
        }
    }

    fn on_paste(&mut self, cx: &mut Context<Self>) {
        if let Some(tab) = self.tabs.current() {
            let pane = tab.pane.clone();
            pane.update(cx, |pane, cx| pane.paste_clipboard(cx));
        }
    }

    fn on_set_tab_title(&mut self, cx: &mut Context<Self>) {
        let Some(id) = self.current_tab_id() else {
            return;
        };
        let input = self
            .tabs
            .get(id)
            .map(|tab| tab.label.clone())
            .unwrap_or_default();
        self.dialog = Some(DialogState::Title(TitleDialog {
            tab: id,
            input,
            allow_terminal_title: !self.config.force_tab_title,
        }));
        cx.notify();
    }

    fn on_select_font(&mut self, cx: &mut Context<Self>) {
        self.dialog = Some(DialogState::Font(FontDialog::new(&self.config.font)));
        cx.notify();
    }

    fn on_select_colors(&mut self, cx: &mut Context<Self>) {
        self.dialog = Some(DialogState::Colors(ColorsDialog::new(
            self.config.foreground,
            self.config.background,
            self.config.cursor,
        )));
        cx.notify();
    }
}

/// Printable text for a keystroke, if it is plain typing.
fn keystroke_text(event: &KeyDownEvent) -> Option<String> {
    let key = event.keystroke.key.as_str();
    let mods = &event.keystroke.modifiers;
    if mods.control || mods.alt || mods.platform {
        return None;
    }
    if key == "space" {
        return Some(" ".to_string());
    }
    if key.chars().count() == 1 {
        if mods.shift {
            Some(key.to_uppercase())
        } else {
            Some(key.to_string())
        }
    } else {
        None
    }
}

// Chrome colors for the tab bar and overlays.
fn bar_background() -> Hsla {
    hsla(0.0, 0.0, 0.13, 1.0)
}
fn bar_border() -> Hsla {
    hsla(0.0, 0.0, 0.25, 1.0)
}
fn bar_muted() -> Hsla {
    hsla(0.0, 0.0, 0.55, 1.0)
}
fn panel_background() -> Hsla {
    hsla(0.0, 0.0, 0.16, 1.0)
}
fn panel_foreground() -> Hsla {
    hsla(0.0, 0.0, 0.88, 1.0)
}
fn accent() -> Hsla {
    hsla(0.58, 0.6, 0.55, 1.0)
}

impl Workspace {
    fn render_tab_bar(&self, cx: &mut Context<Self>) -> impl IntoElement {
        let current = self.tabs.current_index();
        let background = settings_color_to_hsla(self.config.background);
        let foreground = settings_color_to_hsla(self.config.foreground);

        let tabs: Vec<_> = self
            .tabs
            .iter()
            .enumerate()
            .map(|(index, (id, tab))| {
                let is_active = index == current;
                let label = tab.label.clone();
                let bell = tab.bell;

                div()
                    .id(ElementId::Name(format!("tab-{}", id).into()))
                    .h_full()
                    .min_w(px(tab_bar::TAB_MIN_WIDTH))
                    .max_w(px(tab_bar::TAB_MAX_WIDTH))
                    .px_3()
                    .flex()
                    .items_center()
                    .justify_between()
                    .cursor_pointer()
                    .border_r_1()
                    .border_color(bar_border())
                    .when(is_active, |d| d.bg(background).text_color(foreground))
                    .when(!is_active, |d| {
                        d.bg(bar_background())
                            .text_color(bar_muted())
                            .hover(|d| d.bg(panel_background()))
                    })
                    .on_click(cx.listener(move |this, _: &ClickEvent, _window, cx| {
                        this.focus_tab(index, cx);
                    }))
                    .on_mouse_down(
                        MouseButton::Middle,
                        cx.listener(move |this, _: &MouseDownEvent, _window, cx| {
                            this.request_close_tab(id, cx);
                        }),
                    )
                    .on_mouse_down(
                        MouseButton::Right,
                        cx.listener(move |this, event: &MouseDownEvent, _window, cx| {
                            this.focus_tab(index, cx);
                            this.menu_uri = None;
                            this.open_menu(event.position, false, cx);
                        }),
                    )
                    .child(
                        h_flex()
                            .gap_1()
                            .overflow_hidden()
                            .when(bell, |d| {
                                d.child(div().text_color(accent()).text_sm().child("•"))
                            })
                            .child(div().text_sm().whitespace_nowrap().child(label)),
                    )
                    .child(
                        div()
                            .id(ElementId::Name(format!("close-{}", id).into()))
                            .w(px(tab_bar::CLOSE_BUTTON_SIZE))
                            .h(px(tab_bar::CLOSE_BUTTON_SIZE))
                            .flex()
                            .items_center()
                            .justify_center()
                            .text_sm()
                            .text_color(bar_muted())
                            .hover(|d| d.text_color(panel_foreground()))
                            .on_click(cx.listener(move |this, _: &ClickEvent, _window, cx| {
                                this.request_close_tab(id, cx);
                            }))
                            .child("×"),
                    )
            })
            .collect();

        div()
            .h(px(tab_bar::HEIGHT))
            .w_full()
            .bg(bar_background())
            .flex()
            .children(tabs)
            .child(
                div()
                    .id("new-tab")
                    .h_full()
                    .w(px(tab_bar::HEIGHT))
                    .flex()
                    .items_center()
                    .justify_center()
                    .cursor_pointer()
                    .text_color(bar_muted())
                    .hover(|d| d.bg(panel_background()).text_color(panel_foreground()))
                    .on_click(cx.listener(|this, _: &ClickEvent, _window, cx| {
                        this.on_new_tab(cx);
                    }))
                    .child("+"),
            )
            .child(div().flex_1())
    }

    fn render_menu_overlay(&self, cx: &mut Context<Self>) -> Option<AnyElement> {
        let menu = self.menu.as_ref()?;
        let position = menu.position;
        let selected = menu.selected;

        let items: Vec<_> = menu
            .items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                let is_selected = selected == Some(index);
                v_flex()
                    .when(item.separator_before, |d| {
                        d.child(div().h(px(1.0)).w_full().bg(bar_border()).my_1())
                    })
                    .child(
                        div()
                            .id(ElementId::Name(format!("menu-item-{}", index).into()))
                            .px_3()
                            .py_1()
                            .rounded_sm()
                            .cursor_pointer()
                            .text_sm()
                            .text_color(panel_foreground())
                            .when(is_selected, |d| d.bg(accent()))
                            .when(!is_selected, |d| d.hover(|d| d.bg(bar_border())))
                            .on_click(cx.listener(move |this, _: &ClickEvent, window, cx| {
                                this.activate_menu_item(index, window, cx);
                            }))
                            .child(match item.checked {
                                Some(true) => format!("✓ {}", item.label),
                                Some(false) => format!("  {}", item.label),
                                None => item.label.to_string(),
                            }),
                    )
                    .into_any_element()
            })
            .collect();

        Some(
            div()
                .id("popup-menu")
                .absolute()
                .left(position.x)
                .top(position.y)
                .min_w(px(180.0))
                .p_1()
                .bg(panel_background())
                .border_1()
                .border_color(bar_border())
                .rounded_md()
                .track_focus(&self.overlay_focus)
                .on_mouse_down_out(cx.listener(|this, _: &MouseDownEvent, _window, cx| {
                    this.menu = None;
                    cx.notify();
                }))
                .children(items)
                .into_any_element(),
        )
    }

    fn render_dialog_overlay(&self, cx: &mut Context<Self>) -> Option<AnyElement> {
        let dialog = self.dialog.as_ref()?;

        let panel = match dialog {
            DialogState::Title(d) => self.render_title_dialog(d, cx),
            DialogState::Search(d) => self.render_search_dialog(d, cx),
            DialogState::Font(d) => self.render_font_dialog(d, cx),
            DialogState::Colors(d) => self.render_colors_dialog(d, cx),
            DialogState::Confirm(target) => self.render_confirm_dialog(*target, cx),
        };

        Some(
            div()
                .id("dialog-backdrop")
                .absolute()
                .top_0()
                .left_0()
                .size_full()
                .flex()
                .items_center()
                .justify_center()
                .bg(hsla(0.0, 0.0, 0.0, 0.4))
                .track_focus(&self.overlay_focus)
                .on_mouse_down(
                    MouseButton::Left,
                    cx.listener(|this, _: &MouseDownEvent, _window, cx| {
                        this.dialog = None;
                        cx.notify();
                    }),
                )
                .child(panel)
                .into_any_element(),
        )
    }

    fn dialog_panel(&self, title: &str, cx: &mut Context<Self>) -> Stateful<Div> {
        v_flex()
            .id("dialog-panel")
            .w(px(380.0))
            .p_4()
            .gap_3()
            .bg(panel_background())
            .border_1()
            .border_color(bar_border())
            .rounded_md()
            .text_color(panel_foreground())
            .on_mouse_down(
                MouseButton::Left,
                cx.listener(|_, _: &MouseDownEvent, _window, cx| {
                    cx.stop_propagation();
                }),
            )
            .child(div().text_sm().font_weight(FontWeight::SEMIBOLD).child(title.to_string()))
    }

    fn dialog_buttons(
        &self,
        accept_label: &'static str,
        can_accept: bool,
        cx: &mut Context<Self>,
    ) -> impl IntoElement {
        h_flex()
            .gap_2()
            .justify_end()
            .child(
                Button::new("dialog-cancel")
                    .label("Cancel")
                    .on_click(cx.listener(|this, _, _window, cx| {
                        this.dialog = None;
                        cx.notify();
                    })),
            )
            .child(
                Button::new("dialog-accept")
                    .label(accept_label)
                    .disabled(!can_accept)
                    .on_click(cx.listener(|this, _, _window, cx| {
                        this.accept_dialog(cx);
                    })),
            )
    }

    fn render_input_line(&self, value: &str) -> impl IntoElement {
        div()
            .w_full()
            .px_2()
            .py_1()
            .bg(bar_background())
            .border_1()
            .border_color(bar_border())
            .rounded_sm()
            .text_sm()
            .child(format!("{}▏", value))
    }

    fn render_checkbox_line(&self, label: &str, on: bool) -> impl IntoElement {
        div()
            .text_sm()
            .text_color(bar_muted())
            .child(format!("[{}] {} (Tab toggles)", if on { "x" } else { " " }, label))
    }

    fn render_title_dialog(&self, d: &TitleDialog, cx: &mut Context<Self>) -> AnyElement {
        self.dialog_panel("Set tab title", cx)
            .child(self.render_input_line(&d.input))
            .child(self.render_checkbox_line(
                "Allow terminal to change tab title",
                d.allow_terminal_title,
            ))
            .child(self.dialog_buttons("OK", d.can_accept(), cx))
            .into_any_element()
    }

    fn render_search_dialog(&self, d: &SearchDialog, cx: &mut Context<Self>) -> AnyElement {
        let valid = d.can_accept();
        self.dialog_panel("Find regex", cx)
            .child(self.render_input_line(&d.input))
            .when(!valid, |panel| {
                panel.child(
                    div()
                        .text_sm()
                        .text_color(hsla(0.0, 0.7, 0.6, 1.0))
                        .child("invalid pattern"),
                )
            })
            .child(self.render_checkbox_line("Wrap around", d.wrap))
            .child(self.dialog_buttons("OK", valid, cx))
            .into_any_element()
    }

    fn render_font_dialog(&self, d: &FontDialog, cx: &mut Context<Self>) -> AnyElement {
        let families: Vec<_> = d
            .families
            .iter()
            .enumerate()
            .map(|(index, family)| {
                let is_selected = index == d.family_index;
                div()
                    .id(ElementId::Name(format!("font-{}", index).into()))
                    .px_2()
                    .py_0p5()
                    .rounded_sm()
                    .cursor_pointer()
                    .text_sm()
                    .when(is_selected, |el| el.bg(accent()))
                    .when(!is_selected, |el| el.hover(|el| el.bg(bar_border())))
                    .on_click(cx.listener(move |this, _: &ClickEvent, _window, cx| {
                        if let Some(DialogState::Font(d)) = this.dialog.as_mut() {
                            d.family_index = index;
                            cx.notify();
                        }
                    }))
                    .child(family.clone())
            })
            .collect();

        self.dialog_panel("Select terminal font", cx)
            .child(
                v_flex()
                    .max_h(px(220.0))
                    .overflow_hidden()
                    .gap_0p5()
                    .children(families),
            )
            .child(
                h_flex()
                    .gap_2()
                    .items_center()
                    .child(
                        Button::new("font-smaller")
                            .label("−")
                            .on_click(cx.listener(|this, _, _window, cx| {
                                if let Some(DialogState::Font(d)) = this.dialog.as_mut() {
                                    d.adjust_size(-1.0);
                                    cx.notify();
                                }
                            })),
                    )
                    .child(div().text_sm().child(format!("{} pt", d.size)))
                    .child(
                        Button::new("font-larger")
                            .label("+")
                            .on_click(cx.listener(|this, _, _window, cx| {
                                if let Some(DialogState::Font(d)) = this.dialog.as_mut() {
                                    d.adjust_size(1.0);
                                    cx.notify();
                                }
                            })),
                    ),
            )
            .child(self.dialog_buttons("OK", true, cx))
            .into_any_element()
    }

    fn render_swatch_row(
        &self,
        d: &ColorsDialog,
        row: ColorRow,
        label: &'static str,
        selected: Option<usize>,
        cx: &mut Context<Self>,
    ) -> impl IntoElement {
        let active_row = d.row == row;
        let swatches: Vec<_> = d
            .choices
            .iter()
            .enumerate()
            .map(|(index, color)| {
                let is_selected = selected == Some(index);
                div()
                    .id(ElementId::Name(format!("swatch-{:?}-{}", row, index).into()))
                    .w(px(18.0))
                    .h(px(18.0))
                    .rounded_sm()
                    .cursor_pointer()
                    .bg(settings_color_to_hsla(*color))
                    .border_2()
                    .border_color(if is_selected {
                        accent()
                    } else {
                        bar_border()
                    })
                    .on_click(cx.listener(move |this, _: &ClickEvent, _window, cx| {
                        if let Some(DialogState::Colors(d)) = this.dialog.as_mut() {
                            d.row = row;
                            match row {
                                ColorRow::Foreground => d.foreground = index,
                                ColorRow::Background => d.background = index,
                                ColorRow::Cursor => d.cursor = Some(index),
                            }
                            cx.notify();
                        }
                    }))
            })
            .collect();

        v_flex()
            .gap_1()
            .child(
                div()
                    .text_sm()
                    .text_color(if active_row {
                        panel_foreground()
                    } else {
                        bar_muted()
                    })
                    .child(label),
            )
            .child(h_flex().gap_1().flex_wrap().children(swatches))
    }

    fn render_colors_dialog(&self, d: &ColorsDialog, cx: &mut Context<Self>) -> AnyElement {
        let cursor_default = d.cursor.is_none();
        self.dialog_panel("Select terminal colors", cx)
            .child(self.render_swatch_row(d, ColorRow::Foreground, "Foreground color", Some(d.foreground), cx))
            .child(self.render_swatch_row(d, ColorRow::Background, "Background color", Some(d.background), cx))
            .child(self.render_swatch_row(d, ColorRow::Cursor, "Cursor color", d.cursor, cx))
            .child(
                Button::new("cursor-default")
                    .label(if cursor_default {
                        "Cursor: default (foreground)"
                    } else {
                        "Use default cursor color"
                    })
                    .on_click(cx.listener(|this, _, _window, cx| {
                        if let Some(DialogState::Colors(d)) = this.dialog.as_mut() {
                            d.toggle_cursor_default();
                            cx.notify();
                        }
                    })),
            )
            .child(self.dialog_buttons("OK", true, cx))
            .into_any_element()
    }

    fn render_confirm_dialog(&self, target: CloseTarget, cx: &mut Context<Self>) -> AnyElement {
        let (message, accept) = match target {
            CloseTarget::Tab(_) => (
                "There are processes still running.\nClose anyway?",
                "Close",
            ),
            CloseTarget::Quit => ("There are processes still running.\nQuit anyway?", "Quit"),
        };
        self.dialog_panel("Confirm", cx)
            .child(div().text_sm().whitespace_normal().child(message.to_string()))
            .child(self.dialog_buttons(accept, true, cx))
            .into_any_element()
    }
}

impl Render for Workspace {
    fn render(&mut self, window: &mut Window, cx: &mut Context<Self>) -> impl IntoElement {
        // Route focus: overlays first, otherwise the current terminal.
        if self.menu.is_some() || self.dialog.is_some() {
            if !self.overlay_focus.is_focused(window) {
                window.focus(&self.overlay_focus);
            }
        } else if let Some(tab) = self.tabs.current() {
            let handle = tab.pane.read(cx).focus_handle.clone();
            if !handle.is_focused(window) {
                window.focus(&handle);
            }
        }

        let background = settings_color_to_hsla(self.config.background);
        let show_tab_bar = self.tabs.len() > 1 || self.config.show_single_tab;

        let menu_overlay = self.render_menu_overlay(cx);
        let dialog_overlay = self.render_dialog_overlay(cx);

        div()
            .id("workspace")
            .size_full()
            .flex()
            .flex_col()
            .bg(background)
            .on_key_down(cx.listener(|this, event: &KeyDownEvent, window, cx| {
                this.handle_key_down(event, window, cx);
            }))
            .on_action(cx.listener(|this, _: &NewTab, _window, cx| this.on_new_tab(cx)))
            .on_action(cx.listener(|this, _: &CloseTab, _window, cx| this.on_close_tab(cx)))
            .on_action(cx.listener(|this, _: &LeftTab, _window, cx| this.focus_relative(-1, cx)))
            .on_action(cx.listener(|this, _: &RightTab, _window, cx| this.focus_relative(1, cx)))
            .on_action(
                cx.listener(|this, _: &PreviousTab, _window, cx| this.focus_previous_tab(cx)),
            )
            .on_action(
                cx.listener(|this, _: &CopySelection, _window, cx| this.on_copy_selection(cx)),
            )
            .on_action(cx.listener(|this, _: &Paste, _window, cx| this.on_paste(cx)))
            .on_action(cx.listener(|this, _: &OpenUri, _window, cx| {
                if let Some(uri) = this.menu_uri.clone() {
                    uri::open_uri(&uri);
                }
            }))
            .on_action(cx.listener(|this, _: &CopyUri, _window, cx| {
                if let Some(uri) = this.menu_uri.clone() {
                    cx.write_to_clipboard(ClipboardItem::new_string(uri));
                }
            }))
            .on_action(cx.listener(|this, _: &SetTabTitle, _window, cx| this.on_set_tab_title(cx)))
            .on_action(cx.listener(|this, _: &SelectFont, _window, cx| this.on_select_font(cx)))
            .on_action(
                cx.listener(|this, _: &SelectColors, _window, cx| this.on_select_colors(cx)),
            )
            .on_action(cx.listener(|this, _: &Find, _window, cx| {
                this.open_search_dialog(Some(1), cx)
            }))
            .on_action(cx.listener(|this, _: &FindNext, _window, cx| this.find_step(1, cx)))
            .on_action(cx.listener(|this, _: &FindPrev, _window, cx| this.find_step(-1, cx)))
            .on_action(cx.listener(|this, _: &ReloadConfig, _window, cx| this.reload_config(cx)))
            .on_action(cx.listener(|this, _: &SaveConfigNow, _window, _cx| {
                save_config(&this.config);
            }))
            .on_action(cx.listener(|this, _: &ToggleSaveAtExit, _window, cx| {
                this.config.save_conf_at_exit = !this.config.save_conf_at_exit;
                cx.notify();
            }))
            .when(show_tab_bar, |d| d.child(self.render_tab_bar(cx)))
            .child(
                div()
                    .flex_1()
                    .w_full()
                    .overflow_hidden()
                    .children(self.tabs.current().map(|tab| tab.pane.clone())),
            )
            .children(menu_overlay)
            .children(dialog_overlay)
    }
}
