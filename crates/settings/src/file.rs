//! TOML config file support.
//!
//! Config location: `~/.config/tabterm/tabterm.toml`, two tables:
//! `[General]` for display options and `[Keys]` for key-binding overrides.
//!
//! Loading never fails: missing files, unparsable files, and invalid values
//! all fall back to documented defaults (invalid colors and accelerators are
//! logged). Saving goes through `toml_edit` so comments and unknown keys in
//! the user's file survive a rewrite.

use crate::color::Color;
use crate::constants;
use crate::keybinding::{KeyBinding, KeyBindings, BINDINGS};
use anyhow::{Context as _, Result};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use toml::value::Table;
use toml::Value;

const GENERAL: &str = "General";
const KEYS: &str = "Keys";

/// Terminal font: family name plus point size, serialized as
/// `"Family Size"` (`"JetBrains Mono 12"`). The empty string selects the
/// built-in default.
#[derive(Debug, Clone, PartialEq)]
pub struct FontSpec {
    pub family: String,
    pub size: f32,
}

impl Default for FontSpec {
    fn default() -> Self {
        Self {
            family: constants::terminal::FONT_FAMILY.to_string(),
            size: constants::terminal::DEFAULT_FONT_SIZE,
        }
    }
}

impl fmt::Display for FontSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.size.fract() == 0.0 {
            write!(f, "{} {}", self.family, self.size as i32)
        } else {
            write!(f, "{} {}", self.family, self.size)
        }
    }
}

impl FontSpec {
    /// Parse `"Family Size"`; a missing trailing size keeps the default
    /// size. Returns `None` for strings with no family part.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.is_empty() {
            return None;
        }
        if let Some((family, size)) = s.rsplit_once(' ') {
            if let Ok(size) = size.parse::<f32>() {
                if !family.trim().is_empty() && size > 0.0 {
                    return Some(Self {
                        family: family.trim().to_string(),
                        size,
                    });
                }
                return None;
            }
        }
        Some(Self {
            family: s.to_string(),
            size: constants::terminal::DEFAULT_FONT_SIZE,
        })
    }
}

/// The full set of configurable options with their documented defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Save the configuration file when quitting.
    pub save_conf_at_exit: bool,
    /// Show the tab bar even when there is only one tab.
    pub show_single_tab: bool,
    /// Terminal is not allowed to change tab titles.
    pub force_tab_title: bool,
    pub audible_bell: bool,
    /// Signal bells on unfocused windows (urgency hint).
    pub visible_bell: bool,
    /// Cursor blink on/off (the 3-state system mode is not supported).
    pub blink_mode: bool,
    /// Scrollback buffer size in lines.
    pub buffer_lines: u32,
    /// Characters treated as part of a word for selection purposes.
    pub word_chars: String,
    /// Wrap around when searching.
    pub search_wrap: bool,
    pub font: FontSpec,
    pub foreground: Color,
    pub background: Color,
    /// `None` means "default": the cursor follows the foreground color.
    pub cursor: Option<Color>,
    pub keys: KeyBindings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            save_conf_at_exit: true,
            show_single_tab: false,
            force_tab_title: false,
            audible_bell: false,
            visible_bell: false,
            blink_mode: false,
            buffer_lines: constants::scrollback::DEFAULT_LINES,
            word_chars: constants::terminal::WORD_CHARS.to_string(),
            search_wrap: true,
            font: FontSpec::default(),
            foreground: Color::DEFAULT_FOREGROUND,
            background: Color::DEFAULT_BACKGROUND,
            cursor: None,
            keys: KeyBindings::default(),
        }
    }
}

fn get_bool(table: Option<&Table>, key: &str, default: bool) -> bool {
    match table.and_then(|t| t.get(key)) {
        Some(Value::Boolean(b)) => *b,
        _ => default,
    }
}

/// Positive integer with silent fallback: non-integers and values `<= 0`
/// yield the default.
fn get_lines(table: Option<&Table>, key: &str, default: u32) -> u32 {
    match table.and_then(|t| t.get(key)) {
        Some(Value::Integer(n)) if *n > 0 => u32::try_from(*n).unwrap_or(default),
        _ => default,
    }
}

fn get_string<'a>(table: Option<&'a Table>, key: &str) -> Option<&'a str> {
    match table.and_then(|t| t.get(key)) {
        Some(Value::String(s)) => Some(s.as_str()),
        _ => None,
    }
}

/// Color with warn-and-keep-default fallback. Absent and empty both mean
/// "not set" and return `None` without a warning.
fn get_color(table: Option<&Table>, key: &str) -> Option<Color> {
    let s = get_string(table, key)?;
    if s.is_empty() {
        return None;
    }
    match Color::from_str(s) {
        Ok(color) => Some(color),
        Err(_) => {
            tracing::warn!("invalid color string for {}: {}", key, s);
            None
        }
    }
}

/// Load the configuration from `path`, substituting defaults for anything
/// missing or invalid. Never fails.
pub fn load_config_from(path: &Path) -> Config {
    let mut config = Config::default();

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!("failed to read config: {}", e);
            }
            return config;
        }
    };

    // Size guard
    if content.len() as u64 > constants::settings::MAX_FILE_SIZE {
        tracing::warn!(
            "config file too large ({} bytes), using defaults",
            content.len()
        );
        return config;
    }

    let root: Table = match content.parse::<Table>() {
        Ok(t) => t,
        Err(e) => {
            tracing::warn!("failed to parse {:?}: {}", path, e);
            return config;
        }
    };

    let general = root.get(GENERAL).and_then(Value::as_table);

    config.save_conf_at_exit = get_bool(general, "SaveConfAtExit", config.save_conf_at_exit);
    config.show_single_tab = get_bool(general, "ShowSingleTab", config.show_single_tab);
    config.force_tab_title = get_bool(general, "ForceTabTitle", config.force_tab_title);
    config.audible_bell = get_bool(general, "AudibleBell", config.audible_bell);
    config.visible_bell = get_bool(general, "VisibleBell", config.visible_bell);
    config.blink_mode = get_bool(general, "BlinkMode", config.blink_mode);
    config.buffer_lines = get_lines(general, "BufferLines", config.buffer_lines);
    config.search_wrap = get_bool(general, "SearchWrap", config.search_wrap);

    if let Some(s) = get_string(general, "WordChars") {
        config.word_chars = s.to_string();
    }

    if let Some(s) = get_string(general, "Font") {
        if !s.is_empty() {
            match FontSpec::parse(s) {
                Some(font) => config.font = font,
                None => tracing::warn!("invalid value for Font: {}", s),
            }
        }
    }

    if let Some(color) = get_color(general, "ForegroundColor") {
        config.foreground = color;
    }
    if let Some(color) = get_color(general, "BackgroundColor") {
        config.background = color;
    }
    // Absent or empty cursor color means "follow foreground".
    config.cursor = get_color(general, "CursorColor");

    let keys = root.get(KEYS).and_then(Value::as_table);
    for spec in BINDINGS {
        match get_string(keys, spec.conf_key) {
            // Not set at all: keep the compiled-in default (written out on save).
            None => {}
            // Empty value: binding disabled.
            Some("") => config.keys.set(spec.action, KeyBinding::disabled()),
            Some(s) => match KeyBinding::parse(s) {
                Ok(binding) => config.keys.set(spec.action, binding),
                Err(_) => {
                    tracing::warn!("invalid key binding for {}: {}", spec.conf_key, s);
                    config.keys.set(spec.action, KeyBinding::disabled());
                }
            },
        }
    }

    config
}

/// Load from the default location.
pub fn load_config() -> Config {
    load_config_from(&tabterm_paths::config_file())
}

/// Persist `config` to `path`, creating parent directories as needed.
/// Comments and unknown keys already in the file are preserved.
pub fn save_config_to(config: &Config, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create configuration directory {:?}", parent))?;
    }

    // Re-edit the existing document when it parses; otherwise start fresh.
    let existing = std::fs::read_to_string(path).unwrap_or_default();
    let mut doc = existing
        .parse::<toml_edit::DocumentMut>()
        .unwrap_or_default();

    use toml_edit::value;
    doc[GENERAL]["SaveConfAtExit"] = value(config.save_conf_at_exit);
    doc[GENERAL]["ShowSingleTab"] = value(config.show_single_tab);
    doc[GENERAL]["ForceTabTitle"] = value(config.force_tab_title);
    doc[GENERAL]["AudibleBell"] = value(config.audible_bell);
    doc[GENERAL]["VisibleBell"] = value(config.visible_bell);
    doc[GENERAL]["BlinkMode"] = value(config.blink_mode);
    doc[GENERAL]["BufferLines"] = value(config.buffer_lines as i64);
    doc[GENERAL]["WordChars"] = value(&config.word_chars);
    doc[GENERAL]["SearchWrap"] = value(config.search_wrap);
    doc[GENERAL]["Font"] = value(config.font.to_string());
    doc[GENERAL]["ForegroundColor"] = value(config.foreground.to_hex());
    doc[GENERAL]["BackgroundColor"] = value(config.background.to_hex());
    doc[GENERAL]["CursorColor"] = value(
        config
            .cursor
            .map(Color::to_hex)
            .unwrap_or_default(),
    );

    for (spec, binding) in config.keys.iter() {
        doc[KEYS][spec.conf_key] = value(binding.accel_name());
    }

    std::fs::write(path, doc.to_string())
        .with_context(|| format!("failed to save configuration to {:?}", path))?;
    Ok(())
}

/// Persist to the default location; failures are logged, not returned
/// (a failed save leaves prior state unchanged).
pub fn save_config(config: &Config) {
    if let Err(e) = save_config_to(config, &tabterm_paths::config_file()) {
        tracing::error!("{:#}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keybinding::BindingAction;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn load_str(s: &str) -> Config {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tabterm.toml");
        std::fs::write(&path, s).unwrap();
        load_config_from(&path)
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("absent.toml"));
        assert_eq!(config, Config::default());
    }

    #[test]
    fn empty_file_yields_defaults() {
        assert_eq!(load_str(""), Config::default());
    }

    #[test]
    fn default_config_has_documented_values() {
        let config = Config::default();
        assert!(config.save_conf_at_exit);
        assert!(!config.show_single_tab);
        assert!(!config.audible_bell);
        assert_eq!(config.buffer_lines, 100);
        assert_eq!(config.word_chars, "-a-zA-Z0-9_./@~");
        assert!(config.search_wrap);
        assert_eq!(config.foreground, Color::rgb(0xc0, 0xc0, 0xc0));
        assert_eq!(config.background, Color::rgb(0, 0, 0));
        assert!(config.cursor.is_none());
    }

    #[test]
    fn syntax_error_yields_defaults() {
        assert_eq!(load_str("[General\nBufferLines = 5"), Config::default());
    }

    #[test]
    fn parses_general_options() {
        let config = load_str(
            r#"
[General]
ShowSingleTab = true
AudibleBell = true
BufferLines = 5000
WordChars = "a-z"
Font = "JetBrains Mono 12"
"#,
        );
        assert!(config.show_single_tab);
        assert!(config.audible_bell);
        assert_eq!(config.buffer_lines, 5000);
        assert_eq!(config.word_chars, "a-z");
        assert_eq!(config.font.family, "JetBrains Mono");
        assert_eq!(config.font.size, 12.0);
    }

    #[test_case("BufferLines = 0" ; "zero")]
    #[test_case("BufferLines = -3" ; "negative")]
    #[test_case("BufferLines = \"many\"" ; "wrong type")]
    fn invalid_buffer_lines_fall_back_to_100(line: &str) {
        let config = load_str(&format!("[General]\n{}\n", line));
        assert_eq!(config.buffer_lines, 100);
    }

    #[test]
    fn invalid_bool_falls_back_silently() {
        let config = load_str("[General]\nAudibleBell = \"yes\"\n");
        assert!(!config.audible_bell);
    }

    #[test]
    fn parses_colors() {
        let config = load_str(
            r##"
[General]
ForegroundColor = "#aabbcc"
BackgroundColor = "#102030"
CursorColor = "#ff0000"
"##,
        );
        assert_eq!(config.foreground, Color::rgb(0xaa, 0xbb, 0xcc));
        assert_eq!(config.background, Color::rgb(0x10, 0x20, 0x30));
        assert_eq!(config.cursor, Some(Color::rgb(0xff, 0, 0)));
    }

    #[test]
    fn invalid_color_keeps_default() {
        let config = load_str("[General]\nForegroundColor = \"#zzz\"\n");
        assert_eq!(config.foreground, Color::DEFAULT_FOREGROUND);
    }

    #[test]
    fn empty_cursor_color_means_default() {
        let config = load_str("[General]\nCursorColor = \"\"\n");
        assert!(config.cursor.is_none());
    }

    #[test]
    fn empty_binding_is_disabled() {
        let config = load_str("[Keys]\nCopy = \"\"\n");
        assert!(config.keys.get(BindingAction::Copy).is_disabled());
        // Other bindings keep their defaults.
        assert!(!config.keys.get(BindingAction::Paste).is_disabled());
    }

    #[test]
    fn invalid_binding_is_disabled() {
        let config = load_str("[Keys]\nNewTab = \"hyper-q\"\n");
        assert!(config.keys.get(BindingAction::NewTab).is_disabled());
    }

    #[test]
    fn binding_override_is_applied() {
        let config = load_str("[Keys]\nNewTab = \"ctrl-n\"\n");
        let kb = config.keys.get(BindingAction::NewTab);
        assert!(kb.mods.control && !kb.mods.shift);
        assert_eq!(kb.key, "n");
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tabterm.toml");

        let mut config = Config::default();
        config.show_single_tab = true;
        config.buffer_lines = 4242;
        config.foreground = Color::rgb(1, 2, 3);
        config.cursor = Some(Color::rgb(9, 9, 9));
        config
            .keys
            .set(BindingAction::Find, KeyBinding::disabled());

        save_config_to(&config, &path).unwrap();
        let loaded = load_config_from(&path);
        assert_eq!(loaded, config);
    }

    #[test]
    fn save_writes_defaults_for_unset_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tabterm.toml");

        save_config_to(&Config::default(), &path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("NewTab = \"ctrl-shift-t\""));
        assert!(written.contains("BufferLines = 100"));
        // Default cursor color is the empty string.
        assert!(written.contains("CursorColor = \"\""));
    }

    #[test]
    fn save_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("t.toml");
        save_config_to(&Config::default(), &path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn save_preserves_comments_and_unknown_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tabterm.toml");
        std::fs::write(
            &path,
            "# my terminal settings\n[General]\nAudibleBell = true\nFutureOption = 7\n",
        )
        .unwrap();

        let mut config = load_config_from(&path);
        config.show_single_tab = true;
        save_config_to(&config, &path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("# my terminal settings"));
        assert!(written.contains("FutureOption = 7"));
        assert!(written.contains("AudibleBell = true"));
        assert!(written.contains("ShowSingleTab = true"));
    }

    #[test]
    fn font_spec_parses_and_formats() {
        let font = FontSpec::parse("Fira Code 11").unwrap();
        assert_eq!(font.family, "Fira Code");
        assert_eq!(font.size, 11.0);
        assert_eq!(font.to_string(), "Fira Code 11");

        let bare = FontSpec::parse("Monaco").unwrap();
        assert_eq!(bare.family, "Monaco");
        assert_eq!(bare.size, constants::terminal::DEFAULT_FONT_SIZE);

        assert!(FontSpec::parse("").is_none());
        assert!(FontSpec::parse("Mono 0").is_none());
    }
}
