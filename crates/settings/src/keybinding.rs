//! Accelerator key bindings.
//!
//! A binding pairs a modifier set with a key name, serialized in keystroke
//! syntax (`ctrl-shift-t`, `ctrl-pageup`). An empty configured value
//! disables the binding; a disabled binding never matches anything.

use std::fmt;

/// Keyboard modifier set.
///
/// Mirrors the toolkit's normalized modifier mask so this crate stays free
/// of GUI dependencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub control: bool,
    pub alt: bool,
    pub shift: bool,
    pub platform: bool,
}

impl Modifiers {
    pub fn is_empty(self) -> bool {
        !(self.control || self.alt || self.shift || self.platform)
    }
}

/// A configurable keyboard shortcut: modifier set plus key name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBinding {
    pub mods: Modifiers,
    /// Normalized key name (single letters are lowercase). Empty when the
    /// binding is disabled.
    pub key: String,
}

/// Error returned when an accelerator string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseAccelError(String);

impl fmt::Display for ParseAccelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid accelerator: {:?}", self.0)
    }
}

impl std::error::Error for ParseAccelError {}

impl KeyBinding {
    /// A binding that matches nothing (the empty-value state).
    pub fn disabled() -> Self {
        Self {
            mods: Modifiers::default(),
            key: String::new(),
        }
    }

    pub fn is_disabled(&self) -> bool {
        self.mods.is_empty() && self.key.is_empty()
    }

    /// Parse keystroke syntax: dash-separated modifiers followed by a key
    /// (`ctrl-shift-t`). A trailing dash names the `-` key itself
    /// (`ctrl--`). Single letters are case-folded.
    pub fn parse(s: &str) -> Result<Self, ParseAccelError> {
        if s.is_empty() {
            return Err(ParseAccelError(s.to_string()));
        }

        let mut mods = Modifiers::default();

        // The dash key itself: "-" bare, or a "--" tail after modifiers.
        let (mod_body, key) = if s == "-" {
            ("", "-".to_string())
        } else if let Some(rest) = s.strip_suffix("--") {
            (rest, "-".to_string())
        } else {
            match s.rsplit_once('-') {
                Some((body, key)) => (body, normalize_key(key)),
                None => ("", normalize_key(s)),
            }
        };

        if key.is_empty() {
            return Err(ParseAccelError(s.to_string()));
        }
        for part in mod_body.split('-').filter(|p| !p.is_empty()) {
            match part {
                "ctrl" | "control" => mods.control = true,
                "alt" | "opt" => mods.alt = true,
                "shift" => mods.shift = true,
                "cmd" | "super" | "win" => mods.platform = true,
                _ => return Err(ParseAccelError(s.to_string())),
            }
        }

        Ok(Self { mods, key })
    }

    /// Serialize back to keystroke syntax. Disabled bindings serialize as
    /// the empty string.
    pub fn accel_name(&self) -> String {
        if self.is_disabled() {
            return String::new();
        }
        let mut out = String::new();
        if self.mods.control {
            out.push_str("ctrl-");
        }
        if self.mods.alt {
            out.push_str("alt-");
        }
        if self.mods.shift {
            out.push_str("shift-");
        }
        if self.mods.platform {
            out.push_str("cmd-");
        }
        out.push_str(&self.key);
        out
    }

    /// Whether a pressed (modifiers, key) pair triggers this binding.
    /// The key is expected pre-normalized (see [`normalize_key`]).
    pub fn matches(&self, mods: Modifiers, key: &str) -> bool {
        !self.is_disabled() && self.mods == mods && self.key == key
    }
}

/// Normalize a key name for comparison: single letters fold to lowercase,
/// everything else (named keys like `pageup`) is taken verbatim.
pub fn normalize_key(key: &str) -> String {
    let mut chars = key.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_uppercase() => c.to_ascii_lowercase().to_string(),
        _ => key.to_string(),
    }
}

/// Identifier for each configurable action.
///
/// The discriminant is the action's index in [`BINDINGS`]; the two must
/// stay in the same order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingAction {
    NewTab,
    LeftTab,
    RightTab,
    PreviousTab,
    Copy,
    Paste,
    Find,
    FindNext,
    FindPrev,
}

/// One row of the key-binding table: action, config key, default accelerator.
pub struct BindingSpec {
    pub action: BindingAction,
    pub conf_key: &'static str,
    pub default: &'static str,
}

/// The full key-binding table. Declaration order is dispatch order: the
/// first matching entry wins.
pub const BINDINGS: &[BindingSpec] = &[
    BindingSpec {
        action: BindingAction::NewTab,
        conf_key: "NewTab",
        default: "ctrl-shift-t",
    },
    BindingSpec {
        action: BindingAction::LeftTab,
        conf_key: "LeftTab",
        default: "ctrl-pageup",
    },
    BindingSpec {
        action: BindingAction::RightTab,
        conf_key: "RightTab",
        default: "ctrl-pagedown",
    },
    BindingSpec {
        action: BindingAction::PreviousTab,
        conf_key: "PreviousTab",
        default: "ctrl-tab",
    },
    BindingSpec {
        action: BindingAction::Copy,
        conf_key: "Copy",
        default: "ctrl-shift-c",
    },
    BindingSpec {
        action: BindingAction::Paste,
        conf_key: "Paste",
        default: "ctrl-shift-v",
    },
    BindingSpec {
        action: BindingAction::Find,
        conf_key: "Find",
        default: "ctrl-shift-f",
    },
    BindingSpec {
        action: BindingAction::FindNext,
        conf_key: "FindNext",
        default: "ctrl-shift-n",
    },
    BindingSpec {
        action: BindingAction::FindPrev,
        conf_key: "FindPrev",
        default: "ctrl-shift-p",
    },
];

/// The loaded binding set, indexed by [`BindingAction`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBindings {
    entries: Vec<KeyBinding>,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            entries: BINDINGS
                .iter()
                .map(|spec| {
                    KeyBinding::parse(spec.default).unwrap_or_else(|_| KeyBinding::disabled())
                })
                .collect(),
        }
    }
}

impl KeyBindings {
    pub fn get(&self, action: BindingAction) -> &KeyBinding {
        &self.entries[action as usize]
    }

    pub fn set(&mut self, action: BindingAction, binding: KeyBinding) {
        self.entries[action as usize] = binding;
    }

    /// Iterate table rows with their loaded bindings, in dispatch order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static BindingSpec, &KeyBinding)> {
        BINDINGS.iter().zip(self.entries.iter())
    }

    /// First action bound to the pressed (modifiers, key) pair, if any.
    pub fn action_for(&self, mods: Modifiers, key: &str) -> Option<BindingAction> {
        self.iter()
            .find(|(_, binding)| binding.matches(mods, key))
            .map(|(spec, _)| spec.action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    const CTRL_SHIFT: Modifiers = Modifiers {
        control: true,
        alt: false,
        shift: true,
        platform: false,
    };

    #[test]
    fn table_order_matches_action_discriminants() {
        for (index, spec) in BINDINGS.iter().enumerate() {
            assert_eq!(spec.action as usize, index, "table row {}", spec.conf_key);
        }
    }

    #[test]
    fn parses_modifier_chord() {
        let kb = KeyBinding::parse("ctrl-shift-t").unwrap();
        assert_eq!(kb.mods, CTRL_SHIFT);
        assert_eq!(kb.key, "t");
    }

    #[test]
    fn parses_named_key() {
        let kb = KeyBinding::parse("ctrl-pageup").unwrap();
        assert!(kb.mods.control && !kb.mods.shift);
        assert_eq!(kb.key, "pageup");
    }

    #[test]
    fn parses_bare_key() {
        let kb = KeyBinding::parse("f11").unwrap();
        assert!(kb.mods.is_empty());
        assert_eq!(kb.key, "f11");
    }

    #[test]
    fn parses_dash_key() {
        let kb = KeyBinding::parse("ctrl--").unwrap();
        assert!(kb.mods.control);
        assert_eq!(kb.key, "-");
    }

    #[test]
    fn folds_letter_case() {
        let kb = KeyBinding::parse("ctrl-shift-T").unwrap();
        assert_eq!(kb.key, "t");
    }

    #[test_case("" ; "empty string")]
    #[test_case("bogus-t" ; "unknown modifier")]
    #[test_case("ctrl-" ; "modifier only with dash only")]
    fn rejects_invalid(s: &str) {
        assert!(KeyBinding::parse(s).is_err());
    }

    #[test]
    fn accel_name_round_trips_defaults() {
        for spec in BINDINGS {
            let kb = KeyBinding::parse(spec.default).unwrap();
            assert_eq!(kb.accel_name(), spec.default, "{}", spec.conf_key);
            assert_eq!(KeyBinding::parse(&kb.accel_name()).unwrap(), kb);
        }
    }

    #[test]
    fn disabled_binding_never_matches() {
        let kb = KeyBinding::disabled();
        assert!(kb.is_disabled());
        assert!(!kb.matches(Modifiers::default(), ""));
        assert!(!kb.matches(CTRL_SHIFT, "t"));
        assert_eq!(kb.accel_name(), "");
    }

    #[test]
    fn matches_requires_exact_modifiers() {
        let kb = KeyBinding::parse("ctrl-shift-t").unwrap();
        assert!(kb.matches(CTRL_SHIFT, "t"));
        let ctrl_only = Modifiers {
            control: true,
            ..Modifiers::default()
        };
        assert!(!kb.matches(ctrl_only, "t"));
        assert!(!kb.matches(CTRL_SHIFT, "u"));
    }

    #[test]
    fn action_for_honors_declaration_order() {
        let mut keys = KeyBindings::default();
        // Bind two actions to the same chord; the earlier row must win.
        keys.set(
            BindingAction::Paste,
            KeyBinding::parse("ctrl-shift-c").unwrap(),
        );
        assert_eq!(
            keys.action_for(CTRL_SHIFT, "c"),
            Some(BindingAction::Copy)
        );
    }

    #[test]
    fn action_for_misses_unbound_chord() {
        let keys = KeyBindings::default();
        let mods = Modifiers {
            alt: true,
            ..Modifiers::default()
        };
        assert_eq!(keys.action_for(mods, "z"), None);
    }

    #[test]
    fn defaults_cover_every_action() {
        let keys = KeyBindings::default();
        for (spec, binding) in keys.iter() {
            assert!(
                !binding.is_disabled(),
                "default for {} should be enabled",
                spec.conf_key
            );
        }
    }
}
