use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Separator between tokens in the shortcut wire format.
pub const SEPARATOR: char = '+';

/// Errors produced while building or parsing a shortcut.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShortcutError {
    #[error("a shortcut needs a non-modifier key")]
    NoBaseKey,

    #[error("shortcut is empty")]
    Empty,

    #[error("shortcut has more than one non-modifier key: {0}")]
    MultipleBaseKeys(String),

    #[error("modifier {0} must come before the key")]
    ModifierAfterKey(String),
}

/// Keyboard modifier.
///
/// The declaration order is the canonical rendering order, so `Ord` on this
/// type sorts modifiers the way the host expects them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Modifier {
    Control,
    Shift,
    Alt,
    Command,
}

impl Modifier {
    /// Wire token for this modifier.
    pub fn as_str(self) -> &'static str {
        match self {
            Modifier::Control => "Control",
            Modifier::Shift => "Shift",
            Modifier::Alt => "Alt",
            Modifier::Command => "Command",
        }
    }

    /// Map a physical key code (`ControlLeft`, `MetaRight`, ...) to a modifier.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "Control" | "ControlLeft" | "ControlRight" => Some(Modifier::Control),
            "Shift" | "ShiftLeft" | "ShiftRight" => Some(Modifier::Shift),
            "Alt" | "AltLeft" | "AltRight" | "AltGraph" => Some(Modifier::Alt),
            "Meta" | "MetaLeft" | "MetaRight" | "OSLeft" | "OSRight" | "Command" => {
                Some(Modifier::Command)
            }
            _ => None,
        }
    }

    /// Parse a modifier token from a stored shortcut string.
    ///
    /// Accepts the canonical tokens plus the common aliases users type by hand.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "control" | "ctrl" => Some(Modifier::Control),
            "shift" => Some(Modifier::Shift),
            "alt" | "option" => Some(Modifier::Alt),
            "command" | "cmd" | "super" | "meta" => Some(Modifier::Command),
            _ => None,
        }
    }
}

impl fmt::Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Render a physical key code as a shortcut token.
///
/// Letters and digits lose their `Key`/`Digit` prefix, a fixed set of named and
/// punctuation keys map to literal tokens, and everything else passes through
/// unchanged.
pub fn format_key(code: &str) -> String {
    if let Some(letter) = code.strip_prefix("Key") {
        if letter.len() == 1 && letter.chars().all(|c| c.is_ascii_alphabetic()) {
            return letter.to_ascii_uppercase();
        }
    }
    if let Some(digit) = code.strip_prefix("Digit") {
        if digit.len() == 1 && digit.chars().all(|c| c.is_ascii_digit()) {
            return digit.to_string();
        }
    }

    let token = match code {
        "Space" => "Space",
        "Enter" => "Enter",
        "Tab" => "Tab",
        "Backspace" => "Backspace",
        "Escape" => "Escape",
        "Delete" => "Delete",
        "ArrowUp" => "Up",
        "ArrowDown" => "Down",
        "ArrowLeft" => "Left",
        "ArrowRight" => "Right",
        "Backquote" => "`",
        "Minus" => "-",
        "Equal" => "=",
        "BracketLeft" => "[",
        "BracketRight" => "]",
        "Backslash" => "\\",
        "Semicolon" => ";",
        "Quote" => "'",
        "Comma" => ",",
        "Period" => ".",
        "Slash" => "/",
        other => other,
    };
    token.to_string()
}

/// A chorded keyboard shortcut: modifiers plus exactly one base key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShortcutSpec {
    modifiers: BTreeSet<Modifier>,
    key: String,
}

impl ShortcutSpec {
    /// Build a shortcut from modifiers and an already formatted key token.
    pub fn new(
        modifiers: impl IntoIterator<Item = Modifier>,
        key: impl Into<String>,
    ) -> Result<Self, ShortcutError> {
        let key = key.into();
        if key.is_empty() {
            return Err(ShortcutError::NoBaseKey);
        }
        Ok(Self {
            modifiers: modifiers.into_iter().collect(),
            key,
        })
    }

    /// Modifiers in canonical order.
    pub fn modifiers(&self) -> impl Iterator<Item = Modifier> + '_ {
        self.modifiers.iter().copied()
    }

    /// The base key token.
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl fmt::Display for ShortcutSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for modifier in &self.modifiers {
            write!(f, "{}{}", modifier, SEPARATOR)?;
        }
        f.write_str(&self.key)
    }
}

impl FromStr for ShortcutSpec {
    type Err = ShortcutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ShortcutError::Empty);
        }

        // A trailing separator means the key itself is "+", e.g. "Shift++".
        let (head, plus_key) = match s.strip_suffix("++") {
            Some(head) => (head, true),
            None => (s, false),
        };

        let mut modifiers = BTreeSet::new();
        let mut base: Option<String> = None;
        for token in head.split(SEPARATOR).map(str::trim).filter(|t| !t.is_empty()) {
            if let Some(modifier) = Modifier::parse(token) {
                if base.is_some() {
                    return Err(ShortcutError::ModifierAfterKey(token.to_string()));
                }
                modifiers.insert(modifier);
            } else if base.is_some() {
                return Err(ShortcutError::MultipleBaseKeys(s.to_string()));
            } else {
                base = Some(token.to_string());
            }
        }

        let key = match (base, plus_key) {
            (Some(_), true) => return Err(ShortcutError::MultipleBaseKeys(s.to_string())),
            (Some(key), false) => key,
            (None, true) => "+".to_string(),
            (None, false) => return Err(ShortcutError::NoBaseKey),
        };
        Ok(Self { modifiers, key })
    }
}

/// Named shortcut slot in the settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShortcutSlot {
    /// Tap to toggle, hold to push-to-talk.
    Smart,
    /// Push-to-talk.
    Hold,
    /// Press to start, press again to stop.
    Toggle,
}

impl ShortcutSlot {
    pub const ALL: [ShortcutSlot; 3] = [ShortcutSlot::Smart, ShortcutSlot::Hold, ShortcutSlot::Toggle];

    pub fn as_str(self) -> &'static str {
        match self {
            ShortcutSlot::Smart => "smart",
            ShortcutSlot::Hold => "hold",
            ShortcutSlot::Toggle => "toggle",
        }
    }
}

impl fmt::Display for ShortcutSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_key_letters_and_digits() {
        assert_eq!(format_key("KeyJ"), "J");
        assert_eq!(format_key("Digit7"), "7");
    }

    #[test]
    fn test_format_key_named_and_punctuation() {
        assert_eq!(format_key("Space"), "Space");
        assert_eq!(format_key("ArrowLeft"), "Left");
        assert_eq!(format_key("Backquote"), "`");
        assert_eq!(format_key("Backslash"), "\\");
        assert_eq!(format_key("Quote"), "'");
        assert_eq!(format_key("Slash"), "/");
    }

    #[test]
    fn test_format_key_passthrough() {
        assert_eq!(format_key("F5"), "F5");
        assert_eq!(format_key("Numpad3"), "Numpad3");
        assert_eq!(format_key("KeyboardLayout"), "KeyboardLayout");
    }

    #[test]
    fn test_display_uses_canonical_order() {
        let spec = ShortcutSpec::new(
            [Modifier::Command, Modifier::Alt, Modifier::Control, Modifier::Shift],
            "K",
        )
        .unwrap();
        assert_eq!(spec.to_string(), "Control+Shift+Alt+Command+K");
    }

    #[test]
    fn test_empty_key_rejected() {
        assert_eq!(
            ShortcutSpec::new([Modifier::Control], ""),
            Err(ShortcutError::NoBaseKey)
        );
    }

    #[test]
    fn test_parse_normalizes_aliases() {
        let spec: ShortcutSpec = "cmd+ctrl+Space".parse().unwrap();
        assert_eq!(spec.to_string(), "Control+Command+Space");
        assert_eq!(spec.key(), "Space");
    }

    #[test]
    fn test_parse_plus_key() {
        let spec: ShortcutSpec = "Shift++".parse().unwrap();
        assert_eq!(spec.key(), "+");
        assert_eq!(spec.modifiers().collect::<Vec<_>>(), vec![Modifier::Shift]);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!("".parse::<ShortcutSpec>(), Err(ShortcutError::Empty));
        assert_eq!(
            "Control+Shift".parse::<ShortcutSpec>(),
            Err(ShortcutError::NoBaseKey)
        );
        assert!(matches!(
            "J+K".parse::<ShortcutSpec>(),
            Err(ShortcutError::MultipleBaseKeys(_))
        ));
        assert!(matches!(
            "J+Shift".parse::<ShortcutSpec>(),
            Err(ShortcutError::ModifierAfterKey(_))
        ));
    }

    #[test]
    fn test_modifier_from_code() {
        assert_eq!(Modifier::from_code("ControlRight"), Some(Modifier::Control));
        assert_eq!(Modifier::from_code("MetaLeft"), Some(Modifier::Command));
        assert_eq!(Modifier::from_code("KeyA"), None);
    }
}
