//! Physical keys, modifier sets and key events.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::HotkeyError;

/// Physical key identifier (`ArrowRight`, `Space`, `KeyF`, ...).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Key(String);

impl Key {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Keys that always mean "navigate back", whatever the table says.
    pub fn is_back(&self) -> bool {
        matches!(self.0.as_str(), "Escape" | "BrowserBack" | "GoBack")
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Key::new(value)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modifier {
    Alt,
    Control,
    Shift,
    Meta,
    CapsLock,
    Fn,
}

impl Modifier {
    pub const ALL: [Modifier; 6] = [
        Modifier::Alt,
        Modifier::Control,
        Modifier::Shift,
        Modifier::Meta,
        Modifier::CapsLock,
        Modifier::Fn,
    ];

    const fn bit(self) -> u8 {
        match self {
            Modifier::Alt => 1 << 0,
            Modifier::Control => 1 << 1,
            Modifier::Shift => 1 << 2,
            Modifier::Meta => 1 << 3,
            Modifier::CapsLock => 1 << 4,
            Modifier::Fn => 1 << 5,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Modifier::Alt => "alt",
            Modifier::Control => "control",
            Modifier::Shift => "shift",
            Modifier::Meta => "meta",
            Modifier::CapsLock => "caps_lock",
            Modifier::Fn => "fn",
        }
    }
}

impl FromStr for Modifier {
    type Err = HotkeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "alt" | "option" => Ok(Modifier::Alt),
            "control" | "ctrl" => Ok(Modifier::Control),
            "shift" => Ok(Modifier::Shift),
            "meta" | "cmd" | "super" => Ok(Modifier::Meta),
            "caps_lock" | "capslock" => Ok(Modifier::CapsLock),
            "fn" => Ok(Modifier::Fn),
            other => Err(HotkeyError::UnknownModifier(other.to_string())),
        }
    }
}

/// Unordered set of modifiers. Two sets are equal only when they hold
/// exactly the same flags.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<Modifier>", into = "Vec<Modifier>")]
pub struct Modifiers(u8);

impl Modifiers {
    pub const NONE: Modifiers = Modifiers(0);
    pub const SHIFT: Modifiers = Modifiers(Modifier::Shift.bit());
    pub const CONTROL: Modifiers = Modifiers(Modifier::Control.bit());
    pub const ALT: Modifiers = Modifiers(Modifier::Alt.bit());
    pub const META: Modifiers = Modifiers(Modifier::Meta.bit());

    /// Modifiers whose live state a key event reports.
    pub const LIVE: Modifiers = Modifiers(
        Modifier::Shift.bit() | Modifier::Control.bit() | Modifier::Alt.bit() | Modifier::Meta.bit(),
    );

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn contains(&self, modifier: Modifier) -> bool {
        self.0 & modifier.bit() != 0
    }

    pub fn insert(&mut self, modifier: Modifier) {
        self.0 |= modifier.bit();
    }

    pub fn remove(&mut self, modifier: Modifier) {
        self.0 &= !modifier.bit();
    }

    pub fn with(mut self, modifier: Modifier) -> Self {
        self.insert(modifier);
        self
    }

    pub fn intersection(self, other: Modifiers) -> Modifiers {
        Modifiers(self.0 & other.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = Modifier> + '_ {
        Modifier::ALL.into_iter().filter(|m| self.contains(*m))
    }
}

impl FromIterator<Modifier> for Modifiers {
    fn from_iter<I: IntoIterator<Item = Modifier>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Modifiers::NONE, |set, modifier| set.with(modifier))
    }
}

impl From<Vec<Modifier>> for Modifiers {
    fn from(value: Vec<Modifier>) -> Self {
        value.into_iter().collect()
    }
}

impl From<Modifiers> for Vec<Modifier> {
    fn from(value: Modifiers) -> Self {
        value.iter().collect()
    }
}

impl fmt::Debug for Modifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HotKeyScope {
    System,
    #[default]
    InApp,
}

/// A key plus the exact set of modifiers that must be held.
///
/// Scope is carried along for the host but takes no part in equality.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HotKey {
    pub key: Key,
    #[serde(default)]
    pub modifiers: Modifiers,
    #[serde(default)]
    pub scope: HotKeyScope,
}

impl HotKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: Key::new(key),
            modifiers: Modifiers::NONE,
            scope: HotKeyScope::InApp,
        }
    }

    pub fn with_modifier(mut self, modifier: Modifier) -> Self {
        self.modifiers.insert(modifier);
        self
    }

    pub fn with_scope(mut self, scope: HotKeyScope) -> Self {
        self.scope = scope;
        self
    }

    /// Exact match: same key, same modifier set, no superset or subset.
    pub fn matches(&self, event: &KeyEvent) -> bool {
        event.kind == KeyEventKind::Down
            && self.key == event.key
            && self.modifiers == event.modifiers.intersection(Modifiers::LIVE)
    }

    /// `false` when the binding requires a lock-style modifier: those are
    /// masked out of every event, so such a hotkey never fires.
    pub fn is_reachable(&self) -> bool {
        self.modifiers.intersection(Modifiers::LIVE) == self.modifiers
    }
}

impl PartialEq for HotKey {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.modifiers == other.modifiers
    }
}

impl Eq for HotKey {}

impl Hash for HotKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
        self.modifiers.hash(state);
    }
}

impl fmt::Display for HotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for modifier in self.modifiers.iter() {
            write!(f, "{}+", modifier.as_str())?;
        }
        write!(f, "{}", self.key)
    }
}

/// Parses chords such as `ArrowRight`, `shift+ArrowRight` or `ctrl+alt+KeyF`.
/// The last segment is the key, everything before it is a modifier.
impl FromStr for HotKey {
    type Err = HotkeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts: Vec<&str> = s.trim().split('+').map(str::trim).collect();
        let key = match parts.pop() {
            Some(key) if !key.is_empty() => key,
            _ => return Err(HotkeyError::InvalidChord(s.to_string())),
        };

        let modifiers = parts
            .into_iter()
            .map(Modifier::from_str)
            .collect::<Result<Modifiers, _>>()?;

        Ok(HotKey {
            key: Key::new(key),
            modifiers,
            scope: HotKeyScope::InApp,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyEventKind {
    Down,
    Up,
}

/// A key transition with the modifiers held at that instant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    pub kind: KeyEventKind,
    pub modifiers: Modifiers,
}

impl KeyEvent {
    pub fn down(key: impl Into<String>, modifiers: Modifiers) -> Self {
        Self {
            key: Key::new(key),
            kind: KeyEventKind::Down,
            modifiers,
        }
    }

    pub fn up(key: impl Into<String>, modifiers: Modifiers) -> Self {
        Self {
            key: Key::new(key),
            kind: KeyEventKind::Up,
            modifiers,
        }
    }
}

impl From<&HotKey> for KeyEvent {
    fn from(value: &HotKey) -> Self {
        KeyEvent::down(value.key.as_str(), value.modifiers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modifier_set_is_unordered() {
        let a: Modifiers = [Modifier::Shift, Modifier::Control].into_iter().collect();
        let b: Modifiers = [Modifier::Control, Modifier::Shift].into_iter().collect();
        assert_eq!(a, b);
        assert_ne!(a, Modifiers::SHIFT);
    }

    #[test]
    fn test_hotkey_equality_ignores_scope() {
        let a = HotKey::new("KeyF").with_scope(HotKeyScope::System);
        let b = HotKey::new("KeyF");
        assert_eq!(a, b);
        assert_ne!(a, HotKey::new("KeyF").with_modifier(Modifier::Alt));
    }

    #[test]
    fn test_parse_and_display_chord() {
        let hotkey: HotKey = "ctrl + Shift+ArrowRight".parse().unwrap();
        assert_eq!(hotkey.key.as_str(), "ArrowRight");
        assert!(hotkey.modifiers.contains(Modifier::Control));
        assert!(hotkey.modifiers.contains(Modifier::Shift));
        assert_eq!(hotkey.to_string(), "control+shift+ArrowRight");

        assert!("hyper+KeyA".parse::<HotKey>().is_err());
        assert!("shift+".parse::<HotKey>().is_err());
    }

    #[test]
    fn test_modifiers_serialize_as_list() {
        let modifiers = Modifiers::SHIFT.with(Modifier::CapsLock);
        let yaml = serde_yaml::to_string(&modifiers).unwrap();
        assert_eq!(yaml, "- shift\n- caps_lock\n");
        let back: Modifiers = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, modifiers);
    }

    #[test]
    fn test_caps_lock_in_event_does_not_break_match() {
        let hotkey = HotKey::new("KeyM");
        let event = KeyEvent::down("KeyM", Modifiers::NONE.with(Modifier::CapsLock));
        assert!(hotkey.matches(&event));
        assert!(!hotkey.matches(&KeyEvent::up("KeyM", Modifiers::NONE)));
    }

    #[test]
    fn test_lock_modifier_binding_is_unreachable() {
        let hotkey = HotKey::new("KeyS").with_modifier(Modifier::CapsLock);
        let event = KeyEvent::down("KeyS", Modifiers::NONE.with(Modifier::CapsLock));
        assert!(!hotkey.matches(&event));
        assert!(!hotkey.is_reachable());

        assert!(HotKey::new("KeyS").with_modifier(Modifier::Meta).is_reachable());
        assert!(!HotKey::new("F5").with_modifier(Modifier::Fn).is_reachable());
    }
}
