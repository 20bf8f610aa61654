use thiserror::Error;

use crate::keys::HotKey;

#[derive(Error, Debug)]
pub enum HotkeyError {
    #[error("Unknown modifier '{0}'")]
    UnknownModifier(String),
    #[error("Invalid key chord '{0}'")]
    InvalidChord(String),
    /// The binding is already used by another action.
    #[error("Hotkey {hotkey} is already bound to '{bound_to}'")]
    Duplicate { hotkey: HotKey, bound_to: String },
    /// Lock-style modifiers never take part in a match.
    #[error("Hotkey {0} requires caps_lock or fn and can never fire")]
    Unreachable(HotKey),
    #[error("Unknown action '{0}'")]
    UnknownAction(String),
}
