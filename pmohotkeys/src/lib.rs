//! # pmohotkeys
//!
//! Keyboard shortcuts for the player: physical keys with exact modifier
//! sets, an ordered action table loaded from `pmoconfig`, and the matching
//! engine that turns key-down events into [`PlayerAction`](pmoplayer::PlayerAction)s.
//!
//! ```rust,ignore
//! use pmohotkeys::{HotkeyEngine, HotkeyOutcome, HotkeyTable, KeyEvent, Modifiers};
//!
//! let engine = HotkeyEngine::new(HotkeyTable::player_defaults());
//! if let HotkeyOutcome::Handled(action) = engine.handle(&KeyEvent::down("Space", Modifiers::NONE)) {
//!     player.perform(*action, &increments).await?;
//! }
//! ```

pub mod config_ext;
pub mod engine;
pub mod error;
pub mod keys;
pub mod table;

pub use config_ext::HotkeysConfigExt;
pub use engine::{HotkeyEngine, HotkeyOutcome};
pub use error::HotkeyError;
pub use keys::{HotKey, HotKeyScope, Key, KeyEvent, KeyEventKind, Modifier, Modifiers};
pub use table::{Binding, HotkeyTable};
