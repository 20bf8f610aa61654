//! Ordered action → hotkey table.
//!
//! Order matters: when two actions share a binding the engine picks the
//! first one, so the table is a list and not a map. Callers are expected to
//! refuse such edits up front with [`HotkeyTable::try_insert`] or to inspect
//! [`HotkeyTable::duplicates`] after loading.

use std::fmt::Display;

use pmoplayer::PlayerAction;
use serde::{Deserialize, Serialize};

use crate::error::HotkeyError;
use crate::keys::{HotKey, Modifier};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Binding<A> {
    pub action: A,
    #[serde(flatten)]
    pub hotkey: HotKey,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HotkeyTable<A> {
    bindings: Vec<Binding<A>>,
}

impl<A> Default for HotkeyTable<A> {
    fn default() -> Self {
        Self {
            bindings: Vec::new(),
        }
    }
}

impl<A: Clone + PartialEq + Display> HotkeyTable<A> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Binding<A>> {
        self.bindings.iter()
    }

    pub fn get(&self, action: &A) -> Option<&HotKey> {
        self.bindings
            .iter()
            .find(|b| &b.action == action)
            .map(|b| &b.hotkey)
    }

    /// Binds `action`, replacing its previous hotkey in place.
    /// Returns the replaced hotkey.
    pub fn insert(&mut self, action: A, hotkey: HotKey) -> Option<HotKey> {
        match self.bindings.iter_mut().find(|b| b.action == action) {
            Some(binding) => Some(std::mem::replace(&mut binding.hotkey, hotkey)),
            None => {
                self.bindings.push(Binding { action, hotkey });
                None
            }
        }
    }

    /// Same as [`insert`](Self::insert) but refuses a hotkey already bound
    /// to a different action, or one that can never fire.
    pub fn try_insert(&mut self, action: A, hotkey: HotKey) -> Result<Option<HotKey>, HotkeyError> {
        if !hotkey.is_reachable() {
            return Err(HotkeyError::Unreachable(hotkey));
        }
        if let Some(bound) = self
            .bindings
            .iter()
            .find(|b| b.hotkey == hotkey && b.action != action)
        {
            return Err(HotkeyError::Duplicate {
                hotkey,
                bound_to: bound.action.to_string(),
            });
        }
        Ok(self.insert(action, hotkey))
    }

    pub fn remove(&mut self, action: &A) -> Option<HotKey> {
        let index = self.bindings.iter().position(|b| &b.action == action)?;
        Some(self.bindings.remove(index).hotkey)
    }

    /// Bindings whose hotkey requires a lock-style modifier.
    pub fn unreachable(&self) -> impl Iterator<Item = &Binding<A>> {
        self.bindings.iter().filter(|b| !b.hotkey.is_reachable())
    }

    /// Hotkeys bound to more than one action, with every action sharing it
    /// in table order.
    pub fn duplicates(&self) -> Vec<(HotKey, Vec<A>)> {
        let mut found: Vec<(HotKey, Vec<A>)> = Vec::new();
        for (index, binding) in self.bindings.iter().enumerate() {
            if found.iter().any(|(hotkey, _)| hotkey == &binding.hotkey) {
                continue;
            }
            let sharing: Vec<A> = self.bindings[index..]
                .iter()
                .filter(|b| b.hotkey == binding.hotkey)
                .map(|b| b.action.clone())
                .collect();
            if sharing.len() > 1 {
                found.push((binding.hotkey.clone(), sharing));
            }
        }
        found
    }
}

impl<A> FromIterator<(A, HotKey)> for HotkeyTable<A> {
    fn from_iter<I: IntoIterator<Item = (A, HotKey)>>(iter: I) -> Self {
        Self {
            bindings: iter
                .into_iter()
                .map(|(action, hotkey)| Binding { action, hotkey })
                .collect(),
        }
    }
}

impl HotkeyTable<PlayerAction> {
    /// Bindings shipped with the player.
    pub fn player_defaults() -> Self {
        let shift = |key: &str| HotKey::new(key).with_modifier(Modifier::Shift);

        [
            (PlayerAction::PlayPause, HotKey::new("Space")),
            (PlayerAction::SeekForwardSmall, HotKey::new("ArrowRight")),
            (PlayerAction::SeekBackwardSmall, HotKey::new("ArrowLeft")),
            (PlayerAction::SeekForwardLarge, shift("ArrowRight")),
            (PlayerAction::SeekBackwardLarge, shift("ArrowLeft")),
            (PlayerAction::VolumeUp, HotKey::new("ArrowUp")),
            (PlayerAction::VolumeDown, HotKey::new("ArrowDown")),
            (PlayerAction::ToggleMute, HotKey::new("KeyM")),
            (PlayerAction::SpeedUp, shift("Period")),
            (PlayerAction::SpeedDown, shift("Comma")),
            (PlayerAction::SpeedReset, shift("Digit0")),
            (PlayerAction::CycleSubtitles, HotKey::new("KeyC")),
            (PlayerAction::SubtitlesOff, shift("KeyC")),
            (PlayerAction::Stop, HotKey::new("KeyS")),
        ]
        .into_iter()
        .collect()
    }
}
