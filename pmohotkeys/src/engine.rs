use std::fmt::Display;

use tracing::trace;

use crate::keys::KeyEvent;
use crate::table::HotkeyTable;

#[derive(Debug, PartialEq, Eq)]
pub enum HotkeyOutcome<'a, A> {
    /// Escape, BrowserBack or GoBack went down.
    Back,
    Handled(&'a A),
    /// Nothing bound; the caller's focus chain may take the event.
    Unhandled,
}

impl<A> HotkeyOutcome<'_, A> {
    pub fn is_handled(&self) -> bool {
        !matches!(self, HotkeyOutcome::Unhandled)
    }
}

/// Matches key events against an action table.
#[derive(Clone, Debug)]
pub struct HotkeyEngine<A> {
    table: HotkeyTable<A>,
}

impl<A: Clone + PartialEq + Display> HotkeyEngine<A> {
    pub fn new(table: HotkeyTable<A>) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &HotkeyTable<A> {
        &self.table
    }

    pub fn set_table(&mut self, table: HotkeyTable<A>) {
        self.table = table;
    }

    pub fn handle(&self, event: &KeyEvent) -> HotkeyOutcome<'_, A> {
        if event.kind != crate::keys::KeyEventKind::Down {
            return HotkeyOutcome::Unhandled;
        }

        if event.key.is_back() {
            trace!(key = %event.key, "back navigation");
            return HotkeyOutcome::Back;
        }

        match self.table.iter().find(|b| b.hotkey.matches(event)) {
            Some(binding) => {
                trace!(key = %event.key, action = %binding.action, "hotkey matched");
                HotkeyOutcome::Handled(&binding.action)
            }
            None => HotkeyOutcome::Unhandled,
        }
    }
}
