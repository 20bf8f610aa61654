//! Extension pour intégrer la table de raccourcis dans pmoconfig
//!
//! La table est stockée sous `hotkeys` comme une liste ordonnée
//! `[{action, key, modifiers, scope}, ...]`. L'ordre est conservé : c'est lui
//! qui départage deux actions liées à la même touche.

use anyhow::Result;
use pmoconfig::Config;
use pmoplayer::PlayerAction;
use serde_yaml::Value;
use tracing::warn;

use crate::table::HotkeyTable;

/// Trait d'extension pour la section `hotkeys` de la configuration
///
/// # Exemple
///
/// ```rust,ignore
/// use pmoconfig::Config;
/// use pmohotkeys::{HotkeyEngine, HotkeysConfigExt};
///
/// let config = Config::load_config("")?;
/// let engine = HotkeyEngine::new(config.get_hotkeys()?);
/// ```
pub trait HotkeysConfigExt {
    /// Table configurée, ou la table par défaut si la section est absente
    fn get_hotkeys(&self) -> Result<HotkeyTable<PlayerAction>>;

    /// Enregistre la table telle quelle
    fn set_hotkeys(&self, table: &HotkeyTable<PlayerAction>) -> Result<()>;

    /// Supprime la section : la table par défaut s'applique de nouveau
    fn reset_hotkeys(&self) -> Result<()>;
}

impl HotkeysConfigExt for Config {
    fn get_hotkeys(&self) -> Result<HotkeyTable<PlayerAction>> {
        let table = match self.get_value(&["hotkeys"]) {
            Ok(Value::Sequence(_)) => self.get_typed(&["hotkeys"])?,
            _ => HotkeyTable::player_defaults(),
        };

        for (hotkey, actions) in table.duplicates() {
            let actions: Vec<String> = actions.iter().map(ToString::to_string).collect();
            warn!(
                hotkey = %hotkey,
                actions = ?actions,
                "Hotkey bound to several actions, only the first one will fire"
            );
        }

        for binding in table.unreachable() {
            warn!(
                hotkey = %binding.hotkey,
                action = %binding.action,
                "Hotkey requires caps_lock or fn and will never fire"
            );
        }

        Ok(table)
    }

    fn set_hotkeys(&self, table: &HotkeyTable<PlayerAction>) -> Result<()> {
        self.set_typed(&["hotkeys"], table)
    }

    fn reset_hotkeys(&self) -> Result<()> {
        self.set_value(&["hotkeys"], Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::HotKey;

    fn load(yaml: Option<&str>) -> (tempfile::TempDir, Config) {
        let dir = tempfile::tempdir().unwrap();
        if let Some(yaml) = yaml {
            std::fs::write(dir.path().join("config.yaml"), yaml).unwrap();
        }
        let config = Config::load_config(dir.path().to_str().unwrap()).unwrap();
        (dir, config)
    }

    #[test]
    fn test_absent_section_gives_defaults() {
        let (_dir, config) = load(None);
        assert_eq!(config.get_hotkeys().unwrap(), HotkeyTable::player_defaults());
    }

    #[test]
    fn test_user_table_keeps_order_and_key_case() {
        let (_dir, config) = load(Some(
            "hotkeys:\n  - action: stop\n    key: KeyQ\n  - action: play_pause\n    key: KeyK\n    modifiers: [control]\n    scope: system\n",
        ));

        let table = config.get_hotkeys().unwrap();
        let actions: Vec<PlayerAction> = table.iter().map(|b| b.action).collect();
        assert_eq!(actions, vec![PlayerAction::Stop, PlayerAction::PlayPause]);
        assert_eq!(table.get(&PlayerAction::Stop), Some(&HotKey::new("KeyQ")));
        assert_eq!(
            table.get(&PlayerAction::PlayPause).unwrap().to_string(),
            "control+KeyK"
        );
    }

    #[test]
    fn test_save_and_reset() {
        let (dir, config) = load(None);
        let mut table = HotkeyTable::player_defaults();
        table.insert(PlayerAction::Stop, HotKey::new("KeyX"));
        config.set_hotkeys(&table).unwrap();

        let reloaded = Config::load_config(dir.path().to_str().unwrap()).unwrap();
        assert_eq!(reloaded.get_hotkeys().unwrap(), table);

        reloaded.reset_hotkeys().unwrap();
        assert_eq!(
            reloaded.get_hotkeys().unwrap(),
            HotkeyTable::player_defaults()
        );
    }

    #[test]
    fn test_lock_modifier_binding_is_loaded_but_flagged() {
        let (_dir, config) = load(Some(
            "hotkeys:\n  - action: stop\n    key: KeyS\n    modifiers: [caps_lock]\n  - action: play_pause\n    key: Space\n",
        ));

        let table = config.get_hotkeys().unwrap();
        assert_eq!(table.len(), 2);
        let unreachable: Vec<PlayerAction> = table.unreachable().map(|b| b.action).collect();
        assert_eq!(unreachable, vec![PlayerAction::Stop]);
    }

    #[test]
    fn test_unknown_action_is_an_error() {
        let (_dir, config) = load(Some("hotkeys:\n  - action: rewind\n    key: KeyR\n"));
        assert!(config.get_hotkeys().is_err());
    }
}
