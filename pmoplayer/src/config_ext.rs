//! Extension pour intégrer la configuration du lecteur dans pmoconfig
//!
//! Ce module fournit le trait `PlayerConfigExt`, qui lit la section
//! `player` de `pmoconfig::Config` et la convertit en options typées pour
//! la sélection du backend et le cœur de session.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use pmoconfig::Config;
use serde_yaml::Value;

use crate::actions::SeekIncrements;
use crate::backend::{BackendOptions, BackendPreference, MpvOptions};
use crate::session::CoreOptions;
use crate::streams::DEFAULT_STREAM_CAPACITY;

const DEFAULT_OPEN_TIMEOUT_MS: u64 = 15_000;
const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5_000;
/// En dessous, l'ouverture échouerait avant que le moteur ait démarré
const MIN_OPEN_TIMEOUT_MS: u64 = 1_000;
const MIN_IPC_TIMEOUT_MS: u64 = 100;
const DEFAULT_SEEK_SMALL_SECS: u64 = 5;
const DEFAULT_SEEK_LARGE_SECS: u64 = 30;

/// Trait d'extension pour la section `player` de la configuration
///
/// # Exemple
///
/// ```rust,ignore
/// use pmoconfig::Config;
/// use pmoplayer::PlayerConfigExt;
///
/// let config = Config::load_config("")?;
/// let options = config.get_backend_options()?;
/// ```
pub trait PlayerConfigExt {
    /// Backend demandé (`auto`, `native`, `windowed`, `element`)
    fn get_backend_preference(&self) -> Result<BackendPreference>;

    fn set_backend_preference(&self, preference: BackendPreference) -> Result<()>;

    /// Options de lancement de mpv
    fn get_mpv_options(&self) -> Result<MpvOptions>;

    /// Préférence et options mpv réunies pour `select_backend`
    fn get_backend_options(&self) -> Result<BackendOptions>;

    fn get_core_options(&self) -> Result<CoreOptions>;

    /// Pas de seek courts et longs
    fn get_seek_increments(&self) -> Result<SeekIncrements>;

    fn set_seek_increments(&self, increments: &SeekIncrements) -> Result<()>;
}

impl PlayerConfigExt for Config {
    fn get_backend_preference(&self) -> Result<BackendPreference> {
        let raw = self.get_string_or(&["player", "backend"], "auto");
        raw.parse()
    }

    fn set_backend_preference(&self, preference: BackendPreference) -> Result<()> {
        self.set_typed(&["player", "backend"], &preference)
    }

    fn get_mpv_options(&self) -> Result<MpvOptions> {
        let defaults = MpvOptions::default();

        let path_or_none = |key: &str| {
            let raw = self.get_string_or(&["player", "mpv", key], "");
            if raw.trim().is_empty() {
                None
            } else {
                Some(PathBuf::from(raw))
            }
        };

        let extra_args = match self.get_value(&["player", "mpv", "extra_args"]) {
            Ok(Value::Sequence(_)) => self.get_typed(&["player", "mpv", "extra_args"])?,
            _ => Vec::new(),
        };

        Ok(MpvOptions {
            binary: self.get_string_or(&["player", "mpv", "binary"], &defaults.binary),
            socket_dir: path_or_none("socket_dir"),
            attach_socket: path_or_none("attach_socket"),
            hwdec: self.get_string_or(&["player", "mpv", "hwdec"], &defaults.hwdec),
            connect_timeout: Duration::from_millis(
                self.get_u64_or(
                    &["player", "mpv", "connect_timeout_ms"],
                    DEFAULT_CONNECT_TIMEOUT_MS,
                )
                .max(MIN_IPC_TIMEOUT_MS),
            ),
            request_timeout: Duration::from_millis(
                self.get_u64_or(
                    &["player", "mpv", "request_timeout_ms"],
                    DEFAULT_REQUEST_TIMEOUT_MS,
                )
                .max(MIN_IPC_TIMEOUT_MS),
            ),
            extra_args,
        })
    }

    fn get_backend_options(&self) -> Result<BackendOptions> {
        Ok(BackendOptions {
            preference: self.get_backend_preference()?,
            mpv: self.get_mpv_options()?,
        })
    }

    fn get_core_options(&self) -> Result<CoreOptions> {
        Ok(CoreOptions {
            open_timeout: Duration::from_millis(
                self.get_u64_or(&["player", "open_timeout_ms"], DEFAULT_OPEN_TIMEOUT_MS)
                    .max(MIN_OPEN_TIMEOUT_MS),
            ),
            stream_capacity: self.get_u64_or(
                &["player", "stream_capacity"],
                DEFAULT_STREAM_CAPACITY as u64,
            ) as usize,
        })
    }

    fn get_seek_increments(&self) -> Result<SeekIncrements> {
        Ok(SeekIncrements {
            small: Duration::from_secs(
                self.get_u64_or(&["player", "seek", "small_seconds"], DEFAULT_SEEK_SMALL_SECS),
            ),
            large: Duration::from_secs(
                self.get_u64_or(&["player", "seek", "large_seconds"], DEFAULT_SEEK_LARGE_SECS),
            ),
        })
    }

    fn set_seek_increments(&self, increments: &SeekIncrements) -> Result<()> {
        self.set_value(
            &["player", "seek", "small_seconds"],
            Value::from(increments.small.as_secs()),
        )?;
        self.set_value(
            &["player", "seek", "large_seconds"],
            Value::from(increments.large.as_secs()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(yaml: Option<&str>) -> (tempfile::TempDir, Config) {
        let dir = tempfile::tempdir().unwrap();
        if let Some(yaml) = yaml {
            std::fs::write(dir.path().join("config.yaml"), yaml).unwrap();
        }
        let config = Config::load_config(dir.path().to_str().unwrap()).unwrap();
        (dir, config)
    }

    #[test]
    fn test_defaults() {
        let (_dir, config) = load(None);

        assert_eq!(config.get_backend_preference().unwrap(), BackendPreference::Auto);
        let mpv = config.get_mpv_options().unwrap();
        assert_eq!(mpv.binary, "mpv");
        assert!(mpv.socket_dir.is_none());
        assert!(mpv.attach_socket.is_none());
        assert!(mpv.extra_args.is_empty());
        assert_eq!(mpv.connect_timeout, Duration::from_secs(5));

        let core = config.get_core_options().unwrap();
        assert_eq!(core.open_timeout, Duration::from_secs(15));
        assert_eq!(config.get_seek_increments().unwrap(), SeekIncrements::default());
    }

    #[test]
    fn test_user_values() {
        let (_dir, config) = load(Some(
            "player:\n  backend: windowed\n  mpv:\n    extra_args: ['--ao=pulse']\n    socket_dir: /run/user/1000\n",
        ));

        assert_eq!(
            config.get_backend_preference().unwrap(),
            BackendPreference::Windowed
        );
        let mpv = config.get_mpv_options().unwrap();
        assert_eq!(mpv.extra_args, vec!["--ao=pulse".to_string()]);
        assert_eq!(mpv.socket_dir, Some(PathBuf::from("/run/user/1000")));
    }

    #[test]
    fn test_zero_timeouts_are_raised() {
        let (_dir, config) = load(Some(
            "player:\n  open_timeout_ms: 0\n  mpv:\n    connect_timeout_ms: 0\n    request_timeout_ms: 20\n",
        ));

        let core = config.get_core_options().unwrap();
        assert_eq!(core.open_timeout, Duration::from_secs(1));
        let mpv = config.get_mpv_options().unwrap();
        assert_eq!(mpv.connect_timeout, Duration::from_millis(100));
        assert_eq!(mpv.request_timeout, Duration::from_millis(100));

        let (_dir, config) = load(Some("player:\n  open_timeout_ms: 2500\n"));
        assert_eq!(
            config.get_core_options().unwrap().open_timeout,
            Duration::from_millis(2500)
        );
    }

    #[test]
    fn test_invalid_backend_is_an_error() {
        let (_dir, config) = load(Some("player:\n  backend: vlc\n"));
        assert!(config.get_backend_preference().is_err());
    }

    #[test]
    fn test_seek_increments_persist() {
        let (dir, config) = load(None);
        let increments = SeekIncrements {
            small: Duration::from_secs(10),
            large: Duration::from_secs(60),
        };
        config.set_seek_increments(&increments).unwrap();
        config
            .set_backend_preference(BackendPreference::Native)
            .unwrap();

        let reloaded = Config::load_config(dir.path().to_str().unwrap()).unwrap();
        assert_eq!(reloaded.get_seek_increments().unwrap(), increments);
        assert_eq!(
            reloaded.get_backend_preference().unwrap(),
            BackendPreference::Native
        );
    }
}
