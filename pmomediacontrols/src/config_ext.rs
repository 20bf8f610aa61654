//! Extension pour intégrer la configuration des contrôles média dans pmoconfig

use std::time::Duration;

use anyhow::Result;
use pmoconfig::Config;
use serde_yaml::Value;

use crate::publisher::DEFAULT_THROTTLE_WINDOW;

pub trait MediaControlsConfigExt {
    /// Fenêtre de limitation des mises à jour de lecture
    fn get_media_controls_throttle(&self) -> Result<Duration>;

    fn set_media_controls_throttle(&self, window: Duration) -> Result<()>;
}

impl MediaControlsConfigExt for Config {
    fn get_media_controls_throttle(&self) -> Result<Duration> {
        Ok(Duration::from_millis(self.get_u64_or(
            &["media_controls", "throttle_ms"],
            DEFAULT_THROTTLE_WINDOW.as_millis() as u64,
        )))
    }

    fn set_media_controls_throttle(&self, window: Duration) -> Result<()> {
        self.set_value(
            &["media_controls", "throttle_ms"],
            Value::from(window.as_millis() as u64),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_throttle_default_and_update() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_config(dir.path().to_str().unwrap()).unwrap();
        assert_eq!(
            config.get_media_controls_throttle().unwrap(),
            Duration::from_secs(1)
        );

        config
            .set_media_controls_throttle(Duration::from_millis(250))
            .unwrap();
        let reloaded = Config::load_config(dir.path().to_str().unwrap()).unwrap();
        assert_eq!(
            reloaded.get_media_controls_throttle().unwrap(),
            Duration::from_millis(250)
        );
    }
}
