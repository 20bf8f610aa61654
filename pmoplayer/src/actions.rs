//! Named player commands, the vocabulary hotkeys are bound to.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

use crate::session::PlayerCore;
use crate::errors::PlayerError;
use crate::model::{SubtitleTrack, VOLUME_MAX, VOLUME_MIN};

pub const VOLUME_STEP: f64 = 5.0;
pub const RATE_STEP: f64 = 0.25;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerAction {
    PlayPause,
    Stop,
    SeekForwardSmall,
    SeekBackwardSmall,
    SeekForwardLarge,
    SeekBackwardLarge,
    VolumeUp,
    VolumeDown,
    ToggleMute,
    SpeedUp,
    SpeedDown,
    SpeedReset,
    CycleSubtitles,
    SubtitlesOff,
}

impl PlayerAction {
    pub const ALL: [PlayerAction; 14] = [
        PlayerAction::PlayPause,
        PlayerAction::Stop,
        PlayerAction::SeekForwardSmall,
        PlayerAction::SeekBackwardSmall,
        PlayerAction::SeekForwardLarge,
        PlayerAction::SeekBackwardLarge,
        PlayerAction::VolumeUp,
        PlayerAction::VolumeDown,
        PlayerAction::ToggleMute,
        PlayerAction::SpeedUp,
        PlayerAction::SpeedDown,
        PlayerAction::SpeedReset,
        PlayerAction::CycleSubtitles,
        PlayerAction::SubtitlesOff,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PlayerAction::PlayPause => "play_pause",
            PlayerAction::Stop => "stop",
            PlayerAction::SeekForwardSmall => "seek_forward_small",
            PlayerAction::SeekBackwardSmall => "seek_backward_small",
            PlayerAction::SeekForwardLarge => "seek_forward_large",
            PlayerAction::SeekBackwardLarge => "seek_backward_large",
            PlayerAction::VolumeUp => "volume_up",
            PlayerAction::VolumeDown => "volume_down",
            PlayerAction::ToggleMute => "toggle_mute",
            PlayerAction::SpeedUp => "speed_up",
            PlayerAction::SpeedDown => "speed_down",
            PlayerAction::SpeedReset => "speed_reset",
            PlayerAction::CycleSubtitles => "cycle_subtitles",
            PlayerAction::SubtitlesOff => "subtitles_off",
        }
    }
}

impl fmt::Display for PlayerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlayerAction {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        PlayerAction::ALL
            .into_iter()
            .find(|action| action.as_str() == wanted)
            .ok_or_else(|| anyhow!("unknown player action '{}'", wanted))
    }
}

/// Seek distances used by the seek actions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SeekIncrements {
    pub small: Duration,
    pub large: Duration,
}

impl Default for SeekIncrements {
    fn default() -> Self {
        Self {
            small: Duration::from_secs(5),
            large: Duration::from_secs(30),
        }
    }
}

fn seek_target(position: Duration, duration: Duration, delta: Duration, forward: bool) -> Duration {
    let target = if forward {
        position.saturating_add(delta)
    } else {
        position.saturating_sub(delta)
    };
    if duration > Duration::ZERO {
        target.min(duration)
    } else {
        target
    }
}

/// Next subtitle in the cycle: each real track in order, then off.
fn next_subtitle(available: &[SubtitleTrack], current: &SubtitleTrack) -> SubtitleTrack {
    let real: Vec<&SubtitleTrack> = available
        .iter()
        .filter(|t| !t.is_disabled() && t.id != crate::model::AUTO_TRACK_ID)
        .collect();

    let next = match real.iter().position(|t| t.id == current.id) {
        Some(index) => real.get(index + 1),
        None => real.first(),
    };
    next.map(|t| (*t).clone())
        .unwrap_or_else(SubtitleTrack::disabled)
}

impl PlayerCore {
    /// Runs one named action against the live state.
    pub async fn perform(
        &self,
        action: PlayerAction,
        seek: &SeekIncrements,
    ) -> Result<(), PlayerError> {
        let state = self.state();
        match action {
            PlayerAction::PlayPause => self.play_or_pause().await,
            PlayerAction::Stop => self.stop().await,
            PlayerAction::SeekForwardSmall => {
                self.seek(seek_target(state.position, state.duration, seek.small, true))
                    .await
            }
            PlayerAction::SeekBackwardSmall => {
                self.seek(seek_target(state.position, state.duration, seek.small, false))
                    .await
            }
            PlayerAction::SeekForwardLarge => {
                self.seek(seek_target(state.position, state.duration, seek.large, true))
                    .await
            }
            PlayerAction::SeekBackwardLarge => {
                self.seek(seek_target(state.position, state.duration, seek.large, false))
                    .await
            }
            PlayerAction::VolumeUp => self.set_volume(state.volume + VOLUME_STEP).await,
            PlayerAction::VolumeDown => self.set_volume(state.volume - VOLUME_STEP).await,
            PlayerAction::ToggleMute => {
                if state.volume > VOLUME_MIN {
                    *self.muted_volume().lock() = Some(state.volume);
                    self.set_volume(VOLUME_MIN).await
                } else {
                    let restored = self.muted_volume().lock().take().unwrap_or(VOLUME_MAX);
                    self.set_volume(restored).await
                }
            }
            PlayerAction::SpeedUp => self.set_rate(state.rate + RATE_STEP).await,
            PlayerAction::SpeedDown => self.set_rate(state.rate - RATE_STEP).await,
            PlayerAction::SpeedReset => self.set_rate(crate::model::DEFAULT_RATE).await,
            PlayerAction::CycleSubtitles => {
                let next = next_subtitle(&state.tracks.subtitle, &state.track.subtitle);
                self.select_subtitle_track(next).await
            }
            PlayerAction::SubtitlesOff => {
                self.select_subtitle_track(SubtitleTrack::disabled()).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_names_roundtrip() {
        for action in PlayerAction::ALL {
            assert_eq!(action.as_str().parse::<PlayerAction>().unwrap(), action);
        }
        assert!("rewind".parse::<PlayerAction>().is_err());
    }

    #[test]
    fn test_action_serde_matches_names() {
        let json = serde_json::to_string(&PlayerAction::SeekForwardLarge).unwrap();
        assert_eq!(json, "\"seek_forward_large\"");
    }

    #[test]
    fn test_seek_target_bounds() {
        let s = Duration::from_secs;
        assert_eq!(seek_target(s(3), s(100), s(5), false), Duration::ZERO);
        assert_eq!(seek_target(s(98), s(100), s(5), true), s(100));
        assert_eq!(seek_target(s(98), Duration::ZERO, s(5), true), s(103));
    }

    #[test]
    fn test_cycle_subtitles_ends_on_off() {
        let available = vec![
            SubtitleTrack::auto(),
            SubtitleTrack::disabled(),
            SubtitleTrack::new("1", None, Some("eng".into())),
            SubtitleTrack::new("2", None, Some("fra".into())),
        ];

        let first = next_subtitle(&available, &SubtitleTrack::disabled());
        assert_eq!(first.id, "1");
        let second = next_subtitle(&available, &first);
        assert_eq!(second.id, "2");
        let third = next_subtitle(&available, &second);
        assert!(third.is_disabled());

        assert!(next_subtitle(&[], &SubtitleTrack::auto()).is_disabled());
    }
}
