//! Applies raw backend observations to a [`PlayerState`].
//!
//! Reconciliation is a pure function: it takes the current snapshot and one
//! update, and returns the next snapshot together with the events of the
//! fields that really changed. Values equal to the stored ones never emit.

use std::time::Duration;

use crate::model::{
    AudioDevice, PlayerLog, PlayerState, TrackSelection, Tracks, clamp_rate, clamp_volume,
};
use crate::streams::PlayerEvent;

/// A raw observation reported by a backend adapter.
#[derive(Clone, Debug, PartialEq)]
pub enum BackendUpdate {
    Playing(bool),
    Buffering(bool),
    Completed(bool),
    Position(Duration),
    Duration(Duration),
    Buffer(Duration),
    Volume(f64),
    Rate(f64),
    Tracks(Tracks),
    Track(TrackSelection),
    AudioDevice(AudioDevice),
    AudioDevices(Vec<AudioDevice>),
    Log(PlayerLog),
    Error(String),
}

#[derive(Debug, Default)]
pub struct Reconciled {
    pub state: PlayerState,
    pub events: Vec<PlayerEvent>,
}

pub fn reconcile(current: &PlayerState, update: BackendUpdate) -> Reconciled {
    let mut next = current.clone();
    let mut events = Vec::new();

    match update {
        BackendUpdate::Playing(v) => next.playing = v,
        BackendUpdate::Buffering(v) => next.buffering = v,
        BackendUpdate::Completed(v) => next.completed = v,
        BackendUpdate::Position(v) => next.position = v,
        BackendUpdate::Duration(v) => next.duration = v,
        BackendUpdate::Buffer(v) => next.buffer = v,
        BackendUpdate::Volume(v) => next.volume = clamp_volume(v),
        BackendUpdate::Rate(v) => next.rate = clamp_rate(v),
        BackendUpdate::Tracks(v) => next.tracks = v,
        BackendUpdate::Track(v) => next.track = v,
        BackendUpdate::AudioDevice(v) => next.audio_device = v,
        BackendUpdate::AudioDevices(v) => next.audio_devices = v,
        // Log et erreur ne font pas partie de l'état, ils passent tels quels
        BackendUpdate::Log(log) => {
            events.push(PlayerEvent::Log(log));
        }
        BackendUpdate::Error(message) => {
            events.push(PlayerEvent::Error(message));
        }
    }

    enforce_invariants(&mut next);
    events.extend(diff(current, &next));

    Reconciled {
        state: next,
        events,
    }
}

/// Applies a batch of updates in order and concatenates their events.
pub fn reconcile_all(
    current: &PlayerState,
    updates: impl IntoIterator<Item = BackendUpdate>,
) -> Reconciled {
    let mut state = current.clone();
    let mut events = Vec::new();
    for update in updates {
        let step = reconcile(&state, update);
        state = step.state;
        events.extend(step.events);
    }
    Reconciled { state, events }
}

/// Playback fields cleared when a new source is opened. Volume, rate and
/// audio device survive across sources.
pub fn reset_playback(current: &PlayerState) -> Reconciled {
    reconcile_all(
        current,
        [
            BackendUpdate::Playing(false),
            BackendUpdate::Buffering(false),
            BackendUpdate::Completed(false),
            BackendUpdate::Duration(Duration::ZERO),
            BackendUpdate::Position(Duration::ZERO),
            BackendUpdate::Buffer(Duration::ZERO),
            BackendUpdate::Track(TrackSelection::default()),
        ],
    )
}

fn enforce_invariants(state: &mut PlayerState) {
    if state.duration > Duration::ZERO && state.position > state.duration {
        state.position = state.duration;
    }
    if state.buffer > Duration::ZERO && state.buffer < state.position {
        state.buffer = state.position;
    }
}

fn diff(old: &PlayerState, new: &PlayerState) -> Vec<PlayerEvent> {
    let mut events = Vec::new();

    macro_rules! field {
        ($field:ident, $variant:ident) => {
            if old.$field != new.$field {
                events.push(PlayerEvent::$variant(new.$field.clone()));
            }
        };
    }

    field!(playing, Playing);
    field!(buffering, Buffering);
    field!(completed, Completed);
    field!(duration, Duration);
    field!(position, Position);
    field!(buffer, Buffer);
    field!(volume, Volume);
    field!(rate, Rate);
    field!(tracks, Tracks);
    field!(track, Track);
    field!(audio_device, AudioDevice);
    field!(audio_devices, AudioDevices);

    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AudioTrack, SubtitleTrack};

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    #[test]
    fn test_unchanged_value_emits_nothing() {
        let state = PlayerState::default();
        let out = reconcile(&state, BackendUpdate::Playing(false));
        assert!(out.events.is_empty());
        assert_eq!(out.state, state);
    }

    #[test]
    fn test_changed_value_emits_once() {
        let state = PlayerState::default();
        let out = reconcile(&state, BackendUpdate::Playing(true));
        assert_eq!(out.events, vec![PlayerEvent::Playing(true)]);
        assert!(out.state.playing);
    }

    #[test]
    fn test_volume_and_rate_are_clamped() {
        let state = PlayerState::default();
        let out = reconcile(&state, BackendUpdate::Volume(180.0));
        // déjà à 100, rien ne change
        assert!(out.events.is_empty());

        let out = reconcile(&state, BackendUpdate::Rate(0.01));
        assert_eq!(out.state.rate, 0.25);
        assert_eq!(out.events, vec![PlayerEvent::Rate(0.25)]);
    }

    #[test]
    fn test_position_never_exceeds_duration() {
        let state = reconcile(&PlayerState::default(), BackendUpdate::Duration(secs(120))).state;
        let out = reconcile(&state, BackendUpdate::Position(secs(200)));
        assert_eq!(out.state.position, secs(120));

        // Une durée qui raccourcit ramène aussi la position
        let out = reconcile(&out.state, BackendUpdate::Duration(secs(60)));
        assert_eq!(out.state.position, secs(60));
        assert_eq!(
            out.events,
            vec![PlayerEvent::Duration(secs(60)), PlayerEvent::Position(secs(60))]
        );
    }

    #[test]
    fn test_position_unbounded_while_duration_unknown() {
        let out = reconcile(&PlayerState::default(), BackendUpdate::Position(secs(30)));
        assert_eq!(out.state.position, secs(30));
    }

    #[test]
    fn test_buffer_stays_ahead_of_position() {
        let state = reconcile_all(
            &PlayerState::default(),
            [
                BackendUpdate::Duration(secs(100)),
                BackendUpdate::Buffer(secs(40)),
            ],
        )
        .state;
        let out = reconcile(&state, BackendUpdate::Position(secs(50)));
        assert_eq!(out.state.buffer, secs(50));
        assert_eq!(
            out.events,
            vec![PlayerEvent::Position(secs(50)), PlayerEvent::Buffer(secs(50))]
        );

        // Sans données en cache le tampon reste à zéro
        let out = reconcile(&PlayerState::default(), BackendUpdate::Position(secs(5)));
        assert_eq!(out.state.buffer, Duration::ZERO);
    }

    #[test]
    fn test_log_and_error_pass_through() {
        let state = PlayerState::default();
        let out = reconcile(&state, BackendUpdate::Error("decoder failed".into()));
        assert_eq!(out.events, vec![PlayerEvent::Error("decoder failed".into())]);
        assert_eq!(out.state, state);
    }

    #[test]
    fn test_reset_playback_keeps_volume_and_rate() {
        let state = reconcile_all(
            &PlayerState::default(),
            [
                BackendUpdate::Playing(true),
                BackendUpdate::Duration(secs(120)),
                BackendUpdate::Position(secs(60)),
                BackendUpdate::Volume(30.0),
                BackendUpdate::Rate(1.5),
                BackendUpdate::Track(TrackSelection {
                    audio: AudioTrack::new("1", None, Some("eng".into())),
                    subtitle: SubtitleTrack::new("2", None, None),
                }),
            ],
        )
        .state;

        let out = reset_playback(&state);
        assert!(!out.state.playing);
        assert_eq!(out.state.position, Duration::ZERO);
        assert_eq!(out.state.duration, Duration::ZERO);
        assert_eq!(out.state.volume, 30.0);
        assert_eq!(out.state.rate, 1.5);
        assert_eq!(out.state.track, TrackSelection::default());
    }
}
