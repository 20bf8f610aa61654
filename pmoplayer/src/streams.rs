//! Per-field broadcast channels.
//!
//! Each observable field of [`PlayerState`](crate::PlayerState) gets its own
//! `tokio::sync::broadcast` channel. Subscribers only see values sent after
//! they subscribed; nothing is replayed. A slow subscriber may observe
//! `RecvError::Lagged` and skip ahead, it never blocks the session.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::broadcast;

use crate::model::{AudioDevice, PlayerLog, TrackSelection, Tracks};

pub const DEFAULT_STREAM_CAPACITY: usize = 64;

macro_rules! player_streams {
    ($( $variant:ident => $field:ident : $ty:ty ),* $(,)?) => {
        /// One change of one observable field.
        #[derive(Clone, Debug, PartialEq)]
        pub enum PlayerEvent {
            $( $variant($ty), )*
        }

        impl PlayerEvent {
            /// Name of the stream this event is delivered on.
            pub fn field(&self) -> &'static str {
                match self {
                    $( PlayerEvent::$variant(_) => stringify!($field), )*
                }
            }
        }

        struct Senders {
            $( $field: broadcast::Sender<$ty>, )*
        }

        impl Senders {
            fn new(capacity: usize) -> Self {
                Self {
                    $( $field: broadcast::channel(capacity).0, )*
                }
            }

            fn publish(&self, event: PlayerEvent) {
                // Pas d'abonné n'est pas une erreur
                match event {
                    $( PlayerEvent::$variant(value) => {
                        let _ = self.$field.send(value);
                    } )*
                }
            }
        }

        impl PlayerStreams {
            $(
                #[doc = concat!("Subscribes to `", stringify!($field), "` changes.")]
                pub fn $field(&self) -> broadcast::Receiver<$ty> {
                    match self.senders.lock().as_ref() {
                        Some(senders) => senders.$field.subscribe(),
                        None => closed_receiver(),
                    }
                }
            )*
        }
    };
}

player_streams! {
    Playing => playing: bool,
    Buffering => buffering: bool,
    Completed => completed: bool,
    Position => position: Duration,
    Duration => duration: Duration,
    Buffer => buffer: Duration,
    Volume => volume: f64,
    Rate => rate: f64,
    Tracks => tracks: Tracks,
    Track => track: TrackSelection,
    AudioDevice => audio_device: AudioDevice,
    AudioDevices => audio_devices: Vec<AudioDevice>,
    Log => log: PlayerLog,
    Error => error: String,
}

/// The stream multiplexer of one session.
///
/// Closing drops every sender at once, so each receiver drains what was
/// already sent and then reports `RecvError::Closed`.
pub struct PlayerStreams {
    senders: Mutex<Option<Senders>>,
}

impl PlayerStreams {
    pub fn new(capacity: usize) -> Self {
        Self {
            senders: Mutex::new(Some(Senders::new(capacity.max(1)))),
        }
    }

    pub(crate) fn publish(&self, event: PlayerEvent) {
        match self.senders.lock().as_ref() {
            Some(senders) => senders.publish(event),
            None => tracing::trace!(field = event.field(), "Event dropped, streams closed"),
        }
    }

    pub(crate) fn publish_all(&self, events: impl IntoIterator<Item = PlayerEvent>) {
        let guard = self.senders.lock();
        if let Some(senders) = guard.as_ref() {
            for event in events {
                senders.publish(event);
            }
        }
    }

    /// Closes every channel. Returns `true` only for the call that actually
    /// closed them.
    pub(crate) fn close(&self) -> bool {
        self.senders.lock().take().is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.senders.lock().is_none()
    }
}

impl Default for PlayerStreams {
    fn default() -> Self {
        Self::new(DEFAULT_STREAM_CAPACITY)
    }
}

fn closed_receiver<T: Clone>() -> broadcast::Receiver<T> {
    let (_, rx) = broadcast::channel(1);
    rx
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::broadcast::error::{RecvError, TryRecvError};

    #[tokio::test]
    async fn test_only_matching_stream_receives() {
        let streams = PlayerStreams::default();
        let mut playing = streams.playing();
        let mut volume = streams.volume();

        streams.publish(PlayerEvent::Volume(42.0));

        assert_eq!(volume.recv().await.unwrap(), 42.0);
        assert_eq!(playing.try_recv(), Err(TryRecvError::Empty));
    }

    #[tokio::test]
    async fn test_late_subscriber_sees_no_history() {
        let streams = PlayerStreams::default();
        let mut early = streams.position();
        streams.publish(PlayerEvent::Position(Duration::from_secs(1)));

        let mut late = streams.position();
        streams.publish(PlayerEvent::Position(Duration::from_secs(2)));

        assert_eq!(early.recv().await.unwrap(), Duration::from_secs(1));
        assert_eq!(early.recv().await.unwrap(), Duration::from_secs(2));
        assert_eq!(late.recv().await.unwrap(), Duration::from_secs(2));
        assert_eq!(late.try_recv(), Err(TryRecvError::Empty));
    }

    #[tokio::test]
    async fn test_close_is_one_shot() {
        let streams = PlayerStreams::default();
        let mut error = streams.error();
        streams.publish(PlayerEvent::Error("boom".into()));

        assert!(streams.close());
        assert!(!streams.close());
        assert!(streams.is_closed());

        // Ce qui a été envoyé avant la fermeture reste lisible
        assert_eq!(error.recv().await.unwrap(), "boom");
        assert_eq!(error.recv().await, Err(RecvError::Closed));
    }

    #[tokio::test]
    async fn test_subscribe_after_close_is_closed() {
        let streams = PlayerStreams::default();
        streams.close();
        streams.publish(PlayerEvent::Playing(true));

        let mut playing = streams.playing();
        assert_eq!(playing.recv().await, Err(RecvError::Closed));
    }

    #[test]
    fn test_event_field_names() {
        assert_eq!(PlayerEvent::AudioDevices(Vec::new()).field(), "audio_devices");
        assert_eq!(PlayerEvent::Track(TrackSelection::default()).field(), "track");
    }
}
