//! OS media-control surface contract.
//!
//! A surface is whatever the platform offers for "now playing" display and
//! transport keys (MPRIS, SMTC, MPNowPlayingInfoCenter, the browser Media
//! Session). It receives metadata and playback state and emits
//! [`ControlEvent`]s on a broadcast bus it owns.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::error::MediaControlsError;

/// Now-playing description.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaMetadata {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub artwork_url: Option<String>,
    pub duration: Duration,
}

/// What the surface shows for the transport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackUpdate {
    pub playing: bool,
    pub position: Duration,
    pub rate: f64,
}

impl Default for PlaybackUpdate {
    fn default() -> Self {
        Self {
            playing: false,
            position: Duration::ZERO,
            rate: 1.0,
        }
    }
}

/// Commands coming back from the OS controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlEvent {
    Play,
    Pause,
    Next,
    Previous,
}

impl fmt::Display for ControlEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ControlEvent::Play => "play",
            ControlEvent::Pause => "pause",
            ControlEvent::Next => "next",
            ControlEvent::Previous => "previous",
        };
        f.write_str(name)
    }
}

pub const CONTROL_EVENT_CAPACITY: usize = 16;

/// Broadcast bus for [`ControlEvent`]s.
#[derive(Debug, Clone)]
pub struct ControlEventBus {
    tx: broadcast::Sender<ControlEvent>,
}

impl ControlEventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Returns `false` when nobody listens.
    pub fn emit(&self, event: ControlEvent) -> bool {
        self.tx.send(event).is_ok()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ControlEvent> {
        self.tx.subscribe()
    }
}

impl Default for ControlEventBus {
    fn default() -> Self {
        Self::new(CONTROL_EVENT_CAPACITY)
    }
}

#[async_trait]
pub trait MediaControlSurface: Send + Sync {
    async fn set_metadata(&self, metadata: &MediaMetadata) -> Result<(), MediaControlsError>;

    async fn set_playback(&self, update: &PlaybackUpdate) -> Result<(), MediaControlsError>;

    /// Removes everything the surface currently displays.
    async fn clear(&self) -> Result<(), MediaControlsError>;

    fn events(&self) -> broadcast::Receiver<ControlEvent>;
}

// ============================================================================
// Surface de journalisation
// ============================================================================

/// Surface that only logs what it would display.
///
/// Used by the command-line player, where there is no OS integration. The
/// bus is public so a front-end can still inject control events.
#[derive(Debug, Default)]
pub struct TracingSurface {
    bus: ControlEventBus,
    shown: Mutex<Option<PlaybackUpdate>>,
}

impl TracingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bus(&self) -> &ControlEventBus {
        &self.bus
    }

    /// Last playback state pushed, `None` after `clear()`.
    pub fn shown(&self) -> Option<PlaybackUpdate> {
        *self.shown.lock()
    }
}

#[async_trait]
impl MediaControlSurface for TracingSurface {
    async fn set_metadata(&self, metadata: &MediaMetadata) -> Result<(), MediaControlsError> {
        info!(
            title = ?metadata.title,
            artist = ?metadata.artist,
            duration = ?metadata.duration,
            "Now playing"
        );
        Ok(())
    }

    async fn set_playback(&self, update: &PlaybackUpdate) -> Result<(), MediaControlsError> {
        debug!(
            playing = update.playing,
            position = ?update.position,
            rate = update.rate,
            "Media controls playback state"
        );
        *self.shown.lock() = Some(*update);
        Ok(())
    }

    async fn clear(&self) -> Result<(), MediaControlsError> {
        debug!("Media controls cleared");
        self.shown.lock().take();
        Ok(())
    }

    fn events(&self) -> broadcast::Receiver<ControlEvent> {
        self.bus.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_tracing_surface_keeps_last_state() {
        let surface = TracingSurface::new();
        let update = PlaybackUpdate {
            playing: true,
            position: Duration::from_secs(3),
            rate: 1.5,
        };

        surface.set_playback(&update).await.unwrap();
        assert_eq!(surface.shown(), Some(update));
        surface.clear().await.unwrap();
        assert_eq!(surface.shown(), None);
    }

    #[tokio::test]
    async fn test_bus_fans_out() {
        let surface = TracingSurface::new();
        assert!(!surface.bus().emit(ControlEvent::Play));

        let mut a = surface.events();
        let mut b = surface.events();
        assert!(surface.bus().emit(ControlEvent::Next));
        assert_eq!(a.recv().await.unwrap(), ControlEvent::Next);
        assert_eq!(b.recv().await.unwrap(), ControlEvent::Next);
    }
}
