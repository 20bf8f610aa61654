//! Leading-edge throttle in front of a [`MediaControlSurface`].
//!
//! The first playback update of a window goes out at once and opens the
//! window; anything else arriving before the window elapses is dropped, not
//! queued. A forced update always goes out and reopens the window. Metadata
//! is never throttled.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::error::MediaControlsError;
use crate::surface::{MediaControlSurface, MediaMetadata, PlaybackUpdate};

pub const DEFAULT_THROTTLE_WINDOW: Duration = Duration::from_millis(1000);

#[derive(Debug, Default)]
struct Window {
    opened_at: Option<Instant>,
    disposed: bool,
}

pub struct ThrottledPublisher {
    surface: Arc<dyn MediaControlSurface>,
    window: Duration,
    state: Mutex<Window>,
}

impl ThrottledPublisher {
    pub fn new(surface: Arc<dyn MediaControlSurface>, window: Duration) -> Self {
        Self {
            surface,
            window,
            state: Mutex::new(Window::default()),
        }
    }

    pub fn surface(&self) -> &Arc<dyn MediaControlSurface> {
        &self.surface
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn is_disposed(&self) -> bool {
        self.state.lock().disposed
    }

    /// Pushes metadata straight to the surface.
    pub async fn set_metadata(&self, metadata: &MediaMetadata) -> Result<(), MediaControlsError> {
        if self.is_disposed() {
            return Err(MediaControlsError::Disposed);
        }
        self.surface.set_metadata(metadata).await
    }

    /// Returns whether the update reached the surface.
    pub async fn update_playback_state(
        &self,
        update: PlaybackUpdate,
        force: bool,
    ) -> Result<bool, MediaControlsError> {
        {
            let mut state = self.state.lock();
            if state.disposed {
                return Err(MediaControlsError::Disposed);
            }
            let now = Instant::now();
            let within = state
                .opened_at
                .is_some_and(|opened| now.duration_since(opened) < self.window);
            if within && !force {
                trace!(position = ?update.position, "Playback update throttled");
                return Ok(false);
            }
            state.opened_at = Some(now);
        }

        self.surface.set_playback(&update).await?;
        Ok(true)
    }

    /// Closes the current window and blanks the surface.
    pub async fn clear(&self) -> Result<(), MediaControlsError> {
        {
            let mut state = self.state.lock();
            if state.disposed {
                return Ok(());
            }
            state.opened_at = None;
        }
        self.surface.clear().await
    }

    /// Clears the surface once; every later call is refused.
    pub async fn dispose(&self) -> Result<(), MediaControlsError> {
        {
            let mut state = self.state.lock();
            if state.disposed {
                return Ok(());
            }
            state.disposed = true;
            state.opened_at = None;
        }
        debug!("Media controls publisher disposed");
        self.surface.clear().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::TracingSurface;

    fn at(secs: u64) -> PlaybackUpdate {
        PlaybackUpdate {
            playing: true,
            position: Duration::from_secs(secs),
            rate: 1.0,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_reopens_after_elapsing() {
        let surface = Arc::new(TracingSurface::new());
        let publisher = ThrottledPublisher::new(surface.clone(), DEFAULT_THROTTLE_WINDOW);

        assert!(publisher.update_playback_state(at(1), false).await.unwrap());
        tokio::time::advance(Duration::from_millis(999)).await;
        assert!(!publisher.update_playback_state(at(2), false).await.unwrap());
        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(publisher.update_playback_state(at(3), false).await.unwrap());
        assert_eq!(surface.shown(), Some(at(3)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_resets_window() {
        let surface = Arc::new(TracingSurface::new());
        let publisher = ThrottledPublisher::new(surface.clone(), DEFAULT_THROTTLE_WINDOW);

        assert!(publisher.update_playback_state(at(1), false).await.unwrap());
        publisher.clear().await.unwrap();
        assert_eq!(surface.shown(), None);
        assert!(publisher.update_playback_state(at(2), false).await.unwrap());
    }

    #[tokio::test]
    async fn test_dispose_is_idempotent_and_final() {
        let surface = Arc::new(TracingSurface::new());
        let publisher = ThrottledPublisher::new(surface.clone(), DEFAULT_THROTTLE_WINDOW);
        publisher.update_playback_state(at(1), false).await.unwrap();

        publisher.dispose().await.unwrap();
        publisher.dispose().await.unwrap();
        assert_eq!(surface.shown(), None);
        assert!(matches!(
            publisher.update_playback_state(at(2), true).await,
            Err(MediaControlsError::Disposed)
        ));
        assert!(publisher.set_metadata(&MediaMetadata::default()).await.is_err());
    }
}
