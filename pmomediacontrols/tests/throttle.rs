//! Throttle timing with a paused clock.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio::time::Instant;

use pmomediacontrols::{
    ControlEvent, ControlEventBus, MediaControlSurface, MediaControlsError, MediaMetadata,
    PlaybackUpdate, ThrottledPublisher,
};

#[derive(Default)]
struct RecordingSurface {
    bus: ControlEventBus,
    playback: Mutex<Vec<(Instant, PlaybackUpdate)>>,
    metadata: Mutex<Vec<MediaMetadata>>,
}

impl RecordingSurface {
    fn deliveries(&self) -> Vec<(Instant, PlaybackUpdate)> {
        self.playback.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaControlSurface for RecordingSurface {
    async fn set_metadata(&self, metadata: &MediaMetadata) -> Result<(), MediaControlsError> {
        self.metadata.lock().unwrap().push(metadata.clone());
        Ok(())
    }

    async fn set_playback(&self, update: &PlaybackUpdate) -> Result<(), MediaControlsError> {
        self.playback.lock().unwrap().push((Instant::now(), *update));
        Ok(())
    }

    async fn clear(&self) -> Result<(), MediaControlsError> {
        Ok(())
    }

    fn events(&self) -> broadcast::Receiver<ControlEvent> {
        self.bus.subscribe()
    }
}

fn at(millis: u64) -> PlaybackUpdate {
    PlaybackUpdate {
        playing: true,
        position: Duration::from_millis(millis),
        rate: 1.0,
    }
}

fn publisher() -> (Arc<RecordingSurface>, ThrottledPublisher) {
    let surface = Arc::new(RecordingSurface::default());
    let publisher = ThrottledPublisher::new(surface.clone(), Duration::from_secs(1));
    (surface, publisher)
}

#[tokio::test(start_paused = true)]
async fn test_burst_delivers_once_then_forced_goes_through() {
    let (surface, publisher) = publisher();
    let start = Instant::now();

    assert!(publisher.update_playback_state(at(0), false).await.unwrap());
    tokio::time::advance(Duration::from_millis(100)).await;
    assert!(!publisher.update_playback_state(at(100), false).await.unwrap());
    tokio::time::advance(Duration::from_millis(100)).await;
    assert!(!publisher.update_playback_state(at(200), false).await.unwrap());

    assert_eq!(surface.deliveries().len(), 1);

    tokio::time::advance(Duration::from_millis(50)).await;
    assert!(publisher.update_playback_state(at(250), true).await.unwrap());

    let deliveries = surface.deliveries();
    assert_eq!(deliveries.len(), 2);
    assert_eq!(deliveries[0].1, at(0));
    assert_eq!(deliveries[1].1, at(250));
    assert_eq!(deliveries[1].0 - start, Duration::from_millis(250));
}

#[tokio::test(start_paused = true)]
async fn test_dropped_updates_are_not_replayed() {
    let (surface, publisher) = publisher();

    publisher.update_playback_state(at(0), false).await.unwrap();
    publisher.update_playback_state(at(500), false).await.unwrap();
    tokio::time::advance(Duration::from_secs(5)).await;

    assert_eq!(surface.deliveries().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_metadata_is_never_throttled() {
    let (surface, publisher) = publisher();
    let metadata = MediaMetadata {
        title: Some("Episode 1".into()),
        duration: Duration::from_secs(1500),
        ..MediaMetadata::default()
    };

    publisher.update_playback_state(at(0), false).await.unwrap();
    for _ in 0..3 {
        publisher.set_metadata(&metadata).await.unwrap();
    }

    assert_eq!(surface.metadata.lock().unwrap().len(), 3);
}
