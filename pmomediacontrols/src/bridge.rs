//! Glue between a [`PlayerCore`] and the OS media controls.
//!
//! The bridge follows the player's `playing`, `position` and `rate` streams
//! and feeds the [`ThrottledPublisher`]. Discrete changes (play/pause
//! toggles, rate changes, position jumps) bypass the throttle. In the other
//! direction `play` and `pause` from the surface become player commands,
//! while `next` and `previous` are handed back to the application, which owns
//! the playlist.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use pmoplayer::PlayerCore;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::MediaControlsError;
use crate::publisher::ThrottledPublisher;
use crate::surface::{CONTROL_EVENT_CAPACITY, ControlEvent, PlaybackUpdate};

/// A position change larger than this is a seek, not playback progress.
pub const SEEK_JUMP_THRESHOLD: Duration = Duration::from_secs(2);

pub struct MediaControlsBridge {
    navigation: broadcast::Sender<ControlEvent>,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl MediaControlsBridge {
    pub fn spawn(player: PlayerCore, publisher: Arc<ThrottledPublisher>) -> Self {
        let (navigation, _) = broadcast::channel(CONTROL_EVENT_CAPACITY);
        let cancel = CancellationToken::new();

        // Abonnement immédiat : rien de ce qui suit spawn() n'est perdu
        let subscriptions = Subscriptions::new(&player, &publisher);
        let task = tokio::spawn(run(
            player,
            publisher,
            subscriptions,
            navigation.clone(),
            cancel.clone(),
        ));

        Self {
            navigation,
            cancel,
            task: Mutex::new(Some(task)),
        }
    }

    /// `next` / `previous` requests from the OS controls.
    pub fn navigation(&self) -> broadcast::Receiver<ControlEvent> {
        self.navigation.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Stops following the player. The surface is left as is.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let task = self.task.lock().take();
        if let Some(task) = task {
            let _ = task.await;
        }
    }
}

impl Drop for MediaControlsBridge {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn is_jump(previous: Duration, next: Duration) -> bool {
    let delta = if next > previous {
        next - previous
    } else {
        previous - next
    };
    delta > SEEK_JUMP_THRESHOLD
}

enum Step {
    Continue,
    Stop,
}

enum Received<T> {
    Value(T),
    Skip,
    Closed,
}

fn received<T>(result: Result<T, RecvError>, stream: &str) -> Received<T> {
    match result {
        Ok(value) => Received::Value(value),
        Err(RecvError::Lagged(skipped)) => {
            debug!(stream, skipped, "Media controls bridge lagging");
            Received::Skip
        }
        Err(RecvError::Closed) => Received::Closed,
    }
}

struct Subscriptions {
    playing: broadcast::Receiver<bool>,
    position: broadcast::Receiver<Duration>,
    rate: broadcast::Receiver<f64>,
    controls: broadcast::Receiver<ControlEvent>,
    initial: PlaybackUpdate,
}

impl Subscriptions {
    fn new(player: &PlayerCore, publisher: &ThrottledPublisher) -> Self {
        let streams = player.streams();
        let state = player.state();
        Self {
            playing: streams.playing(),
            position: streams.position(),
            rate: streams.rate(),
            controls: publisher.surface().events(),
            initial: PlaybackUpdate {
                playing: state.playing,
                position: state.position,
                rate: state.rate,
            },
        }
    }
}

async fn run(
    player: PlayerCore,
    publisher: Arc<ThrottledPublisher>,
    subscriptions: Subscriptions,
    navigation: broadcast::Sender<ControlEvent>,
    cancel: CancellationToken,
) {
    let Subscriptions {
        mut playing,
        mut position,
        mut rate,
        mut controls,
        initial,
    } = subscriptions;
    let mut controls_open = true;
    let mut current = initial;

    loop {
        let force = tokio::select! {
            biased;

            _ = cancel.cancelled() => return,

            result = playing.recv() => match received(result, "playing") {
                Received::Value(value) => {
                    let changed = value != current.playing;
                    current.playing = value;
                    changed
                }
                Received::Skip => continue,
                Received::Closed => break,
            },

            result = rate.recv() => match received(result, "rate") {
                Received::Value(value) => {
                    let changed = value != current.rate;
                    current.rate = value;
                    changed
                }
                Received::Skip => continue,
                Received::Closed => break,
            },

            result = position.recv() => match received(result, "position") {
                Received::Value(value) => {
                    let jumped = is_jump(current.position, value);
                    current.position = value;
                    jumped
                }
                Received::Skip => continue,
                Received::Closed => break,
            },

            result = controls.recv(), if controls_open => {
                match received(result, "controls") {
                    Received::Value(event) => match handle_control(&player, &navigation, event).await {
                        Step::Continue => continue,
                        Step::Stop => break,
                    },
                    Received::Skip => continue,
                    // La surface n'émet plus, on continue de la nourrir
                    Received::Closed => {
                        controls_open = false;
                        continue;
                    }
                }
            }
        };

        match publisher.update_playback_state(current, force).await {
            Ok(_) => {}
            Err(MediaControlsError::Disposed) => return,
            Err(e) => warn!(error = %e, "Failed to update media controls"),
        }
    }

    debug!("Player streams closed, clearing media controls");
    if let Err(e) = publisher.clear().await {
        warn!(error = %e, "Failed to clear media controls");
    }
}

async fn handle_control(
    player: &PlayerCore,
    navigation: &broadcast::Sender<ControlEvent>,
    event: ControlEvent,
) -> Step {
    debug!(event = %event, "Media control event");
    let result = match event {
        ControlEvent::Play => player.play().await,
        ControlEvent::Pause => player.pause().await,
        ControlEvent::Next | ControlEvent::Previous => {
            if navigation.send(event).is_err() {
                debug!(event = %event, "No listener for navigation event");
            }
            Ok(())
        }
    };

    match result {
        Ok(()) => Step::Continue,
        Err(e) if e.is_disposed() => Step::Stop,
        Err(e) => {
            warn!(event = %event, error = %e, "Media control command failed");
            Step::Continue
        }
    }
}
