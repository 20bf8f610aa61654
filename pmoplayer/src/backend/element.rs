//! Browser media element adapter.
//!
//! The element itself lives on the host side (a web page, a webview). The
//! adapter only speaks to it through two channels: [`ElementCommand`]s go
//! out, [`ElementEvent`]s mirroring the DOM media events come back. Whatever
//! owns the element drives an [`ElementHost`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::backend::capabilities::{AudioOutputControl, TransportControl, VolumeControl};
use crate::backend::{BackendFactory, BackendKind, PlaybackBackend, UpdateSink};
use crate::errors::PlayerError;
use crate::model::{AudioDevice, Media, MediaInfo, Tracks};
use crate::reconcile::BackendUpdate;

/// Instruction for the host-side media element.
#[derive(Clone, Debug, PartialEq)]
pub enum ElementCommand {
    Load { src: String },
    Play,
    Pause,
    Seek(Duration),
    /// Element volume, on the `[0, 1]` scale.
    SetVolume(f64),
    SetRate(f64),
    /// `HTMLMediaElement.setSinkId()`.
    SetSinkId(String),
    Unload,
}

/// DOM media events reported by the host.
#[derive(Clone, Debug, PartialEq)]
pub enum ElementEvent {
    LoadedMetadata { duration: Duration },
    TimeUpdate { position: Duration },
    Playing,
    Pause,
    Waiting,
    CanPlay,
    Ended,
    Progress { buffered: Duration },
    /// Element volume, on the `[0, 1]` scale.
    VolumeChange { volume: f64 },
    RateChange { rate: f64 },
    Error(String),
}

/// Host side of one element adapter.
pub struct ElementHost {
    commands: mpsc::UnboundedReceiver<ElementCommand>,
    events: mpsc::UnboundedSender<ElementEvent>,
}

impl ElementHost {
    /// Next command for the element, `None` once the adapter is gone.
    pub async fn recv_command(&mut self) -> Option<ElementCommand> {
        self.commands.recv().await
    }

    pub fn try_recv_command(&mut self) -> Option<ElementCommand> {
        self.commands.try_recv().ok()
    }

    /// Reports one element event. Returns `false` once the adapter is gone.
    pub fn emit(&self, event: ElementEvent) -> bool {
        self.events.send(event).is_ok()
    }
}

type LoadWaiter = Arc<Mutex<Option<oneshot::Sender<Result<Duration, PlayerError>>>>>;

pub struct ElementBackend {
    commands: mpsc::UnboundedSender<ElementCommand>,
    load_waiter: LoadWaiter,
    pump: Mutex<Option<JoinHandle<()>>>,
    released: AtomicBool,
}

/// Builds an adapter and the host end it talks to.
pub fn element_pair(sink: UpdateSink) -> (ElementBackend, ElementHost) {
    let (commands_tx, commands_rx) = mpsc::unbounded_channel();
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let load_waiter: LoadWaiter = Arc::new(Mutex::new(None));

    let pump = tokio::spawn(pump_events(events_rx, sink, load_waiter.clone()));

    let backend = ElementBackend {
        commands: commands_tx,
        load_waiter,
        pump: Mutex::new(Some(pump)),
        released: AtomicBool::new(false),
    };
    let host = ElementHost {
        commands: commands_rx,
        events: events_tx,
    };
    (backend, host)
}

impl ElementBackend {
    fn send(&self, command: ElementCommand) -> Result<(), PlayerError> {
        if self.released.load(Ordering::SeqCst) {
            return Err(PlayerError::ipc("element released"));
        }
        self.commands
            .send(command)
            .map_err(|_| PlayerError::ipc("element host detached"))
    }
}

#[async_trait]
impl TransportControl for ElementBackend {
    async fn play(&self) -> Result<(), PlayerError> {
        self.send(ElementCommand::Play)
    }

    async fn pause(&self) -> Result<(), PlayerError> {
        self.send(ElementCommand::Pause)
    }

    async fn seek(&self, position: Duration) -> Result<(), PlayerError> {
        self.send(ElementCommand::Seek(position))
    }
}

#[async_trait]
impl VolumeControl for ElementBackend {
    async fn set_volume(&self, volume: f64) -> Result<(), PlayerError> {
        self.send(ElementCommand::SetVolume(volume / 100.0))
    }

    async fn set_rate(&self, rate: f64) -> Result<(), PlayerError> {
        self.send(ElementCommand::SetRate(rate))
    }
}

#[async_trait]
impl AudioOutputControl for ElementBackend {
    async fn set_audio_device(&self, device: &AudioDevice) -> Result<(), PlayerError> {
        self.send(ElementCommand::SetSinkId(device.name.clone()))
    }

    /// A media element always decodes, it cannot bitstream to the output.
    async fn set_audio_passthrough(&self, _enabled: bool) -> Result<(), PlayerError> {
        Err(PlayerError::unsupported(
            "set_audio_passthrough",
            BackendKind::Element,
        ))
    }
}

#[async_trait]
impl PlaybackBackend for ElementBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Element
    }

    async fn open(&self, media: &Media) -> Result<MediaInfo, PlayerError> {
        let (tx, rx) = oneshot::channel();
        *self.load_waiter.lock() = Some(tx);

        if let Err(e) = self.send(ElementCommand::Load {
            src: media.uri.clone(),
        }) {
            self.load_waiter.lock().take();
            return Err(PlayerError::Open(e.to_string()));
        }

        let duration = match rx.await {
            Ok(result) => result?,
            Err(_) => return Err(PlayerError::Open("element host detached".into())),
        };

        Ok(MediaInfo {
            duration,
            tracks: Tracks::default(),
        })
    }

    async fn release(&self) {
        if self.released.swap(true, Ordering::SeqCst) {
            return;
        }
        self.load_waiter.lock().take();
        // L'hôte peut déjà être parti
        let _ = self.commands.send(ElementCommand::Unload);
        let pump = self.pump.lock().take();
        if let Some(pump) = pump {
            pump.abort();
        }
        debug!("Element released");
    }

    fn volume(&self) -> Option<&dyn VolumeControl> {
        Some(self)
    }

    fn audio_output(&self) -> Option<&dyn AudioOutputControl> {
        Some(self)
    }
}

/// Hands every created adapter's host end to whoever owns the elements.
pub struct ElementFactory {
    hosts: mpsc::UnboundedSender<ElementHost>,
}

impl ElementFactory {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ElementHost>) {
        let (hosts, rx) = mpsc::unbounded_channel();
        (Self { hosts }, rx)
    }
}

#[async_trait]
impl BackendFactory for ElementFactory {
    fn kind(&self) -> BackendKind {
        BackendKind::Element
    }

    async fn create(&self, sink: UpdateSink) -> Result<Box<dyn PlaybackBackend>, PlayerError> {
        let (backend, host) = element_pair(sink);
        if self.hosts.send(host).is_err() {
            backend.release().await;
            return Err(PlayerError::Open("no element host attached".into()));
        }
        Ok(Box::new(backend))
    }
}

async fn pump_events(
    mut events: mpsc::UnboundedReceiver<ElementEvent>,
    sink: UpdateSink,
    load_waiter: LoadWaiter,
) {
    while let Some(event) = events.recv().await {
        match &event {
            ElementEvent::LoadedMetadata { duration } => {
                if let Some(waiter) = load_waiter.lock().take() {
                    let _ = waiter.send(Ok(*duration));
                }
            }
            ElementEvent::Error(message) => {
                warn!(error = %message, "Media element error");
                if let Some(waiter) = load_waiter.lock().take() {
                    let _ = waiter.send(Err(PlayerError::Open(message.clone())));
                }
            }
            _ => {}
        }

        for update in element_updates(event) {
            if !sink.send(update) {
                return;
            }
        }
    }
}

fn element_updates(event: ElementEvent) -> Vec<BackendUpdate> {
    match event {
        ElementEvent::LoadedMetadata { duration } => vec![BackendUpdate::Duration(duration)],
        ElementEvent::TimeUpdate { position } => vec![BackendUpdate::Position(position)],
        ElementEvent::Playing => vec![
            BackendUpdate::Playing(true),
            BackendUpdate::Buffering(false),
            BackendUpdate::Completed(false),
        ],
        ElementEvent::Pause => vec![BackendUpdate::Playing(false)],
        ElementEvent::Waiting => vec![BackendUpdate::Buffering(true)],
        ElementEvent::CanPlay => vec![BackendUpdate::Buffering(false)],
        ElementEvent::Ended => vec![
            BackendUpdate::Completed(true),
            BackendUpdate::Playing(false),
        ],
        ElementEvent::Progress { buffered } => vec![BackendUpdate::Buffer(buffered)],
        ElementEvent::VolumeChange { volume } => vec![BackendUpdate::Volume(volume * 100.0)],
        ElementEvent::RateChange { rate } => vec![BackendUpdate::Rate(rate)],
        ElementEvent::Error(message) => vec![BackendUpdate::Error(message)],
    }
}
