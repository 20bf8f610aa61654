//! mpv adapter, driven over its JSON IPC socket.
//!
//! The same engine backs two kinds: [`BackendKind::Native`] lets mpv manage
//! its own video output, [`BackendKind::Windowed`] forces a persistent OS
//! window and adds the visibility capability.

mod ipc;
mod transport;

pub use ipc::MpvIpc;

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, trace, warn};

use crate::backend::capabilities::{
    AudioOutputControl, PropertyPassthrough, TrackControl, TransportControl, VisibilityControl,
    VolumeControl,
};
use crate::backend::{BackendFactory, BackendKind, PlaybackBackend, UpdateSink};
use crate::errors::PlayerError;
use crate::model::{
    AudioDevice, AudioTrack, ExternalSubtitle, Media, MediaInfo, PlayerLog, Rect, SubtitleTrack,
    TrackSelection, Tracks,
};
use crate::reconcile::BackendUpdate;

use transport::IpcStream;

/// Formats handed to the output untouched when passthrough is on.
const PASSTHROUGH_CODECS: &str = "ac3,eac3,dts,dts-hd,truehd";

/// Properties observed for the whole life of the engine, in id order.
const OBSERVED: &[&str] = &[
    "pause",
    "paused-for-cache",
    "eof-reached",
    "time-pos",
    "duration",
    "demuxer-cache-time",
    "volume",
    "speed",
    "track-list",
    "audio-device",
    "audio-device-list",
];

#[derive(Clone, Debug)]
pub struct MpvOptions {
    /// Executable to spawn.
    pub binary: String,
    /// Where IPC sockets are created. `None` means the system temp dir.
    /// Ignored on Windows, where mpv listens on a named pipe.
    pub socket_dir: Option<PathBuf>,
    /// Attach to an already running mpv (socket path or pipe name) instead
    /// of spawning one.
    pub attach_socket: Option<PathBuf>,
    pub hwdec: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub extra_args: Vec<String>,
}

impl Default for MpvOptions {
    fn default() -> Self {
        Self {
            binary: "mpv".to_string(),
            socket_dir: None,
            attach_socket: None,
            hwdec: "auto-safe".to_string(),
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(5),
            extra_args: Vec::new(),
        }
    }
}

type LoadWaiter = Arc<Mutex<Option<oneshot::Sender<Result<(), PlayerError>>>>>;

pub struct MpvBackend {
    kind: BackendKind,
    ipc: MpvIpc,
    child: tokio::sync::Mutex<Option<Child>>,
    /// Endpoint we created and must clean up.
    owned_socket: Option<PathBuf>,
    load_waiter: LoadWaiter,
    events_task: Mutex<Option<JoinHandle<()>>>,
    released: AtomicBool,
}

impl MpvBackend {
    /// Spawns a private mpv process and connects to its IPC socket.
    pub async fn spawn(
        kind: BackendKind,
        options: &MpvOptions,
        sink: UpdateSink,
    ) -> Result<Self, PlayerError> {
        let socket = transport::private_endpoint(options.socket_dir.as_deref());

        let mut cmd = Command::new(&options.binary);
        cmd.arg("--idle=yes")
            .arg("--no-terminal")
            .arg(format!("--input-ipc-server={}", socket.display()))
            .arg("--keep-open=yes")
            .arg(format!("--hwdec={}", options.hwdec))
            .arg("--pause=yes")
            .arg(if kind == BackendKind::Windowed {
                "--force-window=yes"
            } else {
                "--force-window=no"
            })
            .args(&options.extra_args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| {
            PlayerError::Open(format!("cannot spawn '{}': {}", options.binary, e))
        })?;
        info!(
            backend = %kind,
            pid = ?child.id(),
            socket = %socket.display(),
            "mpv spawned"
        );

        let stream = match connect_with_retry(&socket, options.connect_timeout).await {
            Ok(stream) => stream,
            Err(e) => {
                let _ = child.kill().await;
                transport::cleanup(&socket).await;
                return Err(e);
            }
        };

        Self::start(kind, stream, Some(child), Some(socket), options, sink).await
    }

    /// Attaches to an mpv already listening on `socket`. The process is left
    /// running on release.
    pub async fn attach(
        kind: BackendKind,
        socket: &Path,
        options: &MpvOptions,
        sink: UpdateSink,
    ) -> Result<Self, PlayerError> {
        let stream = connect_with_retry(socket, options.connect_timeout).await?;
        debug!(backend = %kind, socket = %socket.display(), "Attached to mpv");
        Self::start(kind, stream, None, None, options, sink).await
    }

    async fn start(
        kind: BackendKind,
        stream: IpcStream,
        child: Option<Child>,
        owned_socket: Option<PathBuf>,
        options: &MpvOptions,
        sink: UpdateSink,
    ) -> Result<Self, PlayerError> {
        let (ipc, events) = MpvIpc::from_stream(stream, options.request_timeout);
        let load_waiter: LoadWaiter = Arc::new(Mutex::new(None));

        let events_task = tokio::spawn(event_loop(events, sink, load_waiter.clone()));

        let backend = Self {
            kind,
            ipc,
            child: tokio::sync::Mutex::new(child),
            owned_socket,
            load_waiter,
            events_task: Mutex::new(Some(events_task)),
            released: AtomicBool::new(false),
        };

        if let Err(e) = backend.subscribe().await {
            backend.release_inner().await;
            return Err(e);
        }
        Ok(backend)
    }

    async fn subscribe(&self) -> Result<(), PlayerError> {
        self.ipc
            .command(["request_log_messages", "warn"])
            .await?;
        for (index, name) in OBSERVED.iter().enumerate() {
            self.ipc.observe_property(index as u64 + 1, name).await?;
        }
        Ok(())
    }

    fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }

    fn check_live(&self) -> Result<(), PlayerError> {
        if self.is_released() {
            return Err(PlayerError::ipc("engine released"));
        }
        Ok(())
    }

    async fn set_string(&self, name: &str, value: &str) -> Result<(), PlayerError> {
        self.check_live()?;
        self.ipc
            .command(["set", name, value])
            .await
            .map(|_| ())
            .map_err(|e| PlayerError::property(name, e.to_string()))
    }

    async fn release_inner(&self) {
        if self.released.swap(true, Ordering::SeqCst) {
            return;
        }

        // Un open en cours ne doit pas attendre un fichier qui ne viendra pas
        self.load_waiter.lock().take();

        let farewell = if self.child.lock().await.is_some() {
            "quit"
        } else {
            "stop"
        };
        if let Err(e) = self.ipc.command([farewell]).await {
            debug!(error = %e, "mpv did not acknowledge {}", farewell);
        }
        self.ipc.shutdown().await;

        let events_task = self.events_task.lock().take();
        if let Some(task) = events_task {
            task.abort();
        }

        if let Some(mut child) = self.child.lock().await.take() {
            match tokio::time::timeout(Duration::from_secs(2), child.wait()).await {
                Ok(Ok(status)) => debug!(%status, "mpv exited"),
                Ok(Err(e)) => warn!(error = %e, "Waiting for mpv failed"),
                Err(_) => {
                    warn!("mpv did not quit in time, killing it");
                    let _ = child.kill().await;
                }
            }
        }

        if let Some(socket) = &self.owned_socket {
            transport::cleanup(socket).await;
        }
        debug!(backend = %self.kind, "mpv released");
    }
}

#[async_trait]
impl TransportControl for MpvBackend {
    async fn play(&self) -> Result<(), PlayerError> {
        self.check_live()?;
        self.ipc.set_property("pause", json!(false)).await
    }

    async fn pause(&self) -> Result<(), PlayerError> {
        self.check_live()?;
        self.ipc.set_property("pause", json!(true)).await
    }

    async fn seek(&self, position: Duration) -> Result<(), PlayerError> {
        self.check_live()?;
        self.ipc
            .request(vec![
                json!("seek"),
                json!(position.as_secs_f64()),
                json!("absolute"),
            ])
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl PlaybackBackend for MpvBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    async fn open(&self, media: &Media) -> Result<MediaInfo, PlayerError> {
        self.check_live()?;

        let (tx, rx) = oneshot::channel();
        *self.load_waiter.lock() = Some(tx);

        self.ipc.set_property("pause", json!(true)).await?;
        if let Err(e) = self
            .ipc
            .command(["loadfile", media.uri.as_str(), "replace"])
            .await
        {
            self.load_waiter.lock().take();
            return Err(PlayerError::Open(format!("loadfile rejected: {}", e)));
        }

        match rx.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(PlayerError::Open("engine went away while loading".into())),
        }

        let duration = match self.ipc.get_property("duration").await {
            Ok(value) => value.as_f64().map(secs_to_duration).unwrap_or_default(),
            Err(e) => {
                debug!(error = %e, "Duration not available yet");
                Duration::ZERO
            }
        };
        let tracks = match self.ipc.get_property("track-list").await {
            Ok(value) => parse_track_list(&value).0,
            Err(e) => {
                debug!(error = %e, "Track list not available");
                Tracks::default()
            }
        };

        debug!(uri = %media.uri, ?duration, "mpv file loaded");
        Ok(MediaInfo { duration, tracks })
    }

    async fn release(&self) {
        self.release_inner().await;
    }

    fn tracks(&self) -> Option<&dyn TrackControl> {
        Some(self)
    }

    fn volume(&self) -> Option<&dyn VolumeControl> {
        Some(self)
    }

    fn audio_output(&self) -> Option<&dyn AudioOutputControl> {
        Some(self)
    }

    fn properties(&self) -> Option<&dyn PropertyPassthrough> {
        Some(self)
    }

    fn visibility(&self) -> Option<&dyn VisibilityControl> {
        match self.kind {
            BackendKind::Windowed => Some(self),
            _ => None,
        }
    }
}

#[async_trait]
impl TrackControl for MpvBackend {
    async fn select_audio_track(&self, track: &AudioTrack) -> Result<(), PlayerError> {
        self.set_string("aid", &track.id).await
    }

    async fn select_subtitle_track(&self, track: &SubtitleTrack) -> Result<(), PlayerError> {
        // "no" coupe aussi les sous-titres ajoutés par sub-add
        self.set_string("sid", &track.id).await
    }

    async fn add_subtitle_track(
        &self,
        subtitle: &ExternalSubtitle,
        select: bool,
    ) -> Result<(), PlayerError> {
        self.check_live()?;
        let mut args = vec![
            json!("sub-add"),
            json!(subtitle.uri),
            json!(if select { "select" } else { "auto" }),
        ];
        if subtitle.title.is_some() || subtitle.language.is_some() {
            args.push(json!(subtitle.title.clone().unwrap_or_default()));
        }
        if let Some(language) = &subtitle.language {
            args.push(json!(language));
        }
        self.ipc.request(args).await.map(|_| ())
    }
}

#[async_trait]
impl VolumeControl for MpvBackend {
    async fn set_volume(&self, volume: f64) -> Result<(), PlayerError> {
        self.check_live()?;
        self.ipc.set_property("volume", json!(volume)).await
    }

    async fn set_rate(&self, rate: f64) -> Result<(), PlayerError> {
        self.check_live()?;
        self.ipc.set_property("speed", json!(rate)).await
    }
}

#[async_trait]
impl AudioOutputControl for MpvBackend {
    async fn set_audio_device(&self, device: &AudioDevice) -> Result<(), PlayerError> {
        self.set_string("audio-device", &device.name).await
    }

    async fn set_audio_passthrough(&self, enabled: bool) -> Result<(), PlayerError> {
        let codecs = if enabled { PASSTHROUGH_CODECS } else { "" };
        self.set_string("audio-spdif", codecs).await
    }
}

#[async_trait]
impl PropertyPassthrough for MpvBackend {
    async fn set_property(&self, name: &str, value: &str) -> Result<(), PlayerError> {
        self.set_string(name, value).await
    }

    async fn get_property(&self, name: &str) -> Result<Option<String>, PlayerError> {
        self.check_live()?;
        let value = self
            .ipc
            .get_property_string(name)
            .await
            .map_err(|e| PlayerError::property(name, e.to_string()))?;
        Ok(match value {
            Value::Null => None,
            Value::String(s) => Some(s),
            other => Some(other.to_string()),
        })
    }

    async fn command(&self, args: &[String]) -> Result<(), PlayerError> {
        self.check_live()?;
        let name = args.first().map(String::as_str).unwrap_or("");
        self.ipc
            .command(args.iter().map(String::as_str))
            .await
            .map(|_| ())
            .map_err(|e| PlayerError::property(name, e.to_string()))
    }
}

#[async_trait]
impl VisibilityControl for MpvBackend {
    async fn set_visible(&self, visible: bool) -> Result<(), PlayerError> {
        self.check_live()?;
        self.ipc
            .set_property("window-minimized", json!(!visible))
            .await
    }

    async fn set_controls_visible(&self, visible: bool) -> Result<(), PlayerError> {
        self.check_live()?;
        let mode = if visible { "always" } else { "never" };
        self.ipc
            .command(["script-message", "osc-visibility", mode])
            .await
            .map(|_| ())
    }

    async fn update_frame(&self, frame: Rect) -> Result<(), PlayerError> {
        self.set_string("geometry", &frame.to_geometry()).await
    }
}

/// Creates one mpv adapter per opened source.
pub struct MpvFactory {
    kind: BackendKind,
    options: MpvOptions,
}

impl MpvFactory {
    pub fn new(kind: BackendKind, options: MpvOptions) -> Self {
        Self { kind, options }
    }
}

#[async_trait]
impl BackendFactory for MpvFactory {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    async fn create(&self, sink: UpdateSink) -> Result<Box<dyn PlaybackBackend>, PlayerError> {
        let backend = match &self.options.attach_socket {
            Some(socket) => MpvBackend::attach(self.kind, socket, &self.options, sink).await?,
            None => MpvBackend::spawn(self.kind, &self.options, sink).await?,
        };
        Ok(Box::new(backend))
    }
}

async fn connect_with_retry(path: &Path, timeout: Duration) -> Result<IpcStream, PlayerError> {
    let deadline = Instant::now() + timeout;
    loop {
        match transport::connect(path).await {
            Ok(stream) => return Ok(stream),
            Err(e) if Instant::now() >= deadline => {
                return Err(PlayerError::Timeout(format!(
                    "mpv socket {} ({})",
                    path.display(),
                    e
                )));
            }
            Err(_) => tokio::time::sleep(Duration::from_millis(50)).await,
        }
    }
}

/// Translates mpv events into backend updates until the connection closes.
async fn event_loop(
    mut events: mpsc::UnboundedReceiver<Value>,
    sink: UpdateSink,
    load_waiter: LoadWaiter,
) {
    let mut devices: Vec<AudioDevice> = Vec::new();

    while let Some(event) = events.recv().await {
        let name = event.get("event").and_then(Value::as_str).unwrap_or("");
        match name {
            "property-change" => {
                for update in property_updates(&event, &mut devices) {
                    if !sink.send(update) {
                        return;
                    }
                }
            }
            "file-loaded" => {
                if let Some(waiter) = load_waiter.lock().take() {
                    let _ = waiter.send(Ok(()));
                }
            }
            "end-file" => {
                let reason = event.get("reason").and_then(Value::as_str).unwrap_or("");
                if reason == "error" {
                    let cause = event
                        .get("file_error")
                        .and_then(Value::as_str)
                        .unwrap_or("unknown error")
                        .to_string();
                    warn!(cause = %cause, "mpv failed to play file");
                    if let Some(waiter) = load_waiter.lock().take() {
                        let _ = waiter.send(Err(PlayerError::Open(cause.clone())));
                    }
                    sink.send(BackendUpdate::Error(cause));
                }
            }
            "log-message" => {
                let log = parse_log(&event);
                trace_log(&log);
                sink.send(BackendUpdate::Log(log));
            }
            _ => trace!(event = name, "mpv event ignored"),
        }
    }
}

fn property_updates(event: &Value, devices: &mut Vec<AudioDevice>) -> Vec<BackendUpdate> {
    let name = event.get("name").and_then(Value::as_str).unwrap_or("");
    let data = match event.get("data") {
        Some(Value::Null) | None => return Vec::new(),
        Some(data) => data,
    };

    match name {
        "pause" => data
            .as_bool()
            .map(|paused| vec![BackendUpdate::Playing(!paused)])
            .unwrap_or_default(),
        "paused-for-cache" => data
            .as_bool()
            .map(|v| vec![BackendUpdate::Buffering(v)])
            .unwrap_or_default(),
        "eof-reached" => match data.as_bool() {
            Some(true) => vec![
                BackendUpdate::Completed(true),
                BackendUpdate::Playing(false),
            ],
            Some(false) => vec![BackendUpdate::Completed(false)],
            None => Vec::new(),
        },
        "time-pos" => seconds(data, BackendUpdate::Position),
        "duration" => seconds(data, BackendUpdate::Duration),
        "demuxer-cache-time" => seconds(data, BackendUpdate::Buffer),
        "volume" => data
            .as_f64()
            .map(|v| vec![BackendUpdate::Volume(v)])
            .unwrap_or_default(),
        "speed" => data
            .as_f64()
            .map(|v| vec![BackendUpdate::Rate(v)])
            .unwrap_or_default(),
        "track-list" => {
            let (tracks, selection) = parse_track_list(data);
            vec![BackendUpdate::Tracks(tracks), BackendUpdate::Track(selection)]
        }
        "audio-device-list" => {
            *devices = parse_audio_devices(data);
            vec![BackendUpdate::AudioDevices(devices.clone())]
        }
        "audio-device" => match data.as_str() {
            Some(device) => {
                let known = devices.iter().find(|d| d.name == device).cloned();
                vec![BackendUpdate::AudioDevice(
                    known.unwrap_or_else(|| AudioDevice::new(device, "")),
                )]
            }
            None => Vec::new(),
        },
        _ => Vec::new(),
    }
}

fn seconds(data: &Value, update: fn(Duration) -> BackendUpdate) -> Vec<BackendUpdate> {
    data.as_f64()
        .map(|s| vec![update(secs_to_duration(s))])
        .unwrap_or_default()
}

fn secs_to_duration(seconds: f64) -> Duration {
    Duration::try_from_secs_f64(seconds.max(0.0)).unwrap_or_default()
}

/// Splits mpv's `track-list` into available tracks and current selection.
/// Both lists start with the `auto` and `no` entries.
pub(crate) fn parse_track_list(data: &Value) -> (Tracks, TrackSelection) {
    let mut tracks = Tracks {
        audio: vec![AudioTrack::auto(), AudioTrack::no()],
        subtitle: vec![SubtitleTrack::auto(), SubtitleTrack::disabled()],
    };
    let mut audio_selected = None;
    let mut subtitle_selected = None;

    for entry in data.as_array().into_iter().flatten() {
        let Some(id) = entry.get("id").and_then(Value::as_i64) else {
            continue;
        };
        let id = id.to_string();
        let title = entry
            .get("title")
            .and_then(Value::as_str)
            .map(str::to_string);
        let language = entry
            .get("lang")
            .and_then(Value::as_str)
            .map(str::to_string);
        let selected = entry
            .get("selected")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let external = entry
            .get("external-filename")
            .and_then(Value::as_str)
            .filter(|_| {
                entry
                    .get("external")
                    .and_then(Value::as_bool)
                    .unwrap_or(false)
            });

        match entry.get("type").and_then(Value::as_str) {
            Some("audio") => {
                let track = AudioTrack::new(id, title, language);
                if selected {
                    audio_selected = Some(track.clone());
                }
                tracks.audio.push(track);
            }
            Some("sub") => {
                let track = match external {
                    Some(uri) => SubtitleTrack::external(id, uri, title, language),
                    None => SubtitleTrack::new(id, title, language),
                };
                if selected {
                    subtitle_selected = Some(track.clone());
                }
                tracks.subtitle.push(track);
            }
            _ => {}
        }
    }

    let selection = TrackSelection {
        audio: audio_selected.unwrap_or_else(AudioTrack::no),
        subtitle: subtitle_selected.unwrap_or_else(SubtitleTrack::disabled),
    };
    (tracks, selection)
}

fn parse_audio_devices(data: &Value) -> Vec<AudioDevice> {
    data.as_array()
        .into_iter()
        .flatten()
        .filter_map(|entry| {
            let name = entry.get("name").and_then(Value::as_str)?;
            let description = entry
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or(name);
            Some(AudioDevice::new(name, description))
        })
        .collect()
}

fn parse_log(event: &Value) -> PlayerLog {
    let field = |key: &str| {
        event
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string()
    };
    PlayerLog {
        prefix: field("prefix"),
        level: field("level"),
        text: field("text").trim_end().to_string(),
    }
}

fn trace_log(log: &PlayerLog) {
    match log.level.as_str() {
        "fatal" | "error" => error!(prefix = %log.prefix, "mpv: {}", log.text),
        "warn" => warn!(prefix = %log.prefix, "mpv: {}", log.text),
        "info" => info!(prefix = %log.prefix, "mpv: {}", log.text),
        _ => debug!(prefix = %log.prefix, "mpv: {}", log.text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn change(name: &str, data: Value) -> Value {
        json!({"event": "property-change", "id": 1, "name": name, "data": data})
    }

    #[test]
    fn test_property_updates() {
        let mut devices = Vec::new();
        assert_eq!(
            property_updates(&change("pause", json!(false)), &mut devices),
            vec![BackendUpdate::Playing(true)]
        );
        assert_eq!(
            property_updates(&change("time-pos", json!(12.5)), &mut devices),
            vec![BackendUpdate::Position(Duration::from_millis(12_500))]
        );
        assert_eq!(
            property_updates(&change("eof-reached", json!(true)), &mut devices),
            vec![BackendUpdate::Completed(true), BackendUpdate::Playing(false)]
        );
        // mpv envoie null tant que rien n'est chargé
        assert!(property_updates(&change("duration", Value::Null), &mut devices).is_empty());
        assert_eq!(
            property_updates(&change("time-pos", json!(-0.3)), &mut devices),
            vec![BackendUpdate::Position(Duration::ZERO)]
        );
    }

    #[test]
    fn test_audio_device_description_from_list() {
        let mut devices = Vec::new();
        let list = json!([
            {"name": "auto", "description": "Autoselect device"},
            {"name": "pulse/hdmi", "description": "HDMI output"}
        ]);
        let updates = property_updates(&change("audio-device-list", list), &mut devices);
        assert_eq!(devices.len(), 2);
        assert!(matches!(&updates[0], BackendUpdate::AudioDevices(d) if d.len() == 2));

        let updates = property_updates(&change("audio-device", json!("pulse/hdmi")), &mut devices);
        match &updates[0] {
            BackendUpdate::AudioDevice(device) => assert_eq!(device.description, "HDMI output"),
            other => panic!("unexpected update {:?}", other),
        }
    }

    #[test]
    fn test_parse_track_list() {
        let list = json!([
            {"id": 1, "type": "video", "selected": true},
            {"id": 1, "type": "audio", "lang": "eng", "title": "Stereo", "selected": true},
            {"id": 2, "type": "audio", "lang": "fra"},
            {"id": 1, "type": "sub", "lang": "eng"},
            {"id": 2, "type": "sub", "external": true,
             "external-filename": "https://cdn.example/subs.srt?api_key=k", "selected": true}
        ]);
        let (tracks, selection) = parse_track_list(&list);

        assert_eq!(tracks.audio.len(), 4);
        assert_eq!(tracks.subtitle.len(), 4);
        assert_eq!(selection.audio.id, "1");
        assert_eq!(selection.audio.language.as_deref(), Some("eng"));
        assert_eq!(selection.subtitle.id, "2");
        assert!(selection.subtitle.is_external());
    }

    #[test]
    fn test_no_selected_subtitle_is_disabled() {
        let list = json!([{"id": 1, "type": "sub", "lang": "eng"}]);
        let (_, selection) = parse_track_list(&list);
        assert!(selection.subtitle.is_disabled());
    }

    #[test]
    fn test_parse_log() {
        let event = json!({"event": "log-message", "prefix": "ffmpeg", "level": "warn",
                           "text": "stream 0: discarding\n"});
        let log = parse_log(&event);
        assert_eq!(log.prefix, "ffmpeg");
        assert_eq!(log.text, "stream 0: discarding");
    }
}
