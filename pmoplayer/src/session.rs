//! State synchronization core.
//!
//! ## Architecture
//!
//! Each [`PlayerCore`] owns one session task, the event loop of the
//! playback session. The handle only sends commands over a channel and
//! awaits the reply, so every command and every backend observation is
//! applied by that single task, one after the other:
//!
//! - commands are executed against the live adapter, if any
//! - backend updates are reconciled against the current [`PlayerState`]
//! - the resulting per-field events are pushed to [`PlayerStreams`]
//!
//! Backend updates are tagged with the generation of the adapter that
//! produced them; anything from a released adapter is dropped on arrival.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::backend::{BackendFactory, BackendKind, PlaybackBackend, UpdateSink};
use crate::errors::PlayerError;
use crate::model::{
    AudioDevice, AudioTrack, ExternalSubtitle, Media, MediaInfo, PlayerState, Rect,
    SubtitleTrack, Tracks, clamp_rate, clamp_volume,
};
use crate::reconcile::{BackendUpdate, Reconciled, reconcile, reset_playback};
use crate::streams::{DEFAULT_STREAM_CAPACITY, PlayerEvent, PlayerStreams};

const COMMAND_QUEUE: usize = 64;

/// A reported position this close to the seek target confirms the seek.
const SEEK_SETTLE_TOLERANCE: Duration = Duration::from_secs(1);
/// After this long the engine's positions are trusted again, confirmed or not.
const SEEK_SETTLE_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Clone, Debug)]
pub struct CoreOptions {
    /// Upper bound for creating the adapter and loading the media.
    pub open_timeout: Duration,
    /// Per-field broadcast capacity.
    pub stream_capacity: usize,
}

impl Default for CoreOptions {
    fn default() -> Self {
        Self {
            open_timeout: Duration::from_secs(15),
            stream_capacity: DEFAULT_STREAM_CAPACITY,
        }
    }
}

type Reply<T> = oneshot::Sender<Result<T, PlayerError>>;

enum Command {
    Open {
        media: Media,
        autoplay: bool,
        reply: Reply<()>,
    },
    Play(Reply<()>),
    Pause(Reply<()>),
    PlayOrPause(Reply<()>),
    Stop(Reply<()>),
    Seek(Duration, Reply<()>),
    SelectAudioTrack(AudioTrack, Reply<()>),
    SelectSubtitleTrack(SubtitleTrack, Reply<()>),
    AddSubtitleTrack(ExternalSubtitle, bool, Reply<()>),
    SetVolume(f64, Reply<()>),
    SetRate(f64, Reply<()>),
    SetAudioDevice(AudioDevice, Reply<()>),
    SetProperty(String, String, Reply<()>),
    GetProperty(String, Reply<Option<String>>),
    Raw(Vec<String>, Reply<()>),
    SetAudioPassthrough(bool, Reply<()>),
    SetVisible(bool, Reply<()>),
    SetControlsVisible(bool, Reply<()>),
    UpdateFrame(Rect, Reply<()>),
}

/// Handle on one playback session.
///
/// Cloning the handle shares the session. The session ends on
/// [`dispose`](PlayerCore::dispose) or when the last handle is dropped.
#[derive(Clone)]
pub struct PlayerCore {
    inner: Arc<Inner>,
}

struct Inner {
    kind: BackendKind,
    commands: mpsc::Sender<Command>,
    streams: Arc<PlayerStreams>,
    state: watch::Receiver<PlayerState>,
    cancel: CancellationToken,
    disposed: AtomicBool,
    session: tokio::sync::Mutex<Option<JoinHandle<()>>>,
    /// Volume to restore when unmuting.
    muted_volume: parking_lot::Mutex<Option<f64>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl PlayerCore {
    /// Starts a session on the current tokio runtime. No adapter exists
    /// until the first [`open`](PlayerCore::open).
    pub fn new(factory: Arc<dyn BackendFactory>, options: CoreOptions) -> Self {
        let kind = factory.kind();
        let streams = Arc::new(PlayerStreams::new(options.stream_capacity));
        let (snapshot_tx, snapshot_rx) = watch::channel(PlayerState::default());
        let (commands_tx, commands_rx) = mpsc::channel(COMMAND_QUEUE);
        let (updates_tx, updates_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let session = Session {
            factory,
            backend: None,
            generation: 0,
            opened: false,
            pending_seek: None,
            state: PlayerState::default(),
            snapshot: snapshot_tx,
            streams: streams.clone(),
            updates: updates_tx,
            cancel: cancel.clone(),
            open_timeout: options.open_timeout,
        };
        let handle = tokio::spawn(session.run(commands_rx, updates_rx));
        debug!(backend = %kind, "Player session started");

        Self {
            inner: Arc::new(Inner {
                kind,
                commands: commands_tx,
                streams,
                state: snapshot_rx,
                cancel,
                disposed: AtomicBool::new(false),
                session: tokio::sync::Mutex::new(Some(handle)),
                muted_volume: parking_lot::Mutex::new(None),
            }),
        }
    }

    pub fn kind(&self) -> BackendKind {
        self.inner.kind
    }

    /// Latest snapshot.
    pub fn state(&self) -> PlayerState {
        self.inner.state.borrow().clone()
    }

    /// Per-field change streams.
    pub fn streams(&self) -> &PlayerStreams {
        &self.inner.streams
    }

    pub(crate) fn muted_volume(&self) -> &parking_lot::Mutex<Option<f64>> {
        &self.inner.muted_volume
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    async fn request<T>(&self, build: impl FnOnce(Reply<T>) -> Command) -> Result<T, PlayerError> {
        if self.is_disposed() {
            return Err(PlayerError::Disposed);
        }
        let (tx, rx) = oneshot::channel();
        self.inner
            .commands
            .send(build(tx))
            .await
            .map_err(|_| PlayerError::Disposed)?;
        rx.await.map_err(|_| PlayerError::Disposed)?
    }

    /// Releases the current adapter, then loads `media` on a fresh one.
    ///
    /// Engine failures do not come back as `Err`: they leave the session
    /// unopened, publish empty track lists and land on the `error` stream.
    /// Only a media with no playable URI at all is rejected.
    pub async fn open(&self, media: Media, autoplay: bool) -> Result<(), PlayerError> {
        self.request(|reply| Command::Open {
            media,
            autoplay,
            reply,
        })
        .await
    }

    pub async fn play(&self) -> Result<(), PlayerError> {
        self.request(Command::Play).await
    }

    pub async fn pause(&self) -> Result<(), PlayerError> {
        self.request(Command::Pause).await
    }

    pub async fn play_or_pause(&self) -> Result<(), PlayerError> {
        self.request(Command::PlayOrPause).await
    }

    /// Pause and rewind to the start.
    pub async fn stop(&self) -> Result<(), PlayerError> {
        self.request(Command::Stop).await
    }

    /// Seeks within the opened media. A no-op while nothing is open.
    pub async fn seek(&self, position: Duration) -> Result<(), PlayerError> {
        self.request(|reply| Command::Seek(position, reply)).await
    }

    pub async fn select_audio_track(&self, track: AudioTrack) -> Result<(), PlayerError> {
        self.request(|reply| Command::SelectAudioTrack(track, reply))
            .await
    }

    /// Pass [`SubtitleTrack::disabled()`] to turn subtitles off.
    pub async fn select_subtitle_track(&self, track: SubtitleTrack) -> Result<(), PlayerError> {
        self.request(|reply| Command::SelectSubtitleTrack(track, reply))
            .await
    }

    pub async fn add_subtitle_track(
        &self,
        subtitle: ExternalSubtitle,
        select: bool,
    ) -> Result<(), PlayerError> {
        self.request(|reply| Command::AddSubtitleTrack(subtitle, select, reply))
            .await
    }

    pub async fn set_volume(&self, volume: f64) -> Result<(), PlayerError> {
        self.request(|reply| Command::SetVolume(volume, reply)).await
    }

    pub async fn set_rate(&self, rate: f64) -> Result<(), PlayerError> {
        self.request(|reply| Command::SetRate(rate, reply)).await
    }

    pub async fn set_audio_device(&self, device: AudioDevice) -> Result<(), PlayerError> {
        self.request(|reply| Command::SetAudioDevice(device, reply))
            .await
    }

    /// Raw engine property, passed through verbatim.
    pub async fn set_property(&self, name: &str, value: &str) -> Result<(), PlayerError> {
        let (name, value) = (name.to_string(), value.to_string());
        self.request(|reply| Command::SetProperty(name, value, reply))
            .await
    }

    /// `Ok(None)` when the backend has no such property or rejected the read.
    pub async fn get_property(&self, name: &str) -> Result<Option<String>, PlayerError> {
        let name = name.to_string();
        self.request(|reply| Command::GetProperty(name, reply)).await
    }

    /// Raw engine command.
    pub async fn command<I, S>(&self, args: I) -> Result<(), PlayerError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args: Vec<String> = args.into_iter().map(Into::into).collect();
        self.request(|reply| Command::Raw(args, reply)).await
    }

    pub async fn set_audio_passthrough(&self, enabled: bool) -> Result<(), PlayerError> {
        self.request(|reply| Command::SetAudioPassthrough(enabled, reply))
            .await
    }

    pub async fn set_visible(&self, visible: bool) -> Result<(), PlayerError> {
        self.request(|reply| Command::SetVisible(visible, reply))
            .await
    }

    pub async fn set_controls_visible(&self, visible: bool) -> Result<(), PlayerError> {
        self.request(|reply| Command::SetControlsVisible(visible, reply))
            .await
    }

    pub async fn update_frame(&self, frame: Rect) -> Result<(), PlayerError> {
        self.request(|reply| Command::UpdateFrame(frame, reply))
            .await
    }

    /// Ends the session: cancels an in-flight open, releases the adapter and
    /// closes every stream. Safe to call any number of times.
    pub async fn dispose(&self) {
        self.inner.disposed.store(true, Ordering::SeqCst);
        self.inner.cancel.cancel();

        let mut session = self.inner.session.lock().await;
        if let Some(handle) = session.take() {
            if let Err(e) = handle.await {
                warn!(error = %e, "Player session task ended abnormally");
            }
            info!(backend = %self.inner.kind, "Player session disposed");
        }
    }
}

// ============================================================================
// Session event loop
// ============================================================================

/// Capability commands never fail the caller. An adapter saying it cannot
/// do something is expected and only traced.
fn swallow(operation: &str, error: PlayerError) {
    if error.is_unsupported() {
        debug!(operation, error = %error, "Operation not supported by backend");
    } else {
        warn!(operation, error = %error, "Engine rejected operation");
    }
}

struct Session {
    factory: Arc<dyn BackendFactory>,
    backend: Option<Box<dyn PlaybackBackend>>,
    generation: u64,
    opened: bool,
    pending_seek: Option<PendingSeek>,
    state: PlayerState,
    snapshot: watch::Sender<PlayerState>,
    streams: Arc<PlayerStreams>,
    updates: mpsc::UnboundedSender<(u64, BackendUpdate)>,
    cancel: CancellationToken,
    open_timeout: Duration,
}

/// Seek published but not yet confirmed by the engine.
struct PendingSeek {
    target: Duration,
    issued_at: Instant,
}

enum OpenOutcome {
    Loaded(Box<dyn PlaybackBackend>, MediaInfo),
    Failed(Option<Box<dyn PlaybackBackend>>, PlayerError),
    Cancelled(Option<Box<dyn PlaybackBackend>>),
}

impl Session {
    async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut updates: mpsc::UnboundedReceiver<(u64, BackendUpdate)>,
    ) {
        let cancel = self.cancel.clone();
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                Some((generation, update)) = updates.recv() => self.ingest(generation, update),
                command = commands.recv() => match command {
                    Some(command) => self.handle(command).await,
                    None => break,
                },
            }
        }
        self.shutdown().await;
    }

    async fn handle(&mut self, command: Command) {
        match command {
            Command::Open {
                media,
                autoplay,
                reply,
            } => {
                let result = self.open(media, autoplay).await;
                let _ = reply.send(result);
            }
            Command::Play(reply) => {
                let _ = reply.send(self.play().await);
            }
            Command::Pause(reply) => {
                let _ = reply.send(self.pause().await);
            }
            Command::PlayOrPause(reply) => {
                let result = if self.state.playing {
                    self.pause().await
                } else {
                    self.play().await
                };
                let _ = reply.send(result);
            }
            Command::Stop(reply) => {
                let result = match self.pause().await {
                    Ok(()) => self.seek(Duration::ZERO).await,
                    Err(e) => Err(e),
                };
                let _ = reply.send(result);
            }
            Command::Seek(position, reply) => {
                let _ = reply.send(self.seek(position).await);
            }
            Command::SelectAudioTrack(track, reply) => {
                self.select_audio_track(track).await;
                let _ = reply.send(Ok(()));
            }
            Command::SelectSubtitleTrack(track, reply) => {
                self.select_subtitle_track(track).await;
                let _ = reply.send(Ok(()));
            }
            Command::AddSubtitleTrack(subtitle, select, reply) => {
                self.add_subtitle_track(&subtitle, select).await;
                let _ = reply.send(Ok(()));
            }
            Command::SetVolume(volume, reply) => {
                self.set_volume(volume).await;
                let _ = reply.send(Ok(()));
            }
            Command::SetRate(rate, reply) => {
                self.set_rate(rate).await;
                let _ = reply.send(Ok(()));
            }
            Command::SetAudioDevice(device, reply) => {
                if let Some(output) = self.backend.as_deref().and_then(|b| b.audio_output()) {
                    if let Err(e) = output.set_audio_device(&device).await {
                        swallow("set_audio_device", e);
                    }
                } else {
                    debug!("set_audio_device ignored, capability not available");
                }
                let _ = reply.send(Ok(()));
            }
            Command::SetProperty(name, value, reply) => {
                if let Some(properties) = self.backend.as_deref().and_then(|b| b.properties()) {
                    if let Err(e) = properties.set_property(&name, &value).await {
                        warn!(property = %name, error = %e, "Property rejected");
                    }
                } else {
                    debug!(property = %name, "set_property ignored, capability not available");
                }
                let _ = reply.send(Ok(()));
            }
            Command::GetProperty(name, reply) => {
                let value = match self.backend.as_deref().and_then(|b| b.properties()) {
                    Some(properties) => match properties.get_property(&name).await {
                        Ok(value) => value,
                        Err(e) => {
                            debug!(property = %name, error = %e, "Property read failed");
                            None
                        }
                    },
                    None => None,
                };
                let _ = reply.send(Ok(value));
            }
            Command::Raw(args, reply) => {
                if let Some(properties) = self.backend.as_deref().and_then(|b| b.properties()) {
                    if let Err(e) = properties.command(&args).await {
                        warn!(command = ?args, error = %e, "Engine command rejected");
                    }
                } else {
                    debug!(command = ?args, "command ignored, capability not available");
                }
                let _ = reply.send(Ok(()));
            }
            Command::SetAudioPassthrough(enabled, reply) => {
                if let Some(output) = self.backend.as_deref().and_then(|b| b.audio_output()) {
                    if let Err(e) = output.set_audio_passthrough(enabled).await {
                        swallow("set_audio_passthrough", e);
                    }
                }
                let _ = reply.send(Ok(()));
            }
            Command::SetVisible(visible, reply) => {
                if let Some(visibility) = self.backend.as_deref().and_then(|b| b.visibility()) {
                    if let Err(e) = visibility.set_visible(visible).await {
                        warn!(visible, error = %e, "Visibility change rejected");
                    }
                }
                let _ = reply.send(Ok(()));
            }
            Command::SetControlsVisible(visible, reply) => {
                if let Some(visibility) = self.backend.as_deref().and_then(|b| b.visibility()) {
                    if let Err(e) = visibility.set_controls_visible(visible).await {
                        warn!(visible, error = %e, "Controls visibility change rejected");
                    }
                }
                let _ = reply.send(Ok(()));
            }
            Command::UpdateFrame(frame, reply) => {
                if let Some(visibility) = self.backend.as_deref().and_then(|b| b.visibility()) {
                    if let Err(e) = visibility.update_frame(frame).await {
                        warn!(?frame, error = %e, "Frame update rejected");
                    }
                }
                let _ = reply.send(Ok(()));
            }
        }
    }

    // ------------------------------------------------------------------------
    // State
    // ------------------------------------------------------------------------

    fn ingest(&mut self, generation: u64, update: BackendUpdate) {
        if generation != self.generation || self.backend.is_none() {
            trace!(generation, current = self.generation, "Stale backend update dropped");
            return;
        }
        if let BackendUpdate::Position(position) = update {
            if self.before_pending_seek(position) {
                trace!(?position, "Position from before the seek dropped");
                return;
            }
        }
        self.apply(update);
    }

    /// `true` for a position the engine reported before reaching the last
    /// seek target. The first position near the target clears the seek.
    fn before_pending_seek(&mut self, position: Duration) -> bool {
        let Some(pending) = &self.pending_seek else {
            return false;
        };
        let settled = position.abs_diff(pending.target) <= SEEK_SETTLE_TOLERANCE
            || pending.issued_at.elapsed() >= SEEK_SETTLE_TIMEOUT;
        if settled {
            self.pending_seek = None;
        }
        !settled
    }

    fn apply(&mut self, update: BackendUpdate) {
        let out = reconcile(&self.state, update);
        self.commit(out);
    }

    fn commit(&mut self, out: Reconciled) {
        if out.state != self.state {
            self.state = out.state;
            self.snapshot.send_replace(self.state.clone());
        }
        self.streams.publish_all(out.events);
    }

    /// Publishes empty track lists even when the state already holds them.
    fn publish_empty_tracks(&mut self) {
        let out = reconcile(&self.state, BackendUpdate::Tracks(Tracks::default()));
        let emitted = out
            .events
            .iter()
            .any(|event| matches!(event, PlayerEvent::Tracks(_)));
        self.commit(out);
        if !emitted {
            self.streams.publish(PlayerEvent::Tracks(Tracks::default()));
        }
    }

    // ------------------------------------------------------------------------
    // Adapter lifecycle
    // ------------------------------------------------------------------------

    /// Unregisters the current adapter, then releases it.
    async fn detach(&mut self) {
        // Bumping the generation first: nothing the old adapter sends from
        // here on reaches the state
        self.generation += 1;
        self.opened = false;
        self.pending_seek = None;
        if let Some(backend) = self.backend.take() {
            backend.release().await;
            debug!(generation = self.generation, "Previous adapter released");
        }
    }

    async fn open(&mut self, media: Media, autoplay: bool) -> Result<(), PlayerError> {
        self.detach().await;
        let reset = reset_playback(&self.state);
        self.commit(reset);

        if media.uri.trim().is_empty() {
            self.publish_empty_tracks();
            return Err(PlayerError::NoPlayableSource(
                "media has no URI".to_string(),
            ));
        }

        info!(uri = %media.uri, autoplay, "Opening media");

        let sink = UpdateSink::new(self.generation, self.updates.clone());
        let outcome = self.load(sink, &media).await;

        match outcome {
            OpenOutcome::Loaded(backend, info) => {
                self.backend = Some(backend);
                self.opened = true;
                self.apply(BackendUpdate::Duration(info.duration));
                self.apply(BackendUpdate::Tracks(info.tracks));
                self.after_load(&media, autoplay).await;
                Ok(())
            }
            OpenOutcome::Failed(backend, e) => {
                self.generation += 1;
                if let Some(backend) = backend {
                    backend.release().await;
                }
                warn!(uri = %media.uri, error = %e, "Open failed");
                self.publish_empty_tracks();
                self.streams
                    .publish(PlayerEvent::Error(format!("Open failed: {}", e)));
                Ok(())
            }
            OpenOutcome::Cancelled(backend) => {
                self.generation += 1;
                if let Some(backend) = backend {
                    backend.release().await;
                }
                debug!(uri = %media.uri, "Open cancelled by dispose");
                Err(PlayerError::Disposed)
            }
        }
    }

    /// Creates the adapter and loads the media, bounded by the open timeout
    /// and interrupted by dispose.
    async fn load(&self, sink: UpdateSink, media: &Media) -> OpenOutcome {
        let cancel = self.cancel.clone();
        let deadline = tokio::time::Instant::now() + self.open_timeout;

        let created = tokio::select! {
            biased;
            _ = cancel.cancelled() => return OpenOutcome::Cancelled(None),
            created = tokio::time::timeout_at(deadline, self.factory.create(sink)) => created,
        };
        let backend = match created {
            Ok(Ok(backend)) => backend,
            Ok(Err(e)) => return OpenOutcome::Failed(None, e),
            Err(_) => {
                return OpenOutcome::Failed(
                    None,
                    PlayerError::Timeout("engine startup".to_string()),
                );
            }
        };

        let loaded = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            loaded = tokio::time::timeout_at(deadline, backend.open(media)) => Some(loaded),
        };
        match loaded {
            None => OpenOutcome::Cancelled(Some(backend)),
            Some(Ok(Ok(info))) => OpenOutcome::Loaded(backend, info),
            Some(Ok(Err(e))) => OpenOutcome::Failed(Some(backend), e),
            Some(Err(_)) => OpenOutcome::Failed(
                Some(backend),
                PlayerError::Timeout(format!("loading {}", media.uri)),
            ),
        }
    }

    /// Pushes the session settings to the fresh adapter, attaches external
    /// subtitles and starts playback.
    async fn after_load(&mut self, media: &Media, autoplay: bool) {
        let Some(backend) = self.backend.as_deref() else {
            return;
        };

        if let Some(volume) = backend.volume() {
            if let Err(e) = volume.set_volume(self.state.volume).await {
                warn!(error = %e, "Could not restore volume");
            }
            if let Err(e) = volume.set_rate(self.state.rate).await {
                warn!(error = %e, "Could not restore rate");
            }
        }

        if !media.subtitles.is_empty() {
            match backend.tracks() {
                Some(tracks) => {
                    for subtitle in &media.subtitles {
                        if let Err(e) = tracks.add_subtitle_track(subtitle, false).await {
                            warn!(uri = %subtitle.uri, error = %e, "External subtitle skipped");
                        }
                    }
                }
                None => debug!(
                    count = media.subtitles.len(),
                    "External subtitles ignored, capability not available"
                ),
            }
        }

        if let Some(start) = media.start.filter(|s| !s.is_zero()) {
            if let Err(e) = self.seek(start).await {
                warn!(?start, error = %e, "Start offset not applied");
            }
        }

        if autoplay {
            if let Err(e) = self.play().await {
                warn!(error = %e, "Autoplay failed");
                self.streams
                    .publish(PlayerEvent::Error(format!("Autoplay failed: {}", e)));
            }
        }
    }

    async fn shutdown(&mut self) {
        self.detach().await;
        if self.streams.close() {
            debug!("Player streams closed");
        }
    }

    // ------------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------------

    async fn play(&mut self) -> Result<(), PlayerError> {
        match self.backend.as_deref() {
            Some(backend) => backend.play().await,
            None => Ok(()),
        }
    }

    async fn pause(&mut self) -> Result<(), PlayerError> {
        match self.backend.as_deref() {
            Some(backend) => backend.pause().await,
            None => Ok(()),
        }
    }

    async fn seek(&mut self, position: Duration) -> Result<(), PlayerError> {
        if !self.opened {
            trace!(?position, "Seek ignored, nothing opened");
            return Ok(());
        }
        let Some(backend) = self.backend.as_deref() else {
            return Ok(());
        };

        let target = if self.state.duration > Duration::ZERO {
            position.min(self.state.duration)
        } else {
            position
        };
        backend.seek(target).await?;

        // Publiée tout de suite, sans attendre le prochain tick du moteur.
        // Les ticks émis pendant le seek sont encore dans la file
        self.pending_seek = Some(PendingSeek {
            target,
            issued_at: Instant::now(),
        });
        self.apply(BackendUpdate::Position(target));
        Ok(())
    }

    async fn select_audio_track(&mut self, track: AudioTrack) {
        let Some(tracks) = self.backend.as_deref().and_then(|b| b.tracks()) else {
            debug!("select_audio_track ignored, capability not available");
            return;
        };
        match tracks.select_audio_track(&track).await {
            Ok(()) => {
                let mut selection = self.state.track.clone();
                selection.audio = track;
                self.apply(BackendUpdate::Track(selection));
            }
            Err(e) => warn!(track = %track.id, error = %e, "Audio track selection rejected"),
        }
    }

    async fn select_subtitle_track(&mut self, track: SubtitleTrack) {
        let Some(tracks) = self.backend.as_deref().and_then(|b| b.tracks()) else {
            debug!("select_subtitle_track ignored, capability not available");
            return;
        };
        match tracks.select_subtitle_track(&track).await {
            Ok(()) => {
                let mut selection = self.state.track.clone();
                selection.subtitle = track;
                self.apply(BackendUpdate::Track(selection));
            }
            Err(e) => warn!(track = %track.id, error = %e, "Subtitle track selection rejected"),
        }
    }

    async fn add_subtitle_track(&mut self, subtitle: &ExternalSubtitle, select: bool) {
        let Some(tracks) = self.backend.as_deref().and_then(|b| b.tracks()) else {
            debug!("add_subtitle_track ignored, capability not available");
            return;
        };
        if let Err(e) = tracks.add_subtitle_track(subtitle, select).await {
            warn!(uri = %subtitle.uri, error = %e, "External subtitle rejected");
        }
    }

    async fn set_volume(&mut self, volume: f64) {
        let volume = clamp_volume(volume);
        if let Some(control) = self.backend.as_deref().and_then(|b| b.volume()) {
            if let Err(e) = control.set_volume(volume).await {
                warn!(volume, error = %e, "Volume not applied by engine");
            }
        }
        self.apply(BackendUpdate::Volume(volume));
    }

    async fn set_rate(&mut self, rate: f64) {
        let rate = clamp_rate(rate);
        if let Some(control) = self.backend.as_deref().and_then(|b| b.volume()) {
            if let Err(e) = control.set_rate(rate).await {
                warn!(rate, error = %e, "Rate not applied by engine");
            }
        }
        self.apply(BackendUpdate::Rate(rate));
    }
}
