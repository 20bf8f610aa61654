//! # pmoplayer
//!
//! One command and state surface over interchangeable playback engines.
//!
//! A [`PlayerCore`] drives at most one [`PlaybackBackend`] at a time,
//! reconciles what the engine reports into an immutable [`PlayerState`] and
//! republishes every real change on per-field broadcast channels
//! ([`PlayerStreams`]).
//!
//! ```rust,ignore
//! use pmoplayer::{select_backend, BackendOptions, CoreOptions, Media, PlatformDescriptor, PlayerCore};
//!
//! let selection = select_backend(&PlatformDescriptor::current(), &BackendOptions::default());
//! let player = PlayerCore::new(selection.factory, CoreOptions::default());
//! let mut position = player.streams().position();
//! player.open(Media::new("https://example.org/movie.mkv"), true).await?;
//! ```

pub mod actions;
pub mod backend;
pub mod config_ext;
pub mod session;
pub mod errors;
pub mod model;
pub mod reconcile;
pub mod streams;

pub use actions::{PlayerAction, SeekIncrements};
pub use backend::{
    AudioOutputControl, BackendFactory, BackendKind, BackendOptions, BackendPreference,
    BackendSelection, ElementCommand, ElementEvent, ElementFactory, ElementHost, MpvBackend,
    MpvFactory, MpvOptions, OsFamily, PlatformDescriptor, PlaybackBackend, PropertyPassthrough,
    TrackControl, TransportControl, UpdateSink, VisibilityControl, VolumeControl, select_backend,
};
pub use config_ext::PlayerConfigExt;
pub use session::{CoreOptions, PlayerCore};
pub use errors::PlayerError;
pub use model::{
    AudioDevice, AudioTrack, ExternalSubtitle, Media, MediaInfo, PlayerLog, PlayerState, Rect,
    SubtitleTrack, TrackOrigin, TrackSelection, Tracks,
};
pub use reconcile::BackendUpdate;
pub use streams::{PlayerEvent, PlayerStreams};
