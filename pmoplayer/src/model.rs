//! Observable playback facts shared by every backend.
//!
//! [`PlayerState`] is a value type: the session replaces it wholesale on
//! each change and hands out clones, it is never mutated behind a reader's
//! back.

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const VOLUME_MIN: f64 = 0.0;
pub const VOLUME_MAX: f64 = 100.0;
pub const RATE_MIN: f64 = 0.25;
pub const RATE_MAX: f64 = 4.0;
pub const DEFAULT_RATE: f64 = 1.0;

/// Identifier shared by the "let the engine pick" tracks.
pub const AUTO_TRACK_ID: &str = "auto";
/// Identifier shared by the "no track" tracks.
pub const NO_TRACK_ID: &str = "no";

/// Clamps a volume into `[0, 100]`. NaN maps to silence.
pub fn clamp_volume(volume: f64) -> f64 {
    if volume.is_nan() {
        return VOLUME_MIN;
    }
    volume.clamp(VOLUME_MIN, VOLUME_MAX)
}

/// Clamps a playback rate into `[0.25, 4.0]`. NaN maps to normal speed.
pub fn clamp_rate(rate: f64) -> f64 {
    if rate.is_nan() {
        return DEFAULT_RATE;
    }
    rate.clamp(RATE_MIN, RATE_MAX)
}

/// Where a track comes from.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackOrigin {
    /// Demuxed from the opened media itself.
    #[default]
    Embedded,
    /// Attached afterwards from a separate URI.
    External { uri: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AudioTrack {
    pub id: String,
    pub title: Option<String>,
    pub language: Option<String>,
    pub origin: TrackOrigin,
}

impl AudioTrack {
    pub fn new(id: impl Into<String>, title: Option<String>, language: Option<String>) -> Self {
        Self {
            id: id.into(),
            title,
            language,
            origin: TrackOrigin::Embedded,
        }
    }

    /// Engine default audio track.
    pub fn auto() -> Self {
        Self::new(AUTO_TRACK_ID, None, None)
    }

    /// No audio output at all.
    pub fn no() -> Self {
        Self::new(NO_TRACK_ID, None, None)
    }

    pub fn is_auto(&self) -> bool {
        self.id == AUTO_TRACK_ID
    }
}

impl Default for AudioTrack {
    fn default() -> Self {
        Self::auto()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubtitleTrack {
    pub id: String,
    pub title: Option<String>,
    pub language: Option<String>,
    pub origin: TrackOrigin,
}

impl SubtitleTrack {
    pub fn new(id: impl Into<String>, title: Option<String>, language: Option<String>) -> Self {
        Self {
            id: id.into(),
            title,
            language,
            origin: TrackOrigin::Embedded,
        }
    }

    pub fn external(
        id: impl Into<String>,
        uri: impl Into<String>,
        title: Option<String>,
        language: Option<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title,
            language,
            origin: TrackOrigin::External { uri: uri.into() },
        }
    }

    /// Engine default subtitle selection.
    pub fn auto() -> Self {
        Self::new(AUTO_TRACK_ID, None, None)
    }

    /// The "subtitles off" sentinel. Selecting it disables every subtitle
    /// track, embedded or external.
    pub fn disabled() -> Self {
        Self::new(NO_TRACK_ID, None, None)
    }

    pub fn is_disabled(&self) -> bool {
        self.id == NO_TRACK_ID
    }

    pub fn is_external(&self) -> bool {
        matches!(self.origin, TrackOrigin::External { .. })
    }
}

impl Default for SubtitleTrack {
    fn default() -> Self {
        Self::auto()
    }
}

/// Tracks exposed by the opened media.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tracks {
    pub audio: Vec<AudioTrack>,
    pub subtitle: Vec<SubtitleTrack>,
}

/// Tracks currently selected.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackSelection {
    pub audio: AudioTrack,
    pub subtitle: SubtitleTrack,
}

/// An audio output. Two devices are the same device when their names match.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AudioDevice {
    pub name: String,
    pub description: String,
}

impl AudioDevice {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }

    pub fn auto() -> Self {
        Self::new(AUTO_TRACK_ID, "Autoselect device")
    }
}

impl Default for AudioDevice {
    fn default() -> Self {
        Self::auto()
    }
}

impl PartialEq for AudioDevice {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for AudioDevice {}

impl std::hash::Hash for AudioDevice {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

/// One engine log line.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerLog {
    pub prefix: String,
    pub level: String,
    pub text: String,
}

/// Subtitle file to attach to a media, usually supplied by the catalog
/// client with auth-bearing query parameters. Treated as opaque.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalSubtitle {
    pub uri: String,
    pub title: Option<String>,
    pub language: Option<String>,
}

impl ExternalSubtitle {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            title: None,
            language: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }
}

/// A source to open.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Media {
    pub uri: String,
    /// Position to seek to once the media is loaded.
    pub start: Option<Duration>,
    pub subtitles: Vec<ExternalSubtitle>,
}

impl Media {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            start: None,
            subtitles: Vec::new(),
        }
    }

    pub fn with_start(mut self, start: Duration) -> Self {
        self.start = Some(start);
        self
    }

    pub fn with_subtitle(mut self, subtitle: ExternalSubtitle) -> Self {
        self.subtitles.push(subtitle);
        self
    }
}

/// Metadata an adapter reports once a media is loaded.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MediaInfo {
    pub duration: Duration,
    pub tracks: Tracks,
}

/// On-screen rectangle, in physical pixels, for windowed engines.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// X11-style geometry string (`WxH+X+Y`), negative offsets included.
    pub fn to_geometry(&self) -> String {
        format!("{}x{}{:+}{:+}", self.width, self.height, self.x, self.y)
    }
}

/// Snapshot of everything observable about a playback session.
#[derive(Clone, Debug, PartialEq)]
pub struct PlayerState {
    pub playing: bool,
    pub buffering: bool,
    pub completed: bool,
    pub position: Duration,
    pub duration: Duration,
    /// Buffered-ahead watermark.
    pub buffer: Duration,
    pub volume: f64,
    pub rate: f64,
    pub tracks: Tracks,
    pub track: TrackSelection,
    pub audio_device: AudioDevice,
    pub audio_devices: Vec<AudioDevice>,
}

impl Default for PlayerState {
    fn default() -> Self {
        Self {
            playing: false,
            buffering: false,
            completed: false,
            position: Duration::ZERO,
            duration: Duration::ZERO,
            buffer: Duration::ZERO,
            volume: VOLUME_MAX,
            rate: DEFAULT_RATE,
            tracks: Tracks::default(),
            track: TrackSelection::default(),
            audio_device: AudioDevice::auto(),
            audio_devices: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_volume() {
        assert_eq!(clamp_volume(-3.0), 0.0);
        assert_eq!(clamp_volume(42.5), 42.5);
        assert_eq!(clamp_volume(250.0), 100.0);
        assert_eq!(clamp_volume(f64::NAN), 0.0);
        assert_eq!(clamp_volume(f64::INFINITY), 100.0);
    }

    #[test]
    fn test_clamp_rate() {
        assert_eq!(clamp_rate(0.0), 0.25);
        assert_eq!(clamp_rate(1.5), 1.5);
        assert_eq!(clamp_rate(10.0), 4.0);
        assert_eq!(clamp_rate(f64::NAN), 1.0);
    }

    #[test]
    fn test_audio_device_equality_by_name() {
        let a = AudioDevice::new("pulse/sink", "Speakers");
        let b = AudioDevice::new("pulse/sink", "Renamed speakers");
        let c = AudioDevice::new("alsa/hw0", "Speakers");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_subtitle_sentinel() {
        let off = SubtitleTrack::disabled();
        assert!(off.is_disabled());
        assert!(!off.is_external());
        assert!(!SubtitleTrack::auto().is_disabled());

        let ext = SubtitleTrack::external("3", "https://cdn/subs.srt?api_key=x", None, None);
        assert!(ext.is_external());
    }

    #[test]
    fn test_rect_geometry() {
        assert_eq!(Rect::new(10, 20, 1280, 720).to_geometry(), "1280x720+10+20");
        assert_eq!(Rect::new(-5, 0, 640, 480).to_geometry(), "640x480-5+0");
    }
}
