//! Backend adapters and their runtime selection.
//!
//! Every adapter implements [`PlaybackBackend`]: transport control is
//! mandatory, the other capabilities are reached through accessors that
//! return `None` when the engine lacks them. Callers branch on the presence
//! of the handle, never on the backend identity.

pub mod capabilities;
pub mod element;
pub mod mpv;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::errors::PlayerError;
use crate::model::{Media, MediaInfo};
use crate::reconcile::BackendUpdate;

pub use capabilities::{
    AudioOutputControl, PropertyPassthrough, TrackControl, TransportControl, VisibilityControl,
    VolumeControl,
};
pub use element::{ElementBackend, ElementCommand, ElementEvent, ElementFactory, ElementHost};
pub use mpv::{MpvBackend, MpvFactory, MpvOptions};

/// The closed set of concrete adapters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Hardware-accelerated engine without its own window.
    Native,
    /// Engine owning an OS window.
    Windowed,
    /// Browser media element reached through a host bridge.
    Element,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BackendKind::Native => "native",
            BackendKind::Windowed => "windowed",
            BackendKind::Element => "element",
        };
        f.write_str(name)
    }
}

/// Which backend the user asked for in the configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendPreference {
    #[default]
    Auto,
    Native,
    Windowed,
    Element,
}

impl FromStr for BackendPreference {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" | "" => Ok(BackendPreference::Auto),
            "native" => Ok(BackendPreference::Native),
            "windowed" => Ok(BackendPreference::Windowed),
            "element" => Ok(BackendPreference::Element),
            other => Err(anyhow!(
                "unknown backend '{}', expected auto, native, windowed or element",
                other
            )),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OsFamily {
    Linux,
    Windows,
    MacOs,
    Android,
    Ios,
    Web,
    Other,
}

/// What the selection function knows about the host platform.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlatformDescriptor {
    pub os: OsFamily,
}

impl PlatformDescriptor {
    pub fn new(os: OsFamily) -> Self {
        Self { os }
    }

    /// Descriptor of the platform this binary was compiled for.
    pub fn current() -> Self {
        let os = if cfg!(target_family = "wasm") {
            OsFamily::Web
        } else if cfg!(target_os = "android") {
            OsFamily::Android
        } else if cfg!(target_os = "ios") {
            OsFamily::Ios
        } else if cfg!(target_os = "macos") {
            OsFamily::MacOs
        } else if cfg!(target_os = "windows") {
            OsFamily::Windows
        } else if cfg!(target_os = "linux") {
            OsFamily::Linux
        } else {
            OsFamily::Other
        };
        Self { os }
    }

    /// Backend used when the preference is `auto`.
    pub fn default_backend(&self) -> BackendKind {
        match self.os {
            OsFamily::Web => BackendKind::Element,
            OsFamily::Windows => BackendKind::Windowed,
            _ => BackendKind::Native,
        }
    }
}

/// Channel end an adapter pushes its observations into.
///
/// Each sink carries the generation of the adapter it was handed to. The
/// session drops every update whose generation is no longer current, which
/// is how a released adapter gets unregistered before its teardown.
#[derive(Clone, Debug)]
pub struct UpdateSink {
    generation: u64,
    tx: mpsc::UnboundedSender<(u64, BackendUpdate)>,
}

impl UpdateSink {
    pub fn new(generation: u64, tx: mpsc::UnboundedSender<(u64, BackendUpdate)>) -> Self {
        Self { generation, tx }
    }

    /// Standalone sink of generation 0, for driving an adapter directly.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<(u64, BackendUpdate)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(0, tx), rx)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns `false` once the session is gone.
    pub fn send(&self, update: BackendUpdate) -> bool {
        self.tx.send((self.generation, update)).is_ok()
    }
}

/// One live engine handle.
#[async_trait]
pub trait PlaybackBackend: TransportControl {
    fn kind(&self) -> BackendKind;

    /// Loads `media` paused and resolves once duration and tracks are known.
    async fn open(&self, media: &Media) -> Result<MediaInfo, PlayerError>;

    /// Releases the engine and every device handle it holds. Calling it
    /// again is a no-op.
    async fn release(&self);

    fn tracks(&self) -> Option<&dyn TrackControl> {
        None
    }

    fn volume(&self) -> Option<&dyn VolumeControl> {
        None
    }

    fn audio_output(&self) -> Option<&dyn AudioOutputControl> {
        None
    }

    fn properties(&self) -> Option<&dyn PropertyPassthrough> {
        None
    }

    fn visibility(&self) -> Option<&dyn VisibilityControl> {
        None
    }
}

/// Builds a fresh adapter for each opened source.
#[async_trait]
pub trait BackendFactory: Send + Sync {
    fn kind(&self) -> BackendKind;

    async fn create(&self, sink: UpdateSink) -> Result<Box<dyn PlaybackBackend>, PlayerError>;
}

#[derive(Clone, Debug, Default)]
pub struct BackendOptions {
    pub preference: BackendPreference,
    pub mpv: MpvOptions,
}

/// Result of [`select_backend`].
pub struct BackendSelection {
    pub kind: BackendKind,
    pub factory: Arc<dyn BackendFactory>,
    /// Present for [`BackendKind::Element`]: the host side of every element
    /// adapter the factory creates is delivered here.
    pub element_hosts: Option<mpsc::UnboundedReceiver<ElementHost>>,
}

impl fmt::Debug for BackendSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendSelection")
            .field("kind", &self.kind)
            .field("element_hosts", &self.element_hosts.is_some())
            .finish()
    }
}

/// Picks the adapter constructor for `platform` among the closed set of
/// backends.
pub fn select_backend(platform: &PlatformDescriptor, options: &BackendOptions) -> BackendSelection {
    let requested = match options.preference {
        BackendPreference::Auto => platform.default_backend(),
        BackendPreference::Native => BackendKind::Native,
        BackendPreference::Windowed => BackendKind::Windowed,
        BackendPreference::Element => BackendKind::Element,
    };

    // Pas de processus externe dans un navigateur
    let kind = if platform.os == OsFamily::Web && requested != BackendKind::Element {
        tracing::warn!(
            requested = %requested,
            "Backend unavailable on the web, falling back to element"
        );
        BackendKind::Element
    } else {
        requested
    };

    tracing::debug!(backend = %kind, os = ?platform.os, "Backend selected");

    match kind {
        BackendKind::Native | BackendKind::Windowed => BackendSelection {
            kind,
            factory: Arc::new(MpvFactory::new(kind, options.mpv.clone())),
            element_hosts: None,
        },
        BackendKind::Element => {
            let (factory, hosts) = ElementFactory::new();
            BackendSelection {
                kind,
                factory: Arc::new(factory),
                element_hosts: Some(hosts),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(preference: BackendPreference) -> BackendOptions {
        BackendOptions {
            preference,
            ..Default::default()
        }
    }

    #[test]
    fn test_auto_selection_per_platform() {
        let auto = options(BackendPreference::Auto);
        let cases = [
            (OsFamily::Linux, BackendKind::Native),
            (OsFamily::MacOs, BackendKind::Native),
            (OsFamily::Android, BackendKind::Native),
            (OsFamily::Windows, BackendKind::Windowed),
            (OsFamily::Web, BackendKind::Element),
        ];
        for (os, expected) in cases {
            let selection = select_backend(&PlatformDescriptor::new(os), &auto);
            assert_eq!(selection.kind, expected, "os {:?}", os);
            assert_eq!(selection.factory.kind(), expected);
        }
    }

    #[test]
    fn test_explicit_preference_wins() {
        let linux = PlatformDescriptor::new(OsFamily::Linux);
        let selection = select_backend(&linux, &options(BackendPreference::Windowed));
        assert_eq!(selection.kind, BackendKind::Windowed);
        assert!(selection.element_hosts.is_none());

        let selection = select_backend(&linux, &options(BackendPreference::Element));
        assert_eq!(selection.kind, BackendKind::Element);
        assert!(selection.element_hosts.is_some());
    }

    #[test]
    fn test_web_forces_element() {
        let web = PlatformDescriptor::new(OsFamily::Web);
        let selection = select_backend(&web, &options(BackendPreference::Native));
        assert_eq!(selection.kind, BackendKind::Element);
    }

    #[test]
    fn test_preference_parsing() {
        assert_eq!(
            "Windowed".parse::<BackendPreference>().unwrap(),
            BackendPreference::Windowed
        );
        assert_eq!("".parse::<BackendPreference>().unwrap(), BackendPreference::Auto);
        assert!("vlc".parse::<BackendPreference>().is_err());
    }

    #[tokio::test]
    async fn test_sink_tags_generation() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink = UpdateSink::new(7, tx);
        assert!(sink.send(BackendUpdate::Playing(true)));
        assert_eq!(rx.recv().await, Some((7, BackendUpdate::Playing(true))));

        drop(rx);
        assert!(!sink.send(BackendUpdate::Playing(false)));
    }
}
