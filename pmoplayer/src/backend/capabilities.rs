// pmoplayer/src/backend/capabilities.rs
use async_trait::async_trait;
use std::time::Duration;

use crate::errors::PlayerError;
use crate::model::{AudioDevice, AudioTrack, ExternalSubtitle, Rect, SubtitleTrack};

/// Abstraction générique du transport (lecture / pause / seek), commune à
/// tous les backends.
#[async_trait]
pub trait TransportControl: Send + Sync {
    /// Démarre ou reprend la lecture.
    async fn play(&self) -> Result<(), PlayerError>;

    /// Met la lecture en pause.
    async fn pause(&self) -> Result<(), PlayerError>;

    /// Seek absolu. La position est déjà bornée par l'appelant.
    async fn seek(&self, position: Duration) -> Result<(), PlayerError>;
}

/// Sélection de pistes et ajout de sous-titres externes.
#[async_trait]
pub trait TrackControl: Send + Sync {
    async fn select_audio_track(&self, track: &AudioTrack) -> Result<(), PlayerError>;

    /// `SubtitleTrack::disabled()` doit désactiver toute piste, externe comprise.
    async fn select_subtitle_track(&self, track: &SubtitleTrack) -> Result<(), PlayerError>;

    async fn add_subtitle_track(
        &self,
        subtitle: &ExternalSubtitle,
        select: bool,
    ) -> Result<(), PlayerError>;
}

/// Volume on the `[0, 100]` scale and playback rate, both already clamped.
#[async_trait]
pub trait VolumeControl: Send + Sync {
    async fn set_volume(&self, volume: f64) -> Result<(), PlayerError>;

    async fn set_rate(&self, rate: f64) -> Result<(), PlayerError>;
}

#[async_trait]
pub trait AudioOutputControl: Send + Sync {
    async fn set_audio_device(&self, device: &AudioDevice) -> Result<(), PlayerError>;

    /// Bitstream compressed formats to the output instead of decoding them.
    async fn set_audio_passthrough(&self, enabled: bool) -> Result<(), PlayerError>;
}

/// Accès brut aux propriétés et commandes du moteur.
///
/// Les noms et valeurs sont transmis tels quels, sans validation.
#[async_trait]
pub trait PropertyPassthrough: Send + Sync {
    async fn set_property(&self, name: &str, value: &str) -> Result<(), PlayerError>;

    /// `Ok(None)` when the engine knows the property but has no value for it.
    async fn get_property(&self, name: &str) -> Result<Option<String>, PlayerError>;

    async fn command(&self, args: &[String]) -> Result<(), PlayerError>;
}

/// Visual hints for backends that own an on-screen surface.
#[async_trait]
pub trait VisibilityControl: Send + Sync {
    async fn set_visible(&self, visible: bool) -> Result<(), PlayerError>;

    async fn set_controls_visible(&self, visible: bool) -> Result<(), PlayerError>;

    async fn update_frame(&self, frame: Rect) -> Result<(), PlayerError>;
}
