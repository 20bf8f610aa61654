//! # pmomediacontrols
//!
//! Publishes the player's state to the OS media controls and brings their
//! transport keys back to the player.
//!
//! - [`MediaControlSurface`] is the contract a platform integration
//!   implements; [`TracingSurface`] only logs.
//! - [`ThrottledPublisher`] rate-limits playback pushes with a leading-edge
//!   window, with an explicit bypass for discrete user actions.
//! - [`MediaControlsBridge`] wires a [`PlayerCore`](pmoplayer::PlayerCore)
//!   to a publisher.

pub mod bridge;
pub mod config_ext;
pub mod error;
pub mod publisher;
pub mod surface;

pub use bridge::{MediaControlsBridge, SEEK_JUMP_THRESHOLD};
pub use config_ext::MediaControlsConfigExt;
pub use error::MediaControlsError;
pub use publisher::{DEFAULT_THROTTLE_WINDOW, ThrottledPublisher};
pub use surface::{
    ControlEvent, ControlEventBus, MediaControlSurface, MediaMetadata, PlaybackUpdate,
    TracingSurface,
};
