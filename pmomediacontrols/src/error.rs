use thiserror::Error;

use pmoplayer::PlayerError;

#[derive(Error, Debug)]
pub enum MediaControlsError {
    #[error("Media controls publisher has been disposed")]
    Disposed,
    /// The OS surface refused the update.
    #[error("Media control surface error: {0}")]
    Surface(String),
    #[error(transparent)]
    Player(#[from] PlayerError),
}

impl MediaControlsError {
    pub fn surface(message: impl Into<String>) -> Self {
        MediaControlsError::Surface(message.into())
    }
}
