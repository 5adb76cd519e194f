//! Notifier error types.
//!
//! Notification and playback failures are never fatal to the timer; callers
//! log them and continue.

use thiserror::Error;

/// Errors that can occur while notifying the user.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NotificationError {
    /// Failed to deliver a notification.
    #[error("failed to send notification: {0}")]
    SendFailed(String),

    /// The audio playback surface could not be created.
    #[error("failed to create playback surface: {0}")]
    SurfaceCreationFailed(String),

    /// Playback on an existing surface failed.
    #[error("failed to play sound: {0}")]
    PlaybackFailed(String),
}

impl NotificationError {
    /// Returns true if the error concerns audio.
    #[must_use]
    pub fn is_audio_error(&self) -> bool {
        matches!(
            self,
            Self::SurfaceCreationFailed(_) | Self::PlaybackFailed(_)
        )
    }

    /// Returns a user-friendly suggestion for resolving this error.
    #[must_use]
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::SendFailed(_) => "Check the log destination",
            Self::SurfaceCreationFailed(_) => "Check that the terminal accepts writes to stderr",
            Self::PlaybackFailed(_) => "Restart the daemon",
        }
    }
}
