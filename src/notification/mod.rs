//! Audio/visual notifier.
//!
//! This module provides:
//!
//! - Phase-completion notifications through the [`Notifier`] trait
//! - Idempotent audio playback over a singleton surface ([`audio`])
//! - The per-page countdown overlay widget ([`overlay`])
//!
//! # Example
//!
//! ```
//! use focus_timer::machine::Transition;
//! use focus_timer::notification::{LogNotifier, NotificationKind, Notifier};
//!
//! let kind = NotificationKind::for_transition(&Transition::CycleCompleted);
//! assert_eq!(kind, Some(NotificationKind::CycleComplete));
//! assert!(LogNotifier.notify(NotificationKind::CycleComplete).is_ok());
//! assert_eq!(NotificationKind::for_transition(&Transition::None), None);
//! ```

pub mod audio;
pub mod error;
pub mod overlay;

use tracing::info;

use crate::machine::Transition;

pub use audio::{AudioHost, AudioPlayback, BellAudioHost};
#[cfg(any(test, feature = "test-utils"))]
pub use audio::MockAudioHost;
pub use error::NotificationError;
pub use overlay::{format_clock, Overlay, OverlayView};

// ============================================================================
// NotificationKind
// ============================================================================

/// What finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    /// A work session finished
    WorkComplete,
    /// A short break finished
    BreakComplete,
    /// A long break finished the cycle
    CycleComplete,
}

impl NotificationKind {
    /// Maps a state-machine transition to its notification.
    pub fn for_transition(transition: &Transition) -> Option<Self> {
        match transition {
            Transition::None => None,
            Transition::WorkCompleted { .. } => Some(Self::WorkComplete),
            Transition::BreakCompleted => Some(Self::BreakComplete),
            Transition::CycleCompleted => Some(Self::CycleComplete),
        }
    }

    /// Returns the single-line notification message.
    pub fn message(&self) -> &'static str {
        match self {
            Self::WorkComplete => "Work session complete! Time for a break",
            Self::BreakComplete => "Break over! Back to work",
            Self::CycleComplete => "Cycle complete! Well done",
        }
    }
}

// ============================================================================
// Notifier
// ============================================================================

/// Delivers phase-completion notifications.
pub trait Notifier: Send + Sync {
    /// Notifies the user.
    ///
    /// # Errors
    ///
    /// Returns [`NotificationError::SendFailed`] if delivery fails. Callers
    /// log the error and continue.
    fn notify(&self, kind: NotificationKind) -> Result<(), NotificationError>;
}

/// Notifier that writes to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, kind: NotificationKind) -> Result<(), NotificationError> {
        info!("{}", kind.message());
        Ok(())
    }
}

/// Notifier that prints to standard output, used by the foreground controller.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, kind: NotificationKind) -> Result<(), NotificationError> {
        println!("🔔 {}", kind.message());
        Ok(())
    }
}

/// Mock notifier for testing.
#[cfg(any(test, feature = "test-utils"))]
#[derive(Debug, Default)]
pub struct MockNotifier {
    sent: std::sync::Mutex<Vec<NotificationKind>>,
    should_fail: std::sync::atomic::AtomicBool,
}

#[cfg(any(test, feature = "test-utils"))]
impl MockNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_should_fail(&self, should_fail: bool) {
        self.should_fail
            .store(should_fail, std::sync::atomic::Ordering::SeqCst);
    }

    #[must_use]
    pub fn sent(&self) -> Vec<NotificationKind> {
        self.sent.lock().unwrap().clone()
    }

    #[must_use]
    pub fn count(&self, kind: NotificationKind) -> usize {
        self.sent.lock().unwrap().iter().filter(|k| **k == kind).count()
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl Notifier for MockNotifier {
    fn notify(&self, kind: NotificationKind) -> Result<(), NotificationError> {
        if self.should_fail.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(NotificationError::SendFailed("mock".to_string()));
        }
        self.sent.lock().unwrap().push(kind);
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
