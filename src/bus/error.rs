//! Message bus error types.

use thiserror::Error;

/// Errors that can occur while delivering an event to an observer surface.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BusError {
    /// The receiving surface is gone (page closed, connection dropped).
    #[error("surface is closed")]
    Closed,

    /// The surface exists but rejected the event.
    #[error("failed to deliver event: {0}")]
    DeliveryFailed(String),
}

impl BusError {
    /// Returns true if the surface will never accept events again.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}
