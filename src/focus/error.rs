//! Focus enforcement error types.
//!
//! Every error here concerns a single page or navigation. Enforcement skips
//! the offending item and carries on with the rest.

use thiserror::Error;

use crate::types::SurfaceId;

/// Errors that can occur while enforcing the allow-list.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FocusError {
    /// The URL could not be parsed.
    #[error("cannot parse URL: {0}")]
    InvalidUrl(String),

    /// The URL has no hostname (e.g. `file:///`).
    #[error("URL has no host: {0}")]
    MissingHost(String),

    /// The page is no longer registered.
    #[error("page {0} not found")]
    TabNotFound(SurfaceId),

    /// The page could not be closed.
    #[error("could not close page {0}: {1}")]
    CloseFailed(SurfaceId, String),
}

impl FocusError {
    /// Returns true if the error came from a malformed destination.
    #[must_use]
    pub fn is_url_error(&self) -> bool {
        matches!(self, Self::InvalidUrl(_) | Self::MissingHost(_))
    }

    /// Returns true if the error is recoverable and enforcement should continue.
    ///
    /// Enforcement never aborts on a single page.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        true
    }

    /// Returns a user-friendly suggestion for resolving this error.
    #[must_use]
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::InvalidUrl(_) | Self::MissingHost(_) => {
                "Pass a URL with a scheme, for example https://github.com/"
            }
            Self::TabNotFound(_) => "The page is already closed",
            Self::CloseFailed(_, _) => "Check that the page's process is still responding",
        }
    }
}
