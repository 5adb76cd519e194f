//! Tab and navigation focus enforcement.
//!
//! While a work session runs, pages outside the allow-list are closed and
//! navigations to them are blocked before they complete.
//!
//! # Triggers
//!
//! 1. **Session-start sweep**: on every transition into `work`, every open
//!    page with a resolvable host that is neither pinned, internal nor
//!    allow-listed is closed.
//! 2. **Navigation check**: every top-level navigation reported while focus
//!    is active is checked; a blocked destination closes the page.
//!
//! # Error Handling
//!
//! Errors concern a single page. A malformed URL or a failed close is
//! logged and that page is skipped; the rest are still processed.

pub mod allowlist;
pub mod config;
pub mod error;

use tracing::{debug, info, warn};

use crate::bus::{BusError, Broadcaster};
use crate::types::{Navigation, NavigationVerdict, SurfaceId};

pub use allowlist::{parse_host, AllowList};
pub use config::FocusConfig;
pub use error::FocusError;

/// Sends `closePage` to a registered page and drops its registration.
///
/// # Errors
///
/// [`FocusError::TabNotFound`] when the page is not registered (or already
/// gone), [`FocusError::CloseFailed`] when delivery fails.
pub fn close_page(pages: &Broadcaster, id: SurfaceId) -> Result<(), FocusError> {
    pages.close_page(id).map_err(|e| match e {
        BusError::Closed => FocusError::TabNotFound(id),
        other => FocusError::CloseFailed(id, other.to_string()),
    })
}

// ============================================================================
// FocusEnforcer
// ============================================================================

/// Outcome of a session-start sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Pages that were closed
    pub closed: Vec<SurfaceId>,
    /// Pages left open (allowed, internal or pinned)
    pub kept: usize,
    /// Pages skipped because of a missing/malformed URL or a failed close
    pub skipped: usize,
}

/// Allow-list policy engine.
#[derive(Debug, Clone)]
pub struct FocusEnforcer {
    allow_list: AllowList,
    internal_prefixes: Vec<String>,
}

impl Default for FocusEnforcer {
    fn default() -> Self {
        Self::from_config(&FocusConfig::default())
    }
}

impl FocusEnforcer {
    /// Creates an enforcer from configuration.
    #[must_use]
    pub fn from_config(config: &FocusConfig) -> Self {
        Self {
            allow_list: AllowList::new(&config.allow_list),
            internal_prefixes: config
                .internal_url_prefixes
                .iter()
                .map(|p| p.to_ascii_lowercase())
                .collect(),
        }
    }

    /// Returns the allow-list in use.
    pub fn allow_list(&self) -> &AllowList {
        &self.allow_list
    }

    /// Returns true for internal/system pages.
    pub fn is_internal(&self, url: &str) -> bool {
        let url = url.trim().to_ascii_lowercase();
        self.internal_prefixes
            .iter()
            .any(|prefix| url.starts_with(prefix.as_str()))
    }

    /// Returns true if `url` may stay open during a work session.
    ///
    /// # Errors
    ///
    /// Returns a [`FocusError`] if the host cannot be resolved.
    pub fn permits(&self, url: &str) -> Result<bool, FocusError> {
        if self.is_internal(url) {
            return Ok(true);
        }
        let host = parse_host(url)?;
        Ok(self.allow_list.is_allowed(&host))
    }

    /// Closes every registered page that is not allowed.
    pub fn sweep(&self, pages: &Broadcaster) -> SweepReport {
        let mut report = SweepReport::default();

        for (id, page) in pages.pages() {
            if page.pinned {
                report.kept += 1;
                continue;
            }
            let Some(url) = page.url.as_deref() else {
                report.skipped += 1;
                continue;
            };

            match self.permits(url) {
                Ok(true) => report.kept += 1,
                Ok(false) => match close_page(pages, id) {
                    Ok(()) => {
                        info!("Closed page {} ({})", id, url);
                        report.closed.push(id);
                    }
                    Err(e) => {
                        warn!("Failed to close page {}: {}", id, e);
                        report.skipped += 1;
                    }
                },
                Err(e) => {
                    debug!("Skipping page {}: {}", id, e);
                    report.skipped += 1;
                }
            }
        }

        report
    }

    /// Decides whether a navigation may proceed.
    ///
    /// Enforcement is inert unless `focus_active`; sub-frame navigations and
    /// malformed destinations are ignored.
    pub fn check_navigation(&self, navigation: &Navigation, focus_active: bool) -> NavigationVerdict {
        if !focus_active || !navigation.is_top_level() {
            return NavigationVerdict::Ignored;
        }

        match self.permits(&navigation.url) {
            Ok(true) => NavigationVerdict::Allowed,
            Ok(false) => NavigationVerdict::Blocked,
            Err(e) => {
                debug!("Ignoring navigation to {}: {}", navigation.url, e);
                NavigationVerdict::Ignored
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
