//! Cross-context message bus.
//!
//! The owner broadcasts [`ObserverEvent`]s to every registered observer
//! surface. Delivery is at-most-once and fire-and-forget: a failing surface
//! is logged and skipped, never retried, and a closed surface is dropped
//! from the registry. Receivers recover from a missed event with the next
//! periodic `updateTime` or an explicit `getState`.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  broadcast   ┌────────────────┐
//! │  TimerEngine │─────────────▶│  Broadcaster   │
//! └──────────────┘              └───────┬────────┘
//!                                       │ deliver (errors swallowed)
//!                    ┌──────────────────┼──────────────────┐
//!                    ▼                  ▼                  ▼
//!             overlay (page)     overlay (page)       controller
//! ```

mod error;

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::types::{ObserverEvent, PageInfo, SurfaceId};

pub use error::BusError;

// ============================================================================
// Surface
// ============================================================================

/// A receiver of owner events.
pub trait Surface: Send + Sync {
    /// Stable identifier of the surface.
    fn id(&self) -> SurfaceId;

    /// Delivers one event without waiting for the receiver.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::Closed`] once the receiver is gone.
    fn deliver(&self, event: &ObserverEvent) -> Result<(), BusError>;
}

/// Surface backed by an unbounded tokio channel.
///
/// The receiving half is typically forwarded to a socket by the IPC server.
#[derive(Debug, Clone)]
pub struct ChannelSurface {
    id: SurfaceId,
    tx: mpsc::UnboundedSender<ObserverEvent>,
}

impl ChannelSurface {
    /// Creates a surface and the receiver for its events.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ObserverEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                id: Uuid::new_v4(),
                tx,
            },
            rx,
        )
    }
}

impl Surface for ChannelSurface {
    fn id(&self) -> SurfaceId {
        self.id
    }

    fn deliver(&self, event: &ObserverEvent) -> Result<(), BusError> {
        self.tx.send(event.clone()).map_err(|_| BusError::Closed)
    }
}

// ============================================================================
// Broadcaster
// ============================================================================

struct Registration {
    surface: Arc<dyn Surface>,
    page: Option<PageInfo>,
}

/// Outcome of a broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Surfaces that accepted the event
    pub delivered: usize,
    /// Surfaces that rejected the event (closed ones are also pruned)
    pub failed: usize,
}

/// Registry of observer surfaces.
#[derive(Default)]
pub struct Broadcaster {
    registrations: Mutex<Vec<Registration>>,
}

impl std::fmt::Debug for Broadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Broadcaster")
            .field("surfaces", &self.len())
            .finish()
    }
}

impl Broadcaster {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a surface, optionally describing the page it lives in.
    pub fn register(&self, surface: Arc<dyn Surface>, page: Option<PageInfo>) -> SurfaceId {
        let id = surface.id();
        if let Ok(mut registrations) = self.registrations.lock() {
            registrations.retain(|r| r.surface.id() != id);
            registrations.push(Registration { surface, page });
            debug!("Registered surface {} ({} total)", id, registrations.len());
        }
        id
    }

    /// Removes a surface. Returns true if it was registered.
    pub fn unregister(&self, id: SurfaceId) -> bool {
        let Ok(mut registrations) = self.registrations.lock() else {
            return false;
        };
        let before = registrations.len();
        registrations.retain(|r| r.surface.id() != id);
        registrations.len() != before
    }

    /// Drops every registration and returns how many there were.
    ///
    /// Channel-backed surfaces see their event stream end.
    pub fn clear(&self) -> usize {
        self.registrations
            .lock()
            .map(|mut registrations| registrations.drain(..).count())
            .unwrap_or(0)
    }

    /// Returns the number of registered surfaces.
    #[must_use]
    pub fn len(&self) -> usize {
        self.registrations.lock().map(|r| r.len()).unwrap_or(0)
    }

    /// Returns true if no surface is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the registered surfaces that describe a page.
    pub fn pages(&self) -> Vec<(SurfaceId, PageInfo)> {
        self.registrations
            .lock()
            .map(|registrations| {
                registrations
                    .iter()
                    .filter_map(|r| r.page.clone().map(|page| (r.surface.id(), page)))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Records the URL a page has navigated to.
    ///
    /// Returns false when `id` is not a registered page.
    pub fn record_url(&self, id: SurfaceId, url: &str) -> bool {
        let Ok(mut registrations) = self.registrations.lock() else {
            return false;
        };
        let page = registrations
            .iter_mut()
            .filter(|r| r.surface.id() == id)
            .find_map(|r| r.page.as_mut());
        match page {
            Some(page) => {
                page.url = Some(url.to_string());
                true
            }
            None => false,
        }
    }

    fn snapshot(&self) -> Vec<Arc<dyn Surface>> {
        self.registrations
            .lock()
            .map(|registrations| registrations.iter().map(|r| r.surface.clone()).collect())
            .unwrap_or_default()
    }

    /// Sends `event` to every surface.
    ///
    /// Failures are logged and swallowed; closed surfaces are unregistered.
    pub fn broadcast(&self, event: &ObserverEvent) -> BroadcastReport {
        let mut report = BroadcastReport::default();

        for surface in self.snapshot() {
            match surface.deliver(event) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    report.failed += 1;
                    if e.is_closed() {
                        debug!("Surface {} closed, unregistering", surface.id());
                        self.unregister(surface.id());
                    } else {
                        warn!("Failed to deliver event to surface {}: {}", surface.id(), e);
                    }
                }
            }
        }

        report
    }

    /// Sends `event` to a single surface.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::Closed`] if the surface is not registered.
    pub fn send_to(&self, id: SurfaceId, event: &ObserverEvent) -> Result<(), BusError> {
        let surface = self
            .snapshot()
            .into_iter()
            .find(|s| s.id() == id)
            .ok_or(BusError::Closed)?;
        surface.deliver(event)
    }

    /// Sends `closePage` to a surface and drops its registration.
    ///
    /// The registration is dropped even when delivery fails.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::Closed`] if the surface was not registered or is
    /// gone, and the delivery error otherwise.
    pub fn close_page(&self, id: SurfaceId) -> Result<(), BusError> {
        let delivered = self.send_to(id, &ObserverEvent::ClosePage);
        self.unregister(id);
        delivered
    }
}

// ============================================================================
// MockSurface
// ============================================================================

/// Mock surface for testing.
#[cfg(any(test, feature = "test-utils"))]
#[derive(Debug)]
pub struct MockSurface {
    id: SurfaceId,
    events: Mutex<Vec<ObserverEvent>>,
    closed: std::sync::atomic::AtomicBool,
    should_fail: std::sync::atomic::AtomicBool,
}

#[cfg(any(test, feature = "test-utils"))]
impl Default for MockSurface {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl MockSurface {
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            events: Mutex::new(Vec::new()),
            closed: std::sync::atomic::AtomicBool::new(false),
            should_fail: std::sync::atomic::AtomicBool::new(false),
        }
    }

    pub fn set_closed(&self, closed: bool) {
        self.closed
            .store(closed, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn set_should_fail(&self, should_fail: bool) {
        self.should_fail
            .store(should_fail, std::sync::atomic::Ordering::SeqCst);
    }

    #[must_use]
    pub fn events(&self) -> Vec<ObserverEvent> {
        self.events.lock().unwrap().clone()
    }

    #[must_use]
    pub fn last_event(&self) -> Option<ObserverEvent> {
        self.events.lock().unwrap().last().cloned()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl Surface for MockSurface {
    fn id(&self) -> SurfaceId {
        self.id
    }

    fn deliver(&self, event: &ObserverEvent) -> Result<(), BusError> {
        if self.closed.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(BusError::Closed);
        }
        if self.should_fail.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(BusError::DeliveryFailed("mock".to_string()));
        }
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
