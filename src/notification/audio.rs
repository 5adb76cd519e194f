//! Audio playback with a singleton playback surface.
//!
//! The host owns at most one playback surface. [`AudioPlayback`] makes sure
//! it exists before every playback request; concurrent requests that find no
//! surface wait on a single in-flight creation instead of creating several.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Mutex as AsyncMutex;
use tracing::debug;

use super::{NotificationError, NotificationKind};

// ============================================================================
// AudioHost
// ============================================================================

/// Platform side of audio playback.
#[allow(async_fn_in_trait)]
pub trait AudioHost {
    /// Returns true if the playback surface already exists.
    async fn has_surface(&self) -> bool;

    /// Creates the playback surface.
    ///
    /// # Errors
    ///
    /// Returns [`NotificationError::SurfaceCreationFailed`] on failure.
    async fn create_surface(&self) -> Result<(), NotificationError>;

    /// Plays the sound for `kind` on the existing surface.
    ///
    /// # Errors
    ///
    /// Returns [`NotificationError::PlaybackFailed`] on failure.
    async fn play(&self, kind: NotificationKind) -> Result<(), NotificationError>;
}

// ============================================================================
// AudioPlayback
// ============================================================================

/// Idempotent playback front-end over an [`AudioHost`].
#[derive(Debug)]
pub struct AudioPlayback<H> {
    host: H,
    creating: AsyncMutex<()>,
}

impl<H: AudioHost> AudioPlayback<H> {
    pub fn new(host: H) -> Self {
        Self {
            host,
            creating: AsyncMutex::new(()),
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Creates the playback surface unless it already exists.
    ///
    /// # Errors
    ///
    /// Propagates the host's creation error.
    pub async fn ensure_surface(&self) -> Result<(), NotificationError> {
        if self.host.has_surface().await {
            return Ok(());
        }

        let _creating = self.creating.lock().await;
        // Another request may have finished creating while we waited.
        if self.host.has_surface().await {
            return Ok(());
        }

        debug!("Creating audio playback surface");
        self.host.create_surface().await
    }

    /// Plays the sound for `kind`, creating the surface first if needed.
    ///
    /// # Errors
    ///
    /// Returns the creation or playback error.
    pub async fn play(&self, kind: NotificationKind) -> Result<(), NotificationError> {
        self.ensure_surface().await?;
        self.host.play(kind).await
    }
}

// ============================================================================
// BellAudioHost
// ============================================================================

/// Terminal bell on standard error.
#[derive(Debug, Default)]
pub struct BellAudioHost {
    ready: AtomicBool,
}

impl BellAudioHost {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl AudioHost for BellAudioHost {
    async fn has_surface(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn create_surface(&self) -> Result<(), NotificationError> {
        std::io::stderr()
            .flush()
            .map_err(|e| NotificationError::SurfaceCreationFailed(e.to_string()))?;
        self.ready.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn play(&self, kind: NotificationKind) -> Result<(), NotificationError> {
        let bells = match kind {
            NotificationKind::CycleComplete => "\x07\x07",
            _ => "\x07",
        };
        let mut stderr = std::io::stderr();
        stderr
            .write_all(bells.as_bytes())
            .and_then(|()| stderr.flush())
            .map_err(|e| NotificationError::PlaybackFailed(e.to_string()))
    }
}

// ============================================================================
// MockAudioHost
// ============================================================================

/// Mock audio host for testing.
///
/// Surface creation yields to the scheduler before completing so that
/// concurrent requests overlap.
#[cfg(any(test, feature = "test-utils"))]
#[derive(Debug, Default)]
pub struct MockAudioHost {
    surface: AtomicBool,
    creations: std::sync::atomic::AtomicUsize,
    played: std::sync::Mutex<Vec<NotificationKind>>,
    should_fail: AtomicBool,
}

#[cfg(any(test, feature = "test-utils"))]
impl MockAudioHost {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_should_fail(&self, should_fail: bool) {
        self.should_fail.store(should_fail, Ordering::SeqCst);
    }

    #[must_use]
    pub fn creation_count(&self) -> usize {
        self.creations.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn played(&self) -> Vec<NotificationKind> {
        self.played.lock().unwrap().clone()
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl AudioHost for MockAudioHost {
    async fn has_surface(&self) -> bool {
        self.surface.load(Ordering::SeqCst)
    }

    async fn create_surface(&self) -> Result<(), NotificationError> {
        tokio::task::yield_now().await;
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(NotificationError::SurfaceCreationFailed("mock".to_string()));
        }
        self.creations.fetch_add(1, Ordering::SeqCst);
        self.surface.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn play(&self, kind: NotificationKind) -> Result<(), NotificationError> {
        self.played.lock().unwrap().push(kind);
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
