//! Self-rearming wake alarm.
//!
//! The owner never counts ticks. Each wake re-reads the persisted deadline
//! and decides from absolute time, then arms the next wake. The alarm only
//! has to fire at or after the requested delay; how late it fires does not
//! matter for correctness.

use std::sync::Mutex;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tracing::trace;

/// Lower bound between two wakes of a running timer.
pub const MIN_WAKE_INTERVAL: Duration = Duration::from_secs(1);

/// A one-shot alarm that can be re-armed or cleared.
pub trait Alarm: Send + Sync {
    /// Schedules a wake after `delay`, replacing any pending one.
    fn arm(&self, delay: Duration);

    /// Cancels the pending wake, if any.
    fn clear(&self);

    /// Returns true while a wake is pending.
    fn is_armed(&self) -> bool;
}

// ============================================================================
// TokioAlarm
// ============================================================================

/// Alarm backed by a tokio sleep task.
///
/// Each firing sends `()` on the channel returned by [`TokioAlarm::new`].
#[derive(Debug)]
pub struct TokioAlarm {
    wake_tx: mpsc::UnboundedSender<()>,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl TokioAlarm {
    /// Creates an alarm and the receiver its wakes arrive on.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<()>) {
        let (wake_tx, wake_rx) = mpsc::unbounded_channel();
        (
            Self {
                wake_tx,
                pending: Mutex::new(None),
            },
            wake_rx,
        )
    }
}

impl Alarm for TokioAlarm {
    fn arm(&self, delay: Duration) {
        let wake_tx = self.wake_tx.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = wake_tx.send(());
        });

        if let Ok(mut pending) = self.pending.lock() {
            if let Some(previous) = pending.replace(handle) {
                previous.abort();
            }
        }
        trace!("Alarm armed in {:?}", delay);
    }

    fn clear(&self) {
        if let Ok(mut pending) = self.pending.lock() {
            if let Some(previous) = pending.take() {
                previous.abort();
                trace!("Alarm cleared");
            }
        }
    }

    fn is_armed(&self) -> bool {
        self.pending
            .lock()
            .map(|pending| pending.as_ref().is_some_and(|h| !h.is_finished()))
            .unwrap_or(false)
    }
}

// ============================================================================
// MockAlarm
// ============================================================================

/// Mock alarm for testing. Records every arm; never fires on its own.
#[cfg(any(test, feature = "test-utils"))]
#[derive(Debug, Default)]
pub struct MockAlarm {
    armed: std::sync::atomic::AtomicBool,
    arms: Mutex<Vec<Duration>>,
    clears: Mutex<usize>,
}

#[cfg(any(test, feature = "test-utils"))]
impl MockAlarm {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every requested delay in order.
    #[must_use]
    pub fn arms(&self) -> Vec<Duration> {
        self.arms.lock().unwrap().clone()
    }

    #[must_use]
    pub fn last_delay(&self) -> Option<Duration> {
        self.arms.lock().unwrap().last().copied()
    }

    #[must_use]
    pub fn clear_count(&self) -> usize {
        *self.clears.lock().unwrap()
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl Alarm for MockAlarm {
    fn arm(&self, delay: Duration) {
        self.arms.lock().unwrap().push(delay);
        self.armed.store(true, std::sync::atomic::Ordering::SeqCst);
    }

    fn clear(&self) {
        *self.clears.lock().unwrap() += 1;
        self.armed.store(false, std::sync::atomic::Ordering::SeqCst);
    }

    fn is_armed(&self) -> bool {
        self.armed.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_tokio_alarm_fires_once() {
        let (alarm, mut wakes) = TokioAlarm::new();
        alarm.arm(Duration::from_millis(10));
        assert!(alarm.is_armed());

        tokio::time::timeout(Duration::from_secs(2), wakes.recv())
            .await
            .unwrap()
            .unwrap();
        tokio::task::yield_now().await;
        assert!(!alarm.is_armed());
    }

    #[tokio::test]
    async fn test_rearm_replaces_pending_wake() {
        let (alarm, mut wakes) = TokioAlarm::new();
        alarm.arm(Duration::from_millis(20));
        alarm.arm(Duration::from_millis(40));

        tokio::time::timeout(Duration::from_secs(2), wakes.recv())
            .await
            .unwrap()
            .unwrap();
        let second = tokio::time::timeout(Duration::from_millis(150), wakes.recv()).await;
        assert!(second.is_err(), "replaced wake must not fire");
    }

    #[tokio::test]
    async fn test_clear_cancels_wake() {
        let (alarm, mut wakes) = TokioAlarm::new();
        alarm.arm(Duration::from_millis(20));
        alarm.clear();
        assert!(!alarm.is_armed());

        let fired = tokio::time::timeout(Duration::from_millis(100), wakes.recv()).await;
        assert!(fired.is_err());
    }

    #[test]
    fn test_mock_alarm_records() {
        let alarm = MockAlarm::new();
        alarm.arm(MIN_WAKE_INTERVAL);
        alarm.arm(Duration::ZERO);
        assert!(alarm.is_armed());
        assert_eq!(alarm.arms(), vec![MIN_WAKE_INTERVAL, Duration::ZERO]);

        alarm.clear();
        assert!(!alarm.is_armed());
        assert_eq!(alarm.clear_count(), 1);
    }
}
