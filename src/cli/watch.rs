//! Overlay instance.
//!
//! Follows a `subscribe` stream and keeps an [`Overlay`] widget current.
//! The widget is refreshed from the absolute deadline on every tick, so a
//! lost event only delays the display until the next one arrives.

use std::future::Future;

use anyhow::Result;
use tokio::time::{Duration, MissedTickBehavior};

use crate::clock::Clock;
use crate::notification::{Overlay, OverlayView};
use crate::types::{ObserverEvent, StateSnapshot};

use super::client::Subscription;

/// How often the widget is re-rendered between events.
pub const REFRESH_INTERVAL: Duration = Duration::from_millis(250);

/// Why [`follow`] returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FollowEnd {
    /// The owner closed this page
    PageClosed,
    /// The owner went away; carries the last state it announced
    OwnerGone {
        /// Last announced state
        last_known: StateSnapshot,
    },
    /// `shutdown` resolved
    Shutdown,
}

/// Follows `subscription` until the page is closed, the owner goes away or
/// `shutdown` resolves.
///
/// `render` receives the widget after every event and every refresh.
///
/// # Errors
///
/// Returns an error if reading from the stream fails.
pub async fn follow<R, S>(
    subscription: &mut Subscription,
    clock: &dyn Clock,
    mut render: R,
    shutdown: S,
) -> Result<FollowEnd>
where
    R: FnMut(Option<&OverlayView>),
    S: Future<Output = ()>,
{
    let mut overlay = Overlay::new();
    let mut last_known = subscription.snapshot().clone();
    overlay.restore(&last_known, clock.now_millis());
    render(overlay.view());

    let mut ticker = tokio::time::interval(REFRESH_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            event = subscription.next_event() => {
                let Some(event) = event? else {
                    return Ok(FollowEnd::OwnerGone { last_known });
                };
                track(&mut last_known, &event);
                overlay.handle(&event, clock.now_millis());
                if event == ObserverEvent::ClosePage {
                    return Ok(FollowEnd::PageClosed);
                }
                render(overlay.view());
            }
            _ = ticker.tick() => {
                overlay.tick(clock.now_millis());
                render(overlay.view());
            }
            _ = &mut shutdown => return Ok(FollowEnd::Shutdown),
        }
    }
}

/// Updates the locally known owner state from an event.
pub fn track(last_known: &mut StateSnapshot, event: &ObserverEvent) {
    match event {
        ObserverEvent::StartTimer {
            end_time,
            session_type,
            session_count,
        } => {
            *last_known = StateSnapshot {
                is_running: true,
                timer_end_time: Some(*end_time),
                timer_session_type: *session_type,
                timer_session_count: *session_count,
            };
        }
        ObserverEvent::StopTimer => *last_known = StateSnapshot::default(),
        ObserverEvent::UpdateTime { .. } | ObserverEvent::HideTimer | ObserverEvent::ClosePage => {}
    }
}
