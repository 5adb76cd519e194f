//! Per-page countdown overlay.
//!
//! One widget per page, created lazily on the first `startTimer` (or on
//! page load when the owner still has a live deadline), updated in place,
//! and removed a short while after it stops so a final "00:00" flash can
//! render.
//!
//! The widget only stores the absolute deadline; every refresh derives the
//! displayed time from it, so a missed or repeated event changes nothing.

use crate::types::{seconds_until, ObserverEvent, SessionType, StateSnapshot};

/// Delay between stop (or expiry) and removal of the widget.
pub const REMOVAL_DELAY_MS: i64 = 3000;

/// Formats seconds as `MM:SS`.
pub fn format_clock(total_seconds: u32) -> String {
    format!("{:02}:{:02}", total_seconds / 60, total_seconds % 60)
}

/// Label shown next to the countdown.
pub fn session_label(session_type: SessionType, session_count: u32) -> String {
    match session_type {
        SessionType::Work => format!("Session {}", session_count + 1),
        SessionType::ShortBreak | SessionType::LongBreak => "Break".to_string(),
    }
}

/// What the widget currently shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayView {
    /// Phase being counted down
    pub session_type: SessionType,
    /// "Session N" or "Break"
    pub label: String,
    /// Remaining time as `MM:SS`
    pub time: String,
    /// True once the countdown reached zero
    pub flashing: bool,
}

#[derive(Debug, Clone)]
struct Widget {
    end_time: i64,
    session_type: SessionType,
    session_count: u32,
    view: OverlayView,
}

/// Overlay widget state for a single page.
#[derive(Debug, Default)]
pub struct Overlay {
    widget: Option<Widget>,
    removal_at: Option<i64>,
}

impl Overlay {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_visible(&self) -> bool {
        self.widget.is_some()
    }

    /// Returns the rendered widget, if any.
    pub fn view(&self) -> Option<&OverlayView> {
        self.widget.as_ref().map(|w| &w.view)
    }

    /// Returns when the widget is scheduled for removal.
    pub fn removal_at(&self) -> Option<i64> {
        self.removal_at
    }

    /// Restores the widget on page load.
    ///
    /// Only a running snapshot whose deadline is still ahead of `now` shows
    /// the widget. Returns true if it is now visible.
    pub fn restore(&mut self, snapshot: &StateSnapshot, now: i64) -> bool {
        match snapshot.running_deadline() {
            Some(end_time) if end_time > now => {
                self.show(
                    end_time,
                    snapshot.timer_session_type,
                    snapshot.timer_session_count,
                    now,
                );
                true
            }
            _ => false,
        }
    }

    /// Applies an owner event.
    pub fn handle(&mut self, event: &ObserverEvent, now: i64) {
        match event {
            ObserverEvent::StartTimer {
                end_time,
                session_type,
                session_count,
            } => self.show(*end_time, *session_type, *session_count, now),
            ObserverEvent::UpdateTime { .. } => self.render(now),
            ObserverEvent::StopTimer | ObserverEvent::HideTimer => self.schedule_removal(now),
            ObserverEvent::ClosePage => self.remove(),
        }
    }

    /// Refreshes the countdown and removes the widget once its removal is due.
    ///
    /// Returns true if the widget was removed by this call.
    pub fn tick(&mut self, now: i64) -> bool {
        if matches!(self.removal_at, Some(at) if now >= at) {
            let was_visible = self.is_visible();
            self.remove();
            return was_visible;
        }
        self.render(now);
        false
    }

    fn show(&mut self, end_time: i64, session_type: SessionType, session_count: u32, now: i64) {
        // A new phase cancels a pending removal.
        self.removal_at = None;
        self.widget = Some(Widget {
            end_time,
            session_type,
            session_count,
            view: OverlayView {
                session_type,
                label: session_label(session_type, session_count),
                time: String::new(),
                flashing: false,
            },
        });
        self.render(now);
    }

    fn render(&mut self, now: i64) {
        let Some(widget) = self.widget.as_mut() else {
            return;
        };

        let seconds = seconds_until(widget.end_time, now);
        widget.view.label = session_label(widget.session_type, widget.session_count);
        widget.view.time = format_clock(seconds);
        widget.view.flashing = seconds == 0;

        if seconds == 0 && self.removal_at.is_none() {
            self.removal_at = Some(now + REMOVAL_DELAY_MS);
        }
    }

    fn schedule_removal(&mut self, now: i64) {
        if self.widget.is_some() && self.removal_at.is_none() {
            self.removal_at = Some(now + REMOVAL_DELAY_MS);
        }
    }

    fn remove(&mut self) {
        self.widget = None;
        self.removal_at = None;
    }
}
