//! Display utilities for the focus timer CLI.
//!
//! This module provides formatted output for:
//! - Command results and status
//! - The single-line countdown of `run` and `watch`
//! - Error messages

use std::io::Write;

use crate::notification::{format_clock, OverlayView};
use crate::types::{NavigationVerdict, SessionType};

use super::controller::{Authority, TimerView};

// ============================================================================
// Display
// ============================================================================

/// Display utilities for CLI output.
pub struct Display;

impl Display {
    /// Shows a success message for timer start.
    pub fn show_start(view: &TimerView) {
        println!("* Timer started");
        Self::print_details(view);
    }

    /// Shows a success message for timer pause.
    pub fn show_pause(view: &TimerView) {
        println!("|| Timer paused");
        Self::print_details(view);
    }

    /// Shows a success message for timer stop.
    pub fn show_stop(_view: &TimerView) {
        println!("[] Timer stopped");
    }

    /// Shows the current timer status.
    pub fn show_status(view: &TimerView) {
        println!("Focus timer status");
        println!("{}", "-".repeat(29));
        for line in Self::status_lines(view) {
            println!("{}", line);
        }
    }

    /// Shows which context holds the timer in `run`.
    pub fn show_authority(authority: Authority) {
        match authority {
            Authority::Owner => println!("Connected to daemon"),
            Authority::Standalone => {
                println!("No daemon found, running standalone")
            }
        }
    }

    /// Shows that the owner stream ended.
    pub fn show_owner_lost() {
        println!();
        println!("Lost connection to daemon");
    }

    /// Shows that the owner closed this page.
    pub fn show_page_closed() {
        println!();
        println!("This page was closed to keep you focused");
    }

    /// Redraws the overlay line.
    pub fn show_overlay(view: Option<&OverlayView>) {
        Self::redraw(&Self::overlay_line(view));
    }

    /// Redraws the standalone countdown line.
    pub fn show_countdown(view: &TimerView) {
        Self::redraw(&Self::countdown_line(view));
    }

    /// Shows a navigation verdict.
    pub fn show_verdict(url: &str, verdict: NavigationVerdict) {
        let label = match verdict {
            NavigationVerdict::Allowed => "allowed",
            NavigationVerdict::Blocked => "blocked",
            NavigationVerdict::Ignored => "ignored",
        };
        println!("{}: {}", label, url);
    }

    /// Shows an error message.
    pub fn show_error(message: &str) {
        eprintln!("Error: {}", message);
    }

    /// Status lines for a view.
    pub fn status_lines(view: &TimerView) -> Vec<String> {
        vec![
            format!("State: {}", Self::state_label(view)),
            format!("Session: #{}", view.session_count + 1),
            format!("Remaining: {}", format_clock(view.remaining_seconds)),
            format!("Mode: {}", view.authority.label()),
        ]
    }

    /// Label for the phase and run state.
    pub fn state_label(view: &TimerView) -> &'static str {
        match (view.is_running, view.session_type) {
            (false, _) => "Stopped",
            (true, SessionType::Work) => "Working",
            (true, SessionType::ShortBreak) => "On break",
            (true, SessionType::LongBreak) => "On long break",
        }
    }

    /// One-line rendering of the overlay widget.
    pub fn overlay_line(view: Option<&OverlayView>) -> String {
        match view {
            Some(view) if view.flashing => format!("{} {} !", view.label, view.time),
            Some(view) => format!("{} {}", view.label, view.time),
            None => "Idle".to_string(),
        }
    }

    /// One-line rendering of a countdown.
    pub fn countdown_line(view: &TimerView) -> String {
        format!(
            "[{}] {} {}",
            view.authority.label(),
            Self::state_label(view),
            format_clock(view.remaining_seconds)
        )
    }

    fn print_details(view: &TimerView) {
        println!("  Remaining: {}", format_clock(view.remaining_seconds));
        println!("  Mode: {}", view.authority.label());
    }

    fn redraw(line: &str) {
        let mut stdout = std::io::stdout();
        let _ = write!(stdout, "\r\x1b[2K{}", line);
        let _ = stdout.flush();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn view(is_running: bool, session_type: SessionType, remaining_seconds: u32) -> TimerView {
        TimerView {
            authority: Authority::Owner,
            is_running,
            session_type,
            session_count: 1,
            remaining_seconds,
        }
    }

    mod label_tests {
        use super::*;

        #[test]
        fn test_state_label() {
            assert_eq!(Display::state_label(&view(true, SessionType::Work, 1)), "Working");
            assert_eq!(
                Display::state_label(&view(true, SessionType::ShortBreak, 1)),
                "On break"
            );
            assert_eq!(
                Display::state_label(&view(true, SessionType::LongBreak, 1)),
                "On long break"
            );
            assert_eq!(
                Display::state_label(&view(false, SessionType::ShortBreak, 1)),
                "Stopped"
            );
        }

        #[test]
        fn test_status_lines() {
            let lines = Display::status_lines(&view(true, SessionType::Work, 90));
            assert_eq!(
                lines,
                vec![
                    "State: Working".to_string(),
                    "Session: #2".to_string(),
                    "Remaining: 01:30".to_string(),
                    "Mode: Daemon".to_string(),
                ]
            );
        }
    }

    mod line_tests {
        use super::*;

        #[test]
        fn test_overlay_line() {
            let mut overlay = OverlayView {
                session_type: SessionType::Work,
                label: "Session 1".to_string(),
                time: "24:59".to_string(),
                flashing: false,
            };
            assert_eq!(Display::overlay_line(Some(&overlay)), "Session 1 24:59");

            overlay.time = "00:00".to_string();
            overlay.flashing = true;
            assert_eq!(Display::overlay_line(Some(&overlay)), "Session 1 00:00 !");

            assert_eq!(Display::overlay_line(None), "Idle");
        }

        #[test]
        fn test_countdown_line() {
            let mut v = view(true, SessionType::ShortBreak, 300);
            v.authority = Authority::Standalone;
            assert_eq!(Display::countdown_line(&v), "[Standalone] On break 05:00");
        }
    }
}
