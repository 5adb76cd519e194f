//! Timer state machine.
//!
//! Pure transition logic shared by the background owner and the standalone
//! controller. Decisions are made from the absolute deadline only, so a late
//! or repeated wake-up lands on the same next phase as a punctual one.
//!
//! ```text
//! work ──(count+1) % N != 0──▶ shortBreak ──▶ work
//!   │
//!   └──(count+1) % N == 0──▶ longBreak ──▶ stopped (work, count 0)
//! ```

use crate::types::{SessionType, TimerState};

/// Upper bound on transitions applied by a single [`catch_up`].
const MAX_CATCH_UP_TRANSITIONS: usize = 64;

// ============================================================================
// Transition
// ============================================================================

/// What a call to [`advance`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Deadline not reached (or timer not running); state unchanged
    None,
    /// A work session finished and a break started
    WorkCompleted {
        /// The break that started
        next: SessionType,
        /// Completed work sessions including this one
        session_count: u32,
    },
    /// A short break finished and a work session started
    BreakCompleted,
    /// A long break finished; the cycle is over and the timer stopped
    CycleCompleted,
}

impl Transition {
    /// Returns true if the state changed.
    pub fn is_transition(&self) -> bool {
        !matches!(self, Transition::None)
    }
}

/// Result of [`advance`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advance {
    /// State after the transition
    pub state: TimerState,
    /// The transition that was applied
    pub transition: Transition,
}

// ============================================================================
// Transition functions
// ============================================================================

/// Selects the break that follows a completed work session.
///
/// `completed` is the session count including the session that just ended.
pub fn next_break(completed: u32, sessions_before_long_break: u32) -> SessionType {
    if completed % sessions_before_long_break.max(1) == 0 {
        SessionType::LongBreak
    } else {
        SessionType::ShortBreak
    }
}

/// Applies at most one phase transition.
///
/// Nothing happens unless the timer is running and `now` is at or past the
/// deadline. The next phase's deadline is `now + duration`.
pub fn advance(state: &TimerState, now: i64) -> Advance {
    let mut next = state.clone();

    if !state.is_expired(now) {
        return Advance {
            state: next,
            transition: Transition::None,
        };
    }

    let transition = match state.session_type {
        SessionType::Work => {
            let completed = state.session_count + 1;
            let session_type = next_break(completed, state.settings.sessions_before_long_break);
            next.session_count = completed;
            let duration = next.settings.duration_for(session_type);
            next.start_phase(session_type, now, duration);
            Transition::WorkCompleted {
                next: session_type,
                session_count: completed,
            }
        }
        SessionType::ShortBreak => {
            let duration = next.settings.work_time;
            next.start_phase(SessionType::Work, now, duration);
            Transition::BreakCompleted
        }
        SessionType::LongBreak => {
            // A finished cycle stays stopped until explicitly restarted.
            next.reset();
            Transition::CycleCompleted
        }
    };

    Advance {
        state: next,
        transition,
    }
}

/// Applies every transition that is due at `now`.
///
/// Used when recovering a persisted deadline after a reload or a long
/// suspension. Returns the final state and the transitions in order.
pub fn catch_up(state: &TimerState, now: i64) -> (TimerState, Vec<Transition>) {
    let mut current = state.clone();
    let mut transitions = Vec::new();

    while transitions.len() < MAX_CATCH_UP_TRANSITIONS {
        let step = advance(&current, now);
        if !step.transition.is_transition() {
            break;
        }
        transitions.push(step.transition);
        current = step.state;
    }

    (current, transitions)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TimerSettings;

    const T0: i64 = 1_700_000_000_000;

    fn running(session_type: SessionType, session_count: u32, end: i64) -> TimerState {
        let mut state = TimerState::new(TimerSettings::default());
        state.session_count = session_count;
        state.run_until(session_type, end);
        state
    }

    #[test]
    fn test_no_transition_before_deadline() {
        let state = running(SessionType::Work, 0, T0 + 1);
        let step = advance(&state, T0);
        assert_eq!(step.transition, Transition::None);
        assert_eq!(step.state, state);
    }

    #[test]
    fn test_no_transition_when_stopped() {
        let state = TimerState::new(TimerSettings::default());
        let step = advance(&state, i64::MAX);
        assert_eq!(step.transition, Transition::None);
    }

    #[test]
    fn test_work_to_short_break() {
        let mut state = TimerState::new(TimerSettings::default());
        state.start_phase(SessionType::Work, T0, 1500);
        let now = T0 + 1_500_000;

        let step = advance(&state, now);

        assert_eq!(
            step.transition,
            Transition::WorkCompleted {
                next: SessionType::ShortBreak,
                session_count: 1
            }
        );
        assert_eq!(step.state.session_type, SessionType::ShortBreak);
        assert_eq!(step.state.session_count, 1);
        assert!(step.state.is_running);
        assert_eq!(step.state.end_timestamp, Some(now + 300 * 1000));
    }

    #[test]
    fn test_fourth_work_session_selects_long_break() {
        let state = running(SessionType::Work, 3, T0);
        let step = advance(&state, T0);

        assert_eq!(step.state.session_type, SessionType::LongBreak);
        assert_eq!(step.state.session_count, 4);
        assert_eq!(step.state.end_timestamp, Some(T0 + 900 * 1000));
    }

    #[test]
    fn test_short_break_to_work_keeps_count() {
        let state = running(SessionType::ShortBreak, 2, T0);
        let step = advance(&state, T0 + 5);

        assert_eq!(step.transition, Transition::BreakCompleted);
        assert_eq!(step.state.session_type, SessionType::Work);
        assert_eq!(step.state.session_count, 2);
        assert_eq!(step.state.end_timestamp, Some(T0 + 5 + 1_500_000));
    }

    #[test]
    fn test_long_break_completes_cycle_stopped() {
        let state = running(SessionType::LongBreak, 4, T0);
        let step = advance(&state, T0);

        assert_eq!(step.transition, Transition::CycleCompleted);
        assert!(!step.state.is_running);
        assert_eq!(step.state.end_timestamp, None);
        assert_eq!(step.state.session_count, 0);
        assert_eq!(step.state.session_type, SessionType::Work);
        assert_eq!(step.state.remaining_seconds, 1500);
    }

    #[test]
    fn test_cycle_completes_once() {
        let state = running(SessionType::LongBreak, 4, T0);
        let first = advance(&state, T0);
        let second = advance(&first.state, T0 + 60_000);
        assert_eq!(second.transition, Transition::None);
    }

    #[test]
    fn test_repeated_wakeups_fire_once() {
        let state = running(SessionType::Work, 0, T0);
        let first = advance(&state, T0 + 10);

        for extra in [10, 20, 1_000, 299_000] {
            let again = advance(&first.state, T0 + extra);
            assert_eq!(again.transition, Transition::None);
            assert_eq!(again.state, first.state);
        }
    }

    #[test]
    fn test_late_wakeup_lands_on_same_phase() {
        let state = running(SessionType::Work, 0, T0);
        let punctual = advance(&state, T0);
        let late = advance(&state, T0 + 3_600_000);

        assert_eq!(punctual.transition, late.transition);
        assert_eq!(punctual.state.session_type, late.state.session_type);
        assert_eq!(late.state.end_timestamp, Some(T0 + 3_600_000 + 300_000));
    }

    #[test]
    fn test_full_cycle_sequence() {
        let mut state = TimerState::new(TimerSettings::default());
        let mut now = T0;
        state.start_phase(SessionType::Work, now, 1500);

        let mut breaks = Vec::new();
        for _ in 0..4 {
            now = state.end_timestamp.unwrap();
            let step = advance(&state, now);
            breaks.push(step.state.session_type);
            state = step.state;

            now = state.end_timestamp.unwrap();
            let step = advance(&state, now);
            state = step.state;
            if step.transition == Transition::CycleCompleted {
                break;
            }
            assert_eq!(state.session_type, SessionType::Work);
        }

        assert_eq!(
            breaks,
            vec![
                SessionType::ShortBreak,
                SessionType::ShortBreak,
                SessionType::ShortBreak,
                SessionType::LongBreak
            ]
        );
        assert!(!state.is_running);
        assert_eq!(state.session_count, 0);
    }

    #[test]
    fn test_custom_cycle_length() {
        let mut state = running(SessionType::Work, 1, T0);
        state.settings.sessions_before_long_break = 2;
        let step = advance(&state, T0);
        assert_eq!(step.state.session_type, SessionType::LongBreak);
    }

    #[test]
    fn test_next_break() {
        assert_eq!(next_break(1, 4), SessionType::ShortBreak);
        assert_eq!(next_break(4, 4), SessionType::LongBreak);
        assert_eq!(next_break(8, 4), SessionType::LongBreak);
        assert_eq!(next_break(1, 1), SessionType::LongBreak);
        assert_eq!(next_break(3, 0), SessionType::LongBreak);
    }

    #[test]
    fn test_catch_up_from_expired_work() {
        let mut state = TimerState::new(TimerSettings::default());
        state.start_phase(SessionType::Work, T0 - 1_590_000, 1500);
        assert_eq!(state.end_timestamp, Some(T0 - 90_000));

        let (caught_up, transitions) = catch_up(&state, T0);

        assert_eq!(transitions.len(), 1);
        assert_eq!(caught_up.session_type, SessionType::ShortBreak);
        assert_eq!(caught_up.session_count, 1);
        assert_eq!(caught_up.remaining_at(T0), 300);
    }

    #[test]
    fn test_catch_up_nothing_due() {
        let state = running(SessionType::Work, 0, T0 + 1_000);
        let (caught_up, transitions) = catch_up(&state, T0);
        assert!(transitions.is_empty());
        assert_eq!(caught_up, state);
    }
}
