//! Store key namespaces.
//!
//! The background owner and the standalone controller each persist the same
//! record under independent key sets, so the controller mirror can never be
//! mistaken for (or clobber) the owner's state.

/// Names of the keys a [`super::TimerRepository`] reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreKeys {
    /// Whether a deadline is live
    pub is_running: &'static str,
    /// Whether navigation enforcement applies (owner only)
    pub is_focus_active: Option<&'static str>,
    /// Absolute deadline in epoch milliseconds
    pub end_time: &'static str,
    /// Active phase
    pub session_type: &'static str,
    /// Completed work sessions in the cycle
    pub session_count: &'static str,
    /// Frozen remaining seconds while paused
    pub remaining_seconds: &'static str,
    /// Work duration in seconds
    pub work_time: &'static str,
    /// Short break duration in seconds
    pub short_break: &'static str,
    /// Long break duration in seconds
    pub long_break: &'static str,
    /// Work sessions per cycle
    pub sessions_before_long_break: &'static str,
}

impl StoreKeys {
    /// Returns every key in the set.
    pub fn all(&self) -> Vec<&'static str> {
        let mut keys = vec![
            self.is_running,
            self.end_time,
            self.session_type,
            self.session_count,
            self.remaining_seconds,
            self.work_time,
            self.short_break,
            self.long_break,
            self.sessions_before_long_break,
        ];
        keys.extend(self.is_focus_active);
        keys
    }
}

/// Keys persisted by the background owner.
pub const OWNER_KEYS: StoreKeys = StoreKeys {
    is_running: "isRunning",
    is_focus_active: Some("isFocusActive"),
    end_time: "timerEndTime",
    session_type: "timerSessionType",
    session_count: "timerSessionCount",
    remaining_seconds: "timerRemainingSeconds",
    work_time: "workTime",
    short_break: "shortBreak",
    long_break: "longBreak",
    sessions_before_long_break: "sessionsBeforeLongBreak",
};

/// Keys persisted by the controller for standalone mode.
pub const STANDALONE_KEYS: StoreKeys = StoreKeys {
    is_running: "pomodoroIsRunning",
    is_focus_active: None,
    end_time: "pomodoroEndTimestamp",
    session_type: "pomodoroSessionType",
    session_count: "pomodoroSessions",
    remaining_seconds: "pomodoroTimeLeft",
    work_time: "devsync-workTime",
    short_break: "devsync-shortBreak",
    long_break: "devsync-longBreak",
    sessions_before_long_break: "devsync-sessionsBeforeLongBreak",
};
