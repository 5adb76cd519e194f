//! Core data types for the focus timer.
//!
//! This module defines the data structures used for:
//! - Timer state (session phase, cycle position, absolute deadline)
//! - Timer settings with validation
//! - Cross-context protocol messages (commands, events, snapshots)

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Constants
// ============================================================================

/// Default work duration in seconds (25 minutes)
pub const DEFAULT_WORK_SECS: u32 = 25 * 60;

/// Default short break duration in seconds (5 minutes)
pub const DEFAULT_SHORT_BREAK_SECS: u32 = 5 * 60;

/// Default long break duration in seconds (15 minutes)
pub const DEFAULT_LONG_BREAK_SECS: u32 = 15 * 60;

/// Default number of work sessions per cycle
pub const DEFAULT_SESSIONS_BEFORE_LONG_BREAK: u32 = 4;

/// Upper bound for any single phase duration in seconds (2 hours)
const MAX_PHASE_SECS: u32 = 2 * 60 * 60;

/// Upper bound for the number of work sessions in a cycle
const MAX_SESSIONS_BEFORE_LONG_BREAK: u32 = 12;

// ============================================================================
// SessionType
// ============================================================================

/// The phase a timer is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionType {
    /// Focus phase; tab and navigation enforcement is active
    Work,
    /// Short break between work sessions
    ShortBreak,
    /// Long break closing a cycle
    LongBreak,
}

impl SessionType {
    /// Returns the wire representation of the session type.
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionType::Work => "work",
            SessionType::ShortBreak => "shortBreak",
            SessionType::LongBreak => "longBreak",
        }
    }

    /// Parses the wire representation, returning `None` for unknown values.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "work" => Some(SessionType::Work),
            "shortBreak" => Some(SessionType::ShortBreak),
            "longBreak" => Some(SessionType::LongBreak),
            _ => None,
        }
    }

    /// Returns true for the focus phase.
    pub fn is_work(&self) -> bool {
        matches!(self, SessionType::Work)
    }

    /// Returns true for either break.
    pub fn is_break(&self) -> bool {
        !self.is_work()
    }
}

impl Default for SessionType {
    fn default() -> Self {
        SessionType::Work
    }
}

// ============================================================================
// TimerSettings
// ============================================================================

/// User-configurable durations and cycle length.
///
/// All durations are in seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TimerSettings {
    /// Work duration in seconds
    pub work_time: u32,
    /// Short break duration in seconds
    pub short_break: u32,
    /// Long break duration in seconds
    pub long_break: u32,
    /// Number of work sessions before a long break
    pub sessions_before_long_break: u32,
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            work_time: DEFAULT_WORK_SECS,
            short_break: DEFAULT_SHORT_BREAK_SECS,
            long_break: DEFAULT_LONG_BREAK_SECS,
            sessions_before_long_break: DEFAULT_SESSIONS_BEFORE_LONG_BREAK,
        }
    }
}

impl TimerSettings {
    /// Sets the work duration from minutes, clamped to at least one minute.
    pub fn with_work_minutes(mut self, minutes: u32) -> Self {
        self.work_time = minutes.max(1) * 60;
        self
    }

    /// Sets the short break duration from minutes, clamped to at least one minute.
    pub fn with_short_break_minutes(mut self, minutes: u32) -> Self {
        self.short_break = minutes.max(1) * 60;
        self
    }

    /// Sets the long break duration from minutes, clamped to at least one minute.
    pub fn with_long_break_minutes(mut self, minutes: u32) -> Self {
        self.long_break = minutes.max(1) * 60;
        self
    }

    /// Sets the number of work sessions per cycle.
    pub fn with_sessions_before_long_break(mut self, sessions: u32) -> Self {
        self.sessions_before_long_break = sessions;
        self
    }

    /// Returns the configured duration of a phase in seconds.
    pub fn duration_for(&self, session_type: SessionType) -> u32 {
        match session_type {
            SessionType::Work => self.work_time,
            SessionType::ShortBreak => self.short_break,
            SessionType::LongBreak => self.long_break,
        }
    }

    /// Validates the settings.
    ///
    /// Returns an error message if validation fails.
    pub fn validate(&self) -> Result<(), String> {
        for (label, secs) in [
            ("work time", self.work_time),
            ("short break", self.short_break),
            ("long break", self.long_break),
        ] {
            if secs < 1 || secs > MAX_PHASE_SECS {
                return Err(format!(
                    "{} must be between 1 and {} seconds",
                    label, MAX_PHASE_SECS
                ));
            }
        }
        if self.sessions_before_long_break < 1
            || self.sessions_before_long_break > MAX_SESSIONS_BEFORE_LONG_BREAK
        {
            return Err(format!(
                "sessions before a long break must be between 1 and {}",
                MAX_SESSIONS_BEFORE_LONG_BREAK
            ));
        }
        Ok(())
    }
}

// ============================================================================
// TimerState
// ============================================================================

/// The canonical timer state.
///
/// While running, remaining time is derived from `end_timestamp`; while
/// paused, `remaining_seconds` is authoritative and `end_timestamp` is `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    /// Active phase
    pub session_type: SessionType,
    /// Completed work sessions in the current cycle
    pub session_count: u32,
    /// Whether the deadline is live
    pub is_running: bool,
    /// Epoch milliseconds at which the phase expires (running only)
    pub end_timestamp: Option<i64>,
    /// Seconds left (authoritative only while not running)
    pub remaining_seconds: u32,
    /// Durations and cycle length
    pub settings: TimerSettings,
}

impl TimerState {
    /// Creates a stopped state at the start of a cycle.
    pub fn new(settings: TimerSettings) -> Self {
        Self {
            session_type: SessionType::Work,
            session_count: 0,
            is_running: false,
            end_timestamp: None,
            remaining_seconds: settings.work_time,
            settings,
        }
    }

    /// Starts a phase that expires `duration_secs` after `now`.
    pub fn start_phase(&mut self, session_type: SessionType, now: i64, duration_secs: u32) {
        self.run_until(session_type, now + i64::from(duration_secs) * 1000);
    }

    /// Starts a phase with an explicit absolute deadline.
    pub fn run_until(&mut self, session_type: SessionType, end_timestamp: i64) {
        self.session_type = session_type;
        self.is_running = true;
        self.end_timestamp = Some(end_timestamp);
        self.remaining_seconds = 0;
    }

    /// Freezes the remaining time and drops the deadline.
    ///
    /// Does nothing if the timer is not running.
    pub fn pause(&mut self, now: i64) {
        if !self.is_running {
            return;
        }
        self.remaining_seconds = self.remaining_at(now);
        self.is_running = false;
        self.end_timestamp = None;
    }

    /// Stops the timer and returns to the start of a cycle.
    pub fn reset(&mut self) {
        self.session_type = SessionType::Work;
        self.session_count = 0;
        self.is_running = false;
        self.end_timestamp = None;
        self.remaining_seconds = self.settings.work_time;
    }

    /// Returns the seconds left at `now`.
    pub fn remaining_at(&self, now: i64) -> u32 {
        match (self.is_running, self.end_timestamp) {
            (true, Some(end)) => seconds_until(end, now),
            _ => self.remaining_seconds,
        }
    }

    /// Returns true when the running deadline has passed.
    pub fn is_expired(&self, now: i64) -> bool {
        matches!((self.is_running, self.end_timestamp), (true, Some(end)) if now >= end)
    }

    /// Returns true while a work session is running.
    pub fn is_focus_active(&self) -> bool {
        self.is_running && self.session_type.is_work()
    }

    /// Returns the `getState` view of this state.
    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            is_running: self.is_running,
            timer_end_time: if self.is_running {
                self.end_timestamp
            } else {
                None
            },
            timer_session_type: self.session_type,
            timer_session_count: self.session_count,
        }
    }
}

/// Whole seconds from `now` until `end`, rounded up and never negative.
pub fn seconds_until(end: i64, now: i64) -> u32 {
    let remaining = end - now;
    if remaining <= 0 {
        return 0;
    }
    let secs = (remaining + 999) / 1000;
    u32::try_from(secs).unwrap_or(u32::MAX)
}

// ============================================================================
// StateSnapshot
// ============================================================================

/// Response payload of `getState`.
///
/// Every field defaults so a partially written owner record still decodes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StateSnapshot {
    /// Whether the owner has a live deadline
    pub is_running: bool,
    /// Absolute deadline in epoch milliseconds
    pub timer_end_time: Option<i64>,
    /// Active phase
    pub timer_session_type: SessionType,
    /// Completed work sessions in the current cycle
    pub timer_session_count: u32,
}

impl StateSnapshot {
    /// Returns the seconds left at `now`, or `None` when not running.
    pub fn time_left_at(&self, now: i64) -> Option<u32> {
        match (self.is_running, self.timer_end_time) {
            (true, Some(end)) => Some(seconds_until(end, now)),
            _ => None,
        }
    }

    /// Returns the live deadline, if any.
    pub fn running_deadline(&self) -> Option<i64> {
        if self.is_running {
            self.timer_end_time
        } else {
            None
        }
    }
}

// ============================================================================
// Pages and navigation
// ============================================================================

/// Identifier of an observer surface (an overlay page or the controller).
pub type SurfaceId = Uuid;

/// Page information an overlay instance reports when subscribing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    /// Current URL of the page, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Pinned pages are never closed by the session-start sweep
    #[serde(default)]
    pub pinned: bool,
}

/// A navigation attempt reported before it completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Navigation {
    /// Page performing the navigation, if it is a registered surface
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tab_id: Option<SurfaceId>,
    /// Destination URL
    pub url: String,
    /// Frame identifier; `0` is the top-level frame
    #[serde(default)]
    pub frame_id: u32,
}

impl Navigation {
    /// Creates a top-level navigation.
    pub fn top_level(tab_id: Option<SurfaceId>, url: impl Into<String>) -> Self {
        Self {
            tab_id,
            url: url.into(),
            frame_id: 0,
        }
    }

    /// Returns true for the top-level frame.
    pub fn is_top_level(&self) -> bool {
        self.frame_id == 0
    }
}

/// Outcome of checking a navigation against the allow-list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NavigationVerdict {
    /// Destination is allow-listed or internal
    Allowed,
    /// Destination is not allow-listed; the page is closed
    Blocked,
    /// Enforcement did not apply (not a work session, sub-frame, bad URL)
    Ignored,
}

impl NavigationVerdict {
    /// Returns the wire representation of the verdict.
    pub fn as_str(&self) -> &'static str {
        match self {
            NavigationVerdict::Allowed => "allowed",
            NavigationVerdict::Blocked => "blocked",
            NavigationVerdict::Ignored => "ignored",
        }
    }
}

// ============================================================================
// IPC Types
// ============================================================================

/// Parameters of the `startTimer` command.
///
/// `end_time` wins over `duration`, which wins over the configured duration
/// of `session_type`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    /// Absolute deadline in epoch milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<i64>,
    /// Phase duration in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    /// Phase to start
    #[serde(default)]
    pub session_type: SessionType,
    /// Completed work sessions so far in the cycle
    #[serde(default)]
    pub session_count: u32,
    /// Durations and cycle length to persist
    #[serde(default)]
    pub settings: TimerSettings,
}

impl StartRequest {
    /// Creates a request for a fresh work session with the given settings.
    pub fn work(settings: TimerSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    /// Resolves the absolute deadline of the requested phase.
    pub fn deadline(&self, now: i64) -> i64 {
        if let Some(end_time) = self.end_time {
            return end_time;
        }
        let secs = self
            .duration
            .unwrap_or_else(|| self.settings.duration_for(self.session_type));
        now + i64::from(secs) * 1000
    }
}

/// Command from an observer context to the authoritative owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum IpcRequest {
    /// Start (or replace) the running phase
    StartTimer(StartRequest),
    /// Stop and reset the timer
    StopTimer,
    /// Query the persisted state
    GetState,
    /// Register as an observer surface and keep the connection open for events
    Subscribe {
        /// Page the overlay lives in, if any
        #[serde(default, skip_serializing_if = "Option::is_none")]
        page: Option<PageInfo>,
    },
    /// Check a navigation against the focus policy
    CheckNavigation(Navigation),
}

/// Event broadcast from the owner to observer surfaces.
///
/// Every phase change carries the absolute `end_time`, so a repeated or
/// stale event leaves a receiver in the same state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ObserverEvent {
    /// A phase started
    StartTimer {
        /// Absolute deadline in epoch milliseconds
        #[serde(rename = "endTime")]
        end_time: i64,
        /// Phase that started
        #[serde(rename = "sessionType")]
        session_type: SessionType,
        /// Completed work sessions in the cycle
        #[serde(rename = "sessionCount")]
        session_count: u32,
    },
    /// Periodic countdown refresh
    UpdateTime {
        /// Seconds left, rounded up
        #[serde(rename = "timeLeft")]
        time_left: u32,
    },
    /// Timer stopped
    StopTimer,
    /// Overlay should hide without a stop
    HideTimer,
    /// The focus enforcer closed the receiving page
    ClosePage,
}

/// IPC response from the owner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpcResponse {
    /// Response status ("success" or "error")
    pub status: String,
    /// Human-readable message
    pub message: String,
    /// Timer snapshot, when the command produces one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<StateSnapshot>,
    /// Navigation verdict for `checkNavigation`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verdict: Option<NavigationVerdict>,
    /// Surface assigned to a `subscribe` connection
    #[serde(
        rename = "surfaceId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub surface_id: Option<SurfaceId>,
}

impl IpcResponse {
    /// Creates a success response.
    pub fn success(message: impl Into<String>, data: Option<StateSnapshot>) -> Self {
        Self {
            status: "success".to_string(),
            message: message.into(),
            data,
            verdict: None,
            surface_id: None,
        }
    }

    /// Creates the first response of a `subscribe` connection.
    pub fn subscribed(surface_id: SurfaceId, data: StateSnapshot) -> Self {
        Self {
            surface_id: Some(surface_id),
            ..Self::success("Subscribed", Some(data))
        }
    }

    /// Creates a success response carrying a navigation verdict.
    pub fn verdict(verdict: NavigationVerdict) -> Self {
        Self {
            status: "success".to_string(),
            message: verdict.as_str().to_string(),
            data: None,
            verdict: Some(verdict),
            surface_id: None,
        }
    }

    /// Creates an error response.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
            data: None,
            verdict: None,
            surface_id: None,
        }
    }

    /// Returns true for success responses.
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // ------------------------------------------------------------------------
    // SessionType Tests
    // ------------------------------------------------------------------------

    mod session_type_tests {
        use super::*;

        #[test]
        fn test_default_is_work() {
            assert_eq!(SessionType::default(), SessionType::Work);
        }

        #[test]
        fn test_as_str_and_parse() {
            for session_type in [
                SessionType::Work,
                SessionType::ShortBreak,
                SessionType::LongBreak,
            ] {
                assert_eq!(SessionType::parse(session_type.as_str()), Some(session_type));
            }
            assert_eq!(SessionType::parse("nap"), None);
        }

        #[test]
        fn test_wire_format() {
            let json = serde_json::to_string(&SessionType::ShortBreak).unwrap();
            assert_eq!(json, "\"shortBreak\"");
        }

        #[test]
        fn test_is_work() {
            assert!(SessionType::Work.is_work());
            assert!(SessionType::ShortBreak.is_break());
            assert!(SessionType::LongBreak.is_break());
        }
    }

    // ------------------------------------------------------------------------
    // TimerSettings Tests
    // ------------------------------------------------------------------------

    mod timer_settings_tests {
        use super::*;

        #[test]
        fn test_default_values() {
            let settings = TimerSettings::default();
            assert_eq!(settings.work_time, 1500);
            assert_eq!(settings.short_break, 300);
            assert_eq!(settings.long_break, 900);
            assert_eq!(settings.sessions_before_long_break, 4);
        }

        #[test]
        fn test_builder_clamps_minutes() {
            let settings = TimerSettings::default()
                .with_work_minutes(0)
                .with_short_break_minutes(10)
                .with_long_break_minutes(20);

            assert_eq!(settings.work_time, 60);
            assert_eq!(settings.short_break, 600);
            assert_eq!(settings.long_break, 1200);
        }

        #[test]
        fn test_duration_for() {
            let settings = TimerSettings::default();
            assert_eq!(settings.duration_for(SessionType::Work), 1500);
            assert_eq!(settings.duration_for(SessionType::ShortBreak), 300);
            assert_eq!(settings.duration_for(SessionType::LongBreak), 900);
        }

        #[test]
        fn test_validate() {
            assert!(TimerSettings::default().validate().is_ok());

            let zero_work = TimerSettings {
                work_time: 0,
                ..Default::default()
            };
            assert!(zero_work.validate().unwrap_err().contains("work time"));

            let no_sessions = TimerSettings::default().with_sessions_before_long_break(0);
            assert!(no_sessions.validate().is_err());

            let too_long = TimerSettings {
                long_break: MAX_PHASE_SECS + 1,
                ..Default::default()
            };
            assert!(too_long.validate().is_err());
        }

        #[test]
        fn test_wire_field_names() {
            let json = serde_json::to_value(TimerSettings::default()).unwrap();
            assert_eq!(json["workTime"], 1500);
            assert_eq!(json["shortBreak"], 300);
            assert_eq!(json["longBreak"], 900);
            assert_eq!(json["sessionsBeforeLongBreak"], 4);
        }

        #[test]
        fn test_partial_settings_use_defaults() {
            let settings: TimerSettings = serde_json::from_str(r#"{"workTime":60}"#).unwrap();
            assert_eq!(settings.work_time, 60);
            assert_eq!(settings.short_break, 300);
        }
    }

    // ------------------------------------------------------------------------
    // TimerState Tests
    // ------------------------------------------------------------------------

    mod timer_state_tests {
        use super::*;

        #[test]
        fn test_new_state() {
            let state = TimerState::new(TimerSettings::default());
            assert_eq!(state.session_type, SessionType::Work);
            assert_eq!(state.session_count, 0);
            assert!(!state.is_running);
            assert_eq!(state.end_timestamp, None);
            assert_eq!(state.remaining_seconds, 1500);
        }

        #[test]
        fn test_start_phase_sets_absolute_deadline() {
            let mut state = TimerState::new(TimerSettings::default());
            state.start_phase(SessionType::Work, 10_000, 1500);

            assert!(state.is_running);
            assert_eq!(state.end_timestamp, Some(1_510_000));
            assert_eq!(state.remaining_at(10_000), 1500);
            assert_eq!(state.remaining_at(10_001), 1500);
            assert_eq!(state.remaining_at(11_000), 1499);
        }

        #[test]
        fn test_pause_freezes_remaining() {
            let mut state = TimerState::new(TimerSettings::default());
            state.start_phase(SessionType::Work, 0, 1500);

            state.pause(100_500);

            assert!(!state.is_running);
            assert_eq!(state.end_timestamp, None);
            assert_eq!(state.remaining_seconds, 1400);
            assert_eq!(state.remaining_at(999_999), 1400);
        }

        #[test]
        fn test_pause_when_stopped_does_nothing() {
            let mut state = TimerState::new(TimerSettings::default());
            state.remaining_seconds = 42;
            state.pause(5_000);
            assert_eq!(state.remaining_seconds, 42);
        }

        #[test]
        fn test_reset() {
            let mut state = TimerState::new(TimerSettings::default());
            state.start_phase(SessionType::ShortBreak, 0, 300);
            state.session_count = 3;

            state.reset();

            assert!(!state.is_running);
            assert_eq!(state.end_timestamp, None);
            assert_eq!(state.session_count, 0);
            assert_eq!(state.session_type, SessionType::Work);
            assert_eq!(state.remaining_seconds, 1500);
        }

        #[test]
        fn test_is_expired() {
            let mut state = TimerState::new(TimerSettings::default());
            assert!(!state.is_expired(i64::MAX));

            state.start_phase(SessionType::Work, 0, 10);
            assert!(!state.is_expired(9_999));
            assert!(state.is_expired(10_000));
        }

        #[test]
        fn test_focus_active_only_while_working() {
            let mut state = TimerState::new(TimerSettings::default());
            assert!(!state.is_focus_active());

            state.start_phase(SessionType::Work, 0, 10);
            assert!(state.is_focus_active());

            state.start_phase(SessionType::ShortBreak, 0, 10);
            assert!(!state.is_focus_active());
        }

        #[test]
        fn test_snapshot_hides_deadline_when_paused() {
            let mut state = TimerState::new(TimerSettings::default());
            state.start_phase(SessionType::Work, 0, 10);
            assert_eq!(state.snapshot().timer_end_time, Some(10_000));

            state.pause(1_000);
            let snapshot = state.snapshot();
            assert!(!snapshot.is_running);
            assert_eq!(snapshot.timer_end_time, None);
        }

        #[test]
        fn test_seconds_until_rounds_up() {
            assert_eq!(seconds_until(1_000, 0), 1);
            assert_eq!(seconds_until(1_001, 0), 2);
            assert_eq!(seconds_until(0, 0), 0);
            assert_eq!(seconds_until(0, 90_000), 0);
        }
    }

    // ------------------------------------------------------------------------
    // IPC Type Tests
    // ------------------------------------------------------------------------

    mod ipc_tests {
        use super::*;

        #[test]
        fn test_get_state_request_format() {
            let json = serde_json::to_string(&IpcRequest::GetState).unwrap();
            assert_eq!(json, r#"{"command":"getState"}"#);
        }

        #[test]
        fn test_start_request_from_wire() {
            let json = r#"{
                "command": "startTimer",
                "endTime": 1700000000000,
                "sessionType": "work",
                "sessionCount": 2,
                "settings": {"workTime": 1500, "shortBreak": 300, "longBreak": 900, "sessionsBeforeLongBreak": 4}
            }"#;
            let request: IpcRequest = serde_json::from_str(json).unwrap();

            match request {
                IpcRequest::StartTimer(start) => {
                    assert_eq!(start.end_time, Some(1_700_000_000_000));
                    assert_eq!(start.session_count, 2);
                    assert_eq!(start.settings, TimerSettings::default());
                }
                other => panic!("unexpected request: {:?}", other),
            }
        }

        #[test]
        fn test_start_request_deadline_precedence() {
            let mut request = StartRequest::work(TimerSettings::default());
            assert_eq!(request.deadline(0), 1_500_000);

            request.duration = Some(60);
            assert_eq!(request.deadline(0), 60_000);

            request.end_time = Some(5);
            assert_eq!(request.deadline(0), 5);
        }

        #[test]
        fn test_check_navigation_request() {
            let json = r#"{"command":"checkNavigation","url":"https://x.com/","frameId":0}"#;
            let request: IpcRequest = serde_json::from_str(json).unwrap();
            assert_eq!(
                request,
                IpcRequest::CheckNavigation(Navigation::top_level(None, "https://x.com/"))
            );
        }

        #[test]
        fn test_subscribe_without_page() {
            let request: IpcRequest = serde_json::from_str(r#"{"command":"subscribe"}"#).unwrap();
            assert_eq!(request, IpcRequest::Subscribe { page: None });
        }

        #[test]
        fn test_observer_event_format() {
            let event = ObserverEvent::StartTimer {
                end_time: 42,
                session_type: SessionType::LongBreak,
                session_count: 4,
            };
            let json = serde_json::to_string(&event).unwrap();
            assert_eq!(
                json,
                r#"{"action":"startTimer","endTime":42,"sessionType":"longBreak","sessionCount":4}"#
            );

            let json = serde_json::to_string(&ObserverEvent::UpdateTime { time_left: 7 }).unwrap();
            assert_eq!(json, r#"{"action":"updateTime","timeLeft":7}"#);
        }

        #[test]
        fn test_partial_snapshot_decodes_as_stopped() {
            let snapshot: StateSnapshot = serde_json::from_str("{}").unwrap();
            assert!(!snapshot.is_running);
            assert_eq!(snapshot.timer_end_time, None);
            assert_eq!(snapshot.timer_session_type, SessionType::Work);
        }

        #[test]
        fn test_snapshot_time_left() {
            let snapshot = StateSnapshot {
                is_running: true,
                timer_end_time: Some(10_000),
                ..Default::default()
            };
            assert_eq!(snapshot.time_left_at(0), Some(10));
            assert_eq!(snapshot.running_deadline(), Some(10_000));

            let stopped = StateSnapshot::default();
            assert_eq!(stopped.time_left_at(0), None);
        }

        #[test]
        fn test_response_helpers() {
            let ok = IpcResponse::success("ok", None);
            assert!(ok.is_success());

            let err = IpcResponse::error("bad");
            assert!(!err.is_success());
            assert_eq!(err.message, "bad");

            let blocked = IpcResponse::verdict(NavigationVerdict::Blocked);
            assert_eq!(blocked.verdict, Some(NavigationVerdict::Blocked));
            assert_eq!(blocked.message, "blocked");

            let id = Uuid::new_v4();
            let subscribed = IpcResponse::subscribed(id, StateSnapshot::default());
            let json = serde_json::to_value(&subscribed).unwrap();
            assert_eq!(json["surfaceId"], id.to_string());
            assert!(subscribed.data.is_some());
        }
    }
}
