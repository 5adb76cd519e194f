//! Timer state persistence.
//!
//! Maps [`TimerState`] onto a [`StoreKeys`] namespace. Loading never fails
//! the caller: a missing, partial or unreadable record yields a stopped
//! state, which is always a safe place for the state machine to start.

use std::sync::Arc;

use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::types::{SessionType, TimerSettings, TimerState};

use super::{KeyValueStore, StoreError, StoreKeys, OWNER_KEYS, STANDALONE_KEYS};

/// Reads and writes a [`TimerState`] in a key/value store.
#[derive(Clone)]
pub struct TimerRepository {
    store: Arc<dyn KeyValueStore>,
    keys: StoreKeys,
}

impl std::fmt::Debug for TimerRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerRepository")
            .field("keys", &self.keys)
            .finish_non_exhaustive()
    }
}

impl TimerRepository {
    /// Creates a repository over `store` using the given key namespace.
    pub fn new(store: Arc<dyn KeyValueStore>, keys: StoreKeys) -> Self {
        Self { store, keys }
    }

    /// Repository for the background owner's keys.
    pub fn owner(store: Arc<dyn KeyValueStore>) -> Self {
        Self::new(store, OWNER_KEYS)
    }

    /// Repository for the controller's standalone mirror keys.
    pub fn standalone(store: Arc<dyn KeyValueStore>) -> Self {
        Self::new(store, STANDALONE_KEYS)
    }

    /// Returns the key namespace.
    pub fn keys(&self) -> &StoreKeys {
        &self.keys
    }

    /// Loads the persisted state, falling back to a stopped state.
    pub fn load(&self, defaults: &TimerSettings) -> TimerState {
        match self.try_load(defaults) {
            Ok(state) => state,
            Err(e) => {
                warn!("Failed to read timer state, starting clean: {}", e);
                TimerState::new(defaults.clone())
            }
        }
    }

    /// Loads the persisted state, surfacing store errors.
    pub fn try_load(&self, defaults: &TimerSettings) -> Result<TimerState, StoreError> {
        let keys = self.keys.all();
        let data = self.store.get_many(&keys)?;
        Ok(self.decode(&data, defaults))
    }

    fn decode(&self, data: &Map<String, Value>, defaults: &TimerSettings) -> TimerState {
        let k = &self.keys;
        let settings = TimerSettings {
            work_time: read_u32(data, k.work_time).unwrap_or(defaults.work_time),
            short_break: read_u32(data, k.short_break).unwrap_or(defaults.short_break),
            long_break: read_u32(data, k.long_break).unwrap_or(defaults.long_break),
            sessions_before_long_break: read_u32(data, k.sessions_before_long_break)
                .unwrap_or(defaults.sessions_before_long_break),
        };
        let settings = match settings.validate() {
            Ok(()) => settings,
            Err(e) => {
                warn!("Ignoring persisted settings: {}", e);
                defaults.clone()
            }
        };

        let mut state = TimerState::new(settings);
        state.session_type = data
            .get(k.session_type)
            .and_then(Value::as_str)
            .and_then(SessionType::parse)
            .unwrap_or_default();
        state.session_count = read_u32(data, k.session_count).unwrap_or(0);

        let is_running = data
            .get(k.is_running)
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let end_time = read_i64(data, k.end_time);

        match (is_running, end_time) {
            (true, Some(end)) => {
                state.run_until(state.session_type, end);
            }
            (true, None) => {
                debug!("Running flag without a deadline, treating as stopped");
                state.reset();
            }
            (false, _) => {
                state.remaining_seconds = read_u32(data, k.remaining_seconds)
                    .unwrap_or_else(|| state.settings.duration_for(state.session_type));
            }
        }

        state
    }

    /// Persists the full state.
    pub fn save(&self, state: &TimerState) -> Result<(), StoreError> {
        let k = &self.keys;
        let mut entries = Map::new();
        entries.insert(k.is_running.to_string(), json!(state.is_running));
        entries.insert(
            k.end_time.to_string(),
            json!(if state.is_running {
                state.end_timestamp
            } else {
                None
            }),
        );
        entries.insert(
            k.session_type.to_string(),
            json!(state.session_type.as_str()),
        );
        entries.insert(k.session_count.to_string(), json!(state.session_count));
        entries.insert(
            k.remaining_seconds.to_string(),
            if state.is_running {
                Value::Null
            } else {
                json!(state.remaining_seconds)
            },
        );
        entries.insert(k.work_time.to_string(), json!(state.settings.work_time));
        entries.insert(k.short_break.to_string(), json!(state.settings.short_break));
        entries.insert(k.long_break.to_string(), json!(state.settings.long_break));
        entries.insert(
            k.sessions_before_long_break.to_string(),
            json!(state.settings.sessions_before_long_break),
        );
        if let Some(focus_key) = k.is_focus_active {
            entries.insert(focus_key.to_string(), json!(state.is_focus_active()));
        }

        self.store.set_many(entries)
    }

    /// Persists a stopped state at the start of a cycle and returns it.
    ///
    /// Durations already in the store are kept.
    pub fn reset(&self, defaults: &TimerSettings) -> Result<TimerState, StoreError> {
        let mut state = self.load(defaults);
        state.reset();
        self.save(&state)?;
        Ok(state)
    }

    /// Reads the navigation enforcement flag. Unreadable means inactive.
    pub fn is_focus_active(&self) -> bool {
        let Some(key) = self.keys.is_focus_active else {
            return false;
        };
        match self.store.get(key) {
            Ok(value) => value.and_then(|v| v.as_bool()).unwrap_or(false),
            Err(e) => {
                warn!("Failed to read focus flag, treating as inactive: {}", e);
                false
            }
        }
    }
}

/// Reads a non-negative integer, accepting integral floats.
fn read_u32(data: &Map<String, Value>, key: &str) -> Option<u32> {
    let value = data.get(key)?;
    if let Some(n) = value.as_u64() {
        return u32::try_from(n).ok();
    }
    value
        .as_f64()
        .filter(|f| f.is_finite() && *f >= 0.0 && f.fract() == 0.0 && *f <= f64::from(u32::MAX))
        .map(|f| f as u32)
}

/// Reads an epoch-millisecond timestamp, accepting floats.
fn read_i64(data: &Map<String, Value>, key: &str) -> Option<i64> {
    let value = data.get(key)?;
    if let Some(n) = value.as_i64() {
        return Some(n);
    }
    value
        .as_f64()
        .filter(|f| f.is_finite())
        .map(|f| f.round() as i64)
}
