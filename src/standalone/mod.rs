//! Standalone fallback engine.
//!
//! When no owner answers `getState`, the controller becomes the sole writer
//! of its own mirror of the timer state. It uses the same state machine and
//! the same absolute-deadline discipline as the daemon, driven by a local
//! repeating check instead of an alarm. Focus enforcement is inert here:
//! nothing is watching pages or navigations in this mode.
//!
//! A reload (a new controller process) first catches up on everything that
//! expired while nobody was running, so a missed transition is never
//! dropped and a countdown never goes negative.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::time::{Duration, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::machine::{self, Transition};
use crate::notification::{NotificationKind, Notifier};
use crate::store::TimerRepository;
use crate::types::{TimerSettings, TimerState};

/// Period of the local repeating check.
pub const CHECK_INTERVAL: Duration = Duration::from_millis(250);

/// Controller-local timer engine.
pub struct StandaloneEngine {
    /// Controller mirror
    repository: TimerRepository,
    /// Defaults used when the mirror holds no settings
    settings: TimerSettings,
    /// Time source
    clock: Arc<dyn Clock>,
    /// Phase-completion notifications
    notifier: Arc<dyn Notifier>,
}

impl StandaloneEngine {
    /// Creates an engine over the controller mirror.
    pub fn new(repository: TimerRepository, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            repository,
            settings: TimerSettings::default(),
            clock: Arc::new(SystemClock),
            notifier,
        }
    }

    /// Sets the default settings.
    #[must_use]
    pub fn with_settings(mut self, settings: TimerSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Replaces the time source.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Returns the current time from the engine's clock.
    pub fn now(&self) -> i64 {
        self.clock.now_millis()
    }

    /// Returns the mirrored state without catching up.
    pub fn state(&self) -> TimerState {
        self.repository.load(&self.settings)
    }

    /// Catches up on a reload.
    ///
    /// Applies every transition that came due while no controller was
    /// running, notifying once per transition.
    ///
    /// # Errors
    ///
    /// Returns an error if the advanced state cannot be persisted.
    pub fn recover(&self) -> Result<TimerState> {
        let (state, transitions) = self.check()?;
        if !transitions.is_empty() {
            info!(
                "Caught up on {} transition(s), now {} (count {})",
                transitions.len(),
                state.session_type.as_str(),
                state.session_count
            );
        }
        Ok(state)
    }

    /// Runs one local check.
    ///
    /// Returns the resulting state and the transitions applied, in order.
    ///
    /// # Errors
    ///
    /// Returns an error if the advanced state cannot be persisted.
    pub fn check(&self) -> Result<(TimerState, Vec<Transition>)> {
        let state = self.state();
        let (next, transitions) = machine::catch_up(&state, self.now());
        if transitions.is_empty() {
            return Ok((state, transitions));
        }

        self.repository
            .save(&next)
            .context("failed to save timer state")?;
        for transition in &transitions {
            self.notify(transition);
        }
        Ok((next, transitions))
    }

    /// Starts the current phase.
    ///
    /// A paused remainder is resumed; otherwise the phase runs for its full
    /// duration. Starting a running timer changes nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be persisted.
    pub fn start(&self) -> Result<TimerState> {
        let mut state = self.recover()?;
        if state.is_running {
            debug!("Already running");
            return Ok(state);
        }

        let duration = match state.remaining_seconds {
            0 => state.settings.duration_for(state.session_type),
            remaining => remaining,
        };
        state.start_phase(state.session_type, self.now(), duration);
        self.repository
            .save(&state)
            .context("failed to save timer state")?;

        info!(
            "Started {} for {}s (standalone)",
            state.session_type.as_str(),
            duration
        );
        Ok(state)
    }

    /// Freezes the remaining time.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be persisted.
    pub fn pause(&self) -> Result<TimerState> {
        let mut state = self.recover()?;
        if !state.is_running {
            return Ok(state);
        }

        state.pause(self.now());
        self.repository
            .save(&state)
            .context("failed to save timer state")?;
        info!("Paused with {}s left (standalone)", state.remaining_seconds);
        Ok(state)
    }

    /// Stops and returns to the start of a cycle, dropping any paused remainder.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be persisted.
    pub fn reset(&self) -> Result<TimerState> {
        self.repository
            .reset(&self.settings)
            .context("failed to reset timer state")
    }

    /// Stores new durations.
    ///
    /// While not running, the displayed remaining time follows the new
    /// duration of the current phase. A running phase keeps its deadline.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings are invalid or cannot be persisted.
    pub fn update_settings(&self, settings: TimerSettings) -> Result<TimerState> {
        settings.validate().map_err(anyhow::Error::msg)?;

        let mut state = self.state();
        if state.settings == settings {
            return Ok(state);
        }
        state.settings = settings;
        if !state.is_running {
            state.remaining_seconds = state.settings.duration_for(state.session_type);
        }
        self.repository
            .save(&state)
            .context("failed to save timer state")?;
        Ok(state)
    }

    /// Drives the repeating check until `shutdown` resolves.
    ///
    /// `on_tick` sees the state after every check.
    ///
    /// # Errors
    ///
    /// Returns an error if a check fails to persist.
    pub async fn run<F, S>(&self, mut on_tick: F, shutdown: S) -> Result<()>
    where
        F: FnMut(&TimerState, &[Transition]),
        S: std::future::Future<Output = ()>,
    {
        let mut interval = tokio::time::interval(CHECK_INTERVAL);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let (state, transitions) = self.check()?;
                    on_tick(&state, &transitions);
                }
                _ = &mut shutdown => return Ok(()),
            }
        }
    }

    fn notify(&self, transition: &Transition) {
        let Some(kind) = NotificationKind::for_transition(transition) else {
            return;
        };
        if let Err(e) = self.notifier.notify(kind) {
            warn!("Failed to notify: {}", e);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
