//! Timer engine for the background owner.
//!
//! This module provides the owner side of the timer:
//! - Commands (`startTimer`, `stopTimer`, `getState`, `checkNavigation`)
//! - The wake handler driven by the self-rearming [`Alarm`]
//! - Broadcasting to observer surfaces and focus enforcement
//! - Event firing for notifications
//!
//! The engine keeps no timer state in memory. Every operation reads the
//! persisted record, so a restarted owner continues exactly where the
//! previous one stopped.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tokio::time::Duration;
use tracing::{debug, info, warn};

use crate::bus::Broadcaster;
use crate::clock::{Clock, SystemClock};
use crate::focus::{self, FocusEnforcer};
use crate::machine::{self, Transition};
use crate::store::TimerRepository;
use crate::types::{
    Navigation, NavigationVerdict, ObserverEvent, SessionType, StartRequest, StateSnapshot,
    TimerSettings, TimerState,
};

use super::scheduler::{Alarm, MIN_WAKE_INTERVAL};

// ============================================================================
// TimerEvent
// ============================================================================

/// Timer events for notifications and external integrations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerEvent {
    /// A phase started, by command or by a transition
    PhaseStarted {
        /// Phase that started
        session_type: SessionType,
        /// Completed work sessions in the cycle
        session_count: u32,
        /// Absolute deadline in epoch milliseconds
        end_time: i64,
    },
    /// A phase ran out
    PhaseCompleted {
        /// The transition that was applied
        transition: Transition,
    },
    /// Timer stopped by command
    Stopped,
}

/// What a wake did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeOutcome {
    /// Nothing is running; no further wake is scheduled
    Idle,
    /// Deadline still ahead; observers got an `updateTime`
    Ticked {
        /// Seconds left, rounded up
        time_left: u32,
    },
    /// The deadline passed and the state advanced
    Advanced {
        /// The transition that was applied
        transition: Transition,
    },
}

// ============================================================================
// TimerEngine
// ============================================================================

/// Timer engine of the authoritative owner.
pub struct TimerEngine {
    /// Persisted timer state
    repository: TimerRepository,
    /// Defaults used when the store holds no settings
    settings: TimerSettings,
    /// Observer surfaces; registered pages are what the sweep closes
    broadcaster: Arc<Broadcaster>,
    /// Allow-list policy
    enforcer: FocusEnforcer,
    /// Wake scheduler
    alarm: Arc<dyn Alarm>,
    /// Time source
    clock: Arc<dyn Clock>,
    /// Delay between wakes while running
    wake_interval: Duration,
    /// Event sender channel
    event_tx: mpsc::UnboundedSender<TimerEvent>,
}

impl TimerEngine {
    /// Creates an engine over the owner repository.
    ///
    /// Pages registered on `broadcaster` are the tabs the enforcer sweeps.
    pub fn new(
        repository: TimerRepository,
        broadcaster: Arc<Broadcaster>,
        alarm: Arc<dyn Alarm>,
        event_tx: mpsc::UnboundedSender<TimerEvent>,
    ) -> Self {
        Self {
            repository,
            settings: TimerSettings::default(),
            broadcaster,
            enforcer: FocusEnforcer::default(),
            alarm,
            clock: Arc::new(SystemClock),
            wake_interval: MIN_WAKE_INTERVAL,
            event_tx,
        }
    }

    /// Sets the default settings.
    #[must_use]
    pub fn with_settings(mut self, settings: TimerSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Sets the allow-list policy.
    #[must_use]
    pub fn with_focus(mut self, enforcer: FocusEnforcer) -> Self {
        self.enforcer = enforcer;
        self
    }

    /// Replaces the time source.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Sets the delay between wakes, never below [`MIN_WAKE_INTERVAL`].
    #[must_use]
    pub fn with_wake_interval(mut self, interval: Duration) -> Self {
        self.wake_interval = interval.max(MIN_WAKE_INTERVAL);
        self
    }

    /// Returns the broadcaster observers register on.
    pub fn broadcaster(&self) -> &Arc<Broadcaster> {
        &self.broadcaster
    }

    /// Returns the persisted state.
    pub fn state(&self) -> TimerState {
        self.repository.load(&self.settings)
    }

    /// Returns the `getState` view of the persisted state.
    pub fn snapshot(&self) -> StateSnapshot {
        self.state().snapshot()
    }

    /// Starts (or replaces) the running phase.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings are invalid or the state cannot be
    /// persisted.
    pub fn start(&mut self, request: StartRequest) -> Result<StateSnapshot> {
        request.settings.validate().map_err(anyhow::Error::msg)?;

        let now = self.clock.now_millis();
        let mut state = TimerState::new(request.settings.clone());
        state.session_count = request.session_count;
        state.run_until(request.session_type, request.deadline(now));

        self.repository
            .save(&state)
            .context("failed to save timer state")?;

        info!(
            "Started {} (session {}), ends at {:?}",
            state.session_type.as_str(),
            state.session_count,
            state.end_timestamp
        );
        self.enter_phase(&state)?;

        Ok(state.snapshot())
    }

    /// Stops the timer, clears the schedule and resets the persisted state.
    ///
    /// Stopping an idle timer is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the reset cannot be persisted.
    pub fn stop(&mut self) -> Result<StateSnapshot> {
        self.alarm.clear();

        let state = self
            .repository
            .reset(&self.settings)
            .context("failed to reset timer state")?;

        self.broadcaster.broadcast(&ObserverEvent::StopTimer);
        self.event_tx
            .send(TimerEvent::Stopped)
            .context("Failed to send stopped event")?;

        info!("Timer stopped");
        Ok(state.snapshot())
    }

    /// Handles one alarm wake.
    ///
    /// Decisions come from the persisted absolute deadline, so duplicate or
    /// late wakes land on the same state as punctual ones.
    ///
    /// # Errors
    ///
    /// Returns an error if an advanced state cannot be persisted.
    pub fn wake(&mut self) -> Result<WakeOutcome> {
        let now = self.clock.now_millis();
        let state = self.state();

        if !state.is_running {
            debug!("Wake while stopped, not rescheduling");
            return Ok(WakeOutcome::Idle);
        }

        let step = machine::advance(&state, now);
        if !step.transition.is_transition() {
            let time_left = state.remaining_at(now);
            self.broadcaster
                .broadcast(&ObserverEvent::UpdateTime { time_left });
            self.alarm.arm(self.wake_interval);
            return Ok(WakeOutcome::Ticked { time_left });
        }

        let next = step.state;
        self.repository
            .save(&next)
            .context("failed to save timer state")?;

        info!(
            "Phase {} ended, now {} (count {})",
            state.session_type.as_str(),
            next.session_type.as_str(),
            next.session_count
        );
        self.event_tx
            .send(TimerEvent::PhaseCompleted {
                transition: step.transition,
            })
            .context("Failed to send phase completed event")?;

        if next.is_running {
            self.enter_phase(&next)?;
        } else {
            self.alarm.clear();
            self.broadcaster.broadcast(&ObserverEvent::StopTimer);
        }

        Ok(WakeOutcome::Advanced {
            transition: step.transition,
        })
    }

    /// Checks a navigation against the focus policy.
    ///
    /// A blocked navigation closes the originating page when it is known.
    /// Any other top-level navigation of a known page becomes that page's
    /// recorded URL, which the next session-start sweep judges.
    pub fn check_navigation(&self, navigation: &Navigation) -> NavigationVerdict {
        let focus_active = self.repository.is_focus_active();
        let verdict = self.enforcer.check_navigation(navigation, focus_active);

        if verdict == NavigationVerdict::Blocked {
            info!("Blocked navigation to {}", navigation.url);
        }
        let Some(page_id) = navigation.tab_id else {
            return verdict;
        };

        if verdict == NavigationVerdict::Blocked {
            if let Err(e) = focus::close_page(&self.broadcaster, page_id) {
                warn!("Failed to close blocked page {}: {}", page_id, e);
            }
        } else if navigation.is_top_level() {
            self.broadcaster.record_url(page_id, &navigation.url);
        }

        verdict
    }

    /// Resumes the wake loop after an owner restart.
    ///
    /// Returns true if a persisted running state was found. The first wake
    /// is immediate so an expired deadline advances right away.
    pub fn recover(&mut self) -> bool {
        let state = self.state();
        if !state.is_running {
            return false;
        }
        info!(
            "Recovered running {} ending at {:?}",
            state.session_type.as_str(),
            state.end_timestamp
        );
        self.alarm.arm(Duration::ZERO);
        true
    }

    /// Arms the next regular wake if a phase is running.
    ///
    /// Used after a failed wake so a transient store error does not leave a
    /// running timer without a schedule.
    pub fn reschedule(&self) {
        if self.state().is_running {
            self.alarm.arm(self.wake_interval);
        }
    }

    /// Sweeps for work, announces the phase and arms the next wake.
    fn enter_phase(&self, state: &TimerState) -> Result<()> {
        let Some(end_time) = state.end_timestamp else {
            return Ok(());
        };

        if state.session_type.is_work() {
            let report = self.enforcer.sweep(&self.broadcaster);
            debug!(
                "Sweep closed {} page(s), kept {}, skipped {}",
                report.closed.len(),
                report.kept,
                report.skipped
            );
        }

        self.broadcaster.broadcast(&ObserverEvent::StartTimer {
            end_time,
            session_type: state.session_type,
            session_count: state.session_count,
        });
        self.alarm.arm(self.wake_interval);

        self.event_tx
            .send(TimerEvent::PhaseStarted {
                session_type: state.session_type,
                session_count: state.session_count,
                end_time,
            })
            .context("Failed to send phase started event")?;

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
