//! Controller.
//!
//! Every CLI invocation is a controller "reload". It queries the owner with
//! `getState` under an explicit timeout:
//!
//! - **Owner mode**: the query succeeded. The controller yields authority
//!   right away, handing over a local deadline only if it lies further in the
//!   future than the owner's, and forwards commands.
//! - **Standalone mode**: the query failed. The controller is the sole writer
//!   of its local mirror and runs the [`StandaloneEngine`].

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::time::Duration;
use tracing::{debug, info};

use crate::clock::{Clock, SystemClock};
use crate::config::AppConfig;
use crate::notification::{ConsoleNotifier, Notifier};
use crate::standalone::StandaloneEngine;
use crate::store::{JsonFileStore, TimerRepository};
use crate::types::{
    seconds_until, SessionType, StartRequest, StateSnapshot, TimerSettings, TimerState,
};

use super::client::IpcClient;
use super::display::Display;
use super::watch::{self, FollowEnd};

/// How often a standalone `run` looks for an owner that came up.
const OWNER_RECHECK_INTERVAL: Duration = Duration::from_secs(5);

// ============================================================================
// Authority / TimerView
// ============================================================================

/// Who holds the writable timer state for this invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authority {
    /// The daemon answered `getState`
    Owner,
    /// No daemon; the controller mirror is authoritative
    Standalone,
}

impl Authority {
    /// Returns the display label.
    pub fn label(&self) -> &'static str {
        match self {
            Authority::Owner => "Daemon",
            Authority::Standalone => "Standalone",
        }
    }
}

/// What a controller command reports back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerView {
    /// Where the state came from
    pub authority: Authority,
    /// Whether a deadline is live
    pub is_running: bool,
    /// Active phase
    pub session_type: SessionType,
    /// Completed work sessions in the cycle
    pub session_count: u32,
    /// Seconds left (frozen while not running)
    pub remaining_seconds: u32,
}

impl TimerView {
    /// Builds a view of a full timer state.
    pub fn from_state(authority: Authority, state: &TimerState, now: i64) -> Self {
        Self {
            authority,
            is_running: state.is_running,
            session_type: state.session_type,
            session_count: state.session_count,
            remaining_seconds: state.remaining_at(now),
        }
    }

    /// Builds a view of a running owner snapshot.
    fn running(snapshot: &StateSnapshot, end_time: i64, now: i64) -> Self {
        Self {
            authority: Authority::Owner,
            is_running: true,
            session_type: snapshot.timer_session_type,
            session_count: snapshot.timer_session_count,
            remaining_seconds: seconds_until(end_time, now),
        }
    }
}

// ============================================================================
// Controller
// ============================================================================

/// The controller application.
pub struct Controller {
    /// Owner connection
    client: IpcClient,
    /// Explicit bound on the `getState` query
    state_timeout: Duration,
    /// Local mirror (also driven by `standalone`)
    mirror: TimerRepository,
    /// Fallback engine over the mirror
    standalone: StandaloneEngine,
    /// Defaults used when the mirror holds no settings
    settings: TimerSettings,
    /// Time source
    clock: Arc<dyn Clock>,
}

impl Controller {
    /// Creates a controller over `mirror`.
    pub fn new(client: IpcClient, mirror: TimerRepository, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            client,
            state_timeout: Duration::from_secs(1),
            standalone: StandaloneEngine::new(mirror.clone(), notifier),
            mirror,
            settings: TimerSettings::default(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Creates the controller described by the application configuration.
    pub fn from_config(config: &AppConfig) -> Self {
        let store = Arc::new(JsonFileStore::new(config.controller_state_path()));
        Self::new(
            IpcClient::with_socket_path(config.socket_path()),
            TimerRepository::standalone(store),
            Arc::new(ConsoleNotifier),
        )
        .with_settings(config.settings.clone())
        .with_state_timeout(config.get_state_timeout())
    }

    /// Sets the default settings.
    #[must_use]
    pub fn with_settings(mut self, settings: TimerSettings) -> Self {
        self.standalone = self.standalone.with_settings(settings.clone());
        self.settings = settings;
        self
    }

    /// Sets the `getState` timeout.
    #[must_use]
    pub fn with_state_timeout(mut self, timeout: Duration) -> Self {
        self.state_timeout = timeout;
        self
    }

    /// Replaces the time source.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.standalone = self.standalone.with_clock(clock.clone());
        self.clock = clock;
        self
    }

    /// Returns the settings the next `start` begins from.
    pub fn settings(&self) -> TimerSettings {
        self.mirror.load(&self.settings).settings
    }

    /// Queries the owner. `None` means standalone.
    pub async fn detect(&self) -> Option<StateSnapshot> {
        match self.client.get_state(self.state_timeout).await {
            Ok(snapshot) => {
                debug!("Owner present: {:?}", snapshot);
                Some(snapshot)
            }
            Err(e) => {
                debug!("No owner ({}), using standalone mode", e);
                None
            }
        }
    }

    /// Queries the owner and, if present, yields local authority to it.
    ///
    /// # Errors
    ///
    /// Returns an error if a hand-over to the owner fails.
    pub async fn connect(&self) -> Result<Option<StateSnapshot>> {
        match self.detect().await {
            Some(owner) => self.reconcile(owner).await.map(Some),
            None => Ok(None),
        }
    }

    /// Yields a running standalone timer to the owner.
    ///
    /// Of the two deadlines the furthest in the future wins. Afterwards the
    /// mirror no longer runs, so the two never count down side by side.
    ///
    /// # Errors
    ///
    /// Returns an error if the hand-over or the mirror reset fails.
    pub async fn reconcile(&self, owner: StateSnapshot) -> Result<StateSnapshot> {
        let local = self.standalone.recover()?;
        let Some(local_end) = local.end_timestamp.filter(|_| local.is_running) else {
            return Ok(owner);
        };

        let owner = match owner.running_deadline() {
            Some(owner_end) if owner_end >= local_end => owner,
            _ => {
                info!("Handing standalone deadline {} to daemon", local_end);
                let response = self
                    .client
                    .start(StartRequest {
                        end_time: Some(local_end),
                        duration: None,
                        session_type: local.session_type,
                        session_count: local.session_count,
                        settings: local.settings.clone(),
                    })
                    .await
                    .context("failed to hand over to the daemon")?;
                response.data.unwrap_or(owner)
            }
        };

        self.standalone.reset()?;
        Ok(owner)
    }

    /// Starts the current phase with `settings`.
    ///
    /// Resumes a paused remainder if one was saved.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings are invalid or the command fails.
    pub async fn start(&self, settings: TimerSettings) -> Result<TimerView> {
        let Some(owner) = self.connect().await? else {
            self.standalone.update_settings(settings)?;
            let state = self.standalone.start()?;
            return Ok(TimerView::from_state(
                Authority::Standalone,
                &state,
                self.now(),
            ));
        };

        if let Some(end_time) = owner.running_deadline() {
            debug!("Owner already running");
            return Ok(TimerView::running(&owner, end_time, self.now()));
        }

        let local = self.standalone.update_settings(settings)?;
        let duration = match local.remaining_seconds {
            0 => local.settings.duration_for(local.session_type),
            remaining => remaining,
        };
        let response = self
            .client
            .start(StartRequest {
                end_time: None,
                duration: Some(duration),
                session_type: local.session_type,
                session_count: local.session_count,
                settings: local.settings.clone(),
            })
            .await?;

        // The remainder now lives in the owner's deadline.
        self.standalone.reset()?;

        let snapshot = response.data.unwrap_or_default();
        let now = self.now();
        Ok(match snapshot.running_deadline() {
            Some(end_time) => TimerView::running(&snapshot, end_time, now),
            None => self.idle_owner_view(now),
        })
    }

    /// Pauses the timer.
    ///
    /// The owner has no pause: in owner mode the controller stops it and
    /// keeps the remaining time, phase and count in its mirror so the next
    /// `start` resumes from there.
    ///
    /// # Errors
    ///
    /// Returns an error if the command or the mirror write fails.
    pub async fn pause(&self) -> Result<TimerView> {
        let Some(owner) = self.connect().await? else {
            let state = self.standalone.pause()?;
            return Ok(TimerView::from_state(
                Authority::Standalone,
                &state,
                self.now(),
            ));
        };

        let now = self.now();
        let Some(end_time) = owner.running_deadline() else {
            return Ok(self.idle_owner_view(now));
        };

        self.client.stop().await?;

        let mut paused = self.mirror.load(&self.settings);
        paused.is_running = false;
        paused.end_timestamp = None;
        paused.session_type = owner.timer_session_type;
        paused.session_count = owner.timer_session_count;
        paused.remaining_seconds = seconds_until(end_time, now);
        self.mirror
            .save(&paused)
            .context("failed to save timer state")?;

        Ok(TimerView::from_state(Authority::Owner, &paused, now))
    }

    /// Stops the timer and clears any paused remainder.
    ///
    /// # Errors
    ///
    /// Returns an error if the command or the mirror reset fails.
    pub async fn stop(&self) -> Result<TimerView> {
        let authority = match self.connect().await? {
            Some(_) => {
                self.client.stop().await?;
                Authority::Owner
            }
            None => Authority::Standalone,
        };
        let state = self.standalone.reset()?;
        Ok(TimerView::from_state(authority, &state, self.now()))
    }

    /// Reports the current state.
    ///
    /// # Errors
    ///
    /// Returns an error if catching up or a hand-over fails.
    pub async fn status(&self) -> Result<TimerView> {
        let now = self.now();
        match self.connect().await? {
            Some(owner) => Ok(match owner.running_deadline() {
                Some(end_time) => TimerView::running(&owner, end_time, now),
                None => self.idle_owner_view(now),
            }),
            None => {
                let state = self.standalone.recover()?;
                Ok(TimerView::from_state(Authority::Standalone, &state, now))
            }
        }
    }

    /// Stays in the foreground until interrupted.
    ///
    /// Follows the owner while one is present. Without one it drives the
    /// standalone engine and keeps probing, handing over as soon as an owner
    /// shows up. If the owner goes away mid-phase, its last announced
    /// deadline is adopted so the countdown continues locally.
    ///
    /// # Errors
    ///
    /// Returns an error if the owner stream or the mirror fails.
    pub async fn run(&self) -> Result<()> {
        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);

        loop {
            if self.connect().await?.is_some() {
                Display::show_authority(Authority::Owner);
                let mut subscription = self.client.subscribe(None).await?;
                let end = watch::follow(
                    &mut subscription,
                    self.clock.as_ref(),
                    Display::show_overlay,
                    async {
                        let _ = (&mut shutdown).await;
                    },
                )
                .await?;

                match end {
                    FollowEnd::OwnerGone { last_known } => {
                        Display::show_owner_lost();
                        self.adopt(&last_known)?;
                    }
                    FollowEnd::PageClosed | FollowEnd::Shutdown => return Ok(()),
                }
                continue;
            }

            Display::show_authority(Authority::Standalone);
            let owner_returns = async {
                loop {
                    tokio::time::sleep(OWNER_RECHECK_INTERVAL).await;
                    if self.detect().await.is_some() {
                        break;
                    }
                }
            };

            tokio::select! {
                result = self.standalone.run(
                    |state, _| {
                        let view = TimerView::from_state(Authority::Standalone, state, self.now());
                        Display::show_countdown(&view);
                    },
                    owner_returns,
                ) => result?,
                _ = &mut shutdown => return Ok(()),
            }
        }
    }

    /// Takes over an owner deadline that is still in the future.
    ///
    /// # Errors
    ///
    /// Returns an error if the mirror cannot be written.
    pub fn adopt(&self, snapshot: &StateSnapshot) -> Result<bool> {
        let now = self.now();
        let Some(end_time) = snapshot.running_deadline().filter(|end| *end > now) else {
            return Ok(false);
        };

        let mut state = self.mirror.load(&self.settings);
        state.session_count = snapshot.timer_session_count;
        state.run_until(snapshot.timer_session_type, end_time);
        self.mirror
            .save(&state)
            .context("failed to save timer state")?;
        info!("Adopted daemon deadline {}", end_time);
        Ok(true)
    }

    /// View of an idle owner: phase and remainder come from the mirror,
    /// which is what the next `start` resumes.
    fn idle_owner_view(&self, now: i64) -> TimerView {
        TimerView::from_state(Authority::Owner, &self.mirror.load(&self.settings), now)
    }

    fn now(&self) -> i64 {
        self.clock.now_millis()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::notification::MockNotifier;
    use crate::store::MemoryStore;

    const T0: i64 = 1_700_000_000_000;

    fn standalone_controller() -> (Controller, ManualClock) {
        let dir = tempfile::tempdir().unwrap();
        let socket_path = dir.path().join("missing.sock");
        std::mem::forget(dir);

        let clock = ManualClock::new(T0);
        let controller = Controller::new(
            IpcClient::with_socket_path(socket_path),
            TimerRepository::standalone(Arc::new(MemoryStore::new())),
            Arc::new(MockNotifier::new()),
        )
        .with_state_timeout(Duration::from_millis(100))
        .with_clock(Arc::new(clock.clone()));
        (controller, clock)
    }

    #[test]
    fn test_authority_label() {
        assert_eq!(Authority::Owner.label(), "Daemon");
        assert_eq!(Authority::Standalone.label(), "Standalone");
    }

    #[tokio::test]
    async fn test_missing_owner_falls_back_to_standalone() {
        let (controller, clock) = standalone_controller();
        assert!(controller.detect().await.is_none());

        let view = controller.start(TimerSettings::default()).await.unwrap();
        assert_eq!(view.authority, Authority::Standalone);
        assert!(view.is_running);
        assert_eq!(view.remaining_seconds, 1500);

        clock.advance_secs(300);
        let view = controller.pause().await.unwrap();
        assert!(!view.is_running);
        assert_eq!(view.remaining_seconds, 1200);

        let view = controller.status().await.unwrap();
        assert_eq!(view.remaining_seconds, 1200);

        let view = controller.stop().await.unwrap();
        assert_eq!(view.remaining_seconds, 1500);
        assert_eq!(view.session_count, 0);
    }

    #[tokio::test]
    async fn test_start_applies_settings() {
        let (controller, _clock) = standalone_controller();
        let view = controller
            .start(TimerSettings::default().with_work_minutes(10))
            .await
            .unwrap();
        assert_eq!(view.remaining_seconds, 600);
        assert_eq!(controller.settings().work_time, 600);
    }

    #[test]
    fn test_adopt_only_future_deadline() {
        let (controller, _clock) = standalone_controller();

        let expired = StateSnapshot {
            is_running: true,
            timer_end_time: Some(T0),
            timer_session_type: SessionType::Work,
            timer_session_count: 0,
        };
        assert!(!controller.adopt(&expired).unwrap());

        let live = StateSnapshot {
            timer_end_time: Some(T0 + 60_000),
            timer_session_type: SessionType::ShortBreak,
            timer_session_count: 2,
            ..expired
        };
        assert!(controller.adopt(&live).unwrap());

        let state = controller.mirror.load(&TimerSettings::default());
        assert!(state.is_running);
        assert_eq!(state.end_timestamp, Some(T0 + 60_000));
        assert_eq!(state.session_type, SessionType::ShortBreak);
        assert_eq!(state.session_count, 2);
    }

    #[test]
    fn test_timer_view_from_state() {
        let mut state = TimerState::new(TimerSettings::default());
        state.start_phase(SessionType::Work, T0, 1500);

        let view = TimerView::from_state(Authority::Owner, &state, T0 + 500);
        assert!(view.is_running);
        assert_eq!(view.remaining_seconds, 1500);
    }
}
