//! Daemon module for the focus timer.
//!
//! The daemon is the background owner. It contains:
//! - `timer`: Timer engine with commands, wakes and focus enforcement
//! - `scheduler`: Self-rearming wake alarm
//! - `ipc`: Unix socket server, request handling and `subscribe` streams
//!
//! [`run`] wires them together around a single select loop, so wakes and
//! commands are handled one at a time.

pub mod ipc;
pub mod scheduler;
pub mod timer;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use crate::bus::Broadcaster;
use crate::config::AppConfig;
use crate::focus::FocusEnforcer;
use crate::notification::{
    AudioHost, AudioPlayback, BellAudioHost, LogNotifier, NotificationKind, Notifier,
};
use crate::store::{JsonFileStore, TimerRepository};

pub use ipc::{IpcError, IpcServer, RequestHandler};
pub use scheduler::{Alarm, TokioAlarm, MIN_WAKE_INTERVAL};
#[cfg(any(test, feature = "test-utils"))]
pub use scheduler::MockAlarm;
pub use timer::{TimerEngine, TimerEvent, WakeOutcome};

/// Runs the daemon until interrupted.
///
/// # Errors
///
/// Returns an error if the socket cannot be bound.
pub async fn run(config: &AppConfig) -> Result<()> {
    let store = Arc::new(JsonFileStore::new(config.owner_state_path()));
    let broadcaster = Arc::new(Broadcaster::new());
    let (alarm, mut wakes) = TokioAlarm::new();
    let (event_tx, mut events) = mpsc::unbounded_channel();

    let mut engine = TimerEngine::new(
        TimerRepository::owner(store),
        broadcaster.clone(),
        Arc::new(alarm),
        event_tx,
    )
    .with_settings(config.settings.clone())
    .with_focus(FocusEnforcer::from_config(&config.focus))
    .with_wake_interval(config.wake_interval());
    engine.recover();
    let engine = Arc::new(Mutex::new(engine));

    let server = IpcServer::new(&config.socket_path()).context("failed to start daemon")?;
    info!("Daemon listening on {:?}", server.socket_path());

    let handler = Arc::new(RequestHandler::new(engine.clone(), broadcaster.clone()));
    let notifier = LogNotifier;
    let audio = AudioPlayback::new(BellAudioHost::new());

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accepted = server.accept() => match accepted {
                Ok(stream) => {
                    let handler = handler.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handler.serve(stream).await {
                            debug!("Connection ended with error: {:#}", e);
                        }
                    });
                }
                Err(e) => warn!("{:#}", e),
            },
            Some(()) = wakes.recv() => {
                let mut engine = engine.lock().await;
                match engine.wake() {
                    Ok(outcome) => debug!("Wake: {:?}", outcome),
                    Err(e) => {
                        warn!("Wake failed: {:#}", e);
                        engine.reschedule();
                    }
                }
            }
            Some(event) = events.recv() => announce(&event, &notifier, &audio).await,
            _ = &mut shutdown => {
                let ended = broadcaster.clear();
                info!("Shutting down, closed {} subscription(s)", ended);
                break;
            }
        }
    }

    Ok(())
}

/// Notifies the user about a finished phase.
///
/// Other events are only logged. Failures never stop the daemon.
pub async fn announce<N, H>(event: &TimerEvent, notifier: &N, audio: &AudioPlayback<H>)
where
    N: Notifier + ?Sized,
    H: AudioHost,
{
    let TimerEvent::PhaseCompleted { transition } = event else {
        debug!("Timer event: {:?}", event);
        return;
    };
    let Some(kind) = NotificationKind::for_transition(transition) else {
        return;
    };

    if let Err(e) = notifier.notify(kind) {
        warn!("Failed to notify: {} ({})", e, e.suggestion());
    }
    if let Err(e) = audio.play(kind).await {
        warn!("Failed to play sound: {} ({})", e, e.suggestion());
    }
}
