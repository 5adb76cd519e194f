//! Focus Timer Library
//!
//! This library provides the core functionality for the focus timer.
//! It includes:
//! - Timer state machine driven by absolute deadlines
//! - Persistent state store shared by the owner and the controller mirror
//! - Background owner (daemon) with a self-rearming wake scheduler
//! - Cross-context message bus for overlays and the controller
//! - Tab/navigation focus enforcement against an allow-list
//! - Standalone fallback engine used when no owner is reachable
//! - Audio/visual notifier and the per-page overlay widget
//! - CLI command parsing, IPC client and display utilities

pub mod bus;
pub mod cli;
pub mod clock;
pub mod config;
pub mod daemon;
pub mod focus;
pub mod machine;
pub mod notification;
pub mod standalone;
pub mod store;
pub mod types;

// Re-export commonly used types for convenience
pub use types::{
    IpcRequest, IpcResponse, Navigation, NavigationVerdict, ObserverEvent, PageInfo,
    SessionType, StartRequest, StateSnapshot, SurfaceId, TimerSettings, TimerState,
};

pub use bus::{Broadcaster, BusError, Surface};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::AppConfig;
pub use daemon::{TimerEngine, TimerEvent, WakeOutcome};
pub use focus::{FocusConfig, FocusEnforcer, FocusError};
pub use machine::{advance, catch_up, Transition};
pub use notification::{NotificationError, NotificationKind, Notifier, Overlay};
pub use standalone::StandaloneEngine;
pub use store::{JsonFileStore, KeyValueStore, MemoryStore, StoreError, TimerRepository};
