//! CLI module for the focus timer.
//!
//! This module provides the command-line interface:
//! - `commands`: Command definitions using clap derive
//! - `client`: IPC client for owner communication
//! - `controller`: Owner detection and standalone fallback
//! - `watch`: Overlay instance following the owner's events
//! - `display`: Output formatting and display logic

pub mod client;
pub mod commands;
pub mod controller;
pub mod display;
pub mod watch;

pub use client::{IpcClient, Subscription};
pub use commands::{Cli, Commands, StartArgs, WatchArgs};
pub use controller::{Authority, Controller, TimerView};
pub use display::Display;
pub use watch::{follow, FollowEnd};
