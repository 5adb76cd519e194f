//! Command definitions for the focus timer CLI.
//!
//! Uses clap derive macro for argument parsing.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::types::{PageInfo, SurfaceId, TimerSettings};

// ============================================================================
// CLI Structure
// ============================================================================

/// Focus timer CLI
#[derive(Parser, Debug)]
#[command(
    name = "focus-timer",
    version,
    about = "Focus (pomodoro) timer",
    long_about = "A focus timer that alternates work and break sessions.\n\
                  Follows the daemon when one is running, otherwise runs standalone.",
    propagate_version = true
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Directory for configuration, state and the daemon socket
    #[arg(long, global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,
}

// ============================================================================
// Subcommands
// ============================================================================

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start (or resume) the current phase
    Start(StartArgs),

    /// Pause the running phase
    Pause,

    /// Stop the timer and reset the cycle
    Stop,

    /// Show current timer status
    Status,

    /// Stay in the foreground and follow the timer
    Run,

    /// Run as daemon (background owner)
    Daemon,

    /// Show the countdown overlay for a page
    Watch(WatchArgs),

    /// Check a URL against the focus allow-list
    CheckUrl {
        /// Destination URL
        url: String,

        /// Page (surface id) performing the navigation
        #[arg(long)]
        tab: Option<SurfaceId>,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell type for completion script
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

// ============================================================================
// Start Command Arguments
// ============================================================================

/// Arguments for the start command
///
/// Unset options keep the stored durations.
#[derive(Args, Debug, Clone, Default)]
pub struct StartArgs {
    /// Work duration in minutes (1-120)
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..=120))]
    pub work: Option<u32>,

    /// Short break duration in minutes (1-60)
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..=60))]
    pub short_break: Option<u32>,

    /// Long break duration in minutes (1-60)
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..=60))]
    pub long_break: Option<u32>,

    /// Work sessions before a long break (1-12)
    #[arg(short = 'n', long, value_parser = clap::value_parser!(u32).range(1..=12))]
    pub sessions: Option<u32>,
}

impl StartArgs {
    /// Applies the given options on top of `settings`.
    pub fn apply(&self, mut settings: TimerSettings) -> TimerSettings {
        if let Some(work) = self.work {
            settings = settings.with_work_minutes(work);
        }
        if let Some(short_break) = self.short_break {
            settings = settings.with_short_break_minutes(short_break);
        }
        if let Some(long_break) = self.long_break {
            settings = settings.with_long_break_minutes(long_break);
        }
        if let Some(sessions) = self.sessions {
            settings = settings.with_sessions_before_long_break(sessions);
        }
        settings
    }
}

// ============================================================================
// Watch Command Arguments
// ============================================================================

/// Arguments for the watch command
#[derive(Args, Debug, Clone, Default)]
pub struct WatchArgs {
    /// URL of the page the overlay lives in
    #[arg(short, long)]
    pub url: Option<String>,

    /// Pinned pages survive the work-start sweep
    #[arg(short, long)]
    pub pinned: bool,
}

impl WatchArgs {
    /// Page information sent with `subscribe`.
    pub fn page(&self) -> Option<PageInfo> {
        if self.url.is_none() && !self.pinned {
            return None;
        }
        Some(PageInfo {
            url: self.url.clone(),
            pinned: self.pinned,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // ------------------------------------------------------------------------
    // Cli Tests
    // ------------------------------------------------------------------------

    mod cli_tests {
        use super::*;

        #[test]
        fn test_parse_no_args() {
            let cli = Cli::parse_from(["focus-timer"]);
            assert!(cli.command.is_none());
            assert!(!cli.verbose);
            assert!(cli.data_dir.is_none());
        }

        #[test]
        fn test_parse_verbose_flag() {
            let cli = Cli::parse_from(["focus-timer", "status", "-v"]);
            assert!(cli.verbose);
            assert!(matches!(cli.command, Some(Commands::Status)));
        }

        #[test]
        fn test_parse_data_dir() {
            let cli = Cli::parse_from(["focus-timer", "--data-dir", "/tmp/ft", "stop"]);
            assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/ft")));
            assert!(matches!(cli.command, Some(Commands::Stop)));
        }

        #[test]
        fn test_parse_simple_commands() {
            let cli = Cli::parse_from(["focus-timer", "pause"]);
            assert!(matches!(cli.command, Some(Commands::Pause)));

            let cli = Cli::parse_from(["focus-timer", "run"]);
            assert!(matches!(cli.command, Some(Commands::Run)));

            let cli = Cli::parse_from(["focus-timer", "daemon"]);
            assert!(matches!(cli.command, Some(Commands::Daemon)));
        }

        #[test]
        fn test_parse_check_url() {
            let id = uuid::Uuid::new_v4();
            let cli = Cli::parse_from([
                "focus-timer",
                "check-url",
                "https://github.com/",
                "--tab",
                &id.to_string(),
            ]);
            match cli.command {
                Some(Commands::CheckUrl { url, tab }) => {
                    assert_eq!(url, "https://github.com/");
                    assert_eq!(tab, Some(id));
                }
                _ => panic!("Expected CheckUrl command"),
            }
        }

        #[test]
        fn test_parse_completions() {
            let cli = Cli::parse_from(["focus-timer", "completions", "bash"]);
            assert!(matches!(
                cli.command,
                Some(Commands::Completions {
                    shell: clap_complete::Shell::Bash
                })
            ));
        }
    }

    // ------------------------------------------------------------------------
    // StartArgs Tests
    // ------------------------------------------------------------------------

    mod start_args_tests {
        use super::*;

        #[test]
        fn test_parse_start_defaults() {
            let cli = Cli::parse_from(["focus-timer", "start"]);
            match cli.command {
                Some(Commands::Start(args)) => {
                    assert_eq!(args.work, None);
                    assert_eq!(args.apply(TimerSettings::default()), TimerSettings::default());
                }
                _ => panic!("Expected Start command"),
            }
        }

        #[test]
        fn test_parse_start_with_options() {
            let cli = Cli::parse_from([
                "focus-timer",
                "start",
                "--work",
                "50",
                "-s",
                "10",
                "--long-break",
                "20",
                "-n",
                "3",
            ]);
            let Some(Commands::Start(args)) = cli.command else {
                panic!("Expected Start command");
            };
            let settings = args.apply(TimerSettings::default());
            assert_eq!(settings.work_time, 3000);
            assert_eq!(settings.short_break, 600);
            assert_eq!(settings.long_break, 1200);
            assert_eq!(settings.sessions_before_long_break, 3);
        }

        #[test]
        fn test_start_work_out_of_range() {
            assert!(Cli::try_parse_from(["focus-timer", "start", "--work", "0"]).is_err());
            assert!(Cli::try_parse_from(["focus-timer", "start", "--work", "121"]).is_err());
            assert!(Cli::try_parse_from(["focus-timer", "start", "-n", "13"]).is_err());
        }

        #[test]
        fn test_apply_keeps_unset_fields() {
            let base = TimerSettings::default().with_short_break_minutes(7);
            let args = StartArgs {
                work: Some(30),
                ..StartArgs::default()
            };
            let settings = args.apply(base);
            assert_eq!(settings.work_time, 1800);
            assert_eq!(settings.short_break, 420);
        }
    }

    // ------------------------------------------------------------------------
    // WatchArgs Tests
    // ------------------------------------------------------------------------

    mod watch_args_tests {
        use super::*;

        #[test]
        fn test_watch_without_page() {
            let cli = Cli::parse_from(["focus-timer", "watch"]);
            let Some(Commands::Watch(args)) = cli.command else {
                panic!("Expected Watch command");
            };
            assert_eq!(args.page(), None);
        }

        #[test]
        fn test_watch_with_page() {
            let cli = Cli::parse_from([
                "focus-timer",
                "watch",
                "--url",
                "https://docs.rs/",
                "--pinned",
            ]);
            let Some(Commands::Watch(args)) = cli.command else {
                panic!("Expected Watch command");
            };
            assert_eq!(
                args.page(),
                Some(PageInfo {
                    url: Some("https://docs.rs/".to_string()),
                    pinned: true,
                })
            );
        }
    }
}
