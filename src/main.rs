//! Focus Timer CLI
//!
//! A pomodoro timer that stays correct across restarts and suspension:
//! - 25 minutes of focused work with non-allow-listed pages closed
//! - 5 minutes of short break
//! - 15 minutes of long break after 4 work sessions

use anyhow::Result;
use clap::{CommandFactory, Parser};

use focus_timer::cli::{self, Cli, Commands, Controller, Display, FollowEnd, IpcClient};
use focus_timer::clock::SystemClock;
use focus_timer::config::AppConfig;
use focus_timer::daemon;
use focus_timer::types::{Navigation, NavigationVerdict};

/// Main entry point
#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Parse command line arguments
    let cli = Cli::parse();

    // Initialize logging
    init_tracing(cli.verbose);

    // Execute command
    if let Err(e) = execute(cli).await {
        Display::show_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

/// Initializes the tracing subscriber for logging.
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

/// Executes the CLI command.
async fn execute(cli: Cli) -> Result<()> {
    let command = match cli.command {
        Some(command) => command,
        None => {
            // No command provided, show help
            Cli::command().print_help()?;
            return Ok(());
        }
    };

    if let Commands::Completions { shell } = command {
        generate_completions(shell);
        return Ok(());
    }

    let config = AppConfig::load(cli.data_dir)?;
    tracing::debug!("Data directory: {:?}", config.data_dir);

    match command {
        Commands::Start(args) => {
            let controller = Controller::from_config(&config);
            let settings = args.apply(controller.settings());
            let view = controller.start(settings).await?;
            Display::show_start(&view);
        }
        Commands::Pause => {
            let view = Controller::from_config(&config).pause().await?;
            Display::show_pause(&view);
        }
        Commands::Stop => {
            let view = Controller::from_config(&config).stop().await?;
            Display::show_stop(&view);
        }
        Commands::Status => {
            let view = Controller::from_config(&config).status().await?;
            Display::show_status(&view);
        }
        Commands::Run => {
            Controller::from_config(&config).run().await?;
        }
        Commands::Daemon => {
            daemon::run(&config).await?;
        }
        Commands::Watch(args) => {
            let client = IpcClient::with_socket_path(config.socket_path());
            let mut subscription = client.subscribe(args.page()).await?;
            tracing::debug!("Subscribed as {}", subscription.surface_id());

            let end = cli::follow(&mut subscription, &SystemClock, Display::show_overlay, async {
                let _ = tokio::signal::ctrl_c().await;
            })
            .await?;
            match end {
                FollowEnd::PageClosed => Display::show_page_closed(),
                FollowEnd::OwnerGone { .. } => Display::show_owner_lost(),
                FollowEnd::Shutdown => println!(),
            }
        }
        Commands::CheckUrl { url, tab } => {
            let client = IpcClient::with_socket_path(config.socket_path());
            // Without an owner nothing enforces navigation.
            let verdict = match client.get_state(config.get_state_timeout()).await {
                Ok(_) => {
                    client
                        .check_navigation(Navigation::top_level(tab, url.as_str()))
                        .await?
                }
                Err(e) => {
                    tracing::debug!("No owner ({}), navigation not enforced", e);
                    NavigationVerdict::Ignored
                }
            };
            Display::show_verdict(&url, verdict);
        }
        Commands::Completions { .. } => {}
    }

    Ok(())
}

/// Generates shell completion scripts.
fn generate_completions(shell: clap_complete::Shell) {
    use clap_complete::generate;
    use std::io;

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();
    generate(shell, &mut cmd, bin_name, &mut io::stdout());
}

// ============================================================================
// Tests
// ============================================================================
