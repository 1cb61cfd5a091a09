//! CLI entry and dispatch.

use anyhow::{Context, Result};
use apixlab_core::config::{self, paths};
use apixlab_core::logging;
use clap::Parser;

mod commands;

#[derive(Parser)]
#[command(name = "apixlab")]
#[command(version)]
#[command(about = "Sign in to APIXLab with an Ethereum wallet")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Also print log records to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Show the stored session (default)
    Status,

    /// List configured wallet connectors
    Connectors,

    /// Connect a wallet and sign in
    Login {
        /// Connector to use (default: first configured)
        #[arg(long, value_name = "ID")]
        connector: Option<String>,

        /// Invite code sent with the login request
        #[arg(long, value_name = "CODE", env = "APIXLAB_INVITE_CODE")]
        invite_code: Option<String>,

        /// Approve wallet requests without prompting
        #[arg(short, long)]
        yes: bool,
    },

    /// Re-fetch the profile for the stored session
    Refresh,

    /// Disconnect the wallet and clear the stored session
    Logout,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    // one tokio runtime for everything
    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;

    rt.block_on(async move { dispatch(cli).await })
}

async fn dispatch(cli: Cli) -> Result<()> {
    let Cli { command, verbose } = cli;

    // config commands must work even when the existing file is broken
    if let Some(Commands::Config { command }) = &command {
        return match command {
            ConfigCommands::Path => {
                commands::config::path();
                Ok(())
            }
            ConfigCommands::Init => commands::config::init(),
        };
    }

    let config = config::Config::load().context("load config")?;
    let _log_guard = logging::init(&config.log, &paths::logs_dir(), verbose)?;
    tracing::debug!(home = %paths::apixlab_home().display(), "config loaded");

    match command.unwrap_or(Commands::Status) {
        Commands::Status => commands::status::run(&config).await,
        Commands::Connectors => {
            commands::connectors::list(&config);
            Ok(())
        }
        Commands::Login {
            connector,
            invite_code,
            yes,
        } => {
            commands::auth::login(commands::auth::LoginOptions {
                config: &config,
                connector: connector.as_deref(),
                invite_code: invite_code.as_deref(),
                auto_approve: yes,
            })
            .await
        }
        Commands::Refresh => commands::auth::refresh(&config).await,
        Commands::Logout => commands::auth::logout(&config).await,
        // handled above
        Commands::Config { .. } => Ok(()),
    }
}
