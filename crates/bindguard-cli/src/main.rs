//! Bindguard - directory authentication tools
//!
//! `encode` produces static credential strings, `check` runs a single
//! authentication through whichever authenticator the configuration selects.

mod commands;

use bindguard_core::{AuthConfig, LoggingConfig};
use clap::{Parser, Subcommand, ValueEnum};
use commands::CommandContext;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "bindguard")]
#[command(author = "Bindguard Team")]
#[command(version = bindguard_core::VERSION)]
#[command(about = "LDAP authentication with an attempt cache", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true, env = "BINDGUARD_CONFIG")]
    config: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "BINDGUARD_LOG_LEVEL")]
    log_level: Option<String>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "text")]
    output: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode usernames and passwords for the static credential list
    Encode {
        /// Encode a single user without prompting
        #[arg(short, long, requires = "password")]
        username: Option<String>,

        /// Password for --username
        #[arg(short, long, env = "BINDGUARD_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Authenticate once and report the attempt
    Check {
        /// Username to authenticate
        username: String,

        /// Password (prompted when omitted)
        #[arg(short, long, env = "BINDGUARD_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AuthConfig::from_file(path)?,
        None => AuthConfig::from_env(),
    };

    init_logging(&config.logging, cli.log_level.as_deref());
    if let Some(path) = &cli.config {
        debug!("Loaded configuration from {}", path);
    }

    let ctx = CommandContext {
        config,
        output_format: cli.output,
    };

    let succeeded = match cli.command {
        Commands::Encode { username, password } => {
            commands::encode::execute(&ctx, username, password)?;
            true
        }
        Commands::Check { username, password } => {
            commands::check::execute(&ctx, &username, password).await?
        }
    };

    if !succeeded {
        std::process::exit(1);
    }
    Ok(())
}

/// Logs go to stderr so command output can be piped.
fn init_logging(logging: &LoggingConfig, level_override: Option<&str>) {
    let level = level_override.unwrap_or(&logging.level);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let registry = tracing_subscriber::registry().with(filter);
    if logging.format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}
