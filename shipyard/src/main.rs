//! Shipyard - Entry Point
//!
//! Submits App Platform deployments and follows them to a terminal phase.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use shipyard::app::options::AppOptions;
use shipyard::app::run::{self, cancel_on_shutdown_signal, EXIT_ERROR};
use shipyard::logs::{init_logging, LogLevel};
use shipyard::storage::settings::Settings;
use shipyard::utils::version_info;

#[derive(Parser)]
#[command(name = "shipyard")]
#[command(about = "Deploy apps to App Platform and wait for them to go live")]
struct Cli {
    /// JSON settings file
    #[arg(long, global = true, env = "SHIPYARD_SETTINGS")]
    settings: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,

    /// Emit JSON log lines on stderr
    #[arg(long, global = true)]
    log_json: bool,

    /// API base URL
    #[arg(long, global = true, env = "SHIPYARD_API_URL")]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct PollArgs {
    /// Seconds between status reads
    #[arg(long)]
    interval: Option<u64>,

    /// Seconds to wait for a terminal phase
    #[arg(long)]
    timeout: Option<u64>,

    /// Abort after this many consecutive network failures
    #[arg(long)]
    max_transport_errors: Option<u32>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an app from a request file and wait for it to go live
    Deploy {
        /// App definition (JSON)
        request: PathBuf,

        #[command(flatten)]
        poll: PollArgs,

        /// Rebuild from source even when a cached build exists
        #[arg(long)]
        force_build: bool,

        /// Return right after submission
        #[arg(long)]
        no_wait: bool,
    },

    /// Trigger a new deployment of an existing app and wait for it.
    ///
    /// Reports the live URL on success. Health-check paths are only listed by
    /// `deploy`, which has the app definition at hand.
    Redeploy {
        /// App ID
        #[arg(long)]
        app_id: String,

        #[command(flatten)]
        poll: PollArgs,

        #[arg(long)]
        force_build: bool,
    },

    /// Print the current phase of a deployment
    Status {
        #[arg(long)]
        app_id: String,

        #[arg(long)]
        deployment_id: String,
    },

    /// Print the provider spec a request file resolves to, without submitting it
    Render {
        /// App definition (JSON)
        request: PathBuf,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print secret values instead of a mask
        #[arg(long)]
        show_secrets: bool,
    },

    /// Print the connection string of an app's database
    DatabaseUrl {
        /// App ID
        #[arg(long)]
        app_id: String,

        /// Print the password instead of a mask
        #[arg(long)]
        show_password: bool,
    },

    /// Print version information
    Version,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match execute(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!("{:#}", e);
            eprintln!("{} {:#}", "[ERROR]".red().bold(), e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

async fn execute(cli: Cli) -> anyhow::Result<u8> {
    if let Commands::Version = cli.command {
        println!("{}", serde_json::to_string_pretty(&version_info())?);
        return Ok(0);
    }

    let settings = match &cli.settings {
        Some(path) => Settings::load(path).await?,
        None => Settings::default(),
    };

    let mut options = AppOptions::from_settings(&settings);
    if let Some(level) = cli.log_level {
        options.log.log_level = level;
    }
    if cli.log_json {
        options.log.json_format = true;
    }
    if let Some(url) = cli.api_url {
        options.api_base_url = url;
    }

    // Held until exit so the file writer flushes
    let _guard = init_logging(options.log.clone()).context("Failed to initialize logging")?;
    debug!("Running with options: {:?}", options);

    let cancel = CancellationToken::new();
    cancel_on_shutdown_signal(cancel.clone());

    let code = match cli.command {
        Commands::Deploy {
            request,
            poll,
            force_build,
            no_wait,
        } => {
            apply_poll_args(&mut options, &poll);
            run::deploy(&options, &request, force_build, !no_wait, cancel).await?
        }
        Commands::Redeploy {
            app_id,
            poll,
            force_build,
        } => {
            apply_poll_args(&mut options, &poll);
            run::redeploy(&options, &app_id, force_build, cancel).await?
        }
        Commands::Status {
            app_id,
            deployment_id,
        } => run::status(&options, &app_id, &deployment_id).await?,
        Commands::Render {
            request,
            output,
            show_secrets,
        } => run::render(&request, output.as_deref(), show_secrets).await?,
        Commands::DatabaseUrl {
            app_id,
            show_password,
        } => run::database_url(&options, &app_id, show_password).await?,
        Commands::Version => 0,
    };

    Ok(code)
}

fn apply_poll_args(options: &mut AppOptions, args: &PollArgs) {
    if let Some(secs) = args.interval {
        options.poll.interval = std::time::Duration::from_secs(secs);
    }
    if let Some(secs) = args.timeout {
        options.poll.timeout = std::time::Duration::from_secs(secs);
    }
    if args.max_transport_errors.is_some() {
        options.orchestrator.max_transport_errors = args.max_transport_errors;
    }
}
