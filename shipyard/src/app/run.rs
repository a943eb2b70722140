//! Command execution

use std::path::Path;
use std::sync::Arc;

use colored::Colorize;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::app::options::AppOptions;
use crate::authn::credentials::Credentials;
use crate::deploy::fsm::Phase;
use crate::deploy::orchestrator::{Orchestrator, ProgressObserver};
use crate::deploy::platform::Platform;
use crate::errors::DeployError;
use crate::http::apps::AppPlatform;
use crate::http::client::HttpClient;
use crate::models::deployment::{DeploymentHandle, Outcome};
use crate::models::request::{AppDefinition, DeploymentRequest, ProcessEnv, TriggerParams};

/// Exit code for errors raised before or outside a poll loop
pub const EXIT_ERROR: u8 = 1;

/// Prints phase changes to stdout
pub struct ConsoleProgress;

impl ProgressObserver for ConsoleProgress {
    fn on_phase_change(&self, handle: &DeploymentHandle, previous: Phase) {
        let phase = handle.phase();
        let label = match phase {
            Phase::Active => phase.as_str().green().bold(),
            Phase::Error | Phase::Canceled => phase.as_str().red().bold(),
            Phase::Superseded => phase.as_str().yellow().bold(),
            _ => phase.as_str().cyan(),
        };
        println!("  {} -> {}", previous.as_str().dimmed(), label);
    }
}

/// Build an orchestrator talking to the configured API.
///
/// Fails immediately when the API token is missing.
pub fn build_orchestrator(options: &AppOptions) -> Result<Orchestrator<AppPlatform>, DeployError> {
    let credentials = Credentials::from_env()?;
    let client = HttpClient::new(&options.api_base_url, credentials, options.request_timeout)?;

    Ok(Orchestrator::new(AppPlatform::new(client))
        .with_options(options.orchestrator.clone())
        .with_observer(Arc::new(ConsoleProgress)))
}

/// Create an app from a request file and wait for its first deployment
pub async fn deploy(
    options: &AppOptions,
    request_path: &Path,
    force_build: bool,
    wait: bool,
    cancel: CancellationToken,
) -> Result<u8, DeployError> {
    if wait {
        options.poll.validate()?;
    }
    let orchestrator = build_orchestrator(options)?;

    let definition = AppDefinition::load(request_path).await?;
    let spec = definition.resolve(&ProcessEnv)?;
    let mut request = DeploymentRequest::create(spec);
    if force_build {
        request = request.with_trigger(TriggerParams { force_build: true });
    }

    println!("Deploying {}", request.target().bold());
    let handle = match orchestrator.submit(&request).await {
        Ok(handle) => handle,
        Err(e) => {
            if let DeployError::TriggerFailed { app_id, .. } = &e {
                eprintln!("Retry with: shipyard redeploy --app-id {}", app_id);
            }
            return Err(e);
        }
    };
    print_handle(&handle);

    if !wait {
        return Ok(0);
    }
    wait_and_report(&orchestrator, handle, &request, options, cancel).await
}

/// Trigger a new deployment of an existing app and wait for it
pub async fn redeploy(
    options: &AppOptions,
    app_id: &str,
    force_build: bool,
    cancel: CancellationToken,
) -> Result<u8, DeployError> {
    options.poll.validate()?;
    let orchestrator = build_orchestrator(options)?;
    let request = DeploymentRequest::redeploy(app_id, TriggerParams { force_build });

    println!("Redeploying app {}", app_id.bold());
    let handle = orchestrator.submit(&request).await?;
    print_handle(&handle);

    wait_and_report(&orchestrator, handle, &request, options, cancel).await
}

/// Read a deployment's phase once
pub async fn status(
    options: &AppOptions,
    app_id: &str,
    deployment_id: &str,
) -> Result<u8, DeployError> {
    let orchestrator = build_orchestrator(options)?;
    let mut handle = DeploymentHandle::new(app_id, deployment_id);

    let result = orchestrator.poll_once(&mut handle).await?;
    println!(
        "{} {} (observed at {})",
        "Deployment status:".bold(),
        result.phase,
        result.observed_at.to_rfc3339()
    );
    Ok(0)
}

/// Print the provider spec a request file resolves to
pub async fn render(
    request_path: &Path,
    output: Option<&Path>,
    show_secrets: bool,
) -> Result<u8, DeployError> {
    let definition = AppDefinition::load(request_path).await?;
    let spec = definition.resolve(&ProcessEnv)?;
    DeploymentRequest::create(spec.clone()).validate()?;

    let spec = if show_secrets { spec } else { spec.redacted() };
    let json = serde_json::to_string_pretty(&spec)?;

    match output {
        Some(path) => {
            tokio::fs::write(path, format!("{}\n", json)).await?;
            println!("App specification written to {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(0)
}

/// Print the connection string of an app's database
pub async fn database_url(
    options: &AppOptions,
    app_id: &str,
    show_password: bool,
) -> Result<u8, DeployError> {
    let orchestrator = build_orchestrator(options)?;

    match orchestrator.database_url(app_id).await? {
        Some(url) if show_password => println!("{}", url.expose()),
        Some(url) => println!("{}", url),
        None => {
            eprintln!("{} No database found for app {}", "[WARN]".yellow(), app_id);
            return Ok(EXIT_ERROR);
        }
    }
    Ok(0)
}

fn print_handle(handle: &DeploymentHandle) {
    println!("  app id:        {}", handle.resource_id());
    println!("  deployment id: {}", handle.action_id());
}

async fn wait_and_report<P: Platform>(
    orchestrator: &Orchestrator<P>,
    mut handle: DeploymentHandle,
    request: &DeploymentRequest,
    options: &AppOptions,
    cancel: CancellationToken,
) -> Result<u8, DeployError> {
    let outcome = orchestrator
        .run_to_completion(
            &mut handle,
            options.poll.interval,
            options.poll.timeout,
            &cancel,
        )
        .await;

    match &outcome {
        Outcome::Success(_) => {
            println!("\n{} {}", "[SUCCESS]".green().bold(), outcome);
            report_live_url(orchestrator, &handle, request).await;
        }
        Outcome::TimedOut(_) | Outcome::Canceled(_) => {
            println!("\n{} {}", "[PENDING]".yellow().bold(), outcome);
            println!(
                "Check again with: shipyard status --app-id {} --deployment-id {}",
                handle.resource_id(),
                handle.action_id()
            );
        }
        Outcome::Failure { .. } | Outcome::TransportError { .. } => {
            eprintln!("\n{} {}", "[FAILED]".red().bold(), outcome);
        }
    }

    Ok(outcome.exit_code())
}

async fn report_live_url<P: Platform>(
    orchestrator: &Orchestrator<P>,
    handle: &DeploymentHandle,
    request: &DeploymentRequest,
) {
    let info = match orchestrator.resource_info(handle.resource_id()).await {
        Ok(info) => info,
        Err(e) => {
            error!("Failed to read app {}: {}", handle.resource_id(), e);
            println!("Deployment successful but couldn't get app URL");
            return;
        }
    };

    let Some(live_url) = info.live_url else {
        warn!("App {} has no live URL yet", handle.resource_id());
        println!("Deployment successful but the app has no live URL yet");
        return;
    };

    let live_url = live_url.trim_end_matches('/');
    println!("URL:          {}", live_url.bold());
    for path in request.health_check_paths() {
        println!("Health check: {}{}", live_url, path);
    }
}

/// Cancel `token` on SIGINT, SIGTERM or Ctrl+C
pub fn cancel_on_shutdown_signal(token: CancellationToken) {
    tokio::spawn(async move {
        await_shutdown_signal().await;
        token.cancel();
    });
}

async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let (mut sigterm, mut sigint) =
            match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                (Ok(term), Ok(int)) => (term, int),
                (Err(e), _) | (_, Err(e)) => {
                    error!("Unable to install signal handlers: {}", e);
                    if tokio::signal::ctrl_c().await.is_ok() {
                        info!("Ctrl+C received, canceling...");
                    }
                    return;
                }
            };

        tokio::select! {
            _ = sigterm.recv() => {
                info!("SIGTERM received, canceling...");
            }
            _ = sigint.recv() => {
                info!("SIGINT received, canceling...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Ctrl+C received, canceling..."),
            Err(e) => error!("Failed to listen for Ctrl+C: {}", e),
        }
    }
}
