//! Deployment orchestrator
//!
//! Drives one remote deployment from submission to a terminal [`Outcome`]:
//! create the resource, trigger the action, poll its phase, resolve.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::deploy::fsm::Phase;
use crate::deploy::platform::{Platform, ResourceInfo};
use crate::errors::DeployError;
use crate::models::database::DatabaseUrl;
use crate::models::deployment::{DeploymentHandle, Outcome, PollResult, PollSummary};
use crate::models::request::{ActionKind, DeploymentRequest, TriggerParams};

/// Orchestrator settings
#[derive(Debug, Clone, Default)]
pub struct OrchestratorOptions {
    /// Abort a poll loop once this many consecutive transport errors have been
    /// retried. `None` retries until the timeout.
    pub max_transport_errors: Option<u32>,
}

/// Receives phase changes as they are observed
pub trait ProgressObserver: Send + Sync {
    fn on_phase_change(&self, handle: &DeploymentHandle, previous: Phase);
}

/// Deployment orchestrator
pub struct Orchestrator<P> {
    platform: P,
    options: OrchestratorOptions,
    observer: Option<Arc<dyn ProgressObserver>>,
}

impl<P: Platform> Orchestrator<P> {
    /// Create an orchestrator with default options
    pub fn new(platform: P) -> Self {
        Self {
            platform,
            options: OrchestratorOptions::default(),
            observer: None,
        }
    }

    pub fn with_options(mut self, options: OrchestratorOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// Send a request to the provider and return a handle on the started action
    pub async fn submit(&self, request: &DeploymentRequest) -> Result<DeploymentHandle, DeployError> {
        request.validate()?;

        let (resource_id, action_id) = match request.action() {
            ActionKind::Create => {
                let spec = request.spec().ok_or_else(|| {
                    DeployError::Configuration("Create request carries no spec".to_string())
                })?;

                let created = self.platform.create_resource(spec).await?;
                info!(app_id = %created.id, "App {} created", request.target());

                let params = match (request.trigger(), created.initial_action_id) {
                    (Some(params), _) => params,
                    (None, Some(initial)) => return Ok(submitted(created.id, initial)),
                    (None, None) => {
                        debug!("App {} has no pending deployment, triggering one", created.id);
                        TriggerParams::default()
                    }
                };
                let action_id = self
                    .platform
                    .trigger_action(&created.id, params)
                    .await
                    .map_err(|e| {
                        error!(app_id = %created.id, "Deployment trigger failed after create: {}", e);
                        DeployError::TriggerFailed {
                            app_id: created.id.clone(),
                            source: Box::new(e),
                        }
                    })?;
                (created.id, action_id)
            }
            ActionKind::Redeploy { app_id } => {
                let params = request.trigger().unwrap_or_default();
                let action_id = self.platform.trigger_action(app_id, params).await?;
                (app_id.clone(), action_id)
            }
        };

        Ok(submitted(resource_id, action_id))
    }

    /// Read the action's status once. Errors are returned as-is, never retried.
    pub async fn poll_once(&self, handle: &mut DeploymentHandle) -> Result<PollResult, DeployError> {
        let phase = self
            .platform
            .read_status(handle.resource_id(), handle.action_id())
            .await?;
        let result = PollResult::new(phase);

        let previous = handle.phase();
        match handle.observe(phase) {
            Ok(true) => {
                log_phase(phase);
                if let Some(observer) = &self.observer {
                    observer.on_phase_change(handle, previous);
                }
            }
            Ok(false) => debug!(phase = %phase, "No phase change"),
            Err(reason) => warn!("Ignoring phase report: {}", reason),
        }

        Ok(result)
    }

    /// Poll until the action reaches a terminal phase, `timeout` elapses or
    /// `cancel` fires.
    ///
    /// The first poll is immediate; later polls are spaced `interval` apart.
    /// Unavailable status reads are retried until the timeout; transport errors
    /// are retried up to [`OrchestratorOptions::max_transport_errors`].
    pub async fn run_to_completion(
        &self,
        handle: &mut DeploymentHandle,
        interval: Duration,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Outcome {
        let span = info_span!(
            "deployment",
            run_id = %Uuid::new_v4(),
            app_id = %handle.resource_id(),
            deployment_id = %handle.action_id(),
        );
        self.poll_loop(handle, interval, timeout, cancel)
            .instrument(span)
            .await
    }

    async fn poll_loop(
        &self,
        handle: &mut DeploymentHandle,
        interval: Duration,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Outcome {
        let started = Instant::now();
        // None when the timeout is too large to represent: wait without a deadline
        let deadline = started.checked_add(timeout);
        let mut polls: u32 = 0;
        let mut transport_errors: u32 = 0;
        let mut last_error: Option<String> = None;

        info!(
            "Waiting for deployment to complete (interval: {:?}, timeout: {:?})",
            interval, timeout
        );

        loop {
            let polled = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                result = self.poll_once(handle) => Some(result),
            };
            let Some(result) = polled else {
                info!("Cancellation requested during poll");
                return Outcome::Canceled(summarize(handle, polls, started, last_error));
            };
            polls += 1;

            match result {
                Ok(_) => {
                    transport_errors = 0;
                    let phase = handle.phase();
                    if phase == Phase::Active {
                        info!(polls, "Deployment completed successfully");
                        return Outcome::Success(summarize(handle, polls, started, last_error));
                    }
                    if phase.is_failure() {
                        error!(phase = %phase, polls, "Deployment did not complete");
                        return Outcome::Failure {
                            phase,
                            summary: summarize(handle, polls, started, last_error),
                        };
                    }
                }
                Err(e) if e.is_transport() => {
                    transport_errors += 1;
                    warn!(poll = polls, consecutive = transport_errors, "Status read failed: {}", e);
                    let message = e.to_string();
                    last_error = Some(message.clone());

                    if let Some(max) = self.options.max_transport_errors {
                        if transport_errors > max {
                            error!("Giving up after {} consecutive transport errors", transport_errors);
                            return Outcome::TransportError {
                                error: message,
                                summary: summarize(handle, polls, started, last_error),
                            };
                        }
                    }
                }
                Err(e) => {
                    transport_errors = 0;
                    if e.is_transient_read() {
                        warn!(poll = polls, "Status unavailable, will retry: {}", e);
                    } else {
                        error!(poll = polls, "Status read failed, will retry: {}", e);
                    }
                    last_error = Some(e.to_string());
                }
            }

            let now = Instant::now();
            if !deadline.is_some_and(|deadline| now >= deadline) {
                let wake = next_wake(now, interval, deadline);
                let canceled = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => true,
                    _ = sleep_until_opt(wake) => false,
                };
                if canceled {
                    info!("Cancellation requested while waiting");
                    return Outcome::Canceled(summarize(handle, polls, started, last_error));
                }
            }

            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                warn!(
                    phase = %handle.phase(),
                    polls,
                    "Deployment timeout reached, it may still complete"
                );
                return Outcome::TimedOut(summarize(handle, polls, started, last_error));
            }
        }
    }

    /// Public URL and attached databases of a resource
    pub async fn resource_info(&self, resource_id: &str) -> Result<ResourceInfo, DeployError> {
        self.platform.read_resource(resource_id).await
    }

    /// Connection string of the first database attached to a resource, if any
    pub async fn database_url(&self, resource_id: &str) -> Result<Option<DatabaseUrl>, DeployError> {
        let info = self.platform.read_resource(resource_id).await?;

        let provisioned = info
            .databases
            .iter()
            .find_map(|db| db.id.as_deref().map(|id| (db.name.as_str(), id)));

        let Some((name, database_id)) = provisioned else {
            if info.databases.is_empty() {
                warn!("No database attached to app {}", resource_id);
            } else {
                warn!(
                    "Databases of app {} are not provisioned yet: {}",
                    resource_id,
                    info.databases
                        .iter()
                        .map(|db| db.name.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                );
            }
            return Ok(None);
        };

        info!("Database {} found with ID: {}", name, database_id);
        let connection = self.platform.read_database_connection(database_id).await?;
        DatabaseUrl::from_connection(&connection).map(Some)
    }
}

fn submitted(resource_id: String, action_id: String) -> DeploymentHandle {
    info!(
        app_id = %resource_id,
        deployment_id = %action_id,
        "Deployment submitted"
    );
    DeploymentHandle::new(resource_id, action_id)
}

fn log_phase(phase: Phase) {
    match phase {
        Phase::Pending => info!(phase = %phase, "Deployment is pending"),
        Phase::Building => info!(phase = %phase, "Building application"),
        Phase::Deploying => info!(phase = %phase, "Deploying application"),
        Phase::Superseded => warn!(phase = %phase, "Deployment was superseded by a newer deployment"),
        phase => info!(phase = %phase, "Deployment phase changed"),
    }
}

/// Next poll time, capped at the deadline. `None` means nothing to wake for.
fn next_wake(now: Instant, interval: Duration, deadline: Option<Instant>) -> Option<Instant> {
    match (now.checked_add(interval), deadline) {
        (Some(next), Some(deadline)) => Some(next.min(deadline)),
        (next, None) => next,
        (None, deadline) => deadline,
    }
}

async fn sleep_until_opt(wake: Option<Instant>) {
    match wake {
        Some(wake) => sleep_until(wake).await,
        None => std::future::pending().await,
    }
}

fn summarize(
    handle: &DeploymentHandle,
    polls: u32,
    started: Instant,
    last_error: Option<String>,
) -> PollSummary {
    PollSummary {
        last_phase: handle.phase(),
        polls,
        elapsed: started.elapsed(),
        last_error,
    }
}
