//! Deployment request models
//!
//! An [`AppDefinition`] is what operators write: it may reference secrets by
//! environment variable name instead of embedding them. Resolving it against
//! an [`EnvSource`] produces the closed [`AppSpec`] carried by a
//! [`DeploymentRequest`].

use std::collections::HashMap;
use std::path::Path;

use platform_api::{
    AlertOperator, AlertSpec, AppSpec, DatabaseEngine, DatabaseSpec, DomainSpec, DomainType,
    EnvVarScope, EnvVarSpec, EnvVarType, GitHubSource, HealthCheckSpec, RouteSpec, ServiceSpec,
    StaticSiteSpec, WorkerSpec,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::DeployError;

/// Source of environment values resolved at submit time
pub trait EnvSource {
    fn var(&self, key: &str) -> Option<String>;
}

/// Reads from the process environment
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|v| !v.is_empty())
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

// ============================== AUTHORING FORMAT ================================= //

/// Declarative app definition as written in a request file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppDefinition {
    pub name: String,

    #[serde(default)]
    pub region: Option<String>,

    #[serde(default)]
    pub components: Vec<ComponentDefinition>,

    /// App-level environment variables
    #[serde(default)]
    pub envs: Vec<EnvVarDefinition>,

    #[serde(default)]
    pub databases: Vec<DatabaseDefinition>,

    #[serde(default)]
    pub domains: Vec<DomainBinding>,

    #[serde(default)]
    pub alerts: Vec<AlertRule>,
}

/// Kind of deployable component
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    #[default]
    Service,
    Worker,
    StaticSite,
}

/// Where a component's code comes from
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceDefinition {
    /// `owner/name` of a GitHub repository
    #[serde(default)]
    pub repo: Option<String>,

    #[serde(default = "default_branch")]
    pub branch: String,

    #[serde(default)]
    pub deploy_on_push: Option<bool>,

    /// Sub-directory of the repository holding the component
    #[serde(default)]
    pub dir: Option<String>,
}

fn default_branch() -> String {
    "main".to_string()
}

/// One service, worker or static site
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentDefinition {
    pub name: String,

    #[serde(default)]
    pub kind: ComponentKind,

    #[serde(default)]
    pub source: SourceDefinition,

    #[serde(default)]
    pub build_command: Option<String>,

    #[serde(default)]
    pub run_command: Option<String>,

    /// Build output directory, static sites only
    #[serde(default)]
    pub output_dir: Option<String>,

    #[serde(default)]
    pub environment_slug: Option<String>,

    #[serde(default)]
    pub instance_count: Option<u32>,

    #[serde(default)]
    pub instance_size: Option<String>,

    #[serde(default)]
    pub http_port: Option<u16>,

    #[serde(default)]
    pub routes: Vec<String>,

    #[serde(default)]
    pub envs: Vec<EnvVarDefinition>,

    #[serde(default)]
    pub health_check: Option<HealthCheck>,
}

/// Environment variable, either a literal or a reference to the caller's environment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvVarDefinition {
    pub key: String,

    #[serde(default)]
    pub value: Option<String>,

    /// Name of the caller-side environment variable to read at submit time
    #[serde(default)]
    pub from_env: Option<String>,

    /// Send as a provider secret and keep out of logs
    #[serde(default)]
    pub secret: bool,

    #[serde(default)]
    pub scope: Option<EnvVarScope>,
}

/// Health check parameters, in seconds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheck {
    pub path: String,

    #[serde(default = "default_initial_delay")]
    pub initial_delay: u32,

    #[serde(default = "default_period")]
    pub period: u32,

    #[serde(default = "default_probe_timeout")]
    pub timeout: u32,

    #[serde(default = "default_success_threshold")]
    pub success_threshold: u32,

    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
}

fn default_initial_delay() -> u32 {
    10
}

fn default_period() -> u32 {
    10
}

fn default_probe_timeout() -> u32 {
    5
}

fn default_success_threshold() -> u32 {
    1
}

fn default_failure_threshold() -> u32 {
    3
}

/// Attached database declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseDefinition {
    pub name: String,
    pub engine: DatabaseEngine,

    #[serde(default)]
    pub version: Option<String>,

    #[serde(default)]
    pub production: bool,
}

/// Custom domain binding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainBinding {
    pub domain: String,

    #[serde(default = "default_domain_type")]
    pub kind: DomainType,
}

fn default_domain_type() -> DomainType {
    DomainType::Alias
}

/// Alerting rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRule {
    /// Provider rule name, e.g. `DEPLOYMENT_FAILED` or `CPU_UTILIZATION`
    pub metric: String,

    #[serde(default)]
    pub operator: Option<AlertOperator>,

    #[serde(default)]
    pub threshold: Option<f64>,

    #[serde(default)]
    pub window: Option<String>,

    #[serde(default)]
    pub disabled: bool,
}

impl AppDefinition {
    /// Load a definition from a JSON file
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, DeployError> {
        let path = path.as_ref();
        let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
            DeployError::Configuration(format!("Unable to read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&contents).map_err(|e| {
            DeployError::Configuration(format!("Malformed request {}: {}", path.display(), e))
        })
    }

    /// Resolve every env reference and produce the closed provider spec
    pub fn resolve(&self, env: &dyn EnvSource) -> Result<AppSpec, DeployError> {
        let mut spec = AppSpec {
            name: self.name.clone(),
            region: self.region.clone(),
            envs: resolve_envs(&self.envs, env)?,
            databases: self
                .databases
                .iter()
                .map(|db| DatabaseSpec {
                    name: db.name.clone(),
                    engine: db.engine,
                    version: db.version.clone(),
                    production: Some(db.production),
                })
                .collect(),
            domains: self
                .domains
                .iter()
                .map(|d| DomainSpec {
                    domain: d.domain.clone(),
                    kind: d.kind,
                })
                .collect(),
            alerts: self
                .alerts
                .iter()
                .map(|a| AlertSpec {
                    rule: a.metric.clone(),
                    disabled: a.disabled,
                    operator: a.operator,
                    value: a.threshold,
                    window: a.window.clone(),
                })
                .collect(),
            ..Default::default()
        };

        for component in &self.components {
            let envs = resolve_envs(&component.envs, env)?;
            let github = component.source.repo.as_ref().map(|repo| GitHubSource {
                repo: repo.clone(),
                branch: component.source.branch.clone(),
                deploy_on_push: component.source.deploy_on_push,
            });
            let routes = component
                .routes
                .iter()
                .map(|path| RouteSpec {
                    path: path.clone(),
                    preserve_path_prefix: None,
                })
                .collect();

            match component.kind {
                ComponentKind::Service => spec.services.push(ServiceSpec {
                    name: component.name.clone(),
                    source_dir: component.source.dir.clone(),
                    github,
                    build_command: component.build_command.clone(),
                    run_command: component.run_command.clone(),
                    environment_slug: component.environment_slug.clone(),
                    instance_count: component.instance_count,
                    instance_size_slug: component.instance_size.clone(),
                    http_port: component.http_port,
                    envs,
                    routes,
                    health_check: component.health_check.as_ref().map(|hc| HealthCheckSpec {
                        http_path: hc.path.clone(),
                        initial_delay_seconds: hc.initial_delay,
                        period_seconds: hc.period,
                        timeout_seconds: hc.timeout,
                        success_threshold: hc.success_threshold,
                        failure_threshold: hc.failure_threshold,
                    }),
                }),
                ComponentKind::Worker => spec.workers.push(WorkerSpec {
                    name: component.name.clone(),
                    source_dir: component.source.dir.clone(),
                    github,
                    build_command: component.build_command.clone(),
                    run_command: component.run_command.clone(),
                    environment_slug: component.environment_slug.clone(),
                    instance_count: component.instance_count,
                    instance_size_slug: component.instance_size.clone(),
                    envs,
                }),
                ComponentKind::StaticSite => spec.static_sites.push(StaticSiteSpec {
                    name: component.name.clone(),
                    source_dir: component.source.dir.clone(),
                    github,
                    build_command: component.build_command.clone(),
                    output_dir: component.output_dir.clone(),
                    environment_slug: component.environment_slug.clone(),
                    catchall_document: None,
                    envs,
                    routes,
                }),
            }
        }

        Ok(spec)
    }
}

fn resolve_envs(
    defs: &[EnvVarDefinition],
    env: &dyn EnvSource,
) -> Result<Vec<EnvVarSpec>, DeployError> {
    defs.iter()
        .map(|def| {
            let value = match (&def.value, &def.from_env) {
                (Some(_), Some(_)) => {
                    return Err(DeployError::Configuration(format!(
                        "Env var {} sets both value and from_env",
                        def.key
                    )))
                }
                (Some(value), None) => value.clone(),
                (None, Some(name)) => env.var(name).ok_or_else(|| {
                    DeployError::Configuration(format!(
                        "Env var {} references {} which is not set",
                        def.key, name
                    ))
                })?,
                (None, None) => {
                    return Err(DeployError::Configuration(format!(
                        "Env var {} has neither value nor from_env",
                        def.key
                    )))
                }
            };

            Ok(EnvVarSpec {
                key: def.key.clone(),
                value,
                kind: def.secret.then_some(EnvVarType::Secret),
                scope: def.scope,
            })
        })
        .collect()
}

// ================================== REQUEST ====================================== //

/// Parameters of a deployment trigger
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TriggerParams {
    /// Rebuild from source even if nothing changed
    pub force_build: bool,
}

/// What the request asks the provider to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionKind {
    /// Create a new app from the spec
    Create,

    /// Start a new deployment of an existing app
    Redeploy { app_id: String },
}

/// A desired remote state change, immutable once built
#[derive(Debug, Clone)]
pub struct DeploymentRequest {
    target: String,
    action: ActionKind,
    spec: Option<AppSpec>,
    trigger: Option<TriggerParams>,
}

impl DeploymentRequest {
    /// Create an app from a closed spec. The provider's initial deployment is tracked
    /// unless [`with_trigger`](Self::with_trigger) asks for an explicit one.
    pub fn create(spec: AppSpec) -> Self {
        Self {
            target: spec.name.clone(),
            action: ActionKind::Create,
            spec: Some(spec),
            trigger: None,
        }
    }

    /// Redeploy an existing app
    pub fn redeploy(app_id: impl Into<String>, params: TriggerParams) -> Self {
        let app_id = app_id.into();
        Self {
            target: app_id.clone(),
            action: ActionKind::Redeploy { app_id },
            spec: None,
            trigger: Some(params),
        }
    }

    /// Issue an explicit trigger call after creation
    pub fn with_trigger(mut self, params: TriggerParams) -> Self {
        self.trigger = Some(params);
        self
    }

    /// App name for creations, app ID for redeploys
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn action(&self) -> &ActionKind {
        &self.action
    }

    pub fn spec(&self) -> Option<&AppSpec> {
        self.spec.as_ref()
    }

    pub fn trigger(&self) -> Option<TriggerParams> {
        self.trigger
    }

    /// Health check paths declared by the request's services
    pub fn health_check_paths(&self) -> Vec<&str> {
        self.spec
            .iter()
            .flat_map(|spec| spec.services.iter())
            .filter_map(|s| s.health_check.as_ref().map(|hc| hc.http_path.as_str()))
            .collect()
    }

    /// Check the request is closed and complete before anything is sent
    pub fn validate(&self) -> Result<(), DeployError> {
        if self.target.trim().is_empty() {
            return Err(DeployError::Configuration(
                "Request target must not be empty".to_string(),
            ));
        }

        match (&self.action, &self.spec) {
            (ActionKind::Create, None) => {
                return Err(DeployError::Configuration(
                    "Create request carries no spec".to_string(),
                ))
            }
            (ActionKind::Create, Some(spec)) => validate_spec(spec)?,
            (ActionKind::Redeploy { .. }, Some(spec)) => validate_spec(spec)?,
            (ActionKind::Redeploy { .. }, None) => {}
        }

        Ok(())
    }
}

fn validate_spec(spec: &AppSpec) -> Result<(), DeployError> {
    if spec.name.trim().is_empty() {
        return Err(DeployError::Configuration(
            "App name must not be empty".to_string(),
        ));
    }

    if spec.component_count() == 0 {
        return Err(DeployError::Configuration(format!(
            "App {} declares no services, workers or static sites",
            spec.name
        )));
    }

    if spec.all_envs().any(|e| e.key.trim().is_empty()) {
        return Err(DeployError::Configuration(format!(
            "App {} declares an env var with an empty key",
            spec.name
        )));
    }

    // The provider would store `${NAME}` literally instead of substituting it
    let value = serde_json::to_value(spec)?;
    if let Some(path) = find_placeholder(&value, "$") {
        return Err(DeployError::Configuration(format!(
            "Unresolved placeholder at {}",
            path
        )));
    }

    Ok(())
}

/// JSON path of the first string holding a `${...}` placeholder
fn find_placeholder(value: &Value, path: &str) -> Option<String> {
    match value {
        Value::String(s) => has_placeholder(s).then(|| path.to_string()),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .find_map(|(i, item)| find_placeholder(item, &format!("{}[{}]", path, i))),
        Value::Object(map) => map
            .iter()
            .find_map(|(key, item)| find_placeholder(item, &format!("{}.{}", path, key))),
        _ => None,
    }
}

fn has_placeholder(s: &str) -> bool {
    s.find("${")
        .map(|start| s[start + 2..].contains('}'))
        .unwrap_or(false)
}
