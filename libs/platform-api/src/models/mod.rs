//! API models

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Placeholder written in place of secret values when a spec is displayed
pub const REDACTED: &str = "********";

// ================================= APP SPEC ====================================== //

/// Declarative app specification accepted by `POST /apps`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppSpec {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub services: Vec<ServiceSpec>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub workers: Vec<WorkerSpec>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub static_sites: Vec<StaticSiteSpec>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub databases: Vec<DatabaseSpec>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub domains: Vec<DomainSpec>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub envs: Vec<EnvVarSpec>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alerts: Vec<AlertSpec>,
}

impl AppSpec {
    /// Number of deployable components (services, workers and static sites)
    pub fn component_count(&self) -> usize {
        self.services.len() + self.workers.len() + self.static_sites.len()
    }

    /// Iterate over every env var in the spec, app-level first
    pub fn all_envs(&self) -> impl Iterator<Item = &EnvVarSpec> {
        self.envs
            .iter()
            .chain(self.services.iter().flat_map(|s| s.envs.iter()))
            .chain(self.workers.iter().flat_map(|w| w.envs.iter()))
            .chain(self.static_sites.iter().flat_map(|s| s.envs.iter()))
    }

    /// Copy of the spec with every `SECRET` env value replaced by [`REDACTED`]
    pub fn redacted(&self) -> AppSpec {
        let mut spec = self.clone();
        let redact = |envs: &mut Vec<EnvVarSpec>| {
            for env in envs.iter_mut().filter(|e| e.is_secret()) {
                env.value = REDACTED.to_string();
            }
        };
        redact(&mut spec.envs);
        spec.services.iter_mut().for_each(|s| redact(&mut s.envs));
        spec.workers.iter_mut().for_each(|w| redact(&mut w.envs));
        spec.static_sites.iter_mut().for_each(|s| redact(&mut s.envs));
        spec
    }
}

/// Git source of a component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GitHubSource {
    pub repo: String,
    pub branch: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deploy_on_push: Option<bool>,
}

/// A long-running HTTP service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceSpec {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_dir: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github: Option<GitHubSource>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_command: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_command: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment_slug: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_count: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_size_slug: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_port: Option<u16>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub envs: Vec<EnvVarSpec>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub routes: Vec<RouteSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_check: Option<HealthCheckSpec>,
}

/// A background worker with no ingress
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkerSpec {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_dir: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github: Option<GitHubSource>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_command: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_command: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment_slug: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_count: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_size_slug: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub envs: Vec<EnvVarSpec>,
}

/// A statically built site served from the platform CDN
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StaticSiteSpec {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_dir: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github: Option<GitHubSource>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_command: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment_slug: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catchall_document: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub envs: Vec<EnvVarSpec>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub routes: Vec<RouteSpec>,
}

/// Environment variable type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnvVarType {
    #[default]
    General,
    Secret,
}

/// When an environment variable is visible
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnvVarScope {
    RunTime,
    BuildTime,
    RunAndBuildTime,
}

/// Environment variable entry
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvVarSpec {
    pub key: String,

    #[serde(default)]
    pub value: String,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<EnvVarType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<EnvVarScope>,
}

impl EnvVarSpec {
    pub fn is_secret(&self) -> bool {
        self.kind == Some(EnvVarType::Secret)
    }
}

// Secret values must never reach a log line through `{:?}`
impl fmt::Debug for EnvVarSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = if self.is_secret() {
            REDACTED
        } else {
            self.value.as_str()
        };
        f.debug_struct("EnvVarSpec")
            .field("key", &self.key)
            .field("value", &value)
            .field("kind", &self.kind)
            .field("scope", &self.scope)
            .finish()
    }
}

/// Ingress route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteSpec {
    pub path: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preserve_path_prefix: Option<bool>,
}

/// Health check probe of a service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthCheckSpec {
    pub http_path: String,
    pub initial_delay_seconds: u32,
    pub period_seconds: u32,
    pub timeout_seconds: u32,
    pub success_threshold: u32,
    pub failure_threshold: u32,
}

/// Managed database engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DatabaseEngine {
    Pg,
    Mysql,
    Redis,
    Mongodb,
}

/// Database attached to the app
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSpec {
    pub name: String,
    pub engine: DatabaseEngine,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub production: Option<bool>,
}

/// Domain binding type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DomainType {
    Default,
    Primary,
    Alias,
}

/// Custom domain binding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainSpec {
    pub domain: String,

    #[serde(rename = "type")]
    pub kind: DomainType,
}

/// Alert comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertOperator {
    GreaterThan,
    LessThan,
}

/// Alerting rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertSpec {
    pub rule: String,

    #[serde(default)]
    pub disabled: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<AlertOperator>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window: Option<String>,
}

// ================================ ENVELOPES ====================================== //

/// `POST /apps` body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAppRequest {
    pub spec: AppSpec,
}

/// `POST /apps/{id}/deployments` body
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateDeploymentRequest {
    pub force_build: bool,
}

/// Response wrapping a single app
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppEnvelope {
    pub app: App,
}

/// App as returned by the API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct App {
    pub id: String,

    #[serde(default)]
    pub live_url: Option<String>,

    #[serde(default)]
    pub default_ingress: Option<String>,

    #[serde(default)]
    pub pending_deployment: Option<DeploymentRef>,

    #[serde(default)]
    pub active_deployment: Option<DeploymentRef>,

    #[serde(default)]
    pub databases: Vec<AppDatabase>,

    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Reference to a deployment embedded in an app
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentRef {
    pub id: String,
}

/// Database attached to an app
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppDatabase {
    #[serde(default)]
    pub id: Option<String>,

    pub name: String,
}

/// Response wrapping a single deployment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentEnvelope {
    pub deployment: Deployment,
}

/// Deployment as returned by the API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deployment {
    pub id: String,

    /// Raw provider phase, e.g. `PENDING_BUILD` or `ACTIVE`
    #[serde(default)]
    pub phase: String,

    #[serde(default)]
    pub cause: Option<String>,

    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Response wrapping a managed database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseEnvelope {
    pub database: Database,
}

/// Managed database cluster
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Database {
    pub id: String,

    #[serde(default)]
    pub name: Option<String>,

    pub connection: DatabaseConnection,
}

/// Connection parameters of a managed database
#[derive(Clone, Serialize, Deserialize)]
pub struct DatabaseConnection {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,

    #[serde(default)]
    pub ssl: Option<bool>,
}

impl fmt::Debug for DatabaseConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConnection")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &REDACTED)
            .field("database", &self.database)
            .field("ssl", &self.ssl)
            .finish()
    }
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub id: String,
    pub message: String,

    #[serde(default)]
    pub request_id: Option<String>,
}
