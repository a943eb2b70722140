//! Collaborator contract between the orchestrator and a cloud provider

use std::sync::Arc;

use async_trait::async_trait;
use platform_api::{AppSpec, DatabaseConnection};

use crate::deploy::fsm::Phase;
use crate::errors::DeployError;
use crate::models::request::TriggerParams;

/// Result of a resource creation call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedResource {
    pub id: String,

    /// Deployment the provider started on its own, if any
    pub initial_action_id: Option<String>,
}

/// Database attached to a resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachedDatabase {
    pub id: Option<String>,
    pub name: String,
}

/// Snapshot of a resource
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceInfo {
    pub live_url: Option<String>,
    pub databases: Vec<AttachedDatabase>,
}

/// Calls the orchestrator needs from a provider.
///
/// Implementations report non-success statuses as
/// [`DeployError::SubmissionFailed`] for create/trigger and
/// [`DeployError::StatusUnavailable`] for reads, and network failures as
/// [`DeployError::Transport`].
#[async_trait]
pub trait Platform: Send + Sync {
    /// Create the resource described by `spec`
    async fn create_resource(&self, spec: &AppSpec) -> Result<CreatedResource, DeployError>;

    /// Start a deployment of an existing resource, returning its action ID
    async fn trigger_action(
        &self,
        resource_id: &str,
        params: TriggerParams,
    ) -> Result<String, DeployError>;

    /// Read the current phase of an action
    async fn read_status(&self, resource_id: &str, action_id: &str) -> Result<Phase, DeployError>;

    /// Read the resource's public URL and attached databases
    async fn read_resource(&self, resource_id: &str) -> Result<ResourceInfo, DeployError>;

    /// Read connection parameters of a managed database
    async fn read_database_connection(
        &self,
        database_id: &str,
    ) -> Result<DatabaseConnection, DeployError>;
}

#[async_trait]
impl<P: Platform + ?Sized> Platform for Arc<P> {
    async fn create_resource(&self, spec: &AppSpec) -> Result<CreatedResource, DeployError> {
        (**self).create_resource(spec).await
    }

    async fn trigger_action(
        &self,
        resource_id: &str,
        params: TriggerParams,
    ) -> Result<String, DeployError> {
        (**self).trigger_action(resource_id, params).await
    }

    async fn read_status(&self, resource_id: &str, action_id: &str) -> Result<Phase, DeployError> {
        (**self).read_status(resource_id, action_id).await
    }

    async fn read_resource(&self, resource_id: &str) -> Result<ResourceInfo, DeployError> {
        (**self).read_resource(resource_id).await
    }

    async fn read_database_connection(
        &self,
        database_id: &str,
    ) -> Result<DatabaseConnection, DeployError> {
        (**self).read_database_connection(database_id).await
    }
}
