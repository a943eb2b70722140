//! App Platform API client

use async_trait::async_trait;
use platform_api::{
    AppEnvelope, AppSpec, CreateAppRequest, CreateDeploymentRequest, DatabaseConnection,
    DatabaseEnvelope, DeploymentEnvelope,
};
use tracing::{debug, info, warn};

use crate::deploy::fsm::Phase;
use crate::deploy::platform::{AttachedDatabase, CreatedResource, Platform, ResourceInfo};
use crate::errors::DeployError;
use crate::http::client::HttpClient;
use crate::models::request::TriggerParams;

/// [`Platform`] backed by the App Platform REST API
pub struct AppPlatform {
    client: HttpClient,
}

impl AppPlatform {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &HttpClient {
        &self.client
    }
}

#[async_trait]
impl Platform for AppPlatform {
    async fn create_resource(&self, spec: &AppSpec) -> Result<CreatedResource, DeployError> {
        info!("Creating app: {}", spec.name);
        let body = CreateAppRequest { spec: spec.clone() };
        let response: AppEnvelope = self.client.post("/apps", &body).await?;

        Ok(CreatedResource {
            id: response.app.id,
            initial_action_id: response.app.pending_deployment.map(|d| d.id),
        })
    }

    async fn trigger_action(
        &self,
        resource_id: &str,
        params: TriggerParams,
    ) -> Result<String, DeployError> {
        info!(
            "Starting deployment for app {} (force_build: {})",
            resource_id, params.force_build
        );
        let path = format!("/apps/{}/deployments", resource_id);
        let body = CreateDeploymentRequest {
            force_build: params.force_build,
        };
        let response: DeploymentEnvelope = self.client.post(&path, &body).await?;
        Ok(response.deployment.id)
    }

    async fn read_status(&self, resource_id: &str, action_id: &str) -> Result<Phase, DeployError> {
        let path = format!("/apps/{}/deployments/{}", resource_id, action_id);
        let response: DeploymentEnvelope = self.client.get(&path).await?;

        let phase = Phase::from_provider(&response.deployment.phase);
        if phase == Phase::Unknown {
            warn!(
                "Deployment {} reported unrecognised phase {:?}",
                action_id, response.deployment.phase
            );
        } else {
            debug!("Deployment {} phase: {}", action_id, response.deployment.phase);
        }
        Ok(phase)
    }

    async fn read_resource(&self, resource_id: &str) -> Result<ResourceInfo, DeployError> {
        let path = format!("/apps/{}", resource_id);
        let response: AppEnvelope = self.client.get(&path).await?;

        Ok(ResourceInfo {
            live_url: response.app.live_url.or(response.app.default_ingress),
            databases: response
                .app
                .databases
                .into_iter()
                .map(|db| AttachedDatabase {
                    id: db.id,
                    name: db.name,
                })
                .collect(),
        })
    }

    async fn read_database_connection(
        &self,
        database_id: &str,
    ) -> Result<DatabaseConnection, DeployError> {
        let path = format!("/databases/{}", database_id);
        let response: DatabaseEnvelope = self.client.get(&path).await?;
        Ok(response.database.connection)
    }
}
