//! HTTP client implementation

use std::time::Duration;

use platform_api::ErrorResponse;
use reqwest::{header, Client, Response};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error, warn};
use url::Url;

use crate::authn::credentials::Credentials;
use crate::errors::DeployError;
use crate::utils::user_agent;

/// Default App Platform API root
pub const DEFAULT_BASE_URL: &str = "https://api.digitalocean.com/v2";

/// HTTP client for the cloud API.
///
/// Holds only the stateless client configuration: base URL and credential.
pub struct HttpClient {
    client: Client,
    base_url: String,
    credentials: Credentials,
}

impl HttpClient {
    /// Create a new HTTP client
    pub fn new(
        base_url: &str,
        credentials: Credentials,
        request_timeout: Duration,
    ) -> Result<Self, DeployError> {
        let parsed = Url::parse(base_url).map_err(|e| {
            DeployError::Configuration(format!("Invalid API base URL {}: {}", base_url, e))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(DeployError::Configuration(format!(
                "API base URL must be http(s): {}",
                base_url
            )));
        }

        let client = Client::builder()
            .timeout(request_timeout)
            .user_agent(user_agent())
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Make a GET request. A non-success status is reported as
    /// [`DeployError::StatusUnavailable`].
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, DeployError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .header(header::AUTHORIZATION, self.credentials.bearer())
            .send()
            .await?;

        if !response.status().is_success() {
            let (status, body) = read_failure(response).await;
            warn!("HTTP GET failed: {} - {}", status, body);
            return Err(DeployError::StatusUnavailable { status, body });
        }

        let body = response.json().await?;
        Ok(body)
    }

    /// Make a POST request. A non-success status is reported as
    /// [`DeployError::SubmissionFailed`].
    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, DeployError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .header(header::AUTHORIZATION, self.credentials.bearer())
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let (status, body) = read_failure(response).await;
            error!("HTTP POST failed: {} - {}", status, body);
            return Err(DeployError::SubmissionFailed { status, body });
        }

        let body = response.json().await?;
        Ok(body)
    }
}

/// Status code and the most useful rendering of an error body
async fn read_failure(response: Response) -> (u16, String) {
    let status = response.status().as_u16();
    let raw = response.text().await.unwrap_or_default();
    let body = match serde_json::from_str::<ErrorResponse>(&raw) {
        Ok(err) => format!("{}: {}", err.id, err.message),
        Err(_) => raw,
    };
    (status, body)
}
