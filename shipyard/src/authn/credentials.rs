//! Bearer credential for the cloud API

use std::fmt;

use secrecy::{ExposeSecret, SecretString};

use crate::errors::DeployError;

/// Environment variable holding the API token
pub const TOKEN_ENV_VAR: &str = "DIGITALOCEAN_API_TOKEN";

/// API token, kept out of logs and `Debug` output
pub struct Credentials {
    token: SecretString,
}

impl Credentials {
    /// Wrap a token obtained out-of-band
    pub fn new(token: impl Into<String>) -> Result<Self, DeployError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(DeployError::Configuration("API token is empty".to_string()));
        }
        Ok(Self {
            token: SecretString::from(token.trim().to_string()),
        })
    }

    /// Read the token from [`TOKEN_ENV_VAR`]. Absence is fatal.
    pub fn from_env() -> Result<Self, DeployError> {
        Self::from_env_var(TOKEN_ENV_VAR)
    }

    /// Read the token from the named environment variable
    pub fn from_env_var(name: &str) -> Result<Self, DeployError> {
        let token = std::env::var(name).map_err(|_| {
            DeployError::Configuration(format!("{} environment variable not set", name))
        })?;
        Self::new(token)
    }

    /// `Authorization` header value
    pub(crate) fn bearer(&self) -> String {
        format!("Bearer {}", self.token.expose_secret())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials").field("token", &"[REDACTED]").finish()
    }
}
