//! Provider configuration
//!
//! Values set explicitly in the configuration win. Empty or missing values
//! fall back to the `OMNI_ENDPOINT` and `OMNI_SERVICE_ACCOUNT_KEY`
//! environment variables.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::diagnostics::Diagnostics;
use crate::error::Result;
use crate::poller::PollConfig;

pub const ENV_ENDPOINT: &str = "OMNI_ENDPOINT";
pub const ENV_SERVICE_ACCOUNT_KEY: &str = "OMNI_SERVICE_ACCOUNT_KEY";

/// A secret that never shows up in `Debug` output
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

/// Provider configuration as written by the user
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    /// Omni API endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Omni service account key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account_key: Option<SecretString>,

    /// Readiness polling
    #[serde(default)]
    pub poll: PollConfig,
}

/// Fully resolved and validated configuration
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub endpoint: Url,
    pub service_account_key: SecretString,
    pub poll: PollConfig,
}

impl ProviderConfig {
    /// Load configuration from a YAML file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Resolve against the process environment
    pub fn resolve(&self) -> std::result::Result<ResolvedConfig, Diagnostics> {
        self.resolve_with(|name| std::env::var(name).ok())
    }

    /// Resolve against an arbitrary variable lookup
    pub fn resolve_with<F>(&self, env: F) -> std::result::Result<ResolvedConfig, Diagnostics>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut diagnostics = Diagnostics::new();

        let endpoint = non_empty(self.endpoint.clone()).or_else(|| non_empty(env(ENV_ENDPOINT)));
        let service_account_key = self
            .service_account_key
            .clone()
            .filter(|key| !key.is_empty())
            .or_else(|| non_empty(env(ENV_SERVICE_ACCOUNT_KEY)).map(SecretString::new));

        let endpoint = match endpoint {
            None => {
                diagnostics.add_attribute_error(
                    "endpoint",
                    "Missing Omni API Endpoint",
                    format!(
                        "The provider cannot create the Omni API client as there is a missing or empty value for the Omni API endpoint. \
                         Set the endpoint value in the configuration or use the {} environment variable. \
                         If either is already set, ensure the value is not empty.",
                        ENV_ENDPOINT
                    ),
                );
                None
            }
            Some(raw) => match Url::parse(&raw) {
                Ok(url) if url.has_host() => Some(url),
                Ok(_) => {
                    diagnostics.add_attribute_error(
                        "endpoint",
                        "Invalid Omni API Endpoint",
                        format!("The endpoint `{}` has no host.", raw),
                    );
                    None
                }
                Err(e) => {
                    diagnostics.add_attribute_error(
                        "endpoint",
                        "Invalid Omni API Endpoint",
                        format!("The endpoint `{}` is not an absolute URL: {}", raw, e),
                    );
                    None
                }
            },
        };

        if service_account_key.is_none() {
            diagnostics.add_attribute_error(
                "service_account_key",
                "Missing Omni Service Account Key",
                format!(
                    "The provider cannot create the Omni API client as there is a missing or empty value for the Omni API service account key. \
                     Set the service account key value in the configuration or use the {} environment variable. \
                     If either is already set, ensure the value is not empty.",
                    ENV_SERVICE_ACCOUNT_KEY
                ),
            );
        }

        if let Err(e) = self.poll.validate() {
            diagnostics.add_attribute_error("poll", "Invalid Poll Configuration", e.to_string());
        }

        match (endpoint, service_account_key) {
            (Some(endpoint), Some(service_account_key)) if !diagnostics.has_errors() => {
                Ok(ResolvedConfig {
                    endpoint,
                    service_account_key,
                    poll: self.poll.clone(),
                })
            }
            _ => Err(diagnostics),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
