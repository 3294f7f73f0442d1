//! Client for the gateway's registration API.
//!
//! Backend services register on startup, heartbeat at the gateway's
//! configured interval and unregister on shutdown.

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unknown instance {0}")]
    UnknownInstance(String),

    #[error("gateway returned {status}: {body}")]
    Status { status: StatusCode, body: String },
}

pub type Result<T> = std::result::Result<T, SdkError>;

/// Instance description sent on registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registration {
    /// Reuse an id to upsert an existing registration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl Registration {
    pub fn new(name: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            id: None,
            name: name.into(),
            host: host.into(),
            port,
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

#[derive(Deserialize)]
struct Registered {
    id: String,
}

#[derive(Debug, Clone)]
pub struct RegistryClient {
    client: Client,
    admin_url: String,
    api_key: String,
}

impl RegistryClient {
    pub fn new(admin_url: &str, api_key: &str) -> Self {
        Self {
            client: Client::new(),
            admin_url: admin_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.admin_url, path)
    }

    /// Register an instance. Returns the id assigned by the gateway.
    pub async fn register(&self, registration: &Registration) -> Result<String> {
        let resp = self
            .client
            .post(self.url("/admin/services"))
            .bearer_auth(&self.api_key)
            .json(registration)
            .send()
            .await?;

        let resp = check(resp, None).await?;
        let registered: Registered = resp.json().await?;
        Ok(registered.id)
    }

    /// Refresh the instance's heartbeat.
    pub async fn heartbeat(&self, id: &str) -> Result<()> {
        let resp = self
            .client
            .post(self.url(&format!("/admin/services/{}/heartbeat", id)))
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        check(resp, Some(id)).await.map(|_| ())
    }

    pub async fn unregister(&self, id: &str) -> Result<()> {
        let resp = self
            .client
            .delete(self.url(&format!("/admin/services/{}", id)))
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        check(resp, Some(id)).await.map(|_| ())
    }

    /// Heartbeat every `interval` until the task is aborted.
    ///
    /// If the gateway no longer knows the instance (restart, explicit
    /// unregistration), it is registered again under the same id.
    pub fn spawn_heartbeat(&self, registration: Registration, id: String, interval: Duration) -> JoinHandle<()> {
        let client = self.clone();
        let registration = Registration {
            id: Some(id.clone()),
            ..registration
        };

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match client.heartbeat(&id).await {
                    Ok(()) => {}
                    Err(SdkError::UnknownInstance(_)) => {
                        tracing::warn!(instance = %id, "Gateway lost registration, registering again");
                        if let Err(e) = client.register(&registration).await {
                            tracing::warn!(instance = %id, error = %e, "Re-registration failed");
                        }
                    }
                    Err(e) => tracing::warn!(instance = %id, error = %e, "Heartbeat failed"),
                }
            }
        })
    }
}

async fn check(resp: reqwest::Response, id: Option<&str>) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    if let (StatusCode::NOT_FOUND, Some(id)) = (status, id) {
        return Err(SdkError::UnknownInstance(id.to_string()));
    }
    let body = resp.text().await.unwrap_or_default();
    Err(SdkError::Status { status, body })
}
