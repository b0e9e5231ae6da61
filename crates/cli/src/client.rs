//! HTTP client for the daemon's control surface

use anyhow::{bail, Context, Result};
use buildwatch_core::{DaemonConfig, ProjectConfig};
use buildwatch_server::AddProjectRequest;
use serde::Deserialize;
use std::path::Path;

/// Thin client over the daemon's control endpoints
pub struct ControlClient {
    base_url: String,
    http: reqwest::Client,
}

#[derive(Deserialize)]
struct HelloResponse {
    message: String,
}

#[derive(Deserialize)]
struct AddProjectResponse {
    project: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: String,
}

impl ControlClient {
    /// Creates a client for the configured daemon address
    pub fn new(config: &DaemonConfig) -> Self {
        Self {
            base_url: config.base_url(),
            http: reqwest::Client::new(),
        }
    }

    /// Calls the liveness probe and returns the reply
    pub async fn hello(&self) -> Result<String> {
        let response = self
            .http
            .get(format!("{}/api/v1/hello", self.base_url))
            .send()
            .await
            .with_context(|| format!("Could not reach the daemon at {}", self.base_url))?;
        let reply: HelloResponse = response
            .error_for_status()
            .context("Hello call failed")?
            .json()
            .await
            .context("Malformed hello reply")?;
        Ok(reply.message)
    }

    /// Registers a project; returns the daemon-assigned project name
    pub async fn add_project(&self, working_dir: &Path, config: &ProjectConfig) -> Result<String> {
        let request = AddProjectRequest {
            working_dir: working_dir.to_path_buf(),
            config: config.clone(),
        };
        let response = self
            .http
            .post(format!("{}/api/v1/projects", self.base_url))
            .json(&request)
            .send()
            .await
            .with_context(|| format!("Could not reach the daemon at {}", self.base_url))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response
                .json::<ErrorResponse>()
                .await
                .map(|e| e.error)
                .unwrap_or_else(|_| status.to_string());
            bail!("Daemon rejected the project: {detail}");
        }

        let reply: AddProjectResponse = response
            .json()
            .await
            .context("Malformed add-project reply")?;
        Ok(reply.project)
    }

    /// Asks the daemon to shut down
    pub async fn shutdown(&self) -> Result<()> {
        self.http
            .post(format!("{}/api/v1/shutdown", self.base_url))
            .send()
            .await
            .with_context(|| format!("Could not reach the daemon at {}", self.base_url))?
            .error_for_status()
            .context("Shutdown call failed")?;
        Ok(())
    }
}
