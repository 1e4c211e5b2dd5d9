use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::{SaveWorkflowRequest, WorkflowDocument};

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub api_key: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api".to_string(),
            api_key: None,
        }
    }
}

/// The slice of the backend the editor session depends on.
///
/// `ApiClient` is the production implementation; tests substitute scripted
/// backends through the same seam.
pub trait WorkflowBackend {
    async fn fetch_workflow(&self, id: &str) -> Result<WorkflowDocument>;

    async fn create_workflow(&self, request: &SaveWorkflowRequest) -> Result<WorkflowDocument>;

    async fn update_workflow(
        &self,
        id: &str,
        request: &SaveWorkflowRequest,
    ) -> Result<WorkflowDocument>;
}

pub struct ApiClient {
    config: ApiConfig,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(config: ApiConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.api_key {
            Some(api_key) => builder.bearer_auth(api_key),
            None => builder,
        }
    }

    async fn send(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let response = self
            .authorized(builder)
            .send()
            .await
            .context("Failed to send request to backend")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Workflow request failed ({}): {}", status, body);
        }
        Ok(response)
    }

    pub async fn list_workflows(&self, agent_type: Option<&str>) -> Result<Vec<WorkflowDocument>> {
        let mut builder = self.http.get(self.url("/workflows"));
        if let Some(agent_type) = agent_type {
            builder = builder.query(&[("agent_type", agent_type)]);
        }
        let documents: Vec<WorkflowDocument> = self
            .send(builder)
            .await?
            .json()
            .await
            .context("Failed to parse workflow list")?;
        debug!("Listed {} workflows", documents.len());
        Ok(documents)
    }

    pub async fn delete_workflow(&self, id: &str) -> Result<()> {
        self.send(self.http.delete(self.url(&format!("/workflows/{}", id))))
            .await?;
        info!("Deleted workflow {}", id);
        Ok(())
    }

    /// Downloads the standalone schema document for a workflow, as served by
    /// the backend's export endpoint.
    pub async fn export_schema(&self, id: &str) -> Result<Vec<u8>> {
        let bytes = self
            .send(self.http.get(self.url(&format!("/workflows/{}/export", id))))
            .await?
            .bytes()
            .await
            .context("Failed to read exported schema")?;
        Ok(bytes.to_vec())
    }

    /// Uploads a standalone schema document. Only `.json` files are
    /// accepted; the check happens before anything leaves the machine.
    pub async fn import_schema(&self, filename: &str, bytes: Vec<u8>) -> Result<WorkflowDocument> {
        if !filename.to_ascii_lowercase().ends_with(".json") {
            anyhow::bail!("Only .json workflow files can be imported: {}", filename);
        }

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str("application/json")
            .context("Failed to build upload part")?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let document: WorkflowDocument = self
            .send(self.http.post(self.url("/workflows/import")).multipart(form))
            .await?
            .json()
            .await
            .context("Failed to parse imported workflow")?;
        info!("Imported workflow {} from {}", document.id, filename);
        Ok(document)
    }
}

impl WorkflowBackend for ApiClient {
    async fn fetch_workflow(&self, id: &str) -> Result<WorkflowDocument> {
        debug!("Fetching workflow {}", id);
        self.send(self.http.get(self.url(&format!("/workflows/{}", id))))
            .await?
            .json()
            .await
            .context("Failed to parse workflow")
    }

    async fn create_workflow(&self, request: &SaveWorkflowRequest) -> Result<WorkflowDocument> {
        let document: WorkflowDocument = self
            .send(self.http.post(self.url("/workflows")).json(request))
            .await?
            .json()
            .await
            .context("Failed to parse created workflow")?;
        info!("Created workflow {}", document.id);
        Ok(document)
    }

    async fn update_workflow(
        &self,
        id: &str,
        request: &SaveWorkflowRequest,
    ) -> Result<WorkflowDocument> {
        let document: WorkflowDocument = self
            .send(
                self.http
                    .put(self.url(&format!("/workflows/{}", id)))
                    .json(request),
            )
            .await?
            .json()
            .await
            .context("Failed to parse updated workflow")?;
        info!("Updated workflow {}", document.id);
        Ok(document)
    }
}
