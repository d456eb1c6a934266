//! Async and sync API clients.
//!
//! Every processing operation follows the same shape: submit a job, receive a
//! check URL, poll it until the job reaches a terminal state, then parse the
//! final payload. [`poll`] owns the polling loop; this module owns transport.

pub mod poll;

pub use poll::{poll_until_complete, CheckStatus, PollConfig};

use std::path::Path;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::multipart;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::error::{DatalabError, Result};
use crate::mime;
use crate::models::{
    ConversionResult, ConvertOptions, FormOptions, InputConfig, OcrOptions, OcrResult, Workflow,
    WorkflowExecution, WorkflowStep,
};
use crate::settings::Settings;
use crate::sources::SourceKind;

const USER_AGENT: &str = concat!("datalab-rust-sdk/", env!("CARGO_PKG_VERSION"));

const MARKER_ENDPOINT: &str = "/api/v1/marker";
const OCR_ENDPOINT: &str = "/api/v1/ocr";
const WORKFLOWS_ENDPOINT: &str = "/api/v1/workflows/workflows";
const EXECUTIONS_ENDPOINT: &str = "/api/v1/workflows/executions";

/// A submitted job: its id plus the absolute URL to poll for status.
#[derive(Debug, Clone)]
pub struct JobHandle {
    pub request_id: String,
    pub check_url: String,
}

/// Asynchronous API client.
///
/// Cheap to clone; the underlying connection pool is shared. Per-call poll
/// budgets go through [`AsyncDatalabClient::with_poll_config`].
#[derive(Debug, Clone)]
pub struct AsyncDatalabClient {
    http: reqwest::Client,
    base_url: String,
    poll: PollConfig,
}

impl AsyncDatalabClient {
    /// Build a client with default host and timeouts.
    pub fn new(api_key: &str) -> Result<Self> {
        let settings = Settings {
            api_key: Some(api_key.to_string()),
            ..Settings::default()
        };
        Self::from_settings(&settings)
    }

    /// Build a client from resolved settings. Fails if no API key is set.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let api_key = settings.require_api_key()?;

        let mut headers = HeaderMap::new();
        let mut key_value = HeaderValue::from_str(api_key)
            .map_err(|_| DatalabError::Config("API key contains invalid characters".to_string()))?;
        key_value.set_sensitive(true);
        headers.insert("X-Api-Key", key_value);

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(settings.timeout)
            .build()
            .map_err(|e| DatalabError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            poll: PollConfig {
                max_polls: settings.max_polls,
                poll_interval: settings.poll_interval,
            },
        })
    }

    /// Clone of this client using a different poll budget.
    pub fn with_poll_config(&self, poll: PollConfig) -> Self {
        Self {
            poll,
            ..self.clone()
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Resolve an endpoint path against the base URL. Check URLs come back
    /// absolute and pass through untouched.
    fn resolve(&self, path_or_url: &str) -> String {
        if path_or_url.starts_with("http://") || path_or_url.starts_with("https://") {
            path_or_url.to_string()
        } else {
            format!("{}{}", self.base_url, path_or_url)
        }
    }

    async fn read_json(response: reqwest::Response) -> Result<Value> {
        let status = response.status();
        if !status.is_success() {
            let body: Option<Value> = response.json().await.ok();
            let message = body
                .as_ref()
                .and_then(|b| b.get("error"))
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("HTTP {}", status));
            return Err(DatalabError::api_with_response(
                message,
                status.as_u16(),
                body,
            ));
        }
        let data = response.json().await?;
        Ok(data)
    }

    async fn get_json(&self, path_or_url: &str) -> Result<Value> {
        let response = self.http.get(self.resolve(path_or_url)).send().await?;
        Self::read_json(response).await
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<Value> {
        let response = self
            .http
            .post(self.resolve(path))
            .json(body)
            .send()
            .await?;
        Self::read_json(response).await
    }

    /// Submit a processing job. Local files upload as multipart; URLs are
    /// passed by reference as a `file_url` form field.
    async fn submit(
        &self,
        endpoint: &str,
        source: &SourceKind,
        fields: Vec<(String, String)>,
    ) -> Result<JobHandle> {
        let request = self.http.post(self.resolve(endpoint));

        let response = match source {
            SourceKind::Local(path) => {
                let bytes = tokio::fs::read(path).await.map_err(|e| {
                    DatalabError::file(path.display().to_string(), format!("File not found or unreadable: {}", e))
                })?;
                let filename = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "upload".to_string());
                let part = multipart::Part::bytes(bytes)
                    .file_name(filename)
                    .mime_str(&mime::mime_type_for(path))
                    .map_err(|e| {
                        DatalabError::file(path.display().to_string(), e.to_string())
                    })?;

                let mut form = multipart::Form::new().part("file", part);
                for (key, value) in fields {
                    form = form.text(key, value);
                }
                request.multipart(form).send().await?
            }
            SourceKind::Url(url) => {
                let mut form = fields;
                form.push(("file_url".to_string(), url.clone()));
                request.form(&form).send().await?
            }
        };

        let data = Self::read_json(response).await?;
        if !data.get("success").and_then(Value::as_bool).unwrap_or(false) {
            let message = data
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("Unknown error");
            return Err(DatalabError::api(format!("Request failed: {}", message)));
        }

        let check_url = data
            .get("request_check_url")
            .and_then(Value::as_str)
            .ok_or_else(|| DatalabError::api("Submit response missing request_check_url"))?
            .to_string();
        let request_id = data
            .get("request_id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        debug!(request_id = %request_id, "job submitted");
        Ok(JobHandle {
            request_id,
            check_url,
        })
    }

    /// Convert a document to the requested output format.
    pub async fn convert(
        &self,
        source: &SourceKind,
        options: &ConvertOptions,
        save_output: Option<&Path>,
    ) -> Result<ConversionResult> {
        let handle = self
            .submit(MARKER_ENDPOINT, source, options.form_fields())
            .await?;
        let data = poll_until_complete(self, &handle.check_url, self.poll).await?;
        let result = ConversionResult::from_response(data, options.output_format.as_str())?;

        if let Some(path) = save_output {
            if result.success {
                result
                    .save_output(path)
                    .map_err(|e| DatalabError::file(path.display().to_string(), e.to_string()))?;
                info!(path = %path.display(), "conversion output saved");
            }
        }
        Ok(result)
    }

    /// Run OCR on a local document. Remote URLs are not accepted.
    pub async fn ocr(
        &self,
        source: &SourceKind,
        options: &OcrOptions,
        save_output: Option<&Path>,
    ) -> Result<OcrResult> {
        if let SourceKind::Url(url) = source {
            return Err(DatalabError::Validation(format!(
                "OCR only supports local files, not URLs: {}",
                url
            )));
        }

        let handle = self
            .submit(OCR_ENDPOINT, source, options.form_fields())
            .await?;
        let data = poll_until_complete(self, &handle.check_url, self.poll).await?;
        let result = OcrResult::from_response(data)?;

        if let Some(path) = save_output {
            if result.success {
                result
                    .save_output(path)
                    .map_err(|e| DatalabError::file(path.display().to_string(), e.to_string()))?;
                info!(path = %path.display(), "OCR output saved");
            }
        }
        Ok(result)
    }

    /// Create a workflow from named steps.
    pub async fn create_workflow(&self, name: &str, steps: Vec<WorkflowStep>) -> Result<Workflow> {
        let data = self
            .post_json(WORKFLOWS_ENDPOINT, &json!({"name": name, "steps": steps}))
            .await?;
        serde_json::from_value(data)
            .map_err(|e| DatalabError::api(format!("Malformed workflow response: {}", e)))
    }

    /// Fetch a workflow by id.
    pub async fn get_workflow(&self, workflow_id: i64) -> Result<Workflow> {
        let data = self
            .get_json(&format!("{}/{}", WORKFLOWS_ENDPOINT, workflow_id))
            .await?;
        serde_json::from_value(data)
            .map_err(|e| DatalabError::api(format!("Malformed workflow response: {}", e)))
    }

    /// List the team's workflows.
    pub async fn list_workflows(&self) -> Result<Vec<Workflow>> {
        let data = self.get_json(WORKFLOWS_ENDPOINT).await?;
        let workflows = data
            .get("workflows")
            .cloned()
            .unwrap_or_else(|| json!([]));
        serde_json::from_value(workflows)
            .map_err(|e| DatalabError::api(format!("Malformed workflow list: {}", e)))
    }

    /// Trigger a workflow execution. Returns the initial execution state
    /// without waiting for completion.
    pub async fn execute_workflow(
        &self,
        workflow_id: i64,
        input_config: &InputConfig,
    ) -> Result<WorkflowExecution> {
        let data = self
            .post_json(
                &format!("{}/{}/execute", WORKFLOWS_ENDPOINT, workflow_id),
                &json!({"input_config": input_config}),
            )
            .await?;
        let mut execution = WorkflowExecution::from_response(data)?;
        if execution.workflow_id == 0 {
            execution.workflow_id = workflow_id;
        }
        Ok(execution)
    }

    /// Fetch the current state of an execution.
    pub async fn get_execution_status(&self, execution_id: i64) -> Result<WorkflowExecution> {
        let data = self
            .get_json(&format!("{}/{}", EXECUTIONS_ENDPOINT, execution_id))
            .await?;
        WorkflowExecution::from_response(data)
    }

    /// Poll an execution until it reaches a terminal status. Terminal
    /// failures are returned as a value, not an error; callers inspect
    /// [`WorkflowExecution::success`].
    pub async fn wait_for_execution(&self, execution_id: i64) -> Result<WorkflowExecution> {
        for attempt in 1..=self.poll.max_polls {
            let execution = self.get_execution_status(execution_id).await?;
            if execution.is_terminal() {
                debug!(execution_id, attempts = attempt, status = %execution.status, "execution finished");
                return Ok(execution);
            }
            if attempt < self.poll.max_polls {
                tokio::time::sleep(self.poll.poll_interval).await;
            }
        }
        Err(DatalabError::Timeout {
            attempts: self.poll.max_polls,
            budget: self.poll.budget(),
        })
    }
}

#[async_trait]
impl CheckStatus for AsyncDatalabClient {
    async fn check(&self, check_url: &str) -> Result<Value> {
        self.get_json(check_url).await
    }
}

/// Synchronous client. A thin wrapper that drives [`AsyncDatalabClient`] on
/// an owned single-threaded runtime; all protocol logic lives in the async
/// client.
#[derive(Debug)]
pub struct DatalabClient {
    runtime: tokio::runtime::Runtime,
    inner: AsyncDatalabClient,
}

impl DatalabClient {
    pub fn new(api_key: &str) -> Result<Self> {
        let settings = Settings {
            api_key: Some(api_key.to_string()),
            ..Settings::default()
        };
        Self::from_settings(&settings)
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| DatalabError::Config(format!("Failed to start runtime: {}", e)))?;
        let inner = AsyncDatalabClient::from_settings(settings)?;
        Ok(Self { runtime, inner })
    }

    pub fn convert(
        &self,
        source: &SourceKind,
        options: &ConvertOptions,
        save_output: Option<&Path>,
    ) -> Result<ConversionResult> {
        self.runtime
            .block_on(self.inner.convert(source, options, save_output))
    }

    pub fn ocr(
        &self,
        source: &SourceKind,
        options: &OcrOptions,
        save_output: Option<&Path>,
    ) -> Result<OcrResult> {
        self.runtime
            .block_on(self.inner.ocr(source, options, save_output))
    }

    pub fn create_workflow(&self, name: &str, steps: Vec<WorkflowStep>) -> Result<Workflow> {
        self.runtime.block_on(self.inner.create_workflow(name, steps))
    }

    pub fn get_workflow(&self, workflow_id: i64) -> Result<Workflow> {
        self.runtime.block_on(self.inner.get_workflow(workflow_id))
    }

    pub fn list_workflows(&self) -> Result<Vec<Workflow>> {
        self.runtime.block_on(self.inner.list_workflows())
    }

    pub fn execute_workflow(
        &self,
        workflow_id: i64,
        input_config: &InputConfig,
    ) -> Result<WorkflowExecution> {
        self.runtime
            .block_on(self.inner.execute_workflow(workflow_id, input_config))
    }

    pub fn get_execution_status(&self, execution_id: i64) -> Result<WorkflowExecution> {
        self.runtime
            .block_on(self.inner.get_execution_status(execution_id))
    }

    pub fn wait_for_execution(&self, execution_id: i64) -> Result<WorkflowExecution> {
        self.runtime
            .block_on(self.inner.wait_for_execution(execution_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn client_with_base(base_url: &str) -> AsyncDatalabClient {
        let settings = Settings {
            api_key: Some("dl-test".to_string()),
            base_url: base_url.to_string(),
            timeout: Duration::from_secs(5),
            ..Settings::default()
        };
        AsyncDatalabClient::from_settings(&settings).unwrap()
    }

    #[test]
    fn test_from_settings_requires_api_key() {
        let err = AsyncDatalabClient::from_settings(&Settings::default()).unwrap_err();
        assert!(matches!(err, DatalabError::Config(_)));
    }

    #[test]
    fn test_resolve_paths_and_absolute_urls() {
        let client = client_with_base("https://api.example.com/");
        assert_eq!(
            client.resolve("/api/v1/marker"),
            "https://api.example.com/api/v1/marker"
        );
        // Check URLs come back absolute and must not be re-prefixed.
        assert_eq!(
            client.resolve("https://other.example.com/api/v1/marker/abc123"),
            "https://other.example.com/api/v1/marker/abc123"
        );
    }

    #[tokio::test]
    async fn test_ocr_rejects_url_sources() {
        let client = client_with_base("https://api.example.com");
        let err = client
            .ocr(
                &SourceKind::parse("https://example.com/doc.pdf"),
                &OcrOptions::default(),
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DatalabError::Validation(_)));
    }

    #[tokio::test]
    async fn test_submit_missing_local_file() {
        let client = client_with_base("https://api.example.com");
        let err = client
            .convert(
                &SourceKind::parse("/no/such/file.pdf"),
                &ConvertOptions::default(),
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DatalabError::File { .. }));
    }

    #[test]
    fn test_with_poll_config_overrides_budget() {
        let client = client_with_base("https://api.example.com");
        let fast = client.with_poll_config(PollConfig {
            max_polls: 3,
            poll_interval: Duration::from_millis(10),
        });
        assert_eq!(fast.poll.max_polls, 3);
        assert_eq!(client.poll.max_polls, crate::settings::DEFAULT_MAX_POLLS);
    }
}
