//! Workflow data model: multi-step server-side processing pipelines.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Configuration for a single workflow step.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowStep {
    /// Step type identifier, e.g. `"marker_parse"`.
    #[serde(default)]
    pub step_key: String,
    /// Name unique within the workflow; referenced by `depends_on`.
    pub unique_name: String,
    /// Step-specific settings passed through to the server.
    #[serde(default)]
    pub settings: Value,
    /// Unique names of steps this step depends on.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
    /// Server-assigned fields, present on fetched workflows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// A workflow configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Workflow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub team_id: i64,
    #[serde(default)]
    pub steps: Vec<WorkflowStep>,
    #[serde(default, alias = "created_at", skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    #[serde(default, alias = "updated_at", skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,
}

/// Input configuration for a workflow execution.
///
/// Either direct file URLs or a bucket enumeration (bucket + optional prefix,
/// glob pattern, and storage type).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InputConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_urls: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// `"s3"` or `"r2"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_type: Option<String>,
}

impl InputConfig {
    /// Input config pointing at direct file URLs.
    pub fn from_urls(file_urls: Vec<String>) -> Self {
        Self {
            file_urls: Some(file_urls),
            ..Default::default()
        }
    }

    /// Input config enumerating a bucket prefix.
    pub fn from_bucket(bucket: impl Into<String>, prefix: Option<String>) -> Self {
        Self {
            bucket: Some(bucket.into()),
            prefix,
            ..Default::default()
        }
    }
}

/// State of a workflow execution.
///
/// Responses name the identifier `execution_id` and omit `workflow_id` on
/// the initial trigger response, so both are tolerated here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowExecution {
    #[serde(alias = "execution_id")]
    pub id: i64,
    #[serde(default)]
    pub workflow_id: i64,
    /// `"IN_PROGRESS"`, `"COMPLETED"`, or `"FAILED"`.
    pub status: String,
    #[serde(default = "default_true")]
    pub success: bool,
    #[serde(default)]
    pub input_config: Value,
    /// Per-step results, keyed by step name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, alias = "created_at", skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    #[serde(default, alias = "updated_at", skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,
}

fn default_true() -> bool {
    true
}

impl WorkflowExecution {
    /// Parse a status payload. A `FAILED` status overrides an absent
    /// `success` flag.
    pub fn from_response(data: Value) -> crate::error::Result<Self> {
        let mut execution: Self = serde_json::from_value(data).map_err(|e| {
            crate::error::DatalabError::api(format!("Malformed execution response: {}", e))
        })?;
        if execution.status == "FAILED" {
            execution.success = false;
        }
        Ok(execution)
    }

    /// Whether the execution has reached a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self.status.as_str(), "COMPLETED" | "FAILED")
    }

    /// Save the execution state as pretty JSON.
    pub fn save_output(&self, output_path: &std::path::Path) -> std::io::Result<()> {
        if let Some(parent) = output_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(
            output_path.with_extension("json"),
            serde_json::to_string_pretty(self)?,
        )
    }
}
