//! Processing options sent with job submissions.
//!
//! Options are encoded as flat form fields: booleans as `"true"`/`"false"`,
//! structured values as JSON strings. Field order is fixed and the extras map
//! is a `BTreeMap`, so encoding is deterministic.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Output format for document conversion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Markdown,
    Html,
    Json,
    Chunks,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Markdown => "markdown",
            Self::Html => "html",
            Self::Json => "json",
            Self::Chunks => "chunks",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Processing mode trading speed against accuracy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingMode {
    #[default]
    Fast,
    Balanced,
    Accurate,
}

impl ProcessingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Balanced => "balanced",
            Self::Accurate => "accurate",
        }
    }
}

impl std::fmt::Display for ProcessingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Encoding of options into transport form fields.
pub trait FormOptions {
    /// Flatten into `(field, value)` pairs in a stable order.
    fn form_fields(&self) -> Vec<(String, String)>;
}

/// Options common to every processing endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessingOptions {
    /// Maximum number of pages to process.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_pages: Option<u32>,
    /// Page range like `"0-2"` or `"0,1,2"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_range: Option<String>,
    /// Skip the server-side cache when running inference.
    #[serde(default)]
    pub skip_cache: bool,
    /// Provider-specific settings passed through verbatim.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extras: BTreeMap<String, Value>,
}

impl ProcessingOptions {
    fn append_fields(&self, fields: &mut Vec<(String, String)>) {
        if let Some(max_pages) = self.max_pages {
            fields.push(("max_pages".into(), max_pages.to_string()));
        }
        if let Some(ref range) = self.page_range {
            fields.push(("page_range".into(), range.clone()));
        }
        fields.push(("skip_cache".into(), self.skip_cache.to_string()));
        for (key, value) in &self.extras {
            fields.push((key.clone(), json_field(value)));
        }
    }
}

impl FormOptions for ProcessingOptions {
    fn form_fields(&self) -> Vec<(String, String)> {
        let mut fields = Vec::new();
        self.append_fields(&mut fields);
        fields
    }
}

/// Options for the marker conversion endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConvertOptions {
    #[serde(flatten)]
    pub common: ProcessingOptions,
    /// Output format for the converted document.
    #[serde(default)]
    pub output_format: OutputFormat,
    /// Speed/accuracy mode.
    #[serde(default)]
    pub mode: ProcessingMode,
    /// Force OCR on every page.
    #[serde(default)]
    pub force_ocr: bool,
    /// Partially OCR lines for better formatting.
    #[serde(default)]
    pub format_lines: bool,
    /// Add page delimiters to the output.
    #[serde(default)]
    pub paginate: bool,
    /// Use an LLM to enhance accuracy.
    #[serde(default)]
    pub use_llm: bool,
    /// Remove existing OCR text and redo OCR.
    #[serde(default)]
    pub strip_existing_ocr: bool,
    /// Disable extraction of images.
    #[serde(default)]
    pub disable_image_extraction: bool,
    /// Custom prompt for block correction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_correction_prompt: Option<String>,
    /// Schema for structured extraction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_schema: Option<Value>,
    /// Additional marker configuration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_config: Option<Value>,
}

impl FormOptions for ConvertOptions {
    fn form_fields(&self) -> Vec<(String, String)> {
        let mut fields = vec![
            ("output_format".into(), self.output_format.as_str().into()),
            ("mode".into(), self.mode.as_str().into()),
            ("force_ocr".into(), self.force_ocr.to_string()),
            ("format_lines".into(), self.format_lines.to_string()),
            ("paginate".into(), self.paginate.to_string()),
            ("use_llm".into(), self.use_llm.to_string()),
            (
                "strip_existing_ocr".into(),
                self.strip_existing_ocr.to_string(),
            ),
            (
                "disable_image_extraction".into(),
                self.disable_image_extraction.to_string(),
            ),
        ];
        if let Some(ref prompt) = self.block_correction_prompt {
            fields.push(("block_correction_prompt".into(), prompt.clone()));
        }
        if let Some(ref schema) = self.page_schema {
            fields.push(("page_schema".into(), json_field(schema)));
        }
        if let Some(ref config) = self.additional_config {
            fields.push(("additional_config".into(), json_field(config)));
        }
        self.common.append_fields(&mut fields);
        fields
    }
}

/// Options for the OCR endpoint. Only the common options apply.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OcrOptions {
    #[serde(flatten)]
    pub common: ProcessingOptions,
}

impl FormOptions for OcrOptions {
    fn form_fields(&self) -> Vec<(String, String)> {
        self.common.form_fields()
    }
}

/// Serialize a JSON value to its form representation. Strings pass through
/// unquoted; everything else becomes compact JSON.
fn json_field(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}
