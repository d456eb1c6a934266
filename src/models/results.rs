//! Result payloads returned by processing endpoints.

use std::collections::HashMap;
use std::path::Path;

use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{DatalabError, Result};

/// Result from document conversion (marker endpoint).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversionResult {
    pub success: bool,
    #[serde(default)]
    pub output_format: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markdown: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunks: Option<Value>,
    /// Extracted images keyed by filename, base64-encoded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<HashMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_count: Option<u32>,
    #[serde(default = "default_status")]
    pub status: String,
}

fn default_status() -> String {
    "complete".to_string()
}

impl ConversionResult {
    /// Build from a completed poll payload, defaulting the output format when
    /// the server omits it.
    pub fn from_response(mut data: Value, fallback_format: &str) -> Result<Self> {
        if data.get("output_format").map_or(true, Value::is_null) {
            data["output_format"] = Value::String(fallback_format.to_string());
        }
        serde_json::from_value(data)
            .map_err(|e| DatalabError::api(format!("Malformed conversion response: {}", e)))
    }

    /// Save conversion output next to `output_path`, one file per present
    /// payload field. The path's extension is replaced per format.
    pub fn save_output(&self, output_path: &Path) -> std::io::Result<()> {
        if let Some(parent) = output_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        if let Some(ref markdown) = self.markdown {
            std::fs::write(output_path.with_extension("md"), markdown)?;
        }
        if let Some(ref html) = self.html {
            std::fs::write(output_path.with_extension("html"), html)?;
        }
        if let Some(ref json) = self.json {
            std::fs::write(
                output_path.with_extension("json"),
                serde_json::to_string_pretty(json)?,
            )?;
        }
        if let Some(ref chunks) = self.chunks {
            std::fs::write(
                output_path.with_extension("chunks.json"),
                serde_json::to_string_pretty(chunks)?,
            )?;
        }

        if let Some(ref images) = self.images {
            let images_dir = output_path.parent().unwrap_or(Path::new("."));
            for (filename, data) in images {
                let decoded = base64::engine::general_purpose::STANDARD
                    .decode(data)
                    .map_err(|e| {
                        std::io::Error::new(
                            std::io::ErrorKind::InvalidData,
                            format!("Invalid base64 image data for {}: {}", filename, e),
                        )
                    })?;
                std::fs::write(images_dir.join(filename), decoded)?;
            }
        }

        if let Some(ref metadata) = self.metadata {
            std::fs::write(
                output_path.with_extension("metadata.json"),
                serde_json::to_string_pretty(metadata)?,
            )?;
        }

        Ok(())
    }
}

/// A single recognized text line.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TextLine {
    pub text: String,
    /// Bounding box `[x0, y0, x1, y1]` when provided.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

/// One page of OCR output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OcrPage {
    pub page: u32,
    #[serde(default)]
    pub text_lines: Vec<TextLine>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_bbox: Option<Vec<f64>>,
}

/// Result from OCR processing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OcrResult {
    pub success: bool,
    #[serde(default)]
    pub pages: Vec<OcrPage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_count: Option<u32>,
    #[serde(default = "default_status")]
    pub status: String,
}

impl OcrResult {
    /// Build from a completed poll payload.
    pub fn from_response(data: Value) -> Result<Self> {
        serde_json::from_value(data)
            .map_err(|e| DatalabError::api(format!("Malformed OCR response: {}", e)))
    }

    /// Extract text, for one page or for the whole document.
    pub fn get_text(&self, page_num: Option<u32>) -> String {
        match page_num {
            Some(n) => self
                .pages
                .iter()
                .find(|p| p.page == n)
                .map(|p| page_text(p))
                .unwrap_or_default(),
            None => self
                .pages
                .iter()
                .map(page_text)
                .collect::<Vec<_>>()
                .join("\n\n"),
        }
    }

    /// Save extracted text (`.txt`) and the full payload (`.ocr.json`).
    pub fn save_output(&self, output_path: &Path) -> std::io::Result<()> {
        if let Some(parent) = output_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(output_path.with_extension("txt"), self.get_text(None))?;
        std::fs::write(
            output_path.with_extension("ocr.json"),
            serde_json::to_string_pretty(self)?,
        )?;
        Ok(())
    }
}

fn page_text(page: &OcrPage) -> String {
    page.text_lines
        .iter()
        .map(|line| line.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_ocr() -> OcrResult {
        OcrResult::from_response(json!({
            "success": true,
            "status": "complete",
            "page_count": 2,
            "pages": [
                {"page": 1, "text_lines": [{"text": "Invoice"}, {"text": "Total: $5"}]},
                {"page": 2, "text_lines": [{"text": "Terms"}]},
            ],
        }))
        .unwrap()
    }

    #[test]
    fn test_get_text_all_pages() {
        let result = sample_ocr();
        assert_eq!(result.get_text(None), "Invoice\nTotal: $5\n\nTerms");
    }

    #[test]
    fn test_get_text_single_page() {
        let result = sample_ocr();
        assert_eq!(result.get_text(Some(2)), "Terms");
        assert_eq!(result.get_text(Some(9)), "");
    }

    #[test]
    fn test_conversion_from_response_defaults_format() {
        let result = ConversionResult::from_response(
            json!({"success": true, "markdown": "# Hi", "status": "complete"}),
            "markdown",
        )
        .unwrap();
        assert_eq!(result.output_format, "markdown");
        assert_eq!(result.markdown.as_deref(), Some("# Hi"));
    }

    #[test]
    fn test_save_output_writes_files() {
        let dir = tempfile::tempdir().unwrap();
        let result = ConversionResult {
            success: true,
            output_format: "markdown".into(),
            markdown: Some("# Doc".into()),
            metadata: Some(json!({"pages": 1})),
            images: Some(HashMap::from([(
                "page0_img0.png".to_string(),
                base64::engine::general_purpose::STANDARD.encode(b"fakepng"),
            )])),
            ..Default::default()
        };

        let base = dir.path().join("doc").join("doc");
        result.save_output(&base).unwrap();

        assert_eq!(
            std::fs::read_to_string(base.with_extension("md")).unwrap(),
            "# Doc"
        );
        assert!(base.with_extension("metadata.json").exists());
        assert_eq!(
            std::fs::read(dir.path().join("doc").join("page0_img0.png")).unwrap(),
            b"fakepng"
        );
    }

    #[test]
    fn test_ocr_save_output() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("scan");
        sample_ocr().save_output(&base).unwrap();

        let text = std::fs::read_to_string(base.with_extension("txt")).unwrap();
        assert!(text.contains("Invoice"));
        let payload: OcrResult = serde_json::from_str(
            &std::fs::read_to_string(base.with_extension("ocr.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(payload.pages.len(), 2);
    }
}
