//! Batch result types.

use serde::{Deserialize, Serialize};

/// Outcome of processing one source in a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemResult {
    /// The source string as given (path or URL).
    pub source: String,
    /// Base path outputs were written under, when an output directory was set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_count: Option<u32>,
    pub status: String,
}

impl ItemResult {
    /// A failed item. Any per-item error becomes one of these; it never
    /// aborts the batch.
    pub fn failed(source: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            output_path: None,
            success: false,
            error: Some(error.into()),
            page_count: None,
            status: "failed".to_string(),
        }
    }
}

/// One entry in the error summary of a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemError {
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Aggregated outcome of a batch run.
///
/// `total_files == successful + failed` always holds; every source yields
/// exactly one entry in `results`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionResult {
    pub collection_name: String,
    pub total_files: usize,
    pub successful: usize,
    pub failed: usize,
    pub results: Vec<ItemResult>,
    pub errors: Vec<ItemError>,
}

impl CollectionResult {
    /// Aggregate per-item results into a batch summary.
    pub fn from_results(collection_name: impl Into<String>, results: Vec<ItemResult>) -> Self {
        let successful = results.iter().filter(|r| r.success).count();
        let errors = results
            .iter()
            .filter(|r| !r.success)
            .map(|r| ItemError {
                source: r.source.clone(),
                error: r.error.clone(),
            })
            .collect::<Vec<_>>();

        Self {
            collection_name: collection_name.into(),
            total_files: results.len(),
            successful,
            failed: results.len() - successful,
            results,
            errors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregation_counts() {
        let results = vec![
            ItemResult {
                source: "a.pdf".into(),
                output_path: None,
                success: true,
                error: None,
                page_count: Some(3),
                status: "complete".into(),
            },
            ItemResult::failed("b.pdf", "boom"),
        ];

        let summary = CollectionResult::from_results("batch", results);
        assert_eq!(summary.total_files, 2);
        assert_eq!(summary.successful + summary.failed, summary.total_files);
        assert_eq!(summary.errors.len(), 1);
        assert_eq!(summary.errors[0].source, "b.pdf");
        assert_eq!(summary.errors[0].error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_empty_batch() {
        let summary = CollectionResult::from_results("empty", Vec::new());
        assert_eq!(summary.total_files, 0);
        assert_eq!(summary.successful, 0);
        assert_eq!(summary.failed, 0);
        assert!(summary.results.is_empty());
        assert!(summary.errors.is_empty());
    }
}
