//! Batch document processing.
//!
//! A [`Collection`] names a set of sources and fans them out across a bounded
//! number of concurrent jobs. Per-item failures are recorded, never
//! propagated; the batch always runs to completion and reports every source.

mod types;

pub use types::{CollectionResult, ItemError, ItemResult};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::client::AsyncDatalabClient;
use crate::error::{DatalabError, Result};
use crate::models::{ConvertOptions, OcrOptions};
use crate::sources::{self, ObjectLister, SourceKind};

/// Default number of jobs in flight at once.
pub const DEFAULT_MAX_CONCURRENT: usize = 5;

/// What one batch item produced, before aggregation.
#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    pub success: bool,
    pub error: Option<String>,
    pub page_count: Option<u32>,
    pub status: String,
}

/// Per-source processing seam. The convert and OCR runners implement this
/// over the API client; tests implement it directly.
#[async_trait]
pub trait ProcessSource: Send + Sync {
    async fn process(&self, source: &SourceKind, save_output: Option<&Path>)
        -> Result<ProcessOutcome>;
}

/// A named set of document sources for batch processing.
#[derive(Debug, Clone)]
pub struct Collection {
    pub name: String,
    pub sources: Vec<SourceKind>,
}

impl Collection {
    /// Collection of all matching files under a local directory.
    pub fn from_local_directory(
        name: impl Into<String>,
        directory: impl AsRef<Path>,
        extensions: Option<&[String]>,
    ) -> Result<Self> {
        let files = sources::expand_local_directory(directory.as_ref(), extensions)?;
        Ok(Self {
            name: name.into(),
            sources: files.into_iter().map(SourceKind::Local).collect(),
        })
    }

    /// Collection of remote file URLs.
    pub fn from_urls(name: impl Into<String>, file_urls: Vec<String>) -> Self {
        Self {
            name: name.into(),
            sources: file_urls.into_iter().map(SourceKind::Url).collect(),
        }
    }

    /// Collection from raw source strings, classifying each as a path or URL.
    pub fn from_mixed_sources(name: impl Into<String>, raw_sources: &[String]) -> Self {
        Self {
            name: name.into(),
            sources: raw_sources.iter().map(|s| SourceKind::parse(s)).collect(),
        }
    }

    /// Collection enumerated from an `s3://bucket/prefix` URI via the given
    /// object lister.
    pub async fn from_bucket_prefix<L>(
        name: impl Into<String>,
        lister: &L,
        uri: &str,
        extensions: Option<&[String]>,
    ) -> Result<Self>
    where
        L: ObjectLister + ?Sized + Sync,
    {
        let urls = sources::expand_bucket_prefix(lister, uri, extensions).await?;
        Ok(Self::from_urls(name, urls))
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Convert every source in the collection.
    pub async fn convert_all(
        &self,
        client: &AsyncDatalabClient,
        options: ConvertOptions,
        output_dir: Option<&Path>,
        max_concurrent: usize,
    ) -> Result<CollectionResult> {
        let processor = Arc::new(ConvertProcessor {
            client: client.clone(),
            options,
        });
        self.process_all(processor, output_dir, max_concurrent).await
    }

    /// OCR every source in the collection. URL sources fail per-item since
    /// OCR only accepts local files.
    pub async fn ocr_all(
        &self,
        client: &AsyncDatalabClient,
        options: OcrOptions,
        output_dir: Option<&Path>,
        max_concurrent: usize,
    ) -> Result<CollectionResult> {
        let processor = Arc::new(OcrProcessor {
            client: client.clone(),
            options,
        });
        self.process_all(processor, output_dir, max_concurrent).await
    }

    /// Fan sources out across at most `max_concurrent` in-flight jobs and
    /// aggregate one result per source, in completion order.
    pub async fn process_all<P>(
        &self,
        processor: Arc<P>,
        output_dir: Option<&Path>,
        max_concurrent: usize,
    ) -> Result<CollectionResult>
    where
        P: ProcessSource + ?Sized + 'static,
    {
        if let Some(dir) = output_dir {
            std::fs::create_dir_all(dir)
                .map_err(|e| DatalabError::file(dir.display().to_string(), e.to_string()))?;
        }

        info!(
            collection = %self.name,
            total = self.sources.len(),
            max_concurrent,
            "starting batch"
        );

        let semaphore = Arc::new(Semaphore::new(max_concurrent.max(1)));
        let mut tasks = FuturesUnordered::new();

        for source in self.sources.iter().cloned() {
            let semaphore = Arc::clone(&semaphore);
            let processor = Arc::clone(&processor);
            let save_output = output_dir.map(|dir| item_output_base(dir, &self.name, &source));
            let label = source.to_string();

            let handle = tokio::spawn(async move {
                // Permit held for the item's full submit-and-poll lifetime.
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return ItemResult::failed(source.to_string(), "batch cancelled"),
                };
                run_one(processor.as_ref(), &source, save_output.as_deref()).await
            });

            tasks.push(async move {
                match handle.await {
                    Ok(result) => result,
                    Err(e) => ItemResult::failed(label, format!("task panicked: {}", e)),
                }
            });
        }

        let mut results = Vec::with_capacity(self.sources.len());
        while let Some(result) = tasks.next().await {
            if !result.success {
                warn!(source = %result.source, error = ?result.error, "batch item failed");
            }
            results.push(result);
        }

        let summary = CollectionResult::from_results(self.name.clone(), results);
        info!(
            collection = %summary.collection_name,
            successful = summary.successful,
            failed = summary.failed,
            "batch finished"
        );
        Ok(summary)
    }
}

/// Base output path for one item: `<output_dir>/<collection>/<stem>/<stem>`,
/// so each item's files and images land in their own directory. An unnamed
/// collection writes directly under the output directory.
fn item_output_base(output_dir: &Path, collection_name: &str, source: &SourceKind) -> PathBuf {
    let stem = source.output_stem();
    let base = if collection_name.is_empty() {
        output_dir.to_path_buf()
    } else {
        output_dir.join(collection_name)
    };
    base.join(&stem).join(&stem)
}

async fn run_one<P>(processor: &P, source: &SourceKind, save_output: Option<&Path>) -> ItemResult
where
    P: ProcessSource + ?Sized,
{
    match processor.process(source, save_output).await {
        Ok(outcome) => ItemResult {
            source: source.to_string(),
            output_path: save_output.map(|p| p.display().to_string()),
            success: outcome.success,
            error: outcome.error,
            page_count: outcome.page_count,
            status: outcome.status,
        },
        Err(e) => ItemResult::failed(source.to_string(), e.to_string()),
    }
}

struct ConvertProcessor {
    client: AsyncDatalabClient,
    options: ConvertOptions,
}

#[async_trait]
impl ProcessSource for ConvertProcessor {
    async fn process(
        &self,
        source: &SourceKind,
        save_output: Option<&Path>,
    ) -> Result<ProcessOutcome> {
        let result = self.client.convert(source, &self.options, save_output).await?;
        Ok(ProcessOutcome {
            success: result.success,
            error: result.error,
            page_count: result.page_count,
            status: result.status,
        })
    }
}

struct OcrProcessor {
    client: AsyncDatalabClient,
    options: OcrOptions,
}

#[async_trait]
impl ProcessSource for OcrProcessor {
    async fn process(
        &self,
        source: &SourceKind,
        save_output: Option<&Path>,
    ) -> Result<ProcessOutcome> {
        let result = self.client.ocr(source, &self.options, save_output).await?;
        Ok(ProcessOutcome {
            success: result.success,
            error: result.error,
            page_count: result.page_count,
            status: result.status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Tracks how many items run at once and fails sources on request.
    struct Instrumented {
        current: AtomicUsize,
        peak: AtomicUsize,
        fail_containing: Option<String>,
    }

    impl Instrumented {
        fn new(fail_containing: Option<&str>) -> Self {
            Self {
                current: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
                fail_containing: fail_containing.map(str::to_string),
            }
        }
    }

    #[async_trait]
    impl ProcessSource for Instrumented {
        async fn process(
            &self,
            source: &SourceKind,
            _save_output: Option<&Path>,
        ) -> Result<ProcessOutcome> {
            let running = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(running, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.current.fetch_sub(1, Ordering::SeqCst);

            if let Some(ref needle) = self.fail_containing {
                if source.to_string().contains(needle.as_str()) {
                    return Err(DatalabError::api("simulated failure"));
                }
            }
            Ok(ProcessOutcome {
                success: true,
                error: None,
                page_count: Some(1),
                status: "complete".to_string(),
            })
        }
    }

    fn url_collection(count: usize) -> Collection {
        Collection::from_urls(
            "test-batch",
            (0..count)
                .map(|i| format!("https://example.com/doc{}.pdf", i))
                .collect(),
        )
    }

    #[tokio::test]
    async fn test_concurrency_stays_bounded() {
        let collection = url_collection(12);
        let processor = Arc::new(Instrumented::new(None));

        let summary = collection
            .process_all(Arc::clone(&processor), None, 3)
            .await
            .unwrap();

        assert_eq!(summary.total_files, 12);
        assert_eq!(summary.successful, 12);
        assert!(processor.peak.load(Ordering::SeqCst) <= 3);
        // With 12 items and a 20ms hold, the bound should actually be hit.
        assert!(processor.peak.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn test_item_failures_are_isolated() {
        let collection = url_collection(5);
        let processor = Arc::new(Instrumented::new(Some("doc2")));

        let summary = collection.process_all(processor, None, 2).await.unwrap();

        assert_eq!(summary.total_files, 5);
        assert_eq!(summary.successful, 4);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.successful + summary.failed, summary.total_files);
        assert_eq!(summary.errors.len(), 1);
        assert!(summary.errors[0].source.contains("doc2"));

        let failed = summary.results.iter().find(|r| !r.success).unwrap();
        assert_eq!(failed.status, "failed");
        assert!(failed.error.as_deref().unwrap().contains("simulated failure"));
    }

    #[tokio::test]
    async fn test_empty_collection_completes() {
        let collection = Collection::from_urls("empty", Vec::new());
        let processor = Arc::new(Instrumented::new(None));

        let summary = collection.process_all(processor, None, 4).await.unwrap();
        assert_eq!(summary.total_files, 0);
        assert_eq!(summary.successful, 0);
        assert_eq!(summary.failed, 0);
    }

    #[tokio::test]
    async fn test_output_paths_follow_collection_layout() {
        let dir = tempfile::tempdir().unwrap();
        let collection = Collection::from_urls(
            "invoices",
            vec!["https://example.com/docs/january.pdf".to_string()],
        );
        let processor = Arc::new(Instrumented::new(None));

        let summary = collection
            .process_all(processor, Some(dir.path()), 1)
            .await
            .unwrap();

        let expected = dir
            .path()
            .join("invoices")
            .join("january")
            .join("january");
        assert_eq!(
            summary.results[0].output_path.as_deref(),
            Some(expected.to_str().unwrap())
        );
    }

    #[test]
    fn test_from_mixed_sources_classifies() {
        let collection = Collection::from_mixed_sources(
            "mixed",
            &[
                "local/report.pdf".to_string(),
                "https://example.com/a.pdf".to_string(),
                "s3://bucket/b.pdf".to_string(),
            ],
        );
        assert_eq!(collection.len(), 3);
        assert!(!collection.sources[0].is_url());
        assert!(collection.sources[1].is_url());
        assert!(collection.sources[2].is_url());
    }

    #[test]
    fn test_from_local_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.pdf"), b"x").unwrap();
        std::fs::write(dir.path().join("skip.bin"), b"x").unwrap();

        let collection = Collection::from_local_directory("docs", dir.path(), None).unwrap();
        assert_eq!(collection.len(), 1);
    }
}
