//! Document source classification and expansion.
//!
//! A source string is either a remote URL (`http://`, `https://`, `s3://`)
//! submitted to the service by reference, or a local filesystem path uploaded
//! as multipart data.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::{DatalabError, Result};
use crate::mime;

/// A classified document source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceKind {
    Local(PathBuf),
    Url(String),
}

impl SourceKind {
    /// Classify a raw source string by scheme prefix.
    pub fn parse(source: &str) -> Self {
        if source.starts_with("http://")
            || source.starts_with("https://")
            || source.starts_with("s3://")
        {
            Self::Url(source.to_string())
        } else {
            Self::Local(PathBuf::from(source))
        }
    }

    pub fn is_url(&self) -> bool {
        matches!(self, Self::Url(_))
    }

    /// Stem used to name per-item output. URLs use the final path segment of
    /// the parsed URL, falling back to `"output"` for bare hosts.
    pub fn output_stem(&self) -> String {
        match self {
            Self::Local(path) => path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "output".to_string()),
            Self::Url(raw) => url::Url::parse(raw)
                .ok()
                .and_then(|parsed| {
                    Path::new(parsed.path())
                        .file_stem()
                        .map(|s| s.to_string_lossy().into_owned())
                })
                .filter(|stem| !stem.is_empty())
                .unwrap_or_else(|| "output".to_string()),
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local(path) => write!(f, "{}", path.display()),
            Self::Url(url) => f.write_str(url),
        }
    }
}

/// Normalize an extension filter: lowercase, leading dot optional on input.
/// `None` means the set of supported document extensions.
fn normalize_extensions(extensions: Option<&[String]>) -> Vec<String> {
    match extensions {
        Some(list) => list
            .iter()
            .map(|ext| {
                let trimmed = ext.trim_start_matches('.');
                format!(".{}", trimmed.to_lowercase())
            })
            .collect(),
        None => mime::SUPPORTED_EXTENSIONS
            .iter()
            .map(|ext| ext.to_string())
            .collect(),
    }
}

fn extension_matches(path: &Path, extensions: &[String]) -> bool {
    let suffix = match path.extension() {
        Some(ext) => format!(".{}", ext.to_string_lossy().to_lowercase()),
        None => return false,
    };
    extensions.iter().any(|ext| *ext == suffix)
}

/// Recursively enumerate matching files under a directory.
///
/// Returns them in sorted order so batch runs are reproducible. A directory
/// with no matching files yields an empty list, not an error.
pub fn expand_local_directory(
    directory: &Path,
    extensions: Option<&[String]>,
) -> Result<Vec<PathBuf>> {
    if !directory.is_dir() {
        return Err(DatalabError::Validation(format!(
            "Directory not found: {}",
            directory.display()
        )));
    }

    let wanted = normalize_extensions(extensions);
    let mut files = Vec::new();
    let mut stack = vec![directory.to_path_buf()];

    while let Some(dir) = stack.pop() {
        let entries = std::fs::read_dir(&dir)
            .map_err(|e| DatalabError::file(dir.display().to_string(), e.to_string()))?;
        for entry in entries {
            let entry =
                entry.map_err(|e| DatalabError::file(dir.display().to_string(), e.to_string()))?;
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else if extension_matches(&path, &wanted) {
                files.push(path);
            }
        }
    }

    files.sort();
    Ok(files)
}

/// Enumeration of keys under a storage prefix. Implemented by whatever object
/// store integration the caller has available.
#[async_trait]
pub trait ObjectLister {
    /// List object keys under `prefix` in `bucket`.
    async fn list_objects(&self, bucket: &str, prefix: &str) -> Result<Vec<String>>;
}

/// Expand an `s3://bucket/prefix` URI into per-object source URLs via the
/// given lister, filtered by extension.
pub async fn expand_bucket_prefix<L>(
    lister: &L,
    uri: &str,
    extensions: Option<&[String]>,
) -> Result<Vec<String>>
where
    L: ObjectLister + ?Sized + Sync,
{
    let rest = uri.strip_prefix("s3://").ok_or_else(|| {
        DatalabError::Validation(format!("Invalid S3 URI: {}. Must start with 's3://'", uri))
    })?;

    let (bucket, prefix) = match rest.split_once('/') {
        Some((bucket, prefix)) => (bucket, prefix),
        None => (rest, ""),
    };
    if bucket.is_empty() {
        return Err(DatalabError::Validation(format!(
            "Invalid S3 URI: {}. Missing bucket name",
            uri
        )));
    }

    let wanted = extensions.map(|list| normalize_extensions(Some(list)));
    let keys = lister.list_objects(bucket, prefix).await?;

    Ok(keys
        .into_iter()
        .filter(|key| match &wanted {
            Some(wanted) => extension_matches(Path::new(key), wanted),
            None => true,
        })
        .map(|key| format!("s3://{}/{}", bucket, key))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_classifies_schemes() {
        assert!(SourceKind::parse("https://example.com/a.pdf").is_url());
        assert!(SourceKind::parse("s3://bucket/key.pdf").is_url());
        assert_eq!(
            SourceKind::parse("docs/report.pdf"),
            SourceKind::Local(PathBuf::from("docs/report.pdf"))
        );
        // No scheme sniffing beyond the known prefixes.
        assert!(!SourceKind::parse("ftp-export/report.pdf").is_url());
    }

    #[test]
    fn test_output_stem() {
        assert_eq!(
            SourceKind::parse("https://example.com/docs/report.pdf?v=2").output_stem(),
            "report"
        );
        assert_eq!(SourceKind::parse("https://example.com").output_stem(), "output");
        assert_eq!(SourceKind::parse("a/b/scan.tiff").output_stem(), "scan");
    }

    #[test]
    fn test_expand_local_directory_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("sub");
        std::fs::create_dir(&nested).unwrap();
        std::fs::write(dir.path().join("b.pdf"), b"x").unwrap();
        std::fs::write(dir.path().join("a.PDF"), b"x").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        std::fs::write(nested.join("c.docx"), b"x").unwrap();

        let files = expand_local_directory(dir.path(), None).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.PDF", "b.pdf", "sub/c.docx"]);
    }

    #[test]
    fn test_expand_local_directory_custom_extensions() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("scan.png"), b"x").unwrap();
        std::fs::write(dir.path().join("doc.pdf"), b"x").unwrap();

        // Leading dot and case are both optional.
        let exts = vec!["PNG".to_string()];
        let files = expand_local_directory(dir.path(), Some(&exts)).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("scan.png"));
    }

    #[test]
    fn test_expand_local_directory_empty_match() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        let files = expand_local_directory(dir.path(), None).unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn test_expand_local_directory_missing() {
        let err = expand_local_directory(Path::new("/no/such/dir"), None).unwrap_err();
        assert!(matches!(err, DatalabError::Validation(_)));
    }

    struct FixedLister(Vec<String>);

    #[async_trait]
    impl ObjectLister for FixedLister {
        async fn list_objects(&self, _bucket: &str, _prefix: &str) -> Result<Vec<String>> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn test_expand_bucket_prefix() {
        let lister = FixedLister(vec![
            "invoices/2024/jan.pdf".to_string(),
            "invoices/readme.txt".to_string(),
        ]);

        let urls = expand_bucket_prefix(&lister, "s3://archive/invoices/", Some(&["pdf".into()]))
            .await
            .unwrap();
        assert_eq!(urls, vec!["s3://archive/invoices/2024/jan.pdf"]);
    }

    #[tokio::test]
    async fn test_expand_bucket_prefix_rejects_non_s3() {
        let lister = FixedLister(vec![]);
        let err = expand_bucket_prefix(&lister, "gs://bucket/x", None)
            .await
            .unwrap_err();
        assert!(matches!(err, DatalabError::Validation(_)));
    }
}
