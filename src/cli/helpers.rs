//! Shared helper functions for CLI commands.

use std::path::{Path, PathBuf};
use std::time::Duration;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::collections::{Collection, CollectionResult};
use crate::error::{DatalabError, Result};
use crate::sources::SourceKind;

/// Resolve and create the output directory. Defaults to the current
/// working directory.
pub fn setup_output_directory(output_dir: Option<&Path>) -> Result<PathBuf> {
    let dir = match output_dir {
        Some(dir) => dir.to_path_buf(),
        None => std::env::current_dir()
            .map_err(|e| DatalabError::Config(format!("Cannot resolve working directory: {}", e)))?,
    };
    std::fs::create_dir_all(&dir)
        .map_err(|e| DatalabError::file(dir.display().to_string(), e.to_string()))?;
    Ok(dir)
}

/// Parse a comma-separated extension filter. Empty input means no filter.
pub fn parse_extensions(extensions: Option<&str>) -> Option<Vec<String>> {
    let raw = extensions?.trim();
    if raw.is_empty() {
        return None;
    }
    Some(
        raw.split(',')
            .map(|ext| ext.trim().trim_start_matches('.').to_string())
            .filter(|ext| !ext.is_empty())
            .collect(),
    )
}

/// Build the work set for a path argument: a single file or URL becomes a
/// one-item collection, a directory is expanded recursively.
pub fn collection_for_path(
    name: &str,
    path: &str,
    extensions: Option<&[String]>,
) -> Result<Collection> {
    match SourceKind::parse(path) {
        SourceKind::Url(url) => Ok(Collection::from_urls(name, vec![url])),
        SourceKind::Local(local) => {
            if local.is_dir() {
                Collection::from_local_directory(name, &local, extensions)
            } else if local.is_file() {
                Ok(Collection {
                    name: name.to_string(),
                    sources: vec![SourceKind::Local(local)],
                })
            } else {
                Err(DatalabError::Validation(format!(
                    "Path not found: {}",
                    local.display()
                )))
            }
        }
    }
}

/// Spinner shown while a batch is in flight.
pub fn batch_spinner(operation: &str, total: usize) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap(),
    );
    bar.set_message(format!("{} {} file(s)...", operation, total));
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}

/// Print the batch summary and return the process exit code.
pub fn print_summary(summary: &CollectionResult, operation: &str, output_dir: &Path) -> i32 {
    println!("\n{} summary:", operation);
    println!(
        "  {} processed: {} file(s)",
        style("✓").green(),
        summary.successful
    );

    if summary.failed > 0 {
        println!("  {} failed: {} file(s)", style("✗").red(), summary.failed);
        for error in &summary.errors {
            println!(
                "    - {}: {}",
                error.source,
                error.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    println!("\n  Output saved to {}", style(output_dir.display()).cyan());

    if summary.failed > 0 {
        1
    } else {
        0
    }
}

/// Parse an argument that is either inline JSON or a path to a JSON file.
pub fn read_json_arg(raw: &str) -> Result<serde_json::Value> {
    let path = Path::new(raw);
    let contents = if path.exists() {
        std::fs::read_to_string(path)
            .map_err(|e| DatalabError::file(path.display().to_string(), e.to_string()))?
    } else {
        raw.to_string()
    };
    serde_json::from_str(&contents)
        .map_err(|e| DatalabError::Validation(format!("Invalid JSON argument: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_extensions() {
        assert_eq!(parse_extensions(None), None);
        assert_eq!(parse_extensions(Some("")), None);
        assert_eq!(
            parse_extensions(Some("pdf, .PNG,docx")),
            Some(vec!["pdf".to_string(), "PNG".to_string(), "docx".to_string()])
        );
    }

    #[test]
    fn test_collection_for_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("doc.pdf");
        std::fs::write(&file, b"x").unwrap();

        let collection =
            collection_for_path("cli", file.to_str().unwrap(), None).unwrap();
        assert_eq!(collection.len(), 1);
    }

    #[test]
    fn test_collection_for_url() {
        let collection =
            collection_for_path("cli", "https://example.com/doc.pdf", None).unwrap();
        assert_eq!(collection.len(), 1);
        assert!(collection.sources[0].is_url());
    }

    #[test]
    fn test_collection_for_missing_path() {
        let err = collection_for_path("cli", "/no/such/file.pdf", None).unwrap_err();
        assert!(matches!(err, DatalabError::Validation(_)));
    }

    #[test]
    fn test_read_json_arg_inline_and_file() {
        let value = read_json_arg(r#"{"a": 1}"#).unwrap();
        assert_eq!(value["a"], 1);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"b": 2}"#).unwrap();
        let value = read_json_arg(path.to_str().unwrap()).unwrap();
        assert_eq!(value["b"], 2);

        assert!(read_json_arg("not json").is_err());
    }
}
