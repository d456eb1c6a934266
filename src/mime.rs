//! MIME type resolution for uploaded documents.

use std::path::Path;

/// File extensions the API accepts, with leading dots.
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    ".pdf", ".doc", ".docx", ".odt", ".ppt", ".pptx", ".odp", ".xls", ".xlsx", ".ods", ".epub",
    ".png", ".jpg", ".jpeg", ".webp", ".gif", ".tiff",
];

/// Fallback map for extensions `mime_guess` resolves poorly or not at all.
const MIMETYPE_MAP: &[(&str, &str)] = &[
    ("pdf", "application/pdf"),
    ("doc", "application/msword"),
    (
        "docx",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    ),
    ("odt", "application/vnd.oasis.opendocument.text"),
    ("ppt", "application/vnd.ms-powerpoint"),
    (
        "pptx",
        "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    ),
    ("odp", "application/vnd.oasis.opendocument.presentation"),
    ("xls", "application/vnd.ms-excel"),
    (
        "xlsx",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    ),
    ("ods", "application/vnd.oasis.opendocument.spreadsheet"),
    ("epub", "application/epub+zip"),
];

/// Resolve the MIME type for a file, falling back to the extension map and
/// finally to `application/octet-stream`.
pub fn mime_type_for(path: &Path) -> String {
    if let Some(mime) = mime_guess::from_path(path).first() {
        return mime.essence_str().to_string();
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    if let Some(ext) = ext {
        for (candidate, mime) in MIMETYPE_MAP {
            if *candidate == ext {
                return (*mime).to_string();
            }
        }
    }

    "application/octet-stream".to_string()
}

/// Check whether a file's extension is supported by the API.
pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let dotted = format!(".{}", e.to_ascii_lowercase());
            SUPPORTED_EXTENSIONS.contains(&dotted.as_str())
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_mime_type_for_pdf() {
        assert_eq!(
            mime_type_for(&PathBuf::from("report.pdf")),
            "application/pdf"
        );
    }

    #[test]
    fn test_mime_type_for_unknown() {
        assert_eq!(
            mime_type_for(&PathBuf::from("blob.xyz123")),
            "application/octet-stream"
        );
    }

    #[test]
    fn test_is_supported() {
        assert!(is_supported(&PathBuf::from("scan.PDF")));
        assert!(is_supported(&PathBuf::from("deck.pptx")));
        assert!(!is_supported(&PathBuf::from("archive.zip")));
        assert!(!is_supported(&PathBuf::from("README")));
    }
}
