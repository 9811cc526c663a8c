//! Atomic YAML output.

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use super::document::ApiDocument;
use crate::error::ApiDocsError;

/// Writes `document` as YAML to `path`.
///
/// The YAML is rendered before the filesystem is touched, then written to a
/// temporary file next to `path` and renamed over it. A failure at any step
/// leaves the previous file (or no file) in place.
pub fn save(document: &ApiDocument, path: impl AsRef<Path>) -> Result<(), ApiDocsError> {
    let path = path.as_ref();
    let yaml = document.to_yaml()?;

    let write_err = |source: std::io::Error| ApiDocsError::Write {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(yaml.as_bytes()).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;

    tracing::info!(
        path = %path.display(),
        paths = document.path_count(),
        "Saved OpenAPI YAML"
    );

    Ok(())
}
