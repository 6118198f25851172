//! File I/O primitives with consistent error handling.

use crate::error::{Error, Result};
use std::fs;
use std::path::Path;

/// Read file contents, mapping failures to `Error::internal_io`.
pub fn read_file(path: &Path, operation: &str) -> Result<String> {
    fs::read_to_string(path)
        .map_err(|e| Error::internal_io(e.to_string(), Some(operation.to_string())))
}

/// Write content to file atomically (write to .tmp, then rename).
///
/// Readers see either the previous file or the complete new one.
pub fn write_file_atomic(path: &Path, content: &str, operation: &str) -> Result<()> {
    let filename = path.file_name().ok_or_else(|| {
        Error::internal_io(
            format!("Invalid path: {}", path.display()),
            Some(operation.to_string()),
        )
    })?;

    let tmp_path = path.with_file_name(format!("{}.tmp", filename.to_string_lossy()));

    fs::write(&tmp_path, content).map_err(|e| {
        Error::internal_io(e.to_string(), Some(format!("{} (write temp)", operation)))
    })?;

    fs::rename(&tmp_path, path)
        .map_err(|e| Error::internal_io(e.to_string(), Some(format!("{} (rename)", operation))))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn read_file_reports_missing_path_as_io_error() {
        let err = read_file(Path::new("/nonexistent/launchpad.json"), "read config").unwrap_err();
        assert_eq!(err.code.as_str(), "internal.io_error");
        assert_eq!(err.details["context"], "read config");
    }

    #[test]
    fn atomic_write_replaces_content_and_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("report.json");
        fs::write(&path, "old").unwrap();

        write_file_atomic(&path, "new", "write report").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
        assert!(!dir.path().join("report.json.tmp").exists());
    }

    #[test]
    fn atomic_write_fails_when_parent_is_missing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("report.json");

        let err = write_file_atomic(&path, "{}", "write report").unwrap_err();
        assert_eq!(err.details["context"], "write report (write temp)");
    }
}
