//! JSON run reports.

use std::path::Path;

use crate::error::{Error, Result};
use crate::pipeline::PipelineRunResult;
use crate::utils::io;

/// Write a run result as pretty JSON, replacing any previous report atomically.
pub fn write(result: &PipelineRunResult, path: &Path) -> Result<()> {
    let payload = serde_json::to_string_pretty(result).map_err(|e| {
        Error::internal_json(e.to_string(), Some("serialize run report".to_string()))
    })?;
    io::write_file_atomic(path, &payload, "write run report")
}
