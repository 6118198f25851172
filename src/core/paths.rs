use crate::config::{CONFIG_ENV, CONFIG_FILE};
use crate::error::{Error, Result};
use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Resolve the configuration file for this process.
///
/// `LAUNCHPAD_CONFIG` wins when set; otherwise `./launchpad.json` if present.
pub fn config_file() -> Result<Option<PathBuf>> {
    let cwd = env::current_dir()
        .map_err(|e| Error::internal_io(e.to_string(), Some("read current dir".to_string())))?;
    resolve_config_file(env::var_os(CONFIG_ENV), &cwd)
}

pub(crate) fn resolve_config_file(
    explicit: Option<OsString>,
    cwd: &Path,
) -> Result<Option<PathBuf>> {
    if let Some(explicit) = explicit.filter(|v| !v.is_empty()) {
        let path = cwd.join(PathBuf::from(explicit));
        if !path.is_file() {
            return Err(Error::config_not_found(path.display().to_string()));
        }
        return Ok(Some(path));
    }

    let candidate = cwd.join(CONFIG_FILE);
    Ok(candidate.is_file().then_some(candidate))
}
