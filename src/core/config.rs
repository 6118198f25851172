//! Pipeline configuration (`launchpad.json`).
//!
//! Every field is optional. A missing file yields the built-in defaults, which
//! describe a conventional project: `python` on PATH, `manage.py` and
//! `requirements.txt` in the working directory.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::deploy::DeployStage;
use crate::error::{Error, Result};
use crate::paths;
use crate::utils::io;

pub const CONFIG_FILE: &str = "launchpad.json";
pub const CONFIG_ENV: &str = "LAUNCHPAD_CONFIG";

/// Accepted `--fail-level` values for the deployment audit, lowest first.
pub const FAIL_LEVELS: &[&str] = &["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaunchpadConfig {
    #[serde(default = "default_python")]
    pub python: String,

    #[serde(default = "default_manage_py")]
    pub manage_py: String,

    #[serde(default = "default_requirements")]
    pub requirements: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<String>,

    /// Environment applied to every stage.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,

    #[serde(default)]
    pub audit: AuditConfig,

    #[serde(default)]
    pub verify: VerifyConfig,

    /// Per-stage overrides keyed by deploy stage id.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub stages: BTreeMap<String, StageOverride>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Lowest check severity that fails the audit stage.
    #[serde(default = "default_fail_level")]
    pub fail_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyConfig {
    #[serde(default = "default_settings_module")]
    pub settings_module: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StageOverride {
    /// Replacement argv lists; the stage's defaults are dropped entirely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commands: Option<Vec<Vec<String>>>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
}

impl Default for LaunchpadConfig {
    fn default() -> Self {
        Self {
            python: default_python(),
            manage_py: default_manage_py(),
            requirements: default_requirements(),
            working_dir: None,
            env: BTreeMap::new(),
            audit: AuditConfig::default(),
            verify: VerifyConfig::default(),
            stages: BTreeMap::new(),
        }
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            fail_level: default_fail_level(),
        }
    }
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            settings_module: default_settings_module(),
        }
    }
}

fn default_python() -> String {
    "python".to_string()
}

fn default_manage_py() -> String {
    "manage.py".to_string()
}

fn default_requirements() -> String {
    "requirements.txt".to_string()
}

fn default_fail_level() -> String {
    "WARNING".to_string()
}

fn default_settings_module() -> String {
    "config.settings.production".to_string()
}

/// Configuration plus the file it came from (`None` for built-in defaults).
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: LaunchpadConfig,
    pub source: Option<PathBuf>,
}

impl LaunchpadConfig {
    pub fn working_dir(&self) -> Option<PathBuf> {
        self.working_dir.as_ref().map(PathBuf::from)
    }

    pub fn stage_override(&self, id: &str) -> Option<&StageOverride> {
        self.stages.get(id)
    }

    fn validate(mut self) -> Result<Self> {
        for (key, value) in [
            ("python", &self.python),
            ("manage_py", &self.manage_py),
            ("requirements", &self.requirements),
            ("verify.settings_module", &self.verify.settings_module),
        ] {
            if value.trim().is_empty() {
                return Err(Error::config_invalid_value(
                    key,
                    Some(value.clone()),
                    "Value must not be empty",
                ));
            }
        }

        let level = self.audit.fail_level.trim().to_ascii_uppercase();
        if !FAIL_LEVELS.contains(&level.as_str()) {
            return Err(Error::config_invalid_value(
                "audit.fail_level",
                Some(self.audit.fail_level.clone()),
                format!("Expected one of: {}", FAIL_LEVELS.join(", ")),
            ));
        }
        self.audit.fail_level = level;

        for (id, stage) in &self.stages {
            if DeployStage::from_id(id).is_none() {
                let known: Vec<&str> = DeployStage::ALL.iter().map(|s| s.id()).collect();
                return Err(Error::config_invalid_value(
                    format!("stages.{}", id),
                    None,
                    format!("Unknown stage; expected one of: {}", known.join(", ")),
                ));
            }

            if let Some(commands) = &stage.commands {
                if commands.is_empty() {
                    return Err(Error::config_invalid_value(
                        format!("stages.{}.commands", id),
                        None,
                        "At least one command is required",
                    ));
                }
                if let Some(pos) = commands.iter().position(|argv| argv.is_empty()) {
                    return Err(Error::config_invalid_value(
                        format!("stages.{}.commands[{}]", id, pos),
                        None,
                        "Command argv must not be empty",
                    ));
                }
            }
        }

        Ok(self)
    }

    fn expand_paths(mut self) -> Result<Self> {
        self.python = expand("python", &self.python)?;
        self.manage_py = expand("manage_py", &self.manage_py)?;
        self.requirements = expand("requirements", &self.requirements)?;
        if let Some(dir) = self.working_dir.take() {
            let dir = expand("working_dir", &dir)?;
            if !Path::new(&dir).is_dir() {
                return Err(Error::config_invalid_value(
                    "working_dir",
                    Some(dir),
                    "Directory does not exist",
                ));
            }
            self.working_dir = Some(dir);
        }
        Ok(self)
    }
}

fn expand(key: &str, value: &str) -> Result<String> {
    shellexpand::full(value)
        .map(|v| v.into_owned())
        .map_err(|e| Error::config_invalid_value(key, Some(value.to_string()), e.to_string()))
}

/// Parse, validate, and expand a configuration document.
pub fn parse(raw: &str, origin: &str) -> Result<LaunchpadConfig> {
    let config: LaunchpadConfig =
        serde_json::from_str(raw).map_err(|e| Error::config_invalid_json(origin, e))?;
    config.validate()?.expand_paths()
}

/// Load configuration from an explicit file, or defaults when `None`.
pub fn load_from(path: Option<&Path>) -> Result<LoadedConfig> {
    let Some(path) = path else {
        return Ok(LoadedConfig {
            config: LaunchpadConfig::default(),
            source: None,
        });
    };

    let origin = path.display().to_string();
    let raw = io::read_file(path, &format!("read {}", origin))?;
    let config = parse(&raw, &origin)?;
    log_status!("config", "Loaded {}", origin);

    Ok(LoadedConfig {
        config,
        source: Some(path.to_path_buf()),
    })
}

/// Load configuration for the current process (env override or `./launchpad.json`).
pub fn load() -> Result<LoadedConfig> {
    let path = paths::config_file()?;
    load_from(path.as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn empty_document_yields_defaults() {
        let config = parse("{}", "inline").unwrap();

        assert_eq!(config.python, "python");
        assert_eq!(config.manage_py, "manage.py");
        assert_eq!(config.requirements, "requirements.txt");
        assert_eq!(config.audit.fail_level, "WARNING");
        assert_eq!(config.verify.settings_module, "config.settings.production");
        assert!(config.working_dir().is_none());
    }

    #[test]
    fn fail_level_is_normalized() {
        let config = parse(r#"{"audit": {"fail_level": " error "}}"#, "inline").unwrap();
        assert_eq!(config.audit.fail_level, "ERROR");
    }

    #[test]
    fn unknown_fail_level_is_rejected() {
        let err = parse(r#"{"audit": {"fail_level": "LOUD"}}"#, "inline").unwrap_err();
        assert_eq!(err.code.as_str(), "config.invalid_value");
        assert_eq!(err.details["key"], "audit.fail_level");
    }

    #[test]
    fn unknown_stage_override_is_rejected() {
        let err = parse(r#"{"stages": {"deploy": {}}}"#, "inline").unwrap_err();
        assert_eq!(err.details["key"], "stages.deploy");
    }

    #[test]
    fn empty_argv_in_override_is_rejected() {
        let err = parse(
            r#"{"stages": {"migrate": {"commands": [["true"], []]}}}"#,
            "inline",
        )
        .unwrap_err();
        assert_eq!(err.details["key"], "stages.migrate.commands[1]");
    }

    #[test]
    fn empty_command_list_is_rejected() {
        let err = parse(r#"{"stages": {"audit": {"commands": []}}}"#, "inline").unwrap_err();
        assert_eq!(err.details["key"], "stages.audit.commands");
    }

    #[test]
    fn invalid_json_reports_origin() {
        let err = parse("{ python: ", "/srv/app/launchpad.json").unwrap_err();
        assert_eq!(err.code.as_str(), "config.invalid_json");
        assert_eq!(err.details["path"], "/srv/app/launchpad.json");
    }

    #[test]
    fn undefined_variable_in_path_is_rejected() {
        let err = parse(
            r#"{"python": "$LAUNCHPAD_UNDEFINED_TEST_VAR/bin/python"}"#,
            "inline",
        )
        .unwrap_err();
        assert_eq!(err.details["key"], "python");
    }

    #[test]
    fn missing_working_dir_is_rejected() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("not-created");
        let raw = serde_json::json!({ "working_dir": missing.to_str().unwrap() }).to_string();

        let err = parse(&raw, "inline").unwrap_err();
        assert_eq!(err.code.as_str(), "config.invalid_value");
        assert_eq!(err.details["key"], "working_dir");
        assert_eq!(err.details["value"], missing.to_str().unwrap());
    }

    #[test]
    fn existing_working_dir_is_kept() {
        let dir = TempDir::new().unwrap();
        let raw = serde_json::json!({ "working_dir": dir.path().to_str().unwrap() }).to_string();

        let config = parse(&raw, "inline").unwrap();
        assert_eq!(config.working_dir(), Some(dir.path().to_path_buf()));
    }

    #[test]
    fn empty_python_is_rejected() {
        let err = parse(r#"{"python": "  "}"#, "inline").unwrap_err();
        assert_eq!(err.details["key"], "python");
    }

    #[test]
    fn load_from_file_records_source() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, r#"{"python": "python3.12"}"#).unwrap();

        let loaded = load_from(Some(&path)).unwrap();
        assert_eq!(loaded.config.python, "python3.12");
        assert_eq!(loaded.source, Some(path));
    }

    #[test]
    fn load_from_none_uses_defaults() {
        let loaded = load_from(None).unwrap();
        assert!(loaded.source.is_none());
        assert_eq!(loaded.config.python, "python");
    }
}
