//! Production smoke checks.
//!
//! A second fail-fast pipeline that checks a built release can actually start
//! under its production settings: the framework loads, the database answers,
//! the certificate bundle resolves, and debug mode is off with hosts configured.

use crate::config::LaunchpadConfig;
use crate::error::Result;
use crate::pipeline::{FailureCategory, Pipeline, Stage, StageCommand};

pub const PIPELINE_NAME: &str = "verify";

pub const SETTINGS_ENV: &str = "DJANGO_SETTINGS_MODULE";

const SETTINGS_SCRIPT: &str = "import django; django.setup(); print('Framework settings loaded')";

const DATABASE_SCRIPT: &str = "import django; django.setup(); \
from django.db import connection; connection.ensure_connection(); \
print('Database connection established')";

const CERTS_SCRIPT: &str = "import certifi; print('Certificate bundle: ' + certifi.where())";

// Exits non-zero when DEBUG is on or no non-empty host is allowed.
const DEBUG_SCRIPT: &str = "import sys, django; django.setup(); \
from django.conf import settings; \
print('DEBUG=%s' % settings.DEBUG); \
print('ALLOWED_HOSTS=%s' % settings.ALLOWED_HOSTS); \
sys.exit(1 if settings.DEBUG or not [h for h in settings.ALLOWED_HOSTS if h] else 0)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmokeCheck {
    Settings,
    Database,
    Certs,
    Debug,
}

impl SmokeCheck {
    pub const ALL: [SmokeCheck; 4] = [
        SmokeCheck::Settings,
        SmokeCheck::Database,
        SmokeCheck::Certs,
        SmokeCheck::Debug,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            SmokeCheck::Settings => "settings",
            SmokeCheck::Database => "database",
            SmokeCheck::Certs => "certs",
            SmokeCheck::Debug => "debug",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SmokeCheck::Settings => "Loading production settings",
            SmokeCheck::Database => "Connecting to database",
            SmokeCheck::Certs => "Locating certificate bundle",
            SmokeCheck::Debug => "Checking debug mode and allowed hosts",
        }
    }

    pub fn category(&self) -> FailureCategory {
        match self {
            SmokeCheck::Settings | SmokeCheck::Certs => FailureCategory::Environment,
            SmokeCheck::Database => FailureCategory::Persistence,
            SmokeCheck::Debug => FailureCategory::Policy,
        }
    }

    fn script(&self) -> &'static str {
        match self {
            SmokeCheck::Settings => SETTINGS_SCRIPT,
            SmokeCheck::Database => DATABASE_SCRIPT,
            SmokeCheck::Certs => CERTS_SCRIPT,
            SmokeCheck::Debug => DEBUG_SCRIPT,
        }
    }

    fn build(&self, config: &LaunchpadConfig) -> Stage {
        let mut env = config.env.clone();
        env.insert(SETTINGS_ENV.to_string(), config.verify.settings_module.clone());
        env.insert("DEBUG".to_string(), "False".to_string());

        Stage {
            id: self.id().to_string(),
            label: self.label().to_string(),
            category: self.category(),
            commands: vec![StageCommand::new(
                config.python.as_str(),
                &["-c", self.script()],
            )],
            env,
            working_dir: config.working_dir(),
        }
    }
}

pub fn build_pipeline(config: &LaunchpadConfig) -> Result<Pipeline> {
    let stages = SmokeCheck::ALL.iter().map(|check| check.build(config)).collect();
    Pipeline::new(PIPELINE_NAME, stages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config;

    #[test]
    fn smoke_checks_run_settings_first_and_debug_last() {
        let pipeline = build_pipeline(&LaunchpadConfig::default()).unwrap();
        let ids: Vec<&str> = pipeline.stages().iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["settings", "database", "certs", "debug"]);
    }

    #[test]
    fn smoke_checks_force_production_settings_and_debug_off() {
        let config = config::parse(
            r#"{"verify": {"settings_module": "mysite.settings.prod"}, "env": {"DEBUG": "True", "SENTRY": "1"}}"#,
            "inline",
        )
        .unwrap();
        let pipeline = build_pipeline(&config).unwrap();

        for stage in pipeline.stages() {
            assert_eq!(stage.env[SETTINGS_ENV], "mysite.settings.prod");
            assert_eq!(stage.env["DEBUG"], "False");
            assert_eq!(stage.env["SENTRY"], "1");
        }
    }

    #[test]
    fn smoke_checks_use_configured_interpreter_inline() {
        let config = config::parse(r#"{"python": "python3"}"#, "inline").unwrap();
        let pipeline = build_pipeline(&config).unwrap();
        let command = &pipeline.stages()[3].commands[0];

        assert_eq!(command.program, "python3");
        assert_eq!(command.args[0], "-c");
        assert!(command.args[1].contains("ALLOWED_HOSTS"));
    }
}
