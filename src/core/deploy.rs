//! The deployment build pipeline.
//!
//! Five stages in fixed order: install dependencies, verify the certificate
//! bundle, apply migrations, collect static assets, run the deployment audit.
//! Each stage only delegates; the package manager, migration framework, asset
//! collector and security checks are external tools.

use std::collections::BTreeMap;

use crate::config::LaunchpadConfig;
use crate::error::Result;
use crate::pipeline::{FailureCategory, Pipeline, Stage, StageCommand};

pub const PIPELINE_NAME: &str = "deploy";

const CERTIFI_WHERE: &str = "import certifi; print(certifi.where())";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployStage {
    Install,
    Certs,
    Migrate,
    CollectStatic,
    Audit,
}

impl DeployStage {
    pub const ALL: [DeployStage; 5] = [
        DeployStage::Install,
        DeployStage::Certs,
        DeployStage::Migrate,
        DeployStage::CollectStatic,
        DeployStage::Audit,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            DeployStage::Install => "install",
            DeployStage::Certs => "certs",
            DeployStage::Migrate => "migrate",
            DeployStage::CollectStatic => "collectstatic",
            DeployStage::Audit => "audit",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|stage| stage.id() == id)
    }

    pub fn label(&self) -> &'static str {
        match self {
            DeployStage::Install => "Installing dependencies",
            DeployStage::Certs => "Verifying certificate bundle",
            DeployStage::Migrate => "Applying database migrations",
            DeployStage::CollectStatic => "Collecting static assets",
            DeployStage::Audit => "Running deployment security checks",
        }
    }

    pub fn category(&self) -> FailureCategory {
        match self {
            DeployStage::Install | DeployStage::Certs => FailureCategory::Environment,
            DeployStage::Migrate => FailureCategory::Persistence,
            DeployStage::CollectStatic => FailureCategory::Filesystem,
            DeployStage::Audit => FailureCategory::Policy,
        }
    }

    pub fn default_commands(&self, config: &LaunchpadConfig) -> Vec<StageCommand> {
        let python = config.python.as_str();
        let manage = config.manage_py.as_str();

        match self {
            DeployStage::Install => vec![
                StageCommand::new(python, &["-m", "pip", "install", "--upgrade", "pip"]),
                StageCommand::new(
                    python,
                    &["-m", "pip", "install", "-r", config.requirements.as_str()],
                ),
            ],
            DeployStage::Certs => vec![StageCommand::new(python, &["-c", CERTIFI_WHERE])],
            DeployStage::Migrate => vec![StageCommand::new(
                python,
                &[manage, "migrate", "--noinput"],
            )],
            DeployStage::CollectStatic => vec![StageCommand::new(
                python,
                &[manage, "collectstatic", "--noinput", "--clear"],
            )],
            DeployStage::Audit => vec![StageCommand::new(
                python,
                &[
                    manage,
                    "check",
                    "--deploy",
                    "--fail-level",
                    config.audit.fail_level.as_str(),
                ],
            )],
        }
    }

    fn build(&self, config: &LaunchpadConfig) -> Stage {
        let overrides = config.stage_override(self.id());

        let commands: Vec<StageCommand> = overrides
            .and_then(|o| o.commands.as_ref())
            .map(|argvs| {
                argvs
                    .iter()
                    .filter_map(|argv| StageCommand::from_argv(argv))
                    .collect()
            })
            .unwrap_or_else(|| self.default_commands(config));

        let mut env: BTreeMap<String, String> = config.env.clone();
        if let Some(o) = overrides {
            env.extend(o.env.iter().map(|(k, v)| (k.clone(), v.clone())));
        }

        Stage {
            id: self.id().to_string(),
            label: self.label().to_string(),
            category: self.category(),
            commands,
            env,
            working_dir: config.working_dir(),
        }
    }
}

/// Build the deployment pipeline for a configuration.
pub fn build_pipeline(config: &LaunchpadConfig) -> Result<Pipeline> {
    let stages = DeployStage::ALL
        .iter()
        .map(|stage| stage.build(config))
        .collect();
    Pipeline::new(PIPELINE_NAME, stages)
}
