//! Fail-fast sequential stage runner.
//!
//! A pipeline is an ordered list of named stages. Each stage delegates to one
//! or more external commands; the runner prints a banner, executes the stage,
//! and halts on the first non-zero exit status. Stages after the failing one
//! are recorded as skipped and never executed.

use std::collections::{BTreeMap, HashSet};
use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::utils::shell;

/// One delegated invocation: a program and its arguments. Never run through a shell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageCommand {
    pub program: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
}

impl StageCommand {
    pub fn new<S: AsRef<str>>(program: impl Into<String>, args: &[S]) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|a| a.as_ref().to_string()).collect(),
        }
    }

    /// Build from an argv list. Returns `None` for an empty list.
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self::new(program.clone(), args))
    }

    /// Render as a quoted command line for display.
    pub fn display(&self) -> String {
        let mut argv = Vec::with_capacity(self.args.len() + 1);
        argv.push(self.program.as_str());
        argv.extend(self.args.iter().map(String::as_str));
        shell::quote_args(&argv)
    }
}

/// What kind of failure a stage represents when it aborts the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCategory {
    /// Dependency install or certificate bundle problems.
    Environment,
    /// Database migration problems.
    Persistence,
    /// Static asset collection problems.
    Filesystem,
    /// A failed deployment-readiness check.
    Policy,
}

impl FailureCategory {
    pub fn describe(&self) -> &'static str {
        match self {
            FailureCategory::Environment => "environment setup",
            FailureCategory::Persistence => "persistence",
            FailureCategory::Filesystem => "filesystem",
            FailureCategory::Policy => "policy",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stage {
    pub id: String,
    pub label: String,
    pub category: FailureCategory,
    pub commands: Vec<StageCommand>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Pipeline {
    name: String,
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new(name: impl Into<String>, stages: Vec<Stage>) -> Result<Self> {
        let name = name.into();

        if stages.is_empty() {
            return Err(Error::validation_invalid_argument(
                "stages",
                "Pipeline has no stages",
                Some(name),
            ));
        }

        let mut seen = HashSet::new();
        for stage in &stages {
            if !seen.insert(stage.id.as_str()) {
                return Err(Error::validation_invalid_argument(
                    "stages",
                    format!("Duplicate stage id '{}'", stage.id),
                    Some(name),
                ));
            }
            if stage.commands.is_empty() {
                return Err(Error::validation_invalid_argument(
                    "stages",
                    format!("Stage '{}' has no commands", stage.id),
                    Some(name),
                ));
            }
        }

        Ok(Self { name, stages })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }
}

/// Position of a run in the linear stage chain.
///
/// `Done` and `Aborted` are terminal; no stage is ever re-entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Pending { index: usize },
    Done,
    Aborted { index: usize, exit_code: i32 },
}

impl PipelineState {
    pub fn start(stage_count: usize) -> Self {
        if stage_count == 0 {
            PipelineState::Done
        } else {
            PipelineState::Pending { index: 0 }
        }
    }

    /// Apply the exit status of the pending stage.
    pub fn advance(self, exit_code: i32, stage_count: usize) -> Self {
        match self {
            PipelineState::Pending { index } if exit_code != 0 => {
                PipelineState::Aborted { index, exit_code }
            }
            PipelineState::Pending { index } if index + 1 < stage_count => {
                PipelineState::Pending { index: index + 1 }
            }
            PipelineState::Pending { .. } => PipelineState::Done,
            terminal => terminal,
        }
    }
}

/// Runs one delegated command and reports its exit status.
pub trait StageExecutor {
    fn execute(&self, stage: &Stage, command: &StageCommand) -> i32;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Success,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageResult {
    pub id: String,
    pub label: String,
    pub category: FailureCategory,
    pub status: StageStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Success,
    Aborted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRunResult {
    pub pipeline: String,
    pub status: RunStatus,
    pub exit_code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_stage: Option<String>,
    pub stages: Vec<StageResult>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl PipelineRunResult {
    pub fn succeeded(&self) -> bool {
        self.status == RunStatus::Success
    }
}

/// Progress line printed before a stage starts.
pub fn banner(index: usize, total: usize, stage: &Stage) -> String {
    format!("==> [{}/{}] {}", index + 1, total, stage.label)
}

/// Run every stage in order, stopping at the first failure.
///
/// Banners go to `banners` (stdout in the CLI). The returned exit code is the
/// failing command's status, or 0 when every stage succeeded.
pub fn run(
    pipeline: &Pipeline,
    executor: &dyn StageExecutor,
    banners: &mut dyn Write,
) -> Result<PipelineRunResult> {
    let started_at = Utc::now();
    let total = pipeline.stages.len();
    let mut results = Vec::with_capacity(total);
    let mut state = PipelineState::start(total);

    while let PipelineState::Pending { index } = state {
        let stage = &pipeline.stages[index];

        writeln!(banners, "{}", banner(index, total, stage))
            .and_then(|_| banners.flush())
            .map_err(|e| {
                Error::internal_io(e.to_string(), Some("write stage banner".to_string()))
            })?;

        let clock = Instant::now();
        let exit_code = run_stage(stage, executor);

        results.push(StageResult {
            id: stage.id.clone(),
            label: stage.label.clone(),
            category: stage.category,
            status: if exit_code == 0 {
                StageStatus::Success
            } else {
                StageStatus::Failed
            },
            exit_code: Some(exit_code),
            duration_ms: clock.elapsed().as_millis() as u64,
        });

        state = state.advance(exit_code, total);
    }

    let (status, exit_code, failed_stage) = match state {
        PipelineState::Aborted { index, exit_code } => {
            let stage = &pipeline.stages[index];
            log_status!(
                "pipeline",
                "Aborted at '{}' ({} failure), exit code {}",
                stage.id,
                stage.category.describe(),
                exit_code
            );
            (RunStatus::Aborted, exit_code, Some(stage.id.clone()))
        }
        _ => (RunStatus::Success, 0, None),
    };

    for stage in pipeline.stages.iter().skip(results.len()) {
        results.push(StageResult {
            id: stage.id.clone(),
            label: stage.label.clone(),
            category: stage.category,
            status: StageStatus::Skipped,
            exit_code: None,
            duration_ms: 0,
        });
    }

    Ok(PipelineRunResult {
        pipeline: pipeline.name.clone(),
        status,
        exit_code,
        failed_stage,
        stages: results,
        started_at,
        finished_at: Utc::now(),
    })
}

fn run_stage(stage: &Stage, executor: &dyn StageExecutor) -> i32 {
    for command in &stage.commands {
        match executor.execute(stage, command) {
            0 => {}
            code if code < 0 => return 1,
            code => return code,
        }
    }
    0
}
