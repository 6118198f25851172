use clap::Args;
use serde::Serialize;
use std::collections::BTreeMap;

use launchpad::pipeline::{FailureCategory, Pipeline};
use launchpad::{config, deploy, verify};

use super::CmdResult;

#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Describe the production smoke checks instead of the deploy pipeline
    #[arg(long)]
    pub verify: bool,
}

#[derive(Debug, Serialize)]
pub struct PlanOutput {
    pub pipeline: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_source: Option<String>,
    pub stages: Vec<PlannedStage>,
}

#[derive(Debug, Serialize)]
pub struct PlannedStage {
    pub position: usize,
    pub id: String,
    pub label: String,
    pub category: FailureCategory,
    pub commands: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<String>,
}

pub fn run(args: PlanArgs) -> CmdResult<PlanOutput> {
    let loaded = config::load()?;
    let pipeline = if args.verify {
        verify::build_pipeline(&loaded.config)?
    } else {
        deploy::build_pipeline(&loaded.config)?
    };

    let output = describe(
        &pipeline,
        loaded.source.map(|p| p.display().to_string()),
    );
    Ok((output, 0))
}

fn describe(pipeline: &Pipeline, config_source: Option<String>) -> PlanOutput {
    let stages = pipeline
        .stages()
        .iter()
        .enumerate()
        .map(|(idx, stage)| PlannedStage {
            position: idx + 1,
            id: stage.id.clone(),
            label: stage.label.clone(),
            category: stage.category,
            commands: stage.commands.iter().map(|c| c.display()).collect(),
            env: stage.env.clone(),
            working_dir: stage
                .working_dir
                .as_ref()
                .map(|d| d.display().to_string()),
        })
        .collect();

    PlanOutput {
        pipeline: pipeline.name().to_string(),
        config_source,
        stages,
    }
}
