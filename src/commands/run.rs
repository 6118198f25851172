use clap::Args;
use std::io;
use std::path::PathBuf;

use launchpad::executor::ProcessExecutor;
use launchpad::log_status;
use launchpad::pipeline::{self, PipelineRunResult};
use launchpad::{config, deploy, report};

use super::CmdResult;

#[derive(Args, Default, Debug)]
pub struct RunArgs {
    /// Write a JSON run report to this path when the pipeline finishes
    #[arg(long, value_name = "PATH")]
    pub report: Option<PathBuf>,
}

pub fn run(args: RunArgs) -> CmdResult<PipelineRunResult> {
    let loaded = config::load()?;
    let deploy_pipeline = deploy::build_pipeline(&loaded.config)?;

    let stdout = io::stdout();
    let mut banners = stdout.lock();
    let result = pipeline::run(&deploy_pipeline, &ProcessExecutor, &mut banners)?;

    if let Some(path) = args.report.as_deref() {
        if let Err(err) = report::write(&result, path) {
            // A stage failure's exit status outranks a report failure.
            if result.succeeded() {
                return Err(err);
            }
            log_status!("report", "Failed to write {}: {}", path.display(), err);
        }
    }

    let exit_code = result.exit_code;
    Ok((result, exit_code))
}
