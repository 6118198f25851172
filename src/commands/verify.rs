use clap::Args;
use std::io;

use launchpad::executor::ProcessExecutor;
use launchpad::pipeline::{self, PipelineRunResult};
use launchpad::{config, verify};

use super::CmdResult;

#[derive(Args, Debug)]
pub struct VerifyArgs {}

pub fn run(_args: VerifyArgs) -> CmdResult<PipelineRunResult> {
    let loaded = config::load()?;
    let checks = verify::build_pipeline(&loaded.config)?;

    let stdout = io::stdout();
    let mut banners = stdout.lock();
    let result = pipeline::run(&checks, &ProcessExecutor, &mut banners)?;

    let exit_code = result.exit_code;
    Ok((result, exit_code))
}
