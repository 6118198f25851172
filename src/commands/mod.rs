use crate::output;
use crate::Commands;

pub type CmdResult<T> = launchpad::Result<(T, i32)>;

pub mod plan;
pub mod run;
pub mod verify;

/// Dispatch a parsed command and serialize its data for the response envelope.
pub(crate) fn run_json(command: Commands) -> (launchpad::Result<serde_json::Value>, i32) {
    match command {
        Commands::Run(args) => output::map_cmd_result_to_json(run::run(args)),
        Commands::Verify(args) => output::map_cmd_result_to_json(verify::run(args)),
        Commands::Plan(args) => output::map_cmd_result_to_json(plan::run(args)),
    }
}
