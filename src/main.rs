use clap::{Parser, Subcommand};

#[derive(Debug, Clone, Copy)]
enum ResponseMode {
    /// Print the JSON envelope.
    Json,
    /// Delegated tools own stdout/stderr; print only on launch errors.
    Passthrough,
}

mod commands;
mod output;

use commands::{plan, run, verify};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "launchpad")]
#[command(version = VERSION)]
#[command(about = "Fail-fast deployment build pipeline")]
struct Cli {
    /// Defaults to `run` when omitted
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Install, verify certs, migrate, collect static, and audit
    Run(run::RunArgs),
    /// Run production smoke checks against the built release
    Verify(verify::VerifyArgs),
    /// Show the ordered stages without executing them
    Plan(plan::PlanArgs),
}

fn response_mode(command: &Commands) -> ResponseMode {
    match command {
        Commands::Plan(_) => ResponseMode::Json,
        Commands::Run(_) | Commands::Verify(_) => ResponseMode::Passthrough,
    }
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Commands::Run(run::RunArgs::default()));

    let mode = response_mode(&command);
    let (json_result, exit_code) = commands::run_json(command);

    let printed = match mode {
        ResponseMode::Json => output::print_json_result(json_result),
        ResponseMode::Passthrough => match json_result {
            Ok(_) => Ok(()),
            Err(err) => output::print_result::<serde_json::Value>(Err(err)),
        },
    };

    if let Err(err) = printed {
        eprintln!("launchpad: {}", err);
    }

    std::process::ExitCode::from(exit_code_to_u8(exit_code))
}

fn exit_code_to_u8(code: i32) -> u8 {
    match code {
        0 => 0,
        1..=255 => code as u8,
        c if c < 0 => 1,
        _ => 255,
    }
}
