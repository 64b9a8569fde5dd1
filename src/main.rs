use clap::{Parser, Subcommand};
use std::path::PathBuf;

use commands::GlobalArgs;

mod commands;
mod output;

use commands::{deploy, init, rollback, status};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "shipyard")]
#[command(version = VERSION)]
#[command(about = "Release-based deployments over SSH")]
struct Cli {
    /// Project file (JSON, or TOML by extension)
    #[arg(long, global = true, value_name = "PATH", default_value = shipyard::project::CONFIG_FILE)]
    config: PathBuf,

    /// Also stream debug messages (every remote command) to stderr
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deploy the environment's branch as a new release
    Deploy(deploy::DeployArgs),
    /// Re-activate the release before the current one
    Rollback(rollback::RollbackArgs),
    /// Show the current release and repository drift
    Status(status::StatusArgs),
    /// Write a boilerplate project file
    Init(init::InitArgs),
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    let global = GlobalArgs {
        config: cli.config,
        verbose: cli.verbose,
    };

    let (json_result, exit_code) = commands::run_json(cli.command, &global);
    let _ = output::print_json_result(json_result);

    std::process::ExitCode::from(exit_code_to_u8(exit_code))
}

fn exit_code_to_u8(code: i32) -> u8 {
    if code <= 0 {
        0
    } else if code >= 255 {
        255
    } else {
        code as u8
    }
}
