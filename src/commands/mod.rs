use clap::Args;
use std::path::{Path, PathBuf};

use shipyard::executor::SshTransport;
use shipyard::log_status;
use shipyard::messages::{ConsoleSink, LogFileSink, MessageType, Messenger};
use shipyard::project;
use shipyard::task::{AppContext, Task};

pub type CmdResult<T> = shipyard::Result<(T, i32)>;

pub(crate) struct GlobalArgs {
    pub config: PathBuf,
    pub verbose: bool,
}

/// Arguments shared by every task command.
#[derive(Args, Debug)]
pub struct TaskArgs {
    /// Environment label
    pub environment: String,

    /// Append info and debug messages to this file
    #[arg(long, value_name = "FILE")]
    pub logfile: Option<PathBuf>,
}

/// Console narration on stderr (debug too when verbose), plus the optional
/// log file receiving everything.
fn build_messenger(logfile: Option<&Path>, verbose: bool) -> shipyard::Result<Messenger> {
    let mut messenger = Messenger::new();
    let console_mask = if verbose {
        MessageType::INFO | MessageType::DEBUG
    } else {
        MessageType::INFO
    };
    messenger.add_sink(ConsoleSink, console_mask);

    if let Some(path) = logfile {
        messenger.add_sink(LogFileSink::new(path)?, MessageType::INFO | MessageType::DEBUG);
    }

    Ok(messenger)
}

/// Load the project, wire up plugins and sinks, and run a task over ssh.
pub(crate) fn run_task<T: Task>(
    task: T,
    logfile: Option<&Path>,
    global: &GlobalArgs,
) -> CmdResult<T::Report> {
    let project = project::load(&global.config)?;
    let messenger = build_messenger(logfile, global.verbose)?;
    let app = AppContext::from_project(project, messenger)?;
    let transport = SshTransport {
        control_persist_secs: app.project.settings.control_persist_secs,
    };

    log_status!(
        "shipyard",
        "Running {} on '{}'",
        task.name(),
        task.environment_label()
    );
    let report = task.run(&app, &transport)?;
    Ok((report, 0))
}

pub mod deploy;
pub mod init;
pub mod rollback;
pub mod status;

/// Dispatch a command to its handler and map result to JSON.
macro_rules! dispatch {
    ($args:expr, $global:expr, $module:ident) => {
        crate::output::map_cmd_result_to_json($module::run($args, $global))
    };
}

pub(crate) fn run_json(
    command: crate::Commands,
    global: &GlobalArgs,
) -> (shipyard::Result<serde_json::Value>, i32) {
    match command {
        crate::Commands::Init(args) => dispatch!(args, global, init),
        crate::Commands::Deploy(args) => dispatch!(args, global, deploy),
        crate::Commands::Rollback(args) => dispatch!(args, global, rollback),
        crate::Commands::Status(args) => dispatch!(args, global, status),
    }
}
