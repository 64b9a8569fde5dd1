use clap::Args;

use shipyard::task::{StatusReport, StatusTask};

use super::{run_task, CmdResult, GlobalArgs, TaskArgs};

#[derive(Args)]
pub struct StatusArgs {
    #[command(flatten)]
    pub task: TaskArgs,
}

pub fn run(args: StatusArgs, global: &GlobalArgs) -> CmdResult<StatusReport> {
    let task = StatusTask::new(&args.task.environment);
    run_task(task, args.task.logfile.as_deref(), global)
}
