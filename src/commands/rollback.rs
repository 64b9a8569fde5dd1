use clap::Args;

use shipyard::task::{RollbackReport, RollbackTask};

use super::{run_task, CmdResult, GlobalArgs, TaskArgs};

#[derive(Args)]
pub struct RollbackArgs {
    #[command(flatten)]
    pub task: TaskArgs,
}

pub fn run(args: RollbackArgs, global: &GlobalArgs) -> CmdResult<RollbackReport> {
    let task = RollbackTask::new(&args.task.environment);
    run_task(task, args.task.logfile.as_deref(), global)
}
