use clap::Args;

use shipyard::release::ReleaseId;
use shipyard::task::{DeployReport, DeployTask};

use super::{run_task, CmdResult, GlobalArgs, TaskArgs};

#[derive(Args)]
pub struct DeployArgs {
    #[command(flatten)]
    pub task: TaskArgs,

    /// Release id to create instead of the current epoch second
    #[arg(long, value_name = "ID", hide = true)]
    pub release: Option<String>,
}

pub fn run(args: DeployArgs, global: &GlobalArgs) -> CmdResult<DeployReport> {
    let mut task = DeployTask::new(&args.task.environment);

    if let Some(raw) = &args.release {
        let release = ReleaseId::parse(raw).ok_or_else(|| {
            shipyard::Error::validation_invalid_argument(
                "release",
                "Release ids are ten-digit epoch seconds",
                Some(raw.clone()),
            )
        })?;
        task = task.with_release(release);
    }

    run_task(task, args.task.logfile.as_deref(), global)
}
