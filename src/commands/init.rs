use clap::Args;
use serde::Serialize;

use shipyard::project;

use super::{CmdResult, GlobalArgs};

#[derive(Args)]
pub struct InitArgs {
    /// Overwrite an existing project file
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Serialize)]
pub struct InitOutput {
    pub command: &'static str,
    pub path: String,
    pub environments: Vec<String>,
    pub next_steps: Vec<String>,
}

pub fn run(args: InitArgs, global: &GlobalArgs) -> CmdResult<InitOutput> {
    let project = project::write_boilerplate(&global.config, args.force)?;
    let path = global.config.display().to_string();

    Ok((
        InitOutput {
            command: "init",
            next_steps: vec![
                format!("Edit {} to describe your repository and servers", path),
                "Run 'shipyard deploy <environment>'".to_string(),
            ],
            path,
            environments: project.environments.iter().map(|e| e.label.clone()).collect(),
        },
        0,
    ))
}
