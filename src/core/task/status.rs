use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

use super::{describe_release, AppContext, Task, TaskContext};
use crate::error::Result;
use crate::events::{LifecycleEvent, StatusEvent, StatusMilestone};
use crate::executor::Transport;
use crate::release::ReleaseId;
use crate::utils::shell::ShellCommand;

/// Reports the active release and how far the working copy trails its
/// origin. Changes nothing on the server.
pub struct StatusTask {
    environment: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub environment: String,
    pub current_release: Option<ReleaseId>,
    /// `None` when there is no working copy to compare.
    pub repo_commits_behind_origin: Option<u32>,
    pub messages: Vec<String>,
}

impl StatusTask {
    pub fn new(environment: impl Into<String>) -> Self {
        Self {
            environment: environment.into(),
        }
    }
}

impl Task for StatusTask {
    type Report = StatusReport;

    fn name(&self) -> &'static str {
        "status"
    }

    fn environment_label(&self) -> &str {
        &self.environment
    }

    fn run(&self, app: &AppContext, transport: &dyn Transport) -> Result<StatusReport> {
        let ctx = TaskContext::begin(app, transport, &self.environment)?;
        let mut event = StatusEvent {
            environment: ctx.environment().label.clone(),
            current_release: None,
            repo_commits_behind_origin: None,
        };

        ctx.publish(LifecycleEvent::Status(StatusMilestone::Started, &event))?;
        ctx.info(format!(
            "Checking the status of \"{}\" on its {} environment...",
            ctx.project().name,
            event.environment
        ));
        ctx.run_pre_task_commands()?;

        event.current_release = ctx.current_release()?;
        match &event.current_release {
            Some(current) => ctx.info(format!("Current release: {}", describe_release(current))),
            None => ctx.info("There is no current build in place!"),
        }

        event.repo_commits_behind_origin = commits_behind_origin(&ctx)?;
        match event.repo_commits_behind_origin {
            None => ctx.info("A working copy of the repository does not appear to exist on the server!"),
            Some(0) => ctx.info("The working copy of the repository is up-to-date with its origin."),
            Some(behind) => ctx.info(format!(
                "The working copy of the repository is {} commits behind its origin.",
                behind
            )),
        }

        ctx.publish(LifecycleEvent::Status(StatusMilestone::Finished, &event))?;

        Ok(StatusReport {
            environment: event.environment,
            current_release: event.current_release,
            repo_commits_behind_origin: event.repo_commits_behind_origin,
            messages: ctx.transcript(),
        })
    }
}

/// `None` when `repo/` cannot be entered.
fn commits_behind_origin(ctx: &TaskContext<'_>) -> Result<Option<u32>> {
    let repo = ctx.layout().repo();

    let probe = ctx.probe(ShellCommand::new("cd").arg(&repo))?;
    if !probe.success || !probe.combined().trim().is_empty() {
        return Ok(None);
    }

    let output = ctx.run(
        ShellCommand::new("cd")
            .arg(&repo)
            .and(ShellCommand::new("git").arg("fetch"))
            .and(ShellCommand::new("git").arg("status")),
    )?;
    Ok(Some(parse_commits_behind(&output.stdout)))
}

/// Count of upstream commits missing locally, read from `git status`.
/// A branch that is only ahead, or up to date, counts as zero.
pub fn parse_commits_behind(status: &str) -> u32 {
    static BEHIND: OnceLock<Regex> = OnceLock::new();
    static DIVERGED: OnceLock<Regex> = OnceLock::new();
    let behind = BEHIND.get_or_init(|| {
        Regex::new(r"is behind '[^']*' by ([0-9]+) commits?").expect("behind pattern is valid")
    });
    let diverged = DIVERGED.get_or_init(|| {
        Regex::new(r"have [0-9]+ and ([0-9]+) different commits? each")
            .expect("diverged pattern is valid")
    });

    behind
        .captures(status)
        .or_else(|| diverged.captures(status))
        .and_then(|caps| caps.get(1))
        .and_then(|n| n.as_str().parse().ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn behind_count_is_parsed() {
        let status = "On branch main\nYour branch is behind 'origin/main' by 3 commits, and can be fast-forwarded.\n";
        assert_eq!(parse_commits_behind(status), 3);
        assert_eq!(
            parse_commits_behind("Your branch is behind 'origin/main' by 1 commit, and can be"),
            1
        );
    }

    #[test]
    fn up_to_date_status_is_zero() {
        let status = "On branch main\nYour branch is up to date with 'origin/main'.\n";
        assert_eq!(parse_commits_behind(status), 0);
    }

    #[test]
    fn ahead_of_origin_is_not_behind() {
        let status = "On branch main\nYour branch is ahead of 'origin/main' by 2 commits.\n";
        assert_eq!(parse_commits_behind(status), 0);
    }

    #[test]
    fn diverged_branch_counts_upstream_commits() {
        let status = "On branch main\nYour branch and 'origin/main' have diverged,\nand have 1 and 3 different commits each, respectively.\n";
        assert_eq!(parse_commits_behind(status), 3);
    }
}
