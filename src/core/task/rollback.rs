use serde::Serialize;

use super::{describe_release, AppContext, Task, TaskContext};
use crate::error::Result;
use crate::events::{LifecycleEvent, RollbackEvent, RollbackMilestone};
use crate::executor::Transport;
use crate::release::{self, ReleaseId};

/// Points `current` back at the release immediately before it.
pub struct RollbackTask {
    environment: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RollbackOutcome {
    RolledBack,
    NoCurrentRelease,
    NoReleases,
    NoPreviousRelease,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RollbackReport {
    pub environment: String,
    pub outcome: RollbackOutcome,
    pub roll_back_from: Option<ReleaseId>,
    pub roll_back_to: Option<ReleaseId>,
    pub messages: Vec<String>,
}

impl RollbackTask {
    pub fn new(environment: impl Into<String>) -> Self {
        Self {
            environment: environment.into(),
        }
    }
}

impl Task for RollbackTask {
    type Report = RollbackReport;

    fn name(&self) -> &'static str {
        "rollback"
    }

    fn environment_label(&self) -> &str {
        &self.environment
    }

    fn run(&self, app: &AppContext, transport: &dyn Transport) -> Result<RollbackReport> {
        let ctx = TaskContext::begin(app, transport, &self.environment)?;
        let mut event = RollbackEvent {
            environment: ctx.environment().label.clone(),
            roll_back_from: None,
            roll_back_to: None,
        };

        ctx.publish(LifecycleEvent::Rollback(RollbackMilestone::Started, &event))?;
        ctx.info(format!(
            "Rolling back \"{}\" ({}) to its previous release...",
            ctx.project().name,
            event.environment
        ));
        ctx.run_pre_task_commands()?;

        let outcome = roll_back(&ctx, &mut event)?;
        if outcome == RollbackOutcome::RolledBack {
            ctx.publish(LifecycleEvent::Rollback(RollbackMilestone::Finished, &event))?;
            ctx.info("Rollback complete!");
        }

        Ok(RollbackReport {
            environment: event.environment,
            outcome,
            roll_back_from: event.roll_back_from,
            roll_back_to: event.roll_back_to,
            messages: ctx.transcript(),
        })
    }
}

/// Everything between the pre-task commands and the finished event. Negative
/// outcomes leave the server untouched.
fn roll_back(ctx: &TaskContext<'_>, event: &mut RollbackEvent) -> Result<RollbackOutcome> {
    let Some(current) = ctx.current_release()? else {
        ctx.info("Current release does not appear to exist!");
        return Ok(RollbackOutcome::NoCurrentRelease);
    };
    ctx.info(format!("Current release: {}", describe_release(&current)));
    event.roll_back_from = Some(current.clone());

    let releases = ctx.list_releases()?;
    if releases.is_empty() {
        ctx.info("There do not appear to be any releases!");
        return Ok(RollbackOutcome::NoReleases);
    }

    let Some(previous) = release::predecessor(&releases, &current) else {
        ctx.info("A previous release does not exist - there is nothing to roll back to!");
        return Ok(RollbackOutcome::NoPreviousRelease);
    };
    ctx.info(format!("Previous release: {}", describe_release(&previous)));
    event.roll_back_to = Some(previous.clone());

    ctx.activate(&previous)?;
    ctx.info("Activated previous release.");
    Ok(RollbackOutcome::RolledBack)
}
