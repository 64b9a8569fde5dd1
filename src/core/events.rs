//! Lifecycle events and the synchronous bus that delivers them to plugins.
//!
//! Every task owns one payload struct for the whole run and fills it in as
//! milestones complete. After each milestone the task publishes a
//! [`LifecycleEvent`] borrowing that payload; plugins see whatever has been
//! set so far.

use serde::Serialize;
use std::collections::HashMap;

use crate::error::Result;
use crate::plugin::Plugin;
use crate::release::ReleaseId;
use crate::task::TaskContext;
use crate::utils::template::TemplateVars;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeployMilestone {
    Started,
    UpdatedRepository,
    CreatedRelease,
    CreatedSharedFileSymlinks,
    ActivatedRelease,
    RemovedOldReleases,
    Finished,
}

impl DeployMilestone {
    pub const ALL: [DeployMilestone; 7] = [
        DeployMilestone::Started,
        DeployMilestone::UpdatedRepository,
        DeployMilestone::CreatedRelease,
        DeployMilestone::CreatedSharedFileSymlinks,
        DeployMilestone::ActivatedRelease,
        DeployMilestone::RemovedOldReleases,
        DeployMilestone::Finished,
    ];

    pub fn event_name(self) -> &'static str {
        match self {
            DeployMilestone::Started => "task.deploy.started",
            DeployMilestone::UpdatedRepository => "task.deploy.updated_repository",
            DeployMilestone::CreatedRelease => "task.deploy.created_release",
            DeployMilestone::CreatedSharedFileSymlinks => "task.deploy.created_shared_file_symlinks",
            DeployMilestone::ActivatedRelease => "task.deploy.activated_release",
            DeployMilestone::RemovedOldReleases => "task.deploy.removed_old_releases",
            DeployMilestone::Finished => "task.deploy.finished",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RollbackMilestone {
    Started,
    Finished,
}

impl RollbackMilestone {
    pub const ALL: [RollbackMilestone; 2] = [RollbackMilestone::Started, RollbackMilestone::Finished];

    pub fn event_name(self) -> &'static str {
        match self {
            RollbackMilestone::Started => "task.rollback.started",
            RollbackMilestone::Finished => "task.rollback.finished",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusMilestone {
    Started,
    Finished,
}

impl StatusMilestone {
    pub const ALL: [StatusMilestone; 2] = [StatusMilestone::Started, StatusMilestone::Finished];

    pub fn event_name(self) -> &'static str {
        match self {
            StatusMilestone::Started => "task.status.started",
            StatusMilestone::Finished => "task.status.finished",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployEvent {
    pub environment: String,
    pub release: ReleaseId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RollbackEvent {
    pub environment: String,
    pub roll_back_from: Option<ReleaseId>,
    pub roll_back_to: Option<ReleaseId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusEvent {
    pub environment: String,
    pub current_release: Option<ReleaseId>,
    pub repo_commits_behind_origin: Option<u32>,
}

#[derive(Debug, Clone, Copy)]
pub enum LifecycleEvent<'a> {
    Deploy(DeployMilestone, &'a DeployEvent),
    Rollback(RollbackMilestone, &'a RollbackEvent),
    Status(StatusMilestone, &'a StatusEvent),
}

impl LifecycleEvent<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            LifecycleEvent::Deploy(milestone, _) => milestone.event_name(),
            LifecycleEvent::Rollback(milestone, _) => milestone.event_name(),
            LifecycleEvent::Status(milestone, _) => milestone.event_name(),
        }
    }

    pub fn environment(&self) -> &str {
        match self {
            LifecycleEvent::Deploy(_, event) => &event.environment,
            LifecycleEvent::Rollback(_, event) => &event.environment,
            LifecycleEvent::Status(_, event) => &event.environment,
        }
    }

    /// Payload fields set so far, keyed by their template variable names.
    pub fn variables(&self) -> HashMap<String, String> {
        let mut vars = HashMap::new();
        vars.insert(
            TemplateVars::ENVIRONMENT.to_string(),
            self.environment().to_string(),
        );

        let mut set = |key: &str, value: &Option<ReleaseId>| {
            if let Some(release) = value {
                vars.insert(key.to_string(), release.to_string());
            }
        };

        match self {
            LifecycleEvent::Deploy(_, event) => {
                set(TemplateVars::RELEASE, &Some(event.release.clone()));
            }
            LifecycleEvent::Rollback(_, event) => {
                set(TemplateVars::ROLL_BACK_FROM, &event.roll_back_from);
                set(TemplateVars::ROLL_BACK_TO, &event.roll_back_to);
            }
            LifecycleEvent::Status(_, event) => {
                set(TemplateVars::CURRENT_RELEASE, &event.current_release);
            }
        }

        vars
    }
}

/// Every event name a task can publish, in lifecycle order.
pub fn all_event_names() -> Vec<&'static str> {
    DeployMilestone::ALL
        .iter()
        .map(|m| m.event_name())
        .chain(RollbackMilestone::ALL.iter().map(|m| m.event_name()))
        .chain(StatusMilestone::ALL.iter().map(|m| m.event_name()))
        .collect()
}

pub fn is_known_event(name: &str) -> bool {
    all_event_names().contains(&name)
}

/// Delivers events to plugins synchronously, in registration order.
#[derive(Default)]
pub struct EventBus {
    plugins: Vec<Box<dyn Plugin>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, plugin: impl Plugin + 'static) -> &mut Self {
        self.plugins.push(Box::new(plugin));
        self
    }

    pub fn register_boxed(&mut self, plugin: Box<dyn Plugin>) -> &mut Self {
        self.plugins.push(plugin);
        self
    }

    pub fn plugin_names(&self) -> Vec<String> {
        self.plugins.iter().map(|p| p.name().to_string()).collect()
    }

    /// A plugin error stops delivery and is returned to the task.
    pub fn publish(&self, event: &LifecycleEvent<'_>, ctx: &TaskContext<'_>) -> Result<()> {
        log_status!("events", "{}", event.name());
        for plugin in &self.plugins {
            plugin.on_event(event, ctx)?;
        }
        Ok(())
    }
}
