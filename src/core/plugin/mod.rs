//! Plugins observe lifecycle events to add side effects without touching the
//! tasks themselves.
//!
//! A plugin implements the methods for the events it cares about; every
//! method defaults to doing nothing. Plugins that treat all events the same
//! way can override [`Plugin::on_event`] instead.

mod hooks;
mod writable;

pub use hooks::{HookMap, HooksPlugin};
pub use writable::WritableDirsPlugin;

use crate::error::{Error, Result};
use crate::events::{
    DeployEvent, DeployMilestone, LifecycleEvent, RollbackEvent, RollbackMilestone, StatusEvent,
    StatusMilestone,
};
use crate::project::Project;
use crate::task::TaskContext;

pub trait Plugin {
    fn name(&self) -> &str;

    fn deploy_started(&self, _event: &DeployEvent, _ctx: &TaskContext<'_>) -> Result<()> {
        Ok(())
    }

    fn deploy_updated_repository(&self, _event: &DeployEvent, _ctx: &TaskContext<'_>) -> Result<()> {
        Ok(())
    }

    fn deploy_created_release(&self, _event: &DeployEvent, _ctx: &TaskContext<'_>) -> Result<()> {
        Ok(())
    }

    fn deploy_created_shared_file_symlinks(
        &self,
        _event: &DeployEvent,
        _ctx: &TaskContext<'_>,
    ) -> Result<()> {
        Ok(())
    }

    fn deploy_activated_release(&self, _event: &DeployEvent, _ctx: &TaskContext<'_>) -> Result<()> {
        Ok(())
    }

    fn deploy_removed_old_releases(&self, _event: &DeployEvent, _ctx: &TaskContext<'_>) -> Result<()> {
        Ok(())
    }

    fn deploy_finished(&self, _event: &DeployEvent, _ctx: &TaskContext<'_>) -> Result<()> {
        Ok(())
    }

    fn rollback_started(&self, _event: &RollbackEvent, _ctx: &TaskContext<'_>) -> Result<()> {
        Ok(())
    }

    fn rollback_finished(&self, _event: &RollbackEvent, _ctx: &TaskContext<'_>) -> Result<()> {
        Ok(())
    }

    fn status_started(&self, _event: &StatusEvent, _ctx: &TaskContext<'_>) -> Result<()> {
        Ok(())
    }

    fn status_finished(&self, _event: &StatusEvent, _ctx: &TaskContext<'_>) -> Result<()> {
        Ok(())
    }

    /// Route an event to its method.
    fn on_event(&self, event: &LifecycleEvent<'_>, ctx: &TaskContext<'_>) -> Result<()> {
        match *event {
            LifecycleEvent::Deploy(milestone, payload) => match milestone {
                DeployMilestone::Started => self.deploy_started(payload, ctx),
                DeployMilestone::UpdatedRepository => self.deploy_updated_repository(payload, ctx),
                DeployMilestone::CreatedRelease => self.deploy_created_release(payload, ctx),
                DeployMilestone::CreatedSharedFileSymlinks => {
                    self.deploy_created_shared_file_symlinks(payload, ctx)
                }
                DeployMilestone::ActivatedRelease => self.deploy_activated_release(payload, ctx),
                DeployMilestone::RemovedOldReleases => self.deploy_removed_old_releases(payload, ctx),
                DeployMilestone::Finished => self.deploy_finished(payload, ctx),
            },
            LifecycleEvent::Rollback(milestone, payload) => match milestone {
                RollbackMilestone::Started => self.rollback_started(payload, ctx),
                RollbackMilestone::Finished => self.rollback_finished(payload, ctx),
            },
            LifecycleEvent::Status(milestone, payload) => match milestone {
                StatusMilestone::Started => self.status_started(payload, ctx),
                StatusMilestone::Finished => self.status_finished(payload, ctx),
            },
        }
    }
}

/// Names accepted in the project's `plugins` list.
pub const BUILTIN_PLUGINS: &[&str] = &["laravel", "writable-dirs"];

/// Instantiate a built-in plugin by its configured name.
pub fn from_name(name: &str, project: &Project) -> Result<Box<dyn Plugin>> {
    match name {
        "laravel" => Ok(Box::new(WritableDirsPlugin::laravel())),
        "writable-dirs" => Ok(Box::new(WritableDirsPlugin::new(
            project.writable_dirs.clone(),
            project.settings.writable_mode.clone(),
        ))),
        other => Err(Error::config_invalid_value(
            "plugins",
            Some(other.to_string()),
            format!("Unknown plugin; expected one of: {}", BUILTIN_PLUGINS.join(", ")),
        )),
    }
}

/// Plugins configured for a project, in declaration order, with the hooks
/// plugin last when any hooks are defined.
pub fn configured(project: &Project) -> Result<Vec<Box<dyn Plugin>>> {
    let mut plugins = project
        .plugins
        .iter()
        .map(|name| from_name(name, project))
        .collect::<Result<Vec<_>>>()?;

    if !project.hooks.is_empty() {
        plugins.push(Box::new(HooksPlugin::new(project.hooks.clone())));
    }

    Ok(plugins)
}
