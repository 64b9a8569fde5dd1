//! Configured shell commands that run on the target host at named lifecycle
//! events.
//!
//! ```json
//! "hooks": {
//!   "task.deploy.created_release": ["cd {{releaseDir}} && composer install --no-dev"],
//!   "task.rollback.finished": ["sudo systemctl reload php-fpm"]
//! }
//! ```

use std::collections::BTreeMap;

use super::Plugin;
use crate::error::Result;
use crate::events::LifecycleEvent;
use crate::task::TaskContext;
use crate::utils::shell::ShellCommand;
use crate::utils::template::{render_map, TemplateVars};

/// A map of event names to command lists.
pub type HookMap = BTreeMap<String, Vec<String>>;

pub struct HooksPlugin {
    hooks: HookMap,
}

impl HooksPlugin {
    pub fn new(hooks: HookMap) -> Self {
        Self { hooks }
    }

    /// Commands for an event with placeholders filled from the event payload.
    pub fn resolve(&self, event: &LifecycleEvent<'_>, ctx: &TaskContext<'_>) -> Vec<String> {
        let Some(commands) = self.hooks.get(event.name()) else {
            return Vec::new();
        };

        let layout = ctx.layout();
        let mut vars = event.variables();
        vars.insert(TemplateVars::ROOT_DIR.to_string(), layout.root().to_string());
        if let LifecycleEvent::Deploy(_, payload) = event {
            vars.insert(
                TemplateVars::RELEASE_DIR.to_string(),
                layout.release(&payload.release),
            );
        }

        commands.iter().map(|c| render_map(c, &vars)).collect()
    }
}

impl Plugin for HooksPlugin {
    fn name(&self) -> &str {
        "hooks"
    }

    fn on_event(&self, event: &LifecycleEvent<'_>, ctx: &TaskContext<'_>) -> Result<()> {
        let commands = self.resolve(event, ctx);
        if commands.is_empty() {
            return Ok(());
        }

        for command in &commands {
            ctx.run(ShellCommand::raw(command.clone()))?;
        }
        ctx.info(format!(
            "Ran {} hook command(s) for {}.",
            commands.len(),
            event.name()
        ));
        Ok(())
    }
}
