use super::Plugin;
use crate::error::Result;
use crate::events::DeployEvent;
use crate::task::TaskContext;
use crate::utils::shell::ShellCommand;

/// Makes directories inside each new release writable once it is created.
pub struct WritableDirsPlugin {
    name: String,
    dirs: Vec<String>,
    mode: String,
}

impl WritableDirsPlugin {
    pub fn new(dirs: Vec<String>, mode: impl Into<String>) -> Self {
        Self {
            name: "writable-dirs".to_string(),
            dirs,
            mode: mode.into(),
        }
    }

    /// Laravel 4 keeps its writable cache and logs under `app/storage`.
    pub fn laravel() -> Self {
        Self {
            name: "laravel".to_string(),
            dirs: vec!["app/storage".to_string()],
            mode: "777".to_string(),
        }
    }
}

impl Plugin for WritableDirsPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn deploy_created_release(&self, event: &DeployEvent, ctx: &TaskContext<'_>) -> Result<()> {
        for dir in &self.dirs {
            let path = ctx.layout().release_entry(&event.release, dir);
            ctx.run(ShellCommand::new("chmod").arg("-R").arg(&self.mode).arg(&path))?;
            ctx.info(format!(
                "Set writable permissions on /{} directory.",
                dir.trim_matches('/')
            ));
        }
        Ok(())
    }
}
