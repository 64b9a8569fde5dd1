//! Deploy, rollback and status tasks.
//!
//! A task runs against one environment. It resolves that environment from
//! the [`AppContext`] before touching the network, obtains an executor from
//! the [`Transport`], then drives remote commands one at a time through a
//! [`TaskContext`], publishing a lifecycle event after each milestone.

mod deploy;
mod rollback;
mod status;

pub use deploy::{DeployReport, DeployTask};
pub use rollback::{RollbackOutcome, RollbackReport, RollbackTask};
pub use status::{StatusReport, StatusTask};

use serde::Serialize;
use std::cell::RefCell;

use crate::environment::Environment;
use crate::error::{Error, RemoteCommandFailedDetails, Result, TargetDetails};
use crate::events::{EventBus, LifecycleEvent};
use crate::executor::{CommandOutput, RemoteExecutor, Transport};
use crate::layout::RemoteLayout;
use crate::messages::Messenger;
use crate::plugin;
use crate::project::Project;
use crate::release::{self, ReleaseId};
use crate::utils::shell::ShellCommand;

pub trait Task {
    type Report: Serialize;

    fn name(&self) -> &'static str;

    fn environment_label(&self) -> &str;

    fn run(&self, app: &AppContext, transport: &dyn Transport) -> Result<Self::Report>;
}

/// Everything a task reads but never changes: the project, the plugins
/// listening for events, and the sinks receiving messages.
pub struct AppContext {
    pub project: Project,
    pub events: EventBus,
    pub messenger: Messenger,
}

impl AppContext {
    pub fn new(project: Project, events: EventBus, messenger: Messenger) -> Self {
        Self {
            project,
            events,
            messenger,
        }
    }

    /// Context with the project's configured plugins registered.
    pub fn from_project(project: Project, messenger: Messenger) -> Result<Self> {
        let mut events = EventBus::new();
        for plugin in plugin::configured(&project)? {
            events.register_boxed(plugin);
        }
        Ok(Self::new(project, events, messenger))
    }

    pub fn environment(&self, label: &str) -> Result<&Environment> {
        self.project.require_environment(label)
    }
}

/// Per-run state shared by a task and the plugins it notifies.
pub struct TaskContext<'a> {
    app: &'a AppContext,
    environment: &'a Environment,
    layout: RemoteLayout,
    executor: Box<dyn RemoteExecutor + 'a>,
    transcript: RefCell<Vec<String>>,
}

impl<'a> TaskContext<'a> {
    /// Resolve the environment, then build (but do not connect) an executor.
    pub fn begin(app: &'a AppContext, transport: &'a dyn Transport, label: &str) -> Result<Self> {
        let environment = app.environment(label)?;
        let executor = transport.executor(environment)?;
        Ok(Self::new(app, environment, executor))
    }

    pub fn new(
        app: &'a AppContext,
        environment: &'a Environment,
        executor: Box<dyn RemoteExecutor + 'a>,
    ) -> Self {
        Self {
            app,
            environment,
            layout: environment.layout(),
            executor,
            transcript: RefCell::new(Vec::new()),
        }
    }

    pub fn project(&self) -> &Project {
        &self.app.project
    }

    pub fn environment(&self) -> &Environment {
        self.environment
    }

    pub fn layout(&self) -> &RemoteLayout {
        &self.layout
    }

    pub fn messenger(&self) -> &Messenger {
        &self.app.messenger
    }

    /// Send an info message and keep it for the task report.
    pub fn info(&self, text: impl Into<String>) {
        let text = text.into();
        self.transcript.borrow_mut().push(text.clone());
        self.app.messenger.info(text);
    }

    /// Info messages sent so far during this run.
    pub fn transcript(&self) -> Vec<String> {
        self.transcript.borrow().clone()
    }

    pub fn publish(&self, event: LifecycleEvent<'_>) -> Result<()> {
        self.app.events.publish(&event, self)
    }

    /// Run a command whose failure should stop the task.
    pub fn run(&self, command: ShellCommand) -> Result<CommandOutput> {
        let shown = command.render();
        self.run_as(command, &shown)
    }

    /// Like [`TaskContext::run`], with `shown` standing in for the command in
    /// messages and errors (used when the command line carries credentials).
    pub fn run_as(&self, command: ShellCommand, shown: &str) -> Result<CommandOutput> {
        let output = self.execute(&command, shown)?;
        if !output.success && self.app.project.settings.halt_on_command_failure {
            return Err(Error::remote_command_failed(RemoteCommandFailedDetails {
                command: shown.to_string(),
                exit_code: output.exit_code,
                stdout: output.stdout,
                stderr: output.stderr,
                target: TargetDetails {
                    environment: Some(self.environment.label.clone()),
                    host: Some(self.executor.target()),
                },
            }));
        }
        Ok(output)
    }

    /// Run a command whose output is inspected; exit status is never an error.
    pub fn probe(&self, command: ShellCommand) -> Result<CommandOutput> {
        let shown = command.render();
        self.execute(&command, &shown)
    }

    fn execute(&self, command: &ShellCommand, shown: &str) -> Result<CommandOutput> {
        let output = self.executor.execute(command)?;
        self.app.messenger.command_debug(shown, &output.combined());
        Ok(output)
    }

    pub fn run_pre_task_commands(&self) -> Result<()> {
        if !self.environment.has_pre_task_commands() {
            return Ok(());
        }
        for command in &self.environment.pre_task_commands {
            self.run(ShellCommand::raw(command.clone()))?;
        }
        self.info("Finished running pre-task SSH commands.");
        Ok(())
    }

    /// The release `current` points at, if it resolves to a release id.
    pub fn current_release(&self) -> Result<Option<ReleaseId>> {
        let command = ShellCommand::new("basename").substitute(
            ShellCommand::new("readlink")
                .arg("-f")
                .arg(self.layout.current()),
        );
        let output = self.probe(command)?;
        Ok(ReleaseId::parse(output.stdout.trim()))
    }

    /// Release ids under `releases/`, ascending.
    pub fn list_releases(&self) -> Result<Vec<ReleaseId>> {
        let output = self.probe(ShellCommand::new("ls").arg("-1").arg(self.layout.releases()))?;
        Ok(release::parse_listing(&output.stdout))
    }

    /// Point `current` at a release in a single symlink replacement.
    pub fn activate(&self, release: &ReleaseId) -> Result<()> {
        self.run(
            ShellCommand::new("ln")
                .arg("-sfn")
                .arg(self.layout.release(release))
                .arg(self.layout.current()),
        )?;
        Ok(())
    }
}

/// "<id> (created on <date>)"
pub(crate) fn describe_release(release: &ReleaseId) -> String {
    format!("{} (created on {})", release, release.created_on())
}
