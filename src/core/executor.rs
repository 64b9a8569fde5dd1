// Remote command execution seam between the tasks and the transport.

use crate::environment::Environment;
use crate::error::Result;
use crate::ssh::SshClient;
use crate::utils::shell::ShellCommand;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
    pub exit_code: i32,
}

impl CommandOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            success: true,
            exit_code: 0,
        }
    }

    pub fn failed(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            success: false,
            exit_code,
        }
    }

    /// Stdout followed by stderr, the way an interactive shell would show them.
    pub fn combined(&self) -> String {
        if self.stderr.is_empty() {
            return self.stdout.clone();
        }
        if self.stdout.is_empty() {
            return self.stderr.clone();
        }
        let mut combined = self.stdout.clone();
        if !combined.ends_with('\n') {
            combined.push('\n');
        }
        combined.push_str(&self.stderr);
        combined
    }
}

/// Runs one command on the target host and waits for it to finish.
///
/// `Err` is reserved for transport failures (cannot connect, cannot spawn).
/// A command that ran and exited non-zero is an `Ok` with `success == false`.
pub trait RemoteExecutor {
    fn execute(&self, command: &ShellCommand) -> Result<CommandOutput>;

    /// Host description used in error details.
    fn target(&self) -> String;
}

impl<T: RemoteExecutor + ?Sized> RemoteExecutor for &T {
    fn execute(&self, command: &ShellCommand) -> Result<CommandOutput> {
        (**self).execute(command)
    }

    fn target(&self) -> String {
        (**self).target()
    }
}

impl<T: RemoteExecutor + ?Sized> RemoteExecutor for Box<T> {
    fn execute(&self, command: &ShellCommand) -> Result<CommandOutput> {
        (**self).execute(command)
    }

    fn target(&self) -> String {
        (**self).target()
    }
}

/// Produces an executor for an environment. Building one must not connect.
pub trait Transport {
    fn executor<'a>(&'a self, environment: &Environment) -> Result<Box<dyn RemoteExecutor + 'a>>;
}

/// Transport backed by the system `ssh` binary.
#[derive(Debug, Clone)]
pub struct SshTransport {
    pub control_persist_secs: u32,
}

impl Default for SshTransport {
    fn default() -> Self {
        Self {
            control_persist_secs: 60,
        }
    }
}

impl Transport for SshTransport {
    fn executor<'a>(&'a self, environment: &Environment) -> Result<Box<dyn RemoteExecutor + 'a>> {
        let client = SshClient::from_environment(environment)?
            .with_control_persist(self.control_persist_secs);
        Ok(Box::new(client))
    }
}
