use std::cell::RefCell;
use std::process::{Command, Stdio};

use tempfile::TempDir;

use crate::environment::Environment;
use crate::error::{Error, Result};
use crate::executor::{CommandOutput, RemoteExecutor};
use crate::utils::shell::ShellCommand;

/// Exit status ssh reserves for its own (connection) errors.
const SSH_TRANSPORT_EXIT: i32 = 255;

pub struct SshClient {
    pub host: String,
    pub user: String,
    pub port: u16,
    pub identity_file: Option<String>,
    /// When true, all commands run locally instead of over SSH.
    /// Set automatically when the server host is localhost/127.0.0.1/::1.
    pub is_local: bool,
    control_persist_secs: u32,
    /// Directory holding the ControlMaster socket, created on first use.
    control_dir: RefCell<Option<TempDir>>,
}

impl SshClient {
    pub fn from_environment(environment: &Environment) -> Result<Self> {
        let server = &environment.server;
        let identity_file = match &server.identity_file {
            Some(path) if !path.is_empty() => {
                let expanded = shellexpand::tilde(path).to_string();
                if !std::path::Path::new(&expanded).exists() {
                    return Err(Error::ssh_identity_file_not_found(
                        environment.label.clone(),
                        expanded,
                    ));
                }
                Some(expanded)
            }
            _ => None,
        };

        let is_local = is_local_host(&server.host);
        if is_local {
            log_status!(
                "ssh",
                "Environment '{}' is localhost, using local execution",
                environment.label
            );
        }

        Ok(Self {
            host: server.host.clone(),
            user: server.user.clone(),
            port: server.port,
            identity_file,
            is_local,
            control_persist_secs: 60,
            control_dir: RefCell::new(None),
        })
    }

    pub fn with_control_persist(mut self, secs: u32) -> Self {
        self.control_persist_secs = secs;
        self
    }

    pub fn is_connected(&self) -> bool {
        self.control_dir.borrow().is_some()
    }

    fn destination(&self) -> String {
        if self.user.is_empty() {
            self.host.clone()
        } else {
            format!("{}@{}", self.user, self.host)
        }
    }

    /// Control socket path, creating the directory the first time through.
    fn control_path(&self) -> Result<String> {
        let mut control_dir = self.control_dir.borrow_mut();
        if control_dir.is_none() {
            let dir = tempfile::Builder::new()
                .prefix("shipyard-ssh-")
                .tempdir()
                .map_err(|e| {
                    Error::internal_io(e.to_string(), Some("create ssh control dir".to_string()))
                })?;
            log_status!("ssh", "Connecting to {}", self.destination());
            *control_dir = Some(dir);
        }

        match control_dir.as_ref() {
            Some(dir) => Ok(dir.path().join("cm").to_string_lossy().to_string()),
            None => Err(Error::internal_unexpected("ssh control dir missing")),
        }
    }

    fn build_ssh_args(&self, control_path: &str, command: &str) -> Vec<String> {
        let mut args = Vec::new();

        if let Some(identity_file) = &self.identity_file {
            args.push("-i".to_string());
            args.push(identity_file.clone());
        }

        if self.port != 22 {
            args.push("-p".to_string());
            args.push(self.port.to_string());
        }

        args.extend([
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            "ConnectTimeout=10".to_string(),
            "-o".to_string(),
            "ControlMaster=auto".to_string(),
            "-o".to_string(),
            format!("ControlPath={}", control_path),
            "-o".to_string(),
            format!("ControlPersist={}", self.control_persist_secs),
        ]);

        args.push(self.destination());
        args.push(command.to_string());

        args
    }

    fn execute_remote(&self, command: &str) -> Result<CommandOutput> {
        let control_path = self.control_path()?;
        let args = self.build_ssh_args(&control_path, command);

        let output = Command::new("ssh")
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| Error::ssh_connect_failed(self.host.clone(), -1, e.to_string()))?;

        let result = CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
            exit_code: output.status.code().unwrap_or(-1),
        };

        if result.exit_code == SSH_TRANSPORT_EXIT {
            return Err(Error::ssh_connect_failed(
                self.host.clone(),
                result.exit_code,
                result.stderr.trim().to_string(),
            ));
        }

        Ok(result)
    }
}

impl RemoteExecutor for SshClient {
    fn execute(&self, command: &ShellCommand) -> Result<CommandOutput> {
        if self.is_local {
            return execute_local_command(&command.render());
        }
        self.execute_remote(&command.render())
    }

    fn target(&self) -> String {
        self.host.clone()
    }
}

impl Drop for SshClient {
    fn drop(&mut self) {
        let Some(dir) = self.control_dir.get_mut().take() else {
            return;
        };
        let control_path = dir.path().join("cm");
        // Ask the master to exit; errors are irrelevant at this point.
        let _ = Command::new("ssh")
            .arg("-o")
            .arg(format!("ControlPath={}", control_path.display()))
            .arg("-O")
            .arg("exit")
            .arg(self.destination())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
    }
}

pub fn execute_local_command(command: &str) -> Result<CommandOutput> {
    #[cfg(windows)]
    let mut cmd = {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", command]);
        cmd
    };

    #[cfg(not(windows))]
    let mut cmd = {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", command]);
        cmd
    };

    let out = cmd
        .stdin(Stdio::null())
        .output()
        .map_err(|e| Error::internal_io(e.to_string(), Some(format!("spawn '{}'", command))))?;

    Ok(CommandOutput {
        stdout: String::from_utf8_lossy(&out.stdout).to_string(),
        stderr: String::from_utf8_lossy(&out.stderr).to_string(),
        success: out.status.success(),
        exit_code: out.status.code().unwrap_or(-1),
    })
}

/// Check if a host address refers to the local machine.
pub fn is_local_host(host: &str) -> bool {
    matches!(host, "localhost" | "127.0.0.1" | "::1")
}
