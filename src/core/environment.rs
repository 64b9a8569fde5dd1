use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::layout::RemoteLayout;

/// SSH connection settings for an environment's host.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Server {
    pub host: String,
    #[serde(default)]
    pub user: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity_file: Option<String>,
}

fn default_port() -> u16 {
    22
}

impl Server {
    pub fn new(host: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            user: user.into(),
            port: default_port(),
            identity_file: None,
        }
    }
}

/// A deployment target: where a project is (or will be) deployed to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Environment {
    pub label: String,
    pub git_branch: String,
    pub dir: String,
    pub server: Server,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pre_task_commands: Vec<String>,
    #[serde(default = "default_releases_to_retain")]
    pub releases_to_retain: u32,
}

fn default_releases_to_retain() -> u32 {
    5
}

impl Environment {
    pub fn new(
        label: impl Into<String>,
        git_branch: impl Into<String>,
        server: Server,
        dir: impl Into<String>,
    ) -> Self {
        Self {
            label: label.into(),
            git_branch: git_branch.into(),
            dir: dir.into(),
            server,
            pre_task_commands: Vec::new(),
            releases_to_retain: default_releases_to_retain(),
        }
    }

    pub fn add_pre_task_command(&mut self, command: impl Into<String>) -> &mut Self {
        self.pre_task_commands.push(command.into());
        self
    }

    pub fn set_releases_to_retain(&mut self, number: u32) -> &mut Self {
        self.releases_to_retain = number;
        self
    }

    pub fn has_pre_task_commands(&self) -> bool {
        !self.pre_task_commands.is_empty()
    }

    pub fn layout(&self) -> RemoteLayout {
        RemoteLayout::new(&self.dir)
    }

    pub fn validate(&self) -> Result<()> {
        let key = |field: &str| format!("environments.{}.{}", self.label, field);

        if self.label.trim().is_empty() {
            return Err(Error::config_missing_key("environments[].label", None));
        }
        if self.git_branch.trim().is_empty() {
            return Err(Error::config_missing_key(key("gitBranch"), None));
        }
        if !self.dir.starts_with('/') {
            return Err(Error::config_invalid_value(
                key("dir"),
                Some(self.dir.clone()),
                "Deployment directory must be an absolute path",
            ));
        }
        if self.server.host.trim().is_empty() {
            return Err(Error::config_missing_key(key("server.host"), None));
        }
        Ok(())
    }
}
