//! Project configuration: the application being deployed, where its code
//! lives, and every environment it can be deployed to.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::environment::{Environment, Server};
use crate::error::{Error, Result};
use crate::events;
use crate::plugin::{self, HookMap};
use crate::repository::GitRepository;

/// Default configuration file name, looked up in the working directory.
pub const CONFIG_FILE: &str = "shipyard.json";

/// A directory under `<root>/shared` linked into every release.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SharedFileSymlink {
    /// Path below `<root>/shared`.
    pub source: String,
    /// Path below the release directory.
    pub target: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Abort a task when a remote command exits non-zero.
    #[serde(default = "default_true")]
    pub halt_on_command_failure: bool,
    /// Seconds the ssh master connection lingers after the last command.
    #[serde(default = "default_control_persist_secs")]
    pub control_persist_secs: u32,
    /// chmod mode used by the `writable-dirs` plugin.
    #[serde(default = "default_writable_mode")]
    pub writable_mode: String,
}

fn default_true() -> bool {
    true
}

fn default_control_persist_secs() -> u32 {
    60
}

fn default_writable_mode() -> String {
    "775".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            halt_on_command_failure: default_true(),
            control_persist_secs: default_control_persist_secs(),
            writable_mode: default_writable_mode(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub name: String,
    pub repository: GitRepository,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub shared_file_symlinks: Vec<SharedFileSymlink>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub plugins: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub writable_dirs: Vec<String>,
    #[serde(default, skip_serializing_if = "HookMap::is_empty")]
    pub hooks: HookMap,
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub environments: Vec<Environment>,
}

impl Project {
    pub fn new(name: impl Into<String>, repository: GitRepository) -> Self {
        Self {
            name: name.into(),
            repository,
            shared_file_symlinks: Vec::new(),
            plugins: Vec::new(),
            writable_dirs: Vec::new(),
            hooks: HookMap::new(),
            settings: Settings::default(),
            environments: Vec::new(),
        }
    }

    /// The boilerplate written by `shipyard init`.
    pub fn example() -> Self {
        let mut project = Self::new(
            "my-app",
            GitRepository::new("https://example.com/acme/my-app.git"),
        );
        project.add_shared_file_symlink("storage", "app/storage");
        project.add_environment(Environment::new(
            "production",
            "main",
            Server::new("example.com", "deploy"),
            "/var/www/my-app",
        ));
        project
    }

    pub fn add_shared_file_symlink(
        &mut self,
        source: impl Into<String>,
        target: impl Into<String>,
    ) -> &mut Self {
        self.shared_file_symlinks.push(SharedFileSymlink {
            source: source.into(),
            target: target.into(),
        });
        self
    }

    pub fn add_environment(&mut self, environment: Environment) -> &mut Self {
        self.environments.push(environment);
        self
    }

    pub fn environment(&self, label: &str) -> Option<&Environment> {
        self.environments.iter().find(|e| e.label == label)
    }

    /// Like [`Project::environment`], with close matches in the error.
    pub fn require_environment(&self, label: &str) -> Result<&Environment> {
        self.environment(label).ok_or_else(|| {
            let labels: Vec<&str> = self.environments.iter().map(|e| e.label.as_str()).collect();
            Error::environment_not_found(label, find_similar(label, &labels))
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::config_missing_key("name", None));
        }
        if self.repository.location.trim().is_empty() {
            return Err(Error::config_missing_key("repository.location", None));
        }

        let mut labels = HashSet::new();
        for environment in &self.environments {
            environment.validate()?;
            if !labels.insert(environment.label.as_str()) {
                return Err(Error::config_id_collision(&environment.label, "Environment"));
            }
        }

        for link in &self.shared_file_symlinks {
            validate_relative("sharedFileSymlinks.source", &link.source)?;
            validate_relative("sharedFileSymlinks.target", &link.target)?;
        }
        for dir in &self.writable_dirs {
            validate_relative("writableDirs", dir)?;
        }

        for name in &self.plugins {
            plugin::from_name(name, self)?;
        }

        for event in self.hooks.keys() {
            if !events::is_known_event(event) {
                return Err(Error::config_invalid_value(
                    "hooks",
                    Some(event.clone()),
                    "Unknown lifecycle event name",
                ));
            }
        }

        Ok(())
    }

    pub fn from_json_str(content: &str, path: &str) -> Result<Self> {
        let project: Project = serde_json::from_str(content)
            .map_err(|e| Error::config_invalid_json(path, e.to_string()))?;
        project.validate()?;
        Ok(project)
    }

    pub fn from_toml_str(content: &str, path: &str) -> Result<Self> {
        let project: Project = toml::from_str(content)
            .map_err(|e| Error::config_invalid_value(path, None, e.to_string()))?;
        project.validate()?;
        Ok(project)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| Error::internal_json(e.to_string(), Some("serialize project".to_string())))
    }
}

/// Load and validate a project file; `.toml` files are parsed as TOML,
/// everything else as JSON.
pub fn load(path: &Path) -> Result<Project> {
    let display = path.display().to_string();
    if !path.exists() {
        return Err(Error::config_missing_key("project file", Some(display))
            .with_hint("Run 'shipyard init' to create a boilerplate shipyard.json"));
    }

    let content = fs::read_to_string(path)
        .map_err(|e| Error::internal_io(e.to_string(), Some(format!("read {}", display))))?;

    log_status!("config", "Loaded {}", display);

    match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => Project::from_toml_str(&content, &display),
        _ => Project::from_json_str(&content, &display),
    }
}

/// Write the boilerplate project file. Refuses to overwrite unless `force`.
pub fn write_boilerplate(path: &Path, force: bool) -> Result<Project> {
    if path.exists() && !force {
        return Err(Error::validation_invalid_argument(
            "path",
            format!("{} already exists", path.display()),
            None,
        )
        .with_hint("Pass --force to overwrite it"));
    }

    let project = Project::example();
    fs::write(path, project.to_json()? + "\n").map_err(|e| {
        Error::internal_io(e.to_string(), Some(format!("write {}", path.display())))
    })?;
    Ok(project)
}

fn validate_relative(key: &str, path: &str) -> Result<()> {
    let problem = if path.trim().is_empty() {
        Some("Path must not be empty")
    } else if path.starts_with('/') {
        Some("Path must be relative")
    } else if path.split('/').any(|part| part == "..") {
        Some("Path must not contain '..'")
    } else {
        None
    };

    match problem {
        Some(problem) => Err(Error::config_invalid_value(key, Some(path.to_string()), problem)),
        None => Ok(()),
    }
}

// ============================================================================
// Fuzzy Matching
// ============================================================================

/// Levenshtein edit distance between two strings.
fn levenshtein(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let a_len = a_chars.len();
    let b_len = b_chars.len();

    if a_len == 0 {
        return b_len;
    }
    if b_len == 0 {
        return a_len;
    }

    let mut prev_row: Vec<usize> = (0..=b_len).collect();
    let mut curr_row: Vec<usize> = vec![0; b_len + 1];

    for (i, a_char) in a_chars.iter().enumerate() {
        curr_row[0] = i + 1;
        for (j, b_char) in b_chars.iter().enumerate() {
            let cost = if a_char == b_char { 0 } else { 1 };
            curr_row[j + 1] = (prev_row[j + 1] + 1)
                .min(curr_row[j] + 1)
                .min(prev_row[j] + cost);
        }
        std::mem::swap(&mut prev_row, &mut curr_row);
    }

    prev_row[b_len]
}

/// Labels similar to `target`: prefix matches, then suffix matches, then
/// anything within edit distance 3. At most three results.
fn find_similar(target: &str, candidates: &[&str]) -> Vec<String> {
    let target_lower = target.to_lowercase();
    let mut matches: Vec<(String, usize)> = Vec::new();

    for candidate in candidates {
        let lower = candidate.to_lowercase();

        if lower.starts_with(&target_lower) && lower != target_lower {
            matches.push((candidate.to_string(), 0));
            continue;
        }

        if lower.ends_with(&target_lower) {
            matches.push((candidate.to_string(), 1));
            continue;
        }

        let dist = levenshtein(&target_lower, &lower);
        if dist <= 3 && dist > 0 {
            matches.push((candidate.to_string(), dist + 10));
        }
    }

    matches.sort_by_key(|(_, priority)| *priority);
    matches.into_iter().take(3).map(|(id, _)| id).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    const MINIMAL: &str = r#"{
        "name": "blog",
        "repository": { "location": "https://example.com/blog.git" },
        "environments": [
            { "label": "production", "gitBranch": "main", "dir": "/srv/blog",
              "server": { "host": "blog.example.com", "user": "deploy" } }
        ]
    }"#;

    #[test]
    fn minimal_json_uses_defaults() {
        let project = Project::from_json_str(MINIMAL, "shipyard.json").unwrap();
        assert_eq!(project.name, "blog");
        assert!(project.settings.halt_on_command_failure);
        assert_eq!(project.environment("production").unwrap().releases_to_retain, 5);
    }

    #[test]
    fn malformed_toml_is_an_invalid_value() {
        let err = Project::from_toml_str("name = ", "shipyard.toml").unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigInvalidValue);
    }

    #[test]
    fn toml_is_accepted() {
        let content = r#"
name = "blog"

[repository]
location = "https://example.com/blog.git"

[[environments]]
label = "staging"
gitBranch = "develop"
dir = "/srv/blog"
releasesToRetain = 2

[environments.server]
host = "stage.example.com"
user = "deploy"
"#;
        let project = Project::from_toml_str(content, "shipyard.toml").unwrap();
        assert_eq!(project.environment("staging").unwrap().releases_to_retain, 2);
    }

    #[test]
    fn invalid_json_reports_path() {
        let err = Project::from_json_str("{", "shipyard.json").unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigInvalidJson);
        assert_eq!(err.details["path"], "shipyard.json");
    }

    #[test]
    fn duplicate_labels_collide() {
        let mut project = Project::example();
        let duplicate = project.environments[0].clone();
        project.add_environment(duplicate);
        let err = project.validate().unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigIdCollision);
    }

    #[test]
    fn shared_symlink_cannot_escape_release() {
        let mut project = Project::example();
        project.add_shared_file_symlink("storage", "../../etc");
        let err = project.validate().unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigInvalidValue);
    }

    #[test]
    fn unknown_hook_event_is_rejected() {
        let mut project = Project::example();
        project
            .hooks
            .insert("task.deploy.exploded".to_string(), vec!["true".to_string()]);
        assert!(project.validate().is_err());
    }

    #[test]
    fn require_environment_suggests_close_labels() {
        let mut project = Project::example();
        project.add_environment(Environment::new(
            "staging",
            "develop",
            Server::new("stage.example.com", "deploy"),
            "/srv/app",
        ));

        let err = project.require_environment("prod").unwrap_err();
        assert_eq!(err.code, ErrorCode::EnvironmentNotFound);
        assert_eq!(err.details["suggestions"][0], "production");

        let err = project.require_environment("stagign").unwrap_err();
        assert_eq!(err.details["suggestions"][0], "staging");
    }

    #[test]
    fn boilerplate_round_trips_and_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);

        write_boilerplate(&path, false).unwrap();
        let loaded = load(&path).unwrap();
        assert_eq!(loaded, Project::example());

        let err = write_boilerplate(&path, false).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationInvalidArgument);
        assert!(write_boilerplate(&path, true).is_ok());
    }

    #[test]
    fn missing_file_hints_at_init() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(&dir.path().join(CONFIG_FILE)).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigMissingKey);
        assert!(err.hints[0].message.contains("shipyard init"));
    }
}
