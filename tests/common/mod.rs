#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;

use shipyard::environment::{Environment, Server};
use shipyard::events::EventBus;
use shipyard::executor::{CommandOutput, RemoteExecutor, Transport};
use shipyard::messages::{BufferSink, MessageType, Messenger};
use shipyard::project::Project;
use shipyard::repository::GitRepository;
use shipyard::task::AppContext;
use shipyard::utils::shell::ShellCommand;
use shipyard::Result;

pub const ROOT: &str = "/srv/app";

/// In-memory stand-in for a deployment host. Understands the handful of
/// command shapes the tasks send and records every command line it sees.
#[derive(Default)]
pub struct FakeHost {
    pub releases: RefCell<BTreeSet<String>>,
    /// Non-release entries under `releases/`.
    pub strays: RefCell<Vec<String>>,
    pub current: RefCell<Option<String>>,
    pub repo_exists: Cell<bool>,
    pub repo_populated: Cell<bool>,
    pub git_status: RefCell<String>,
    /// Any command containing this fails with exit status 1.
    pub fail_on: RefCell<Option<String>>,
    pub commands: RefCell<Vec<String>>,
    pub executors_built: Cell<usize>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_releases(releases: &[&str]) -> Self {
        let host = Self::new();
        host.repo_exists.set(true);
        host.repo_populated.set(true);
        host.releases
            .borrow_mut()
            .extend(releases.iter().map(|r| r.to_string()));
        host
    }

    pub fn point_current_at(&self, release: &str) {
        *self.current.borrow_mut() = Some(release.to_string());
    }

    pub fn fail_on(&self, fragment: &str) {
        *self.fail_on.borrow_mut() = Some(fragment.to_string());
    }

    pub fn release_names(&self) -> Vec<String> {
        self.releases.borrow().iter().cloned().collect()
    }

    pub fn current(&self) -> Option<String> {
        self.current.borrow().clone()
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.borrow().clone()
    }

    /// Commands that change the host, in order.
    pub fn mutations(&self) -> Vec<String> {
        self.commands()
            .into_iter()
            .filter(|c| {
                c.starts_with("ln ")
                    || c.starts_with("rm ")
                    || c.starts_with("git clone")
                    || c.starts_with(&format!("mkdir -p {}/releases/", ROOT))
            })
            .collect()
    }

    fn respond(&self, line: &str) -> CommandOutput {
        let releases_dir = format!("{}/releases", ROOT);
        let repo = format!("{}/repo", ROOT);

        if let Some(fragment) = self.fail_on.borrow().as_deref() {
            if line.contains(fragment) {
                return CommandOutput::failed(1, "boom");
            }
        }

        if line == format!("mkdir -p {repo} && ls -A {repo} | wc -l") {
            self.repo_exists.set(true);
            let count = if self.repo_populated.get() { "14" } else { "0" };
            return CommandOutput::ok(format!("{}\n", count));
        }
        if line.starts_with("git clone ") {
            self.repo_populated.set(true);
            return CommandOutput::ok("Cloning into 'repo'...\n");
        }
        if line == format!("cd {}", repo) {
            return if self.repo_exists.get() {
                CommandOutput::ok("")
            } else {
                CommandOutput::failed(2, format!("sh: cd: {}: No such file or directory", repo))
            };
        }
        if line == format!("cd {repo} && git fetch && git status") {
            return CommandOutput::ok(self.git_status.borrow().clone());
        }
        if line == format!("ls -1 {}", releases_dir) {
            let mut names: Vec<String> = self.strays.borrow().clone();
            names.extend(self.release_names());
            names.sort();
            return CommandOutput::ok(names.join("\n") + "\n");
        }
        if line == format!("basename \"$(readlink -f {}/current)\"", ROOT) {
            return CommandOutput::ok(format!(
                "{}\n",
                self.current().unwrap_or_else(|| "current".to_string())
            ));
        }
        if let Some(rest) = line.strip_prefix(&format!("test -e {}/", releases_dir)) {
            let id = rest.trim_end_matches(" && echo exists");
            return if self.releases.borrow().contains(id) {
                CommandOutput::ok("exists\n")
            } else {
                CommandOutput::failed(1, "")
            };
        }
        if let Some(id) = line.strip_prefix(&format!("mkdir -p {}/", releases_dir)) {
            self.releases.borrow_mut().insert(id.to_string());
            return CommandOutput::ok("");
        }
        if let Some(rest) = line.strip_prefix(&format!("ln -sfn {}/", releases_dir)) {
            if let Some(id) = rest.strip_suffix(&format!(" {}/current", ROOT)) {
                *self.current.borrow_mut() = Some(id.to_string());
            }
            return CommandOutput::ok("");
        }
        if let Some(id) = line.strip_prefix(&format!("rm -rf {}/", releases_dir)) {
            self.releases.borrow_mut().remove(id);
            return CommandOutput::ok("");
        }

        CommandOutput::ok("")
    }
}

impl RemoteExecutor for FakeHost {
    fn execute(&self, command: &ShellCommand) -> Result<CommandOutput> {
        let line = command.render();
        self.commands.borrow_mut().push(line.clone());
        Ok(self.respond(&line))
    }

    fn target(&self) -> String {
        "app.example.com".to_string()
    }
}

impl Transport for FakeHost {
    fn executor<'a>(&'a self, _environment: &Environment) -> Result<Box<dyn RemoteExecutor + 'a>> {
        self.executors_built.set(self.executors_built.get() + 1);
        Ok(Box::new(self))
    }
}

pub fn project() -> Project {
    let mut project = Project::new("acme-shop", GitRepository::new("https://git.example.com/acme/shop.git"));
    project.add_environment(Environment::new(
        "production",
        "main",
        Server::new("app.example.com", "deploy"),
        ROOT,
    ));
    project
}

/// An application context whose messages, info and debug alike, land in the
/// returned buffer.
pub fn app_with(project: Project, events: EventBus) -> (AppContext, BufferSink) {
    let buffer = BufferSink::new();
    let mut messenger = Messenger::new();
    messenger.add_sink(buffer.clone(), MessageType::INFO | MessageType::DEBUG);
    (AppContext::new(project, events, messenger), buffer)
}

pub fn app(project: Project) -> (AppContext, BufferSink) {
    app_with(project, EventBus::new())
}

/// Ten-digit ids for scenario numbering: `id(3)` is `1700000300`.
pub fn id(n: u32) -> String {
    format!("{}", 1_700_000_000 + n * 100)
}
