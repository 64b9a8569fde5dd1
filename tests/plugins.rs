mod common;

use std::cell::RefCell;
use std::rc::Rc;

use common::{app, app_with, id, project, FakeHost, ROOT};
use shipyard::events::{DeployEvent, EventBus, LifecycleEvent, RollbackEvent};
use shipyard::plugin::{HooksPlugin, Plugin};
use shipyard::release::ReleaseId;
use shipyard::task::{AppContext, DeployTask, RollbackTask, StatusTask, Task, TaskContext};
use shipyard::{Error, ErrorCode, Result};

type Log = Rc<RefCell<Vec<String>>>;

struct Recorder {
    name: &'static str,
    log: Log,
}

impl Plugin for Recorder {
    fn name(&self) -> &str {
        self.name
    }

    fn on_event(&self, event: &LifecycleEvent<'_>, _ctx: &TaskContext<'_>) -> Result<()> {
        self.log
            .borrow_mut()
            .push(format!("{}:{}", self.name, event.name()));
        Ok(())
    }
}

/// Captures the rollback payload as each event sees it.
struct RollbackWatcher {
    seen: Rc<RefCell<Vec<(Option<String>, Option<String>)>>>,
}

impl Plugin for RollbackWatcher {
    fn name(&self) -> &str {
        "watcher"
    }

    fn rollback_started(&self, event: &RollbackEvent, _ctx: &TaskContext<'_>) -> Result<()> {
        self.record(event);
        Ok(())
    }

    fn rollback_finished(&self, event: &RollbackEvent, _ctx: &TaskContext<'_>) -> Result<()> {
        self.record(event);
        Ok(())
    }
}

impl RollbackWatcher {
    fn record(&self, event: &RollbackEvent) {
        self.seen.borrow_mut().push((
            event.roll_back_from.as_ref().map(|r| r.to_string()),
            event.roll_back_to.as_ref().map(|r| r.to_string()),
        ));
    }
}

struct Veto;

impl Plugin for Veto {
    fn name(&self) -> &str {
        "veto"
    }

    fn deploy_created_release(&self, _event: &DeployEvent, _ctx: &TaskContext<'_>) -> Result<()> {
        Err(Error::validation_invalid_argument(
            "release",
            "Refusing to activate on a Friday",
            None,
        ))
    }
}

fn recorders(log: &Log) -> EventBus {
    let mut events = EventBus::new();
    events
        .register(Recorder {
            name: "first",
            log: log.clone(),
        })
        .register(Recorder {
            name: "second",
            log: log.clone(),
        });
    events
}

fn release(n: u32) -> ReleaseId {
    ReleaseId::parse(&id(n)).unwrap()
}

#[test]
fn deploy_events_fire_in_order_for_each_plugin() {
    let log: Log = Rc::default();
    let host = FakeHost::new();
    let mut project = project();
    project.add_shared_file_symlink("storage", "storage");
    let (app, _) = app_with(project, recorders(&log));

    DeployTask::new("production")
        .with_release(release(1))
        .run(&app, &host)
        .unwrap();

    let events = [
        "task.deploy.started",
        "task.deploy.updated_repository",
        "task.deploy.created_release",
        "task.deploy.created_shared_file_symlinks",
        "task.deploy.activated_release",
        "task.deploy.removed_old_releases",
        "task.deploy.finished",
    ];
    let expected: Vec<String> = events
        .iter()
        .flat_map(|e| [format!("first:{}", e), format!("second:{}", e)])
        .collect();
    assert_eq!(*log.borrow(), expected);
}

#[test]
fn shared_symlink_event_is_skipped_without_mappings() {
    let log: Log = Rc::default();
    let host = FakeHost::new();
    let (app, _) = app_with(project(), recorders(&log));

    DeployTask::new("production")
        .with_release(release(1))
        .run(&app, &host)
        .unwrap();

    assert!(!log
        .borrow()
        .iter()
        .any(|e| e.ends_with("created_shared_file_symlinks")));
}

#[test]
fn rollback_payload_fills_in_as_the_task_progresses() {
    let seen = Rc::default();
    let mut events = EventBus::new();
    events.register(RollbackWatcher {
        seen: Rc::clone(&seen),
    });
    let host = FakeHost::with_releases(&[id(1).as_str(), id(2).as_str()]);
    host.point_current_at(&id(2));
    let (app, _) = app_with(project(), events);

    RollbackTask::new("production").run(&app, &host).unwrap();

    assert_eq!(
        *seen.borrow(),
        vec![(None, None), (Some(id(2)), Some(id(1)))]
    );
}

#[test]
fn negative_rollback_never_publishes_finished() {
    let log: Log = Rc::default();
    let host = FakeHost::with_releases(&[id(1).as_str()]);
    host.point_current_at(&id(1));
    let (app, _) = app_with(project(), recorders(&log));

    RollbackTask::new("production").run(&app, &host).unwrap();

    assert_eq!(
        *log.borrow(),
        vec!["first:task.rollback.started", "second:task.rollback.started"]
    );
}

#[test]
fn status_publishes_started_and_finished() {
    let log: Log = Rc::default();
    let host = FakeHost::new();
    let (app, _) = app_with(project(), recorders(&log));

    StatusTask::new("production").run(&app, &host).unwrap();

    assert_eq!(
        *log.borrow(),
        vec![
            "first:task.status.started",
            "second:task.status.started",
            "first:task.status.finished",
            "second:task.status.finished",
        ]
    );
}

#[test]
fn plugin_error_aborts_the_task() {
    let mut events = EventBus::new();
    events.register(Veto);
    let host = FakeHost::new();
    let (app, buffer) = app_with(project(), events);

    let err = DeployTask::new("production")
        .with_release(release(1))
        .run(&app, &host)
        .unwrap_err();

    assert_eq!(err.code, ErrorCode::ValidationInvalidArgument);
    assert_eq!(host.current(), None);
    assert!(!buffer.texts().contains(&"Created release.".to_string()));
}

#[test]
fn laravel_plugin_opens_up_storage() {
    let host = FakeHost::new();
    let mut project = project();
    project.plugins = vec!["laravel".to_string()];
    let (app, _) = app(project);
    let app = AppContext::from_project(app.project, app.messenger).unwrap();

    let report = DeployTask::new("production")
        .with_release(release(1))
        .run(&app, &host)
        .unwrap();

    let chmod = format!("chmod -R 777 {ROOT}/releases/{}/app/storage", id(1));
    let commands = host.commands();
    let chmod_at = commands.iter().position(|c| *c == chmod).unwrap();
    let activate_at = commands.iter().position(|c| c.starts_with("ln -sfn")).unwrap();
    assert!(chmod_at < activate_at);
    assert!(report
        .messages
        .contains(&"Set writable permissions on /app/storage directory.".to_string()));
}

#[test]
fn writable_dirs_plugin_uses_configured_mode() {
    let host = FakeHost::new();
    let mut project = project();
    project.plugins = vec!["writable-dirs".to_string()];
    project.writable_dirs = vec!["var/cache".to_string(), "var/log".to_string()];
    project.settings.writable_mode = "775".to_string();
    let (app, _) = app(project);
    let app = AppContext::from_project(app.project, app.messenger).unwrap();

    DeployTask::new("production")
        .with_release(release(1))
        .run(&app, &host)
        .unwrap();

    let chmods: Vec<String> = host
        .commands()
        .into_iter()
        .filter(|c| c.starts_with("chmod"))
        .collect();
    assert_eq!(
        chmods,
        vec![
            format!("chmod -R 775 {ROOT}/releases/{}/var/cache", id(1)),
            format!("chmod -R 775 {ROOT}/releases/{}/var/log", id(1)),
        ]
    );
}

#[test]
fn hooks_render_event_variables() {
    let host = FakeHost::with_releases(&[id(1).as_str(), id(2).as_str()]);
    host.point_current_at(&id(2));
    let mut project = project();
    project.hooks.insert(
        "task.deploy.activated_release".to_string(),
        vec!["cd {{releaseDir}} && ./artisan migrate --env={{environment}}".to_string()],
    );
    project.hooks.insert(
        "task.rollback.finished".to_string(),
        vec!["echo {{rollBackFrom}} to {{rollBackTo}} in {{rootDir}}".to_string()],
    );
    let (app, _) = app(project);
    let app = AppContext::from_project(app.project, app.messenger).unwrap();
    assert_eq!(app.events.plugin_names(), vec!["hooks"]);

    DeployTask::new("production")
        .with_release(release(3))
        .run(&app, &host)
        .unwrap();
    RollbackTask::new("production").run(&app, &host).unwrap();

    let commands = host.commands();
    assert!(commands.contains(&format!(
        "cd {ROOT}/releases/{} && ./artisan migrate --env=production",
        id(3)
    )));
    assert!(commands.contains(&format!("echo {} to {} in {ROOT}", id(3), id(2))));
}

#[test]
fn hook_failure_halts_the_task() {
    let host = FakeHost::new();
    host.fail_on("./artisan");
    let mut hooks = shipyard::plugin::HookMap::new();
    hooks.insert(
        "task.deploy.created_release".to_string(),
        vec!["cd {{releaseDir}} && ./artisan optimize".to_string()],
    );
    let mut events = EventBus::new();
    events.register(HooksPlugin::new(hooks));
    let (app, _) = app_with(project(), events);

    let err = DeployTask::new("production")
        .with_release(release(1))
        .run(&app, &host)
        .unwrap_err();

    assert_eq!(err.code, ErrorCode::RemoteCommandFailed);
    assert_eq!(host.current(), None);
}
