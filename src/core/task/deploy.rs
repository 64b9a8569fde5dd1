use serde::Serialize;

use super::{AppContext, Task, TaskContext};
use crate::error::{Error, Result};
use crate::events::{DeployEvent, DeployMilestone, LifecycleEvent};
use crate::executor::Transport;
use crate::release::{self, ReleaseId};
use crate::utils::shell::ShellCommand;

/// Deploys the configured branch as a new release and activates it.
pub struct DeployTask {
    environment: String,
    release: Option<ReleaseId>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployReport {
    pub environment: String,
    pub release: ReleaseId,
    /// True when the working copy had to be cloned first.
    pub cloned_repository: bool,
    pub shared_symlinks: Vec<String>,
    pub removed_releases: Vec<ReleaseId>,
    pub messages: Vec<String>,
}

impl DeployTask {
    pub fn new(environment: impl Into<String>) -> Self {
        Self {
            environment: environment.into(),
            release: None,
        }
    }

    /// Use a fixed release id instead of the current time.
    pub fn with_release(mut self, release: ReleaseId) -> Self {
        self.release = Some(release);
        self
    }

    fn release_id(&self) -> Result<ReleaseId> {
        match &self.release {
            Some(release) => Ok(release.clone()),
            None => ReleaseId::now()
                .ok_or_else(|| Error::internal_unexpected("System clock is outside the release id range")),
        }
    }
}

impl Task for DeployTask {
    type Report = DeployReport;

    fn name(&self) -> &'static str {
        "deploy"
    }

    fn environment_label(&self) -> &str {
        &self.environment
    }

    fn run(&self, app: &AppContext, transport: &dyn Transport) -> Result<DeployReport> {
        let ctx = TaskContext::begin(app, transport, &self.environment)?;
        let event = DeployEvent {
            environment: ctx.environment().label.clone(),
            release: self.release_id()?,
        };
        let publish = |milestone| ctx.publish(LifecycleEvent::Deploy(milestone, &event));

        publish(DeployMilestone::Started)?;
        ctx.info(format!(
            "Deploying \"{}\" to its {} environment...",
            ctx.project().name,
            event.environment
        ));
        ctx.run_pre_task_commands()?;

        let cloned_repository = update_repository(&ctx)?;
        publish(DeployMilestone::UpdatedRepository)?;
        ctx.info("Refreshed / created the remote repository.");

        create_release(&ctx, &event.release)?;
        publish(DeployMilestone::CreatedRelease)?;
        ctx.info("Created release.");

        let shared_symlinks = link_shared_files(&ctx, &event.release)?;
        if !shared_symlinks.is_empty() {
            publish(DeployMilestone::CreatedSharedFileSymlinks)?;
            ctx.info("Created shared file symlinks.");
        }

        ctx.activate(&event.release)?;
        publish(DeployMilestone::ActivatedRelease)?;
        ctx.info("Activated release.");

        let mut removed_releases = Vec::new();
        if ctx.environment().releases_to_retain > 0 {
            removed_releases = remove_old_releases(&ctx)?;
            publish(DeployMilestone::RemovedOldReleases)?;
            ctx.info("Removed old releases.");
        }

        publish(DeployMilestone::Finished)?;
        ctx.info("Deployment complete!");

        Ok(DeployReport {
            environment: event.environment.clone(),
            release: event.release.clone(),
            cloned_repository,
            shared_symlinks,
            removed_releases,
            messages: ctx.transcript(),
        })
    }
}

/// Make sure `repo/` holds a checkout of the environment's branch. Returns
/// true when the repository was cloned.
fn update_repository(ctx: &TaskContext<'_>) -> Result<bool> {
    let repo = ctx.layout().repo();
    let repository = &ctx.project().repository;

    let count = ctx.run(
        ShellCommand::new("mkdir").arg("-p").arg(&repo).and(
            ShellCommand::new("ls")
                .arg("-A")
                .arg(&repo)
                .pipe(ShellCommand::new("wc").arg("-l")),
        ),
    )?;

    let cloned = count.stdout.trim() == "0";
    if cloned {
        let clone_from = |location: String| {
            ShellCommand::new("git").arg("clone").arg(location).arg(&repo)
        };
        let shown = clone_from(repository.display_location()).render();
        ctx.run_as(clone_from(repository.effective_location()), &shown)?;
    }

    ctx.run(
        ShellCommand::new("cd").arg(&repo).and(
            ShellCommand::new("git")
                .arg("checkout")
                .arg(&ctx.environment().git_branch),
        ),
    )?;

    Ok(cloned)
}

fn create_release(ctx: &TaskContext<'_>, release: &ReleaseId) -> Result<()> {
    let layout = ctx.layout();
    let release_dir = layout.release(release);

    let existing = ctx.probe(
        ShellCommand::new("test")
            .arg("-e")
            .arg(&release_dir)
            .and(ShellCommand::new("echo").arg("exists")),
    )?;
    if existing.stdout.trim() == "exists" {
        return Err(Error::deploy_release_collision(release.as_str(), release_dir));
    }

    ctx.run(ShellCommand::new("mkdir").arg("-p").arg(&release_dir))?;
    ctx.run(
        ShellCommand::new("cd").arg(layout.repo()).and(
            ShellCommand::new("git")
                .arg("checkout-index")
                .arg("-f")
                .arg("-a")
                .arg(format!("--prefix={}/", release_dir)),
        ),
    )?;
    Ok(())
}

/// Link each configured shared path into the release. Returns the links made.
fn link_shared_files(ctx: &TaskContext<'_>, release: &ReleaseId) -> Result<Vec<String>> {
    let layout = ctx.layout();
    ctx.run(ShellCommand::new("mkdir").arg("-p").arg(layout.shared()))?;

    let mut links = Vec::new();
    for link in &ctx.project().shared_file_symlinks {
        let source = layout.shared_entry(&link.source);
        let target = layout.release_entry(release, &link.target);

        ctx.run(
            ShellCommand::new("mkdir")
                .arg("-p")
                .arg(&source)
                .and(
                    ShellCommand::new("mkdir")
                        .arg("-p")
                        .substitute(ShellCommand::new("dirname").arg(&target)),
                )
                .and(ShellCommand::new("ln").arg("-sfn").arg(&source).arg(&target)),
        )?;
        links.push(format!("{} -> {}", target, source));
    }
    Ok(links)
}

/// Delete every release beyond the newest `releases_to_retain`, newest
/// first. Only directories named like release ids are considered.
fn remove_old_releases(ctx: &TaskContext<'_>) -> Result<Vec<ReleaseId>> {
    let releases = ctx.list_releases()?;
    let doomed = release::select_for_removal(&releases, ctx.environment().releases_to_retain);

    for release in &doomed {
        ctx.run(
            ShellCommand::new("rm")
                .arg("-rf")
                .arg(ctx.layout().release(release)),
        )?;
    }
    Ok(doomed)
}
