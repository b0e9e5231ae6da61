//! Per-project debounce and build lifecycle
//!
//! Each registered project owns one `ProjectWatcher`. Change events re-arm
//! a single pending timer on the shared scheduler (trailing debounce); when
//! the directory has been quiet for the configured delay the watcher runs
//! the build script and forwards the outcome to the notifier.

use crate::scheduler::{DebounceScheduler, TimerHandle};
use buildwatch_core::{BuildStatus, Notifier, Project, ProjectConfig};
use buildwatch_runner::BuildRunner;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info};

/// Binds one project to the shared scheduler, runner, and notifier
pub struct ProjectWatcher {
    scheduler: Arc<DebounceScheduler>,
    runner: Arc<dyn BuildRunner>,
    notifier: Arc<dyn Notifier>,
    state: Mutex<WatcherState>,
}

struct WatcherState {
    project: Project,
    /// The one outstanding timer, if a build is currently queued
    pending: Option<TimerHandle>,
}

impl ProjectWatcher {
    /// Creates a watcher for `project`
    pub fn new(
        project: Project,
        scheduler: Arc<DebounceScheduler>,
        runner: Arc<dyn BuildRunner>,
        notifier: Arc<dyn Notifier>,
    ) -> Arc<Self> {
        info!(
            "Watching {} ({})",
            project.name,
            project.working_dir.display()
        );
        Arc::new(Self {
            scheduler,
            runner,
            notifier,
            state: Mutex::new(WatcherState {
                project,
                pending: None,
            }),
        })
    }

    fn state(&self) -> MutexGuard<'_, WatcherState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// The project's name
    pub fn name(&self) -> String {
        self.state().project.name.clone()
    }

    /// The project's working directory
    pub fn working_dir(&self) -> PathBuf {
        self.state().project.working_dir.clone()
    }

    /// Status of the most recent completed build, if any
    pub fn last_status(&self) -> Option<BuildStatus> {
        self.state().project.last_status.clone()
    }

    /// Replaces the project's script and delay
    ///
    /// A timer armed under the old config keeps its fire time; only future
    /// events pick up the new delay.
    pub fn update_config(&self, config: ProjectConfig) {
        let mut state = self.state();
        debug!("Updating config of {}", state.project.name);
        state.project.config = config;
    }

    /// Called once per filesystem change notification for this project
    pub fn on_change_event(self: &Arc<Self>) {
        let delay = self.state().project.config.debounce_delay();
        self.schedule_build(delay);
    }

    /// Queues a build to run right away, regardless of the debounce delay
    pub fn schedule_immediate(self: &Arc<Self>) {
        self.schedule_build(Duration::ZERO);
    }

    fn schedule_build(self: &Arc<Self>, delay: Duration) {
        let watcher = Arc::clone(self);
        let mut state = self.state();
        debug!("Scheduling a build of {} in {delay:?}", state.project.name);

        let existing = state.pending.take();
        let handle = self.scheduler.schedule(existing, delay, async move {
            watcher.run_build().await;
        });
        state.pending = Some(handle);
    }

    /// The scheduler job: runs the script and reports the result
    async fn run_build(self: Arc<Self>) {
        let (name, working_dir, script) = {
            let mut state = self.state();
            // The fired timer is no longer pending; a change event arriving
            // from here on arms a fresh one.
            state.pending = None;
            (
                state.project.name.clone(),
                state.project.working_dir.clone(),
                state.project.config.script.clone(),
            )
        };

        info!("Building {name} ({})", working_dir.display());
        let status = self.runner.execute(&working_dir, &script).await;

        let output = render_output(&status);
        let succeeded = status.succeeded;
        self.state().project.last_status = Some(status);

        if succeeded {
            self.notifier.notify(&format!("{name} back to normal"), &output);
        } else {
            let body = if output.is_empty() {
                "No output"
            } else {
                output.as_str()
            };
            self.notifier.notify(&format!("{name} failed"), body);
        }
    }
}

/// Joins the captured streams into one notification body
fn render_output(status: &BuildStatus) -> String {
    format!("{}\n{}", status.stdout, status.stderr)
        .trim()
        .to_string()
}
