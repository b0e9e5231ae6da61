//! Project registry and daemon lifecycle
//!
//! The daemon owns the shared scheduler, the change-event source, and the
//! map of registered projects. Registration is idempotent per project name:
//! re-registering replaces the config on the existing watcher and always
//! forces an immediate build.

use buildwatch_core::error::{Error, Result};
use buildwatch_core::{is_project_dir, project_name, Notifier, Project, ProjectConfig};
use buildwatch_runner::BuildRunner;
use buildwatch_watcher::{ChangeEventSource, DebounceScheduler, ProjectWatcher};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock};
use tracing::info;

/// Owns the registry and the shared scheduling collaborators
pub struct Daemon {
    scheduler: Arc<DebounceScheduler>,
    runner: Arc<dyn BuildRunner>,
    notifier: Arc<dyn Notifier>,
    events: ChangeEventSource,
    projects: RwLock<HashMap<String, Arc<ProjectWatcher>>>,
}

impl Daemon {
    /// Builds the daemon with injected runner and notifier collaborators
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(runner: Arc<dyn BuildRunner>, notifier: Arc<dyn Notifier>) -> Result<Self> {
        Ok(Self {
            scheduler: Arc::new(DebounceScheduler::new()),
            runner,
            notifier,
            events: ChangeEventSource::new()?,
            projects: RwLock::new(HashMap::new()),
        })
    }

    /// Liveness probe
    pub fn hello(&self) -> &'static str {
        "World!"
    }

    /// Number of registered projects
    pub fn project_count(&self) -> usize {
        self.projects
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    /// Registers `working_dir` under the name of its trailing component
    ///
    /// First registration creates a watcher and binds it to the event
    /// source; re-registration replaces the config on the existing watcher.
    /// Both paths queue an immediate build. Returns the project name.
    pub fn add_project(&self, working_dir: &Path, config: ProjectConfig) -> Result<String> {
        info!("Adding a project: {}", working_dir.display());

        let dir = working_dir
            .canonicalize()
            .map_err(|_| Error::not_a_project(working_dir))?;
        if !is_project_dir(&dir) {
            return Err(Error::not_a_project(working_dir));
        }
        let name = project_name(&dir)?;

        let mut projects = self.projects.write().unwrap_or_else(|e| e.into_inner());
        match projects.get(&name) {
            Some(existing) => {
                existing.update_config(config);
                existing.schedule_immediate();
            }
            None => {
                let watcher = ProjectWatcher::new(
                    Project::new(name.clone(), dir.clone(), config),
                    Arc::clone(&self.scheduler),
                    Arc::clone(&self.runner),
                    Arc::clone(&self.notifier),
                );
                self.events.watch(&dir, Arc::clone(&watcher))?;
                watcher.schedule_immediate();
                projects.insert(name.clone(), watcher);
            }
        }

        Ok(name)
    }

    /// Looks up a registered project watcher
    pub fn project(&self, name: &str) -> Option<Arc<ProjectWatcher>> {
        self.projects
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
            .cloned()
    }

    /// Tears down the event source and scheduler, waiting for both
    ///
    /// The event source stops first so nothing can schedule against a
    /// stopped scheduler. Unfired timers are discarded; a build already in
    /// flight finishes before the scheduler worker observes the stop.
    pub async fn shutdown(&self) {
        info!("Shutting down");
        self.events.stop();
        self.events.join().await;
        self.scheduler.stop();
        self.scheduler.join().await;
        info!("Shutdown complete");
    }
}
