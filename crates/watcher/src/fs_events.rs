//! Change-event source backed by the notify crate
//!
//! One OS watcher serves every registered project. Raw events are forwarded
//! from notify's callback thread into a tokio channel; a dispatcher task
//! routes each event to the projects whose working directory contains an
//! affected path. Every event kind counts as a change; the debounce layer
//! absorbs the noise.

use crate::project_watcher::ProjectWatcher;
use buildwatch_core::error::{Error, Result};
use notify::{
    Config as NotifyConfig, Event as NotifyEvent, RecommendedWatcher, RecursiveMode,
    Watcher as NotifyWatcher,
};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace};

struct Route {
    dir: PathBuf,
    project: Arc<ProjectWatcher>,
}

/// Routes filesystem events to registered project watchers
pub struct ChangeEventSource {
    /// Dropped on stop, which ends event delivery
    watcher: Mutex<Option<RecommendedWatcher>>,
    routes: Arc<RwLock<Vec<Route>>>,
    cancel: CancellationToken,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
}

impl ChangeEventSource {
    /// Creates the OS watcher and starts the dispatcher task
    ///
    /// Must be called from within a tokio runtime.
    pub fn new() -> Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();

        let watcher = RecommendedWatcher::new(
            move |result: std::result::Result<NotifyEvent, notify::Error>| match result {
                Ok(event) => {
                    let _ = tx.send(event);
                }
                Err(e) => error!("Notify error: {e}"),
            },
            NotifyConfig::default(),
        )
        .map_err(|e| Error::watcher(format!("Failed to create watcher: {e}")))?;

        let routes: Arc<RwLock<Vec<Route>>> = Arc::new(RwLock::new(Vec::new()));
        let cancel = CancellationToken::new();
        let dispatcher = tokio::spawn(run_dispatcher(rx, Arc::clone(&routes), cancel.clone()));

        Ok(Self {
            watcher: Mutex::new(Some(watcher)),
            routes,
            cancel,
            dispatcher: Mutex::new(Some(dispatcher)),
        })
    }

    /// Watches `dir` recursively and routes its events to `project`
    pub fn watch(&self, dir: &Path, project: Arc<ProjectWatcher>) -> Result<()> {
        let mut guard = self.watcher.lock().unwrap_or_else(|e| e.into_inner());
        let watcher = guard
            .as_mut()
            .ok_or_else(|| Error::watcher("Event source is stopped"))?;

        watcher
            .watch(dir, RecursiveMode::Recursive)
            .map_err(|e| Error::watcher(format!("Failed to watch {}: {e}", dir.display())))?;
        info!("Observing {} (recursive)", dir.display());

        self.routes
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(Route {
                dir: dir.to_path_buf(),
                project,
            });
        Ok(())
    }

    /// Stops event delivery and the dispatcher; does not wait
    pub fn stop(&self) {
        debug!("Stopping change-event source");
        self.cancel.cancel();
        *self.watcher.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }

    /// Waits for the dispatcher task to terminate; safe to call once after
    /// [`stop`]
    ///
    /// [`stop`]: ChangeEventSource::stop
    pub async fn join(&self) {
        let handle = self
            .dispatcher
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}

async fn run_dispatcher(
    mut rx: mpsc::UnboundedReceiver<NotifyEvent>,
    routes: Arc<RwLock<Vec<Route>>>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            event = rx.recv() => match event {
                Some(event) => dispatch(&routes, &event),
                None => break,
            },
        }
    }
    debug!("Event dispatcher stopped");
}

/// Calls `on_change_event` once per event on every project whose directory
/// contains an affected path
fn dispatch(routes: &RwLock<Vec<Route>>, event: &NotifyEvent) {
    trace!("Event: {event:?}");
    let routes = routes.read().unwrap_or_else(|e| e.into_inner());
    for route in routes.iter() {
        if event.paths.iter().any(|path| path.starts_with(&route.dir)) {
            route.project.on_change_event();
        }
    }
}
