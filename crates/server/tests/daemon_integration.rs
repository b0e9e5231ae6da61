//! End-to-end tests for the daemon
//!
//! These drive the control surface exactly as a client would and use the
//! real shell runner, observing builds through their side effects on disk.
//! Build scripts write outside the watched directory so their own output
//! does not feed back into the watcher.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use buildwatch_core::Notifier;
use buildwatch_runner::ShellBuildRunner;
use buildwatch_server::{build_router, Daemon};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

struct SilentNotifier;

impl Notifier for SilentNotifier {
    fn notify(&self, _title: &str, _body: &str) {}
}

struct Harness {
    daemon: Arc<Daemon>,
    router: axum::Router,
    project: TempDir,
    scratch: TempDir,
}

impl Harness {
    fn new() -> Self {
        let project = TempDir::new().unwrap();
        std::fs::write(project.path().join("Cargo.toml"), "[package]").unwrap();
        let scratch = TempDir::new().unwrap();

        let daemon = Arc::new(
            Daemon::new(Arc::new(ShellBuildRunner::new()), Arc::new(SilentNotifier)).unwrap(),
        );
        let router = build_router(Arc::clone(&daemon), CancellationToken::new());

        Self {
            daemon,
            router,
            project,
            scratch,
        }
    }

    fn log_path(&self) -> std::path::PathBuf {
        self.scratch.path().join("build.log")
    }

    fn builds_recorded(&self) -> usize {
        std::fs::read_to_string(self.log_path())
            .map(|content| content.lines().count())
            .unwrap_or(0)
    }

    async fn register(&self, build_timeout: f64) -> StatusCode {
        let body = serde_json::json!({
            "working_dir": self.project.path(),
            "config": {
                "script": [format!("echo built >> {}", self.log_path().display())],
                "build_timeout": build_timeout,
            },
        });
        let response = self
            .router
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/projects")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        response.status()
    }

    async fn wait_for_builds(&self, expected: usize) {
        for _ in 0..50 {
            if self.builds_recorded() >= expected {
                return;
            }
            sleep(Duration::from_millis(50)).await;
        }
    }
}

fn project_name(dir: &Path) -> String {
    dir.canonicalize()
        .unwrap()
        .file_name()
        .unwrap()
        .to_string_lossy()
        .into_owned()
}

#[tokio::test]
async fn test_registration_builds_immediately() {
    let harness = Harness::new();

    assert_eq!(harness.register(30.0).await, StatusCode::OK);

    harness.wait_for_builds(1).await;
    assert_eq!(harness.builds_recorded(), 1);
    assert_eq!(harness.daemon.project_count(), 1);
}

#[tokio::test]
async fn test_file_change_triggers_debounced_build() {
    let harness = Harness::new();
    assert_eq!(harness.register(0.2).await, StatusCode::OK);
    harness.wait_for_builds(1).await;

    // Let the OS watcher settle, then modify the project.
    sleep(Duration::from_millis(100)).await;
    std::fs::write(harness.project.path().join("lib.rs"), "fn main() {}").unwrap();

    harness.wait_for_builds(2).await;
    assert_eq!(harness.builds_recorded(), 2);
}

#[tokio::test]
async fn test_reregistration_updates_without_duplicating() {
    let harness = Harness::new();
    assert_eq!(harness.register(0.2).await, StatusCode::OK);
    harness.wait_for_builds(1).await;

    assert_eq!(harness.register(0.3).await, StatusCode::OK);
    harness.wait_for_builds(2).await;

    assert_eq!(harness.daemon.project_count(), 1);
    assert_eq!(harness.builds_recorded(), 2);
}

#[tokio::test]
async fn test_shutdown_stops_pending_builds() {
    let harness = Harness::new();
    assert_eq!(harness.register(0.5).await, StatusCode::OK);
    harness.wait_for_builds(1).await;
    let count_before = harness.builds_recorded();

    // Arm a debounce timer, then shut down before it can fire.
    let name = project_name(harness.project.path());
    let watcher = harness.daemon.project(&name).unwrap();
    watcher.on_change_event();
    harness.daemon.shutdown().await;

    sleep(Duration::from_millis(800)).await;
    assert_eq!(
        harness.builds_recorded(),
        count_before,
        "a build ran after shutdown"
    );
}

#[tokio::test]
async fn test_build_status_is_recorded_on_failure() {
    let harness = Harness::new();

    let body = serde_json::json!({
        "working_dir": harness.project.path(),
        "config": {
            "script": ["echo diagnostics >&2; exit 1"],
            "build_timeout": 0.1,
        },
    });
    let response = harness
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/projects")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let name = project_name(harness.project.path());
    for _ in 0..50 {
        if let Some(watcher) = harness.daemon.project(&name) {
            if watcher.last_status().is_some() {
                break;
            }
        }
        sleep(Duration::from_millis(50)).await;
    }

    let status = harness
        .daemon
        .project(&name)
        .unwrap()
        .last_status()
        .expect("build should have completed");
    assert!(!status.succeeded);
    assert_eq!(status.stderr, "diagnostics");
}
