//! Notifier implementations
//!
//! Build results reach the user through desktop notifications where a
//! desktop exists, using notify-send on Linux and osascript on macOS.
//! Failures are logged but never propagated - notifications are best-effort.

use buildwatch_core::Notifier;
use std::process::Command;
use tracing::{info, warn};

/// Desktop notification renderer
///
/// Rendering shells out to the platform notification tool on the blocking
/// pool, so the scheduler worker never waits on it.
#[derive(Debug, Default)]
pub struct DesktopNotifier;

impl DesktopNotifier {
    /// Creates a desktop notifier
    pub fn new() -> Self {
        info!("Using desktop notifications");
        Self
    }
}

impl Notifier for DesktopNotifier {
    fn notify(&self, title: &str, body: &str) {
        let title = title.to_string();
        let body = body.to_string();
        tokio::task::spawn_blocking(move || {
            if let Err(e) = send_desktop_notification(&title, &body) {
                warn!("Desktop notification failed: {e}");
            }
        });
    }
}

#[cfg(target_os = "macos")]
fn send_desktop_notification(title: &str, body: &str) -> Result<(), String> {
    let script = format!(
        r#"display notification "{}" with title "{}""#,
        body.replace('"', r#"\""#),
        title.replace('"', r#"\""#)
    );

    Command::new("osascript")
        .arg("-e")
        .arg(&script)
        .output()
        .map_err(|e| format!("osascript failed: {e}"))
        .and_then(|output| {
            if output.status.success() {
                Ok(())
            } else {
                Err(format!("osascript exited with: {}", output.status))
            }
        })
}

#[cfg(not(target_os = "macos"))]
fn send_desktop_notification(title: &str, body: &str) -> Result<(), String> {
    Command::new("notify-send")
        .arg("--app-name=buildwatch")
        .arg("--expire-time=5000")
        .arg(title)
        .arg(body)
        .output()
        .map_err(|e| format!("notify-send failed: {e}"))
        .and_then(|output| {
            if output.status.success() {
                Ok(())
            } else {
                Err(format!("notify-send exited with: {}", output.status))
            }
        })
}

/// Log-only notifier for headless deployments and tests
#[derive(Debug, Default)]
pub struct LogNotifier;

impl LogNotifier {
    /// Creates a logging notifier
    pub fn new() -> Self {
        info!("Using log notifications");
        Self
    }
}

impl Notifier for LogNotifier {
    fn notify(&self, title: &str, body: &str) {
        if body.is_empty() {
            info!("Notification: {title}");
        } else {
            info!("Notification: {title}: {body}");
        }
    }
}
