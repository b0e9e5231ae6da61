//! Notification collaborator trait
//!
//! Build results are surfaced to the user through a [`Notifier`]. The trait
//! is injected into the daemon at construction, so headless deployments and
//! tests can swap the desktop renderer for a logging sink.

/// Renders a build-status notification
///
/// Implementations are fire-and-forget: delivery failures must be handled
/// (or logged) internally and never propagated to the build path.
pub trait Notifier: Send + Sync {
    /// Displays a notification with the given title and body
    fn notify(&self, title: &str, body: &str);
}
