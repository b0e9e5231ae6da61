#![deny(warnings)]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

//! Debounced build scheduling for buildwatch
//!
//! This crate turns bursts of filesystem events into at most one scheduled
//! build per project:
//!
//! - A single shared [`DebounceScheduler`] worker owns all pending timers
//!   and runs due build jobs one at a time, serializing builds globally
//! - A [`ProjectWatcher`] per project re-arms its timer on every change
//!   event (trailing debounce) and runs the build when the timer fires
//! - A [`ChangeEventSource`] binds project directories to the OS file
//!   watcher and routes raw events to the right project

// Private implementation modules
mod fs_events;
mod project_watcher;
mod scheduler;

// Public exports - minimal API surface
pub use fs_events::ChangeEventSource;
pub use project_watcher::ProjectWatcher;
pub use scheduler::{DebounceScheduler, TimerHandle};
