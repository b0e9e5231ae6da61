//! Core types for the buildwatch daemon
//!
//! This crate provides the foundational abstractions shared by the rest of
//! the workspace:
//!
//! - **Projects**: the per-project data model and build status record
//! - **Configuration**: daemon and per-project configuration management
//! - **Notifier**: the collaborator trait for status notifications
//! - **Error handling**: unified error types
//!

pub mod config;
pub mod error;
pub mod notifier;
pub mod project;

// Re-export main types for convenience
pub use config::{DaemonConfig, NotifyBackend, ProjectConfig, PROJECT_CONFIG_FILENAME};
pub use error::{Error, Result, ResultExt};
pub use notifier::Notifier;
pub use project::{
    find_project_root, is_project_dir, project_name, BuildStatus, Project,
    DEFAULT_PROJECT_INDICATORS,
};

/// Version of the core library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
