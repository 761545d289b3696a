//! Package manager backends for brewkit.
//!
//! This crate implements the side-effecting layer: the pluggable
//! `PackageBackend` trait that installers talk to, a `system` backend that
//! shells out to `brew`, `mas`, `whalebrew`, and friends, a deterministic
//! in-memory `mock` backend for tests, and prerequisite checking.

pub mod backend;
pub mod mock;
pub mod prereq;
pub mod system;

pub use backend::{
    select_backend, InstallRequest, OsFamily, PackageBackend, ResolvedState, SystemFacts,
};
pub use mock::{MockBackend, MockCall};
pub use prereq::{check_prereqs, format_missing, MissingPrereq};
pub use system::SystemBackend;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("runtime I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("backend '{0}' is not available on this system")]
    BackendUnavailable(String),
    #[error("command failed: {0}")]
    ToolFailed(String),
    #[error("failed to parse tool output: {0}")]
    Parse(String),
}
