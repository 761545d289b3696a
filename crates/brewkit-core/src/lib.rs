//! Reconciliation engine for brewkit.
//!
//! This crate ties together Brewfile evaluation and package manager backends
//! into the `Engine`: it walks entries in declaration order, consults the
//! `Skipper`, runs each entry's `Installer` (precheck, then apply), and on a
//! clean run hands the processed entries to the `Locker`, which merges them
//! into `Brewfile.lock.json`. It also owns configuration and Brewfile path
//! resolution.

pub mod brewfile;
pub mod cache;
pub mod config;
pub mod engine;
pub mod installer;
pub mod locker;
pub mod skip;

pub use brewfile::{brewfile_path, BrewfileLocation};
pub use cache::InstalledCache;
pub use config::BrewkitConfig;
pub use engine::{Engine, EntryOutcome, InstallOptions, InstallReport};
pub use installer::{installer_for, InstallContext, Installer, Precheck, Verb};
pub use locker::{lockfile_path, LockOutcome, Locker};
pub use skip::{SkipReason, Skipper};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("{0}")]
    Manifest(#[from] brewkit_schema::ManifestError),
    #[error("lock error: {0}")]
    Lock(#[from] brewkit_schema::LockError),
    #[error("runtime error: {0}")]
    Runtime(#[from] brewkit_runtime::RuntimeError),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
