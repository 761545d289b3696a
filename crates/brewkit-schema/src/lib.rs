//! Brewfile parsing, entry normalization, and the lock file document for brewkit.
//!
//! This crate defines the schema layer: a closed, declarative Brewfile
//! language (`lexer`, `parser`) evaluated into an ordered list of [`Entry`]
//! values (`manifest`), canonical entry naming (`normalize`), and the
//! `Brewfile.lock.json` document (`LockFile`). Nothing here touches the
//! package managers themselves.

pub mod entry;
pub mod error;
pub mod lexer;
pub mod lock;
pub mod manifest;
pub mod normalize;
pub mod parser;
pub mod types;

pub use entry::{Entry, EntryId, Options, DEFAULT_GROUP};
pub use error::{ManifestError, ParseError};
pub use lock::{LockError, LockFile, LockedState, LOCK_VERSION};
pub use manifest::{parse_manifest_file, parse_manifest_str, Manifest};
pub use normalize::{normalize_name, tap_of};
pub use types::{EntryKind, Value};
