use crate::skip::Skipper;
use crate::CoreError;
use brewkit_runtime::PackageBackend;
use brewkit_schema::{Entry, EntryKind, LockError, LockFile, LockedState, LOCK_VERSION};
use serde::Serialize;
use serde_json::Value as Json;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// What happened to the lock file at the end of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "path", rename_all = "lowercase")]
pub enum LockOutcome {
    Written(PathBuf),
    /// Locking is turned off, or the target cannot hold a lock file.
    Disabled,
    /// The lock file could not be read or written. Already logged.
    Failed,
    /// Not attempted because entries failed.
    Skipped,
}

/// `<manifest>.lock.json` next to the manifest. A symlinked lock file
/// resolves to its target.
pub fn lockfile_path(manifest: &Path) -> PathBuf {
    let name = manifest.file_name().map_or_else(
        || "Brewfile.lock.json".to_owned(),
        |n| format!("{}.lock.json", n.to_string_lossy()),
    );
    let path = manifest.with_file_name(name);
    match fs::symlink_metadata(&path) {
        Ok(meta) if meta.file_type().is_symlink() => fs::canonicalize(&path).unwrap_or(path),
        _ => path,
    }
}

/// Compiles processed entries into `Brewfile.lock.json`, merging with
/// whatever the previous file held.
///
/// Resolved state is memoized per `(kind, name)` for the life of the
/// locker; [`Locker::reset`] drops it.
pub struct Locker<'a> {
    backend: &'a dyn PackageBackend,
    path: PathBuf,
    resolved: BTreeMap<(EntryKind, String), LockedState>,
}

impl<'a> Locker<'a> {
    pub fn new(backend: &'a dyn PackageBackend, path: impl Into<PathBuf>) -> Self {
        Self {
            backend,
            path: path.into(),
            resolved: BTreeMap::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write_lockfile(&self, no_lock: bool) -> bool {
        if no_lock || std::env::var_os("BREWKIT_NO_LOCK").is_some_and(|v| !v.is_empty()) {
            return false;
        }
        // /dev/stdin and /dev/stdout manifests.
        if self.path.parent() == Some(Path::new("/dev")) {
            return false;
        }
        !fs::metadata(&self.path).is_ok_and(|m| !m.is_file())
    }

    pub fn lock(
        &mut self,
        entries: &[Entry],
        skipper: &Skipper,
        no_lock: bool,
    ) -> Result<LockOutcome, CoreError> {
        if !self.write_lockfile(no_lock) {
            debug!("not writing {}", self.path.display());
            return Ok(LockOutcome::Disabled);
        }

        let mut lock = match LockFile::read_or_default(&self.path) {
            Ok(lock) => lock,
            Err(LockError::Parse(e)) => {
                warn!("Could not parse {}: {e}", self.path.display());
                return Ok(LockOutcome::Failed);
            }
            Err(LockError::Io(e)) if e.kind() == io::ErrorKind::PermissionDenied => {
                warn!("Could not read {}!", self.path.display());
                return Ok(LockOutcome::Failed);
            }
            Err(e) => return Err(e.into()),
        };
        lock.version = LOCK_VERSION.to_owned();

        for entry in entries {
            if skipper.skip_silently(entry) {
                continue;
            }
            let mut state = self.resolve(entry.kind(), entry.name())?.clone();
            if let Some(options) = emitted_options(entry) {
                state.insert("options".to_owned(), Json::Object(options));
            }
            lock.set_entry(entry.kind(), entry.name(), state);
        }

        let facts = self.backend.system_facts()?;
        lock.set_system(
            facts.family.as_str(),
            &facts.os_version,
            facts
                .facts
                .into_iter()
                .map(|(k, v)| (k, Json::String(v)))
                .collect(),
        );

        match lock.write_to_file(&self.path) {
            Ok(()) => {
                info!("wrote {}", self.path.display());
                Ok(LockOutcome::Written(self.path.clone()))
            }
            Err(LockError::Io(e))
                if matches!(
                    e.kind(),
                    io::ErrorKind::PermissionDenied | io::ErrorKind::DirectoryNotEmpty
                ) =>
            {
                warn!("Could not write to {}!", self.path.display());
                Ok(LockOutcome::Failed)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn reset(&mut self) {
        self.resolved.clear();
    }

    fn resolve(&mut self, kind: EntryKind, name: &str) -> Result<&LockedState, CoreError> {
        let key = (kind, name.to_owned());
        if !self.resolved.contains_key(&key) {
            let state = self.backend.resolve(kind, name)?.unwrap_or_default();
            self.resolved.insert(key.clone(), state);
        }
        Ok(&self.resolved[&key])
    }
}

/// Entry options as recorded in the lock file, or `None` if nothing is left.
///
/// Blank values (`nil`, `false`, empty strings and collections) count as
/// absent. `requires` only matters during evaluation, and a store app's
/// `id` is already part of its resolved state.
pub fn emitted_options(entry: &Entry) -> Option<LockedState> {
    let options: LockedState = entry
        .options()
        .iter()
        .filter(|(key, value)| {
            !value.is_blank()
                && key.as_str() != "requires"
                && !(entry.kind() == EntryKind::Mas && key.as_str() == "id")
        })
        .filter_map(|(key, value)| Some((key.clone(), serde_json::to_value(value).ok()?)))
        .collect();
    (!options.is_empty()).then_some(options)
}
