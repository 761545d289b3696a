use crate::RuntimeError;
use brewkit_schema::EntryKind;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Resolved state of one installed entry, e.g. `{"version": "2.44.0"}`.
pub type ResolvedState = serde_json::Map<String, serde_json::Value>;

/// Everything a backend needs to install one entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallRequest {
    pub kind: EntryKind,
    pub name: String,
    /// Extra command-line flags, already rendered (`--with-x`, `--appdir=/A`).
    pub args: Vec<String>,
    /// Store id, only meaningful for `mas` entries.
    pub app_id: Option<i64>,
    pub clone_target: Option<String>,
    pub force_auto_update: bool,
    pub verbose: bool,
}

impl InstallRequest {
    pub fn new(kind: EntryKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            args: Vec::new(),
            app_id: None,
            clone_target: None,
            force_auto_update: false,
            verbose: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OsFamily {
    Macos,
    Linux,
}

impl OsFamily {
    pub fn as_str(self) -> &'static str {
        match self {
            OsFamily::Macos => "macos",
            OsFamily::Linux => "linux",
        }
    }

    /// Fact keys every lock records for this family.
    pub fn fact_keys(self) -> &'static [&'static str] {
        match self {
            OsFamily::Macos => &[
                "HOMEBREW_VERSION",
                "HOMEBREW_PREFIX",
                "Homebrew/homebrew-core",
                "CLT",
                "Xcode",
                "macOS",
            ],
            OsFamily::Linux => &[
                "HOMEBREW_VERSION",
                "HOMEBREW_PREFIX",
                "Homebrew/linuxbrew-core",
                "GCC",
            ],
        }
    }
}

impl fmt::Display for OsFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Host facts recorded under `system.<family>.<os_version>` in the lock file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SystemFacts {
    pub family: OsFamily,
    pub os_version: String,
    pub facts: BTreeMap<String, String>,
}

impl SystemFacts {
    /// Facts with every key of `family` present; unknown ones are empty.
    pub fn new(family: OsFamily, os_version: String, mut facts: BTreeMap<String, String>) -> Self {
        for key in family.fact_keys() {
            facts.entry((*key).to_owned()).or_default();
        }
        Self {
            family,
            os_version,
            facts,
        }
    }
}

/// The external package managers behind the installers.
///
/// Query methods return names as the package manager reports them, except
/// for [`EntryKind::Mas`], where `installed` returns store ids.
///
/// `install` and `upgrade` return `Ok(false)` when the tool ran and failed;
/// `Err` is reserved for failures to run the tool at all.
pub trait PackageBackend: Send + Sync {
    fn name(&self) -> &str;

    fn available(&self) -> bool;

    fn installed(&self, kind: EntryKind) -> Result<Vec<String>, RuntimeError>;

    fn outdated(&self, kind: EntryKind, greedy: bool) -> Result<Vec<String>, RuntimeError>;

    fn pinned(&self, kind: EntryKind) -> Result<Vec<String>, RuntimeError>;

    fn install(&self, request: &InstallRequest) -> Result<bool, RuntimeError>;

    fn upgrade(&self, kind: EntryKind, name: &str, verbose: bool) -> Result<bool, RuntimeError>;

    /// Version-level state for the lock file. `None` when the backend has
    /// nothing to report for this entry.
    fn resolve(&self, kind: EntryKind, name: &str) -> Result<Option<ResolvedState>, RuntimeError>;

    fn system_facts(&self) -> Result<SystemFacts, RuntimeError>;
}

/// Shared handles forward to the backend they point at.
impl<T: PackageBackend + ?Sized> PackageBackend for std::sync::Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn available(&self) -> bool {
        (**self).available()
    }

    fn installed(&self, kind: EntryKind) -> Result<Vec<String>, RuntimeError> {
        (**self).installed(kind)
    }

    fn outdated(&self, kind: EntryKind, greedy: bool) -> Result<Vec<String>, RuntimeError> {
        (**self).outdated(kind, greedy)
    }

    fn pinned(&self, kind: EntryKind) -> Result<Vec<String>, RuntimeError> {
        (**self).pinned(kind)
    }

    fn install(&self, request: &InstallRequest) -> Result<bool, RuntimeError> {
        (**self).install(request)
    }

    fn upgrade(&self, kind: EntryKind, name: &str, verbose: bool) -> Result<bool, RuntimeError> {
        (**self).upgrade(kind, name, verbose)
    }

    fn resolve(&self, kind: EntryKind, name: &str) -> Result<Option<ResolvedState>, RuntimeError> {
        (**self).resolve(kind, name)
    }

    fn system_facts(&self) -> Result<SystemFacts, RuntimeError> {
        (**self).system_facts()
    }
}

pub fn select_backend(name: &str) -> Result<Box<dyn PackageBackend>, RuntimeError> {
    match name {
        "system" => Ok(Box::new(crate::system::SystemBackend::new())),
        "mock" => Ok(Box::new(crate::mock::MockBackend::from_env())),
        other => Err(RuntimeError::BackendUnavailable(other.to_owned())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn facts_fill_every_family_key() {
        let mut known = BTreeMap::new();
        known.insert("HOMEBREW_VERSION".to_owned(), "4.3.0".to_owned());
        let facts = SystemFacts::new(OsFamily::Macos, "sonoma".to_owned(), known);

        assert_eq!(facts.facts.len(), OsFamily::Macos.fact_keys().len());
        assert_eq!(facts.facts["HOMEBREW_VERSION"], "4.3.0");
        assert_eq!(facts.facts["CLT"], "");
        assert_eq!(facts.facts["Xcode"], "");

        let linux = SystemFacts::new(OsFamily::Linux, "Ubuntu 24.04".to_owned(), BTreeMap::new());
        assert!(linux.facts.contains_key("GCC"));
        assert!(linux.facts.values().all(String::is_empty));
    }

    #[test]
    fn select_valid_backends() {
        assert_eq!(select_backend("system").unwrap().name(), "system");
        assert_eq!(select_backend("mock").unwrap().name(), "mock");
    }

    #[test]
    fn select_invalid_backend_fails() {
        let err = select_backend("apt").err().unwrap();
        assert_eq!(
            err.to_string(),
            "backend 'apt' is not available on this system"
        );
    }

    #[test]
    fn install_request_defaults() {
        let req = InstallRequest::new(EntryKind::Tap, "acme/tools");
        assert!(req.args.is_empty());
        assert!(req.clone_target.is_none());
        assert!(!req.force_auto_update);
    }
}
