use brewkit_runtime::{PackageBackend, RuntimeError};
use brewkit_schema::{tap_of, EntryKind};
use std::collections::BTreeMap;

/// Per-run view of what the package managers report as present.
///
/// Each listing is fetched from the backend on first use and kept for the
/// rest of the run. Successful installs are appended with
/// [`InstalledCache::mark_installed`] instead of re-querying.
#[derive(Debug, Default)]
pub struct InstalledCache {
    installed: BTreeMap<EntryKind, Vec<String>>,
    outdated: BTreeMap<(EntryKind, bool), Vec<String>>,
    pinned: BTreeMap<EntryKind, Vec<String>>,
}

impl InstalledCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_installed(
        &mut self,
        backend: &dyn PackageBackend,
        kind: EntryKind,
        name: &str,
    ) -> Result<bool, RuntimeError> {
        Ok(contains(self.installed(backend, kind)?, name))
    }

    pub fn is_outdated(
        &mut self,
        backend: &dyn PackageBackend,
        kind: EntryKind,
        name: &str,
        greedy: bool,
    ) -> Result<bool, RuntimeError> {
        if !self.outdated.contains_key(&(kind, greedy)) {
            let names = backend.outdated(kind, greedy)?;
            self.outdated.insert((kind, greedy), names);
        }
        Ok(self
            .outdated
            .get(&(kind, greedy))
            .is_some_and(|names| contains(names, name)))
    }

    pub fn is_pinned(
        &mut self,
        backend: &dyn PackageBackend,
        kind: EntryKind,
        name: &str,
    ) -> Result<bool, RuntimeError> {
        if !self.pinned.contains_key(&kind) {
            let names = backend.pinned(kind)?;
            self.pinned.insert(kind, names);
        }
        Ok(self
            .pinned
            .get(&kind)
            .is_some_and(|names| contains(names, name)))
    }

    /// Record a successful install. Only touches a listing that is already
    /// loaded; an unloaded listing will include the name when fetched.
    pub fn mark_installed(&mut self, kind: EntryKind, name: &str) {
        if let Some(names) = self.installed.get_mut(&kind) {
            if !contains(names, name) {
                names.push(name.to_owned());
            }
        }
    }

    pub fn reset(&mut self) {
        self.installed.clear();
        self.outdated.clear();
        self.pinned.clear();
    }

    fn installed(
        &mut self,
        backend: &dyn PackageBackend,
        kind: EntryKind,
    ) -> Result<&[String], RuntimeError> {
        if !self.installed.contains_key(&kind) {
            let names = backend.installed(kind)?;
            self.installed.insert(kind, names);
        }
        Ok(self.installed.get(&kind).map(Vec::as_slice).unwrap_or_default())
    }
}

/// Listings from `brew list` carry bare names, so a tap-qualified
/// `user/repo/name` also matches a plain `name`.
fn contains(names: &[String], name: &str) -> bool {
    let bare = tap_of(name).and_then(|_| name.rsplit('/').next());
    names.iter().any(|n| n == name || Some(n.as_str()) == bare)
}

#[cfg(test)]
mod tests {
    use super::*;
    use brewkit_runtime::MockBackend;

    #[test]
    fn listings_are_fetched_once_per_run() {
        let backend = MockBackend::new().with_installed(EntryKind::Brew, &["git", "wget"]);
        let mut cache = InstalledCache::new();
        assert!(cache.is_installed(&backend, EntryKind::Brew, "git").unwrap());
        assert!(cache.is_installed(&backend, EntryKind::Brew, "wget").unwrap());
        assert!(!cache.is_installed(&backend, EntryKind::Brew, "jq").unwrap());
        assert_eq!(backend.query_count(), 1);
    }

    #[test]
    fn mark_installed_is_visible_without_requery() {
        let backend = MockBackend::new();
        let mut cache = InstalledCache::new();
        assert!(!cache.is_installed(&backend, EntryKind::Cask, "firefox").unwrap());
        cache.mark_installed(EntryKind::Cask, "firefox");
        assert!(cache.is_installed(&backend, EntryKind::Cask, "firefox").unwrap());
        assert_eq!(backend.query_count(), 1);
    }

    #[test]
    fn greedy_and_plain_outdated_are_cached_separately() {
        let backend = MockBackend::new().with_greedy_outdated(EntryKind::Cask, &["chrome"]);
        let mut cache = InstalledCache::new();
        assert!(!cache.is_outdated(&backend, EntryKind::Cask, "chrome", false).unwrap());
        assert!(cache.is_outdated(&backend, EntryKind::Cask, "chrome", true).unwrap());
    }

    #[test]
    fn tap_qualified_names_match_bare_listing() {
        let backend = MockBackend::new()
            .with_installed(EntryKind::Brew, &["widget"])
            .with_outdated(EntryKind::Brew, &["widget"]);
        let mut cache = InstalledCache::new();
        assert!(cache
            .is_installed(&backend, EntryKind::Brew, "acme/tools/widget")
            .unwrap());
        assert!(cache
            .is_outdated(&backend, EntryKind::Brew, "acme/tools/widget", false)
            .unwrap());
        assert!(!cache
            .is_installed(&backend, EntryKind::Brew, "acme/tools/gadget")
            .unwrap());
        assert!(!cache.is_installed(&backend, EntryKind::Tap, "acme/tools").unwrap());
    }

    #[test]
    fn reset_forces_requery() {
        let backend = MockBackend::new().with_pinned(EntryKind::Brew, &["node"]);
        let mut cache = InstalledCache::new();
        assert!(cache.is_pinned(&backend, EntryKind::Brew, "node").unwrap());
        cache.reset();
        assert!(cache.is_pinned(&backend, EntryKind::Brew, "node").unwrap());
        assert_eq!(backend.query_count(), 2);
    }
}
