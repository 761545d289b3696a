use crate::backend::{InstallRequest, OsFamily, PackageBackend, ResolvedState, SystemFacts};
use crate::RuntimeError;
use brewkit_schema::EntryKind;
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

pub const MOCK_VERSION: &str = "0.0.0-mock";

/// A mutating call observed by the mock, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    Install(InstallRequest),
    Upgrade { kind: EntryKind, name: String },
}

#[derive(Debug, Default)]
struct MockState {
    installed: BTreeMap<EntryKind, Vec<String>>,
    outdated: BTreeMap<EntryKind, Vec<String>>,
    greedy_outdated: BTreeMap<EntryKind, Vec<String>>,
    pinned: BTreeMap<EntryKind, Vec<String>>,
    failing: BTreeSet<(EntryKind, String)>,
    missing: BTreeSet<EntryKind>,
    app_ids: BTreeMap<String, i64>,
    calls: Vec<MockCall>,
    queries: usize,
    resolves: usize,
}

/// In-memory package manager. Deterministic, and records every mutation.
#[derive(Default)]
pub struct MockBackend {
    state: Mutex<MockState>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from `BREWKIT_MOCK_INSTALLED`, `BREWKIT_MOCK_OUTDATED`, and
    /// `BREWKIT_MOCK_FAIL`, each a whitespace-separated list of `kind:name`
    /// (`mas:Name=id` for App Store apps).
    pub fn from_env() -> Self {
        let mut backend = Self::new();
        let seeds = |var: &str| -> Vec<(EntryKind, String)> {
            std::env::var(var)
                .map(|v| v.split_whitespace().filter_map(parse_seed).collect())
                .unwrap_or_default()
        };
        for (kind, name) in seeds("BREWKIT_MOCK_INSTALLED") {
            backend = backend.with_installed(kind, &[name.as_str()]);
        }
        for (kind, name) in seeds("BREWKIT_MOCK_OUTDATED") {
            backend = backend.with_outdated(kind, &[name.as_str()]);
        }
        for (kind, name) in seeds("BREWKIT_MOCK_FAIL") {
            backend = backend.with_failure(kind, &name);
        }
        backend
    }

    /// Mark entries installed. A `mas` seed may be written `Name=id`, which
    /// goes through [`MockBackend::with_installed_app`].
    pub fn with_installed(self, kind: EntryKind, names: &[&str]) -> Self {
        if kind == EntryKind::Mas {
            let mut backend = self;
            for raw in names {
                let app = raw
                    .split_once('=')
                    .and_then(|(name, id)| Some((name, id.parse::<i64>().ok()?)));
                backend = match app {
                    Some((name, id)) => backend.with_installed_app(name, id),
                    None => backend.seed(|s| extend(s.installed.entry(kind).or_default(), &[*raw])),
                };
            }
            return backend;
        }
        self.seed(|s| extend(s.installed.entry(kind).or_default(), names))
    }

    /// An App Store app already present under `id`, resolvable by `name`.
    pub fn with_installed_app(self, name: &str, id: i64) -> Self {
        self.seed(|s| {
            extend(s.installed.entry(EntryKind::Mas).or_default(), &[id.to_string().as_str()]);
            s.app_ids.insert(name.to_owned(), id);
        })
    }

    pub fn with_outdated(self, kind: EntryKind, names: &[&str]) -> Self {
        self.seed(|s| extend(s.outdated.entry(kind).or_default(), names))
    }

    /// Outdated only when the caller asks for the greedy listing.
    pub fn with_greedy_outdated(self, kind: EntryKind, names: &[&str]) -> Self {
        self.seed(|s| extend(s.greedy_outdated.entry(kind).or_default(), names))
    }

    pub fn with_pinned(self, kind: EntryKind, names: &[&str]) -> Self {
        self.seed(|s| extend(s.pinned.entry(kind).or_default(), names))
    }

    /// Make `install`/`upgrade` of this entry report failure.
    pub fn with_failure(self, kind: EntryKind, name: &str) -> Self {
        self.seed(|s| {
            s.failing.insert((kind, name.to_owned()));
        })
    }

    /// Behave as if the tool behind `kind` cannot be run: every query and
    /// mutation for that kind errors.
    pub fn with_missing_tool(self, kind: EntryKind) -> Self {
        self.seed(|s| {
            s.missing.insert(kind);
        })
    }

    fn seed(self, f: impl FnOnce(&mut MockState)) -> Self {
        {
            let mut state = self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            f(&mut state);
        }
        self
    }

    fn lock(&self) -> Result<MutexGuard<'_, MockState>, RuntimeError> {
        self.state
            .lock()
            .map_err(|e| RuntimeError::ToolFailed(format!("mutex poisoned: {e}")))
    }

    /// Lock the state for a call on `kind`, failing if its tool is missing.
    fn lock_for(&self, kind: EntryKind) -> Result<MutexGuard<'_, MockState>, RuntimeError> {
        let state = self.lock()?;
        if state.missing.contains(&kind) {
            return Err(RuntimeError::ToolFailed(format!(
                "failed to run {kind}: not found"
            )));
        }
        Ok(state)
    }

    /// Every mutating call so far.
    pub fn calls(&self) -> Vec<MockCall> {
        self.lock().map(|s| s.calls.clone()).unwrap_or_default()
    }

    pub fn installed_names(&self, kind: EntryKind) -> Vec<String> {
        self.lock()
            .map(|s| s.installed.get(&kind).cloned().unwrap_or_default())
            .unwrap_or_default()
    }

    /// Number of `installed`/`outdated`/`pinned` queries answered.
    pub fn query_count(&self) -> usize {
        self.lock().map(|s| s.queries).unwrap_or_default()
    }

    /// Number of `resolve` calls answered.
    pub fn resolve_count(&self) -> usize {
        self.lock().map(|s| s.resolves).unwrap_or_default()
    }
}

fn extend(list: &mut Vec<String>, names: &[&str]) {
    for name in names {
        if !list.iter().any(|n| n == name) {
            list.push((*name).to_owned());
        }
    }
}

fn parse_seed(raw: &str) -> Option<(EntryKind, String)> {
    let (kind, name) = raw.split_once(':')?;
    Some((kind.parse().ok()?, name.to_owned()))
}

impl PackageBackend for MockBackend {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn available(&self) -> bool {
        true
    }

    fn installed(&self, kind: EntryKind) -> Result<Vec<String>, RuntimeError> {
        let mut state = self.lock_for(kind)?;
        state.queries += 1;
        Ok(state.installed.get(&kind).cloned().unwrap_or_default())
    }

    fn outdated(&self, kind: EntryKind, greedy: bool) -> Result<Vec<String>, RuntimeError> {
        let mut state = self.lock_for(kind)?;
        state.queries += 1;
        let mut names = state.outdated.get(&kind).cloned().unwrap_or_default();
        if greedy {
            names.extend(state.greedy_outdated.get(&kind).cloned().unwrap_or_default());
        }
        Ok(names)
    }

    fn pinned(&self, kind: EntryKind) -> Result<Vec<String>, RuntimeError> {
        let mut state = self.lock_for(kind)?;
        state.queries += 1;
        Ok(state.pinned.get(&kind).cloned().unwrap_or_default())
    }

    fn install(&self, request: &InstallRequest) -> Result<bool, RuntimeError> {
        let mut state = self.lock_for(request.kind)?;
        state.calls.push(MockCall::Install(request.clone()));
        if state.failing.contains(&(request.kind, request.name.clone())) {
            return Ok(false);
        }

        let key = match (request.kind, request.app_id) {
            (EntryKind::Mas, Some(id)) => {
                state.app_ids.insert(request.name.clone(), id);
                id.to_string()
            }
            _ => request.name.clone(),
        };
        let installed = state.installed.entry(request.kind).or_default();
        if !installed.contains(&key) {
            installed.push(key);
        }
        Ok(true)
    }

    fn upgrade(&self, kind: EntryKind, name: &str, _verbose: bool) -> Result<bool, RuntimeError> {
        let mut state = self.lock_for(kind)?;
        state.calls.push(MockCall::Upgrade {
            kind,
            name: name.to_owned(),
        });
        if state.failing.contains(&(kind, name.to_owned())) {
            return Ok(false);
        }
        let state = &mut *state;
        for list in [&mut state.outdated, &mut state.greedy_outdated] {
            if let Some(names) = list.get_mut(&kind) {
                names.retain(|n| n != name);
            }
        }
        Ok(true)
    }

    fn resolve(&self, kind: EntryKind, name: &str) -> Result<Option<ResolvedState>, RuntimeError> {
        let mut state = self.lock()?;
        state.resolves += 1;

        let mut resolved = ResolvedState::new();
        match kind {
            EntryKind::Mas => {
                let Some(id) = state.app_ids.get(name) else {
                    return Ok(None);
                };
                resolved.insert("id".to_owned(), json!(id.to_string()));
                resolved.insert("version".to_owned(), json!(MOCK_VERSION));
            }
            _ if !state
                .installed
                .get(&kind)
                .is_some_and(|names| names.iter().any(|n| n == name)) =>
            {
                return Ok(None);
            }
            EntryKind::Brew => {
                resolved.insert("version".to_owned(), json!(MOCK_VERSION));
                resolved.insert("bottle".to_owned(), json!(false));
            }
            EntryKind::Cask => {
                resolved.insert("version".to_owned(), json!(MOCK_VERSION));
            }
            EntryKind::Whalebrew => {
                resolved.insert("digest".to_owned(), json!(format!("mock-{name}")));
            }
            EntryKind::Tap => {
                resolved.insert("revision".to_owned(), json!(format!("mock-{name}")));
            }
        }
        Ok(Some(resolved))
    }

    fn system_facts(&self) -> Result<SystemFacts, RuntimeError> {
        let facts = [
            ("HOMEBREW_VERSION", MOCK_VERSION),
            ("HOMEBREW_PREFIX", "/home/linuxbrew/.linuxbrew"),
            ("Homebrew/linuxbrew-core", "api"),
            ("GCC", MOCK_VERSION),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_owned(), v.to_owned()))
        .collect();
        Ok(SystemFacts::new(OsFamily::Linux, "Mock Linux".to_owned(), facts))
    }
}
