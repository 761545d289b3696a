use crate::installer::{installer_for, InstallContext, Precheck, Verb};
use crate::locker::{LockOutcome, Locker};
use crate::skip::Skipper;
use crate::CoreError;
use brewkit_runtime::{PackageBackend, RuntimeError};
use brewkit_schema::{Entry, EntryId, EntryKind, Manifest};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// Knobs for one reconciliation run.
#[derive(Debug, Clone, Default)]
pub struct InstallOptions {
    pub no_upgrade: bool,
    pub verbose: bool,
    pub no_lock: bool,
    /// Groups whose entries are left alone.
    pub without: Vec<String>,
    /// Per-kind names that are left alone.
    pub skip: BTreeMap<EntryKind, Vec<String>>,
}

/// Result of processing one entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryOutcome {
    pub kind: EntryKind,
    pub name: String,
    pub precheck: Precheck,
    pub verb: Verb,
    pub success: bool,
}

impl EntryOutcome {
    pub fn line(&self) -> String {
        if !self.success {
            format!("{} {} has failed!", self.verb, self.name)
        } else if self.precheck.needs_action() {
            format!("{} {}", self.verb, self.name)
        } else {
            format!("Using {}", self.name)
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InstallReport {
    pub outcomes: Vec<EntryOutcome>,
    pub skipped: Vec<EntryId>,
    pub success: usize,
    pub failure: usize,
    pub lock: LockOutcome,
    /// File name of a prior lock file, shown when the run failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lockfile_hint: Option<String>,
}

impl InstallReport {
    pub fn succeeded(&self) -> bool {
        self.failure == 0
    }

    pub fn lines(&self) -> impl Iterator<Item = String> + '_ {
        self.outcomes.iter().map(EntryOutcome::line)
    }

    pub fn summary(&self) -> Vec<String> {
        let mut out = vec![format!("Success: {} Fail: {}", self.success, self.failure)];
        if self.succeeded() {
            out.push(format!(
                "brewkit complete! {} Brewfile {} now installed.",
                self.success,
                dependencies(self.success)
            ));
        } else {
            out.push(format!(
                "brewkit failed! {} Brewfile {} failed to install.",
                self.failure,
                dependencies(self.failure)
            ));
            if let Some(hint) = &self.lockfile_hint {
                out.push(format!("Check for differences in your {hint}!"));
            }
        }
        out
    }
}

fn dependencies(n: usize) -> &'static str {
    if n == 1 {
        "dependency"
    } else {
        "dependencies"
    }
}

/// Drives a manifest to convergence against one package backend.
pub struct Engine {
    backend: Box<dyn PackageBackend>,
}

impl Engine {
    pub fn new(backend: Box<dyn PackageBackend>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &dyn PackageBackend {
        self.backend.as_ref()
    }

    /// Process every entry in declaration order, then lock on a clean run.
    ///
    /// `lockfile` is where the lock file lives; `None` disables locking.
    /// Entries that fail, including those whose tool could not be run, are
    /// counted and reported. Lock and I/O errors abort the run.
    pub fn install(
        &self,
        manifest: &Manifest,
        options: &InstallOptions,
        lockfile: Option<&Path>,
    ) -> Result<InstallReport, CoreError> {
        self.install_with(manifest, options, lockfile, |_| {})
    }

    /// Like [`Engine::install`], calling `on_outcome` as soon as each entry
    /// has been processed.
    pub fn install_with(
        &self,
        manifest: &Manifest,
        options: &InstallOptions,
        lockfile: Option<&Path>,
        mut on_outcome: impl FnMut(&EntryOutcome),
    ) -> Result<InstallReport, CoreError> {
        info!(
            "reconciling {} entries with the {} backend",
            manifest.entries.len(),
            self.backend.name()
        );
        let skipper = Skipper::new(options.without.iter().cloned(), &options.skip);
        let mut ctx = InstallContext::new(self.backend.as_ref(), skipper);
        ctx.no_upgrade = options.no_upgrade;
        ctx.verbose = options.verbose;

        let mut outcomes = Vec::new();
        let mut skipped = Vec::new();
        for entry in &manifest.entries {
            if ctx.skipper.skip(entry) {
                skipped.push(entry.id());
                continue;
            }
            let outcome = process(entry, &mut ctx)?;
            on_outcome(&outcome);
            outcomes.push(outcome);
        }

        let failure = outcomes.iter().filter(|o| !o.success).count();
        let success = outcomes.len() - failure;

        let (lock, lockfile_hint) = match lockfile {
            _ if failure > 0 => {
                let hint = lockfile
                    .filter(|p| p.exists())
                    .and_then(Path::file_name)
                    .map(|n| n.to_string_lossy().into_owned());
                (LockOutcome::Skipped, hint)
            }
            None => (LockOutcome::Disabled, None),
            Some(path) => {
                let mut locker = Locker::new(self.backend.as_ref(), path);
                let outcome = locker.lock(&manifest.entries, &ctx.skipper, options.no_lock)?;
                (outcome, None)
            }
        };

        Ok(InstallReport {
            outcomes,
            skipped,
            success,
            failure,
            lock,
            lockfile_hint,
        })
    }
}

fn process(entry: &Entry, ctx: &mut InstallContext<'_>) -> Result<EntryOutcome, CoreError> {
    let installer = installer_for(entry.kind());
    let mut precheck = Precheck::Install;
    let applied = installer.precheck(entry, ctx).and_then(|checked| {
        precheck = checked;
        installer.apply(entry, checked.needs_action(), ctx)
    });
    let verb = Verb::for_entry(entry.kind(), precheck);
    let success = match applied {
        Ok(success) => success,
        Err(CoreError::Runtime(RuntimeError::ToolFailed(msg))) => {
            warn!("{} {}: {msg}", entry.kind(), entry.name());
            if entry.kind() == EntryKind::Tap {
                ctx.skipper.tap_failed(entry.name());
            }
            false
        }
        Err(e) => return Err(e),
    };
    if success {
        debug!("{} {}: {precheck:?}", entry.kind(), entry.name());
    } else {
        info!("{verb} {} has failed", entry.name());
    }
    Ok(EntryOutcome {
        kind: entry.kind(),
        name: entry.name().to_owned(),
        precheck,
        verb,
        success,
    })
}
