//! Two-phase installers, one per entry kind.
//!
//! `precheck` decides whether an entry needs work without changing the
//! system. `apply` does the work, and must be a no-op returning `true` when
//! told no action is needed. Both go through [`InstallContext`] so listings
//! are fetched once per run and shared across entries.

mod cask;
mod formula;
mod image;
mod store_app;
mod tap;

pub use cask::CaskInstaller;
pub use formula::FormulaInstaller;
pub use image::ImageInstaller;
pub use store_app::AppInstaller;
pub use tap::TapInstaller;

use crate::cache::InstalledCache;
use crate::skip::Skipper;
use crate::CoreError;
use brewkit_runtime::{InstallRequest, PackageBackend};
use brewkit_schema::{Entry, EntryKind};
use serde::Serialize;
use std::fmt;
use tracing::info;

/// What precheck found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Precheck {
    Install,
    Upgrade,
    Satisfied,
}

impl Precheck {
    pub fn needs_action(self) -> bool {
        !matches!(self, Precheck::Satisfied)
    }
}

/// Verb used in status lines for an entry that needed action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Verb {
    Installing,
    Upgrading,
    Tapping,
}

impl Verb {
    pub fn for_entry(kind: EntryKind, precheck: Precheck) -> Self {
        match (kind, precheck) {
            (EntryKind::Tap, _) => Verb::Tapping,
            (_, Precheck::Upgrade) => Verb::Upgrading,
            _ => Verb::Installing,
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Verb::Installing => "Installing",
            Verb::Upgrading => "Upgrading",
            Verb::Tapping => "Tapping",
        })
    }
}

/// Per-run state shared by every installer call.
pub struct InstallContext<'a> {
    pub backend: &'a dyn PackageBackend,
    pub cache: InstalledCache,
    pub skipper: Skipper,
    pub no_upgrade: bool,
    pub verbose: bool,
}

impl<'a> InstallContext<'a> {
    pub fn new(backend: &'a dyn PackageBackend, skipper: Skipper) -> Self {
        Self {
            backend,
            cache: InstalledCache::new(),
            skipper,
            no_upgrade: false,
            verbose: false,
        }
    }

    pub fn is_installed(&mut self, kind: EntryKind, name: &str) -> Result<bool, CoreError> {
        Ok(self.cache.is_installed(self.backend, kind, name)?)
    }

    pub(crate) fn notice(&self, message: &str) {
        if self.verbose {
            info!("{message}");
        }
    }

    /// Install through the backend and record success in the cache under `key`.
    pub(crate) fn install(&mut self, request: &InstallRequest, key: &str) -> Result<bool, CoreError> {
        let ok = self.backend.install(request)?;
        if ok {
            self.cache.mark_installed(request.kind, key);
        }
        Ok(ok)
    }
}

pub trait Installer {
    fn precheck(&self, entry: &Entry, ctx: &mut InstallContext<'_>) -> Result<Precheck, CoreError>;

    fn apply(
        &self,
        entry: &Entry,
        needs_action: bool,
        ctx: &mut InstallContext<'_>,
    ) -> Result<bool, CoreError>;
}

pub fn installer_for(kind: EntryKind) -> &'static dyn Installer {
    match kind {
        EntryKind::Brew => &FormulaInstaller,
        EntryKind::Cask => &CaskInstaller,
        EntryKind::Mas => &AppInstaller,
        EntryKind::Whalebrew => &ImageInstaller,
        EntryKind::Tap => &TapInstaller,
    }
}

/// Shared precheck for kinds that can be outdated (formulae and casks).
fn upgradable_precheck(
    entry: &Entry,
    ctx: &mut InstallContext<'_>,
    greedy: bool,
    honor_pins: bool,
) -> Result<Precheck, CoreError> {
    let (kind, name) = (entry.kind(), entry.name());
    let noun = kind.noun();
    if !ctx.is_installed(kind, name)? {
        ctx.notice(&format!("Installing {name} {noun}. It is not currently installed."));
        return Ok(Precheck::Install);
    }
    if ctx.no_upgrade {
        ctx.notice(&format!("Skipping install of {name} {noun}. It is already installed."));
        return Ok(Precheck::Satisfied);
    }
    let outdated = ctx.cache.is_outdated(ctx.backend, kind, name, greedy)?;
    let pinned = honor_pins && ctx.cache.is_pinned(ctx.backend, kind, name)?;
    if outdated && !pinned {
        ctx.notice(&format!("Upgrading {name} {noun}. It is installed but not up-to-date."));
        return Ok(Precheck::Upgrade);
    }
    ctx.notice(&format!("Skipping install of {name} {noun}. It is already up-to-date."));
    Ok(Precheck::Satisfied)
}

/// Shared apply for kinds that can be outdated: install if absent, else upgrade.
fn install_or_upgrade(
    entry: &Entry,
    ctx: &mut InstallContext<'_>,
    request: &InstallRequest,
) -> Result<bool, CoreError> {
    if ctx.is_installed(entry.kind(), entry.name())? {
        Ok(ctx
            .backend
            .upgrade(entry.kind(), entry.name(), ctx.verbose)?)
    } else {
        ctx.install(request, entry.name())
    }
}

/// Shared precheck for kinds that are either present or not.
fn presence_precheck(
    entry: &Entry,
    ctx: &mut InstallContext<'_>,
    key: &str,
) -> Result<Precheck, CoreError> {
    let (name, noun) = (entry.name(), entry.kind().noun());
    if ctx.is_installed(entry.kind(), key)? {
        ctx.notice(&format!("Skipping install of {name} {noun}. It is already installed."));
        Ok(Precheck::Satisfied)
    } else {
        ctx.notice(&format!("Installing {name} {noun}. It is not currently installed."));
        Ok(Precheck::Install)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brewkit_runtime::MockBackend;
    use brewkit_schema::Options;

    #[test]
    fn needs_action_only_when_not_satisfied() {
        assert!(Precheck::Install.needs_action());
        assert!(Precheck::Upgrade.needs_action());
        assert!(!Precheck::Satisfied.needs_action());
    }

    #[test]
    fn verbs_follow_kind_and_precheck() {
        assert_eq!(Verb::for_entry(EntryKind::Tap, Precheck::Install), Verb::Tapping);
        assert_eq!(Verb::for_entry(EntryKind::Brew, Precheck::Upgrade), Verb::Upgrading);
        assert_eq!(Verb::for_entry(EntryKind::Cask, Precheck::Install), Verb::Installing);
        assert_eq!(Verb::Upgrading.to_string(), "Upgrading");
    }

    #[test]
    fn apply_without_action_never_touches_backend() {
        let backend = MockBackend::new();
        for kind in EntryKind::ALL {
            let mut options = Options::new();
            options.insert("id".to_owned(), brewkit_schema::Value::Int(1));
            let entry = Entry::new(kind, "x/y", options, Vec::new());
            let mut ctx = InstallContext::new(&backend, Skipper::default());
            let installer = installer_for(kind);
            assert!(installer.apply(&entry, false, &mut ctx).unwrap());
            assert!(installer.apply(&entry, false, &mut ctx).unwrap());
        }
        assert!(backend.calls().is_empty());
        assert_eq!(backend.query_count(), 0);
    }
}
