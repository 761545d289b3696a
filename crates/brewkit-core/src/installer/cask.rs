use super::{install_or_upgrade, upgradable_precheck, InstallContext, Installer, Precheck};
use crate::CoreError;
use brewkit_runtime::InstallRequest;
use brewkit_schema::{Entry, EntryKind, Value};

/// `cask` entries. `greedy: true` also upgrades casks that update themselves.
pub struct CaskInstaller;

impl Installer for CaskInstaller {
    fn precheck(&self, entry: &Entry, ctx: &mut InstallContext<'_>) -> Result<Precheck, CoreError> {
        upgradable_precheck(entry, ctx, entry.flag("greedy"), false)
    }

    fn apply(
        &self,
        entry: &Entry,
        needs_action: bool,
        ctx: &mut InstallContext<'_>,
    ) -> Result<bool, CoreError> {
        if !needs_action {
            return Ok(true);
        }
        let mut request = InstallRequest::new(EntryKind::Cask, entry.name());
        request.args = cask_args(entry);
        request.verbose = ctx.verbose;
        install_or_upgrade(entry, ctx, &request)
    }
}

/// `args: { appdir: "~/Apps", require_sha: true, quarantine: false }`
/// becomes `--appdir=~/Apps --require_sha`.
fn cask_args(entry: &Entry) -> Vec<String> {
    let Some(args) = entry.option("args").and_then(Value::as_hash) else {
        return Vec::new();
    };
    args.iter()
        .filter_map(|(key, value)| match value {
            Value::Bool(true) => Some(format!("--{key}")),
            Value::Bool(false) | Value::Nil => None,
            other => Some(match other.as_str() {
                Some(s) => format!("--{key}={s}"),
                None => format!("--{key}={other}"),
            }),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skip::Skipper;
    use brewkit_runtime::{MockBackend, MockCall};
    use brewkit_schema::{parse_manifest_str, Options};

    #[test]
    fn renders_cask_args() {
        let manifest = parse_manifest_str(
            "cask_args appdir: '~/Apps'\ncask 'firefox', args: { require_sha: true, quarantine: false, fontdir: :none, retries: 3 }",
        )
        .unwrap();
        assert_eq!(
            cask_args(&manifest.entries[0]),
            vec!["--appdir=~/Apps", "--fontdir=none", "--require_sha", "--retries=3"]
        );
    }

    #[test]
    fn installs_missing_cask_with_args() {
        let backend = MockBackend::new();
        let manifest = parse_manifest_str("cask 'firefox', args: { appdir: '/A' }").unwrap();
        let entry = &manifest.entries[0];
        let mut ctx = InstallContext::new(&backend, Skipper::default());

        assert_eq!(CaskInstaller.precheck(entry, &mut ctx).unwrap(), Precheck::Install);
        assert!(CaskInstaller.apply(entry, true, &mut ctx).unwrap());
        let calls = backend.calls();
        let [MockCall::Install(req)] = calls.as_slice() else {
            panic!("unexpected calls: {calls:?}");
        };
        assert_eq!(req.kind, EntryKind::Cask);
        assert_eq!(req.args, vec!["--appdir=/A"]);
    }

    #[test]
    fn greedy_flag_selects_greedy_listing() {
        let backend = MockBackend::new()
            .with_installed(EntryKind::Cask, &["chrome"])
            .with_greedy_outdated(EntryKind::Cask, &["chrome"]);
        let mut ctx = InstallContext::new(&backend, Skipper::default());

        let plain = Entry::new(EntryKind::Cask, "chrome", Options::new(), Vec::new());
        assert_eq!(CaskInstaller.precheck(&plain, &mut ctx).unwrap(), Precheck::Satisfied);

        let mut options = Options::new();
        options.insert("greedy".to_owned(), Value::Bool(true));
        let greedy = Entry::new(EntryKind::Cask, "chrome", options, Vec::new());
        assert_eq!(CaskInstaller.precheck(&greedy, &mut ctx).unwrap(), Precheck::Upgrade);
        assert!(CaskInstaller.apply(&greedy, true, &mut ctx).unwrap());
        assert!(matches!(
            backend.calls().as_slice(),
            [MockCall::Upgrade { kind: EntryKind::Cask, .. }]
        ));
    }
}
