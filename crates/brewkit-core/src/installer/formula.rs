use super::{install_or_upgrade, upgradable_precheck, InstallContext, Installer, Precheck};
use crate::CoreError;
use brewkit_runtime::InstallRequest;
use brewkit_schema::{Entry, EntryKind};

/// `brew` entries. Pinned formulae are never upgraded.
pub struct FormulaInstaller;

impl Installer for FormulaInstaller {
    fn precheck(&self, entry: &Entry, ctx: &mut InstallContext<'_>) -> Result<Precheck, CoreError> {
        upgradable_precheck(entry, ctx, false, true)
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
        let mut request = InstallRequest::new(EntryKind::Brew, entry.name());
        request.args = formula_args(entry);
        request.verbose = ctx.verbose;
        install_or_upgrade(entry, ctx, &request)
    }
}

/// `args: ["with-x", "HEAD"]` becomes `--with-x --HEAD`.
fn formula_args(entry: &Entry) -> Vec<String> {
    entry
        .option("args")
        .map(|args| {
            args.string_list()
                .into_iter()
                .map(|a| format!("--{a}"))
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skip::Skipper;
    use brewkit_runtime::{MockBackend, MockCall};
    use brewkit_schema::{Options, Value};

    fn formula(name: &str) -> Entry {
        Entry::new(EntryKind::Brew, name, Options::new(), Vec::new())
    }

    #[test]
    fn absent_formula_is_installed_with_args() {
        let backend = MockBackend::new();
        let mut options = Options::new();
        options.insert(
            "args".to_owned(),
            Value::Array(vec![Value::from("with-x"), Value::from("HEAD")]),
        );
        let entry = Entry::new(EntryKind::Brew, "mysql", options, Vec::new());
        let mut ctx = InstallContext::new(&backend, Skipper::default());

        assert_eq!(FormulaInstaller.precheck(&entry, &mut ctx).unwrap(), Precheck::Install);
        assert!(FormulaInstaller.apply(&entry, true, &mut ctx).unwrap());

        let calls = backend.calls();
        let [MockCall::Install(req)] = calls.as_slice() else {
            panic!("unexpected calls: {calls:?}");
        };
        assert_eq!(req.args, vec!["--with-x", "--HEAD"]);
        assert!(ctx.is_installed(EntryKind::Brew, "mysql").unwrap());
    }

    #[test]
    fn current_formula_is_satisfied() {
        let backend = MockBackend::new().with_installed(EntryKind::Brew, &["git"]);
        let mut ctx = InstallContext::new(&backend, Skipper::default());
        assert_eq!(
            FormulaInstaller.precheck(&formula("git"), &mut ctx).unwrap(),
            Precheck::Satisfied
        );
    }

    #[test]
    fn outdated_formula_is_upgraded() {
        let backend = MockBackend::new()
            .with_installed(EntryKind::Brew, &["git"])
            .with_outdated(EntryKind::Brew, &["git"]);
        let mut ctx = InstallContext::new(&backend, Skipper::default());
        let entry = formula("git");

        assert_eq!(FormulaInstaller.precheck(&entry, &mut ctx).unwrap(), Precheck::Upgrade);
        assert!(FormulaInstaller.apply(&entry, true, &mut ctx).unwrap());
        assert_eq!(
            backend.calls(),
            vec![MockCall::Upgrade {
                kind: EntryKind::Brew,
                name: "git".to_owned()
            }]
        );
    }

    #[test]
    fn pinned_or_no_upgrade_is_satisfied() {
        let backend = MockBackend::new()
            .with_installed(EntryKind::Brew, &["node", "git"])
            .with_outdated(EntryKind::Brew, &["node", "git"])
            .with_pinned(EntryKind::Brew, &["node"]);
        let mut ctx = InstallContext::new(&backend, Skipper::default());
        assert_eq!(
            FormulaInstaller.precheck(&formula("node"), &mut ctx).unwrap(),
            Precheck::Satisfied
        );

        ctx.no_upgrade = true;
        assert_eq!(
            FormulaInstaller.precheck(&formula("git"), &mut ctx).unwrap(),
            Precheck::Satisfied
        );
    }

    #[test]
    fn failed_install_is_not_cached() {
        let backend = MockBackend::new().with_failure(EntryKind::Brew, "broken");
        let mut ctx = InstallContext::new(&backend, Skipper::default());
        let entry = formula("broken");
        let check = FormulaInstaller.precheck(&entry, &mut ctx).unwrap();
        assert!(!FormulaInstaller.apply(&entry, check.needs_action(), &mut ctx).unwrap());
        assert!(!ctx.is_installed(EntryKind::Brew, "broken").unwrap());
    }
}
