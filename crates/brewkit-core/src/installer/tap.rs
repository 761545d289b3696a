use super::{presence_precheck, InstallContext, Installer, Precheck};
use crate::CoreError;
use brewkit_runtime::InstallRequest;
use brewkit_schema::{Entry, EntryKind, Value};
use tracing::warn;

/// `tap` entries. A failed tap is reported to the skipper so that entries
/// depending on it are skipped instead of failing one by one.
pub struct TapInstaller;

impl Installer for TapInstaller {
    fn precheck(&self, entry: &Entry, ctx: &mut InstallContext<'_>) -> Result<Precheck, CoreError> {
        presence_precheck(entry, ctx, entry.name())
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
        let mut request = InstallRequest::new(EntryKind::Tap, entry.name());
        request.clone_target = entry
            .option("clone_target")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .map(str::to_owned);
        request.force_auto_update = entry.flag("force_auto_update");
        request.verbose = ctx.verbose;

        let ok = ctx.install(&request, entry.name())?;
        if !ok {
            warn!("tap {} failed; entries that need it will be skipped", entry.name());
            ctx.skipper.tap_failed(entry.name());
        }
        Ok(ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skip::Skipper;
    use brewkit_runtime::{MockBackend, MockCall};
    use brewkit_schema::parse_manifest_str;

    #[test]
    fn tap_passes_clone_target_and_auto_update() {
        let backend = MockBackend::new();
        let manifest = parse_manifest_str(
            "tap 'acme/tools', 'https://example.com/tools.git', force_auto_update: true",
        )
        .unwrap();
        let entry = &manifest.entries[0];
        let mut ctx = InstallContext::new(&backend, Skipper::default());

        assert_eq!(TapInstaller.precheck(entry, &mut ctx).unwrap(), Precheck::Install);
        assert!(TapInstaller.apply(entry, true, &mut ctx).unwrap());
        let calls = backend.calls();
        let [MockCall::Install(req)] = calls.as_slice() else {
            panic!("unexpected calls: {calls:?}");
        };
        assert_eq!(
            req.clone_target.as_deref(),
            Some("https://example.com/tools.git")
        );
        assert!(req.force_auto_update);
    }

    #[test]
    fn failed_tap_is_recorded() {
        let backend = MockBackend::new().with_failure(EntryKind::Tap, "acme/tools");
        let manifest = parse_manifest_str("tap 'acme/tools'\nbrew 'acme/tools/widget'").unwrap();
        let mut ctx = InstallContext::new(&backend, Skipper::default());

        assert!(!TapInstaller.apply(&manifest.entries[0], true, &mut ctx).unwrap());
        assert_eq!(ctx.skipper.failed_taps().collect::<Vec<_>>(), ["acme/tools"]);
        assert!(ctx.skipper.skip(&manifest.entries[1]));
    }

    #[test]
    fn registered_tap_is_satisfied() {
        let backend = MockBackend::new().with_installed(EntryKind::Tap, &["homebrew/services"]);
        let manifest = parse_manifest_str("tap 'Homebrew/homebrew-services'").unwrap();
        let mut ctx = InstallContext::new(&backend, Skipper::default());
        assert_eq!(
            TapInstaller.precheck(&manifest.entries[0], &mut ctx).unwrap(),
            Precheck::Satisfied
        );
    }
}
