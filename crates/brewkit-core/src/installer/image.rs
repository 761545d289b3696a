use super::{presence_precheck, InstallContext, Installer, Precheck};
use crate::CoreError;
use brewkit_runtime::InstallRequest;
use brewkit_schema::{Entry, EntryKind};

/// `whalebrew` entries.
pub struct ImageInstaller;

impl Installer for ImageInstaller {
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
        let mut request = InstallRequest::new(EntryKind::Whalebrew, entry.name());
        request.verbose = ctx.verbose;
        ctx.install(&request, entry.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skip::Skipper;
    use brewkit_runtime::MockBackend;
    use brewkit_schema::Options;

    #[test]
    fn installs_missing_image_once() {
        let backend = MockBackend::new();
        let entry = Entry::new(EntryKind::Whalebrew, "whalebrew/wget", Options::new(), Vec::new());
        let mut ctx = InstallContext::new(&backend, Skipper::default());

        assert_eq!(ImageInstaller.precheck(&entry, &mut ctx).unwrap(), Precheck::Install);
        assert!(ImageInstaller.apply(&entry, true, &mut ctx).unwrap());
        assert_eq!(ImageInstaller.precheck(&entry, &mut ctx).unwrap(), Precheck::Satisfied);
        assert_eq!(backend.calls().len(), 1);
    }
}
