use super::{presence_precheck, InstallContext, Installer, Precheck};
use crate::CoreError;
use brewkit_runtime::InstallRequest;
use brewkit_schema::{Entry, EntryKind, Value};

/// `mas` entries. Presence is decided by store id, not by display name.
pub struct AppInstaller;

fn app_id(entry: &Entry) -> Option<i64> {
    entry.option("id").and_then(Value::as_int)
}

impl Installer for AppInstaller {
    fn precheck(&self, entry: &Entry, ctx: &mut InstallContext<'_>) -> Result<Precheck, CoreError> {
        let id = app_id(entry).map(|id| id.to_string()).unwrap_or_default();
        presence_precheck(entry, ctx, &id)
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
        let mut request = InstallRequest::new(EntryKind::Mas, entry.name());
        request.app_id = app_id(entry);
        request.verbose = ctx.verbose;
        let key = request.app_id.map(|id| id.to_string()).unwrap_or_default();
        ctx.install(&request, &key)
    }
}
