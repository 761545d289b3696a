use super::{
    colorize_line, colorize_summary, json_pretty, load_manifest, EXIT_FAILURE, EXIT_SUCCESS,
};
use brewkit_core::{lockfile_path, BrewfileLocation, Engine, InstallOptions};
use brewkit_runtime::{check_prereqs, format_missing, select_backend};
use brewkit_schema::EntryKind;
use tracing::debug;

pub fn run(
    backend: &str,
    location: &BrewfileLocation,
    options: &InstallOptions,
    json: bool,
) -> Result<u8, String> {
    let (path, manifest) = load_manifest(location)?;
    debug!("{} entries from {}", manifest.entries.len(), path.display());

    if backend == "system" && std::env::var("BREWKIT_SKIP_PREREQS").as_deref() != Ok("1") {
        let kinds: Vec<EntryKind> = EntryKind::ALL
            .into_iter()
            .filter(|kind| manifest.declares(*kind))
            .collect();
        let missing = check_prereqs(&kinds);
        if !missing.is_empty() {
            return Err(format_missing(&missing));
        }
    }

    let engine = Engine::new(select_backend(backend).map_err(|e| e.to_string())?);
    let lockfile = lockfile_path(&path);
    let report = if json {
        let report = engine
            .install(&manifest, options, Some(&lockfile))
            .map_err(|e| e.to_string())?;
        println!("{}", json_pretty(&report)?);
        report
    } else {
        let report = engine
            .install_with(&manifest, options, Some(&lockfile), |outcome| {
                println!("{}", colorize_line(&outcome.line()));
            })
            .map_err(|e| e.to_string())?;
        for line in report.summary() {
            println!("{}", colorize_summary(&line, report.succeeded()));
        }
        report
    };

    Ok(if report.succeeded() {
        EXIT_SUCCESS
    } else {
        EXIT_FAILURE
    })
}
