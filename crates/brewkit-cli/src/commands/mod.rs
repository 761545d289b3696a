pub mod completions;
pub mod install;
pub mod list;

use brewkit_core::BrewfileLocation;
use brewkit_schema::{parse_manifest_file, Manifest};
use console::Style;
use std::path::PathBuf;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_MANIFEST_ERROR: u8 = 2;

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

/// Resolve and evaluate the Brewfile. Errors carry the `manifest error:`
/// prefix that maps to [`EXIT_MANIFEST_ERROR`].
pub fn load_manifest(location: &BrewfileLocation) -> Result<(PathBuf, Manifest), String> {
    let path = location.resolve().map_err(|e| e.to_string())?;
    let manifest = parse_manifest_file(&path).map_err(|e| format!("manifest error: {e}"))?;
    Ok((path, manifest))
}

/// Status line colors: failures red, work done green, satisfied entries plain.
pub fn colorize_line(line: &str) -> String {
    if line.ends_with("has failed!") {
        Style::new().red().apply_to(line).to_string()
    } else if line.starts_with("Using ") {
        line.to_owned()
    } else {
        Style::new().green().apply_to(line).to_string()
    }
}

pub fn colorize_summary(line: &str, succeeded: bool) -> String {
    if line.starts_with("Success:") {
        Style::new().bold().apply_to(line).to_string()
    } else if succeeded {
        Style::new().green().apply_to(line).to_string()
    } else {
        Style::new().red().apply_to(line).to_string()
    }
}
