//! Where the Brewfile lives.

use crate::CoreError;
use std::path::{Path, PathBuf};

/// How the caller asked for a Brewfile on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BrewfileLocation {
    /// `--file`. `-` means standard input (or output, for writers).
    pub file: Option<String>,
    /// `--global`: the per-user Brewfile.
    pub global: bool,
    pub dash_writes_to_stdout: bool,
}

impl BrewfileLocation {
    pub fn resolve(&self) -> Result<PathBuf, CoreError> {
        let home = std::env::var_os("HOME").map(PathBuf::from);
        let cwd = std::env::current_dir()?;
        brewfile_path(self, |key| std::env::var(key).ok(), home.as_deref(), &cwd)
    }
}

/// Resolve the Brewfile path against `cwd`.
///
/// `--global` wins over `--file`, then `BREWKIT_FILE`, then `./Brewfile`.
pub fn brewfile_path(
    location: &BrewfileLocation,
    env: impl Fn(&str) -> Option<String>,
    home: Option<&Path>,
    cwd: &Path,
) -> Result<PathBuf, CoreError> {
    let env = |key: &str| env(key).filter(|v| !v.is_empty());
    let file = if location.global {
        if let Some(global) = env("BREWKIT_FILE_GLOBAL") {
            PathBuf::from(global)
        } else if env("BREWKIT_FILE").is_some() {
            return Err(CoreError::Config(
                "BREWKIT_FILE cannot be specified with --global".to_owned(),
            ));
        } else if let Some(user) = env("BREWKIT_USER_CONFIG_HOME")
            .map(|dir| Path::new(&dir).join("Brewfile"))
            .filter(|p| p.exists())
        {
            user
        } else {
            let home = home.ok_or_else(|| CoreError::Config("HOME not set".to_owned()))?;
            home.join(".Brewfile")
        }
    } else if let Some(file) = location.file.as_deref().filter(|f| !f.is_empty()) {
        match file {
            "-" if location.dash_writes_to_stdout => PathBuf::from("/dev/stdout"),
            "-" => PathBuf::from("/dev/stdin"),
            other => PathBuf::from(other),
        }
    } else if let Some(file) = env("BREWKIT_FILE") {
        PathBuf::from(file)
    } else {
        PathBuf::from("Brewfile")
    };
    Ok(cwd.join(file))
}
