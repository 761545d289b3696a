use crate::engine::InstallOptions;
use crate::CoreError;
use brewkit_schema::EntryKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// `~/.config/brewkit/config.toml`. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BrewkitConfig {
    pub backend: Option<String>,
    pub no_upgrade: bool,
    pub no_lock: bool,
    pub without: Vec<String>,
    pub skip: SkipLists,
}

/// Names to leave alone, per entry kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SkipLists {
    pub brew: Vec<String>,
    pub cask: Vec<String>,
    pub mas: Vec<String>,
    pub whalebrew: Vec<String>,
    pub tap: Vec<String>,
}

impl SkipLists {
    fn names_mut(&mut self, kind: EntryKind) -> &mut Vec<String> {
        match kind {
            EntryKind::Brew => &mut self.brew,
            EntryKind::Cask => &mut self.cask,
            EntryKind::Mas => &mut self.mas,
            EntryKind::Whalebrew => &mut self.whalebrew,
            EntryKind::Tap => &mut self.tap,
        }
    }

    pub fn to_map(&self) -> BTreeMap<EntryKind, Vec<String>> {
        let mut lists = self.clone();
        EntryKind::ALL
            .into_iter()
            .filter_map(|kind| {
                let names = std::mem::take(lists.names_mut(kind));
                (!names.is_empty()).then_some((kind, names))
            })
            .collect()
    }
}

impl BrewkitConfig {
    /// Load from the default location, then apply the process environment.
    pub fn load_default() -> Result<Self, CoreError> {
        let mut config = match default_config_path() {
            Some(path) => Self::load(&path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Parse `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
        };
        toml::from_str(&content)
            .map_err(|e| CoreError::Config(format!("invalid config {}: {e}", path.display())))
    }

    /// Overlay `BREWKIT_NO_LOCK`, `BREWKIT_NO_UPGRADE` and the per-kind
    /// `BREWKIT_<KIND>_SKIP` lists.
    pub fn apply_env(&mut self, get: impl Fn(&str) -> Option<String>) {
        let set = |key: &str| get(key).is_some_and(|v| !v.is_empty());
        self.no_lock |= set("BREWKIT_NO_LOCK");
        self.no_upgrade |= set("BREWKIT_NO_UPGRADE");
        for kind in EntryKind::ALL {
            let key = format!("BREWKIT_{}_SKIP", kind.as_str().to_uppercase());
            if let Some(value) = get(&key) {
                self.skip
                    .names_mut(kind)
                    .extend(value.split_whitespace().map(str::to_owned));
            }
        }
    }

    pub fn install_options(&self) -> InstallOptions {
        InstallOptions {
            no_upgrade: self.no_upgrade,
            verbose: false,
            no_lock: self.no_lock,
            without: self.without.clone(),
            skip: self.skip.to_map(),
        }
    }
}

/// `$XDG_CONFIG_HOME/brewkit/config.toml`, else `~/.config/brewkit/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    let base = std::env::var_os("XDG_CONFIG_HOME")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))?;
    Some(base.join("brewkit").join("config.toml"))
}
