use crate::types::EntryKind;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value as Json};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;

pub const LOCK_VERSION: &str = "1";

#[derive(Debug, Error)]
pub enum LockError {
    #[error("lock file I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("lock file parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Resolved state of one entry as recorded in the lock file.
pub type LockedState = Map<String, Json>;

/// The `Brewfile.lock.json` document.
///
/// Only `entries`, `system`, and `version` are interpreted. Any other
/// top-level key from a prior file is carried through untouched, as is any
/// entry the current run does not overwrite.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LockFile {
    #[serde(default, deserialize_with = "nullable_sections")]
    pub entries: BTreeMap<String, BTreeMap<String, Json>>,
    #[serde(default, deserialize_with = "nullable_sections")]
    pub system: BTreeMap<String, BTreeMap<String, Json>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub version: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Json>,
}

/// `null` reads the same as an absent key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Like [`null_as_default`], one level down as well: `{"brew": null}`.
fn nullable_sections<'de, D>(
    deserializer: D,
) -> Result<BTreeMap<String, BTreeMap<String, Json>>, D::Error>
where
    D: Deserializer<'de>,
{
    let sections: Option<BTreeMap<String, Option<BTreeMap<String, Json>>>> =
        Option::deserialize(deserializer)?;
    Ok(sections
        .unwrap_or_default()
        .into_iter()
        .map(|(key, section)| (key, section.unwrap_or_default()))
        .collect())
}

impl LockFile {
    pub fn entry(&self, kind: EntryKind, name: &str) -> Option<&Json> {
        self.entries.get(kind.as_str())?.get(name)
    }

    /// Overwrite `entries[kind][name]`, leaving siblings in place.
    pub fn set_entry(&mut self, kind: EntryKind, name: &str, state: LockedState) {
        self.entries
            .entry(kind.as_str().to_owned())
            .or_default()
            .insert(name.to_owned(), Json::Object(state));
    }

    /// Overwrite `system[family][os_version]`, leaving other versions in place.
    pub fn set_system(&mut self, family: &str, os_version: &str, facts: LockedState) {
        self.system
            .entry(family.to_owned())
            .or_default()
            .insert(os_version.to_owned(), Json::Object(facts));
    }

    /// Pretty JSON with every object's keys sorted and a trailing newline.
    ///
    /// Going through `serde_json::Value` (a sorted map) also sorts the
    /// flattened extra keys in among the known ones, so the output depends
    /// only on content.
    pub fn to_pretty_json(&self) -> Result<String, LockError> {
        let value = serde_json::to_value(self)?;
        let mut out = serde_json::to_string_pretty(&value)?;
        out.push('\n');
        Ok(out)
    }

    pub fn from_json(input: &str) -> Result<Self, LockError> {
        Ok(serde_json::from_str(input)?)
    }

    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<(), LockError> {
        let path = path.as_ref();
        let content = self.to_pretty_json()?;
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        io::Write::write_all(&mut tmp, content.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| LockError::Io(e.error))?;
        if let Ok(f) = fs::File::open(dir) {
            let _ = f.sync_all();
        }
        Ok(())
    }

    pub fn read_from_file(path: impl AsRef<Path>) -> Result<Self, LockError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Like [`LockFile::read_from_file`], but a missing file is an empty document.
    pub fn read_or_default(path: impl AsRef<Path>) -> Result<Self, LockError> {
        match fs::read_to_string(path) {
            Ok(content) => Self::from_json(&content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn state(pairs: &[(&str, Json)]) -> LockedState {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), v.clone()))
            .collect()
    }

    #[test]
    fn set_entry_keeps_unrelated_entries() {
        let mut lock = LockFile::from_json(
            r#"{
  "entries": {
    "brew": { "old": { "version": "1.0" } },
    "cask": { "firefox": { "version": "120" } }
  },
  "version": "1"
}"#,
        )
        .unwrap();

        lock.set_entry(
            EntryKind::Brew,
            "git",
            state(&[("version", json!("2.44.0"))]),
        );

        assert_eq!(
            lock.entry(EntryKind::Brew, "old"),
            Some(&json!({ "version": "1.0" }))
        );
        assert_eq!(
            lock.entry(EntryKind::Cask, "firefox"),
            Some(&json!({ "version": "120" }))
        );
        assert_eq!(
            lock.entry(EntryKind::Brew, "git"),
            Some(&json!({ "version": "2.44.0" }))
        );
    }

    #[test]
    fn unknown_top_level_keys_survive_a_round_trip() {
        let lock = LockFile::from_json(r#"{"version": "1", "zzz_custom": {"a": 1}}"#).unwrap();
        let out: Json = serde_json::from_str(&lock.to_pretty_json().unwrap()).unwrap();
        assert_eq!(out["zzz_custom"], json!({ "a": 1 }));
    }

    #[test]
    fn serialization_is_sorted_and_newline_terminated() {
        let mut lock = LockFile {
            version: LOCK_VERSION.to_owned(),
            ..LockFile::default()
        };
        lock.extra.insert("aaa".to_owned(), json!(true));
        lock.set_entry(
            EntryKind::Tap,
            "acme/tools",
            state(&[("revision", json!("abc")), ("options", json!({}))]),
        );
        lock.set_system("linux", "Ubuntu 24.04", state(&[("GCC", json!("13"))]));

        let text = lock.to_pretty_json().unwrap();
        assert!(text.ends_with("}\n"));

        let aaa = text.find("\"aaa\"").unwrap();
        let entries = text.find("\"entries\"").unwrap();
        let system = text.find("\"system\"").unwrap();
        let version = text.find("\"version\"").unwrap();
        assert!(aaa < entries && entries < system && system < version);

        let options = text.find("\"options\"").unwrap();
        let revision = text.find("\"revision\"").unwrap();
        assert!(options < revision);
    }

    #[test]
    fn identical_documents_serialize_identically() {
        let build = || {
            let mut lock = LockFile::default();
            lock.set_entry(EntryKind::Cask, "b", state(&[("version", json!("2"))]));
            lock.set_entry(EntryKind::Brew, "a", state(&[("version", json!("1"))]));
            lock
        };
        assert_eq!(
            build().to_pretty_json().unwrap(),
            build().to_pretty_json().unwrap()
        );
    }

    #[test]
    fn set_system_keeps_other_os_versions() {
        let mut lock = LockFile::default();
        lock.set_system("macos", "ventura", state(&[("macOS", json!("13.6"))]));
        lock.set_system("macos", "sonoma", state(&[("macOS", json!("14.4"))]));
        assert_eq!(lock.system["macos"].len(), 2);
    }

    #[test]
    fn write_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Brewfile.lock.json");

        let mut lock = LockFile {
            version: LOCK_VERSION.to_owned(),
            ..LockFile::default()
        };
        lock.set_entry(EntryKind::Brew, "git", state(&[("version", json!("2.44.0"))]));
        lock.write_to_file(&path).unwrap();

        let loaded = LockFile::read_from_file(&path).unwrap();
        assert_eq!(lock, loaded);
        assert_eq!(fs::read_to_string(&path).unwrap(), lock.to_pretty_json().unwrap());
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let lock = LockFile::read_or_default(dir.path().join("absent.json")).unwrap();
        assert_eq!(lock, LockFile::default());
    }

    #[test]
    fn null_sections_read_as_empty() {
        let lock =
            LockFile::from_json(r#"{"entries": null, "system": null, "version": null}"#).unwrap();
        assert!(lock.entries.is_empty());
        assert!(lock.system.is_empty());
        assert_eq!(lock.version, "");

        let mut lock =
            LockFile::from_json(r#"{"entries": {"brew": null, "cask": {"x": {}}}}"#).unwrap();
        lock.set_entry(EntryKind::Brew, "git", state(&[("version", json!("2.44.0"))]));
        assert_eq!(
            lock.entry(EntryKind::Brew, "git"),
            Some(&json!({ "version": "2.44.0" }))
        );
        assert_eq!(lock.entry(EntryKind::Cask, "x"), Some(&json!({})));
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Brewfile.lock.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            LockFile::read_or_default(&path),
            Err(LockError::Parse(_))
        ));
    }
}
