use crate::normalize::normalize_name;
use crate::types::{EntryKind, Value};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Name of the group every entry belongs to.
pub const DEFAULT_GROUP: &str = "default";

pub type Options = BTreeMap<String, Value>;

/// One declared unit of desired state.
///
/// Immutable once built. The name is normalized on construction, so two
/// entries that differ only in spelling (`Foo` vs `foo`, `user/homebrew-x`
/// vs `user/x`) compare equal by [`Entry::id`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    kind: EntryKind,
    name: String,
    options: Options,
    groups: Vec<String>,
}

/// `(kind, name)` identity of an entry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct EntryId {
    pub kind: EntryKind,
    pub name: String,
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.name)
    }
}

impl Entry {
    pub fn new(kind: EntryKind, name: &str, options: Options, groups: Vec<String>) -> Self {
        let mut groups = groups;
        if !groups.iter().any(|g| g == DEFAULT_GROUP) {
            groups.insert(0, DEFAULT_GROUP.to_owned());
        }
        Self {
            kind,
            name: normalize_name(kind, name),
            options,
            groups,
        }
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn option(&self, key: &str) -> Option<&Value> {
        self.options.get(key)
    }

    /// True when the option is present and neither `nil` nor `false`.
    pub fn flag(&self, key: &str) -> bool {
        self.options.get(key).is_some_and(Value::is_truthy)
    }

    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    pub fn in_group(&self, group: &str) -> bool {
        self.groups.iter().any(|g| g == group)
    }

    pub fn id(&self) -> EntryId {
        EntryId {
            kind: self.kind,
            name: self.name.clone(),
        }
    }
}
