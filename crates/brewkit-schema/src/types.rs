//! Entry kinds and option values shared by the evaluator, installers, and lock file.
//!
//! `EntryKind` serializes as the lowercase statement name (`brew`, `cask`, ...),
//! which is also the key used under `entries` in the lock file.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// The closed set of things a Brewfile can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// A formula installed with `brew install`.
    Brew,
    /// A cask installed with `brew install --cask`.
    Cask,
    /// A Mac App Store application installed with `mas`.
    Mas,
    /// A container image installed with `whalebrew`.
    Whalebrew,
    /// A third-party repository registered with `brew tap`.
    Tap,
}

impl EntryKind {
    pub const ALL: [EntryKind; 5] = [
        EntryKind::Tap,
        EntryKind::Brew,
        EntryKind::Cask,
        EntryKind::Mas,
        EntryKind::Whalebrew,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EntryKind::Brew => "brew",
            EntryKind::Cask => "cask",
            EntryKind::Mas => "mas",
            EntryKind::Whalebrew => "whalebrew",
            EntryKind::Tap => "tap",
        }
    }

    /// Human-readable noun used in installer notices.
    pub fn noun(self) -> &'static str {
        match self {
            EntryKind::Brew => "formula",
            EntryKind::Cask => "cask",
            EntryKind::Mas => "app",
            EntryKind::Whalebrew => "image",
            EntryKind::Tap => "tap",
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "brew" => Ok(EntryKind::Brew),
            "cask" => Ok(EntryKind::Cask),
            "mas" => Ok(EntryKind::Mas),
            "whalebrew" => Ok(EntryKind::Whalebrew),
            "tap" => Ok(EntryKind::Tap),
            other => Err(format!("unknown entry kind '{other}'")),
        }
    }
}

/// A literal value from a Brewfile.
///
/// Serializes untagged, so the lock file sees plain JSON: symbols become
/// strings and `nil` becomes `null`. Hash keys are always strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Str(String),
    Int(i64),
    Bool(bool),
    Nil,
    Symbol(String),
    Array(Vec<Value>),
    Hash(BTreeMap<String, Value>),
}

impl Value {
    /// Short type name used in shape error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Str(_) => "string",
            Value::Int(_) => "integer",
            Value::Bool(_) => "boolean",
            Value::Nil => "nil",
            Value::Symbol(_) => "symbol",
            Value::Array(_) => "array",
            Value::Hash(_) => "hash",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) | Value::Symbol(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_hash(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Hash(h) => Some(h),
            _ => None,
        }
    }

    /// Ruby-style truthiness: only `nil` and `false` are falsy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    /// True for `nil`, `false`, and empty strings, arrays, and hashes.
    pub fn is_blank(&self) -> bool {
        match self {
            Value::Nil | Value::Bool(false) => true,
            Value::Str(s) | Value::Symbol(s) => s.is_empty(),
            Value::Array(a) => a.is_empty(),
            Value::Hash(h) => h.is_empty(),
            Value::Int(_) | Value::Bool(true) => false,
        }
    }

    /// Flatten a string or an array of strings into owned strings.
    /// Anything else yields nothing.
    pub fn string_list(&self) -> Vec<String> {
        match self {
            Value::Str(s) | Value::Symbol(s) => vec![s.clone()],
            Value::Array(items) => items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_owned)
                .collect(),
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "{s:?}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Nil => f.write_str("nil"),
            Value::Symbol(s) => write!(f, ":{s}"),
            Value::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Value::Hash(map) => {
                f.write_str("{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                f.write_str("}")
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_kind_serializes_lowercase() {
        let json = serde_json::to_string(&EntryKind::Whalebrew).unwrap();
        assert_eq!(json, "\"whalebrew\"");
        let back: EntryKind = serde_json::from_str("\"tap\"").unwrap();
        assert_eq!(back, EntryKind::Tap);
    }

    #[test]
    fn entry_kind_from_str() {
        assert_eq!("cask".parse::<EntryKind>().unwrap(), EntryKind::Cask);
        assert!("formula".parse::<EntryKind>().is_err());
    }

    #[test]
    fn value_serializes_as_plain_json() {
        let mut hash = BTreeMap::new();
        hash.insert("appdir".to_owned(), Value::from("~/Applications"));
        hash.insert("force".to_owned(), Value::Bool(true));
        let value = Value::Array(vec![
            Value::Symbol("head".to_owned()),
            Value::Int(3),
            Value::Nil,
            Value::Hash(hash),
        ]);
        let json = serde_json::to_value(&value).unwrap();
        assert_eq!(
            json,
            serde_json::json!(["head", 3, null, {"appdir": "~/Applications", "force": true}])
        );
    }

    #[test]
    fn blank_and_truthy() {
        assert!(Value::Nil.is_blank());
        assert!(Value::Bool(false).is_blank());
        assert!(Value::from("").is_blank());
        assert!(Value::Array(Vec::new()).is_blank());
        assert!(!Value::Int(0).is_blank());
        assert!(Value::Int(0).is_truthy());
        assert!(!Value::Nil.is_truthy());
    }

    #[test]
    fn string_list_accepts_scalar_and_array() {
        assert_eq!(Value::from("a/b").string_list(), vec!["a/b"]);
        let arr = Value::Array(vec![Value::from("x/y"), Value::Int(1), Value::from("z/w")]);
        assert_eq!(arr.string_list(), vec!["x/y", "z/w"]);
        assert!(Value::Int(1).string_list().is_empty());
    }

    #[test]
    fn display_is_readable() {
        let v = Value::Array(vec![Value::from("a"), Value::Symbol("b".to_owned())]);
        assert_eq!(v.to_string(), "[\"a\", :b]");
    }
}
