use regex::Regex;
use std::sync::LazyLock;

use crate::types::EntryKind;

static TAP_ARGS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([\w-]+)/(homebrew-)?([\w-]+)$").expect("valid tap regex"));

static TAP_FORMULA: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([\w-]+)/([\w-]+)/([\w+\-.@]+)$").expect("valid tap formula regex")
});

/// Canonical form of a declared name for the given kind.
///
/// Pure and idempotent: `normalize_name(k, &normalize_name(k, x)) == normalize_name(k, x)`.
pub fn normalize_name(kind: EntryKind, raw: &str) -> String {
    match kind {
        EntryKind::Brew => normalize_formula_name(raw),
        EntryKind::Cask => normalize_cask_name(raw),
        EntryKind::Tap => normalize_tap_name(raw),
        EntryKind::Mas | EntryKind::Whalebrew => raw.to_owned(),
    }
}

/// `homebrew/homebrew/foo` collapses to `foo`; `user/homebrew-repo/foo`
/// collapses to `user/repo/foo`. Everything is lowercased.
pub fn normalize_formula_name(raw: &str) -> String {
    let name = raw.to_lowercase();
    let Some(caps) = TAP_FORMULA.captures(&name) else {
        return name;
    };
    let user = &caps[1];
    let repo = strip_homebrew_prefix(&caps[2]);
    if user == "homebrew" && repo == "homebrew" {
        return caps[3].to_owned();
    }
    format!("{user}/{repo}/{}", &caps[3])
}

/// `user/homebrew-repo` collapses to `user/repo`. Everything is lowercased.
pub fn normalize_tap_name(raw: &str) -> String {
    let name = raw.to_lowercase();
    match TAP_ARGS.captures(&name) {
        Some(caps) => format!("{}/{}", &caps[1], strip_homebrew_prefix(&caps[3])),
        None => name,
    }
}

fn strip_homebrew_prefix(repo: &str) -> &str {
    let mut repo = repo;
    while let Some(rest) = repo.strip_prefix("homebrew-") {
        if rest.is_empty() {
            break;
        }
        repo = rest;
    }
    repo
}

pub fn normalize_cask_name(raw: &str) -> String {
    raw.to_lowercase()
}

/// The `user/repo` tap a fully qualified formula or cask name lives in.
pub fn tap_of(name: &str) -> Option<String> {
    let mut parts = name.split('/');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(user), Some(repo), Some(leaf), None)
            if !user.is_empty() && !repo.is_empty() && !leaf.is_empty() =>
        {
            Some(normalize_tap_name(&format!("{user}/{repo}")))
        }
        _ => None,
    }
}
