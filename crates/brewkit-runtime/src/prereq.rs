use brewkit_schema::EntryKind;
use std::fmt;
use std::process::Command;

/// A missing prerequisite with actionable install instructions.
#[derive(Debug)]
pub struct MissingPrereq {
    pub name: &'static str,
    pub purpose: &'static str,
    pub install_hint: &'static str,
}

impl fmt::Display for MissingPrereq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "  - {}: {} (install: {})",
            self.name, self.purpose, self.install_hint
        )
    }
}

pub(crate) fn command_exists(name: &str) -> bool {
    Command::new("which")
        .arg(name)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Check the tools needed to reconcile entries of the given kinds.
/// Returns a list of missing items. Empty list means all prerequisites are met.
pub fn check_prereqs(kinds: &[EntryKind]) -> Vec<MissingPrereq> {
    check_with(kinds, command_exists)
}

fn check_with(kinds: &[EntryKind], exists: impl Fn(&str) -> bool) -> Vec<MissingPrereq> {
    let mut missing = Vec::new();

    if !exists("brew") {
        missing.push(MissingPrereq {
            name: "brew",
            purpose: "installing formulae, casks, and taps",
            install_hint: "see https://brew.sh",
        });
    }

    if kinds.contains(&EntryKind::Mas) && !exists("mas") {
        missing.push(MissingPrereq {
            name: "mas",
            purpose: "installing Mac App Store applications",
            install_hint: "brew install mas",
        });
    }

    if kinds.contains(&EntryKind::Whalebrew) && !exists("whalebrew") {
        missing.push(MissingPrereq {
            name: "whalebrew",
            purpose: "installing container images as commands",
            install_hint: "brew install whalebrew",
        });
    }

    missing
}

/// Format a list of missing prerequisites into a user-friendly error message.
pub fn format_missing(missing: &[MissingPrereq]) -> String {
    use std::fmt::Write as _;
    let mut msg = String::from("missing prerequisites:\n");
    for m in missing {
        let _ = writeln!(msg, "{m}");
    }
    msg.push_str("\nbrewkit requires these tools to reconcile your Brewfile.");
    msg
}
