use brewkit_schema::normalize::normalize_tap_name;
use brewkit_schema::{normalize_name, tap_of, Entry, EntryKind};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::debug;

/// Why an entry was left out of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    FailedTap,
    FailedPrerequisite(String),
    ExcludedGroup(String),
    Listed,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::FailedTap => f.write_str("tap failed earlier in this run"),
            SkipReason::FailedPrerequisite(tap) => write!(f, "prerequisite tap {tap} failed"),
            SkipReason::ExcludedGroup(group) => write!(f, "group {group} is excluded"),
            SkipReason::Listed => f.write_str("listed in skip configuration"),
        }
    }
}

/// Decides, per entry, whether the run should leave it alone.
///
/// The failed-tap set only grows during a run, so [`Skipper::skip`] must be
/// asked again for every entry rather than cached.
#[derive(Debug, Clone, Default)]
pub struct Skipper {
    failed_taps: BTreeSet<String>,
    without: BTreeSet<String>,
    listed: BTreeMap<EntryKind, BTreeSet<String>>,
}

impl Skipper {
    pub fn new<I, S>(without: I, listed: &BTreeMap<EntryKind, Vec<String>>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let listed = listed
            .iter()
            .map(|(kind, names)| {
                let names = names.iter().map(|n| normalize_name(*kind, n)).collect();
                (*kind, names)
            })
            .collect();
        Self {
            failed_taps: BTreeSet::new(),
            without: without.into_iter().map(Into::into).collect(),
            listed,
        }
    }

    pub fn skip(&self, entry: &Entry) -> bool {
        match self.reason(entry) {
            Some(reason) => {
                debug!("skipping {} {}: {reason}", entry.kind(), entry.name());
                true
            }
            None => false,
        }
    }

    pub fn skip_silently(&self, entry: &Entry) -> bool {
        self.reason(entry).is_some()
    }

    pub fn reason(&self, entry: &Entry) -> Option<SkipReason> {
        if entry.kind() == EntryKind::Tap && self.failed_taps.contains(entry.name()) {
            return Some(SkipReason::FailedTap);
        }
        if matches!(
            entry.kind(),
            EntryKind::Brew | EntryKind::Cask | EntryKind::Tap
        ) {
            if let Some(tap) = prerequisites(entry)
                .into_iter()
                .find(|t| self.failed_taps.contains(t))
            {
                return Some(SkipReason::FailedPrerequisite(tap));
            }
        }
        if let Some(group) = entry.groups().iter().find(|g| self.without.contains(*g)) {
            return Some(SkipReason::ExcludedGroup(group.clone()));
        }
        if self
            .listed
            .get(&entry.kind())
            .is_some_and(|names| names.contains(entry.name()))
        {
            return Some(SkipReason::Listed);
        }
        None
    }

    pub fn tap_failed(&mut self, name: &str) {
        self.failed_taps.insert(normalize_tap_name(name));
    }

    pub fn failed_taps(&self) -> impl Iterator<Item = &str> {
        self.failed_taps.iter().map(String::as_str)
    }
}

/// Taps an entry needs: the tap its qualified name lives in, plus any
/// declared with `requires:`.
fn prerequisites(entry: &Entry) -> Vec<String> {
    let mut taps: Vec<String> = tap_of(entry.name()).into_iter().collect();
    if let Some(requires) = entry.option("requires") {
        taps.extend(requires.string_list().iter().map(|t| normalize_tap_name(t)));
    }
    taps
}

#[cfg(test)]
mod tests {
    use super::*;
    use brewkit_schema::{Options, Value};

    fn entry(kind: EntryKind, name: &str) -> Entry {
        Entry::new(kind, name, Options::new(), Vec::new())
    }

    #[test]
    fn nothing_skipped_by_default() {
        let skipper = Skipper::default();
        assert!(!skipper.skip(&entry(EntryKind::Brew, "git")));
        assert!(!skipper.skip(&entry(EntryKind::Tap, "acme/tools")));
    }

    #[test]
    fn failed_tap_and_its_formulae_are_skipped() {
        let mut skipper = Skipper::default();
        skipper.tap_failed("acme/homebrew-tools");
        assert_eq!(skipper.failed_taps().collect::<Vec<_>>(), ["acme/tools"]);

        assert_eq!(
            skipper.reason(&entry(EntryKind::Tap, "acme/tools")),
            Some(SkipReason::FailedTap)
        );
        assert_eq!(
            skipper.reason(&entry(EntryKind::Brew, "acme/tools/widget")),
            Some(SkipReason::FailedPrerequisite("acme/tools".to_owned()))
        );
        assert!(skipper.skip(&entry(EntryKind::Cask, "acme/tools/gadget")));
        assert!(!skipper.skip(&entry(EntryKind::Brew, "widget")));
        assert!(!skipper.skip(&entry(EntryKind::Mas, "acme/tools/x")));
    }

    #[test]
    fn requires_option_names_prerequisites() {
        let mut skipper = Skipper::default();
        skipper.tap_failed("acme/tools");

        let mut options = Options::new();
        options.insert(
            "requires".to_owned(),
            Value::Array(vec![Value::from("other/tap"), Value::from("acme/homebrew-tools")]),
        );
        let dependent = Entry::new(EntryKind::Brew, "widget", options, Vec::new());
        assert!(skipper.skip(&dependent));
    }

    #[test]
    fn excluded_groups_are_skipped() {
        let skipper = Skipper::new(["work"], &BTreeMap::new());
        let work = Entry::new(
            EntryKind::Brew,
            "awscli",
            Options::new(),
            vec!["default".to_owned(), "work".to_owned()],
        );
        assert_eq!(
            skipper.reason(&work),
            Some(SkipReason::ExcludedGroup("work".to_owned()))
        );
        assert!(!skipper.skip(&entry(EntryKind::Brew, "git")));
    }

    #[test]
    fn listed_names_are_normalized() {
        let mut listed = BTreeMap::new();
        listed.insert(EntryKind::Cask, vec!["Firefox".to_owned()]);
        let skipper = Skipper::new(Vec::<String>::new(), &listed);
        assert_eq!(
            skipper.reason(&entry(EntryKind::Cask, "firefox")),
            Some(SkipReason::Listed)
        );
        assert!(!skipper.skip(&entry(EntryKind::Brew, "firefox")));
    }
}
