use crate::backend::{InstallRequest, OsFamily, PackageBackend, ResolvedState, SystemFacts};
use crate::RuntimeError;
use brewkit_schema::EntryKind;
use serde_json::{json, Value as Json};
use std::collections::BTreeMap;
use std::process::{Command, Stdio};
use tracing::debug;

/// Backend that drives the real package managers through their CLIs.
pub struct SystemBackend {
    brew: String,
}

impl Default for SystemBackend {
    fn default() -> Self {
        Self {
            brew: std::env::var("HOMEBREW_BREW_FILE").unwrap_or_else(|_| "brew".to_owned()),
        }
    }
}

impl SystemBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn brew_capture(&self, args: &[&str]) -> Result<String, RuntimeError> {
        capture(&self.brew, args)
    }

    fn brew_run(&self, args: &[&str], verbose: bool) -> Result<bool, RuntimeError> {
        run(&self.brew, args, verbose)
    }

    fn resolve_formula(&self, name: &str) -> Result<Option<ResolvedState>, RuntimeError> {
        match self.brew_capture(&["info", "--json=v2", "--formula", name]) {
            Ok(out) => parse_formula_info(&out),
            Err(RuntimeError::ToolFailed(msg)) => {
                debug!("no formula info for {name}: {msg}");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn resolve_cask(&self, name: &str) -> Result<Option<ResolvedState>, RuntimeError> {
        let out = tolerate(self.brew_capture(&["list", "--cask", "--versions"]))?;
        let versions = parse_cask_versions(&out);
        Ok(versions.get(name).map(|v| state(&[("version", json!(v))])))
    }

    fn resolve_app(name: &str) -> Result<Option<ResolvedState>, RuntimeError> {
        let out = tolerate(capture("mas", &["list"]))?;
        Ok(parse_mas_list(&out)
            .into_iter()
            .find(|app| app.name == name)
            .map(|app| state(&[("id", json!(app.id)), ("version", json!(app.version))])))
    }

    fn resolve_image(name: &str) -> Result<Option<ResolvedState>, RuntimeError> {
        let out = tolerate(capture(
            "docker",
            &["image", "inspect", name, "--format", "{{ index .RepoDigests 0 }}"],
        ))?;
        Ok(parse_repo_digest(&out).map(|d| state(&[("digest", json!(d))])))
    }

    fn resolve_tap(&self, name: &str) -> Result<Option<ResolvedState>, RuntimeError> {
        Ok(self
            .git_head(name)?
            .map(|rev| state(&[("revision", json!(rev))])))
    }

    fn git_head(&self, tap: &str) -> Result<Option<String>, RuntimeError> {
        let repo = tolerate(self.brew_capture(&["--repository", tap]))?;
        let repo = repo.trim();
        if repo.is_empty() {
            return Ok(None);
        }
        let head = tolerate(capture("git", &["-C", repo, "rev-parse", "HEAD"]))?;
        let head = head.trim();
        Ok((!head.is_empty()).then(|| head.to_owned()))
    }

    fn core_tap_fact(&self, tap: &str) -> Result<String, RuntimeError> {
        if std::env::var_os("HOMEBREW_NO_INSTALL_FROM_API").is_none() {
            return Ok("api".to_owned());
        }
        Ok(self.git_head(tap)?.unwrap_or_default())
    }

    fn homebrew_facts(&self, facts: &mut BTreeMap<String, String>) -> Result<(), RuntimeError> {
        let version = tolerate(self.brew_capture(&["--version"]))?;
        if let Some(v) = parse_brew_version(&version) {
            facts.insert("HOMEBREW_VERSION".to_owned(), v);
        }
        let prefix = tolerate(self.brew_capture(&["--prefix"]))?;
        if !prefix.trim().is_empty() {
            facts.insert("HOMEBREW_PREFIX".to_owned(), prefix.trim().to_owned());
        }
        Ok(())
    }
}

impl PackageBackend for SystemBackend {
    fn name(&self) -> &'static str {
        "system"
    }

    fn available(&self) -> bool {
        crate::prereq::command_exists(&self.brew)
    }

    fn installed(&self, kind: EntryKind) -> Result<Vec<String>, RuntimeError> {
        match kind {
            EntryKind::Brew => Ok(parse_lines(&self.brew_capture(&["list", "--formula", "-1"])?)),
            EntryKind::Cask => Ok(parse_cask_list(
                &self.brew_capture(&["list", "--cask", "-1"])?,
            )),
            EntryKind::Mas => Ok(parse_mas_list(&capture("mas", &["list"])?)
                .into_iter()
                .map(|app| app.id)
                .collect()),
            EntryKind::Whalebrew => Ok(parse_whalebrew_list(&capture("whalebrew", &["list"])?)),
            EntryKind::Tap => Ok(parse_lines(&self.brew_capture(&["tap"])?)),
        }
    }

    fn outdated(&self, kind: EntryKind, greedy: bool) -> Result<Vec<String>, RuntimeError> {
        match kind {
            EntryKind::Brew => Ok(parse_lines(
                &self.brew_capture(&["outdated", "--formula", "--quiet"])?,
            )),
            EntryKind::Cask => {
                let mut args = vec!["outdated", "--cask", "--quiet"];
                if greedy {
                    args.push("--greedy");
                }
                Ok(parse_lines(&self.brew_capture(&args)?))
            }
            EntryKind::Mas | EntryKind::Whalebrew | EntryKind::Tap => Ok(Vec::new()),
        }
    }

    fn pinned(&self, kind: EntryKind) -> Result<Vec<String>, RuntimeError> {
        match kind {
            EntryKind::Brew => Ok(parse_lines(&self.brew_capture(&["list", "--pinned"])?)),
            _ => Ok(Vec::new()),
        }
    }

    fn install(&self, request: &InstallRequest) -> Result<bool, RuntimeError> {
        let name = request.name.as_str();
        let extra = request.args.iter().map(String::as_str);
        match request.kind {
            EntryKind::Brew => {
                let args: Vec<&str> = ["install", name].into_iter().chain(extra).collect();
                self.brew_run(&args, request.verbose)
            }
            EntryKind::Cask => {
                let args: Vec<&str> = ["install", "--cask", name]
                    .into_iter()
                    .chain(extra)
                    .collect();
                self.brew_run(&args, request.verbose)
            }
            EntryKind::Mas => {
                let id = request.app_id.ok_or_else(|| {
                    RuntimeError::ToolFailed(format!("mas: no app id for {name}"))
                })?;
                run("mas", &["install", &id.to_string()], request.verbose)
            }
            EntryKind::Whalebrew => run("whalebrew", &["install", name], request.verbose),
            EntryKind::Tap => {
                let mut args = vec!["tap", name];
                if let Some(target) = &request.clone_target {
                    args.push(target);
                }
                if request.force_auto_update {
                    args.push("--force-auto-update");
                }
                self.brew_run(&args, request.verbose)
            }
        }
    }

    fn upgrade(&self, kind: EntryKind, name: &str, verbose: bool) -> Result<bool, RuntimeError> {
        match kind {
            EntryKind::Brew => self.brew_run(&["upgrade", "--formula", name], verbose),
            EntryKind::Cask => self.brew_run(&["upgrade", "--cask", name], verbose),
            EntryKind::Mas | EntryKind::Whalebrew | EntryKind::Tap => Ok(true),
        }
    }

    fn resolve(&self, kind: EntryKind, name: &str) -> Result<Option<ResolvedState>, RuntimeError> {
        match kind {
            EntryKind::Brew => self.resolve_formula(name),
            EntryKind::Cask => self.resolve_cask(name),
            EntryKind::Mas => Self::resolve_app(name),
            EntryKind::Whalebrew => Self::resolve_image(name),
            EntryKind::Tap => self.resolve_tap(name),
        }
    }

    fn system_facts(&self) -> Result<SystemFacts, RuntimeError> {
        let mut facts = BTreeMap::new();
        self.homebrew_facts(&mut facts)?;

        if cfg!(target_os = "macos") {
            let full = tolerate(capture("sw_vers", &["-productVersion"]))?;
            let full = full.trim().to_owned();
            facts.insert(
                "Homebrew/homebrew-core".to_owned(),
                self.core_tap_fact("homebrew/core")?,
            );
            if let Some(clt) = parse_pkg_info_version(&tolerate(capture(
                "pkgutil",
                &["--pkg-info=com.apple.pkg.CLTools_Executables"],
            ))?) {
                facts.insert("CLT".to_owned(), clt);
            }
            if let Some(xcode) = parse_xcode_version(&tolerate(capture("xcodebuild", &["-version"]))?)
            {
                facts.insert("Xcode".to_owned(), xcode);
            }
            facts.insert("macOS".to_owned(), full.clone());
            Ok(SystemFacts::new(
                OsFamily::Macos,
                macos_codename(&full).to_owned(),
                facts,
            ))
        } else {
            facts.insert(
                "Homebrew/linuxbrew-core".to_owned(),
                self.core_tap_fact("homebrew/core")?,
            );
            let gcc = tolerate(capture("gcc", &["-dumpversion"]))?;
            if !gcc.trim().is_empty() {
                facts.insert("GCC".to_owned(), gcc.trim().to_owned());
            }
            let os_release = std::fs::read_to_string("/etc/os-release").unwrap_or_default();
            Ok(SystemFacts::new(
                OsFamily::Linux,
                parse_os_release(&os_release).unwrap_or_else(|| "Linux".to_owned()),
                facts,
            ))
        }
    }
}

fn state(pairs: &[(&str, Json)]) -> ResolvedState {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_owned(), v.clone()))
        .collect()
}

/// Run a query command and return its stdout. Non-zero exit is an error.
fn capture(program: &str, args: &[&str]) -> Result<String, RuntimeError> {
    debug!("running {program} {}", args.join(" "));
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| RuntimeError::ToolFailed(format!("failed to run {program}: {e}")))?;
    if !output.status.success() {
        return Err(RuntimeError::ToolFailed(format!(
            "{program} {} exited with {}: {}",
            args.join(" "),
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Run a mutating command. Exit status is the result; failing to spawn is an error.
fn run(program: &str, args: &[&str], verbose: bool) -> Result<bool, RuntimeError> {
    debug!("running {program} {}", args.join(" "));
    let mut cmd = Command::new(program);
    cmd.args(args).stdin(Stdio::null());
    if verbose {
        let status = cmd
            .status()
            .map_err(|e| RuntimeError::ToolFailed(format!("failed to run {program}: {e}")))?;
        return Ok(status.success());
    }
    let output = cmd
        .output()
        .map_err(|e| RuntimeError::ToolFailed(format!("failed to run {program}: {e}")))?;
    if !output.status.success() {
        debug!(
            "{program} exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(output.status.success())
}

/// Treat a failed query as empty output. Only used for lock file facts,
/// which are best effort.
fn tolerate(result: Result<String, RuntimeError>) -> Result<String, RuntimeError> {
    match result {
        Ok(out) => Ok(out),
        Err(RuntimeError::ToolFailed(msg)) => {
            debug!("ignoring tool failure: {msg}");
            Ok(String::new())
        }
        Err(e) => Err(e),
    }
}

pub fn parse_lines(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_owned)
        .collect()
}

/// `brew list --cask -1` marks casks whose artifacts are gone with ` (!)`.
pub fn parse_cask_list(output: &str) -> Vec<String> {
    parse_lines(output)
        .into_iter()
        .map(|l| l.trim_end_matches(" (!)").to_owned())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasApp {
    pub id: String,
    pub name: String,
    pub version: String,
}

/// Parse `mas list` lines of the form `497799835  Xcode  (15.3)`.
pub fn parse_mas_list(output: &str) -> Vec<MasApp> {
    output
        .lines()
        .filter_map(|line| {
            let mut words: Vec<&str> = line.split_whitespace().collect();
            if words.len() < 3 || !words[0].bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            let id = words.remove(0).to_owned();
            let version = words
                .pop()?
                .trim_start_matches('(')
                .trim_end_matches(')')
                .to_owned();
            Some(MasApp {
                id,
                name: words.join(" "),
                version,
            })
        })
        .collect()
}

/// `whalebrew list` prints a `COMMAND IMAGE` table; the image is the last column.
pub fn parse_whalebrew_list(output: &str) -> Vec<String> {
    output
        .lines()
        .skip_while(|l| l.trim().is_empty())
        .skip(1)
        .filter_map(|l| l.split_whitespace().last())
        .map(str::to_owned)
        .collect()
}

/// Pull `version` and `bottle` for the first formula in `brew info --json=v2`.
pub fn parse_formula_info(output: &str) -> Result<Option<ResolvedState>, RuntimeError> {
    let doc: Json = serde_json::from_str(output)
        .map_err(|e| RuntimeError::Parse(format!("brew info: {e}")))?;
    let Some(formula) = doc["formulae"].as_array().and_then(|f| f.first()) else {
        return Ok(None);
    };
    let version = formula["installed"]
        .as_array()
        .and_then(|i| i.last())
        .and_then(|i| i["version"].as_str())
        .or_else(|| formula["versions"]["stable"].as_str());
    let Some(version) = version else {
        return Ok(None);
    };
    let bottle = match &formula["bottle"]["stable"] {
        Json::Null => Json::Bool(false),
        other => other.clone(),
    };
    Ok(Some(state(&[("version", json!(version)), ("bottle", bottle)])))
}

/// `brew list --cask --versions` lines are `name v1 [v2 ...]`; the last wins.
pub fn parse_cask_versions(output: &str) -> BTreeMap<String, String> {
    output
        .lines()
        .filter_map(|line| {
            let mut words = line.split_whitespace();
            let name = words.next()?;
            let version = words.last()?;
            Some((name.to_owned(), version.to_owned()))
        })
        .collect()
}

/// `repo@sha256:abc` -> `abc`.
pub fn parse_repo_digest(output: &str) -> Option<String> {
    let (_, digest) = output.trim().split_once(':')?;
    (!digest.is_empty()).then(|| digest.to_owned())
}

/// `Homebrew 4.2.0\n...` -> `4.2.0`.
pub fn parse_brew_version(output: &str) -> Option<String> {
    output
        .lines()
        .next()?
        .strip_prefix("Homebrew ")
        .map(|v| v.trim().to_owned())
}

pub fn parse_os_release(content: &str) -> Option<String> {
    content.lines().find_map(|line| {
        let value = line.strip_prefix("PRETTY_NAME=")?;
        let value = value.trim().trim_matches('"');
        (!value.is_empty()).then(|| value.to_owned())
    })
}

fn parse_pkg_info_version(output: &str) -> Option<String> {
    output
        .lines()
        .find_map(|l| l.strip_prefix("version: "))
        .map(|v| v.trim().to_owned())
}

fn parse_xcode_version(output: &str) -> Option<String> {
    output
        .lines()
        .next()?
        .strip_prefix("Xcode ")
        .map(|v| v.trim().to_owned())
}

/// Release name for a `sw_vers -productVersion` string.
pub fn macos_codename(version: &str) -> &'static str {
    let mut parts = version.split('.');
    let major = parts.next().and_then(|p| p.parse::<u32>().ok()).unwrap_or(0);
    let minor = parts.next().and_then(|p| p.parse::<u32>().ok()).unwrap_or(0);
    match (major, minor) {
        (15, _) => "sequoia",
        (14, _) => "sonoma",
        (13, _) => "ventura",
        (12, _) => "monterey",
        (11, _) => "big_sur",
        (10, 15) => "catalina",
        (10, 14) => "mojave",
        (10, 13) => "high_sierra",
        (m, _) if m > 15 => "unreleased",
        _ => "unsupported",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_plain_lines() {
        assert_eq!(parse_lines("git\n\n  wget \n"), vec!["git", "wget"]);
        assert!(parse_lines("").is_empty());
    }

    #[test]
    fn parse_cask_list_strips_missing_marker() {
        assert_eq!(
            parse_cask_list("firefox\ngoogle-chrome (!)\n"),
            vec!["firefox", "google-chrome"]
        );
    }

    #[test]
    fn parse_mas_output() {
        let out = "497799835  Xcode          (15.3)\n443987910  1Password 7 - Password Manager  (7.9.11)\n";
        let apps = parse_mas_list(out);
        assert_eq!(apps.len(), 2);
        assert_eq!(apps[0].id, "497799835");
        assert_eq!(apps[0].name, "Xcode");
        assert_eq!(apps[0].version, "15.3");
        assert_eq!(apps[1].name, "1Password 7 - Password Manager");
        assert_eq!(apps[1].version, "7.9.11");
    }

    #[test]
    fn parse_mas_skips_malformed_lines() {
        assert!(parse_mas_list("No installed apps found\n").is_empty());
        assert!(parse_mas_list("\n").is_empty());
    }

    #[test]
    fn parse_whalebrew_table() {
        let out = "COMMAND   IMAGE\nwget      whalebrew/wget\nansible   whalebrew/ansible\n";
        assert_eq!(
            parse_whalebrew_list(out),
            vec!["whalebrew/wget", "whalebrew/ansible"]
        );
        assert!(parse_whalebrew_list("").is_empty());
    }

    #[test]
    fn parse_formula_info_prefers_installed_version() {
        let out = r#"{"formulae":[{"name":"git","versions":{"stable":"2.45.0"},
            "installed":[{"version":"2.44.0"}],
            "bottle":{"stable":{"rebuild":0,"files":{}}}}],"casks":[]}"#;
        let state = parse_formula_info(out).unwrap().unwrap();
        assert_eq!(state["version"], json!("2.44.0"));
        assert_eq!(state["bottle"], json!({"rebuild": 0, "files": {}}));
    }

    #[test]
    fn parse_formula_info_without_bottle() {
        let out = r#"{"formulae":[{"name":"x","versions":{"stable":"1.0"},"installed":[]}]}"#;
        let state = parse_formula_info(out).unwrap().unwrap();
        assert_eq!(state["version"], json!("1.0"));
        assert_eq!(state["bottle"], json!(false));
    }

    #[test]
    fn parse_formula_info_empty_and_invalid() {
        assert!(parse_formula_info(r#"{"formulae":[]}"#).unwrap().is_none());
        assert!(matches!(
            parse_formula_info("not json"),
            Err(RuntimeError::Parse(_))
        ));
    }

    #[test]
    fn parse_cask_versions_takes_last_version() {
        let versions = parse_cask_versions("firefox 119.0 120.0\nslack 4.36\n");
        assert_eq!(versions["firefox"], "120.0");
        assert_eq!(versions["slack"], "4.36");
    }

    #[test]
    fn parse_digest() {
        assert_eq!(
            parse_repo_digest("whalebrew/wget@sha256:abc123\n").as_deref(),
            Some("abc123")
        );
        assert_eq!(parse_repo_digest(""), None);
    }

    #[test]
    fn parse_versions() {
        assert_eq!(
            parse_brew_version("Homebrew 4.2.0\nHomebrew/homebrew-core (git revision 1)\n").as_deref(),
            Some("4.2.0")
        );
        assert_eq!(parse_brew_version("brew: not found"), None);
        assert_eq!(
            parse_xcode_version("Xcode 15.3\nBuild version 15E204a\n").as_deref(),
            Some("15.3")
        );
        assert_eq!(
            parse_pkg_info_version("package-id: com.apple.pkg.CLTools_Executables\nversion: 15.3.0.0.1.1708646388\n")
                .as_deref(),
            Some("15.3.0.0.1.1708646388")
        );
    }

    #[test]
    fn parse_os_release_pretty_name() {
        let content = "NAME=\"Ubuntu\"\nPRETTY_NAME=\"Ubuntu 24.04 LTS\"\nID=ubuntu\n";
        assert_eq!(parse_os_release(content).as_deref(), Some("Ubuntu 24.04 LTS"));
        assert_eq!(parse_os_release("ID=arch\n"), None);
    }

    #[test]
    fn macos_codenames() {
        assert_eq!(macos_codename("14.4.1"), "sonoma");
        assert_eq!(macos_codename("10.15.7"), "catalina");
        assert_eq!(macos_codename("11.0"), "big_sur");
        assert_eq!(macos_codename("garbage"), "unsupported");
    }
}
