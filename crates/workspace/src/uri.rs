//! URI detection pattern and browser launching.

use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Pattern matching URI-like substrings in terminal output.
const URI_PATTERN: &str = r"[a-zA-Z0-9+-]+://\S*[a-zA-Z0-9_/%&=]";

static URI_REGEX: OnceLock<Regex> = OnceLock::new();

/// The single precompiled URI pattern every tab registers.
pub fn uri_regex() -> &'static Regex {
    URI_REGEX.get_or_init(|| Regex::new(URI_PATTERN).expect("failed to compile URI regex"))
}

/// Browser launchers, tried in order.
const BROWSERS: &[&str] = &["xdg-open", "x-www-browser", "www-browser"];

/// Open a URI with the first available browser launcher, as a detached
/// child process. Failures are logged, never fatal.
pub fn open_uri(uri: &str) {
    let dirs = std::env::var_os("PATH")
        .map(|path| std::env::split_paths(&path).collect::<Vec<_>>())
        .unwrap_or_default();

    let Some(browser) = BROWSERS
        .iter()
        .find_map(|name| find_in_dirs(name, dirs.iter().map(PathBuf::as_path)))
    else {
        tracing::error!("cannot find a browser");
        return;
    };

    if let Err(e) = std::process::Command::new(&browser).arg(uri).spawn() {
        tracing::error!("failed to open URI: {}", e);
    }
}

/// Locate an executable in the given directories.
fn find_in_dirs<'a>(
    program: &str,
    dirs: impl Iterator<Item = &'a Path>,
) -> Option<PathBuf> {
    for dir in dirs {
        let candidate = dir.join(program);
        if is_executable(&candidate) {
            return Some(candidate);
        }
    }
    None
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn uri_regex_matches_schemes() {
        let re = uri_regex();
        assert_eq!(
            re.find("visit https://example.com/page?x=1 now")
                .map(|m| m.as_str()),
            Some("https://example.com/page?x=1")
        );
        assert!(re.is_match("git+ssh://host/repo"));
        assert!(!re.is_match("plain text without links"));
    }

    #[test]
    fn uri_regex_does_not_end_on_punctuation() {
        let re = uri_regex();
        // The trailing character class excludes the closing period.
        assert_eq!(
            re.find("see http://example.com/a.").map(|m| m.as_str()),
            Some("http://example.com/a")
        );
    }

    #[cfg(unix)]
    #[test]
    fn find_in_dirs_requires_executable_bit() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let plain = dir.path().join("plain");
        std::fs::write(&plain, "#!/bin/sh\n").unwrap();
        assert_eq!(find_in_dirs("plain", [dir.path()].into_iter()), None);

        let mut perms = std::fs::metadata(&plain).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&plain, perms).unwrap();
        assert_eq!(
            find_in_dirs("plain", [dir.path()].into_iter()),
            Some(plain)
        );
    }

    #[test]
    fn find_in_dirs_misses_absent_program() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(find_in_dirs("nothing-here", [dir.path()].into_iter()), None);
    }
}
