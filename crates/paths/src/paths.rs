//! Centralized path management for tabterm.
//!
//! The configuration directory is lazily initialized and cached.
//! Use `set_config_dir` before the first access to override for testing.

use std::path::PathBuf;
use std::sync::OnceLock;

static CONFIG_DIR: OnceLock<PathBuf> = OnceLock::new();

/// ~/.config/tabterm (or platform equivalent)
pub fn config_dir() -> &'static PathBuf {
    CONFIG_DIR.get_or_init(|| {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tabterm")
    })
}

/// Override config dir (must be called before first access). For testing.
pub fn set_config_dir(path: PathBuf) {
    let _ = CONFIG_DIR.set(path);
}

/// Config file path: config_dir()/tabterm.toml
pub fn config_file() -> PathBuf {
    config_dir().join("tabterm.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_dir_ends_with_tabterm() {
        let dir = config_dir();
        assert!(
            dir.ends_with("tabterm"),
            "config_dir should end with 'tabterm': {:?}",
            dir
        );
    }

    #[test]
    fn config_file_is_toml() {
        let path = config_file();
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("toml"));
    }
}
