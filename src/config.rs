// src/config.rs

//! User configuration
//!
//! Stored as a key file with a single `[AppNest]` group:
//!
//! ```text
//! [AppNest]
//! ask_to_move = true
//! destination = ~/Applications
//! enable_daemon = true
//! ```
//!
//! A missing file means all defaults. Unknown keys are ignored.

use crate::desktop::entry::DesktopEntry;
use crate::error::{Error, Result};
use crate::filesystem;
use crate::integration::DestinationPolicy;
use crate::paths;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Group holding all settings
pub const CONFIG_GROUP: &str = "AppNest";

const DEFAULT_ASK_TO_MOVE: bool = true;
const DEFAULT_DESTINATION: &str = "~/Applications";
const DEFAULT_ENABLE_DAEMON: bool = true;

/// Settings as read from disk; `None` means "not set"
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub ask_to_move: Option<bool>,
    pub destination: Option<PathBuf>,
    pub enable_daemon: Option<bool>,
    home: PathBuf,
}

impl Config {
    /// Configuration with every key unset
    pub fn empty(home: PathBuf) -> Self {
        Self {
            ask_to_move: None,
            destination: None,
            enable_daemon: None,
            home,
        }
    }

    /// Load from the default location
    pub fn load() -> Result<Self> {
        let path = paths::config_file_path()?;
        Self::load_from(&path, &paths::home_dir()?)
    }

    /// Load from `path`, falling back to defaults if it does not exist
    pub fn load_from(path: &Path, home: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No configuration at {}, using defaults", path.display());
            return Ok(Self::empty(home.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|e| {
            Error::ConfigError(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let config = Self::parse(&content, home).map_err(|e| match e {
            Error::ConfigError(msg) => Error::ConfigError(format!("{}: {}", path.display(), msg)),
            other => other,
        })?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse configuration text
    pub fn parse(content: &str, home: &Path) -> Result<Self> {
        let doc = DesktopEntry::parse(content).map_err(|e| Error::ConfigError(e.to_string()))?;
        let mut config = Self::empty(home.to_path_buf());

        if let Some(value) = doc.get(CONFIG_GROUP, "ask_to_move") {
            config.ask_to_move = Some(parse_bool("ask_to_move", &value)?);
        }

        if let Some(value) = doc.get(CONFIG_GROUP, "destination") {
            let value = value.trim();
            if !value.is_empty() {
                config.destination = Some(paths::expand_tilde(value, home));
            }
        }

        if let Some(value) = doc.get(CONFIG_GROUP, "enable_daemon") {
            config.enable_daemon = Some(parse_bool("enable_daemon", &value)?);
        }

        Ok(config)
    }

    pub fn ask_to_move(&self) -> bool {
        self.ask_to_move.unwrap_or(DEFAULT_ASK_TO_MOVE)
    }

    pub fn enable_daemon(&self) -> bool {
        self.enable_daemon.unwrap_or(DEFAULT_ENABLE_DAEMON)
    }

    /// Integration folder, `~/Applications` unless configured
    pub fn destination(&self) -> PathBuf {
        self.destination
            .clone()
            .unwrap_or_else(|| paths::expand_tilde(DEFAULT_DESTINATION, &self.home))
    }

    pub fn destination_policy(&self) -> DestinationPolicy {
        DestinationPolicy::new(self.destination(), self.ask_to_move())
    }

    /// File contents with unset keys written as commented defaults
    pub fn render(&self) -> String {
        let mut out = format!("[{}]\n", CONFIG_GROUP);

        let ask_to_move = self.ask_to_move.map(|v| v.to_string());
        let destination = self.destination.as_ref().map(|p| p.display().to_string());
        let enable_daemon = self.enable_daemon.map(|v| v.to_string());

        let keys = [
            ("ask_to_move", ask_to_move, DEFAULT_ASK_TO_MOVE.to_string()),
            ("destination", destination, DEFAULT_DESTINATION.to_string()),
            ("enable_daemon", enable_daemon, DEFAULT_ENABLE_DAEMON.to_string()),
        ];

        for (key, value, default) in keys {
            // writing to a String cannot fail
            let _ = match value {
                Some(value) => writeln!(out, "{} = {}", key, value),
                None => writeln!(out, "# {} = {}", key, default),
            };
        }

        out
    }

    /// Write `render()` to `path`, creating the parent directory
    pub fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                Error::ConfigError(format!("Failed to create {}: {}", parent.display(), e))
            })?;
        }
        filesystem::atomic_write(path, self.render().as_bytes())
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        other => Err(Error::ConfigError(format!(
            "Invalid boolean for {}: '{}'",
            key, other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn home() -> PathBuf {
        PathBuf::from("/home/alex")
    }

    #[test]
    fn test_defaults() {
        let config = Config::empty(home());
        assert!(config.ask_to_move());
        assert!(config.enable_daemon());
        assert_eq!(config.destination(), PathBuf::from("/home/alex/Applications"));

        let policy = config.destination_policy();
        assert_eq!(policy.root_directory, PathBuf::from("/home/alex/Applications"));
        assert!(policy.ask_before_moving);
    }

    #[test]
    fn test_parse_values() {
        let config = Config::parse(
            "[AppNest]\nask_to_move = false\ndestination = ~/Apps\nenable_daemon=0\nunknown=1\n",
            &home(),
        )
        .unwrap();

        assert_eq!(config.ask_to_move, Some(false));
        assert_eq!(config.destination, Some(PathBuf::from("/home/alex/Apps")));
        assert_eq!(config.enable_daemon, Some(false));
        assert!(!config.destination_policy().ask_before_moving);
    }

    #[test]
    fn test_commented_keys_are_unset() {
        let config = Config::parse(
            "[AppNest]\n# ask_to_move = false\n# destination = /opt\n",
            &home(),
        )
        .unwrap();
        assert_eq!(config, Config::empty(home()));
    }

    #[test]
    fn test_invalid_bool() {
        let result = Config::parse("[AppNest]\nask_to_move = maybe\n", &home());
        assert!(matches!(result, Err(Error::ConfigError(_))));
    }

    #[test]
    fn test_malformed_file() {
        let result = Config::parse("ask_to_move = true\n", &home());
        assert!(matches!(result, Err(Error::ConfigError(_))));
    }

    #[test]
    fn test_render_unset_as_comments() {
        let mut config = Config::empty(home());
        config.enable_daemon = Some(false);

        assert_eq!(
            config.render(),
            "[AppNest]\n# ask_to_move = true\n# destination = ~/Applications\nenable_daemon = false\n"
        );
    }

    #[test]
    fn test_write_and_load() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config/appnest.cfg");

        let mut config = Config::empty(home());
        config.destination = Some(PathBuf::from("/opt/images"));
        config.write_to(&path).unwrap();

        let loaded = Config::load_from(&path, &home()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let loaded = Config::load_from(Path::new("/nonexistent/appnest.cfg"), &home()).unwrap();
        assert_eq!(loaded, Config::empty(home()));
    }
}
