// src/paths.rs

//! XDG locations used by the integration engine

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// System-wide launcher directory
pub const SYSTEM_APPLICATIONS_DIR: &str = "/usr/share/applications";

/// Configuration file name below the user config directory
pub const CONFIG_FILE_NAME: &str = "appnest.cfg";

/// Systemd user unit of the background mount service
pub const MOUNT_SERVICE_UNIT: &str = "appnest-fs.service";

/// Home directory of the current user
pub fn home_dir() -> Result<PathBuf> {
    dirs::home_dir()
        .ok_or_else(|| Error::ConfigError("Could not determine home directory".to_string()))
}

/// `$XDG_DATA_HOME`, usually `~/.local/share`
pub fn data_dir() -> Result<PathBuf> {
    dirs::data_dir()
        .ok_or_else(|| Error::ConfigError("Could not determine XDG data directory".to_string()))
}

/// User-local launcher directory (`~/.local/share/applications`)
pub fn user_applications_dir() -> Result<PathBuf> {
    Ok(data_dir()?.join("applications"))
}

/// User icon directory (`~/.local/share/icons`)
pub fn user_icons_dir() -> Result<PathBuf> {
    Ok(data_dir()?.join("icons"))
}

/// Launcher directories scanned for name collisions, system-wide first
pub fn launcher_dirs() -> Result<Vec<PathBuf>> {
    Ok(vec![
        PathBuf::from(SYSTEM_APPLICATIONS_DIR),
        user_applications_dir()?,
    ])
}

/// Path of the configuration file
pub fn config_file_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| Error::ConfigError("Could not determine XDG config directory".to_string()))?;
    Ok(config_dir.join(CONFIG_FILE_NAME))
}

/// Directory holding `desktopfiles.<locale>.json` catalogs
///
/// Resolved relative to the running binary (`<prefix>/bin/appnest` ->
/// `<prefix>/share/appnest/i18n`).
pub fn translations_dir(own_binary: &Path) -> Option<PathBuf> {
    let prefix = own_binary.parent()?.parent()?;
    Some(prefix.join("share").join("appnest").join("i18n"))
}

/// Replace a leading `~` with the home directory
pub fn expand_tilde(path: &str, home: &Path) -> PathBuf {
    match path.strip_prefix('~') {
        Some(rest) => {
            let rest = rest.trim_start_matches('/');
            if rest.is_empty() {
                home.to_path_buf()
            } else {
                home.join(rest)
            }
        }
        None => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_tilde() {
        let home = Path::new("/home/alex");
        assert_eq!(expand_tilde("~/Apps", home), PathBuf::from("/home/alex/Apps"));
        assert_eq!(expand_tilde("~", home), PathBuf::from("/home/alex"));
        assert_eq!(expand_tilde("/opt/apps", home), PathBuf::from("/opt/apps"));
        assert_eq!(expand_tilde("rel/~x", home), PathBuf::from("rel/~x"));
    }

    #[test]
    fn test_translations_dir_from_binary() {
        let dir = translations_dir(Path::new("/usr/bin/appnest")).unwrap();
        assert_eq!(dir, PathBuf::from("/usr/share/appnest/i18n"));
        assert!(translations_dir(Path::new("appnest")).is_none());
    }
}
