// src/maintenance/refresh.rs

//! Best-effort refresh of desktop caches and shell notifications
//!
//! None of the tools used here are required. Each is looked up on `PATH`
//! before it is run and its exit status is not evaluated.

use std::path::Path;
use std::process::{Command, Stdio};
use tracing::debug;

/// Run `program` with `args` if it is installed; returns whether it was started
fn run_if_available(program: &str, args: &[&str]) -> bool {
    let Ok(executable) = which::which(program) else {
        debug!("{} not found on PATH, skipping", program);
        return false;
    };

    let result = Command::new(&executable)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();

    match result {
        Ok(status) => {
            debug!("{} {:?} exited with {}", program, args, status);
            true
        }
        Err(e) => {
            debug!("Failed to execute {}: {}", executable.display(), e);
            false
        }
    }
}

/// Rebuild the desktop database and icon caches after a batch of changes
pub fn refresh_desktop_caches(applications_dir: &Path, icons_dir: &Path) {
    let applications = applications_dir.to_string_lossy();
    let icons = icons_dir.join("hicolor");
    let icons = icons.to_string_lossy();

    run_if_available("update-desktop-database", &[applications.as_ref()]);

    // GTK 3 installs a versioned binary next to the legacy one
    for tool in ["gtk-update-icon-cache-3.0", "gtk-update-icon-cache"] {
        run_if_available(tool, &["-t", icons.as_ref()]);
    }

    run_if_available("xdg-desktop-menu", &["forceupdate"]);
}

/// Tell KDE-based shells that icons changed
///
/// Fire and forget: returns whether the signal could be sent.
pub fn notify_icon_change() -> bool {
    run_if_available(
        "dbus-send",
        &[
            "--session",
            "--type=signal",
            "/KIconLoader",
            "org.kde.KIconLoader.iconChanged",
            "int32:0",
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_tool_is_tolerated() {
        assert!(!run_if_available("appnest-no-such-tool-xyz", &["--help"]));
    }

    #[test]
    fn test_refresh_never_fails() {
        // whatever is installed, a refresh against missing directories must not panic
        refresh_desktop_caches(Path::new("/nonexistent/apps"), Path::new("/nonexistent/icons"));
    }
}
