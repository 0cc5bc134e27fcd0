// src/maintenance/cleanup.rs

//! Removal of launcher documents whose image no longer exists

use crate::desktop::entry::{DESKTOP_ENTRY_GROUP, DesktopEntry};
use crate::desktop::registrar::GENERATED_ENTRY_PREFIX;
use crate::filesystem;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Sweeps generated launcher documents for orphans
#[derive(Debug, Clone)]
pub struct StaleEntryCollector {
    applications_dir: PathBuf,
    icons_dir: PathBuf,
}

impl StaleEntryCollector {
    pub fn new(applications_dir: PathBuf, icons_dir: PathBuf) -> Self {
        Self {
            applications_dir,
            icons_dir,
        }
    }

    /// Generated launcher documents in the applications directory, sorted
    fn generated_entries(&self) -> Vec<PathBuf> {
        let Ok(entries) = fs::read_dir(&self.applications_dir) else {
            debug!("No launcher directory at {}", self.applications_dir.display());
            return Vec::new();
        };

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|path| path.is_file())
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(GENERATED_ENTRY_PREFIX) && n.ends_with(".desktop"))
            })
            .collect();
        paths.sort();
        paths
    }

    /// Remove every generated document whose image is gone, with its icons
    ///
    /// Returns the number of removed documents. Problems with a single
    /// document never abort the sweep.
    pub fn collect(&self, verbose: bool) -> usize {
        let mut removed = 0;

        for path in self.generated_entries() {
            let doc = match DesktopEntry::load(&path) {
                Ok(doc) => doc,
                Err(e) => {
                    debug!("Skipping {}: {}", path.display(), e);
                    continue;
                }
            };

            let Some(image) = implied_image_path(&doc) else {
                debug!("Skipping malformed launcher {}", path.display());
                continue;
            };

            if image.exists() {
                continue;
            }

            if let Err(e) = fs::remove_file(&path) {
                warn!("Failed to remove {}: {}", path.display(), e);
                continue;
            }
            removed += 1;

            if verbose {
                info!("Removed {} ({} no longer exists)", path.display(), image.display());
            } else {
                debug!("Removed {} ({} no longer exists)", path.display(), image.display());
            }

            if let Some(icon) = doc.get(DESKTOP_ENTRY_GROUP, "Icon") {
                let icon = icon.trim();
                if !icon.is_empty() {
                    let icons = filesystem::remove_files_with_prefix(&self.icons_dir, icon);
                    debug!("Removed {} icon(s) named {}", icons, icon);
                }
            }
        }

        if verbose {
            info!("Removed {} stale launcher(s)", removed);
        }
        removed
    }
}

/// Image a launcher document points at
///
/// `TryExec` wins when present, otherwise the first token of `Exec`.
/// Documents without `Exec` yield `None`.
pub fn implied_image_path(doc: &DesktopEntry) -> Option<PathBuf> {
    let exec = doc.get(DESKTOP_ENTRY_GROUP, "Exec")?;

    let implied = match doc.get(DESKTOP_ENTRY_GROUP, "TryExec") {
        Some(try_exec) if !try_exec.trim().is_empty() => try_exec.trim().to_string(),
        _ => first_exec_token(&exec)?,
    };

    (!implied.is_empty()).then(|| PathBuf::from(implied))
}

/// First token of an Exec line, honouring a leading double-quoted argument
fn first_exec_token(exec: &str) -> Option<String> {
    let exec = exec.trim_start();
    if let Some(rest) = exec.strip_prefix('"') {
        let end = rest.find('"')?;
        return Some(rest[..end].to_string());
    }
    exec.split_whitespace().next().map(|t| t.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, StaleEntryCollector) {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("applications")).unwrap();
        fs::create_dir_all(tmp.path().join("icons/hicolor/scalable/apps")).unwrap();
        let collector = StaleEntryCollector::new(
            tmp.path().join("applications"),
            tmp.path().join("icons"),
        );
        (tmp, collector)
    }

    #[test]
    fn test_first_exec_token() {
        assert_eq!(first_exec_token("/opt/foo %U").as_deref(), Some("/opt/foo"));
        assert_eq!(
            first_exec_token("\"/opt/my app\" %U").as_deref(),
            Some("/opt/my app")
        );
        assert!(first_exec_token("   ").is_none());
        assert!(first_exec_token("\"unterminated").is_none());
    }

    #[test]
    fn test_implied_path_prefers_try_exec() {
        let doc = DesktopEntry::parse(
            "[Desktop Entry]\nExec=/usr/bin/wrapper /opt/a\nTryExec=/opt/b.AppImage\n",
        )
        .unwrap();
        assert_eq!(implied_image_path(&doc), Some(PathBuf::from("/opt/b.AppImage")));

        let doc = DesktopEntry::parse("[Desktop Entry]\nExec=/opt/c.AppImage --flag\n").unwrap();
        assert_eq!(implied_image_path(&doc), Some(PathBuf::from("/opt/c.AppImage")));

        let doc = DesktopEntry::parse("[Desktop Entry]\nTryExec=/opt/d\n").unwrap();
        assert!(implied_image_path(&doc).is_none());
    }

    #[test]
    fn test_collect_removes_only_orphans() {
        let (tmp, collector) = setup();
        let apps = tmp.path().join("applications");
        let icons = tmp.path().join("icons/hicolor/scalable/apps");

        let alive_image = tmp.path().join("Alive.AppImage");
        fs::write(&alive_image, b"image").unwrap();

        let alive = apps.join("appimagekit_aaa-Alive.desktop");
        let alive_content = format!(
            "# keep me\n[Desktop Entry]\nName=Alive\nExec=\"{}\" %U\nIcon=appimagekit_aaa_Alive\n",
            alive_image.display()
        );
        fs::write(&alive, &alive_content).unwrap();

        let gone = apps.join("appimagekit_bbb-Gone.desktop");
        fs::write(
            &gone,
            format!(
                "[Desktop Entry]\nName=Gone\nExec={}/Gone.AppImage\nIcon=appimagekit_bbb_Gone\n",
                tmp.path().display()
            ),
        )
        .unwrap();

        fs::write(icons.join("appimagekit_aaa_Alive.svg"), b"svg").unwrap();
        fs::write(icons.join("appimagekit_bbb_Gone.svg"), b"svg").unwrap();
        fs::write(icons.join("appimagekit_bbb_Gone_small.png"), b"png").unwrap();

        assert_eq!(collector.collect(true), 1);

        assert!(!gone.exists());
        assert!(!icons.join("appimagekit_bbb_Gone.svg").exists());
        assert!(!icons.join("appimagekit_bbb_Gone_small.png").exists());

        assert_eq!(fs::read_to_string(&alive).unwrap(), alive_content);
        assert!(icons.join("appimagekit_aaa_Alive.svg").exists());
    }

    #[test]
    fn test_collect_ignores_foreign_and_broken_documents() {
        let (tmp, collector) = setup();
        let apps = tmp.path().join("applications");

        // not generated by us
        let foreign = apps.join("firefox.desktop");
        fs::write(&foreign, "[Desktop Entry]\nExec=/nonexistent/firefox\n").unwrap();

        let broken = apps.join("appimagekit_ccc-Broken.desktop");
        fs::write(&broken, "garbage without groups").unwrap();

        let no_exec = apps.join("appimagekit_ddd-NoExec.desktop");
        fs::write(&no_exec, "[Desktop Entry]\nName=NoExec\n").unwrap();

        assert_eq!(collector.collect(false), 0);
        assert!(foreign.exists());
        assert!(broken.exists());
        assert!(no_exec.exists());
    }

    #[test]
    fn test_existing_non_image_path_is_kept() {
        let (tmp, collector) = setup();
        let apps = tmp.path().join("applications");

        let entry = apps.join("appimagekit_eee-Dir.desktop");
        fs::write(
            &entry,
            format!("[Desktop Entry]\nExec={} %U\n", tmp.path().display()),
        )
        .unwrap();

        assert_eq!(collector.collect(false), 0);
        assert!(entry.exists());
    }

    #[test]
    fn test_empty_icon_removes_no_icons() {
        let (tmp, collector) = setup();
        let apps = tmp.path().join("applications");
        let icons = tmp.path().join("icons/hicolor/scalable/apps");
        fs::write(icons.join("unrelated.svg"), b"svg").unwrap();

        fs::write(
            apps.join("appimagekit_fff-Gone.desktop"),
            "[Desktop Entry]\nExec=/nonexistent/Gone.AppImage\nIcon=\n",
        )
        .unwrap();

        assert_eq!(collector.collect(false), 1);
        assert!(icons.join("unrelated.svg").exists());
    }

    #[test]
    fn test_missing_directory_collects_nothing() {
        let collector = StaleEntryCollector::new(
            PathBuf::from("/nonexistent/applications"),
            PathBuf::from("/nonexistent/icons"),
        );
        assert_eq!(collector.collect(true), 0);
    }
}
