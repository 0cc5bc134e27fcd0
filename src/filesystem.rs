// src/filesystem.rs

//! Filesystem primitives shared by integration and maintenance
//!
//! Atomic document writes, permission handling and recursive icon cleanup.

use crate::error::{Error, Result};
use nix::unistd::{Gid, Uid, getegid, geteuid};
use std::fs;
use std::io::Write;
use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::path::Path;
use std::time::SystemTime;
use tempfile::NamedTempFile;
use tracing::{debug, warn};
use walkdir::WalkDir;

const OWNER_EXEC: u32 = 0o100;
const GROUP_EXEC: u32 = 0o010;
const OTHER_EXEC: u32 = 0o001;

/// Write `contents` to `path` atomically
///
/// The data goes to a temporary file in the same directory which is then
/// renamed over the target, so readers never observe a half-written file.
pub fn atomic_write(path: &Path, contents: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = NamedTempFile::new_in(parent).map_err(|e| {
        Error::IoError(format!(
            "Failed to create temporary file in {}: {}",
            parent.display(),
            e
        ))
    })?;

    temp.write_all(contents)
        .and_then(|_| temp.as_file().sync_all())
        .map_err(|e| Error::IoError(format!("Failed to write {}: {}", path.display(), e)))?;

    // Keep the permissions of the document being replaced
    if let Ok(meta) = fs::metadata(path) {
        let _ = fs::set_permissions(temp.path(), meta.permissions());
    }

    temp.persist(path).map_err(|e| {
        Error::IoError(format!("Failed to replace {}: {}", path.display(), e.error))
    })?;

    debug!("Atomically wrote {}", path.display());
    Ok(())
}

/// Whether the current user can already execute the file
fn is_effectively_executable(mode: u32, uid: u32, gid: u32) -> bool {
    (Uid::from_raw(uid) == geteuid() && mode & OWNER_EXEC != 0)
        || (Gid::from_raw(gid) == getegid() && mode & GROUP_EXEC != 0)
        || mode & OTHER_EXEC != 0
}

/// Add owner/group/other execute bits to a file
///
/// Nothing is changed when the file is already executable for the current
/// user; this avoids chmod failures on read-only mounts. Returns whether the
/// permissions were modified.
pub fn make_executable(path: &Path) -> Result<bool> {
    let meta = fs::metadata(path)
        .map_err(|e| Error::IoError(format!("Failed to stat {}: {}", path.display(), e)))?;

    let mode = meta.mode();
    if is_effectively_executable(mode, meta.uid(), meta.gid()) {
        return Ok(false);
    }

    let new_mode = (mode | OWNER_EXEC | GROUP_EXEC | OTHER_EXEC) & 0o7777;
    fs::set_permissions(path, fs::Permissions::from_mode(new_mode))
        .map_err(|e| Error::IoError(format!("Failed to chmod {}: {}", path.display(), e)))?;

    debug!("Marked {} executable ({:o})", path.display(), new_mode);
    Ok(true)
}

/// Modification time of a path
pub fn modified_time(path: &Path) -> Result<SystemTime> {
    fs::metadata(path)
        .and_then(|meta| meta.modified())
        .map_err(|e| Error::IoError(format!("Failed to stat {}: {}", path.display(), e)))
}

/// Whether two paths denote the same file
///
/// Falls back to comparing the lexical absolute paths when either side does
/// not exist yet.
pub fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::metadata(a), fs::metadata(b)) {
        (Ok(ma), Ok(mb)) => ma.dev() == mb.dev() && ma.ino() == mb.ino(),
        _ => std::path::absolute(a).ok() == std::path::absolute(b).ok(),
    }
}

/// File name without its last extension (`foo.png` -> `foo`, `a.b.svg` -> `a.b`)
pub fn complete_base_name(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_string_lossy();
    match name.rfind('.') {
        Some(0) | None => Some(name.to_string()),
        Some(pos) => Some(name[..pos].to_string()),
    }
}

/// Delete every file below `root` whose base name starts with `prefix`
///
/// Best effort: failures are logged and skipped. Returns how many files were
/// removed.
pub fn remove_files_with_prefix(root: &Path, prefix: &str) -> usize {
    if prefix.is_empty() || !root.is_dir() {
        return 0;
    }

    let mut removed = 0;
    for entry in WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() && !entry.file_type().is_symlink() {
            continue;
        }

        let matches = complete_base_name(entry.path())
            .map(|base| base.starts_with(prefix))
            .unwrap_or(false);
        if !matches {
            continue;
        }

        match fs::remove_file(entry.path()) {
            Ok(()) => {
                debug!("Removed {}", entry.path().display());
                removed += 1;
            }
            Err(e) => warn!("Failed to remove {}: {}", entry.path().display(), e),
        }
    }

    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_atomic_write_replaces_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("doc.desktop");

        atomic_write(&path, b"first").unwrap();
        atomic_write(&path, b"second").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
        // no stray temporary files left behind
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_atomic_write_keeps_permissions() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("doc.desktop");
        fs::write(&path, b"x").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();

        atomic_write(&path, b"y").unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[test]
    fn test_make_executable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tool");
        fs::write(&path, b"#!/bin/sh\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

        assert!(make_executable(&path).unwrap());
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);

        // second call is a no-op
        assert!(!make_executable(&path).unwrap());
    }

    #[test]
    fn test_make_executable_missing_file() {
        let result = make_executable(Path::new("/nonexistent/appnest/file"));
        assert!(matches!(result, Err(Error::IoError(_))));
    }

    #[test]
    fn test_complete_base_name() {
        assert_eq!(complete_base_name(Path::new("/a/foo.png")).unwrap(), "foo");
        assert_eq!(complete_base_name(Path::new("a.b.svg")).unwrap(), "a.b");
        assert_eq!(complete_base_name(Path::new("noext")).unwrap(), "noext");
        assert_eq!(complete_base_name(Path::new(".hidden")).unwrap(), ".hidden");
    }

    #[test]
    fn test_remove_files_with_prefix() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("hicolor/48x48/apps");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("appimagekit_abc_Foo.png"), b"").unwrap();
        fs::write(dir.path().join("appimagekit_abc_Foo.svg"), b"").unwrap();
        fs::write(nested.join("other.png"), b"").unwrap();

        let removed = remove_files_with_prefix(dir.path(), "appimagekit_abc");
        assert_eq!(removed, 2);
        assert!(nested.join("other.png").exists());

        // empty prefix never matches
        assert_eq!(remove_files_with_prefix(dir.path(), ""), 0);
    }

    #[test]
    fn test_same_file() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a");
        fs::write(&a, b"").unwrap();
        let dotted = dir.path().join(".").join("a");

        assert!(same_file(&a, &dotted));
        assert!(!same_file(&a, &dir.path().join("b")));
    }
}
