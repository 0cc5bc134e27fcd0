// src/desktop/registrar.rs

//! Base registration of launcher documents
//!
//! The registrar owns the naming of generated launcher documents and writes
//! the minimal document that the synthesizer later enriches.

use crate::desktop::entry::{DESKTOP_ENTRY_GROUP, DesktopEntry};
use crate::error::{Error, Result};
use crate::filesystem;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File name prefix shared by all generated launcher documents and icons
pub const GENERATED_ENTRY_PREFIX: &str = "appimagekit_";

const PATH_HASH_BYTES: usize = 16;
const DIGEST_HEX_LEN: usize = 32;

/// Creates and removes the launcher document of an image
pub trait Registrar {
    /// Where the launcher document of `image` lives
    fn entry_path(&self, image: &Path) -> PathBuf;

    /// Write a minimal launcher document unless one exists; returns its path
    fn register(&self, image: &Path) -> Result<PathBuf>;

    fn is_registered(&self, image: &Path) -> bool {
        self.entry_path(image).is_file()
    }

    /// Remove the launcher document and its icons
    fn unregister(&self, image: &Path) -> Result<()>;
}

/// Registrar writing to the user's XDG data directories
#[derive(Debug, Clone)]
pub struct EntryRegistrar {
    applications_dir: PathBuf,
    icons_dir: PathBuf,
}

impl EntryRegistrar {
    pub fn new(applications_dir: PathBuf, icons_dir: PathBuf) -> Self {
        Self {
            applications_dir,
            icons_dir,
        }
    }

    /// Icon name declared by the generated document
    pub fn icon_name(&self, image: &Path) -> String {
        format!("{}{}_{}", GENERATED_ENTRY_PREFIX, path_hash(image), file_stem(image))
    }

    /// Minimal document for `image`
    fn base_entry(&self, image: &Path) -> DesktopEntry {
        let absolute = absolute(image);
        let quoted = format!("\"{}\"", absolute.display());

        let mut entry = DesktopEntry::new();
        entry.set(DESKTOP_ENTRY_GROUP, "Type", "Application");
        entry.set(DESKTOP_ENTRY_GROUP, "Name", &display_name(image));
        entry.set(DESKTOP_ENTRY_GROUP, "Exec", &format!("{} %U", quoted));
        entry.set(DESKTOP_ENTRY_GROUP, "TryExec", &absolute.to_string_lossy());
        entry.set(DESKTOP_ENTRY_GROUP, "Icon", &self.icon_name(image));
        entry.set(DESKTOP_ENTRY_GROUP, "Terminal", "false");
        entry
    }
}

impl Registrar for EntryRegistrar {
    fn entry_path(&self, image: &Path) -> PathBuf {
        self.applications_dir.join(format!(
            "{}{}-{}.desktop",
            GENERATED_ENTRY_PREFIX,
            path_hash(image),
            file_stem(image)
        ))
    }

    fn register(&self, image: &Path) -> Result<PathBuf> {
        let path = self.entry_path(image);
        if path.is_file() {
            debug!("Launcher {} already exists", path.display());
            return Ok(path);
        }

        fs::create_dir_all(&self.applications_dir).map_err(|e| {
            Error::IoError(format!(
                "Failed to create {}: {}",
                self.applications_dir.display(),
                e
            ))
        })?;

        self.base_entry(image).save(&path)?;
        info!("Registered {} as {}", image.display(), path.display());
        Ok(path)
    }

    fn unregister(&self, image: &Path) -> Result<()> {
        let path = self.entry_path(image);

        // the document may declare a different icon than the generated one
        let icon = DesktopEntry::load(&path)
            .ok()
            .and_then(|doc| doc.get(DESKTOP_ENTRY_GROUP, "Icon"))
            .filter(|icon| !icon.trim().is_empty())
            .unwrap_or_else(|| self.icon_name(image));

        if path.exists() {
            fs::remove_file(&path).map_err(|e| {
                Error::IoError(format!("Failed to remove {}: {}", path.display(), e))
            })?;
            info!("Removed launcher {}", path.display());
        }

        let icons = filesystem::remove_files_with_prefix(&self.icons_dir, &icon);
        debug!("Removed {} icon(s) for {}", icons, image.display());
        Ok(())
    }
}

fn absolute(image: &Path) -> PathBuf {
    std::path::absolute(image).unwrap_or_else(|_| image.to_path_buf())
}

/// 32 hex digit fingerprint of the absolute image path
pub fn path_hash(image: &Path) -> String {
    let digest = Sha256::digest(absolute(image).as_os_str().as_encoded_bytes());
    hex::encode(&digest[..PATH_HASH_BYTES])
}

/// File stem usable inside generated file names
fn file_stem(image: &Path) -> String {
    filesystem::complete_base_name(image)
        .unwrap_or_default()
        .chars()
        .map(|c| if c.is_whitespace() || c == '/' { '_' } else { c })
        .collect()
}

/// Display name derived from the image file name, without a digest suffix
pub fn display_name(image: &Path) -> String {
    let stem = filesystem::complete_base_name(image).unwrap_or_default();
    strip_digest_suffix(&stem).to_string()
}

/// `Foo_<32 hex digits>` -> `Foo`
fn strip_digest_suffix(stem: &str) -> &str {
    let Some(pos) = stem.rfind('_') else {
        return stem;
    };
    let suffix = &stem[pos + 1..];
    if pos > 0 && suffix.len() == DIGEST_HEX_LEN && suffix.bytes().all(|b| b.is_ascii_hexdigit()) {
        &stem[..pos]
    } else {
        stem
    }
}
