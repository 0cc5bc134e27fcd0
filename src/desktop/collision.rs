// src/desktop/collision.rs

//! Display-name collision resolution
//!
//! Collisions are resolved the way file managers name copies: a number in
//! parentheses is appended, one higher than the highest number already in
//! use among the colliding entries.
//!
//! Only the unlocalized `Name` is compared; localized names are not merged
//! across locales.

use crate::desktop::entry::{DESKTOP_ENTRY_GROUP, DesktopEntry};
use crate::filesystem;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// File extension of launcher documents
pub const LAUNCHER_EXTENSION: &str = "desktop";

/// Existing launcher documents whose name collides with a candidate
pub type CollisionSet = BTreeMap<PathBuf, String>;

/// Disambiguates launcher names against the installed launcher documents
#[derive(Debug, Clone)]
pub struct CollisionResolver {
    launcher_dirs: Vec<PathBuf>,
}

impl CollisionResolver {
    /// Create a resolver scanning the given launcher directories
    pub fn new(launcher_dirs: Vec<PathBuf>) -> Self {
        Self { launcher_dirs }
    }

    /// Collect every launcher whose trimmed `Name` starts with the trimmed candidate
    pub fn find_collisions(&self, candidate: &str) -> CollisionSet {
        let candidate = candidate.trim();
        let mut collisions = CollisionSet::new();

        for dir in &self.launcher_dirs {
            let entries = WalkDir::new(dir)
                .follow_links(true)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .filter(|e| {
                    e.path()
                        .extension()
                        .is_some_and(|ext| ext == LAUNCHER_EXTENSION)
                });

            for entry in entries {
                // unparsable files are most likely not launcher documents at all
                let Ok(doc) = DesktopEntry::load(entry.path()) else {
                    debug!("Skipping unparsable launcher {}", entry.path().display());
                    continue;
                };

                let Some(name) = doc.get(DESKTOP_ENTRY_GROUP, "Name") else {
                    continue;
                };

                if name.trim().starts_with(candidate) {
                    collisions.insert(entry.path().to_path_buf(), name);
                }
            }
        }

        collisions
    }

    /// Final display name for a launcher document at `own_path`
    ///
    /// The document's own entry never counts as a collision.
    pub fn resolve_name(&self, candidate: &str, own_path: &Path) -> String {
        let mut collisions = self.find_collisions(candidate);
        collisions.retain(|path, _| path != own_path && !filesystem::same_file(path, own_path));

        if collisions.is_empty() {
            return candidate.to_string();
        }

        let suffix = next_suffix(collisions.values().map(String::as_str));
        debug!(
            "Name '{}' collides with {} launcher(s), using suffix ({})",
            candidate,
            collisions.len(),
            suffix
        );

        format!("{} ({})", candidate, suffix)
    }
}

/// Integer in a trailing `(N)`, only at the very end of the name
pub fn parenthesized_suffix(name: &str) -> Option<u32> {
    let inner = name.trim_end().strip_suffix(')')?;
    let open = inner.rfind('(')?;
    let digits = &inner[open + 1..];

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    digits.parse().ok()
}

/// One more than the highest parenthesized suffix, or 1 when none has one
pub fn next_suffix<'a>(names: impl IntoIterator<Item = &'a str>) -> u32 {
    names
        .into_iter()
        .filter_map(parenthesized_suffix)
        .max()
        .map(|max| max.saturating_add(1))
        .unwrap_or(1)
}
