// src/desktop/translations.rs

//! Localized names for the generated launcher actions
//!
//! Catalogs are JSON objects stored as `desktopfiles.<locale>.json`, mapping
//! a message key to its translation. Keys beginning with
//! `Desktop Action remove` or `Desktop Action update` name the respective
//! action.

use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

const CATALOG_PREFIX: &str = "desktopfiles.";
const CATALOG_SUFFIX: &str = ".json";
const REMOVE_KEY_PREFIX: &str = "Desktop Action remove";
const UPDATE_KEY_PREFIX: &str = "Desktop Action update";

/// Locale -> translated action name, for each generated action
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionTranslations {
    pub remove: BTreeMap<String, String>,
    pub update: BTreeMap<String, String>,
}

impl ActionTranslations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every catalog found in `dir`
    ///
    /// A missing directory yields empty translations. Unreadable or malformed
    /// catalogs are skipped with a warning.
    pub fn load_from_dir(dir: &Path) -> Self {
        let mut translations = Self::new();

        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                debug!("No translation catalogs in {}: {}", dir.display(), e);
                return translations;
            }
        };

        let mut catalogs: Vec<_> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter_map(|path| {
                let locale = catalog_locale(&path)?;
                Some((locale, path))
            })
            .collect();
        catalogs.sort();

        for (locale, path) in catalogs {
            let content = match fs::read_to_string(&path) {
                Ok(content) => content,
                Err(e) => {
                    warn!("Failed to read translation catalog {}: {}", path.display(), e);
                    continue;
                }
            };

            let catalog: BTreeMap<String, Value> = match serde_json::from_str(&content) {
                Ok(catalog) => catalog,
                Err(e) => {
                    warn!("Malformed translation catalog {}: {}", path.display(), e);
                    continue;
                }
            };

            // non-string values carry no translation
            let catalog: BTreeMap<String, String> = catalog
                .into_iter()
                .filter_map(|(key, value)| Some((key, value.as_str()?.to_string())))
                .collect();
            translations.add_catalog(&locale, &catalog);
        }

        debug!(
            "Loaded action translations: {} remove, {} update",
            translations.remove.len(),
            translations.update.len()
        );
        translations
    }

    /// Merge one locale's catalog
    pub fn add_catalog(&mut self, locale: &str, catalog: &BTreeMap<String, String>) {
        for (key, value) in catalog {
            if value.trim().is_empty() {
                continue;
            }

            if key.starts_with(REMOVE_KEY_PREFIX) {
                self.remove.insert(locale.to_string(), value.clone());
            } else if key.starts_with(UPDATE_KEY_PREFIX) {
                self.update.insert(locale.to_string(), value.clone());
            }
        }
    }
}

/// Locale encoded in a catalog file name (`desktopfiles.de_DE.json` -> `de_DE`)
fn catalog_locale(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    let locale = name
        .strip_prefix(CATALOG_PREFIX)?
        .strip_suffix(CATALOG_SUFFIX)?;
    (!locale.is_empty()).then(|| locale.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_catalog_locale() {
        assert_eq!(
            catalog_locale(Path::new("/i18n/desktopfiles.de_DE.json")).as_deref(),
            Some("de_DE")
        );
        assert!(catalog_locale(Path::new("desktopfiles..json")).is_none());
        assert!(catalog_locale(Path::new("ui.de.json")).is_none());
    }

    #[test]
    fn test_load_from_dir() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("desktopfiles.de.json"),
            r#"{
                "Desktop Action remove/Name": "Anwendung vom System entfernen",
                "Desktop Action update/Name": "Anwendung aktualisieren",
                "Unrelated": "ignored",
                "Count": 3
            }"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("desktopfiles.fr.json"),
            r#"{"Desktop Action remove/Name": "Supprimer l'application du système"}"#,
        )
        .unwrap();
        fs::write(dir.path().join("desktopfiles.xx.json"), "{ not json").unwrap();
        fs::write(dir.path().join("README"), "not a catalog").unwrap();

        let translations = ActionTranslations::load_from_dir(dir.path());

        assert_eq!(translations.remove.len(), 2);
        assert_eq!(
            translations.remove.get("de").unwrap(),
            "Anwendung vom System entfernen"
        );
        assert_eq!(translations.update.len(), 1);
        assert_eq!(translations.update.get("de").unwrap(), "Anwendung aktualisieren");
        assert!(!translations.remove.contains_key("xx"));
    }

    #[test]
    fn test_missing_dir_is_empty() {
        let translations = ActionTranslations::load_from_dir(Path::new("/nonexistent/i18n"));
        assert_eq!(translations, ActionTranslations::default());
    }

    #[test]
    fn test_empty_values_are_skipped() {
        let mut translations = ActionTranslations::new();
        let mut catalog = BTreeMap::new();
        catalog.insert("Desktop Action remove/Name".to_string(), "  ".to_string());
        translations.add_catalog("it", &catalog);
        assert!(translations.remove.is_empty());
    }
}
