// src/desktop/synthesizer.rs

//! Enrichment of registered launcher documents
//!
//! Takes the minimal document written by the registrar and adds the
//! generated `Remove`/`Update` actions, the engine version stamp and a
//! collision-free display name.

use crate::desktop::collision::CollisionResolver;
use crate::desktop::entry::{ACTION_GROUP_PREFIX, DESKTOP_ENTRY_GROUP, DesktopEntry, action_group};
use crate::desktop::translations::ActionTranslations;
use crate::error::Result;
use crate::filesystem;
use crate::image::ImageInspector;
use crate::integration::report::ErrorReporter;
use crate::maintenance::refresh;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Action removing the image from the system
pub const REMOVE_ACTION: &str = "Remove";

/// Action updating the image in place
pub const UPDATE_ACTION: &str = "Update";

/// Vendor key recording the engine version that wrote the document
pub const VERSION_KEY: &str = "X-AppNest-Version";

/// Icon shown next to the generated actions
pub const HELPER_ICON: &str = "appnest";

const REMOVE_ACTION_NAME: &str = "Remove application from system";
const UPDATE_ACTION_NAME: &str = "Update application";

/// Helper invoked by the generated actions (`"<program>" <verb> "<image>"`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelperCommand {
    pub program: PathBuf,
    pub icon: String,
}

impl HelperCommand {
    pub fn new(program: PathBuf) -> Self {
        Self {
            program,
            icon: HELPER_ICON.to_string(),
        }
    }

    /// Exec line running `verb` against `image`
    pub fn exec_line(&self, verb: &str, image: &Path) -> String {
        format!(
            "\"{}\" {} \"{}\"",
            self.program.display(),
            verb,
            image.display()
        )
    }
}

/// Builds the final launcher document of an integrated image
pub struct EntrySynthesizer<'a> {
    inspector: &'a dyn ImageInspector,
    collisions: CollisionResolver,
    helper: HelperCommand,
    translations: ActionTranslations,
    reporter: &'a dyn ErrorReporter,
    engine_version: String,
    notify_shell: bool,
}

impl<'a> EntrySynthesizer<'a> {
    pub fn new(
        inspector: &'a dyn ImageInspector,
        collisions: CollisionResolver,
        helper: HelperCommand,
        reporter: &'a dyn ErrorReporter,
    ) -> Self {
        Self {
            inspector,
            collisions,
            helper,
            translations: ActionTranslations::default(),
            reporter,
            engine_version: crate::ENGINE_VERSION.to_string(),
            notify_shell: true,
        }
    }

    pub fn with_translations(mut self, translations: ActionTranslations) -> Self {
        self.translations = translations;
        self
    }

    pub fn with_engine_version(mut self, version: &str) -> Self {
        self.engine_version = version.to_string();
        self
    }

    /// Whether to signal the desktop shell after writing (on by default)
    pub fn with_shell_notification(mut self, notify: bool) -> Self {
        self.notify_shell = notify;
        self
    }

    /// Enrich the document at `launcher_path` for the image at `image_path`
    ///
    /// Load and save failures are passed to the error reporter before they
    /// are returned.
    pub fn synthesize(
        &self,
        launcher_path: &Path,
        image_path: &Path,
        resolve_collisions: bool,
    ) -> Result<DesktopEntry> {
        let mut doc = DesktopEntry::load(launcher_path).inspect_err(|e| {
            self.reporter
                .error(&format!("Failed to load launcher {}: {}", launcher_path.display(), e));
        })?;

        match doc.get(DESKTOP_ENTRY_GROUP, "Name") {
            None => self.reporter.warning(&format!(
                "Launcher {} has no Name entry",
                launcher_path.display()
            )),
            Some(name) if resolve_collisions => {
                let resolved = self.collisions.resolve_name(&name, launcher_path);
                if resolved != name {
                    info!("Renaming launcher '{}' to '{}'", name, resolved);
                    doc.set(DESKTOP_ENTRY_GROUP, "Name", &resolved);
                }
            }
            Some(_) => {}
        }

        let mut actions = vec![REMOVE_ACTION];
        if self.inspector.update_information(image_path).is_some() {
            actions.push(UPDATE_ACTION);
        }

        // rebuilt from scratch so old translations do not linger
        for group in action_groups(&doc) {
            doc.remove_group(&group);
        }

        self.declare_action(
            &mut doc,
            REMOVE_ACTION,
            REMOVE_ACTION_NAME,
            "remove",
            image_path,
            &self.translations.remove,
        );
        if actions.contains(&UPDATE_ACTION) {
            self.declare_action(
                &mut doc,
                UPDATE_ACTION,
                UPDATE_ACTION_NAME,
                "update",
                image_path,
                &self.translations.update,
            );
        }

        doc.set_list(DESKTOP_ENTRY_GROUP, "Actions", &actions);
        doc.set(
            DESKTOP_ENTRY_GROUP,
            VERSION_KEY,
            strip_version_prefix(&self.engine_version),
        );

        doc.save(launcher_path).inspect_err(|e| {
            self.reporter
                .error(&format!("Failed to save launcher {}: {}", launcher_path.display(), e));
        })?;

        // the document was written; permissions are cosmetic for most shells
        if let Err(e) = filesystem::make_executable(launcher_path) {
            self.reporter.warning(&e.to_string());
        }

        if self.notify_shell {
            refresh::notify_icon_change();
        }

        debug!(
            "Synthesized {} with actions {:?}",
            launcher_path.display(),
            actions
        );
        Ok(doc)
    }

    fn declare_action(
        &self,
        doc: &mut DesktopEntry,
        id: &str,
        name: &str,
        verb: &str,
        image: &Path,
        translations: &BTreeMap<String, String>,
    ) {
        let group = action_group(id);
        doc.set(&group, "Name", name);
        for (locale, translated) in translations {
            doc.set_locale(&group, "Name", locale, translated);
        }
        doc.set(&group, "Icon", &self.helper.icon);
        doc.set(&group, "Exec", &self.helper.exec_line(verb, image));
    }
}

/// Names of all `Desktop Action *` groups
fn action_groups(doc: &DesktopEntry) -> Vec<String> {
    doc.group_names()
        .into_iter()
        .filter(|name| name.starts_with(ACTION_GROUP_PREFIX))
        .map(|name| name.to_string())
        .collect()
}

/// `version 1.2.3` -> `1.2.3`
pub fn strip_version_prefix(version: &str) -> &str {
    version.trim().trim_start_matches("version ").trim()
}
