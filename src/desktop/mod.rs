// src/desktop/mod.rs

//! Launcher documents: model, naming, registration and synthesis

pub mod collision;
pub mod entry;
pub mod registrar;
pub mod synthesizer;
pub mod translations;

pub use collision::{CollisionResolver, CollisionSet};
pub use entry::{ACTION_GROUP_PREFIX, DESKTOP_ENTRY_GROUP, DesktopEntry, action_group};
pub use registrar::{EntryRegistrar, GENERATED_ENTRY_PREFIX, Registrar};
pub use synthesizer::{EntrySynthesizer, HelperCommand, VERSION_KEY};
pub use translations::ActionTranslations;
