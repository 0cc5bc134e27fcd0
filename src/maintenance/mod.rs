// src/maintenance/mod.rs

//! Housekeeping run outside of integration: orphan cleanup, cache refresh
//! and staleness checks

pub mod cleanup;
pub mod refresh;
pub mod staleness;

pub use cleanup::{StaleEntryCollector, implied_image_path};
pub use refresh::{notify_icon_change, refresh_desktop_caches};
pub use staleness::{ServiceSupervisor, StalenessDetector, Systemctl};
