// src/maintenance/staleness.rs

//! Detection of artifacts that predate the installed engine
//!
//! After an upgrade, launcher documents written by the previous version and
//! a mount service started before the upgrade should be refreshed. Every
//! check here is a heuristic: failures answer "not stale".

use crate::desktop::registrar::Registrar;
use crate::error::{Error, Result};
use crate::filesystem;
use chrono::{DateTime, Duration, Utc};
use nix::time::{ClockId, clock_gettime};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

const ACTIVATION_PROPERTY: &str = "ActiveEnterTimestampMonotonic";

/// Host service manager queries
pub trait ServiceSupervisor {
    /// Monotonic activation time of `unit` in microseconds
    fn activation_monotonic_usec(&self, unit: &str) -> Result<u64>;
}

/// `ServiceSupervisor` backed by the systemd user instance
#[derive(Debug, Default, Clone, Copy)]
pub struct Systemctl;

impl ServiceSupervisor for Systemctl {
    fn activation_monotonic_usec(&self, unit: &str) -> Result<u64> {
        let output = Command::new("systemctl")
            .args(["--user", "show", unit])
            .arg(format!("--property={}", ACTIVATION_PROPERTY))
            .output()
            .map_err(|e| Error::OperationFailed(format!("Failed to run systemctl: {}", e)))?;

        if !output.status.success() {
            return Err(Error::OperationFailed(format!(
                "systemctl show {} failed: {}",
                unit,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        parse_activation(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Parse `ActiveEnterTimestampMonotonic=<usec>`
///
/// Zero means the unit has never been activated and is reported as an error.
fn parse_activation(output: &str) -> Result<u64> {
    let value = output
        .lines()
        .find_map(|line| line.trim().strip_prefix(ACTIVATION_PROPERTY)?.strip_prefix('='))
        .ok_or_else(|| {
            Error::FormatError(format!("No {} in systemctl output", ACTIVATION_PROPERTY))
        })?;

    let usec: u64 = value.trim().parse().map_err(|e| {
        Error::FormatError(format!("Invalid {} value '{}': {}", ACTIVATION_PROPERTY, value, e))
    })?;

    if usec == 0 {
        return Err(Error::OperationFailed("Service has not been activated".to_string()));
    }
    Ok(usec)
}

/// Convert a monotonic timestamp using the current monotonic/wall-clock offset
fn wall_clock_from_monotonic(
    activation_usec: u64,
    now_monotonic_usec: i64,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>> {
    let out_of_range =
        || Error::FormatError(format!("Timestamp out of range: {}", activation_usec));

    let activation = i64::try_from(activation_usec).map_err(|_| out_of_range())?;
    let elapsed = now_monotonic_usec
        .checked_sub(activation)
        .ok_or_else(out_of_range)?;
    now.checked_sub_signed(Duration::microseconds(elapsed))
        .ok_or_else(out_of_range)
}

fn monotonic_now_usec() -> Result<i64> {
    let now = clock_gettime(ClockId::CLOCK_MONOTONIC)
        .map_err(|e| Error::OperationFailed(format!("Failed to read monotonic clock: {}", e)))?;
    Ok(now.tv_sec() as i64 * 1_000_000 + now.tv_nsec() as i64 / 1_000)
}

/// Compares artifact timestamps with the engine binary
pub struct StalenessDetector {
    engine_binary: PathBuf,
    registrar: Box<dyn Registrar>,
    supervisor: Box<dyn ServiceSupervisor>,
    service_unit: String,
}

impl StalenessDetector {
    pub fn new(
        engine_binary: PathBuf,
        registrar: Box<dyn Registrar>,
        supervisor: Box<dyn ServiceSupervisor>,
        service_unit: impl Into<String>,
    ) -> Self {
        Self {
            engine_binary,
            registrar,
            supervisor,
            service_unit: service_unit.into(),
        }
    }

    fn engine_mtime(&self) -> Result<DateTime<Utc>> {
        filesystem::modified_time(&self.engine_binary).map(DateTime::<Utc>::from)
    }

    /// Whether the launcher document of `image` is older than the engine
    pub fn is_entry_stale(&self, image: &Path) -> bool {
        let entry = self.registrar.entry_path(image);
        let times = self.engine_mtime().and_then(|engine| {
            let entry = filesystem::modified_time(&entry).map(DateTime::<Utc>::from)?;
            Ok((engine, entry))
        });

        match times {
            Ok((engine, entry)) => entry < engine,
            Err(e) => {
                debug!("Cannot determine staleness of {}: {}", image.display(), e);
                false
            }
        }
    }

    /// Wall-clock activation time of the background service
    pub fn service_activation_time(&self) -> Result<DateTime<Utc>> {
        let activation = self.supervisor.activation_monotonic_usec(&self.service_unit)?;
        wall_clock_from_monotonic(activation, monotonic_now_usec()?, Utc::now())
    }

    /// Whether the background service was (re)started after the engine was installed
    pub fn has_background_service_restarted(&self) -> bool {
        let times = self
            .engine_mtime()
            .and_then(|engine| Ok((engine, self.service_activation_time()?)));

        match times {
            Ok((engine, activated)) => activated >= engine,
            Err(e) => {
                debug!("Cannot query {}: {}", self.service_unit, e);
                false
            }
        }
    }
}
