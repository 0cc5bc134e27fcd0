// src/integration/mod.rs

//! Integration of an image into the desktop
//!
//! An integration relocates the image to its canonical destination and then
//! registers and synthesizes its launcher document. It runs as a small state
//! machine:
//!
//! ```text
//! Start -> Relocating -> EntrySynthesis -> Done(Successful)
//! ```
//!
//! Every state may finish early with `Done(Aborted)` when the user declines
//! or `Done(Failed)` on an operational error. Nothing is retried, and each
//! question is asked at most once per integration.

pub mod confirm;
pub mod destination;
pub mod report;

pub use confirm::{Confirmation, Decision, HeadlessConfirmation, Prompt};
pub use destination::{DestinationPolicy, is_in_directory, resolve_destination};
pub use report::{ErrorReporter, TracingReporter};

use crate::desktop::registrar::Registrar;
use crate::desktop::synthesizer::EntrySynthesizer;
use crate::error::{Error, Result};
use crate::filesystem;
use crate::image::{ImageDescriptor, ImageInspector};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Terminal outcome of an integration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrationResult {
    Successful,
    /// The user declined; the image is left where it was
    Aborted,
    Failed,
}

impl IntegrationResult {
    pub fn as_str(&self) -> &str {
        match self {
            IntegrationResult::Successful => "successful",
            IntegrationResult::Aborted => "aborted",
            IntegrationResult::Failed => "failed",
        }
    }
}

/// Primitive used to move an image into place
pub type MoveFn = fn(&Path, &Path) -> io::Result<()>;

#[derive(Debug)]
enum Stage {
    Start,
    Relocating { destination: PathBuf },
    EntrySynthesis { image: PathBuf },
    Done(IntegrationResult),
}

/// Drives integrations with explicitly passed collaborators
pub struct Integrator<'a> {
    inspector: &'a dyn ImageInspector,
    policy: DestinationPolicy,
    confirmation: &'a dyn Confirmation,
    registrar: &'a dyn Registrar,
    synthesizer: EntrySynthesizer<'a>,
    reporter: &'a dyn ErrorReporter,
    resolve_collisions: bool,
    move_file: MoveFn,
}

impl<'a> Integrator<'a> {
    pub fn new(
        inspector: &'a dyn ImageInspector,
        policy: DestinationPolicy,
        confirmation: &'a dyn Confirmation,
        registrar: &'a dyn Registrar,
        synthesizer: EntrySynthesizer<'a>,
        reporter: &'a dyn ErrorReporter,
    ) -> Self {
        Self {
            inspector,
            policy,
            confirmation,
            registrar,
            synthesizer,
            reporter,
            resolve_collisions: true,
            move_file: rename_file,
        }
    }

    /// Toggle display-name collision resolution (on by default)
    pub fn with_collision_resolution(mut self, resolve: bool) -> Self {
        self.resolve_collisions = resolve;
        self
    }

    /// Replace the move primitive, `fs::rename` by default
    pub fn with_move_fn(mut self, move_file: MoveFn) -> Self {
        self.move_file = move_file;
        self
    }

    /// Canonical integrated path of `image`
    pub fn destination_for(&self, image: &Path) -> PathBuf {
        let descriptor = ImageDescriptor::inspect(image, self.inspector);
        resolve_destination(&descriptor, &self.policy)
    }

    /// Whether `image` lives in the destination root and has a launcher
    pub fn is_integrated(&self, image: &Path) -> bool {
        is_in_directory(image, &self.policy.root_directory) && self.registrar.is_registered(image)
    }

    /// Integrate the image at `image`
    pub fn integrate(&self, image: &Path) -> IntegrationResult {
        let mut stage = Stage::Start;

        loop {
            debug!("Integration of {}: {:?}", image.display(), stage);

            stage = match stage {
                Stage::Start => self.start(image).unwrap_or_else(|e| self.finish(e)),
                Stage::Relocating { destination } => self
                    .relocate(image, &destination)
                    .unwrap_or_else(|e| self.finish(e)),
                Stage::EntrySynthesis { image: integrated } => {
                    self.synthesize_entry(&integrated)
                }
                Stage::Done(result) => {
                    info!("Integration of {} {}", image.display(), result.as_str());
                    return result;
                }
            };
        }
    }

    /// Delete an integrated image along with its launcher and icons
    ///
    /// Only images that live in the destination root and are registered are
    /// touched. The user is asked once before anything is deleted.
    pub fn remove(&self, image: &Path) -> IntegrationResult {
        let result = match self.remove_integrated(image) {
            Ok(()) => IntegrationResult::Successful,
            Err(e) => self.outcome(e),
        };
        info!("Removal of {} {}", image.display(), result.as_str());
        result
    }

    fn remove_integrated(&self, image: &Path) -> Result<()> {
        if !self.inspector.format(image).is_image() {
            return Err(Error::NotSupported(format!(
                "{} is not an AppImage",
                image.display()
            )));
        }
        if !self.is_integrated(image) {
            return Err(Error::NotSupported(format!(
                "{} is not integrated in {}",
                image.display(),
                self.policy.root_directory.display()
            )));
        }

        let image_text = image.display().to_string();
        if self.ask(Prompt::RemoveIntegrated { image: &image_text }) != Decision::Yes {
            return Err(Error::UserAborted);
        }

        self.registrar.unregister(image)?;
        fs::remove_file(image)
            .map_err(|e| Error::IoError(format!("Failed to remove {}: {}", image.display(), e)))?;
        info!("Removed {}", image.display());
        Ok(())
    }

    /// Map an error to a result, reporting real failures once
    fn outcome(&self, error: Error) -> IntegrationResult {
        match error {
            Error::UserAborted => {
                info!("Declined by user");
                IntegrationResult::Aborted
            }
            other => {
                self.reporter.error(&other.to_string());
                IntegrationResult::Failed
            }
        }
    }

    fn finish(&self, error: Error) -> Stage {
        Stage::Done(self.outcome(error))
    }

    fn ask(&self, prompt: Prompt<'_>) -> Decision {
        let decision = self.confirmation.confirm(&prompt);
        debug!("{:?} -> {:?}", prompt, decision);
        decision
    }

    fn start(&self, image: &Path) -> Result<Stage> {
        let descriptor = ImageDescriptor::inspect(image, self.inspector);
        if !descriptor.format.is_image() {
            return Err(Error::NotSupported(format!(
                "{} is not an AppImage",
                image.display()
            )));
        }

        let destination = resolve_destination(&descriptor, &self.policy);
        let relocation_needed = !filesystem::same_file(image, &destination);

        if self.policy.ask_before_moving
            && relocation_needed
            && !is_in_directory(image, &self.policy.root_directory)
        {
            let image_text = image.display().to_string();
            let root_text = self.policy.root_directory.display().to_string();
            let decision = self.ask(Prompt::MoveToDestination {
                image: &image_text,
                destination: &root_text,
            });
            if decision != Decision::Yes {
                return Err(Error::UserAborted);
            }
        }

        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                Error::IoError(format!("Failed to create {}: {}", parent.display(), e))
            })?;
        }

        Ok(Stage::Relocating { destination })
    }

    fn relocate(&self, image: &Path, destination: &Path) -> Result<Stage> {
        if filesystem::same_file(image, destination) {
            debug!("{} is already in place", image.display());
            return Ok(Stage::EntrySynthesis {
                image: destination.to_path_buf(),
            });
        }

        if destination.exists() {
            let destination_text = destination.display().to_string();
            let decision = self.ask(Prompt::OverwriteExisting {
                destination: &destination_text,
            });
            if decision != Decision::Yes {
                return Err(Error::UserAborted);
            }

            fs::remove_file(destination).map_err(|e| {
                Error::IoError(format!("Failed to remove {}: {}", destination.display(), e))
            })?;
        }

        match (self.move_file)(image, destination) {
            Ok(()) => info!("Moved {} to {}", image.display(), destination.display()),
            Err(e) => {
                let image_text = image.display().to_string();
                let reason = e.to_string();
                let decision = self.ask(Prompt::CopyInsteadOfMove {
                    image: &image_text,
                    reason: &reason,
                });
                if decision != Decision::Yes {
                    return Err(Error::OperationFailed(format!(
                        "Failed to move {} to {}: {}",
                        image.display(),
                        destination.display(),
                        e
                    )));
                }

                copy_then_remove(image, destination)?;
            }
        }

        if let Err(e) = filesystem::make_executable(destination) {
            warn!("{}", e);
        }

        Ok(Stage::EntrySynthesis {
            image: destination.to_path_buf(),
        })
    }

    fn synthesize_entry(&self, image: &Path) -> Stage {
        let launcher = match self.registrar.register(image) {
            Ok(launcher) => launcher,
            Err(e) => return self.finish(e),
        };

        // the synthesizer reports its own failures
        match self
            .synthesizer
            .synthesize(&launcher, image, self.resolve_collisions)
        {
            Ok(_) => Stage::Done(IntegrationResult::Successful),
            Err(e) => {
                debug!("Entry synthesis failed: {}", e);
                Stage::Done(IntegrationResult::Failed)
            }
        }
    }
}

fn rename_file(from: &Path, to: &Path) -> io::Result<()> {
    fs::rename(from, to)
}

/// Copy `source` to `destination`, removing the source only after success
///
/// A failed copy leaves no partial destination behind. Failing to remove
/// the source after a good copy is only a warning.
pub fn copy_then_remove(source: &Path, destination: &Path) -> Result<()> {
    if let Err(e) = fs::copy(source, destination) {
        let _ = fs::remove_file(destination);
        return Err(Error::OperationFailed(format!(
            "Failed to copy {} to {}: {}",
            source.display(),
            destination.display(),
            e
        )));
    }
    info!("Copied {} to {}", source.display(), destination.display());

    if let Err(e) = fs::remove_file(source) {
        warn!("Failed to remove original {}: {}", source.display(), e);
    }
    Ok(())
}
