// src/integration/confirm.rs

//! Confirmation collaborator for the decision points of an integration

use std::env;
use std::io::IsTerminal;
use tracing::debug;

/// Environment variable forcing non-interactive answers
pub const FORCE_HEADLESS_ENV: &str = "APPNEST_FORCE_HEADLESS";

/// Answer to a confirmation prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Yes,
    No,
    Cancel,
}

/// Decision points of an integration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prompt<'a> {
    /// Integrate the image into the destination directory at all
    MoveToDestination { image: &'a str, destination: &'a str },
    /// An image with the same file name is already integrated
    OverwriteExisting { destination: &'a str },
    /// Renaming failed, copy the image instead
    CopyInsteadOfMove { image: &'a str, reason: &'a str },
    /// Delete an integrated image together with its launcher
    RemoveIntegrated { image: &'a str },
}

impl Prompt<'_> {
    /// Text shown to the user
    pub fn message(&self) -> String {
        match self {
            Prompt::MoveToDestination { image, destination } => format!(
                "Move {} to {} and add it to the application menu? \
                 Choosing No runs it once without integrating.",
                image, destination
            ),
            Prompt::OverwriteExisting { destination } => format!(
                "An image with the same file name has already been integrated at {}. \
                 Overwrite it? Choosing No runs it once and leaves the system unchanged.",
                destination
            ),
            Prompt::CopyInsteadOfMove { image, reason } => format!(
                "Failed to move {} ({}). Copy it instead?",
                image, reason
            ),
            Prompt::RemoveIntegrated { image } => format!(
                "Delete {} and remove it from the application menu?",
                image
            ),
        }
    }

    /// Answer used when nobody can be asked
    pub fn default_decision(&self) -> Decision {
        match self {
            Prompt::MoveToDestination { .. } => Decision::Yes,
            Prompt::OverwriteExisting { .. } => Decision::No,
            Prompt::CopyInsteadOfMove { .. } => Decision::Yes,
            Prompt::RemoveIntegrated { .. } => Decision::No,
        }
    }
}

/// Blocks until the user decides
pub trait Confirmation {
    fn confirm(&self, prompt: &Prompt<'_>) -> Decision;
}

/// Answers every prompt with its default
#[derive(Debug, Default, Clone, Copy)]
pub struct HeadlessConfirmation;

impl Confirmation for HeadlessConfirmation {
    fn confirm(&self, prompt: &Prompt<'_>) -> Decision {
        let decision = prompt.default_decision();
        debug!("Headless answer {:?} to: {}", decision, prompt.message());
        decision
    }
}

/// Whether prompts must not be shown interactively
pub fn is_headless() -> bool {
    env::var_os(FORCE_HEADLESS_ENV).is_some() || !std::io::stdin().is_terminal()
}
