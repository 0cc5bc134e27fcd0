// src/image/mod.rs

//! AppImage inspection and content fingerprints
//!
//! The low-level format work (type detection, ELF section lookup, hashing) is
//! hidden behind the `ImageInspector` trait so that integration logic can be
//! driven by any implementation, including test doubles.

pub mod digest;
pub mod elf;

pub use digest::DigestResolver;
pub use elf::ElfInspector;

use crate::error::Result;
use std::path::{Path, PathBuf};

/// AppImage format generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Unknown,
    /// Type 1: ISO 9660 payload, legacy
    TypeA,
    /// Type 2: SquashFS payload with ELF runtime
    TypeB,
}

impl ImageFormat {
    pub fn as_str(&self) -> &str {
        match self {
            ImageFormat::Unknown => "unknown",
            ImageFormat::TypeA => "type 1",
            ImageFormat::TypeB => "type 2",
        }
    }

    /// Whether the file is an AppImage at all
    pub fn is_image(&self) -> bool {
        !matches!(self, ImageFormat::Unknown)
    }
}

/// Byte range of a section inside an image file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionRange {
    pub offset: u64,
    pub length: u64,
}

/// Common interface for image format inspection
pub trait ImageInspector {
    /// Detect the format type of the file at `path`
    fn format(&self, path: &Path) -> ImageFormat;

    /// Location of the embedded digest, if the image carries one
    fn digest_section(&self, path: &Path) -> Result<Option<SectionRange>>;

    /// Digest computed over the file contents
    ///
    /// Returns `Error::NotSupported` for formats without digest support.
    fn content_digest(&self, path: &Path) -> Result<Vec<u8>>;

    /// Embedded update information, `None` when the image cannot self-update
    fn update_information(&self, path: &Path) -> Option<String>;
}

/// Snapshot of what is known about one image during a single operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageDescriptor {
    pub path: PathBuf,
    pub format: ImageFormat,
    /// Hex digest, present only for `TypeB` images
    pub digest: Option<String>,
}

impl ImageDescriptor {
    /// Inspect the image at `path`, computing its digest if supported
    pub fn inspect(path: &Path, inspector: &dyn ImageInspector) -> Self {
        let format = inspector.format(path);
        let digest = DigestResolver::new(inspector).digest_of(path);

        Self {
            path: path.to_path_buf(),
            format,
            digest,
        }
    }
}
