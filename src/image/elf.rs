// src/image/elf.rs

//! ELF-based inspector for AppImage files
//!
//! AppImages are ELF executables with a magic marker in the ELF identification
//! padding (`AI` followed by the type byte at offset 8). Type 2 runtimes carry
//! extra sections: `.digest_md5` for a precomputed digest and `.upd_info` for
//! update information.

use crate::error::{Error, Result};
use crate::image::{ImageFormat, ImageInspector, SectionRange};
use object::read::ReadCache;
use object::{Object, ObjectSection};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use tracing::debug;

const ELF_MAGIC: [u8; 4] = [0x7f, b'E', b'L', b'F'];
const TYPE_A_MAGIC: [u8; 3] = [b'A', b'I', 0x01];
const TYPE_B_MAGIC: [u8; 3] = [b'A', b'I', 0x02];

/// Section holding the precomputed digest of a type 2 image
pub const DIGEST_SECTION: &str = ".digest_md5";

/// Section holding the update information string
pub const UPDATE_INFO_SECTION: &str = ".upd_info";

/// Width of the fallback content digest in bytes (matches the embedded digest)
pub const DIGEST_LENGTH: usize = 16;

/// Default `ImageInspector` reading the ELF structure of the image
#[derive(Debug, Default, Clone, Copy)]
pub struct ElfInspector;

impl ElfInspector {
    pub fn new() -> Self {
        Self
    }

    /// Classify a file header
    fn detect(header: &[u8; 11]) -> ImageFormat {
        if header[0..4] != ELF_MAGIC {
            return ImageFormat::Unknown;
        }

        if header[8..11] == TYPE_B_MAGIC {
            ImageFormat::TypeB
        } else if header[8..11] == TYPE_A_MAGIC {
            ImageFormat::TypeA
        } else {
            ImageFormat::Unknown
        }
    }

    /// File range of the named ELF section, if present
    fn section_range(path: &Path, name: &str) -> Result<Option<SectionRange>> {
        let file = Self::open(path)?;
        let cache = ReadCache::new(file);
        let elf = object::File::parse(&cache).map_err(|e| Self::parse_error(path, e))?;

        Ok(elf
            .section_by_name(name)
            .and_then(|section| section.file_range())
            .map(|(offset, length)| SectionRange { offset, length }))
    }

    /// Contents of the named ELF section, if present
    fn section_data(path: &Path, name: &str) -> Result<Option<Vec<u8>>> {
        let file = Self::open(path)?;
        let cache = ReadCache::new(file);
        let elf = object::File::parse(&cache).map_err(|e| Self::parse_error(path, e))?;

        let Some(section) = elf.section_by_name(name) else {
            return Ok(None);
        };
        let data = section.data().map_err(|e| Self::parse_error(path, e))?;
        Ok(Some(data.to_vec()))
    }

    fn open(path: &Path) -> Result<File> {
        File::open(path)
            .map_err(|e| Error::IoError(format!("Failed to open {}: {}", path.display(), e)))
    }

    fn parse_error(path: &Path, e: object::Error) -> Error {
        Error::FormatError(format!("Failed to parse ELF structure of {}: {}", path.display(), e))
    }
}

impl ImageInspector for ElfInspector {
    fn format(&self, path: &Path) -> ImageFormat {
        let mut header = [0u8; 11];
        let read = File::open(path).and_then(|mut file| file.read_exact(&mut header));

        match read {
            Ok(()) => Self::detect(&header),
            Err(e) => {
                debug!("Cannot read header of {}: {}", path.display(), e);
                ImageFormat::Unknown
            }
        }
    }

    fn digest_section(&self, path: &Path) -> Result<Option<SectionRange>> {
        if self.format(path) != ImageFormat::TypeB {
            return Err(Error::NotSupported(format!(
                "{} is not a type 2 AppImage",
                path.display()
            )));
        }

        Self::section_range(path, DIGEST_SECTION)
    }

    fn content_digest(&self, path: &Path) -> Result<Vec<u8>> {
        if self.format(path) != ImageFormat::TypeB {
            return Err(Error::NotSupported(format!(
                "Digest calculation is only supported for type 2 AppImages: {}",
                path.display()
            )));
        }

        let mut file = Self::open(path)?;

        let mut hasher = Sha256::new();
        io::copy(&mut file, &mut hasher)
            .map_err(|e| Error::IoError(format!("Failed to read {}: {}", path.display(), e)))?;

        let mut digest = hasher.finalize().to_vec();
        digest.truncate(DIGEST_LENGTH);
        Ok(digest)
    }

    fn update_information(&self, path: &Path) -> Option<String> {
        if self.format(path) != ImageFormat::TypeB {
            return None;
        }

        let data = match Self::section_data(path, UPDATE_INFO_SECTION) {
            Ok(data) => data?,
            Err(e) => {
                debug!("No update information for {}: {}", path.display(), e);
                return None;
            }
        };

        let text = String::from_utf8_lossy(&data);
        let text = text.trim_matches(|c: char| c == '\0' || c.is_whitespace());
        (!text.is_empty()).then(|| text.to_string())
    }
}
