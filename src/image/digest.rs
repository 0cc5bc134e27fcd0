// src/image/digest.rs

//! Content fingerprints used for naming integrated images

use crate::image::{ImageFormat, ImageInspector, SectionRange};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use tracing::debug;

/// Upper bound on an embedded digest section, larger headers are corrupt
const MAX_SECTION_LENGTH: u64 = 1024;

/// Turns an image path into a stable hex fingerprint
///
/// Only type 2 images have a digest. The embedded digest section is preferred;
/// without one the inspector hashes the file contents. Every failure yields
/// `None`: the digest only makes file names nicer, correctness never depends
/// on it.
pub struct DigestResolver<'a> {
    inspector: &'a dyn ImageInspector,
}

impl<'a> DigestResolver<'a> {
    pub fn new(inspector: &'a dyn ImageInspector) -> Self {
        Self { inspector }
    }

    /// Hex digest of the image at `path`
    pub fn digest_of(&self, path: &Path) -> Option<String> {
        if self.inspector.format(path) != ImageFormat::TypeB {
            return None;
        }

        let embedded = match self.inspector.digest_section(path) {
            Ok(Some(range)) if range.offset != 0 && range.length != 0 => {
                Some(read_section(path, range))
            }
            Ok(_) => None,
            Err(e) => {
                debug!("No digest section in {}: {}", path.display(), e);
                None
            }
        };

        let bytes = match embedded {
            // a digest section exists but reading it failed
            Some(None) => return None,
            Some(Some(bytes)) => bytes,
            None => match self.inspector.content_digest(path) {
                Ok(bytes) => bytes,
                Err(e) => {
                    debug!("Failed to compute digest of {}: {}", path.display(), e);
                    return None;
                }
            },
        };

        if bytes.is_empty() {
            return None;
        }

        Some(hex::encode(bytes))
    }
}

/// Read exactly the bytes of `range`, nothing beyond it
///
/// The length comes from the image's own section headers, so it is bounded
/// before anything is read.
fn read_section(path: &Path, range: SectionRange) -> Option<Vec<u8>> {
    if range.length > MAX_SECTION_LENGTH {
        debug!(
            "Digest section of {} claims {} bytes, ignoring it",
            path.display(),
            range.length
        );
        return None;
    }

    let mut file = File::open(path).ok()?;
    file.seek(SeekFrom::Start(range.offset)).ok()?;

    let mut buffer = Vec::new();
    file.take(range.length).read_to_end(&mut buffer).ok()?;

    // short read: the section runs past the end of the file
    (buffer.len() as u64 == range.length).then_some(buffer)
}
