// src/integration/destination.rs

//! Canonical location of integrated images

use crate::filesystem;
use crate::image::ImageDescriptor;
use std::ffi::OsString;
use std::os::unix::ffi::{OsStrExt, OsStringExt};
use std::path::{Path, PathBuf};

/// Where images are integrated to and whether to ask first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationPolicy {
    pub root_directory: PathBuf,
    pub ask_before_moving: bool,
}

impl DestinationPolicy {
    pub fn new(root_directory: PathBuf, ask_before_moving: bool) -> Self {
        Self {
            root_directory,
            ask_before_moving,
        }
    }
}

/// Integrated path of the image described by `descriptor`
///
/// `Foo.AppImage` with digest `d` becomes `<root>/Foo_d.AppImage`. A digest
/// already present in the file name is not appended again, which makes
/// resolving an integrated path a no-op. File names are handled as raw
/// bytes, so names that are not valid UTF-8 keep their exact spelling.
pub fn resolve_destination(descriptor: &ImageDescriptor, policy: &DestinationPolicy) -> PathBuf {
    let file_name = descriptor
        .path
        .file_name()
        .map(|n| n.as_bytes())
        .unwrap_or_default();

    // split before the last dot, a leading dot does not start an extension
    let split = match file_name.iter().rposition(|&b| b == b'.') {
        Some(0) | None => file_name.len(),
        Some(pos) => pos,
    };
    let (base_name, extension) = file_name.split_at(split);

    let mut name = base_name.to_vec();
    if let Some(digest) = descriptor.digest.as_deref() {
        if !digest.is_empty() && !contains(file_name, digest.as_bytes()) {
            name.push(b'_');
            name.extend_from_slice(digest.as_bytes());
        }
    }
    name.extend_from_slice(extension);

    policy.root_directory.join(OsString::from_vec(name))
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}

/// Whether `path` lies directly inside `dir`
pub fn is_in_directory(path: &Path, dir: &Path) -> bool {
    let parent = match path.parent() {
        Some(parent) => parent,
        None => return false,
    };
    parent == dir || filesystem::same_file(parent, dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::ImageFormat;

    fn policy() -> DestinationPolicy {
        DestinationPolicy::new(PathBuf::from("/home/alex/Applications"), true)
    }

    fn descriptor(path: &str, digest: Option<&str>) -> ImageDescriptor {
        ImageDescriptor {
            path: PathBuf::from(path),
            format: if digest.is_some() {
                ImageFormat::TypeB
            } else {
                ImageFormat::TypeA
            },
            digest: digest.map(|d| d.to_string()),
        }
    }

    #[test]
    fn test_without_digest_is_idempotent() {
        let first = resolve_destination(&descriptor("/tmp/Foo-1.0.AppImage", None), &policy());
        assert_eq!(first, PathBuf::from("/home/alex/Applications/Foo-1.0.AppImage"));

        let second = resolve_destination(&descriptor(first.to_str().unwrap(), None), &policy());
        assert_eq!(first, second);
    }

    #[test]
    fn test_digest_appended_once() {
        let digest = "0123456789abcdef0123456789abcdef";
        let first = resolve_destination(&descriptor("/tmp/Foo.AppImage", Some(digest)), &policy());
        assert_eq!(
            first,
            PathBuf::from(format!("/home/alex/Applications/Foo_{}.AppImage", digest))
        );

        let second = resolve_destination(&descriptor(first.to_str().unwrap(), Some(digest)), &policy());
        assert_eq!(first, second);
    }

    #[test]
    fn test_name_without_extension() {
        let resolved = resolve_destination(&descriptor("/tmp/foo", Some("abcd")), &policy());
        assert_eq!(resolved, PathBuf::from("/home/alex/Applications/foo_abcd"));
    }

    #[test]
    fn test_only_last_extension_is_kept() {
        let resolved = resolve_destination(&descriptor("/tmp/Foo.x86_64.AppImage", Some("ab")), &policy());
        assert_eq!(
            resolved,
            PathBuf::from("/home/alex/Applications/Foo.x86_64_ab.AppImage")
        );
    }

    #[test]
    fn test_non_utf8_name_is_preserved() {
        use std::ffi::OsStr;

        let mut raw = b"/tmp/Caf\xe9".to_vec();
        raw.extend_from_slice(b".AppImage");
        let descriptor = ImageDescriptor {
            path: PathBuf::from(OsStr::from_bytes(&raw)),
            format: ImageFormat::TypeB,
            digest: Some("ab".to_string()),
        };

        let resolved = resolve_destination(&descriptor, &policy());
        assert_eq!(
            resolved.file_name().unwrap().as_bytes(),
            b"Caf\xe9_ab.AppImage"
        );
    }

    #[test]
    fn test_dot_file_has_no_extension() {
        let resolved = resolve_destination(&descriptor("/tmp/.hidden", Some("ab")), &policy());
        assert_eq!(resolved, PathBuf::from("/home/alex/Applications/.hidden_ab"));
    }

    #[test]
    fn test_is_in_directory() {
        let root = Path::new("/home/alex/Applications");
        assert!(is_in_directory(Path::new("/home/alex/Applications/Foo.AppImage"), root));
        assert!(!is_in_directory(Path::new("/home/alex/Downloads/Foo.AppImage"), root));
        assert!(!is_in_directory(
            Path::new("/home/alex/Applications/sub/Foo.AppImage"),
            root
        ));
    }
}
