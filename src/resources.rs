//! Access to native binaries embedded in the compiled artifact
//!
//! The build places precompiled shared libraries in the crate's `native/`
//! directory; `rust-embed` bakes that directory into the binary so the
//! loader can stage them back out at runtime. This crate does not build
//! those binaries, it only carries them.

use std::borrow::Cow;

use rust_embed::RustEmbed;

/// Virtual path root the bundled binaries live under
pub const RESOURCE_ROOT: &str = "/native/";

/// Embedded contents of the `native/` directory
#[derive(RustEmbed)]
#[folder = "native/"]
#[exclude = "*.md"]
struct Bundle;

/// Bytes of the bundled resource `/native/<filename>`, if it exists
pub fn bundled(filename: &str) -> Option<Cow<'static, [u8]>> {
    Bundle::get(filename).map(|file| file.data)
}

/// Full virtual path of a bundled resource, for diagnostics
pub fn resource_path(filename: &str) -> String {
    format!("{RESOURCE_ROOT}{filename}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_resource_is_none() {
        assert!(bundled("definitely-missing.so").is_none());
    }

    #[test]
    fn test_markdown_is_not_embedded() {
        // native/README.md sits next to the binaries but is excluded
        // from the bundle.
        assert!(bundled("README.md").is_none());
    }

    #[test]
    fn test_resource_path_uses_fixed_root() {
        assert_eq!(resource_path("geocoder.so"), "/native/geocoder.so");
    }
}
