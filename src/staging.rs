//! Process-scoped staging directory for extracted native binaries

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::error::{LoadError, Result};

/// Prefix of the staging directory's name under the system temp root
pub const STAGING_DIR_PREFIX: &str = "nativestage";

/// Temporary directory that native binaries are materialized into before
/// the dynamic loader maps them
///
/// One staging directory serves every library staged through the same
/// loader context; distinct library names yield distinct files inside it.
/// The directory and anything left in it are removed best-effort on drop.
pub struct StagingDir {
    dir: TempDir,
}

impl StagingDir {
    /// Create a fresh staging directory under the system temp root
    pub fn new() -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(STAGING_DIR_PREFIX)
            .tempdir()
            .map_err(LoadError::StagingDir)?;
        tracing::debug!(path = %dir.path().display(), "created staging directory");
        Ok(Self { dir })
    }

    /// Path of the staging directory
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write `bytes` to `<dir>/<filename>`, overwriting any existing file
    /// of that name
    ///
    /// The file is fully written and synced before the path is returned,
    /// so the dynamic loader never observes a partial copy. On any write
    /// failure the partial file is removed before the error propagates.
    pub fn stage(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf> {
        // An immediate release may have removed the then-empty directory;
        // recreate it on demand at the same path.
        std::fs::create_dir_all(self.dir.path()).map_err(LoadError::StagingDir)?;
        let path = self.dir.path().join(filename);
        if let Err(source) = write_all_synced(&path, bytes) {
            let _ = std::fs::remove_file(&path);
            return Err(LoadError::Stage { path, source });
        }
        tracing::debug!(path = %path.display(), len = bytes.len(), "staged bundled binary");
        Ok(path)
    }
}

fn write_all_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}
