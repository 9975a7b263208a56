//! Extraction-and-load fallback for bundled native libraries
//!
//! `load_or_fail` first asks the OS dynamic loader to find the library on
//! its standard search path; only when that fails is the bundled copy
//! extracted to the staging directory and loaded from there.

use std::path::Path;

use libloading::Library;
use once_cell::sync::{Lazy, OnceCell};
use parking_lot::Mutex;

use crate::error::{LoadError, Result};
use crate::platform::Platform;
use crate::resources;
use crate::staging::StagingDir;

/// How a staged file is disposed of once the dynamic loader has seen it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseStrategy {
    /// Unlink the staged file right away; the mapping survives the unlink
    Immediate,
    /// Leave the staged file for the staging directory's teardown, because
    /// the OS forbids deleting a file the process has mapped
    OnTeardown,
}

impl ReleaseStrategy {
    /// Pick the strategy for files inside `staging_dir`
    ///
    /// On Unix this probes the directory's actual filesystem by unlinking
    /// a freshly created file while a handle to it is still open. Any
    /// failure to complete the probe is treated as "not POSIX" and selects
    /// the conservative [`ReleaseStrategy::OnTeardown`].
    pub fn select(staging_dir: &Path) -> Self {
        #[cfg(unix)]
        {
            match unlink_while_open(staging_dir) {
                Ok(true) => ReleaseStrategy::Immediate,
                Ok(false) | Err(_) => ReleaseStrategy::OnTeardown,
            }
        }
        #[cfg(not(unix))]
        {
            let _ = staging_dir;
            ReleaseStrategy::OnTeardown
        }
    }
}

/// Probe whether the filesystem backing `dir` allows unlinking a file
/// that is still held open
#[cfg(unix)]
fn unlink_while_open(dir: &Path) -> std::io::Result<bool> {
    let path = dir.join(".unlink-probe");
    let file = std::fs::File::create(&path)?;
    let removed = rustix::fs::unlink(path.as_path()).is_ok();
    drop(file);
    if !removed {
        let _ = std::fs::remove_file(&path);
    }
    Ok(removed)
}

/// Loader context owning the staging directory and the loaded libraries
///
/// The staging directory is created lazily on first bundle extraction and
/// reused for every library staged through this context. Loaded library
/// handles are retained so the mappings outlive the call; they are
/// released, along with the staging directory, when the context drops.
pub struct NativeLoader {
    // Declared before `staging` so libraries unload before the staging
    // directory is removed on drop.
    loaded: Mutex<Vec<Library>>,
    staging: OnceCell<StagingDir>,
    // Probe result for the staging directory's filesystem, settled once.
    release: OnceCell<ReleaseStrategy>,
}

impl NativeLoader {
    /// Create a loader context with no staging directory yet
    pub fn new() -> Self {
        Self {
            loaded: Mutex::new(Vec::new()),
            staging: OnceCell::new(),
            release: OnceCell::new(),
        }
    }

    /// Load `name` from the system search path, falling back to the
    /// bundled copy if the system knows no such library
    ///
    /// `name` is a bare library name ("geocoder"), resolved through the
    /// platform's conventional filename for the system attempt. On
    /// success the library stays mapped for this context's lifetime. A
    /// failed fallback is reported as [`LoadError::Fatal`] wrapping the
    /// fallback's root cause; the caller should treat it as a fatal
    /// initialization failure.
    pub fn load_or_fail(&self, name: &str) -> Result<()> {
        let candidate = libloading::library_filename(name);
        match unsafe { Library::new(&candidate) } {
            Ok(lib) => {
                tracing::debug!(name, "loaded library from system search path");
                self.loaded.lock().push(lib);
                Ok(())
            }
            Err(err) => {
                tracing::debug!(
                    name,
                    error = %err,
                    "system search path failed, extracting bundled copy"
                );
                self.load_from_bundle(name).map_err(|source| LoadError::Fatal {
                    name: name.to_string(),
                    source: Box::new(source),
                })
            }
        }
    }

    /// Extract the bundled copy of `name` and load it
    ///
    /// Looks up `/native/<name>.<suffix>` in the embedded bundle, stages
    /// it into the (lazily created) staging directory and hands the staged
    /// path to the dynamic loader. Whatever the load outcome, the staged
    /// file is then released per [`ReleaseStrategy::select`].
    pub fn load_from_bundle(&self, name: &str) -> Result<()> {
        let filename = format!("{name}.{}", Platform::host().library_suffix());
        let bytes = resources::bundled(&filename).ok_or_else(|| LoadError::NotFound {
            resource: resources::resource_path(&filename),
        })?;

        let lib = self.stage_and_map(&filename, &bytes)?;
        self.loaded.lock().push(lib);
        tracing::debug!(name, "loaded library from bundle");
        Ok(())
    }

    /// Number of libraries this context is keeping mapped
    pub fn loaded_count(&self) -> usize {
        self.loaded.lock().len()
    }

    fn staging(&self) -> Result<&StagingDir> {
        self.staging.get_or_try_init(StagingDir::new)
    }

    /// Probe result for this context's staging directory, cached after the
    /// first call; the directory's backing filesystem cannot change
    fn release_strategy(&self, staging: &StagingDir) -> ReleaseStrategy {
        *self
            .release
            .get_or_init(|| ReleaseStrategy::select(staging.path()))
    }

    fn stage_and_map(&self, filename: &str, bytes: &[u8]) -> Result<Library> {
        let staging = self.staging()?;
        let staged = staging.stage(filename, bytes)?;

        let outcome = unsafe { Library::new(&staged) };

        match self.release_strategy(staging) {
            ReleaseStrategy::Immediate => {
                if let Err(err) = std::fs::remove_file(&staged) {
                    tracing::warn!(
                        path = %staged.display(),
                        error = %err,
                        "failed to release staged file"
                    );
                }
                // Statics never drop, so the process-wide context would
                // otherwise leave an empty directory behind. Fails (and is
                // ignored) while other staged files remain.
                let _ = std::fs::remove_dir(staging.path());
            }
            ReleaseStrategy::OnTeardown => {
                tracing::debug!(
                    path = %staged.display(),
                    "staged file release deferred to context teardown"
                );
            }
        }

        outcome.map_err(|source| LoadError::Open {
            path: staged,
            source,
        })
    }
}

impl Default for NativeLoader {
    fn default() -> Self {
        Self::new()
    }
}

static PROCESS_LOADER: Lazy<NativeLoader> = Lazy::new(NativeLoader::new);

/// The process-wide loader context backing the free functions
pub fn process_loader() -> &'static NativeLoader {
    &PROCESS_LOADER
}

/// [`NativeLoader::load_or_fail`] on the process-wide context
pub fn load_or_fail(name: &str) -> Result<()> {
    PROCESS_LOADER.load_or_fail(name)
}

/// [`NativeLoader::load_from_bundle`] on the process-wide context
pub fn load_from_bundle(name: &str) -> Result<()> {
    PROCESS_LOADER.load_from_bundle(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn test_release_strategy_immediate_on_unix_tmp() {
        let staging = StagingDir::new().unwrap();
        assert_eq!(ReleaseStrategy::select(staging.path()), ReleaseStrategy::Immediate);
    }

    #[test]
    fn test_missing_resource_stages_nothing() {
        let loader = NativeLoader::new();
        let err = loader.load_from_bundle("missing").unwrap_err();

        let suffix = Platform::host().library_suffix();
        match &err {
            LoadError::NotFound { resource } => {
                assert_eq!(resource, &format!("/native/missing.{suffix}"));
            }
            other => panic!("expected NotFound, got {other:?}"),
        }
        // The lookup failed before staging, so no directory was created.
        assert!(loader.staging.get().is_none());
        assert_eq!(loader.loaded_count(), 0);
    }

    #[test]
    fn test_load_or_fail_wraps_fallback_cause() {
        let loader = NativeLoader::new();
        let err = loader.load_or_fail("nativestage-no-such-library").unwrap_err();

        match err {
            LoadError::Fatal { name, source } => {
                assert_eq!(name, "nativestage-no-such-library");
                assert!(matches!(*source, LoadError::NotFound { .. }));
            }
            other => panic!("expected Fatal, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_rejected_staged_file_is_released() {
        let loader = NativeLoader::new();
        let err = loader
            .stage_and_map("garbage.so", b"this is not a shared object")
            .unwrap_err();

        let path = match &err {
            LoadError::Open { path, .. } => path.clone(),
            other => panic!("expected Open, got {other:?}"),
        };
        // Immediate release applies regardless of the load outcome, and
        // takes the emptied staging directory with it.
        assert!(!path.exists());
        assert!(!loader.staging().unwrap().path().exists());
        assert_eq!(loader.loaded_count(), 0);

        // A later load restages into the same directory path.
        let err = loader
            .stage_and_map("garbage2.so", b"also not a shared object")
            .unwrap_err();
        assert!(matches!(err, LoadError::Open { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_release_strategy_probed_once_per_context() {
        let loader = NativeLoader::new();
        assert!(loader.release.get().is_none());

        let _ = loader
            .stage_and_map("first.so", b"junk")
            .unwrap_err();
        assert_eq!(loader.release.get(), Some(&ReleaseStrategy::Immediate));

        // The second load consults the cached result instead of probing.
        let _ = loader
            .stage_and_map("second.so", b"junk")
            .unwrap_err();
        assert_eq!(loader.release.get(), Some(&ReleaseStrategy::Immediate));
    }

    #[test]
    fn test_staging_directory_is_created_once() {
        let loader = NativeLoader::new();
        let first = loader.staging().unwrap().path().to_path_buf();
        let second = loader.staging().unwrap().path().to_path_buf();
        assert_eq!(first, second);

        let a = loader.staging().unwrap().stage("one.so", b"a").unwrap();
        let b = loader.staging().unwrap().stage("two.so", b"b").unwrap();
        assert_eq!(a.parent(), b.parent());
    }
}
