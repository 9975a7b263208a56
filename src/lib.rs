//! NativeStage - loads native shared libraries bundled in the binary
//!
//! This crate bridges a program to a precompiled native library it does
//! not control (originally a natural-language address parser). The library
//! is first looked up on the system's standard search path; only when that
//! fails is the copy embedded in the binary extracted to a process-scoped
//! temporary directory and loaded from there.
//!
//! # Load procedure
//!
//! - **System first**: `load_or_fail("geocoder")` asks the OS dynamic
//!   loader for the platform's conventional filename (`libgeocoder.so`,
//!   `geocoder.dll`, ...).
//! - **Bundle fallback**: on failure, `/native/geocoder.<suffix>` is
//!   staged into a temp directory and loaded by absolute path. The staged
//!   file is unlinked right after loading where the filesystem permits
//!   deleting a mapped file, and left for teardown where it does not.
//!
//! Errors are fatal initialization failures, not recoverable conditions.

pub mod error;
pub mod platform;
pub mod resources;
pub mod staging;
pub mod loader;

pub use error::{LoadError, Result};
pub use loader::{load_from_bundle, load_or_fail, process_loader, NativeLoader, ReleaseStrategy};
pub use platform::Platform;
pub use staging::StagingDir;
