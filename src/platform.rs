//! Host platform classification and shared-library suffix selection

/// OS family of the host, as far as the loader cares about it
///
/// The classification exists only to pick the filename suffix of the
/// bundled binaries, so everything that is not macOS or Windows collapses
/// into [`Platform::Posix`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    MacOs,
    Windows,
    Posix,
}

impl Platform {
    /// Classify a host OS identification string
    ///
    /// Case-insensitive substring heuristic: "mac" or "darwin" selects
    /// [`Platform::MacOs`], "windows" selects [`Platform::Windows`], and
    /// anything else falls through to [`Platform::Posix`]. The default
    /// branch assumes a Unix-style shared-object suffix for every OS it
    /// has never heard of; that is a known-loose assumption, not a
    /// verified platform table.
    pub fn classify(os: &str) -> Self {
        let os = os.to_ascii_lowercase();
        if os.contains("mac") || os.contains("darwin") {
            Platform::MacOs
        } else if os.contains("windows") {
            Platform::Windows
        } else {
            Platform::Posix
        }
    }

    /// Classification of the OS this binary was built for
    pub fn host() -> Self {
        Self::classify(std::env::consts::OS)
    }

    /// Filename suffix the bundle uses for this platform's binaries
    ///
    /// The `jnilib`/`dll`/`so` enumeration is the bundle's on-disk
    /// contract and must match how the binaries were packaged.
    pub fn library_suffix(self) -> &'static str {
        match self {
            Platform::MacOs => "jnilib",
            Platform::Windows => "dll",
            Platform::Posix => "so",
        }
    }
}
