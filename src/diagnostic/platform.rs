// src/diagnostic/platform.rs
// Host operating system detection

use std::fmt;

/// Operating system the diagnostics run on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    MacOs,
    Linux,
    /// Any other OS, carrying its `std::env::consts::OS` name
    Unsupported(&'static str),
}

/// Output dialect family shared by related platforms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlatformFamily {
    Windows,
    Unix,
}

impl Platform {
    /// Platform of the running process
    pub fn detect() -> Self {
        Self::from_os_name(std::env::consts::OS)
    }

    pub fn from_os_name(os: &'static str) -> Self {
        match os {
            "windows" => Self::Windows,
            "macos" => Self::MacOs,
            "linux" => Self::Linux,
            other => Self::Unsupported(other),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Windows => "windows",
            Self::MacOs => "macos",
            Self::Linux => "linux",
            Self::Unsupported(name) => *name,
        }
    }

    /// `None` when no command table exists for this platform
    pub fn family(&self) -> Option<PlatformFamily> {
        match self {
            Self::Windows => Some(PlatformFamily::Windows),
            Self::MacOs | Self::Linux => Some(PlatformFamily::Unix),
            Self::Unsupported(_) => None,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl PlatformFamily {
    /// Family of the running process, Unix for anything unrecognized
    pub fn host() -> Self {
        Platform::detect().family().unwrap_or(PlatformFamily::Unix)
    }
}
