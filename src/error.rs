// src/error.rs
// Error types for diagnostic execution

use thiserror::Error;

/// Main error type for the netprobe library
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("unsupported operating system: {0}")]
    UnsupportedPlatform(String),

    #[error("failed to spawn {executable}: {reason}")]
    Spawn { executable: String, reason: String },
}

/// Convenience type alias for Result using ProbeError
pub type Result<T> = std::result::Result<T, ProbeError>;

impl ProbeError {
    /// Build a spawn failure from the executable name and the OS error
    pub fn spawn(executable: impl Into<String>, reason: impl ToString) -> Self {
        ProbeError::Spawn {
            executable: executable.into(),
            reason: reason.to_string(),
        }
    }

    /// Underlying reason, without the error-kind prefix.
    ///
    /// Used when the failure is surfaced to the caller as an event message.
    pub fn reason(&self) -> String {
        match self {
            ProbeError::Spawn { reason, .. } => reason.clone(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_platform_error() {
        let err = ProbeError::UnsupportedPlatform("freebsd".to_string());
        assert!(err.to_string().contains("unsupported operating system"));
        assert!(err.to_string().contains("freebsd"));
    }

    #[test]
    fn test_spawn_error() {
        let err = ProbeError::spawn("traceroute", "No such file or directory (os error 2)");
        assert_eq!(
            err.to_string(),
            "failed to spawn traceroute: No such file or directory (os error 2)"
        );
        assert_eq!(err.reason(), "No such file or directory (os error 2)");
    }

    #[test]
    fn test_reason_falls_back_to_display() {
        let err = ProbeError::UnsupportedPlatform("haiku".to_string());
        assert_eq!(err.reason(), "unsupported operating system: haiku");
    }
}
