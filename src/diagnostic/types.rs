//! Types for the diagnostic engine
//!
//! Requests, command invocations and the canonical event schema streamed to callers.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default number of echo requests for a ping
pub const DEFAULT_PING_COUNT: u32 = 4;

/// Default hop limit for a traceroute
pub const DEFAULT_MAX_HOPS: u32 = 30;

// ============================================================================
// Requests
// ============================================================================

/// Network probe to run against a target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tool {
    Ping,
    Traceroute,
}

impl Tool {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ping => "ping",
            Self::Traceroute => "traceroute",
        }
    }

    /// Subject used in completion messages
    pub fn run_label(&self) -> &'static str {
        match self {
            Self::Ping => "Ping test",
            Self::Traceroute => "Traceroute",
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The tunable parameter of a request. The variant determines the tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeParams {
    /// Number of echo requests (ping)
    Count(u32),
    /// Maximum TTL to probe (traceroute)
    MaxHops(u32),
}

/// A validated request for one diagnostic run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticRequest {
    target: String,
    params: ProbeParams,
}

impl DiagnosticRequest {
    pub fn ping(target: impl Into<String>, count: Option<u32>) -> Self {
        Self {
            target: target.into(),
            params: ProbeParams::Count(count.unwrap_or(DEFAULT_PING_COUNT)),
        }
    }

    pub fn traceroute(target: impl Into<String>, max_hops: Option<u32>) -> Self {
        Self {
            target: target.into(),
            params: ProbeParams::MaxHops(max_hops.unwrap_or(DEFAULT_MAX_HOPS)),
        }
    }

    pub fn tool(&self) -> Tool {
        match self.params {
            ProbeParams::Count(_) => Tool::Ping,
            ProbeParams::MaxHops(_) => Tool::Traceroute,
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn params(&self) -> ProbeParams {
        self.params
    }
}

// ============================================================================
// Command Invocation
// ============================================================================

/// A fully resolved native invocation, consumed once by the process supervisor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub executable: String,
    pub arguments: Vec<String>,
    /// Applied on top of the inherited environment
    pub environment: BTreeMap<String, String>,
}

impl CommandSpec {
    pub fn new(executable: impl Into<String>) -> Self {
        Self {
            executable: executable.into(),
            arguments: Vec::new(),
            environment: BTreeMap::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.arguments.push(arg.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }

    /// Shell-like rendering for logs
    pub fn command_line(&self) -> String {
        std::iter::once(self.executable.as_str())
            .chain(self.arguments.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

// ============================================================================
// Events
// ============================================================================

/// Canonical, platform-independent output unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DiagnosticEvent {
    /// Diagnostic accepted, emitted before any process output
    Start {
        message: String,
        timestamp: DateTime<Utc>,
    },
    /// One normalized line of tool output
    Output {
        message: String,
        timestamp: DateTime<Utc>,
        #[serde(rename = "hopCount", default, skip_serializing_if = "Option::is_none")]
        hop_number: Option<u32>,
    },
    /// Tool failure line, stderr output, or a fatal pipeline error
    Error {
        message: String,
        timestamp: DateTime<Utc>,
    },
    /// Process exited; always the last event of a stream
    Complete {
        message: String,
        timestamp: DateTime<Utc>,
        success: bool,
        #[serde(rename = "exitCode")]
        exit_code: i32,
        #[serde(rename = "hopCount", default, skip_serializing_if = "Option::is_none")]
        hop_count: Option<u32>,
    },
}

impl DiagnosticEvent {
    pub fn start(message: impl Into<String>) -> Self {
        Self::Start {
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn output(message: impl Into<String>, hop_number: Option<u32>) -> Self {
        Self::Output {
            message: message.into(),
            timestamp: Utc::now(),
            hop_number,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn complete(tool: Tool, exit_code: i32, hop_count: Option<u32>) -> Self {
        Self::Complete {
            message: format!("{} completed with exit code {}", tool.run_label(), exit_code),
            timestamp: Utc::now(),
            success: exit_code == 0,
            exit_code,
            hop_count,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Start { .. } => "start",
            Self::Output { .. } => "output",
            Self::Error { .. } => "error",
            Self::Complete { .. } => "complete",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Start { message, .. }
            | Self::Output { message, .. }
            | Self::Error { message, .. }
            | Self::Complete { message, .. } => message,
        }
    }

    pub fn hop_number(&self) -> Option<u32> {
        match self {
            Self::Output { hop_number, .. } => *hop_number,
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete { .. })
    }
}
