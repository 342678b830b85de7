// src/diagnostic/publisher.rs
// Drives one diagnostic from spawn to Complete, pushing events to the caller

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::command;
use super::normalize::Normalizer;
use super::platform::{Platform, PlatformFamily};
use super::process::{self, ProcessHandle, StreamKind};
use super::types::{CommandSpec, DiagnosticEvent, DiagnosticRequest, ProbeParams, Tool};
use crate::error::Result;

/// How a pipeline ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Process exited and `Complete` was delivered
    Completed { exit_code: i32 },
    /// Nothing could be run; one `Error` was delivered
    Failed(String),
    /// Caller cancelled or dropped the receiver; process killed, no `Complete`
    Abandoned,
}

impl RunOutcome {
    pub fn success(&self) -> bool {
        matches!(self, Self::Completed { exit_code: 0 })
    }
}

// ============================================================================
// Publisher
// ============================================================================

/// Pushes events for one run to a single consumer
pub struct StreamPublisher {
    tx: mpsc::Sender<DiagnosticEvent>,
    cancel: CancellationToken,
}

impl StreamPublisher {
    pub fn new(tx: mpsc::Sender<DiagnosticEvent>, cancel: CancellationToken) -> Self {
        Self { tx, cancel }
    }

    pub async fn publish(
        self,
        tool: Tool,
        family: PlatformFamily,
        start_message: String,
        command: Result<CommandSpec>,
    ) -> RunOutcome {
        if !self.emit(DiagnosticEvent::start(start_message)).await {
            debug!("Caller gone before start");
            return RunOutcome::Abandoned;
        }

        let spec = match command {
            Ok(spec) => spec,
            Err(e) => {
                warn!(error = %e, "Cannot build diagnostic command");
                let message = e.to_string();
                self.emit(DiagnosticEvent::error(message.clone())).await;
                return RunOutcome::Failed(message);
            }
        };

        let mut handle = match process::spawn(&spec) {
            Ok(handle) => handle,
            Err(e) => {
                warn!(error = %e, command = %spec.command_line(), "Failed to spawn diagnostic");
                let message = format!("Failed to execute {}: {}", tool, e.reason());
                self.emit(DiagnosticEvent::error(message.clone())).await;
                return RunOutcome::Failed(message);
            }
        };

        let mut normalizer = Normalizer::new(tool, family);

        loop {
            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => None,
                _ = self.tx.closed() => None,
                line = handle.next_line() => Some(line),
            };

            let line = match next {
                None => return self.abandon(&handle),
                Some(None) => break,
                Some(Some(line)) => line,
            };

            let event = match line.stream {
                StreamKind::Stdout => normalizer.normalize(&line.text),
                StreamKind::Stderr => {
                    warn!(line = %line.text, "Diagnostic wrote to stderr");
                    normalizer.normalize_stderr(&line.text)
                }
            };

            if let Some(event) = event {
                if !self.emit(event).await {
                    return self.abandon(&handle);
                }
            }
        }

        let exit = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            _ = self.tx.closed() => None,
            exit = handle.wait() => Some(exit),
        };
        let Some(exit) = exit else {
            return self.abandon(&handle);
        };

        let hop_count = match tool {
            Tool::Traceroute => normalizer.last_hop(),
            Tool::Ping => None,
        };
        let exit_code = exit.code();
        info!(exit_code, hop_count = ?hop_count, "Diagnostic finished");

        if !self.emit(DiagnosticEvent::complete(tool, exit_code, hop_count)).await {
            return RunOutcome::Abandoned;
        }
        RunOutcome::Completed { exit_code }
    }

    /// Deliver one event; `false` once the caller is gone
    async fn emit(&self, event: DiagnosticEvent) -> bool {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            sent = self.tx.send(event) => sent.is_ok(),
        }
    }

    fn abandon(&self, handle: &ProcessHandle) -> RunOutcome {
        info!(pid = ?handle.pid(), "Caller disconnected, killing diagnostic");
        handle.kill();
        RunOutcome::Abandoned
    }
}

// ============================================================================
// Run
// ============================================================================

/// One request bound to the platform it runs on
#[derive(Debug, Clone)]
pub struct DiagnosticRun {
    request: DiagnosticRequest,
    platform: Platform,
    origin: Option<String>,
}

impl DiagnosticRun {
    pub fn new(request: DiagnosticRequest) -> Self {
        Self {
            request,
            platform: Platform::detect(),
            origin: None,
        }
    }

    pub fn on_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// Label shown in the start message, usually the server name
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    pub fn tool(&self) -> Tool {
        self.request.tool()
    }

    pub fn target(&self) -> &str {
        self.request.target()
    }

    pub fn start_message(&self) -> String {
        let origin = self
            .origin
            .as_deref()
            .map(|o| format!(" from {}", o))
            .unwrap_or_default();
        let target = self.request.target();

        match self.request.params() {
            ProbeParams::Count(count) => format!(
                "PING {}{} - Starting ping test with {} packets...",
                target, origin, count
            ),
            ProbeParams::MaxHops(max_hops) => format!(
                "TRACERT {}{} - Starting traceroute with max {} hops...",
                target, origin, max_hops
            ),
        }
    }

    /// Run to completion, streaming into `tx` until done or `cancel` fires
    pub async fn execute(
        self,
        tx: mpsc::Sender<DiagnosticEvent>,
        cancel: CancellationToken,
    ) -> RunOutcome {
        let family = self.platform.family().unwrap_or(PlatformFamily::Unix);
        let command = command::build(&self.request, self.platform);
        debug!(platform = %self.platform, "Executing diagnostic");

        StreamPublisher::new(tx, cancel)
            .publish(self.tool(), family, self.start_message(), command)
            .await
    }
}
