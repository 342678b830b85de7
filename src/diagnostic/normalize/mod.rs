//! Output normalization
//!
//! Turns raw tool output lines into canonical [`DiagnosticEvent`]s. Each
//! (tool, platform family) pair has an ordered table of recognizers; a
//! recognizer is an anchored pattern plus a formatter over its captures.
//! The first recognizer whose pattern matches and whose formatter accepts
//! the captures wins.

mod ping;
mod traceroute;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use super::platform::PlatformFamily;
use super::types::{DiagnosticEvent, Tool};

/// Unrecognized lines at or below this length are dropped as noise
const MIN_PASSTHROUGH_LEN: usize = 5;

pub(crate) const RESOLVE_FAILURE_MESSAGE: &str = "Error: Unable to resolve target host name";
pub(crate) const UNREACHABLE_MESSAGE: &str = "Error: Network is unreachable";

// ============================================================================
// Recognizers
// ============================================================================

/// What a recognized line means
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Reply,
    PingBanner,
    PingSummary,
    RoundTrip,
    Hop,
    TraceBanner,
    HopTimeout,
    ResolveFailure,
    NetworkUnreachable,
}

impl Category {
    /// Failure lines become `Error` events
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::ResolveFailure | Self::NetworkUnreachable)
    }
}

/// Formatter output: canonical message plus the hop it describes, if any
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Rendered {
    pub message: String,
    pub hop: Option<u32>,
}

impl Rendered {
    pub fn plain(message: String) -> Self {
        Self { message, hop: None }
    }

    pub fn hop(hop: u32, message: String) -> Self {
        Self {
            message,
            hop: Some(hop),
        }
    }
}

type Formatter = fn(&Captures<'_>, &HopTracker) -> Option<Rendered>;

pub(crate) struct Recognizer {
    pub category: Category,
    pattern: Regex,
    format: Formatter,
}

impl Recognizer {
    pub fn new(category: Category, pattern: &str, format: Formatter) -> Self {
        Self {
            category,
            pattern: Regex::new(pattern).expect("valid regex"),
            format,
        }
    }

    fn apply(&self, line: &str, hops: &HopTracker) -> Option<Rendered> {
        let caps = self.pattern.captures(line)?;
        (self.format)(&caps, hops)
    }
}

/// Name-resolution and reachability failures, shared by every table
pub(crate) fn failure_recognizers() -> Vec<Recognizer> {
    vec![
        Recognizer::new(
            Category::ResolveFailure,
            r"(?i)unknown host|cannot resolve|could not resolve|could not find host|name or service not known|unable to resolve|temporary failure in name resolution|no address associated with hostname",
            |_, _| Some(Rendered::plain(RESOLVE_FAILURE_MESSAGE.to_string())),
        ),
        Recognizer::new(
            Category::NetworkUnreachable,
            r"(?i)network is unreachable|destination (?:host|net|network) unreachable",
            |_, _| Some(Rendered::plain(UNREACHABLE_MESSAGE.to_string())),
        ),
    ]
}

fn table(tool: Tool, family: PlatformFamily) -> &'static [Recognizer] {
    match (tool, family) {
        (Tool::Ping, PlatformFamily::Unix) => &ping::UNIX,
        (Tool::Ping, PlatformFamily::Windows) => &ping::WINDOWS,
        (Tool::Traceroute, _) => &traceroute::TABLE,
    }
}

// ============================================================================
// Hop Tracking
// ============================================================================

/// Highest traceroute hop seen so far in one stream
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct HopTracker {
    last: Option<u32>,
}

impl HopTracker {
    /// Hop a line without its own hop number belongs to
    pub fn next(&self) -> u32 {
        self.last.map_or(1, |hop| hop.saturating_add(1))
    }

    fn record(&mut self, hop: u32) {
        self.last = Some(self.last.map_or(hop, |last| last.max(hop)));
    }
}

// ============================================================================
// Normalizer
// ============================================================================

/// Result of classifying one line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    /// `None` for verbatim pass-through
    pub category: Option<Category>,
    pub message: String,
    pub hop: Option<u32>,
}

/// Per-stream normalizer; tracks hop context across lines
pub struct Normalizer {
    tool: Tool,
    recognizers: &'static [Recognizer],
    hops: HopTracker,
}

impl Normalizer {
    pub fn new(tool: Tool, family: PlatformFamily) -> Self {
        Self {
            tool,
            recognizers: table(tool, family),
            hops: HopTracker::default(),
        }
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    /// Highest hop number seen so far
    pub fn last_hop(&self) -> Option<u32> {
        self.hops.last
    }

    /// Classify a line; `None` when it carries no signal
    pub fn classify(&mut self, raw: &str) -> Option<Normalized> {
        let line = clean_line(raw);
        if line.is_empty() {
            return None;
        }

        for recognizer in self.recognizers {
            if let Some(rendered) = recognizer.apply(&line, &self.hops) {
                if let Some(hop) = rendered.hop {
                    self.hops.record(hop);
                }
                return Some(Normalized {
                    category: Some(recognizer.category),
                    message: rendered.message,
                    hop: rendered.hop,
                });
            }
        }

        (line.len() > MIN_PASSTHROUGH_LEN).then(|| Normalized {
            category: None,
            message: line,
            hop: None,
        })
    }

    /// Normalize a stdout line into an event
    pub fn normalize(&mut self, raw: &str) -> Option<DiagnosticEvent> {
        let normalized = self.classify(raw)?;
        let event = match normalized.category {
            Some(category) if category.is_failure() => DiagnosticEvent::error(normalized.message),
            _ => DiagnosticEvent::output(normalized.message, normalized.hop),
        };
        Some(event)
    }

    /// Normalize a stderr line. Always an `Error` event; keeps the raw text
    /// when the classifier would have dropped it.
    pub fn normalize_stderr(&mut self, raw: &str) -> Option<DiagnosticEvent> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        let message = self
            .classify(raw)
            .map(|normalized| normalized.message)
            .unwrap_or_else(|| trimmed.to_string());
        Some(DiagnosticEvent::error(message))
    }
}

/// Stateless normalization using the host's dialect tables
pub fn normalize(tool: Tool, line: &str) -> Option<DiagnosticEvent> {
    Normalizer::new(tool, PlatformFamily::host()).normalize(line)
}

/// Replace non-ASCII and control characters with spaces, collapse whitespace
pub fn clean_line(raw: &str) -> String {
    let ascii: String = raw
        .chars()
        .map(|c| if c.is_ascii() && !c.is_ascii_control() { c } else { ' ' })
        .collect();
    ascii.split_whitespace().collect::<Vec<_>>().join(" ")
}

static BRACKETED_IPV4_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[(\[](\d{1,3}(?:\.\d{1,3}){3})[)\]]").expect("valid regex")
});

static BARE_IPV4_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|\s)(\d{1,3}(?:\.\d{1,3}){3})(?:\s|$)").expect("valid regex")
});

/// Address a tool reports for a host: the `(ip)` / `[ip]` after a resolved
/// name, else the first whitespace-delimited IPv4 token. Digits embedded in
/// a hostname never count.
pub(crate) fn reported_ipv4(text: &str) -> Option<&str> {
    BRACKETED_IPV4_RE
        .captures(text)
        .or_else(|| BARE_IPV4_RE.captures(text))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}
