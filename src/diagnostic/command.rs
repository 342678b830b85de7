// src/diagnostic/command.rs
// Native invocation table for each (tool, platform) pair

use super::platform::{Platform, PlatformFamily};
use super::types::{CommandSpec, DiagnosticRequest, ProbeParams};
use crate::error::{ProbeError, Result};

/// Switches the Windows console to UTF-8 before the tool runs
const WINDOWS_CODEPAGE_PREFIX: &str = "chcp 65001 >nul && ";

/// Build the invocation for a request on the given platform.
///
/// Locale is pinned (C locale on Unix, UTF-8 codepage on Windows) so the
/// normalizer only ever sees the English, ASCII dialect of each tool.
pub fn build(request: &DiagnosticRequest, platform: Platform) -> Result<CommandSpec> {
    let family = platform
        .family()
        .ok_or_else(|| ProbeError::UnsupportedPlatform(platform.as_str().to_string()))?;
    let target = request.target();

    let spec = match (request.params(), family) {
        (ProbeParams::Count(count), PlatformFamily::Windows) => {
            windows_console(format!("ping -n {} {}", count, target))
        }
        (ProbeParams::Count(count), PlatformFamily::Unix) => {
            unix_tool("ping", "-c", count, target)
        }
        (ProbeParams::MaxHops(max_hops), PlatformFamily::Windows) => {
            windows_console(format!("tracert -h {} {}", max_hops, target))
        }
        (ProbeParams::MaxHops(max_hops), PlatformFamily::Unix) => {
            unix_tool("traceroute", "-m", max_hops, target)
        }
    };

    Ok(spec)
}

fn windows_console(command: String) -> CommandSpec {
    CommandSpec::new("cmd")
        .arg("/c")
        .arg(format!("{}{}", WINDOWS_CODEPAGE_PREFIX, command))
        .env("LANG", "en_US.UTF-8")
}

fn unix_tool(executable: &str, flag: &str, value: u32, target: &str) -> CommandSpec {
    CommandSpec::new(executable)
        .arg(flag)
        .arg(value.to_string())
        .arg(target)
        .env("LC_ALL", "C")
}
