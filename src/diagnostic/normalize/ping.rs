// src/diagnostic/normalize/ping.rs
// Ping dialect tables

use once_cell::sync::Lazy;
use regex::Captures;

use super::{failure_recognizers, Category, HopTracker, Recognizer, Rendered};

/// IPv4 + ICMP header bytes added to the payload size
const ICMP_OVERHEAD: u32 = 28;

const IP: &str = r"\d{1,3}(?:\.\d{1,3}){3}";

/// Linux iputils and BSD/macOS ping
pub(super) static UNIX: Lazy<Vec<Recognizer>> = Lazy::new(|| {
    let mut table = vec![
        Recognizer::new(
            Category::Reply,
            &format!(
                r"^(\d+) bytes from (?:\S+ \(({IP})\)|({IP})\b).*?\btime([=<]) ?([0-9.]+) ?ms\b"
            ),
            |caps, _| {
                let ip = caps.get(2).or_else(|| caps.get(3))?.as_str();
                Some(reply(&caps[1], ip, &caps[4], &caps[5]))
            },
        ),
        Recognizer::new(
            Category::PingBanner,
            &format!(r"^PING \S+ \(({IP})\):? (\d+)(?:\(\d+\))? (?:bytes of data|data bytes)"),
            banner,
        ),
        Recognizer::new(
            Category::PingSummary,
            r"^(\d+) packets transmitted, (\d+) (?:packets )?received,(?: \+\d+ \w+,)* ([0-9.]+)% packet loss",
            |caps, _| Some(summary(&caps[1], &caps[2], &caps[3])),
        ),
        Recognizer::new(
            Category::RoundTrip,
            r"^(?:rtt|round-trip) min/avg/max(?:/(?:mdev|stddev))? = ([0-9.]+)/([0-9.]+)/([0-9.]+)(?:/[0-9.]+)? ms$",
            |caps, _| Some(round_trip(&caps[1], &caps[2], &caps[3])),
        ),
    ];
    table.extend(failure_recognizers());
    table
});

/// Windows ping.exe under codepage 65001
pub(super) static WINDOWS: Lazy<Vec<Recognizer>> = Lazy::new(|| {
    let mut table = vec![
        Recognizer::new(
            Category::Reply,
            &format!(r"^Reply from ({IP}): bytes=(\d+) time([=<])([0-9.]+) ?ms TTL=\d+"),
            |caps, _| Some(reply(&caps[2], &caps[1], &caps[3], &caps[4])),
        ),
        Recognizer::new(
            Category::PingBanner,
            &format!(r"^Pinging (?:\S+ \[)?({IP})\]? with (\d+) bytes of data"),
            banner,
        ),
        Recognizer::new(
            Category::PingSummary,
            r"^Packets: Sent = (\d+), Received = (\d+), Lost = \d+ \(([0-9.]+)% loss\)",
            |caps, _| Some(summary(&caps[1], &caps[2], &caps[3])),
        ),
        Recognizer::new(
            Category::RoundTrip,
            r"^Minimum = ([0-9.]+) ?ms, Maximum = ([0-9.]+) ?ms, Average = ([0-9.]+) ?ms$",
            |caps, _| Some(round_trip(&caps[1], &caps[3], &caps[2])),
        ),
    ];
    table.extend(failure_recognizers());
    table
});

fn reply(bytes: &str, ip: &str, comparator: &str, millis: &str) -> Rendered {
    Rendered::plain(format!(
        "{} bytes from {}: time{}{}ms",
        bytes, ip, comparator, millis
    ))
}

/// Captures: 1 = address, 2 = payload size
fn banner(caps: &Captures<'_>, _: &HopTracker) -> Option<Rendered> {
    let ip = &caps[1];
    let payload: u32 = caps[2].parse().ok()?;
    Some(Rendered::plain(format!(
        "PING {ip} ({ip}) {}({}) bytes of data.",
        payload,
        payload.saturating_add(ICMP_OVERHEAD)
    )))
}

fn summary(sent: &str, received: &str, loss: &str) -> Rendered {
    Rendered::plain(format!(
        "{} packets transmitted, {} received, {}% packet loss",
        sent, received, loss
    ))
}

fn round_trip(min: &str, avg: &str, max: &str) -> Rendered {
    Rendered::plain(format!("round-trip min/avg/max = {}/{}/{} ms", min, avg, max))
}
