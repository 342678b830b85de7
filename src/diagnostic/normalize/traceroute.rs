// src/diagnostic/normalize/traceroute.rs
// Traceroute/tracert table, shared by every platform family

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use super::{failure_recognizers, reported_ipv4, Category, HopTracker, Recognizer, Rendered};

static TIME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(<?[0-9.]+) ?ms\b").expect("valid regex"));

pub(super) static TABLE: Lazy<Vec<Recognizer>> = Lazy::new(|| {
    let mut table = vec![
        Recognizer::new(Category::Hop, r"^(\d+) (.+)$", hop),
        Recognizer::new(
            Category::TraceBanner,
            r"^(?:traceroute to|Tracing route to) (\S+)",
            |caps, _| Some(Rendered::plain(format!("Tracing route to {}", &caps[1]))),
        ),
        Recognizer::new(
            Category::HopTimeout,
            r"^(?:(\d+) )?(?:(?:\* ?)+(?:(?i:request timed out|timeout)\.?)?|(?i:request timed out|timeout)\.?)$",
            timeout,
        ),
    ];
    table.extend(failure_recognizers());
    table
});

/// A hop line needs both an address and a round-trip time; anything else
/// falls through to the timeout and failure recognizers.
fn hop(caps: &Captures<'_>, _: &HopTracker) -> Option<Rendered> {
    let number: u32 = caps[1].parse().ok()?;
    let rest = &caps[2];
    let ip = reported_ipv4(rest)?;
    let time = TIME_RE.captures(rest)?;

    let time = format!("{} ms", &time[1]);
    Some(Rendered::hop(
        number,
        format!("{:02}   {:<8} {}", number, time, ip),
    ))
}

fn timeout(caps: &Captures<'_>, hops: &HopTracker) -> Option<Rendered> {
    let number = match caps.get(1) {
        Some(m) => m.as_str().parse().ok()?,
        None => hops.next(),
    };
    Some(Rendered::hop(
        number,
        format!("{:02}   * * *     Request timed out", number),
    ))
}

#[cfg(test)]
mod tests {
    use crate::diagnostic::normalize::{Category, Normalizer};
    use crate::diagnostic::platform::PlatformFamily;
    use crate::diagnostic::types::Tool;

    fn unix() -> Normalizer {
        Normalizer::new(Tool::Traceroute, PlatformFamily::Unix)
    }

    fn windows() -> Normalizer {
        Normalizer::new(Tool::Traceroute, PlatformFamily::Windows)
    }

    #[test]
    fn test_linux_hop() {
        let event = unix()
            .normalize(" 1  192.168.1.1 (192.168.1.1)  0.123 ms  0.110 ms  0.098 ms")
            .unwrap();
        assert_eq!(event.kind(), "output");
        assert_eq!(event.message(), "01   0.123 ms 192.168.1.1");
        assert_eq!(event.hop_number(), Some(1));
    }

    #[test]
    fn test_hop_with_hostname() {
        let event = unix()
            .normalize(" 7  lax17s14-in-f14.1e100.net (142.250.68.14)  10.512 ms  10.498 ms  10.477 ms")
            .unwrap();
        assert_eq!(event.message(), "07   10.512 ms 142.250.68.14");
        assert_eq!(event.hop_number(), Some(7));
    }

    #[test]
    fn test_hostname_digits_do_not_shadow_address() {
        let event = unix()
            .normalize(" 1  host-10.1.2.3.example.net (8.8.8.8)  1.0 ms  1.1 ms  1.2 ms")
            .unwrap();
        assert_eq!(event.message(), "01   1.0 ms   8.8.8.8");

        let event = windows()
            .normalize("  6    21 ms    20 ms    22 ms  ae-1.r10.172.16.0.1.example.net [203.0.113.9]")
            .unwrap();
        assert_eq!(event.message(), "06   21 ms    203.0.113.9");
    }

    #[test]
    fn test_windows_hops() {
        let mut normalizer = windows();
        let event = normalizer
            .normalize("  1    <1 ms    <1 ms    <1 ms  192.168.1.1")
            .unwrap();
        assert_eq!(event.message(), "01   <1 ms    192.168.1.1");

        let event = normalizer
            .normalize(" 12    14 ms    13 ms    15 ms  dns.google [8.8.8.8]")
            .unwrap();
        assert_eq!(event.message(), "12   14 ms    8.8.8.8");
        assert_eq!(event.hop_number(), Some(12));
    }

    #[test]
    fn test_banners() {
        assert_eq!(
            unix()
                .normalize("traceroute to example.com (93.184.216.34), 30 hops max, 60 byte packets")
                .unwrap()
                .message(),
            "Tracing route to example.com"
        );
        let normalized = windows()
            .classify("Tracing route to dns.google [8.8.8.8]")
            .unwrap();
        assert_eq!(normalized.category, Some(Category::TraceBanner));
        assert_eq!(normalized.message, "Tracing route to dns.google");
    }

    #[test]
    fn test_numbered_timeout() {
        let event = unix().normalize(" 5  * * *").unwrap();
        assert_eq!(event.kind(), "output");
        assert_eq!(event.message(), "05   * * *     Request timed out");
        assert_eq!(event.hop_number(), Some(5));
    }

    #[test]
    fn test_bare_timeout_continues_from_last_hop() {
        let mut normalizer = unix();
        normalizer.normalize(" 1  10.0.0.1  1.0 ms  1.0 ms  1.0 ms").unwrap();
        normalizer.normalize(" 3  10.0.0.3  3.0 ms  3.0 ms  3.0 ms").unwrap();

        let event = normalizer.normalize("Request timed out.").unwrap();
        assert_eq!(event.message(), "04   * * *     Request timed out");
        assert_eq!(event.hop_number(), Some(4));
        assert_eq!(normalizer.last_hop(), Some(4));
    }

    #[test]
    fn test_bare_timeout_without_context_is_first_hop() {
        let event = unix().normalize("* * *").unwrap();
        assert_eq!(event.message(), "01   * * *     Request timed out");
    }

    #[test]
    fn test_windows_timeout() {
        let event = windows()
            .normalize("  4     *        *        *     Request timed out.")
            .unwrap();
        assert_eq!(event.message(), "04   * * *     Request timed out");
        assert_eq!(event.hop_number(), Some(4));
    }

    #[test]
    fn test_partial_star_line_with_address_is_hop() {
        let event = unix()
            .normalize(" 9  10.1.2.3 (10.1.2.3)  12.345 ms *  12.001 ms")
            .unwrap();
        assert_eq!(event.message(), "09   12.345 ms 10.1.2.3");
    }

    #[test]
    fn test_numbered_line_without_time_passes_through() {
        let normalized = unix().classify(" 3  gateway.local (10.0.0.1)").unwrap();
        assert_eq!(normalized.category, None);
        assert_eq!(normalized.message, "3 gateway.local (10.0.0.1)");
        assert_eq!(normalized.hop, None);
    }

    #[test]
    fn test_trace_complete_passes_through() {
        let event = windows().normalize("Trace complete.").unwrap();
        assert_eq!(event.kind(), "output");
        assert_eq!(event.message(), "Trace complete.");
        assert_eq!(event.hop_number(), None);
    }

    #[test]
    fn test_hops_are_monotonic() {
        let mut normalizer = unix();
        let lines = [
            "traceroute to 8.8.8.8 (8.8.8.8), 30 hops max, 60 byte packets",
            " 1  192.168.1.1 (192.168.1.1)  0.5 ms  0.4 ms  0.4 ms",
            " 2  * * *",
            "Request timed out.",
            " 4  8.8.8.8 (8.8.8.8)  9.1 ms  9.0 ms  9.2 ms",
        ];

        let mut previous = 0;
        for line in lines {
            if let Some(hop) = normalizer.normalize(line).and_then(|e| e.hop_number()) {
                assert!(hop > previous, "hop {} after {}", hop, previous);
                previous = hop;
            }
        }
        assert_eq!(previous, 4);
        assert_eq!(normalizer.last_hop(), Some(4));
    }

    #[test]
    fn test_canonical_messages_are_fixed_points() {
        let raw = [
            " 1  192.168.1.1 (192.168.1.1)  0.123 ms  0.110 ms  0.098 ms",
            "  1    <1 ms    <1 ms    <1 ms  192.168.1.1",
            " 5  * * *",
            "traceroute to example.com (93.184.216.34), 30 hops max, 60 byte packets",
            "Trace complete.",
        ];

        for family in [PlatformFamily::Unix, PlatformFamily::Windows] {
            let mut normalizer = Normalizer::new(Tool::Traceroute, family);
            for line in raw {
                let first = normalizer.normalize(line).unwrap().message().to_string();
                let second = normalizer.normalize(&first).unwrap().message().to_string();
                assert_eq!(first, second, "not a fixed point: {}", line);
            }
        }
    }
}
