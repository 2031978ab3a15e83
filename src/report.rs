//! One line of text per packet summary.

use std::io::{self, Write};

use chrono::{Local, Utc};

use crate::dissect::PacketSummary;

/// `HH:MM:SS DD-MM-YYYY`, 24-hour clock.
pub const TIMESTAMP_FORMAT: &str = "%H:%M:%S %d-%m-%Y";

/// Time zone used to render capture timestamps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Clock {
    #[default]
    Local,
    Utc,
}

impl Clock {
    /// `Utc` when `utc` is set, `Local` otherwise.
    pub fn from_utc(utc: bool) -> Clock {
        if utc {
            Clock::Utc
        } else {
            Clock::Local
        }
    }
}

/// Formats `summary` using the local time zone.
///
/// ```
/// # use pktsniff::{dissect::{PacketSummary, Protocol}, report::{format_in, Clock}};
/// # use chrono::DateTime;
/// let summary = PacketSummary {
///     timestamp: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
///     protocol: Protocol::Udp,
///     source: "10.0.0.1:53".parse().unwrap(),
///     destination: "10.0.0.2:12345".parse().unwrap(),
///     length: 8,
/// };
/// assert_eq!(
///     format_in(&summary, Clock::Utc),
///     "22:13:20 14-11-2023 UDP 10.0.0.1:53 -> 10.0.0.2:12345 8"
/// );
/// ```
pub fn format(summary: &PacketSummary) -> String {
    format_in(summary, Clock::Local)
}

pub fn format_in(summary: &PacketSummary, clock: Clock) -> String {
    let timestamp = match clock {
        Clock::Local => summary
            .timestamp
            .with_timezone(&Local)
            .format(TIMESTAMP_FORMAT),
        Clock::Utc => summary.timestamp.with_timezone(&Utc).format(TIMESTAMP_FORMAT),
    };
    format!(
        "{} {} {} -> {} {}",
        timestamp, summary.protocol, summary.source, summary.destination, summary.length
    )
}

/// Writes formatted summaries to an owned sink, one per line.
pub struct Reporter<W: Write> {
    sink: W,
    clock: Clock,
}

impl<W: Write> Reporter<W> {
    pub fn new(sink: W, clock: Clock) -> Reporter<W> {
        Reporter { sink, clock }
    }

    pub fn report(&mut self, summary: &PacketSummary) -> io::Result<()> {
        writeln!(self.sink, "{}", format_in(summary, self.clock))
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.sink.flush()
    }

    pub fn into_inner(self) -> W {
        self.sink
    }
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;

    use crate::dissect::Protocol;

    use super::*;

    fn summary(protocol: Protocol, length: u16) -> PacketSummary {
        PacketSummary {
            timestamp: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            protocol,
            source: "192.168.1.10:443".parse().unwrap(),
            destination: "192.168.1.20:50000".parse().unwrap(),
            length,
        }
    }

    #[test]
    fn format_tcp_in_utc() {
        assert_eq!(
            format_in(&summary(Protocol::Tcp, 0), Clock::Utc),
            "22:13:20 14-11-2023 TCP 192.168.1.10:443 -> 192.168.1.20:50000 0"
        );
    }

    #[test]
    fn format_uses_24_hour_clock() {
        let mut summary = summary(Protocol::Udp, 8);
        summary.timestamp = DateTime::from_timestamp(1_700_000_000 + 3600, 0).unwrap();

        let line = format_in(&summary, Clock::Utc);
        assert!(line.starts_with("23:13:20 14-11-2023 UDP"), "{line}");
    }

    #[test]
    fn format_local_matches_chrono() {
        let summary = summary(Protocol::Udp, 8);
        let expected = summary
            .timestamp
            .with_timezone(&Local)
            .format(TIMESTAMP_FORMAT)
            .to_string();

        assert!(format(&summary).starts_with(&expected));
    }

    #[test]
    fn reporter_writes_lines() {
        let mut reporter = Reporter::new(Vec::new(), Clock::Utc);
        reporter.report(&summary(Protocol::Tcp, 12)).unwrap();
        reporter.report(&summary(Protocol::Udp, 8)).unwrap();

        let output = String::from_utf8(reporter.into_inner()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("TCP 192.168.1.10:443 -> 192.168.1.20:50000 12"));
        assert!(lines[1].ends_with("UDP 192.168.1.10:443 -> 192.168.1.20:50000 8"));
    }
}
