//! Pulls frames from a source, dissects them and reports the summaries.

use std::{fmt, io::Write};

use thiserror::Error;
use tracing::{debug, info, trace};

use crate::{
    dissect::dissect,
    report::Reporter,
    source::{FrameSource, NextFrame, SourceError},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Stop after this many reported packets. 0 means no limit.
    pub count: u64,
}

/// Outcome tallies for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub frames: u64,
    pub reported: u64,
    /// Frames that were well formed but not UDP or TCP over IPv4
    pub skipped: u64,
    pub malformed: u64,
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} frames, {} reported, {} skipped, {} malformed",
            self.frames, self.reported, self.skipped, self.malformed
        )
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("unable to write packet summary")]
    Output(#[from] std::io::Error),
}

/// Runs until the source reports the end of the capture or `options.count` summaries have been
/// written. Per-frame dissection failures are counted and logged, never fatal.
pub fn run<S, W>(
    source: &mut S,
    reporter: &mut Reporter<W>,
    options: &RunOptions,
) -> Result<RunStats, PipelineError>
where
    S: FrameSource + ?Sized,
    W: Write,
{
    let mut stats = RunStats::default();

    while options.count == 0 || stats.reported < options.count {
        let frame = match source.next_frame()? {
            NextFrame::Frame(frame) => frame,
            NextFrame::EndOfCapture => break,
        };
        stats.frames += 1;

        match dissect(&frame) {
            Ok(summary) => {
                reporter.report(&summary)?;
                stats.reported += 1;
            }
            Err(err) if err.is_malformed() => {
                debug!(caplen = frame.caplen(), error = %err, "malformed frame");
                stats.malformed += 1;
            }
            Err(err) => {
                trace!(error = %err, "frame skipped");
                stats.skipped += 1;
            }
        }
    }

    reporter.flush()?;
    info!(%stats, "capture finished");
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use std::{collections::VecDeque, io};

    use chrono::DateTime;
    use etherparse::PacketBuilder;

    use crate::{
        report::Clock,
        source::{RawFrame, SourceError},
        Error,
    };

    use super::*;

    enum Step {
        Frame(Vec<u8>),
        Fail,
    }

    struct ScriptedSource {
        steps: VecDeque<Step>,
        reads: usize,
    }

    impl ScriptedSource {
        fn new(steps: Vec<Step>) -> Self {
            ScriptedSource {
                steps: steps.into(),
                reads: 0,
            }
        }
    }

    impl FrameSource for ScriptedSource {
        fn next_frame(&mut self) -> Result<NextFrame, SourceError> {
            self.reads += 1;
            match self.steps.pop_front() {
                Some(Step::Frame(data)) => Ok(NextFrame::Frame(RawFrame::new(
                    DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
                    data,
                ))),
                Some(Step::Fail) => Err(SourceError::Capture(Error::PcapError(
                    "device went down".to_string(),
                ))),
                None => Ok(NextFrame::EndOfCapture),
            }
        }
    }

    fn udp(dst_port: u16) -> Vec<u8> {
        let builder = PacketBuilder::ethernet2([1, 2, 3, 4, 5, 6], [6, 5, 4, 3, 2, 1])
            .ipv4([10, 0, 0, 1], [10, 0, 0, 2], 64)
            .udp(53, dst_port);
        let mut out = Vec::with_capacity(builder.size(0));
        builder.write(&mut out, &[]).unwrap();
        out
    }

    fn arp() -> Vec<u8> {
        let mut data = vec![0xff; 12];
        data.extend_from_slice(&[0x08, 0x06]);
        data.extend_from_slice(&[0; 28]);
        data
    }

    #[test]
    fn reports_and_counts() {
        let mut source = ScriptedSource::new(vec![
            Step::Frame(udp(12345)),
            Step::Frame(arp()),
            Step::Frame(vec![0; 6]),
            Step::Frame(udp(12346)),
        ]);
        let mut reporter = Reporter::new(Vec::new(), Clock::Utc);

        let stats = run(&mut source, &mut reporter, &RunOptions::default()).unwrap();
        assert_eq!(
            stats,
            RunStats {
                frames: 4,
                reported: 2,
                skipped: 1,
                malformed: 1,
            }
        );

        let output = String::from_utf8(reporter.into_inner()).unwrap();
        assert_eq!(
            output,
            "22:13:20 14-11-2023 UDP 10.0.0.1:53 -> 10.0.0.2:12345 8\n\
             22:13:20 14-11-2023 UDP 10.0.0.1:53 -> 10.0.0.2:12346 8\n"
        );
    }

    #[test]
    fn count_limits_reported_packets() {
        let mut source = ScriptedSource::new(vec![
            Step::Frame(arp()),
            Step::Frame(udp(1)),
            Step::Frame(udp(2)),
            Step::Frame(udp(3)),
        ]);
        let mut reporter = Reporter::new(Vec::new(), Clock::Utc);

        let stats = run(&mut source, &mut reporter, &RunOptions { count: 2 }).unwrap();
        assert_eq!(stats.reported, 2);
        assert_eq!(stats.frames, 3);
        assert_eq!(source.reads, 3);
    }

    #[test]
    fn no_frames_no_output() {
        let mut source = ScriptedSource::new(vec![]);
        let mut reporter = Reporter::new(Vec::new(), Clock::Utc);

        let stats = run(&mut source, &mut reporter, &RunOptions::default()).unwrap();
        assert_eq!(stats, RunStats::default());
        assert!(reporter.into_inner().is_empty());
    }

    #[test]
    fn source_error_is_fatal() {
        let mut source = ScriptedSource::new(vec![Step::Frame(udp(1)), Step::Fail]);
        let mut reporter = Reporter::new(Vec::new(), Clock::Utc);

        let err = run(&mut source, &mut reporter, &RunOptions::default()).unwrap_err();
        assert!(matches!(err, PipelineError::Source(SourceError::Capture(_))));
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn output_error_is_fatal() {
        let mut source = ScriptedSource::new(vec![Step::Frame(udp(1))]);
        let mut reporter = Reporter::new(BrokenPipe, Clock::Utc);

        let err = run(&mut source, &mut reporter, &RunOptions::default()).unwrap_err();
        assert!(matches!(err, PipelineError::Output(_)));
    }

    #[test]
    fn stats_display() {
        let stats = RunStats {
            frames: 5,
            reported: 3,
            skipped: 1,
            malformed: 1,
        };
        assert_eq!(
            stats.to_string(),
            "5 frames, 3 reported, 1 skipped, 1 malformed"
        );
    }
}
