//! The capture source: a libpcap handle that yields owned Ethernet frames.
//!
//! A [`CaptureSource`] is opened on a live interface with [`CaptureSource::open`] or on a pcap
//! savefile with [`CaptureSource::open_file`]. Either way the link layer must be Ethernet, since
//! that is the only framing the dissector understands. Frames are pulled one at a time with
//! [`CaptureSource::next_frame`], which hides read timeouts and turns both "savefile exhausted"
//! and "loop broken" into [`NextFrame::EndOfCapture`].

use std::{
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info, trace};

pub use crate::handle::CaptureParams;
use crate::{Breaker, Dumper, Error, Handle, Linktype, Packet, Stat};

/// Fatal capture-side errors. Per-frame problems are reported by the dissector instead.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("unable to open interface {interface}")]
    UnavailableInterface {
        interface: String,
        source: Error,
    },
    #[error("unable to read capture file {}", path.display())]
    UnreadableFile { path: PathBuf, source: Error },
    #[error("{interface} uses link layer {linktype} [{description}], only Ethernet is supported")]
    UnsupportedLinkLayer {
        interface: String,
        linktype: Linktype,
        description: String,
    },
    #[error("invalid filter expression `{expression}`")]
    InvalidFilterSyntax { expression: String, source: Error },
    #[error("unable to write savefile {}", path.display())]
    Savefile { path: PathBuf, source: Error },
    #[error("capture failed")]
    Capture(#[from] Error),
}

/// A captured frame, copied out of libpcap's buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    pub timestamp: DateTime<Utc>,
    /// Length of the frame on the wire, which may exceed the captured bytes
    pub len: u32,
    pub data: Box<[u8]>,
}

impl RawFrame {
    pub fn new<D: Into<Box<[u8]>>>(timestamp: DateTime<Utc>, data: D) -> RawFrame {
        let data = data.into();
        RawFrame {
            timestamp,
            len: data.len() as u32,
            data,
        }
    }

    /// Number of bytes actually captured.
    pub fn caplen(&self) -> usize {
        self.data.len()
    }
}

impl From<&Packet<'_>> for RawFrame {
    fn from(packet: &Packet<'_>) -> Self {
        RawFrame {
            timestamp: packet.timestamp(),
            len: packet.wire_len(),
            data: packet.data().into(),
        }
    }
}

/// Outcome of a successful read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextFrame {
    Frame(RawFrame),
    EndOfCapture,
}

/// Anything the pipeline can pull frames from.
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<NextFrame, SourceError>;
}

/// Requests the end of a capture from another thread, such as a signal handler.
///
/// The current or next [`CaptureSource::next_frame`] call returns [`NextFrame::EndOfCapture`].
/// Stopping after the source has been dropped is a no-op.
#[derive(Clone)]
pub struct StopHandle {
    stopped: Arc<AtomicBool>,
    breaker: Breaker,
}

impl StopHandle {
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.breaker.break_loop();
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

/// An open, Ethernet-framed capture handle with an optional savefile attached.
pub struct CaptureSource {
    handle: Handle,
    savefile: Option<(Dumper, PathBuf)>,
    stopped: Arc<AtomicBool>,
    label: String,
    finished: bool,
}

impl CaptureSource {
    /// Opens and activates `interface`.
    ///
    /// With `params.promiscuous` set the interface itself is switched to promiscuous mode, which
    /// is visible to every other process reading from it until the handle is closed.
    pub fn open(interface: &str, params: &CaptureParams) -> Result<CaptureSource, SourceError> {
        let handle = Handle::open_live(interface, params).map_err(|source| {
            SourceError::UnavailableInterface {
                interface: interface.to_string(),
                source,
            }
        })?;
        info!(
            interface,
            snaplen = params.snaplen,
            promiscuous = params.promiscuous,
            timeout_ms = params.timeout_ms,
            "capture opened"
        );

        CaptureSource::from_handle(handle, interface)
    }

    /// Replays a pcap savefile.
    pub fn open_file<P: AsRef<Path>>(path: P) -> Result<CaptureSource, SourceError> {
        let path = path.as_ref();
        let handle = Handle::open_offline(path).map_err(|source| SourceError::UnreadableFile {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), "replaying capture file");

        CaptureSource::from_handle(handle, &path.display().to_string())
    }

    /// Wraps an open handle. Fails unless its link layer is Ethernet.
    pub fn from_handle(handle: Handle, label: &str) -> Result<CaptureSource, SourceError> {
        let linktype = handle.datalink();
        if linktype != Linktype::ETHERNET {
            return Err(SourceError::UnsupportedLinkLayer {
                interface: label.to_string(),
                linktype,
                description: linktype.describe(),
            });
        }

        Ok(CaptureSource {
            handle,
            savefile: None,
            stopped: Arc::new(AtomicBool::new(false)),
            label: label.to_string(),
            finished: false,
        })
    }

    /// Compiles `expression` with optimisation and attaches it to the handle.
    pub fn install_filter(&mut self, expression: &str) -> Result<(), SourceError> {
        self.handle
            .set_filter(expression, true)
            .map_err(|source| SourceError::InvalidFilterSyntax {
                expression: expression.to_string(),
                source,
            })?;
        debug!(filter = expression, "filter installed");
        Ok(())
    }

    /// Appends every frame returned from now on to a pcap savefile at `path`.
    pub fn save_to<P: AsRef<Path>>(&mut self, path: P) -> Result<(), SourceError> {
        let path = path.as_ref();
        let dumper = self
            .handle
            .dump_to(path)
            .map_err(|source| SourceError::Savefile {
                path: path.to_path_buf(),
                source,
            })?;
        debug!(path = %path.display(), "writing frames to savefile");
        self.savefile = Some((dumper, path.to_path_buf()));
        Ok(())
    }

    /// Blocks until a frame arrives, the capture ends, or a stop is requested.
    ///
    /// Read timeouts are retried. Once `EndOfCapture` has been returned every later call
    /// returns it again without touching libpcap.
    pub fn next_frame(&mut self) -> Result<NextFrame, SourceError> {
        loop {
            if self.finished {
                return Ok(NextFrame::EndOfCapture);
            }
            if self.stopped.load(Ordering::SeqCst) {
                debug!("stop requested");
                self.finished = true;
                continue;
            }

            match self.handle.next_packet() {
                Ok(packet) => {
                    if let Some((dumper, _)) = self.savefile.as_mut() {
                        dumper.write(&packet);
                    }
                    return Ok(NextFrame::Frame(RawFrame::from(&packet)));
                }
                Err(Error::TimeoutExpired) => trace!("read timeout expired"),
                Err(Error::NoMorePackets) => {
                    debug!("no more packets");
                    self.finished = true;
                }
                Err(err) => return Err(SourceError::Capture(err)),
            }
        }
    }

    /// libpcap's received and dropped counters. Savefiles have none and return an error.
    pub fn stats(&mut self) -> Result<Stat, SourceError> {
        Ok(self.handle.stats()?)
    }

    /// Flushes the attached savefile, if any.
    pub fn flush(&mut self) -> Result<(), SourceError> {
        if let Some((dumper, path)) = self.savefile.as_mut() {
            dumper.flush().map_err(|source| SourceError::Savefile {
                path: path.clone(),
                source,
            })?;
        }
        Ok(())
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            stopped: Arc::clone(&self.stopped),
            breaker: self.handle.breaker(),
        }
    }

    /// Interface name or savefile path the source was opened on.
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl FrameSource for CaptureSource {
    fn next_frame(&mut self) -> Result<NextFrame, SourceError> {
        CaptureSource::next_frame(self)
    }
}

impl Iterator for CaptureSource {
    type Item = Result<RawFrame, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_frame() {
            Ok(NextFrame::Frame(frame)) => Some(Ok(frame)),
            Ok(NextFrame::EndOfCapture) => None,
            Err(err) => {
                self.finished = true;
                Some(Err(err))
            }
        }
    }
}
