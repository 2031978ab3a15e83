//! pktsniff is a small live packet sniffer built directly on libpcap.
//!
//! The crate is organised as a pipeline:
//!
//! * [`source::CaptureSource`] owns a libpcap handle and yields [`source::RawFrame`]s,
//! * [`dissect::dissect`] turns a frame into a [`dissect::PacketSummary`] (Ethernet, IPv4,
//!   UDP/TCP) or a [`dissect::DissectError`] explaining why it was skipped,
//! * [`report::Reporter`] renders summaries as one line of text each,
//! * [`pipeline::run`] drives the three until the capture ends or is cancelled.
//!
//! The libpcap binding itself lives in [`handle`], [`device`] and [`linktype`].
//!
//! # Example
//!
//! ```no_run
//! use pktsniff::pipeline::{self, RunOptions};
//! use pktsniff::report::{Clock, Reporter};
//! use pktsniff::source::{CaptureParams, CaptureSource};
//!
//! let mut source = CaptureSource::open("eth0", &CaptureParams::default()).unwrap();
//! source.install_filter("ip and udp").unwrap();
//!
//! let mut reporter = Reporter::new(std::io::stdout(), Clock::Local);
//! let stats = pipeline::run(&mut source, &mut reporter, &RunOptions::default()).unwrap();
//! eprintln!("{}", stats);
//! ```

use std::ffi::{self, CStr};
use std::str;

use thiserror::Error as ThisError;

use self::Error::*;

pub mod config;
pub mod device;
pub mod dissect;
pub mod handle;
pub mod linktype;
pub mod pipeline;
mod raw;
pub mod report;
pub mod select;
pub mod source;

pub use device::Device;
pub use handle::{Breaker, CaptureParams, Dumper, Handle, Packet, Stat};
pub use linktype::Linktype;

/// An error received from pcap
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum Error {
    /// The underlying library returned invalid UTF-8
    #[error("libpcap returned invalid UTF-8: {0}")]
    MalformedError(#[from] str::Utf8Error),
    /// The underlying library returned a null string
    #[error("libpcap returned a null string")]
    InvalidString,
    /// The underlying library returned an error
    #[error("libpcap error: {0}")]
    PcapError(String),
    /// The linktype was invalid or unknown
    #[error("invalid or unknown link type")]
    InvalidLinktype,
    /// The timeout expired while reading from a live capture
    #[error("timeout expired while reading from a live capture")]
    TimeoutExpired,
    /// No more packets to read from the file, or the capture was broken out of
    #[error("no more packets to read")]
    NoMorePackets,
    /// A string handed to libpcap contained a nul byte
    #[error("string passed to libpcap contains an interior nul byte")]
    InvalidInputString,
    /// An error from libc that is not reported through pcap_geterr
    #[error("libc error: {0}")]
    ErrnoError(errno::Errno),
}

impl Error {
    unsafe fn new(ptr: *const libc::c_char) -> Error {
        match cstr_to_string(ptr) {
            Err(e) => e,
            Ok(string) => PcapError(string.unwrap_or_default()),
        }
    }

    fn with_errbuf<T, F>(func: F) -> Result<T, Error>
    where
        F: FnOnce(*mut libc::c_char) -> Result<T, Error>,
    {
        let mut errbuf = [0 as libc::c_char; raw::PCAP_ERRBUF_SIZE];
        func(errbuf.as_mut_ptr())
    }
}

impl From<ffi::NulError> for Error {
    fn from(_: ffi::NulError) -> Error {
        InvalidInputString
    }
}

/// Returns the version string reported by the linked libpcap.
pub fn lib_version() -> Result<String, Error> {
    unsafe { cstr_to_string(raw::pcap_lib_version())?.ok_or(InvalidString) }
}

unsafe fn cstr_to_string(ptr: *const libc::c_char) -> Result<Option<String>, Error> {
    let string = if ptr.is_null() {
        None
    } else {
        Some(CStr::from_ptr(ptr as _).to_str()?.to_owned())
    };
    Ok(string)
}

#[cfg(test)]
mod tests {
    use std::ffi::CString;

    use crate::raw::testmod::RAWMTX;

    use super::*;

    #[test]
    fn test_error_invalid_utf8() {
        let bytes: [u8; 8] = [0x78, 0xfe, 0xe5, 0x12, 0x45, 0x74, 0x05, 0x00];
        let error = unsafe { Error::new(&bytes as *const _ as _) };
        assert!(matches!(error, Error::MalformedError(_)));
    }

    #[test]
    fn test_error_null_ptr() {
        let error = unsafe { Error::new(std::ptr::null()) };
        assert_eq!(error, Error::PcapError(String::new()));
    }

    #[test]
    fn test_errors_display() {
        for error in [
            Error::InvalidString,
            Error::PcapError(String::from("oh oh")),
            Error::InvalidLinktype,
            Error::TimeoutExpired,
            Error::NoMorePackets,
            Error::InvalidInputString,
            Error::ErrnoError(errno::Errno(125)),
        ] {
            assert!(!format!("{error}").is_empty());
        }
    }

    #[test]
    fn test_nul_error_conversion() {
        let error: Error = CString::new("eth\00").unwrap_err().into();
        assert_eq!(error, Error::InvalidInputString);
    }

    #[test]
    fn test_lib_version() {
        let _m = RAWMTX.lock();

        let version = CString::new("libpcap version 1.10.4").unwrap();
        let ctx = raw::pcap_lib_version_context();
        ctx.expect()
            .return_once_st(move || version.into_raw() as *const libc::c_char);

        assert_eq!(lib_version().unwrap(), "libpcap version 1.10.4");
    }
}
