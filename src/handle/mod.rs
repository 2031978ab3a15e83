//! An owned libpcap handle, opened live or on a savefile.
//!
//! [`Handle`] covers exactly what a sniffer needs from libpcap: open, check the link layer,
//! install a filter, read packets one by one, record them, read the drop counters and break out of
//! a blocking read from another thread.

mod dumper;
mod filter;

use std::{
    ffi::CString,
    path::Path,
    ptr::{self, NonNull},
    slice,
    sync::{Arc, Weak},
};

use chrono::{DateTime, Utc};
use libc::c_int;
use tracing::warn;

use crate::{cstr_to_string, linktype::Linktype, raw, Error};

pub use self::dumper::Dumper;

/// How a live interface is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureParams {
    /// Maximum number of bytes kept per frame
    pub snaplen: i32,
    pub promiscuous: bool,
    /// Read timeout; the source retries transparently when it expires
    pub timeout_ms: i32,
    /// Deliver packets as soon as they arrive instead of buffering them. Only honoured when built
    /// against libpcap 1.5.0 or newer.
    pub immediate: bool,
}

impl Default for CaptureParams {
    fn default() -> Self {
        CaptureParams {
            snaplen: 65536,
            promiscuous: true,
            timeout_ms: 1000,
            immediate: false,
        }
    }
}

/// Kernel and driver counters of a live capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stat {
    pub received: u32,
    /// Dropped because the capture buffer was full
    pub dropped: u32,
    /// Dropped by the interface or its driver
    pub if_dropped: u32,
}

struct PcapT(NonNull<raw::pcap_t>);

// The owner of a `pcap_t *` may move between threads. Sharing is only sound through
// `pcap_breakloop`, which is what `Breaker` does.
unsafe impl Send for PcapT {}

impl Drop for PcapT {
    fn drop(&mut self) {
        unsafe { raw::pcap_close(self.0.as_ptr()) }
    }
}

/// An activated capture handle. `pcap_close` runs when it is dropped.
pub struct Handle {
    pcap: Arc<PcapT>,
}

unsafe impl Send for Handle {}

#[allow(clippy::arc_with_non_send_sync)]
impl From<NonNull<raw::pcap_t>> for Handle {
    fn from(pcap: NonNull<raw::pcap_t>) -> Self {
        Handle {
            pcap: Arc::new(PcapT(pcap)),
        }
    }
}

impl Handle {
    /// Creates, configures and activates a handle on `interface`.
    ///
    /// Activation warnings, such as an interface that cannot go promiscuous, are logged and the
    /// handle is returned anyway. Only activation errors fail.
    pub fn open_live(interface: &str, params: &CaptureParams) -> Result<Handle, Error> {
        let name = CString::new(interface)?;
        let handle = Error::with_errbuf(|errbuf| unsafe {
            Handle::checked(raw::pcap_create(name.as_ptr(), errbuf), errbuf)
        })?;

        let pcap = handle.as_ptr();
        unsafe {
            raw::pcap_set_snaplen(pcap, params.snaplen);
            raw::pcap_set_promisc(pcap, params.promiscuous as c_int);
            raw::pcap_set_timeout(pcap, params.timeout_ms);
        }
        handle.set_immediate(params.immediate);

        match unsafe { raw::pcap_activate(pcap) } {
            0 => {}
            status if status > 0 => warn!(
                interface,
                status,
                warning = %handle.status_message(status),
                "interface activated with a warning"
            ),
            status => return Err(Error::PcapError(handle.status_message(status))),
        }
        Ok(handle)
    }

    /// Opens a pcap savefile for replay.
    pub fn open_offline<P: AsRef<Path>>(path: P) -> Result<Handle, Error> {
        let path = CString::new(path.as_ref().to_str().ok_or(Error::InvalidString)?)?;
        Error::with_errbuf(|errbuf| unsafe {
            Handle::checked(raw::pcap_open_offline(path.as_ptr(), errbuf), errbuf)
        })
    }

    unsafe fn checked(pcap: *mut raw::pcap_t, errbuf: *mut libc::c_char) -> Result<Handle, Error> {
        NonNull::new(pcap)
            .map(Handle::from)
            .ok_or_else(|| Error::new(errbuf))
    }

    #[cfg(libpcap_1_5_0)]
    fn set_immediate(&self, on: bool) {
        unsafe { raw::pcap_set_immediate_mode(self.as_ptr(), on as c_int) };
    }

    #[cfg(not(libpcap_1_5_0))]
    fn set_immediate(&self, on: bool) {
        if on {
            warn!("immediate mode needs libpcap 1.5.0 or newer, ignoring");
        }
    }

    fn as_ptr(&self) -> *mut raw::pcap_t {
        self.pcap.0.as_ptr()
    }

    fn last_error(&self) -> Error {
        unsafe { Error::new(raw::pcap_geterr(self.as_ptr())) }
    }

    /// The handle's own message for `status` if it left one, libpcap's generic text otherwise.
    fn status_message(&self, status: c_int) -> String {
        let detail = unsafe { cstr_to_string(raw::pcap_geterr(self.as_ptr())) }
            .ok()
            .flatten()
            .filter(|message| !message.is_empty());
        detail
            .or_else(|| unsafe { cstr_to_string(raw::pcap_statustostr(status)) }.ok().flatten())
            .unwrap_or_else(|| format!("libpcap status {status}"))
    }

    pub fn datalink(&self) -> Linktype {
        Linktype(unsafe { raw::pcap_datalink(self.as_ptr()) })
    }

    /// Reads the next packet.
    ///
    /// A live read that times out with nothing captured returns [`Error::TimeoutExpired`]. An
    /// exhausted savefile or a [`Breaker::break_loop`] returns [`Error::NoMorePackets`].
    pub fn next_packet(&mut self) -> Result<Packet<'_>, Error> {
        let mut header: *mut raw::pcap_pkthdr = ptr::null_mut();
        let mut data: *const libc::c_uchar = ptr::null();

        match unsafe { raw::pcap_next_ex(self.as_ptr(), &mut header, &mut data) } {
            status if status > 0 => unsafe {
                let header = &*header;
                Ok(Packet {
                    header,
                    data: slice::from_raw_parts(data, header.caplen as usize),
                })
            },
            0 => Err(Error::TimeoutExpired),
            raw::PCAP_ERROR_BREAK => Err(Error::NoMorePackets),
            _ => Err(self.last_error()),
        }
    }

    /// Counters since activation. Savefiles have none and return an error.
    pub fn stats(&mut self) -> Result<Stat, Error> {
        let mut stat = raw::pcap_stat {
            ps_recv: 0,
            ps_drop: 0,
            ps_ifdrop: 0,
            #[cfg(windows)]
            bs_capt: 0,
        };
        if unsafe { raw::pcap_stats(self.as_ptr(), &mut stat) } != 0 {
            return Err(self.last_error());
        }
        Ok(Stat {
            received: stat.ps_recv,
            dropped: stat.ps_drop,
            if_dropped: stat.ps_ifdrop,
        })
    }

    pub fn breaker(&self) -> Breaker {
        Breaker {
            pcap: Arc::downgrade(&self.pcap),
        }
    }
}

/// A packet in libpcap's buffer, valid until the next read on the same handle.
#[derive(Clone, Copy)]
pub struct Packet<'a> {
    header: &'a raw::pcap_pkthdr,
    data: &'a [u8],
}

impl<'a> Packet<'a> {
    /// Capture time. Out-of-range values fall back to the Unix epoch.
    pub fn timestamp(&self) -> DateTime<Utc> {
        let ts = self.header.ts;
        DateTime::from_timestamp(ts.tv_sec as i64, (ts.tv_usec as u32).saturating_mul(1000))
            .unwrap_or_default()
    }

    /// Length on the wire, which exceeds `data().len()` when the frame was cut at the snaplen.
    pub fn wire_len(&self) -> u32 {
        self.header.len
    }

    pub fn data(&self) -> &'a [u8] {
        self.data
    }
}

/// Makes a blocked [`Handle::next_packet`] return from any thread, e.g. a signal handler.
///
/// Does nothing once the handle is gone.
#[derive(Clone)]
pub struct Breaker {
    pcap: Weak<PcapT>,
}

unsafe impl Send for Breaker {}
unsafe impl Sync for Breaker {}

impl Breaker {
    pub fn break_loop(&self) {
        if let Some(pcap) = self.pcap.upgrade() {
            unsafe { raw::pcap_breakloop(pcap.0.as_ptr()) };
        }
    }
}

// GRCOV_EXCL_STOP
