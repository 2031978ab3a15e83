use std::{ffi::CString, path::Path, ptr::NonNull};

use super::{Handle, Packet};
use crate::{raw, Error};

/// A pcap savefile being written with the link type and snaplen of the handle that opened it.
/// Closed when dropped.
pub struct Dumper {
    dumper: NonNull<raw::pcap_dumper_t>,
}

// Owned like the handle itself: movable, never shared.
unsafe impl Send for Dumper {}

impl Handle {
    /// Creates (or truncates) the savefile at `path`.
    pub fn dump_to<P: AsRef<Path>>(&self, path: P) -> Result<Dumper, Error> {
        let path = CString::new(path.as_ref().to_str().ok_or(Error::InvalidString)?)?;
        let dumper = unsafe { raw::pcap_dump_open(self.as_ptr(), path.as_ptr()) };
        NonNull::new(dumper)
            .map(|dumper| Dumper { dumper })
            .ok_or_else(|| self.last_error())
    }
}

impl Dumper {
    /// Appends `packet` with its original header. Buffered until [`Dumper::flush`] or drop.
    pub fn write(&mut self, packet: &Packet<'_>) {
        unsafe {
            raw::pcap_dump(
                self.dumper.as_ptr().cast(),
                packet.header,
                packet.data.as_ptr(),
            )
        }
    }

    pub fn flush(&mut self) -> Result<(), Error> {
        if unsafe { raw::pcap_dump_flush(self.dumper.as_ptr()) } != 0 {
            return Err(Error::ErrnoError(errno::errno()));
        }
        Ok(())
    }
}

impl Drop for Dumper {
    fn drop(&mut self) {
        unsafe { raw::pcap_dump_close(self.dumper.as_ptr()) }
    }
}
