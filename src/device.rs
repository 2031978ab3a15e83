use std::{fmt, ptr};

use crate::{cstr_to_string, raw, Error};

/// Placeholder shown for interfaces that libpcap reports without a description.
pub const NO_DESCRIPTION: &str = "(No description available)";

/// A capture interface as enumerated by libpcap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    /// The name handed to `pcap_create`, e.g. `eth0` or `\Device\NPF_{...}`
    pub name: String,
    /// Human readable description, mostly present on Windows
    pub desc: Option<String>,
}

impl Device {
    /// Every interface libpcap can open, in the order libpcap reports them.
    pub fn list() -> Result<Vec<Device>, Error> {
        let all = Error::with_errbuf(|errbuf| unsafe {
            let mut all: *mut raw::pcap_if_t = ptr::null_mut();
            if raw::pcap_findalldevs(&mut all, errbuf) != 0 {
                return Err(Error::new(errbuf));
            }
            Ok(all)
        })?;

        let devices = unsafe { Device::collect(all) };
        unsafe { raw::pcap_freealldevs(all) };
        devices
    }

    unsafe fn collect(mut next: *const raw::pcap_if_t) -> Result<Vec<Device>, Error> {
        let mut devices = Vec::new();
        while let Some(dev) = next.as_ref() {
            devices.push(Device {
                name: cstr_to_string(dev.name)?.ok_or(Error::InvalidString)?,
                desc: cstr_to_string(dev.description)?.filter(|desc| !desc.is_empty()),
            });
            next = dev.next;
        }
        Ok(devices)
    }

    /// The description when libpcap has one, otherwise the interface name.
    pub fn label(&self) -> &str {
        self.desc.as_deref().unwrap_or(&self.name)
    }
}

/// `name (description)`, as printed in the interface menu.
impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({})",
            self.name,
            self.desc.as_deref().unwrap_or(NO_DESCRIPTION)
        )
    }
}

impl From<&str> for Device {
    fn from(name: &str) -> Self {
        Device {
            name: name.into(),
            desc: None,
        }
    }
}
