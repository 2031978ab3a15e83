use std::fmt;

use crate::{cstr_to_string, raw, Error};

/// This is a datalink link type.
///
/// As an example, `Linktype(1)` is ethernet. A full list of linktypes is available
/// [here](http://www.tcpdump.org/linktypes.html).
/// ```rust
/// use pktsniff::Linktype;
///
/// let lt = Linktype(1);
/// assert_eq!(Linktype::ETHERNET, lt);
/// ```
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Linktype(pub i32);

impl Linktype {
    /// Gets the name of the link type, such as EN10MB
    pub fn get_name(&self) -> Result<String, Error> {
        unsafe { cstr_to_string(raw::pcap_datalink_val_to_name(self.0)) }?
            .ok_or(Error::InvalidLinktype)
    }

    /// Gets the description of a link type.
    pub fn get_description(&self) -> Result<String, Error> {
        unsafe { cstr_to_string(raw::pcap_datalink_val_to_description(self.0)) }?
            .ok_or(Error::InvalidLinktype)
    }

    /// Name and description as libpcap knows them, falling back to the DLT number.
    pub fn describe(&self) -> String {
        match (self.get_name(), self.get_description()) {
            (Ok(name), Ok(desc)) => format!("{} ({})", name, desc),
            (Ok(name), Err(_)) => name,
            _ => self.to_string(),
        }
    }

    /// DLT_EN10MB, the only framing the dissector understands
    pub const ETHERNET: Self = Self(1);
}

impl fmt::Display for Linktype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DLT {}", self.0)
    }
}
