#![allow(dead_code)]
#![allow(non_camel_case_types)]

use libc::{c_char, c_int, c_uchar, c_uint, c_ushort, c_void, timeval};

#[cfg(test)]
use mockall::automock;

pub const PCAP_ERRBUF_SIZE: usize = 256;

/// `pcap_next_ex`: the savefile is exhausted or `pcap_breakloop` was called.
pub const PCAP_ERROR_BREAK: c_int = -2;

pub const PCAP_NETMASK_UNKNOWN: c_uint = 0xffff_ffff;

#[repr(C)]
pub struct bpf_program {
    pub bf_len: c_uint,
    pub bf_insns: *mut bpf_insn,
}

#[repr(C)]
pub struct bpf_insn {
    pub code: c_ushort,
    pub jt: c_uchar,
    pub jf: c_uchar,
    pub k: c_uint,
}

pub enum pcap_t {}

pub enum pcap_dumper_t {}

// Addresses are never read, only the pointer width matters.
#[repr(C)]
pub struct pcap_if_t {
    pub next: *mut pcap_if_t,
    pub name: *mut c_char,
    pub description: *mut c_char,
    pub addresses: *mut c_void,
    pub flags: c_uint,
}

#[repr(C)]
#[derive(Copy, Clone)]
pub struct pcap_pkthdr {
    pub ts: timeval,
    pub caplen: c_uint,
    pub len: c_uint,
}

#[repr(C)]
pub struct pcap_stat {
    pub ps_recv: c_uint,
    pub ps_drop: c_uint,
    pub ps_ifdrop: c_uint,
    #[cfg(windows)]
    pub bs_capt: c_uint,
}

// Linked by build.rs (pcap or wpcap).
#[cfg_attr(test, automock)]
pub mod ffi {
    use super::*;

    extern "C" {
        pub fn pcap_lib_version() -> *const c_char;
        pub fn pcap_statustostr(arg1: c_int) -> *const c_char;
        pub fn pcap_findalldevs(arg1: *mut *mut pcap_if_t, arg2: *mut c_char) -> c_int;
        pub fn pcap_freealldevs(arg1: *mut pcap_if_t);

        pub fn pcap_create(arg1: *const c_char, arg2: *mut c_char) -> *mut pcap_t;
        pub fn pcap_set_snaplen(arg1: *mut pcap_t, arg2: c_int) -> c_int;
        pub fn pcap_set_promisc(arg1: *mut pcap_t, arg2: c_int) -> c_int;
        pub fn pcap_set_timeout(arg1: *mut pcap_t, arg2: c_int) -> c_int;
        pub fn pcap_activate(arg1: *mut pcap_t) -> c_int;
        pub fn pcap_open_offline(arg1: *const c_char, arg2: *mut c_char) -> *mut pcap_t;
        pub fn pcap_close(arg1: *mut pcap_t);
        pub fn pcap_geterr(arg1: *mut pcap_t) -> *mut c_char;

        pub fn pcap_datalink(arg1: *mut pcap_t) -> c_int;
        pub fn pcap_datalink_val_to_name(arg1: c_int) -> *const c_char;
        pub fn pcap_datalink_val_to_description(arg1: c_int) -> *const c_char;

        pub fn pcap_compile(
            arg1: *mut pcap_t,
            arg2: *mut bpf_program,
            arg3: *const c_char,
            arg4: c_int,
            arg5: c_uint,
        ) -> c_int;
        pub fn pcap_setfilter(arg1: *mut pcap_t, arg2: *mut bpf_program) -> c_int;
        pub fn pcap_freecode(arg1: *mut bpf_program);

        pub fn pcap_next_ex(
            arg1: *mut pcap_t,
            arg2: *mut *mut pcap_pkthdr,
            arg3: *mut *const c_uchar,
        ) -> c_int;
        pub fn pcap_breakloop(arg1: *mut pcap_t);
        pub fn pcap_stats(arg1: *mut pcap_t, arg2: *mut pcap_stat) -> c_int;

        pub fn pcap_dump_open(arg1: *mut pcap_t, arg2: *const c_char) -> *mut pcap_dumper_t;
        pub fn pcap_dump(arg1: *mut c_uchar, arg2: *const pcap_pkthdr, arg3: *const c_uchar);
        pub fn pcap_dump_flush(arg1: *mut pcap_dumper_t) -> c_int;
        pub fn pcap_dump_close(arg1: *mut pcap_dumper_t);
    }
}

#[cfg(not(test))]
pub use ffi::*;

#[cfg(test)]
pub use mock_ffi::*;

#[cfg(libpcap_1_5_0)]
#[cfg_attr(test, automock)]
pub mod ffi_1_5 {
    use super::*;

    extern "C" {
        pub fn pcap_set_immediate_mode(arg1: *mut pcap_t, arg2: c_int) -> c_int;
    }
}

#[cfg(all(libpcap_1_5_0, not(test)))]
pub use ffi_1_5::*;

#[cfg(all(libpcap_1_5_0, test))]
pub use mock_ffi_1_5::*;

// GRCOV_EXCL_STOP
