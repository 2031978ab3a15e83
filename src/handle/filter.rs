use std::{
    ffi::{CStr, CString},
    ptr,
};

use libc::c_int;

use super::Handle;
use crate::{raw, Error};

/// A compiled BPF program. `pcap_freecode` runs on drop, after libpcap has copied it into the
/// handle.
struct Program(raw::bpf_program);

impl Program {
    fn compile(handle: &Handle, expression: &CStr, optimize: bool) -> Result<Program, Error> {
        let mut program = raw::bpf_program {
            bf_len: 0,
            bf_insns: ptr::null_mut(),
        };
        // No netmask is known up front, so only `ip broadcast` is unavailable.
        let status = unsafe {
            raw::pcap_compile(
                handle.as_ptr(),
                &mut program,
                expression.as_ptr(),
                optimize as c_int,
                raw::PCAP_NETMASK_UNKNOWN,
            )
        };
        if status != 0 {
            return Err(handle.last_error());
        }
        Ok(Program(program))
    }
}

impl Drop for Program {
    fn drop(&mut self) {
        unsafe { raw::pcap_freecode(&mut self.0) }
    }
}

impl Handle {
    /// Compiles a BPF `expression` (tcpdump syntax) and attaches it to the handle, replacing any
    /// earlier filter. Compilation errors carry libpcap's message.
    pub fn set_filter(&mut self, expression: &str, optimize: bool) -> Result<(), Error> {
        let expression = CString::new(expression)?;
        let mut program = Program::compile(self, &expression, optimize)?;

        if unsafe { raw::pcap_setfilter(self.as_ptr(), &mut program.0) } != 0 {
            return Err(self.last_error());
        }
        Ok(())
    }
}
