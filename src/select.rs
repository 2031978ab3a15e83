//! Interactive interface picker.

use std::io::{self, BufRead, Write};

use thiserror::Error;
use tracing::debug;

use crate::{device::Device, Error};

#[derive(Debug, Error)]
pub enum SelectError {
    #[error("unable to list interfaces")]
    Device(#[from] Error),
    #[error("no interfaces found, make sure libpcap is installed and you have capture privileges")]
    NoDevices,
    #[error("no interface selected, input ended")]
    EndOfInput,
    #[error("terminal i/o failed")]
    Io(#[from] io::Error),
}

/// Prints `N. name (description)` for every device, numbered from 1.
pub fn print_devices<W: Write>(out: &mut W, devices: &[Device]) -> io::Result<()> {
    for (i, device) in devices.iter().enumerate() {
        writeln!(out, "{}. {}", i + 1, device)?;
    }
    Ok(())
}

/// Prompts until a number between 1 and `count` is entered and returns its 0-based index.
pub fn prompt_index<R, W>(input: &mut R, out: &mut W, count: usize) -> Result<usize, SelectError>
where
    R: BufRead,
    W: Write,
{
    let mut line = String::new();
    loop {
        write!(out, "Enter the interface number (1-{count}): ")?;
        out.flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            return Err(SelectError::EndOfInput);
        }

        match line.trim().parse::<usize>() {
            Ok(n) if (1..=count).contains(&n) => return Ok(n - 1),
            _ => {
                debug!(input = line.trim(), "invalid interface number");
                writeln!(out, "Invalid interface number.")?;
            }
        }
    }
}

/// Lists `devices` on `out` and lets the operator pick one from `input`.
pub fn choose_device<R, W>(
    devices: Vec<Device>,
    input: &mut R,
    out: &mut W,
) -> Result<Device, SelectError>
where
    R: BufRead,
    W: Write,
{
    if devices.is_empty() {
        return Err(SelectError::NoDevices);
    }

    print_devices(out, &devices)?;
    let index = prompt_index(input, out, devices.len())?;
    devices
        .into_iter()
        .nth(index)
        .ok_or(SelectError::NoDevices)
}

/// Enumerates interfaces with libpcap and runs the picker on stdin, printing to stderr.
pub fn choose_interactively() -> Result<Device, SelectError> {
    let devices = Device::list()?;
    let stdin = io::stdin();
    choose_device(devices, &mut stdin.lock(), &mut io::stderr())
}
