use std::path::PathBuf;

use clap::Parser;

use pktsniff::config::Config;

/// pktsniff: print a one-line summary of every UDP and TCP packet seen on an interface
#[derive(Parser, Debug)]
#[command(name = "pktsniff", version, about)]
pub struct Cli {
    /// Interface to capture on. Without it the available interfaces are listed and one is
    /// picked interactively.
    #[arg(short, long, value_name = "NAME")]
    pub interface: Option<String>,

    /// BPF filter expression [default: "ip and udp"]. An empty string captures everything.
    #[arg(short, long, value_name = "EXPR")]
    pub filter: Option<String>,

    /// Stop after this many reported packets (0 = unlimited)
    #[arg(short = 'c', long, value_name = "N")]
    pub count: Option<u64>,

    /// Maximum bytes captured per frame [default: 65536]
    #[arg(short, long, value_name = "BYTES", value_parser = clap::value_parser!(i32).range(0..))]
    pub snaplen: Option<i32>,

    /// Read timeout of the capture handle in milliseconds [default: 1000]
    #[arg(short = 't', long, value_name = "MS", value_parser = clap::value_parser!(i32).range(0..))]
    pub timeout_ms: Option<i32>,

    /// Leave the interface out of promiscuous mode
    #[arg(long)]
    pub no_promisc: bool,

    /// Deliver packets as soon as they arrive (libpcap 1.5.0 or newer)
    #[arg(long)]
    pub immediate: bool,

    /// Replay a pcap file instead of capturing live
    #[arg(short, long, value_name = "FILE", conflicts_with = "interface")]
    pub read: Option<PathBuf>,

    /// Also write every captured frame to a pcap file
    #[arg(short, long, value_name = "FILE")]
    pub write: Option<PathBuf>,

    /// Print timestamps in UTC instead of local time
    #[arg(long)]
    pub utc: bool,

    /// TOML configuration file; command line flags take precedence
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// List available network interfaces and exit
    #[arg(short, long)]
    pub list_interfaces: bool,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Overrides `config` with every flag given on the command line.
    pub fn apply(&self, config: &mut Config) {
        if let Some(interface) = &self.interface {
            config.capture.interface = Some(interface.clone());
        }
        if let Some(filter) = &self.filter {
            config.capture.filter = filter.clone();
        }
        if let Some(count) = self.count {
            config.run.count = count;
        }
        if let Some(snaplen) = self.snaplen {
            config.capture.snaplen = snaplen;
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.capture.timeout_ms = timeout_ms;
        }
        if self.no_promisc {
            config.capture.promiscuous = false;
        }
        if self.immediate {
            config.capture.immediate = true;
        }
        if let Some(path) = &self.write {
            config.output.write_pcap = Some(path.clone());
        }
        if self.utc {
            config.output.utc = true;
        }
    }
}
