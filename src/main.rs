mod cli;

use std::{io, process};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use pktsniff::{
    config::Config,
    device::Device,
    pipeline,
    report::Reporter,
    select::{self, SelectError},
    source::CaptureSource,
};

fn main() {
    let args = cli::Cli::parse();
    init_tracing(args.verbose);

    if let Err(err) = run(&args) {
        eprintln!("error: {err:#}");
        process::exit(1);
    }
}

/// `RUST_LOG` wins over `-v`.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn load_config(args: &cli::Cli) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    args.apply(&mut config);
    debug!(?config, "configuration loaded");
    Ok(config)
}

fn list_interfaces() -> Result<()> {
    let devices = Device::list().context("unable to list interfaces")?;
    if devices.is_empty() {
        return Err(SelectError::NoDevices.into());
    }
    select::print_devices(&mut io::stdout().lock(), &devices)?;
    Ok(())
}

/// Opens the capture source and returns it with the banner to show once capture starts.
fn open_source(args: &cli::Cli, config: &Config) -> Result<(CaptureSource, String)> {
    if let Some(path) = &args.read {
        let source = CaptureSource::open_file(path)?;
        return Ok((source, format!("Reading {}...", path.display())));
    }

    let device = match &config.capture.interface {
        Some(name) => Device::from(name.as_str()),
        None => select::choose_interactively()?,
    };
    let source = CaptureSource::open(&device.name, &config.capture.params())?;
    Ok((source, format!("Listening on {}...", device.label())))
}

fn run(args: &cli::Cli) -> Result<()> {
    match pktsniff::lib_version() {
        Ok(version) => debug!(%version, "libpcap loaded"),
        Err(err) => debug!(error = %err, "libpcap version unknown"),
    }

    // Listing ignores the config file.
    if args.list_interfaces {
        return list_interfaces();
    }

    let config = load_config(args)?;

    let (mut source, banner) = open_source(args, &config)?;
    if let Some(filter) = config.capture.filter() {
        source.install_filter(filter)?;
    }
    if let Some(path) = &config.output.write_pcap {
        source.save_to(path)?;
    }

    let stop = source.stop_handle();
    ctrlc::set_handler(move || stop.stop()).context("unable to install the Ctrl-C handler")?;

    eprintln!("{banner}");
    info!(source = source.label(), "capture started");

    let mut reporter = Reporter::new(io::stdout().lock(), config.output.clock());
    let result = pipeline::run(&mut source, &mut reporter, &config.run.options());

    if let Err(err) = source.flush() {
        warn!(error = %err, "savefile flush failed");
    }
    let stats = result?;

    eprintln!("{stats}");
    match source.stats() {
        Ok(pcap) => eprintln!(
            "{} packets received by filter, {} dropped by kernel, {} dropped by interface",
            pcap.received, pcap.dropped, pcap.if_dropped
        ),
        Err(err) if args.read.is_none() => warn!(error = %err, "capture statistics unavailable"),
        Err(_) => {}
    }

    Ok(())
}
