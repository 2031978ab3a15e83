use std::{
    io::Write,
    process::{Command, Output},
};

use pktsniff::Linktype;

use crate::{mixed_traffic, savefile, udp_frame, LINKTYPE_RAW};

fn pktsniff(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_pktsniff"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run pktsniff")
}

fn stdout(output: &Output) -> String {
    String::from_utf8(output.stdout.clone()).unwrap()
}

fn stderr(output: &Output) -> String {
    String::from_utf8(output.stderr.clone()).unwrap()
}

/// Exit status 1, nothing on stdout and a single `error:` line on stderr.
fn assert_fails_once(output: &Output) -> String {
    let stderr = stderr(output);
    assert_eq!(output.status.code(), Some(1), "{stderr}");
    assert!(output.stdout.is_empty());
    assert_eq!(stderr.lines().count(), 1, "{stderr}");
    assert!(stderr.starts_with("error: "), "{stderr}");
    stderr
}

#[test]
fn replay_with_default_filter() {
    let file = mixed_traffic();
    let path = file.path().to_str().unwrap();

    let output = pktsniff(&["-r", path, "--utc"]);

    assert!(output.status.success(), "{}", stderr(&output));
    assert_eq!(
        stdout(&output),
        "22:13:20 14-11-2023 UDP 10.0.0.1:53 -> 10.0.0.2:12345 8\n\
         22:13:23 14-11-2023 UDP 10.0.0.1:5353 -> 10.0.0.2:5353 20\n"
    );
    assert_eq!(
        stderr(&output),
        format!("Reading {path}...\n2 frames, 2 reported, 0 skipped, 0 malformed\n")
    );
}

#[test]
fn replay_unfiltered_with_count() {
    let file = mixed_traffic();
    let path = file.path().to_str().unwrap();

    let output = pktsniff(&["-r", path, "--utc", "-f", "", "-c", "2"]);

    assert!(output.status.success(), "{}", stderr(&output));
    assert_eq!(
        stdout(&output),
        "22:13:20 14-11-2023 UDP 10.0.0.1:53 -> 10.0.0.2:12345 8\n\
         22:13:21 14-11-2023 TCP 192.168.1.10:443 -> 192.168.1.20:50000 5\n"
    );
    let stderr = stderr(&output);
    assert_eq!(stderr.lines().count(), 2, "{stderr}");
    assert!(stderr.ends_with("2 frames, 2 reported, 0 skipped, 0 malformed\n"));
}

#[test]
fn raw_ip_file_is_rejected() {
    let file = savefile(LINKTYPE_RAW, &[udp_frame(53, 12345, &[])[14..].to_vec()]);

    let stderr = assert_fails_once(&pktsniff(&["-r", file.path().to_str().unwrap()]));
    assert!(stderr.contains("only Ethernet is supported"), "{stderr}");
}

#[test]
fn missing_file() {
    let stderr = assert_fails_once(&pktsniff(&["-r", "/nonexistent/capture.pcap"]));
    assert!(stderr.contains("unable to read capture file"), "{stderr}");
}

#[test]
fn bad_filter() {
    let file = savefile(Linktype::ETHERNET, &[udp_frame(53, 12345, &[])]);

    let stderr = assert_fails_once(&pktsniff(&[
        "-r",
        file.path().to_str().unwrap(),
        "-f",
        "ip and and",
    ]));
    assert!(stderr.contains("`ip and and`"), "{stderr}");
}

#[test]
fn bad_config() {
    let file = savefile(Linktype::ETHERNET, &[udp_frame(53, 12345, &[])]);
    let mut config = tempfile::NamedTempFile::new().unwrap();
    writeln!(config, "[capture\nsnaplen = 1").unwrap();

    let stderr = assert_fails_once(&pktsniff(&[
        "-r",
        file.path().to_str().unwrap(),
        "--config",
        config.path().to_str().unwrap(),
    ]));
    assert!(stderr.contains("invalid config file"), "{stderr}");
}

#[test]
fn listing_ignores_config() {
    // Whether any interface can be listed depends on the host; a config error never can.
    let output = pktsniff(&["-l", "--config", "/nonexistent/pktsniff.toml"]);
    assert!(!stderr(&output).contains("config"), "{}", stderr(&output));
}
