use pktsniff::{
    source::{CaptureSource, NextFrame},
    Error, Handle, Linktype,
};

use crate::{arp_frame, savefile, udp_frame, FIRST_TS};

#[test]
fn offline_next_packet() {
    let file = savefile(Linktype::ETHERNET, &[udp_frame(53, 12345, b"abc")]);
    let mut handle = Handle::open_offline(file.path()).unwrap();

    assert_eq!(handle.datalink(), Linktype::ETHERNET);

    let packet = handle.next_packet().unwrap();
    assert_eq!(packet.timestamp().timestamp(), FIRST_TS as i64);
    assert_eq!(packet.wire_len(), 45);
    assert_eq!(packet.data().len(), 45);

    assert_eq!(handle.next_packet().err(), Some(Error::NoMorePackets));
    // Savefiles keep no counters.
    assert!(handle.stats().is_err());
}

#[test]
fn offline_filter_syntax_error() {
    let file = savefile(Linktype::ETHERNET, &[]);
    let mut handle = Handle::open_offline(file.path()).unwrap();

    assert!(matches!(
        handle.set_filter("ip and and", true),
        Err(Error::PcapError(_))
    ));
    assert_eq!(handle.set_filter("ip and udp", true), Ok(()));
}

#[test]
fn linktype_names() {
    assert_eq!(Linktype::ETHERNET.get_name().unwrap(), "EN10MB");
    assert!(Linktype::ETHERNET.describe().starts_with("EN10MB ("));
}

#[test]
fn lib_version() {
    assert!(pktsniff::lib_version().unwrap().contains("libpcap"));
}

#[test]
fn savefile_round_trip() {
    let input = savefile(
        Linktype::ETHERNET,
        &[udp_frame(53, 12345, &[]), arp_frame(), udp_frame(53, 40000, &[])],
    );
    let output = tempfile::Builder::new()
        .suffix(".pcap")
        .tempfile()
        .unwrap();

    let mut source = CaptureSource::open_file(input.path()).unwrap();
    source.install_filter("udp").unwrap();
    source.save_to(output.path()).unwrap();

    let mut first = Vec::new();
    while let NextFrame::Frame(frame) = source.next_frame().unwrap() {
        first.push(frame);
    }
    source.flush().unwrap();
    drop(source);

    assert_eq!(first.len(), 2);

    let replayed: Vec<_> = CaptureSource::open_file(output.path())
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(replayed, first);
}
