use std::env;
use std::ffi::CStr;
use std::os::raw::c_char;
use std::path::PathBuf;

use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Version {
    major: usize,
    minor: usize,
    micro: usize,
}

impl Version {
    const IMMEDIATE_MODE: Version = Version {
        major: 1,
        minor: 5,
        micro: 0,
    };

    fn parse(s: &str) -> Option<Version> {
        let re = Regex::new(r"(\d+)\.(\d+)(?:\.(\d+))?").ok()?;
        let caps = re.captures(s)?;
        Some(Version {
            major: caps[1].parse().ok()?,
            minor: caps[2].parse().ok()?,
            micro: match caps.get(3) {
                Some(m) => m.as_str().parse().ok()?,
                None => 0,
            },
        })
    }
}

fn from_env() -> Option<Version> {
    env::var("PCAP_VER").ok().and_then(|v| Version::parse(&v))
}

fn from_pkg_config() -> Option<Version> {
    let lib = pkg_config::Config::new()
        .cargo_metadata(false)
        .probe("libpcap")
        .ok()?;
    Version::parse(&lib.version)
}

fn library_candidates() -> Vec<PathBuf> {
    let names: &[&str] = match env::var("CARGO_CFG_TARGET_OS").as_deref() {
        Ok("windows") => &["wpcap.dll"],
        Ok("macos") => &["libpcap.dylib", "libpcap.A.dylib"],
        _ => &["libpcap.so", "libpcap.so.1", "libpcap.so.0.8"],
    };

    let mut candidates = Vec::new();
    if let Ok(libdir) = env::var("PCAP_LIBDIR") {
        candidates.extend(names.iter().map(|name| PathBuf::from(&libdir).join(name)));
    }
    candidates.extend(names.iter().map(PathBuf::from));
    candidates
}

fn from_library() -> Option<Version> {
    library_candidates().into_iter().find_map(|path| unsafe {
        let lib = libloading::Library::new(&path).ok()?;
        let lib_version: libloading::Symbol<unsafe extern "C" fn() -> *const c_char> =
            lib.get(b"pcap_lib_version\0").ok()?;
        let raw = lib_version();
        if raw.is_null() {
            return None;
        }
        Version::parse(&CStr::from_ptr(raw).to_string_lossy())
    })
}

fn main() {
    println!("cargo:rerun-if-env-changed=PCAP_LIBDIR");
    println!("cargo:rerun-if-env-changed=PCAP_VER");
    println!("cargo:rustc-check-cfg=cfg(libpcap_1_5_0)");

    if let Ok(libdir) = env::var("PCAP_LIBDIR") {
        println!("cargo:rustc-link-search={}", libdir);
    }
    match env::var("CARGO_CFG_TARGET_OS").as_deref() {
        Ok("windows") => println!("cargo:rustc-link-lib=wpcap"),
        _ => println!("cargo:rustc-link-lib=pcap"),
    }

    match from_env().or_else(from_pkg_config).or_else(from_library) {
        Some(version) => {
            if version >= Version::IMMEDIATE_MODE {
                println!("cargo:rustc-cfg=libpcap_1_5_0");
            }
        }
        None => println!("cargo:warning=could not detect libpcap version, set PCAP_VER"),
    }
}
