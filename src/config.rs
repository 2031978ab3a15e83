use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer};
use thiserror::Error;

use crate::{pipeline::RunOptions, report::Clock, source::CaptureParams};

/// The capture filter used when none is configured.
pub const DEFAULT_FILTER: &str = "ip and udp";

fn empty_path_none<'de, D>(deserializer: D) -> Result<Option<PathBuf>, D::Error>
where
    D: Deserializer<'de>,
{
    let path = Option::<PathBuf>::deserialize(deserializer)?;
    Ok(path.filter(|path| !path.as_os_str().is_empty()))
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to read config file {}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// `message` is flattened to one line; toml's own rendering quotes the offending source.
    #[error("invalid config file {}, line {line}: {message}", path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },
}

impl ConfigError {
    fn parse(path: &Path, raw: &str, err: toml::de::Error) -> Self {
        let line = err
            .span()
            .and_then(|span| raw.get(..span.start))
            .map_or(1, |before| before.matches('\n').count() + 1);
        let message = err
            .message()
            .lines()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(", ");
        ConfigError::Parse {
            path: path.to_path_buf(),
            line,
            message,
        }
    }
}

/// Settings read from a TOML file. Every key is optional.
///
/// ```toml
/// [capture]
/// interface = "eth0"
/// filter = "ip and (udp or tcp)"
///
/// [output]
/// utc = true
///
/// [run]
/// count = 100
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub capture: CaptureConfig,
    pub output: OutputConfig,
    pub run: RunConfig,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|err| ConfigError::parse(path, &raw, err))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub interface: Option<String>,
    /// An empty string installs no filter at all
    pub filter: String,
    pub snaplen: i32,
    pub promiscuous: bool,
    pub timeout_ms: i32,
    pub immediate: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        let params = CaptureParams::default();
        CaptureConfig {
            interface: None,
            filter: DEFAULT_FILTER.to_string(),
            snaplen: params.snaplen,
            promiscuous: params.promiscuous,
            timeout_ms: params.timeout_ms,
            immediate: params.immediate,
        }
    }
}

impl CaptureConfig {
    pub fn params(&self) -> CaptureParams {
        CaptureParams {
            snaplen: self.snaplen,
            promiscuous: self.promiscuous,
            timeout_ms: self.timeout_ms,
            immediate: self.immediate,
        }
    }

    /// The filter to install, or `None` when filtering is disabled.
    pub fn filter(&self) -> Option<&str> {
        let filter = self.filter.trim();
        (!filter.is_empty()).then_some(filter)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub utc: bool,
    #[serde(deserialize_with = "empty_path_none")]
    pub write_pcap: Option<PathBuf>,
}

impl OutputConfig {
    pub fn clock(&self) -> Clock {
        Clock::from_utc(self.utc)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// 0 means unlimited
    pub count: u64,
}

impl RunConfig {
    pub fn options(&self) -> RunOptions {
        RunOptions { count: self.count }
    }
}
