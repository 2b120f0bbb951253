//! Connection descriptors.
//!
//! A descriptor is a URL-like string of the form
//! `[tcp|udp]://[host][:port][/tag.prefix]` naming the Fluentd endpoint and
//! the tag prefix shared by every topic opened through it.

use pubsub_core::{PubsubError, PubsubResult};
use std::fmt;
use std::time::Duration;
use url::{Host, ParseError, Url};

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 24224;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

/// Transport used to reach Fluentd
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Network {
    #[default]
    Tcp,
    Udp,
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Tcp => f.write_str("tcp"),
            Network::Udp => f.write_str("udp"),
        }
    }
}

/// Where and how to connect to Fluentd
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FluentConfig {
    pub network: Network,
    pub host: String,
    pub port: u16,
    /// Connect timeout
    pub timeout: Duration,
    /// Timeout for writing one record
    pub write_timeout: Duration,
}

impl FluentConfig {
    pub fn new(network: Network, host: impl Into<String>, port: u16) -> Self {
        Self {
            network,
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    /// `host:port`, with IPv6 hosts bracketed
    pub fn address(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

impl Default for FluentConfig {
    fn default() -> Self {
        Self {
            network: Network::Tcp,
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            timeout: DEFAULT_TIMEOUT,
            write_timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Parse a descriptor into a connection config and a tag prefix.
///
/// An empty descriptor yields the defaults and an empty prefix. A descriptor
/// starting with `://` is treated as `tcp://`.
pub fn parse_descriptor(descriptor: &str) -> PubsubResult<(FluentConfig, String)> {
    let descriptor = if descriptor.starts_with("://") {
        format!("tcp{}", descriptor)
    } else {
        descriptor.to_string()
    };

    let url = match Url::parse(&descriptor) {
        Ok(url) => url,
        // No scheme: resolve against the default endpoint so host, port and path still apply
        Err(ParseError::RelativeUrlWithoutBase) => {
            let base = Url::parse(&format!("tcp://{}", DEFAULT_HOST))?;
            base.join(&descriptor)?
        }
        Err(e) => return Err(e.into()),
    };

    let mut config = FluentConfig::default();

    match url.scheme() {
        "tcp" => {}
        "udp" => config.network = Network::Udp,
        other => {
            return Err(PubsubError::UnsupportedScheme {
                scheme: other.to_string(),
                expected: "tcp, udp".to_string(),
            })
        }
    }

    if let Some(port) = url.port() {
        config.port = port;
    }

    match url.host() {
        Some(Host::Domain(domain)) if !domain.is_empty() => config.host = domain.to_string(),
        Some(Host::Ipv4(addr)) => config.host = addr.to_string(),
        Some(Host::Ipv6(addr)) => config.host = addr.to_string(),
        _ => {}
    }

    // An opaque descriptor such as "tcp:foo" has no path to take a prefix from
    let tag_prefix = if url.cannot_be_a_base() {
        String::new()
    } else {
        url.path().trim_start_matches('/').to_string()
    };

    Ok((config, tag_prefix))
}
