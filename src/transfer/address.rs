//! PASV/PORT addressing
//!
//! Both commands describe an IPv4 endpoint as six comma-separated decimals
//! `h1,h2,h3,h4,p1,p2` where the port is `p1 * 256 + p2`.

use regex::Regex;
use std::fmt;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::LazyLock;

use crate::error::{FtpClientError, Result};

static SEXTET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([0-9]+),([0-9]+),([0-9]+),([0-9]+),([0-9]+),([0-9]+)")
        .expect("valid sextet pattern")
});

/// An IPv4 data endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostPort {
    ip: Ipv4Addr,
    port: u16,
}

impl HostPort {
    pub fn new(ip: Ipv4Addr, port: u16) -> Self {
        Self { ip, port }
    }

    pub fn ip(&self) -> Ipv4Addr {
        self.ip
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Renders `h1,h2,h3,h4,p1,p2`.
    pub fn encode(&self) -> String {
        let [h1, h2, h3, h4] = self.ip.octets();
        format!("{},{},{},{},{},{}", h1, h2, h3, h4, self.port >> 8, self.port & 0xff)
    }

    /// Decodes the first six-integer group found in `text`.
    ///
    /// Every number must fit in 0..=255 and the resulting port must not be 0.
    pub fn decode(text: &str) -> Result<Self> {
        let malformed = || FtpClientError::MalformedPasvReply(text.to_string());
        let captures = SEXTET.captures(text).ok_or_else(malformed)?;

        let mut parts = [0u8; 6];
        for (slot, group) in parts.iter_mut().zip(captures.iter().skip(1)) {
            let digits = group.ok_or_else(malformed)?.as_str();
            *slot = digits.parse::<u8>().map_err(|_| malformed())?;
        }

        let [h1, h2, h3, h4, p1, p2] = parts;
        let port = u16::from(p1) * 256 + u16::from(p2);
        if port == 0 {
            return Err(malformed());
        }
        Ok(Self::new(Ipv4Addr::new(h1, h2, h3, h4), port))
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(self.ip, self.port))
    }
}

impl fmt::Display for HostPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.ip, self.port)
    }
}
