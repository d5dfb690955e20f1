// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use crate::error::ConfigError;

/// An IP network (address + prefix length) for access control matching.
///
/// Supports both IPv4 and IPv6 addresses. Prefix lengths are bounded to
/// the address type's maximum (32 for IPv4, 128 for IPv6).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct IpNet {
    addr: IpAddr,
    prefix_len: u8,
}

impl IpNet {
    /// Create a new IP network.
    ///
    /// The prefix length is clamped to the maximum for the address type
    /// (32 for IPv4, 128 for IPv6).
    pub fn new(addr: IpAddr, prefix_len: u8) -> Self {
        IpNet {
            addr,
            prefix_len: prefix_len.min(max_prefix(&addr)),
        }
    }

    /// A network matching exactly one address.
    pub fn host(addr: IpAddr) -> Self {
        IpNet::new(addr, max_prefix(&addr))
    }

    /// The prefix length in bits.
    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// Check whether the given IP address falls within this network.
    ///
    /// IPv4-mapped IPv6 addresses (`::ffff:a.b.c.d`) are matched against IPv4
    /// networks, since a dual-stack socket reports IPv4 clients that way.
    pub fn contains(&self, ip: &IpAddr) -> bool {
        let ip = match ip {
            IpAddr::V6(v6) => v6.to_ipv4_mapped().map(IpAddr::V4).unwrap_or(*ip),
            IpAddr::V4(_) => *ip,
        };
        if self.prefix_len == 0 {
            return self.addr.is_ipv4() == ip.is_ipv4();
        }
        match (&self.addr, &ip) {
            (IpAddr::V4(net), IpAddr::V4(addr)) => {
                let mask = u32::MAX << (32 - self.prefix_len as u32);
                (u32::from(*net) & mask) == (u32::from(*addr) & mask)
            }
            (IpAddr::V6(net), IpAddr::V6(addr)) => {
                let mask = u128::MAX << (128 - self.prefix_len as u32);
                (u128::from(*net) & mask) == (u128::from(*addr) & mask)
            }
            _ => false,
        }
    }
}

fn max_prefix(addr: &IpAddr) -> u8 {
    match addr {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    }
}

impl FromStr for IpNet {
    type Err = ConfigError;

    /// Parse `addr/prefix` or a bare address (a single-host network).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |detail: String| ConfigError::InvalidNetwork {
            network: s.to_string(),
            detail,
        };
        let s_trim = s.trim();
        let (addr_part, prefix_part) = match s_trim.split_once('/') {
            Some((a, p)) => (a, Some(p)),
            None => (s_trim, None),
        };
        let addr: IpAddr = addr_part
            .parse()
            .map_err(|e| invalid(format!("bad address: {e}")))?;
        let Some(prefix_part) = prefix_part else {
            return Ok(IpNet::host(addr));
        };
        let prefix_len: u8 = prefix_part
            .parse()
            .map_err(|e| invalid(format!("bad prefix length: {e}")))?;
        if prefix_len > max_prefix(&addr) {
            return Err(invalid(format!(
                "prefix length {} exceeds {}",
                prefix_len,
                max_prefix(&addr)
            )));
        }
        Ok(IpNet::new(addr, prefix_len))
    }
}

impl fmt::Display for IpNet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.addr, self.prefix_len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ipnet_contains_exact() {
        let net = IpNet::new("192.168.1.1".parse().unwrap(), 32);
        assert!(net.contains(&"192.168.1.1".parse().unwrap()));
        assert!(!net.contains(&"192.168.1.2".parse().unwrap()));
    }

    #[test]
    fn test_ipnet_contains_subnet() {
        let net = IpNet::new("192.168.1.0".parse().unwrap(), 24);
        assert!(net.contains(&"192.168.1.0".parse().unwrap()));
        assert!(net.contains(&"192.168.1.255".parse().unwrap()));
        assert!(!net.contains(&"192.168.2.0".parse().unwrap()));
    }

    #[test]
    fn test_ipnet_contains_slash_zero() {
        let net = IpNet::new("0.0.0.0".parse().unwrap(), 0);
        assert!(net.contains(&"1.2.3.4".parse().unwrap()));
        assert!(net.contains(&"255.255.255.255".parse().unwrap()));
        assert!(!net.contains(&"2001:db8::1".parse().unwrap()));
    }

    #[test]
    fn test_ipnet_v4_v6_mismatch() {
        let net = IpNet::new("192.168.1.0".parse().unwrap(), 24);
        assert!(!net.contains(&"::1".parse().unwrap()));
    }

    #[test]
    fn test_ipnet_ipv4_mapped_client() {
        let net = IpNet::new("127.0.0.0".parse().unwrap(), 8);
        assert!(net.contains(&"::ffff:127.0.0.1".parse().unwrap()));
    }

    #[test]
    fn test_ipnet_ipv6() {
        let net = IpNet::new("2001:db8::".parse().unwrap(), 32);
        assert!(net.contains(&"2001:db8::1".parse().unwrap()));
        assert!(net.contains(&"2001:db8:ffff::1".parse().unwrap()));
        assert!(!net.contains(&"2001:db9::1".parse().unwrap()));
    }

    #[test]
    fn test_ipnet_parse() {
        let net: IpNet = "10.0.0.0/8".parse().unwrap();
        assert_eq!(net.prefix_len(), 8);
        assert_eq!(net.to_string(), "10.0.0.0/8");

        let host: IpNet = " 192.168.1.7 ".parse().unwrap();
        assert_eq!(host.prefix_len(), 32);

        let v6: IpNet = "::1".parse().unwrap();
        assert_eq!(v6.prefix_len(), 128);
    }

    #[test]
    fn test_ipnet_parse_errors() {
        assert!(matches!(
            "10.0.0.0/33".parse::<IpNet>(),
            Err(ConfigError::InvalidNetwork { .. })
        ));
        assert!("not-an-ip/8".parse::<IpNet>().is_err());
        assert!("10.0.0.0/x".parse::<IpNet>().is_err());
    }
}
