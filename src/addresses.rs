//! Candidate address generation.
//!
//! A batch's raw address set is assembled before probing starts, from any
//! mix of single addresses, dash ranges, and CIDR blocks, minus an optional
//! exclusion list. Everything here is plain data manipulation; reachability
//! is the liveness prober's job.

use std::net::Ipv4Addr;

use crate::error::{Error, Result};

/// Expand one address spec into candidate addresses.
///
/// Accepted shapes: a single address (`192.168.1.10`), a dash range
/// (`192.168.1.1-192.168.1.254`, inclusive on both ends), or a CIDR block
/// (`192.168.1.0/24`, expanded to its host addresses).
pub fn expand(spec: &str) -> Result<Vec<Ipv4Addr>> {
    let spec = spec.trim();
    if spec.contains('/') {
        return cidr_hosts(spec);
    }
    if let Some((start, end)) = spec.split_once('-') {
        return Ok(range(parse_addr(start)?, parse_addr(end)?));
    }
    Ok(vec![parse_addr(spec)?])
}

/// Expand several specs into one flat candidate list, in spec order.
pub fn expand_all<'a>(specs: impl IntoIterator<Item = &'a str>) -> Result<Vec<Ipv4Addr>> {
    let mut addresses = Vec::new();
    for spec in specs {
        addresses.extend(expand(spec)?);
    }
    Ok(addresses)
}

/// Every address from `start` to `end`, inclusive. Empty when `start` sorts
/// after `end`.
pub fn range(start: Ipv4Addr, end: Ipv4Addr) -> Vec<Ipv4Addr> {
    (u32::from(start)..=u32::from(end))
        .map(Ipv4Addr::from)
        .collect()
}

/// The host addresses of a CIDR block.
///
/// Network and broadcast addresses are left out for prefixes up to /30; a
/// /31 yields both addresses and a /32 yields the single one. A base
/// address with host bits set is rejected rather than silently masked.
pub fn cidr_hosts(network: &str) -> Result<Vec<Ipv4Addr>> {
    let Some((base, prefix)) = network.split_once('/') else {
        return Err(Error::InvalidAddress(network.to_string()));
    };
    let prefix: u32 = prefix
        .parse()
        .ok()
        .filter(|p| *p <= 32)
        .ok_or_else(|| Error::InvalidAddress(network.to_string()))?;
    let base = u32::from(parse_addr(base)?);

    let mask = u32::MAX.checked_shl(32 - prefix).unwrap_or(0);
    if base & !mask != 0 {
        return Err(Error::InvalidAddress(network.to_string()));
    }

    let hosts = match prefix {
        32 => base..=base,
        31 => base..=base + 1,
        _ => {
            let broadcast = base | !mask;
            base + 1..=broadcast - 1
        }
    };
    Ok(hosts.map(Ipv4Addr::from).collect())
}

/// Drop every excluded address from `addresses`, preserving order.
pub fn exclude(addresses: Vec<Ipv4Addr>, excluded: &[Ipv4Addr]) -> Vec<Ipv4Addr> {
    addresses
        .into_iter()
        .filter(|address| !excluded.contains(address))
        .collect()
}

fn parse_addr(text: &str) -> Result<Ipv4Addr> {
    text.trim()
        .parse()
        .map_err(|_| Error::InvalidAddress(text.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(text: &str) -> Ipv4Addr {
        text.parse().unwrap()
    }

    #[test]
    fn test_expand_single_address() {
        assert_eq!(expand("10.0.0.1").unwrap(), vec![addr("10.0.0.1")]);
    }

    #[test]
    fn test_expand_dash_range() {
        let addresses = expand("192.168.1.1-192.168.1.4").unwrap();
        assert_eq!(
            addresses,
            vec![
                addr("192.168.1.1"),
                addr("192.168.1.2"),
                addr("192.168.1.3"),
                addr("192.168.1.4"),
            ]
        );
    }

    #[test]
    fn test_inverted_range_is_empty() {
        assert!(expand("10.0.0.9-10.0.0.1").unwrap().is_empty());
    }

    #[test]
    fn test_cidr_excludes_network_and_broadcast() {
        let hosts = cidr_hosts("10.0.0.0/30").unwrap();
        assert_eq!(hosts, vec![addr("10.0.0.1"), addr("10.0.0.2")]);

        let hosts = cidr_hosts("192.168.1.0/24").unwrap();
        assert_eq!(hosts.len(), 254);
        assert_eq!(hosts[0], addr("192.168.1.1"));
        assert_eq!(hosts[253], addr("192.168.1.254"));
    }

    #[test]
    fn test_point_to_point_prefixes() {
        assert_eq!(
            cidr_hosts("10.0.0.0/31").unwrap(),
            vec![addr("10.0.0.0"), addr("10.0.0.1")]
        );
        assert_eq!(cidr_hosts("10.0.0.7/32").unwrap(), vec![addr("10.0.0.7")]);
    }

    #[test]
    fn test_host_bits_set_rejected() {
        assert!(matches!(
            cidr_hosts("10.0.0.5/24").unwrap_err(),
            Error::InvalidAddress(_)
        ));
    }

    #[test]
    fn test_malformed_specs_rejected() {
        assert!(expand("not-an-address").is_err());
        assert!(expand("10.0.0.0/33").is_err());
        assert!(expand("10.0.0.1-banana").is_err());
    }

    #[test]
    fn test_expand_all_with_exclusions() {
        let addresses = expand_all(["10.0.0.0/30", "10.0.1.1", "10.0.1.3-10.0.1.4"]).unwrap();
        assert_eq!(addresses.len(), 5);

        let kept = exclude(addresses, &[addr("10.0.0.1"), addr("10.0.1.4")]);
        assert_eq!(
            kept,
            vec![addr("10.0.0.2"), addr("10.0.1.1"), addr("10.0.1.3")]
        );
    }
}
