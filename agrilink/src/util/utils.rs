//! Address helpers for talking to sensor nodes.

use std::net::Ipv4Addr;
use std::ops::RangeInclusive;

/// Returns the first three octets of a local address, i.e. its /24 prefix.
pub(crate) fn subnet_prefix(ip: Ipv4Addr) -> [u8; 3] {
    let [a, b, c, _] = ip.octets();
    [a, b, c]
}

/// Expands a /24 prefix into the host addresses of `range`.
///
/// The network (`.0`) and broadcast (`.255`) addresses are skipped even when
/// the range includes them.
pub(crate) fn subnet_hosts(prefix: [u8; 3], range: RangeInclusive<u8>) -> Vec<String> {
    let [a, b, c] = prefix;
    range
        .filter(|host| *host != 0 && *host != 255)
        .map(|host| Ipv4Addr::new(a, b, c, host).to_string())
        .collect()
}

/// Builds `http://<host><path>` for a device endpoint.
pub(crate) fn device_url(host: &str, path: &str) -> String {
    format!("http://{host}{path}")
}

/// Whether `address` is a literal IPv4 address rather than a hostname.
pub(crate) fn is_ipv4_literal(address: &str) -> bool {
    address.parse::<Ipv4Addr>().is_ok()
}

/// Unwraps a `Result`, or logs the error with `context` and returns `None`
/// from the enclosing function.
#[macro_export]
macro_rules! try_log {
    ($result:expr, $context:expr) => {
        match $result {
            Ok(value) => value,
            Err(e) => {
                log::warn!("{}: {:?}", $context, e);
                return None;
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_from_local_ip() {
        assert_eq!(subnet_prefix(Ipv4Addr::new(192, 168, 8, 147)), [192, 168, 8]);
    }

    #[test]
    fn hosts_skip_network_and_broadcast() {
        let hosts = subnet_hosts([10, 0, 0], 0..=255);
        assert_eq!(hosts.len(), 254);
        assert_eq!(hosts.first().map(String::as_str), Some("10.0.0.1"));
        assert_eq!(hosts.last().map(String::as_str), Some("10.0.0.254"));
    }

    #[test]
    fn hosts_follow_range() {
        let hosts = subnet_hosts([192, 168, 8], 1..=3);
        assert_eq!(hosts, vec!["192.168.8.1", "192.168.8.2", "192.168.8.3"]);
    }

    #[test]
    fn url_and_literal_checks() {
        assert_eq!(device_url("192.168.8.2", "/api/info"), "http://192.168.8.2/api/info");
        assert!(is_ipv4_literal("192.168.8.2"));
        assert!(!is_ipv4_literal("esp32-dht11.local"));
        assert!(!is_ipv4_literal("127.0.0.1:8080"));
    }
}
