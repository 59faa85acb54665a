//! Internal-network checks for configured server URLs.
//!
//! # Design
//! The check is a trait so hosts with their own network policy can plug it
//! in; [`PrivateNetworkPolicy`] is the default. Bootstrap consults it unless
//! `ignoresecurity` is set.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, ToSocketAddrs};

use url::{Host, Url};

/// Decides whether a URL's host is off limits.
pub trait SecurityPolicy: fmt::Debug + Send + Sync {
    fn is_blocked(&self, url: &Url) -> bool;
}

/// Blocks `localhost` and any host resolving to a loopback, private,
/// link-local, shared (CGNAT), unspecified, or broadcast address.
#[derive(Debug, Default, Clone, Copy)]
pub struct PrivateNetworkPolicy;

impl SecurityPolicy for PrivateNetworkPolicy {
    fn is_blocked(&self, url: &Url) -> bool {
        if let Some(Host::Domain(domain)) = url.host() {
            let domain = domain.trim_end_matches('.').to_ascii_lowercase();
            if domain == "localhost" || domain.ends_with(".localhost") {
                return true;
            }
        }
        resolve_host(url).iter().any(is_internal)
    }
}

/// All addresses the URL's host resolves to, in resolution order without
/// duplicates. IP literals are returned as-is; unresolvable hosts yield none.
pub fn resolve_host(url: &Url) -> Vec<IpAddr> {
    match url.host() {
        Some(Host::Ipv4(ip)) => vec![IpAddr::V4(ip)],
        Some(Host::Ipv6(ip)) => vec![IpAddr::V6(ip)],
        Some(Host::Domain(domain)) => {
            let port = url.port_or_known_default().unwrap_or(80);
            let Ok(addrs) = (domain, port).to_socket_addrs() else {
                return Vec::new();
            };
            let mut ips: Vec<IpAddr> = Vec::new();
            for ip in addrs.map(|addr| addr.ip()) {
                if !ips.contains(&ip) {
                    ips.push(ip);
                }
            }
            ips
        }
        None => Vec::new(),
    }
}

pub fn is_internal(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(ip) => is_internal_v4(ip),
        IpAddr::V6(ip) => is_internal_v6(ip),
    }
}

fn is_internal_v4(ip: &Ipv4Addr) -> bool {
    let [a, b, ..] = ip.octets();
    ip.is_loopback()
        || ip.is_private()
        || ip.is_link_local()
        || ip.is_unspecified()
        || ip.is_broadcast()
        // 100.64.0.0/10
        || (a == 100 && (b & 0xc0) == 64)
}

fn is_internal_v6(ip: &Ipv6Addr) -> bool {
    if let Some(mapped) = ip.to_ipv4_mapped() {
        return is_internal_v4(&mapped);
    }
    let first = ip.segments()[0];
    ip.is_loopback()
        || ip.is_unspecified()
        // fc00::/7 unique local
        || (first & 0xfe00) == 0xfc00
        // fe80::/10 link local
        || (first & 0xffc0) == 0xfe80
}

/// Describe why `url` is blocked as `"host (ip1, ip2, ...)"`, or `None` when
/// it is allowed or cannot be parsed. Uses [`PrivateNetworkPolicy`].
pub fn is_url_blocked(url: &str) -> Option<String> {
    is_url_blocked_with(url, &PrivateNetworkPolicy)
}

/// [`is_url_blocked`] with a caller-supplied policy.
pub fn is_url_blocked_with(url: &str, policy: &dyn SecurityPolicy) -> Option<String> {
    let parsed = Url::parse(url.trim()).ok()?;
    if !policy.is_blocked(&parsed) {
        return None;
    }
    Some(describe_host(&parsed))
}

pub(crate) fn describe_host(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    let ips = resolve_host(url)
        .iter()
        .map(IpAddr::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    format!("{host} ({ips})")
}
