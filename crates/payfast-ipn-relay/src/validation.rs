use std::net::IpAddr;

use actix_web::HttpRequest;

/// The address a notification came from.
///
/// With `trust_forwarded_for` the left-most `X-Forwarded-For` entry wins;
/// otherwise the TCP peer address is used.
pub fn client_ip(req: &HttpRequest, trust_forwarded_for: bool) -> Option<IpAddr> {
    if trust_forwarded_for {
        let forwarded = req
            .headers()
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .and_then(|first| first.trim().parse::<IpAddr>().ok());
        if forwarded.is_some() {
            return forwarded;
        }
    }
    req.peer_addr().map(|addr| addr.ip())
}

/// An empty allowlist admits everyone. Otherwise the address must be listed;
/// an unknown address is refused.
pub fn is_allowed_source(ip: Option<IpAddr>, allowed: &[IpAddr]) -> bool {
    if allowed.is_empty() {
        return true;
    }
    match ip {
        Some(ip) => allowed.iter().any(|a| *a == normalize(ip)),
        None => false,
    }
}

// IPv4-mapped IPv6 peers (dual-stack listeners) compare as plain IPv4.
fn normalize(ip: IpAddr) -> IpAddr {
    match ip {
        IpAddr::V6(v6) => v6
            .to_ipv4_mapped()
            .map(IpAddr::V4)
            .unwrap_or(IpAddr::V6(v6)),
        v4 => v4,
    }
}
