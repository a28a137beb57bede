//! Client network-address derivation for rate limiting and audit logs.
//!
//! The key is the IP of the TCP peer, taken from axum's
//! [`ConnectInfo`] extension. Forwarding headers are ignored unless the peer
//! itself sits inside a configured trusted-proxy range; only then is the
//! first `X-Forwarded-For` hop (or `X-Real-IP`) used instead.
//!
//! # Known Limitation
//!
//! Keys are network addresses, not identities: every client behind one NAT
//! or one untrusted proxy shares a single rate-limit window.
//!
//! # The "unknown" Fallback
//!
//! When the server was not started with connection info (for example when a
//! router is driven in-process by tests), every request maps to
//! [`UNKNOWN_CLIENT`] and therefore shares one window.

use std::borrow::Cow;
use std::net::{IpAddr, SocketAddr};

use axum::extract::ConnectInfo;
use axum::http::Request;
use tracing::{debug, warn};

/// Key used when the peer address is not available.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Parsed CIDR network range for trusted proxy validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CidrRange {
    network: IpAddr,
    prefix_len: u8,
}

impl CidrRange {
    /// Parse a CIDR notation string (e.g., "10.0.0.0/8" or "::1/128").
    ///
    /// A bare address is treated as a single-host range. Returns `None` if
    /// the format is invalid.
    pub fn parse(cidr: &str) -> Option<Self> {
        let cidr = cidr.trim();

        let (addr, prefix) = match cidr.split_once('/') {
            Some((addr, prefix)) => (addr, Some(prefix)),
            None => (cidr, None),
        };

        let network: IpAddr = addr.parse().ok()?;
        let max_prefix = match network {
            IpAddr::V4(_) => 32,
            IpAddr::V6(_) => 128,
        };

        let prefix_len = match prefix {
            Some(p) => p.parse::<u8>().ok().filter(|len| *len <= max_prefix)?,
            None => max_prefix,
        };

        Some(Self {
            network,
            prefix_len,
        })
    }

    /// Check if an IP address is contained within this CIDR range.
    pub fn contains(&self, ip: &IpAddr) -> bool {
        match (&self.network, ip) {
            (IpAddr::V4(net), IpAddr::V4(addr)) => {
                let mask = u32::MAX.checked_shl(32 - u32::from(self.prefix_len)).unwrap_or(0);
                (u32::from(*net) & mask) == (u32::from(*addr) & mask)
            }
            (IpAddr::V6(net), IpAddr::V6(addr)) => {
                let mask = u128::MAX
                    .checked_shl(128 - u32::from(self.prefix_len))
                    .unwrap_or(0);
                (u128::from(*net) & mask) == (u128::from(*addr) & mask)
            }
            _ => false,
        }
    }
}

/// Networks whose forwarding headers are believed.
#[derive(Debug, Clone, Default)]
pub struct TrustedProxyConfig {
    ranges: Vec<CidrRange>,
}

impl TrustedProxyConfig {
    /// Build from CIDR strings. Invalid entries are logged and skipped.
    pub fn new(cidrs: &[String]) -> Self {
        let ranges: Vec<CidrRange> = cidrs
            .iter()
            .filter_map(|cidr| {
                let parsed = CidrRange::parse(cidr);
                if parsed.is_none() {
                    warn!(cidr = %cidr, "Invalid CIDR range in TRUSTED_PROXIES, skipping");
                }
                parsed
            })
            .collect();

        Self { ranges }
    }

    pub fn is_enabled(&self) -> bool {
        !self.ranges.is_empty()
    }

    /// Whether `ip` belongs to a trusted proxy. Nothing is trusted when no
    /// ranges are configured.
    pub fn is_trusted(&self, ip: &IpAddr) -> bool {
        self.ranges.iter().any(|range| range.contains(ip))
    }
}

/// IP of the connected peer, if the server recorded connection info.
#[inline]
pub fn peer_ip<B>(req: &Request<B>) -> Option<IpAddr> {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
}

/// First client address announced by a forwarding proxy.
fn forwarded_ip<B>(req: &Request<B>) -> Option<IpAddr> {
    if let Some(value) = req.headers().get("x-forwarded-for")
        && let Ok(value) = value.to_str()
        && let Some(first) = value.split(',').next()
    {
        return first.trim().parse().ok();
    }

    req.headers()
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

/// Derive the rate-limit key for a request.
///
/// Returns `Cow::Borrowed` for the shared [`UNKNOWN_CLIENT`] key so the
/// fallback path does not allocate.
pub fn client_key<B>(req: &Request<B>, trusted_proxies: &TrustedProxyConfig) -> Cow<'static, str> {
    let Some(peer) = peer_ip(req) else {
        return Cow::Borrowed(UNKNOWN_CLIENT);
    };

    if trusted_proxies.is_trusted(&peer) {
        if let Some(client) = forwarded_ip(req) {
            debug!(peer = %peer, client = %client, "Using forwarded client address from trusted proxy");
            return Cow::Owned(client.to_string());
        }
        debug!(peer = %peer, "Trusted proxy sent no usable forwarding header");
    }

    Cow::Owned(peer.to_string())
}
