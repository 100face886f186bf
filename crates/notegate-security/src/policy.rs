//! Admission policy: who may call the gateway, and under what limits.

use serde::Deserialize;
use std::net::IpAddr;

/// Security settings for the gateway, read from config at startup and
/// shared read-only by every request handler afterwards.
#[derive(Debug, Clone, Deserialize)]
pub struct SecurityPolicy {
    /// Require `Authorization: Bearer <auth_token>` on every request.
    #[serde(default)]
    pub enable_auth: bool,
    /// The shared bearer token checked when auth is enabled.
    #[serde(default)]
    pub auth_token: String,
    /// Allowed client IPs: literal addresses, `*`, or CIDR blocks.
    /// Empty means no IP filtering.
    #[serde(default)]
    pub allowed_ips: Vec<String>,
    /// Enforce the per-client request rate limit.
    #[serde(default)]
    pub enable_rate_limit: bool,
    /// Requests allowed per client per trailing minute.
    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_minute: u32,
    /// Emit CORS headers for allowed origins and answer preflights.
    #[serde(default)]
    pub enable_cors: bool,
    /// Allowed origins: literal values or `*`. Empty allows every origin.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

fn default_rate_limit() -> u32 {
    60
}

impl Default for SecurityPolicy {
    fn default() -> Self {
        Self {
            enable_auth: false,
            auth_token: String::new(),
            allowed_ips: vec![],
            enable_rate_limit: false,
            rate_limit_per_minute: default_rate_limit(),
            enable_cors: false,
            allowed_origins: vec![],
        }
    }
}

impl SecurityPolicy {
    /// Whether the client IP passes the allow-list.
    ///
    /// An empty list passes unconditionally. Entries may be a literal IP,
    /// `*`, or a CIDR block (`10.0.0.0/8`, `fd00::/8`).
    pub fn ip_allowed(&self, client_ip: &str) -> bool {
        if self.allowed_ips.is_empty() {
            return true;
        }
        self.allowed_ips.iter().any(|allowed| {
            allowed == "*" || allowed == client_ip || cidr_contains(allowed, client_ip)
        })
    }

    /// Whether the `Authorization` header value matches the configured token.
    ///
    /// The comparison runs in constant time over the full header so a
    /// mismatch position leaks nothing about the token.
    pub fn token_matches(&self, authorization: Option<&str>) -> bool {
        let expected = format!("Bearer {}", self.auth_token);
        constant_time_eq(authorization.unwrap_or("").as_bytes(), expected.as_bytes())
    }

    /// Whether the request `Origin` should receive CORS headers.
    ///
    /// An empty origin list allows every origin, matching the allow-list
    /// semantics of `allowed_ips`.
    pub fn origin_allowed(&self, origin: &str) -> bool {
        if self.allowed_origins.is_empty() {
            return true;
        }
        self.allowed_origins
            .iter()
            .any(|allowed| allowed == "*" || allowed == origin)
    }
}

/// Constant-time byte comparison (prevents timing side channels).
///
/// Length is checked first; for equal-length inputs every byte is folded
/// into the accumulator so there is no early exit.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

/// True when `entry` is a CIDR block containing `client_ip`.
///
/// Non-CIDR entries and unparseable addresses simply do not match; they
/// are never an error at check time.
fn cidr_contains(entry: &str, client_ip: &str) -> bool {
    let Some((net, prefix)) = entry.split_once('/') else {
        return false;
    };
    let Ok(prefix) = prefix.parse::<u32>() else {
        return false;
    };
    let (Ok(net), Ok(ip)) = (net.parse::<IpAddr>(), client_ip.parse::<IpAddr>()) else {
        return false;
    };
    match (net, ip) {
        (IpAddr::V4(net), IpAddr::V4(ip)) => {
            if prefix > 32 {
                return false;
            }
            if prefix == 0 {
                return true;
            }
            let mask = u32::MAX << (32 - prefix);
            (u32::from(net) & mask) == (u32::from(ip) & mask)
        }
        (IpAddr::V6(net), IpAddr::V6(ip)) => {
            if prefix > 128 {
                return false;
            }
            if prefix == 0 {
                return true;
            }
            let mask = u128::MAX << (128 - prefix);
            (u128::from(net) & mask) == (u128::from(ip) & mask)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_allow_list_passes() {
        let policy = SecurityPolicy::default();
        assert!(policy.ip_allowed("203.0.113.9"));
    }

    #[test]
    fn test_literal_ip_match() {
        let policy = SecurityPolicy {
            allowed_ips: vec!["192.168.1.10".into()],
            ..SecurityPolicy::default()
        };
        assert!(policy.ip_allowed("192.168.1.10"));
        assert!(!policy.ip_allowed("192.168.1.11"));
    }

    #[test]
    fn test_wildcard_ip() {
        let policy = SecurityPolicy {
            allowed_ips: vec!["*".into()],
            ..SecurityPolicy::default()
        };
        assert!(policy.ip_allowed("8.8.8.8"));
    }

    #[test]
    fn test_cidr_match_v4() {
        let policy = SecurityPolicy {
            allowed_ips: vec!["10.0.0.0/8".into()],
            ..SecurityPolicy::default()
        };
        assert!(policy.ip_allowed("10.42.7.1"));
        assert!(!policy.ip_allowed("11.0.0.1"));
    }

    #[test]
    fn test_cidr_match_v6() {
        let policy = SecurityPolicy {
            allowed_ips: vec!["fd00::/8".into()],
            ..SecurityPolicy::default()
        };
        assert!(policy.ip_allowed("fd12::1"));
        assert!(!policy.ip_allowed("fe80::1"));
    }

    #[test]
    fn test_cidr_garbage_entries_do_not_match() {
        assert!(!cidr_contains("not-a-cidr/xx", "10.0.0.1"));
        assert!(!cidr_contains("10.0.0.0/40", "10.0.0.1"));
        assert!(!cidr_contains("10.0.0.0/8", "not-an-ip"));
    }

    #[test]
    fn test_token_match() {
        let policy = SecurityPolicy {
            enable_auth: true,
            auth_token: "secret123".into(),
            ..SecurityPolicy::default()
        };
        assert!(policy.token_matches(Some("Bearer secret123")));
        assert!(!policy.token_matches(Some("Bearer secret124")));
        assert!(!policy.token_matches(Some("secret123")));
        assert!(!policy.token_matches(None));
    }

    #[test]
    fn test_constant_time_eq_has_no_early_exit() {
        // Structural check: equal-length inputs differing in the last byte
        // still run the loop to completion and compare unequal.
        assert!(constant_time_eq(b"token-aaaa", b"token-aaaa"));
        assert!(!constant_time_eq(b"token-aaaa", b"token-aaab"));
        assert!(!constant_time_eq(b"xoken-aaaa", b"token-aaaa"));
        assert!(!constant_time_eq(b"short", b"longer-value"));
    }

    #[test]
    fn test_origin_allowed() {
        let policy = SecurityPolicy {
            enable_cors: true,
            allowed_origins: vec!["https://a.com".into()],
            ..SecurityPolicy::default()
        };
        assert!(policy.origin_allowed("https://a.com"));
        assert!(!policy.origin_allowed("https://b.com"));

        let open = SecurityPolicy {
            allowed_origins: vec!["*".into()],
            ..SecurityPolicy::default()
        };
        assert!(open.origin_allowed("https://anything.example"));
    }
}
