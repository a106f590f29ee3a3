//! URL guard (SSRF protection) and URL normalization helpers.
//!
//! Every endpoint that accepts a URL runs it through [`validate_public_url`];
//! the content extractor re-checks with [`is_guarded_target`] before fetching.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use url::{Host, Url};

use crate::error::{CompeteError, Result};

/// Smallest accepted competitor count.
pub const MIN_COMPETITORS: i64 = 1;
/// Largest accepted competitor count.
pub const MAX_COMPETITORS: i64 = 10;

/// Hostname suffixes that never resolve to the public internet.
const LOCAL_SUFFIXES: &[&str] = &[".local", ".internal", ".localhost"];

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Parse `input` and reject anything that is not a public http(s) URL.
///
/// Each rejection carries a message naming the rule that failed.
pub fn validate_public_url(input: &str) -> Result<Url> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(CompeteError::validation("URL is required"));
    }

    let url = Url::parse(trimmed).map_err(|_| CompeteError::validation("Invalid URL format"))?;
    check_public(&url).map_err(CompeteError::validation)?;
    Ok(url)
}

/// Whether the extractor must refuse to fetch `url`.
pub fn is_guarded_target(url: &Url) -> bool {
    check_public(url).is_err()
}

/// Enforce the accepted competitor count range.
pub fn validate_competitor_count(count: i64) -> Result<usize> {
    if (MIN_COMPETITORS..=MAX_COMPETITORS).contains(&count) {
        Ok(count as usize)
    } else {
        Err(CompeteError::validation(format!(
            "Competitor count must be between {MIN_COMPETITORS} and {MAX_COMPETITORS}"
        )))
    }
}

fn check_public(url: &Url) -> std::result::Result<(), String> {
    match url.scheme() {
        "http" | "https" => {}
        _ => return Err("URL must use http or https protocol".into()),
    }

    match url.host() {
        None => Err("URL host is missing".into()),
        Some(Host::Domain(domain)) => {
            let domain = domain.trim_end_matches('.').to_ascii_lowercase();
            if domain == "localhost" || LOCAL_SUFFIXES.iter().any(|s| domain.ends_with(s)) {
                Err(format!("Local hostnames are not allowed: {domain}"))
            } else {
                Ok(())
            }
        }
        Some(Host::Ipv4(v4)) => check_ip(IpAddr::V4(v4)),
        Some(Host::Ipv6(v6)) => check_ip(IpAddr::V6(v6)),
    }
}

fn check_ip(ip: IpAddr) -> std::result::Result<(), String> {
    let ip = match ip {
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => IpAddr::V4(v4),
            None => IpAddr::V6(v6),
        },
        v4 => v4,
    };

    match ip {
        IpAddr::V4(v4) => check_ipv4(v4),
        IpAddr::V6(v6) => check_ipv6(v6),
    }
}

fn check_ipv4(v4: Ipv4Addr) -> std::result::Result<(), String> {
    if v4.is_loopback() {
        Err(format!("Loopback addresses are not allowed: {v4}"))
    } else if v4.is_private() {
        Err(format!("Private network addresses are not allowed: {v4}"))
    } else if v4.is_link_local() {
        Err(format!("Link-local addresses are not allowed: {v4}"))
    } else if v4.is_unspecified() || v4.is_broadcast() {
        Err(format!("Unspecified addresses are not allowed: {v4}"))
    } else if v4.octets()[0] == 100 && (v4.octets()[1] & 0xC0) == 64 {
        // 100.64.0.0/10 (carrier-grade NAT)
        Err(format!("Private network addresses are not allowed: {v4}"))
    } else {
        Ok(())
    }
}

fn check_ipv6(v6: Ipv6Addr) -> std::result::Result<(), String> {
    let first = v6.segments()[0];
    if v6.is_loopback() {
        Err(format!("Loopback addresses are not allowed: {v6}"))
    } else if v6.is_unspecified() {
        Err(format!("Unspecified addresses are not allowed: {v6}"))
    } else if first & 0xffc0 == 0xfe80 {
        Err(format!("Link-local addresses are not allowed: {v6}"))
    } else if first & 0xfe00 == 0xfc00 {
        // fc00::/7 (unique local)
        Err(format!("Private network addresses are not allowed: {v6}"))
    } else {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Normalize a URL for deduplication: `scheme://host/path`, lowercased,
/// without query, fragment, or trailing slash.
pub fn normalize_url(input: &str) -> String {
    match Url::parse(input.trim()) {
        Ok(url) => {
            let host = url.host_str().unwrap_or("");
            let joined = format!("{}://{}{}", url.scheme(), host, url.path());
            joined.trim_end_matches('/').to_lowercase()
        }
        Err(_) => input.trim().trim_end_matches('/').to_lowercase(),
    }
}

/// Lowercased host of `url` without a leading `www.`.
pub fn bare_host(url: &Url) -> Option<String> {
    url.host_str().map(|h| {
        let h = h.to_ascii_lowercase();
        h.strip_prefix("www.").map(String::from).unwrap_or(h)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rejection(input: &str) -> String {
        validate_public_url(input).unwrap_err().to_string()
    }

    #[test]
    fn accepts_public_urls() {
        assert!(validate_public_url("https://example.com/").is_ok());
        assert!(validate_public_url("http://acme.com/pricing?x=1").is_ok());
        assert!(validate_public_url("http://93.184.216.34/").is_ok());
    }

    #[test]
    fn rejects_private_targets() {
        for input in [
            "http://localhost/",
            "http://127.0.0.1/",
            "http://10.1.2.3/",
            "http://foo.internal/",
            "http://172.16.5.4/",
            "http://192.168.1.1/admin",
            "http://169.254.169.254/latest/meta-data",
            "http://printer.local/",
            "http://app.localhost/",
            "http://0.0.0.0/",
            "http://[::1]/",
        ] {
            assert!(validate_public_url(input).is_err(), "{input} should be rejected");
        }
    }

    #[test]
    fn rejection_messages_name_the_rule() {
        assert!(rejection("").contains("URL is required"));
        assert!(rejection("not a url").contains("Invalid URL format"));
        assert!(rejection("ftp://example.com/").contains("http or https"));
        assert!(rejection("http://localhost/").contains("Local hostnames"));
        assert!(rejection("http://127.0.0.1/").contains("Loopback"));
        assert!(rejection("http://10.1.2.3/").contains("Private network"));
        assert!(rejection("http://169.254.1.1/").contains("Link-local"));
        assert!(rejection("http://[::1]/").contains("Loopback"));
    }

    #[test]
    fn rejects_ipv4_mapped_loopback() {
        assert!(rejection("http://[::ffff:127.0.0.1]/").contains("Loopback"));
    }

    #[test]
    fn competitor_count_bounds() {
        assert_eq!(validate_competitor_count(1).unwrap(), 1);
        assert_eq!(validate_competitor_count(10).unwrap(), 10);
        assert!(validate_competitor_count(0).is_err());
        assert!(validate_competitor_count(11).is_err());
    }

    #[test]
    fn normalize_strips_case_query_and_trailing_slash() {
        assert_eq!(
            normalize_url("https://Acme.com/Product/?ref=ad#top"),
            "https://acme.com/product"
        );
        assert_eq!(normalize_url("https://acme.com/"), normalize_url("https://ACME.com"));
    }

    #[test]
    fn bare_host_drops_www() {
        let url = Url::parse("https://WWW.Acme.com/about").unwrap();
        assert_eq!(bare_host(&url).as_deref(), Some("acme.com"));
    }
}
