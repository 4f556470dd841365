//! Derives the tenant slug a request is addressed to.

use std::net::IpAddr;

/// Subdomains that never name a tenant.
const RESERVED_LABELS: &[&str] = &["www", "api", "app", "mail", "ftp", "cdn"];

/// Label of the super-admin host.
const ADMIN_LABEL: &str = "admin";

/// Maps `Host` / `X-Tenant-Slug` request data to an optional tenant slug.
///
/// `None` means the request targets the base or admin domain.
#[derive(Debug, Clone, Copy, Default)]
pub struct TenantContextResolver;

impl TenantContextResolver {
    pub fn resolve(&self, host: Option<&str>, header_slug: Option<&str>) -> Option<String> {
        if let Some(slug) = header_slug.map(str::trim).filter(|s| !s.is_empty()) {
            return Some(slug.to_lowercase());
        }

        let host = strip_port(host?.trim())?.to_lowercase();
        if host.is_empty() || host == "localhost" || host.parse::<IpAddr>().is_ok() {
            return None;
        }

        let labels: Vec<&str> = host.split('.').collect();
        let candidate = match labels.as_slice() {
            [label, "localhost"] => *label,
            [first, _, _, ..] => *first,
            _ => return None,
        };

        if candidate.is_empty() || candidate == ADMIN_LABEL || RESERVED_LABELS.contains(&candidate) {
            return None;
        }
        Some(candidate.to_string())
    }
}

/// Drop a trailing `:port`. Bracketed IPv6 literals yield `None`.
fn strip_port(host: &str) -> Option<&str> {
    if host.starts_with('[') {
        return None;
    }
    match host.rsplit_once(':') {
        Some((name, port)) if port.chars().all(|c| c.is_ascii_digit()) => Some(name),
        Some(_) => None,
        None => Some(host),
    }
}
