//! Tenant context and host → tenant slug resolution.

use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use lyta_core::{TenantId, TenantSlug};

use crate::config::AuthzConfig;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TenantStatus {
    #[default]
    Active,
    Suspended,
}

/// Tenant addressed by the current network origin.
///
/// Always resolved server-side from the host; never taken from client-supplied
/// claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantContext {
    pub tenant_id: TenantId,
    pub slug: TenantSlug,
    #[serde(default)]
    pub status: TenantStatus,
}

impl TenantContext {
    pub fn new(tenant_id: TenantId, slug: TenantSlug) -> Self {
        Self {
            tenant_id,
            slug,
            status: TenantStatus::Active,
        }
    }

    pub fn is_suspended(&self) -> bool {
        self.status == TenantStatus::Suspended
    }
}

/// Maps a hostname (plus an optional explicit override) to a tenant slug.
///
/// - No IO
/// - Deterministic
///
/// The override is only honoured on non-tenant hosts (localhost, preview
/// deployments, raw IPv4), where no subdomain can carry the tenant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantResolver {
    preview_domain_marker: Option<String>,
    reserved_subdomains: Vec<String>,
}

impl Default for TenantResolver {
    fn default() -> Self {
        Self::from_config(&AuthzConfig::default())
    }
}

impl TenantResolver {
    pub fn from_config(config: &AuthzConfig) -> Self {
        Self {
            preview_domain_marker: config
                .preview_domain_marker
                .as_ref()
                .map(|m| m.to_ascii_lowercase())
                .filter(|m| !m.is_empty()),
            reserved_subdomains: config
                .reserved_subdomains
                .iter()
                .map(|s| s.to_ascii_lowercase())
                .collect(),
        }
    }

    pub fn resolve(&self, hostname: &str, explicit_override: Option<&str>) -> Option<String> {
        let host = normalize_host(hostname);

        if self.is_non_tenant_host(&host) {
            return explicit_override
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string);
        }

        let labels: Vec<&str> = host.split('.').collect();
        if labels.len() < 3 {
            return None;
        }

        let candidate = labels[0];
        if candidate.is_empty() || self.reserved_subdomains.iter().any(|r| r == candidate) {
            return None;
        }

        Some(candidate.to_string())
    }

    fn is_non_tenant_host(&self, host: &str) -> bool {
        host == "localhost"
            || self
                .preview_domain_marker
                .as_deref()
                .is_some_and(|marker| host.contains(marker))
            || host.parse::<Ipv4Addr>().is_ok()
    }
}

/// Lower-cases and strips a trailing root dot and a `:port` suffix.
fn normalize_host(hostname: &str) -> String {
    let host = hostname.trim();
    let host = match host.rsplit_once(':') {
        Some((name, port)) if !name.contains(':') && port.bytes().all(|b| b.is_ascii_digit()) => {
            name
        }
        _ => host,
    };
    host.trim_end_matches('.').to_ascii_lowercase()
}
