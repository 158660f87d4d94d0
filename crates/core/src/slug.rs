//! Tenant slug: the DNS label a tenant is addressed by.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Longest legal DNS label.
const MAX_LABEL_LEN: usize = 63;

/// A validated, lower-case tenant slug (e.g. `advisy` in `advisy.lyta.ch`).
///
/// Slugs are compared byte-for-byte; construction normalizes ASCII case so that
/// `Advisy` and `advisy` name the same tenant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TenantSlug(String);

impl TenantSlug {
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let slug = raw.trim().to_ascii_lowercase();

        if slug.is_empty() {
            return Err(DomainError::validation("tenant slug is empty"));
        }
        if slug.len() > MAX_LABEL_LEN {
            return Err(DomainError::validation(format!(
                "tenant slug exceeds {MAX_LABEL_LEN} characters"
            )));
        }
        if slug.starts_with('-') || slug.ends_with('-') {
            return Err(DomainError::validation(
                "tenant slug cannot start or end with '-'",
            ));
        }
        if !slug
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
        {
            return Err(DomainError::validation(format!(
                "tenant slug '{slug}' contains characters outside [a-z0-9-]"
            )));
        }

        Ok(Self(slug))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for TenantSlug {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TenantSlug {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for TenantSlug {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TenantSlug> for String {
    fn from(value: TenantSlug) -> Self {
        value.0
    }
}
