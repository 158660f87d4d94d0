use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use lyta_core::{TenantId, TenantSlug};

/// Identity of an authenticated principal.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrincipalId(Uuid);

impl PrincipalId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for PrincipalId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl From<Uuid> for PrincipalId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl From<PrincipalId> for Uuid {
    fn from(value: PrincipalId) -> Self {
        value.0
    }
}

impl FromStr for PrincipalId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::from_str(s)?))
    }
}

/// An authenticated principal as seen by the renderer.
///
/// `session_valid` is the renderer's view; the identity guard re-confirms it
/// against the session service on every evaluation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Principal {
    pub id: PrincipalId,
    pub session_valid: bool,
}

impl Principal {
    pub fn new(id: PrincipalId) -> Self {
        Self {
            id,
            session_valid: true,
        }
    }
}

/// A principal's membership in a tenant (at most one per principal).
///
/// This is an authorization boundary object: it states *which tenant* the
/// principal belongs to, checked against the tenant resolved from the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantMembership {
    pub tenant_id: TenantId,
    pub tenant_slug: TenantSlug,
    #[serde(default)]
    pub is_platform_admin: bool,
}
