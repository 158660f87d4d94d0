//! Narrow interfaces to the external services the guards consult.
//!
//! Each guard depends only on the trait it needs, so guards can be exercised
//! against substitutes in isolation. Every call is made fresh per evaluation;
//! nothing here is cached.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use lyta_core::{TenantId, TenantSlug};

use crate::error::StoreError;
use crate::roles::Role;
use crate::second_factor::{SecondFactorKind, SecondFactorRecord};
use crate::tenant::TenantContext;
use crate::{PrincipalId, TenantMembership};

/// Server-side view of the current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub valid: bool,
    pub principal_id: PrincipalId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// `None` is treated as active; only an explicit `false` disables.
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub phone: Option<String>,
}

impl Profile {
    pub fn is_active(&self) -> bool {
        self.is_active != Some(false)
    }
}

#[async_trait]
pub trait SessionService: Send + Sync {
    /// `Ok(None)` when there is no session at all.
    async fn current_session(&self) -> Result<Option<Session>, StoreError>;
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn profile(&self, id: PrincipalId) -> Result<Option<Profile>, StoreError>;
}

#[async_trait]
pub trait RoleStore: Send + Sync {
    async fn roles(&self, id: PrincipalId) -> Result<Vec<Role>, StoreError>;
}

#[async_trait]
pub trait TenantMembershipStore: Send + Sync {
    async fn membership(&self, id: PrincipalId) -> Result<Option<TenantMembership>, StoreError>;
}

#[async_trait]
pub trait TenantRoleStore: Send + Sync {
    async fn has_tenant_role(
        &self,
        id: PrincipalId,
        tenant_id: TenantId,
    ) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait ClientRecordStore: Send + Sync {
    async fn has_client_record(&self, id: PrincipalId) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait SecondFactorStore: Send + Sync {
    async fn latest_verification(
        &self,
        id: PrincipalId,
        kind: SecondFactorKind,
    ) -> Result<Option<SecondFactorRecord>, StoreError>;
}

#[async_trait]
pub trait SignOut: Send + Sync {
    async fn sign_out(&self) -> Result<(), StoreError>;
}

/// Looks up the tenant addressed by a resolved slug.
#[async_trait]
pub trait TenantDirectory: Send + Sync {
    async fn find_by_slug(&self, slug: &TenantSlug) -> Result<Option<TenantContext>, StoreError>;
}

/// The full set of collaborators an engine evaluates against.
#[derive(Clone)]
pub struct Collaborators {
    pub sessions: Arc<dyn SessionService>,
    pub profiles: Arc<dyn ProfileStore>,
    pub roles: Arc<dyn RoleStore>,
    pub memberships: Arc<dyn TenantMembershipStore>,
    pub tenant_roles: Arc<dyn TenantRoleStore>,
    pub client_records: Arc<dyn ClientRecordStore>,
    pub second_factors: Arc<dyn SecondFactorStore>,
    pub sign_out: Arc<dyn SignOut>,
    pub tenants: Arc<dyn TenantDirectory>,
}

impl Collaborators {
    /// Wire every collaborator to one backend implementing all of them.
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: SessionService
            + ProfileStore
            + RoleStore
            + TenantMembershipStore
            + TenantRoleStore
            + ClientRecordStore
            + SecondFactorStore
            + SignOut
            + TenantDirectory
            + 'static,
    {
        Self {
            sessions: backend.clone(),
            profiles: backend.clone(),
            roles: backend.clone(),
            memberships: backend.clone(),
            tenant_roles: backend.clone(),
            client_records: backend.clone(),
            second_factors: backend.clone(),
            sign_out: backend.clone(),
            tenants: backend,
        }
    }
}

impl core::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}
