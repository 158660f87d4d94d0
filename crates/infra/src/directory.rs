//! In-memory identity directory: profiles, roles, memberships, 2FA records and
//! the tenant registry.
//!
//! Backs local development, the probe binary and integration tests. Every
//! lookup can be made to fail on demand to exercise the fail-closed paths.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError, RwLock};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use lyta_auth::{
    ClientRecordStore, PrincipalId, Profile, ProfileStore, Role, RoleStore, SecondFactorKind,
    SecondFactorRecord, SecondFactorStore, StoreError, TenantContext, TenantDirectory,
    TenantMembership, TenantMembershipStore, TenantRoleStore, TenantStatus,
};
use lyta_core::{TenantId, TenantSlug};

/// Directory lookups, for fault injection and call accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lookup {
    Profile,
    Roles,
    Membership,
    TenantRole,
    ClientRecord,
    SecondFactor,
    Tenant,
}

/// Everything the directory knows about one principal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrincipalRecord {
    pub id: PrincipalId,
    #[serde(default)]
    pub profile: Option<Profile>,
    #[serde(default)]
    pub roles: Vec<Role>,
    #[serde(default)]
    pub membership: Option<TenantMembership>,
    /// Tenants in which the principal holds a team role.
    #[serde(default)]
    pub tenant_roles: Vec<TenantId>,
    #[serde(default)]
    pub client_record: bool,
    #[serde(default)]
    pub verifications: Vec<SecondFactorRecord>,
}

impl PrincipalRecord {
    pub fn new(id: PrincipalId) -> Self {
        Self {
            id,
            profile: Some(Profile {
                is_active: Some(true),
                phone: None,
            }),
            ..Self::default()
        }
    }
}

#[derive(Debug, Default)]
struct DirectoryState {
    principals: HashMap<PrincipalId, PrincipalRecord>,
    tenants: HashMap<TenantSlug, TenantContext>,
}

#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    state: RwLock<DirectoryState>,
    failing: RwLock<HashSet<Lookup>>,
    calls: Mutex<HashMap<Lookup, usize>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert_principal(&self, record: PrincipalRecord) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.principals.insert(record.id, record);
    }

    /// Apply `f` to an existing principal record. Returns `false` if unknown.
    pub fn update_principal(&self, id: PrincipalId, f: impl FnOnce(&mut PrincipalRecord)) -> bool {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        match state.principals.get_mut(&id) {
            Some(record) => {
                f(record);
                true
            }
            None => false,
        }
    }

    pub fn principal(&self, id: PrincipalId) -> Option<PrincipalRecord> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.principals.get(&id).cloned()
    }

    pub fn upsert_tenant(&self, tenant: TenantContext) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.tenants.insert(tenant.slug.clone(), tenant);
    }

    pub fn set_tenant_status(&self, slug: &TenantSlug, status: TenantStatus) -> bool {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        match state.tenants.get_mut(slug) {
            Some(tenant) => {
                tenant.status = status;
                tracing::info!(tenant = %slug, ?status, "tenant status changed");
                true
            }
            None => false,
        }
    }

    /// Make every subsequent `lookup` fail until [`heal`](Self::heal) is called.
    pub fn fail(&self, lookup: Lookup) {
        self.failing.write().unwrap_or_else(PoisonError::into_inner).insert(lookup);
    }

    pub fn heal(&self, lookup: Lookup) {
        self.failing.write().unwrap_or_else(PoisonError::into_inner).remove(&lookup);
    }

    pub fn calls(&self, lookup: Lookup) -> usize {
        let calls = self.calls.lock().unwrap_or_else(PoisonError::into_inner);
        calls.get(&lookup).copied().unwrap_or(0)
    }

    fn enter(&self, lookup: Lookup) -> Result<(), StoreError> {
        *self
            .calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(lookup)
            .or_insert(0) += 1;

        let failing = self.failing.read().unwrap_or_else(PoisonError::into_inner);
        if failing.contains(&lookup) {
            return Err(StoreError::unavailable(format!("{lookup:?} lookup disabled")));
        }
        Ok(())
    }

    fn with_principal<T>(
        &self,
        lookup: Lookup,
        id: PrincipalId,
        f: impl FnOnce(&PrincipalRecord) -> T,
    ) -> Result<Option<T>, StoreError> {
        self.enter(lookup)?;
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        Ok(state.principals.get(&id).map(f))
    }
}

#[async_trait]
impl ProfileStore for InMemoryDirectory {
    async fn profile(&self, id: PrincipalId) -> Result<Option<Profile>, StoreError> {
        Ok(self.with_principal(Lookup::Profile, id, |r| r.profile.clone())?.flatten())
    }
}

#[async_trait]
impl RoleStore for InMemoryDirectory {
    async fn roles(&self, id: PrincipalId) -> Result<Vec<Role>, StoreError> {
        Ok(self.with_principal(Lookup::Roles, id, |r| r.roles.clone())?.unwrap_or_default())
    }
}

#[async_trait]
impl TenantMembershipStore for InMemoryDirectory {
    async fn membership(&self, id: PrincipalId) -> Result<Option<TenantMembership>, StoreError> {
        Ok(self.with_principal(Lookup::Membership, id, |r| r.membership.clone())?.flatten())
    }
}

#[async_trait]
impl TenantRoleStore for InMemoryDirectory {
    async fn has_tenant_role(
        &self,
        id: PrincipalId,
        tenant_id: TenantId,
    ) -> Result<bool, StoreError> {
        let held =
            self.with_principal(Lookup::TenantRole, id, |r| r.tenant_roles.contains(&tenant_id))?;
        Ok(held.unwrap_or(false))
    }
}

#[async_trait]
impl ClientRecordStore for InMemoryDirectory {
    async fn has_client_record(&self, id: PrincipalId) -> Result<bool, StoreError> {
        Ok(self.with_principal(Lookup::ClientRecord, id, |r| r.client_record)?.unwrap_or(false))
    }
}

#[async_trait]
impl SecondFactorStore for InMemoryDirectory {
    async fn latest_verification(
        &self,
        id: PrincipalId,
        kind: SecondFactorKind,
    ) -> Result<Option<SecondFactorRecord>, StoreError> {
        let latest = self.with_principal(Lookup::SecondFactor, id, |r| {
            r.verifications
                .iter()
                .filter(|v| v.kind == kind)
                .max_by_key(|v| v.verified_at)
                .cloned()
        })?;
        Ok(latest.flatten())
    }
}

#[async_trait]
impl TenantDirectory for InMemoryDirectory {
    async fn find_by_slug(&self, slug: &TenantSlug) -> Result<Option<TenantContext>, StoreError> {
        self.enter(Lookup::Tenant)?;
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        Ok(state.tenants.get(slug).cloned())
    }
}
