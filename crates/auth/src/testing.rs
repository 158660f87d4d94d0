//! In-crate substitutes for the collaborators, used by unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};

use lyta_core::{TenantId, TenantSlug};

use crate::collaborators::{
    ClientRecordStore, Collaborators, Profile, ProfileStore, RoleStore, SecondFactorStore, Session,
    SessionService, SignOut, TenantDirectory, TenantMembershipStore, TenantRoleStore,
};
use crate::error::StoreError;
use crate::intent::SessionIntentStore;
use crate::roles::Role;
use crate::second_factor::{SecondFactorKind, SecondFactorRecord};
use crate::space::Space;
use crate::tenant::TenantContext;
use crate::{PrincipalId, TenantMembership};

pub(crate) fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
}

pub(crate) fn slug(raw: &str) -> TenantSlug {
    TenantSlug::parse(raw).unwrap()
}

/// Tenant ids are derived from the slug so fixtures and contexts agree.
pub(crate) fn tenant_id(raw: &str) -> TenantId {
    let mut bytes = [0u8; 16];
    for (i, b) in raw.bytes().take(16).enumerate() {
        bytes[i] = b;
    }
    TenantId::from_uuid(uuid::Uuid::from_bytes(bytes))
}

pub(crate) fn tenant(raw: &str) -> TenantContext {
    TenantContext::new(tenant_id(raw), slug(raw))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Op {
    Session,
    Profile,
    Roles,
    Membership,
    TenantRole,
    ClientRecord,
    SecondFactor,
    SignOut,
    Tenant,
}

#[derive(Debug, Clone)]
pub(crate) struct FixtureState {
    pub session: Option<Session>,
    pub profile: Option<Profile>,
    pub roles: Vec<Role>,
    pub membership: Option<TenantMembership>,
    pub tenant_role: bool,
    pub client_record: bool,
    pub verification: Option<SecondFactorRecord>,
    pub tenants: Vec<TenantContext>,
}

#[derive(Debug)]
pub(crate) struct Fixture {
    principal: PrincipalId,
    state: Mutex<FixtureState>,
    failing: Mutex<HashSet<Op>>,
    calls: Mutex<HashMap<Op, usize>>,
}

impl Fixture {
    fn new(roles: Vec<Role>) -> Self {
        let principal = PrincipalId::new();
        Self {
            principal,
            state: Mutex::new(FixtureState {
                session: Some(Session {
                    valid: true,
                    principal_id: principal,
                }),
                profile: Some(Profile {
                    is_active: Some(true),
                    phone: Some("+41790000000".into()),
                }),
                roles,
                membership: None,
                tenant_role: false,
                client_record: false,
                verification: Some(SecondFactorRecord::login(
                    principal,
                    now() - Duration::minutes(5),
                )),
                tenants: vec![tenant("advisy"), tenant("otherfirm")],
            }),
            failing: Mutex::new(HashSet::new()),
            calls: Mutex::new(HashMap::new()),
        }
    }

    /// Client with a client record and a fresh 2FA.
    pub(crate) fn client() -> Arc<Self> {
        let fixture = Arc::new(Self::new(vec![Role::Client]));
        fixture.update(|s| s.client_record = true);
        fixture
    }

    /// Team member of `tenant_slug` holding a tenant role.
    pub(crate) fn team(role: Role, tenant_slug: &str) -> Arc<Self> {
        let fixture = Arc::new(Self::new(vec![role]));
        fixture.update(|s| {
            s.membership = Some(TenantMembership {
                tenant_id: tenant_id(tenant_slug),
                tenant_slug: slug(tenant_slug),
                is_platform_admin: false,
            });
            s.tenant_role = true;
        });
        fixture
    }

    pub(crate) fn king() -> Arc<Self> {
        Arc::new(Self::new(vec![Role::King]))
    }

    pub(crate) fn principal_id(&self) -> PrincipalId {
        self.principal
    }

    pub(crate) fn update(&self, f: impl FnOnce(&mut FixtureState)) {
        f(&mut self.state.lock().unwrap());
    }

    pub(crate) fn fail(&self, op: Op) {
        self.failing.lock().unwrap().insert(op);
    }

    pub(crate) fn heal(&self, op: Op) {
        self.failing.lock().unwrap().remove(&op);
    }

    pub(crate) fn session(&self) -> Option<Session> {
        self.state.lock().unwrap().session
    }

    pub(crate) fn calls(&self, op: Op) -> usize {
        self.calls.lock().unwrap().get(&op).copied().unwrap_or(0)
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    pub(crate) fn collaborators(self: &Arc<Self>) -> Collaborators {
        Collaborators::from_backend(self.clone())
    }

    fn enter(&self, op: Op) -> Result<FixtureState, StoreError> {
        *self.calls.lock().unwrap().entry(op).or_insert(0) += 1;
        if self.failing.lock().unwrap().contains(&op) {
            return Err(StoreError::unavailable(format!("{op:?} down")));
        }
        Ok(self.state.lock().unwrap().clone())
    }
}

#[async_trait]
impl SessionService for Fixture {
    async fn current_session(&self) -> Result<Option<Session>, StoreError> {
        Ok(self.enter(Op::Session)?.session)
    }
}

#[async_trait]
impl ProfileStore for Fixture {
    async fn profile(&self, _id: PrincipalId) -> Result<Option<Profile>, StoreError> {
        Ok(self.enter(Op::Profile)?.profile)
    }
}

#[async_trait]
impl RoleStore for Fixture {
    async fn roles(&self, _id: PrincipalId) -> Result<Vec<Role>, StoreError> {
        Ok(self.enter(Op::Roles)?.roles)
    }
}

#[async_trait]
impl TenantMembershipStore for Fixture {
    async fn membership(&self, _id: PrincipalId) -> Result<Option<TenantMembership>, StoreError> {
        Ok(self.enter(Op::Membership)?.membership)
    }
}

#[async_trait]
impl TenantRoleStore for Fixture {
    async fn has_tenant_role(
        &self,
        _id: PrincipalId,
        tenant_id: TenantId,
    ) -> Result<bool, StoreError> {
        let state = self.enter(Op::TenantRole)?;
        let member_of = state.membership.is_some_and(|m| m.tenant_id == tenant_id);
        Ok(state.tenant_role && member_of)
    }
}

#[async_trait]
impl ClientRecordStore for Fixture {
    async fn has_client_record(&self, _id: PrincipalId) -> Result<bool, StoreError> {
        Ok(self.enter(Op::ClientRecord)?.client_record)
    }
}

#[async_trait]
impl SecondFactorStore for Fixture {
    async fn latest_verification(
        &self,
        _id: PrincipalId,
        kind: SecondFactorKind,
    ) -> Result<Option<SecondFactorRecord>, StoreError> {
        Ok(self.enter(Op::SecondFactor)?.verification.filter(|r| r.kind == kind))
    }
}

#[async_trait]
impl SignOut for Fixture {
    async fn sign_out(&self) -> Result<(), StoreError> {
        self.enter(Op::SignOut)?;
        self.update(|s| s.session = None);
        Ok(())
    }
}

#[async_trait]
impl TenantDirectory for Fixture {
    async fn find_by_slug(&self, slug: &TenantSlug) -> Result<Option<TenantContext>, StoreError> {
        Ok(self.enter(Op::Tenant)?.tenants.into_iter().find(|t| &t.slug == slug))
    }
}

/// Intent record for a single domain.
#[derive(Debug, Default)]
pub(crate) struct MemoryIntent {
    record: Mutex<(Option<Space>, Option<Role>)>,
    broken: Mutex<bool>,
}

impl MemoryIntent {
    pub(crate) fn with(intent: Space) -> Self {
        let store = Self::default();
        store.record.lock().unwrap().0 = Some(intent);
        store
    }

    pub(crate) fn break_storage(&self) {
        *self.broken.lock().unwrap() = true;
    }

    fn check(&self) -> Result<(), StoreError> {
        if *self.broken.lock().unwrap() {
            return Err(StoreError::backend("storage disabled"));
        }
        Ok(())
    }
}

impl SessionIntentStore for MemoryIntent {
    fn get(&self) -> Result<Option<Space>, StoreError> {
        self.check()?;
        Ok(self.record.lock().unwrap().0)
    }

    fn set(&self, intent: Space) -> Result<(), StoreError> {
        self.check()?;
        self.record.lock().unwrap().0 = Some(intent);
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.check()?;
        *self.record.lock().unwrap() = (None, None);
        Ok(())
    }

    fn set_active_role(&self, role: Role) -> Result<(), StoreError> {
        self.check()?;
        self.record.lock().unwrap().1 = Some(role);
        Ok(())
    }

    fn active_role(&self) -> Result<Option<Role>, StoreError> {
        self.check()?;
        Ok(self.record.lock().unwrap().1)
    }
}
