//! The individual authorization guards.
//!
//! Each guard is a function over an [`Evaluation`] returning a [`Verdict`].
//! The engine runs them in [`GuardKind::ORDER`] and stops at the first deny.
//! Any collaborator error fails the guard closed as `DataAccessFailure`
//! without destructive side effects.

use chrono::{DateTime, Utc};

use crate::collaborators::Collaborators;
use crate::config::AuthzConfig;
use crate::decision::{DenyReason, GuardKind, SideEffects, Verdict};
use crate::error::StoreError;
use crate::intent::SessionIntentStore;
use crate::roles::Role;
use crate::second_factor::SecondFactorKind;
use crate::space::{LoginIntent, Space};
use crate::tenant::TenantContext;
use crate::{Principal, TenantMembership};

/// Inputs and facts gathered while evaluating one navigation.
///
/// Lives for a single evaluation; facts fetched by one guard (intent, roles,
/// membership) are reused by later guards but never across evaluations.
pub(crate) struct Evaluation<'a> {
    pub(crate) principal: &'a Principal,
    pub(crate) route: Option<Space>,
    pub(crate) tenant: Option<&'a TenantContext>,
    pub(crate) now: DateTime<Utc>,
    pub(crate) config: &'a AuthzConfig,
    pub(crate) stores: &'a Collaborators,
    pub(crate) intent_store: &'a dyn SessionIntentStore,
    pub(crate) intent: Option<LoginIntent>,
    roles: Option<Vec<Role>>,
    membership: Option<Option<TenantMembership>>,
}

impl<'a> Evaluation<'a> {
    pub(crate) fn new(
        principal: &'a Principal,
        path: &str,
        tenant: Option<&'a TenantContext>,
        now: DateTime<Utc>,
        config: &'a AuthzConfig,
        stores: &'a Collaborators,
        intent_store: &'a dyn SessionIntentStore,
    ) -> Self {
        Self {
            principal,
            route: Space::required_for(path),
            tenant,
            now,
            config,
            stores,
            intent_store,
            intent: None,
            roles: None,
            membership: None,
        }
    }

    async fn roles(&mut self) -> Result<Vec<Role>, StoreError> {
        if let Some(roles) = &self.roles {
            return Ok(roles.clone());
        }
        let roles = self.stores.roles.roles(self.principal.id).await?;
        self.roles = Some(roles.clone());
        Ok(roles)
    }

    async fn membership(&mut self) -> Result<Option<TenantMembership>, StoreError> {
        if let Some(membership) = &self.membership {
            return Ok(membership.clone());
        }
        let membership = self.stores.memberships.membership(self.principal.id).await?;
        self.membership = Some(membership.clone());
        Ok(membership)
    }
}

macro_rules! fetch {
    ($guard:expr, $call:expr) => {
        match $call {
            Ok(value) => value,
            Err(err) => return data_failure($guard, &err),
        }
    };
}

fn data_failure(guard: GuardKind, err: &StoreError) -> Verdict {
    // Logged apart from genuine denials so operators can alert on infrastructure
    // faults; the outcome is the same deny.
    tracing::error!(guard = %guard, error = %err, "collaborator failure during authorization");
    Verdict::deny(DenyReason::DataAccessFailure, guard, SideEffects::NONE)
}

/// Run one guard.
pub(crate) async fn check(guard: GuardKind, ev: &mut Evaluation<'_>) -> Verdict {
    let verdict = match guard {
        GuardKind::Identity => identity(ev).await,
        GuardKind::Account => account(ev).await,
        GuardKind::Intent => intent(ev),
        GuardKind::SpacePath => space_path(ev),
        GuardKind::TenantDomain => tenant_domain(ev).await,
        GuardKind::SpaceViolation => space_violation(ev),
        GuardKind::SecondFactor => second_factor(ev).await,
        GuardKind::RouteRole => route_role(ev).await,
    };

    if verdict == Verdict::Allow {
        tracing::debug!(guard = %guard, principal = %ev.principal.id, "guard passed");
    }
    verdict
}

async fn identity(ev: &mut Evaluation<'_>) -> Verdict {
    let deny = Verdict::deny(
        DenyReason::SessionInvalid,
        GuardKind::Identity,
        SideEffects::SIGN_OUT,
    );

    if !ev.principal.session_valid {
        return deny;
    }

    let session = fetch!(GuardKind::Identity, ev.stores.sessions.current_session().await);
    match session {
        Some(s) if s.valid && s.principal_id == ev.principal.id => Verdict::Allow,
        _ => deny,
    }
}

async fn account(ev: &mut Evaluation<'_>) -> Verdict {
    let profile = fetch!(GuardKind::Account, ev.stores.profiles.profile(ev.principal.id).await);
    match profile {
        Some(p) if p.is_active() => Verdict::Allow,
        _ => Verdict::deny(
            DenyReason::AccountInactiveOrMissing,
            GuardKind::Account,
            SideEffects::SIGN_OUT,
        ),
    }
}

fn intent(ev: &mut Evaluation<'_>) -> Verdict {
    let stored = fetch!(GuardKind::Intent, ev.intent_store.get());
    match stored {
        Some(intent) => {
            ev.intent = Some(intent);
            Verdict::Allow
        }
        None => Verdict::deny(
            DenyReason::MissingLoginIntent,
            GuardKind::Intent,
            SideEffects {
                clear_intent: true,
                force_sign_out: ev.tenant.is_some() || ev.config.sign_out_on_missing_intent,
            },
        ),
    }
}

fn space_path(ev: &mut Evaluation<'_>) -> Verdict {
    match ev.route {
        Some(required) if ev.intent != Some(required) => Verdict::deny(
            DenyReason::SpacePathMismatch,
            GuardKind::SpacePath,
            SideEffects::CLEAR_AND_SIGN_OUT,
        ),
        _ => Verdict::Allow,
    }
}

async fn tenant_domain(ev: &mut Evaluation<'_>) -> Verdict {
    let Some(tenant) = ev.tenant else {
        return Verdict::Allow;
    };

    if tenant.is_suspended() {
        return Verdict::deny(
            DenyReason::TenantSuspended,
            GuardKind::TenantDomain,
            SideEffects::CLEAR_INTENT,
        );
    }

    if ev.intent == Some(Space::King) {
        return Verdict::deny(
            DenyReason::CrossSpaceViolation,
            GuardKind::TenantDomain,
            SideEffects::CLEAR_INTENT,
        );
    }

    let membership = fetch!(GuardKind::TenantDomain, ev.membership().await);
    match membership {
        Some(m) if m.tenant_slug == tenant.slug => Verdict::Allow,
        _ => Verdict::deny(
            DenyReason::TenantMismatch,
            GuardKind::TenantDomain,
            SideEffects::CLEAR_AND_SIGN_OUT,
        ),
    }
}

fn space_violation(ev: &mut Evaluation<'_>) -> Verdict {
    match (ev.intent, ev.route) {
        (Some(intent), Some(route)) if intent.forbidden_routes().contains(&route) => Verdict::deny(
            DenyReason::CrossSpaceViolation,
            GuardKind::SpaceViolation,
            SideEffects::CLEAR_AND_SIGN_OUT,
        ),
        _ => Verdict::Allow,
    }
}

async fn second_factor(ev: &mut Evaluation<'_>) -> Verdict {
    let roles = fetch!(GuardKind::SecondFactor, ev.roles().await);
    if !roles.iter().any(|role| ev.config.requires_second_factor(*role)) {
        return Verdict::Allow;
    }

    let latest = fetch!(
        GuardKind::SecondFactor,
        ev.stores
            .second_factors
            .latest_verification(ev.principal.id, SecondFactorKind::Login)
            .await
    );

    let fresh = latest.is_some_and(|record| {
        record.user_id == ev.principal.id
            && record.kind == SecondFactorKind::Login
            && record.is_fresh(ev.now, ev.config.second_factor_window())
    });

    if fresh {
        Verdict::Allow
    } else {
        Verdict::deny(
            DenyReason::StaleOrMissing2FA,
            GuardKind::SecondFactor,
            SideEffects::CLEAR_AND_SIGN_OUT,
        )
    }
}

async fn route_role(ev: &mut Evaluation<'_>) -> Verdict {
    let Some(route) = ev.route else {
        return Verdict::Allow;
    };

    let roles = fetch!(GuardKind::RouteRole, ev.roles().await);
    let id = ev.principal.id;

    let permitted = match route {
        Space::King => ev.intent == Some(Space::King) && roles.contains(&Role::King),
        Space::Team => {
            if ev.intent != Some(Space::Team) || roles.contains(&Role::King) {
                false
            } else {
                match fetch!(GuardKind::RouteRole, ev.membership().await) {
                    None => false,
                    Some(m) if m.is_platform_admin => true,
                    Some(m) => fetch!(
                        GuardKind::RouteRole,
                        ev.stores.tenant_roles.has_tenant_role(id, m.tenant_id).await
                    ),
                }
            }
        }
        Space::Client => {
            ev.intent == Some(Space::Client)
                && (roles.contains(&Role::Client)
                    || fetch!(
                        GuardKind::RouteRole,
                        ev.stores.client_records.has_client_record(id).await
                    ))
        }
    };

    if permitted {
        Verdict::Allow
    } else {
        Verdict::deny(DenyReason::InsufficientRole, GuardKind::RouteRole, SideEffects::NONE)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Duration;

    use super::*;
    use crate::second_factor::SecondFactorRecord;
    use crate::testing::{Fixture, MemoryIntent, Op, now, tenant};

    async fn run(
        guard: GuardKind,
        fixture: &Arc<Fixture>,
        intent: Option<Space>,
        path: &str,
        tenant: Option<&TenantContext>,
    ) -> Verdict {
        let principal = Principal::new(fixture.principal_id());
        let stores = fixture.collaborators();
        let store = MemoryIntent::default();
        let config = AuthzConfig::default();
        let mut ev = Evaluation::new(&principal, path, tenant, now(), &config, &stores, &store);
        ev.intent = intent;
        check(guard, &mut ev).await
    }

    fn reason(verdict: Verdict) -> Option<DenyReason> {
        match verdict {
            Verdict::Allow => None,
            Verdict::Deny(d) => Some(d.reason),
        }
    }

    #[tokio::test]
    async fn identity_requires_matching_valid_session() {
        let fixture = Fixture::client();
        assert_eq!(run(GuardKind::Identity, &fixture, None, "/", None).await, Verdict::Allow);

        fixture.update(|s| s.session.as_mut().unwrap().principal_id = crate::PrincipalId::new());
        let verdict = run(GuardKind::Identity, &fixture, None, "/", None).await;
        assert_eq!(
            verdict,
            Verdict::deny(DenyReason::SessionInvalid, GuardKind::Identity, SideEffects::SIGN_OUT)
        );

        fixture.update(|s| s.session = None);
        assert_eq!(
            reason(run(GuardKind::Identity, &fixture, None, "/", None).await),
            Some(DenyReason::SessionInvalid)
        );
    }

    #[tokio::test]
    async fn identity_rejects_locally_invalid_principal_without_remote_call() {
        let fixture = Fixture::client();
        let principal = Principal {
            id: fixture.principal_id(),
            session_valid: false,
        };
        let stores = fixture.collaborators();
        let store = MemoryIntent::default();
        let config = AuthzConfig::default();
        let mut ev = Evaluation::new(&principal, "/", None, now(), &config, &stores, &store);

        assert_eq!(
            reason(check(GuardKind::Identity, &mut ev).await),
            Some(DenyReason::SessionInvalid)
        );
        assert_eq!(fixture.calls(Op::Session), 0);
    }

    #[tokio::test]
    async fn account_inactive_or_missing() {
        let fixture = Fixture::client();
        fixture.update(|s| s.profile.as_mut().unwrap().is_active = None);
        assert_eq!(run(GuardKind::Account, &fixture, None, "/", None).await, Verdict::Allow);

        fixture.update(|s| s.profile.as_mut().unwrap().is_active = Some(false));
        assert_eq!(
            reason(run(GuardKind::Account, &fixture, None, "/", None).await),
            Some(DenyReason::AccountInactiveOrMissing)
        );

        fixture.update(|s| s.profile = None);
        assert_eq!(
            reason(run(GuardKind::Account, &fixture, None, "/", None).await),
            Some(DenyReason::AccountInactiveOrMissing)
        );
    }

    #[tokio::test]
    async fn missing_intent_signs_out_on_tenant_domains_regardless_of_policy() {
        let fixture = Fixture::client();
        let principal = Principal::new(fixture.principal_id());
        let stores = fixture.collaborators();
        let store = MemoryIntent::default();
        let config = AuthzConfig {
            sign_out_on_missing_intent: false,
            ..AuthzConfig::default()
        };
        let advisy = tenant("advisy");

        let mut ev = Evaluation::new(
            &principal,
            "/crm",
            Some(&advisy),
            now(),
            &config,
            &stores,
            &store,
        );
        assert_eq!(
            check(GuardKind::Intent, &mut ev).await,
            Verdict::deny(
                DenyReason::MissingLoginIntent,
                GuardKind::Intent,
                SideEffects::CLEAR_AND_SIGN_OUT,
            )
        );

        let mut ev = Evaluation::new(&principal, "/crm", None, now(), &config, &stores, &store);
        assert_eq!(
            check(GuardKind::Intent, &mut ev).await,
            Verdict::deny(
                DenyReason::MissingLoginIntent,
                GuardKind::Intent,
                SideEffects::CLEAR_INTENT,
            )
        );
    }

    #[tokio::test]
    async fn intent_guard_records_intent_for_later_guards() {
        let fixture = Fixture::client();
        let principal = Principal::new(fixture.principal_id());
        let stores = fixture.collaborators();
        let store = MemoryIntent::with(Space::Client);
        let config = AuthzConfig::default();
        let mut ev = Evaluation::new(&principal, "/", None, now(), &config, &stores, &store);

        assert_eq!(check(GuardKind::Intent, &mut ev).await, Verdict::Allow);
        assert_eq!(ev.intent, Some(Space::Client));
    }

    #[tokio::test]
    async fn space_path_mismatch() {
        let fixture = Fixture::client();
        let verdict = run(
            GuardKind::SpacePath,
            &fixture,
            Some(Space::Team),
            "/king/dashboard",
            None,
        )
        .await;
        assert_eq!(
            verdict,
            Verdict::deny(
                DenyReason::SpacePathMismatch,
                GuardKind::SpacePath,
                SideEffects::CLEAR_AND_SIGN_OUT,
            )
        );
        assert_eq!(
            run(GuardKind::SpacePath, &fixture, Some(Space::Team), "/settings", None).await,
            Verdict::Allow
        );
    }

    #[tokio::test]
    async fn tenant_domain_rejects_king_intent_without_sign_out() {
        let fixture = Fixture::team(Role::Agent, "advisy");
        let advisy = tenant("advisy");
        let verdict = run(
            GuardKind::TenantDomain,
            &fixture,
            Some(Space::King),
            "/",
            Some(&advisy),
        )
        .await;
        assert_eq!(
            verdict,
            Verdict::deny(
                DenyReason::CrossSpaceViolation,
                GuardKind::TenantDomain,
                SideEffects::CLEAR_INTENT,
            )
        );
        assert_eq!(fixture.calls(Op::Membership), 0);
    }

    #[tokio::test]
    async fn tenant_domain_requires_matching_membership() {
        let fixture = Fixture::team(Role::Agent, "otherfirm");
        let advisy = tenant("advisy");
        assert_eq!(
            reason(
                run(GuardKind::TenantDomain, &fixture, Some(Space::Team), "/crm", Some(&advisy))
                    .await
            ),
            Some(DenyReason::TenantMismatch)
        );

        fixture.update(|s| s.membership = None);
        assert_eq!(
            reason(
                run(GuardKind::TenantDomain, &fixture, Some(Space::Team), "/crm", Some(&advisy))
                    .await
            ),
            Some(DenyReason::TenantMismatch)
        );

        let fixture = Fixture::team(Role::Agent, "advisy");
        assert_eq!(
            run(GuardKind::TenantDomain, &fixture, Some(Space::Team), "/crm", Some(&advisy)).await,
            Verdict::Allow
        );
    }

    #[tokio::test]
    async fn tenant_domain_rejects_suspended_tenant() {
        let fixture = Fixture::team(Role::Agent, "advisy");
        let mut advisy = tenant("advisy");
        advisy.status = crate::tenant::TenantStatus::Suspended;
        assert_eq!(
            run(GuardKind::TenantDomain, &fixture, Some(Space::Team), "/crm", Some(&advisy)).await,
            Verdict::deny(
                DenyReason::TenantSuspended,
                GuardKind::TenantDomain,
                SideEffects::CLEAR_INTENT,
            )
        );
    }

    #[tokio::test]
    async fn tenant_domain_skipped_on_platform_host() {
        let fixture = Fixture::king();
        assert_eq!(
            run(GuardKind::TenantDomain, &fixture, Some(Space::King), "/king", None).await,
            Verdict::Allow
        );
        assert_eq!(fixture.calls(Op::Membership), 0);
    }

    #[tokio::test]
    async fn space_violation_table() {
        let fixture = Fixture::client();
        let cases = [
            (Space::Client, "/crm", false),
            (Space::Client, "/king", false),
            (Space::Client, "/espace-client", true),
            (Space::Team, "/espace-client", false),
            (Space::Team, "/king", false),
            (Space::Team, "/crm", true),
            (Space::King, "/espace-client", false),
            (Space::King, "/crm", false),
            (Space::King, "/king", true),
            (Space::King, "/profile", true),
        ];
        for (intent, path, allowed) in cases {
            let verdict = run(GuardKind::SpaceViolation, &fixture, Some(intent), path, None).await;
            assert_eq!(verdict == Verdict::Allow, allowed, "{intent} on {path}");
        }
    }

    #[tokio::test]
    async fn second_factor_freshness() {
        let fixture = Fixture::team(Role::Manager, "advisy");
        let id = fixture.principal_id();
        assert_eq!(
            run(GuardKind::SecondFactor, &fixture, Some(Space::Team), "/crm", None).await,
            Verdict::Allow
        );

        fixture.update(|s| {
            s.verification = Some(SecondFactorRecord::login(id, now() - Duration::minutes(125)))
        });
        assert_eq!(
            run(GuardKind::SecondFactor, &fixture, Some(Space::Team), "/crm", None).await,
            Verdict::deny(
                DenyReason::StaleOrMissing2FA,
                GuardKind::SecondFactor,
                SideEffects::CLEAR_AND_SIGN_OUT,
            )
        );

        fixture.update(|s| s.verification = None);
        assert_eq!(
            reason(run(GuardKind::SecondFactor, &fixture, Some(Space::Team), "/crm", None).await),
            Some(DenyReason::StaleOrMissing2FA)
        );
    }

    #[tokio::test]
    async fn second_factor_rejects_record_of_another_user() {
        let fixture = Fixture::client();
        fixture.update(|s| {
            s.verification = Some(SecondFactorRecord::login(crate::PrincipalId::new(), now()));
        });
        assert_eq!(
            reason(run(GuardKind::SecondFactor, &fixture, Some(Space::Client), "/", None).await),
            Some(DenyReason::StaleOrMissing2FA)
        );
    }

    #[tokio::test]
    async fn second_factor_not_required_without_listed_roles() {
        let fixture = Fixture::client();
        fixture.update(|s| {
            s.roles = vec![];
            s.verification = None;
        });
        assert_eq!(
            run(GuardKind::SecondFactor, &fixture, Some(Space::Client), "/", None).await,
            Verdict::Allow
        );
        assert_eq!(fixture.calls(Op::SecondFactor), 0);
    }

    #[tokio::test]
    async fn king_route_requires_king_role() {
        let fixture = Fixture::king();
        assert_eq!(
            run(GuardKind::RouteRole, &fixture, Some(Space::King), "/king/tenants", None).await,
            Verdict::Allow
        );

        fixture.update(|s| s.roles = vec![Role::Admin]);
        assert_eq!(
            run(GuardKind::RouteRole, &fixture, Some(Space::King), "/king/tenants", None).await,
            Verdict::deny(DenyReason::InsufficientRole, GuardKind::RouteRole, SideEffects::NONE)
        );
    }

    #[tokio::test]
    async fn team_route_via_platform_admin_skips_tenant_role_lookup() {
        let fixture = Fixture::team(Role::Admin, "advisy");
        fixture.update(|s| {
            s.membership.as_mut().unwrap().is_platform_admin = true;
            s.tenant_role = false;
        });
        assert_eq!(
            run(GuardKind::RouteRole, &fixture, Some(Space::Team), "/crm", None).await,
            Verdict::Allow
        );
        assert_eq!(fixture.calls(Op::TenantRole), 0);
    }

    #[tokio::test]
    async fn team_route_denials() {
        let fixture = Fixture::team(Role::Agent, "advisy");
        assert_eq!(
            run(GuardKind::RouteRole, &fixture, Some(Space::Team), "/crm", None).await,
            Verdict::Allow
        );

        fixture.update(|s| s.tenant_role = false);
        assert_eq!(
            reason(run(GuardKind::RouteRole, &fixture, Some(Space::Team), "/crm", None).await),
            Some(DenyReason::InsufficientRole)
        );

        // King holders never work in the team space.
        fixture.update(|s| {
            s.tenant_role = true;
            s.roles = vec![Role::Agent, Role::King];
        });
        assert_eq!(
            reason(run(GuardKind::RouteRole, &fixture, Some(Space::Team), "/crm", None).await),
            Some(DenyReason::InsufficientRole)
        );

        fixture.update(|s| {
            s.roles = vec![Role::Agent];
            s.membership = None;
        });
        assert_eq!(
            reason(run(GuardKind::RouteRole, &fixture, Some(Space::Team), "/crm", None).await),
            Some(DenyReason::InsufficientRole)
        );
    }

    #[tokio::test]
    async fn client_route_accepts_role_or_record() {
        let fixture = Fixture::client();
        fixture.update(|s| s.client_record = false);
        assert_eq!(
            run(GuardKind::RouteRole, &fixture, Some(Space::Client), "/espace-client", None).await,
            Verdict::Allow
        );

        fixture.update(|s| {
            s.roles = vec![Role::Partner];
            s.client_record = true;
        });
        assert_eq!(
            run(GuardKind::RouteRole, &fixture, Some(Space::Client), "/espace-client", None).await,
            Verdict::Allow
        );

        fixture.update(|s| s.client_record = false);
        assert_eq!(
            reason(
                run(GuardKind::RouteRole, &fixture, Some(Space::Client), "/espace-client", None)
                    .await
            ),
            Some(DenyReason::InsufficientRole)
        );
    }

    #[tokio::test]
    async fn collaborator_errors_fail_closed_without_sign_out() {
        let cases = [
            (GuardKind::Identity, Op::Session, "/"),
            (GuardKind::Account, Op::Profile, "/"),
            (GuardKind::SecondFactor, Op::Roles, "/"),
            (GuardKind::SecondFactor, Op::SecondFactor, "/"),
            (GuardKind::RouteRole, Op::ClientRecord, "/espace-client"),
        ];
        for (guard, op, path) in cases {
            let fixture = Fixture::client();
            fixture.update(|s| s.roles = vec![Role::Agent]);
            fixture.fail(op);
            let verdict = run(guard, &fixture, Some(Space::Client), path, None).await;
            assert_eq!(
                verdict,
                Verdict::deny(DenyReason::DataAccessFailure, guard, SideEffects::NONE),
                "{op:?}"
            );
        }
    }

    #[tokio::test]
    async fn intent_storage_error_fails_closed() {
        let fixture = Fixture::client();
        let principal = Principal::new(fixture.principal_id());
        let stores = fixture.collaborators();
        let store = MemoryIntent::with(Space::Client);
        store.break_storage();
        let config = AuthzConfig::default();
        let mut ev = Evaluation::new(&principal, "/", None, now(), &config, &stores, &store);

        assert_eq!(
            check(GuardKind::Intent, &mut ev).await,
            Verdict::deny(DenyReason::DataAccessFailure, GuardKind::Intent, SideEffects::NONE)
        );
    }
}
