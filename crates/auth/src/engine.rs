//! Session-authorization decision engine.
//!
//! Folds the guards in [`GuardKind::ORDER`] left to right and stops at the first
//! deny. The engine holds no state between evaluations: every collaborator is
//! queried afresh, so a decision is a pure function of the snapshot it saw.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use lyta_core::TenantSlug;

use crate::collaborators::Collaborators;
use crate::config::AuthzConfig;
use crate::decision::{AuthorizationDecision, Denial, DenyReason, GuardKind, SideEffects, Verdict};
use crate::guards::{self, Evaluation};
use crate::intent::SessionIntentStore;
use crate::tenant::{TenantContext, TenantResolver};
use crate::Principal;

/// Authorization engine bound to one domain's intent storage.
pub struct AuthorizationEngine {
    config: AuthzConfig,
    resolver: TenantResolver,
    stores: Collaborators,
    intent: Arc<dyn SessionIntentStore>,
}

impl AuthorizationEngine {
    pub fn new(
        config: AuthzConfig,
        stores: Collaborators,
        intent: Arc<dyn SessionIntentStore>,
    ) -> Self {
        Self {
            resolver: TenantResolver::from_config(&config),
            config,
            stores,
            intent,
        }
    }

    pub fn config(&self) -> &AuthzConfig {
        &self.config
    }

    pub fn resolver(&self) -> &TenantResolver {
        &self.resolver
    }

    pub fn collaborators(&self) -> &Collaborators {
        &self.stores
    }

    pub fn intent_store(&self) -> &dyn SessionIntentStore {
        self.intent.as_ref()
    }

    /// Decide whether `principal` may view `path` under `tenant`.
    pub async fn evaluate(
        &self,
        principal: &Principal,
        path: &str,
        tenant: Option<&TenantContext>,
    ) -> AuthorizationDecision {
        self.evaluate_at(principal, path, tenant, Utc::now()).await
    }

    /// Same as [`evaluate`](Self::evaluate) with an explicit clock reading.
    pub async fn evaluate_at(
        &self,
        principal: &Principal,
        path: &str,
        tenant: Option<&TenantContext>,
        now: DateTime<Utc>,
    ) -> AuthorizationDecision {
        let mut ev = Evaluation::new(
            principal,
            path,
            tenant,
            now,
            &self.config,
            &self.stores,
            self.intent.as_ref(),
        );

        for guard in GuardKind::ORDER {
            if let Verdict::Deny(denial) = guards::check(guard, &mut ev).await {
                tracing::debug!(
                    principal = %principal.id,
                    path,
                    guard = %denial.guard,
                    reason = %denial.reason,
                    "navigation denied"
                );
                return AuthorizationDecision::denied(denial);
            }
        }

        AuthorizationDecision::allow()
    }

    /// Resolve the tenant addressed by `host` and evaluate against it.
    pub async fn evaluate_origin(
        &self,
        principal: &Principal,
        path: &str,
        host: &str,
        tenant_override: Option<&str>,
        now: DateTime<Utc>,
    ) -> AuthorizationDecision {
        match self.resolve_tenant(host, tenant_override).await {
            Ok(tenant) => self.evaluate_at(principal, path, tenant.as_ref(), now).await,
            Err(denial) => AuthorizationDecision::denied(denial),
        }
    }

    /// Host → tenant context.
    ///
    /// `Ok(None)` is the shared platform host. A slug that names no tenant is a
    /// denial indistinguishable from any other.
    pub async fn resolve_tenant(
        &self,
        host: &str,
        tenant_override: Option<&str>,
    ) -> Result<Option<TenantContext>, Denial> {
        let Some(candidate) = self.resolver.resolve(host, tenant_override) else {
            return Ok(None);
        };

        let unknown = Denial {
            reason: DenyReason::TenantMismatch,
            guard: GuardKind::TenantDomain,
            side_effects: SideEffects::NONE,
        };

        let Ok(slug) = TenantSlug::parse(&candidate) else {
            tracing::warn!(
                host,
                candidate = %candidate,
                "host resolves to a malformed tenant slug"
            );
            return Err(unknown);
        };

        match self.stores.tenants.find_by_slug(&slug).await {
            Ok(Some(tenant)) => Ok(Some(tenant)),
            Ok(None) => {
                tracing::warn!(host, slug = %slug, "host addresses an unknown tenant");
                Err(unknown)
            }
            Err(err) => {
                tracing::error!(host, slug = %slug, error = %err, "tenant lookup failed");
                Err(Denial {
                    reason: DenyReason::DataAccessFailure,
                    ..unknown
                })
            }
        }
    }
}

impl core::fmt::Debug for AuthorizationEngine {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AuthorizationEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
