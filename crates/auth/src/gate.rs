//! Renderer-side driver: one authorization evaluation in flight at a time.
//!
//! Every (principal, path) change triggers a new generation. Results are only
//! applied when their generation is still the latest one; anything older is
//! dropped without touching the intent record or the session.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;

use lyta_core::IncidentId;

use crate::decision::{AuthorizationDecision, SideEffects};
use crate::engine::AuthorizationEngine;
use crate::{Principal, PrincipalId};

/// What the renderer should do after a navigation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum NavigationOutcome {
    Render,
    /// Uniform for every denial; `incident` correlates with the server-side log.
    RedirectToLogin { location: String, incident: IncidentId },
    /// The same navigation is already being evaluated.
    AlreadyInFlight,
    /// A newer navigation started before this one finished.
    Superseded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct NavigationKey {
    principal: PrincipalId,
    path: String,
}

#[derive(Debug)]
enum GateState {
    Idle,
    Evaluating { generation: u64, key: NavigationKey },
}

#[derive(Debug)]
struct GateInner {
    state: GateState,
    generation: u64,
    /// Principals this gate signed out and who have shown no live session
    /// since. Cleared on their next allow or next live session.
    signed_out: HashSet<PrincipalId>,
}

#[derive(Debug)]
pub struct NavigationGate {
    engine: Arc<AuthorizationEngine>,
    host: String,
    tenant_override: Option<String>,
    inner: Mutex<GateInner>,
}

impl NavigationGate {
    pub fn new(
        engine: Arc<AuthorizationEngine>,
        host: impl Into<String>,
        tenant_override: Option<String>,
    ) -> Self {
        Self {
            engine,
            host: host.into(),
            tenant_override,
            inner: Mutex::new(GateInner {
                state: GateState::Idle,
                generation: 0,
                signed_out: HashSet::new(),
            }),
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.lock().state, GateState::Idle)
    }

    pub async fn navigate(&self, principal: &Principal, path: &str) -> NavigationOutcome {
        self.navigate_at(principal, path, Utc::now()).await
    }

    pub async fn navigate_at(
        &self,
        principal: &Principal,
        path: &str,
        now: DateTime<Utc>,
    ) -> NavigationOutcome {
        let key = NavigationKey {
            principal: principal.id,
            path: path.to_string(),
        };
        let Some(generation) = self.begin(key) else {
            tracing::debug!(principal = %principal.id, path, "navigation already being evaluated");
            return NavigationOutcome::AlreadyInFlight;
        };

        let decision = self
            .engine
            .evaluate_origin(principal, path, &self.host, self.tenant_override.as_deref(), now)
            .await;

        if !self.finish(generation, principal.id, &decision) {
            tracing::debug!(
                principal = %principal.id,
                path,
                generation,
                "discarding superseded decision"
            );
            return NavigationOutcome::Superseded;
        }

        if decision.allowed {
            return NavigationOutcome::Render;
        }

        let incident = IncidentId::new();
        tracing::warn!(
            incident = %incident,
            principal = %principal.id,
            host = %self.host,
            path,
            reason = ?decision.reason,
            guard = ?decision.guard,
            "navigation denied"
        );

        self.apply(decision.side_effects, principal.id).await;

        NavigationOutcome::RedirectToLogin {
            location: self.engine.config().login_path.clone(),
            incident,
        }
    }

    fn lock(&self) -> MutexGuard<'_, GateInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a generation for `key`, or `None` if `key` is already in flight.
    fn begin(&self, key: NavigationKey) -> Option<u64> {
        let mut inner = self.lock();
        if let GateState::Evaluating { key: current, .. } = &inner.state {
            if *current == key {
                return None;
            }
        }
        inner.generation += 1;
        let generation = inner.generation;
        inner.state = GateState::Evaluating { generation, key };
        Some(generation)
    }

    /// Settle `generation`. Returns `false` when it was superseded.
    fn finish(
        &self,
        generation: u64,
        principal: PrincipalId,
        decision: &AuthorizationDecision,
    ) -> bool {
        let mut inner = self.lock();
        if inner.generation != generation {
            return false;
        }
        inner.state = GateState::Idle;
        if decision.allowed {
            inner.signed_out.remove(&principal);
        }
        true
    }

    /// Whether a forced sign-out still has a session to end.
    ///
    /// A live session seen after this gate signed the principal out means a
    /// new login happened (or the earlier sign-out did not stick), so the
    /// principal is no longer considered signed out.
    async fn needs_sign_out(&self, principal: PrincipalId) -> bool {
        let live = match self.engine.collaborators().sessions.current_session().await {
            Ok(session) => session.is_some_and(|s| s.valid),
            Err(err) => {
                tracing::warn!(
                    host = %self.host,
                    error = %err,
                    "session state unknown before sign-out"
                );
                true
            }
        };

        let mut inner = self.lock();
        if live {
            inner.signed_out.remove(&principal);
            return true;
        }
        !inner.signed_out.contains(&principal)
    }

    async fn apply(&self, effects: SideEffects, principal: PrincipalId) {
        if effects.clear_intent {
            match self.engine.intent_store().clear() {
                Ok(()) => tracing::info!(host = %self.host, "login intent cleared"),
                Err(err) => {
                    tracing::error!(host = %self.host, error = %err, "failed to clear login intent")
                }
            }
        }

        if !effects.force_sign_out || !self.needs_sign_out(principal).await {
            return;
        }

        match self.engine.collaborators().sign_out.sign_out().await {
            Ok(()) => {
                self.lock().signed_out.insert(principal);
                tracing::info!(host = %self.host, principal = %principal, "session signed out");
            }
            Err(err) => {
                tracing::error!(
                    host = %self.host,
                    principal = %principal,
                    error = %err,
                    "forced sign-out failed"
                )
            }
        }
    }
}
