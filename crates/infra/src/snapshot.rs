//! A serialized world state plus one navigation to evaluate against it.
//!
//! Used by `lyta-probe` to answer "would this navigation be allowed?" offline.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use lyta_auth::{
    AuthorizationDecision, AuthzConfig, ConfigError, Principal, PrincipalId, Session,
    SessionIntentStore, StoreError, TenantContext,
};

use crate::directory::{InMemoryDirectory, PrincipalRecord};
use crate::intent_storage::IntentRecord;
use crate::portal::Portal;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("malformed snapshot: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to seed snapshot: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Navigation {
    pub principal: PrincipalId,
    pub host: String,
    pub path: String,
    #[serde(default)]
    pub tenant_override: Option<String>,
    /// Defaults to the current time.
    #[serde(default)]
    pub now: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub config: AuthzConfig,
    #[serde(default)]
    pub tenants: Vec<TenantContext>,
    #[serde(default)]
    pub principals: Vec<PrincipalRecord>,
    #[serde(default)]
    pub session: Option<Session>,
    /// Intent records keyed by origin.
    #[serde(default)]
    pub intents: HashMap<String, IntentRecord>,
    pub navigation: Navigation,
}

/// Decision plus the inputs it was made for.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeReport {
    pub host: String,
    pub path: String,
    pub tenant: Option<String>,
    pub decision: AuthorizationDecision,
}

impl Snapshot {
    pub fn from_json(raw: &str) -> Result<Self, SnapshotError> {
        let snapshot: Snapshot = serde_json::from_str(raw)?;
        snapshot.config.validate()?;
        Ok(snapshot)
    }

    /// Build a portal holding exactly the state this snapshot describes.
    pub fn portal(&self) -> Result<Portal, SnapshotError> {
        let directory = Arc::new(InMemoryDirectory::new());
        for tenant in &self.tenants {
            directory.upsert_tenant(tenant.clone());
        }
        for record in &self.principals {
            directory.upsert_principal(record.clone());
        }

        let portal = Portal::with_directory(self.config.clone(), directory);

        if let Some(session) = self.session {
            portal.sessions().sign_in(session.principal_id);
            if !session.valid {
                portal.sessions().expire();
            }
        }

        for (origin, record) in &self.intents {
            let store = portal.intent_store(origin);
            if let Some(intent) = record.intent {
                store.set(intent)?;
            }
            if let Some(role) = record.active_role {
                store.set_active_role(role)?;
            }
        }

        Ok(portal)
    }

    /// Evaluate the snapshot's navigation. Never mutates the snapshot state.
    pub async fn evaluate(&self) -> Result<ProbeReport, SnapshotError> {
        let portal = self.portal()?;
        let nav = &self.navigation;
        let engine = portal.engine_for(&nav.host);

        let tenant = engine.resolver().resolve(&nav.host, nav.tenant_override.as_deref());
        let decision = engine
            .evaluate_origin(
                &Principal::new(nav.principal),
                &nav.path,
                &nav.host,
                nav.tenant_override.as_deref(),
                nav.now.unwrap_or_else(Utc::now),
            )
            .await;

        Ok(ProbeReport {
            host: nav.host.clone(),
            path: nav.path.clone(),
            tenant,
            decision,
        })
    }
}
