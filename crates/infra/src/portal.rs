//! Wires the in-memory backends into engines and gates per origin.

use std::sync::Arc;

use lyta_auth::{
    AuthorizationEngine, AuthzConfig, Collaborators, LoginIntent, NavigationGate, PrincipalId, Role,
    StoreError, record_login,
};

use crate::directory::InMemoryDirectory;
use crate::intent_storage::{DomainIntentStore, InMemoryIntentStorage};
use crate::session::InMemorySessions;

/// One browser talking to the portal, across any number of origins.
#[derive(Debug, Clone)]
pub struct Portal {
    config: AuthzConfig,
    directory: Arc<InMemoryDirectory>,
    sessions: Arc<InMemorySessions>,
    intents: Arc<InMemoryIntentStorage>,
}

impl Portal {
    pub fn new(config: AuthzConfig) -> Self {
        Self::with_directory(config, Arc::new(InMemoryDirectory::new()))
    }

    pub fn with_directory(config: AuthzConfig, directory: Arc<InMemoryDirectory>) -> Self {
        Self {
            config,
            directory,
            sessions: Arc::new(InMemorySessions::new()),
            intents: Arc::new(InMemoryIntentStorage::new()),
        }
    }

    pub fn config(&self) -> &AuthzConfig {
        &self.config
    }

    pub fn directory(&self) -> &Arc<InMemoryDirectory> {
        &self.directory
    }

    pub fn sessions(&self) -> &Arc<InMemorySessions> {
        &self.sessions
    }

    pub fn intents(&self) -> &Arc<InMemoryIntentStorage> {
        &self.intents
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            sessions: self.sessions.clone(),
            profiles: self.directory.clone(),
            roles: self.directory.clone(),
            memberships: self.directory.clone(),
            tenant_roles: self.directory.clone(),
            client_records: self.directory.clone(),
            second_factors: self.directory.clone(),
            sign_out: self.sessions.clone(),
            tenants: self.directory.clone(),
        }
    }

    pub fn intent_store(&self, origin: &str) -> DomainIntentStore {
        self.intents.for_origin(origin)
    }

    /// Engine whose intent guard reads `origin`'s storage.
    pub fn engine_for(&self, origin: &str) -> AuthorizationEngine {
        AuthorizationEngine::new(
            self.config.clone(),
            self.collaborators(),
            Arc::new(self.intent_store(origin)),
        )
    }

    pub fn gate_for(&self, origin: &str, tenant_override: Option<String>) -> NavigationGate {
        NavigationGate::new(Arc::new(self.engine_for(origin)), origin, tenant_override)
    }

    /// Complete a login on `origin`: start the session and record the intent
    /// in that origin's storage only.
    pub fn login(
        &self,
        principal: PrincipalId,
        origin: &str,
        intent: LoginIntent,
        active_role: Option<Role>,
    ) -> Result<(), StoreError> {
        self.sessions.sign_in(principal);
        record_login(&self.intent_store(origin), intent, active_role)
    }
}
