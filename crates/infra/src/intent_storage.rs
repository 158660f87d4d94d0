//! Origin-scoped login intent storage.
//!
//! Mirrors browser local storage: one record per origin, with no sharing
//! between sibling subdomains. Engines receive a [`DomainIntentStore`] handle
//! bound to the origin they serve.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use lyta_auth::{LoginIntent, Role, SessionIntentStore, StoreError};

/// What one origin remembers about the last login made on it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentRecord {
    pub intent: Option<LoginIntent>,
    pub active_role: Option<Role>,
}

#[derive(Debug, Default)]
pub struct InMemoryIntentStorage {
    origins: RwLock<HashMap<String, IntentRecord>>,
    disabled: AtomicBool,
}

impl InMemoryIntentStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle bound to `origin`.
    pub fn for_origin(self: &Arc<Self>, origin: &str) -> DomainIntentStore {
        DomainIntentStore {
            storage: self.clone(),
            origin: origin_key(origin),
        }
    }

    pub fn record(&self, origin: &str) -> IntentRecord {
        let origins = self.origins.read().unwrap_or_else(PoisonError::into_inner);
        origins.get(&origin_key(origin)).copied().unwrap_or_default()
    }

    /// Simulate storage being blocked (private mode, quota exceeded).
    pub fn set_disabled(&self, disabled: bool) {
        self.disabled.store(disabled, Ordering::SeqCst);
    }

    fn read(&self, origin: &str) -> Result<IntentRecord, StoreError> {
        self.check()?;
        let origins = self.origins.read().unwrap_or_else(PoisonError::into_inner);
        Ok(origins.get(origin).copied().unwrap_or_default())
    }

    fn write(&self, origin: &str, f: impl FnOnce(&mut IntentRecord)) -> Result<(), StoreError> {
        self.check()?;
        let mut origins = self.origins.write().unwrap_or_else(PoisonError::into_inner);
        f(origins.entry(origin.to_string()).or_default());
        Ok(())
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.disabled.load(Ordering::SeqCst) {
            return Err(StoreError::backend("intent storage disabled"));
        }
        Ok(())
    }
}

fn origin_key(origin: &str) -> String {
    origin.trim().trim_end_matches('.').to_ascii_lowercase()
}

/// [`SessionIntentStore`] for a single origin.
#[derive(Debug, Clone)]
pub struct DomainIntentStore {
    storage: Arc<InMemoryIntentStorage>,
    origin: String,
}

impl DomainIntentStore {
    pub fn origin(&self) -> &str {
        &self.origin
    }
}

impl SessionIntentStore for DomainIntentStore {
    fn get(&self) -> Result<Option<LoginIntent>, StoreError> {
        Ok(self.storage.read(&self.origin)?.intent)
    }

    fn set(&self, intent: LoginIntent) -> Result<(), StoreError> {
        self.storage.write(&self.origin, |r| r.intent = Some(intent))
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.storage.write(&self.origin, |r| *r = IntentRecord::default())
    }

    fn set_active_role(&self, role: Role) -> Result<(), StoreError> {
        self.storage.write(&self.origin, |r| r.active_role = Some(role))
    }

    fn active_role(&self) -> Result<Option<Role>, StoreError> {
        Ok(self.storage.read(&self.origin)?.active_role)
    }
}
