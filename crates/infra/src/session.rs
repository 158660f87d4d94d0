//! Server-side session backend for one browser.
//!
//! The session cookie is scoped to the parent domain, so every subdomain the
//! browser visits sees the same session. Signing out ends it everywhere.

use std::sync::{PoisonError, RwLock};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use lyta_auth::{PrincipalId, Session, SessionService, SignOut, StoreError};

#[derive(Debug, Default)]
pub struct InMemorySessions {
    current: RwLock<Option<Session>>,
    unavailable: AtomicBool,
    sign_outs: AtomicUsize,
}

impl InMemorySessions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sign_in(&self, principal: PrincipalId) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(Session {
            valid: true,
            principal_id: principal,
        });
        tracing::info!(principal = %principal, "session started");
    }

    /// Keep the session but mark it invalid, as after server-side revocation.
    pub fn expire(&self) {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(session) = current.as_mut() {
            session.valid = false;
        }
    }

    pub fn current(&self) -> Option<Session> {
        *self.current.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of sign-outs actually issued.
    pub fn sign_out_count(&self) -> usize {
        self.sign_outs.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::unavailable("session backend"));
        }
        Ok(())
    }
}

#[async_trait]
impl SessionService for InMemorySessions {
    async fn current_session(&self) -> Result<Option<Session>, StoreError> {
        self.check()?;
        Ok(self.current())
    }
}

#[async_trait]
impl SignOut for InMemorySessions {
    async fn sign_out(&self) -> Result<(), StoreError> {
        self.check()?;
        self.sign_outs.fetch_add(1, Ordering::SeqCst);
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}
