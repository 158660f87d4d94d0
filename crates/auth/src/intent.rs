//! Domain-scoped record of the space declared at login.

use crate::error::StoreError;
use crate::roles::Role;
use crate::space::LoginIntent;

/// Storage for the current domain's login intent.
///
/// Implementations must be scoped strictly to one domain/browsing context: a
/// record written on `app.lyta.ch` is never visible on `advisy.lyta.ch`. The
/// intent guard relies on this to stop a session cookie shared across the
/// parent domain from authorizing a subdomain the user never logged into.
pub trait SessionIntentStore: Send + Sync {
    fn get(&self) -> Result<Option<LoginIntent>, StoreError>;

    fn set(&self, intent: LoginIntent) -> Result<(), StoreError>;

    /// Remove the intent along with every UI-only marker (active role).
    fn clear(&self) -> Result<(), StoreError>;

    /// Role shown as "active" by the UI. Display only; never read by guards.
    fn set_active_role(&self, role: Role) -> Result<(), StoreError>;

    fn active_role(&self) -> Result<Option<Role>, StoreError>;
}

/// Record a successful login (credentials + second factor) on this domain.
///
/// Called by the login flow only; the engine never writes an intent.
pub fn record_login(
    store: &dyn SessionIntentStore,
    intent: LoginIntent,
    active_role: Option<Role>,
) -> Result<(), StoreError> {
    store.clear()?;
    store.set(intent)?;
    if let Some(role) = active_role {
        store.set_active_role(role)?;
    }
    tracing::info!(intent = %intent, "login intent recorded");
    Ok(())
}
