//! `lyta-auth` — session authorization for the multi-tenant portal.
//!
//! Decides, for every protected navigation, whether the current principal may
//! view the requested space on the requested domain. Storage and HTTP stay on
//! the far side of the collaborator traits.

pub mod collaborators;
pub mod config;
pub mod decision;
pub mod engine;
pub mod error;
pub mod gate;
mod guards;
pub mod intent;
pub mod principal;
pub mod roles;
pub mod second_factor;
pub mod space;
pub mod tenant;

#[cfg(test)]
mod testing;

pub use collaborators::{
    ClientRecordStore, Collaborators, Profile, ProfileStore, RoleStore, SecondFactorStore, Session,
    SessionService, SignOut, TenantDirectory, TenantMembershipStore, TenantRoleStore,
};
pub use config::AuthzConfig;
pub use decision::{AuthorizationDecision, Denial, DenyReason, GuardKind, SideEffects, Verdict};
pub use engine::AuthorizationEngine;
pub use error::{ConfigError, StoreError};
pub use gate::{NavigationGate, NavigationOutcome};
pub use intent::{SessionIntentStore, record_login};
pub use principal::{Principal, PrincipalId, TenantMembership};
pub use roles::Role;
pub use second_factor::{SecondFactorKind, SecondFactorRecord};
pub use space::{LoginIntent, Space};
pub use tenant::{TenantContext, TenantResolver, TenantStatus};
