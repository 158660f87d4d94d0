//! `lyta-core` — identifiers and value types shared by every Lyta crate.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod error;
pub mod id;
pub mod slug;

pub use error::{DomainError, DomainResult};
pub use id::{IncidentId, TenantId};
pub use slug::TenantSlug;
