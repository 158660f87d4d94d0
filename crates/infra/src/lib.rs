//! Infrastructure layer: in-memory backends for the authorization collaborators.
//!
//! The engine only sees the traits in `lyta-auth`; this crate provides the
//! implementations used for local development, the probe and integration tests.

pub mod directory;
pub mod intent_storage;
pub mod portal;
pub mod session;
pub mod snapshot;


pub use directory::{InMemoryDirectory, Lookup, PrincipalRecord};
pub use intent_storage::{DomainIntentStore, InMemoryIntentStorage, IntentRecord};
pub use portal::Portal;
pub use session::InMemorySessions;
pub use snapshot::{Navigation, ProbeReport, Snapshot, SnapshotError};
