use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::PrincipalId;

/// Event a second-factor verification was performed for.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecondFactorKind {
    Login,
}

/// Timestamped proof of an out-of-band verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecondFactorRecord {
    pub user_id: PrincipalId,
    pub kind: SecondFactorKind,
    pub verified_at: DateTime<Utc>,
}

impl SecondFactorRecord {
    pub fn login(user_id: PrincipalId, verified_at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            kind: SecondFactorKind::Login,
            verified_at,
        }
    }

    /// `now - verified_at <= window`.
    ///
    /// Records dated in the future count as fresh (clock skew between the
    /// verifier and this host).
    pub fn is_fresh(&self, now: DateTime<Utc>, window: Duration) -> bool {
        now.signed_duration_since(self.verified_at) <= window
    }
}
