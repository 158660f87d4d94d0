use core::str::FromStr;

use serde::{Deserialize, Serialize};

use lyta_core::DomainError;

/// Role assigned to a principal by the role store.
///
/// A principal may hold several roles at once; the set is re-fetched on every
/// evaluation and never derived from client-side state.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    King,
    Admin,
    Manager,
    Agent,
    Backoffice,
    Compta,
    Partner,
    Client,
}

impl Role {
    /// Every recognized role.
    pub const ALL: [Role; 8] = [
        Role::King,
        Role::Admin,
        Role::Manager,
        Role::Agent,
        Role::Backoffice,
        Role::Compta,
        Role::Partner,
        Role::Client,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::King => "king",
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Agent => "agent",
            Role::Backoffice => "backoffice",
            Role::Compta => "compta",
            Role::Partner => "partner",
            Role::Client => "client",
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Role::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| DomainError::validation(format!("unknown role '{wanted}'")))
    }
}
