use serde::{Deserialize, Serialize};

/// Why a navigation was denied.
///
/// Diagnostic only: the renderer never shows which condition failed, so a
/// caller probing routes cannot tell tenant existence, role or 2FA state apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    SessionInvalid,
    AccountInactiveOrMissing,
    MissingLoginIntent,
    SpacePathMismatch,
    TenantMismatch,
    TenantSuspended,
    CrossSpaceViolation,
    #[serde(rename = "stale_or_missing_2fa")]
    StaleOrMissing2FA,
    InsufficientRole,
    DataAccessFailure,
}

impl DenyReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DenyReason::SessionInvalid => "session_invalid",
            DenyReason::AccountInactiveOrMissing => "account_inactive_or_missing",
            DenyReason::MissingLoginIntent => "missing_login_intent",
            DenyReason::SpacePathMismatch => "space_path_mismatch",
            DenyReason::TenantMismatch => "tenant_mismatch",
            DenyReason::TenantSuspended => "tenant_suspended",
            DenyReason::CrossSpaceViolation => "cross_space_violation",
            DenyReason::StaleOrMissing2FA => "stale_or_missing_2fa",
            DenyReason::InsufficientRole => "insufficient_role",
            DenyReason::DataAccessFailure => "data_access_failure",
        }
    }
}

impl core::fmt::Display for DenyReason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies one authorization check, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardKind {
    Identity,
    Account,
    Intent,
    SpacePath,
    TenantDomain,
    SpaceViolation,
    SecondFactor,
    RouteRole,
}

impl GuardKind {
    /// Fixed evaluation order. Each guard may assume all earlier ones passed.
    pub const ORDER: [GuardKind; 8] = [
        GuardKind::Identity,
        GuardKind::Account,
        GuardKind::Intent,
        GuardKind::SpacePath,
        GuardKind::TenantDomain,
        GuardKind::SpaceViolation,
        GuardKind::SecondFactor,
        GuardKind::RouteRole,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GuardKind::Identity => "identity",
            GuardKind::Account => "account",
            GuardKind::Intent => "intent",
            GuardKind::SpacePath => "space_path",
            GuardKind::TenantDomain => "tenant_domain",
            GuardKind::SpaceViolation => "space_violation",
            GuardKind::SecondFactor => "second_factor",
            GuardKind::RouteRole => "route_role",
        }
    }
}

impl core::fmt::Display for GuardKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Corrective actions the renderer must run before redirecting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SideEffects {
    pub clear_intent: bool,
    pub force_sign_out: bool,
}

impl SideEffects {
    pub const NONE: SideEffects = SideEffects {
        clear_intent: false,
        force_sign_out: false,
    };

    pub const SIGN_OUT: SideEffects = SideEffects {
        clear_intent: false,
        force_sign_out: true,
    };

    pub const CLEAR_INTENT: SideEffects = SideEffects {
        clear_intent: true,
        force_sign_out: false,
    };

    pub const CLEAR_AND_SIGN_OUT: SideEffects = SideEffects {
        clear_intent: true,
        force_sign_out: true,
    };

    pub fn is_empty(&self) -> bool {
        !self.clear_intent && !self.force_sign_out
    }
}

/// A denial produced by one guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Denial {
    pub reason: DenyReason,
    pub guard: GuardKind,
    pub side_effects: SideEffects,
}

/// Outcome of a single guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Allow,
    Deny(Denial),
}

impl Verdict {
    pub fn deny(reason: DenyReason, guard: GuardKind, side_effects: SideEffects) -> Self {
        Verdict::Deny(Denial {
            reason,
            guard,
            side_effects,
        })
    }
}

/// Final result of evaluating one (principal, path, tenant) triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationDecision {
    pub allowed: bool,
    /// Set on deny.
    pub reason: Option<DenyReason>,
    /// Guard that produced the denial.
    pub guard: Option<GuardKind>,
    pub side_effects: SideEffects,
}

impl AuthorizationDecision {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
            guard: None,
            side_effects: SideEffects::NONE,
        }
    }

    pub fn denied(denial: Denial) -> Self {
        Self {
            allowed: false,
            reason: Some(denial.reason),
            guard: Some(denial.guard),
            side_effects: denial.side_effects,
        }
    }
}

impl From<Verdict> for AuthorizationDecision {
    fn from(value: Verdict) -> Self {
        match value {
            Verdict::Allow => Self::allow(),
            Verdict::Deny(denial) => Self::denied(denial),
        }
    }
}
