//! Authorization policy configuration.
//!
//! Loaded from the process environment (`LYTA_*` variables) or from a JSON
//! document. Values that fail to parse are errors, never silently defaulted.

use std::collections::BTreeSet;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::roles::Role;

pub const ENV_PREVIEW_DOMAIN_MARKER: &str = "LYTA_PREVIEW_DOMAIN_MARKER";
pub const ENV_SECOND_FACTOR_WINDOW_MINUTES: &str = "LYTA_SECOND_FACTOR_WINDOW_MINUTES";
pub const ENV_SECOND_FACTOR_ROLES: &str = "LYTA_SECOND_FACTOR_ROLES";
pub const ENV_SIGN_OUT_ON_MISSING_INTENT: &str = "LYTA_SIGN_OUT_ON_MISSING_INTENT";
pub const ENV_LOGIN_PATH: &str = "LYTA_LOGIN_PATH";

/// Default second-factor validity window.
pub const DEFAULT_SECOND_FACTOR_WINDOW_MINUTES: i64 = 120;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthzConfig {
    /// Hostnames containing this marker are preview deployments, never tenants.
    pub preview_domain_marker: Option<String>,

    /// First labels that never name a tenant.
    pub reserved_subdomains: Vec<String>,

    pub second_factor_window_minutes: i64,

    /// Roles whose holders must present a fresh second-factor verification.
    /// Currently every recognized role.
    pub second_factor_roles: BTreeSet<Role>,

    /// Force sign-out on a missing login intent even outside tenant domains.
    /// When `false`, sign-out is only forced on tenant domains.
    pub sign_out_on_missing_intent: bool,

    /// Login entry point every denial redirects to.
    pub login_path: String,
}

impl Default for AuthzConfig {
    fn default() -> Self {
        Self {
            preview_domain_marker: None,
            reserved_subdomains: vec!["www".into(), "app".into(), "api".into()],
            second_factor_window_minutes: DEFAULT_SECOND_FACTOR_WINDOW_MINUTES,
            second_factor_roles: Role::ALL.into_iter().collect(),
            sign_out_on_missing_intent: true,
            login_path: "/auth".into(),
        }
    }
}

impl AuthzConfig {
    /// A window chrono cannot represent collapses to zero, so no
    /// verification is ever fresh.
    pub fn second_factor_window(&self) -> Duration {
        Duration::try_minutes(self.second_factor_window_minutes).unwrap_or_else(Duration::zero)
    }

    pub fn requires_second_factor(&self, role: Role) -> bool {
        self.second_factor_roles.contains(&role)
    }

    /// Load from the process environment, falling back to defaults for unset keys.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup (the environment in production).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(marker) = lookup(ENV_PREVIEW_DOMAIN_MARKER) {
            let marker = marker.trim().to_ascii_lowercase();
            config.preview_domain_marker = (!marker.is_empty()).then_some(marker);
        }

        if let Some(raw) = lookup(ENV_SECOND_FACTOR_WINDOW_MINUTES) {
            config.second_factor_window_minutes = raw.trim().parse().map_err(|e| {
                ConfigError::invalid(ENV_SECOND_FACTOR_WINDOW_MINUTES, raw.clone(), format!("{e}"))
            })?;
        }

        if let Some(raw) = lookup(ENV_SECOND_FACTOR_ROLES) {
            config.second_factor_roles = raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| {
                    s.parse::<Role>().map_err(|e| {
                        ConfigError::invalid(ENV_SECOND_FACTOR_ROLES, raw.clone(), e.to_string())
                    })
                })
                .collect::<Result<_, _>>()?;
        }

        if let Some(raw) = lookup(ENV_SIGN_OUT_ON_MISSING_INTENT) {
            config.sign_out_on_missing_intent = match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                _ => {
                    return Err(ConfigError::invalid(
                        ENV_SIGN_OUT_ON_MISSING_INTENT,
                        raw.clone(),
                        "expected true/false",
                    ));
                }
            };
        }

        if let Some(path) = lookup(ENV_LOGIN_PATH) {
            config.login_path = path.trim().to_string();
        }

        config.validate()?;
        Ok(config)
    }

    /// Parse a JSON document; absent fields take their defaults.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.second_factor_window_minutes <= 0 {
            return Err(ConfigError::invalid(
                ENV_SECOND_FACTOR_WINDOW_MINUTES,
                self.second_factor_window_minutes.to_string(),
                "must be positive",
            ));
        }
        if Duration::try_minutes(self.second_factor_window_minutes).is_none() {
            return Err(ConfigError::invalid(
                ENV_SECOND_FACTOR_WINDOW_MINUTES,
                self.second_factor_window_minutes.to_string(),
                "out of range",
            ));
        }
        if !self.login_path.starts_with('/') {
            return Err(ConfigError::invalid(
                ENV_LOGIN_PATH,
                self.login_path.clone(),
                "must be an absolute path",
            ));
        }
        Ok(())
    }
}
