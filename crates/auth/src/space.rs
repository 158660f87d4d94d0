//! Login spaces and the route-prefix table that maps paths onto them.

use core::str::FromStr;
use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use lyta_core::DomainError;

/// One of the three mutually exclusive areas a session is declared into at login.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Space {
    Client,
    Team,
    King,
}

/// The space a principal declared at login, persisted per domain.
pub type LoginIntent = Space;

/// Path prefix → space required to view it.
///
/// Matching is a case-sensitive prefix test on the normalized path (see
/// [`Space::required_for`]): `/kingdom` falls under `/king`.
pub const ROUTE_PREFIXES: [(&str, Space); 3] = [
    ("/king", Space::King),
    ("/crm", Space::Team),
    ("/espace-client", Space::Client),
];

impl Space {
    pub fn as_str(&self) -> &'static str {
        match self {
            Space::Client => "client",
            Space::Team => "team",
            Space::King => "king",
        }
    }

    /// Route spaces a session declared into `self` may never reach.
    pub fn forbidden_routes(&self) -> &'static [Space] {
        match self {
            Space::Client => &[Space::Team, Space::King],
            Space::Team => &[Space::Client, Space::King],
            Space::King => &[Space::Client, Space::Team],
        }
    }

    /// Space required by `path`, or `None` for routes outside the table.
    ///
    /// The path is normalized the way a router would see it before matching:
    /// query and fragment dropped, percent-escapes decoded once, empty and `.`
    /// segments removed and `..` resolved. `/%6Bing`, `//king` and
    /// `/crm/../king` all require the king space.
    pub fn required_for(path: &str) -> Option<Space> {
        let path = normalize_path(strip_query(path));
        ROUTE_PREFIXES
            .iter()
            .find(|(prefix, _)| path.starts_with(prefix))
            .map(|(_, space)| *space)
    }
}

fn normalize_path(path: &str) -> String {
    // Undecodable escapes (invalid UTF-8) are matched as written.
    let decoded = urlencoding::decode(path).unwrap_or(Cow::Borrowed(path));

    let mut segments: Vec<&str> = Vec::new();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    let mut normalized = String::with_capacity(decoded.len());
    for segment in segments {
        normalized.push('/');
        normalized.push_str(segment);
    }
    if normalized.is_empty() {
        normalized.push('/');
    }
    normalized
}

fn strip_query(path: &str) -> &str {
    match path.find(['?', '#']) {
        Some(idx) => &path[..idx],
        None => path,
    }
}

impl core::fmt::Display for Space {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Space {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "client" => Ok(Space::Client),
            "team" => Ok(Space::Team),
            "king" => Ok(Space::King),
            other => Err(DomainError::validation(format!("unknown space '{other}'"))),
        }
    }
}
