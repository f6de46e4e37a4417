//! Identifier types shared across the service.
//!
//! A [`ProjectId`] is the human-readable slug that names a project's
//! storage bucket, its build task, and its log channel. It must satisfy
//! bucket naming rules, so construction goes through [`ProjectId::parse`].
//!
//! A [`ConnectionId`] names one realtime client connection inside the
//! relay hub. Connection ids use UUID v7 (time-ordered) so log lines sort
//! by connect time.

use serde::Serialize;
use ts_rs::TS;
use uuid::Uuid;

/// Shortest identifier accepted by the storage namespace.
pub const PROJECT_ID_MIN_LEN: usize = 3;

/// Longest identifier accepted by the storage namespace.
pub const PROJECT_ID_MAX_LEN: usize = 63;

/// Errors produced when parsing identifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    /// The string violates project identifier naming rules.
    #[error("invalid project identifier {value:?}: {reason}")]
    InvalidProjectId {
        /// The rejected input.
        value: String,
        /// Which rule was broken.
        reason: &'static str,
    },
}

/// Unique human-readable identifier of a deployed project.
///
/// Invariants: 3-63 characters of `[a-z0-9-]`, starts and ends with a
/// letter or digit, and never contains `--`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ProjectId(String);

impl ProjectId {
    /// Parse and validate a project identifier.
    ///
    /// # Errors
    ///
    /// Returns [`IdError::InvalidProjectId`] naming the first rule the
    /// input breaks.
    pub fn parse(value: impl Into<String>) -> Result<Self, IdError> {
        let value = value.into();
        match check_project_id(&value) {
            Ok(()) => Ok(Self(value)),
            Err(reason) => Err(IdError::InvalidProjectId { value, reason }),
        }
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the identifier, returning the inner string.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl core::fmt::Display for ProjectId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ProjectId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<ProjectId> for String {
    fn from(id: ProjectId) -> Self {
        id.0
    }
}

/// Check `value` against the project identifier rules.
///
/// Returns the violated rule as a static description.
pub fn check_project_id(value: &str) -> Result<(), &'static str> {
    let len = value.len();
    if len < PROJECT_ID_MIN_LEN {
        return Err("shorter than 3 characters");
    }
    if len > PROJECT_ID_MAX_LEN {
        return Err("longer than 63 characters");
    }
    if !value
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
    {
        return Err("only lowercase letters, digits and hyphens are allowed");
    }
    let edge_ok = |b: Option<&u8>| b.is_some_and(u8::is_ascii_alphanumeric);
    if !edge_ok(value.as_bytes().first()) || !edge_ok(value.as_bytes().last()) {
        return Err("must start and end with a letter or digit");
    }
    if value.contains("--") {
        return Err("must not contain consecutive hyphens");
    }
    Ok(())
}

/// Identifier of one realtime client connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    /// Create a new identifier using UUID v7 (time-ordered).
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Return the inner [`Uuid`] value.
    pub const fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn accepts_generated_style_slugs() {
        for slug in ["calm-eager-otter", "abc", "site-2", "a1b"] {
            assert!(ProjectId::parse(slug).is_ok(), "{slug} should be valid");
        }
    }

    #[test]
    fn rejects_bad_slugs() {
        let cases = [
            "",
            "ab",
            "Upper-case",
            "-leading",
            "trailing-",
            "double--dash",
            "under_score",
            "dots.not.allowed",
        ];
        for slug in cases {
            assert!(ProjectId::parse(slug).is_err(), "{slug:?} should be rejected");
        }
        let long = "a".repeat(PROJECT_ID_MAX_LEN + 1);
        assert!(ProjectId::parse(long).is_err());
    }

    #[test]
    fn error_names_the_rule() {
        let err = ProjectId::parse("ab").err();
        assert_eq!(
            err,
            Some(IdError::InvalidProjectId {
                value: String::from("ab"),
                reason: "shorter than 3 characters",
            })
        );
    }

    #[test]
    fn project_id_serializes_as_plain_string() {
        let id = ProjectId::parse("calm-eager-otter").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"calm-eager-otter\"");
    }

    #[test]
    fn connection_ids_are_unique() {
        assert_ne!(ConnectionId::new(), ConnectionId::new());
    }
}
