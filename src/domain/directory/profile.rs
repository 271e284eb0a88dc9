//! User profile read model for the campus directory.
//!
//! Profiles are owned by the wider platform; the messaging core only reads
//! them to resolve peers, decorate conversation lists with display names,
//! and back people search.

use crate::domain::foundation::{Timestamp, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Campus role attached to a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    #[default]
    Student,
    Lecturer,
    Counselor,
    Admin,
}

impl UserRole {
    /// Returns the wire/storage form of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Student => "student",
            UserRole::Lecturer => "lecturer",
            UserRole::Counselor => "counselor",
            UserRole::Admin => "admin",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" => Ok(UserRole::Student),
            "lecturer" => Ok(UserRole::Lecturer),
            "counselor" => Ok(UserRole::Counselor),
            "admin" => Ok(UserRole::Admin),
            other => Err(format!("unknown user role: {}", other)),
        }
    }
}

/// A user's directory profile.
///
/// Read-only from the messaging core's perspective.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// The user this profile belongs to.
    pub user_id: UserId,

    /// Full display name (usually "first last").
    pub full_name: Option<String>,

    /// Email address.
    pub email: Option<String>,

    /// Avatar image URL.
    pub avatar_url: Option<String>,

    /// Campus role.
    pub role: UserRole,

    /// When the profile was created.
    pub created_at: Timestamp,
}

impl Profile {
    /// Creates a profile record.
    pub fn new(
        user_id: UserId,
        full_name: Option<String>,
        email: Option<String>,
        avatar_url: Option<String>,
        role: UserRole,
        created_at: Timestamp,
    ) -> Self {
        Self {
            user_id,
            full_name,
            email,
            avatar_url,
            role,
            created_at,
        }
    }

    /// Returns the best available display name.
    ///
    /// Falls back to the email address, then to a generic label so the UI
    /// never renders an empty participant.
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .or(self.email.as_deref())
            .unwrap_or("Unknown user")
    }

    /// Returns true if the profile matches a directory search query.
    ///
    /// Matching is a case-insensitive substring test over name and email.
    pub fn matches_query(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return false;
        }

        let name_hit = self
            .full_name
            .as_deref()
            .map(|n| n.to_lowercase().contains(&query))
            .unwrap_or(false);
        let email_hit = self
            .email
            .as_deref()
            .map(|e| e.to_lowercase().contains(&query))
            .unwrap_or(false);

        name_hit || email_hit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile_with(full_name: Option<&str>, email: Option<&str>) -> Profile {
        Profile::new(
            UserId::new(),
            full_name.map(String::from),
            email.map(String::from),
            None,
            UserRole::Student,
            Timestamp::now(),
        )
    }

    #[test]
    fn role_default_is_student() {
        assert_eq!(UserRole::default(), UserRole::Student);
    }

    #[test]
    fn role_round_trips_through_storage_form() {
        for role in [
            UserRole::Student,
            UserRole::Lecturer,
            UserRole::Counselor,
            UserRole::Admin,
        ] {
            assert_eq!(role.as_str().parse::<UserRole>().unwrap(), role);
        }
    }

    #[test]
    fn role_parse_rejects_unknown_values() {
        assert!("professor".parse::<UserRole>().is_err());
    }

    #[test]
    fn role_serializes_to_snake_case_json() {
        assert_eq!(
            serde_json::to_string(&UserRole::Lecturer).unwrap(),
            "\"lecturer\""
        );
    }

    #[test]
    fn display_name_prefers_full_name() {
        let profile = profile_with(Some("Alice Chen"), Some("alice@campus.edu"));
        assert_eq!(profile.display_name(), "Alice Chen");
    }

    #[test]
    fn display_name_falls_back_to_email() {
        let profile = profile_with(None, Some("bob@campus.edu"));
        assert_eq!(profile.display_name(), "bob@campus.edu");

        let blank_name = profile_with(Some("   "), Some("bob@campus.edu"));
        assert_eq!(blank_name.display_name(), "bob@campus.edu");
    }

    #[test]
    fn display_name_never_returns_empty() {
        let profile = profile_with(None, None);
        assert_eq!(profile.display_name(), "Unknown user");
    }

    #[test]
    fn matches_query_is_case_insensitive() {
        let profile = profile_with(Some("Alice Chen"), Some("alice@campus.edu"));

        assert!(profile.matches_query("alice"));
        assert!(profile.matches_query("CHEN"));
        assert!(profile.matches_query("campus.edu"));
        assert!(!profile.matches_query("dave"));
    }

    #[test]
    fn matches_query_ignores_blank_queries() {
        let profile = profile_with(Some("Alice Chen"), None);
        assert!(!profile.matches_query("   "));
    }
}
