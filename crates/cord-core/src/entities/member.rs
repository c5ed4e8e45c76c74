//! Member entity - a user's membership in a server

use std::collections::HashSet;

use crate::value_objects::Snowflake;

/// Server member (junction between User and Server)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub user_id: Snowflake,
    pub nickname: Option<String>,
    pub role_ids: HashSet<Snowflake>,
}

impl Member {
    /// Create a new Member without nickname or roles
    pub fn new(user_id: Snowflake) -> Self {
        Self {
            user_id,
            nickname: None,
            role_ids: HashSet::new(),
        }
    }

    /// Get display name (nickname if set, otherwise fallback)
    pub fn display_name<'a>(&'a self, username: &'a str) -> &'a str {
        self.nickname.as_deref().unwrap_or(username)
    }

    /// Check if member has a specific role
    #[inline]
    pub fn has_role(&self, role_id: Snowflake) -> bool {
        self.role_ids.contains(&role_id)
    }
}
