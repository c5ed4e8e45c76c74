//! Role entity - a server role

use crate::value_objects::Snowflake;

/// Role entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    pub id: Snowflake,
    pub server_id: Snowflake,
    pub name: String,
    pub color: u32,
    pub position: i32,
    pub permissions: u64,
}

impl Role {
    /// Create a new Role
    pub fn new(id: Snowflake, server_id: Snowflake, name: String) -> Self {
        Self {
            id,
            server_id,
            name,
            color: 0,
            position: 0,
            permissions: 0,
        }
    }

    /// The @everyone role shares its ID with the server
    #[inline]
    pub fn is_everyone(&self) -> bool {
        self.id == self.server_id
    }
}
