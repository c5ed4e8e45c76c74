//! Server entity - a community holding channels, roles, members and emojis

use std::collections::{HashMap, HashSet};

use crate::entities::{Member, Role};
use crate::value_objects::Snowflake;

/// Server entity
///
/// Channels and custom emojis live in their own cache stores and are only
/// referenced here by ID. Members and roles are owned by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Server {
    pub id: Snowflake,
    pub name: String,
    pub icon: Option<String>,
    pub owner_id: Snowflake,
    pub region: Option<String>,
    /// Whether the remote side considers this server "large" (members are sent lazily)
    pub large: bool,
    /// Advertised total member count
    pub member_count: u32,
    pub members: HashMap<Snowflake, Member>,
    pub roles: HashMap<Snowflake, Role>,
    pub channel_ids: HashSet<Snowflake>,
    pub emoji_ids: HashSet<Snowflake>,
}

impl Server {
    /// Create a new Server
    pub fn new(id: Snowflake, name: String, owner_id: Snowflake) -> Self {
        Self {
            id,
            name,
            icon: None,
            owner_id,
            region: None,
            large: false,
            member_count: 0,
            members: HashMap::new(),
            roles: HashMap::new(),
            channel_ids: HashSet::new(),
            emoji_ids: HashSet::new(),
        }
    }

    /// Check if a user is the server owner
    #[inline]
    pub fn is_owner(&self, user_id: Snowflake) -> bool {
        self.owner_id == user_id
    }

    /// Get the server icon URL if set
    pub fn icon_url(&self) -> Option<String> {
        self.icon
            .as_ref()
            .map(|hash| format!("https://cdn.discordapp.com/icons/{}/{}.png", self.id, hash))
    }

    /// All advertised members have been received
    pub fn is_fully_loaded(&self) -> bool {
        self.members.len() >= self.member_count as usize
    }

    /// Whether members must be requested explicitly after this server became available
    pub fn needs_member_request(&self) -> bool {
        self.large && !self.is_fully_loaded()
    }

    /// Insert or replace a member
    pub fn add_member(&mut self, member: Member) {
        self.members.insert(member.user_id, member);
    }

    /// Remove a member, returning it if it was present
    pub fn remove_member(&mut self, user_id: Snowflake) -> Option<Member> {
        self.members.remove(&user_id)
    }

    #[inline]
    pub fn member(&self, user_id: Snowflake) -> Option<&Member> {
        self.members.get(&user_id)
    }

    #[inline]
    pub fn role(&self, role_id: Snowflake) -> Option<&Role> {
        self.roles.get(&role_id)
    }

    /// Roles sorted by position, lowest first
    pub fn roles_by_position(&self) -> Vec<&Role> {
        let mut roles: Vec<&Role> = self.roles.values().collect();
        roles.sort_by_key(|role| (role.position, role.id));
        roles
    }

    /// Set the name, returning the old one if it changed
    pub fn set_name(&mut self, name: String) -> Option<String> {
        if self.name == name {
            return None;
        }
        Some(std::mem::replace(&mut self.name, name))
    }
}
