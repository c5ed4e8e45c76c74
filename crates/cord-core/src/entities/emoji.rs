//! Emoji types - custom server emojis and the emoji reference used by reactions

use std::fmt;

use crate::value_objects::Snowflake;

/// Custom emoji uploaded to a server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomEmoji {
    pub id: Snowflake,
    pub server_id: Snowflake,
    pub name: String,
    pub animated: bool,
    pub managed: bool,
    pub require_colons: bool,
}

impl CustomEmoji {
    /// Create a new custom emoji
    pub fn new(id: Snowflake, server_id: Snowflake, name: String) -> Self {
        Self {
            id,
            server_id,
            name,
            animated: false,
            managed: false,
            require_colons: true,
        }
    }

    /// Text form that renders this emoji in message content
    pub fn mention_tag(&self) -> String {
        if self.animated {
            format!("<a:{}:{}>", self.name, self.id)
        } else {
            format!("<:{}:{}>", self.name, self.id)
        }
    }
}

/// Emoji as referenced by a reaction
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Emoji {
    /// Plain unicode emoji
    Unicode(String),
    /// Custom emoji, possibly from a server this client cannot see
    Custom { id: Snowflake, name: String, animated: bool },
}

impl Emoji {
    /// Custom emoji ID, if any
    pub fn custom_id(&self) -> Option<Snowflake> {
        match self {
            Self::Unicode(_) => None,
            Self::Custom { id, .. } => Some(*id),
        }
    }
}

impl fmt::Display for Emoji {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unicode(s) => f.write_str(s),
            Self::Custom { id, name, animated: true } => write!(f, "<a:{name}:{id}>"),
            Self::Custom { id, name, animated: false } => write!(f, "<:{name}:{id}>"),
        }
    }
}

impl From<&CustomEmoji> for Emoji {
    fn from(emoji: &CustomEmoji) -> Self {
        Self::Custom {
            id: emoji.id,
            name: emoji.name.clone(),
            animated: emoji.animated,
        }
    }
}
