//! Channel entity - a closed set of channel kinds
//!
//! Every kind is its own struct; [`Channel`] is the tagged union the cache stores.
//! Adding a kind means adding a variant, and every `match` on `Channel` must follow.

use std::collections::{HashMap, HashSet};

use crate::value_objects::Snowflake;

/// Channel type as it appears on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ChannelType {
    /// Text channel inside a server
    ServerText = 0,
    /// Direct message with one user
    Private = 1,
    /// Voice channel inside a server
    ServerVoice = 2,
    /// Direct message with several users
    Group = 3,
    /// Category organizing server channels
    Category = 4,
}

impl ChannelType {
    /// Get the numeric value
    #[inline]
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Convert from the wire value, `None` for kinds this client does not model
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::ServerText),
            1 => Some(Self::Private),
            2 => Some(Self::ServerVoice),
            3 => Some(Self::Group),
            4 => Some(Self::Category),
            _ => None,
        }
    }
}

/// Whom a permission overwrite applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverwriteTarget {
    Role(Snowflake),
    Member(Snowflake),
}

impl OverwriteTarget {
    #[must_use]
    pub const fn id(self) -> Snowflake {
        match self {
            Self::Role(id) | Self::Member(id) => id,
        }
    }
}

/// Permission bits a channel allows and denies on top of the server's roles
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PermissionOverwrite {
    pub allow: u64,
    pub deny: u64,
}

/// Overwrites of one server channel, keyed by target
pub type Overwrites = HashMap<OverwriteTarget, PermissionOverwrite>;

/// One overwrite that differs between two versions of a channel.
/// `None` on either side means the target had no overwrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverwriteChange {
    pub target: OverwriteTarget,
    pub old: Option<PermissionOverwrite>,
    pub new: Option<PermissionOverwrite>,
}

/// Text channel inside a server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerTextChannel {
    pub id: Snowflake,
    pub server_id: Snowflake,
    pub name: String,
    pub position: i32,
    pub topic: String,
    pub nsfw: bool,
    pub parent_id: Option<Snowflake>,
    pub overwrites: Overwrites,
}

/// Voice channel inside a server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerVoiceChannel {
    pub id: Snowflake,
    pub server_id: Snowflake,
    pub name: String,
    pub position: i32,
    pub bitrate: u32,
    pub user_limit: u32,
    pub parent_id: Option<Snowflake>,
    pub overwrites: Overwrites,
}

/// Category grouping other server channels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelCategory {
    pub id: Snowflake,
    pub server_id: Snowflake,
    pub name: String,
    pub position: i32,
    pub overwrites: Overwrites,
}

/// Direct message channel with a single recipient
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivateChannel {
    pub id: Snowflake,
    pub recipient_id: Snowflake,
}

/// Group direct message channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupChannel {
    pub id: Snowflake,
    pub name: Option<String>,
    pub icon: Option<String>,
    pub owner_id: Option<Snowflake>,
    pub recipient_ids: HashSet<Snowflake>,
}

/// Channel entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Channel {
    ServerText(ServerTextChannel),
    ServerVoice(ServerVoiceChannel),
    Category(ChannelCategory),
    Private(PrivateChannel),
    Group(GroupChannel),
}

impl Channel {
    #[must_use]
    pub const fn id(&self) -> Snowflake {
        match self {
            Self::ServerText(c) => c.id,
            Self::ServerVoice(c) => c.id,
            Self::Category(c) => c.id,
            Self::Private(c) => c.id,
            Self::Group(c) => c.id,
        }
    }

    #[must_use]
    pub const fn channel_type(&self) -> ChannelType {
        match self {
            Self::ServerText(_) => ChannelType::ServerText,
            Self::ServerVoice(_) => ChannelType::ServerVoice,
            Self::Category(_) => ChannelType::Category,
            Self::Private(_) => ChannelType::Private,
            Self::Group(_) => ChannelType::Group,
        }
    }

    /// The owning server, `None` for private and group channels
    #[must_use]
    pub const fn server_id(&self) -> Option<Snowflake> {
        match self {
            Self::ServerText(c) => Some(c.server_id),
            Self::ServerVoice(c) => Some(c.server_id),
            Self::Category(c) => Some(c.server_id),
            Self::Private(_) | Self::Group(_) => None,
        }
    }

    /// Channel name; private channels have none and unnamed groups neither
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::ServerText(c) => Some(&c.name),
            Self::ServerVoice(c) => Some(&c.name),
            Self::Category(c) => Some(&c.name),
            Self::Private(_) => None,
            Self::Group(c) => c.name.as_deref(),
        }
    }

    /// Sorting position inside the server
    #[must_use]
    pub const fn position(&self) -> Option<i32> {
        match self {
            Self::ServerText(c) => Some(c.position),
            Self::ServerVoice(c) => Some(c.position),
            Self::Category(c) => Some(c.position),
            Self::Private(_) | Self::Group(_) => None,
        }
    }

    /// Whether messages can be posted (and therefore cached) here
    #[must_use]
    pub const fn is_text_bearing(&self) -> bool {
        matches!(self, Self::ServerText(_) | Self::Private(_) | Self::Group(_))
    }

    /// Rename a server channel, returning the old name if it changed
    pub fn set_name(&mut self, name: String) -> Option<String> {
        let slot = match self {
            Self::ServerText(c) => &mut c.name,
            Self::ServerVoice(c) => &mut c.name,
            Self::Category(c) => &mut c.name,
            Self::Private(_) | Self::Group(_) => return None,
        };
        if *slot == name {
            return None;
        }
        Some(std::mem::replace(slot, name))
    }

    /// Move a server channel, returning the old position if it changed
    pub fn set_position(&mut self, position: i32) -> Option<i32> {
        let slot = match self {
            Self::ServerText(c) => &mut c.position,
            Self::ServerVoice(c) => &mut c.position,
            Self::Category(c) => &mut c.position,
            Self::Private(_) | Self::Group(_) => return None,
        };
        if *slot == position {
            return None;
        }
        Some(std::mem::replace(slot, position))
    }

    /// Change a text channel's topic, returning the old topic if it changed
    pub fn set_topic(&mut self, topic: String) -> Option<String> {
        match self {
            Self::ServerText(c) if c.topic != topic => Some(std::mem::replace(&mut c.topic, topic)),
            _ => None,
        }
    }
    /// Permission overwrites of a server channel
    #[must_use]
    pub const fn overwrites(&self) -> Option<&Overwrites> {
        match self {
            Self::ServerText(c) => Some(&c.overwrites),
            Self::ServerVoice(c) => Some(&c.overwrites),
            Self::Category(c) => Some(&c.overwrites),
            Self::Private(_) | Self::Group(_) => None,
        }
    }

    /// Replace a server channel's overwrites, returning every target whose
    /// overwrite was added, changed or dropped
    pub fn set_overwrites(&mut self, overwrites: Overwrites) -> Vec<OverwriteChange> {
        let slot = match self {
            Self::ServerText(c) => &mut c.overwrites,
            Self::ServerVoice(c) => &mut c.overwrites,
            Self::Category(c) => &mut c.overwrites,
            Self::Private(_) | Self::Group(_) => return Vec::new(),
        };
        let old = std::mem::replace(slot, overwrites);

        let mut changes: Vec<OverwriteChange> = slot
            .iter()
            .filter(|&(target, new)| old.get(target) != Some(new))
            .map(|(&target, &new)| OverwriteChange {
                target,
                old: old.get(&target).copied(),
                new: Some(new),
            })
            .collect();
        changes.extend(
            old.iter()
                .filter(|&(target, _)| !slot.contains_key(target))
                .map(|(&target, &old)| OverwriteChange {
                    target,
                    old: Some(old),
                    new: None,
                }),
        );
        changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_channel() -> Channel {
        Channel::ServerText(ServerTextChannel {
            id: Snowflake::new(1),
            server_id: Snowflake::new(100),
            name: "general".to_string(),
            position: 0,
            topic: String::new(),
            nsfw: false,
            parent_id: None,
            overwrites: Overwrites::new(),
        })
    }

    #[test]
    fn test_channel_type_from_u8() {
        assert_eq!(ChannelType::from_u8(0), Some(ChannelType::ServerText));
        assert_eq!(ChannelType::from_u8(1), Some(ChannelType::Private));
        assert_eq!(ChannelType::from_u8(2), Some(ChannelType::ServerVoice));
        assert_eq!(ChannelType::from_u8(3), Some(ChannelType::Group));
        assert_eq!(ChannelType::from_u8(4), Some(ChannelType::Category));
        assert_eq!(ChannelType::from_u8(13), None);
    }

    #[test]
    fn test_text_channel_accessors() {
        let channel = text_channel();
        assert_eq!(channel.id(), Snowflake::new(1));
        assert_eq!(channel.server_id(), Some(Snowflake::new(100)));
        assert_eq!(channel.name(), Some("general"));
        assert_eq!(channel.channel_type(), ChannelType::ServerText);
        assert!(channel.is_text_bearing());
    }

    #[test]
    fn test_private_channel() {
        let channel = Channel::Private(PrivateChannel {
            id: Snowflake::new(2),
            recipient_id: Snowflake::new(3),
        });
        assert_eq!(channel.server_id(), None);
        assert_eq!(channel.name(), None);
        assert!(channel.is_text_bearing());
    }

    #[test]
    fn test_category_is_not_text_bearing() {
        let channel = Channel::Category(ChannelCategory {
            id: Snowflake::new(5),
            server_id: Snowflake::new(100),
            name: "info".to_string(),
            position: 1,
            overwrites: Overwrites::new(),
        });
        assert!(!channel.is_text_bearing());
    }

    #[test]
    fn test_setters_report_changes() {
        let mut channel = text_channel();
        assert_eq!(channel.set_name("lobby".to_string()), Some("general".to_string()));
        assert_eq!(channel.set_name("lobby".to_string()), None);
        assert_eq!(channel.set_position(3), Some(0));
        assert_eq!(channel.set_position(3), None);
        assert_eq!(channel.set_topic("hi".to_string()), Some(String::new()));
        assert_eq!(channel.set_topic("hi".to_string()), None);
    }

    #[test]
    fn test_set_overwrites_reports_each_change() {
        let mut channel = text_channel();
        let role = OverwriteTarget::Role(Snowflake::new(10));
        let member = OverwriteTarget::Member(Snowflake::new(7));
        let read_only = PermissionOverwrite { allow: 0, deny: 0x800 };

        let changes = channel.set_overwrites(Overwrites::from([(role, read_only)]));
        assert_eq!(
            changes,
            vec![OverwriteChange { target: role, old: None, new: Some(read_only) }]
        );
        assert!(channel.set_overwrites(Overwrites::from([(role, read_only)])).is_empty());

        let muted = PermissionOverwrite { allow: 0x400, deny: 0x800 };
        let mut changes =
            channel.set_overwrites(Overwrites::from([(role, muted), (member, read_only)]));
        changes.sort_by_key(|change| change.target.id());
        assert_eq!(
            changes,
            vec![
                OverwriteChange { target: member, old: None, new: Some(read_only) },
                OverwriteChange { target: role, old: Some(read_only), new: Some(muted) },
            ]
        );

        let changes = channel.set_overwrites(Overwrites::from([(member, read_only)]));
        assert_eq!(
            changes,
            vec![OverwriteChange { target: role, old: Some(muted), new: None }]
        );
        assert_eq!(channel.overwrites().map(Overwrites::len), Some(1));
    }

    #[test]
    fn test_private_channel_has_no_overwrites() {
        let mut channel = Channel::Private(PrivateChannel {
            id: Snowflake::new(2),
            recipient_id: Snowflake::new(3),
        });
        assert!(channel.overwrites().is_none());
        let overwrites =
            Overwrites::from([(OverwriteTarget::Role(Snowflake::new(1)), PermissionOverwrite::default())]);
        assert!(channel.set_overwrites(overwrites).is_empty());
    }

    #[test]
    fn test_topic_only_on_text_channels() {
        let mut channel = Channel::Category(ChannelCategory {
            id: Snowflake::new(5),
            server_id: Snowflake::new(100),
            name: "info".to_string(),
            position: 1,
            overwrites: Overwrites::new(),
        });
        assert_eq!(channel.set_topic("ignored".to_string()), None);
    }
}
