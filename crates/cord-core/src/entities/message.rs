//! Message entity - a chat message as seen in a channel's message cache

use chrono::{DateTime, Utc};

use crate::entities::{Emoji, Reaction};
use crate::value_objects::Snowflake;

/// Who wrote a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageAuthor {
    /// A regular account, resolvable through the user store
    User(Snowflake),
    /// A webhook; webhooks are not cached as users
    Webhook {
        id: Snowflake,
        name: String,
        discriminator: String,
        avatar: Option<String>,
    },
}

impl MessageAuthor {
    #[must_use]
    pub fn id(&self) -> Snowflake {
        match self {
            Self::User(id) | Self::Webhook { id, .. } => *id,
        }
    }

    #[must_use]
    pub fn is_webhook(&self) -> bool {
        matches!(self, Self::Webhook { .. })
    }
}

/// Message entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: Snowflake,
    pub channel_id: Snowflake,
    pub author: MessageAuthor,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub edited_at: Option<DateTime<Utc>>,
    pub pinned: bool,
    pub tts: bool,
    pub mentions_everyone: bool,
    pub reactions: Vec<Reaction>,
}

impl Message {
    /// Create a new Message stamped with the creation time encoded in its ID
    pub fn new(id: Snowflake, channel_id: Snowflake, author: MessageAuthor, content: String) -> Self {
        Self {
            id,
            channel_id,
            author,
            content,
            created_at: id.created_at(),
            edited_at: None,
            pinned: false,
            tts: false,
            mentions_everyone: false,
            reactions: Vec::new(),
        }
    }

    /// Check if message has been edited
    #[inline]
    pub fn is_edited(&self) -> bool {
        self.edited_at.is_some()
    }

    /// Apply an edit, returning the previous content if it changed
    pub fn edit(&mut self, content: String, edited_at: Option<DateTime<Utc>>) -> Option<String> {
        self.edited_at = edited_at.or(self.edited_at);
        if self.content == content {
            return None;
        }
        Some(std::mem::replace(&mut self.content, content))
    }

    /// Get a truncated preview of the message (for logs)
    pub fn preview(&self, max_len: usize) -> &str {
        if self.content.len() <= max_len {
            &self.content
        } else {
            let mut end = max_len;
            while !self.content.is_char_boundary(end) && end > 0 {
                end -= 1;
            }
            &self.content[..end]
        }
    }

    /// Count one more reaction with `emoji`
    pub fn add_reaction(&mut self, emoji: Emoji, you: bool) {
        match self.reactions.iter_mut().find(|r| r.emoji == emoji) {
            Some(reaction) => {
                reaction.count += 1;
                reaction.me |= you;
            }
            None => self.reactions.push(Reaction::new(emoji, 1, you)),
        }
    }

    /// Count one reaction less, dropping it once nobody reacts with `emoji`
    pub fn remove_reaction(&mut self, emoji: &Emoji, you: bool) {
        if let Some(reaction) = self.reactions.iter_mut().find(|r| &r.emoji == emoji) {
            reaction.count = reaction.count.saturating_sub(1);
            if you {
                reaction.me = false;
            }
        }
        self.reactions.retain(|r| r.count > 0);
    }

    pub fn reaction(&self, emoji: &Emoji) -> Option<&Reaction> {
        self.reactions.iter().find(|r| &r.emoji == emoji)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(content: &str) -> Message {
        Message::new(
            Snowflake::new(175928847299117063),
            Snowflake::new(2),
            MessageAuthor::User(Snowflake::new(3)),
            content.to_string(),
        )
    }

    #[test]
    fn test_created_at_from_id() {
        assert_eq!(message("hi").created_at.timestamp_millis(), 1_462_015_105_796);
    }

    #[test]
    fn test_edit_reports_previous_content() {
        let mut msg = message("Hello");
        assert!(!msg.is_edited());
        assert_eq!(msg.edit("Hello, World!".to_string(), Some(Utc::now())), Some("Hello".to_string()));
        assert!(msg.is_edited());
        assert_eq!(msg.edit("Hello, World!".to_string(), None), None);
    }

    #[test]
    fn test_message_preview() {
        let msg = message("This is a very long message that should be truncated");
        assert_eq!(msg.preview(10), "This is a ");
        assert_eq!(msg.preview(100), msg.content);
    }

    #[test]
    fn test_reaction_counting() {
        let mut msg = message("vote");
        let thumbs = Emoji::Unicode("👍".to_string());

        msg.add_reaction(thumbs.clone(), false);
        msg.add_reaction(thumbs.clone(), true);
        let reaction = msg.reaction(&thumbs).unwrap();
        assert_eq!(reaction.count, 2);
        assert!(reaction.me);

        msg.remove_reaction(&thumbs, true);
        let reaction = msg.reaction(&thumbs).unwrap();
        assert_eq!(reaction.count, 1);
        assert!(!reaction.me);

        msg.remove_reaction(&thumbs, false);
        assert!(msg.reaction(&thumbs).is_none());
    }

    #[test]
    fn test_webhook_author() {
        let author = MessageAuthor::Webhook {
            id: Snowflake::new(9),
            name: "ci".to_string(),
            discriminator: "0000".to_string(),
            avatar: None,
        };
        assert!(author.is_webhook());
        assert_eq!(author.id(), Snowflake::new(9));
        assert!(!MessageAuthor::User(Snowflake::new(1)).is_webhook());
    }
}
