//! Reaction entity - aggregated emoji reactions on a message

use crate::entities::Emoji;

/// Aggregated reaction on a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reaction {
    pub emoji: Emoji,
    pub count: u32,
    /// Whether the current account is one of the reactors
    pub me: bool,
}

impl Reaction {
    /// Create a new Reaction
    pub fn new(emoji: Emoji, count: u32, me: bool) -> Self {
        Self { emoji, count, me }
    }

    /// Check if reaction uses a specific emoji
    #[inline]
    pub fn is_emoji(&self, emoji: &Emoji) -> bool {
        &self.emoji == emoji
    }
}
