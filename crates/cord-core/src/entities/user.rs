//! User entity - represents a remote user account as last observed on the gateway

use serde::{Deserialize, Serialize};

use crate::value_objects::Snowflake;

/// Online status of a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Online,
    Idle,
    #[serde(rename = "dnd")]
    DoNotDisturb,
    Invisible,
    #[default]
    Offline,
}

impl UserStatus {
    /// Wire representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Idle => "idle",
            Self::DoNotDisturb => "dnd",
            Self::Invisible => "invisible",
            Self::Offline => "offline",
        }
    }

    /// Parse a wire status, unknown values map to `Offline`
    #[must_use]
    pub fn from_wire(s: &str) -> Self {
        match s {
            "online" => Self::Online,
            "idle" => Self::Idle,
            "dnd" => Self::DoNotDisturb,
            "invisible" => Self::Invisible,
            _ => Self::Offline,
        }
    }
}

/// Kind of activity shown next to a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum GameType {
    #[default]
    Game = 0,
    Streaming = 1,
    Listening = 2,
    Watching = 3,
}

impl GameType {
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Streaming,
            2 => Self::Listening,
            3 => Self::Watching,
            _ => Self::Game,
        }
    }
}

/// The activity ("game") a user is currently showing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Game {
    pub name: String,
    pub game_type: GameType,
    pub streaming_url: Option<String>,
}

impl Game {
    /// A plain "Playing ..." activity
    pub fn playing(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            game_type: GameType::Game,
            streaming_url: None,
        }
    }

    /// A streaming activity with its stream URL
    pub fn streaming(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            game_type: GameType::Streaming,
            streaming_url: Some(url.into()),
        }
    }
}

/// User entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Snowflake,
    pub name: String,
    pub discriminator: String,
    pub avatar: Option<String>,
    pub bot: bool,
    pub status: UserStatus,
    pub game: Option<Game>,
}

impl User {
    /// Create a new User with required fields
    pub fn new(id: Snowflake, name: String, discriminator: String) -> Self {
        Self {
            id,
            name,
            discriminator,
            avatar: None,
            bot: false,
            status: UserStatus::Offline,
            game: None,
        }
    }

    /// Get the full tag: name#discriminator
    pub fn tag(&self) -> String {
        format!("{}#{}", self.name, self.discriminator)
    }

    /// Get the avatar URL, falling back to the default avatar
    pub fn avatar_url(&self) -> String {
        match &self.avatar {
            Some(hash) => format!("https://cdn.discordapp.com/avatars/{}/{}.png", self.id, hash),
            None => format!(
                "https://cdn.discordapp.com/embed/avatars/{}.png",
                self.discriminator.parse::<u16>().unwrap_or(0) % 5
            ),
        }
    }

    /// Update the status, returning the previous one if it changed
    pub fn set_status(&mut self, status: UserStatus) -> Option<UserStatus> {
        if self.status == status {
            return None;
        }
        Some(std::mem::replace(&mut self.status, status))
    }

    /// Update the game, returning the previous one if it changed
    pub fn set_game(&mut self, game: Option<Game>) -> Option<Option<Game>> {
        if self.game == game {
            return None;
        }
        Some(std::mem::replace(&mut self.game, game))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User::new(Snowflake::new(1), "alice".to_string(), "0042".to_string())
    }

    #[test]
    fn test_user_tag() {
        assert_eq!(user().tag(), "alice#0042");
    }

    #[test]
    fn test_default_avatar_url() {
        assert_eq!(
            user().avatar_url(),
            "https://cdn.discordapp.com/embed/avatars/2.png"
        );
    }

    #[test]
    fn test_status_change_reports_previous() {
        let mut user = user();
        assert_eq!(user.set_status(UserStatus::Online), Some(UserStatus::Offline));
        assert_eq!(user.set_status(UserStatus::Online), None);
    }

    #[test]
    fn test_game_change_reports_previous() {
        let mut user = user();
        assert_eq!(user.set_game(Some(Game::playing("chess"))), Some(None));
        assert_eq!(user.set_game(Some(Game::playing("chess"))), None);
        assert_eq!(
            user.set_game(None),
            Some(Some(Game::playing("chess")))
        );
    }

    #[test]
    fn test_status_wire_names() {
        assert_eq!(UserStatus::from_wire("dnd"), UserStatus::DoNotDisturb);
        assert_eq!(UserStatus::from_wire("unknown"), UserStatus::Offline);
        assert_eq!(UserStatus::Idle.as_str(), "idle");
        assert_eq!(serde_json::to_string(&UserStatus::DoNotDisturb).unwrap(), "\"dnd\"");
    }
}
