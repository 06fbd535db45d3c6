//! Catalog data model: accounts, games and rooms as stored by the catalog
//! store and exchanged with it.

use serde::{Deserialize, Serialize};

/// Which account table an operation targets. Players and developers share
/// one account shape but live in separate tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccountKind {
    Player,
    Developer,
}

impl AccountKind {
    /// Noun used in store operation names (`"create player"`, `"query dev"`).
    pub fn noun(self) -> &'static str {
        match self {
            AccountKind::Player => "player",
            AccountKind::Developer => "dev",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    #[default]
    Offline,
    Online,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    #[default]
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    #[default]
    Inactive,
    Active,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameKind {
    #[serde(rename = "CLI")]
    Cli,
    #[serde(rename = "GUI")]
    Gui,
}

impl GameKind {
    pub fn label(self) -> &'static str {
        match self {
            GameKind::Cli => "CLI",
            GameKind::Gui => "GUI",
        }
    }
}

/// An owned (player) or published (developer) game: `[name, version]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnedGame(pub String, pub u32);

impl OwnedGame {
    pub fn name(&self) -> &str {
        &self.0
    }

    pub fn version(&self) -> u32 {
        self.1
    }
}

/// A player or developer account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub name: String,
    pub password: String,
    #[serde(default)]
    pub games: Vec<OwnedGame>,
    #[serde(default)]
    pub status: AccountStatus,
}

impl Account {
    pub fn new(name: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            password: password.into(),
            games: Vec::new(),
            status: AccountStatus::Offline,
        }
    }

    /// Version of `game` recorded in this account's library.
    pub fn owned_version(&self, game: &str) -> Option<u32> {
        self.games
            .iter()
            .find(|owned| owned.name() == game)
            .map(OwnedGame::version)
    }
}

/// One review: `[reviewer, stars, comment]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback(pub String, pub u8, pub String);

impl Feedback {
    pub const MIN_STARS: u8 = 1;
    pub const MAX_STARS: u8 = 5;

    pub fn reviewer(&self) -> &str {
        &self.0
    }

    pub fn stars(&self) -> u8 {
        self.1
    }

    pub fn comment(&self) -> &str {
        &self.2
    }
}

/// A published game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    pub name: String,
    pub dev: String,
    pub version: u32,
    #[serde(default)]
    pub status: GameStatus,
    #[serde(rename = "type")]
    pub kind: GameKind,
    pub players: u32,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub feedback: Vec<Feedback>,
}

impl Game {
    /// Smallest player count a game may declare.
    pub const MIN_PLAYERS: u32 = 2;

    pub fn is_up(&self) -> bool {
        self.status == GameStatus::Up
    }

    /// Mean star rating, if anyone has reviewed the game.
    pub fn average_rating(&self) -> Option<f32> {
        if self.feedback.is_empty() {
            return None;
        }
        let total: u32 = self.feedback.iter().map(|f| u32::from(f.stars())).sum();
        Some(total as f32 / self.feedback.len() as f32)
    }
}

/// A multiplayer room waiting for, or running, one match of a game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub name: String,
    pub game: String,
    pub host: String,
    #[serde(default)]
    pub guests: Vec<String>,
    #[serde(default)]
    pub status: RoomStatus,
    #[serde(default)]
    pub port: u16,
    pub player_limit: u32,
}

impl Room {
    pub fn new(
        name: impl Into<String>,
        game: impl Into<String>,
        host: impl Into<String>,
        player_limit: u32,
    ) -> Self {
        Self {
            name: name.into(),
            game: game.into(),
            host: host.into(),
            guests: Vec::new(),
            status: RoomStatus::Inactive,
            port: 0,
            player_limit,
        }
    }

    /// Host plus guests.
    pub fn occupancy(&self) -> u32 {
        1 + self.guests.len() as u32
    }

    pub fn is_full(&self) -> bool {
        self.occupancy() >= self.player_limit
    }

    /// Exactly `player_limit` members are present.
    pub fn ready_to_start(&self) -> bool {
        self.occupancy() == self.player_limit
    }

    /// Active with a usable port.
    pub fn is_running(&self) -> bool {
        self.status == RoomStatus::Active && self.port != 0
    }
}

/// Accepts names usable as a single path component: non-empty, not `.` or
/// `..`, no separators or control characters.
pub fn is_safe_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name
            .chars()
            .any(|c| c == '/' || c == '\\' || c.is_control())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_account_wire_shape() {
        let mut account = Account::new("alice", "pw");
        account.games.push(OwnedGame("ooxx".into(), 2));

        assert_eq!(
            serde_json::to_value(&account).unwrap(),
            json!({"name": "alice", "password": "pw", "games": [["ooxx", 2]], "status": "offline"})
        );
        assert_eq!(account.owned_version("ooxx"), Some(2));
        assert_eq!(account.owned_version("guess"), None);
    }

    #[test]
    fn test_game_wire_shape_uses_type_key() {
        let game: Game = serde_json::from_value(json!({
            "name": "ooxx", "dev": "dan", "version": 1, "status": "up",
            "type": "CLI", "players": 2, "description": "tic tac toe",
            "feedback": [["bob", 4, "fun"], ["eve", 3, "ok"]]
        }))
        .unwrap();

        assert_eq!(game.kind, GameKind::Cli);
        assert_eq!(game.feedback[0].reviewer(), "bob");
        assert_eq!(game.average_rating(), Some(3.5));
    }

    #[test]
    fn test_room_capacity() {
        let mut room = Room::new("AB12CD", "ooxx", "alice", 2);
        assert_eq!(room.occupancy(), 1);
        assert!(!room.is_full());
        assert!(!room.ready_to_start());

        room.guests.push("bob".into());
        assert!(room.is_full());
        assert!(room.ready_to_start());
        assert!(!room.is_running());

        room.status = RoomStatus::Active;
        room.port = 20001;
        assert!(room.is_running());
    }

    #[test]
    fn test_safe_names() {
        assert!(is_safe_name("alice"));
        assert!(is_safe_name("Hand Game 2"));
        assert!(!is_safe_name(""));
        assert!(!is_safe_name(".."));
        assert!(!is_safe_name("../etc"));
        assert!(!is_safe_name("a\\b"));
        assert!(!is_safe_name("tab\there"));
    }
}
