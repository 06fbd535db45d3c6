//! Request/response vocabulary of the catalog store
//!
//! Every request is one JSON object tagged by `op`; every response carries a
//! `status` of `"success"` or `"error"`, optional `data` and an optional
//! human-readable `message`. Callers must check `status` before reading
//! `data`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::{
    AccountKind, AccountStatus, Feedback, GameKind, OwnedGame, RoomStatus,
};

/// Exact-match filter: every key must equal the row's field of that name.
pub type Criteria = Map<String, Value>;

/// Builds a [`Criteria`] from `(field, value)` pairs.
pub fn criteria<I, K, V>(pairs: I) -> Criteria
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    pairs
        .into_iter()
        .map(|(key, value)| (key.into(), value.into()))
        .collect()
}

/// Change to an account's owned/published games list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "payload")]
pub enum LibraryChange {
    /// Appends the entry unless the game is already listed.
    #[serde(rename = "add game")]
    Add(OwnedGame),
    /// Replaces the version of an already listed game.
    #[serde(rename = "update version")]
    UpdateVersion(OwnedGame),
    #[serde(rename = "remove game")]
    Remove(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GuestAction {
    #[serde(rename = "add guest")]
    Add,
    #[serde(rename = "remove guest")]
    Remove,
}

/// One catalog store operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op")]
pub enum StoreRequest {
    #[serde(rename = "create player")]
    CreatePlayer { name: String, password: String },
    #[serde(rename = "create dev")]
    CreateDev { name: String, password: String },
    #[serde(rename = "query player")]
    QueryPlayer {
        #[serde(default)]
        criteria: Criteria,
    },
    #[serde(rename = "query dev")]
    QueryDev {
        #[serde(default)]
        criteria: Criteria,
    },
    /// With `expected` set the update only applies if the current status
    /// matches, otherwise the store answers with an error.
    #[serde(rename = "update player status")]
    UpdatePlayerStatus {
        name: String,
        status: AccountStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        expected: Option<AccountStatus>,
    },
    #[serde(rename = "update dev status")]
    UpdateDevStatus {
        name: String,
        status: AccountStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        expected: Option<AccountStatus>,
    },
    #[serde(rename = "update player games")]
    UpdatePlayerGames {
        name: String,
        #[serde(flatten)]
        change: LibraryChange,
    },
    #[serde(rename = "update dev games")]
    UpdateDevGames {
        name: String,
        #[serde(flatten)]
        change: LibraryChange,
    },

    #[serde(rename = "create room")]
    CreateRoom {
        name: String,
        game: String,
        host: String,
        player_limit: u32,
    },
    #[serde(rename = "query room")]
    QueryRoom {
        #[serde(default)]
        criteria: Criteria,
    },
    #[serde(rename = "update room status")]
    UpdateRoomStatus { name: String, status: RoomStatus },
    #[serde(rename = "update room port")]
    UpdateRoomPort { name: String, port: u16 },
    /// Writes `status` and `port` together in one step.
    #[serde(rename = "set room state")]
    SetRoomState {
        name: String,
        status: RoomStatus,
        port: u16,
    },
    #[serde(rename = "update room guests")]
    UpdateRoomGuests {
        name: String,
        action: GuestAction,
        guest_name: String,
    },
    #[serde(rename = "remove room")]
    RemoveRoom { name: String },

    #[serde(rename = "create game")]
    CreateGame {
        name: String,
        dev: String,
        #[serde(rename = "type")]
        kind: GameKind,
        players: u32,
        description: String,
    },
    #[serde(rename = "query game")]
    QueryGame {
        #[serde(default)]
        criteria: Criteria,
    },
    /// Patches arbitrary game fields (except `name` and `feedback`).
    #[serde(rename = "update game")]
    UpdateGame {
        name: String,
        #[serde(default)]
        updates: Map<String, Value>,
    },
    #[serde(rename = "add feedback")]
    AddFeedback { name: String, feedback: Feedback },
}

impl StoreRequest {
    pub fn create_account(
        kind: AccountKind,
        name: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        let (name, password) = (name.into(), password.into());
        match kind {
            AccountKind::Player => StoreRequest::CreatePlayer { name, password },
            AccountKind::Developer => StoreRequest::CreateDev { name, password },
        }
    }

    pub fn query_accounts(kind: AccountKind, criteria: Criteria) -> Self {
        match kind {
            AccountKind::Player => StoreRequest::QueryPlayer { criteria },
            AccountKind::Developer => StoreRequest::QueryDev { criteria },
        }
    }

    pub fn update_account_status(
        kind: AccountKind,
        name: impl Into<String>,
        status: AccountStatus,
        expected: Option<AccountStatus>,
    ) -> Self {
        let name = name.into();
        match kind {
            AccountKind::Player => StoreRequest::UpdatePlayerStatus {
                name,
                status,
                expected,
            },
            AccountKind::Developer => StoreRequest::UpdateDevStatus {
                name,
                status,
                expected,
            },
        }
    }

    pub fn update_account_games(
        kind: AccountKind,
        name: impl Into<String>,
        change: LibraryChange,
    ) -> Self {
        let name = name.into();
        match kind {
            AccountKind::Player => StoreRequest::UpdatePlayerGames { name, change },
            AccountKind::Developer => StoreRequest::UpdateDevGames { name, change },
        }
    }

    /// Queries leave the catalog untouched; everything else may change it.
    pub fn is_query(&self) -> bool {
        matches!(
            self,
            StoreRequest::QueryPlayer { .. }
                | StoreRequest::QueryDev { .. }
                | StoreRequest::QueryRoom { .. }
                | StoreRequest::QueryGame { .. }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
}

/// Answer to one [`StoreRequest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreResponse {
    pub status: ResponseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl StoreResponse {
    pub fn success() -> Self {
        Self {
            status: ResponseStatus::Success,
            data: None,
            message: None,
        }
    }

    pub fn with_data(data: Value) -> Self {
        Self {
            status: ResponseStatus::Success,
            data: Some(data),
            message: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Error,
            data: None,
            message: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ResponseStatus::Success
    }

    /// Human-readable failure reason.
    pub fn reason(&self) -> &str {
        self.message.as_deref().unwrap_or("unknown error")
    }

    /// Rows of a successful query. Returns `None` for error responses or a
    /// missing/non-array `data`; rows that do not fit `T` are skipped.
    pub fn rows<T: DeserializeOwned>(&self) -> Option<Vec<T>> {
        if !self.is_success() {
            return None;
        }
        match &self.data {
            Some(Value::Array(rows)) => Some(
                rows.iter()
                    .filter_map(|row| T::deserialize(row).ok())
                    .collect(),
            ),
            _ => None,
        }
    }
}
