//! Catalog store: the single owner of accounts, rooms and games
//!
//! All tables live in memory behind one mutex, so every request is applied
//! atomically with respect to every other request. Read-modify-write
//! operations (guest lists, owned-games lists, compare-and-set status) are
//! therefore race free even when many session tasks hit the store at once.
//!
//! When a snapshot path is configured the tables are written to disk with
//! bincode after every successful mutation and reloaded on start-up. The
//! write happens after the tables lock is released.

pub mod service;
pub mod snapshot;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use shared::catalog::{Criteria, GuestAction, LibraryChange, StoreRequest, StoreResponse};
use shared::models::{
    is_safe_name, Account, AccountKind, AccountStatus, Feedback, Game, GameKind, GameStatus,
    OwnedGame, Room, RoomStatus,
};

use crate::error::StoreError;

const ACCOUNT_FIELDS: &[&str] = &["name", "password", "games", "status"];
const ROOM_FIELDS: &[&str] = &[
    "name",
    "game",
    "host",
    "guests",
    "status",
    "port",
    "player_limit",
];
const GAME_FIELDS: &[&str] = &[
    "name",
    "dev",
    "version",
    "status",
    "type",
    "players",
    "description",
    "feedback",
];
/// Game fields an `update game` patch may not touch.
const FROZEN_GAME_FIELDS: &[&str] = &["name", "feedback"];

/// Room state outside a running match.
pub const IDLE_ROOM: (RoomStatus, u16) = (RoomStatus::Inactive, 0);

/// Every table of the catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tables {
    pub players: BTreeMap<String, Account>,
    pub devs: BTreeMap<String, Account>,
    pub rooms: BTreeMap<String, Room>,
    pub games: BTreeMap<String, Game>,
}

impl Tables {
    fn accounts(&self, kind: AccountKind) -> &BTreeMap<String, Account> {
        match kind {
            AccountKind::Player => &self.players,
            AccountKind::Developer => &self.devs,
        }
    }

    fn accounts_mut(&mut self, kind: AccountKind) -> &mut BTreeMap<String, Account> {
        match kind {
            AccountKind::Player => &mut self.players,
            AccountKind::Developer => &mut self.devs,
        }
    }
}

/// Serializing catalog store.
#[derive(Debug, Default)]
pub struct CatalogStore {
    tables: Mutex<Tables>,
    snapshot: Option<Snapshot>,
}

/// Where the tables are persisted, and the last revision written there.
#[derive(Debug)]
struct Snapshot {
    path: PathBuf,
    revision: AtomicU64,
    written: Mutex<u64>,
}

impl CatalogStore {
    /// Creates an empty, memory-only store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store persisted at `path`, loading the existing snapshot if
    /// there is one. Sessions and rooms do not outlive the store: every
    /// account comes back offline and no room is restored.
    pub fn with_snapshot(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let tables = match snapshot::load(&path)? {
            Some(mut tables) => {
                info!(
                    "Loaded catalog snapshot from {} ({} players, {} developers, {} games)",
                    path.display(),
                    tables.players.len(),
                    tables.devs.len(),
                    tables.games.len()
                );
                recover(&mut tables);
                tables
            }
            None => Tables::default(),
        };

        Ok(Self {
            tables: Mutex::new(tables),
            snapshot: Some(Snapshot {
                path,
                revision: AtomicU64::new(0),
                written: Mutex::new(0),
            }),
        })
    }

    /// Applies one request and produces its response.
    pub fn apply(&self, request: StoreRequest) -> StoreResponse {
        let mutation = !request.is_query();
        let mut tables = self.lock();

        match execute(&mut tables, request) {
            Ok(data) => {
                if mutation {
                    self.persist(tables);
                }
                match data {
                    Some(data) => StoreResponse::with_data(data),
                    None => StoreResponse::success(),
                }
            }
            Err(e) => {
                drop(tables);
                debug!("Request rejected: {}", e);
                StoreResponse::error(e.to_string())
            }
        }
    }

    /// Copy of the current tables.
    pub fn tables(&self) -> Tables {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Writes a copy of `tables` taken under the lock, after releasing it.
    /// A copy older than the last one written is dropped.
    fn persist(&self, tables: MutexGuard<'_, Tables>) {
        let Some(snapshot) = &self.snapshot else {
            return;
        };
        let revision = snapshot.revision.fetch_add(1, Ordering::SeqCst) + 1;
        let copy = tables.clone();
        drop(tables);

        let mut written = snapshot
            .written
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if *written > revision {
            return;
        }
        match snapshot::save(&snapshot.path, &copy) {
            Ok(()) => *written = revision,
            Err(e) => warn!(
                "Failed to write catalog snapshot {}: {}",
                snapshot.path.display(),
                e
            ),
        }
    }
}

/// Clears state that belonged to sessions of a previous store run.
fn recover(tables: &mut Tables) {
    for account in tables.players.values_mut().chain(tables.devs.values_mut()) {
        account.status = AccountStatus::Offline;
    }
    if !tables.rooms.is_empty() {
        info!("Dropping {} rooms of the previous run", tables.rooms.len());
        tables.rooms.clear();
    }
}

fn execute(tables: &mut Tables, request: StoreRequest) -> Result<Option<Value>, StoreError> {
    use AccountKind::{Developer, Player};

    match request {
        StoreRequest::CreatePlayer { name, password } => {
            create_account(tables, Player, name, password)
        }
        StoreRequest::CreateDev { name, password } => {
            create_account(tables, Developer, name, password)
        }
        StoreRequest::QueryPlayer { criteria } => {
            select(tables.accounts(Player).values(), ACCOUNT_FIELDS, &criteria)
        }
        StoreRequest::QueryDev { criteria } => {
            select(tables.accounts(Developer).values(), ACCOUNT_FIELDS, &criteria)
        }
        StoreRequest::UpdatePlayerStatus {
            name,
            status,
            expected,
        } => update_status(tables, Player, name, status, expected),
        StoreRequest::UpdateDevStatus {
            name,
            status,
            expected,
        } => update_status(tables, Developer, name, status, expected),
        StoreRequest::UpdatePlayerGames { name, change } => {
            update_library(tables, Player, name, change)
        }
        StoreRequest::UpdateDevGames { name, change } => {
            update_library(tables, Developer, name, change)
        }

        StoreRequest::CreateRoom {
            name,
            game,
            host,
            player_limit,
        } => create_room(tables, name, game, host, player_limit),
        StoreRequest::QueryRoom { criteria } => {
            select(tables.rooms.values(), ROOM_FIELDS, &criteria)
        }
        StoreRequest::UpdateRoomStatus { name, status } => {
            room_mut(tables, &name)?.status = status;
            Ok(None)
        }
        StoreRequest::UpdateRoomPort { name, port } => {
            room_mut(tables, &name)?.port = port;
            Ok(None)
        }
        StoreRequest::SetRoomState { name, status, port } => {
            let room = room_mut(tables, &name)?;
            room.status = status;
            room.port = port;
            Ok(None)
        }
        StoreRequest::UpdateRoomGuests {
            name,
            action,
            guest_name,
        } => update_guests(tables, name, action, guest_name),
        StoreRequest::RemoveRoom { name } => {
            tables.rooms.remove(&name);
            Ok(None)
        }

        StoreRequest::CreateGame {
            name,
            dev,
            kind,
            players,
            description,
        } => create_game(tables, name, dev, kind, players, description),
        StoreRequest::QueryGame { criteria } => {
            select(tables.games.values(), GAME_FIELDS, &criteria)
        }
        StoreRequest::UpdateGame { name, updates } => update_game(tables, name, updates),
        StoreRequest::AddFeedback { name, feedback } => add_feedback(tables, name, feedback),
    }
}

/// Rows whose fields equal every criteria value, as a JSON array.
fn select<'a, T, I>(rows: I, fields: &[&str], criteria: &Criteria) -> Result<Option<Value>, StoreError>
where
    T: Serialize + 'a,
    I: Iterator<Item = &'a T>,
{
    if let Some(field) = criteria.keys().find(|key| !fields.contains(&key.as_str())) {
        return Err(StoreError::UnknownField {
            field: field.clone(),
        });
    }

    let mut matched = Vec::new();
    for row in rows {
        let row = serde_json::to_value(row)?;
        if criteria
            .iter()
            .all(|(field, wanted)| row.get(field) == Some(wanted))
        {
            matched.push(row);
        }
    }
    Ok(Some(Value::Array(matched)))
}

fn create_account(
    tables: &mut Tables,
    kind: AccountKind,
    name: String,
    password: String,
) -> Result<Option<Value>, StoreError> {
    if !is_safe_name(&name) {
        return Err(StoreError::InvalidField {
            field: "name".to_string(),
            reason: "not a usable name".to_string(),
        });
    }

    let accounts = tables.accounts_mut(kind);
    if accounts.contains_key(&name) {
        return Err(StoreError::AlreadyExists {
            table: kind.noun(),
            name,
        });
    }

    accounts.insert(name.clone(), Account::new(name, password));
    Ok(None)
}

fn account_mut<'a>(
    tables: &'a mut Tables,
    kind: AccountKind,
    name: &str,
) -> Result<&'a mut Account, StoreError> {
    tables
        .accounts_mut(kind)
        .get_mut(name)
        .ok_or_else(|| StoreError::NotFound {
            table: kind.noun(),
            name: name.to_string(),
        })
}

fn update_status(
    tables: &mut Tables,
    kind: AccountKind,
    name: String,
    status: AccountStatus,
    expected: Option<AccountStatus>,
) -> Result<Option<Value>, StoreError> {
    let account = account_mut(tables, kind, &name)?;
    if let Some(expected) = expected {
        if account.status != expected {
            return Err(StoreError::StatusConflict { name });
        }
    }
    account.status = status;
    Ok(None)
}

fn update_library(
    tables: &mut Tables,
    kind: AccountKind,
    name: String,
    change: LibraryChange,
) -> Result<Option<Value>, StoreError> {
    let games = &mut account_mut(tables, kind, &name)?.games;

    match change {
        LibraryChange::Add(entry) => {
            if !games.iter().any(|owned| owned.name() == entry.name()) {
                games.push(entry);
            }
        }
        LibraryChange::UpdateVersion(OwnedGame(game, version)) => {
            match games.iter_mut().find(|owned| owned.name() == game) {
                Some(owned) => owned.1 = version,
                None => games.push(OwnedGame(game, version)),
            }
        }
        LibraryChange::Remove(game) => games.retain(|owned| owned.name() != game),
    }
    Ok(None)
}

fn room_mut<'a>(tables: &'a mut Tables, name: &str) -> Result<&'a mut Room, StoreError> {
    tables
        .rooms
        .get_mut(name)
        .ok_or_else(|| StoreError::NotFound {
            table: "room",
            name: name.to_string(),
        })
}

fn create_room(
    tables: &mut Tables,
    name: String,
    game: String,
    host: String,
    player_limit: u32,
) -> Result<Option<Value>, StoreError> {
    if player_limit == 0 {
        return Err(StoreError::InvalidField {
            field: "player_limit".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    if tables.rooms.contains_key(&name) {
        return Err(StoreError::AlreadyExists {
            table: "room",
            name,
        });
    }

    tables
        .rooms
        .insert(name.clone(), Room::new(name, game, host, player_limit));
    Ok(None)
}

fn update_guests(
    tables: &mut Tables,
    name: String,
    action: GuestAction,
    guest: String,
) -> Result<Option<Value>, StoreError> {
    let room = room_mut(tables, &name)?;

    match action {
        GuestAction::Add => {
            if room.host == guest || room.guests.contains(&guest) {
                return Ok(None);
            }
            if room.is_full() {
                return Err(StoreError::RoomFull { name });
            }
            room.guests.push(guest);
        }
        GuestAction::Remove => room.guests.retain(|existing| *existing != guest),
    }
    Ok(None)
}

fn create_game(
    tables: &mut Tables,
    name: String,
    dev: String,
    kind: GameKind,
    players: u32,
    description: String,
) -> Result<Option<Value>, StoreError> {
    if !is_safe_name(&name) {
        return Err(StoreError::InvalidField {
            field: "name".to_string(),
            reason: "not a usable name".to_string(),
        });
    }
    if players < Game::MIN_PLAYERS {
        return Err(StoreError::InvalidField {
            field: "players".to_string(),
            reason: format!("must be at least {}", Game::MIN_PLAYERS),
        });
    }
    if tables.games.contains_key(&name) {
        return Err(StoreError::AlreadyExists {
            table: "game",
            name,
        });
    }

    let game = Game {
        name: name.clone(),
        dev,
        version: 1,
        status: GameStatus::Up,
        kind,
        players,
        description,
        feedback: Vec::new(),
    };
    tables.games.insert(name, game);
    Ok(None)
}

fn update_game(
    tables: &mut Tables,
    name: String,
    updates: Map<String, Value>,
) -> Result<Option<Value>, StoreError> {
    let game = tables
        .games
        .get_mut(&name)
        .ok_or_else(|| StoreError::NotFound {
            table: "game",
            name: name.clone(),
        })?;

    for field in updates.keys() {
        if !GAME_FIELDS.contains(&field.as_str()) {
            return Err(StoreError::UnknownField {
                field: field.clone(),
            });
        }
        if FROZEN_GAME_FIELDS.contains(&field.as_str()) {
            return Err(StoreError::InvalidField {
                field: field.clone(),
                reason: "cannot be changed".to_string(),
            });
        }
    }
    if updates.is_empty() {
        return Ok(None);
    }

    let mut merged = serde_json::to_value(&*game)?;
    if let Value::Object(fields) = &mut merged {
        fields.extend(updates);
    }
    let patched: Game =
        serde_json::from_value(merged).map_err(|e| StoreError::InvalidField {
            field: "updates".to_string(),
            reason: e.to_string(),
        })?;

    if patched.version < game.version {
        return Err(StoreError::VersionRegression {
            current: game.version,
            requested: patched.version,
        });
    }
    if patched.players < Game::MIN_PLAYERS {
        return Err(StoreError::InvalidField {
            field: "players".to_string(),
            reason: format!("must be at least {}", Game::MIN_PLAYERS),
        });
    }

    *game = patched;
    Ok(None)
}

fn add_feedback(
    tables: &mut Tables,
    name: String,
    feedback: Feedback,
) -> Result<Option<Value>, StoreError> {
    if !(Feedback::MIN_STARS..=Feedback::MAX_STARS).contains(&feedback.stars()) {
        return Err(StoreError::InvalidField {
            field: "feedback".to_string(),
            reason: format!(
                "stars must be between {} and {}",
                Feedback::MIN_STARS,
                Feedback::MAX_STARS
            ),
        });
    }

    let game = tables
        .games
        .get_mut(&name)
        .ok_or_else(|| StoreError::NotFound {
            table: "game",
            name: name.clone(),
        })?;
    game.feedback.push(feedback);
    Ok(None)
}
