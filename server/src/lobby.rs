//! Room lobby: creating, joining and running multiplayer rooms
//!
//! Host and guest sessions never talk to each other. They meet in the
//! catalog store: the host writes the room's state, guests re-read it every
//! poll interval. Starting a match takes these steps, in order:
//!
//! 1. probe a free port in the configured range
//! 2. mark the room active on that port (one atomic store write)
//! 3. launch the game's server program on the port
//! 4. tell the host's client to connect its game client
//! 5. wait for the game server to exit
//! 6. mark the room inactive on port 0
//!
//! Guests notice step 2 on their next poll and receive the same port. The
//! host's session task is pinned to the match until step 5 completes.

use log::{info, warn};
use rand::Rng;
use shared::catalog::{criteria, GuestAction, StoreRequest};
use shared::models::{Game, Room, RoomStatus};
use tokio::process::Child;

use crate::connection::Transport;
use crate::error::{LobbyError, SessionError};
use crate::network::ServerContext;
use crate::session::{client_copy_path, numbered_menu, Session};
use crate::store::IDLE_ROOM;

const ROOM_CODE_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const ROOM_CODE_LEN: usize = 6;

/// Random room code of uppercase letters and digits.
pub fn room_code() -> String {
    let mut rng = rand::thread_rng();
    (0..ROOM_CODE_LEN)
        .map(|_| ROOM_CODE_CHARS[rng.gen_range(0..ROOM_CODE_CHARS.len())] as char)
        .collect()
}

/// Steps 1 to 3. On a launch failure the room is reset before returning.
async fn activate(ctx: &ServerContext, room: &Room) -> Result<(u16, Child), LobbyError> {
    let port = ctx.ports.allocate().ok_or(LobbyError::NoFreePort)?;

    let response = ctx
        .store
        .request(&StoreRequest::SetRoomState {
            name: room.name.clone(),
            status: RoomStatus::Active,
            port,
        })
        .await;
    if !response.is_success() {
        return Err(LobbyError::Activation(response.reason().to_string()));
    }

    let program = ctx.files.server_program(&room.game);
    match ctx.launcher.spawn(&program, &ctx.config.bind_host, port) {
        Ok(child) => Ok((port, child)),
        Err(e) => {
            deactivate(ctx, &room.name).await;
            Err(LobbyError::Launch(e))
        }
    }
}

async fn deactivate(ctx: &ServerContext, room: &str) {
    let (status, port) = IDLE_ROOM;
    let response = ctx
        .store
        .request(&StoreRequest::SetRoomState {
            name: room.to_string(),
            status,
            port,
        })
        .await;
    if !response.is_success() {
        warn!("Could not reset room {}: {}", room, response.reason());
    }
}

impl<S: Transport> Session<S> {
    /// Lobby of one game; returns on "Back".
    pub(crate) async fn lobby(&mut self, player: &str, game: &Game) -> Result<(), SessionError> {
        loop {
            let text = format!(
                "--- {} Lobby ---\n1. Create Room\n2. Join Room\n3. Back",
                game.name
            );
            match self.conn.choose(text, 3).await? {
                1 => self.create_room(player, game).await?,
                2 => self.join_room(player, &game.name).await?,
                _ => return Ok(()),
            }
        }
    }

    async fn create_room(&mut self, host: &str, game: &Game) -> Result<(), SessionError> {
        let code = room_code();
        let response = self
            .ctx
            .store
            .request(&StoreRequest::CreateRoom {
                name: code.clone(),
                game: game.name.clone(),
                host: host.to_string(),
                player_limit: game.players,
            })
            .await;
        if !response.is_success() {
            return self
                .conn
                .show(format!("Error creating room: {}", response.reason()))
                .await;
        }

        info!("{} opened room {} for {}", host, code, game.name);
        self.hosted_room = Some(code.clone());
        self.host_room(host, &code).await
    }

    async fn host_room(&mut self, host: &str, code: &str) -> Result<(), SessionError> {
        loop {
            let text = format!("--- Room: {} (Host) ---\n1. Start Game\n2. Delete Room", code);
            if self.conn.choose(text, 2).await? != 1 {
                let removed = self
                    .ctx
                    .store
                    .request(&StoreRequest::RemoveRoom {
                        name: code.to_string(),
                    })
                    .await;
                if !removed.is_success() {
                    warn!("Could not delete room {}: {}", code, removed.reason());
                    self.conn
                        .show(format!("Error deleting room: {}", removed.reason()))
                        .await?;
                    continue;
                }
                self.hosted_room = None;
                info!("{} deleted room {}", host, code);
                return self.conn.show("Room deleted.").await;
            }

            let room = match self.ctx.store.room(code).await {
                Some(rows) => rows.into_iter().next(),
                None => {
                    self.conn
                        .show("Error: the room registry is unavailable.")
                        .await?;
                    continue;
                }
            };
            let Some(room) = room else {
                self.hosted_room = None;
                return self.conn.show("Error: Room not found.").await;
            };

            if !room.ready_to_start() {
                self.conn
                    .show(format!(
                        "Room not full ({}/{}). Cannot start.",
                        room.occupancy(),
                        room.player_limit
                    ))
                    .await?;
                continue;
            }

            self.run_match(host, &room).await?;
        }
    }

    /// Runs one match of a full room and returns once the game server has
    /// exited and the room is idle again.
    async fn run_match(&mut self, host: &str, room: &Room) -> Result<(), SessionError> {
        let (port, mut child) = match activate(&self.ctx, room).await {
            Ok(started) => started,
            Err(e) => {
                warn!("Could not start room {}: {}", room.name, e);
                return self.conn.show(format!("Error: {}", e)).await;
            }
        };
        info!("Room {} active on port {}", room.name, port);

        let sent = self
            .conn
            .connect_game(
                client_copy_path(host, &room.game),
                self.ctx.config.game_host.as_str(),
                port,
            )
            .await;

        match child.wait().await {
            Ok(status) => info!("Game in room {} finished ({})", room.name, status),
            Err(e) => warn!("Lost track of the game server of room {}: {}", room.name, e),
        }
        deactivate(&self.ctx, &room.name).await;
        sent
    }

    async fn join_room(&mut self, player: &str, game: &str) -> Result<(), SessionError> {
        let Some(rooms) = self.ctx.store.rooms(criteria([("game", game)])).await else {
            return self
                .conn
                .show("Error: the room registry is unavailable.")
                .await;
        };
        if rooms.is_empty() {
            return self.conn.show("No rooms found for this game.").await;
        }

        let (text, count) = numbered_menu(
            "--- Available Rooms ---",
            rooms.iter().map(|room| {
                format!(
                    "{} (Host: {}) [{}/{}]",
                    room.name,
                    room.host,
                    room.occupancy(),
                    room.player_limit
                )
            }),
            Some("Back"),
        );
        let choice = self.conn.choose(text, count).await?;
        let Some(room) = choice.checked_sub(1).and_then(|index| rooms.get(index)) else {
            return Ok(());
        };

        if room.is_full() {
            return self.conn.show("Room is full.").await;
        }

        let response = self
            .ctx
            .store
            .request(&StoreRequest::UpdateRoomGuests {
                name: room.name.clone(),
                action: GuestAction::Add,
                guest_name: player.to_string(),
            })
            .await;
        if !response.is_success() {
            return self
                .conn
                .show(format!("Could not join {}: {}", room.name, response.reason()))
                .await;
        }

        info!("{} joined room {}", player, room.name);
        self.joined_room = Some(room.name.clone());
        self.conn
            .show(format!("Joined {}. Waiting for host...", room.name))
            .await?;

        self.wait_as_guest(player, &room.name, game).await?;
        self.joined_room = None;
        self.conn.show("Host closed the room.").await
    }

    /// Follows a room as a guest until it disappears.
    async fn wait_as_guest(&mut self, player: &str, code: &str, game: &str) -> Result<(), SessionError> {
        loop {
            let Some(room) = self.poll_room(code).await? else {
                return Ok(());
            };
            if !room.is_running() {
                continue;
            }

            self.conn
                .connect_game(
                    client_copy_path(player, game),
                    self.ctx.config.game_host.as_str(),
                    room.port,
                )
                .await?;

            loop {
                let Some(room) = self.poll_room(code).await? else {
                    return Ok(());
                };
                if room.status == RoomStatus::Inactive {
                    break;
                }
            }
            self.conn
                .show("Game finished. Returning to lobby...")
                .await?;
        }
    }

    /// Waits one poll interval, then re-reads the room. `Ok(None)` means the
    /// room is gone. Store failures are retried on the next interval; a
    /// client hang-up during the wait ends the session.
    async fn poll_room(&mut self, code: &str) -> Result<Option<Room>, SessionError> {
        let interval = self.ctx.config.poll_interval;
        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                err = self.conn.closed() => return Err(err),
            }

            if let Some(rows) = self.ctx.store.room(code).await {
                return Ok(rows.into_iter().next());
            }
        }
    }
}
