//! Per-connection session state machine
//!
//! A session walks one client through
//!
//! ```text
//! PreAuth --login--> Authenticated --logout--> PreAuth
//!    |                     |
//!   exit              disconnect
//! ```
//!
//! The authenticated menu depends on the account kind: players browse the
//! catalog and enter room lobbies, developers manage their published games.
//! Whatever way the connection ends, [`Session::run`] releases what the
//! session holds: a hosted room is removed, a joined room loses this guest
//! and the account goes back offline.

mod auth;
mod developer;
mod player;

pub use auth::{check_credentials, LoginRejection};
pub use player::{CatalogChoice, CatalogPage};

use std::sync::Arc;

use log::{info, warn};
use shared::catalog::{GuestAction, StoreRequest};
use shared::models::{AccountKind, AccountStatus, Game};
use shared::framing::encode_frame;
use shared::protocol::ServerMessage;
use shared::{CLIENT_PROGRAM, GAMES_DIR};

use crate::connection::{Connection, Transport};
use crate::error::SessionError;
use crate::network::ServerContext;

pub struct Session<S> {
    pub(crate) conn: Connection<S>,
    pub(crate) ctx: Arc<ServerContext>,
    kind: AccountKind,
    user: Option<String>,
    pub(crate) hosted_room: Option<String>,
    pub(crate) joined_room: Option<String>,
}

impl<S: Transport> Session<S> {
    pub fn new(conn: Connection<S>, ctx: Arc<ServerContext>, kind: AccountKind) -> Self {
        Self {
            conn,
            ctx,
            kind,
            user: None,
            hosted_room: None,
            joined_room: None,
        }
    }

    /// Drives the connection to its end, then cleans up.
    pub async fn run(mut self) {
        let peer = self.conn.peer().to_string();
        match self.drive().await {
            Ok(()) => info!("{} exited", peer),
            Err(SessionError::Disconnected) => info!("{} disconnected", peer),
            Err(e) => warn!("Session with {} ended: {}", peer, e),
        }
        self.cleanup().await;
    }

    async fn drive(&mut self) -> Result<(), SessionError> {
        loop {
            let Some(name) = self.pre_auth().await? else {
                return Ok(());
            };
            self.user = Some(name.clone());

            match self.kind {
                AccountKind::Player => self.player_menu(&name).await?,
                AccountKind::Developer => self.developer_menu(&name).await?,
            }
            self.logout(&name).await;
        }
    }

    async fn logout(&mut self, name: &str) {
        self.set_offline(name).await;
        self.user = None;
        info!("{} logged out", name);
    }

    async fn set_offline(&self, name: &str) {
        let response = self
            .ctx
            .store
            .request(&StoreRequest::update_account_status(
                self.kind,
                name,
                AccountStatus::Offline,
                None,
            ))
            .await;
        if !response.is_success() {
            warn!("Could not mark {} offline: {}", name, response.reason());
        }
    }

    async fn cleanup(&mut self) {
        let store = &self.ctx.store;

        if let Some(room) = self.hosted_room.take() {
            info!("Removing room {} left behind by its host", room);
            store.request(&StoreRequest::RemoveRoom { name: room }).await;
        }

        if let (Some(room), Some(user)) = (self.joined_room.take(), self.user.as_deref()) {
            info!("Removing {} from room {}", user, room);
            store
                .request(&StoreRequest::UpdateRoomGuests {
                    name: room,
                    action: GuestAction::Remove,
                    guest_name: user.to_string(),
                })
                .await;
        }

        if let Some(user) = self.user.take() {
            self.set_offline(&user).await;
        }
    }
}

/// Longest account name or password the login menu accepts.
pub(crate) const CREDENTIAL_MAX_LEN: usize = 20;

/// Where a player's client keeps its downloaded copy of `game`.
pub fn client_copy_path(player: &str, game: &str) -> String {
    format!("{}/{}/{}/{}", GAMES_DIR, player, game, CLIENT_PROGRAM)
}

/// Whether the client program `content` of `game` can be pushed to every
/// possible player in a single frame.
pub fn fits_download(game: &str, content: &str) -> bool {
    // A quote is the widest name character once JSON-escaped.
    let widest_player = "\"".repeat(CREDENTIAL_MAX_LEN);
    encode_frame(&ServerMessage::Save {
        path: client_copy_path(&widest_player, game),
        file_data: content.to_string(),
    })
    .is_ok()
}

/// Multi-line description of a game for the details screens.
pub(crate) fn describe_game(game: &Game, with_status: bool) -> String {
    let mut text = format!("--- {} ---\nDeveloper: {}\nVersion: {}\n", game.name, game.dev, game.version);
    if with_status {
        let status = if game.is_up() { "up" } else { "down" };
        text.push_str(&format!("Status: {}\n", status));
    }
    text.push_str(&format!(
        "Type: {}\nPlayers: {}\n",
        game.kind.label(),
        game.players
    ));

    match game.average_rating() {
        Some(rating) => text.push_str(&format!(
            "Rating: {:.1}/5 ({} reviews)\n",
            rating,
            game.feedback.len()
        )),
        None => text.push_str("Rating: No ratings yet\n"),
    }

    if game.description.is_empty() {
        text.push_str("Description: No description\n");
    } else {
        text.push_str(&format!("Description:\n====\n{}\n====\n", game.description.trim_end()));
    }

    if game.feedback.is_empty() {
        text.push_str("Feedback: No feedback");
    } else {
        text.push_str("Feedback:\n====\n");
        for review in &game.feedback {
            text.push_str(&format!(
                "User {} ({} stars): {}\n",
                review.reviewer(),
                review.stars(),
                review.comment()
            ));
        }
        text.push_str("====");
    }
    text
}

/// Numbered menu: a header line, one line per item, and optionally a
/// trailing entry (such as "Back"). Returns the text and the option count.
pub(crate) fn numbered_menu<I>(header: &str, items: I, last: Option<&str>) -> (String, usize)
where
    I: IntoIterator<Item = String>,
{
    let mut text = String::from(header);
    let mut count = 0;
    for item in items {
        count += 1;
        text.push_str(&format!("\n{}. {}", count, item));
    }
    if let Some(last) = last {
        count += 1;
        text.push_str(&format!("\n{}. {}", count, last));
    }
    (text, count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{Feedback, GameKind, GameStatus};

    fn ooxx() -> Game {
        Game {
            name: "ooxx".into(),
            dev: "dan".into(),
            version: 2,
            status: GameStatus::Down,
            kind: GameKind::Cli,
            players: 2,
            description: "tic tac toe\n".into(),
            feedback: vec![
                Feedback("bob".into(), 4, "fun".into()),
                Feedback("eve".into(), 5, "great".into()),
            ],
        }
    }

    #[test]
    fn test_client_copy_path() {
        assert_eq!(client_copy_path("bob", "ooxx"), "games/bob/ooxx/client.py");
    }

    #[test]
    fn test_fits_download_leaves_room_for_the_save_envelope() {
        assert!(fits_download("ooxx", "print('hi')\n"));

        // Fits in an upload reply, but not in the save frame that delivers it.
        let uploadable = "x".repeat(shared::MAX_FRAME_SIZE - 40);
        assert!(shared::framing::encode_frame(&shared::protocol::ClientReply::file(uploadable.clone())).is_ok());
        assert!(!fits_download("ooxx", &uploadable));
    }

    #[test]
    fn test_describe_game() {
        let text = describe_game(&ooxx(), true);
        assert!(text.starts_with("--- ooxx ---\nDeveloper: dan\nVersion: 2\nStatus: down\n"));
        assert!(text.contains("Rating: 4.5/5 (2 reviews)"));
        assert!(text.contains("Description:\n====\ntic tac toe\n====\n"));
        assert!(text.ends_with("User bob (4 stars): fun\nUser eve (5 stars): great\n===="));

        let mut bare = ooxx();
        bare.feedback.clear();
        bare.description.clear();
        let text = describe_game(&bare, false);
        assert!(!text.contains("Status:"));
        assert!(text.contains("Rating: No ratings yet"));
        assert!(text.contains("Description: No description"));
        assert!(text.ends_with("Feedback: No feedback"));
    }

    #[test]
    fn test_numbered_menu() {
        let (text, count) = numbered_menu(
            "--- Available Rooms ---",
            vec!["AB12CD (Host: alice) [1/2]".to_string()],
            Some("Back"),
        );
        assert_eq!(count, 2);
        assert_eq!(
            text,
            "--- Available Rooms ---\n1. AB12CD (Host: alice) [1/2]\n2. Back"
        );
    }
}
