//! Collecting a developer's game files over the session connection

use log::info;
use shared::{CLIENT_PROGRAM, GAMES_DIR, GAME_FILES};

use crate::connection::{Connection, Transport};
use crate::error::SessionError;
use crate::session::fits_download;

/// The three files that make up one game upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameBundle {
    pub name: String,
    pub server: String,
    pub client: String,
    pub description: String,
}

/// Outcome of a collection attempt that kept the connection intact.
#[derive(Debug, PartialEq, Eq)]
pub enum Collected {
    Complete(GameBundle),
    /// The client could not provide this file; nothing was kept.
    Failed(&'static str),
    /// This file could never be delivered to players; nothing was kept.
    TooLarge(&'static str),
}

/// Path a developer's client reads `file` of `game` from.
pub fn upload_path(game: &str, file: &str) -> String {
    format!("{}/{}/{}", GAMES_DIR, game, file)
}

impl GameBundle {
    /// Pulls server program, client program and description in that order.
    /// Stops at the first file the client cannot provide, or at a client
    /// program too large to push back out to players.
    pub async fn collect<S: Transport>(
        conn: &mut Connection<S>,
        game: &str,
    ) -> Result<Collected, SessionError> {
        let mut contents = Vec::with_capacity(3);
        for file in GAME_FILES {
            match conn.pull_file(upload_path(game, file)).await? {
                Some(content) if file == CLIENT_PROGRAM && !fits_download(game, &content) => {
                    info!("Upload of {} aborted: {} too large to deliver", game, file);
                    return Ok(Collected::TooLarge(file));
                }
                Some(content) => contents.push(content),
                None => {
                    info!("Upload of {} aborted at {}", game, file);
                    return Ok(Collected::Failed(file));
                }
            }
        }

        let mut contents = contents.into_iter();
        let mut next = || contents.next().unwrap_or_default();
        Ok(Collected::Complete(GameBundle {
            name: game.to_string(),
            server: next(),
            client: next(),
            description: next(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use shared::framing::{recv_frame, send_frame};
    use tokio::io::duplex;

    #[tokio::test]
    async fn test_collects_files_in_order() {
        let (server, mut client) = duplex(64 * 1024);
        let mut conn = Connection::new(server, "dev");

        tokio::spawn(async move {
            for expected in ["server.py", "client.py", "description.txt"] {
                let request: Value = recv_frame(&mut client).await.unwrap().unwrap();
                assert_eq!(request["path"], format!("games/ooxx/{}", expected));
                send_frame(&mut client, &json!({"response": "success", "file data": expected}))
                    .await
                    .unwrap();
            }
            client
        });

        let collected = GameBundle::collect(&mut conn, "ooxx").await.unwrap();
        assert_eq!(
            collected,
            Collected::Complete(GameBundle {
                name: "ooxx".into(),
                server: "server.py".into(),
                client: "client.py".into(),
                description: "description.txt".into(),
            })
        );
    }

    #[tokio::test]
    async fn test_stops_at_first_missing_file() {
        let (server, mut client) = duplex(64 * 1024);
        let mut conn = Connection::new(server, "dev");

        let peer = tokio::spawn(async move {
            let _: Option<Value> = recv_frame(&mut client).await.unwrap();
            send_frame(&mut client, &json!({"response": "success", "file data": "x"}))
                .await
                .unwrap();
            let _: Option<Value> = recv_frame(&mut client).await.unwrap();
            send_frame(&mut client, &json!({"response": "error"}))
                .await
                .unwrap();
            client
        });

        let collected = GameBundle::collect(&mut conn, "ooxx").await.unwrap();
        assert_eq!(collected, Collected::Failed("client.py"));

        // No request for the description follows the failure.
        let mut client = peer.await.unwrap();
        drop(conn);
        let rest: Option<Value> = recv_frame(&mut client).await.unwrap();
        assert!(rest.is_none());
    }

    #[tokio::test]
    async fn test_rejects_client_program_players_cannot_receive() {
        let (server, mut client) = duplex(256 * 1024);
        let mut conn = Connection::new(server, "dev");
        // Fits in the upload reply with a few bytes to spare.
        let client_py = "#".repeat(shared::MAX_FRAME_SIZE - 37);

        let peer = tokio::spawn(async move {
            let _: Option<Value> = recv_frame(&mut client).await.unwrap();
            send_frame(&mut client, &json!({"response": "success", "file data": "x"}))
                .await
                .unwrap();
            let _: Option<Value> = recv_frame(&mut client).await.unwrap();
            send_frame(&mut client, &json!({"response": "success", "file data": client_py}))
                .await
                .unwrap();
            client
        });

        let collected = GameBundle::collect(&mut conn, "ooxx").await.unwrap();
        assert_eq!(collected, Collected::TooLarge("client.py"));

        let mut client = peer.await.unwrap();
        drop(conn);
        let rest: Option<Value> = recv_frame(&mut client).await.unwrap();
        assert!(rest.is_none());
    }
}
