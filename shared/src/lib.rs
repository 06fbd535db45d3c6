//! # Shared Wire Vocabulary
//!
//! Types and codecs spoken by every process of the game platform: the
//! catalog store, the player and developer session servers, and the terminal
//! client.
//!
//! ## Module Organization
//!
//! ### Framing (`framing`)
//! Length-prefixed JSON frames over any async byte stream:
//! - 4-byte big-endian length prefix
//! - 64 KiB payload limit enforced on both send and receive
//! - clean close reported as `None`, not as an error
//!
//! ### Session Protocol (`protocol`)
//! Messages a session server sends to its client (`display`, `connect`,
//! `save`, `upload`) and the single reply shape the client answers with.
//! Input specifications are a closed enum with their own validation so both
//! ends agree on what a legal reply looks like.
//!
//! ### Data Model (`models`)
//! Accounts, games and rooms as persisted by the catalog store.
//!
//! ### Catalog Store Vocabulary (`catalog`)
//! Request and response objects of the catalog store service.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use shared::{recv_frame, send_frame, ClientReply, ServerMessage};
//! use tokio::net::TcpStream;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut stream = TcpStream::connect("127.0.0.1:7002").await?;
//!
//!     while let Some(message) = recv_frame::<_, ServerMessage>(&mut stream).await? {
//!         if let ServerMessage::Display { text, input } = message {
//!             println!("{}", text);
//!             if input.expects_reply() {
//!                 send_frame(&mut stream, &ClientReply::text("3")).await?;
//!             }
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod framing;
pub mod models;
pub mod protocol;

pub use catalog::{criteria, Criteria, GuestAction, LibraryChange, StoreRequest, StoreResponse};
pub use framing::{recv_frame, send_frame, FrameError, MAX_FRAME_SIZE};
pub use models::{
    is_safe_name, Account, AccountKind, AccountStatus, Feedback, Game, GameKind, GameStatus,
    OwnedGame, Room, RoomStatus,
};
pub use protocol::{ClientReply, InputError, InputSpec, ServerMessage};

/// Game server program inside a game's directory.
pub const SERVER_PROGRAM: &str = "server.py";
/// Game client program inside a game's directory.
pub const CLIENT_PROGRAM: &str = "client.py";
/// Free-text description shipped with every upload.
pub const DESCRIPTION_FILE: &str = "description.txt";
/// Top-level directory holding game files, on both server and client.
pub const GAMES_DIR: &str = "games";

/// Files a developer ships for one game, in transfer order.
pub const GAME_FILES: [&str; 3] = [SERVER_PROGRAM, CLIENT_PROGRAM, DESCRIPTION_FILE];
