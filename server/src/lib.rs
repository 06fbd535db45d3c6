//! # Game Platform Server Library
//!
//! This library implements the three server processes of the game
//! distribution platform: the catalog store, the developer-facing session
//! server and the player-facing session server. Developers publish game
//! bundles, players browse the catalog, download client programs, review
//! games and meet in rooms to play matches on launched game servers.
//!
//! ## Core Responsibilities
//!
//! ### Catalog Persistence
//! The catalog store owns every player, developer, room and game record.
//! Session servers never hold catalog state of their own: each decision is
//! made from a fresh read, and each change is one store request.
//!
//! ### Client Sessions
//! Every TCP connection to a session server gets a session task that drives
//! a menu state machine over framed JSON messages:
//! - Pre-authentication: login, registration, exit
//! - Player menus: paginated catalog, details, download, reviews, lobbies
//! - Developer menus: upload, read, update and take down games
//! - Cleanup of rooms and login state when the connection ends
//!
//! ### Match Coordination
//! A host starts a full room by having the server pick a free port, record
//! the room as active, launch the game's server program and point the
//! host's client at it. Guests learn the port by polling the room record.
//!
//! ## Architecture Design
//!
//! ### Task Per Connection
//! Both the store and the session servers accept connections in a loop and
//! spawn a tokio task per connection. A failing connection is logged and
//! cleaned up inside its task; the accept loop never stops for it.
//!
//! ### Stateless Sessions
//! Sessions share nothing but an [`network::ServerContext`]: configuration,
//! the store client, game file storage, the port allocator and the game
//! launcher. Sessions coordinate only through the catalog store.
//!
//! ### Length-Prefixed Framing
//! All traffic, both client-to-server and server-to-store, uses the frames of
//! [`shared::framing`]: a 4-byte big-endian length and a JSON payload of at
//! most 64 KiB.
//!
//! ## Module Organization
//!
//! ### Store Module (`store`)
//! The catalog tables, request handling, the TCP service and the optional
//! bincode snapshot.
//!
//! ### Store Client Module (`store_client`)
//! One short-lived connection per request. Transport failures become error
//! responses so callers never see a panic or a hung session.
//!
//! ### Session Module (`session`)
//! The per-connection state machine. Authentication, player and developer
//! menus live in submodules.
//!
//! ### Lobby Module (`lobby`)
//! Room creation, joining, match start and guest polling.
//!
//! ### Support Modules
//! - `connection`: typed instructions and validated replies over a transport
//! - `transfer`: collecting an uploaded game bundle
//! - `storage`: the on-disk game directory
//! - `ports`: free port probing
//! - `launcher`: spawning game server programs
//! - `config`, `error`
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::network::SessionServer;
//! use server::store::service::StoreServer;
//! use server::store::CatalogStore;
//! use shared::models::AccountKind;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = StoreServer::bind("127.0.0.1:7000", CatalogStore::new()).await?;
//!     tokio::spawn(store.run());
//!
//!     // Player sessions read and write the catalog through the store above
//!     let players = SessionServer::bind(
//!         "0.0.0.0:7002",
//!         AccountKind::Player,
//!         ServerConfig::default(),
//!     )
//!     .await?;
//!     players.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod launcher;
pub mod lobby;
pub mod network;
pub mod ports;
pub mod session;
pub mod storage;
pub mod store;
pub mod store_client;
pub mod transfer;
