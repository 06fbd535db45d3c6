//! # Game Platform Client Library
//!
//! This library implements the terminal client of the game distribution
//! platform. The client keeps no menu state: the session server decides what
//! is shown and which replies are acceptable, and the client carries out its
//! instructions one frame at a time.
//!
//! ## Instructions
//!
//! ### Display
//! Prints the text. When the attached input specification expects a reply,
//! the client prompts until the typed line satisfies it and sends it back.
//! Invalid lines never reach the server.
//!
//! ### Save
//! Writes a pushed file (a downloaded game client) below the client root,
//! creating directories as needed.
//!
//! ### Upload
//! Reads a local file and sends its content back, or reports a failure when
//! the file cannot be read.
//!
//! ### Connect
//! Starts the local game client program against a launched game server. The
//! program runs detached, so the menu session continues alongside it.
//!
//! Instructions with an unknown `op` are logged and skipped.
//!
//! ## Module Organization
//!
//! - `network`: the instruction loop over the server connection
//! - `input`: the local reply retry loop
//! - `rendering`: terminal output
//! - `transfer`: files below the client root
//! - `game`: launching game client programs
//! - `error`: [`error::ClientError`]
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::game::GameRunner;
//! use client::network::Client;
//! use client::transfer::LocalFiles;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut client = Client::connect(
//!         "127.0.0.1:7002",
//!         LocalFiles::new("."),
//!         GameRunner::new(vec!["python3".into()]),
//!     )
//!     .await?;
//!
//!     // Returns when the server closes the connection
//!     client.run().await?;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod game;
pub mod input;
pub mod network;
pub mod rendering;
pub mod transfer;
