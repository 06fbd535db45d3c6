//! Runtime configuration shared by the session servers

use std::ops::Range;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_STORE_ADDR: &str = "127.0.0.1:7000";
pub const DEFAULT_DEVELOPER_PORT: u16 = 7001;
pub const DEFAULT_PLAYER_PORT: u16 = 7002;
pub const DEFAULT_GAME_PORTS: Range<u16> = 20000..20100;
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_PAGE_SIZE: usize = 9;

/// Settings a session server carries into every connection task.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address of the catalog store service.
    pub store_addr: String,
    /// Interface game servers bind to, also used for port probing.
    pub bind_host: String,
    /// Host clients are told to connect their game client to.
    pub game_host: String,
    /// Candidate ports for game servers.
    pub game_ports: Range<u16>,
    /// Server-side game file storage.
    pub games_dir: PathBuf,
    /// Interval between room re-reads while a guest waits.
    pub poll_interval: Duration,
    /// Games per page of the player catalog.
    pub page_size: usize,
    /// Command prefix used to run a game's server program.
    pub launcher: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            store_addr: DEFAULT_STORE_ADDR.to_string(),
            bind_host: "0.0.0.0".to_string(),
            game_host: "127.0.0.1".to_string(),
            game_ports: DEFAULT_GAME_PORTS,
            games_dir: PathBuf::from(shared::GAMES_DIR),
            poll_interval: DEFAULT_POLL_INTERVAL,
            page_size: DEFAULT_PAGE_SIZE,
            launcher: vec!["python3".to_string()],
        }
    }
}
