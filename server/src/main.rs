use clap::{Args, Parser, Subcommand};
use log::info;
use server::config::{
    ServerConfig, DEFAULT_DEVELOPER_PORT, DEFAULT_PAGE_SIZE, DEFAULT_PLAYER_PORT,
    DEFAULT_STORE_ADDR,
};
use server::network::SessionServer;
use server::store::service::StoreServer;
use server::store::CatalogStore;
use shared::models::AccountKind;
use std::ops::Range;
use std::path::PathBuf;
use std::time::Duration;

/// Game platform servers
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Cli {
    #[clap(subcommand)]
    role: Role,
}

#[derive(Subcommand, Debug)]
enum Role {
    /// Run the catalog store
    Store {
        /// IP address to bind to
        #[clap(short = 'H', long, default_value = "127.0.0.1")]
        host: String,
        /// Port to listen on
        #[clap(short, long, default_value = "7000")]
        port: u16,
        /// Snapshot file; the catalog is kept in memory only when omitted
        #[clap(long)]
        snapshot: Option<PathBuf>,
    },
    /// Run the player session server
    Player {
        /// Port to listen on
        #[clap(short, long, default_value_t = DEFAULT_PLAYER_PORT)]
        port: u16,
        #[clap(flatten)]
        options: SessionOptions,
    },
    /// Run the developer session server
    Developer {
        /// Port to listen on
        #[clap(short, long, default_value_t = DEFAULT_DEVELOPER_PORT)]
        port: u16,
        #[clap(flatten)]
        options: SessionOptions,
    },
}

#[derive(Args, Debug)]
struct SessionOptions {
    /// Address of the catalog store
    #[clap(short, long, default_value = DEFAULT_STORE_ADDR)]
    store: String,
    /// IP address to bind to, also used by launched game servers
    #[clap(short = 'H', long, default_value = "0.0.0.0")]
    host: String,
    /// Host clients are told to reach game servers on
    #[clap(long, default_value = "127.0.0.1")]
    game_host: String,
    /// Game server port range, as FIRST-LAST (last excluded)
    #[clap(long, default_value = "20000-20100", value_parser = parse_port_range)]
    game_ports: Range<u16>,
    /// Server-side game directory
    #[clap(long, default_value = shared::GAMES_DIR)]
    games_dir: PathBuf,
    /// Room polling interval in milliseconds
    #[clap(long, default_value = "1000")]
    poll_ms: u64,
    /// Games per catalog page
    #[clap(long, default_value_t = DEFAULT_PAGE_SIZE)]
    page_size: usize,
    /// Command prefix used to run game server programs
    #[clap(long, num_args = 1.., allow_hyphen_values = true, default_value = "python3")]
    launcher: Vec<String>,
}

impl SessionOptions {
    fn into_config(self) -> ServerConfig {
        ServerConfig {
            store_addr: self.store,
            bind_host: self.host,
            game_host: self.game_host,
            game_ports: self.game_ports,
            games_dir: self.games_dir,
            poll_interval: Duration::from_millis(self.poll_ms),
            page_size: self.page_size,
            launcher: self.launcher,
        }
    }
}

fn parse_port_range(value: &str) -> Result<Range<u16>, String> {
    let (first, last) = value
        .split_once('-')
        .ok_or_else(|| format!("expected FIRST-LAST, got '{}'", value))?;
    let first: u16 = first.trim().parse().map_err(|e| format!("{}", e))?;
    let last: u16 = last.trim().parse().map_err(|e| format!("{}", e))?;
    if first >= last {
        return Err(format!("empty port range {}-{}", first, last));
    }
    Ok(first..last)
}

/// Parses the command line and runs the selected server until it fails or
/// Ctrl+C is pressed.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();

    let server = async move {
        match cli.role {
            Role::Store {
                host,
                port,
                snapshot,
            } => {
                let store = match snapshot {
                    Some(path) => CatalogStore::with_snapshot(path)?,
                    None => CatalogStore::new(),
                };
                let address = format!("{}:{}", host, port);
                StoreServer::bind(&address, store).await?.run().await?;
            }
            Role::Player { port, options } => {
                let address = format!("{}:{}", options.host, port);
                SessionServer::bind(&address, AccountKind::Player, options.into_config())
                    .await?
                    .run()
                    .await?;
            }
            Role::Developer { port, options } => {
                let address = format!("{}:{}", options.host, port);
                SessionServer::bind(&address, AccountKind::Developer, options.into_config())
                    .await?
                    .run()
                    .await?;
            }
        }
        Ok::<(), Box<dyn std::error::Error>>(())
    };

    tokio::select! {
        result = server => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_port_range() {
        assert_eq!(parse_port_range("20000-20100"), Ok(20000..20100));
        assert!(parse_port_range("20100-20000").is_err());
        assert!(parse_port_range("20000").is_err());
        assert!(parse_port_range("a-b").is_err());
    }

    #[test]
    fn test_session_defaults() {
        let cli = Cli::try_parse_from(["server", "player"]).unwrap();
        let Role::Player { port, options } = cli.role else {
            panic!("expected the player role");
        };
        assert_eq!(port, DEFAULT_PLAYER_PORT);

        let config = options.into_config();
        let defaults = ServerConfig::default();
        assert_eq!(config.store_addr, defaults.store_addr);
        assert_eq!(config.game_ports, defaults.game_ports);
        assert_eq!(config.poll_interval, defaults.poll_interval);
        assert_eq!(config.launcher, defaults.launcher);
    }

    #[test]
    fn test_launcher_prefix_takes_several_words() {
        let cli = Cli::try_parse_from([
            "server",
            "developer",
            "--port",
            "9001",
            "--launcher",
            "python3",
            "-u",
        ])
        .unwrap();
        let Role::Developer { port, options } = cli.role else {
            panic!("expected the developer role");
        };
        assert_eq!(port, 9001);
        assert_eq!(options.launcher, vec!["python3", "-u"]);
    }
}
