//! TCP front end of the player and developer session servers
//!
//! Both servers run the same accept loop. They differ only in the account
//! kind their sessions serve. Every accepted connection is handed to its own
//! task, so one slow client never holds up the others.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use log::{error, info};
use shared::models::AccountKind;
use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::connection::Connection;
use crate::launcher::GameLauncher;
use crate::ports::PortAllocator;
use crate::session::Session;
use crate::storage::GameFiles;
use crate::store_client::StoreClient;

/// Services shared by every session of one server.
#[derive(Debug)]
pub struct ServerContext {
    pub config: ServerConfig,
    pub store: StoreClient,
    pub files: GameFiles,
    pub ports: PortAllocator,
    pub launcher: GameLauncher,
}

impl ServerContext {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            store: StoreClient::new(config.store_addr.clone()),
            files: GameFiles::new(config.games_dir.clone()),
            ports: PortAllocator::new(config.bind_host.clone(), config.game_ports.clone()),
            launcher: GameLauncher::new(config.launcher.clone()),
            config,
        }
    }
}

pub struct SessionServer {
    listener: TcpListener,
    kind: AccountKind,
    context: Arc<ServerContext>,
}

impl SessionServer {
    pub async fn bind(addr: &str, kind: AccountKind, config: ServerConfig) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!(
            "{} server listening on {} (store at {})",
            kind.noun(),
            listener.local_addr()?,
            config.store_addr
        );

        Ok(Self {
            listener,
            kind,
            context: Arc::new(ServerContext::new(config)),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn context(&self) -> Arc<ServerContext> {
        Arc::clone(&self.context)
    }

    /// Accepts clients forever, one session task each.
    pub async fn run(self) -> io::Result<()> {
        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    info!("{} connected to the {} server", peer, self.kind.noun());
                    if let Err(e) = stream.set_nodelay(true) {
                        error!("Failed to configure socket of {}: {}", peer, e);
                    }

                    let session = Session::new(
                        Connection::new(stream, peer.to_string()),
                        Arc::clone(&self.context),
                        self.kind,
                    );
                    tokio::spawn(session.run());
                }
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
            }
        }
    }
}
