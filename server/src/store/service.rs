//! TCP front end of the catalog store
//!
//! Each accepted connection gets its own task that answers framed requests
//! in order until the peer closes. A request that does not parse as a known
//! operation is answered with an error response instead of dropping the
//! connection.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use serde_json::Value;
use shared::catalog::{StoreRequest, StoreResponse};
use shared::framing::{recv_frame, send_frame};
use tokio::net::{TcpListener, TcpStream};

use super::CatalogStore;

pub struct StoreServer {
    listener: TcpListener,
    store: Arc<CatalogStore>,
}

impl StoreServer {
    pub async fn bind(addr: &str, store: CatalogStore) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!("Catalog store listening on {}", listener.local_addr()?);

        Ok(Self {
            listener,
            store: Arc::new(store),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Handle to the store for in-process inspection.
    pub fn store(&self) -> Arc<CatalogStore> {
        Arc::clone(&self.store)
    }

    /// Accepts connections forever.
    pub async fn run(self) -> io::Result<()> {
        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    let store = Arc::clone(&self.store);
                    tokio::spawn(async move {
                        serve_connection(stream, peer, store).await;
                    });
                }
                Err(e) => {
                    error!("Failed to accept store connection: {}", e);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
            }
        }
    }
}

async fn serve_connection(mut stream: TcpStream, peer: SocketAddr, store: Arc<CatalogStore>) {
    debug!("Store connection from {}", peer);

    loop {
        let raw = match recv_frame::<_, Value>(&mut stream).await {
            Ok(Some(raw)) => raw,
            Ok(None) => break,
            Err(e) => {
                warn!("Dropping store connection from {}: {}", peer, e);
                break;
            }
        };

        let response = match serde_json::from_value::<StoreRequest>(raw) {
            Ok(request) => {
                // Mutations may write the snapshot file.
                let store = Arc::clone(&store);
                tokio::task::spawn_blocking(move || store.apply(request))
                    .await
                    .unwrap_or_else(|e| {
                        error!("Store request from {} panicked: {}", peer, e);
                        StoreResponse::error("Internal store error")
                    })
            }
            Err(e) => StoreResponse::error(format!("Malformed request: {}", e)),
        };

        if let Err(e) = send_frame(&mut stream, &response).await {
            warn!("Failed to answer {}: {}", peer, e);
            break;
        }
    }
}
