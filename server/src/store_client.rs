//! Session-side façade over the catalog store
//!
//! Every call opens a fresh connection, sends one request, reads one
//! response and closes. Transport failures never reach the caller as
//! errors: they are logged and turned into an error-shaped
//! [`StoreResponse`], so a session only ever has to check `status`.

use log::warn;
use serde::de::DeserializeOwned;
use shared::catalog::{criteria, Criteria, StoreRequest, StoreResponse};
use shared::framing::{recv_frame, send_frame, FrameError};
use shared::models::{Account, AccountKind, Game, Room};
use tokio::net::TcpStream;

#[derive(Debug, Clone)]
pub struct StoreClient {
    addr: String,
}

impl StoreClient {
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Sends one request. Never fails; an unreachable store yields an error
    /// response.
    pub async fn request(&self, request: &StoreRequest) -> StoreResponse {
        match self.round_trip(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Catalog store request to {} failed: {}", self.addr, e);
                StoreResponse::error(format!("Store unavailable: {}", e))
            }
        }
    }

    async fn round_trip(&self, request: &StoreRequest) -> Result<StoreResponse, FrameError> {
        let mut stream = TcpStream::connect(&self.addr).await?;
        send_frame(&mut stream, request).await?;
        recv_frame(&mut stream).await?.ok_or(FrameError::Truncated)
    }

    /// Rows of a query. `None` means the query itself failed, which callers
    /// must not confuse with an empty result.
    pub async fn query<T: DeserializeOwned>(&self, request: &StoreRequest) -> Option<Vec<T>> {
        let response = self.request(request).await;
        if !response.is_success() {
            warn!("Catalog query failed: {}", response.reason());
        }
        response.rows()
    }

    pub async fn accounts(&self, kind: AccountKind, filter: Criteria) -> Option<Vec<Account>> {
        self.query(&StoreRequest::query_accounts(kind, filter)).await
    }

    pub async fn account(&self, kind: AccountKind, name: &str) -> Option<Vec<Account>> {
        self.accounts(kind, criteria([("name", name)])).await
    }

    pub async fn games(&self, filter: Criteria) -> Option<Vec<Game>> {
        self.query(&StoreRequest::QueryGame { criteria: filter })
            .await
    }

    pub async fn game(&self, name: &str) -> Option<Vec<Game>> {
        self.games(criteria([("name", name)])).await
    }

    pub async fn rooms(&self, filter: Criteria) -> Option<Vec<Room>> {
        self.query(&StoreRequest::QueryRoom { criteria: filter })
            .await
    }

    pub async fn room(&self, name: &str) -> Option<Vec<Room>> {
        self.rooms(criteria([("name", name)])).await
    }
}
