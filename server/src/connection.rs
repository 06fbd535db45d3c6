//! Server end of one session connection
//!
//! Wraps the framed stream with the operations a session needs: show text,
//! prompt for a validated reply, push and pull files, and hand the client
//! off to a game server. Replies are validated against the input
//! specification they answer; an out-of-spec reply is a protocol violation
//! and ends the connection.

use log::{debug, warn};
use serde_json::Value;
use shared::framing::{recv_frame, send_frame, FrameError};
use shared::protocol::{ClientReply, InputError, InputSpec, ServerMessage};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::SessionError;

/// Byte stream a session can run over.
pub trait Transport: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> Transport for T {}

pub struct Connection<S> {
    stream: S,
    peer: String,
}

impl<S: Transport> Connection<S> {
    pub fn new(stream: S, peer: impl Into<String>) -> Self {
        Self {
            stream,
            peer: peer.into(),
        }
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// Displays informational text; no reply follows.
    pub async fn show(&mut self, text: impl Into<String>) -> Result<(), SessionError> {
        self.send(&ServerMessage::Display {
            text: text.into(),
            input: InputSpec::None,
        })
        .await
    }

    /// Displays `text` and waits for one reply satisfying `input`.
    pub async fn prompt(
        &mut self,
        text: impl Into<String>,
        input: InputSpec,
    ) -> Result<String, SessionError> {
        self.send(&ServerMessage::Display {
            text: text.into(),
            input: input.clone(),
        })
        .await?;

        let reply = self.recv_reply().await?;
        input.validate(&reply.response)?;
        Ok(reply.response)
    }

    /// Prompts with options `"1"..="count"` and returns the chosen number.
    pub async fn choose(
        &mut self,
        text: impl Into<String>,
        count: usize,
    ) -> Result<usize, SessionError> {
        let reply = self.prompt(text, InputSpec::numbered(count)).await?;
        reply
            .parse()
            .map_err(|_| SessionError::InvalidReply(InputError::NotAnOption))
    }

    /// Pushes `content` for the client to store at `path`. Returns `false`
    /// without sending anything when the file does not fit in one frame.
    pub async fn push_file(
        &mut self,
        path: impl Into<String>,
        content: impl Into<String>,
    ) -> Result<bool, SessionError> {
        let save = ServerMessage::Save {
            path: path.into(),
            file_data: content.into(),
        };
        match send_frame(&mut self.stream, &save).await {
            Ok(()) => Ok(true),
            Err(FrameError::TooLarge { len }) => {
                warn!("Not pushing {} bytes to {}: frame too large", len, self.peer);
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Asks the client for the file at `path`. `Ok(None)` means the client
    /// reported it missing or unreadable.
    pub async fn pull_file(&mut self, path: impl Into<String>) -> Result<Option<String>, SessionError> {
        let path = path.into();
        self.send(&ServerMessage::Upload { path: path.clone() })
            .await?;

        let reply = self.recv_reply().await?;
        let content = reply.into_file();
        if content.is_none() {
            debug!("{} could not provide {}", self.peer, path);
        }
        Ok(content)
    }

    /// Tells the client to start its game client against a game server.
    pub async fn connect_game(
        &mut self,
        game_path: impl Into<String>,
        host: impl Into<String>,
        port: u16,
    ) -> Result<(), SessionError> {
        self.send(&ServerMessage::Connect {
            game_path: game_path.into(),
            host: host.into(),
            port,
        })
        .await
    }

    /// Resolves once the client closes the connection or violates the
    /// protocol by sending while no reply is expected. Always yields the
    /// error that ends the session.
    pub async fn closed(&mut self) -> SessionError {
        match recv_frame::<_, Value>(&mut self.stream).await {
            Ok(None) => SessionError::Disconnected,
            Ok(Some(_)) => SessionError::InvalidReply(InputError::Unexpected),
            Err(e) => SessionError::Frame(e),
        }
    }

    async fn send(&mut self, message: &ServerMessage) -> Result<(), SessionError> {
        send_frame(&mut self.stream, message).await?;
        Ok(())
    }

    async fn recv_reply(&mut self) -> Result<ClientReply, SessionError> {
        recv_frame(&mut self.stream)
            .await?
            .ok_or(SessionError::Disconnected)
    }
}
