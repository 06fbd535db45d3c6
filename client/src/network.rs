use log::{error, info, warn};
use serde_json::Value;
use shared::framing::{recv_frame, send_frame, FrameError};
use shared::protocol::{ClientReply, InputSpec, ServerMessage};
use std::io::{self, Stdout, Write};
use tokio::io::{AsyncBufRead, AsyncRead, AsyncWrite, BufReader, Stdin};
use tokio::net::TcpStream;

use crate::error::ClientError;
use crate::game::GameRunner;
use crate::input::InputManager;
use crate::rendering::Renderer;
use crate::transfer::LocalFiles;

/// Terminal peer of a session server. It holds no menu state of its own and
/// only carries out the instructions it receives.
pub struct Client<S, R, W> {
    stream: S,
    input: InputManager<R>,
    renderer: Renderer<W>,
    files: LocalFiles,
    runner: GameRunner,
}

impl Client<TcpStream, BufReader<Stdin>, Stdout> {
    /// Connects to a session server, reading from stdin and writing to stdout.
    pub async fn connect(
        addr: &str,
        files: LocalFiles,
        runner: GameRunner,
    ) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        info!("Connected to {}", addr);

        Ok(Client::new(
            stream,
            BufReader::new(tokio::io::stdin()),
            io::stdout(),
            files,
            runner,
        ))
    }
}

impl<S, R, W> Client<S, R, W>
where
    S: AsyncRead + AsyncWrite + Unpin,
    R: AsyncBufRead + Unpin,
    W: Write,
{
    pub fn new(stream: S, input: R, output: W, files: LocalFiles, runner: GameRunner) -> Self {
        Self {
            stream,
            input: InputManager::new(input),
            renderer: Renderer::new(output),
            files,
            runner,
        }
    }

    pub fn into_output(self) -> W {
        self.renderer.into_inner()
    }

    /// Carries out instructions until the server closes the connection.
    pub async fn run(&mut self) -> Result<(), ClientError> {
        loop {
            let Some(raw) = recv_frame::<_, Value>(&mut self.stream).await? else {
                self.renderer.notice("Server closed connection.")?;
                return Ok(());
            };

            let op = raw.get("op").cloned().unwrap_or(Value::Null);
            match serde_json::from_value::<ServerMessage>(raw) {
                Ok(message) => self.handle(message).await?,
                Err(e) => warn!("Ignoring instruction {}: {}", op, e),
            }
        }
    }

    async fn handle(&mut self, message: ServerMessage) -> Result<(), ClientError> {
        match message {
            ServerMessage::Display { text, input } => self.display(&text, &input).await,
            ServerMessage::Save { path, file_data } => {
                match self.files.save(&path, &file_data).await {
                    Ok(_) => self.renderer.notice(&format!("Saved file to: {}", path))?,
                    Err(e) => {
                        error!("Failed to save {}: {}", path, e);
                        self.renderer.notice(&format!("Failed to save file: {}", e))?;
                    }
                }
                Ok(())
            }
            ServerMessage::Upload { path } => {
                let reply = match self.files.read(&path).await {
                    Ok(content) => {
                        info!("Sending file: {}", path);
                        ClientReply::file(content)
                    }
                    Err(e) => {
                        warn!("Cannot upload {}: {}", path, e);
                        self.renderer
                            .notice(&format!("Upload failed: {} ({})", path, e))?;
                        ClientReply::upload_failed()
                    }
                };
                match send_frame(&mut self.stream, &reply).await {
                    Err(FrameError::TooLarge { len }) => {
                        warn!("Cannot upload {}: {} bytes do not fit in one frame", path, len);
                        self.renderer
                            .notice(&format!("Upload failed: {} (file too large)", path))?;
                        send_frame(&mut self.stream, &ClientReply::upload_failed()).await?;
                    }
                    sent => sent?,
                }
                Ok(())
            }
            ServerMessage::Connect {
                game_path,
                host,
                port,
            } => {
                let launched = self
                    .files
                    .resolve(&game_path)
                    .and_then(|program| {
                        self.runner
                            .launch(&program, &host, port)
                            .map_err(ClientError::from)
                    });
                match launched {
                    Ok(_) => self
                        .renderer
                        .notice(&format!("Launching game: {} -> {}:{}", game_path, host, port))?,
                    Err(e) => {
                        error!("Failed to launch {}: {}", game_path, e);
                        self.renderer
                            .notice(&format!("Failed to launch game: {}", e))?;
                    }
                }
                Ok(())
            }
        }
    }

    async fn display(&mut self, text: &str, input: &InputSpec) -> Result<(), ClientError> {
        self.renderer.show(text)?;
        if !input.expects_reply() {
            return Ok(());
        }

        let reply = self.input.read_reply(input, &mut self.renderer).await?;
        send_frame(&mut self.stream, &ClientReply::text(reply)).await?;
        Ok(())
    }
}
