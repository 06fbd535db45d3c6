//! Length-prefixed JSON framing shared by every process on the platform
//!
//! A frame is a 4-byte big-endian payload length followed by exactly that
//! many bytes of UTF-8 JSON. Both directions cap the payload at
//! [`MAX_FRAME_SIZE`]; a sender refuses to write an oversized frame and a
//! receiver refuses to allocate for one. After any receive error the stream
//! is out of sync and must be dropped.

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Largest payload accepted in either direction (64 KiB).
pub const MAX_FRAME_SIZE: usize = 64 * 1024;

const PREFIX_LEN: usize = 4;

/// Failures of the framed channel. Every variant leaves the channel unusable.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("frame too large: {len} bytes (max {MAX_FRAME_SIZE})")]
    TooLarge { len: usize },

    #[error("connection closed in the middle of a frame")]
    Truncated,

    #[error("failed to encode frame: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("failed to decode frame: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("transport error: {0}")]
    Io(#[from] std::io::Error),
}

/// Serializes `message` and prepends the length prefix.
///
/// Fails with [`FrameError::TooLarge`] before producing any bytes when the
/// encoded payload exceeds the limit.
pub fn encode_frame<T: Serialize + ?Sized>(message: &T) -> Result<Vec<u8>, FrameError> {
    let payload = serde_json::to_vec(message).map_err(FrameError::Encode)?;
    if payload.len() > MAX_FRAME_SIZE {
        return Err(FrameError::TooLarge {
            len: payload.len(),
        });
    }

    let mut frame = Vec::with_capacity(PREFIX_LEN + payload.len());
    frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

/// Decodes a frame payload (without its prefix).
pub fn decode_payload<T: DeserializeOwned>(payload: &[u8]) -> Result<T, FrameError> {
    serde_json::from_slice(payload).map_err(FrameError::Decode)
}

/// Writes one complete frame. Nothing is written if encoding fails.
pub async fn send_frame<W, T>(writer: &mut W, message: &T) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin,
    T: Serialize + ?Sized,
{
    let frame = encode_frame(message)?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads one complete frame.
///
/// Returns `Ok(None)` when the peer closed the stream cleanly before sending
/// any byte of a new frame. A close after a partial prefix or inside the
/// payload is reported as [`FrameError::Truncated`].
pub async fn recv_frame<R, T>(reader: &mut R) -> Result<Option<T>, FrameError>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let mut prefix = [0u8; PREFIX_LEN];
    let mut filled = 0;
    while filled < PREFIX_LEN {
        let read = reader.read(&mut prefix[filled..]).await?;
        if read == 0 {
            return if filled == 0 {
                Ok(None)
            } else {
                Err(FrameError::Truncated)
            };
        }
        filled += read;
    }

    let len = u32::from_be_bytes(prefix) as usize;
    if len > MAX_FRAME_SIZE {
        return Err(FrameError::TooLarge { len });
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            FrameError::Truncated
        } else {
            FrameError::Io(e)
        }
    })?;

    decode_payload(&payload).map(Some)
}
