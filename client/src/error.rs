//! Error types of the client crate

use std::io;
use std::path::PathBuf;

use shared::FrameError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("connection failure: {0}")]
    Frame(#[from] FrameError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Standard input closed while a reply was pending.
    #[error("input closed")]
    InputClosed,

    /// A server-supplied path pointing outside the client root.
    #[error("refusing path outside the client root: {}", .0.display())]
    UnsafePath(PathBuf),
}
