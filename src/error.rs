use std::io;

use thiserror::Error;

/// Outcome of one driver operation, as a flat code.
///
/// `Ok` results map to [`Status::Success`]; every [`TileError`] maps to exactly one of
/// the remaining variants via [`TileError::status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Success,
    Timeout,
    ProtocolError,
    CommandError,
    ReceiveOverflow,
    NoFix,
    IoError,
}

impl Status {
    pub fn of<T>(result: &Result<T>) -> Status {
        match result {
            Ok(_) => Status::Success,
            Err(e) => e.status(),
        }
    }
}

#[derive(Debug, Error)]
pub enum TileError {
    #[error("timeout waiting for response")]
    Timeout,
    #[error("protocol error: {0}")]
    Protocol(&'static str),
    #[error("command error: {0}")]
    Command(String),
    #[error("receive buffer overflow")]
    RxOverflow,
    #[error("no GPS fix")]
    NoFix,
    #[error("stream i/o: {0}")]
    Io(#[from] io::Error),
}

impl TileError {
    pub fn status(&self) -> Status {
        match self {
            TileError::Timeout => Status::Timeout,
            TileError::Protocol(_) => Status::ProtocolError,
            TileError::Command(_) => Status::CommandError,
            TileError::RxOverflow => Status::ReceiveOverflow,
            TileError::NoFix => Status::NoFix,
            TileError::Io(_) => Status::IoError,
        }
    }

    /// Device error token for [`TileError::Command`], e.g. `DBXNOMORE`.
    pub fn command_text(&self) -> Option<&str> {
        match self {
            TileError::Command(text) => Some(text),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, TileError>;
