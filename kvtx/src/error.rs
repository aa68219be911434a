use thiserror::Error;

/// Errors internal to transport and message decoding.
///
/// Conflict outcomes (OCC abort, 2PL `LOCKED`) are NOT represented here --
/// those are ordinary [`crate::protocol::Reply`] values, not failures of the
/// transport. This type covers only the things that end a connection or
/// prevent a request from being understood at all.
#[derive(Debug, Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("codec error: {0}")]
    Codec(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("peer closed the connection")]
    Disconnected,
}

pub type CResult<T> = Result<T, Error>;
