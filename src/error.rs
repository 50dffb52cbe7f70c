//! Error taxonomy shared by every layer of the client.
//!
//! Codec and transport failures are classified by the session into
//! [`Error`]; callers that only need the coarse C-style status can use
//! [`Error::kind`] and [`ErrorKind::code`].

use crate::command::Capabilities;
use crate::ipc::codec::ProtocolError;
use std::fmt;
use std::io;

/// Coarse error classification, one per status code of the C surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Init,
    Root,
    Connection,
    Install,
    Load,
    NotLoaded,
    Operation,
    InvalidArg,
}

/// Status code reported for a successful operation.
pub const SUCCESS: i32 = 0;

impl ErrorKind {
    /// The numeric status code (`MSS_ERROR_*`).
    pub fn code(self) -> i32 {
        match self {
            ErrorKind::Init => -1,
            ErrorKind::Root => -2,
            ErrorKind::Connection => -3,
            ErrorKind::Install => -4,
            ErrorKind::Load => -5,
            ErrorKind::NotLoaded => -6,
            ErrorKind::Operation => -7,
            ErrorKind::InvalidArg => -8,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Init => "init",
            ErrorKind::Root => "root",
            ErrorKind::Connection => "connection",
            ErrorKind::Install => "install",
            ErrorKind::Load => "load",
            ErrorKind::NotLoaded => "not-loaded",
            ErrorKind::Operation => "operation",
            ErrorKind::InvalidArg => "invalid-arg",
        };
        f.write_str(name)
    }
}

/// Why the byte stream to the scripting addition became unusable.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("peer closed the connection")]
    PeerClosed,
    #[error("timed out waiting for the scripting addition")]
    Timeout,
    #[error("connection is closed")]
    Closed,
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("corrupt frame: {0}")]
    Corrupt(#[from] ProtocolError),
}

/// A call completed (or was refused locally) without doing what was asked.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OperationFailure {
    #[error("no handshake has been performed")]
    NotHandshaken,
    #[error("scripting addition lacks capabilities {0}")]
    MissingCapability(Capabilities),
    #[error("{0} rejected by the scripting addition")]
    Rejected(&'static str),
}

/// Every failure the client can report.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to initialize context: {0}")]
    Init(String),
    #[error("root privileges required")]
    Root,
    #[error("connection error: {0}")]
    Connection(#[from] ConnectionError),
    #[error("installation failed: {0}")]
    Install(String),
    #[error("loading failed: {0}")]
    Load(String),
    #[error("scripting addition not loaded: {0}")]
    NotLoaded(String),
    #[error("operation failed: {0}")]
    Operation(#[from] OperationFailure),
    #[error("invalid argument: {0}")]
    InvalidArg(String),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Init(_) => ErrorKind::Init,
            Error::Root => ErrorKind::Root,
            Error::Connection(_) => ErrorKind::Connection,
            Error::Install(_) => ErrorKind::Install,
            Error::Load(_) => ErrorKind::Load,
            Error::NotLoaded(_) => ErrorKind::NotLoaded,
            Error::Operation(_) => ErrorKind::Operation,
            Error::InvalidArg(_) => ErrorKind::InvalidArg,
        }
    }

    /// Shorthand for `self.kind().code()`.
    pub fn code(&self) -> i32 {
        self.kind().code()
    }
}

impl From<ProtocolError> for Error {
    fn from(e: ProtocolError) -> Self {
        Error::Connection(ConnectionError::Corrupt(e))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_c_surface() {
        assert_eq!(ErrorKind::Init.code(), -1);
        assert_eq!(ErrorKind::Root.code(), -2);
        assert_eq!(ErrorKind::Connection.code(), -3);
        assert_eq!(ErrorKind::Install.code(), -4);
        assert_eq!(ErrorKind::Load.code(), -5);
        assert_eq!(ErrorKind::NotLoaded.code(), -6);
        assert_eq!(ErrorKind::Operation.code(), -7);
        assert_eq!(ErrorKind::InvalidArg.code(), -8);
    }

    #[test]
    fn protocol_errors_surface_as_connection() {
        let e: Error = ProtocolError::Truncated.into();
        assert_eq!(e.kind(), ErrorKind::Connection);
        assert!(matches!(
            e,
            Error::Connection(ConnectionError::Corrupt(ProtocolError::Truncated))
        ));
    }

    #[test]
    fn operation_failure_mentions_missing_bits() {
        let e = Error::from(OperationFailure::MissingCapability(Capabilities::ANIM_TIME));
        assert_eq!(e.code(), -7);
        assert!(e.to_string().contains("ANIM_TIME"));
    }
}
