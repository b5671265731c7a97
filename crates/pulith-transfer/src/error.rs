//! Error types for pulith-transfer.

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure reported by a [`Transport`](crate::Transport).
///
/// Every kind carries a stable numeric code so callers can persist or compare
/// results without matching on text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {detail}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub detail: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    pub fn aborted() -> Self {
        Self::new(TransportErrorKind::AbortedByCallback, "Callback aborted")
    }

    pub fn code(&self) -> i32 {
        self.kind.code()
    }

    pub fn is_aborted(&self) -> bool {
        self.kind == TransportErrorKind::AbortedByCallback
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportErrorKind {
    UnsupportedProtocol,
    UrlMalformat,
    CouldntResolveProxy,
    CouldntResolveHost,
    CouldntConnect,
    WriteError,
    ReadError,
    OperationTimedOut,
    SslConnectError,
    FileCouldntRead,
    AbortedByCallback,
    TooManyRedirects,
    UnknownOption,
    SendError,
    RecvError,
    SendFailRewind,
    SslCaCert,
    Other,
}

impl TransportErrorKind {
    pub fn code(self) -> i32 {
        match self {
            Self::UnsupportedProtocol => 1,
            Self::UrlMalformat => 3,
            Self::CouldntResolveProxy => 5,
            Self::CouldntResolveHost => 6,
            Self::CouldntConnect => 7,
            Self::WriteError => 23,
            Self::ReadError => 26,
            Self::OperationTimedOut => 28,
            Self::SslConnectError => 35,
            Self::FileCouldntRead => 37,
            Self::AbortedByCallback => 42,
            Self::TooManyRedirects => 47,
            Self::UnknownOption => 48,
            Self::SendError => 55,
            Self::RecvError => 56,
            Self::SendFailRewind => 65,
            Self::SslCaCert => 77,
            Self::Other => 99,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::UnsupportedProtocol => "Unsupported protocol",
            Self::UrlMalformat => "URL using bad/illegal format or missing URL",
            Self::CouldntResolveProxy => "Couldn't resolve proxy name",
            Self::CouldntResolveHost => "Couldn't resolve host name",
            Self::CouldntConnect => "Couldn't connect to server",
            Self::WriteError => "Failed writing received data to disk/application",
            Self::ReadError => "Failed to open/read local data from file/application",
            Self::OperationTimedOut => "Timeout was reached",
            Self::SslConnectError => "SSL connect error",
            Self::FileCouldntRead => "Couldn't read a file",
            Self::AbortedByCallback => "Operation was aborted by an application callback",
            Self::TooManyRedirects => "Number of redirects hit maximum amount",
            Self::UnknownOption => "An unknown option was passed in",
            Self::SendError => "Failed sending data to the peer",
            Self::RecvError => "Failure when receiving data from the peer",
            Self::SendFailRewind => "Send failed since rewinding of the data stream failed",
            Self::SslCaCert => "Problem with the SSL CA cert (path? access rights?)",
            Self::Other => "Unknown error",
        }
    }
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot open upload source '{path}': {source}")]
    SourceOpen { path: PathBuf, source: io::Error },

    #[error("cannot determine size of upload source '{path}': {source}")]
    SourceSize { path: PathBuf, source: io::Error },

    #[error("transfer failed: {0}")]
    Transport(#[from] TransportError),

    #[error("failed to read config '{path}': {source}")]
    ConfigRead { path: PathBuf, source: io::Error },

    #[error("invalid config: {0}")]
    Config(#[from] toml::de::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    /// The transport failure behind this error, if the transfer got that far.
    pub fn transport(&self) -> Option<&TransportError> {
        match self {
            Error::Transport(e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_display_includes_detail() {
        let err = TransportError::new(TransportErrorKind::CouldntConnect, "connection refused");
        assert_eq!(err.to_string(), "Couldn't connect to server: connection refused");
        assert_eq!(err.code(), 7);
    }

    #[test]
    fn test_aborted() {
        let err = TransportError::aborted();
        assert!(err.is_aborted());
        assert_eq!(err.code(), 42);
    }

    #[test]
    fn test_error_transport_accessor() {
        let err: Error = TransportError::new(TransportErrorKind::RecvError, "reset").into();
        assert_eq!(err.transport().map(|e| e.kind), Some(TransportErrorKind::RecvError));

        let err = Error::Io(io::Error::other("boom"));
        assert!(err.transport().is_none());
    }
}
