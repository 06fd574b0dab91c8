//! Error types for the issuer client.
//!
//! # Design
//! `TransportError` covers everything that can go wrong between handing a
//! call to the transport and getting a value back. XML-RPC faults land there
//! too: they are protocol-level failures, not business declines. A decline
//! is an ordinary response payload and never becomes an error here.
//!
//! `ClientError` wraps transport failures and adds the failures the client
//! raises itself.

use thiserror::Error;

/// Failures of a single remote round trip.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TransportError {
    /// The endpoint could not be reached or the connection dropped.
    #[error("connection failed: {0}")]
    Connect(String),

    /// The endpoint answered with a non-200 HTTP status.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The endpoint answered with an XML-RPC `<fault>`.
    #[error("fault {code}: {message}")]
    Fault { code: i32, message: String },

    /// The response body was not a well-formed XML-RPC document.
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Errors returned by `SignedRpcClient`.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Missing or invalid configuration, or the transport could not be built.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The operation exists on the issuer but has no known argument contract.
    #[error("operation `{0}` is not implemented")]
    UnimplementedOperation(&'static str),

    /// A checksum was requested over an empty argument list.
    #[error("checksum for `{method}` needs at least one argument")]
    EmptyChecksumInput { method: String },
}

impl ClientError {
    /// The underlying transport failure, if this is one.
    pub fn as_transport(&self) -> Option<&TransportError> {
        match self {
            ClientError::Transport(err) => Some(err),
            _ => None,
        }
    }
}
