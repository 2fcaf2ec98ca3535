//! Error types
//!
//! Defines the error kinds surfaced by every fallible client operation.

use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::protocol::Reply;

/// Errors produced by the FTP client core.
#[derive(Debug)]
pub enum FtpClientError {
    /// Operation requires an open control connection.
    NotConnected,
    /// `open` was called while a control connection already exists.
    AlreadyConnected(String),
    /// The control socket could not be connected.
    ConnectError { target: String, source: io::Error },
    /// The server sent bytes that do not form a valid reply.
    MalformedReply(String),
    /// The PASV reply carried no usable `h1,h2,h3,h4,p1,p2` group.
    MalformedPasvReply(String),
    /// The server refused to enter passive mode.
    PasvRejected(Reply),
    /// The server refused the PORT address.
    PortRejected(Reply),
    /// The data socket could not be connected or bound.
    DataConnectError { target: String, source: io::Error },
    /// No peer connected to the active-mode listener in time.
    DataConnectTimeout(SocketAddr),
    /// Byte pumping failed; carries whatever completion reply was read afterwards.
    TransferAborted { error: io::Error, reply: Option<Reply> },
    /// A command argument would break CRLF framing.
    InvalidArgument(String),
    /// The local source of an upload does not exist.
    LocalFileNotFound(PathBuf),
    /// Read or write failure on a socket.
    IoError(io::Error),
}

impl fmt::Display for FtpClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FtpClientError::NotConnected => {
                write!(f, "Not connected. Use 'open <hostname> [port]' to connect")
            }
            FtpClientError::AlreadyConnected(host) => {
                write!(f, "Already connected to {}. Use disconnect first", host)
            }
            FtpClientError::ConnectError { target, source } => {
                write!(f, "Failed to connect to {}: {}", target, source)
            }
            FtpClientError::MalformedReply(line) => write!(f, "Malformed reply: {:?}", line),
            FtpClientError::MalformedPasvReply(text) => {
                write!(f, "Malformed PASV reply: {}", text.trim_end())
            }
            FtpClientError::PasvRejected(reply) => {
                write!(f, "Server refused passive mode: {}", reply)
            }
            FtpClientError::PortRejected(reply) => write!(f, "Server refused PORT: {}", reply),
            FtpClientError::DataConnectError { target, source } => {
                write!(f, "Failed to open data connection to {}: {}", target, source)
            }
            FtpClientError::DataConnectTimeout(addr) => {
                write!(f, "Timeout waiting for data connection on {}", addr)
            }
            FtpClientError::TransferAborted { error, reply } => match reply {
                Some(reply) => write!(f, "Transfer aborted: {} (server: {})", error, reply),
                None => write!(f, "Transfer aborted: {}", error),
            },
            FtpClientError::InvalidArgument(arg) => write!(f, "Invalid argument: {:?}", arg),
            FtpClientError::LocalFileNotFound(path) => {
                write!(f, "Local file not found: {}", path.display())
            }
            FtpClientError::IoError(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for FtpClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FtpClientError::ConnectError { source, .. }
            | FtpClientError::DataConnectError { source, .. } => Some(source),
            FtpClientError::TransferAborted { error, .. } => Some(error),
            FtpClientError::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for FtpClientError {
    fn from(error: io::Error) -> Self {
        FtpClientError::IoError(error)
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, FtpClientError>;
