//! Error types
//!
//! Every failure in the hub is local to the one connection or the one call
//! that produced it. The variants below mirror where a failure is surfaced:
//!
//! - [`ConnectError`]: the transport could not hand a connection to the hub
//! - [`ReadError`]: a member's inbound side ended; triggers that member's cleanup
//! - [`SendError`]: delivery to one member failed; triggers that member's cleanup
//! - [`DecodeError`]: an externally injected payload was malformed

use std::fmt;
use std::time::Duration;

use crate::registry::GroupName;

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type
#[derive(Debug)]
pub enum Error {
    /// I/O error (bind, accept, serve)
    Io(std::io::Error),
    /// Connection was rejected before entering the hub
    Connect(ConnectError),
    /// Inbound side of a connection failed
    Read(ReadError),
    /// Outbound delivery to a connection failed
    Send(SendError),
    /// Injected payload could not be decoded
    Decode(DecodeError),
    /// Invalid configuration value
    Config(ConfigError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Connect(e) => write!(f, "Connect failed: {}", e),
            Error::Read(e) => write!(f, "Read failed: {}", e),
            Error::Send(e) => write!(f, "Send failed: {}", e),
            Error::Decode(e) => write!(f, "Decode failed: {}", e),
            Error::Config(e) => write!(f, "Configuration error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Connect(e) => Some(e),
            Error::Read(e) => Some(e),
            Error::Send(e) => Some(e),
            Error::Decode(e) => Some(e),
            Error::Config(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<ConnectError> for Error {
    fn from(e: ConnectError) -> Self {
        Error::Connect(e)
    }
}

impl From<ReadError> for Error {
    fn from(e: ReadError) -> Self {
        Error::Read(e)
    }
}

impl From<SendError> for Error {
    fn from(e: SendError) -> Self {
        Error::Send(e)
    }
}

impl From<DecodeError> for Error {
    fn from(e: DecodeError) -> Self {
        Error::Decode(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

/// Handshake/admission failure. The connection never enters the hub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectError {
    /// Server is at its connection limit
    LimitReached(usize),
    /// Group name taken from the route is not usable
    InvalidGroup(String),
    /// Transport upgrade did not complete
    UpgradeFailed(String),
}

impl fmt::Display for ConnectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectError::LimitReached(max) => write!(f, "connection limit reached ({})", max),
            ConnectError::InvalidGroup(name) => write!(f, "invalid group name: {:?}", name),
            ConnectError::UpgradeFailed(reason) => write!(f, "upgrade failed: {}", reason),
        }
    }
}

impl std::error::Error for ConnectError {}

/// Inbound failure on a member connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadError {
    /// Peer closed the connection, or it was closed locally
    Closed,
    /// Transport reported an error
    Transport(String),
}

impl fmt::Display for ReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadError::Closed => write!(f, "connection closed"),
            ReadError::Transport(reason) => write!(f, "transport error: {}", reason),
        }
    }
}

impl std::error::Error for ReadError {}

/// Outbound failure for a single member during fan-out
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendError {
    /// Connection is closed or its transport end is gone
    Closed,
    /// Outbound queue stayed full for longer than the send timeout
    TimedOut(Duration),
}

impl fmt::Display for SendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendError::Closed => write!(f, "connection closed"),
            SendError::TimedOut(after) => write!(f, "send timed out after {:?}", after),
        }
    }
}

impl std::error::Error for SendError {}

/// Malformed externally produced payload
#[derive(Debug)]
pub struct DecodeError {
    /// Group the payload was addressed to
    pub group: GroupName,
    /// Underlying JSON error
    pub source: serde_json::Error,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid payload for group {}: {}", self.group, self.source)
    }
}

impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// Invalid configuration value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    /// Name of the offending setting
    pub key: &'static str,
    /// Raw value that failed to parse
    pub value: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid value for {}: {:?}", self.key, self.value)
    }
}

impl std::error::Error for ConfigError {}
