//! Connection sessions
//!
//! The hub never touches a socket. Each live connection is represented by a
//! [`Connection`] (hub side) and a [`PeerLink`] (transport side) joined by
//! bounded queues and a shared close signal.

pub mod connection;

pub use connection::{channel, Connection, ConnectionHandle, ConnectionId, PeerLink, PeerSender};
