//! # fanout-hub
//!
//! A real-time fan-out hub: live bidirectional connections are grouped into
//! independent broadcast groups, and every message received from one member
//! of a group is relayed to every live member of that group.
//!
//! The hub core is transport-agnostic:
//!
//! - [`registry`]: thread-safe group membership with lock-free snapshot iteration
//! - [`hub`]: per-connection receive loops and bounded, concurrent fan-out
//! - [`session`]: the connection pair a transport hands to the hub
//!
//! [`server`] is a ready-made WebSocket/HTTP transport built on axum.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use bytes::Bytes;
//! use fanout_hub::{BroadcastHub, GroupName};
//!
//! # async fn example() {
//! let hub = Arc::new(BroadcastHub::new());
//! let group = GroupName::new("cases").unwrap();
//!
//! // Transport side: create a connection and hand it to the hub
//! let (conn, mut link) = hub.connection();
//! let loop_hub = Arc::clone(&hub);
//! let loop_group = group.clone();
//! tokio::spawn(async move { loop_hub.on_connect(loop_group, conn).await });
//!
//! // External producer: inject into the group
//! hub.inject(&group, Bytes::from_static(b"{\"id_expediente\":1}")).await;
//!
//! // The member receives it
//! let _payload = link.next_outbound().await;
//! # }
//! ```

pub mod error;
pub mod hub;
pub mod payload;
pub mod registry;
pub mod server;
pub mod session;
pub mod stats;

pub use error::{Error, Result};
pub use hub::{BroadcastHub, BroadcastReport, HubConfig};
pub use registry::{GroupName, GroupRegistry, Message, Snapshot};
pub use server::{HubServer, ServerConfig};
pub use session::{Connection, ConnectionHandle, ConnectionId, PeerLink, PeerSender};
