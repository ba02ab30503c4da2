//! Hub server
//!
//! The transport collaborator: accepts WebSocket connections and hands them to
//! the hub, and exposes the JSON inject endpoints.

pub mod config;
pub mod listener;
pub mod routes;
pub mod websocket;

pub use config::ServerConfig;
pub use listener::HubServer;
pub use routes::{router, AppState};
