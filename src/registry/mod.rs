//! Group membership registry
//!
//! The registry tracks, per group name, the set of live connections. It knows
//! nothing about transports or payloads; the hub reads it through snapshots.
//!
//! # Architecture
//!
//! ```text
//!                        Arc<GroupRegistry>
//!                 ┌──────────────────────────────┐
//!                 │ groups: RwLock<HashMap<Name, │
//!                 │   Mutex<GroupEntry {         │
//!                 │     members,                 │
//!                 │     cached: Snapshot,        │
//!                 │   }>                         │
//!                 │ >>                           │
//!                 └──────────────┬───────────────┘
//!                                │
//!        ┌───────────────────────┼───────────────────────┐
//!        │                       │                       │
//!        ▼                       ▼                       ▼
//!    join(g, c)             leave(g, id)           snapshot(g)
//!                                                        │
//!                                       BroadcastHub ◄───┘ iterate, send
//! ```
//!
//! # Snapshots
//!
//! A snapshot is an `Arc<[ConnectionHandle]>` built on demand and cached until
//! the group's membership next changes, so back-to-back broadcasts on a quiet
//! group share one allocation and no lock is held while sending.

pub mod entry;
pub mod frame;
pub mod store;

pub use entry::Snapshot;
pub use frame::{GroupName, Message, MAX_GROUP_NAME_LEN};
pub use store::GroupRegistry;
