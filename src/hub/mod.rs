//! Broadcast hub
//!
//! The hub attaches connections to groups, runs one receive loop per
//! connection and fans every received or injected message out to the
//! members of the target group.
//!
//! ```text
//!   transport task (one per connection)          external API task
//!   ┌──────────────────────────────┐            ┌─────────────────┐
//!   │ on_connect(g, conn)          │            │ inject(g, body) │
//!   │   join ─► loop { recv() ──┐  │            └────────┬────────┘
//!   │           broadcast() ◄───┘  │                     │
//!   │   } ─► leave + close (Drop)  │                     │
//!   └───────────────┬──────────────┘                     │
//!                   └──────────────┬─────────────────────┘
//!                                  ▼
//!                     snapshot(g) ─► send to each member
//!                                    (concurrent, bounded by send_timeout)
//! ```

pub mod config;
pub mod report;
pub mod service;

pub use config::HubConfig;
pub use report::{BroadcastReport, DeliveryFailure};
pub use service::BroadcastHub;
