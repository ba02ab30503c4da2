//! Broadcast hub implementation
//!
//! Drives each member connection's receive loop and fans messages out to the
//! other members of the same group.

use std::sync::Arc;

use bytes::Bytes;
use futures_util::future::join_all;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::config::HubConfig;
use super::report::{BroadcastReport, DeliveryFailure};
use crate::error::{DecodeError, ReadError};
use crate::registry::{GroupName, GroupRegistry, Message};
use crate::session::{self, Connection, ConnectionHandle, PeerLink};
use crate::stats::{HubStats, StatsSnapshot};

/// Fan-out hub for all groups
///
/// The hub owns no task of its own. Receive loops run on the task that calls
/// [`on_connect`](Self::on_connect); broadcasts run on the caller's task.
///
/// Every member of a group receives each broadcast, including the member the
/// message was read from. Collaborators that do not want the echo must filter
/// on [`Message::origin`] themselves.
pub struct BroadcastHub {
    registry: Arc<GroupRegistry>,
    config: HubConfig,
    stats: Arc<HubStats>,
}

impl BroadcastHub {
    /// Create a hub with default configuration
    pub fn new() -> Self {
        Self::with_config(HubConfig::default())
    }

    /// Create a hub with custom configuration and its own registry
    pub fn with_config(config: HubConfig) -> Self {
        Self::with_registry(Arc::new(GroupRegistry::new()), config)
    }

    /// Create a hub on top of an existing registry
    pub fn with_registry(registry: Arc<GroupRegistry>, config: HubConfig) -> Self {
        Self {
            registry,
            config,
            stats: Arc::new(HubStats::new()),
        }
    }

    /// Get the membership registry
    pub fn registry(&self) -> &Arc<GroupRegistry> {
        &self.registry
    }

    /// Get the hub configuration
    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    /// Current counters
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot(self.registry.group_count())
    }

    /// Create a connection pair sized for this hub
    pub fn connection(&self) -> (Connection, PeerLink) {
        session::channel(self.config.connection_buffer)
    }

    /// Attach a connection to a group and run its receive loop
    ///
    /// Every message read from `conn` is broadcast to `group`. Returns when
    /// the first read fails (including a clean close from either side), after
    /// the connection has been removed from the group and closed. Cleanup also
    /// runs if this future is dropped early.
    pub async fn on_connect(&self, group: GroupName, mut conn: Connection) -> ReadError {
        let id = conn.id();
        let _membership = Membership::attach(self, group.clone(), conn.handle().clone());

        let reason = loop {
            match conn.recv().await {
                Ok(payload) => {
                    self.stats.message_received();
                    tracing::debug!(
                        group = %group,
                        connection_id = %id,
                        size = payload.len(),
                        "Message received"
                    );
                    self.broadcast(Message::from_member(group.clone(), id, payload))
                        .await;
                }
                Err(e) => break e,
            }
        };

        match &reason {
            ReadError::Closed => {
                tracing::debug!(group = %group, connection_id = %id, "Receive loop ended");
            }
            ReadError::Transport(err) => {
                tracing::debug!(
                    group = %group,
                    connection_id = %id,
                    error = %err,
                    "Receive loop failed"
                );
            }
        }

        reason
    }

    /// Deliver a message to every current member of its group
    ///
    /// Sends run concurrently and each is bounded by the configured send
    /// timeout. A member whose send fails is closed and removed from the
    /// group; the remaining members are unaffected.
    pub async fn broadcast(&self, message: Message) -> BroadcastReport {
        let snapshot = self.registry.snapshot(&message.group);
        if snapshot.is_empty() {
            tracing::debug!(group = %message.group, "Broadcast to empty group");
            return BroadcastReport::empty(message.group);
        }

        let timeout = self.config.send_timeout;
        let sends = snapshot.iter().map(|member| {
            let payload = message.payload.clone();
            async move { (member, member.send(payload, timeout).await) }
        });
        let results = join_all(sends).await;

        let mut report = BroadcastReport::empty(message.group.clone());
        report.attempted = snapshot.len();

        for (member, result) in results {
            match result {
                Ok(()) => report.delivered += 1,
                Err(error) => {
                    tracing::warn!(
                        group = %message.group,
                        connection_id = %member.id(),
                        error = %error,
                        "Delivery failed, dropping member"
                    );
                    self.drop_member(&message.group, member);
                    report.failures.push(DeliveryFailure {
                        connection: member.id(),
                        error,
                    });
                }
            }
        }

        self.stats
            .record_broadcast(report.delivered, report.failures.len());

        tracing::debug!(
            group = %message.group,
            origin = ?message.origin.map(|id| id.as_u64()),
            delivered = report.delivered,
            failed = report.failures.len(),
            "Broadcast complete"
        );

        report
    }

    /// Deliver an externally produced payload to a group
    ///
    /// An empty group is not an error; the report simply shows no deliveries.
    pub async fn inject(&self, group: &GroupName, payload: Bytes) -> BroadcastReport {
        self.stats.message_injected();
        self.broadcast(Message::injected(group.clone(), payload))
            .await
    }

    /// Validate a JSON body as `T`, then inject its canonical encoding
    ///
    /// Malformed bodies are rejected before anything is broadcast.
    pub async fn inject_json<T>(
        &self,
        group: &GroupName,
        body: &[u8],
    ) -> Result<BroadcastReport, DecodeError>
    where
        T: DeserializeOwned + Serialize,
    {
        let decode_error = |source| DecodeError {
            group: group.clone(),
            source,
        };

        let value: T = serde_json::from_slice(body).map_err(|source| {
            tracing::debug!(group = %group, error = %source, "Rejected injected payload");
            decode_error(source)
        })?;
        let payload = serde_json::to_vec(&value).map_err(decode_error)?;

        Ok(self.inject(group, Bytes::from(payload)).await)
    }

    /// Close every member of every group
    ///
    /// Each receive loop observes the close and runs its own cleanup.
    /// Returns the number of connections closed.
    pub fn shutdown(&self) -> usize {
        let mut closed = 0;
        for group in self.registry.groups() {
            for member in &self.registry.snapshot(&group) {
                if member.close() {
                    closed += 1;
                }
            }
        }

        tracing::info!(connections = closed, "Hub shut down");
        closed
    }

    fn drop_member(&self, group: &GroupName, member: &ConnectionHandle) {
        member.close();
        self.registry.leave(group, member.id());
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new()
    }
}

/// Group membership of one connection for the lifetime of its receive loop
///
/// Dropping it removes the connection from its group and closes it, on every
/// exit path.
struct Membership {
    registry: Arc<GroupRegistry>,
    stats: Arc<HubStats>,
    group: GroupName,
    handle: ConnectionHandle,
}

impl Membership {
    fn attach(hub: &BroadcastHub, group: GroupName, handle: ConnectionHandle) -> Self {
        hub.registry.join(&group, handle.clone());
        hub.stats.connection_opened();

        tracing::info!(
            group = %group,
            connection_id = %handle.id(),
            members = hub.registry.member_count(&group),
            "Connection attached"
        );

        Self {
            registry: Arc::clone(&hub.registry),
            stats: Arc::clone(&hub.stats),
            group,
            handle,
        }
    }
}

impl Drop for Membership {
    fn drop(&mut self) {
        self.registry.leave(&self.group, self.handle.id());
        self.handle.close();
        self.stats.connection_closed();

        tracing::info!(
            group = %self.group,
            connection_id = %self.handle.id(),
            "Connection detached"
        );
    }
}
