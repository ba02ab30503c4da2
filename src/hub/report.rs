//! Broadcast outcome

use crate::error::SendError;
use crate::registry::GroupName;
use crate::session::ConnectionId;

/// A member that could not be reached during a broadcast
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryFailure {
    /// Member the send was addressed to
    pub connection: ConnectionId,
    /// Why the send failed
    pub error: SendError,
}

/// Result of fanning one message out to a group
#[derive(Debug, Clone)]
pub struct BroadcastReport {
    /// Group the message was addressed to
    pub group: GroupName,
    /// Members in the snapshot the broadcast iterated
    pub attempted: usize,
    /// Members that accepted the message
    pub delivered: usize,
    /// Members that failed and were removed from the group
    pub failures: Vec<DeliveryFailure>,
}

impl BroadcastReport {
    pub(crate) fn empty(group: GroupName) -> Self {
        Self {
            group,
            attempted: 0,
            delivered: 0,
            failures: Vec::new(),
        }
    }

    /// Whether every attempted delivery succeeded
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Whether a given member failed
    pub fn failed(&self, id: ConnectionId) -> bool {
        self.failures.iter().any(|f| f.connection == id)
    }
}
