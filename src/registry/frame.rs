//! Group names and broadcast messages
//!
//! This module defines the key used to address a broadcast group and the
//! message that is fanned out to its members.

use std::sync::Arc;

use bytes::Bytes;

use crate::error::ConnectError;
use crate::session::ConnectionId;

/// Maximum accepted length of a group name, in bytes
pub const MAX_GROUP_NAME_LEN: usize = 256;

/// Name of a broadcast group (e.g. "cases", "patients")
///
/// Cheap to clone; the name is shared behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupName(Arc<str>);

impl GroupName {
    /// Create a group name
    ///
    /// Rejects empty or whitespace-only names and names longer than
    /// [`MAX_GROUP_NAME_LEN`].
    pub fn new(name: impl AsRef<str>) -> Result<Self, ConnectError> {
        let name = name.as_ref();
        if name.trim().is_empty() || name.len() > MAX_GROUP_NAME_LEN {
            return Err(ConnectError::InvalidGroup(name.to_string()));
        }
        Ok(Self(Arc::from(name)))
    }

    /// Get the name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for GroupName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for GroupName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A message to be delivered to every member of a group
///
/// This is designed to be cheap to clone due to `Bytes` reference counting.
#[derive(Debug, Clone)]
pub struct Message {
    /// Target group
    pub group: GroupName,
    /// Opaque payload (zero-copy via reference counting)
    pub payload: Bytes,
    /// Connection the message was read from (`None` when injected)
    pub origin: Option<ConnectionId>,
}

impl Message {
    /// Create a message read from a member connection
    pub fn from_member(group: GroupName, origin: ConnectionId, payload: Bytes) -> Self {
        Self {
            group,
            payload,
            origin: Some(origin),
        }
    }

    /// Create an externally injected message
    pub fn injected(group: GroupName, payload: Bytes) -> Self {
        Self {
            group,
            payload,
            origin: None,
        }
    }

    /// Whether the message was injected rather than read from a member
    pub fn is_injected(&self) -> bool {
        self.origin.is_none()
    }
}
