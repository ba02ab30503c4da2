//! Group entry and snapshot types
//!
//! This module defines the per-group state stored in the registry.

use std::collections::HashMap;
use std::sync::Arc;

use crate::session::{ConnectionHandle, ConnectionId};

/// Immutable point-in-time copy of a group's members
///
/// Iterating a snapshot never holds a registry lock. Cloning is cheap.
#[derive(Debug, Clone)]
pub struct Snapshot {
    members: Arc<[ConnectionHandle]>,
}

impl Snapshot {
    /// Number of members in the snapshot
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the snapshot has no members
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Iterate over member handles
    pub fn iter(&self) -> std::slice::Iter<'_, ConnectionHandle> {
        self.members.iter()
    }

    /// Check whether a connection is part of the snapshot
    pub fn contains(&self, id: ConnectionId) -> bool {
        self.members.iter().any(|m| m.id() == id)
    }

    /// Member identities, sorted
    pub fn ids(&self) -> Vec<ConnectionId> {
        let mut ids: Vec<_> = self.members.iter().map(ConnectionHandle::id).collect();
        ids.sort_unstable();
        ids
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            members: Arc::from(Vec::new()),
        }
    }
}

impl<'a> IntoIterator for &'a Snapshot {
    type Item = &'a ConnectionHandle;
    type IntoIter = std::slice::Iter<'a, ConnectionHandle>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Entry for a single group in the registry
#[derive(Debug, Default)]
pub(super) struct GroupEntry {
    /// Current members keyed by identity
    members: HashMap<ConnectionId, ConnectionHandle>,

    /// Snapshot built since the last membership change
    cached: Option<Snapshot>,

    /// Set once the entry has been unlinked from the registry index.
    /// A retired entry must not accept new members.
    pub(super) retired: bool,
}

impl GroupEntry {
    /// Add a member. Returns `false` if it was already present.
    pub(super) fn insert(&mut self, conn: ConnectionHandle) -> bool {
        if self.members.contains_key(&conn.id()) {
            return false;
        }
        self.members.insert(conn.id(), conn);
        self.cached = None;
        true
    }

    /// Remove a member. Returns `false` if it was not present.
    pub(super) fn remove(&mut self, id: ConnectionId) -> bool {
        let removed = self.members.remove(&id).is_some();
        if removed {
            self.cached = None;
        }
        removed
    }

    /// Get the member count
    pub(super) fn len(&self) -> usize {
        self.members.len()
    }

    pub(super) fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Copy-on-write snapshot of the members
    pub(super) fn snapshot(&mut self) -> Snapshot {
        if let Some(ref cached) = self.cached {
            return cached.clone();
        }

        let snapshot = Snapshot {
            members: self.members.values().cloned().collect(),
        };
        self.cached = Some(snapshot.clone());
        snapshot
    }
}
