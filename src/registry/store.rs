//! Group registry implementation
//!
//! The central registry that tracks which connections belong to which group.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use super::entry::{GroupEntry, Snapshot};
use super::frame::GroupName;
use crate::session::{ConnectionHandle, ConnectionId};

/// Membership registry for all groups
///
/// The index is an `RwLock` held only long enough to look up (or create) a
/// group's entry. Each group has its own `Mutex`, so operations on one group
/// are totally ordered and never wait on another group's members.
///
/// All methods are synchronous and never await while holding a lock; this is
/// what lets connection cleanup run from `Drop`.
#[derive(Default)]
pub struct GroupRegistry {
    groups: RwLock<HashMap<GroupName, Arc<Mutex<GroupEntry>>>>,
}

impl GroupRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection to a group
    ///
    /// Creates the group on first join. Joining twice is a no-op.
    pub fn join(&self, group: &GroupName, conn: ConnectionHandle) {
        loop {
            let entry_arc = self.entry_or_create(group);
            let mut entry = entry_arc.lock();

            // Lost a race with the last member leaving; look the group up again
            if entry.retired {
                continue;
            }

            let id = conn.id();
            if entry.insert(conn) {
                tracing::debug!(
                    group = %group,
                    connection_id = %id,
                    members = entry.len(),
                    "Member joined"
                );
            }
            return;
        }
    }

    /// Remove a connection from a group
    ///
    /// Absent connections and unknown groups are ignored, so concurrent or
    /// repeated removal is harmless. Returns whether a member was removed.
    pub fn leave(&self, group: &GroupName, id: ConnectionId) -> bool {
        let Some(entry_arc) = self.groups.read().get(group).cloned() else {
            return false;
        };

        let now_empty = {
            let mut entry = entry_arc.lock();
            if !entry.remove(id) {
                return false;
            }

            tracing::debug!(
                group = %group,
                connection_id = %id,
                members = entry.len(),
                "Member left"
            );
            entry.is_empty()
        };

        if now_empty {
            self.retire_if_empty(group, &entry_arc);
        }
        true
    }

    /// Point-in-time copy of a group's members
    ///
    /// Unknown groups yield an empty snapshot.
    pub fn snapshot(&self, group: &GroupName) -> Snapshot {
        let Some(entry_arc) = self.groups.read().get(group).cloned() else {
            return Snapshot::default();
        };
        let snapshot = entry_arc.lock().snapshot();
        snapshot
    }

    /// Number of members currently in a group
    pub fn member_count(&self, group: &GroupName) -> usize {
        self.groups
            .read()
            .get(group)
            .map(|entry| entry.lock().len())
            .unwrap_or(0)
    }

    /// Number of groups with at least one member
    pub fn group_count(&self) -> usize {
        self.groups.read().len()
    }

    /// Names of all groups with at least one member
    pub fn groups(&self) -> Vec<GroupName> {
        let mut names: Vec<_> = self.groups.read().keys().cloned().collect();
        names.sort();
        names
    }

    fn entry_or_create(&self, group: &GroupName) -> Arc<Mutex<GroupEntry>> {
        if let Some(entry) = self.groups.read().get(group) {
            return Arc::clone(entry);
        }

        let mut groups = self.groups.write();
        let entry = groups.entry(group.clone()).or_insert_with(|| {
            tracing::info!(group = %group, "Group created");
            Arc::new(Mutex::new(GroupEntry::default()))
        });
        Arc::clone(entry)
    }

    /// Unlink an empty group from the index
    ///
    /// Re-checks under the index write lock: a join may have refilled the
    /// entry, or a newer entry may already have replaced it.
    fn retire_if_empty(&self, group: &GroupName, entry_arc: &Arc<Mutex<GroupEntry>>) {
        let mut groups = self.groups.write();

        let is_current = groups
            .get(group)
            .map(|current| Arc::ptr_eq(current, entry_arc))
            .unwrap_or(false);
        if !is_current {
            return;
        }

        let mut entry = entry_arc.lock();
        if entry.is_empty() {
            entry.retired = true;
            drop(entry);
            groups.remove(group);
            tracing::info!(group = %group, "Group removed, no members left");
        }
    }
}
