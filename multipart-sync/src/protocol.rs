//! Sync protocol messages.
//!
//! The protocol is index-addressed: after one full snapshot, every change is
//! either an append (the new part goes to the end of the list) or a removal
//! by position in the *current* list. There are no stable ids on the wire,
//! so a replica that misses or reorders a message can only recover through
//! a fresh snapshot.

use multipart_core::PartDescriptor;

/// Wire tag of a full snapshot.
pub const TAG_SNAPSHOT: u8 = 0;
/// Wire tag of an append.
pub const TAG_ADD: u8 = 1;
/// Wire tag of a removal by index.
pub const TAG_REMOVE: u8 = 2;
/// Wire tag of a redraw request.
pub const TAG_REDRAW: u8 = 3;

/// Largest snapshot a count byte can describe.
pub const MAX_SNAPSHOT_PARTS: usize = u8::MAX as usize;

/// A sync protocol message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncMessage {
    /// Every part, in list order. Replaces the replica's list.
    Snapshot(Vec<PartDescriptor>),

    /// One part appended to the end of the list.
    Add(PartDescriptor),

    /// The part at this index of the current list left.
    Remove(u8),

    /// Derived presentation state must be recomputed.
    Redraw,
}

impl SyncMessage {
    pub fn tag(&self) -> u8 {
        match self {
            SyncMessage::Snapshot(_) => TAG_SNAPSHOT,
            SyncMessage::Add(_) => TAG_ADD,
            SyncMessage::Remove(_) => TAG_REMOVE,
            SyncMessage::Redraw => TAG_REDRAW,
        }
    }

    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            SyncMessage::Snapshot(_) => "snapshot",
            SyncMessage::Add(_) => "add",
            SyncMessage::Remove(_) => "remove",
            SyncMessage::Redraw => "redraw",
        }
    }
}
