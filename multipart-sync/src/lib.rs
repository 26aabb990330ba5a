//! Replication of multipart containers.
//!
//! An authoritative container is mirrored on any number of replicas by
//! index-addressed messages:
//!
//! - **Protocol**: snapshot, add, remove-by-index and redraw messages
//! - **Codec**: the compact big-endian byte framing of those messages
//! - **Authority**: subscription tracking and change broadcast
//! - **Replica**: a replica-role container driven by incoming frames
//! - **Transport**: the [`MessageChannel`] seam to whatever carries frames
//!
//! # Sync Process
//!
//! 1. A peer becomes interested in a cell: the authority sends it a full
//!    snapshot and subscribes it.
//! 2. Every committed addition or removal on the authority is broadcast as
//!    one add or remove message.
//! 3. A replica that cannot apply a message marks itself desynchronized
//!    and ignores everything except the next snapshot.
//! 4. A peer the authority failed to reach is marked stale and sent a fresh
//!    snapshot on the next flush.
//!
//! # Example
//!
//! ```
//! use multipart_sync::{SyncConfig, SyncMessage, codec};
//!
//! let config = SyncConfig::default();
//! let frame = codec::encode(&SyncMessage::Remove(1), &config).unwrap();
//! assert_eq!(frame, vec![2, 1]);
//! assert_eq!(codec::decode(&frame, &config).unwrap(), SyncMessage::Remove(1));
//! ```

mod authority;
pub mod codec;
mod config;
mod error;
pub mod protocol;
mod replica;
pub mod transport;

pub use authority::SyncAuthority;
pub use config::{DEFAULT_MAX_MESSAGE_SIZE, DEFAULT_MAX_PAYLOAD_LEN, SyncConfig};
pub use error::{ProtocolError, SyncError, SyncResult};
pub use protocol::{MAX_SNAPSHOT_PARTS, SyncMessage};
pub use replica::{Replica, ReplicaState};
pub use transport::MessageChannel;
