//! Transport abstraction.
//!
//! The sync layer only produces and consumes frames; whatever carries them
//! (a game server's packet pipeline, a socket, a test queue) implements
//! [`MessageChannel`]. Delivery must be ordered and lossless per peer:
//! the protocol has no way to repair a gap.

use crate::error::SyncResult;
use multipart_types::PeerId;

/// Outbound frame delivery.
pub trait MessageChannel {
    /// Sends one frame to one peer.
    fn send_to(&mut self, peer: PeerId, frame: &[u8]) -> SyncResult<()>;

    /// Sends one frame to each of `peers`.
    fn send_to_all(&mut self, peers: &[PeerId], frame: &[u8]) -> SyncResult<()> {
        for peer in peers {
            self.send_to(*peer, frame)?;
        }
        Ok(())
    }
}

/// An in-memory channel for testing.
pub mod mock {
    use super::*;
    use crate::error::SyncError;
    use std::collections::{HashMap, VecDeque};

    /// Queues frames per peer and can misbehave on request.
    #[derive(Debug, Default)]
    pub struct MockChannel {
        queues: HashMap<PeerId, VecDeque<Vec<u8>>>,
        drop_next: usize,
        dropped: usize,
        closed: bool,
    }

    impl MockChannel {
        /// Creates a new, empty mock channel.
        pub fn new() -> Self {
            Self::default()
        }

        /// Silently discards the next `n` frames sent to anyone.
        pub fn drop_next(&mut self, n: usize) {
            self.drop_next += n;
        }

        /// Number of frames discarded so far.
        pub fn dropped(&self) -> usize {
            self.dropped
        }

        /// Swaps the two most recent frames queued for `peer`.
        pub fn swap_last_two(&mut self, peer: PeerId) -> bool {
            match self.queues.get_mut(&peer) {
                Some(queue) if queue.len() >= 2 => {
                    let len = queue.len();
                    queue.swap(len - 1, len - 2);
                    true
                }
                _ => false,
            }
        }

        /// Number of frames waiting for `peer`.
        pub fn pending(&self, peer: PeerId) -> usize {
            self.queues.get(&peer).map_or(0, VecDeque::len)
        }

        /// Takes the oldest frame waiting for `peer`.
        pub fn take(&mut self, peer: PeerId) -> Option<Vec<u8>> {
            self.queues.get_mut(&peer)?.pop_front()
        }

        /// Takes every frame waiting for `peer`, oldest first.
        pub fn drain(&mut self, peer: PeerId) -> Vec<Vec<u8>> {
            self.queues
                .get_mut(&peer)
                .map(|queue| queue.drain(..).collect())
                .unwrap_or_default()
        }

        /// Closes the channel; later sends fail.
        pub fn close(&mut self) {
            self.closed = true;
        }

        /// Reopens a closed channel.
        pub fn reopen(&mut self) {
            self.closed = false;
        }

        pub fn is_closed(&self) -> bool {
            self.closed
        }
    }

    impl MessageChannel for MockChannel {
        fn send_to(&mut self, peer: PeerId, frame: &[u8]) -> SyncResult<()> {
            if self.closed {
                return Err(SyncError::ChannelClosed);
            }
            if self.drop_next > 0 {
                self.drop_next -= 1;
                self.dropped += 1;
                return Ok(());
            }
            self.queues.entry(peer).or_default().push_back(frame.to_vec());
            Ok(())
        }
    }
}
