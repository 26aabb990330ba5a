//! Authoritative side of the protocol.

use crate::codec;
use crate::config::SyncConfig;
use crate::error::{ProtocolError, SyncError, SyncResult};
use crate::protocol::SyncMessage;
use crate::transport::MessageChannel;
use multipart_core::{Container, ContainerChange};
use multipart_types::PeerId;
use std::collections::HashSet;
use tracing::{debug, trace, warn};

/// Tracks which peers mirror one container and broadcasts its changes.
///
/// The authority does not own the container or the channel; both are
/// passed in, so the host decides where they live.
///
/// A peer whose incremental stream has a gap (a frame could not be encoded
/// or delivered) is marked stale. It receives no further incremental
/// messages until a fresh snapshot reaches it, which `flush` and
/// `subscribe` retry.
#[derive(Debug, Default)]
pub struct SyncAuthority {
    config: SyncConfig,
    /// In subscription order.
    subscribers: Vec<PeerId>,
    stale: HashSet<PeerId>,
}

impl SyncAuthority {
    pub fn new(config: SyncConfig) -> Self {
        Self {
            config,
            subscribers: Vec::new(),
            stale: HashSet::new(),
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn subscribers(&self) -> &[PeerId] {
        &self.subscribers
    }

    pub fn is_subscribed(&self, peer: PeerId) -> bool {
        self.subscribers.contains(&peer)
    }

    /// True when `peer` missed a message and is waiting for a snapshot.
    pub fn needs_resync(&self, peer: PeerId) -> bool {
        self.stale.contains(&peer)
    }

    /// Full snapshot of `container`, in list order.
    pub fn snapshot(container: &Container) -> SyncMessage {
        SyncMessage::Snapshot(container.descriptors())
    }

    /// Sends a full snapshot to `peer` only and starts broadcasting changes
    /// to it. Subscribing an existing subscriber resends the snapshot, which
    /// is how a desynchronized replica recovers.
    pub fn subscribe(
        &mut self,
        peer: PeerId,
        container: &Container,
        channel: &mut impl MessageChannel,
    ) -> SyncResult<()> {
        let frame = codec::encode(&Self::snapshot(container), &self.config)?;
        channel.send_to(peer, &frame)?;
        if !self.is_subscribed(peer) {
            self.subscribers.push(peer);
        }
        self.stale.remove(&peer);
        debug!(
            "Sent snapshot of {} parts to {} ({} bytes)",
            container.len(),
            peer,
            frame.len()
        );
        Ok(())
    }

    /// Stops broadcasting to `peer`.
    pub fn unsubscribe(&mut self, peer: PeerId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|p| *p != peer);
        self.stale.remove(&peer);
        self.subscribers.len() != before
    }

    /// Drains the container's queued changes and broadcasts them to every
    /// subscriber that is in step. Returns the number of messages broadcast;
    /// resync snapshots are not counted.
    ///
    /// The whole batch is encoded before anything is sent. If any change
    /// cannot be encoded, or a frame cannot be delivered to a peer, the
    /// affected peers are marked stale and sent a snapshot of the current
    /// container instead. The first error is returned after every peer has
    /// been handled; stale peers are retried on the next flush.
    ///
    /// Destruction is sent as a removal of the last part, after which all
    /// subscriptions end.
    pub fn flush(
        &mut self,
        container: &mut Container,
        channel: &mut impl MessageChannel,
    ) -> SyncResult<usize> {
        let (frames, destroyed, mut failure) = self.encode_changes(container.take_changes());

        let mut sent = 0;
        if failure.is_some() {
            self.stale.extend(self.subscribers.iter().copied());
        } else {
            for (name, frame) in &frames {
                let mut delivered = false;
                for peer in self.subscribers.iter().copied() {
                    if self.stale.contains(&peer) {
                        continue;
                    }
                    match channel.send_to(peer, frame) {
                        Ok(()) => delivered = true,
                        Err(e) => {
                            warn!("Failed to send {} to {}: {}", name, peer, e);
                            self.stale.insert(peer);
                            failure.get_or_insert(e);
                        }
                    }
                }
                if delivered {
                    trace!("Broadcast {} to {} peers", name, self.subscribers.len());
                    sent += 1;
                }
            }
        }

        if let Err(e) = self.resync_stale(container, channel) {
            failure.get_or_insert(e);
        }

        if destroyed {
            debug!(
                "Container {} destroyed; dropping {} subscribers",
                container.id(),
                self.subscribers.len()
            );
            self.subscribers.clear();
            self.stale.clear();
        }

        match failure {
            Some(e) => Err(e),
            None => Ok(sent),
        }
    }

    /// Encodes changes up to and including a destruction. Stops at the
    /// first change that cannot be encoded and returns its error.
    fn encode_changes(
        &self,
        changes: Vec<ContainerChange>,
    ) -> (Vec<(&'static str, Vec<u8>)>, bool, Option<SyncError>) {
        let mut frames = Vec::with_capacity(changes.len());
        let mut destroyed = false;
        for change in changes {
            let message = match change {
                ContainerChange::Added(descriptor) => Ok(SyncMessage::Add(descriptor)),
                ContainerChange::Removed { index } => wire_index(index).map(SyncMessage::Remove),
                ContainerChange::Redraw => Ok(SyncMessage::Redraw),
                ContainerChange::Destroyed => {
                    destroyed = true;
                    Ok(SyncMessage::Remove(0))
                }
            };
            match message.and_then(|m| Ok((m.name(), codec::encode(&m, &self.config)?))) {
                Ok(frame) => frames.push(frame),
                Err(e) => {
                    warn!("Cannot encode change for broadcast: {}", e);
                    return (frames, destroyed, Some(e));
                }
            }
            if destroyed {
                break;
            }
        }
        (frames, destroyed, None)
    }

    /// Sends a snapshot to every stale subscriber. Peers that receive it
    /// are back in step.
    fn resync_stale(
        &mut self,
        container: &Container,
        channel: &mut impl MessageChannel,
    ) -> SyncResult<()> {
        if self.stale.is_empty() {
            return Ok(());
        }
        let frame = codec::encode(&Self::snapshot(container), &self.config)?;

        let mut failure = None;
        for peer in self.subscribers.iter().copied() {
            if !self.stale.contains(&peer) {
                continue;
            }
            match channel.send_to(peer, &frame) {
                Ok(()) => {
                    self.stale.remove(&peer);
                    debug!("Resynchronized {} with a snapshot of {} parts", peer, container.len());
                }
                Err(e) => {
                    warn!("Failed to resynchronize {}: {}", peer, e);
                    failure.get_or_insert(e);
                }
            }
        }
        match failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

fn wire_index(index: usize) -> SyncResult<u8> {
    u8::try_from(index).map_err(|_| {
        ProtocolError::IndexOutOfRange {
            index,
            len: u8::MAX as usize,
        }
        .into()
    })
}
