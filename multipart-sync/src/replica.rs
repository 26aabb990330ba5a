//! Mirroring side of the protocol.

use crate::codec;
use crate::config::SyncConfig;
use crate::error::{ProtocolError, SyncError, SyncResult};
use crate::protocol::SyncMessage;
use multipart_core::{Container, ContainerConfig, Part, PartDescriptor, PartRegistry};
use std::fmt;
use std::rc::Rc;
use tracing::{debug, info, warn};

/// Where a replica stands relative to its authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplicaState {
    /// No snapshot received yet.
    Uninitialized,
    /// The local list mirrors the authority's.
    Synchronized,
    /// A message could not be applied. Only a snapshot is accepted.
    Desynchronized,
}

impl fmt::Display for ReplicaState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplicaState::Uninitialized => write!(f, "uninitialized"),
            ReplicaState::Synchronized => write!(f, "synchronized"),
            ReplicaState::Desynchronized => write!(f, "desynchronized"),
        }
    }
}

/// A replica-role container kept in step with an authority by frames.
pub struct Replica {
    container: Container,
    registry: Rc<PartRegistry>,
    config: SyncConfig,
    state: ReplicaState,
    redraw: bool,
}

impl Replica {
    pub fn new(
        registry: Rc<PartRegistry>,
        config: SyncConfig,
        container_config: ContainerConfig,
    ) -> Self {
        Self {
            container: Container::new_replica(container_config),
            registry,
            config,
            state: ReplicaState::Uninitialized,
            redraw: false,
        }
    }

    pub fn state(&self) -> ReplicaState {
        self.state
    }

    /// True when the authority must send a fresh snapshot.
    pub fn needs_resync(&self) -> bool {
        self.state != ReplicaState::Synchronized
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    /// Whether a redraw was requested since the last call.
    pub fn take_redraw(&mut self) -> bool {
        std::mem::take(&mut self.redraw)
    }

    /// Decodes and applies one frame.
    ///
    /// Any failure marks the replica desynchronized and is returned as an
    /// error; the replica itself stays usable and recovers on the next
    /// snapshot.
    pub fn receive(&mut self, frame: &[u8]) -> SyncResult<()> {
        match codec::decode(frame, &self.config) {
            Ok(message) => self.apply(message),
            Err(e) => {
                warn!("Dropping undecodable frame ({} bytes): {}", frame.len(), e);
                self.transition(ReplicaState::Desynchronized);
                Err(e)
            }
        }
    }

    /// Applies one decoded message.
    pub fn apply(&mut self, message: SyncMessage) -> SyncResult<()> {
        if let SyncMessage::Snapshot(descriptors) = message {
            return self.apply_snapshot(&descriptors);
        }

        match self.state {
            ReplicaState::Synchronized => {}
            ReplicaState::Uninitialized => {
                warn!("Received {} before the initial snapshot", message.name());
                self.transition(ReplicaState::Desynchronized);
                return Err(ProtocolError::NotSynchronized.into());
            }
            ReplicaState::Desynchronized => {
                debug!("Dropping {} while desynchronized", message.name());
                return Err(ProtocolError::Desynchronized.into());
            }
        }

        let name = message.name();
        let result = match message {
            SyncMessage::Add(descriptor) => self
                .decode_part(&descriptor)
                .and_then(|part| Ok(self.container.append_remote(part)?))
                .map(drop),
            SyncMessage::Remove(index) => self
                .container
                .remove_remote(usize::from(index))
                .map(drop)
                .map_err(SyncError::from),
            SyncMessage::Redraw => {
                self.redraw = true;
                Ok(())
            }
            SyncMessage::Snapshot(_) => Ok(()),
        };

        if let Err(e) = &result {
            warn!("Failed to apply {}: {}", name, e);
            self.transition(ReplicaState::Desynchronized);
        }
        result
    }

    fn apply_snapshot(&mut self, descriptors: &[PartDescriptor]) -> SyncResult<()> {
        let parts = descriptors
            .iter()
            .map(|descriptor| self.decode_part(descriptor))
            .collect::<SyncResult<Vec<_>>>()
            .and_then(|parts| Ok(self.container.install(parts)?));

        match parts {
            Ok(()) => {
                debug!("Installed snapshot of {} parts", self.container.len());
                self.transition(ReplicaState::Synchronized);
                Ok(())
            }
            Err(e) => {
                warn!("Failed to apply snapshot: {}", e);
                self.transition(ReplicaState::Desynchronized);
                Err(e)
            }
        }
    }

    fn decode_part(&self, descriptor: &PartDescriptor) -> SyncResult<Box<dyn Part>> {
        Ok(self.registry.decode(self.container.id(), descriptor)?)
    }

    fn transition(&mut self, state: ReplicaState) {
        if self.state != state {
            info!("Replica {}: {} -> {}", self.container.id(), self.state, state);
            self.state = state;
        }
    }
}

impl fmt::Debug for Replica {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Replica")
            .field("container", &self.container)
            .field("state", &self.state)
            .field("redraw", &self.redraw)
            .finish_non_exhaustive()
    }
}
