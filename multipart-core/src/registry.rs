//! Part definitions and the registry that resolves them.
//!
//! The registry is an ordinary value built once at startup and handed to
//! whatever needs to rebuild parts (persistence loading, replicas). There is
//! no process-wide instance.

use crate::error::{ContainerError, ContainerResult, DecodeError};
use crate::part::{Part, PartHandle};
use crate::persist::PersistedPart;
use crate::placeholder::UnknownPart;
use multipart_types::{ContainerId, PartId, PartTypeId};
use std::collections::HashMap;
use std::fmt;
use tracing::warn;

type LoadFn = dyn Fn(PartHandle, &serde_json::Value) -> Result<Box<dyn Part>, DecodeError>;
type ReadFn = dyn Fn(PartHandle, &[u8]) -> Result<Box<dyn Part>, DecodeError>;

/// Wire description of one part: `[type_id][creation_payload]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartDescriptor {
    pub part_type: PartTypeId,
    pub payload: Vec<u8>,
}

impl PartDescriptor {
    pub fn new(part_type: PartTypeId, payload: Vec<u8>) -> Self {
        Self { part_type, payload }
    }
}

/// Decoders for one part type.
pub struct PartDefinition {
    part_type: PartTypeId,
    load: Box<LoadFn>,
    read: Box<ReadFn>,
}

impl PartDefinition {
    /// Creates a definition from a persisted-form loader and a wire reader.
    pub fn new<L, R>(part_type: PartTypeId, load: L, read: R) -> Self
    where
        L: Fn(PartHandle, &serde_json::Value) -> Result<Box<dyn Part>, DecodeError> + 'static,
        R: Fn(PartHandle, &[u8]) -> Result<Box<dyn Part>, DecodeError> + 'static,
    {
        Self {
            part_type,
            load: Box::new(load),
            read: Box::new(read),
        }
    }

    pub fn part_type(&self) -> &PartTypeId {
        &self.part_type
    }

    /// Rebuilds a part from its persisted payload.
    pub fn load(
        &self,
        handle: PartHandle,
        payload: &serde_json::Value,
    ) -> Result<Box<dyn Part>, DecodeError> {
        (self.load)(handle, payload)
    }

    /// Rebuilds a part from its wire creation payload.
    pub fn read(&self, handle: PartHandle, payload: &[u8]) -> Result<Box<dyn Part>, DecodeError> {
        (self.read)(handle, payload)
    }
}

impl fmt::Debug for PartDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartDefinition")
            .field("part_type", &self.part_type)
            .finish_non_exhaustive()
    }
}

/// Map from type id to definition.
#[derive(Debug, Default)]
pub struct PartRegistry {
    definitions: HashMap<PartTypeId, PartDefinition>,
}

impl PartRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a definition. Type ids are unique, and the reserved placeholder
    /// id cannot be claimed.
    pub fn register(&mut self, definition: PartDefinition) -> ContainerResult<()> {
        let part_type = definition.part_type.clone();
        if part_type.is_missing() || self.definitions.contains_key(&part_type) {
            return Err(ContainerError::DuplicateDefinition(part_type));
        }
        self.definitions.insert(part_type, definition);
        Ok(())
    }

    pub fn get(&self, part_type: &PartTypeId) -> Option<&PartDefinition> {
        self.definitions.get(part_type)
    }

    /// Whether a wire descriptor with this type id can be decoded.
    pub fn contains(&self, part_type: &PartTypeId) -> bool {
        part_type.is_missing() || self.definitions.contains_key(part_type)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Rebuilds a persisted part. Never fails: an unknown type id or a
    /// loader error yields an [`UnknownPart`] that keeps the original entry.
    pub fn load(&self, container: ContainerId, persisted: &PersistedPart) -> Box<dyn Part> {
        let id = persisted.id.unwrap_or_default();
        let resolved = PartTypeId::new(persisted.part_type.as_str())
            .ok()
            .and_then(|part_type| self.get(&part_type).map(|def| (part_type, def)));

        match resolved {
            Some((part_type, definition)) => {
                let handle = PartHandle::new(id, part_type.clone(), container);
                match definition.load(handle, &persisted.payload) {
                    Ok(part) => part,
                    Err(e) => {
                        warn!("Failed to load part {} ({}): {}; keeping placeholder", id, part_type, e);
                        Box::new(UnknownPart::new(container, id, persisted))
                    }
                }
            }
            None => {
                warn!(
                    "Unknown part type {:?} for part {}; keeping placeholder",
                    persisted.part_type, id
                );
                Box::new(UnknownPart::new(container, id, persisted))
            }
        }
    }

    /// Rebuilds a part from a wire descriptor. Unknown type ids are errors
    /// here: the sender is expected to share this registry's definitions.
    pub fn decode(
        &self,
        container: ContainerId,
        descriptor: &PartDescriptor,
    ) -> ContainerResult<Box<dyn Part>> {
        let part_type = &descriptor.part_type;
        if part_type.is_missing() {
            let original = std::str::from_utf8(&descriptor.payload).map_err(|e| {
                ContainerError::Decode {
                    part_type: part_type.clone(),
                    source: e.into(),
                }
            })?;
            return Ok(Box::new(UnknownPart::from_wire(container, original)));
        }

        let definition = self
            .get(part_type)
            .ok_or_else(|| ContainerError::UnknownPartType(part_type.clone()))?;
        let handle = PartHandle::new(PartId::new(), part_type.clone(), container);
        definition
            .read(handle, &descriptor.payload)
            .map_err(|source| ContainerError::Decode {
                part_type: part_type.clone(),
                source,
            })
    }
}
