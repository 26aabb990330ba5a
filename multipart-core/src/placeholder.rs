//! Inert stand-in for parts whose type is not registered.

use crate::part::{Part, PartHandle};
use crate::persist::PersistedPart;
use crate::registry::PartDescriptor;
use multipart_types::{ContainerId, PartId, PartTypeId, Shape};

/// Keeps an unresolvable persisted entry alive so saving writes it back
/// unchanged. Occupies no space.
#[derive(Debug, Clone)]
pub struct UnknownPart {
    handle: PartHandle,
    original_type: String,
    payload: serde_json::Value,
}

impl UnknownPart {
    pub(crate) fn new(container: ContainerId, id: PartId, persisted: &PersistedPart) -> Self {
        Self {
            handle: PartHandle::new(id, PartTypeId::missing(), container),
            original_type: persisted.part_type.clone(),
            payload: persisted.payload.clone(),
        }
    }

    pub(crate) fn from_wire(container: ContainerId, original_type: &str) -> Self {
        Self {
            handle: PartHandle::new(PartId::new(), PartTypeId::missing(), container),
            original_type: original_type.to_string(),
            payload: serde_json::Value::Null,
        }
    }

    /// The type id the entry was saved under.
    pub fn original_type(&self) -> &str {
        &self.original_type
    }

    pub fn payload(&self) -> &serde_json::Value {
        &self.payload
    }
}

impl Part for UnknownPart {
    fn handle(&self) -> &PartHandle {
        &self.handle
    }

    fn shape(&self) -> Shape {
        Shape::empty()
    }

    fn can_overlap_with(&self, _other: &dyn Part) -> bool {
        true
    }

    fn to_persisted(&self) -> serde_json::Value {
        self.payload.clone()
    }

    fn descriptor(&self) -> PartDescriptor {
        PartDescriptor::new(PartTypeId::missing(), self.original_type.as_bytes().to_vec())
    }

    fn save(&self) -> PersistedPart {
        PersistedPart {
            part_type: self.original_type.clone(),
            id: Some(self.handle.id()),
            payload: self.payload.clone(),
        }
    }
}
