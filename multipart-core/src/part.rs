//! The contract every part implementation fulfils.

use crate::context::PartContext;
use crate::persist::PersistedPart;
use crate::registry::PartDescriptor;
use multipart_types::{ContainerId, Direction, OwnerKey, PartId, PartTypeId, Shape};
use std::any::Any;

/// Identity of one part instance.
///
/// Issued by the container before the part's behaviour object exists, so the
/// behaviour can keep it. The container back-reference is an id, never a
/// pointer: parts do not own or borrow their container.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PartHandle {
    id: PartId,
    part_type: PartTypeId,
    container: ContainerId,
}

impl PartHandle {
    pub fn new(id: PartId, part_type: PartTypeId, container: ContainerId) -> Self {
        Self {
            id,
            part_type,
            container,
        }
    }

    pub fn id(&self) -> PartId {
        self.id
    }

    pub fn part_type(&self) -> &PartTypeId {
        &self.part_type
    }

    pub fn container(&self) -> ContainerId {
        self.container
    }

    /// Listener and property-writer key owned by this part.
    pub fn key(&self) -> OwnerKey {
        OwnerKey::from(self.id)
    }
}

/// Domain behaviour occupying some region of a cell.
///
/// Only [`Part::handle`] and [`Part::shape`] are required. Everything else
/// has a neutral default: no overlap compatibility, empty creation payload,
/// null persisted payload, no attributes.
pub trait Part: Any {
    fn handle(&self) -> &PartHandle;

    /// Primary shape, used for admission control and `current_shape`.
    fn shape(&self) -> Shape;

    fn collision_shape(&self) -> Shape {
        self.shape()
    }

    /// Shape at a point between two ticks, for moving parts.
    fn dynamic_shape(&self, partial_ticks: f32) -> Shape {
        let _ = partial_ticks;
        self.collision_shape()
    }

    /// Whether this part tolerates `other` sharing space with it. Admission
    /// asks both sides.
    fn can_overlap_with(&self, other: &dyn Part) -> bool {
        let _ = other;
        false
    }

    /// Called once the part is committed. Register listeners here.
    fn on_added(&mut self, cx: &PartContext) {
        let _ = cx;
    }

    /// Called after the part left the list, before its listeners and
    /// property contributions are dropped.
    fn on_removed(&mut self, cx: &PartContext) {
        let _ = cx;
    }

    /// Bytes a replica needs to rebuild this part.
    fn write_creation_data(&self, out: &mut Vec<u8>) {
        let _ = out;
    }

    /// Opaque persisted payload.
    fn to_persisted(&self) -> serde_json::Value {
        serde_json::Value::Null
    }

    /// Contributes obstruction shapes and named attributes to a query.
    fn add_attributes(&self, attributes: &mut AttributeList) {
        let _ = attributes;
    }

    /// Wire description: type id plus creation payload.
    fn descriptor(&self) -> PartDescriptor {
        let mut payload = Vec::new();
        self.write_creation_data(&mut payload);
        PartDescriptor::new(self.handle().part_type().clone(), payload)
    }

    /// Persisted description: type id, durable id and payload.
    fn save(&self) -> PersistedPart {
        let handle = self.handle();
        PersistedPart {
            part_type: handle.part_type().to_string(),
            id: Some(handle.id()),
            payload: self.to_persisted(),
        }
    }
}

impl dyn Part {
    pub fn is<T: Part>(&self) -> bool {
        (self as &dyn Any).is::<T>()
    }

    pub fn downcast_ref<T: Part>(&self) -> Option<&T> {
        (self as &dyn Any).downcast_ref::<T>()
    }

    pub fn downcast_mut<T: Part>(&mut self) -> Option<&mut T> {
        (self as &mut dyn Any).downcast_mut::<T>()
    }

    pub fn id(&self) -> PartId {
        self.handle().id()
    }
}

/// Accumulator for capability and attribute queries.
///
/// With a side set, only obstructions touching that face of the cell are
/// kept.
#[derive(Debug, Clone, Default)]
pub struct AttributeList {
    side: Option<Direction>,
    obstructions: Vec<Shape>,
    values: Vec<(String, serde_json::Value)>,
}

impl AttributeList {
    pub fn new(side: Option<Direction>) -> Self {
        Self {
            side,
            ..Self::default()
        }
    }

    pub fn side(&self) -> Option<Direction> {
        self.side
    }

    /// Records a shape that blocks things passing through the cell.
    pub fn obstruct(&mut self, shape: Shape) {
        if shape.is_empty() {
            return;
        }
        if let Some(side) = self.side
            && !shape.touches(side)
        {
            return;
        }
        self.obstructions.push(shape);
    }

    /// Records a named attribute value.
    pub fn offer(&mut self, name: impl Into<String>, value: serde_json::Value) {
        self.values.push((name.into(), value));
    }

    pub fn obstructions(&self) -> &[Shape] {
        &self.obstructions
    }

    pub fn into_obstructions(self) -> Vec<Shape> {
        self.obstructions
    }

    /// All values offered under `name`, in part order.
    pub fn values<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a serde_json::Value> {
        self.values
            .iter()
            .filter(move |(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// First value offered under `name`.
    pub fn first(&self, name: &str) -> Option<&serde_json::Value> {
        self.values(name).next()
    }
}
