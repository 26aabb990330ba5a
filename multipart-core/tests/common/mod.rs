//! Shared fixtures: a box-shaped test part and a registry that knows it.

#![allow(dead_code)]

use multipart_core::{
    Container, ContainerConfig, DecodeError, Part, PartDefinition, PartHandle, PartRegistry,
};
use multipart_types::{Cuboid, PartId, PartTypeId, Shape};
use serde_json::{Value, json};

pub const BOX_TYPE: &str = "test:box";

pub fn box_type() -> PartTypeId {
    PartTypeId::new(BOX_TYPE).unwrap()
}

/// A part occupying one cuboid, optionally tolerant of partial overlap.
#[derive(Debug, Clone)]
pub struct BoxPart {
    pub handle: PartHandle,
    pub cuboid: Cuboid,
    pub overlap_ok: bool,
}

impl BoxPart {
    pub fn new(handle: PartHandle, cuboid: Cuboid, overlap_ok: bool) -> Self {
        Self {
            handle,
            cuboid,
            overlap_ok,
        }
    }

    fn to_json(&self) -> Value {
        json!({
            "min": self.cuboid.min,
            "max": self.cuboid.max,
            "overlap": self.overlap_ok,
        })
    }

    fn from_json(handle: PartHandle, value: &Value) -> Result<Self, DecodeError> {
        let corner = |key: &str| -> Result<[f64; 3], DecodeError> {
            Ok(serde_json::from_value(value[key].clone())?)
        };
        let min = corner("min")?;
        let max = corner("max")?;
        let overlap_ok = value["overlap"]
            .as_bool()
            .ok_or_else(|| DecodeError::new("missing overlap flag"))?;
        Ok(Self::new(
            handle,
            Cuboid::new(min[0], min[1], min[2], max[0], max[1], max[2]),
            overlap_ok,
        ))
    }
}

impl Part for BoxPart {
    fn handle(&self) -> &PartHandle {
        &self.handle
    }

    fn shape(&self) -> Shape {
        Shape::cuboid(self.cuboid)
    }

    fn can_overlap_with(&self, _other: &dyn Part) -> bool {
        self.overlap_ok
    }

    fn write_creation_data(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.to_json().to_string().as_bytes());
    }

    fn to_persisted(&self) -> Value {
        self.to_json()
    }
}

pub fn box_definition() -> PartDefinition {
    PartDefinition::new(
        box_type(),
        |handle, value| Ok(Box::new(BoxPart::from_json(handle, value)?) as Box<dyn Part>),
        |handle, bytes| {
            let value: Value = serde_json::from_slice(bytes)?;
            Ok(Box::new(BoxPart::from_json(handle, &value)?) as Box<dyn Part>)
        },
    )
}

pub fn registry() -> PartRegistry {
    let mut registry = PartRegistry::new();
    registry.register(box_definition()).unwrap();
    registry
}

/// Offers and commits a box part; `None` when admission rejects it.
pub fn add_box(container: &mut Container, cuboid: Cuboid) -> Option<PartId> {
    container
        .add(box_type(), |h| Box::new(BoxPart::new(h, cuboid, false)))
        .unwrap()
}

pub fn add_overlapping_box(container: &mut Container, cuboid: Cuboid) -> Option<PartId> {
    container
        .add(box_type(), |h| Box::new(BoxPart::new(h, cuboid, true)))
        .unwrap()
}

pub fn new_container() -> Container {
    Container::new(ContainerConfig::default())
}

/// The lower half of the cell.
pub fn slab_low() -> Cuboid {
    Cuboid::new(0.0, 0.0, 0.0, 1.0, 0.5, 1.0)
}

/// The upper half of the cell.
pub fn slab_high() -> Cuboid {
    Cuboid::new(0.0, 0.5, 0.0, 1.0, 1.0, 1.0)
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
