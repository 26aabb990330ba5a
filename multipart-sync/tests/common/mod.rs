//! Shared fixtures: a labelled tile part and an authority/replica pair.

#![allow(dead_code)]

use multipart_core::{
    Container, ContainerConfig, DecodeError, Part, PartDefinition, PartHandle, PartRegistry,
};
use multipart_sync::{Replica, SyncConfig};
use multipart_types::{Cuboid, PartId, PartTypeId, Shape};
use serde_json::{Value, json};
use std::rc::Rc;

pub const TILE_TYPE: &str = "test:tile";

pub fn tile_type() -> PartTypeId {
    PartTypeId::new(TILE_TYPE).unwrap()
}

/// A sixteenth-wide column of the cell, picked by `slot`.
#[derive(Debug, Clone)]
pub struct Tile {
    pub handle: PartHandle,
    pub slot: u8,
    pub label: String,
}

impl Tile {
    fn to_json(&self) -> Value {
        json!({ "slot": self.slot, "label": self.label })
    }

    fn from_json(handle: PartHandle, value: &Value) -> Result<Self, DecodeError> {
        let slot = value["slot"]
            .as_u64()
            .and_then(|s| u8::try_from(s).ok())
            .ok_or_else(|| DecodeError::new("bad slot"))?;
        let label = value["label"]
            .as_str()
            .ok_or_else(|| DecodeError::new("bad label"))?
            .to_string();
        Ok(Self {
            handle,
            slot,
            label,
        })
    }
}

impl Part for Tile {
    fn handle(&self) -> &PartHandle {
        &self.handle
    }

    fn shape(&self) -> Shape {
        let slot = self.slot % 16;
        Shape::cuboid(Cuboid::sixteenths(slot, 0, 0, slot + 1, 16, 16))
    }

    fn write_creation_data(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.to_json().to_string().as_bytes());
    }

    fn to_persisted(&self) -> Value {
        self.to_json()
    }
}

pub fn registry() -> Rc<PartRegistry> {
    let mut registry = PartRegistry::new();
    registry
        .register(PartDefinition::new(
            tile_type(),
            |handle, value| Ok(Box::new(Tile::from_json(handle, value)?) as Box<dyn Part>),
            |handle, bytes| {
                let value: Value = serde_json::from_slice(bytes)?;
                Ok(Box::new(Tile::from_json(handle, &value)?) as Box<dyn Part>)
            },
        ))
        .unwrap();
    Rc::new(registry)
}

pub fn add_tile(container: &mut Container, slot: u8, label: &str) -> Option<PartId> {
    let label = label.to_string();
    container.add(tile_type(), |handle| {
        Box::new(Tile {
            handle,
            slot,
            label,
        })
    })
    .unwrap()
}

pub fn authority_container() -> Container {
    Container::new(ContainerConfig::default())
}

pub fn replica(registry: &Rc<PartRegistry>) -> Replica {
    Replica::new(
        Rc::clone(registry),
        SyncConfig::default(),
        ContainerConfig::default(),
    )
}

/// Labels of a container's tiles, in list order.
pub fn labels(container: &Container) -> Vec<String> {
    container
        .parts()
        .map(|p| {
            p.downcast_ref::<Tile>()
                .map(|t| t.label.clone())
                .unwrap_or_else(|| "?".to_string())
        })
        .collect()
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
