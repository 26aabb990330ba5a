//! Durable form of a container.
//!
//! A container persists as an ordered list of `{type, id, payload}` entries
//! stored under one key of a JSON compound. Loading resolves each entry
//! through a [`PartRegistry`]; entries nobody can resolve become
//! placeholders, so a save after a load loses nothing.

use crate::container::{Container, ContainerConfig};
use crate::error::{ContainerError, ContainerResult};
use crate::registry::PartRegistry;
use multipart_types::PartId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

/// Compound key a container is stored under.
pub const PARTS_KEY: &str = "parts";

/// One persisted part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedPart {
    /// Type id as written, kept verbatim even when it no longer parses.
    #[serde(rename = "type")]
    pub part_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<PartId>,
    #[serde(default)]
    pub payload: Value,
}

/// Every part of a container, in list order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedContainer {
    pub parts: Vec<PersistedPart>,
}

impl PersistedContainer {
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

/// Storage that holds named JSON compounds.
pub trait CompoundStore {
    fn get_compound(&self, key: &str) -> Option<&Value>;
    fn put_compound(&mut self, key: &str, value: Value);
}

impl CompoundStore for Map<String, Value> {
    fn get_compound(&self, key: &str) -> Option<&Value> {
        self.get(key)
    }

    fn put_compound(&mut self, key: &str, value: Value) {
        self.insert(key.to_string(), value);
    }
}

impl Container {
    /// Persisted form of every part, in list order.
    pub fn save(&self) -> PersistedContainer {
        PersistedContainer {
            parts: self.parts().map(|p| p.save()).collect(),
        }
    }

    /// Rebuilds an authoritative container from its persisted form.
    ///
    /// Parts are installed as-is without admission control: the saved
    /// list was admitted when it was built.
    pub fn load(
        registry: &PartRegistry,
        config: ContainerConfig,
        persisted: &PersistedContainer,
    ) -> ContainerResult<Container> {
        let max = config.effective_max_parts();
        if persisted.parts.len() > max {
            return Err(ContainerError::TooManyParts {
                count: persisted.parts.len(),
                max,
            });
        }

        let mut container = Container::new(config);
        for entry in &persisted.parts {
            let part = registry.load(container.id(), entry);
            container.push_loaded(part);
        }
        // Loading is not a change replicas need to hear about.
        container.take_changes();
        debug!("Loaded container {} with {} parts", container.id(), container.len());
        Ok(container)
    }

    /// Stores the container under [`PARTS_KEY`].
    pub fn write_to(&self, store: &mut impl CompoundStore) -> ContainerResult<()> {
        let value = serde_json::to_value(self.save())?;
        store.put_compound(PARTS_KEY, value);
        Ok(())
    }

    /// Reads a container back from [`PARTS_KEY`]. `None` when the store has
    /// no entry or the entry lists no parts.
    pub fn read_from(
        store: &impl CompoundStore,
        registry: &PartRegistry,
        config: ContainerConfig,
    ) -> ContainerResult<Option<Container>> {
        let Some(value) = store.get_compound(PARTS_KEY) else {
            return Ok(None);
        };
        let persisted = PersistedContainer::deserialize(value)?;
        if persisted.is_empty() {
            return Ok(None);
        }
        Container::load(registry, config, &persisted).map(Some)
    }
}
