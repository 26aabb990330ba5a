//! A grid slot that may hold a container.

use crate::container::{Container, ContainerConfig, RemovedPart};
use crate::error::ContainerResult;
use crate::part::{Part, PartHandle};
use multipart_types::{PartId, PartTypeId};
use tracing::debug;

/// One cell of the host grid.
///
/// A container only exists while it holds parts: placing the first part
/// creates it, removing the last part turns the cell back into `Empty`.
#[derive(Debug, Default)]
pub enum Cell {
    #[default]
    Empty,
    Occupied(Container),
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    pub fn container(&self) -> Option<&Container> {
        match self {
            Cell::Empty => None,
            Cell::Occupied(container) => Some(container),
        }
    }

    pub fn container_mut(&mut self) -> Option<&mut Container> {
        match self {
            Cell::Empty => None,
            Cell::Occupied(container) => Some(container),
        }
    }

    /// Offers a part to the cell's container, creating one with `config`
    /// if the cell is empty. Rejection (`Ok(None)`) leaves the cell as it was.
    pub fn place<F>(
        &mut self,
        config: ContainerConfig,
        part_type: PartTypeId,
        factory: F,
    ) -> ContainerResult<Option<PartId>>
    where
        F: FnOnce(PartHandle) -> Box<dyn Part>,
    {
        match self {
            Cell::Occupied(container) => container.add(part_type, factory),
            Cell::Empty => {
                let mut container = Container::new(config);
                let Some(id) = container.add(part_type, factory)? else {
                    return Ok(None);
                };
                debug!("Cell occupied by container {}", container.id());
                *self = Cell::Occupied(container);
                Ok(Some(id))
            }
        }
    }

    /// Removes a part. The cell becomes empty when it was the last one.
    pub fn remove(&mut self, id: PartId) -> Option<RemovedPart> {
        let removed = self.container_mut()?.remove(id)?;
        if removed.container_destroyed {
            *self = Cell::Empty;
        }
        Some(removed)
    }

    /// Takes the container out, leaving the cell empty.
    pub fn take(&mut self) -> Option<Container> {
        match std::mem::take(self) {
            Cell::Empty => None,
            Cell::Occupied(container) => Some(container),
        }
    }
}
