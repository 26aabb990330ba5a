//! Multipart cell container.
//!
//! A cell of the host grid can hold several independent parts at once
//! (a slab, a wire, a lever). The [`Container`] owns them and enforces
//! that they don't intrude on each other's space.
//!
//! # Architecture
//!
//! - **Admission**: candidate parts are offered, checked against the
//!   occupied space and vetoable by listeners, then committed.
//! - **Event bus**: per-container publish/subscribe that tolerates
//!   listeners registering, removing and firing from inside callbacks.
//! - **Properties**: values several parts contribute to, combined by a
//!   per-property function and cached.
//! - **Registry**: explicit map from part type id to decoders, used by
//!   persistence and by replicas.
//!
//! # Example
//!
//! ```
//! use multipart_core::{Container, ContainerConfig, Part, PartHandle};
//! use multipart_types::{Cuboid, PartTypeId, Shape};
//!
//! struct Slab(PartHandle);
//!
//! impl Part for Slab {
//!     fn handle(&self) -> &PartHandle {
//!         &self.0
//!     }
//!
//!     fn shape(&self) -> Shape {
//!         Shape::cuboid(Cuboid::new(0.0, 0.0, 0.0, 1.0, 0.5, 1.0))
//!     }
//! }
//!
//! let slab = PartTypeId::new("demo:slab").unwrap();
//! let mut container = Container::new(ContainerConfig::default());
//!
//! assert!(container.add(slab.clone(), |h| Box::new(Slab(h))).unwrap().is_some());
//! // The lower half is taken now.
//! assert!(container.add(slab, |h| Box::new(Slab(h))).unwrap().is_none());
//! ```

mod admission;
pub mod bus;
mod cell;
mod container;
mod context;
mod error;
pub mod event;
mod part;
mod persist;
mod placeholder;
pub mod property;
mod registry;

pub use admission::Rejection;
pub use bus::{EventBus, ListenerFn, ListenerId};
pub use cell::Cell;
pub use container::{
    Container, ContainerChange, ContainerConfig, MAX_WIRE_PARTS, Offer, RemovedPart, Role,
};
pub use context::PartContext;
pub use error::{ContainerError, ContainerResult, DecodeError};
pub use event::{
    ContainerState, DomainEvent, Event, EventKind, ListenerInfo, PartEvent, PartOffered,
    QueryEvent,
};
pub use part::{AttributeList, Part, PartHandle};
pub use persist::{CompoundStore, PARTS_KEY, PersistedContainer, PersistedPart};
pub use placeholder::UnknownPart;
pub use property::{Property, PropertyAggregator, PropertyChange};
pub use registry::{PartDefinition, PartDescriptor, PartRegistry};
