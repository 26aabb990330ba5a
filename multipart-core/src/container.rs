//! The aggregation root of one occupied cell.
//!
//! A container owns the ordered part list (list order is wire index order),
//! caches the union shapes, runs admission control, and owns the event bus
//! and property aggregator through its [`PartContext`]. Every committed
//! mutation bumps a generation counter so stale offers are caught, and
//! queues a [`ContainerChange`] for the sync layer to broadcast.

use crate::admission::{self, Rejection};
use crate::bus::{EventBus, ListenerId};
use crate::context::PartContext;
use crate::error::{ContainerError, ContainerResult};
use crate::event::{ContainerState, Event, EventKind, PartEvent, PartOffered};
use crate::part::{AttributeList, Part, PartHandle};
use crate::property::{Property, PropertyAggregator};
use crate::registry::PartDescriptor;
use multipart_types::{ContainerId, Direction, OwnerKey, PartId, PartTypeId, PropertyId, Shape};
use std::cell::OnceCell;
use std::fmt;
use tracing::{debug, trace};

/// Highest part count addressable by a one-byte wire index.
pub const MAX_WIRE_PARTS: usize = u8::MAX as usize;

/// Configuration for a container.
#[derive(Debug, Clone)]
pub struct ContainerConfig {
    /// Maximum number of parts. Clamped to [`MAX_WIRE_PARTS`].
    pub max_parts: usize,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            max_parts: MAX_WIRE_PARTS,
        }
    }
}

impl ContainerConfig {
    pub fn effective_max_parts(&self) -> usize {
        self.max_parts.min(MAX_WIRE_PARTS)
    }
}

/// Which side of the sync channel a container lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Owns the authoritative list; mutations go through admission.
    Authority,
    /// Mirrors an authority; mutations arrive from the sync channel.
    Replica,
}

/// A mutation the sync layer has to tell replicas about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerChange {
    /// A part was appended to the list.
    Added(PartDescriptor),
    /// The part at this index was removed.
    Removed { index: usize },
    /// Presentation state must be recomputed.
    Redraw,
    /// The last part left; the cell is empty again.
    Destroyed,
}

/// A part that passed admission but is not yet in the list.
///
/// Valid until the next mutation of the container that issued it.
#[must_use = "an offer has no effect until committed"]
pub struct Offer {
    container: ContainerId,
    generation: u64,
    handle: PartHandle,
    part: Box<dyn Part>,
}

impl Offer {
    pub fn handle(&self) -> &PartHandle {
        &self.handle
    }

    pub fn part(&self) -> &(dyn Part + 'static) {
        self.part.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Gives the part back, e.g. to drop it without side effects.
    pub fn into_part(self) -> Box<dyn Part> {
        self.part
    }
}

impl fmt::Debug for Offer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Offer")
            .field("container", &self.container)
            .field("generation", &self.generation)
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}

/// What `remove` hands back.
pub struct RemovedPart {
    pub part: Box<dyn Part>,
    /// Index the part had before it left.
    pub index: usize,
    /// True when this removal emptied the container.
    pub container_destroyed: bool,
}

impl fmt::Debug for RemovedPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemovedPart")
            .field("part", self.part.handle())
            .field("index", &self.index)
            .field("container_destroyed", &self.container_destroyed)
            .finish()
    }
}

struct PartHolder {
    index: usize,
    part: Box<dyn Part>,
}

pub struct Container {
    id: ContainerId,
    role: Role,
    config: ContainerConfig,
    parts: Vec<PartHolder>,
    context: PartContext,
    shape: OnceCell<Shape>,
    collision_shape: OnceCell<Shape>,
    generation: u64,
    ticks: u64,
    changes: Vec<ContainerChange>,
    destroyed: bool,
}

impl Container {
    /// Creates an empty authoritative container.
    pub fn new(config: ContainerConfig) -> Self {
        Self::with_role(config, Role::Authority)
    }

    /// Creates an empty replica container.
    pub fn new_replica(config: ContainerConfig) -> Self {
        Self::with_role(config, Role::Replica)
    }

    fn with_role(config: ContainerConfig, role: Role) -> Self {
        Self {
            id: ContainerId::new(),
            role,
            config,
            parts: Vec::new(),
            context: PartContext::new(),
            shape: OnceCell::new(),
            collision_shape: OnceCell::new(),
            generation: 0,
            ticks: 0,
            changes: Vec::new(),
            destroyed: false,
        }
    }

    pub fn id(&self) -> ContainerId {
        self.id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn config(&self) -> &ContainerConfig {
        &self.config
    }

    /// Bumped by every committed mutation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// True once the last part was removed.
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    // ── Part queries ─────────────────────────────────────────────

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Every part in list order.
    pub fn parts(&self) -> impl Iterator<Item = &(dyn Part + 'static)> {
        self.parts.iter().map(|h| h.part.as_ref())
    }

    pub fn handles(&self) -> Vec<PartHandle> {
        self.parts().map(|p| p.handle().clone()).collect()
    }

    pub fn part_at(&self, index: usize) -> Option<&(dyn Part + 'static)> {
        self.parts.get(index).map(|h| h.part.as_ref())
    }

    pub fn get(&self, id: PartId) -> Option<&(dyn Part + 'static)> {
        self.holder(id).map(|h| h.part.as_ref())
    }

    pub fn contains(&self, id: PartId) -> bool {
        self.holder(id).is_some()
    }

    /// Current wire index of a part.
    pub fn index_of(&self, id: PartId) -> Option<usize> {
        self.holder(id).map(|h| h.index)
    }

    pub fn part<T: Part>(&self, id: PartId) -> Option<&T> {
        self.get(id)?.downcast_ref()
    }

    /// Mutable access. Call [`Container::recalculate_shape`] afterwards if
    /// the part's shape changed.
    pub fn part_mut<T: Part>(&mut self, id: PartId) -> Option<&mut T> {
        self.parts
            .iter_mut()
            .find(|h| h.part.handle().id() == id)?
            .part
            .downcast_mut()
    }

    /// Every part of type `T`, in list order.
    pub fn parts_of<T: Part>(&self) -> impl Iterator<Item = &T> {
        self.parts().filter_map(|p| p.downcast_ref::<T>())
    }

    pub fn first_part<T: Part>(&self) -> Option<&T> {
        self.parts_of::<T>().next()
    }

    pub fn find_parts<P>(&self, mut predicate: P) -> Vec<&(dyn Part + 'static)>
    where
        P: FnMut(&dyn Part) -> bool,
    {
        self.parts().filter(|p| predicate(*p)).collect()
    }

    fn holder(&self, id: PartId) -> Option<&PartHolder> {
        self.parts.iter().find(|h| h.part.handle().id() == id)
    }

    // ── Shapes ───────────────────────────────────────────────────

    /// Union of every part's primary shape.
    pub fn current_shape(&self) -> &Shape {
        self.shape
            .get_or_init(|| Shape::union_all(&self.parts().map(|p| p.shape()).collect::<Vec<_>>()))
    }

    /// Union of every part's collision shape.
    pub fn collision_shape(&self) -> &Shape {
        self.collision_shape.get_or_init(|| {
            Shape::union_all(&self.parts().map(|p| p.collision_shape()).collect::<Vec<_>>())
        })
    }

    /// Union of every part's dynamic shape. Not cached.
    pub fn dynamic_shape(&self, partial_ticks: f32) -> Shape {
        let shapes: Vec<Shape> = self.parts().map(|p| p.dynamic_shape(partial_ticks)).collect();
        Shape::union_all(&shapes)
    }

    /// Drops the cached shapes. Parts call this (through their owner) when
    /// their own shape changes.
    pub fn recalculate_shape(&mut self) {
        self.shape = OnceCell::new();
        self.collision_shape = OnceCell::new();
    }

    // ── Attributes ───────────────────────────────────────────────

    /// Collects attributes from every part, in list order.
    pub fn attributes(&self, side: Option<Direction>) -> AttributeList {
        let mut list = AttributeList::new(side);
        for part in self.parts() {
            part.add_attributes(&mut list);
        }
        list
    }

    /// Obstruction shapes from every part.
    pub fn obstructions(&self, side: Option<Direction>) -> Vec<Shape> {
        self.attributes(side).into_obstructions()
    }

    // ── Events & properties ──────────────────────────────────────

    pub fn context(&self) -> &PartContext {
        &self.context
    }

    pub fn events(&self) -> &EventBus {
        self.context.bus()
    }

    pub fn properties(&self) -> &PropertyAggregator {
        self.context.properties()
    }

    pub fn fire(&self, event: &mut Event) -> bool {
        self.context.fire(event)
    }

    pub fn add_listener<F>(&self, key: OwnerKey, kind: EventKind, callback: F) -> ListenerId
    where
        F: Fn(&mut Event, &PartContext) + 'static,
    {
        self.context.add_listener(key, kind, callback)
    }

    pub fn remove_listeners(&self, key: OwnerKey) -> usize {
        self.context.remove_listeners(key)
    }

    pub fn value<T: Clone + PartialEq + 'static>(&self, property: &Property<T>) -> T {
        self.context.value(property)
    }

    pub fn set_value<T: Clone + PartialEq + 'static>(
        &self,
        key: OwnerKey,
        property: &Property<T>,
        value: T,
    ) {
        self.context.set_value(key, property, value);
    }

    /// Properties whose combined value changed since the last call.
    pub fn take_changed_properties(&self) -> Vec<PropertyId> {
        self.context.take_changed_properties()
    }

    pub fn request_redraw(&self) {
        self.context.request_redraw();
    }

    /// Fires a tick event to every part.
    pub fn tick(&mut self) {
        self.ticks += 1;
        self.context.fire(&mut Event::Tick(self.ticks));
    }

    pub fn on_loaded(&self) {
        self.context
            .fire(&mut Event::ContainerState(ContainerState::Loaded));
    }

    pub fn invalidate(&self) {
        self.context
            .fire(&mut Event::ContainerState(ContainerState::Invalidated));
    }

    pub fn on_unloaded(&self) {
        self.context
            .fire(&mut Event::ContainerState(ContainerState::Unloaded));
    }

    // ── Sync outbox ──────────────────────────────────────────────

    /// Drains queued changes; a pending redraw request comes last.
    pub fn take_changes(&mut self) -> Vec<ContainerChange> {
        let mut changes = std::mem::take(&mut self.changes);
        if self.context.take_redraw() {
            changes.push(ContainerChange::Redraw);
        }
        changes
    }

    /// Descriptors of every part in list order, for a full snapshot.
    pub fn descriptors(&self) -> Vec<PartDescriptor> {
        self.parts().map(|p| p.descriptor()).collect()
    }

    // ── Admission ────────────────────────────────────────────────

    /// Mints a handle for a part about to be built for this container.
    pub fn new_handle(&self, part_type: PartTypeId) -> PartHandle {
        PartHandle::new(PartId::new(), part_type, self.id)
    }

    /// Builds a candidate part and runs admission control on it.
    ///
    /// `None` means rejected; the candidate is dropped and nothing changed
    /// except what offer-event listeners chose to do.
    pub fn offer<F>(&self, part_type: PartTypeId, factory: F) -> Option<Offer>
    where
        F: FnOnce(PartHandle) -> Box<dyn Part>,
    {
        let handle = self.new_handle(part_type);
        let part = factory(handle.clone());
        match self.check_admission(part.as_ref()) {
            Ok(()) => {
                trace!("Offer accepted for {} ({})", handle.id(), handle.part_type());
                Some(Offer {
                    container: self.id,
                    generation: self.generation,
                    handle,
                    part,
                })
            }
            Err(rejection) => {
                debug!("Offer rejected for {} ({}): {}", handle.id(), handle.part_type(), rejection);
                None
            }
        }
    }

    /// Runs admission control on a part built for this container, including
    /// the cancellable offer event, and says why it would be turned away.
    pub fn check_admission(&self, candidate: &dyn Part) -> Result<(), Rejection> {
        if self.parts.len() >= self.config.effective_max_parts() {
            return Err(Rejection::Full);
        }
        admission::evaluate(self.parts(), self.current_shape(), candidate)?;

        let mut event = Event::PartOffered(PartOffered::new(PartEvent {
            id: candidate.handle().id(),
            part_type: candidate.handle().part_type().clone(),
            index: self.parts.len(),
            shape: candidate.shape(),
        }));
        self.context.fire(&mut event);
        match event {
            Event::PartOffered(offered) if offered.is_vetoed() => Err(Rejection::Vetoed),
            _ => Ok(()),
        }
    }

    /// Appends an accepted offer to the list.
    pub fn commit(&mut self, offer: Offer) -> ContainerResult<PartId> {
        self.require_role(Role::Authority)?;
        if offer.container != self.id {
            return Err(ContainerError::WrongContainer {
                expected: offer.container,
                actual: self.id,
            });
        }
        if offer.generation != self.generation {
            return Err(ContainerError::StaleOffer {
                offered: offer.generation,
                current: self.generation,
            });
        }
        if offer.part.handle() != &offer.handle {
            return Err(ContainerError::HandleMismatch {
                part: offer.handle.id(),
            });
        }
        Ok(self.append(offer.part, true))
    }

    /// Offer and commit in one step.
    ///
    /// `Ok(None)` is an admission rejection. Calling this on a replica is a
    /// contract error and fails before any offer event fires.
    pub fn add<F>(&mut self, part_type: PartTypeId, factory: F) -> ContainerResult<Option<PartId>>
    where
        F: FnOnce(PartHandle) -> Box<dyn Part>,
    {
        self.require_role(Role::Authority)?;
        match self.offer(part_type, factory) {
            Some(offer) => self.commit(offer).map(Some),
            None => Ok(None),
        }
    }

    fn append(&mut self, part: Box<dyn Part>, broadcast: bool) -> PartId {
        let index = self.parts.len();
        let id = part.handle().id();
        self.parts.push(PartHolder { index, part });
        self.generation += 1;
        self.destroyed = false;

        let cx = &self.context;
        let holder = &mut self.parts[index];
        holder.part.on_added(cx);
        self.recalculate_shape();

        let info = self.part_event(index);
        let descriptor = self.parts[index].part.descriptor();
        self.context.fire(&mut Event::PartAdded(info));
        if broadcast {
            self.changes.push(ContainerChange::Added(descriptor));
        }
        debug!("Added part {} at index {} (container {})", id, index, self.id);
        id
    }

    fn part_event(&self, index: usize) -> PartEvent {
        let part = self.parts[index].part.as_ref();
        PartEvent {
            id: part.handle().id(),
            part_type: part.handle().part_type().clone(),
            index,
            shape: part.shape(),
        }
    }

    // ── Removal ──────────────────────────────────────────────────

    /// Removes a part by identity. `None` when it is not in this container.
    pub fn remove(&mut self, id: PartId) -> Option<RemovedPart> {
        let index = self.parts.iter().position(|h| h.part.handle().id() == id)?;
        Some(self.remove_index(index, true))
    }

    fn remove_index(&mut self, index: usize, broadcast: bool) -> RemovedPart {
        let info = self.part_event(index);
        self.context.fire(&mut Event::PartPreRemoved(info.clone()));

        let mut holder = self.parts.remove(index);
        for (i, h) in self.parts.iter_mut().enumerate().skip(index) {
            h.index = i;
        }
        holder.part.on_removed(&self.context);
        let key = holder.part.handle().key();
        self.context.remove_listeners(key);
        self.context.clear_values(key);
        self.generation += 1;
        self.recalculate_shape();

        self.context.fire(&mut Event::PartRemoved(info));

        let container_destroyed = self.parts.is_empty();
        if container_destroyed {
            self.destroyed = true;
            if broadcast {
                self.changes.push(ContainerChange::Destroyed);
            }
            debug!("Container {} destroyed: last part {} removed", self.id, holder.part.id());
        } else {
            if broadcast {
                self.changes.push(ContainerChange::Removed { index });
            }
            debug!("Removed part {} from index {} (container {})", holder.part.id(), index, self.id);
        }

        RemovedPart {
            part: holder.part,
            index,
            container_destroyed,
        }
    }

    // ── Replica side ─────────────────────────────────────────────

    /// Replaces the whole list with `parts`, in order. Replica only.
    pub fn install(&mut self, parts: Vec<Box<dyn Part>>) -> ContainerResult<()> {
        self.require_role(Role::Replica)?;
        if parts.len() > MAX_WIRE_PARTS {
            return Err(ContainerError::TooManyParts {
                count: parts.len(),
                max: MAX_WIRE_PARTS,
            });
        }
        for part in &parts {
            self.require_own(part.as_ref())?;
        }
        while !self.parts.is_empty() {
            self.remove_index(self.parts.len() - 1, false);
        }
        for part in parts {
            self.append(part, false);
        }
        Ok(())
    }

    /// Appends a part decoded from an add message. Replica only.
    pub fn append_remote(&mut self, part: Box<dyn Part>) -> ContainerResult<PartId> {
        self.require_role(Role::Replica)?;
        self.require_own(part.as_ref())?;
        if self.parts.len() >= MAX_WIRE_PARTS {
            return Err(ContainerError::TooManyParts {
                count: self.parts.len() + 1,
                max: MAX_WIRE_PARTS,
            });
        }
        Ok(self.append(part, false))
    }

    /// Removes the part at a wire index. Replica only.
    pub fn remove_remote(&mut self, index: usize) -> ContainerResult<RemovedPart> {
        self.require_role(Role::Replica)?;
        if index >= self.parts.len() {
            return Err(ContainerError::IndexOutOfRange {
                index,
                len: self.parts.len(),
            });
        }
        Ok(self.remove_index(index, false))
    }

    fn require_role(&self, expected: Role) -> ContainerResult<()> {
        if self.role == expected {
            Ok(())
        } else {
            Err(ContainerError::RoleMismatch {
                expected,
                actual: self.role,
            })
        }
    }

    fn require_own(&self, part: &dyn Part) -> ContainerResult<()> {
        let owner = part.handle().container();
        if owner == self.id {
            Ok(())
        } else {
            Err(ContainerError::WrongContainer {
                expected: owner,
                actual: self.id,
            })
        }
    }

    // ── Persistence plumbing ─────────────────────────────────────

    pub(crate) fn push_loaded(&mut self, part: Box<dyn Part>) {
        self.append(part, false);
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("id", &self.id)
            .field("role", &self.role)
            .field("parts", &self.handles())
            .field("generation", &self.generation)
            .field("destroyed", &self.destroyed)
            .finish()
    }
}
