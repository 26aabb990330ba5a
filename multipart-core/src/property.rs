//! Named values that several parts contribute to at once.
//!
//! Each [`Property`] has a default and a combine function. Every writer key
//! holds at most one value per property; the aggregator caches the combined
//! value and reports when it moves. Writing the default clears a writer's
//! contribution, so "no writers" and "everyone wrote the default" are the
//! same state.

use multipart_types::{OwnerKey, PropertyId};
use std::any::Any;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

type CombineFn<T> = dyn Fn(&[T]) -> T;

struct PropertyInner<T> {
    id: PropertyId,
    name: String,
    default: T,
    combine: Box<CombineFn<T>>,
}

/// Definition of a combinable property. Cloning keeps the identity.
pub struct Property<T> {
    inner: Rc<PropertyInner<T>>,
}

impl<T: Clone + PartialEq + 'static> Property<T> {
    /// `combine` is only called with two or more values.
    pub fn new<F>(name: impl Into<String>, default: T, combine: F) -> Self
    where
        F: Fn(&[T]) -> T + 'static,
    {
        Self {
            inner: Rc::new(PropertyInner {
                id: PropertyId::new(),
                name: name.into(),
                default,
                combine: Box::new(combine),
            }),
        }
    }

    pub fn id(&self) -> PropertyId {
        self.inner.id
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn default_value(&self) -> &T {
        &self.inner.default
    }

    pub fn combine(&self, values: &[T]) -> T {
        (self.inner.combine)(values)
    }
}

impl<T: Ord + Clone + 'static> Property<T> {
    /// Combined value is the largest contribution.
    pub fn max(name: impl Into<String>, default: T) -> Self {
        let fallback = default.clone();
        Self::new(name, default, move |values: &[T]| {
            values.iter().max().cloned().unwrap_or_else(|| fallback.clone())
        })
    }
}

impl Property<bool> {
    /// Combined value is true when any writer says true.
    pub fn any(name: impl Into<String>) -> Self {
        Self::new(name, false, |values: &[bool]| values.iter().any(|v| *v))
    }
}

impl<T> Clone for Property<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .finish_non_exhaustive()
    }
}

/// A combined value moved from `old` to `new`.
#[derive(Clone)]
pub struct PropertyChange {
    property: PropertyId,
    name: String,
    old: Rc<dyn Any>,
    new: Rc<dyn Any>,
}

impl PropertyChange {
    fn new<T: 'static>(property: &PropertyInner<T>, old: T, new: T) -> Self {
        Self {
            property: property.id,
            name: property.name.clone(),
            old: Rc::new(old),
            new: Rc::new(new),
        }
    }

    pub fn property(&self) -> PropertyId {
        self.property
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is<T>(&self, property: &Property<T>) -> bool {
        self.property == property.inner.id
    }

    /// Typed `(old, new)` values, if this change is for `property`.
    pub fn values<'a, T: 'static>(&'a self, property: &Property<T>) -> Option<(&'a T, &'a T)> {
        if !self.is(property) {
            return None;
        }
        Some((self.old.downcast_ref()?, self.new.downcast_ref()?))
    }
}

impl fmt::Debug for PropertyChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyChange")
            .field("property", &self.property)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

trait Slot {
    fn clear(&mut self, key: OwnerKey) -> Option<PropertyChange>;
    fn writers(&self) -> usize;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

struct TypedSlot<T> {
    property: Property<T>,
    /// Insertion order is the order `combine` sees.
    values: Vec<(OwnerKey, T)>,
    combined: Option<T>,
}

impl<T: Clone + PartialEq + 'static> TypedSlot<T> {
    fn new(property: Property<T>) -> Self {
        Self {
            property,
            values: Vec::new(),
            combined: None,
        }
    }

    fn current(&self) -> T {
        self.combined
            .clone()
            .unwrap_or_else(|| self.property.default_value().clone())
    }

    fn set(&mut self, key: OwnerKey, value: T) -> Option<PropertyChange> {
        let default = self.property.default_value();
        let position = self.values.iter().position(|(k, _)| *k == key);
        let previous = position.map_or(default, |i| &self.values[i].1);
        if *previous == value {
            return None;
        }

        match position {
            Some(i) if value == *default => {
                self.values.remove(i);
            }
            Some(i) => self.values[i].1 = value,
            None => self.values.push((key, value)),
        }
        self.recombine()
    }

    fn recombine(&mut self) -> Option<PropertyChange> {
        let old = self.current();
        self.combined = match self.values.as_slice() {
            [] => None,
            [(_, only)] => Some(only.clone()),
            many => {
                let values: Vec<T> = many.iter().map(|(_, v)| v.clone()).collect();
                Some(self.property.combine(&values))
            }
        };
        let new = self.current();
        (old != new).then(|| PropertyChange::new(&self.property.inner, old, new))
    }
}

impl<T: Clone + PartialEq + 'static> Slot for TypedSlot<T> {
    fn clear(&mut self, key: OwnerKey) -> Option<PropertyChange> {
        let index = self.values.iter().position(|(k, _)| *k == key)?;
        self.values.remove(index);
        self.recombine()
    }

    fn writers(&self) -> usize {
        self.values.len()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Per-container store of property contributions.
#[derive(Default)]
pub struct PropertyAggregator {
    slots: RefCell<BTreeMap<PropertyId, Box<dyn Slot>>>,
}

impl PropertyAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached combined value, or the default when nobody contributes.
    pub fn value<T: Clone + PartialEq + 'static>(&self, property: &Property<T>) -> T {
        self.slots
            .borrow()
            .get(&property.id())
            .and_then(|slot| slot.as_any().downcast_ref::<TypedSlot<T>>())
            .map_or_else(|| property.default_value().clone(), TypedSlot::current)
    }

    /// Number of writers currently contributing to `property`.
    pub fn writer_count<T>(&self, property: &Property<T>) -> usize {
        self.slots
            .borrow()
            .get(&property.inner.id)
            .map_or(0, |slot| slot.writers())
    }

    /// Records `key`'s value. Returns the change when the combined value
    /// moved; returns `None` without recombining when `key` already held
    /// `value`.
    pub fn set_value<T: Clone + PartialEq + 'static>(
        &self,
        key: OwnerKey,
        property: &Property<T>,
        value: T,
    ) -> Option<PropertyChange> {
        let mut slots = self.slots.borrow_mut();
        let slot = slots
            .entry(property.id())
            .or_insert_with(|| Box::new(TypedSlot::new(property.clone())));
        slot.as_any_mut()
            .downcast_mut::<TypedSlot<T>>()?
            .set(key, value)
    }

    /// Removes `key` from every property, returning the changes in
    /// property-creation order.
    pub fn clear_values(&self, key: OwnerKey) -> Vec<PropertyChange> {
        self.slots
            .borrow_mut()
            .values_mut()
            .filter_map(|slot| slot.clear(key))
            .collect()
    }
}

impl fmt::Debug for PropertyAggregator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyAggregator")
            .field("properties", &self.slots.borrow().len())
            .finish()
    }
}
