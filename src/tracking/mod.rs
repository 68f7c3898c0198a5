//! # Identity Map & Change Tracker
//!
//! Tracked objects live in an arena owned by the `ChangeTracker` and are
//! addressed by `ObjectId`; two handles refer to the same instance exactly
//! when their ids are equal. A second index keyed by
//! (identity scope, key value) realizes the identity map: at most one live
//! instance per key within a unit of work.
//!
//! ```text
//! (absent)   --track(Added)-->     Added     --accept--> Unchanged
//! (absent)   --track(Unchanged)--> Unchanged
//! Unchanged  --Modified-->         Modified  --accept--> Unchanged
//! any        --Deleted-->          Deleted   --accept--> (removed)
//! any        --Detached-->         (removed)
//! ```

pub mod errors;


use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

pub use errors::TrackingError;

use crate::model::{EntityId, EntityModel};
use crate::value::{KeyValue, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(usize);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityState {
    Unchanged,
    Added,
    Modified,
    Deleted,
    Detached,
}

static NULL: Value = Value::Null;

/// A materialized or application-created instance of a concrete type.
///
/// Scalars are held by field name; navigations hold handles to other
/// tracked objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityObject {
    entity: EntityId,
    values: BTreeMap<String, Value>,
    references: BTreeMap<String, ObjectId>,
    collections: BTreeMap<String, Vec<ObjectId>>,
}

impl EntityObject {
    pub fn new(entity: EntityId) -> Self {
        Self {
            entity,
            values: BTreeMap::new(),
            references: BTreeMap::new(),
            collections: BTreeMap::new(),
        }
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(field, value);
        self
    }

    /// Runtime (concrete) type
    pub fn entity(&self) -> EntityId {
        self.entity
    }

    /// Scalar value, `Null` when the field was never set
    pub fn get(&self, field: &str) -> &Value {
        self.values.get(field).unwrap_or(&NULL)
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(field.into(), value.into());
    }

    pub fn values(&self) -> &BTreeMap<String, Value> {
        &self.values
    }

    pub fn reference(&self, navigation: &str) -> Option<ObjectId> {
        self.references.get(navigation).copied()
    }

    pub fn set_reference(&mut self, navigation: impl Into<String>, target: Option<ObjectId>) {
        let navigation = navigation.into();
        match target {
            Some(target) => {
                self.references.insert(navigation, target);
            }
            None => {
                self.references.remove(&navigation);
            }
        }
    }

    pub fn references(&self) -> &BTreeMap<String, ObjectId> {
        &self.references
    }

    /// Members of a collection navigation; empty when never loaded
    pub fn collection(&self, navigation: &str) -> &[ObjectId] {
        self.collections
            .get(navigation)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Whether the collection has been populated, even if empty
    pub fn is_loaded(&self, navigation: &str) -> bool {
        self.collections.contains_key(navigation)
    }

    /// Append unless already present. Returns whether it was added.
    pub fn add_to_collection(&mut self, navigation: impl Into<String>, member: ObjectId) -> bool {
        let members = self.collections.entry(navigation.into()).or_default();
        if members.contains(&member) {
            return false;
        }
        members.push(member);
        true
    }

    pub fn remove_from_collection(&mut self, navigation: &str, member: ObjectId) {
        if let Some(members) = self.collections.get_mut(navigation) {
            members.retain(|m| *m != member);
        }
    }

    /// Mark a collection as loaded without adding members
    pub fn ensure_collection(&mut self, navigation: impl Into<String>) {
        self.collections.entry(navigation.into()).or_default();
    }

    pub fn collections(&self) -> &BTreeMap<String, Vec<ObjectId>> {
        &self.collections
    }
}

#[derive(Debug, Clone)]
struct Entry {
    object: EntityObject,
    state: EntityState,
    /// Scalar values as last read from or written to storage
    original: BTreeMap<String, Value>,
}

type IdentityKey = (EntityId, KeyValue);

/// Identity map and change tracker of one unit of work.
///
/// Entries live in an arena indexed by `ObjectId`. Detaching or accepting a
/// delete leaves an empty slot that is never reused, so an `ObjectId` cannot
/// come to name a different object later; the arena grows with the number of
/// objects ever tracked and is released with the unit of work.
#[derive(Debug, Clone)]
pub struct ChangeTracker {
    model: Arc<EntityModel>,
    entries: Vec<Option<Entry>>,
    identity: HashMap<IdentityKey, ObjectId>,
}

impl ChangeTracker {
    pub fn new(model: Arc<EntityModel>) -> Self {
        Self {
            model,
            entries: Vec::new(),
            identity: HashMap::new(),
        }
    }

    pub fn model(&self) -> &Arc<EntityModel> {
        &self.model
    }

    /// Key value of an object, `None` while it has none (pending insert)
    pub fn key_of(&self, object: &EntityObject) -> Option<KeyValue> {
        let key = &self.model.entity(object.entity).key;
        KeyValue::from_value(object.get(&key.name))
    }

    fn identity_key(&self, object: &EntityObject) -> Option<IdentityKey> {
        self.key_of(object)
            .map(|key| (self.model.identity_scope(object.entity), key))
    }

    fn entry(&self, id: ObjectId) -> Result<&Entry, TrackingError> {
        self.entries
            .get(id.0)
            .and_then(Option::as_ref)
            .ok_or(TrackingError::UnknownObject(id))
    }

    fn entry_mut(&mut self, id: ObjectId) -> Result<&mut Entry, TrackingError> {
        self.entries
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(TrackingError::UnknownObject(id))
    }

    /// Start tracking an object as `Added` or `Unchanged`.
    ///
    /// When an instance with the same key is already tracked, that instance
    /// wins: its id is returned and `object` is dropped.
    pub fn track(
        &mut self,
        object: EntityObject,
        state: EntityState,
    ) -> Result<ObjectId, TrackingError> {
        let id = ObjectId(self.entries.len());
        if !matches!(state, EntityState::Added | EntityState::Unchanged) {
            return Err(TrackingError::InvalidTransition {
                object: id,
                from: EntityState::Detached,
                to: state,
            });
        }
        let descriptor = self.model.entity(object.entity);
        if descriptor.is_abstract {
            return Err(TrackingError::AbstractEntity {
                entity: descriptor.name.clone(),
            });
        }

        let identity_key = self.identity_key(&object);
        if let Some(existing) = identity_key.as_ref().and_then(|k| self.identity.get(k)) {
            log::debug!(
                "{} `{}` already tracked as {}",
                descriptor.name,
                identity_key.as_ref().map(|(_, k)| k.to_string()).unwrap_or_default(),
                existing
            );
            return Ok(*existing);
        }

        log::debug!("Tracking {} {} as {:?}", descriptor.name, id, state);
        if let Some(key) = identity_key {
            self.identity.insert(key, id);
        }
        let original = if state == EntityState::Unchanged {
            object.values.clone()
        } else {
            BTreeMap::new()
        };
        self.entries.push(Some(Entry {
            object,
            state,
            original,
        }));
        Ok(id)
    }

    /// Tracked instance of `entity` (or a type sharing its key space) with
    /// the given key
    pub fn find(&self, entity: EntityId, key: &KeyValue) -> Option<ObjectId> {
        let scope = self.model.identity_scope(entity);
        let id = *self.identity.get(&(scope, key.clone()))?;
        // a key space shared by a hierarchy can hold a sibling type
        let object = self.get(id)?;
        self.model
            .is_same_or_descendant(object.entity, entity)
            .then_some(id)
    }

    pub fn get(&self, id: ObjectId) -> Option<&EntityObject> {
        self.entry(id).ok().map(|e| &e.object)
    }

    /// Mutable access. State is not changed; call `detect_changes` or mark
    /// the object `Modified` explicitly.
    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut EntityObject> {
        self.entry_mut(id).ok().map(|e| &mut e.object)
    }

    /// `Detached` for objects this tracker does not hold
    pub fn state(&self, id: ObjectId) -> EntityState {
        self.entry(id)
            .map(|e| e.state)
            .unwrap_or(EntityState::Detached)
    }

    pub fn original_values(&self, id: ObjectId) -> Option<&BTreeMap<String, Value>> {
        self.entry(id).ok().map(|e| &e.original)
    }

    pub fn set_state(&mut self, id: ObjectId, state: EntityState) -> Result<(), TrackingError> {
        let current = self.entry(id)?.state;
        let invalid = TrackingError::InvalidTransition {
            object: id,
            from: current,
            to: state,
        };
        match (current, state) {
            (_, EntityState::Detached) => {
                self.detach(id)?;
            }
            // never written, so there is nothing to delete
            (EntityState::Added, EntityState::Deleted) => {
                self.detach(id)?;
            }
            (_, EntityState::Deleted) => self.entry_mut(id)?.state = EntityState::Deleted,
            (EntityState::Added, EntityState::Modified | EntityState::Added) => {}
            (EntityState::Unchanged | EntityState::Modified, EntityState::Modified) => {
                self.entry_mut(id)?.state = EntityState::Modified;
            }
            (EntityState::Modified, EntityState::Unchanged) => {
                let entry = self.entry_mut(id)?;
                entry.original = entry.object.values.clone();
                entry.state = EntityState::Unchanged;
            }
            (EntityState::Unchanged, EntityState::Unchanged) => {}
            _ => return Err(invalid),
        }
        log::debug!("{} {:?} -> {:?}", id, current, state);
        Ok(())
    }

    /// Stop tracking an object and hand it back
    pub fn detach(&mut self, id: ObjectId) -> Result<EntityObject, TrackingError> {
        let entry = self
            .entries
            .get_mut(id.0)
            .and_then(Option::take)
            .ok_or(TrackingError::UnknownObject(id))?;
        if let Some(key) = self.identity_key(&entry.object) {
            if self.identity.get(&key) == Some(&id) {
                self.identity.remove(&key);
            }
        }
        Ok(entry.object)
    }

    pub fn len(&self) -> usize {
        self.entries.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn entries(&self) -> impl Iterator<Item = (ObjectId, EntityState, &EntityObject)> {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(i, e)| e.as_ref().map(|e| (ObjectId(i), e.state, &e.object)))
    }

    /// Objects with pending writes, in tracking order
    pub fn pending(&self) -> Vec<ObjectId> {
        self.entries()
            .filter(|(_, state, _)| {
                matches!(
                    state,
                    EntityState::Added | EntityState::Modified | EntityState::Deleted
                )
            })
            .map(|(id, _, _)| id)
            .collect()
    }

    /// `Unchanged` objects whose scalars differ from their snapshot, without
    /// changing their state
    pub fn changed(&self) -> Vec<ObjectId> {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(i, e)| e.as_ref().map(|e| (ObjectId(i), e)))
            .filter(|(_, e)| e.state == EntityState::Unchanged && differs(&e.object.values, &e.original))
            .map(|(id, _)| id)
            .collect()
    }

    /// Flip `Unchanged` objects whose scalars differ from their snapshot to
    /// `Modified`. Returns how many changed.
    pub fn detect_changes(&mut self) -> usize {
        let mut changed = 0;
        for entry in self.entries.iter_mut().flatten() {
            if entry.state == EntityState::Unchanged && differs(&entry.object.values, &entry.original)
            {
                entry.state = EntityState::Modified;
                changed += 1;
            }
        }
        if changed > 0 {
            log::debug!("Detected {} modified object(s)", changed);
        }
        changed
    }

    /// Commit the in-memory side of a successful write-back: deleted
    /// objects are dropped, everything else becomes `Unchanged`.
    pub fn accept_all_changes(&mut self) {
        let mut deleted = Vec::new();
        for (index, slot) in self.entries.iter_mut().enumerate() {
            let Some(entry) = slot else { continue };
            match entry.state {
                EntityState::Deleted => deleted.push(ObjectId(index)),
                EntityState::Added | EntityState::Modified => {
                    entry.original = entry.object.values.clone();
                    entry.state = EntityState::Unchanged;
                }
                EntityState::Unchanged | EntityState::Detached => {}
            }
        }
        for id in deleted {
            if let Ok(object) = self.detach(id) {
                self.forget_links(id, &object);
            }
        }

        // objects added without a key received one during the write-back
        let unindexed: Vec<(IdentityKey, ObjectId)> = self
            .entries()
            .filter_map(|(id, _, object)| self.identity_key(object).map(|key| (key, id)))
            .filter(|(key, _)| !self.identity.contains_key(key))
            .collect();
        self.identity.extend(unindexed);
    }

    /// Remove dangling handles to a dropped object
    fn forget_links(&mut self, id: ObjectId, object: &EntityObject) {
        let related: Vec<ObjectId> = object
            .references
            .values()
            .copied()
            .chain(object.collections.values().flatten().copied())
            .collect();
        for other in related {
            if let Some(entry) = self.entries.get_mut(other.0).and_then(Option::as_mut) {
                entry.object.references.retain(|_, target| *target != id);
                for members in entry.object.collections.values_mut() {
                    members.retain(|m| *m != id);
                }
            }
        }
    }
}

fn differs(current: &BTreeMap<String, Value>, original: &BTreeMap<String, Value>) -> bool {
    current
        .keys()
        .chain(original.keys())
        .any(|field| current.get(field).unwrap_or(&NULL) != original.get(field).unwrap_or(&NULL))
}
