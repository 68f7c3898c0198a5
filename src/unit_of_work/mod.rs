//! # Unit of Work
//!
//! Ties the generator, the storage connection and one change tracker
//! together. Reads compile a `QuerySpec`, run it and materialize the rows
//! into the tracker. `save_changes` writes every pending insert, update and
//! delete inside one transaction and only touches the tracker once that
//! transaction has committed, so a failed write-back can simply be retried.

pub mod errors;


use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

pub use errors::OrmError;

use crate::config::EngineConfig;
use crate::materializer::Materializer;
use crate::model::{Cardinality, EntityModel};
use crate::query::{IncludePath, QuerySpec};
use crate::sql_generator::{SqlGenerator, WriteKind, WriteStatement};
use crate::storage::StorageConnection;
use crate::tracking::{ChangeTracker, EntityObject, EntityState, ObjectId, TrackingError};
use crate::value::{KeyValue, Value};

#[cfg(feature = "sqlite")]
use crate::storage::SqliteConnection;

/// Foreign key on an object whose value comes from another object's key
type ForeignKeyLinks = HashMap<ObjectId, Vec<(String, ObjectId)>>;

/// Field values to apply to tracked objects once the transaction commits
type Assignments = Vec<(ObjectId, BTreeMap<String, Value>)>;

pub struct UnitOfWork<C: StorageConnection> {
    generator: SqlGenerator,
    connection: C,
    tracker: ChangeTracker,
}

#[cfg(feature = "sqlite")]
impl UnitOfWork<SqliteConnection> {
    /// Open `config.database_path` with the bundled SQLite engine
    pub fn open(model: Arc<EntityModel>, config: &EngineConfig) -> Result<Self, OrmError> {
        let connection = if config.database_path == ":memory:" {
            SqliteConnection::open_in_memory()?
        } else {
            SqliteConnection::open(&config.database_path)?
        };
        Ok(Self::from_config(model, config, connection))
    }
}

impl<C: StorageConnection> UnitOfWork<C> {
    pub fn new(generator: SqlGenerator, connection: C) -> Self {
        let tracker = ChangeTracker::new(generator.model().clone());
        Self {
            generator,
            connection,
            tracker,
        }
    }

    pub fn from_config(model: Arc<EntityModel>, config: &EngineConfig, connection: C) -> Self {
        Self::new(SqlGenerator::from_config(model, config), connection)
    }

    pub fn model(&self) -> &Arc<EntityModel> {
        self.generator.model()
    }

    pub fn generator(&self) -> &SqlGenerator {
        &self.generator
    }

    pub fn tracker(&self) -> &ChangeTracker {
        &self.tracker
    }

    pub fn connection_mut(&mut self) -> &mut C {
        &mut self.connection
    }

    /// Create every mapped table that does not exist yet
    pub fn create_schema(&mut self) -> Result<(), OrmError> {
        for sql in self.generator.create_schema() {
            self.connection.execute(&sql, &BTreeMap::new())?;
        }
        Ok(())
    }

    /// Run a query and return the tracked root instances
    pub fn query(&mut self, spec: &QuerySpec) -> Result<Vec<ObjectId>, OrmError> {
        let compiled = self.generator.select(spec)?;
        let mut cursor = self.connection.query(&compiled.sql, &compiled.params)?;
        let model = self.generator.model().clone();
        let objects = Materializer::new(&model, &compiled.plan)
            .materialize(cursor.as_mut(), &mut self.tracker)?;
        Ok(objects)
    }

    /// Instance with the given key. Served from the identity map when no
    /// navigations need loading.
    pub fn find(
        &mut self,
        entity: &str,
        key: &KeyValue,
        includes: &[IncludePath],
    ) -> Result<Option<ObjectId>, OrmError> {
        let target = self.model().require(entity)?.id;
        if includes.is_empty() {
            if let Some(id) = self.tracker.find(target, key) {
                return Ok(Some(id));
            }
        }
        let compiled = self.generator.select_by_key(entity, key, includes)?;
        let mut cursor = self.connection.query(&compiled.sql, &compiled.params)?;
        let model = self.generator.model().clone();
        let objects = Materializer::new(&model, &compiled.plan)
            .materialize(cursor.as_mut(), &mut self.tracker)?;
        Ok(objects.into_iter().next())
    }

    /// Track a new object for insertion
    pub fn add(&mut self, object: EntityObject) -> Result<ObjectId, OrmError> {
        Ok(self.tracker.track(object, EntityState::Added)?)
    }

    /// Track an object that already exists in storage
    pub fn attach(&mut self, object: EntityObject) -> Result<ObjectId, OrmError> {
        Ok(self.tracker.track(object, EntityState::Unchanged)?)
    }

    pub fn update(&mut self, id: ObjectId) -> Result<(), OrmError> {
        Ok(self.tracker.set_state(id, EntityState::Modified)?)
    }

    pub fn remove(&mut self, id: ObjectId) -> Result<(), OrmError> {
        Ok(self.tracker.set_state(id, EntityState::Deleted)?)
    }

    pub fn detach(&mut self, id: ObjectId) -> Result<EntityObject, OrmError> {
        Ok(self.tracker.detach(id)?)
    }

    pub fn get(&self, id: ObjectId) -> Option<&EntityObject> {
        self.tracker.get(id)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut EntityObject> {
        self.tracker.get_mut(id)
    }

    pub fn state(&self, id: ObjectId) -> EntityState {
        self.tracker.state(id)
    }

    pub fn detect_changes(&mut self) -> usize {
        self.tracker.detect_changes()
    }

    /// Write every pending change in one transaction.
    ///
    /// Returns the number of objects written. On failure the transaction is
    /// rolled back and the tracker is left exactly as it was.
    pub fn save_changes(&mut self) -> Result<usize, OrmError> {
        let changed: HashSet<ObjectId> = self.tracker.changed().into_iter().collect();
        let mut added = Vec::new();
        let mut modified = Vec::new();
        let mut deleted = Vec::new();
        for (id, state, _) in self.tracker.entries() {
            match state {
                EntityState::Added => added.push(id),
                EntityState::Modified => modified.push(id),
                EntityState::Deleted => deleted.push(id),
                EntityState::Unchanged if changed.contains(&id) => modified.push(id),
                EntityState::Unchanged | EntityState::Detached => {}
            }
        }
        let total = added.len() + modified.len() + deleted.len();
        if total == 0 {
            return Ok(0);
        }

        let links = self.foreign_key_links();
        let added = dependency_order(&added, &links);
        let mut deleted = dependency_order(&deleted, &links);
        deleted.reverse();

        self.connection.begin()?;
        let outcome = self
            .write_back(&added, &modified, &deleted, &links)
            .and_then(|assignments| {
                self.connection.commit()?;
                Ok(assignments)
            });
        let assignments = match outcome {
            Ok(assignments) => assignments,
            Err(err) => {
                log::warn!("Write-back failed, rolling back: {}", err);
                if let Err(rollback) = self.connection.rollback() {
                    log::error!("Rollback failed: {}", rollback);
                }
                return Err(err);
            }
        };

        for (id, values) in assignments {
            if let Some(object) = self.tracker.get_mut(id) {
                for (field, value) in values {
                    object.set(field, value);
                }
            }
        }
        self.tracker.detect_changes();
        self.tracker.accept_all_changes();
        log::info!(
            "Committed {} insert(s), {} update(s), {} delete(s)",
            added.len(),
            modified.len(),
            deleted.len()
        );
        Ok(total)
    }

    /// Foreign keys each tracked object takes from a related object's key:
    /// its own single-valued navigations, and collections holding it
    fn foreign_key_links(&self) -> ForeignKeyLinks {
        let model = self.generator.model();
        let mut links = ForeignKeyLinks::new();
        for (id, _, object) in self.tracker.entries() {
            for (navigation, target) in object.references() {
                if let Ok((_, nav)) = model.navigation(object.entity(), navigation) {
                    if nav.cardinality == Cardinality::Single {
                        links
                            .entry(id)
                            .or_default()
                            .push((nav.foreign_key.clone(), *target));
                    }
                }
            }
            for (navigation, members) in object.collections() {
                let Ok((_, nav)) = model.navigation(object.entity(), navigation) else {
                    continue;
                };
                for member in members {
                    let owns_key = self
                        .tracker
                        .get(*member)
                        .is_some_and(|m| model.column_field(m.entity(), &nav.foreign_key).is_ok());
                    if owns_key {
                        links
                            .entry(*member)
                            .or_default()
                            .push((nav.foreign_key.clone(), id));
                    }
                }
            }
        }
        links
    }

    fn write_back(
        &mut self,
        added: &[ObjectId],
        modified: &[ObjectId],
        deleted: &[ObjectId],
        links: &ForeignKeyLinks,
    ) -> Result<Assignments, OrmError> {
        let mut keys: HashMap<ObjectId, KeyValue> = HashMap::new();
        let mut assignments = Assignments::new();

        for &id in added {
            let object = self.object(id)?;
            let entity = object.entity();
            let known_key = self.tracker.key_of(object);
            let mut values = self.propagated_values(id, object, links, &keys);
            let statements = self.generator.insert(entity, &values)?;
            if let Some(key) = self.run_insert(&statements, known_key)? {
                let key_field = self.model().entity(entity).key.name.clone();
                values.insert(key_field, key.to_value());
                keys.insert(id, key);
            }
            assignments.push((id, values));
        }

        for &id in modified {
            let object = self.object(id)?;
            let entity = object.entity();
            let values = self.propagated_values(id, object, links, &keys);
            for statement in self.generator.update(entity, &values)? {
                self.run(&statement)?;
            }
            assignments.push((id, values));
        }

        for &id in deleted {
            let object = self.object(id)?;
            let entity = object.entity();
            let key = self.tracker.key_of(object).ok_or_else(|| TrackingError::MissingKey {
                object: id,
                entity: self.model().entity(entity).name.clone(),
            })?;
            for statement in self.generator.delete(entity, &key)? {
                self.run(&statement)?;
            }
        }

        Ok(assignments)
    }

    fn object(&self, id: ObjectId) -> Result<&EntityObject, TrackingError> {
        self.tracker.get(id).ok_or(TrackingError::UnknownObject(id))
    }

    /// Scalar values with foreign keys filled in from related objects,
    /// including keys generated earlier in this write-back
    fn propagated_values(
        &self,
        id: ObjectId,
        object: &EntityObject,
        links: &ForeignKeyLinks,
        generated: &HashMap<ObjectId, KeyValue>,
    ) -> BTreeMap<String, Value> {
        let mut values = object.values().clone();
        for (foreign_key, related) in links.get(&id).into_iter().flatten() {
            let key = generated.get(related).cloned().or_else(|| {
                self.tracker
                    .get(*related)
                    .and_then(|r| self.tracker.key_of(r))
            });
            if let Some(key) = key {
                values.insert(foreign_key.clone(), key.to_value());
            }
        }
        values
    }

    /// Run the statements of one insert. Returns the key of the new row.
    fn run_insert(
        &mut self,
        statements: &[WriteStatement],
        known_key: Option<KeyValue>,
    ) -> Result<Option<KeyValue>, OrmError> {
        let mut key = known_key;
        for statement in statements {
            let mut params = statement.params.clone();
            if let (Some(parameter), Some(key)) = (&statement.key_parameter, &key) {
                params.insert(parameter.clone(), key.to_value());
            }
            if statement.generates_key {
                key = self.connection.insert(&statement.sql, &params)?;
            } else {
                self.connection.execute(&statement.sql, &params)?;
            }
        }
        Ok(key)
    }

    fn run(&mut self, statement: &WriteStatement) -> Result<usize, OrmError> {
        let affected = self.connection.execute(&statement.sql, &statement.params)?;
        if affected == 0 && statement.kind != WriteKind::Insert {
            log::warn!("{:?} on `{}` matched no rows", statement.kind, statement.table);
        }
        Ok(affected)
    }
}

/// `ids` ordered so that objects whose foreign keys point at another member
/// of `ids` come after it. Cycles fall back to tracking order.
fn dependency_order(ids: &[ObjectId], links: &ForeignKeyLinks) -> Vec<ObjectId> {
    fn visit(
        id: ObjectId,
        members: &HashSet<ObjectId>,
        links: &ForeignKeyLinks,
        visited: &mut HashSet<ObjectId>,
        ordered: &mut Vec<ObjectId>,
    ) {
        if !visited.insert(id) {
            return;
        }
        for (_, related) in links.get(&id).into_iter().flatten() {
            if members.contains(related) {
                visit(*related, members, links, visited, ordered);
            }
        }
        ordered.push(id);
    }

    let members: HashSet<ObjectId> = ids.iter().copied().collect();
    let mut visited = HashSet::new();
    let mut ordered = Vec::with_capacity(ids.len());
    for id in ids {
        visit(*id, &members, links, &mut visited, &mut ordered);
    }
    ordered
}
