use crate::model::{EntityId, EntityModel, InheritanceStrategy, ModelError, ScalarField};

/// Table aliases of one entity occurrence in a query.
///
/// Every hierarchy table shares `base` except under joined-table
/// inheritance, where each type other than the target gets its own alias
/// `<base><EntityName>` (e.g. `tVehicle`).
#[derive(Debug, Clone)]
pub struct TableAliases<'a> {
    model: &'a EntityModel,
    target: EntityId,
    base: String,
}

impl<'a> TableAliases<'a> {
    pub fn new(model: &'a EntityModel, target: EntityId, base: impl Into<String>) -> Self {
        Self {
            model,
            target,
            base: base.into(),
        }
    }

    pub fn model(&self) -> &'a EntityModel {
        self.model
    }

    pub fn target(&self) -> EntityId {
        self.target
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// Alias of the table holding columns declared on `owner`
    pub fn alias_for(&self, owner: EntityId) -> String {
        let strategy = self.model.entity(self.target).strategy;
        if strategy == InheritanceStrategy::JoinedTable && owner != self.target {
            format!("{}{}", self.base, self.model.entity(owner).name)
        } else {
            self.base.clone()
        }
    }

    /// Resolve a field name on the target to its column and owning alias.
    /// Walks the ancestors to find the descriptor that declares the column.
    pub fn column(&self, field: &str) -> Result<(String, &'a ScalarField), ModelError> {
        let (owner, scalar) = self.model.column_field(self.target, field)?;
        Ok((self.alias_for(owner), scalar))
    }
}
