//! SELECT construction from a `ReadPlan`.

use std::collections::HashSet;

use super::aliases::TableAliases;
use super::dialect::{qualified_column, Dialect};
use super::errors::GenerationError;
use super::read_plan::{
    AliasGroup, ColumnRole, EagerJoin, HierarchyShape, ReadPlan, SelectedColumn,
};
use super::statement::{
    ColumnEquality, FromTable, Join, JoinType, OrderByItem, OrderByOrder, OrderByTarget,
    SelectExpr, SelectItem, SelectQuery, SelectStatement, UnionStatement,
};
use crate::model::{Cardinality, EntityId, EntityModel};
use crate::predicate::PredicateTranslator;
use crate::query::{QuerySpec, SortDirection};
use crate::value::{Params, Value};

const UNION_WRAPPER_ALIAS: &str = "_u";

pub(crate) fn build_select(
    model: &EntityModel,
    dialect: &dyn Dialect,
    plan: &ReadPlan,
    spec: &QuerySpec,
) -> Result<(SelectQuery, Params), GenerationError> {
    let paged = spec.limit.is_some() || spec.offset.is_some();
    if let Some(join) = plan
        .joins
        .iter()
        .find(|j| paged && j.cardinality == Cardinality::Collection)
    {
        // LIMIT counts joined rows, which would leave collections half loaded
        return Err(GenerationError::UnsupportedInclude {
            path: join.path.to_string(),
            reason: "collection includes cannot be combined with limit or offset".to_string(),
        });
    }

    let root = &plan.root;
    let aliases = TableAliases::new(model, root.entity, root.alias.clone());

    let mut translator = PredicateTranslator::new(&aliases, dialect);
    let predicate = match &spec.predicate {
        Some(expr) => Some(translator.condition(expr)?),
        None => None,
    };
    let mut params = translator.into_parameters();

    let mut eager_joins = Vec::new();
    for join in &plan.joins {
        eager_joins.extend(eager_join_clauses(model, dialect, join, &mut params)?);
    }

    let mut order_by = Vec::new();
    for item in &spec.order_by {
        let (alias, field) = aliases.column(&item.field)?;
        let order = match item.direction {
            SortDirection::Asc => OrderByOrder::Asc,
            SortDirection::Desc => OrderByOrder::Desc,
        };
        let target = if root.shape == HierarchyShape::Union {
            // Every branch emits identical output names, so the outer
            // query can order by them
            OrderByTarget::OutputColumn(format!("{}_{}", alias, field.column))
        } else {
            OrderByTarget::Column {
                table_alias: alias,
                column: field.column.clone(),
            }
        };
        order_by.push(OrderByItem { target, order });
    }

    if root.shape == HierarchyShape::Union {
        let branches = root
            .tables
            .iter()
            .map(|table| {
                let mut branch = SelectStatement::new(FromTable {
                    table_name: table.table_name.clone(),
                    table_alias: table.alias.clone(),
                });
                branch.items = union_branch_items(model, plan, table.entity);
                branch.joins = eager_joins.clone();
                branch.filters.extend(predicate.clone());
                branch
            })
            .collect();
        let union = UnionStatement {
            branches,
            wrapper_alias: UNION_WRAPPER_ALIAS.to_string(),
            order_by,
            limit: spec.limit,
            offset: spec.offset,
        };
        return Ok((SelectQuery::Union(union), params));
    }

    let own_table = &root.tables[0];
    let mut select = SelectStatement::new(FromTable {
        table_name: own_table.table_name.clone(),
        table_alias: own_table.alias.clone(),
    });
    select.items = select_items(plan);
    select.joins = hierarchy_joins(model, root, &root.alias, JoinType::Inner);
    select.joins.extend(eager_joins);
    if root.shape == HierarchyShape::Discriminated {
        select.filters.extend(discriminator_condition(
            model,
            dialect,
            root,
            "Discriminator",
            &mut params,
        ));
    }
    select.filters.extend(predicate);
    select.order_by = order_by;
    select.limit = spec.limit;
    select.offset = spec.offset;
    Ok((SelectQuery::Single(select), params))
}

fn all_columns(plan: &ReadPlan) -> impl Iterator<Item = &SelectedColumn> {
    plan.root
        .columns
        .iter()
        .chain(plan.joins.iter().flat_map(|j| j.group.columns.iter()))
}

fn select_items(plan: &ReadPlan) -> Vec<SelectItem> {
    let mut seen = HashSet::new();
    all_columns(plan)
        .filter(|c| seen.insert((c.table_alias.clone(), c.column.clone())))
        .map(|c| SelectItem {
            expression: SelectExpr::Column {
                table_alias: c.table_alias.clone(),
                column: c.column.clone(),
            },
            col_alias: plan.aliased.then(|| plan.output_name(c)),
        })
        .collect()
}

/// Items of one union branch: the root columns the branch's table has,
/// NULL for the ones it lacks, and its type tag. Every branch produces
/// the same output names in the same order.
fn union_branch_items(model: &EntityModel, plan: &ReadPlan, concrete: EntityId) -> Vec<SelectItem> {
    let lineage = model.lineage(concrete);
    let mut outputs: Vec<(String, SelectItem)> = Vec::new();

    for column in all_columns(plan) {
        let output = plan.output_name(column);
        let expression = match &column.role {
            ColumnRole::TypeTag => SelectExpr::Constant(model.entity(concrete).name.clone()),
            ColumnRole::Field { owner, .. }
                if column.table_alias == plan.root.alias && !lineage.contains(owner) =>
            {
                SelectExpr::Null
            }
            _ => SelectExpr::Column {
                table_alias: column.table_alias.clone(),
                column: column.column.clone(),
            },
        };

        match outputs.iter_mut().find(|(name, _)| *name == output) {
            // sibling fields sharing a column name collapse into one output
            Some((_, existing)) => {
                if existing.expression == SelectExpr::Null {
                    existing.expression = expression;
                }
            }
            None => outputs.push((
                output.clone(),
                SelectItem {
                    expression,
                    col_alias: Some(output),
                },
            )),
        }
    }

    outputs.into_iter().map(|(_, item)| item).collect()
}

/// Joins bringing in the other tables of a joined-table group, keyed on
/// `anchor` (the alias already present in the statement)
fn hierarchy_joins(
    model: &EntityModel,
    group: &AliasGroup,
    anchor: &str,
    ancestor_join: JoinType,
) -> Vec<Join> {
    if group.shape != HierarchyShape::Joined {
        return Vec::new();
    }
    let key_column = &model.entity(group.entity).key.column;
    group
        .tables
        .iter()
        .filter(|table| table.alias != anchor)
        .map(|table| {
            let join_type = if model.is_same_or_descendant(group.entity, table.entity) {
                ancestor_join
            } else {
                JoinType::Left
            };
            Join {
                join_type,
                table_name: table.table_name.clone(),
                table_alias: table.alias.clone(),
                joining_on: vec![ColumnEquality {
                    left_alias: anchor.to_string(),
                    left_column: key_column.clone(),
                    right_alias: table.alias.clone(),
                    right_column: key_column.clone(),
                }],
                extra_conditions: Vec::new(),
            }
        })
        .collect()
}

/// LEFT JOINs for one eager-load segment.
///
/// The first join reaches the table owning the join column on the target
/// side; the rest of a joined-table target hangs off that table by key.
fn eager_join_clauses(
    model: &EntityModel,
    dialect: &dyn Dialect,
    join: &EagerJoin,
    params: &mut Params,
) -> Result<Vec<Join>, GenerationError> {
    let group = &join.group;
    let parent_aliases = TableAliases::new(model, join.parent_entity, join.parent_alias.clone());
    let target_aliases = TableAliases::new(model, group.entity, group.alias.clone());

    let (parent_side, anchor_alias, anchor_column) = match join.cardinality {
        Cardinality::Single => {
            let (fk_alias, fk) = parent_aliases.column(&join.foreign_key)?;
            let key = &model.entity(group.entity).key;
            ((fk_alias, fk.column.clone()), group.alias.clone(), key.column.clone())
        }
        Cardinality::Collection => {
            let (fk_alias, fk) = target_aliases.column(&join.foreign_key)?;
            let parent_key = &model.entity(join.parent_entity).key;
            (
                (join.parent_alias.clone(), parent_key.column.clone()),
                fk_alias,
                fk.column.clone(),
            )
        }
    };

    let anchor = group
        .table(&anchor_alias)
        .ok_or_else(|| GenerationError::UnsupportedInclude {
            path: join.path.to_string(),
            reason: format!("no table aliased `{}`", anchor_alias),
        })?;

    let mut first = Join {
        join_type: JoinType::Left,
        table_name: anchor.table_name.clone(),
        table_alias: anchor_alias.clone(),
        joining_on: vec![ColumnEquality {
            left_alias: parent_side.0,
            left_column: parent_side.1,
            right_alias: anchor_alias.clone(),
            right_column: anchor_column,
        }],
        extra_conditions: Vec::new(),
    };
    if group.shape == HierarchyShape::Discriminated {
        let prefix = format!("{}_Discriminator", group.alias);
        first
            .extra_conditions
            .extend(discriminator_condition(model, dialect, group, &prefix, params));
    }

    let mut clauses = vec![first];
    // ancestors go outer too; an INNER JOIN here would drop unmatched roots
    clauses.extend(hierarchy_joins(model, group, &anchor_alias, JoinType::Left));
    Ok(clauses)
}

/// `alias.Discriminator = @p` for one concrete type, an IN-list for several
fn discriminator_condition(
    model: &EntityModel,
    dialect: &dyn Dialect,
    group: &AliasGroup,
    parameter_prefix: &str,
    params: &mut Params,
) -> Option<String> {
    let column = group.role_column(&ColumnRole::Discriminator)?;
    let values: Vec<String> = model
        .concrete_types(group.entity)
        .into_iter()
        .filter_map(|c| model.entity(c).discriminator_value.clone())
        .collect();
    let target = qualified_column(dialect, &column.table_alias, &column.column);

    match values.as_slice() {
        [] => None,
        [single] => {
            let name = dialect.parameter(parameter_prefix);
            params.insert(name.clone(), Value::Text(single.clone()));
            Some(format!("{} = {}", target, name))
        }
        many => {
            let names: Vec<String> = many
                .iter()
                .enumerate()
                .map(|(i, value)| {
                    let name = dialect.parameter(&format!("{}{}", parameter_prefix, i));
                    params.insert(name.clone(), Value::Text(value.clone()));
                    name
                })
                .collect();
            Some(format!("{} IN ({})", target, names.join(", ")))
        }
    }
}
