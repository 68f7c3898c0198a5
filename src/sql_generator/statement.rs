//! Structured SELECT statements and their rendering.
//!
//! Builders assemble these plans; nothing is concatenated into SQL text
//! until `to_sql` runs with a concrete dialect.

use super::dialect::{qualified_column, Dialect};

pub trait ToSql {
    fn to_sql(&self, dialect: &dyn Dialect) -> String;
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectExpr {
    Column { table_alias: String, column: String },
    /// Padding for columns a union branch does not have
    Null,
    /// Engine-controlled string constant
    Constant(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectItem {
    pub expression: SelectExpr,
    pub col_alias: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FromTable {
    pub table_name: String,
    pub table_alias: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
}

/// One equality between two qualified columns
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnEquality {
    pub left_alias: String,
    pub left_column: String,
    pub right_alias: String,
    pub right_column: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub join_type: JoinType,
    pub table_name: String,
    pub table_alias: String,
    pub joining_on: Vec<ColumnEquality>,
    /// Extra rendered conditions (discriminator guards)
    pub extra_conditions: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderByOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OrderByTarget {
    /// Qualified column inside a single SELECT
    Column { table_alias: String, column: String },
    /// Output column name of a wrapped union
    OutputColumn(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderByItem {
    pub target: OrderByTarget,
    pub order: OrderByOrder,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectStatement {
    pub items: Vec<SelectItem>,
    pub from: FromTable,
    pub joins: Vec<Join>,
    /// Rendered conditions, AND-ed together
    pub filters: Vec<String>,
    pub order_by: Vec<OrderByItem>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl SelectStatement {
    pub fn new(from: FromTable) -> Self {
        Self {
            items: Vec::new(),
            from,
            joins: Vec::new(),
            filters: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
        }
    }
}

/// UNION ALL of branch SELECTs. Ordering and pagination are applied by an
/// outer SELECT over the union, never per branch.
#[derive(Debug, Clone, PartialEq)]
pub struct UnionStatement {
    pub branches: Vec<SelectStatement>,
    pub wrapper_alias: String,
    pub order_by: Vec<OrderByItem>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectQuery {
    Single(SelectStatement),
    Union(UnionStatement),
}

impl ToSql for SelectItem {
    fn to_sql(&self, dialect: &dyn Dialect) -> String {
        let expression = match &self.expression {
            SelectExpr::Column {
                table_alias,
                column,
            } => qualified_column(dialect, table_alias, column),
            SelectExpr::Null => "NULL".to_string(),
            SelectExpr::Constant(value) => dialect.string_literal(value),
        };
        match &self.col_alias {
            Some(alias) => format!("{} AS {}", expression, dialect.quote_identifier(alias)),
            None => expression,
        }
    }
}

impl ToSql for FromTable {
    fn to_sql(&self, dialect: &dyn Dialect) -> String {
        format!(
            "FROM {} AS {}",
            dialect.quote_identifier(&self.table_name),
            dialect.quote_identifier(&self.table_alias)
        )
    }
}

impl ToSql for Join {
    fn to_sql(&self, dialect: &dyn Dialect) -> String {
        let join_type = match self.join_type {
            JoinType::Inner => "INNER JOIN",
            JoinType::Left => "LEFT JOIN",
        };
        let conditions: Vec<String> = self
            .joining_on
            .iter()
            .map(|eq| {
                format!(
                    "{} = {}",
                    qualified_column(dialect, &eq.left_alias, &eq.left_column),
                    qualified_column(dialect, &eq.right_alias, &eq.right_column)
                )
            })
            .chain(self.extra_conditions.iter().cloned())
            .collect();
        format!(
            "{} {} AS {} ON {}",
            join_type,
            dialect.quote_identifier(&self.table_name),
            dialect.quote_identifier(&self.table_alias),
            conditions.join(" AND ")
        )
    }
}

impl ToSql for OrderByItem {
    fn to_sql(&self, dialect: &dyn Dialect) -> String {
        let target = match &self.target {
            OrderByTarget::Column {
                table_alias,
                column,
            } => qualified_column(dialect, table_alias, column),
            OrderByTarget::OutputColumn(name) => dialect.quote_identifier(name),
        };
        let order = match self.order {
            OrderByOrder::Asc => "ASC",
            OrderByOrder::Desc => "DESC",
        };
        format!("{} {}", target, order)
    }
}

fn render_tail(
    sql: &mut String,
    order_by: &[OrderByItem],
    limit: Option<u64>,
    offset: Option<u64>,
    dialect: &dyn Dialect,
) {
    if !order_by.is_empty() {
        let items: Vec<String> = order_by.iter().map(|o| o.to_sql(dialect)).collect();
        sql.push_str(" ORDER BY ");
        sql.push_str(&items.join(", "));
    }
    if let Some(page) = dialect.limit_offset(limit, offset) {
        sql.push(' ');
        sql.push_str(&page);
    }
}

impl ToSql for SelectStatement {
    fn to_sql(&self, dialect: &dyn Dialect) -> String {
        let items: Vec<String> = self.items.iter().map(|i| i.to_sql(dialect)).collect();
        let mut sql = format!("SELECT {} {}", items.join(", "), self.from.to_sql(dialect));
        for join in &self.joins {
            sql.push(' ');
            sql.push_str(&join.to_sql(dialect));
        }
        if !self.filters.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.filters.join(" AND "));
        }
        render_tail(&mut sql, &self.order_by, self.limit, self.offset, dialect);
        sql
    }
}

impl ToSql for UnionStatement {
    fn to_sql(&self, dialect: &dyn Dialect) -> String {
        let branches: Vec<String> = self.branches.iter().map(|b| b.to_sql(dialect)).collect();
        let union = branches.join(" UNION ALL ");
        if self.order_by.is_empty() && self.limit.is_none() && self.offset.is_none() {
            return union;
        }
        let mut sql = format!(
            "SELECT * FROM ({}) AS {}",
            union,
            dialect.quote_identifier(&self.wrapper_alias)
        );
        render_tail(&mut sql, &self.order_by, self.limit, self.offset, dialect);
        sql
    }
}

impl ToSql for SelectQuery {
    fn to_sql(&self, dialect: &dyn Dialect) -> String {
        match self {
            SelectQuery::Single(select) => select.to_sql(dialect),
            SelectQuery::Union(union) => union.to_sql(dialect),
        }
    }
}
