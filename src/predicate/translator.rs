use super::errors::TranslateError;
use super::{CompareOp, Expr, METHOD_CONTAINS, METHOD_ENDS_WITH, METHOD_STARTS_WITH};
use crate::sql_generator::{qualified_column, Dialect, TableAliases};
use crate::value::{Params, Value, ValueType};

/// Parameterized SQL fragment
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SqlFragment {
    pub sql: String,
    pub parameters: Params,
}

/// Translate a predicate against the entity described by `aliases`.
///
/// Parameters are numbered from `p0` in visiting order.
pub fn translate(
    expr: &Expr,
    aliases: &TableAliases<'_>,
    dialect: &dyn Dialect,
) -> Result<SqlFragment, TranslateError> {
    let mut translator = PredicateTranslator::new(aliases, dialect);
    let sql = translator.condition(expr)?;
    Ok(SqlFragment {
        sql,
        parameters: translator.into_parameters(),
    })
}

/// Stateful translator; owns the parameter counter so that several
/// predicates can share one numbering sequence.
pub struct PredicateTranslator<'a> {
    aliases: &'a TableAliases<'a>,
    dialect: &'a dyn Dialect,
    next_parameter: usize,
    parameters: Params,
}

impl<'a> PredicateTranslator<'a> {
    pub fn new(aliases: &'a TableAliases<'a>, dialect: &'a dyn Dialect) -> Self {
        Self {
            aliases,
            dialect,
            next_parameter: 0,
            parameters: Params::new(),
        }
    }

    pub fn into_parameters(self) -> Params {
        self.parameters
    }

    /// Render an expression in boolean position
    pub fn condition(&mut self, expr: &Expr) -> Result<String, TranslateError> {
        match expr {
            Expr::And(left, right) => Ok(format!(
                "({} AND {})",
                self.condition(left)?,
                self.condition(right)?
            )),
            Expr::Or(left, right) => Ok(format!(
                "({} OR {})",
                self.condition(left)?,
                self.condition(right)?
            )),
            Expr::Not(inner) => Ok(format!("NOT ({})", self.condition(inner)?)),
            Expr::Compare { op, left, right } => self.comparison(*op, left, right),
            Expr::MethodCall {
                method,
                target,
                arguments,
            } => self.string_match(method, target, arguments),
            Expr::Field(name) => {
                let (alias, field) = self.aliases.column(name)?;
                if field.value_type != ValueType::Boolean {
                    return Err(TranslateError::NonBooleanCondition {
                        field: name.clone(),
                    });
                }
                Ok(qualified_column(self.dialect, &alias, &field.column))
            }
            Expr::Literal(_) | Expr::Captured { .. } => Err(TranslateError::LiteralCondition),
        }
    }

    fn comparison(
        &mut self,
        op: CompareOp,
        left: &Expr,
        right: &Expr,
    ) -> Result<String, TranslateError> {
        // `field == null` has no parameterized form
        if matches!(op, CompareOp::Eq | CompareOp::Ne) {
            let null_side = match (value_of(left), value_of(right)) {
                (_, Some(Value::Null)) => Some(left),
                (Some(Value::Null), _) => Some(right),
                _ => None,
            };
            if let Some(operand) = null_side {
                let operand = self.operand(operand, "null comparison")?;
                let test = if op == CompareOp::Eq {
                    "IS NULL"
                } else {
                    "IS NOT NULL"
                };
                return Ok(format!("{} {}", operand, test));
            }
        }

        let left = self.operand(left, "comparison")?;
        let right = self.operand(right, "comparison")?;
        Ok(format!("{} {} {}", left, op.as_sql(), right))
    }

    fn string_match(
        &mut self,
        method: &str,
        target: &Expr,
        arguments: &[Expr],
    ) -> Result<String, TranslateError> {
        let pattern: fn(&str) -> String = match method {
            METHOD_CONTAINS => |v| format!("%{}%", v),
            METHOD_STARTS_WITH => |v| format!("{}%", v),
            METHOD_ENDS_WITH => |v| format!("%{}", v),
            other => return Err(TranslateError::UnsupportedMethod(other.to_string())),
        };
        let [argument] = arguments else {
            return Err(TranslateError::InvalidArgumentCount {
                method: method.to_string(),
                expected: 1,
                found: arguments.len(),
            });
        };
        let (Expr::Field(_), Some(Value::Text(text))) = (target, value_of(argument)) else {
            return Err(TranslateError::InvalidMethodOperands {
                method: method.to_string(),
            });
        };

        let column = self.operand(target, method)?;
        let parameter = self.bind(Value::Text(pattern(text)));
        Ok(format!("{} LIKE {}", column, parameter))
    }

    fn operand(&mut self, expr: &Expr, context: &str) -> Result<String, TranslateError> {
        match expr {
            Expr::Field(name) => {
                let (alias, field) = self.aliases.column(name)?;
                Ok(qualified_column(self.dialect, &alias, &field.column))
            }
            Expr::Literal(value) | Expr::Captured { value, .. } => Ok(self.bind(value.clone())),
            _ => Err(TranslateError::UnsupportedOperand {
                context: context.to_string(),
            }),
        }
    }

    /// Every value gets a fresh parameter; values are never inlined.
    fn bind(&mut self, value: Value) -> String {
        let name = self
            .dialect
            .parameter(&format!("p{}", self.next_parameter));
        self.next_parameter += 1;
        self.parameters.insert(name.clone(), value);
        name
    }
}

fn value_of(expr: &Expr) -> Option<&Value> {
    match expr {
        Expr::Literal(value) | Expr::Captured { value, .. } => Some(value),
        _ => None,
    }
}
