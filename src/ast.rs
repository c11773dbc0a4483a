//! Conditional expression tree.
//!
//! Expressions are built once (by [`crate::expression::parse_expression`] or
//! by hand) and evaluated many times by [`crate::eval::ExpressionEvaluator`].

use serde::{Deserialize, Serialize};
use strum::Display;

/// A value operand of a comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueExpression {
    Constant(String),
    Variable(VariableExpression),
}

impl ValueExpression {
    pub fn constant(value: impl Into<String>) -> Self {
        Self::Constant(value.into())
    }

    pub fn variable(name: impl Into<String>) -> Self {
        Self::Variable(VariableExpression::new(name))
    }

    pub fn keyed_variable(name: impl Into<String>, key: impl Into<String>) -> Self {
        Self::Variable(VariableExpression::with_key(name, key))
    }
}

/// Reference to a request variable such as `$(HTTP_COOKIE{session})`.
///
/// `key` selects a sub-property of the variable (a cookie name, a query
/// parameter, a language tag). Resolvers decide what it means.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VariableExpression {
    pub name: String,
    pub key: Option<String>,
}

impl VariableExpression {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key: None,
        }
    }

    pub fn with_key(name: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key: Some(key.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum ComparisonOperator {
    #[strum(serialize = "==")]
    Equal,
    #[strum(serialize = "!=")]
    NotEqual,
    #[strum(serialize = ">")]
    GreaterThan,
    #[strum(serialize = ">=")]
    GreaterOrEqual,
    #[strum(serialize = "<")]
    LessThan,
    #[strum(serialize = "<=")]
    LessOrEqual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum BooleanOperator {
    #[strum(serialize = "&")]
    And,
    #[strum(serialize = "|")]
    Or,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonExpression {
    pub left: ValueExpression,
    pub operator: ComparisonOperator,
    pub right: ValueExpression,
}

impl ComparisonExpression {
    pub fn new(left: ValueExpression, operator: ComparisonOperator, right: ValueExpression) -> Self {
        Self {
            left,
            operator,
            right,
        }
    }
}

/// One link of a group chain. The operator joins this entry to the
/// accumulated result of the entries before it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupEntry {
    pub operator: BooleanOperator,
    pub expression: BooleanExpression,
}

/// A left-to-right chain of boolean expressions.
///
/// There is no operator precedence: `a & b | c` is folded strictly from left
/// to right. The operator of the first entry is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GroupExpression {
    pub entries: Vec<GroupEntry>,
}

impl GroupExpression {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a chain with `expression` as its first entry.
    pub fn starting_with(expression: impl Into<BooleanExpression>) -> Self {
        Self::new().push(BooleanOperator::And, expression)
    }

    pub fn and(self, expression: impl Into<BooleanExpression>) -> Self {
        self.push(BooleanOperator::And, expression)
    }

    pub fn or(self, expression: impl Into<BooleanExpression>) -> Self {
        self.push(BooleanOperator::Or, expression)
    }

    pub fn push(mut self, operator: BooleanOperator, expression: impl Into<BooleanExpression>) -> Self {
        self.entries.push(GroupEntry {
            operator,
            expression: expression.into(),
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BooleanExpression {
    Comparison(ComparisonExpression),
    Group(GroupExpression),
}

impl From<ComparisonExpression> for BooleanExpression {
    fn from(expression: ComparisonExpression) -> Self {
        Self::Comparison(expression)
    }
}

impl From<GroupExpression> for BooleanExpression {
    fn from(expression: GroupExpression) -> Self {
        Self::Group(expression)
    }
}
