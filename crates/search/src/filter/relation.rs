//! Relation table.
//!
//! Maps the relation tokens clients may use in a leaf (`=`, `like`, `in_`, ...)
//! to a closed set of comparison operators, along with the scalar types each
//! operator accepts.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::schema::ScalarType;

/// A comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Comparison {
    /// Equality (`=`, `__eq__`).
    Eq,
    /// Inequality (`!=`, `__ne__`).
    Ne,
    /// SQL `LIKE` pattern with `%` and `_` wildcards.
    Like,
    /// Unanchored regular expression match.
    Regex,
    /// Less than.
    Lt,
    /// Less than or equal.
    Le,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Ge,
    /// Membership in a list of values.
    In,
}

/// Every accepted relation token and the operator it resolves to.
const RELATION_TOKENS: &[(&str, Comparison)] = &[
    ("=", Comparison::Eq),
    ("__eq__", Comparison::Eq),
    ("!=", Comparison::Ne),
    ("__ne__", Comparison::Ne),
    ("like", Comparison::Like),
    ("regex", Comparison::Regex),
    ("regexp", Comparison::Regex),
    ("<", Comparison::Lt),
    ("__lt__", Comparison::Lt),
    ("<=", Comparison::Le),
    ("__le__", Comparison::Le),
    (">", Comparison::Gt),
    ("__gt__", Comparison::Gt),
    (">=", Comparison::Ge),
    ("__ge__", Comparison::Ge),
    ("in", Comparison::In),
    ("in_", Comparison::In),
];

impl Comparison {
    /// All operators, in relation-table order.
    pub const ALL: [Comparison; 9] = [
        Comparison::Eq,
        Comparison::Ne,
        Comparison::Like,
        Comparison::Regex,
        Comparison::Lt,
        Comparison::Le,
        Comparison::Gt,
        Comparison::Ge,
        Comparison::In,
    ];

    /// Resolves a relation token. Tokens are case-sensitive.
    pub fn from_token(token: &str) -> Option<Self> {
        RELATION_TOKENS
            .iter()
            .find(|(t, _)| *t == token)
            .map(|(_, c)| *c)
    }

    /// Returns every token that resolves to this operator.
    pub fn tokens(&self) -> Vec<&'static str> {
        RELATION_TOKENS
            .iter()
            .filter(|(_, c)| c == self)
            .map(|(t, _)| *t)
            .collect()
    }

    /// Returns the canonical token.
    pub fn symbol(&self) -> &'static str {
        match self {
            Comparison::Eq => "=",
            Comparison::Ne => "!=",
            Comparison::Like => "like",
            Comparison::Regex => "regex",
            Comparison::Lt => "<",
            Comparison::Le => "<=",
            Comparison::Gt => ">",
            Comparison::Ge => ">=",
            Comparison::In => "in",
        }
    }

    /// Returns true if the operator may be applied to values of `scalar_type`.
    pub fn accepts(&self, scalar_type: ScalarType) -> bool {
        match self {
            Comparison::Eq | Comparison::Ne | Comparison::In => true,
            Comparison::Like | Comparison::Regex => scalar_type.is_textual(),
            Comparison::Lt | Comparison::Le | Comparison::Gt | Comparison::Ge => {
                scalar_type.is_orderable()
            }
        }
    }

    /// `=` and `!=`: the only operators allowed on relation attributes.
    pub fn is_equality(&self) -> bool {
        matches!(self, Comparison::Eq | Comparison::Ne)
    }

    /// `<`, `<=`, `>` and `>=`.
    pub fn is_ordering(&self) -> bool {
        matches!(
            self,
            Comparison::Lt | Comparison::Le | Comparison::Gt | Comparison::Ge
        )
    }

    /// `like` and `regex`.
    pub fn is_pattern(&self) -> bool {
        matches!(self, Comparison::Like | Comparison::Regex)
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// One row of the relation table, as reported to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelationTableEntry {
    pub operator: Comparison,
    pub tokens: Vec<&'static str>,
    pub accepts: Vec<ScalarType>,
}

/// Returns the full relation table.
pub fn relation_table() -> Vec<RelationTableEntry> {
    Comparison::ALL
        .iter()
        .map(|op| RelationTableEntry {
            operator: *op,
            tokens: op.tokens(),
            accepts: ScalarType::all()
                .iter()
                .copied()
                .filter(|t| op.accepts(*t))
                .collect(),
        })
        .collect()
}
