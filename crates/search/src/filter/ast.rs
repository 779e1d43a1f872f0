//! Filter AST.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::relation::Comparison;

/// A parsed filter expression.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FilterExpr {
    /// A single comparison.
    Leaf(Leaf),
    /// Negation of an expression.
    Not { child: Box<FilterExpr> },
    /// Conjunction of at least one expression.
    And { children: Vec<FilterExpr> },
    /// Disjunction of at least one expression.
    Or { children: Vec<FilterExpr> },
}

impl FilterExpr {
    /// Counts the leaves of the expression.
    pub fn leaf_count(&self) -> usize {
        match self {
            FilterExpr::Leaf(_) => 1,
            FilterExpr::Not { child } => child.leaf_count(),
            FilterExpr::And { children } | FilterExpr::Or { children } => {
                children.iter().map(FilterExpr::leaf_count).sum()
            }
        }
    }
}

/// An atomic comparison: `[entity, name, (name)?, relation, operand]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Leaf {
    /// Entity and attribute/relation names, two or three for well-formed leaves.
    pub path: Vec<String>,
    /// The resolved relation token.
    pub comparison: Comparison,
    /// The raw operand, converted during resolution.
    pub operand: Value,
    /// The leaf as the client wrote it, for error reporting.
    #[serde(skip)]
    pub source: Value,
}

impl Leaf {
    /// The entity the leaf starts from.
    pub fn entity(&self) -> &str {
        self.path.first().map(String::as_str).unwrap_or_default()
    }

    /// Number of relation hops the path implies.
    pub fn hops(&self) -> usize {
        self.path.len().saturating_sub(2)
    }
}

/// Sort direction of an order-by key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    /// Parses `asc`/`desc`, ignoring case.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Some(SortDirection::Asc),
            "desc" => Some(SortDirection::Desc),
            _ => None,
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// One parsed `[entity, attribute, direction]` key.
#[derive(Debug, Clone, PartialEq)]
pub struct SortKey {
    pub entity: String,
    pub attribute: String,
    pub direction: SortDirection,
    /// The key as the client wrote it.
    pub source: Value,
}
