//! Predicate Compiler.
//!
//! Lowers a resolved filter into a [`Predicate`] tree bound to the aliases of
//! the join plan.

use serde::{Deserialize, Serialize};

use crate::filter::Comparison;

use super::joins::{AliasId, JoinPlanner};
use super::resolver::{Operand, ResolvedExpr, ResolvedLeaf, ScalarValue};

/// A column of one aliased table occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnRef {
    pub alias: AliasId,
    pub attribute: String,
}

impl ColumnRef {
    pub fn new(alias: AliasId, attribute: impl Into<String>) -> Self {
        Self {
            alias,
            attribute: attribute.into(),
        }
    }
}

/// A composed boolean predicate over the root and its joins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Predicate {
    /// `column <comparison> value`, never with `In` or a null value.
    Compare {
        column: ColumnRef,
        comparison: Comparison,
        value: ScalarValue,
    },
    /// `column IN (values)`; values are never null.
    In {
        column: ColumnRef,
        values: Vec<ScalarValue>,
    },
    IsNull {
        column: ColumnRef,
    },
    IsNotNull {
        column: ColumnRef,
    },
    /// At least one row reached through `alias` satisfies `predicate`.
    ///
    /// Used for every traversal, so a root without a related row fails the
    /// inner comparison and `Not` of it holds.
    Exists {
        alias: AliasId,
        predicate: Box<Predicate>,
    },
    /// The root has (or lacks) any associated row through `alias`.
    Related {
        alias: AliasId,
        exists: bool,
    },
    Not {
        predicate: Box<Predicate>,
    },
    And {
        predicates: Vec<Predicate>,
    },
    Or {
        predicates: Vec<Predicate>,
    },
}

impl Predicate {
    /// Returns every alias the predicate refers to, in first-use order.
    pub fn aliases(&self) -> Vec<AliasId> {
        let mut aliases = Vec::new();
        self.collect_aliases(&mut aliases);
        aliases
    }

    fn collect_aliases(&self, out: &mut Vec<AliasId>) {
        match self {
            Predicate::Compare { column, .. }
            | Predicate::In { column, .. }
            | Predicate::IsNull { column }
            | Predicate::IsNotNull { column } => push_unique(out, column.alias),
            Predicate::Related { alias, .. } => push_unique(out, *alias),
            Predicate::Exists { alias, predicate } => {
                push_unique(out, *alias);
                predicate.collect_aliases(out);
            }
            Predicate::Not { predicate } => predicate.collect_aliases(out),
            Predicate::And { predicates } | Predicate::Or { predicates } => {
                for p in predicates {
                    p.collect_aliases(out);
                }
            }
        }
    }
}

fn push_unique(out: &mut Vec<AliasId>, alias: AliasId) {
    if !out.contains(&alias) {
        out.push(alias);
    }
}

/// Lowers resolved filters, allocating aliases through a [`JoinPlanner`].
pub struct PredicateCompiler<'a> {
    joins: &'a mut JoinPlanner,
}

impl<'a> PredicateCompiler<'a> {
    pub fn new(joins: &'a mut JoinPlanner) -> Self {
        Self { joins }
    }

    /// Compiles `expr`.
    pub fn compile(&mut self, expr: &ResolvedExpr) -> Predicate {
        match expr {
            ResolvedExpr::Leaf(leaf) => self.compile_leaf(leaf),
            ResolvedExpr::Not(child) => Predicate::Not {
                predicate: Box::new(self.compile(child)),
            },
            ResolvedExpr::And(children) => Predicate::And {
                predicates: children.iter().map(|c| self.compile(c)).collect(),
            },
            ResolvedExpr::Or(children) => Predicate::Or {
                predicates: children.iter().map(|c| self.compile(c)).collect(),
            },
        }
    }

    fn compile_leaf(&mut self, leaf: &ResolvedLeaf) -> Predicate {
        match leaf {
            ResolvedLeaf::Scalar {
                via: None,
                attribute,
                comparison,
                operand,
                ..
            } => compare(ColumnRef::new(AliasId::ROOT, attribute), *comparison, operand),
            ResolvedLeaf::Scalar {
                via: Some(traversal),
                attribute,
                comparison,
                operand,
                ..
            } => {
                let alias = self.joins.alias_for(traversal);
                Predicate::Exists {
                    alias,
                    predicate: Box::new(compare(
                        ColumnRef::new(alias, attribute),
                        *comparison,
                        operand,
                    )),
                }
            }
            ResolvedLeaf::Presence { traversal, exists } => Predicate::Related {
                alias: self.joins.alias_for(traversal),
                exists: *exists,
            },
        }
    }
}

fn compare(column: ColumnRef, comparison: Comparison, operand: &Operand) -> Predicate {
    match operand {
        Operand::Single(ScalarValue::Null) if comparison == Comparison::Ne => {
            Predicate::IsNotNull { column }
        }
        Operand::Single(ScalarValue::Null) => Predicate::IsNull { column },
        Operand::Single(value) => Predicate::Compare {
            column,
            comparison,
            value: value.clone(),
        },
        Operand::List(values) => {
            let has_null = values.iter().any(ScalarValue::is_null);
            let values: Vec<ScalarValue> =
                values.iter().filter(|v| !v.is_null()).cloned().collect();
            match (values.is_empty(), has_null) {
                (_, false) => Predicate::In { column, values },
                (true, true) => Predicate::IsNull { column },
                (false, true) => Predicate::Or {
                    predicates: vec![
                        Predicate::In {
                            column: column.clone(),
                            values,
                        },
                        Predicate::IsNull { column },
                    ],
                },
            }
        }
    }
}
