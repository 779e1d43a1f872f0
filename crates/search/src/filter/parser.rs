//! Filter expression parser.
//!
//! Converts the JSON `query.filter` value into a [`FilterExpr`].
//!
//! # Grammar
//!
//! ```text
//! filter = leaf / ["not", filter] / ["and", [filter, ...]] / ["or", [filter, ...]]
//! leaf   = [entity, attribute, relation, operand]
//!        / [entity, relationName, targetAttribute, relation, operand]
//! ```
//!
//! Before any recursive descent, [`measure`] walks the raw JSON with an
//! explicit stack and rejects payloads that exceed the configured depth or
//! leaf count.

use serde_json::Value;
use tracing::trace;

use crate::error::{SearchError, SearchResult, render_expression};

use super::ast::{FilterExpr, Leaf, SortDirection, SortKey};
use super::relation::Comparison;

/// Nesting depth and leaf count of a raw filter value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Complexity {
    /// Deepest nesting; a bare leaf has depth 1.
    pub depth: usize,
    /// Number of leaf positions.
    pub leaves: usize,
}

/// Measures a raw filter without recursion.
pub fn measure(filter: &Value) -> Complexity {
    let mut complexity = Complexity::default();
    let mut stack: Vec<(&Value, usize)> = vec![(filter, 1)];

    while let Some((node, depth)) = stack.pop() {
        complexity.depth = complexity.depth.max(depth);
        match boolean_parts(node) {
            Some(("not", child)) => stack.push((child, depth + 1)),
            Some((_, Value::Array(children))) => {
                stack.extend(children.iter().map(|c| (c, depth + 1)));
            }
            _ => complexity.leaves += 1,
        }
    }

    complexity
}

/// Splits `["not"|"and"|"or", x]` into its operator and argument.
fn boolean_parts(node: &Value) -> Option<(&str, &Value)> {
    match node.as_array().map(Vec::as_slice) {
        Some([Value::String(op), arg]) if matches!(op.as_str(), "not" | "and" | "or") => {
            Some((op.as_str(), arg))
        }
        _ => None,
    }
}

/// Parses filter expressions within fixed complexity bounds.
#[derive(Debug, Clone, Copy)]
pub struct FilterParser {
    max_depth: usize,
    max_leaves: usize,
}

impl FilterParser {
    /// Creates a parser with the given bounds.
    pub fn new(max_depth: usize, max_leaves: usize) -> Self {
        Self {
            max_depth,
            max_leaves,
        }
    }

    /// Parses a complete filter expression.
    pub fn parse(&self, filter: &Value) -> SearchResult<FilterExpr> {
        let complexity = measure(filter);
        if complexity.depth > self.max_depth || complexity.leaves > self.max_leaves {
            return Err(SearchError::ExpressionTooComplex {
                depth: complexity.depth,
                leaves: complexity.leaves,
                max_depth: self.max_depth,
                max_leaves: self.max_leaves,
            });
        }
        trace!(
            depth = complexity.depth,
            leaves = complexity.leaves,
            "Parsing filter"
        );
        self.parse_node(filter, 1)
    }

    fn parse_node(&self, node: &Value, depth: usize) -> SearchResult<FilterExpr> {
        if depth > self.max_depth {
            return Err(SearchError::ExpressionTooComplex {
                depth,
                leaves: 0,
                max_depth: self.max_depth,
                max_leaves: self.max_leaves,
            });
        }

        let items = node
            .as_array()
            .ok_or_else(|| malformed(node, "expected a JSON array"))?;

        if let Some((op, arg)) = boolean_parts(node) {
            return match op {
                "not" => Ok(FilterExpr::Not {
                    child: Box::new(self.parse_node(arg, depth + 1)?),
                }),
                _ => {
                    let children = self.parse_children(node, arg, depth)?;
                    Ok(if op == "and" {
                        FilterExpr::And { children }
                    } else {
                        FilterExpr::Or { children }
                    })
                }
            };
        }

        match items.len() {
            0 => Err(malformed(node, "empty expression")),
            2 => Err(malformed(
                node,
                "two-element expressions must start with \"not\", \"and\" or \"or\"",
            )),
            4 | 5 => parse_leaf(node, items),
            n if n >= 6 && items[..n - 2].iter().all(Value::is_string) => {
                parse_leaf(node, items)
            }
            n => Err(SearchError::InvalidLeafArity {
                expression: render_expression(node),
                arity: n,
            }),
        }
    }

    fn parse_children(
        &self,
        node: &Value,
        arg: &Value,
        depth: usize,
    ) -> SearchResult<Vec<FilterExpr>> {
        let children = arg
            .as_array()
            .ok_or_else(|| malformed(node, "\"and\" and \"or\" take an array of expressions"))?;
        if children.is_empty() {
            return Err(malformed(node, "\"and\" and \"or\" need at least one expression"));
        }
        children
            .iter()
            .map(|child| self.parse_node(child, depth + 1))
            .collect()
    }
}

fn parse_leaf(node: &Value, items: &[Value]) -> SearchResult<FilterExpr> {
    let (path_items, rest) = items.split_at(items.len() - 2);

    let mut path = Vec::with_capacity(path_items.len());
    for item in path_items {
        match item {
            Value::String(s) => path.push(s.clone()),
            _ => return Err(malformed(node, "entity and attribute names must be strings")),
        }
    }

    let token = rest[0]
        .as_str()
        .ok_or_else(|| malformed(node, "the relation must be a string"))?;
    let comparison = Comparison::from_token(token).ok_or_else(|| SearchError::UnknownRelation {
        relation: token.to_string(),
        expression: render_expression(node),
    })?;

    Ok(FilterExpr::Leaf(Leaf {
        path,
        comparison,
        operand: rest[1].clone(),
        source: node.clone(),
    }))
}

fn malformed(node: &Value, reason: &str) -> SearchError {
    SearchError::MalformedExpression {
        expression: render_expression(node),
        reason: reason.to_string(),
    }
}

/// Parses `query.orderBy`: one key or an array of keys.
///
/// A key is `[entity, attribute, direction]`, or `[entity, attribute]` which
/// sorts ascending. `null` and `[]` mean no ordering.
pub fn parse_order_by(order_by: &Value) -> SearchResult<Vec<SortKey>> {
    match order_by {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) if items.is_empty() => Ok(Vec::new()),
        Value::Array(items) if items[0].is_string() => Ok(vec![parse_sort_key(order_by)?]),
        Value::Array(items) => items.iter().map(parse_sort_key).collect(),
        _ => Err(malformed(order_by, "orderBy must be an array")),
    }
}

fn parse_sort_key(key: &Value) -> SearchResult<SortKey> {
    let items = key
        .as_array()
        .ok_or_else(|| malformed(key, "order-by keys must be arrays"))?;
    if !(2..=3).contains(&items.len()) {
        return Err(malformed(
            key,
            "order-by keys take the form [entity, attribute, direction]",
        ));
    }

    let strings: Option<Vec<&str>> = items.iter().map(Value::as_str).collect();
    let strings = strings.ok_or_else(|| malformed(key, "order-by keys must contain strings"))?;

    let direction = match strings.get(2) {
        None => SortDirection::Asc,
        Some(d) => {
            SortDirection::parse(d).ok_or_else(|| SearchError::InvalidSortDirection {
                direction: d.to_string(),
                expression: render_expression(key),
            })?
        }
    };

    Ok(SortKey {
        entity: strings[0].to_string(),
        attribute: strings[1].to_string(),
        direction,
        source: key.clone(),
    })
}
