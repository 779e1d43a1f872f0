//! Order-By Compiler.

use serde::{Deserialize, Serialize};

use crate::error::{SearchError, SearchResult, render_expression};
use crate::filter::{SortDirection, SortKey};
use crate::schema::{EntityDef, SchemaRegistry};

use super::joins::AliasId;
use super::predicate::ColumnRef;

/// One compiled sort key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSpec {
    pub column: ColumnRef,
    pub direction: SortDirection,
    /// Strings sort without regard to case.
    pub case_insensitive: bool,
}

/// Compiles sort keys against the root entity.
///
/// Keys are kept in the order given. The root primary key is appended
/// ascending unless a key already sorts on it, so that every ordering is
/// total and pages never overlap.
pub fn compile_order_by(
    registry: &SchemaRegistry,
    root: &EntityDef,
    keys: &[SortKey],
) -> SearchResult<Vec<OrderSpec>> {
    let mut specs = Vec::with_capacity(keys.len() + 1);

    for key in keys {
        if registry.searchable_entity(&key.entity).is_none() {
            return Err(SearchError::UnknownEntity {
                entity: key.entity.clone(),
                expression: render_expression(&key.source),
            });
        }

        let attribute = (key.entity == root.name())
            .then(|| root.attribute(&key.attribute))
            .flatten()
            .ok_or_else(|| SearchError::UnknownAttribute {
                entity: key.entity.clone(),
                attribute: key.attribute.clone(),
                expression: render_expression(&key.source),
            })?;

        specs.push(OrderSpec {
            column: ColumnRef::new(AliasId::ROOT, attribute.name.clone()),
            direction: key.direction,
            case_insensitive: attribute.scalar_type.is_textual(),
        });
    }

    let has_primary_key = specs
        .iter()
        .any(|s| s.column.attribute == root.primary_key());
    if !has_primary_key {
        let textual = root
            .primary_key_attribute()
            .is_some_and(|a| a.scalar_type.is_textual());
        specs.push(OrderSpec {
            column: ColumnRef::new(AliasId::ROOT, root.primary_key()),
            direction: SortDirection::Asc,
            case_insensitive: textual,
        });
    }

    Ok(specs)
}
