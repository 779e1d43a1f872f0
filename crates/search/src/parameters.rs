//! Search parameters: what a client may search an entity on.

use serde::Serialize;

use crate::filter::{RelationTableEntry, relation_table};
use crate::schema::{AttributeDef, Cardinality, EntityDef};

/// A relation as reported to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationSummary {
    pub name: String,
    pub kind: Cardinality,
    pub target: String,
    pub default_traversal: bool,
    /// Entity alias an implicit path names to take this relation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_alias: Option<String>,
}

/// Attributes, relations and relation tokens available for one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParameters {
    pub entity: String,
    pub attributes: Vec<AttributeDef>,
    pub relations: Vec<RelationSummary>,
    pub relation_table: Vec<RelationTableEntry>,
}

impl SearchParameters {
    pub(crate) fn for_entity(entity: &EntityDef) -> Self {
        Self {
            entity: entity.name().to_string(),
            attributes: entity.attributes().to_vec(),
            relations: entity
                .relations()
                .iter()
                .map(|r| RelationSummary {
                    name: r.name.clone(),
                    kind: r.cardinality,
                    target: r.target.clone(),
                    default_traversal: r.default_traversal,
                    default_alias: r.default_alias.clone(),
                })
                .collect(),
            relation_table: relation_table(),
        }
    }
}
