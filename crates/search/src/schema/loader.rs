//! Schema document loader.
//!
//! Loads entity definitions from a JSON document of the form:
//!
//! ```json
//! {
//!   "entities": [
//!     {
//!       "name": "Form",
//!       "attributes": [{"name": "id", "type": "integer"}],
//!       "relations": [
//!         {"name": "enterer", "kind": "to-one", "target": "User",
//!          "join": {"foreignKey": {"column": "enterer_id"}}}
//!       ]
//!     }
//!   ],
//!   "aliases": [
//!     {"name": "Memorizer", "entity": "User", "attributes": ["id", "first_name"]}
//!   ]
//! }
//! ```
//!
//! `aliases` may be omitted.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::RegistryError;

use super::registry::{EntityAlias, EntityDef, SchemaRegistry};

/// A serialized schema: the entity list that seeds a [`SchemaRegistry`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDocument {
    /// Entity definitions, in any order.
    pub entities: Vec<EntityDef>,
    /// Entity aliases, in any order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<EntityAlias>,
}

impl SchemaDocument {
    /// Parses a schema document from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, RegistryError> {
        Self::parse(json, "<string>")
    }

    /// Reads and parses a schema document from a file.
    pub fn from_path(path: &Path) -> Result<Self, RegistryError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| RegistryError::DocumentLoadFailed {
                source_name: path.display().to_string(),
                message: e.to_string(),
            })?;
        Self::parse(&content, &path.display().to_string())
    }

    fn parse(json: &str, source_name: &str) -> Result<Self, RegistryError> {
        serde_json::from_str(json).map_err(|e| RegistryError::DocumentLoadFailed {
            source_name: source_name.to_string(),
            message: format!("Invalid schema document: {}", e),
        })
    }

    /// Validates the document and builds the registry.
    pub fn into_registry(self) -> Result<SchemaRegistry, RegistryError> {
        SchemaRegistry::builder()
            .entities(self.entities)
            .aliases(self.aliases)
            .build()
    }
}

impl From<&SchemaRegistry> for SchemaDocument {
    fn from(registry: &SchemaRegistry) -> Self {
        Self {
            entities: registry.entities().cloned().collect(),
            aliases: registry.aliases().cloned().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Cardinality, JoinKey};

    const DOC: &str = r#"{
        "entities": [
            {
                "name": "User",
                "attributes": [{"name": "id", "type": "integer"}]
            },
            {
                "name": "SyntacticCategory",
                "attributes": [
                    {"name": "id", "type": "integer"},
                    {"name": "name", "type": "string"}
                ],
                "relations": [
                    {"name": "enterer", "kind": "to-one", "target": "User",
                     "defaultTraversal": true,
                     "join": {"foreignKey": {"column": "enterer_id"}}}
                ]
            }
        ]
    }"#;

    #[test]
    fn test_parse_document() {
        let doc = SchemaDocument::from_json_str(DOC).unwrap();
        assert_eq!(doc.entities.len(), 2);

        let registry = doc.into_registry().unwrap();
        let category = registry.entity("SyntacticCategory").unwrap();
        assert_eq!(category.table(), "syntactic_category");
        assert_eq!(category.primary_key(), "id");
        assert!(category.is_searchable());

        let enterer = category.relation("enterer").unwrap();
        assert_eq!(enterer.cardinality, Cardinality::ToOne);
        assert!(enterer.default_traversal);
        assert_eq!(
            enterer.join,
            JoinKey::ForeignKey {
                column: "enterer_id".to_string()
            }
        );
    }

    #[test]
    fn test_aliases_and_default_alias() {
        let doc = r#"{
            "entities": [
                {"name": "User", "attributes": [
                    {"name": "id", "type": "integer"},
                    {"name": "email", "type": "string"}
                ]},
                {"name": "Form", "attributes": [{"name": "id", "type": "integer"}],
                 "relations": [
                    {"name": "memorizers", "kind": "to-many", "target": "User",
                     "defaultTraversal": true, "defaultAlias": "Memorizer",
                     "join": {"association": {"table": "userform",
                        "sourceColumn": "form_id", "targetColumn": "user_id"}}}
                 ]}
            ],
            "aliases": [{"name": "Memorizer", "entity": "User", "attributes": ["id"]}]
        }"#;
        let registry = SchemaDocument::from_json_str(doc)
            .unwrap()
            .into_registry()
            .unwrap();

        let alias = registry.alias("Memorizer").unwrap();
        assert_eq!(alias.entity, "User");
        assert!(!alias.allows("email"));
        let form = registry.entity("Form").unwrap();
        assert_eq!(form.default_traversal_to("Memorizer").unwrap().name, "memorizers");

        let reloaded = SchemaDocument::from(&registry).into_registry().unwrap();
        assert_eq!(reloaded.alias("Memorizer"), Some(alias));
    }

    #[test]
    fn test_invalid_json() {
        let err = SchemaDocument::from_json_str("{\"entities\": 3}").unwrap_err();
        assert!(matches!(err, RegistryError::DocumentLoadFailed { .. }));
    }

    #[test]
    fn test_missing_file() {
        let err = SchemaDocument::from_path(Path::new("/nonexistent/schema.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/schema.json"));
    }

    #[test]
    fn test_round_trip_through_registry() {
        let registry = SchemaDocument::from_json_str(DOC)
            .unwrap()
            .into_registry()
            .unwrap();
        let doc = SchemaDocument::from(&registry);
        let json = serde_json::to_string(&doc).unwrap();
        let reloaded = SchemaDocument::from_json_str(&json)
            .unwrap()
            .into_registry()
            .unwrap();
        assert_eq!(reloaded.len(), registry.len());
    }
}
