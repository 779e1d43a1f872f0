//! Schema Registry.
//!
//! The registry holds the searchable entities of the data store, indexed by
//! entity name. It is built once at startup through [`SchemaRegistryBuilder`],
//! which checks the structural invariants the compiler relies on, and is never
//! mutated afterwards. Share it between compilations behind an `Arc`.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::RegistryError;

use super::types::{Cardinality, ScalarType};

/// A scalar attribute of an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeDef {
    /// Attribute name, also the column name in the entity's table.
    pub name: String,
    /// The attribute's value type.
    #[serde(rename = "type")]
    pub scalar_type: ScalarType,
}

impl AttributeDef {
    /// Creates a new attribute definition.
    pub fn new(name: impl Into<String>, scalar_type: ScalarType) -> Self {
        Self {
            name: name.into(),
            scalar_type,
        }
    }
}

/// How a relation is stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum JoinKey {
    /// The source table holds a column referencing the target's primary key.
    ForeignKey { column: String },
    /// The target table holds a column referencing the source's primary key.
    Reverse { column: String },
    /// An association table links source and target primary keys.
    Association {
        table: String,
        #[serde(rename = "sourceColumn")]
        source_column: String,
        #[serde(rename = "targetColumn")]
        target_column: String,
    },
}

/// A named association from one entity to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationDef {
    /// Relation name as used in filter expressions (e.g. `enterer`, `files`).
    pub name: String,
    /// Whether the relation points at one or many rows.
    #[serde(rename = "kind")]
    pub cardinality: Cardinality,
    /// Name of the target entity.
    pub target: String,
    /// Marks this relation as the implicit route to its target entity.
    #[serde(default)]
    pub default_traversal: bool,
    /// Entity alias the default traversal answers to instead of the target
    /// name (`memorizers` is the route to `Memorizer`, not to `User`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_alias: Option<String>,
    /// Storage of the association.
    pub join: JoinKey,
}

impl RelationDef {
    /// A many-to-one relation stored as a foreign key column on the source.
    pub fn to_one(
        name: impl Into<String>,
        target: impl Into<String>,
        column: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            cardinality: Cardinality::ToOne,
            target: target.into(),
            default_traversal: false,
            default_alias: None,
            join: JoinKey::ForeignKey {
                column: column.into(),
            },
        }
    }

    /// A one-to-many relation stored as a back-reference column on the target.
    pub fn to_many(
        name: impl Into<String>,
        target: impl Into<String>,
        column: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            cardinality: Cardinality::ToMany,
            target: target.into(),
            default_traversal: false,
            default_alias: None,
            join: JoinKey::Reverse {
                column: column.into(),
            },
        }
    }

    /// A many-to-many relation stored in an association table.
    pub fn many_to_many(
        name: impl Into<String>,
        target: impl Into<String>,
        table: impl Into<String>,
        source_column: impl Into<String>,
        target_column: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            cardinality: Cardinality::ToMany,
            target: target.into(),
            default_traversal: false,
            default_alias: None,
            join: JoinKey::Association {
                table: table.into(),
                source_column: source_column.into(),
                target_column: target_column.into(),
            },
        }
    }

    /// Marks this relation as the default traversal to its target.
    pub fn as_default(mut self) -> Self {
        self.default_traversal = true;
        self
    }

    /// Marks this relation as the default traversal to the entity alias
    /// `alias`, which must name the relation's target.
    pub fn as_default_for(mut self, alias: impl Into<String>) -> Self {
        self.default_traversal = true;
        self.default_alias = Some(alias.into());
        self
    }

    /// The entity or alias name an implicit path uses to reach this relation.
    pub fn default_key(&self) -> &str {
        self.default_alias.as_deref().unwrap_or(&self.target)
    }

    /// Returns true if the relation can point at many rows.
    pub fn is_to_many(&self) -> bool {
        self.cardinality == Cardinality::ToMany
    }
}

fn default_primary_key() -> String {
    "id".to_string()
}

fn default_searchable() -> bool {
    true
}

/// Definition of one entity (record type).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityDef {
    name: String,
    #[serde(default)]
    table: String,
    #[serde(default = "default_primary_key")]
    primary_key: String,
    #[serde(default = "default_searchable")]
    searchable: bool,
    #[serde(default)]
    attributes: Vec<AttributeDef>,
    #[serde(default)]
    relations: Vec<RelationDef>,
}

impl EntityDef {
    /// Creates a searchable entity with an `id` primary key and a table named
    /// after the entity.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            table: table_name_for(&name),
            name,
            primary_key: default_primary_key(),
            searchable: true,
            attributes: Vec::new(),
            relations: Vec::new(),
        }
    }

    /// Overrides the table name.
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    /// Overrides the primary key attribute.
    pub fn with_primary_key(mut self, primary_key: impl Into<String>) -> Self {
        self.primary_key = primary_key.into();
        self
    }

    /// Excludes the entity from searches. It can still be a relation target.
    pub fn not_searchable(mut self) -> Self {
        self.searchable = false;
        self
    }

    /// Adds a scalar attribute.
    pub fn with_attribute(mut self, name: impl Into<String>, scalar_type: ScalarType) -> Self {
        self.attributes.push(AttributeDef::new(name, scalar_type));
        self
    }

    /// Adds a relation.
    pub fn with_relation(mut self, relation: RelationDef) -> Self {
        self.relations.push(relation);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    pub fn is_searchable(&self) -> bool {
        self.searchable
    }

    pub fn attributes(&self) -> &[AttributeDef] {
        &self.attributes
    }

    pub fn relations(&self) -> &[RelationDef] {
        &self.relations
    }

    /// Looks up a scalar attribute by name.
    pub fn attribute(&self, name: &str) -> Option<&AttributeDef> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Looks up a relation by name.
    pub fn relation(&self, name: &str) -> Option<&RelationDef> {
        self.relations.iter().find(|r| r.name == name)
    }

    /// Returns the primary key attribute.
    pub fn primary_key_attribute(&self) -> Option<&AttributeDef> {
        self.attribute(&self.primary_key)
    }

    /// Returns all relations landing on `target`.
    pub fn relations_to<'a>(&'a self, target: &'a str) -> impl Iterator<Item = &'a RelationDef> {
        self.relations.iter().filter(move |r| r.target == target)
    }

    /// Returns the relation marked as the default route to `name`, an entity
    /// or entity alias.
    pub fn default_traversal_to(&self, name: &str) -> Option<&RelationDef> {
        self.relations
            .iter()
            .find(|r| r.default_traversal && r.default_key() == name)
    }
}

/// A second name for an entity, as used in filter expressions.
///
/// An alias only reaches its entity through a default traversal keyed on the
/// alias name, and may narrow the searchable attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityAlias {
    /// Name used in filter expressions (e.g. `Memorizer`).
    pub name: String,
    /// The aliased entity (e.g. `User`).
    pub entity: String,
    /// Attributes searchable through the alias. `None` allows all of them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Vec<String>>,
}

impl EntityAlias {
    /// Creates an alias exposing every attribute of `entity`.
    pub fn new(name: impl Into<String>, entity: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entity: entity.into(),
            attributes: None,
        }
    }

    /// Restricts the attributes searchable through the alias.
    pub fn with_attributes<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes = Some(attributes.into_iter().map(Into::into).collect());
        self
    }

    /// Returns true if `attribute` may be searched through the alias.
    pub fn allows(&self, attribute: &str) -> bool {
        self.attributes
            .as_ref()
            .is_none_or(|names| names.iter().any(|n| n == attribute))
    }
}

/// Derives a table name from an entity name (`SyntacticCategory` -> `syntactic_category`).
pub fn table_name_for(entity: &str) -> String {
    let mut table = String::with_capacity(entity.len() + 4);
    let mut prev_lower = false;
    for c in entity.chars() {
        if c.is_uppercase() {
            if prev_lower {
                table.push('_');
            }
            table.extend(c.to_lowercase());
            prev_lower = false;
        } else {
            table.push(c);
            prev_lower = c.is_lowercase() || c.is_ascii_digit();
        }
    }
    table
}

/// Immutable registry of entity definitions.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    entities: BTreeMap<String, EntityDef>,
    aliases: BTreeMap<String, EntityAlias>,
}

impl SchemaRegistry {
    /// Starts building a registry.
    pub fn builder() -> SchemaRegistryBuilder {
        SchemaRegistryBuilder::default()
    }

    /// Returns the number of registered entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns true if no entity is registered.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Looks up any registered entity, searchable or not.
    pub fn entity(&self, name: &str) -> Option<&EntityDef> {
        self.entities.get(name)
    }

    /// Looks up an entity that may appear in filter expressions.
    pub fn searchable_entity(&self, name: &str) -> Option<&EntityDef> {
        self.entities.get(name).filter(|e| e.is_searchable())
    }

    /// Looks up an entity alias.
    pub fn alias(&self, name: &str) -> Option<&EntityAlias> {
        self.aliases.get(name)
    }

    /// Looks up `name` as an entity, then as an alias. The alias, if any, is
    /// returned with the entity it stands for.
    pub fn entity_or_alias(&self, name: &str) -> Option<(&EntityDef, Option<&EntityAlias>)> {
        if let Some(entity) = self.entities.get(name) {
            return Some((entity, None));
        }
        let alias = self.aliases.get(name)?;
        self.entities.get(&alias.entity).map(|e| (e, Some(alias)))
    }

    /// Like [`entity_or_alias`](Self::entity_or_alias), but only for
    /// searchable entities.
    pub fn searchable_entity_or_alias(
        &self,
        name: &str,
    ) -> Option<(&EntityDef, Option<&EntityAlias>)> {
        self.entity_or_alias(name).filter(|(e, _)| e.is_searchable())
    }

    /// Iterates all entities in name order.
    pub fn entities(&self) -> impl Iterator<Item = &EntityDef> {
        self.entities.values()
    }

    /// Iterates all entity aliases in name order.
    pub fn aliases(&self) -> impl Iterator<Item = &EntityAlias> {
        self.aliases.values()
    }

    /// Returns the names of all searchable entities in name order.
    pub fn searchable_entity_names(&self) -> Vec<&str> {
        self.entities
            .values()
            .filter(|e| e.is_searchable())
            .map(|e| e.name())
            .collect()
    }
}

/// Collects entity definitions and validates them into a [`SchemaRegistry`].
#[derive(Debug, Default)]
pub struct SchemaRegistryBuilder {
    entities: Vec<EntityDef>,
    aliases: Vec<EntityAlias>,
}

impl SchemaRegistryBuilder {
    /// Adds an entity.
    pub fn entity(mut self, entity: EntityDef) -> Self {
        self.entities.push(entity);
        self
    }

    /// Adds several entities.
    pub fn entities<I>(mut self, entities: I) -> Self
    where
        I: IntoIterator<Item = EntityDef>,
    {
        self.entities.extend(entities);
        self
    }

    /// Adds an entity alias.
    pub fn alias(mut self, alias: EntityAlias) -> Self {
        self.aliases.push(alias);
        self
    }

    /// Adds several entity aliases.
    pub fn aliases<I>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = EntityAlias>,
    {
        self.aliases.extend(aliases);
        self
    }

    /// Validates the collected definitions and freezes them.
    pub fn build(self) -> Result<SchemaRegistry, RegistryError> {
        let mut entities = BTreeMap::new();

        for mut entity in self.entities {
            if entity.table.is_empty() {
                entity.table = table_name_for(&entity.name);
            }
            check_names(&entity)?;
            if entity.primary_key_attribute().is_none() {
                return Err(RegistryError::MissingPrimaryKey {
                    entity: entity.name.clone(),
                    primary_key: entity.primary_key.clone(),
                });
            }
            if entities.contains_key(&entity.name) {
                return Err(RegistryError::DuplicateEntity {
                    entity: entity.name.clone(),
                });
            }
            entities.insert(entity.name.clone(), entity);
        }

        let mut aliases = BTreeMap::new();
        for alias in self.aliases {
            check_alias(&alias, &entities)?;
            if aliases.contains_key(&alias.name) {
                return Err(RegistryError::InvalidAlias {
                    alias: alias.name.clone(),
                    message: "alias is registered twice".to_string(),
                });
            }
            aliases.insert(alias.name.clone(), alias);
        }

        for entity in entities.values() {
            check_relations(entity, &entities, &aliases)?;
        }

        debug!(
            entities = entities.len(),
            aliases = aliases.len(),
            "Schema registry built"
        );
        Ok(SchemaRegistry { entities, aliases })
    }
}

fn check_names(entity: &EntityDef) -> Result<(), RegistryError> {
    let mut seen = HashSet::new();
    let names = entity
        .attributes
        .iter()
        .map(|a| &a.name)
        .chain(entity.relations.iter().map(|r| &r.name));
    for name in names {
        if !seen.insert(name.as_str()) {
            return Err(RegistryError::DuplicateName {
                entity: entity.name.clone(),
                name: name.clone(),
            });
        }
    }
    Ok(())
}

fn check_alias(
    alias: &EntityAlias,
    entities: &BTreeMap<String, EntityDef>,
) -> Result<(), RegistryError> {
    let invalid = |message: String| RegistryError::InvalidAlias {
        alias: alias.name.clone(),
        message,
    };

    if entities.contains_key(&alias.name) {
        return Err(invalid("an entity already has this name".to_string()));
    }
    let entity = entities
        .get(&alias.entity)
        .ok_or_else(|| invalid(format!("unknown entity {}", alias.entity)))?;
    if let Some(names) = &alias.attributes {
        if let Some(missing) = names.iter().find(|n| entity.attribute(n).is_none()) {
            return Err(invalid(format!("{} has no attribute {}", entity.name, missing)));
        }
    }
    Ok(())
}

fn check_relations(
    entity: &EntityDef,
    entities: &BTreeMap<String, EntityDef>,
    aliases: &BTreeMap<String, EntityAlias>,
) -> Result<(), RegistryError> {
    let mut defaults: HashMap<&str, Vec<String>> = HashMap::new();

    for relation in &entity.relations {
        if !entities.contains_key(&relation.target) {
            return Err(RegistryError::DanglingTarget {
                entity: entity.name.clone(),
                relation: relation.name.clone(),
                target: relation.target.clone(),
            });
        }

        let mismatch = match (&relation.cardinality, &relation.join) {
            (Cardinality::ToOne, JoinKey::ForeignKey { .. }) => None,
            (Cardinality::ToOne, _) => Some("to-one relations must use a foreign key"),
            (Cardinality::ToMany, JoinKey::ForeignKey { .. }) => {
                Some("to-many relations must use a reverse column or an association table")
            }
            (Cardinality::ToMany, _) => None,
        };
        if let Some(message) = mismatch {
            return Err(RegistryError::InvalidJoinKey {
                entity: entity.name.clone(),
                relation: relation.name.clone(),
                message: message.to_string(),
            });
        }

        if let Some(name) = &relation.default_alias {
            if aliases.get(name).is_none_or(|a| a.entity != relation.target) {
                return Err(RegistryError::InvalidAlias {
                    alias: name.clone(),
                    message: format!(
                        "{}.{} is a default traversal to {}, which is not an alias of {}",
                        entity.name, relation.name, name, relation.target
                    ),
                });
            }
        }

        if relation.default_traversal {
            defaults
                .entry(relation.default_key())
                .or_default()
                .push(relation.name.clone());
        }
    }

    if let Some((target, relations)) = defaults.into_iter().find(|(_, r)| r.len() > 1) {
        return Err(RegistryError::MultipleDefaultTraversals {
            entity: entity.name.clone(),
            target: target.to_string(),
            relations,
        });
    }

    Ok(())
}
