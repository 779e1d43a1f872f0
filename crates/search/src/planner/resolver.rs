//! Attribute/Relation Resolver.
//!
//! Resolves each leaf's entity path against the schema registry and converts
//! its operand to a typed value. A resolved leaf either compares a scalar
//! attribute (on the root entity, or on the target of one relation hop) or
//! checks whether a relation has any associated row.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use unicode_normalization::UnicodeNormalization;

use crate::error::{SearchError, SearchResult, render_expression};
use crate::filter::{Comparison, FilterExpr, Leaf};
use crate::schema::{
    AttributeDef, EntityAlias, EntityDef, RelationDef, ScalarType, SchemaRegistry,
};

/// Relation hops a leaf path may take.
pub const MAX_TRAVERSAL_DEPTH: usize = 1;

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// A typed operand value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum ScalarValue {
    Null,
    Integer(i64),
    Float(f64),
    String(String),
    Boolean(bool),
    Date(NaiveDate),
    Datetime(NaiveDateTime),
}

impl ScalarValue {
    pub fn is_null(&self) -> bool {
        matches!(self, ScalarValue::Null)
    }
}

/// A converted operand: one value, or the list of an `in` comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Single(ScalarValue),
    List(Vec<ScalarValue>),
}

/// One relation hop from `source`.
#[derive(Debug, Clone, PartialEq)]
pub struct Traversal {
    pub source: String,
    pub relation: RelationDef,
}

/// A leaf bound to the schema.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedLeaf {
    /// Compares a scalar attribute of the root, or of the target of `via`.
    Scalar {
        via: Option<Traversal>,
        entity: String,
        attribute: String,
        comparison: Comparison,
        operand: Operand,
    },
    /// Checks for associated rows: `exists` is false for `= null`.
    Presence { traversal: Traversal, exists: bool },
}

/// The filter AST with every leaf resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedExpr {
    Leaf(ResolvedLeaf),
    Not(Box<ResolvedExpr>),
    And(Vec<ResolvedExpr>),
    Or(Vec<ResolvedExpr>),
}

/// Resolves filter ASTs for one root entity.
pub struct Resolver<'a> {
    registry: &'a SchemaRegistry,
    root: &'a EntityDef,
    normalize_strings: bool,
}

impl<'a> Resolver<'a> {
    /// Creates a resolver for searches over `root`.
    pub fn new(registry: &'a SchemaRegistry, root: &'a EntityDef, normalize_strings: bool) -> Self {
        Self {
            registry,
            root,
            normalize_strings,
        }
    }

    /// Resolves every leaf of `expr`.
    pub fn resolve(&self, expr: &FilterExpr) -> SearchResult<ResolvedExpr> {
        match expr {
            FilterExpr::Leaf(leaf) => self.resolve_leaf(leaf).map(ResolvedExpr::Leaf),
            FilterExpr::Not { child } => Ok(ResolvedExpr::Not(Box::new(self.resolve(child)?))),
            FilterExpr::And { children } => children
                .iter()
                .map(|c| self.resolve(c))
                .collect::<SearchResult<Vec<_>>>()
                .map(ResolvedExpr::And),
            FilterExpr::Or { children } => children
                .iter()
                .map(|c| self.resolve(c))
                .collect::<SearchResult<Vec<_>>>()
                .map(ResolvedExpr::Or),
        }
    }

    fn resolve_leaf(&self, leaf: &Leaf) -> SearchResult<ResolvedLeaf> {
        if leaf.hops() > MAX_TRAVERSAL_DEPTH {
            return Err(too_deep(leaf, leaf.hops()));
        }

        let (entity, alias) = self
            .registry
            .searchable_entity_or_alias(leaf.entity())
            .ok_or_else(|| SearchError::UnknownEntity {
                entity: leaf.entity().to_string(),
                expression: render_expression(&leaf.source),
            })?;
        // Aliases never share a name with an entity, so only the literal root
        // name addresses the root.
        let is_root = leaf.entity() == self.root.name();

        match leaf.path.as_slice() {
            [_, name] if is_root => self.resolve_root_name(leaf, name),
            [_, attribute] => self.resolve_via_default(leaf, entity, alias, attribute),
            [_, relation, attribute] => {
                if !is_root {
                    return Err(too_deep(leaf, 2));
                }
                self.resolve_explicit_hop(leaf, relation, attribute)
            }
            _ => Err(SearchError::MalformedExpression {
                expression: render_expression(&leaf.source),
                reason: "leaf path is too short".to_string(),
            }),
        }
    }

    /// `[Root, name, rel, val]`: attribute, relation, or implicit entity.
    fn resolve_root_name(&self, leaf: &Leaf, name: &str) -> SearchResult<ResolvedLeaf> {
        let root = self.root;

        if let Some(attribute) = root.attribute(name) {
            return self.scalar(leaf, None, root, attribute);
        }

        if let Some(relation) = root.relation(name) {
            return presence(leaf, root, relation);
        }

        if let Some((target, alias)) = self.registry.entity_or_alias(name) {
            let relation = self.default_traversal(leaf, name)?;
            let pk = target
                .primary_key_attribute()
                .filter(|pk| alias.is_none_or(|a| a.allows(&pk.name)))
                .ok_or_else(|| unknown_attribute(leaf, name, target.primary_key()))?;
            return self.scalar(leaf, Some(relation), target, pk);
        }

        Err(unknown_attribute(leaf, root.name(), name))
    }

    /// `[Other, attribute, rel, val]`: reached through the root's default
    /// traversal to `Other`, an entity or an entity alias.
    fn resolve_via_default(
        &self,
        leaf: &Leaf,
        entity: &EntityDef,
        alias: Option<&EntityAlias>,
        name: &str,
    ) -> SearchResult<ResolvedLeaf> {
        let relation = self.default_traversal(leaf, leaf.entity())?;

        if let Some(alias) = alias {
            if !alias.allows(name) {
                return Err(unknown_attribute(leaf, &alias.name, name));
            }
        }
        if let Some(attribute) = entity.attribute(name) {
            return self.scalar(leaf, Some(relation), entity, attribute);
        }
        if entity.relation(name).is_some() {
            return Err(too_deep(leaf, 2));
        }
        Err(unknown_attribute(leaf, leaf.entity(), name))
    }

    /// `[Root, relation, attribute, rel, val]`.
    fn resolve_explicit_hop(
        &self,
        leaf: &Leaf,
        relation_name: &str,
        name: &str,
    ) -> SearchResult<ResolvedLeaf> {
        let relation =
            self.root
                .relation(relation_name)
                .ok_or_else(|| SearchError::UnknownRelationName {
                    entity: self.root.name().to_string(),
                    relation: relation_name.to_string(),
                    expression: render_expression(&leaf.source),
                })?;
        let target = self.registry.entity(&relation.target).ok_or_else(|| {
            SearchError::UnknownEntity {
                entity: relation.target.clone(),
                expression: render_expression(&leaf.source),
            }
        })?;

        if let Some(attribute) = target.attribute(name) {
            return self.scalar(leaf, Some(relation), target, attribute);
        }
        if target.relation(name).is_some() {
            return Err(too_deep(leaf, 2));
        }
        Err(unknown_attribute(leaf, target.name(), name))
    }

    /// The root's default relation to `name`, an entity or entity alias.
    fn default_traversal(&self, leaf: &Leaf, name: &str) -> SearchResult<&'a RelationDef> {
        let root = self.root;
        root.default_traversal_to(name).ok_or_else(|| {
            let target = self.registry.alias(name).map_or(name, |a| a.entity.as_str());
            SearchError::AmbiguousImplicitRelation {
                entity: root.name().to_string(),
                target: name.to_string(),
                candidates: root.relations_to(target).count(),
                expression: render_expression(&leaf.source),
            }
        })
    }

    fn scalar(
        &self,
        leaf: &Leaf,
        via: Option<&RelationDef>,
        entity: &EntityDef,
        attribute: &AttributeDef,
    ) -> SearchResult<ResolvedLeaf> {
        let comparison = leaf.comparison;
        if !comparison.accepts(attribute.scalar_type) {
            return Err(SearchError::RelationTypeMismatch {
                entity: entity.name().to_string(),
                attribute: attribute.name.clone(),
                relation: comparison.symbol().to_string(),
                scalar_type: attribute.scalar_type.to_string(),
                expression: render_expression(&leaf.source),
            });
        }

        let converter = OperandConverter {
            leaf,
            entity,
            attribute,
            normalize_strings: self.normalize_strings,
        };
        let operand = converter.convert()?;

        Ok(ResolvedLeaf::Scalar {
            via: via.map(|relation| Traversal {
                source: self.root.name().to_string(),
                relation: relation.clone(),
            }),
            entity: entity.name().to_string(),
            attribute: attribute.name.clone(),
            comparison,
            operand,
        })
    }
}

/// `[E, relation, =|!=, null]`.
fn presence(leaf: &Leaf, entity: &EntityDef, relation: &RelationDef) -> SearchResult<ResolvedLeaf> {
    if !leaf.comparison.is_equality() || !leaf.operand.is_null() {
        return Err(SearchError::RelationTypeMismatch {
            entity: entity.name().to_string(),
            attribute: relation.name.clone(),
            relation: leaf.comparison.symbol().to_string(),
            scalar_type: format!("{} relation", relation.cardinality),
            expression: render_expression(&leaf.source),
        });
    }
    Ok(ResolvedLeaf::Presence {
        traversal: Traversal {
            source: entity.name().to_string(),
            relation: relation.clone(),
        },
        exists: leaf.comparison == Comparison::Ne,
    })
}

fn too_deep(leaf: &Leaf, depth: usize) -> SearchError {
    SearchError::TraversalDepthExceeded {
        depth,
        max: MAX_TRAVERSAL_DEPTH,
        expression: render_expression(&leaf.source),
    }
}

fn unknown_attribute(leaf: &Leaf, entity: &str, attribute: &str) -> SearchError {
    SearchError::UnknownAttribute {
        entity: entity.to_string(),
        attribute: attribute.to_string(),
        expression: render_expression(&leaf.source),
    }
}

/// Converts a leaf operand to the attribute's scalar type.
struct OperandConverter<'a> {
    leaf: &'a Leaf,
    entity: &'a EntityDef,
    attribute: &'a AttributeDef,
    normalize_strings: bool,
}

impl OperandConverter<'_> {
    fn convert(&self) -> SearchResult<Operand> {
        let comparison = self.leaf.comparison;
        let operand = &self.leaf.operand;

        if comparison == Comparison::In {
            let items = operand
                .as_array()
                .ok_or_else(|| self.invalid("in requires an array of values"))?;
            return items
                .iter()
                .map(|item| self.convert_value(item))
                .collect::<SearchResult<Vec<_>>>()
                .map(Operand::List);
        }

        if operand.is_null() && (comparison.is_ordering() || comparison.is_pattern()) {
            return Err(self.invalid(&format!(
                "null can only be compared with = or !=, not {}",
                comparison
            )));
        }

        let value = self.convert_value(operand)?;
        if comparison == Comparison::Regex {
            if let ScalarValue::String(pattern) = &value {
                regex::Regex::new(pattern)
                    .map_err(|e| self.invalid(&format!("invalid regular expression: {}", e)))?;
            }
        }
        Ok(Operand::Single(value))
    }

    fn convert_value(&self, value: &Value) -> SearchResult<ScalarValue> {
        if value.is_null() {
            return Ok(ScalarValue::Null);
        }

        let scalar_type = self.attribute.scalar_type;
        let converted = match scalar_type {
            ScalarType::Integer => value.as_i64().map(ScalarValue::Integer),
            ScalarType::Float => value.as_f64().map(ScalarValue::Float),
            ScalarType::Boolean => value.as_bool().map(ScalarValue::Boolean),
            ScalarType::String => value.as_str().map(|s| {
                if self.normalize_strings {
                    ScalarValue::String(s.nfd().collect())
                } else {
                    ScalarValue::String(s.to_string())
                }
            }),
            ScalarType::Date => value
                .as_str()
                .and_then(|s| NaiveDate::parse_from_str(s, DATE_FORMAT).ok())
                .map(ScalarValue::Date),
            ScalarType::Datetime => value
                .as_str()
                .and_then(|s| NaiveDateTime::parse_from_str(s, DATETIME_FORMAT).ok())
                .map(ScalarValue::Datetime),
        };

        converted.ok_or_else(|| {
            self.invalid(&format!(
                "expected {} but got {}",
                expected_description(scalar_type),
                value
            ))
        })
    }

    fn invalid(&self, reason: &str) -> SearchError {
        SearchError::InvalidOperand {
            entity: self.entity.name().to_string(),
            attribute: self.attribute.name.clone(),
            reason: reason.to_string(),
            expression: render_expression(&self.leaf.source),
        }
    }
}

fn expected_description(scalar_type: ScalarType) -> &'static str {
    match scalar_type {
        ScalarType::Integer => "an integer",
        ScalarType::Float => "a number",
        ScalarType::String => "a string",
        ScalarType::Boolean => "a boolean",
        ScalarType::Date => "an ISO 8601 date (YYYY-MM-DD)",
        ScalarType::Datetime => "an ISO 8601 datetime (YYYY-MM-DDTHH:MM:SS)",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterParser;
    use crate::schema::builtin::old_schema;
    use serde_json::json;

    fn resolve(root: &str, filter: Value) -> SearchResult<ResolvedExpr> {
        let registry = old_schema().unwrap();
        let root = registry.searchable_entity(root).unwrap();
        let expr = FilterParser::new(32, 256).parse(&filter)?;
        Resolver::new(&registry, root, true).resolve(&expr)
    }

    fn resolve_leaf(filter: Value) -> SearchResult<ResolvedLeaf> {
        match resolve("Form", filter)? {
            ResolvedExpr::Leaf(leaf) => Ok(leaf),
            other => panic!("expected leaf, got {:?}", other),
        }
    }

    #[test]
    fn test_direct_attribute() {
        let leaf = resolve_leaf(json!(["Form", "transcription", "like", "%a%"])).unwrap();
        assert_eq!(
            leaf,
            ResolvedLeaf::Scalar {
                via: None,
                entity: "Form".to_string(),
                attribute: "transcription".to_string(),
                comparison: Comparison::Like,
                operand: Operand::Single(ScalarValue::String("%a%".to_string())),
            }
        );
    }

    #[test]
    fn test_explicit_hop() {
        let leaf = resolve_leaf(json!(["Form", "enterer", "first_name", "regex", "^[JS]"])).unwrap();
        match leaf {
            ResolvedLeaf::Scalar {
                via: Some(traversal),
                entity,
                attribute,
                ..
            } => {
                assert_eq!(traversal.source, "Form");
                assert_eq!(traversal.relation.name, "enterer");
                assert_eq!(entity, "User");
                assert_eq!(attribute, "first_name");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_implicit_entity_compares_primary_key() {
        let leaf = resolve_leaf(json!(["Form", "File", "in", [1, 2]])).unwrap();
        match leaf {
            ResolvedLeaf::Scalar {
                via: Some(traversal),
                attribute,
                operand,
                ..
            } => {
                assert_eq!(traversal.relation.name, "files");
                assert_eq!(attribute, "id");
                assert_eq!(
                    operand,
                    Operand::List(vec![ScalarValue::Integer(1), ScalarValue::Integer(2)])
                );
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_non_root_entity_uses_default_traversal() {
        let leaf = resolve_leaf(json!(["Translation", "transcription", "like", "%dog%"])).unwrap();
        match leaf {
            ResolvedLeaf::Scalar {
                via: Some(traversal),
                entity,
                ..
            } => {
                assert_eq!(traversal.relation.name, "translations");
                assert_eq!(entity, "Translation");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_alias_uses_its_own_default_traversal() {
        let leaf = resolve_leaf(json!(["Memorizer", "first_name", "=", "Joel"])).unwrap();
        match leaf {
            ResolvedLeaf::Scalar {
                via: Some(traversal),
                entity,
                attribute,
                ..
            } => {
                assert_eq!(traversal.relation.name, "memorizers");
                assert_eq!(entity, "User");
                assert_eq!(attribute, "first_name");
            }
            other => panic!("unexpected {:?}", other),
        }

        let leaf = resolve_leaf(json!(["Form", "Memorizer", "=", 1])).unwrap();
        assert!(matches!(
            leaf,
            ResolvedLeaf::Scalar { via: Some(ref t), ref attribute, .. }
                if t.relation.name == "memorizers" && attribute == "id"
        ));
    }

    #[test]
    fn test_alias_limits_attributes() {
        match resolve_leaf(json!(["Memorizer", "email", "=", "a@b.c"])).unwrap_err() {
            SearchError::UnknownAttribute { entity, attribute, .. } => {
                assert_eq!(entity, "Memorizer");
                assert_eq!(attribute, "email");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_user_has_no_default_traversal_from_form() {
        let err = resolve_leaf(json!(["User", "first_name", "=", "Joel"])).unwrap_err();
        assert!(matches!(
            err,
            SearchError::AmbiguousImplicitRelation { candidates: 5, ref target, .. } if target == "User"
        ));
    }

    #[test]
    fn test_alias_is_never_the_root() {
        let err = resolve("User", json!(["Memorizer", "first_name", "=", "Joel"])).unwrap_err();
        assert!(matches!(err, SearchError::AmbiguousImplicitRelation { candidates: 0, .. }));
    }

    #[test]
    fn test_no_default_traversal_is_ambiguous() {
        let err = resolve_leaf(json!(["Form", "Speaker", "=", 1])).unwrap_err();
        assert!(matches!(
            err,
            SearchError::AmbiguousImplicitRelation { candidates: 1, .. }
        ));
    }

    #[test]
    fn test_relation_presence() {
        let leaf = resolve_leaf(json!(["Form", "files", "!=", null])).unwrap();
        match leaf {
            ResolvedLeaf::Presence { traversal, exists } => {
                assert_eq!(traversal.relation.name, "files");
                assert!(exists);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_relation_attribute_rejects_non_null_comparison() {
        let err = resolve_leaf(json!(["Form", "enterer", "like", "%a%"])).unwrap_err();
        assert!(matches!(err, SearchError::RelationTypeMismatch { .. }));
        let err = resolve_leaf(json!(["Form", "enterer", "=", 3])).unwrap_err();
        assert!(matches!(err, SearchError::RelationTypeMismatch { .. }));
    }

    #[test]
    fn test_unknown_names() {
        assert!(matches!(
            resolve_leaf(json!(["Form", "bogusAttr", "=", "x"])).unwrap_err(),
            SearchError::UnknownAttribute { .. }
        ));
        assert!(matches!(
            resolve_leaf(json!(["Form", "bogusRel", "name", "=", "x"])).unwrap_err(),
            SearchError::UnknownRelationName { .. }
        ));
        assert!(matches!(
            resolve_leaf(json!(["Form", "enterer", "bogus", "=", "x"])).unwrap_err(),
            SearchError::UnknownAttribute { ref entity, .. } if entity == "User"
        ));
        assert!(matches!(
            resolve_leaf(json!(["Phoneme", "name", "=", "x"])).unwrap_err(),
            SearchError::UnknownEntity { .. }
        ));
    }

    #[test]
    fn test_two_hop_paths_rejected() {
        assert!(matches!(
            resolve_leaf(json!(["Form", "enterer", "remembered_forms", "=", null])).unwrap_err(),
            SearchError::TraversalDepthExceeded { depth: 2, .. }
        ));
        assert!(matches!(
            resolve_leaf(json!(["Form", "enterer", "remembered_forms", "transcription", "like", "%a%"]))
                .unwrap_err(),
            SearchError::TraversalDepthExceeded { depth: 2, .. }
        ));
        assert!(matches!(
            resolve_leaf(json!(["File", "tags", "name", "=", "x"])).unwrap_err(),
            SearchError::TraversalDepthExceeded { .. }
        ));
    }

    #[test]
    fn test_type_mismatch() {
        let err = resolve_leaf(json!(["Form", "id", "like", "1%"])).unwrap_err();
        match err {
            SearchError::RelationTypeMismatch {
                scalar_type,
                relation,
                ..
            } => {
                assert_eq!(scalar_type, "integer");
                assert_eq!(relation, "like");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_operand_conversion() {
        assert!(matches!(
            resolve_leaf(json!(["Form", "id", "=", "seven"])).unwrap_err(),
            SearchError::InvalidOperand { .. }
        ));
        assert!(matches!(
            resolve_leaf(json!(["Form", "date_elicited", "<", "01/02/2012"])).unwrap_err(),
            SearchError::InvalidOperand { .. }
        ));
        assert!(matches!(
            resolve_leaf(json!(["Form", "id", "in", 3])).unwrap_err(),
            SearchError::InvalidOperand { .. }
        ));
        assert!(matches!(
            resolve_leaf(json!(["Form", "transcription", "regex", "(unclosed"])).unwrap_err(),
            SearchError::InvalidOperand { .. }
        ));
        assert!(matches!(
            resolve_leaf(json!(["Form", "transcription", "<", null])).unwrap_err(),
            SearchError::InvalidOperand { .. }
        ));

        let leaf = resolve_leaf(json!(["Form", "datetime_modified", ">", "2012-01-01T00:00:00"])).unwrap();
        match leaf {
            ResolvedLeaf::Scalar {
                operand: Operand::Single(ScalarValue::Datetime(dt)),
                ..
            } => assert_eq!(dt.to_string(), "2012-01-01 00:00:00"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_strings_normalized_to_nfd() {
        let precomposed = resolve_leaf(json!(["Form", "transcription", "=", "\u{e1}"])).unwrap();
        let decomposed = resolve_leaf(json!(["Form", "transcription", "=", "a\u{301}"])).unwrap();
        assert_eq!(precomposed, decomposed);
    }
}
