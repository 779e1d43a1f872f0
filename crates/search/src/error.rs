//! Error types for the search compiler.
//!
//! This module defines every error the compiler can surface, split into:
//! - [`SearchError`] - problems with a client search request (always 400-class)
//! - [`RegistryError`] - problems building the schema registry at startup
//! - [`RenderError`] - a logical plan that does not fit the registry it is rendered against
//! - [`ExecutionError`] - failures running a plan in the SQLite reference executor

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use serde_json::{Value, json};
use thiserror::Error;

/// Result alias for compile operations.
pub type SearchResult<T> = Result<T, SearchError>;

/// Errors raised while compiling a search request.
///
/// Every variant is recoverable and user-visible. The `expression` fields hold
/// the offending sub-expression serialized as JSON so that clients can see
/// exactly which part of their filter was rejected.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SearchError {
    /// The filter is not a leaf or a `not`/`and`/`or` combination.
    #[error("malformed filter expression {expression}: {reason}")]
    MalformedExpression { expression: String, reason: String },

    /// A leaf array has the wrong number of elements.
    #[error("filter expression {expression} has {arity} elements; leaves take 4 or 5")]
    InvalidLeafArity { expression: String, arity: usize },

    /// The relation token is not in the relation table.
    #[error("unknown relation '{relation}' in {expression}")]
    UnknownRelation { relation: String, expression: String },

    /// The relation cannot be applied to the attribute's scalar type.
    #[error("relation '{relation}' cannot be used with {entity}.{attribute} ({scalar_type})")]
    RelationTypeMismatch {
        entity: String,
        attribute: String,
        relation: String,
        scalar_type: String,
        expression: String,
    },

    /// The attribute does not exist on the entity.
    #[error("searching on {entity}.{attribute} is not permitted")]
    UnknownAttribute {
        entity: String,
        attribute: String,
        expression: String,
    },

    /// The relation name does not exist on the entity.
    #[error("{entity} has no relation named '{relation}'")]
    UnknownRelationName {
        entity: String,
        relation: String,
        expression: String,
    },

    /// No single default traversal connects the two entities.
    #[error(
        "cannot resolve an implicit relation from {entity} to {target}: {candidates} candidate relation(s), none marked as default"
    )]
    AmbiguousImplicitRelation {
        entity: String,
        target: String,
        candidates: usize,
        expression: String,
    },

    /// The path walks more relation hops than supported.
    #[error("path {expression} traverses {depth} relations; at most {max} supported")]
    TraversalDepthExceeded {
        depth: usize,
        max: usize,
        expression: String,
    },

    /// The sort direction is not `asc` or `desc`.
    #[error("invalid sort direction '{direction}' in {expression}")]
    InvalidSortDirection {
        direction: String,
        expression: String,
    },

    /// The entity is not registered or not searchable.
    #[error("searching on the {entity} entity is not permitted")]
    UnknownEntity { entity: String, expression: String },

    /// The expression exceeds the configured nesting depth or leaf count.
    #[error(
        "filter expression too complex: depth {depth} (max {max_depth}), {leaves} leaves (max {max_leaves})"
    )]
    ExpressionTooComplex {
        depth: usize,
        leaves: usize,
        max_depth: usize,
        max_leaves: usize,
    },

    /// The operand does not fit the attribute or the relation.
    #[error("invalid operand for {entity}.{attribute} in {expression}: {reason}")]
    InvalidOperand {
        entity: String,
        attribute: String,
        reason: String,
        expression: String,
    },

    /// A pagination parameter is not a positive integer within bounds.
    #[error("invalid pagination parameter '{field}': {reason}")]
    InvalidPagination { field: String, reason: String },

    /// The request has no `query.filter`.
    #[error("search request is missing query.filter")]
    MissingFilter,
}

impl SearchError {
    /// Returns the stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            SearchError::MalformedExpression { .. } => "MalformedExpression",
            SearchError::InvalidLeafArity { .. } => "InvalidLeafArity",
            SearchError::UnknownRelation { .. } => "UnknownRelation",
            SearchError::RelationTypeMismatch { .. } => "RelationTypeMismatch",
            SearchError::UnknownAttribute { .. } => "UnknownAttribute",
            SearchError::UnknownRelationName { .. } => "UnknownRelationName",
            SearchError::AmbiguousImplicitRelation { .. } => "AmbiguousImplicitRelation",
            SearchError::TraversalDepthExceeded { .. } => "TraversalDepthExceeded",
            SearchError::InvalidSortDirection { .. } => "InvalidSortDirection",
            SearchError::UnknownEntity { .. } => "UnknownEntity",
            SearchError::ExpressionTooComplex { .. } => "ExpressionTooComplex",
            SearchError::InvalidOperand { .. } => "InvalidOperand",
            SearchError::InvalidPagination { .. } => "InvalidPagination",
            SearchError::MissingFilter => "MissingFilter",
        }
    }

    /// Returns the key under which this error is reported to clients.
    ///
    /// Attribute-level errors are keyed by `Entity.attribute`, mirroring the
    /// field-keyed error objects the HTTP layer returns.
    pub fn field_key(&self) -> String {
        match self {
            SearchError::RelationTypeMismatch {
                entity,
                attribute,
                relation,
                ..
            } => format!("{}.{}.{}", entity, attribute, relation),
            SearchError::UnknownAttribute {
                entity, attribute, ..
            }
            | SearchError::InvalidOperand {
                entity, attribute, ..
            } => format!("{}.{}", entity, attribute),
            SearchError::UnknownRelationName {
                entity, relation, ..
            } => format!("{}.{}", entity, relation),
            SearchError::AmbiguousImplicitRelation { entity, target, .. } => {
                format!("{}.{}", entity, target)
            }
            SearchError::UnknownEntity { entity, .. } => entity.clone(),
            SearchError::InvalidSortDirection { .. } => "OrderByError".to_string(),
            SearchError::InvalidPagination { field, .. } => format!("paginator.{}", field),
            SearchError::MissingFilter => "query.filter".to_string(),
            other => other.code().to_string(),
        }
    }

    /// Returns the serialized sub-expression that caused the error, if any.
    pub fn expression(&self) -> Option<&str> {
        match self {
            SearchError::MalformedExpression { expression, .. }
            | SearchError::InvalidLeafArity { expression, .. }
            | SearchError::UnknownRelation { expression, .. }
            | SearchError::RelationTypeMismatch { expression, .. }
            | SearchError::UnknownAttribute { expression, .. }
            | SearchError::UnknownRelationName { expression, .. }
            | SearchError::AmbiguousImplicitRelation { expression, .. }
            | SearchError::TraversalDepthExceeded { expression, .. }
            | SearchError::InvalidSortDirection { expression, .. }
            | SearchError::UnknownEntity { expression, .. }
            | SearchError::InvalidOperand { expression, .. } => Some(expression),
            SearchError::ExpressionTooComplex { .. }
            | SearchError::InvalidPagination { .. }
            | SearchError::MissingFilter => None,
        }
    }

    /// HTTP status the boundary layer should answer with.
    pub fn http_status(&self) -> u16 {
        400
    }

    /// Builds the field-keyed error body returned to clients.
    pub fn to_response_body(&self) -> Value {
        let mut errors = serde_json::Map::new();
        errors.insert(self.field_key(), Value::String(self.to_string()));
        json!({
            "errors": errors,
            "code": self.code(),
        })
    }
}

/// Serializes a JSON sub-expression for inclusion in an error.
pub(crate) fn render_expression(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| value.to_string())
}

/// Errors raised while building a [`SchemaRegistry`](crate::schema::SchemaRegistry).
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Two entities share a name.
    #[error("duplicate entity: {entity}")]
    DuplicateEntity { entity: String },

    /// Two attributes or relations of one entity share a name.
    #[error("duplicate attribute or relation name: {entity}.{name}")]
    DuplicateName { entity: String, name: String },

    /// The primary key is not one of the entity's attributes.
    #[error("primary key '{primary_key}' is not an attribute of {entity}")]
    MissingPrimaryKey { entity: String, primary_key: String },

    /// A relation targets an entity that is not registered.
    #[error("relation {entity}.{relation} targets unknown entity {target}")]
    DanglingTarget {
        entity: String,
        relation: String,
        target: String,
    },

    /// More than one relation is the default route to the same target.
    #[error("{entity} has more than one default traversal to {target}: {relations:?}")]
    MultipleDefaultTraversals {
        entity: String,
        target: String,
        relations: Vec<String>,
    },

    /// The join key kind does not match the relation cardinality.
    #[error("relation {entity}.{relation}: {message}")]
    InvalidJoinKey {
        entity: String,
        relation: String,
        message: String,
    },

    /// An entity alias, or a relation's default alias, is inconsistent.
    #[error("invalid entity alias {alias}: {message}")]
    InvalidAlias { alias: String, message: String },

    /// The schema document could not be read or parsed.
    #[error("failed to load schema document from {source_name}: {message}")]
    DocumentLoadFailed {
        source_name: String,
        message: String,
    },
}

/// Errors raised while rendering a plan to SQL.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// The plan names an entity the registry does not know.
    #[error("plan references unknown entity {entity}")]
    UnknownEntity { entity: String },

    /// The plan names a relation the registry does not know.
    #[error("plan references unknown relation {entity}.{relation}")]
    UnknownRelation { entity: String, relation: String },

    /// A predicate refers to an alias missing from the join plan.
    #[error("predicate references alias {alias} which is not in the join plan")]
    UnknownAlias { alias: String },

    /// A column reference names an attribute the entity does not have.
    #[error("plan references unknown column {entity}.{attribute}")]
    UnknownColumn { entity: String, attribute: String },
}

/// Errors raised by the SQLite reference executor.
#[cfg(feature = "sqlite")]
#[derive(Error, Debug)]
pub enum ExecutionError {
    /// The plan could not be rendered.
    #[error(transparent)]
    Render(#[from] RenderError),

    /// SQLite rejected the statement or failed while running it.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}
