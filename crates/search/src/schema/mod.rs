//! Schema registry: the searchable entities, their attributes and relations.
//!
//! The registry is built once at startup, either from the built-in OLD schema
//! ([`builtin::old_schema`]) or from a JSON [`SchemaDocument`], and shared
//! read-only by every compilation.

pub mod builtin;
mod loader;
mod registry;
mod types;

pub use loader::SchemaDocument;
pub use registry::{
    AttributeDef, EntityAlias, EntityDef, JoinKey, RelationDef, SchemaRegistry,
    SchemaRegistryBuilder, table_name_for,
};
pub use types::{Cardinality, ScalarType};
