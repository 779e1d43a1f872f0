//! OLD Search Query Compiler
//!
//! This crate turns the JSON search language of the Online Linguistic
//! Database into a backend-neutral [`LogicalQueryPlan`]. Clients search
//! forms, files, collections and the other OLD resources with nested
//! `not`/`and`/`or` filters over attributes and one relation hop.
//!
//! # Filter language
//!
//! ```json
//! ["and", [
//!     ["Form", "transcription", "like", "%a%"],
//!     ["not", ["Form", "morpheme_break", "regex", "[28][5-7]"]],
//!     ["or", [
//!         ["Form", "enterer", "first_name", "regex", "^[JS]"],
//!         ["Form", "files", "id", "in", [1, 2]]
//!     ]]
//! ]]
//! ```
//!
//! A leaf is `[Entity, attribute, relation, value]` or
//! `[Entity, relation_name, attribute, relation, value]`. Relation tokens are
//! listed by [`filter::relation_table`].
//!
//! # Architecture
//!
//! - [`schema`] - the registry of searchable entities, attributes and relations
//! - [`filter`] - JSON to AST parsing with complexity bounds
//! - [`planner`] - resolution, join planning and predicate lowering
//! - [`compiler`] - the [`SearchCompiler`] entry point
//! - [`sql`] - SQLite rendering of plans and DDL
//! - [`backends`] - the SQLite reference executor (feature `sqlite`)
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use old_search::{SearchCompiler, schema::builtin::old_schema};
//! use serde_json::{Value, json};
//!
//! let registry = Arc::new(old_schema().unwrap());
//! let compiler = SearchCompiler::new(registry);
//!
//! let plan = compiler
//!     .compile("Form", &json!(["Form", "enterer", "first_name", "=", "Jo"]), &Value::Null, None)
//!     .unwrap();
//! assert_eq!(plan.joins.len(), 1);
//!
//! let err = compiler
//!     .compile("Form", &json!(["Form", "password", "=", "x"]), &Value::Null, None)
//!     .unwrap_err();
//! assert_eq!(err.code(), "UnknownAttribute");
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod backends;
pub mod compiler;
pub mod config;
pub mod error;
pub mod filter;
pub mod parameters;
pub mod planner;
pub mod schema;
pub mod sql;

pub use compiler::SearchCompiler;
pub use config::CompilerConfig;
pub use error::{RegistryError, RenderError, SearchError, SearchResult};
pub use filter::{Comparison, FilterExpr};
pub use parameters::SearchParameters;
pub use planner::{LogicalQueryPlan, Pagination};
pub use schema::{SchemaDocument, SchemaRegistry};

#[cfg(feature = "sqlite")]
pub use backends::SqliteExecutor;
#[cfg(feature = "sqlite")]
pub use error::ExecutionError;
