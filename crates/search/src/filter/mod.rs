//! Filter expression parsing.
//!
//! - [`relation`] - the closed relation table
//! - [`ast`] - the typed filter AST
//! - [`parser`] - JSON to AST conversion with complexity bounds

pub mod ast;
pub mod parser;
pub mod relation;

pub use ast::{FilterExpr, Leaf, SortDirection, SortKey};
pub use parser::{Complexity, FilterParser, measure, parse_order_by};
pub use relation::{Comparison, RelationTableEntry, relation_table};
