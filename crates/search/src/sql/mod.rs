//! SQL rendering of logical plans (SQLite dialect).

mod query_builder;
mod schema;

pub use query_builder::{
    DATE_STORAGE_FORMAT, DATETIME_STORAGE_FORMAT, SqlFragment, SqlParam, SqlRenderer, quote_ident,
};
pub use schema::schema_ddl;
