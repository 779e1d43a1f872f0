//! Shared test infrastructure for the search compiler.
//!
//! Provides the built-in registry, a compiler over it and, with the `sqlite`
//! feature, an in-memory executor seeded with a small OLD corpus.

#![allow(dead_code)]

pub mod fixtures;

use std::sync::Arc;

use old_search::schema::builtin::old_schema;
use old_search::{CompilerConfig, SchemaRegistry, SearchCompiler};

pub use fixtures::*;

pub fn registry() -> Arc<SchemaRegistry> {
    Arc::new(old_schema().expect("built-in schema is valid"))
}

pub fn compiler() -> SearchCompiler {
    SearchCompiler::new(registry())
}

pub fn compiler_with(config: CompilerConfig) -> SearchCompiler {
    SearchCompiler::with_config(registry(), config)
}
