//! Query planning: resolution, join planning, predicate and order compilation.
//!
//! The stages run in order for every request:
//!
//! 1. [`resolver`] binds leaf paths to the schema and types operands
//! 2. [`joins`] aliases each distinct traversal
//! 3. [`predicate`] lowers the resolved filter onto those aliases
//! 4. [`order`] compiles the sort keys
//!
//! and [`plan`] holds the result.

pub mod joins;
pub mod order;
pub mod plan;
pub mod predicate;
pub mod resolver;

pub use joins::{AliasId, JoinPlanEntry, JoinPlanner};
pub use order::{OrderSpec, compile_order_by};
pub use plan::{LogicalQueryPlan, Pagination};
pub use predicate::{ColumnRef, Predicate, PredicateCompiler};
pub use resolver::{
    MAX_TRAVERSAL_DEPTH, Operand, ResolvedExpr, ResolvedLeaf, Resolver, ScalarValue, Traversal,
};
