//! AST to plan-tree lowering.
//!
//! Resolves table/column names against a live [`Database`](crate::schema::Database),
//! coerces literal values to their declared column types, compiles
//! `WHERE`/`ON` expressions into [`Predicate`](crate::predicate::Predicate)
//! trees, and validates join conditions. The planner never selects
//! among alternative plan shapes — it always emits the single fixed
//! shape described by the statement.

mod error;
mod plan;
mod planner;

pub use error::PlanError;
pub use plan::{Metadata, MetadataValue, PlanNode, PlannedAssignment, ProjectedColumn, Projection};
pub use planner::Planner;
