//! Plan tree node types.

use std::collections::HashMap;

use crate::ast::JoinType;
use crate::predicate::Predicate;
use crate::schema::Value;

/// One column of a projection: the table it's read from (`None` for an
/// unqualified reference resolved to the left-then-right table order),
/// the column name, and the output alias.
#[derive(Debug, Clone)]
pub struct ProjectedColumn {
    pub table: Option<String>,
    pub column: String,
    pub alias: String,
}

/// What a `Select` node emits: every column, or an explicit ordered
/// list.
#[derive(Debug, Clone)]
pub enum Projection {
    All,
    Columns(Vec<ProjectedColumn>),
}

/// An assignment planned for an `Insert`/`Update` node: the target
/// column and its already-coerced value.
#[derive(Debug, Clone)]
pub struct PlannedAssignment {
    pub column: String,
    pub value: Value,
}

/// A free-form bag of planner annotations attached to a node (e.g. scan
/// kind, chosen join algorithm). Kept as a typed enum of values rather
/// than stringly-typed `Any` so callers don't need downcasting.
#[derive(Debug, Clone, Default)]
pub struct Metadata(HashMap<String, MetadataValue>);

#[derive(Debug, Clone)]
pub enum MetadataValue {
    Text(String),
    Bool(bool),
}

impl Metadata {
    #[must_use]
    pub fn new() -> Self {
        Self(HashMap::new())
    }

    pub fn set(&mut self, key: impl Into<String>, value: MetadataValue) {
        self.0.insert(key.into(), value);
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&MetadataValue> {
        self.0.get(key)
    }
}

/// A physical plan node. The tree is built left-deep for joins: the
/// left child of a `Join` may itself be a `Join`, even though the rest
/// of the system only ever exercises a single join per statement.
#[derive(Debug, Clone)]
pub enum PlanNode {
    Scan {
        table: String,
        predicate: Option<Predicate>,
        metadata: Metadata,
    },
    Join {
        join_type: JoinType,
        left_table: String,
        left_column: String,
        right_table: String,
        right_column: String,
        left: Box<PlanNode>,
        right: Box<PlanNode>,
        metadata: Metadata,
    },
    Select {
        table: String,
        predicate: Option<Predicate>,
        projection: Projection,
        children: Vec<PlanNode>,
        metadata: Metadata,
    },
    Insert {
        table: String,
        assignments: Vec<PlannedAssignment>,
        metadata: Metadata,
    },
    Update {
        table: String,
        predicate: Option<Predicate>,
        assignments: Vec<PlannedAssignment>,
        metadata: Metadata,
    },
    Delete {
        table: String,
        predicate: Option<Predicate>,
        metadata: Metadata,
    },
}
