//! Planning errors.

#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("table not found: {0}")]
    TableNotFound(String),

    #[error("column '{table}.{column}': {reason}")]
    ColumnError {
        table: String,
        column: String,
        reason: String,
    },

    #[error("JOIN ON clause must be an equality between two identifiers")]
    UnsupportedJoinCondition,

    #[error("join column '{table}.{column}' does not exist")]
    UnknownJoinColumn { table: String, column: String },

    #[error(
        "join columns '{left_table}.{left_column}' and '{right_table}.{right_column}' have different declared types ({left_type} vs {right_type})"
    )]
    JoinColumnTypeMismatch {
        left_table: String,
        left_column: String,
        left_type: String,
        right_table: String,
        right_column: String,
        right_type: String,
    },

    #[error("expression is not a valid predicate: {0}")]
    InvalidPredicate(#[from] crate::predicate::PredicateError),

    #[error("no database selected")]
    NoDatabaseSelected,
}

pub type Result<T> = core::result::Result<T, PlanError>;
