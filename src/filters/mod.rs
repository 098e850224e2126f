//! Filter-string to SQL predicate translation.
//!
//! Query parameters arrive as compact expressions like `result=failed` or
//! `metadata.run@y`. Parsing, column resolution and predicate building are
//! separate stages so each can reject an expression independently; a filter
//! that fails any stage is dropped without failing the request.

pub mod apply;
pub mod column;
pub mod parser;

pub use apply::{apply_filters, build_predicate};
pub use column::{
    ColumnKind, ColumnSet, JsonShape, ResolvedColumn, resolve, PROJECT_COLUMNS, RESULT_COLUMNS,
    RUN_COLUMNS,
};
pub use parser::{parse, FilterExpression, FilterOp, FilterValue};
