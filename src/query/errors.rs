//! # Query Error Types
//!
//! A [`QueryError`] means the query itself is malformed: it references an alias,
//! entity or column that does not exist, asks for a join the metadata cannot
//! express, or misuses a builder operation. These are programming errors, raised
//! at the call that introduced them and never retried.
//!
//! ## Usage Patterns
//!
//! ```ignore
//! QueryError::unknown_column_with_context("status", "T9", "While adding WHERE condition")
//! ```

use thiserror::Error;

use crate::catalog::CatalogError;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum QueryError {
    #[error("Unknown entity `{0}`")]
    UnknownEntity(String),

    #[error("Unknown table alias `{alias}` (query aliases: {known})")]
    UnknownTable { alias: String, known: String },

    #[error("Unknown column `{column}` for alias `{alias}`")]
    UnknownColumn { column: String, alias: String },

    #[error("Duplicate table alias `{0}`")]
    DuplicateAlias(String),

    #[error("No link found to/from query's entities for `{entity}`")]
    NoJoinPath { entity: String },

    #[error("Link `{link}` not found to/from `{entity}`{}", alias_suffix(.target_alias))]
    LinkNotFound {
        link: String,
        entity: String,
        target_alias: Option<String>,
    },

    #[error("Several links lead to `{entity}` ({candidates}); name the link to use")]
    AmbiguousJoinPath { entity: String, candidates: String },

    #[error("Illegal operator {op} in {context}")]
    IllegalOperator { op: String, context: String },

    #[error("{0}: missing arguments")]
    MissingArguments(String),

    #[error("Invalid value `{value}` for column `{column}`: {reason}")]
    InvalidValue {
        column: String,
        value: String,
        reason: String,
    },

    #[error("Join key mismatch between `{source_alias}` and `{alias}`: {source_fields} source field(s), {target_fields} target field(s)")]
    KeyArityMismatch {
        source_alias: String,
        alias: String,
        source_fields: usize,
        target_fields: usize,
    },

    #[error("No join from `{source_alias}` to `{alias}`")]
    UnknownJoin { source_alias: String, alias: String },

    #[error("Unknown result column `{alias}` (known: {known})")]
    UnknownResultColumn { alias: String, known: String },

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

fn alias_suffix(target_alias: &Option<String>) -> String {
    target_alias
        .as_ref()
        .map(|a| format!(" and alias `{}`", a))
        .unwrap_or_default()
}

impl QueryError {
    pub fn unknown_column_with_context(
        column: impl Into<String>,
        alias: impl Into<String>,
        context: impl Into<String>,
    ) -> Self {
        QueryError::UnknownColumn {
            column: format!("{}\n  Context: {}", column.into(), context.into()),
            alias: alias.into(),
        }
    }

    pub fn illegal_operator(op: impl ToString, context: impl Into<String>) -> Self {
        QueryError::IllegalOperator {
            op: op.to_string(),
            context: context.into(),
        }
    }
}
