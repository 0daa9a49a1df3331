//! Predicate nodes of WHERE, HAVING and join clauses.
//!
//! Conditions are kept in the order they were added. Separators are tokens in
//! that same list, so grouping is exactly what the caller expressed: two
//! predicates without a separator are joined by AND, `or()` between them turns
//! that into OR, and parentheses come from explicit group tokens.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use super::errors::QueryError;
use super::value::BindValue;
use super::var::Var;
use super::DbQuery;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SqlOp {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "<>")]
    Ne,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = "LIKE")]
    Like,
    #[serde(rename = "NOT LIKE")]
    NotLike,
    #[serde(rename = "BETWEEN")]
    Between,
    #[serde(rename = "IN")]
    In,
    #[serde(rename = "NOT IN")]
    NotIn,
    #[serde(rename = "IS NULL")]
    IsNull,
    #[serde(rename = "IS NOT NULL")]
    IsNotNull,
}

impl SqlOp {
    pub fn sql(&self) -> &'static str {
        match self {
            SqlOp::Eq => "=",
            SqlOp::Ne => "<>",
            SqlOp::Gt => ">",
            SqlOp::Ge => ">=",
            SqlOp::Lt => "<",
            SqlOp::Le => "<=",
            SqlOp::Like => "LIKE",
            SqlOp::NotLike => "NOT LIKE",
            SqlOp::Between => "BETWEEN",
            SqlOp::In => "IN",
            SqlOp::NotIn => "NOT IN",
            SqlOp::IsNull => "IS NULL",
            SqlOp::IsNotNull => "IS NOT NULL",
        }
    }

    /// Number of values the operator compares against.
    pub fn arity(&self) -> usize {
        match self {
            SqlOp::IsNull | SqlOp::IsNotNull => 0,
            SqlOp::Between => 2,
            _ => 1,
        }
    }

    /// LIKE and NOT LIKE take a text pattern whatever the column type.
    pub fn is_pattern(&self) -> bool {
        matches!(self, SqlOp::Like | SqlOp::NotLike)
    }

    /// The null test a comparison with a null value turns into, if any.
    pub fn null_rewrite(&self) -> Option<SqlOp> {
        match self {
            SqlOp::Eq | SqlOp::Like | SqlOp::IsNull => Some(SqlOp::IsNull),
            SqlOp::Ne | SqlOp::NotLike | SqlOp::IsNotNull => Some(SqlOp::IsNotNull),
            _ => None,
        }
    }
}

impl fmt::Display for SqlOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sql())
    }
}

impl FromStr for SqlOp {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.split_whitespace().collect::<Vec<_>>().join(" ").to_uppercase();
        let op = match normalized.as_str() {
            "=" | "EQ" => SqlOp::Eq,
            "<>" | "!=" | "NE" => SqlOp::Ne,
            ">" | "GT" => SqlOp::Gt,
            ">=" | "GE" => SqlOp::Ge,
            "<" | "LT" => SqlOp::Lt,
            "<=" | "LE" => SqlOp::Le,
            "LIKE" => SqlOp::Like,
            "NOT LIKE" => SqlOp::NotLike,
            "BETWEEN" => SqlOp::Between,
            "IN" => SqlOp::In,
            "NOT IN" => SqlOp::NotIn,
            "IS NULL" => SqlOp::IsNull,
            "IS NOT NULL" => SqlOp::IsNotNull,
            _ => return Err(QueryError::illegal_operator(s, "operator parsing")),
        };
        Ok(op)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Separator {
    And,
    Or,
    Open,
    Close,
}

impl Separator {
    pub fn sql(&self) -> &'static str {
        match self {
            Separator::And => " AND ",
            Separator::Or => " OR ",
            Separator::Open => "(",
            Separator::Close => ")",
        }
    }
}

/// A column named by the caller, resolved when the query is compiled so it
/// may belong to an enclosing query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnName {
    pub column: String,
    pub table_alias: String,
}

impl ColumnName {
    pub fn new(column: impl Into<String>, table_alias: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            table_alias: table_alias.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Cond {
    /// `var op value [AND value]`; a null value turns EQ/LIKE and NE/NOT LIKE
    /// into null tests.
    Compare {
        var: Var,
        op: SqlOp,
        values: Vec<BindValue>,
    },
    /// Column-to-column comparison, possibly correlated with an enclosing query.
    Columns {
        left: ColumnName,
        op: SqlOp,
        right: ColumnName,
    },
    ValueList {
        var: Var,
        negated: bool,
        values: Vec<BindValue>,
    },
    Separator(Separator),
    /// `var op (subquery)` with op one of the comparison operators or IN/NOT IN.
    SubQuery {
        var: Var,
        op: SqlOp,
        query: Arc<DbQuery>,
    },
    Exists {
        negated: bool,
        query: Arc<DbQuery>,
    },
    /// Free-text search over several columns concatenated with spaces.
    ConcatLike {
        vars: Vec<Var>,
        value: String,
        negated: bool,
    },
}
