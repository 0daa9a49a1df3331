//! SQL dialect strategies
//!
//! Every engine-specific piece of syntax the compiler emits goes through the
//! [`Dialect`] trait: pagination and count wrappers, outer-join encoding,
//! null-coalescing, text casts, current date/time functions and `decode`.
//! One zero-sized strategy per supported engine lives in its own module and
//! is obtained through [`strategy`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::catalog::{FieldModel, SqlType};

mod db2;
pub mod detection;
pub mod errors;
mod mysql;
mod oracle;
mod postgres;
mod sqlserver;

pub use db2::Db2;
pub use detection::{init_from_driver_name, init_process_dialect, process_dialect};
pub use errors::DialectError;
pub use mysql::MySql;
pub use oracle::Oracle;
pub use postgres::PostgreSql;
pub use sqlserver::SqlServer;

/// Alias of the derived table wrapped by count queries.
pub const COUNT_SUBSELECT_ALIAS: &str = "COUNT_SUBSELECT_ALIAS";

/// Supported database engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialectKind {
    Oracle,
    MySql,
    #[serde(alias = "postgres")]
    PostgreSql,
    Db2,
    #[serde(alias = "mssql")]
    SqlServer,
}

impl DialectKind {
    pub const ALL: [DialectKind; 5] = [
        DialectKind::Oracle,
        DialectKind::MySql,
        DialectKind::PostgreSql,
        DialectKind::Db2,
        DialectKind::SqlServer,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            DialectKind::Oracle => "oracle",
            DialectKind::MySql => "mysql",
            DialectKind::PostgreSql => "postgresql",
            DialectKind::Db2 => "db2",
            DialectKind::SqlServer => "sqlserver",
        }
    }

    pub fn strategy(&self) -> &'static dyn Dialect {
        strategy(*self)
    }
}

impl fmt::Display for DialectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DialectKind {
    type Err = DialectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "oracle" => Ok(DialectKind::Oracle),
            "mysql" => Ok(DialectKind::MySql),
            "postgresql" | "postgres" => Ok(DialectKind::PostgreSql),
            "db2" => Ok(DialectKind::Db2),
            "sqlserver" | "mssql" => Ok(DialectKind::SqlServer),
            _ => Err(DialectError::UnknownDialect(s.to_string())),
        }
    }
}

static ORACLE: Oracle = Oracle;
static MYSQL: MySql = MySql;
static POSTGRESQL: PostgreSql = PostgreSql;
static DB2: Db2 = Db2;
static SQLSERVER: SqlServer = SqlServer;

/// The strategy object for a dialect.
pub fn strategy(kind: DialectKind) -> &'static dyn Dialect {
    match kind {
        DialectKind::Oracle => &ORACLE,
        DialectKind::MySql => &MYSQL,
        DialectKind::PostgreSql => &POSTGRESQL,
        DialectKind::Db2 => &DB2,
        DialectKind::SqlServer => &SQLSERVER,
    }
}

/// Engine-specific SQL rendering.
///
/// Default methods produce ANSI/MySQL syntax; each engine overrides what it
/// does differently.
pub trait Dialect: Send + Sync + fmt::Debug {
    fn kind(&self) -> DialectKind;

    fn upper(&self, expr: &str) -> String {
        format!("UPPER({})", expr)
    }

    /// Name of the two-argument null-coalescing function.
    fn if_null_function(&self) -> &'static str {
        "ifnull"
    }

    fn if_null(&self, expr: &str, fallback: &str) -> String {
        format!("{}({}, {})", self.if_null_function(), expr, fallback)
    }

    /// Cast a column of the given field type to text.
    fn to_text(&self, expr: &str, field: &FieldModel) -> String;

    fn concat(&self, left: &str, right: &str) -> String {
        format!("CONCAT({},{})", left, right)
    }

    fn current_date(&self) -> &'static str {
        "CURRENT_DATE"
    }

    fn current_time(&self) -> &'static str {
        "CURRENT_TIME"
    }

    fn current_timestamp(&self) -> &'static str {
        "CURRENT_TIMESTAMP"
    }

    /// Current date/time function for a temporal column type.
    fn now_for(&self, sql_type: SqlType) -> Option<&'static str> {
        match sql_type {
            SqlType::Date => Some(self.current_date()),
            SqlType::Time => Some(self.current_time()),
            SqlType::Timestamp => Some(self.current_timestamp()),
            _ => None,
        }
    }

    fn quote_literal(&self, value: &str) -> String {
        format!("'{}'", value.replace('\'', "''"))
    }

    /// Map `expr` through search/result pairs with an optional default.
    fn decode(&self, expr: &str, arms: &[(String, String)], default: Option<&str>) -> String {
        let mut sql = format!("CASE {}", expr);
        for (search, result) in arms {
            sql.push_str(&format!(" WHEN {} THEN {}", search, result));
        }
        if let Some(default) = default {
            sql.push_str(&format!(" ELSE {}", default));
        }
        sql.push_str(" END");
        sql
    }

    /// Outer joins are written as `(+)`-marked predicates in WHERE instead of
    /// `LEFT JOIN ... ON`.
    fn relocates_outer_joins(&self) -> bool {
        false
    }

    fn outer_join_marker(&self) -> &'static str {
        "(+)"
    }

    /// The sort is rendered inside the row-number window of the page wrapper,
    /// so the inner query carries no ORDER BY.
    fn sorts_inside_window(&self) -> bool {
        false
    }

    /// Restrict `inner` to a page: `min` rows skipped, `max` read as a row
    /// count by every engine except SQL Server, where it is the last row number.
    fn wrap_window(&self, inner: &str, order_by: Option<&str>, min: i64, max: i64) -> String;

    fn count_alias(&self) -> Option<&'static str> {
        Some(COUNT_SUBSELECT_ALIAS)
    }

    fn wrap_count(&self, inner: &str) -> String {
        match self.count_alias() {
            Some(alias) => format!("SELECT COUNT(1) FROM ({}) AS {}", inner, alias),
            None => format!("SELECT COUNT(1) FROM ({})", inner),
        }
    }
}
