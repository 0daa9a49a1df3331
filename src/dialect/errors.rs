use thiserror::Error;

use super::DialectKind;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum DialectError {
    #[error("Unsupported database driver `{0}` (expected Oracle, MySQL, PostgreSQL, DB2 or SQL Server)")]
    UnsupportedDriver(String),

    #[error("Unknown dialect name `{0}` (expected oracle, mysql, postgresql, db2 or sqlserver)")]
    UnknownDialect(String),

    #[error("Process dialect already initialised as {current}, refusing to switch to {requested}")]
    AlreadyInitialised {
        current: DialectKind,
        requested: DialectKind,
    },

    #[error("Process dialect has not been initialised")]
    NotInitialised,
}
