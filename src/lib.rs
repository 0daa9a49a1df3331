//! dbquery - relational query construction and multi-dialect SQL compilation
//!
//! This crate builds SELECT queries over a catalog of entities and compiles
//! them to SQL for several database engines:
//! - Entity metadata loaded from YAML, with links and back-references
//! - Automatic join resolution along entity links
//! - Columns, aggregates, conditions, grouping, sorting and paging
//! - Dialect strategies for Oracle, MySQL, PostgreSQL, DB2 and SQL Server
//! - Bounded column aliases and positional bind values

pub mod catalog;
pub mod compiler;
pub mod config;
pub mod dialect;
pub mod query;
pub mod record;

pub use catalog::{Catalog, MetadataProvider};
pub use compiler::{CompiledQuery, SqlCompiler};
pub use dialect::DialectKind;
pub use query::{DbQuery, EntityJoin, QueryError};
