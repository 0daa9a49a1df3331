//! SQL compilation
//!
//! [`SqlCompiler::compile`] turns a [`DbQuery`] into SQL text for one dialect,
//! the values to bind to its `?` placeholders and the position of every
//! selected column. Compilation reads the query and never changes it, so the
//! same query compiles to the same output every time.
//!
//! Clauses are rendered in a fixed order: SELECT, FROM, WHERE, GROUP BY and
//! HAVING, ORDER BY, then the count or pagination wrapper and `FOR UPDATE`.
//! Each clause is a [`Fragment`] carrying its own binds, so concatenating
//! fragments in text order keeps placeholders and values aligned, subqueries
//! included.

use log::debug;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::catalog::{ConfiguredSchemas, FieldModel, SchemaResolver};
use crate::dialect::{self, Dialect, DialectError, DialectKind};
use crate::query::{pruning, BindValue, DbQuery, QueryError, Table, Var};
use crate::record::EntityRecord;

mod conditions;
pub mod fragment;
mod from;
mod group_by;
mod select;

pub use fragment::Fragment;

/// A selected column of a compiled query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputColumn {
    pub table_alias: String,
    pub field: String,
    /// Alias in the SELECT list.
    pub alias: String,
    /// 1-based position in the SELECT list.
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledQuery {
    pub sql: String,
    pub binds: Vec<BindValue>,
    /// Result alias -> 1-based column index.
    pub index_map: HashMap<String, usize>,
    pub columns: Vec<OutputColumn>,
}

impl CompiledQuery {
    /// Position of the column selected under `alias`.
    pub fn index_of(&self, alias: &str) -> Result<usize, QueryError> {
        self.index_map
            .get(alias)
            .copied()
            .ok_or_else(|| QueryError::UnknownResultColumn {
                alias: alias.to_string(),
                known: self
                    .columns
                    .iter()
                    .map(|c| c.alias.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }

    /// Position of `field` of the table aliased `table_alias`, if selected.
    pub fn index_of_field(&self, table_alias: &str, field: &str) -> Option<usize> {
        self.columns
            .iter()
            .find(|c| c.table_alias == table_alias && c.field == field)
            .map(|c| c.index)
    }

    /// Copy the values of `row` selected from `table_alias` into `record`.
    /// Returns the number of fields set.
    pub fn populate(
        &self,
        row: &[BindValue],
        table_alias: &str,
        record: &mut dyn EntityRecord,
    ) -> usize {
        let mut populated = 0;
        for column in self.columns.iter().filter(|c| c.table_alias == table_alias) {
            if let Some(value) = row.get(column.index - 1) {
                record.set_field(&column.field, value.clone());
                populated += 1;
            }
        }
        populated
    }
}

/// The query being compiled and the queries it is nested in.
pub(crate) struct Scope<'a> {
    pub query: &'a DbQuery,
    pub parent: Option<&'a Scope<'a>>,
}

impl<'a> Scope<'a> {
    pub fn root(query: &'a DbQuery) -> Self {
        Self { query, parent: None }
    }

    /// Resolve a column in this query, then in the enclosing ones.
    pub fn resolve(&self, column: &str, table_alias: &str) -> Option<Var> {
        self.query
            .in_var(column, table_alias)
            .or_else(|| self.parent.and_then(|p| p.resolve(column, table_alias)))
    }
}

/// A bound value, or the dialect's current date/time function for the
/// `*TODAY`/`*NOW` tokens on temporal columns.
pub(crate) fn value_fragment(
    dialect: &dyn Dialect,
    field: &FieldModel,
    value: &BindValue,
) -> Fragment {
    if value.is_now_token() {
        if let Some(function) = dialect.now_for(field.sql_type) {
            return Fragment::text(function);
        }
    }
    Fragment::bind(value.clone())
}

/// Compiles queries for one dialect.
#[derive(Clone)]
pub struct SqlCompiler {
    dialect: &'static dyn Dialect,
    schemas: Arc<dyn SchemaResolver>,
    prune_outer_joins: bool,
}

impl fmt::Debug for SqlCompiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqlCompiler")
            .field("dialect", &self.dialect.kind())
            .field("prune_outer_joins", &self.prune_outer_joins)
            .finish_non_exhaustive()
    }
}

impl SqlCompiler {
    pub fn new(kind: DialectKind) -> Self {
        Self {
            dialect: dialect::strategy(kind),
            schemas: Arc::new(ConfiguredSchemas::default()),
            prune_outer_joins: false,
        }
    }

    /// Compiler for the dialect selected for the process.
    pub fn for_process() -> Result<Self, DialectError> {
        Ok(Self::new(dialect::process_dialect()?))
    }

    pub fn with_schemas(mut self, schemas: Arc<dyn SchemaResolver>) -> Self {
        self.schemas = schemas;
        self
    }

    /// Leave unreferenced LEFT-joined tables out of FROM.
    pub fn with_outer_join_pruning(mut self, prune: bool) -> Self {
        self.prune_outer_joins = prune;
        self
    }

    pub fn dialect(&self) -> &'static dyn Dialect {
        self.dialect
    }

    pub fn compile(&self, query: &DbQuery) -> Result<CompiledQuery, QueryError> {
        let (fragment, columns) = self.render(&Scope::root(query))?;
        let index_map = columns.iter().map(|c| (c.alias.clone(), c.index)).collect();

        debug!("Query {} ({}): {}", query.display_name(), self.dialect.kind(), fragment.sql);
        debug!("Query {} binds: {:?}", query.display_name(), fragment.binds);

        Ok(CompiledQuery {
            sql: fragment.sql,
            binds: fragment.binds,
            index_map,
            columns,
        })
    }

    /// SQL of a subquery; its columns may refer to the enclosing queries.
    pub(crate) fn render_nested(
        &self,
        query: &DbQuery,
        parent: &Scope<'_>,
    ) -> Result<Fragment, QueryError> {
        let scope = Scope {
            query,
            parent: Some(parent),
        };
        Ok(self.render(&scope)?.0)
    }

    fn render(&self, scope: &Scope<'_>) -> Result<(Fragment, Vec<OutputColumn>), QueryError> {
        let query = scope.query;
        let dialect = self.dialect;
        let renderer = conditions::CondRenderer::new(self, scope);

        let user_where = renderer.render_where(query.where_conds())?;
        let tables: Vec<&Table> = if self.prune_outer_joins && !query.is_for_update() {
            pruning::filter_tables(query, &user_where.sql, dialect.relocates_outer_joins())
        } else {
            query.tables().iter().collect()
        };

        let (mut body, columns) = select::select_clause(dialect, query, &tables);
        let from = from::from_clause(self, scope, &tables)?;
        body.append(from.from);

        let mut where_clause = user_where;
        if !from.relocated.is_empty() {
            if where_clause.is_empty() {
                where_clause = from.relocated;
            } else {
                where_clause.push_str(" AND (");
                where_clause.append(from.relocated);
                where_clause.push_str(")");
            }
        }
        if !where_clause.is_empty() {
            body.push_str(" WHERE ");
            body.append(where_clause);
        }
        body.append(group_by::group_by_clause(&renderer, query)?);

        let paged = query.is_paged() && !query.is_count();
        let sort_in_window = paged && dialect.sorts_inside_window();
        if !query.is_count() && !sort_in_window {
            if let Some(order_by) = group_by::order_by_list(query, false) {
                body.push_str(" ORDER BY ");
                body.push_str(&order_by);
            }
        }

        let mut fragment = if query.is_count() {
            body.map_sql(|sql| dialect.wrap_count(&sql))
        } else if paged {
            let window_order = if sort_in_window {
                group_by::order_by_list(query, true)
            } else {
                None
            };
            body.map_sql(|sql| {
                dialect.wrap_window(
                    &sql,
                    window_order.as_deref(),
                    query.min_rownum(),
                    query.max_rownum(),
                )
            })
        } else {
            body
        };
        if query.is_for_update() {
            fragment.push_str(" FOR UPDATE");
        }
        Ok((fragment, columns))
    }
}
