//! FROM clause and join predicates.
//!
//! ANSI engines get `JOIN` / `LEFT JOIN ... ON`. Engines that relocate outer
//! joins list the tables separated by commas and return the join predicates so
//! they can be appended to WHERE, with the outer-join marker on every column of
//! the nullable side.

use super::conditions::CondRenderer;
use super::fragment::Fragment;
use super::{Scope, SqlCompiler};
use crate::query::{JoinedLink, QueryError, Table};

pub(super) struct FromClause {
    pub from: Fragment,
    /// Join predicates to add to WHERE.
    pub relocated: Fragment,
}

fn sql_name(query_tables: &[Table], alias: &str, field: &str) -> Result<String, QueryError> {
    let table = query_tables
        .iter()
        .find(|t| t.alias == alias)
        .ok_or_else(|| QueryError::UnknownTable {
            alias: alias.to_string(),
            known: query_tables.iter().map(|t| t.alias.as_str()).collect::<Vec<_>>().join(", "),
        })?;
    table
        .model
        .field(field)
        .map(|f| f.sql_name.clone())
        .ok_or_else(|| QueryError::unknown_column_with_context(field, alias, "join key"))
}

fn key_predicates(
    query_tables: &[Table],
    table: &Table,
    link: &JoinedLink,
    marker: &str,
) -> Result<Fragment, QueryError> {
    let mut predicates = Fragment::new();
    for (source, target) in link.source_fields.iter().zip(&link.target_fields) {
        let source = sql_name(query_tables, &link.source_alias, source)?;
        let target = sql_name(query_tables, &table.alias, target)?;
        predicates.and_then(Fragment::text(format!(
            "{}.{} = {}.{}{}",
            link.source_alias, source, table.alias, target, marker
        )));
    }
    Ok(predicates)
}

fn table_ref(compiler: &SqlCompiler, table: &Table) -> String {
    match compiler.schemas.schema_name(table.model.schema_id.as_deref()) {
        Some(schema) => format!("{}.{} {}", schema, table.model.table, table.alias),
        None => format!("{} {}", table.model.table, table.alias),
    }
}

pub(super) fn from_clause(
    compiler: &SqlCompiler,
    scope: &Scope<'_>,
    tables: &[&Table],
) -> Result<FromClause, QueryError> {
    let dialect = compiler.dialect;
    let query_tables = scope.query.tables();
    let relocate = dialect.relocates_outer_joins();

    let mut from = Fragment::text(" FROM ");
    let mut relocated = Fragment::new();
    for (index, table) in tables.iter().enumerate() {
        let outer = relocate && table.is_outer();
        let marker = if outer { dialect.outer_join_marker() } else { "" };

        let mut join = Fragment::new();
        for link in &table.links {
            join.and_then(key_predicates(query_tables, table, link, marker)?);
        }
        let renderer = if outer {
            CondRenderer::new(compiler, scope).with_outer_marker(marker)
        } else {
            CondRenderer::new(compiler, scope)
        };
        join.and_then(renderer.render_where(&table.join_conds)?);

        if index == 0 || relocate {
            if index > 0 {
                from.push_str(", ");
            }
            from.push_str(&table_ref(compiler, table));
            relocated.and_then(join);
        } else if join.is_empty() {
            from.push_str(", ");
            from.push_str(&table_ref(compiler, table));
        } else {
            from.push_str(if table.is_outer() { " LEFT JOIN " } else { " JOIN " });
            from.push_str(&table_ref(compiler, table));
            from.push_str(" ON ");
            from.append(join);
        }
    }
    Ok(FromClause { from, relocated })
}
