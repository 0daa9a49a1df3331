//! Removal of unused outer-joined tables.
//!
//! A LEFT-joined table that nothing refers to does not change the result and
//! can be left out of FROM. A table is used when the WHERE clause names its
//! alias, when it is selected, sorted on or compared in HAVING, or when it is
//! not outer-joined at all. Every table named by the join predicate of a kept
//! table is kept as well, up to a fixpoint. With ANSI joins a join predicate
//! travels with its table, so any table another one is joined through stays.

use log::debug;
use regex::Regex;
use std::collections::HashSet;

use super::cond::Cond;
use super::table::Table;
use super::var::Visibility;
use super::DbQuery;

/// True when `sql` mentions a column of the table aliased `alias`.
pub fn clause_references(sql: &str, alias: &str) -> bool {
    match Regex::new(&format!(r"\b{}\.", regex::escape(alias))) {
        Ok(re) => re.is_match(sql),
        Err(_) => sql.contains(&format!("{}.", alias)),
    }
}

fn selected_or_sorted(query: &DbQuery, alias: &str) -> bool {
    query
        .out_vars()
        .iter()
        .any(|v| v.table_alias == alias && v.visibility != Visibility::Invisible)
        || query.sort_by_list().iter().any(|s| s.var.table_alias == alias)
}

fn having_references(query: &DbQuery, alias: &str) -> bool {
    query.having_conds().iter().any(|cond| match cond {
        Cond::Compare { var, .. } => var.table_alias == alias,
        _ => false,
    })
}

fn directly_used(query: &DbQuery, index: usize, table: &Table, where_sql: &str) -> bool {
    let alias = table.alias.as_str();
    index == 0
        || !table.is_outer()
        || clause_references(where_sql, alias)
        || selected_or_sorted(query, alias)
        || having_references(query, alias)
}

/// Aliases of the LEFT-joined tables that can be dropped. `where_sql` is the
/// rendered user WHERE clause (without relocated join predicates). Nothing is
/// pruned when the query has explicit group-bys.
pub fn prunable_tables(query: &DbQuery, where_sql: &str, relocated: bool) -> Vec<String> {
    if !query.group_by_list().is_empty() {
        return Vec::new();
    }
    let tables = query.tables();
    let mut kept: HashSet<&str> = tables
        .iter()
        .enumerate()
        .filter(|(index, table)| directly_used(query, *index, table, where_sql))
        .map(|(_, table)| table.alias.as_str())
        .collect();
    if !relocated {
        kept.extend(tables.iter().flat_map(|t| t.links.iter().map(|l| l.source_alias.as_str())));
    }

    let mut pending: Vec<&str> = kept.iter().copied().collect();
    while let Some(alias) = pending.pop() {
        let Some(table) = tables.iter().find(|t| t.alias == alias) else {
            continue;
        };
        for link in &table.links {
            if kept.insert(link.source_alias.as_str()) {
                pending.push(link.source_alias.as_str());
            }
        }
    }

    let prunable: Vec<String> = tables
        .iter()
        .filter(|t| !kept.contains(t.alias.as_str()))
        .map(|t| t.alias.clone())
        .collect();
    if !prunable.is_empty() {
        debug!("Query {}: unused outer joins {:?}", query.display_name(), prunable);
    }
    prunable
}

/// The query's tables without the prunable ones, in query order.
pub fn filter_tables<'a>(query: &'a DbQuery, where_sql: &str, relocated: bool) -> Vec<&'a Table> {
    let prunable = prunable_tables(query, where_sql, relocated);
    query
        .tables()
        .iter()
        .filter(|t| !prunable.contains(&t.alias))
        .collect()
}
