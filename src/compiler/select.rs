//! SELECT list rendering.

use super::fragment::Fragment;
use super::{value_fragment, OutputColumn};
use crate::dialect::Dialect;
use crate::query::{DbQuery, Table, Var, VarExpr, TEMPLATE_ARG};

/// Selected expression of a var: the column, or the aggregate, decode or
/// null-coalescing expression built on it.
pub(super) fn var_expr(dialect: &dyn Dialect, var: &Var) -> Fragment {
    let column = var.column_expr();
    match &var.expr {
        VarExpr::Column => Fragment::text(column),
        VarExpr::Template(template) => Fragment::text(template.replace(TEMPLATE_ARG, &column)),
        VarExpr::IfNull(value) => {
            let fallback = value_fragment(dialect, &var.field, value);
            Fragment {
                sql: dialect.if_null(&column, &fallback.sql),
                binds: fallback.binds,
            }
        }
        VarExpr::Decode { arms, default } => {
            let mut binds = Vec::new();
            let mut rendered_arms = Vec::with_capacity(arms.len());
            for (search, result) in arms {
                let search = value_fragment(dialect, &var.field, search);
                binds.extend(search.binds);
                rendered_arms.push((search.sql, result.clone()));
            }
            let default = default.as_ref().map(|d| value_fragment(dialect, &var.field, d));
            let default_sql = default.as_ref().map(|d| d.sql.as_str());
            let sql = dialect.decode(&column, &rendered_arms, default_sql);
            if let Some(default) = default {
                binds.extend(default.binds);
            }
            Fragment { sql, binds }
        }
    }
}

/// `SELECT [DISTINCT] ...` and the description of the selected columns.
///
/// Every table is selected with `alias.*` when the query has no output
/// columns or locks its rows.
pub(super) fn select_clause(
    dialect: &dyn Dialect,
    query: &DbQuery,
    tables: &[&Table]) -> (Fragment, Vec<OutputColumn>,
) {
    let mut clause = Fragment::text("SELECT ");
    if query.is_distinct() {
        clause.push_str("DISTINCT ");
    }

    if query.is_for_update() || query.out_vars().is_empty() {
        let all = tables
            .iter()
            .map(|t| format!("{}.*", t.alias))
            .collect::<Vec<_>>()
            .join(", ");
        clause.push_str(&all);
        return (clause, Vec::new());
    }

    let mut columns = Vec::new();
    let mut items = Vec::new();
    for var in query.out_vars().iter().filter(|v| v.is_from_database()) {
        let alias = var.result_alias();
        let mut item = var_expr(dialect, var);
        item.push_str(&format!(" AS {}", alias));
        items.push(item);
        columns.push(OutputColumn {
            table_alias: var.table_alias.clone(),
            field: var.field.name.clone(),
            alias,
            index: columns.len() + 1,
        });
    }
    if !query.is_count() {
        for constant in query.consts() {
            items.push(Fragment::text(format!(
                "{} AS {}",
                dialect.quote_literal(&constant.value),
                constant.name
            )));
        }
    }
    clause.append(Fragment::join(items, ", "));
    (clause, columns)
}
