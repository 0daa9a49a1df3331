//! GROUP BY / HAVING and ORDER BY.

use super::conditions::CondRenderer;
use super::fragment::Fragment;
use crate::query::{DbQuery, QueryError, Var};

/// Grouping expressions: when an aggregate is selected, every other selected
/// column first, then the explicit group-bys.
pub(super) fn group_by_exprs(query: &DbQuery) -> Vec<String> {
    let explicit: Vec<&Var> = query.group_by_list().iter().filter(|v| !v.grouping).collect();
    let mut exprs = Vec::new();
    if query.has_grouping_column() {
        for var in query.out_vars() {
            if !var.grouping
                && var.is_from_database()
                && !explicit.iter().any(|g| g.same_column(var))
            {
                exprs.push(var.group_by_expr());
            }
        }
    }
    exprs.extend(explicit.iter().map(|v| v.group_by_expr()));
    exprs
}

/// ` GROUP BY ... [HAVING ...]`; HAVING is only emitted with a GROUP BY.
pub(super) fn group_by_clause(
    renderer: &CondRenderer<'_>,
    query: &DbQuery,
) -> Result<Fragment, QueryError> {
    let exprs = group_by_exprs(query);
    if exprs.is_empty() {
        return Ok(Fragment::new());
    }
    let mut clause = Fragment::text(format!(" GROUP BY {}", exprs.join(", ")));
    let having = renderer.render_having(query.having_conds())?;
    if !having.is_empty() {
        clause.push_str(" HAVING ");
        clause.append(having);
    }
    Ok(clause)
}

/// Sort list, or `None` without sort columns.
///
/// A sorted column that is selected is referenced by its result alias. Inside
/// a row-number window the inner query's columns are only reachable by name,
/// so an unselected column is referenced by its column name there.
pub(super) fn order_by_list(query: &DbQuery, in_window: bool) -> Option<String> {
    if query.sort_by_list().is_empty() {
        return None;
    }
    let explicit_select = !query.is_for_update() && !query.out_vars().is_empty();
    let items: Vec<String> = query
        .sort_by_list()
        .iter()
        .map(|sort| {
            let selected = query
                .out_vars()
                .iter()
                .find(|v| explicit_select && v.same_column(&sort.var));
            let key = match selected {
                Some(var) => var.result_alias(),
                None if in_window => sort.var.field.sql_name.clone(),
                None => sort.var.column_expr(),
            };
            format!("{} {}", key, sort.direction)
        })
        .collect();
    Some(items.join(", "))
}
