//! WHERE, HAVING and join predicate rendering.

use super::fragment::Fragment;
use super::select::var_expr;
use super::{value_fragment, Scope, SqlCompiler};
use crate::catalog::{FieldModel, SqlType};
use crate::query::{BindValue, ColumnName, Cond, QueryError, Separator, SqlOp, Var};

/// Column searched by concatenated LIKE conditions, typed as free text.
const CONCAT_SEARCH_FIELD: &str = "CONCAT_SEARCH";

/// Renders the conditions of one query.
pub(super) struct CondRenderer<'c> {
    pub compiler: &'c SqlCompiler,
    pub scope: &'c Scope<'c>,
    /// Appended to column references of the nullable side of a relocated outer join.
    pub outer_marker: Option<&'static str>,
}

impl<'c> CondRenderer<'c> {
    pub fn new(compiler: &'c SqlCompiler, scope: &'c Scope<'c>) -> Self {
        Self {
            compiler,
            scope,
            outer_marker: None,
        }
    }

    pub fn with_outer_marker(mut self, marker: &'static str) -> Self {
        self.outer_marker = Some(marker);
        self
    }

    fn case_insensitive(&self, field: &FieldModel) -> bool {
        self.scope.query.is_case_insensitive() && field.sql_type.is_short_text()
    }

    /// WHERE-style list: predicates joined with AND unless separators say otherwise.
    pub fn render_where(&self, conds: &[Cond]) -> Result<Fragment, QueryError> {
        self.render_list(conds, false)
    }

    /// HAVING list: predicates compare the selected expression of the column.
    pub fn render_having(&self, conds: &[Cond]) -> Result<Fragment, QueryError> {
        self.render_list(conds, true)
    }

    fn render_list(&self, conds: &[Cond], having: bool) -> Result<Fragment, QueryError> {
        let mut clause = Fragment::new();
        // Clause length before each open group, to drop groups that render nothing.
        let mut groups: Vec<usize> = Vec::new();
        for cond in conds {
            match cond {
                Cond::Separator(separator @ (Separator::And | Separator::Or)) => {
                    if clause.needs_connector() {
                        clause.push_str(separator.sql());
                    }
                }
                Cond::Separator(Separator::Open) => {
                    groups.push(clause.sql.len());
                    if clause.needs_connector() {
                        clause.push_str(Separator::And.sql());
                    }
                    clause.push_str(Separator::Open.sql());
                }
                Cond::Separator(Separator::Close) => match groups.pop() {
                    Some(start) if clause.sql[start..].trim_end().ends_with('(') => {
                        clause.sql.truncate(start);
                    }
                    _ => {
                        clause.push_str(Separator::Close.sql());
                    }
                },
                Cond::Compare { var, op, values } if having => {
                    let lhs = var_expr(self.compiler.dialect, var);
                    clause.and_then(self.compare(var, *op, values, lhs));
                }
                other => {
                    clause.and_then(self.render(other)?);
                }
            }
        }
        Ok(clause)
    }

    fn column(&self, var: &Var) -> String {
        match self.outer_marker {
            Some(marker) => format!("{}{}", var.column_expr(), marker),
            None => var.column_expr(),
        }
    }

    fn render(&self, cond: &Cond) -> Result<Fragment, QueryError> {
        let dialect = self.compiler.dialect;
        let fragment = match cond {
            Cond::Compare { var, op, values } => {
                let lhs = Fragment::text(self.column(var));
                self.compare(var, *op, values, lhs)
            }
            Cond::Columns { left, op, right } => self.columns(left, *op, right)?,
            Cond::ValueList { var, negated, values } => {
                let op = if *negated { SqlOp::NotIn } else { SqlOp::In };
                let items = values.iter().map(|v| {
                    value_fragment(dialect, &var.field, v).map_sql(|s| format!("({})", s))
                });
                let mut fragment = Fragment::text(format!("{} {} (", self.column(var), op));
                fragment.append(Fragment::join(items, ", ")).push_str(")");
                fragment
            }
            Cond::SubQuery { var, op, query } => {
                let sub = self.compiler.render_nested(query, self.scope)?;
                let mut fragment = Fragment::text(format!("{} {} (", self.column(var), op));
                fragment.append(sub).push_str(")");
                fragment
            }
            Cond::Exists { negated, query } => {
                let sub = self.compiler.render_nested(query, self.scope)?;
                let keyword = if *negated { "NOT EXISTS" } else { "EXISTS" };
                let mut fragment = Fragment::text(format!("{} (", keyword));
                fragment.append(sub).push_str(")");
                fragment
            }
            Cond::ConcatLike { vars, value, negated } => self.concat_like(vars, value, *negated),
            Cond::Separator(_) => Fragment::new(),
        };
        Ok(fragment)
    }

    /// `lhs op value [AND value]`; a null value turns EQ/LIKE and NE/NOT LIKE into null tests.
    fn compare(&self, var: &Var, op: SqlOp, values: &[BindValue], lhs: Fragment) -> Fragment {
        let dialect = self.compiler.dialect;
        let op = match values.first() {
            Some(v) if !v.is_null() => op,
            _ => op.null_rewrite().unwrap_or(op),
        };
        let no_case = self.case_insensitive(&var.field);
        let wrap = |fragment: Fragment| {
            if no_case {
                fragment.map_sql(|s| dialect.upper(&s))
            } else {
                fragment.map_sql(|s| format!("({})", s))
            }
        };

        let mut fragment = wrap(lhs);
        fragment.push_str(&format!(" {}", op));
        if op.arity() == 0 {
            return fragment;
        }
        let operand = |value: &BindValue| {
            let rendered = value_fragment(dialect, &var.field, value);
            if rendered.binds.is_empty() {
                rendered
            } else {
                wrap(rendered)
            }
        };
        fragment.push_str(" ");
        fragment.append(operand(values.first().unwrap_or(&BindValue::Null)));
        if op.arity() > 1 {
            fragment.push_str(" AND ");
            fragment.append(operand(values.get(1).unwrap_or(&BindValue::Null)));
        }
        fragment
    }

    fn resolve(&self, name: &ColumnName) -> Result<Var, QueryError> {
        self.scope.resolve(&name.column, &name.table_alias).ok_or_else(|| {
            QueryError::unknown_column_with_context(
                name.column.as_str(),
                name.table_alias.as_str(),
                format!("column comparison in query {}", self.scope.query.display_name()),
            )
        })
    }

    fn columns(
        &self,
        left: &ColumnName,
        op: SqlOp,
        right: &ColumnName,
    ) -> Result<Fragment, QueryError> {
        let dialect = self.compiler.dialect;
        let left = self.resolve(left)?;
        let right = self.resolve(right)?;
        let no_case = self.case_insensitive(&left.field) && self.case_insensitive(&right.field);
        let side = |var: &Var| {
            if no_case {
                dialect.upper(&var.column_expr())
            } else {
                format!("({})", var.column_expr())
            }
        };
        Ok(Fragment::text(format!("{} {} {}", side(&left), op, side(&right))))
    }

    fn concat_like(&self, vars: &[Var], value: &str, negated: bool) -> Fragment {
        let dialect = self.compiler.dialect;
        let columns: Vec<String> = vars
            .iter()
            .map(|var| {
                let expr = if var.field.sql_type.is_textual() {
                    var.column_expr()
                } else {
                    dialect.to_text(&var.column_expr(), &var.field)
                };
                dialect.if_null(&expr, "''")
            })
            .collect();

        let mut concat = match columns.last() {
            Some(last) => last.clone(),
            None => return Fragment::new(),
        };
        for column in columns.iter().rev().skip(1) {
            concat = dialect.concat(column, &dialect.concat("' '", &concat));
        }

        let search = FieldModel::new(CONCAT_SEARCH_FIELD, CONCAT_SEARCH_FIELD, SqlType::Varchar2);
        let mut value = value.to_string();
        if self.case_insensitive(&search) {
            concat = dialect.upper(&concat);
            value = value.to_uppercase();
        }
        if !value.starts_with('%') {
            value.insert(0, '%');
        }
        if !value.ends_with('%') {
            value.push('%');
        }

        let op = if negated { SqlOp::NotLike } else { SqlOp::Like };
        let mut fragment = Fragment::text(format!("{} {} ", concat, op));
        fragment.append(Fragment::bind(BindValue::Text(value)));
        fragment
    }
}
