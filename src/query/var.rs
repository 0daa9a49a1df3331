use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::alias::column_alias;
use super::value::BindValue;
use crate::catalog::FieldModel;

/// Placeholder for the column expression inside aggregate templates.
pub const TEMPLATE_ARG: &str = "{0}";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Visible,
    Invisible,
    Protected,
}

/// How the selected value is computed from the column.
#[derive(Debug, Clone, PartialEq)]
pub enum VarExpr {
    /// The column itself (or the field's SQL expression).
    Column,
    /// A dialect-neutral template such as `sum({0})`.
    Template(String),
    /// Null-coalesced column.
    IfNull(BindValue),
    /// Search/result mapping; each search value is bound, results are raw SQL.
    Decode {
        arms: Vec<(BindValue, String)>,
        default: Option<BindValue>,
    },
}

/// One field of one table of the query, as selected or filtered.
#[derive(Debug, Clone, PartialEq)]
pub struct Var {
    pub table_alias: String,
    pub field: FieldModel,
    /// Output name; the field's column name when unset.
    pub out_alias: Option<String>,
    pub visibility: Visibility,
    pub expr: VarExpr,
    /// Aggregated value: forces the other selected columns into GROUP BY.
    pub grouping: bool,
}

impl Var {
    pub fn new(table_alias: impl Into<String>, field: FieldModel) -> Self {
        Self {
            table_alias: table_alias.into(),
            field,
            out_alias: None,
            visibility: Visibility::Visible,
            expr: VarExpr::Column,
            grouping: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.field.name
    }

    /// `alias.COLUMN`, or the field's SQL expression bound to this table.
    pub fn column_expr(&self) -> String {
        match &self.field.sql_expr {
            Some(expr) if self.field.is_sql_expression() => {
                expr.replace(":tableAlias", &self.table_alias)
            }
            _ => format!("{}.{}", self.table_alias, self.field.sql_name),
        }
    }

    /// Bounded alias under which the value is selected.
    pub fn result_alias(&self) -> String {
        let name = self.out_alias.as_deref().unwrap_or(&self.field.sql_name);
        column_alias(&self.table_alias, name)
    }

    /// Expression used for this var in GROUP BY. SQL-expression fields are
    /// grouped through their select alias.
    pub fn group_by_expr(&self) -> String {
        if self.field.is_sql_expression() {
            column_alias(&self.table_alias, &self.field.sql_name)
        } else {
            self.column_expr()
        }
    }

    pub fn is_from_database(&self) -> bool {
        self.field.is_from_database()
    }

    /// Same table and field, regardless of output alias.
    pub fn same_column(&self, other: &Var) -> bool {
        self.table_alias == other.table_alias && self.field.name == other.field.name
    }

    pub fn matches(&self, column: &str, table_alias: &str) -> bool {
        self.table_alias == table_alias
            && (self.field.name == column
                || self.field.sql_name == column
                || self.out_alias.as_deref() == Some(column))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    /// Parse a direction, falling back to ascending for anything unrecognised.
    pub fn parse_lenient(direction: &str) -> Self {
        direction.parse().unwrap_or_default()
    }
}

impl FromStr for SortDirection {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "ASC" => Ok(SortDirection::Asc),
            "DESC" => Ok(SortDirection::Desc),
            _ => Err(()),
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Asc => f.write_str("ASC"),
            SortDirection::Desc => f.write_str("DESC"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SortVar {
    pub var: Var,
    pub direction: SortDirection,
    /// Result breaks: a change of value starts a new category when reading rows.
    pub categorize: bool,
}

/// A literal output column: `'value' AS name`.
#[derive(Debug, Clone, PartialEq)]
pub struct Const {
    pub name: String,
    pub value: String,
}
