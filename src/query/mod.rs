//! Query model
//!
//! A [`DbQuery`] describes one SELECT over entities of the catalog: its tables
//! and the joins between them, the selected columns, WHERE/HAVING predicates,
//! grouping, sorting, paging and flags. It is a plain value: compiling it
//! (see [`crate::compiler`]) never modifies it, and variants such as a count
//! query or another page are derived with [`DbQuery::to_count`] and
//! [`DbQuery::with_window`].
//!
//! ```ignore
//! let mut query = DbQuery::new(catalog, "Order")?;
//! query
//!     .join(EntityJoin::new("Customer").via("customer").loose())?
//!     .add_cond_eq("status", "T1", "OPEN")?
//!     .add_sort_by("orderDate", "T1", "DESC")?;
//! let compiled = compiler.compile(&query.with_window(0, 10))?;
//! ```

use log::{debug, warn};
use std::fmt;
use std::sync::Arc;

use crate::catalog::{EntityModel, MetadataProvider, SqlType};

pub mod alias;
pub mod cond;
pub mod errors;
pub mod join_resolver;
pub mod link_query;
pub mod pruning;
pub mod query_def;
pub mod table;
pub mod value;
pub mod var;

pub use cond::{ColumnName, Cond, Separator, SqlOp};
pub use errors::QueryError;
pub use link_query::link_query;
pub use query_def::{QuerySpec, QuerySpecError};
pub use table::{JoinKind, JoinedLink, Table};
pub use value::{BindValue, Key, NOW, TODAY};
pub use var::{Const, SortDirection, SortVar, Var, VarExpr, Visibility, TEMPLATE_ARG};

/// Options of [`DbQuery::join`]: which entity to add and how to attach it.
#[derive(Debug, Clone)]
pub struct EntityJoin {
    pub entity: String,
    pub alias: Option<String>,
    pub link_name: Option<String>,
    pub target_alias: Option<String>,
    pub kind: JoinKind,
    pub select_all_columns: bool,
    pub join_filter: Option<JoinFilter>,
}

impl EntityJoin {
    /// Strict join, all columns selected, link found automatically.
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            alias: None,
            link_name: None,
            target_alias: None,
            kind: JoinKind::Strict,
            select_all_columns: true,
            join_filter: None,
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Join through the link (or back-reference) of that name.
    pub fn via(mut self, link_name: impl Into<String>) -> Self {
        self.link_name = Some(link_name.into());
        self
    }

    /// Restrict the named link to the table with this alias.
    pub fn from(mut self, target_alias: impl Into<String>) -> Self {
        self.target_alias = Some(target_alias.into());
        self
    }

    pub fn kind(mut self, kind: JoinKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn loose(self) -> Self {
        self.kind(JoinKind::Loose)
    }

    pub fn cartesian(self) -> Self {
        self.kind(JoinKind::None)
    }

    pub fn without_columns(mut self) -> Self {
        self.select_all_columns = false;
        self
    }

    pub fn filter(mut self, filter: JoinFilter) -> Self {
        self.join_filter = Some(filter);
        self
    }
}

/// Extra predicate on a column of a joined table.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinFilter {
    pub column: String,
    pub op: SqlOp,
    pub values: Vec<BindValue>,
}

impl JoinFilter {
    pub fn new(column: impl Into<String>, op: SqlOp, values: Vec<BindValue>) -> Self {
        Self {
            column: column.into(),
            op,
            values,
        }
    }
}

#[derive(Clone)]
pub struct DbQuery {
    provider: Arc<dyn MetadataProvider>,
    name: Option<String>,
    tables: Vec<Table>,
    out_vars: Vec<Var>,
    consts: Vec<Const>,
    where_conds: Vec<Cond>,
    having_conds: Vec<Cond>,
    group_by: Vec<Var>,
    sort_vars: Vec<SortVar>,
    min_rownum: i64,
    max_rownum: i64,
    count: bool,
    distinct: bool,
    case_insensitive: bool,
    for_update: bool,
    fetch_size: Option<u32>,
    strict_joins: bool,
    first_add_column: bool,
}

impl fmt::Debug for DbQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbQuery")
            .field("name", &self.name)
            .field("tables", &self.aliases())
            .field("out_vars", &self.out_vars.len())
            .field("where_conds", &self.where_conds.len())
            .field("having_conds", &self.having_conds.len())
            .field("min_rownum", &self.min_rownum)
            .field("max_rownum", &self.max_rownum)
            .field("count", &self.count)
            .finish_non_exhaustive()
    }
}

impl DbQuery {
    /// A query over `entity`, aliased `T1`, selecting all of its columns.
    pub fn new(provider: Arc<dyn MetadataProvider>, entity: &str) -> Result<Self, QueryError> {
        Self::build(provider, EntityJoin::new(entity))
    }

    pub fn with_alias(
        provider: Arc<dyn MetadataProvider>,
        entity: &str,
        alias: &str,
    ) -> Result<Self, QueryError> {
        Self::build(provider, EntityJoin::new(entity).alias(alias))
    }

    /// A query whose first table is described by `first` (its link fields are ignored).
    pub fn build(
        provider: Arc<dyn MetadataProvider>,
        first: EntityJoin,
    ) -> Result<Self, QueryError> {
        let mut query = Self {
            provider,
            name: None,
            tables: Vec::new(),
            out_vars: Vec::new(),
            consts: Vec::new(),
            where_conds: Vec::new(),
            having_conds: Vec::new(),
            group_by: Vec::new(),
            sort_vars: Vec::new(),
            min_rownum: 0,
            max_rownum: -1,
            count: false,
            distinct: false,
            case_insensitive: true,
            for_update: false,
            fetch_size: None,
            strict_joins: false,
            first_add_column: true,
        };
        query.join(first)?;
        Ok(query)
    }

    // ========================================================================
    // Tables and joins
    // ========================================================================

    /// Add an entity to the query, joined to the tables already present.
    pub fn join(&mut self, spec: EntityJoin) -> Result<&mut Self, QueryError> {
        let model = self
            .provider
            .entity(&spec.entity)
            .ok_or_else(|| QueryError::UnknownEntity(spec.entity.clone()))?;

        if self.tables.is_empty() {
            let alias = self.add_table(
                model,
                spec.alias.as_deref(),
                spec.kind,
                spec.select_all_columns,
            )?;
            self.apply_join_filter(&alias, spec.join_filter)?;
            return Ok(self);
        }

        if spec.link_name.is_none()
            && self
                .find_table(&spec.entity, spec.alias.as_deref())
                .is_some()
        {
            warn!(
                "Entity {} ({}) is already in query {}",
                spec.entity,
                spec.alias.as_deref().unwrap_or("-"),
                self.display_name()
            );
            return Ok(self);
        }

        if spec.kind == JoinKind::None {
            let alias = self.add_table(
                model,
                spec.alias.as_deref(),
                spec.kind,
                spec.select_all_columns,
            )?;
            self.apply_join_filter(&alias, spec.join_filter)?;
            return Ok(self);
        }

        let existing_alias = self
            .find_table(&spec.entity, spec.alias.as_deref())
            .map(|t| t.alias.clone());
        let joined = {
            let candidate = join_resolver::resolve(
                &self.tables,
                &spec.entity,
                spec.link_name.as_deref(),
                spec.target_alias.as_deref(),
                self.strict_joins,
            )?;
            let alias_for_keys = existing_alias
                .clone()
                .or_else(|| spec.alias.clone())
                .unwrap_or_else(|| self.next_alias());
            candidate.joined_link(&model, &alias_for_keys)?
        };

        if let Some(alias) = &existing_alias {
            let already = self
                .tables
                .iter()
                .any(|t| &t.alias == alias && t.has_link(&joined.link_name, &joined.source_alias));
            if already {
                warn!(
                    "Entity {} ({}) is already joined with link {} from {}",
                    spec.entity, alias, joined.link_name, joined.source_alias
                );
                return Ok(self);
            }
        }

        let alias = match existing_alias {
            Some(alias) => alias,
            None => {
                let alias = self.add_table(
                model,
                spec.alias.as_deref(),
                spec.kind,
                spec.select_all_columns,
            )?;
                self.apply_join_filter(&alias, spec.join_filter)?;
                alias
            }
        };
        let table = self.table_mut(&alias)?;
        table.join_kind = spec.kind;
        table.links.push(joined);
        Ok(self)
    }

    /// Add an entity joined automatically with the given kind.
    pub fn add_entity(
        &mut self,
        entity: &str,
        alias: Option<&str>,
        kind: JoinKind,
    ) -> Result<&mut Self, QueryError> {
        let mut spec = EntityJoin::new(entity).kind(kind);
        spec.alias = alias.map(str::to_string);
        self.join(spec)
    }

    fn add_table(
        &mut self,
        model: Arc<EntityModel>,
        alias: Option<&str>,
        kind: JoinKind,
        select_all: bool,
    ) -> Result<String, QueryError> {
        let alias = match alias.filter(|a| !a.is_empty()) {
            Some(alias) if self.tables.iter().any(|t| t.alias == alias) => {
                return Err(QueryError::DuplicateAlias(alias.to_string()))
            }
            Some(alias) => alias.to_string(),
            None => self.next_alias(),
        };
        if select_all {
            for field in model.db_fields() {
                self.out_vars.push(Var::new(alias.clone(), field.clone()));
            }
        }
        debug!("Query {}: {} {} added", self.display_name(), model.name, alias);
        self.tables.push(Table::new(alias.clone(), model, kind));
        Ok(alias)
    }

    fn next_alias(&self) -> String {
        format!("T{}", self.tables.len() + 1)
    }

    fn apply_join_filter(
        &mut self,
        alias: &str,
        filter: Option<JoinFilter>,
    ) -> Result<(), QueryError> {
        match filter {
            Some(f) => self.add_join_cond(alias, &f.column, f.op, f.values).map(|_| ()),
            None => Ok(()),
        }
    }

    /// Add a predicate to the join of `table_alias`.
    pub fn add_join_cond(
        &mut self,
        table_alias: &str,
        column: &str,
        op: SqlOp,
        values: Vec<BindValue>,
    ) -> Result<&mut Self, QueryError> {
        let cond = self.compare_cond(column, table_alias, op, values, "join condition")?;
        self.table_mut(table_alias)?.join_conds.push(cond);
        Ok(self)
    }

    /// Override the key pairing of the join from `source_alias` into `table_alias`.
    pub fn set_join_keys(
        &mut self,
        table_alias: &str,
        source_alias: &str,
        source_fields: Vec<String>,
        target_fields: Vec<String>,
    ) -> Result<&mut Self, QueryError> {
        if source_fields.len() != target_fields.len() {
            return Err(QueryError::KeyArityMismatch {
                source_alias: source_alias.to_string(),
                alias: table_alias.to_string(),
                source_fields: source_fields.len(),
                target_fields: target_fields.len(),
            });
        }
        let table = self.table_mut(table_alias)?;
        let link = table
            .links
            .iter_mut()
            .find(|l| l.source_alias == source_alias)
            .ok_or_else(|| QueryError::UnknownJoin {
                source_alias: source_alias.to_string(),
                alias: table_alias.to_string(),
            })?;
        link.source_fields = source_fields;
        link.target_fields = target_fields;
        Ok(self)
    }

    // ========================================================================
    // Lookups
    // ========================================================================

    pub fn table(&self, alias: &str) -> Result<&Table, QueryError> {
        self.tables
            .iter()
            .find(|t| t.alias == alias)
            .ok_or_else(|| self.unknown_table(alias))
    }

    fn table_mut(&mut self, alias: &str) -> Result<&mut Table, QueryError> {
        match self.tables.iter().position(|t| t.alias == alias) {
            Some(index) => Ok(&mut self.tables[index]),
            None => Err(self.unknown_table(alias)),
        }
    }

    fn unknown_table(&self, alias: &str) -> QueryError {
        QueryError::UnknownTable {
            alias: alias.to_string(),
            known: self.aliases().join(", "),
        }
    }

    fn find_table(&self, entity: &str, alias: Option<&str>) -> Option<&Table> {
        self.tables.iter().find(|t| {
            t.entity().eq_ignore_ascii_case(entity)
                && alias.map_or(true, |a| a.eq_ignore_ascii_case(&t.alias))
        })
    }

    /// The var for `column` of table `table_alias`; the column may be given by
    /// field name, db-name form or column name.
    pub fn in_var(&self, column: &str, table_alias: &str) -> Option<Var> {
        let table = self.tables.iter().find(|t| t.alias == table_alias)?;
        let model = &table.model;
        let field = model
            .field(column)
            .or_else(|| model.fields.iter().find(|f| alias::db_name(&f.name) == column))
            .or_else(|| model.field_by_name_or_sql_name(column))
            .filter(|f| f.is_from_database())?;
        Some(Var::new(table_alias, field.clone()))
    }

    fn require_in_var(&self, column: &str, table_alias: &str) -> Result<Var, QueryError> {
        self.table(table_alias)?;
        self.in_var(column, table_alias).ok_or_else(|| QueryError::UnknownColumn {
            column: column.to_string(),
            alias: table_alias.to_string(),
        })
    }

    /// Output var for `column` (matched by field name, column name or output alias).
    pub fn find_out_var(&self, column: &str, table_alias: &str) -> Option<&Var> {
        self.out_vars.iter().find(|v| v.matches(column, table_alias))
    }

    // ========================================================================
    // Output columns
    // ========================================================================

    pub fn add_column(&mut self, column: &str, table_alias: &str) -> Result<&mut Self, QueryError> {
        self.add_out_var(column, table_alias, None, Visibility::Visible, None)?;
        Ok(self)
    }

    pub fn add_column_as(
        &mut self,
        column: &str,
        table_alias: &str,
        as_name: &str,
    ) -> Result<&mut Self, QueryError> {
        self.add_out_var(column, table_alias, Some(as_name), Visibility::Visible, None)?;
        Ok(self)
    }

    pub fn add_column_with_visibility(
        &mut self,
        column: &str,
        table_alias: &str,
        visibility: Visibility,
    ) -> Result<&mut Self, QueryError> {
        self.add_out_var(column, table_alias, None, visibility, None)?;
        Ok(self)
    }

    /// Select a column. The first explicit column replaces the columns
    /// selected by default; a column already selected is updated in place.
    fn add_out_var(
        &mut self,
        column: &str,
        table_alias: &str,
        as_name: Option<&str>,
        visibility: Visibility,
        expr: Option<VarExpr>,
    ) -> Result<&mut Var, QueryError> {
        let var = self.require_in_var(column, table_alias)?;
        if self.first_add_column {
            self.remove_all_columns();
            self.first_add_column = false;
        }

        let index = match self.out_vars.iter().position(|v| v.same_column(&var)) {
            Some(index) => index,
            None => {
                self.out_vars.push(var);
                self.out_vars.len() - 1
            }
        };
        let out = &mut self.out_vars[index];
        if visibility != Visibility::Visible {
            out.visibility = visibility;
        }
        out.out_alias = as_name.map(str::to_string);
        if let Some(expr) = expr {
            out.grouping = true;
            out.expr = match (&out.expr, expr) {
                (VarExpr::Template(inner), VarExpr::Template(outer)) => {
                    VarExpr::Template(outer.replace(TEMPLATE_ARG, inner))
                }
                (_, expr) => expr,
            };
        }
        Ok(out)
    }

    /// Select a literal: `'value' AS name`.
    pub fn add_column_const(&mut self, name: &str, value: &str) -> &mut Self {
        self.consts.push(Const {
            name: name.to_string(),
            value: value.to_string(),
        });
        self
    }

    pub fn remove_column(&mut self, column: &str, table_alias: &str) -> &mut Self {
        self.out_vars.retain(|v| !v.matches(column, table_alias));
        self
    }

    /// Clear the select list and the explicit GROUP BY.
    pub fn remove_all_columns(&mut self) -> &mut Self {
        self.out_vars.clear();
        self.group_by.clear();
        self
    }

    /// Select every database column of a table.
    pub fn add_all_columns(&mut self, table_alias: &str) -> Result<&mut Self, QueryError> {
        let fields: Vec<_> = self.table(table_alias)?.model.db_fields().cloned().collect();
        for field in fields {
            let var = Var::new(table_alias, field);
            if !self.out_vars.iter().any(|v| v.same_column(&var)) {
                self.out_vars.push(var);
            }
        }
        Ok(self)
    }

    /// Remove the columns of a table from the select list.
    pub fn remove_out_vars(&mut self, table_alias: &str) -> &mut Self {
        self.out_vars.retain(|v| v.table_alias != table_alias);
        self
    }

    // ========================================================================
    // Aggregates and computed columns
    // ========================================================================

    fn add_template(
        &mut self,
        column: &str,
        table_alias: &str,
        as_name: Option<&str>,
        template: &str,
    ) -> Result<&mut Var, QueryError> {
        self.add_out_var(
            column,
            table_alias,
            as_name,
            Visibility::Visible,
            Some(VarExpr::Template(template.to_string())),
        )
    }

    pub fn add_avg(
        &mut self,
        column: &str,
        table_alias: &str,
        as_name: Option<&str>,
    ) -> Result<&mut Self, QueryError> {
        self.add_template(column, table_alias, as_name, "avg({0})")?;
        Ok(self)
    }

    pub fn add_sum(
        &mut self,
        column: &str,
        table_alias: &str,
        as_name: Option<&str>,
    ) -> Result<&mut Self, QueryError> {
        self.add_template(column, table_alias, as_name, "sum({0})")?;
        Ok(self)
    }

    pub fn add_min(
        &mut self,
        column: &str,
        table_alias: &str,
        as_name: Option<&str>,
    ) -> Result<&mut Self, QueryError> {
        self.add_template(column, table_alias, as_name, "min({0})")?;
        Ok(self)
    }

    pub fn add_max(
        &mut self,
        column: &str,
        table_alias: &str,
        as_name: Option<&str>,
    ) -> Result<&mut Self, QueryError> {
        self.add_template(column, table_alias, as_name, "max({0})")?;
        Ok(self)
    }

    pub fn add_distinct(
        &mut self,
        column: &str,
        table_alias: &str,
        as_name: Option<&str>,
    ) -> Result<&mut Self, QueryError> {
        self.add_template(column, table_alias, as_name, "distinct({0})")?;
        Ok(self)
    }

    /// `count(col)` or `count(distinct col)`, read back as an integer.
    pub fn add_count(
        &mut self,
        column: &str,
        table_alias: &str,
        as_name: Option<&str>,
        distinct: bool,
    ) -> Result<&mut Self, QueryError> {
        let template = if distinct { "count(distinct {0})" } else { "count({0})" };
        let var = self.add_template(column, table_alias, as_name, template)?;
        var.field.sql_type = SqlType::Integer;
        Ok(self)
    }

    /// Map the column through search/result pairs. Search values are bound,
    /// results are SQL text.
    pub fn add_decode(
        &mut self,
        column: &str,
        table_alias: &str,
        as_name: Option<&str>,
        arms: Vec<(BindValue, String)>,
        default: Option<BindValue>,
    ) -> Result<&mut Self, QueryError> {
        if arms.is_empty() && default.is_none() {
            return Err(QueryError::MissingArguments("add_decode".to_string()));
        }
        let var = self.require_in_var(column, table_alias)?;
        let arms = arms
            .into_iter()
            .map(|(search, result)| Ok((value::coerce(&var.field, search)?, result)))
            .collect::<Result<Vec<_>, QueryError>>()?;
        let default = default.map(|d| value::coerce(&var.field, d)).transpose()?;
        self.add_out_var(
            column,
            table_alias,
            as_name,
            Visibility::Visible,
            Some(VarExpr::Decode { arms, default }),
        )?;
        Ok(self)
    }

    /// Select the column with nulls replaced by `value`.
    pub fn add_if_null(
        &mut self,
        column: &str,
        table_alias: &str,
        as_name: Option<&str>,
        value: BindValue,
    ) -> Result<&mut Self, QueryError> {
        if value.is_null() {
            return Err(QueryError::MissingArguments("add_if_null".to_string()));
        }
        let var = self.require_in_var(column, table_alias)?;
        let value = value::coerce(&var.field, value)?;
        self.add_out_var(
            column,
            table_alias,
            as_name,
            Visibility::Visible,
            Some(VarExpr::IfNull(value)),
        )?;
        Ok(self)
    }

    // ========================================================================
    // WHERE
    // ========================================================================

    fn compare_cond(
        &self,
        column: &str,
        table_alias: &str,
        op: SqlOp,
        values: Vec<BindValue>,
        context: &str,
    ) -> Result<Cond, QueryError> {
        if matches!(op, SqlOp::In | SqlOp::NotIn) {
            return Err(QueryError::illegal_operator(
                op,
                format!("{}, use add_cond_in_list", context),
            ));
        }
        let var = self.require_in_var(column, table_alias)?;
        Self::checked_compare(var, op, values, context)
    }

    fn checked_compare(
        var: Var,
        op: SqlOp,
        mut values: Vec<BindValue>,
        context: &str,
    ) -> Result<Cond, QueryError> {
        if values.len() < op.arity() {
            if op == SqlOp::Between {
                return Err(QueryError::MissingArguments(format!("{} BETWEEN", context)));
            }
            values.resize(op.arity(), BindValue::Null);
        }
        values.truncate(op.arity());
        let values = values
            .into_iter()
            .map(|v| match v {
                BindValue::Text(pattern) if op.is_pattern() && !var.field.sql_type.is_textual() => {
                    Ok(BindValue::Text(pattern))
                }
                v => value::coerce(&var.field, v),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Cond::Compare { var, op, values })
    }

    /// `column op value`. BETWEEN and IN have their own methods.
    pub fn add_cond(
        &mut self,
        column: &str,
        table_alias: &str,
        op: SqlOp,
        value: impl Into<BindValue>,
    ) -> Result<&mut Self, QueryError> {
        if op == SqlOp::Between {
            return Err(QueryError::illegal_operator(op, "add_cond, use add_cond_between"));
        }
        let cond = self.compare_cond(column, table_alias, op, vec![value.into()], "add_cond")?;
        self.where_conds.push(cond);
        Ok(self)
    }

    pub fn add_cond_eq(
        &mut self,
        column: &str,
        table_alias: &str,
        value: impl Into<BindValue>,
    ) -> Result<&mut Self, QueryError> {
        self.add_cond(column, table_alias, SqlOp::Eq, value)
    }

    pub fn add_cond_neq(
        &mut self,
        column: &str,
        table_alias: &str,
        value: impl Into<BindValue>,
    ) -> Result<&mut Self, QueryError> {
        self.add_cond(column, table_alias, SqlOp::Ne, value)
    }

    pub fn add_cond_gt(
        &mut self,
        column: &str,
        table_alias: &str,
        value: impl Into<BindValue>,
    ) -> Result<&mut Self, QueryError> {
        self.add_cond(column, table_alias, SqlOp::Gt, value)
    }

    pub fn add_cond_ge(
        &mut self,
        column: &str,
        table_alias: &str,
        value: impl Into<BindValue>,
    ) -> Result<&mut Self, QueryError> {
        self.add_cond(column, table_alias, SqlOp::Ge, value)
    }

    pub fn add_cond_lt(
        &mut self,
        column: &str,
        table_alias: &str,
        value: impl Into<BindValue>,
    ) -> Result<&mut Self, QueryError> {
        self.add_cond(column, table_alias, SqlOp::Lt, value)
    }

    pub fn add_cond_le(
        &mut self,
        column: &str,
        table_alias: &str,
        value: impl Into<BindValue>,
    ) -> Result<&mut Self, QueryError> {
        self.add_cond(column, table_alias, SqlOp::Le, value)
    }

    pub fn add_cond_like(
        &mut self,
        column: &str,
        table_alias: &str,
        value: impl Into<BindValue>,
    ) -> Result<&mut Self, QueryError> {
        self.add_cond(column, table_alias, SqlOp::Like, value)
    }

    pub fn add_cond_not_like(
        &mut self,
        column: &str,
        table_alias: &str,
        value: impl Into<BindValue>,
    ) -> Result<&mut Self, QueryError> {
        self.add_cond(column, table_alias, SqlOp::NotLike, value)
    }

    pub fn add_cond_between(
        &mut self,
        column: &str,
        table_alias: &str,
        low: impl Into<BindValue>,
        high: impl Into<BindValue>,
    ) -> Result<&mut Self, QueryError> {
        let cond = self.compare_cond(
            column,
            table_alias,
            SqlOp::Between,
            vec![low.into(), high.into()],
            "add_cond_between",
        )?;
        self.where_conds.push(cond);
        Ok(self)
    }

    pub fn add_cond_is_null(
        &mut self,
        column: &str,
        table_alias: &str,
        negated: bool,
    ) -> Result<&mut Self, QueryError> {
        let op = if negated { SqlOp::IsNotNull } else { SqlOp::IsNull };
        let cond = self.compare_cond(column, table_alias, op, Vec::new(), "add_cond_is_null")?;
        self.where_conds.push(cond);
        Ok(self)
    }

    /// Equality on each non-null field of `key`. A missing key adds nothing.
    pub fn add_cond_key(
        &mut self,
        key: Option<&Key>,
        table_alias: &str,
    ) -> Result<&mut Self, QueryError> {
        let Some(key) = key else {
            return Ok(self);
        };
        for (field, value) in key.values() {
            if value.is_null() {
                continue;
            }
            let values = vec![value.clone()];
            let cond = self.compare_cond(field, table_alias, SqlOp::Eq, values, "add_cond_key")?;
            self.where_conds.push(cond);
        }
        Ok(self)
    }

    /// Compare two columns; either may belong to an enclosing query when this
    /// query is used as a subquery.
    pub fn add_cond_columns(
        &mut self,
        left_column: &str,
        left_alias: &str,
        op: SqlOp,
        right_column: &str,
        right_alias: &str,
    ) -> Result<&mut Self, QueryError> {
        if op.arity() != 1 || matches!(op, SqlOp::In | SqlOp::NotIn) {
            return Err(QueryError::illegal_operator(op, "add_cond_columns"));
        }
        for (column, alias) in [(left_column, left_alias), (right_column, right_alias)] {
            if self.tables.iter().any(|t| t.alias == alias) {
                self.require_in_var(column, alias)?;
            }
        }
        self.where_conds.push(Cond::Columns {
            left: ColumnName::new(left_column, left_alias),
            op,
            right: ColumnName::new(right_column, right_alias),
        });
        Ok(self)
    }

    /// `column [NOT] IN (values)`. An empty list adds nothing.
    pub fn add_cond_in_list(
        &mut self,
        column: &str,
        table_alias: &str,
        values: Vec<BindValue>,
        negated: bool,
    ) -> Result<&mut Self, QueryError> {
        if values.is_empty() {
            return Ok(self);
        }
        let var = self.require_in_var(column, table_alias)?;
        let values = values
            .into_iter()
            .map(|v| value::coerce(&var.field, v))
            .collect::<Result<Vec<_>, _>>()?;
        self.where_conds.push(Cond::ValueList { var, negated, values });
        Ok(self)
    }

    /// `column op (subquery)` for a comparison operator.
    pub fn add_cond_subquery(
        &mut self,
        column: &str,
        table_alias: &str,
        op: SqlOp,
        subquery: DbQuery,
    ) -> Result<&mut Self, QueryError> {
        if op.arity() != 1 || matches!(op, SqlOp::Like | SqlOp::NotLike) {
            return Err(QueryError::illegal_operator(op, "add_cond_subquery"));
        }
        let var = self.require_in_var(column, table_alias)?;
        self.where_conds.push(Cond::SubQuery {
            var,
            op,
            query: Arc::new(subquery),
        });
        Ok(self)
    }

    /// `column [NOT] IN (subquery)`.
    pub fn add_cond_in(
        &mut self,
        column: &str,
        table_alias: &str,
        subquery: DbQuery,
        negated: bool,
    ) -> Result<&mut Self, QueryError> {
        let op = if negated { SqlOp::NotIn } else { SqlOp::In };
        self.add_cond_subquery(column, table_alias, op, subquery)
    }

    /// `[NOT] EXISTS (subquery)`.
    pub fn add_cond_exists(&mut self, subquery: DbQuery, negated: bool) -> &mut Self {
        self.where_conds.push(Cond::Exists {
            negated,
            query: Arc::new(subquery),
        });
        self
    }

    /// Free-text LIKE over several columns joined by spaces.
    pub fn add_cond_like_concat(
        &mut self,
        columns: &[(&str, &str)],
        value: &str,
        negated: bool,
    ) -> Result<&mut Self, QueryError> {
        if columns.is_empty() {
            return Err(QueryError::MissingArguments("add_cond_like_concat".to_string()));
        }
        let vars = columns
            .iter()
            .map(|(column, alias)| self.require_in_var(column, alias))
            .collect::<Result<Vec<_>, _>>()?;
        self.where_conds.push(Cond::ConcatLike {
            vars,
            value: value.to_string(),
            negated,
        });
        Ok(self)
    }

    pub fn and(&mut self) -> &mut Self {
        self.where_conds.push(Cond::Separator(Separator::And));
        self
    }

    pub fn or(&mut self) -> &mut Self {
        self.where_conds.push(Cond::Separator(Separator::Or));
        self
    }

    pub fn start_group(&mut self) -> &mut Self {
        self.where_conds.push(Cond::Separator(Separator::Open));
        self
    }

    pub fn end_group(&mut self) -> &mut Self {
        self.where_conds.push(Cond::Separator(Separator::Close));
        self
    }

    pub fn reset_where(&mut self) -> &mut Self {
        self.where_conds.clear();
        self
    }

    // ========================================================================
    // GROUP BY / HAVING
    // ========================================================================

    pub fn add_group_by(
        &mut self,
        column: &str,
        table_alias: &str,
    ) -> Result<&mut Self, QueryError> {
        let var = self.require_in_var(column, table_alias)?;
        if !self.group_by.iter().any(|g| g.same_column(&var)) {
            self.group_by.push(var);
        }
        Ok(self)
    }

    fn having_var(&self, column: &str, table_alias: &str) -> Result<Var, QueryError> {
        self.table(table_alias)?;
        self.find_out_var(column, table_alias)
            .cloned()
            .ok_or_else(|| {
                QueryError::unknown_column_with_context(
                    column,
                    table_alias,
                    "HAVING on a column that is not selected",
                )
            })
    }

    /// HAVING predicate on a selected column. BETWEEN goes through
    /// [`DbQuery::add_having_cond_between`].
    pub fn add_having_cond(
        &mut self,
        column: &str,
        table_alias: &str,
        op: SqlOp,
        value: impl Into<BindValue>,
    ) -> Result<&mut Self, QueryError> {
        if matches!(op, SqlOp::Between | SqlOp::In | SqlOp::NotIn) {
            return Err(QueryError::illegal_operator(
                op,
                "add_having_cond, use add_having_cond_between",
            ));
        }
        let var = self.having_var(column, table_alias)?;
        let cond = Self::checked_compare(var, op, vec![value.into()], "add_having_cond")?;
        self.having_conds.push(cond);
        Ok(self)
    }

    pub fn add_having_cond_between(
        &mut self,
        column: &str,
        table_alias: &str,
        low: impl Into<BindValue>,
        high: impl Into<BindValue>,
    ) -> Result<&mut Self, QueryError> {
        let var = self.having_var(column, table_alias)?;
        let cond = Self::checked_compare(
            var,
            SqlOp::Between,
            vec![low.into(), high.into()],
            "add_having_cond_between",
        )?;
        self.having_conds.push(cond);
        Ok(self)
    }

    pub fn having_and(&mut self) -> &mut Self {
        self.having_conds.push(Cond::Separator(Separator::And));
        self
    }

    pub fn having_or(&mut self) -> &mut Self {
        self.having_conds.push(Cond::Separator(Separator::Or));
        self
    }

    pub fn start_having_group(&mut self) -> &mut Self {
        self.having_conds.push(Cond::Separator(Separator::Open));
        self
    }

    pub fn end_having_group(&mut self) -> &mut Self {
        self.having_conds.push(Cond::Separator(Separator::Close));
        self
    }

    // ========================================================================
    // ORDER BY
    // ========================================================================

    fn add_sort(
        &mut self,
        column: &str,
        table_alias: &str,
        direction: &str,
        first: bool,
        categorize: bool,
    ) -> Result<&mut Self, QueryError> {
        let var = match self.in_var(column, table_alias) {
            Some(var) => var,
            None => self
                .find_out_var(column, table_alias)
                .cloned()
                .ok_or_else(|| {
                    QueryError::unknown_column_with_context(column, table_alias, "ORDER BY")
                })?,
        };
        let sort = SortVar {
            var,
            direction: SortDirection::parse_lenient(direction),
            categorize,
        };
        let existing = self.sort_vars.iter().position(|s| s.var.same_column(&sort.var));
        if first {
            if let Some(index) = existing {
                self.sort_vars.remove(index);
            }
            self.sort_vars.insert(0, sort);
        } else if existing.is_none() {
            self.sort_vars.push(sort);
        }
        Ok(self)
    }

    /// Sort on a column; an unrecognised direction sorts ascending. A column
    /// already sorted keeps its first position and direction.
    pub fn add_sort_by(
        &mut self,
        column: &str,
        table_alias: &str,
        direction: &str,
    ) -> Result<&mut Self, QueryError> {
        self.add_sort(column, table_alias, direction, false, false)
    }

    pub fn add_sort_by_desc(
        &mut self,
        column: &str,
        table_alias: &str,
    ) -> Result<&mut Self, QueryError> {
        self.add_sort(column, table_alias, "DESC", false, false)
    }

    /// Sort on a column before every other sort.
    pub fn add_sort_first(
        &mut self,
        column: &str,
        table_alias: &str,
        direction: &str,
    ) -> Result<&mut Self, QueryError> {
        self.add_sort(column, table_alias, direction, true, false)
    }

    /// Sort on a column whose value changes mark result categories.
    pub fn add_categorized_sort_by(
        &mut self,
        column: &str,
        table_alias: &str,
        direction: &str,
    ) -> Result<&mut Self, QueryError> {
        self.add_sort(column, table_alias, direction, false, true)
    }

    pub fn reset_sort(&mut self) -> &mut Self {
        self.sort_vars.clear();
        self
    }

    /// Result aliases of the categorized sort columns, in sort order.
    pub fn category_breaks(&self) -> Vec<String> {
        self.sort_vars
            .iter()
            .filter(|s| s.categorize)
            .map(|s| s.var.result_alias())
            .collect()
    }

    // ========================================================================
    // Flags and windows
    // ========================================================================

    pub fn set_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.name = Some(name.into());
        self
    }

    pub fn set_min_rownum(&mut self, min: i64) -> &mut Self {
        self.min_rownum = min.max(0);
        self
    }

    /// Page size; zero or negative disables paging.
    pub fn set_max_rownum(&mut self, max: i64) -> &mut Self {
        self.max_rownum = max;
        self
    }

    pub fn set_count(&mut self, count: bool) -> &mut Self {
        self.count = count;
        self
    }

    pub fn set_distinct(&mut self, distinct: bool) -> &mut Self {
        self.distinct = distinct;
        self
    }

    pub fn set_case_insensitive(&mut self, case_insensitive: bool) -> &mut Self {
        self.case_insensitive = case_insensitive;
        self
    }

    pub fn set_for_update(&mut self, for_update: bool) -> &mut Self {
        self.for_update = for_update;
        self
    }

    pub fn set_fetch_size(&mut self, fetch_size: Option<u32>) -> &mut Self {
        self.fetch_size = fetch_size;
        self
    }

    /// Fail instead of picking the first link when several links reach an added entity.
    pub fn set_strict_joins(&mut self, strict: bool) -> &mut Self {
        self.strict_joins = strict;
        self
    }

    /// The same query restricted to `max` rows after the first `min`.
    pub fn with_window(&self, min: i64, max: i64) -> DbQuery {
        let mut query = self.clone();
        query.set_min_rownum(min).set_max_rownum(max);
        query
    }

    /// The same query counting its rows instead of returning them.
    pub fn to_count(&self) -> DbQuery {
        let mut query = self.clone();
        query.count = true;
        query
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn provider(&self) -> &Arc<dyn MetadataProvider> {
        &self.provider
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub(crate) fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<unnamed>")
    }

    pub fn main_entity(&self) -> Option<&str> {
        self.tables.first().map(Table::entity)
    }

    pub fn main_alias(&self) -> Option<&str> {
        self.tables.first().map(|t| t.alias.as_str())
    }

    pub fn entity_of(&self, alias: &str) -> Option<&str> {
        self.tables.iter().find(|t| t.alias == alias).map(Table::entity)
    }

    pub fn alias_of(&self, entity: &str) -> Option<&str> {
        self.find_table(entity, None).map(|t| t.alias.as_str())
    }

    pub fn aliases(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.alias.as_str()).collect()
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn out_vars(&self) -> &[Var] {
        &self.out_vars
    }

    pub fn consts(&self) -> &[Const] {
        &self.consts
    }

    pub fn where_conds(&self) -> &[Cond] {
        &self.where_conds
    }

    pub fn having_conds(&self) -> &[Cond] {
        &self.having_conds
    }

    pub fn group_by_list(&self) -> &[Var] {
        &self.group_by
    }

    pub fn sort_by_list(&self) -> &[SortVar] {
        &self.sort_vars
    }

    pub fn has_grouping_column(&self) -> bool {
        self.out_vars.iter().any(|v| v.grouping)
    }

    pub fn min_rownum(&self) -> i64 {
        self.min_rownum
    }

    pub fn max_rownum(&self) -> i64 {
        self.max_rownum
    }

    pub fn is_paged(&self) -> bool {
        self.max_rownum > 0
    }

    pub fn is_count(&self) -> bool {
        self.count
    }

    pub fn is_distinct(&self) -> bool {
        self.distinct
    }

    pub fn is_case_insensitive(&self) -> bool {
        self.case_insensitive
    }

    pub fn is_for_update(&self) -> bool {
        self.for_update
    }

    pub fn fetch_size(&self) -> Option<u32> {
        self.fetch_size
    }
}
