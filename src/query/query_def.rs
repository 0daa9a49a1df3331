//! Declarative query definitions.
//!
//! A [`QuerySpec`] describes a query in YAML or JSON and replays it against the
//! [`DbQuery`] builder:
//!
//! ```yaml
//! name: openOrders
//! entity: Order
//! joins:
//!   - entity: Customer
//!     via: customer
//!     kind: loose
//! columns:
//!   - { column: id }
//!   - { column: name, table: T2 }
//! conditions:
//!   - { column: status, op: "=", values: [OPEN] }
//! sort:
//!   - { column: orderDate, direction: DESC }
//! window: { min: 0, max: 10 }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use super::{BindValue, DbQuery, EntityJoin, JoinKind, QueryError, SqlOp};
use crate::catalog::MetadataProvider;

#[derive(Debug, Error)]
pub enum QuerySpecError {
    #[error("Failed to read query definition: {0}")]
    Read(#[from] std::io::Error),
    #[error("Failed to parse query definition: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error(transparent)]
    Query(#[from] QueryError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuerySpec {
    #[serde(default)]
    pub name: Option<String>,
    pub entity: String,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub joins: Vec<JoinSpec>,
    #[serde(default)]
    pub columns: Vec<ColumnSpec>,
    #[serde(default)]
    pub conditions: Vec<ConditionSpec>,
    #[serde(default)]
    pub group_by: Vec<ColumnRef>,
    #[serde(default)]
    pub sort: Vec<SortSpec>,
    #[serde(default)]
    pub window: Option<WindowSpec>,
    #[serde(default)]
    pub distinct: bool,
    #[serde(default)]
    pub count: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinSpec {
    pub entity: String,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub via: Option<String>,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub kind: JoinKind,
    #[serde(default = "default_true")]
    pub select_all: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregate {
    Avg,
    Sum,
    Min,
    Max,
    Count,
    CountDistinct,
    Distinct,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub column: String,
    #[serde(default)]
    pub table: Option<String>,
    #[serde(default, rename = "as")]
    pub as_name: Option<String>,
    #[serde(default)]
    pub aggregate: Option<Aggregate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnRef {
    pub column: String,
    #[serde(default)]
    pub table: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeparatorSpec {
    And,
    Or,
    Open,
    Close,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionSpec {
    Separator {
        separator: SeparatorSpec,
    },
    Predicate {
        column: String,
        #[serde(default)]
        table: Option<String>,
        op: SqlOp,
        #[serde(default)]
        values: Vec<BindValue>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortSpec {
    pub column: String,
    #[serde(default)]
    pub table: Option<String>,
    #[serde(default = "default_direction")]
    pub direction: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSpec {
    #[serde(default)]
    pub min: i64,
    pub max: i64,
}

fn default_true() -> bool {
    true
}

fn default_direction() -> String {
    "ASC".to_string()
}

impl QuerySpec {
    pub fn from_yaml_str(content: &str) -> Result<Self, QuerySpecError> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, QuerySpecError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Build the query against the given metadata.
    pub fn build(&self, provider: Arc<dyn MetadataProvider>) -> Result<DbQuery, QueryError> {
        self.build_configured(provider, |_| {})
    }

    /// Build the query, letting `configure` set query options (strict join
    /// resolution, case sensitivity) before any join is resolved.
    pub fn build_configured(
        &self,
        provider: Arc<dyn MetadataProvider>,
        configure: impl FnOnce(&mut DbQuery),
    ) -> Result<DbQuery, QueryError> {
        let mut first = EntityJoin::new(self.entity.clone());
        first.alias = self.alias.clone();
        let mut query = DbQuery::build(provider, first)?;
        if let Some(name) = &self.name {
            query.set_name(name.clone());
        }
        configure(&mut query);
        self.apply(&mut query)?;
        Ok(query)
    }

    /// Replay joins, columns, conditions, grouping, sorting and flags on `query`.
    pub fn apply(&self, query: &mut DbQuery) -> Result<(), QueryError> {
        for join in &self.joins {
            let mut spec = EntityJoin::new(join.entity.clone()).kind(join.kind);
            spec.alias = join.alias.clone();
            spec.link_name = join.via.clone();
            spec.target_alias = join.from.clone();
            spec.select_all_columns = join.select_all;
            query.join(spec)?;
        }

        let main = query.main_alias().unwrap_or("T1").to_string();
        let table = |t: &Option<String>| t.clone().unwrap_or_else(|| main.clone());

        for column in &self.columns {
            let alias = table(&column.table);
            let as_name = column.as_name.as_deref();
            match column.aggregate {
                None => match as_name {
                    Some(as_name) => query.add_column_as(&column.column, &alias, as_name)?,
                    None => query.add_column(&column.column, &alias)?,
                },
                Some(Aggregate::Avg) => query.add_avg(&column.column, &alias, as_name)?,
                Some(Aggregate::Sum) => query.add_sum(&column.column, &alias, as_name)?,
                Some(Aggregate::Min) => query.add_min(&column.column, &alias, as_name)?,
                Some(Aggregate::Max) => query.add_max(&column.column, &alias, as_name)?,
                Some(Aggregate::Count) => query.add_count(&column.column, &alias, as_name, false)?,
                Some(Aggregate::CountDistinct) => {
                    query.add_count(&column.column, &alias, as_name, true)?
                }
                Some(Aggregate::Distinct) => query.add_distinct(&column.column, &alias, as_name)?,
            };
        }

        for cond in &self.conditions {
            match cond {
                ConditionSpec::Separator { separator } => {
                    match separator {
                        SeparatorSpec::And => query.and(),
                        SeparatorSpec::Or => query.or(),
                        SeparatorSpec::Open => query.start_group(),
                        SeparatorSpec::Close => query.end_group(),
                    };
                }
                ConditionSpec::Predicate { column, table: t, op, values } => {
                    let alias = table(t);
                    let first = values.first().cloned().unwrap_or(BindValue::Null);
                    match op {
                        SqlOp::In | SqlOp::NotIn => {
                            let negated = *op == SqlOp::NotIn;
                            query.add_cond_in_list(column, &alias, values.clone(), negated)?
                        }
                        SqlOp::IsNull | SqlOp::IsNotNull => {
                            query.add_cond_is_null(column, &alias, *op == SqlOp::IsNotNull)?
                        }
                        SqlOp::Between => {
                            let second = values.get(1).cloned().ok_or_else(|| {
                                let context = format!("BETWEEN on {}.{}", alias, column);
                                QueryError::MissingArguments(context)
                            })?;
                            query.add_cond_between(column, &alias, first, second)?
                        }
                        _ => query.add_cond(column, &alias, *op, first)?,
                    };
                }
            }
        }

        for group in &self.group_by {
            query.add_group_by(&group.column, &table(&group.table))?;
        }
        for sort in &self.sort {
            query.add_sort_by(&sort.column, &table(&sort.table), &sort.direction)?;
        }

        if let Some(window) = self.window {
            query.set_min_rownum(window.min).set_max_rownum(window.max);
        }
        query.set_distinct(self.distinct).set_count(self.count);
        Ok(())
    }
}
