use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::cond::Cond;
use crate::catalog::EntityModel;

/// How a table is attached to the tables added before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinKind {
    /// Inner join.
    #[default]
    Strict,
    /// Left outer join; the new table is the nullable side.
    Loose,
    /// No join condition (cartesian product).
    None,
}

/// One join edge into a table: `source_alias.source_fields = alias.target_fields`.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedLink {
    pub link_name: String,
    pub source_entity: String,
    pub source_alias: String,
    pub source_fields: Vec<String>,
    pub target_fields: Vec<String>,
}

/// An entity bound to an alias within a query.
#[derive(Debug, Clone)]
pub struct Table {
    pub alias: String,
    pub model: Arc<EntityModel>,
    pub join_kind: JoinKind,
    pub links: Vec<JoinedLink>,
    /// Extra predicates added to the join of this table.
    pub join_conds: Vec<Cond>,
}

impl Table {
    pub fn new(alias: impl Into<String>, model: Arc<EntityModel>, join_kind: JoinKind) -> Self {
        Self {
            alias: alias.into(),
            model,
            join_kind,
            links: Vec::new(),
            join_conds: Vec::new(),
        }
    }

    pub fn entity(&self) -> &str {
        &self.model.name
    }

    pub fn is_outer(&self) -> bool {
        self.join_kind == JoinKind::Loose
    }

    pub fn has_link(&self, link_name: &str, source_alias: &str) -> bool {
        self.links
            .iter()
            .any(|l| l.link_name == link_name && l.source_alias == source_alias)
    }

    /// Joined to the previous tables by a key or an extra predicate.
    pub fn has_join_condition(&self) -> bool {
        !self.links.is_empty() || !self.join_conds.is_empty()
    }
}
