//! Join path discovery over entity links.
//!
//! When an entity is added to a query without an explicit join, the resolver
//! looks at every table already in the query, in insertion order, and collects
//! the links that reach the new entity: first the table's own links whose
//! target is the new entity, then its back-references coming from the new
//! entity. Transient links carry no physical constraint and are skipped.

use log::{debug, warn};

use super::errors::QueryError;
use super::table::{JoinedLink, Table};
use crate::catalog::{EntityModel, LinkModel};

/// Which side of the link the existing table is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkDirection {
    /// The existing table holds the foreign key.
    Outbound,
    /// The new entity holds the foreign key.
    BackRef,
}

#[derive(Debug, Clone, Copy)]
pub struct JoinCandidate<'a> {
    pub table: &'a Table,
    pub link: &'a LinkModel,
    pub direction: LinkDirection,
}

impl JoinCandidate<'_> {
    fn describe(&self) -> String {
        format!("{}.{}", self.table.alias, self.link.name)
    }

    /// Key pairing of the join from the candidate's table to a new `target` table.
    pub fn joined_link(
        &self,
        target: &EntityModel,
        target_alias: &str,
    ) -> Result<JoinedLink, QueryError> {
        let (source_fields, target_fields) = match self.direction {
            LinkDirection::Outbound => (
                self.link.fields.clone(),
                target.primary_key.fields.clone(),
            ),
            LinkDirection::BackRef => (
                self.table.model.primary_key.fields.clone(),
                self.link.fields.clone(),
            ),
        };
        if source_fields.len() != target_fields.len() || source_fields.is_empty() {
            return Err(QueryError::KeyArityMismatch {
                source_alias: self.table.alias.clone(),
                alias: target_alias.to_string(),
                source_fields: source_fields.len(),
                target_fields: target_fields.len(),
            });
        }
        Ok(JoinedLink {
            link_name: self.link.name.clone(),
            source_entity: self.table.model.name.clone(),
            source_alias: self.table.alias.clone(),
            source_fields,
            target_fields,
        })
    }
}

/// Every usable link between the query's tables and `entity`, in search order.
pub fn find_candidates<'a>(
    tables: &'a [Table],
    entity: &str,
    link_name: Option<&str>,
    target_alias: Option<&str>,
) -> Vec<JoinCandidate<'a>> {
    let wanted = |link: &LinkModel, table: &Table| match link_name {
        Some(name) => link.name == name && target_alias.map_or(true, |a| a == table.alias),
        None => true,
    };

    let mut candidates = Vec::new();
    for table in tables {
        let model = &table.model;
        for link in model.links.iter().filter(|l| !l.transient) {
            if link.ref_entity == entity && wanted(link, table) {
                candidates.push(JoinCandidate {
                    table,
                    link,
                    direction: LinkDirection::Outbound,
                });
            }
        }
        for link in model.back_refs.iter().filter(|l| !l.transient) {
            if link.entity == entity && wanted(link, table) {
                candidates.push(JoinCandidate {
                    table,
                    link,
                    direction: LinkDirection::BackRef,
                });
            }
        }
    }
    candidates
}

/// Pick the link used to join `entity`.
///
/// Without a link name, several candidates are resolved to the first one with a
/// warning, unless `strict` is set, in which case the ambiguity is an error.
pub fn resolve<'a>(
    tables: &'a [Table],
    entity: &str,
    link_name: Option<&str>,
    target_alias: Option<&str>,
    strict: bool,
) -> Result<JoinCandidate<'a>, QueryError> {
    let candidates = find_candidates(tables, entity, link_name, target_alias);

    let first = match (candidates.first(), link_name) {
        (Some(first), _) => *first,
        (None, None) => {
            return Err(QueryError::NoJoinPath {
                entity: entity.to_string(),
            })
        }
        (None, Some(link)) => {
            return Err(QueryError::LinkNotFound {
                link: link.to_string(),
                entity: entity.to_string(),
                target_alias: target_alias.map(str::to_string),
            })
        }
    };

    if candidates.len() > 1 && link_name.is_none() {
        let names = candidates
            .iter()
            .map(JoinCandidate::describe)
            .collect::<Vec<_>>()
            .join(", ");
        if strict {
            return Err(QueryError::AmbiguousJoinPath {
                entity: entity.to_string(),
                candidates: names,
            });
        }
        warn!(
            "More than one link leads to {} ({}); joining with {}",
            entity,
            names,
            first.describe()
        );
    }

    debug!("Joining {} through {} ({:?})", entity, first.describe(), first.direction);
    Ok(first)
}
