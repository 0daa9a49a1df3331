//! Queries over the rows linked to a parent row.
//!
//! Given a parent entity, one of its back-references and the parent's primary
//! key, [`link_query`] selects the referencing rows. When the referencing
//! entity is an association table, the rows on the other side of the
//! association are selected instead, joined to the association table.

use log::debug;
use std::sync::Arc;

use super::errors::QueryError;
use super::value::Key;
use super::{DbQuery, EntityJoin};
use crate::catalog::{CatalogError, MetadataProvider};

/// Alias of the selected entity in a link query.
pub const LINKED_ALIAS: &str = "ASSO";
/// Alias of the association table when the link goes through one.
pub const ASSOCIATION_ALIAS: &str = "ASSO_NN";

/// Build the query of the rows reached from `parent_key` through `back_ref`.
///
/// A parent key without values (or with null values) leaves the query
/// unconstrained on the corresponding foreign-key fields.
pub fn link_query(
    provider: Arc<dyn MetadataProvider>,
    parent_entity: &str,
    back_ref: &str,
    parent_key: &Key,
) -> Result<DbQuery, QueryError> {
    let parent = provider.require_entity(parent_entity)?;
    let link = parent
        .back_ref(back_ref)
        .ok_or_else(|| QueryError::LinkNotFound {
            link: back_ref.to_string(),
            entity: parent_entity.to_string(),
            target_alias: None,
        })?
        .clone();
    let referencing = provider.require_entity(&link.entity)?;

    let foreign_key = parent
        .primary_key
        .fields
        .iter()
        .zip(&link.fields)
        .filter_map(|(pk_field, fk_field)| {
            parent_key
                .get(pk_field)
                .map(|v| (fk_field.clone(), v.clone()))
        })
        .fold(Key::new(), |key, (field, value)| key.with(field, value));

    let associated = referencing.associated_link(&link.name);
    let (mut query, cond_alias) = match (referencing.associative, associated) {
        (true, Some(associated)) => {
            let mut query =
                DbQuery::with_alias(provider.clone(), &associated.ref_entity, LINKED_ALIAS)?;
            query.join(
                EntityJoin::new(referencing.name.clone())
                    .alias(ASSOCIATION_ALIAS)
                    .via(associated.name.clone())
                    .from(LINKED_ALIAS)
                    .without_columns(),
            )?;
            (query, ASSOCIATION_ALIAS)
        }
        (true, None) => {
            return Err(CatalogError::entity_error_with_context(
                referencing.name.clone(),
                format!(
                    "Association `{}` has no link other than `{}`",
                    referencing.name, link.name
                ),
            )
            .into())
        }
        (false, _) => (
            DbQuery::with_alias(provider.clone(), &referencing.name, LINKED_ALIAS)?,
            LINKED_ALIAS,
        ),
    };

    let db_key = foreign_key
        .values()
        .iter()
        .filter(|(field, _)| referencing.field(field).is_some_and(|f| f.is_from_database()))
        .fold(Key::new(), |key, (field, value)| key.with(field.clone(), value.clone()));
    query.add_cond_key(Some(&db_key), cond_alias)?;

    debug!(
        "Link query {}.{} -> {} ({} key field(s))",
        parent_entity,
        back_ref,
        query.main_entity().unwrap_or_default(),
        db_key.values().len()
    );
    Ok(query)
}
