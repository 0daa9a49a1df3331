//! # Catalog Error Types
//!
//! Errors raised while loading and validating entity metadata.
//!
//! ## Error Categories
//!
//! - **Definition Errors**: unknown entities, fields or link targets
//! - **Key Errors**: primary keys and link keys whose arity does not line up
//! - **Configuration Errors**: file I/O and YAML parsing issues during loading
//!
//! ## Usage Patterns
//!
//! ```ignore
//! CatalogError::entity_error_with_context(
//!     "Customer",
//!     "While resolving link `customer` of entity `Order`"
//! )
//! ```

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CatalogError {
    #[error("No entity definition found for `{entity}`")]
    Entity { entity: String },
    #[error("Entity `{entity}` has no field `{field}`")]
    UnknownField { entity: String, field: String },
    #[error("Link `{link}` of entity `{entity}` targets unknown entity `{ref_entity}`")]
    UnknownLinkTarget {
        entity: String,
        link: String,
        ref_entity: String,
    },
    #[error(
        "Link `{link}` of entity `{entity}` has {link_fields} field(s) but `{ref_entity}` has a {key_fields}-field primary key"
    )]
    KeyArityMismatch {
        entity: String,
        link: String,
        ref_entity: String,
        link_fields: usize,
        key_fields: usize,
    },
    #[error("Entity `{entity}` is defined twice")]
    DuplicateEntity { entity: String },
    #[error("Failed to read catalog file: {error}")]
    ConfigReadError { error: String },
    #[error("Failed to parse catalog: {error}")]
    ConfigParseError { error: String },
    #[error("Invalid catalog: {message}")]
    InvalidConfig { message: String },
}

impl CatalogError {
    /// Create an Entity error with context information
    ///
    /// # Example
    /// ```ignore
    /// CatalogError::entity_error_with_context("Customer", "In link query for `Order`")
    /// ```
    pub fn entity_error_with_context(
        entity: impl Into<String>,
        context: impl Into<String>,
    ) -> Self {
        CatalogError::Entity {
            entity: format!("{}\n  Context: {}", entity.into(), context.into()),
        }
    }
}
