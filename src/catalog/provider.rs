//! Read-only metadata and schema lookups consumed by the query builder and the compiler.

use std::collections::HashMap;
use std::sync::Arc;

use super::entity_model::EntityModel;
use super::errors::CatalogError;

/// Source of entity metadata.
#[cfg_attr(test, mockall::automock)]
pub trait MetadataProvider: Send + Sync {
    /// Look an entity up by name.
    fn entity(&self, name: &str) -> Option<Arc<EntityModel>>;

    /// Like [`MetadataProvider::entity`], failing with [`CatalogError::Entity`].
    fn require_entity(&self, name: &str) -> Result<Arc<EntityModel>, CatalogError> {
        self.entity(name).ok_or_else(|| CatalogError::Entity {
            entity: name.to_string(),
        })
    }
}

/// Maps a logical schema id to the physical schema qualifying table names.
pub trait SchemaResolver: Send + Sync {
    fn schema_name(&self, schema_id: Option<&str>) -> Option<String>;
}

/// Schema names taken from configuration: `schema.<id>` entries with a
/// `schema.default` fallback.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfiguredSchemas {
    pub default: Option<String>,
    pub by_id: HashMap<String, String>,
}

impl ConfiguredSchemas {
    pub fn new(default: Option<String>) -> Self {
        Self {
            default,
            by_id: HashMap::new(),
        }
    }

    pub fn with_schema(mut self, id: impl Into<String>, name: impl Into<String>) -> Self {
        self.by_id.insert(id.into(), name.into());
        self
    }
}

impl SchemaResolver for ConfiguredSchemas {
    fn schema_name(&self, schema_id: Option<&str>) -> Option<String> {
        schema_id
            .and_then(|id| self.by_id.get(id))
            .or(self.default.as_ref())
            .filter(|name| !name.is_empty())
            .cloned()
    }
}
