use super::entity_model::{EntityModel, LinkModel};
use super::errors::CatalogError;
use super::provider::MetadataProvider;
use crate::query::alias::db_name;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Entity catalogs are defined in YAML with the following structure:
///
/// ```yaml
/// name: shop                  # Optional catalog name
/// entities:
///   - name: Order             # Entity name used by queries
///     table: ORDERS           # Physical table
///     schema: sales           # Optional logical schema id
///     primary_key: [id]
///     fields:
///       - name: id
///         sql_type: INTEGER   # sql_name defaults to ID
///       - name: customerId
///         sql_type: INTEGER   # sql_name defaults to CUSTOMER_ID
///     links:
///       - name: customer
///         ref_entity: Customer
///         fields: [customerId]
/// ```
///
/// Back-references are never declared: every link is registered on its target
/// entity as well when the catalog is built.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub entities: Vec<EntityModel>,
}

impl CatalogConfig {
    pub fn from_yaml_str(content: &str) -> Result<Self, CatalogError> {
        serde_yaml::from_str(content).map_err(|e| CatalogError::ConfigParseError {
            error: e.to_string(),
        })
    }

    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| CatalogError::ConfigReadError {
            error: format!("{}: {}", path.as_ref().display(), e),
        })?;
        Self::from_yaml_str(&content)
    }

    /// Validate the definitions and build the lookup catalog.
    pub fn build(self) -> Result<Catalog, CatalogError> {
        Catalog::from_models(self.entities)
    }
}

/// In-memory [`MetadataProvider`] built from entity definitions.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entities: HashMap<String, Arc<EntityModel>>,
}

impl Catalog {
    /// Normalize column names, derive back-references and check every link.
    pub fn from_models(models: Vec<EntityModel>) -> Result<Self, CatalogError> {
        let mut by_name: HashMap<String, EntityModel> = HashMap::new();
        let mut order = Vec::with_capacity(models.len());

        for mut model in models {
            for field in &mut model.fields {
                if field.sql_name.is_empty() {
                    field.sql_name = db_name(&field.name);
                }
            }
            // A link over a field that is not stored has no physical constraint.
            let carried_by_transient: Vec<bool> = model
                .links
                .iter()
                .map(|link| {
                    link.fields.iter().any(|f| {
                        model
                            .field(f)
                            .map(|field| !field.is_from_database())
                            .unwrap_or(false)
                    })
                })
                .collect();
            for (link, transient) in model.links.iter_mut().zip(carried_by_transient) {
                if link.entity.is_empty() {
                    link.entity = model.name.clone();
                }
                link.transient |= transient;
            }
            model.back_refs.clear();

            if by_name.contains_key(&model.name) {
                return Err(CatalogError::DuplicateEntity { entity: model.name });
            }
            order.push(model.name.clone());
            by_name.insert(model.name.clone(), model);
        }

        Self::validate(&by_name, &order)?;

        // Back-references follow entity then link declaration order.
        let mut back_refs: Vec<LinkModel> = Vec::new();
        for name in &order {
            if let Some(model) = by_name.get(name) {
                back_refs.extend(model.links.iter().cloned());
            }
        }
        for link in back_refs {
            if let Some(target) = by_name.get_mut(&link.ref_entity) {
                target.back_refs.push(link);
            }
        }

        let entities: HashMap<String, Arc<EntityModel>> = by_name
            .into_iter()
            .map(|(name, model)| (name, Arc::new(model)))
            .collect();
        info!("Loaded entity catalog with {} entities", entities.len());
        Ok(Self { entities })
    }

    /// Checks entities in declaration order, so the first broken one is reported.
    fn validate(
        by_name: &HashMap<String, EntityModel>,
        order: &[String],
    ) -> Result<(), CatalogError> {
        for model in order.iter().filter_map(|name| by_name.get(name)) {
            if model.table.trim().is_empty() {
                return Err(CatalogError::InvalidConfig {
                    message: format!("entity `{}` has no table", model.name),
                });
            }
            for key_field in &model.primary_key.fields {
                if model.field(key_field).is_none() {
                    return Err(CatalogError::UnknownField {
                        entity: model.name.clone(),
                        field: key_field.clone(),
                    });
                }
            }
            for link in &model.links {
                let target = by_name.get(&link.ref_entity).ok_or_else(|| {
                    CatalogError::UnknownLinkTarget {
                        entity: model.name.clone(),
                        link: link.name.clone(),
                        ref_entity: link.ref_entity.clone(),
                    }
                })?;
                if let Some(missing) = link.fields.iter().find(|f| model.field(f).is_none()) {
                    return Err(CatalogError::UnknownField {
                        entity: model.name.clone(),
                        field: missing.clone(),
                    });
                }
                if link.fields.len() != target.primary_key.len() {
                    return Err(CatalogError::KeyArityMismatch {
                        entity: model.name.clone(),
                        link: link.name.clone(),
                        ref_entity: target.name.clone(),
                        link_fields: link.fields.len(),
                        key_fields: target.primary_key.len(),
                    });
                }
                debug!(
                    "Link {}.{} -> {} ({} key field(s))",
                    model.name,
                    link.name,
                    target.name,
                    link.fields.len()
                );
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn entity_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entities.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl MetadataProvider for Catalog {
    fn entity(&self, name: &str) -> Option<Arc<EntityModel>> {
        self.entities.get(name).cloned()
    }
}
