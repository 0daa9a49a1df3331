pub mod config;
pub mod entity_model;
pub mod errors;
pub mod provider;


pub use config::{Catalog, CatalogConfig};
pub use entity_model::{
    DefinedValue, EntityModel, FieldModel, KeyModel, LinkModel, Memory, SqlType,
};
pub use errors::CatalogError;
pub use provider::{ConfiguredSchemas, MetadataProvider, SchemaResolver};
