//! Shared test catalog and compile helpers.
#![allow(dead_code)]

use std::sync::Arc;

use dbquery::catalog::{Catalog, CatalogConfig};
use dbquery::compiler::{CompiledQuery, SqlCompiler};
use dbquery::dialect::DialectKind;
use dbquery::query::DbQuery;

pub const SHOP_CATALOG: &str = include_str!("shop.yaml");

pub fn shop() -> Arc<Catalog> {
    let catalog = CatalogConfig::from_yaml_str(SHOP_CATALOG)
        .and_then(CatalogConfig::build)
        .expect("Failed to build shop catalog");
    Arc::new(catalog)
}

pub fn orders() -> DbQuery {
    DbQuery::new(shop(), "Order").expect("Failed to create Order query")
}

pub fn compile(kind: DialectKind, query: &DbQuery) -> CompiledQuery {
    SqlCompiler::new(kind)
        .compile(query)
        .unwrap_or_else(|e| panic!("Failed to compile for {}: {}", kind, e))
}
