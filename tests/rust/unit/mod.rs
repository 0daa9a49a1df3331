//! Unit tests - query building rules exercised through the public API
//!
//! These tests only build queries and inspect them; SQL text is covered by the
//! integration tests.

#[path = "../fixtures/mod.rs"]
mod fixtures;

mod join_tests;
mod query_builder_tests;
