//! Field access on entity values, used to copy result rows into records.

use std::collections::HashMap;

use crate::query::BindValue;

/// Read and write access to the fields of an entity value, by field name.
pub trait EntityRecord {
    fn get_field(&self, name: &str) -> Option<BindValue>;
    fn set_field(&mut self, name: &str, value: BindValue);
}

/// A record backed by a map of field name to value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapRecord {
    values: HashMap<String, BindValue>,
}

impl MapRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl EntityRecord for MapRecord {
    fn get_field(&self, name: &str) -> Option<BindValue> {
        self.values.get(name).cloned()
    }

    fn set_field(&mut self, name: &str, value: BindValue) {
        self.values.insert(name.to_string(), value);
    }
}

impl EntityRecord for HashMap<String, BindValue> {
    fn get_field(&self, name: &str) -> Option<BindValue> {
        self.get(name).cloned()
    }

    fn set_field(&mut self, name: &str, value: BindValue) {
        self.insert(name.to_string(), value);
    }
}
