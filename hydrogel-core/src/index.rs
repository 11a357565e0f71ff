use indexmap::IndexMap;
use serde_json::Value;

use crate::uhl::Uhl;

/// In-memory map from locator string to raw fragment value.
///
/// Populated by import, peek and dehydration; never evicted. The index is
/// threaded explicitly through every call so multiple bridges can coexist
/// without shared state. Iteration follows insertion order.
#[derive(Debug, Clone, Default)]
pub struct FragmentIndex {
    entries: IndexMap<String, Value>,
}

impl FragmentIndex {
    /// Creates a new empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a fragment under its locator, replacing any previous value.
    pub fn add(&mut self, locator: &Uhl, value: Value) {
        self.entries.insert(locator.to_string(), value);
    }

    /// Looks up a fragment by locator.
    pub fn get(&self, locator: &Uhl) -> Option<&Value> {
        self.entries.get(&locator.to_string())
    }

    /// Looks up a fragment by locator string.
    pub fn get_str(&self, locator: &str) -> Option<&Value> {
        self.entries.get(locator)
    }

    pub fn contains(&self, locator: &Uhl) -> bool {
        self.entries.contains_key(&locator.to_string())
    }

    /// All locator strings, in insertion order.
    pub fn locators(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// All entries, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
