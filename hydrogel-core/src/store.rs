use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::RwLock;

/// A named-fragment byte store.
///
/// Stores operate on raw bytes; fragment encoding and locator handling
/// live in higher layers (the Bridge). Stores have no knowledge of schemas
/// or addressing.
///
/// All methods take `&self` to support stores with internal locking.
pub trait FragmentStore {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Retrieves the bytes stored under a fragment name, or None if absent.
    fn read(&self, name: &str) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Stores bytes under the given fragment name.
    fn write(&self, name: &str, bytes: &[u8]) -> Result<(), Self::Error>;

    /// Lists all fragment names, in a stable order.
    fn list(&self) -> Result<Vec<String>, Self::Error>;

    /// Removes a fragment. Removing an absent name is not an error.
    fn remove(&self, name: &str) -> Result<(), Self::Error>;
}

/// An in-memory store backed by a HashMap.
///
/// Useful for testing and as a reference implementation.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FragmentStore for MemoryStore {
    type Error = Infallible;

    fn read(&self, name: &str) -> Result<Option<Vec<u8>>, Self::Error> {
        Ok(self.data.read().unwrap().get(name).cloned())
    }

    fn write(&self, name: &str, bytes: &[u8]) -> Result<(), Self::Error> {
        self.data
            .write()
            .unwrap()
            .insert(name.to_string(), bytes.to_vec());
        Ok(())
    }

    fn list(&self) -> Result<Vec<String>, Self::Error> {
        let mut names: Vec<String> = self.data.read().unwrap().keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    fn remove(&self, name: &str) -> Result<(), Self::Error> {
        self.data.write().unwrap().remove(name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_write_read() {
        let store = MemoryStore::new();
        store.write("a.json", b"hello world").unwrap();

        let retrieved = store.read("a.json").unwrap();
        assert_eq!(retrieved, Some(b"hello world".to_vec()));
    }

    #[test]
    fn memory_store_read_missing() {
        let store = MemoryStore::new();
        assert_eq!(store.read("absent.json").unwrap(), None);
    }

    #[test]
    fn memory_store_overwrite() {
        let store = MemoryStore::new();
        store.write("a.json", b"first").unwrap();
        store.write("a.json", b"second").unwrap();

        assert_eq!(store.read("a.json").unwrap(), Some(b"second".to_vec()));
    }

    #[test]
    fn memory_store_list_sorted() {
        let store = MemoryStore::new();
        store.write("b.json", b"2").unwrap();
        store.write("a.json", b"1").unwrap();
        store.write("c.json", b"3").unwrap();

        assert_eq!(store.list().unwrap(), vec!["a.json", "b.json", "c.json"]);
    }

    #[test]
    fn memory_store_remove_absent_is_ok() {
        let store = MemoryStore::new();
        store.write("a.json", b"1").unwrap();
        store.remove("a.json").unwrap();
        store.remove("a.json").unwrap();

        assert_eq!(store.read("a.json").unwrap(), None);
    }
}
