//! Flat-directory fragment store for Hydrogel.
//!
//! One file per fragment, named by its locator, no nesting. The directory
//! is the unit of persistence a [`Bridge`](hydrogel_core::Bridge) binds to.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use hydrogel_core::FragmentStore;
use log::trace;
use thiserror::Error;

/// Directory-store error.
#[derive(Debug, Error)]
#[error("fragment directory error: {0}")]
pub struct DirStoreError(#[from] io::Error);

/// A fragment store over one flat directory.
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    /// Opens a fragment directory, creating it if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DirStoreError> {
        let root = path.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// The directory this store reads and writes.
    pub fn path(&self) -> &Path {
        &self.root
    }

    fn fragment_path(&self, name: &str) -> Result<PathBuf, DirStoreError> {
        // The locator grammar never produces separators, but the store is
        // the last line before the filesystem.
        if name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(DirStoreError(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("fragment name escapes the store directory: {name}"),
            )));
        }
        Ok(self.root.join(name))
    }
}

impl FragmentStore for DirStore {
    type Error = DirStoreError;

    fn read(&self, name: &str) -> Result<Option<Vec<u8>>, Self::Error> {
        match fs::read(self.fragment_path(name)?) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, name: &str, bytes: &[u8]) -> Result<(), Self::Error> {
        trace!("writing fragment {name}");
        fs::write(self.fragment_path(name)?, bytes)?;
        Ok(())
    }

    fn list(&self) -> Result<Vec<String>, Self::Error> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                if let Ok(name) = entry.file_name().into_string() {
                    names.push(name);
                }
            }
        }
        names.sort();
        Ok(names)
    }

    fn remove(&self, name: &str) -> Result<(), Self::Error> {
        match fs::remove_file(self.fragment_path(name)?) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_store() -> (DirStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = DirStore::open(dir.path()).unwrap();
        (store, dir)
    }

    #[test]
    fn write_read() {
        let (store, _dir) = temp_store();
        store.write("a.json", b"hello world").unwrap();

        let retrieved = store.read("a.json").unwrap();
        assert_eq!(retrieved, Some(b"hello world".to_vec()));
    }

    #[test]
    fn read_missing() {
        let (store, _dir) = temp_store();
        assert_eq!(store.read("absent.json").unwrap(), None);
    }

    #[test]
    fn overwrite() {
        let (store, _dir) = temp_store();
        store.write("a.json", b"first").unwrap();
        store.write("a.json", b"second").unwrap();

        assert_eq!(store.read("a.json").unwrap(), Some(b"second".to_vec()));
    }

    #[test]
    fn list_sorted() {
        let (store, _dir) = temp_store();
        store.write("b.json", b"2").unwrap();
        store.write("a.json", b"1").unwrap();

        assert_eq!(store.list().unwrap(), vec!["a.json", "b.json"]);
    }

    #[test]
    fn remove_absent_is_ok() {
        let (store, _dir) = temp_store();
        store.write("a.json", b"1").unwrap();
        store.remove("a.json").unwrap();
        store.remove("a.json").unwrap();

        assert_eq!(store.read("a.json").unwrap(), None);
    }

    #[test]
    fn escaping_names_rejected() {
        let (store, _dir) = temp_store();
        assert!(store.write("../escape.json", b"x").is_err());
        assert!(store.read("sub/dir.json").is_err());
    }

    #[test]
    fn persistence_across_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let store = DirStore::open(dir.path()).unwrap();
            store.write("a.json", b"data survives reopen").unwrap();
        }
        {
            let store = DirStore::open(dir.path()).unwrap();
            let retrieved = store.read("a.json").unwrap();
            assert_eq!(retrieved, Some(b"data survives reopen".to_vec()));
        }
    }
}
