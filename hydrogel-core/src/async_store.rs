use std::future::Future;

use crate::store::FragmentStore;

/// Async named-fragment byte store.
///
/// Mirrors the `FragmentStore` trait but with async methods, enabling
/// network-capable implementations. Methods are prefixed with `async_` to
/// avoid name collisions when a type implements both traits.
pub trait AsyncFragmentStore: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    fn async_read(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Option<Vec<u8>>, Self::Error>> + Send;

    fn async_write(
        &self,
        name: &str,
        bytes: &[u8],
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    fn async_list(&self) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send;

    fn async_remove(&self, name: &str) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Batch read - default impl calls async_read() in sequence.
    fn async_read_many(
        &self,
        names: &[String],
    ) -> impl Future<Output = Result<Vec<Option<Vec<u8>>>, Self::Error>> + Send {
        let names = names.to_vec();
        async move {
            let mut results = Vec::with_capacity(names.len());
            for name in &names {
                results.push(self.async_read(name).await?);
            }
            Ok(results)
        }
    }

    /// Batch write - default impl calls async_write() in sequence.
    fn async_write_many(
        &self,
        fragments: &[(&str, &[u8])],
    ) -> impl Future<Output = Result<(), Self::Error>> + Send {
        let fragments: Vec<(String, Vec<u8>)> = fragments
            .iter()
            .map(|(name, bytes)| (name.to_string(), bytes.to_vec()))
            .collect();
        async move {
            for (name, bytes) in &fragments {
                self.async_write(name, bytes).await?;
            }
            Ok(())
        }
    }
}

/// Blanket impl: any sync `FragmentStore` is also an `AsyncFragmentStore`.
impl<S: FragmentStore + Send + Sync> AsyncFragmentStore for S {
    type Error = S::Error;

    async fn async_read(&self, name: &str) -> Result<Option<Vec<u8>>, Self::Error> {
        self.read(name)
    }

    async fn async_write(&self, name: &str, bytes: &[u8]) -> Result<(), Self::Error> {
        self.write(name, bytes)
    }

    async fn async_list(&self) -> Result<Vec<String>, Self::Error> {
        self.list()
    }

    async fn async_remove(&self, name: &str) -> Result<(), Self::Error> {
        self.remove(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn store_as_async_store_basic() {
        let store = MemoryStore::new();
        store.async_write("a.json", b"hello world").await.unwrap();

        let retrieved = store.async_read("a.json").await.unwrap();
        assert_eq!(retrieved, Some(b"hello world".to_vec()));
        assert_eq!(store.async_list().await.unwrap(), vec!["a.json"]);

        store.async_remove("a.json").await.unwrap();
        assert_eq!(store.async_read("a.json").await.unwrap(), None);
    }

    #[tokio::test]
    async fn store_as_async_store_batch() {
        let store = MemoryStore::new();
        let names: Vec<String> = (0..3).map(|i| format!("{i}.json")).collect();
        let fragments: Vec<(&str, &[u8])> = vec![
            ("0.json", b"a".as_slice()),
            ("1.json", b"b".as_slice()),
            ("2.json", b"c".as_slice()),
        ];
        store.async_write_many(&fragments).await.unwrap();

        let results = store.async_read_many(&names).await.unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0], Some(b"a".to_vec()));
        assert_eq!(results[2], Some(b"c".to_vec()));
    }
}
