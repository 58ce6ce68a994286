//! In-process document store. Backs tests and runs the server when no
//! database is configured.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Document, DocumentStore, Fields, StoreError, resolve_fields};
use crate::clock::Clock;

type Key = (String, String);

pub struct MemoryStore {
    docs: RwLock<HashMap<Key, Document>>,
    clock: Arc<dyn Clock>,
}

impl MemoryStore {
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { docs: RwLock::new(HashMap::new()), clock }
    }

    /// Number of documents in a collection.
    pub async fn count(&self, collection: &str) -> usize {
        self.docs
            .read()
            .await
            .keys()
            .filter(|(c, _)| c == collection)
            .count()
    }
}

fn key(collection: &str, id: &str) -> Key {
    (collection.to_owned(), id.to_owned())
}

#[async_trait::async_trait]
impl DocumentStore for MemoryStore {
    async fn get_document(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        Ok(self.docs.read().await.get(&key(collection, id)).cloned())
    }

    async fn create_document(&self, collection: &str, id: &str, fields: Fields) -> Result<(), StoreError> {
        let doc = resolve_fields(fields, self.clock.now())?;
        let mut docs = self.docs.write().await;
        let key = key(collection, id);
        if docs.contains_key(&key) {
            return Err(StoreError::AlreadyExists { collection: key.0, id: key.1 });
        }
        docs.insert(key, doc);
        Ok(())
    }

    async fn patch_document(&self, collection: &str, id: &str, fields: Fields) -> Result<(), StoreError> {
        let patch = resolve_fields(fields, self.clock.now())?;
        let mut docs = self.docs.write().await;
        let Some(doc) = docs.get_mut(&key(collection, id)) else {
            return Err(StoreError::NotFound { collection: collection.to_owned(), id: id.to_owned() });
        };
        doc.extend(patch);
        Ok(())
    }

    async fn add_document(&self, collection: &str, fields: Fields) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        self.create_document(collection, &id, fields).await?;
        Ok(id)
    }
}

#[cfg(test)]
#[path = "memory_test.rs"]
mod tests;
