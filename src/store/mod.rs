//! Document store seam.
//!
//! ARCHITECTURE
//! ============
//! Profiles and schedule submissions live in a schemaless document store
//! addressed by `(collection, id)`. Writers describe fields as
//! [`FieldValue`]s; `ServerTimestamp` placeholders are resolved by the store
//! at write time so every timestamp comes from the store's clock, never the
//! caller's.
//!
//! `create_document` is conditional: it fails with `AlreadyExists` instead of
//! overwriting, which is what makes one-profile-per-identity hold under races.

pub mod memory;
pub mod postgres;

use std::collections::BTreeMap;

use serde_json::Value;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Stored document body.
pub type Document = serde_json::Map<String, Value>;

/// Field writes, keyed by field name.
pub type Fields = BTreeMap<String, FieldValue>;

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Value(Value),
    /// Replaced with the store's current time on write.
    ServerTimestamp,
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("document {collection}/{id} not found")]
    NotFound { collection: String, id: String },
    #[error("document {collection}/{id} already exists")]
    AlreadyExists { collection: String, id: String },
    #[error("document serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("timestamp formatting failed: {0}")]
    Timestamp(#[from] time::error::Format),
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
}

#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get_document(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// Create a document. Fails with `AlreadyExists` if the id is taken.
    async fn create_document(&self, collection: &str, id: &str, fields: Fields) -> Result<(), StoreError>;

    /// Merge fields into an existing document. Fails with `NotFound` if absent.
    async fn patch_document(&self, collection: &str, id: &str, fields: Fields) -> Result<(), StoreError>;

    /// Create a document under a generated id and return the id.
    async fn add_document(&self, collection: &str, fields: Fields) -> Result<String, StoreError>;
}

/// Resolve placeholders into a concrete document body.
///
/// # Errors
///
/// Returns an error if `now` cannot be rendered as RFC 3339.
pub fn resolve_fields(fields: Fields, now: OffsetDateTime) -> Result<Document, StoreError> {
    let stamp = now.format(&Rfc3339)?;
    Ok(fields
        .into_iter()
        .map(|(key, value)| match value {
            FieldValue::Value(v) => (key, v),
            FieldValue::ServerTimestamp => (key, Value::String(stamp.clone())),
        })
        .collect())
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
