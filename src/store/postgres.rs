//! Postgres-backed document store: one JSONB row per document.
//!
//! Conditional create is `INSERT ... ON CONFLICT DO NOTHING` and patch is a
//! JSONB merge (`data || $3`), so both are single atomic statements.

use std::sync::Arc;

use serde_json::Value;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use super::{Document, DocumentStore, Fields, StoreError, resolve_fields};
use crate::clock::Clock;

pub struct PgStore {
    pool: PgPool,
    clock: Arc<dyn Clock>,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool, clock: Arc<dyn Clock>) -> Self {
        Self { pool, clock }
    }
}

#[async_trait::async_trait]
impl DocumentStore for PgStore {
    async fn get_document(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let row = sqlx::query("SELECT data FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.and_then(|r| match r.get::<Value, _>("data") {
            Value::Object(map) => Some(map),
            _ => None,
        }))
    }

    async fn create_document(&self, collection: &str, id: &str, fields: Fields) -> Result<(), StoreError> {
        let doc = resolve_fields(fields, self.clock.now())?;
        let result = sqlx::query(
            r"INSERT INTO documents (collection, id, data)
              VALUES ($1, $2, $3)
              ON CONFLICT (collection, id) DO NOTHING",
        )
        .bind(collection)
        .bind(id)
        .bind(Value::Object(doc))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::AlreadyExists { collection: collection.to_owned(), id: id.to_owned() });
        }
        Ok(())
    }

    async fn patch_document(&self, collection: &str, id: &str, fields: Fields) -> Result<(), StoreError> {
        let patch = resolve_fields(fields, self.clock.now())?;
        let result = sqlx::query(
            r"UPDATE documents
              SET data = data || $3, updated_at = now()
              WHERE collection = $1 AND id = $2",
        )
        .bind(collection)
        .bind(id)
        .bind(Value::Object(patch))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound { collection: collection.to_owned(), id: id.to_owned() });
        }
        Ok(())
    }

    async fn add_document(&self, collection: &str, fields: Fields) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        self.create_document(collection, &id, fields).await?;
        Ok(id)
    }
}
