//! Metadata store port and its SQLite implementation.

use crate::models::metadata::MetadataRecord;
use async_trait::async_trait;
use sqlx::SqlitePool;
use std::sync::Arc;
use thiserror::Error;

const MAX_TABLE_NAME_LEN: usize = 64;

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("table name `{0}` is invalid")]
    InvalidTableName(String),
    #[error("record `{0}` already exists")]
    DuplicateRecord(String),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type MetadataResult<T> = Result<T, MetadataError>;

#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Insert one record into `table`. Records are never updated.
    async fn put_record(&self, table: &str, record: &MetadataRecord) -> MetadataResult<()>;
}

/// Table names are interpolated into SQL, so only plain identifiers pass.
pub fn validate_table_name(name: &str) -> MetadataResult<()> {
    let mut chars = name.chars();
    let valid = name.len() <= MAX_TABLE_NAME_LEN
        && chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(MetadataError::InvalidTableName(name.to_string()))
    }
}

/// Metadata records persisted in SQLite, one row per generated code.
///
/// `request_data` is stored as a JSON object of strings.
#[derive(Clone)]
pub struct SqliteMetadataStore {
    pub db: Arc<SqlitePool>,
}

impl SqliteMetadataStore {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    /// Create `table` if it does not exist yet.
    pub async fn ensure_table(&self, table: &str) -> MetadataResult<()> {
        validate_table_name(table)?;
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS \"{table}\" (
                id TEXT PRIMARY KEY NOT NULL,
                file_name TEXT NOT NULL,
                request_data TEXT NOT NULL,
                timestamp TEXT NOT NULL
            )"
        );
        tracing::debug!("Executing migration SQL: {}", sql);
        sqlx::query(&sql).execute(&*self.db).await?;
        Ok(())
    }
}

#[async_trait]
impl MetadataStore for SqliteMetadataStore {
    async fn put_record(&self, table: &str, record: &MetadataRecord) -> MetadataResult<()> {
        validate_table_name(table)?;
        let request_data = serde_json::to_string(&record.request_data)?;

        let sql = format!(
            "INSERT INTO \"{table}\" (id, file_name, request_data, timestamp) VALUES (?, ?, ?, ?)"
        );
        match sqlx::query(&sql)
            .bind(record.id.to_string())
            .bind(&record.file_name)
            .bind(request_data)
            .bind(record.timestamp_string())
            .execute(&*self.db)
            .await
        {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => {
                Err(MetadataError::DuplicateRecord(record.id.to_string()))
            }
            Err(err) => Err(MetadataError::Sqlx(err)),
        }
    }
}

/// Return true if SQLx error indicates a unique constraint violation.
fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err) if db_err.message().to_ascii_lowercase().contains("unique")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sqlx::sqlite::SqlitePoolOptions;
    use std::collections::BTreeMap;
    use uuid::Uuid;

    async fn store() -> SqliteMetadataStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let store = SqliteMetadataStore::new(Arc::new(pool));
        store.ensure_table("qr_codes").await.unwrap();
        store
    }

    fn record() -> MetadataRecord {
        let data = BTreeMap::from([
            ("content".to_string(), "hello".to_string()),
            ("box_size".to_string(), "10".to_string()),
        ]);
        MetadataRecord::new(Uuid::new_v4(), data, Utc::now())
    }

    #[tokio::test]
    async fn put_record_persists_row() {
        let store = store().await;
        let record = record();
        store.put_record("qr_codes", &record).await.unwrap();

        let (id, file_name, request_data, timestamp): (String, String, String, String) =
            sqlx::query_as("SELECT id, file_name, request_data, timestamp FROM qr_codes")
                .fetch_one(&*store.db)
                .await
                .unwrap();
        assert_eq!(id, record.id.to_string());
        assert_eq!(file_name, record.file_name);
        assert_eq!(timestamp, record.timestamp_string());
        let data: BTreeMap<String, String> = serde_json::from_str(&request_data).unwrap();
        assert_eq!(data, record.request_data);
    }

    #[tokio::test]
    async fn duplicate_id_is_rejected() {
        let store = store().await;
        let record = record();
        store.put_record("qr_codes", &record).await.unwrap();
        let err = store.put_record("qr_codes", &record).await.unwrap_err();
        assert!(matches!(err, MetadataError::DuplicateRecord(_)));
    }

    #[tokio::test]
    async fn ensure_table_is_idempotent() {
        let store = store().await;
        store.ensure_table("qr_codes").await.unwrap();
    }

    #[test]
    fn table_name_validation() {
        assert!(validate_table_name("qr_codes").is_ok());
        assert!(validate_table_name("_t1").is_ok());
        let long = "a".repeat(65);
        for bad in ["", "1abc", "qr-codes", "t\"; DROP TABLE x; --", long.as_str()] {
            assert!(validate_table_name(bad).is_err(), "{bad} should be rejected");
        }
    }
}
