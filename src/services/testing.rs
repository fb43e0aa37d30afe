//! In-memory collaborators for tests.

use crate::{
    models::metadata::MetadataRecord,
    services::{
        blob_store::{BlobStore, BlobStoreError, BlobStoreResult},
        metadata_store::{MetadataError, MetadataResult, MetadataStore},
    },
};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Duration;
use std::{
    io,
    sync::{
        Mutex,
        atomic::{AtomicBool, Ordering},
    },
};

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub bucket: String,
    pub key: String,
    pub body: Bytes,
    pub content_type: String,
}

#[derive(Default)]
pub struct InMemoryBlobStore {
    pub objects: Mutex<Vec<StoredObject>>,
    pub presigned: Mutex<Vec<(String, String, Duration)>>,
    pub fail_puts: AtomicBool,
}

impl InMemoryBlobStore {
    pub fn failing() -> Self {
        let store = Self::default();
        store.fail_puts.store(true, Ordering::SeqCst);
        store
    }

    pub fn objects(&self) -> Vec<StoredObject> {
        self.objects.lock().unwrap().clone()
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> BlobStoreResult<()> {
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(BlobStoreError::Io(io::Error::other("injected put failure")));
        }
        self.objects.lock().unwrap().push(StoredObject {
            bucket: bucket.to_string(),
            key: key.to_string(),
            body,
            content_type: content_type.to_string(),
        });
        Ok(())
    }

    async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> BlobStoreResult<String> {
        self.presigned
            .lock()
            .unwrap()
            .push((bucket.to_string(), key.to_string(), expires_in));
        Ok(format!(
            "memory://{bucket}/{key}?expires_in={}",
            expires_in.num_seconds()
        ))
    }
}

#[derive(Default)]
pub struct InMemoryMetadataStore {
    pub records: Mutex<Vec<(String, MetadataRecord)>>,
    pub fail_puts: AtomicBool,
}

impl InMemoryMetadataStore {
    pub fn failing() -> Self {
        let store = Self::default();
        store.fail_puts.store(true, Ordering::SeqCst);
        store
    }

    pub fn records(&self) -> Vec<(String, MetadataRecord)> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl MetadataStore for InMemoryMetadataStore {
    async fn put_record(&self, table: &str, record: &MetadataRecord) -> MetadataResult<()> {
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(MetadataError::Sqlx(sqlx::Error::PoolClosed));
        }
        self.records
            .lock()
            .unwrap()
            .push((table.to_string(), record.clone()));
        Ok(())
    }
}
