//! Blob store port used by the QR pipeline.

use crate::services::url_signer::SignatureError;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Duration;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BlobStoreError {
    #[error("bucket `{name}` invalid: {reason}")]
    InvalidBucketName { name: String, reason: String },
    #[error("invalid object key")]
    InvalidObjectKey,
    #[error("object `{key}` not found in bucket `{bucket}`")]
    ObjectNotFound { bucket: String, key: String },
    #[error(transparent)]
    Signature(#[from] SignatureError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type BlobStoreResult<T> = Result<T, BlobStoreError>;

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Write `body` at `bucket/key`, replacing any previous object.
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> BlobStoreResult<()>;

    /// Read-only URL for `bucket/key`, valid for `expires_in`.
    async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> BlobStoreResult<String>;
}
