//! src/services/disk_blob_store.rs
//!
//! DiskBlobStore: S3-like object payloads on local disk, sharded beneath
//! `base_path/{bucket}/{shard}/{shard}/{key}`, with HMAC-signed read URLs
//! served by the `/objects` route.

use crate::services::{
    blob_store::{BlobStore, BlobStoreError, BlobStoreResult},
    url_signer::UrlSigner,
};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{Duration, Utc};
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::debug;
use uuid::Uuid;

const MAX_OBJECT_KEY_LEN: usize = 1024;
const BUCKET_NAME_MIN_LEN: usize = 3;
const BUCKET_NAME_MAX_LEN: usize = 63;

#[derive(Clone)]
pub struct DiskBlobStore {
    /// Base directory on disk where object payloads are stored.
    base_path: PathBuf,

    /// Signs and verifies download URLs.
    signer: UrlSigner,
}

impl DiskBlobStore {
    pub fn new(base_path: impl Into<PathBuf>, signer: UrlSigner) -> Self {
        Self {
            base_path: base_path.into(),
            signer,
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Compute the physical base folder path for a bucket.
    fn bucket_root(&self, bucket_name: &str) -> PathBuf {
        self.base_path.join(bucket_name)
    }

    /// Two-level shard identifiers: first two bytes of MD5(bucket/key) as hex.
    fn object_shards(bucket_name: &str, key: &str) -> (String, String) {
        let digest = md5::compute(format!("{}/{}", bucket_name, key));
        (format!("{:02x}", digest[0]), format!("{:02x}", digest[1]))
    }

    /// Combines base_path/bucket/{shard}/{shard}/{key}.
    /// Parent directories may not exist yet.
    fn object_path(&self, bucket_name: &str, key: &str) -> PathBuf {
        let (shard_a, shard_b) = Self::object_shards(bucket_name, key);
        let mut path = self.bucket_root(bucket_name);
        path.push(shard_a);
        path.push(shard_b);
        path.push(key);
        path
    }

    /// Write bytes to a temporary file, fsync, then rename into place.
    ///
    /// The temp file is removed on any failure.
    pub async fn write_object(&self, bucket: &str, key: &str, body: &[u8]) -> BlobStoreResult<()> {
        validate_bucket_name(bucket)?;
        validate_object_key(key)?;

        let file_path = self.object_path(bucket, key);
        let parent = file_path.parent().map(Path::to_path_buf).ok_or_else(|| {
            BlobStoreError::Io(io::Error::other("object path missing parent directory"))
        })?;
        fs::create_dir_all(&parent).await?;
        let tmp_path = parent.join(format!(".tmp-{}", Uuid::new_v4()));

        if let Err(err) = write_synced(&tmp_path, body).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(BlobStoreError::Io(err));
        }

        if let Err(err) = fs::rename(&tmp_path, &file_path).await {
            if err.kind() == ErrorKind::AlreadyExists {
                fs::remove_file(&file_path).await?;
                fs::rename(&tmp_path, &file_path).await?;
            } else {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(BlobStoreError::Io(err));
            }
        }

        Ok(())
    }

    /// Open an object for streaming out. Returns the file and its length.
    pub async fn open_object(&self, bucket: &str, key: &str) -> BlobStoreResult<(File, u64)> {
        validate_bucket_name(bucket)?;
        validate_object_key(key)?;

        let file_path = self.object_path(bucket, key);
        let file = File::open(&file_path).await.map_err(|err| {
            if err.kind() == ErrorKind::NotFound {
                BlobStoreError::ObjectNotFound {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                }
            } else {
                BlobStoreError::Io(err)
            }
        })?;
        let len = file.metadata().await?.len();

        Ok((file, len))
    }

    /// Verify a presigned URL's query pair, then open the object.
    pub async fn open_signed(
        &self,
        bucket: &str,
        key: &str,
        expires: i64,
        signature: &str,
    ) -> BlobStoreResult<(File, u64)> {
        self.signer
            .verify(bucket, key, expires, signature, Utc::now())?;
        self.open_object(bucket, key).await
    }
}

async fn write_synced(path: &Path, body: &[u8]) -> io::Result<()> {
    let mut file = File::create(path).await?;
    file.write_all(body).await?;
    file.flush().await?;
    file.sync_all().await
}

#[async_trait]
impl BlobStore for DiskBlobStore {
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> BlobStoreResult<()> {
        self.write_object(bucket, key, &body).await?;
        debug!(
            "stored {} bytes ({}) at {}/{}",
            body.len(),
            content_type,
            bucket,
            key
        );
        Ok(())
    }

    async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> BlobStoreResult<String> {
        validate_bucket_name(bucket)?;
        validate_object_key(key)?;
        Ok(self.signer.presign(bucket, key, expires_in, Utc::now()))
    }
}

/// Basic key validation to avoid trivial path traversal vectors.
///
/// Rejects empty or over-long keys, keys that begin with `/`, contain `..`,
/// backslashes or control characters.
pub fn validate_object_key(key: &str) -> BlobStoreResult<()> {
    if key.is_empty() || key.len() > MAX_OBJECT_KEY_LEN {
        return Err(BlobStoreError::InvalidObjectKey);
    }
    if key.starts_with('/') || key.contains("..") {
        return Err(BlobStoreError::InvalidObjectKey);
    }
    if key.bytes().any(|b| b.is_ascii_control() || b == b'\\') {
        return Err(BlobStoreError::InvalidObjectKey);
    }
    Ok(())
}

/// Validate bucket name format.
///
/// Enforces S3-like naming rules:
/// - 3–63 characters
/// - lowercase letters, digits, dots, hyphens only
/// - cannot start/end with dot or hyphen
/// - cannot contain consecutive dots or dot-hyphen patterns
/// - cannot look like an IPv4 address
pub fn validate_bucket_name(name: &str) -> BlobStoreResult<()> {
    let invalid = |reason: &str| BlobStoreError::InvalidBucketName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    let len = name.len();
    if !(BUCKET_NAME_MIN_LEN..=BUCKET_NAME_MAX_LEN).contains(&len) {
        return Err(invalid("must be between 3 and 63 characters"));
    }

    if !name
        .chars()
        .all(|c| matches!(c, 'a'..='z' | '0'..='9' | '.' | '-'))
    {
        return Err(invalid(
            "allowed characters are lowercase letters, digits, dots, and hyphens",
        ));
    }

    if name.starts_with('.') || name.ends_with('.') || name.starts_with('-') || name.ends_with('-')
    {
        return Err(invalid("must start and end with a lowercase letter or digit"));
    }

    if name.contains("..") || name.contains("-.") || name.contains(".-") {
        return Err(invalid(
            "cannot contain consecutive dots or dot-hyphen combinations",
        ));
    }

    if is_ipv4_like(name) {
        return Err(invalid("must not be formatted like an IP address"));
    }

    Ok(())
}

/// Check if a string matches IPv4-like dotted decimal form.
fn is_ipv4_like(name: &str) -> bool {
    let parts: Vec<&str> = name.split('.').collect();
    parts.len() == 4
        && parts.iter().all(|segment| {
            !segment.is_empty()
                && segment.len() <= 3
                && segment.chars().all(|c| c.is_ascii_digit())
                && segment.parse::<u8>().is_ok()
        })
}
