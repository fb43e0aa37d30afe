//! src/services/qr_service.rs
//!
//! QrService: the request handler. Decodes one request, renders the code,
//! uploads the PNG, presigns a download URL and records metadata, strictly
//! in that order. Every failure collapses into the same generic response;
//! the detail only goes to the log.

use crate::{
    models::{
        invocation::{InvocationEvent, InvocationResponse, ResponseBody},
        metadata::{MetadataRecord, object_key},
        qr_request::QrRequest,
    },
    services::{
        blob_store::{BlobStore, BlobStoreError},
        metadata_store::{MetadataError, MetadataStore},
        renderer::{QrRenderer, RenderError, encode_png},
    },
};
use bytes::Bytes;
use chrono::{Duration, Utc};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info};
use uuid::Uuid;

/// Lifetime of a presigned download URL.
pub const URL_EXPIRY_SECS: i64 = 3600;
pub const PNG_CONTENT_TYPE: &str = "image/png";

pub const SUCCESS_MESSAGE: &str = "QR code generated successfully";
pub const FAILURE_MESSAGE: &str = "Error processing the request";

#[derive(Debug, Error)]
pub enum QrError {
    #[error("request has no body")]
    MissingBody,
    #[error("request body is not UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("invocation envelope is malformed: {0}")]
    Envelope(#[source] serde_json::Error),
    #[error("request body is not a JSON object: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("rendering failed: {0}")]
    Render(#[from] RenderError),
    #[error("render task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    #[error("blob store: {0}")]
    Blob(#[from] BlobStoreError),
    #[error("metadata store: {0}")]
    Metadata(#[from] MetadataError),
}

/// Where generated codes and their records go.
#[derive(Debug, Clone)]
pub struct QrSettings {
    pub bucket: String,
    pub folder: String,
    pub table: String,
}

/// Outcome of one successful generation.
#[derive(Debug, Clone)]
pub struct GeneratedQr {
    pub key: String,
    pub url: String,
    pub record: MetadataRecord,
}

#[derive(Clone)]
pub struct QrService {
    renderer: Arc<dyn QrRenderer>,
    blobs: Arc<dyn BlobStore>,
    metadata: Arc<dyn MetadataStore>,
    settings: Arc<QrSettings>,
}

impl QrService {
    pub fn new(
        renderer: Arc<dyn QrRenderer>,
        blobs: Arc<dyn BlobStore>,
        metadata: Arc<dyn MetadataStore>,
        settings: QrSettings,
    ) -> Self {
        Self {
            renderer,
            blobs,
            metadata,
            settings: Arc::new(settings),
        }
    }

    /// Run one invocation end to end and shape the response.
    pub async fn handle(&self, event: &InvocationEvent) -> InvocationResponse {
        let result = match event.body.as_deref() {
            Some(body) => self.generate(body).await,
            None => Err(QrError::MissingBody),
        };
        respond(result)
    }

    /// Like [`handle`](Self::handle), for a raw request body.
    pub async fn handle_body(&self, body: &[u8]) -> InvocationResponse {
        let result = match std::str::from_utf8(body) {
            Ok(body) => self.generate(body).await,
            Err(err) => Err(QrError::from(err)),
        };
        respond(result)
    }

    /// Like [`handle`](Self::handle), for a serialized invocation envelope.
    pub async fn handle_envelope(&self, raw: &[u8]) -> InvocationResponse {
        match serde_json::from_slice::<InvocationEvent>(raw) {
            Ok(event) => self.handle(&event).await,
            Err(err) => respond(Err(QrError::Envelope(err))),
        }
    }

    /// Decode, render, upload, presign, record.
    ///
    /// The identifier and timestamp are drawn here, per call; nothing about a
    /// request outlives it. A metadata failure after the upload leaves the
    /// object in place.
    pub async fn generate(&self, body: &str) -> Result<GeneratedQr, QrError> {
        let request = QrRequest::parse(body)?;
        debug!("Decoded request: {:?}", request.fields());

        let id = Uuid::new_v4();
        let timestamp = Utc::now();

        let renderer = Arc::clone(&self.renderer);
        let to_render = request.clone();
        let png = tokio::task::spawn_blocking(move || {
            let img = renderer.render(&to_render)?;
            encode_png(&img)
        })
        .await??;

        let record = MetadataRecord::new(id, request.request_data(), timestamp);
        let key = object_key(&self.settings.folder, &record.file_name);

        self.blobs
            .put_object(&self.settings.bucket, &key, Bytes::from(png), PNG_CONTENT_TYPE)
            .await?;
        let url = self
            .blobs
            .presign_get(
                &self.settings.bucket,
                &key,
                Duration::seconds(URL_EXPIRY_SECS),
            )
            .await?;
        self.metadata
            .put_record(&self.settings.table, &record)
            .await?;

        Ok(GeneratedQr { key, url, record })
    }
}

/// The only place a pipeline outcome becomes a response.
fn respond(result: Result<GeneratedQr, QrError>) -> InvocationResponse {
    match result {
        Ok(generated) => {
            info!(
                id = %generated.record.id,
                key = %generated.key,
                "Generated QR code"
            );
            InvocationResponse::new(
                200,
                &ResponseBody {
                    message: SUCCESS_MESSAGE.into(),
                    url: Some(generated.url),
                },
            )
        }
        Err(err) => {
            error!(error = ?err, "Failed to generate QR code: {}", err);
            InvocationResponse::new(
                500,
                &ResponseBody {
                    message: FAILURE_MESSAGE.into(),
                    url: None,
                },
            )
        }
    }
}
