//! Shared state handed to every route.

use crate::services::{
    disk_blob_store::DiskBlobStore, metadata_store::SqliteMetadataStore, qr_service::QrService,
};

#[derive(Clone)]
pub struct AppState {
    /// The QR pipeline, wired to the concrete stores below.
    pub qr: QrService,

    /// Serves presigned downloads and readiness checks.
    pub blobs: DiskBlobStore,

    /// Used by the readiness probe.
    pub metadata: SqliteMetadataStore,
}
