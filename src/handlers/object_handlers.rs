//! HTTP handler for presigned object downloads.
//! Streams object bodies to avoid buffering in memory and delegates signature
//! checks and storage concerns to `DiskBlobStore`.

use crate::{errors::AppError, state::AppState};
use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::Response,
};
use serde::Deserialize;
use tokio_util::io::ReaderStream;

/// Query pair produced by `UrlSigner::presign`.
#[derive(Debug, Deserialize)]
pub struct SignedQuery {
    pub expires: i64,
    pub signature: String,
}

/// GET `/objects/{bucket}/{*key}?expires=&signature=`
pub async fn get_object(
    State(state): State<AppState>,
    Path((bucket, key)): Path<(String, String)>,
    Query(q): Query<SignedQuery>,
) -> Result<Response, AppError> {
    let (file, len) = state
        .blobs
        .open_signed(&bucket, &key, q.expires, &q.signature)
        .await?;
    let body = Body::from_stream(ReaderStream::new(file));

    let mut response = Response::new(body);
    *response.status_mut() = StatusCode::OK;
    set_object_headers(response.headers_mut(), &key, len);
    Ok(response)
}

fn set_object_headers(headers: &mut HeaderMap, key: &str, len: u64) {
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(content_type_for(key)),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("private, max-age=3600"),
    );
}

fn content_type_for(key: &str) -> &'static str {
    if key.to_ascii_lowercase().ends_with(".png") {
        "image/png"
    } else {
        "application/octet-stream"
    }
}
