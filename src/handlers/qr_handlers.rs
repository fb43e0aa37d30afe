//! HTTP entry points for QR generation.
//!
//! Both routes take the body as raw bytes and delegate decoding to
//! `QrService`, so malformed input ends in the same generic failure as any
//! other error. They differ only in how the request arrives and how the
//! response is framed.

use crate::{models::invocation::InvocationResponse, state::AppState};
use axum::{
    Json,
    body::{Body, Bytes},
    extract::State,
    http::{HeaderValue, StatusCode, header},
    response::Response,
};

/// `POST /qr-codes`: the raw HTTP body is the request object.
pub async fn create_qr_code(State(state): State<AppState>, body: Bytes) -> Response {
    into_http_response(state.qr.handle_body(&body).await)
}

/// `POST /invocations`: function-style envelope in, envelope out.
pub async fn invoke(State(state): State<AppState>, body: Bytes) -> Json<InvocationResponse> {
    Json(state.qr.handle_envelope(&body).await)
}

fn into_http_response(result: InvocationResponse) -> Response {
    let mut response = Response::new(Body::from(result.body));
    *response.status_mut() =
        StatusCode::from_u16(result.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    response
}
