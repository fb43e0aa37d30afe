//! Defines routes for QR generation and presigned downloads.
//!
//! ## Structure
//! - **Generation**
//!   - `POST /qr-codes`   : raw request object in, `{message, url}` out
//!   - `POST /invocations`: `{body}` envelope in, `{statusCode, body}` out
//!
//! - **Downloads**
//!   - `GET  /objects/{bucket}/{*key}?expires=&signature=`: presigned read
//!
//! The wildcard `*key` allows nested keys like `qr-codes/<id>-qr-code.png`.

use crate::{
    handlers::{
        health_handlers::{healthz, readyz},
        object_handlers::get_object,
        qr_handlers::{create_qr_code, invoke},
    },
    state::AppState,
};
use axum::{
    Router,
    routing::{get, post},
};

/// Build and return the router. Handlers share `AppState`.
pub fn routes() -> Router<AppState> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/qr-codes", post(create_qr_code))
        .route("/invocations", post(invoke))
        .route("/objects/{bucket}/{*key}", get(get_object))
}
