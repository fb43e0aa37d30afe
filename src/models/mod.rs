//! Data models for the QR generation service.
//!
//! The request is kept as the raw JSON object the caller sent; the metadata
//! record and the invocation envelope serialize naturally as JSON via `serde`.

pub mod invocation;
pub mod metadata;
pub mod qr_request;
