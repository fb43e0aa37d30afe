//! Axum handlers. Each delegates to a service and only shapes HTTP.

pub mod health_handlers;
pub mod object_handlers;
pub mod qr_handlers;
