//! Rendering, storage ports and their implementations, and the pipeline
//! that ties them together.

pub mod blob_store;
pub mod color;
pub mod disk_blob_store;
pub mod metadata_store;
pub mod qr_service;
pub mod renderer;
pub mod url_signer;

#[cfg(test)]
pub mod testing;
