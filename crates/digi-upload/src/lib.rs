//! Standalone file upload server.
//!
//! Accepts CV and photo uploads as multipart forms, writes them under an
//! upload directory and serves them back from `/uploads`.

pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;
pub mod storage;

pub use config::UploadConfig;
pub use error::{UploadError, UploadResult};
pub use routes::create_router;
pub use state::UploadState;
pub use storage::DiskStore;
