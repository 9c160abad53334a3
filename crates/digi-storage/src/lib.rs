//! Cloudflare R2 storage client.
//!
//! This crate provides:
//! - Public bucket uploads for CVs and profile photos
//! - Object naming and public URL construction
//! - The `FileStore` contract used by the API

pub mod client;
pub mod error;
pub mod store;

pub use client::{R2Client, R2Config};
pub use error::{StorageError, StorageResult};
pub use store::{object_key, FileStore, StoredFile};
