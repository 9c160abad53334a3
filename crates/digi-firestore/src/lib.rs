//! Firestore REST API client.
//!
//! This crate provides:
//! - Draft repository (`form_drafts`, keyed by applicant email)
//! - Application repository (`applicants`) with atomic draft consumption
//! - Service account authentication via gcp_auth, or the local emulator
//! - Masked updates and retry logic

pub mod application_repo;
pub mod client;
pub mod draft_repo;
pub mod error;
pub mod metrics;
pub mod retry;
pub mod token_cache;
pub mod types;

#[cfg(test)]
mod client_tests;

pub use application_repo::{ApplicationRepository, APPLICATIONS_COLLECTION};
pub use client::{FirestoreClient, FirestoreConfig};
pub use draft_repo::{DraftRepository, DRAFTS_COLLECTION};
pub use error::{FirestoreError, FirestoreResult};
pub use retry::RetryConfig;
pub use token_cache::TokenCache;
pub use types::{Document, FromFirestoreValue, ToFirestoreValue, Value};
