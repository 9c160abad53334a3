//! Axum HTTP API for the recruitment form.
//!
//! This crate provides:
//! - Firebase ID token verification and email/password account flows
//! - The draft/submission lifecycle with debounced autosave
//! - CV and photo uploads to object storage
//! - Rate limiting, security headers and Prometheus metrics

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod identity;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;


pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use services::{LifecycleError, LifecycleService};
pub use state::AppState;
