//! Tests for Firestore client configuration and error mapping.

use std::time::Duration;

use serial_test::serial;

use crate::client::{FirestoreClient, FirestoreConfig};
use crate::error::FirestoreError;
use crate::retry::RetryConfig;
use crate::token_cache::TokenCache;

fn test_config() -> FirestoreConfig {
    FirestoreConfig {
        project_id: "test-project".to_string(),
        database_id: "(default)".to_string(),
        timeout: Duration::from_secs(5),
        connect_timeout: Duration::from_secs(2),
        retry: RetryConfig {
            max_retries: 3,
            base_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(100),
        },
        emulator_host: None,
    }
}

fn clear_env() {
    for key in [
        "GCP_PROJECT_ID",
        "FIREBASE_PROJECT_ID",
        "FIRESTORE_CONNECT_TIMEOUT_SECS",
        "FIRESTORE_RETRY_BASE_MS",
        "FIRESTORE_RETRY_MAX_MS",
        "FIRESTORE_EMULATOR_HOST",
    ] {
        std::env::remove_var(key);
    }
}

// Error mapping

#[test]
fn test_error_from_http_status() {
    assert!(matches!(
        FirestoreError::from_http_status(429, "rate limited"),
        FirestoreError::RateLimited(_)
    ));
    assert!(matches!(
        FirestoreError::from_http_status(503, "unavailable"),
        FirestoreError::ServerError(503, _)
    ));
    assert!(matches!(
        FirestoreError::from_http_status(404, "missing"),
        FirestoreError::NotFound(_)
    ));
    assert!(matches!(
        FirestoreError::from_http_status(409, "conflict"),
        FirestoreError::AlreadyExists(_)
    ));
    assert!(matches!(
        FirestoreError::from_http_status(400, "bad request"),
        FirestoreError::RequestFailed(_)
    ));
    assert!(matches!(
        FirestoreError::from_http_status(400, r#"{"status":"FAILED_PRECONDITION"}"#),
        FirestoreError::PreconditionFailed(_)
    ));
}

#[test]
fn test_retryable_errors() {
    assert!(FirestoreError::from_http_status(500, "x").is_retryable());
    assert!(FirestoreError::from_http_status(429, "x").is_retryable());
    assert!(!FirestoreError::from_http_status(400, "x").is_retryable());
    assert!(!FirestoreError::from_http_status(409, "x").is_retryable());
}

#[test]
fn test_conflict_errors() {
    assert!(FirestoreError::AlreadyExists("x".into()).is_conflict());
    assert!(FirestoreError::PreconditionFailed("x".into()).is_conflict());
    assert!(!FirestoreError::NotFound("x".into()).is_conflict());
}

#[test]
fn test_error_http_status_getter() {
    assert_eq!(FirestoreError::RateLimited(1000).http_status(), Some(429));
    assert_eq!(
        FirestoreError::ServerError(502, "bad gateway".into()).http_status(),
        Some(502)
    );
    assert_eq!(FirestoreError::NotFound("doc".into()).http_status(), Some(404));
    assert_eq!(FirestoreError::InvalidResponse("x".into()).http_status(), None);
    assert_eq!(FirestoreError::RateLimited(5000).retry_after_ms(), Some(5000));
}

// Client construction

#[test]
fn test_full_document_name() {
    let client =
        FirestoreClient::with_endpoint(test_config(), "http://localhost:8080", TokenCache::fixed("t"))
            .unwrap();
    assert_eq!(
        client.full_document_name("form_drafts", "a@x.com"),
        "projects/test-project/databases/(default)/documents/form_drafts/a@x.com"
    );
}

#[test]
fn test_emulator_needs_no_credentials() {
    let mut config = test_config();
    config.emulator_host = Some("localhost:8080".to_string());
    assert!(FirestoreClient::new(config).is_ok());
}

// Config

#[test]
#[serial]
fn test_config_requires_project_id() {
    clear_env();
    assert!(FirestoreConfig::from_env().is_err());

    std::env::set_var("GCP_PROJECT_ID", "");
    assert!(FirestoreConfig::from_env().is_err());
}

#[test]
#[serial]
fn test_config_prefers_gcp_project_id() {
    clear_env();
    std::env::set_var("FIREBASE_PROJECT_ID", "firebase-project");
    assert_eq!(FirestoreConfig::from_env().unwrap().project_id, "firebase-project");

    std::env::set_var("GCP_PROJECT_ID", "gcp-project");
    assert_eq!(FirestoreConfig::from_env().unwrap().project_id, "gcp-project");
}

#[test]
#[serial]
fn test_config_parses_env_values() {
    clear_env();
    std::env::set_var("GCP_PROJECT_ID", "test");
    std::env::set_var("FIRESTORE_CONNECT_TIMEOUT_SECS", "15");
    std::env::set_var("FIRESTORE_RETRY_BASE_MS", "50");
    std::env::set_var("FIRESTORE_RETRY_MAX_MS", "2000");
    std::env::set_var("FIRESTORE_EMULATOR_HOST", "localhost:8080");

    let config = FirestoreConfig::from_env().unwrap();
    assert_eq!(config.connect_timeout, Duration::from_secs(15));
    assert_eq!(config.retry.base_delay, Duration::from_millis(50));
    assert_eq!(config.retry.max_delay, Duration::from_secs(2));
    assert_eq!(config.emulator_host.as_deref(), Some("localhost:8080"));
    clear_env();
}

#[test]
#[serial]
fn test_config_handles_invalid_env_values() {
    clear_env();
    std::env::set_var("GCP_PROJECT_ID", "test");
    std::env::set_var("FIRESTORE_CONNECT_TIMEOUT_SECS", "not-a-number");
    let config = FirestoreConfig::from_env().unwrap();
    assert_eq!(config.connect_timeout, Duration::from_secs(5));
    clear_env();
}
