//! Firestore REST client.
//!
//! Bearer tokens come from a [`TokenCache`]; a token that expires while a
//! request is in flight is refreshed once and the request replayed. Every
//! call is traced and recorded in the request metrics. Retries are left to
//! the caller through [`FirestoreClient::with_retry`] so that only
//! idempotent operations opt in.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use gcp_auth::{CustomServiceAccount, TokenProvider};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tracing::{debug, info_span, Instrument};

use crate::error::{FirestoreError, FirestoreResult};
use crate::metrics::record_request;
use crate::retry::RetryConfig;
use crate::token_cache::{TokenCache, EMULATOR_TOKEN};
use crate::types::{CommitRequest, CommitResponse, Document, Value, Write};

const FIRESTORE_ENDPOINT: &str = "https://firestore.googleapis.com";

/// Firestore rejects commits carrying more writes than this.
const MAX_COMMIT_WRITES: usize = 500;

#[derive(Debug, Clone)]
pub struct FirestoreConfig {
    pub project_id: String,
    /// Usually `(default)`
    pub database_id: String,
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub retry: RetryConfig,
    /// `host:port` of a local emulator, if any
    pub emulator_host: Option<String>,
}

impl FirestoreConfig {
    /// Read the project from `GCP_PROJECT_ID`, falling back to
    /// `FIREBASE_PROJECT_ID`.
    pub fn from_env() -> FirestoreResult<Self> {
        let project_id = ["GCP_PROJECT_ID", "FIREBASE_PROJECT_ID"]
            .into_iter()
            .find_map(|key| std::env::var(key).ok())
            .ok_or_else(|| {
                FirestoreError::auth_error("set GCP_PROJECT_ID or FIREBASE_PROJECT_ID to reach Firestore")
            })?;
        if project_id.trim().is_empty() {
            return Err(FirestoreError::auth_error("Firestore project id is empty"));
        }

        let connect_secs = std::env::var("FIRESTORE_CONNECT_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(5);

        Ok(Self {
            project_id,
            database_id: std::env::var("FIRESTORE_DATABASE_ID").unwrap_or_else(|_| "(default)".into()),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(connect_secs),
            retry: RetryConfig::from_env(),
            emulator_host: std::env::var("FIRESTORE_EMULATOR_HOST")
                .ok()
                .filter(|host| !host.is_empty()),
        })
    }

    /// `projects/{p}/databases/{d}/documents`
    fn documents_root(&self) -> String {
        format!("projects/{}/databases/{}/documents", self.project_id, self.database_id)
    }
}

/// Operation, collection and document a request concerns.
#[derive(Debug, Clone, Copy)]
struct Target<'a> {
    operation: &'static str,
    collection: &'a str,
    doc_id: Option<&'a str>,
}

impl<'a> Target<'a> {
    fn document(operation: &'static str, collection: &'a str, doc_id: &'a str) -> Self {
        Self {
            operation,
            collection,
            doc_id: Some(doc_id),
        }
    }

    fn path(&self) -> String {
        match self.doc_id {
            Some(id) => format!("{}/{}", self.collection, id),
            None => self.collection.to_string(),
        }
    }

    /// Turn an unexpected response into an error, keeping the body for
    /// diagnostics.
    async fn failure(&self, response: Response) -> FirestoreError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        FirestoreError::from_http_status(status, format!("{} {}: {}", self.operation, self.path(), body))
    }
}

#[derive(Clone)]
pub struct FirestoreClient {
    http: Client,
    config: FirestoreConfig,
    /// `{endpoint}/v1/{documents_root}`
    documents_url: String,
    tokens: Arc<TokenCache>,
}

impl FirestoreClient {
    /// Connect to the emulator when `emulator_host` is set, otherwise to
    /// Google with the service account named by
    /// `GOOGLE_APPLICATION_CREDENTIALS`.
    pub fn new(config: FirestoreConfig) -> FirestoreResult<Self> {
        if let Some(host) = config.emulator_host.clone() {
            let endpoint = format!("http://{}", host);
            return Self::with_endpoint(config, &endpoint, TokenCache::fixed(EMULATOR_TOKEN));
        }
        let provider = service_account()?;
        Self::with_endpoint(config, FIRESTORE_ENDPOINT, TokenCache::new(provider))
    }

    pub fn from_env() -> FirestoreResult<Self> {
        Self::new(FirestoreConfig::from_env()?)
    }

    /// Client against an explicit endpoint, used for emulators and mocks.
    pub fn with_endpoint(
        config: FirestoreConfig,
        endpoint: &str,
        tokens: TokenCache,
    ) -> FirestoreResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .user_agent(concat!("digi-firestore/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let documents_url = format!(
            "{}/v1/{}",
            endpoint.trim_end_matches('/'),
            config.documents_root()
        );

        Ok(Self {
            http,
            config,
            documents_url,
            tokens: Arc::new(tokens),
        })
    }

    pub fn config(&self) -> &FirestoreConfig {
        &self.config
    }

    /// Resource name used to address a document inside commit writes.
    pub fn full_document_name(&self, collection: &str, doc_id: &str) -> String {
        format!("{}/{}/{}", self.config.documents_root(), collection, doc_id)
    }

    fn document_url(&self, collection: &str, doc_id: &str) -> String {
        format!(
            "{}/{}/{}",
            self.documents_url,
            collection,
            urlencoding::encode(doc_id)
        )
    }

    /// Fetch a document; `Ok(None)` if it does not exist.
    pub async fn get_document(
        &self,
        collection: &str,
        doc_id: &str,
    ) -> FirestoreResult<Option<Document>> {
        let target = Target::document("get_document", collection, doc_id);
        let url = self.document_url(collection, doc_id);

        self.observe(target, async {
            let response = self.authorized(|token| self.http.get(&url).bearer_auth(token)).await?;
            match response.status() {
                StatusCode::OK => Ok(Some(response.json().await?)),
                StatusCode::NOT_FOUND => Ok(None),
                _ => Err(target.failure(response).await),
            }
        })
        .await
    }

    /// Insert a document under `doc_id`. Fails with `AlreadyExists` when
    /// the id is taken.
    pub async fn create_document(
        &self,
        collection: &str,
        doc_id: &str,
        fields: HashMap<String, Value>,
    ) -> FirestoreResult<Document> {
        let target = Target::document("create_document", collection, doc_id);
        let url = format!("{}/{}", self.documents_url, collection);
        let body = Document::new(fields);

        self.observe(target, async {
            let response = self
                .authorized(|token| {
                    self.http
                        .post(&url)
                        .query(&[("documentId", doc_id)])
                        .bearer_auth(token)
                        .json(&body)
                })
                .await?;
            match response.status() {
                StatusCode::OK | StatusCode::CREATED => Ok(response.json().await?),
                StatusCode::CONFLICT => Err(FirestoreError::AlreadyExists(target.path())),
                _ => Err(target.failure(response).await),
            }
        })
        .await
    }

    /// Overwrite the fields named in `update_mask` on an existing document.
    /// Other fields are kept. A missing document is `NotFound`.
    pub async fn update_document(
        &self,
        collection: &str,
        doc_id: &str,
        fields: HashMap<String, Value>,
        update_mask: &[String],
    ) -> FirestoreResult<Document> {
        let target = Target::document("update_document", collection, doc_id);
        let url = self.document_url(collection, doc_id);
        let mut query: Vec<(&str, &str)> = update_mask
            .iter()
            .map(|field| ("updateMask.fieldPaths", field.as_str()))
            .collect();
        query.push(("currentDocument.exists", "true"));
        let body = Document::new(fields);

        self.observe(target, async {
            let response = self
                .authorized(|token| {
                    self.http
                        .patch(&url)
                        .query(&query)
                        .bearer_auth(token)
                        .json(&body)
                })
                .await?;
            match response.status() {
                StatusCode::OK => Ok(response.json().await?),
                StatusCode::NOT_FOUND => Err(FirestoreError::not_found(target.path())),
                _ => Err(target.failure(response).await),
            }
        })
        .await
    }

    /// Remove a document. Removing a missing document is not an error.
    pub async fn delete_document(&self, collection: &str, doc_id: &str) -> FirestoreResult<()> {
        let target = Target::document("delete_document", collection, doc_id);
        let url = self.document_url(collection, doc_id);

        self.observe(target, async {
            let response = self.authorized(|token| self.http.delete(&url).bearer_auth(token)).await?;
            match response.status() {
                StatusCode::OK | StatusCode::NO_CONTENT => Ok(()),
                StatusCode::NOT_FOUND => {
                    debug!(path = %target.path(), "Document already gone");
                    Ok(())
                }
                _ => Err(target.failure(response).await),
            }
        })
        .await
    }

    /// Apply `writes` atomically.
    pub async fn commit(&self, writes: Vec<Write>) -> FirestoreResult<CommitResponse> {
        match writes.len() {
            0 => return Err(FirestoreError::request_failed("commit without writes")),
            n if n > MAX_COMMIT_WRITES => {
                return Err(FirestoreError::request_failed(format!(
                    "commit of {} writes exceeds the {} write limit",
                    n, MAX_COMMIT_WRITES
                )))
            }
            _ => {}
        }

        let target = Target {
            operation: "commit",
            collection: "batch",
            doc_id: None,
        };
        let url = format!("{}:commit", self.documents_url);
        let request = CommitRequest { writes };

        self.observe(target, async {
            let response = self
                .authorized(|token| self.http.post(&url).bearer_auth(token).json(&request))
                .await?;
            match response.status() {
                StatusCode::OK => Ok(response.json().await?),
                _ => Err(target.failure(response).await),
            }
        })
        .await
    }

    /// Run `op` under the configured retry policy.
    pub async fn with_retry<T, F, Fut>(&self, operation: &str, op: F) -> FirestoreResult<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = FirestoreResult<T>>,
    {
        crate::retry::with_retry(&self.config.retry, operation, op).await
    }

    /// Send with a bearer token. A 401 reporting an expired token drops the
    /// cached token and replays the request once.
    async fn authorized<F>(&self, build: F) -> FirestoreResult<Response>
    where
        F: Fn(&str) -> RequestBuilder,
    {
        let token = self.tokens.get_token().await?;
        let response = build(&token).send().await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        if !token_expired(&body) {
            return Err(FirestoreError::AuthError(body));
        }

        debug!("Firestore token expired mid-flight, refreshing");
        self.tokens.invalidate().await;
        let token = self.tokens.get_token().await?;
        Ok(build(&token).send().await?)
    }

    /// Trace `fut` and record its outcome.
    async fn observe<T, F>(&self, target: Target<'_>, fut: F) -> FirestoreResult<T>
    where
        F: Future<Output = FirestoreResult<T>>,
    {
        let span = info_span!(
            "firestore_request",
            operation = target.operation,
            collection = %target.collection,
            doc_id = target.doc_id.unwrap_or_default(),
        );

        let started = Instant::now();
        let result = fut.instrument(span).await;
        let status = result
            .as_ref()
            .map_or_else(|e| e.http_status().unwrap_or(500), |_| 200);
        record_request(target.operation, target.collection, status, started.elapsed());
        result
    }
}

fn token_expired(body: &str) -> bool {
    body.contains("ACCESS_TOKEN_EXPIRED") || body.contains("\"UNAUTHENTICATED\"")
}

fn service_account() -> FirestoreResult<Arc<dyn TokenProvider>> {
    match CustomServiceAccount::from_env() {
        Ok(Some(account)) => Ok(Arc::new(account)),
        Ok(None) => Err(FirestoreError::auth_error(
            "GOOGLE_APPLICATION_CREDENTIALS must point at a service account JSON file",
        )),
        Err(e) => Err(FirestoreError::auth_error(format!(
            "could not load service account: {}",
            e
        ))),
    }
}
