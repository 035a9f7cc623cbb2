// crates/caseflow-providers/src/http.rs
// ============================================================================
// Module: HTTP Collaborator Providers
// Description: HTTP-backed implementations of ClassifierPort, DraftPort,
//              EmailTransportPort, and PortalWorkerPort.
// Purpose: Let the orchestration engine talk to real classifier/draft/email/
//          portal collaborators over a bounded blocking HTTP client.
// Dependencies: caseflow-core, reqwest, serde_json
// ============================================================================

//! ## Overview
//! Each collaborator port gets a thin HTTP adapter: serialize the request
//! struct as a JSON body, POST it to the configured base URL, deserialize
//! the response. Requests run on the blocking client because callers are
//! already inside a durable dispatcher task, never a request thread.
//! Security posture: collaborator endpoints are operator-configured, not
//! user-supplied, so no DNS pinning or host allowlist is enforced here;
//! size limits still apply to bound memory use on malformed responses.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use caseflow_core::AiCollaboratorError;
use caseflow_core::Analysis;
use caseflow_core::ClassifierPort;
use caseflow_core::ClassifyRequest;
use caseflow_core::Draft;
use caseflow_core::DraftPort;
use caseflow_core::DraftRequest;
use caseflow_core::OutboundEmail;
use caseflow_core::EmailTransportPort;
use caseflow_core::PortalResult;
use caseflow_core::PortalSubmission;
use caseflow_core::PortalWorkerPort;
use caseflow_core::SendReceipt;
use caseflow_core::TransportError;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::Deserialize;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Configuration shared by every HTTP-backed collaborator adapter.
///
/// # Invariants
/// - `timeout_ms` applies to the full request lifecycle, including
///   connection setup.
/// - `max_response_bytes` is enforced as a hard upper bound via
///   [`reqwest::blocking::RequestBuilder::timeout`] plus explicit length
///   checks on the decoded response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpProviderConfig {
    /// Base URL of the collaborator's HTTP API, e.g. `http://localhost:9101`.
    pub base_url: String,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Maximum response body size, in bytes.
    pub max_response_bytes: usize,
}

impl Default for HttpProviderConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            timeout_ms: 10_000,
            max_response_bytes: 1024 * 1024,
        }
    }
}

/// Builds a blocking client from a [`HttpProviderConfig`].
///
/// # Errors
/// Returns a descriptive error string when the client cannot be built.
fn build_client(config: &HttpProviderConfig) -> Result<Client, String> {
    Client::builder()
        .timeout(Duration::from_millis(config.timeout_ms))
        .user_agent("caseflow-providers/0.1")
        .build()
        .map_err(|err| format!("http client build failed: {err}"))
}

/// Posts `body` to `path` under the configured base URL and decodes a JSON
/// response of type `R`.
fn post_json<B: serde::Serialize, R: for<'de> Deserialize<'de>>(
    client: &Client,
    config: &HttpProviderConfig,
    path: &str,
    body: &B,
) -> Result<R, TransportLikeError> {
    let url = format!("{}{path}", config.base_url.trim_end_matches('/'));
    let response = client
        .post(&url)
        .json(body)
        .send()
        .map_err(|err| TransportLikeError::Transient(format!("request to {url} failed: {err}")))?;
    let status = response.status();
    if status.is_server_error() || status == StatusCode::REQUEST_TIMEOUT {
        return Err(TransportLikeError::Transient(format!("{url} returned {status}")));
    }
    if !status.is_success() {
        return Err(TransportLikeError::Permanent(format!("{url} returned {status}")));
    }
    let bytes = response
        .bytes()
        .map_err(|err| TransportLikeError::Transient(format!("reading response from {url}: {err}")))?;
    if bytes.len() > config.max_response_bytes {
        return Err(TransportLikeError::Permanent(format!(
            "{url} response exceeds {} bytes",
            config.max_response_bytes
        )));
    }
    serde_json::from_slice(&bytes)
        .map_err(|err| TransportLikeError::Permanent(format!("decoding response from {url}: {err}")))
}

/// Internal classification of a failed HTTP call, mapped to each port's
/// own error enum at the call site.
enum TransportLikeError {
    Transient(String),
    Permanent(String),
}

impl From<TransportLikeError> for TransportError {
    fn from(err: TransportLikeError) -> Self {
        match err {
            TransportLikeError::Transient(message) => Self::Transient(message),
            TransportLikeError::Permanent(message) => Self::Permanent(message),
        }
    }
}

impl From<TransportLikeError> for AiCollaboratorError {
    fn from(err: TransportLikeError) -> Self {
        match err {
            TransportLikeError::Transient(message) | TransportLikeError::Permanent(message) => {
                Self::Failed(message)
            }
        }
    }
}

// ============================================================================
// SECTION: Classifier
// ============================================================================

/// HTTP-backed [`ClassifierPort`].
pub struct HttpClassifierPort {
    config: HttpProviderConfig,
    client: Client,
}

impl HttpClassifierPort {
    /// Creates a new classifier adapter.
    ///
    /// # Errors
    /// Returns [`AiCollaboratorError::Failed`] when the HTTP client cannot
    /// be built.
    pub fn new(config: HttpProviderConfig) -> Result<Self, AiCollaboratorError> {
        let client = build_client(&config).map_err(AiCollaboratorError::Failed)?;
        Ok(Self { config, client })
    }
}

impl ClassifierPort for HttpClassifierPort {
    fn classify(&self, request: &ClassifyRequest) -> Result<Analysis, AiCollaboratorError> {
        post_json(&self.client, &self.config, "/classify", request).map_err(Into::into)
    }
}

// ============================================================================
// SECTION: Draft
// ============================================================================

/// HTTP-backed [`DraftPort`].
pub struct HttpDraftPort {
    config: HttpProviderConfig,
    client: Client,
}

impl HttpDraftPort {
    /// Creates a new draft adapter.
    ///
    /// # Errors
    /// Returns [`AiCollaboratorError::Failed`] when the HTTP client cannot
    /// be built.
    pub fn new(config: HttpProviderConfig) -> Result<Self, AiCollaboratorError> {
        let client = build_client(&config).map_err(AiCollaboratorError::Failed)?;
        Ok(Self { config, client })
    }
}

impl DraftPort for HttpDraftPort {
    fn draft(&self, request: &DraftRequest) -> Result<Draft, AiCollaboratorError> {
        post_json(&self.client, &self.config, "/draft", request).map_err(Into::into)
    }
}

// ============================================================================
// SECTION: Email transport
// ============================================================================

/// HTTP-backed [`EmailTransportPort`].
pub struct HttpEmailTransportPort {
    config: HttpProviderConfig,
    client: Client,
}

impl HttpEmailTransportPort {
    /// Creates a new email transport adapter.
    ///
    /// # Errors
    /// Returns [`TransportError::Permanent`] when the HTTP client cannot be
    /// built.
    pub fn new(config: HttpProviderConfig) -> Result<Self, TransportError> {
        let client = build_client(&config).map_err(TransportError::Permanent)?;
        Ok(Self { config, client })
    }
}

impl EmailTransportPort for HttpEmailTransportPort {
    fn send(&self, email: &OutboundEmail) -> Result<SendReceipt, TransportError> {
        post_json(&self.client, &self.config, "/send", email).map_err(Into::into)
    }
}

// ============================================================================
// SECTION: Portal worker
// ============================================================================

/// HTTP-backed [`PortalWorkerPort`].
pub struct HttpPortalWorkerPort {
    config: HttpProviderConfig,
    client: Client,
}

impl HttpPortalWorkerPort {
    /// Creates a new portal worker adapter.
    ///
    /// # Errors
    /// Returns [`TransportError::Permanent`] when the HTTP client cannot be
    /// built.
    pub fn new(config: HttpProviderConfig) -> Result<Self, TransportError> {
        let client = build_client(&config).map_err(TransportError::Permanent)?;
        Ok(Self { config, client })
    }
}

impl PortalWorkerPort for HttpPortalWorkerPort {
    fn submit(&self, submission: &PortalSubmission) -> Result<PortalResult, TransportError> {
        post_json(&self.client, &self.config, "/submit", submission).map_err(Into::into)
    }
}
