// crates/caseflow-providers/src/registry.rs
// ============================================================================
// Module: Collaborator Registry
// Description: Builds the four collaborator ports (classifier, draft, email,
//              portal) from configuration, choosing the deterministic stub
//              or the HTTP-backed adapter per endpoint.
// Purpose: Give the orchestration engine one place to wire collaborators
//          without hard-coding which backend a deployment uses.
// Dependencies: caseflow-core, caseflow-config
// ============================================================================

//! ## Overview
//! Each collaborator endpoint in [`caseflow_config::ProvidersConfig`] names
//! whether to use the deterministic in-memory stub or a real HTTP adapter.
//! [`CollaboratorSet`] resolves that choice once at startup and hands the
//! engine boxed trait objects behind each port.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use caseflow_config::ProviderEndpoint;
use caseflow_config::ProvidersConfig;
use caseflow_core::ClassifierPort;
use caseflow_core::DraftPort;
use caseflow_core::EmailTransportPort;
use caseflow_core::PortalWorkerPort;
use caseflow_core::TransportError;

use crate::http::HttpClassifierPort;
use crate::http::HttpDraftPort;
use crate::http::HttpEmailTransportPort;
use crate::http::HttpPortalWorkerPort;
use crate::http::HttpProviderConfig;
use crate::stub::StubClassifierPort;
use crate::stub::StubDraftPort;
use crate::stub::StubEmailTransportPort;
use crate::stub::StubPortalWorkerPort;

// ============================================================================
// SECTION: Collaborator Set
// ============================================================================

/// The four collaborator ports the orchestration engine depends on, wired
/// from configuration at startup.
///
/// # Invariants
/// - Each port is either the deterministic stub or the HTTP adapter for the
///   matching endpoint; there is no third backend.
pub struct CollaboratorSet {
    /// Resolved classifier port.
    pub classifier: Arc<dyn ClassifierPort + Send + Sync>,
    /// Resolved draft-generator port.
    pub draft: Arc<dyn DraftPort + Send + Sync>,
    /// Resolved email transport port.
    pub email: Arc<dyn EmailTransportPort + Send + Sync>,
    /// Resolved portal worker port.
    pub portal: Arc<dyn PortalWorkerPort + Send + Sync>,
}

impl CollaboratorSet {
    /// Builds a [`CollaboratorSet`] from resolved configuration.
    ///
    /// # Errors
    /// Returns [`TransportError::Permanent`] when an HTTP-backed adapter's
    /// underlying client cannot be constructed.
    pub fn from_config(config: &ProvidersConfig) -> Result<Self, TransportError> {
        let classifier: Arc<dyn ClassifierPort + Send + Sync> = if config.classifier.use_stub {
            Arc::new(StubClassifierPort)
        } else {
            Arc::new(
                HttpClassifierPort::new(endpoint_config(&config.classifier))
                    .map_err(|err| TransportError::Permanent(err.to_string()))?,
            )
        };
        let draft: Arc<dyn DraftPort + Send + Sync> = if config.draft.use_stub {
            Arc::new(StubDraftPort)
        } else {
            Arc::new(
                HttpDraftPort::new(endpoint_config(&config.draft))
                    .map_err(|err| TransportError::Permanent(err.to_string()))?,
            )
        };
        let email: Arc<dyn EmailTransportPort + Send + Sync> = if config.email.use_stub {
            Arc::new(StubEmailTransportPort::default())
        } else {
            Arc::new(HttpEmailTransportPort::new(endpoint_config(&config.email))?)
        };
        let portal: Arc<dyn PortalWorkerPort + Send + Sync> = if config.portal.use_stub {
            Arc::new(StubPortalWorkerPort::default())
        } else {
            Arc::new(HttpPortalWorkerPort::new(endpoint_config(&config.portal))?)
        };
        Ok(Self {
            classifier,
            draft,
            email,
            portal,
        })
    }
}

/// Converts a configured endpoint into an [`HttpProviderConfig`].
fn endpoint_config(endpoint: &ProviderEndpoint) -> HttpProviderConfig {
    HttpProviderConfig {
        base_url: endpoint.base_url.clone(),
        timeout_ms: endpoint.timeout_millis,
        max_response_bytes: 1024 * 1024,
    }
}
