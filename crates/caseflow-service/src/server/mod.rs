// crates/caseflow-service/src/server/mod.rs
// ============================================================================
// Module: HTTP/SSE Shell
// Description: The minimal REST boundary spec §6 exposes externally:
//              decision resolution, case reset, inbound re-trigger, and an
//              SSE notification stream.
// Purpose: The only async code in this crate. Every handler hands its work
//          to `spawn_blocking` and calls straight into the synchronous
//          engine; nothing here holds a case lock or touches the store
//          directly.
// Dependencies: caseflow-core, axum, tokio, tokio-stream
// ============================================================================

//! ## Overview
//! [`router`] wires the four endpoints spec §6 names onto one
//! [`axum::Router`] over a [`ServerState`]. Handlers never panic on bad
//! input: a malformed body or an unknown id becomes a 400/404 response, not
//! a 500. [`sse_events`] fans out [`caseflow_broker::sink::channel::NotificationEvent`]s
//! from the shared [`caseflow_broker::ChannelSink`] to one subscriber per
//! connected client.

use std::convert::Infallible;
use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::Path;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Sse;
use axum::response::sse::Event;
use axum::routing::get;
use axum::routing::post;
use caseflow_broker::ChannelSink;
use caseflow_core::CaseId;
use caseflow_core::CaseflowError;
use caseflow_core::DispatcherPort;
use caseflow_core::GateOption;
use caseflow_core::MessageId;
use caseflow_core::ProposalId;
use serde::Deserialize;
use serde::Serialize;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;

use crate::engine;
use crate::engine::transition::store_err;
use crate::engine::EngineContext;
use crate::engine::HumanResolutionRequest;
use crate::engine::InProcessDispatcher;

/// Everything a handler needs: the engine context, the dispatcher it
/// triggers follow-up work through, and the notification sink SSE clients
/// subscribe to.
#[derive(Clone)]
pub struct ServerState {
    /// Shared engine dependencies.
    pub context: EngineContext,
    /// The running dispatcher, for endpoints that trigger further work.
    pub dispatcher: Arc<InProcessDispatcher>,
    /// Notification fanout SSE clients subscribe to.
    pub notifications: Arc<ChannelSink>,
}

/// Builds the router for spec §6's four endpoints.
#[must_use]
pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/decisions/{proposal_id}", post(post_decision))
        .route("/cases/{case_id}/reset-to-last-inbound", post(post_reset))
        .route("/cases/{case_id}/trigger-inbound/{message_id}", post(post_trigger_inbound))
        .route("/events", get(sse_events))
        .with_state(state)
}

/// Maps a [`CaseflowError`] to the HTTP status spec §7 assigns its kind.
fn error_status(err: &CaseflowError) -> StatusCode {
    match err {
        CaseflowError::Validation(_) => StatusCode::BAD_REQUEST,
        CaseflowError::NotFound(_) => StatusCode::NOT_FOUND,
        CaseflowError::Conflict(_) => StatusCode::CONFLICT,
        CaseflowError::Transient(_) => StatusCode::SERVICE_UNAVAILABLE,
        CaseflowError::Permanent(_) | CaseflowError::PartialSideEffect(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

fn error_response(err: CaseflowError) -> (StatusCode, Json<ErrorBody>) {
    (error_status(&err), Json(ErrorBody { error: err.to_string() }))
}

// ============================================================================
// SECTION: POST /decisions/{proposal_id}
// ============================================================================

#[derive(Debug, Deserialize)]
struct DecisionBody {
    action: GateOption,
    instruction: Option<String>,
    reason: Option<String>,
    route_mode: Option<String>,
    user_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct RunAccepted {
    run_id: String,
}

async fn post_decision(
    State(state): State<ServerState>,
    Path(proposal_id): Path<String>,
    Json(body): Json<DecisionBody>,
) -> impl IntoResponse {
    let result = tokio::task::spawn_blocking(move || resolve_decision(&state, proposal_id, body))
        .await
        .unwrap_or_else(|join_err| Err(CaseflowError::Transient(join_err.to_string())));

    match result {
        Ok(run_id) => (StatusCode::ACCEPTED, Json(RunAccepted { run_id })).into_response(),
        Err(err) => error_response(err).into_response(),
    }
}

fn resolve_decision(state: &ServerState, proposal_id: String, body: DecisionBody) -> Result<String, CaseflowError> {
    let proposal_id = ProposalId::new(proposal_id);
    let mut proposal = state.context.store.get_proposal(&proposal_id).map_err(store_err)?;

    let request = HumanResolutionRequest {
        action: body.action,
        instruction: body.instruction,
        reason: body.reason,
        route_mode: body.route_mode,
        user_id: body.user_id,
    };
    engine::resolve_human_decision(&state.context, &mut proposal, request)?;

    let run_id = engine::dispatch_resume(&state.context, state.dispatcher.as_ref(), &proposal)?;
    Ok(run_id.as_str().to_string())
}

// ============================================================================
// SECTION: POST /cases/{case_id}/reset-to-last-inbound
// ============================================================================

async fn post_reset(State(state): State<ServerState>, Path(case_id): Path<String>) -> impl IntoResponse {
    let result = tokio::task::spawn_blocking(move || {
        let case_id = CaseId::new(case_id);
        engine::reset_to_last_inbound(&state.context, state.dispatcher.as_ref(), &case_id)
    })
    .await
    .unwrap_or_else(|join_err| Err(CaseflowError::Transient(join_err.to_string())));

    match result {
        Ok(run_id) => (StatusCode::ACCEPTED, Json(RunAccepted { run_id: run_id.as_str().to_string() })).into_response(),
        Err(err) => error_response(err).into_response(),
    }
}

// ============================================================================
// SECTION: POST /cases/{case_id}/trigger-inbound/{message_id}
// ============================================================================

#[derive(Debug, Default, Deserialize)]
struct TriggerInboundBody {
    #[serde(default)]
    force_new_run: bool,
}

async fn post_trigger_inbound(
    State(state): State<ServerState>,
    Path((case_id, message_id)): Path<(String, String)>,
    body: Option<Json<TriggerInboundBody>>,
) -> impl IntoResponse {
    let force_new_run = body.map(|Json(b)| b.force_new_run).unwrap_or_default();
    let result = tokio::task::spawn_blocking(move || {
        trigger_inbound(&state, CaseId::new(case_id), MessageId::new(message_id), force_new_run)
    })
    .await
    .unwrap_or_else(|join_err| Err(CaseflowError::Transient(join_err.to_string())));

    match result {
        Ok(run_id) => (StatusCode::ACCEPTED, Json(RunAccepted { run_id })).into_response(),
        Err(err) => error_response(err).into_response(),
    }
}

fn trigger_inbound(
    state: &ServerState,
    case_id: CaseId,
    message_id: MessageId,
    force_new_run: bool,
) -> Result<String, CaseflowError> {
    let message = state.context.store.get_message(&message_id).map_err(store_err)?;
    if message.case_id.as_ref() != Some(&case_id) {
        return Err(CaseflowError::NotFound(format!("message {message_id} does not belong to case {case_id}")));
    }

    let opts = caseflow_core::TriggerOptions {
        queue: format!("case:{case_id}"),
        idempotency_key: crate::engine::clock::generate_token("trigger-inbound"),
        idempotency_key_ttl_millis: state.context.config.timeouts.idempotency_key_ttl_millis,
        debounce: None,
    };
    let handle = state
        .dispatcher
        .trigger(
            "process_inbound",
            serde_json::json!({ "message_id": message_id.as_str(), "force_new_run": force_new_run }),
            opts,
        )
        .map_err(|err| CaseflowError::Transient(err.to_string()))?;
    Ok(handle.run_id.as_str().to_string())
}

// ============================================================================
// SECTION: GET /events (SSE)
// ============================================================================

async fn sse_events(State(state): State<ServerState>) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let receiver = state.notifications.subscribe();
    let stream = BroadcastStream::new(receiver).filter_map(|item| {
        let event = item.ok()?;
        let payload = serde_json::to_string(&NotificationPayload::from(&event)).ok()?;
        Some(Ok(Event::default().data(payload)))
    });
    Sse::new(stream)
}

#[derive(Debug, Serialize)]
struct NotificationPayload {
    kind: String,
    message: String,
    case_id: Option<String>,
}

impl From<&caseflow_broker::sink::channel::NotificationEvent> for NotificationPayload {
    fn from(event: &caseflow_broker::sink::channel::NotificationEvent) -> Self {
        Self {
            kind: format!("{:?}", event.kind),
            message: event.message.clone(),
            case_id: event.case_id.as_ref().map(ToString::to_string),
        }
    }
}
