// crates/caseflow-contract/src/tooling.rs
// ============================================================================
// Module: Contract Generation
// Description: Builds the action contract list, proposal status lexicon,
//              and HTTP endpoint contracts from caseflow-core's types.
// Purpose: Keep the generated JSON Schema and markdown docs a pure function
//          of the domain model, so the contract can never drift from the
//          types caseflow-service actually uses.
// Dependencies: caseflow-core
// ============================================================================

//! ## Overview
//! [`action_contracts`], [`proposal_status_contracts`], and
//! [`endpoint_contracts`] are pure functions returning the same data every
//! call: no file I/O, no clock reads. [`tooling_markdown`] renders a
//! human-readable summary of the same data for the generated docs bundle.

use caseflow_core::ActionType;
use caseflow_core::ProposalStatus;
use serde_json::Value;
use serde_json::json;

use crate::types::ActionContract;
use crate::types::ActionExample;
use crate::types::EndpointContract;
use crate::types::HttpMethod;
use crate::types::ProposalStatusContract;

/// Returns the closed list of [`ActionContract`]s, one per
/// [`ActionType`] that produces a drafted message, plus the two purely
/// administrative actions that don't.
#[must_use]
pub fn action_contracts() -> Vec<ActionContract> {
    let mut contracts = vec![
        action_contract(ActionType::SendInitialRequest, "Send the initial records request to the agency."),
        action_contract(ActionType::SendFollowup, "Send a status-check followup after the statutory deadline passed with no response."),
        action_contract(ActionType::SendClarification, "Respond to the agency's request for scope clarification."),
        action_contract(ActionType::SendRebuttal, "Rebut a denial, citing the applicable exemption and requested release."),
        action_contract(ActionType::SendAppeal, "File an administrative appeal of a denial or partial denial."),
        action_contract(ActionType::RespondPartialApproval, "Acknowledge a partial approval and request the remaining withheld records."),
        action_contract(ActionType::AcceptFee, "Accept a quoted fee and authorize payment."),
        action_contract(ActionType::NegotiateFee, "Propose a narrowed scope to reduce a quoted fee."),
        action_contract(ActionType::DeclineFee, "Decline a quoted fee and withdraw or narrow the request."),
        action_contract(ActionType::SendFeeWaiverRequest, "Request a public-interest fee waiver."),
        action_contract(ActionType::Escalate, "Escalate to a supervisor or records officer after repeated non-response."),
        action_contract(ActionType::ResearchAgency, "Research the agency's preferred submission channel or contact."),
        action_contract(ActionType::ReformulateRequest, "Reformulate the request language in response to agency feedback."),
        action_contract(ActionType::SubmitPortal, "Submit the request through the agency's online portal."),
        action_contract(ActionType::SendPdfEmail, "Send a PDF copy of the request by email."),
        action_contract(ActionType::SendStatusUpdate, "Send a status update to the requester."),
    ];
    contracts.push(administrative_action_contract(
        ActionType::CloseCase,
        "Close the case with a recorded outcome; produces no outbound content.",
    ));
    contracts.push(administrative_action_contract(
        ActionType::Withdraw,
        "Withdraw the request; produces no outbound content unless the agency requires written notice.",
    ));
    contracts
}

fn action_contract(action_type: ActionType, description: &str) -> ActionContract {
    ActionContract {
        action_type,
        description: description.to_string(),
        input_schema: draft_request_schema(),
        output_schema: draft_response_schema(),
        produces_outbound_content: true,
        examples: vec![ActionExample {
            description: "minimal request carrying only the case snapshot".to_string(),
            input: json!({ "case": { "id": "case-example" }, "action_type": format!("{action_type:?}") }),
            output: json!({
                "subject": "Re: Public records request",
                "body_text": "...",
                "body_html": "<p>...</p>",
            }),
        }],
    }
}

fn administrative_action_contract(action_type: ActionType, description: &str) -> ActionContract {
    ActionContract {
        action_type,
        description: description.to_string(),
        input_schema: draft_request_schema(),
        output_schema: json!({ "type": "null" }),
        produces_outbound_content: false,
        examples: Vec::new(),
    }
}

fn draft_request_schema() -> Value {
    json!({
        "type": "object",
        "required": ["case", "action_type"],
        "properties": {
            "case": { "type": "object" },
            "analysis": { "type": ["object", "null"] },
            "action_type": { "type": "string" },
            "instruction": { "type": ["string", "null"] },
        },
        "additionalProperties": false,
    })
}

fn draft_response_schema() -> Value {
    json!({
        "type": "object",
        "required": ["subject", "body_text", "body_html"],
        "properties": {
            "subject": { "type": "string", "minLength": 1 },
            "body_text": { "type": "string", "minLength": 1 },
            "body_html": { "type": "string", "minLength": 1 },
        },
        "additionalProperties": false,
    })
}

/// Returns the closed [`ProposalStatus`] lexicon with each status's legal
/// predecessors, mirroring the forward-only invariant `caseflow-service`
/// enforces at the store boundary.
#[must_use]
pub fn proposal_status_contracts() -> Vec<ProposalStatusContract> {
    use ProposalStatus::AdjustmentRequested as Adjusted;
    use ProposalStatus::Approved;
    use ProposalStatus::Blocked;
    use ProposalStatus::DecisionReceived;
    use ProposalStatus::Dismissed;
    use ProposalStatus::Executed;
    use ProposalStatus::Executing;
    use ProposalStatus::PendingApproval;
    use ProposalStatus::PendingPortal;
    use ProposalStatus::Withdrawn;

    vec![
        status_contract(PendingApproval, "Awaiting a decisioner routing decision.", &[], false),
        status_contract(
            Blocked,
            "Blocked behind another pending proposal for the same case (invariant #1).",
            &[PendingApproval],
            false,
        ),
        status_contract(
            DecisionReceived,
            "A human decision arrived and is queued for resolution.",
            &[PendingApproval, Blocked],
            false,
        ),
        status_contract(
            Approved,
            "Approved for execution, by policy or by a human decision.",
            &[PendingApproval, Blocked, DecisionReceived, Adjusted],
            false,
        ),
        status_contract(
            Adjusted,
            "A human requested changes; awaiting a redraft and re-decision.",
            &[PendingApproval],
            false,
        ),
        status_contract(
            Executing,
            "Claimed by the executor via compare-and-set; a side effect is in flight.",
            &[Approved],
            false,
        ),
        status_contract(PendingPortal, "Executing via a durable portal submission task.", &[Executing], false),
        status_contract(Executed, "The side effect completed successfully.", &[Executing, PendingPortal], true),
        status_contract(
            Dismissed,
            "A human rejected the proposal without executing it.",
            &[PendingApproval, Blocked, DecisionReceived],
            true,
        ),
        status_contract(
            Withdrawn,
            "Superseded by a case reset or a newer proposal.",
            &[PendingApproval, Blocked, DecisionReceived, Approved],
            true,
        ),
    ]
}

fn status_contract(
    status: ProposalStatus,
    description: &str,
    predecessors: &[ProposalStatus],
    terminal: bool,
) -> ProposalStatusContract {
    ProposalStatusContract {
        status,
        description: description.to_string(),
        predecessors: predecessors.to_vec(),
        terminal,
    }
}

/// Returns the contract for the minimal HTTP/SSE surface (spec §6).
#[must_use]
pub fn endpoint_contracts() -> Vec<EndpointContract> {
    vec![
        EndpointContract {
            name: "ingest_message".to_string(),
            method: HttpMethod::Post,
            path_template: "/cases/{case_id}/messages".to_string(),
            path_params: vec!["case_id".to_string()],
            description: "Attach an inbound message to a case and trigger the inbound pipeline.".to_string(),
            request_schema: Some(json!({
                "type": "object",
                "required": ["direction", "body_text"],
                "properties": {
                    "direction": { "type": "string", "enum": ["inbound", "outbound"] },
                    "subject": { "type": ["string", "null"] },
                    "body_text": { "type": "string" },
                    "received_at": { "type": ["string", "null"], "format": "date-time" },
                },
            })),
            response_schema: json!({
                "type": "object",
                "required": ["message_id"],
                "properties": { "message_id": { "type": "string" } },
            }),
            is_event_stream: false,
        },
        EndpointContract {
            name: "resolve_decision".to_string(),
            method: HttpMethod::Post,
            path_template: "/proposals/{proposal_id}/decision".to_string(),
            path_params: vec!["proposal_id".to_string()],
            description: "Record a human decision on a proposal (approve, dismiss, adjust).".to_string(),
            request_schema: Some(json!({
                "type": "object",
                "required": ["kind"],
                "properties": {
                    "kind": { "type": "string", "enum": ["approve", "dismiss", "adjust"] },
                    "instruction": { "type": ["string", "null"] },
                    "decided_by": { "type": ["string", "null"] },
                },
            })),
            response_schema: json!({
                "type": "object",
                "required": ["proposal_id", "status"],
                "properties": {
                    "proposal_id": { "type": "string" },
                    "status": { "type": "string" },
                },
            }),
            is_event_stream: false,
        },
        EndpointContract {
            name: "get_case".to_string(),
            method: HttpMethod::Get,
            path_template: "/cases/{case_id}".to_string(),
            path_params: vec!["case_id".to_string()],
            description: "Fetch the current snapshot of a case.".to_string(),
            request_schema: None,
            response_schema: json!({ "type": "object" }),
            is_event_stream: false,
        },
        EndpointContract {
            name: "stream_activity".to_string(),
            method: HttpMethod::Get,
            path_template: "/cases/{case_id}/activity/stream".to_string(),
            path_params: vec!["case_id".to_string()],
            description: "Stream activity log entries for a case as Server-Sent Events.".to_string(),
            request_schema: None,
            response_schema: json!({
                "type": "object",
                "required": ["event_type", "description", "recorded_at"],
                "properties": {
                    "event_type": { "type": "string" },
                    "description": { "type": "string" },
                    "recorded_at": { "type": "string" },
                },
            }),
            is_event_stream: true,
        },
    ]
}

/// Renders a human-readable markdown summary of the action and status
/// contracts for the generated docs bundle.
#[must_use]
pub fn tooling_markdown(actions: &[ActionContract], statuses: &[ProposalStatusContract]) -> String {
    let mut out = String::from("# Caseflow contract\n\n## Actions\n\n");
    for action in actions {
        out.push_str(&format!("- `{:?}` — {}\n", action.action_type, action.description));
    }
    out.push_str("\n## Proposal statuses\n\n");
    for status in statuses {
        out.push_str(&format!(
            "- `{:?}`{} — {}\n",
            status.status,
            if status.terminal { " (terminal)" } else { "" },
            status.description
        ));
    }
    out
}
