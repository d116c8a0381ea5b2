//! axum router and handlers.
//!
//! Handlers stay thin: extract, enforce the per-request deadline and the
//! bearer gate, call the service layer, pick the status code.

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::trace::TraceLayer;

use gavel_contracts::{Decision, GavelError};

use crate::dto::{ExecuteRequest, ProposeRequest, ResolveRequest};
use crate::error::{ErrorResponse, GatewayError, GatewayResult};
use crate::service;
use crate::state::AppState;

/// Build the gateway router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/propose", post(propose))
        .route("/execute", post(execute))
        .route("/approve", post(approve))
        .route("/deny", post(deny))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Response {
    let deadline = state.config.health_deadline;
    let result = tokio::time::timeout(deadline, async { service::health(&state) }).await;

    match result {
        Err(_) => GatewayError::DeadlineExceeded.into_response(),
        Ok(Err(e)) => {
            // A ledger that cannot even be read is an unavailable service.
            let message = match &e {
                GatewayError::Core(inner) => inner.to_string(),
                _ => "health check failed".to_string(),
            };
            let body = ErrorResponse {
                error: message,
                code: "INTERNAL".to_string(),
                violations: vec![],
            };
            (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response()
        }
        Ok(Ok(body)) => {
            let (status, integrity) = if body.chain.chain_valid {
                (StatusCode::OK, "ok")
            } else {
                (StatusCode::INTERNAL_SERVER_ERROR, "broken")
            };
            ([("x-chain-integrity", integrity)], (status, Json(body))).into_response()
        }
    }
}

async fn propose(
    State(state): State<AppState>,
    Json(request): Json<ProposeRequest>,
) -> Response {
    let deadline = state.config.propose_deadline;
    let result = tokio::time::timeout(deadline, service::propose(&state, &request)).await;

    match result {
        Err(_) => GatewayError::DeadlineExceeded.into_response(),
        Ok(Err(e)) => e.into_response(),
        Ok(Ok(body)) => {
            let status = match body.decision {
                Decision::Approved => StatusCode::OK,
                Decision::Escalated => StatusCode::ACCEPTED,
                Decision::Denied => StatusCode::FORBIDDEN,
            };
            (status, Json(body)).into_response()
        }
    }
}

async fn execute(
    State(state): State<AppState>,
    Json(request): Json<ExecuteRequest>,
) -> Response {
    // The sandbox enforces its own wall-clock kill; the request deadline
    // only has to cover that plus orchestration overhead.
    let deadline =
        std::time::Duration::from_secs(state.config.blastbox.timeout_seconds.saturating_add(60));
    let result = tokio::time::timeout(deadline, service::execute(&state, request.proposal_id)).await;

    match result {
        Err(_) => GatewayError::DeadlineExceeded.into_response(),
        Ok(Ok(body)) => (StatusCode::OK, Json(body)).into_response(),
        Ok(Err(e)) => e.into_response(),
    }
}

async fn approve(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ResolveRequest>,
) -> Response {
    if let Err(e) = check_bearer(&state, &headers) {
        return e.into_response();
    }
    match service::approve(&state, &request) {
        Ok(body) => (StatusCode::OK, Json(body)).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn deny(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ResolveRequest>,
) -> Response {
    if let Err(e) = check_bearer(&state, &headers) {
        return e.into_response();
    }
    match service::deny(&state, &request) {
        Ok(body) => (StatusCode::OK, Json(body)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Extract and verify `Authorization: Bearer <HUMAN_API_KEY>`.
fn check_bearer(state: &AppState, headers: &HeaderMap) -> GatewayResult<()> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| GavelError::Unauthenticated {
            reason: "missing bearer token".to_string(),
        })?;
    state.auth.verify(token)?;
    Ok(())
}
