#![forbid(unsafe_code)]

use std::{
    env,
    net::SocketAddr,
    sync::{Arc, Mutex},
};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use meridian_adapter::{
    AdapterError, AdapterErrorBody, AdapterRuntime, DecideAdapterRequest, GateCheckAdapterRequest,
    ReplayCompleteAdapterRequest, ReplayInitiateAdapterRequest, SealEnvelopeAdapterRequest,
};
use meridian_contracts::codes::AuthorityCode;

type SharedRuntime = Arc<Mutex<AdapterRuntime>>;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let bind = env::var("MERIDIAN_HTTP_BIND").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
    let addr: SocketAddr = bind.parse()?;
    let seed_demo = parse_seed_demo_from_env();

    let mut runtime = AdapterRuntime::mvp_v1()?;
    if seed_demo {
        runtime.seed_demo_control_plane()?;
    }
    let runtime: SharedRuntime = Arc::new(Mutex::new(runtime));

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/resolve-persona", get(resolve_persona))
        .route("/resolve-territory", get(resolve_territory))
        .route("/envelope", post(seal_envelope))
        .route("/verify-envelope", get(verify_envelope))
        .route("/verify-envelope/content", get(envelope_content))
        .route("/runtime-gate/check", post(gate_check))
        .route("/decision", post(decide))
        .route("/replay", post(replay_initiate))
        .route("/replay/:replay_id/complete", post(replay_complete))
        .with_state(runtime);

    println!("meridian_adapter_http listening on http://{addr} (seed_demo={seed_demo})");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn parse_seed_demo_from_env() -> bool {
    match env::var("MERIDIAN_SEED_DEMO") {
        Ok(v) => !matches!(
            v.trim().to_ascii_lowercase().as_str(),
            "0" | "false" | "off" | "no"
        ),
        Err(_) => true,
    }
}

/// Maps the authority vocabulary onto HTTP status classes: resolution misses
/// are 404, lifecycle dead-ends 410, integrity conflicts 409, malformed
/// requests 400.
fn status_for(code: Option<AuthorityCode>) -> StatusCode {
    let Some(code) = code else {
        return StatusCode::BAD_REQUEST;
    };
    match code {
        AuthorityCode::PersonaNotResolved
        | AuthorityCode::SubVerticalNotFound
        | AuthorityCode::TerritoryNotConfigured
        | AuthorityCode::PolicyNotFound
        | AuthorityCode::ReplayNotFound
        | AuthorityCode::EnvelopeNotSealed
        | AuthorityCode::EnvelopeNotFound => StatusCode::NOT_FOUND,
        AuthorityCode::SubVerticalInactive
        | AuthorityCode::EnvelopeExpired
        | AuthorityCode::EnvelopeRevoked
        | AuthorityCode::ExpiredEnvelope
        | AuthorityCode::RevokedEnvelope => StatusCode::GONE,
        AuthorityCode::MultipleActivePolicies
        | AuthorityCode::ReplayDriftDetected
        | AuthorityCode::TerritoryInvalidForSubvertical => StatusCode::CONFLICT,
        _ => StatusCode::BAD_REQUEST,
    }
}

fn error_reply(err: &AdapterError) -> (StatusCode, Json<serde_json::Value>) {
    let body = AdapterErrorBody::from(err);
    (
        status_for(err.authority_code),
        Json(serde_json::json!(body)),
    )
}

fn lock_poisoned() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({
            "status": "error",
            "message": "adapter runtime lock poisoned",
        })),
    )
}

fn reply<T: serde::Serialize>(
    result: Result<T, AdapterError>,
) -> (StatusCode, Json<serde_json::Value>) {
    match result {
        Ok(body) => (StatusCode::OK, Json(serde_json::json!(body))),
        Err(err) => error_reply(&err),
    }
}

async fn healthz(State(runtime): State<SharedRuntime>) -> (StatusCode, Json<serde_json::Value>) {
    let Ok(runtime) = runtime.lock() else {
        return lock_poisoned();
    };
    (
        StatusCode::OK,
        Json(serde_json::json!(runtime.health_report())),
    )
}

#[derive(serde::Deserialize)]
struct ResolvePersonaQuery {
    sub_vertical: String,
    region: Option<String>,
}

async fn resolve_persona(
    State(runtime): State<SharedRuntime>,
    Query(query): Query<ResolvePersonaQuery>,
) -> (StatusCode, Json<serde_json::Value>) {
    let Ok(runtime) = runtime.lock() else {
        return lock_poisoned();
    };
    reply(runtime.resolve_persona(&query.sub_vertical, query.region.as_deref()))
}

#[derive(serde::Deserialize)]
struct ResolveTerritoryQuery {
    region_code: String,
    sub_vertical: Option<String>,
}

async fn resolve_territory(
    State(runtime): State<SharedRuntime>,
    Query(query): Query<ResolveTerritoryQuery>,
) -> (StatusCode, Json<serde_json::Value>) {
    let Ok(runtime) = runtime.lock() else {
        return lock_poisoned();
    };
    reply(runtime.resolve_territory(&query.region_code, query.sub_vertical.as_deref()))
}

async fn seal_envelope(
    State(runtime): State<SharedRuntime>,
    Json(request): Json<SealEnvelopeAdapterRequest>,
) -> (StatusCode, Json<serde_json::Value>) {
    let Ok(mut runtime) = runtime.lock() else {
        return lock_poisoned();
    };
    reply(runtime.seal_envelope(request))
}

#[derive(serde::Deserialize)]
struct VerifyEnvelopeQuery {
    envelope_id: Option<String>,
    sha256_hash: Option<String>,
}

async fn verify_envelope(
    State(runtime): State<SharedRuntime>,
    Query(query): Query<VerifyEnvelopeQuery>,
) -> (StatusCode, Json<serde_json::Value>) {
    let Ok(runtime) = runtime.lock() else {
        return lock_poisoned();
    };
    reply(runtime.verify_envelope(query.envelope_id.as_deref(), query.sha256_hash.as_deref()))
}

#[derive(serde::Deserialize)]
struct EnvelopeContentQuery {
    envelope_id: String,
}

async fn envelope_content(
    State(runtime): State<SharedRuntime>,
    Query(query): Query<EnvelopeContentQuery>,
) -> (StatusCode, Json<serde_json::Value>) {
    let Ok(runtime) = runtime.lock() else {
        return lock_poisoned();
    };
    reply(runtime.envelope_content(&query.envelope_id))
}

async fn gate_check(
    State(runtime): State<SharedRuntime>,
    Json(request): Json<GateCheckAdapterRequest>,
) -> (StatusCode, Json<serde_json::Value>) {
    let Ok(mut runtime) = runtime.lock() else {
        return lock_poisoned();
    };
    match runtime.gate_check(request) {
        Ok(decision) => {
            // A mandatory-source rejection surfaces as 403; advisory callers
            // get the verdict with 200 and decide for themselves.
            let status = if !decision.gate_passed && decision.enforcement == "MANDATORY" {
                StatusCode::FORBIDDEN
            } else {
                StatusCode::OK
            };
            (status, Json(serde_json::json!(decision)))
        }
        Err(err) => error_reply(&err),
    }
}

async fn replay_initiate(
    State(runtime): State<SharedRuntime>,
    Json(request): Json<ReplayInitiateAdapterRequest>,
) -> (StatusCode, Json<serde_json::Value>) {
    let Ok(mut runtime) = runtime.lock() else {
        return lock_poisoned();
    };
    reply(runtime.replay_initiate(request))
}

async fn replay_complete(
    State(runtime): State<SharedRuntime>,
    Path(replay_id): Path<String>,
    Json(request): Json<ReplayCompleteAdapterRequest>,
) -> (StatusCode, Json<serde_json::Value>) {
    let Ok(mut runtime) = runtime.lock() else {
        return lock_poisoned();
    };
    reply(runtime.replay_complete(&replay_id, request))
}

async fn decide(
    State(runtime): State<SharedRuntime>,
    Json(request): Json<DecideAdapterRequest>,
) -> (StatusCode, Json<serde_json::Value>) {
    let Ok(runtime) = runtime.lock() else {
        return lock_poisoned();
    };
    reply(runtime.decide(request))
}
