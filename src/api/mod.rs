//! HTTP surface: health, chain status and voter registration.

use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::error::LedgerError;
use crate::ledger::{ChainService, ChainStatus, ChainVerification, SqliteLedgerStore};
use crate::registration::{Registration, RegistrationRequest, VoterRegistry};

#[derive(Clone)]
pub struct AppState {
    pub chain: ChainService<SqliteLedgerStore>,
    pub registry: Arc<VoterRegistry<SqliteLedgerStore>>,
}

impl AppState {
    pub fn new(chain: ChainService<SqliteLedgerStore>) -> Self {
        let pool = chain.store().pool().clone();
        let registry = Arc::new(VoterRegistry::new(pool, chain.clone()));
        Self { chain, registry }
    }
}

type ApiError = (StatusCode, Json<Value>);

fn error_response(err: LedgerError) -> ApiError {
    let status = match &err {
        LedgerError::ValidationError(_) => StatusCode::BAD_REQUEST,
        LedgerError::AppendConflict { .. } => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        error!("Request failed: {}", err);
    }
    (status, Json(json!({ "error": err.to_string() })))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/chain_status", get(chain_status))
        .route("/api/chain/verify", get(chain_verify))
        .route("/api/register", post(register))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .into_inner(),
        )
        .with_state(state)
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "voter-ledger",
        "timestamp": chrono::Utc::now()
    }))
}

async fn chain_status(State(state): State<AppState>) -> Result<Json<ChainStatus>, ApiError> {
    state.chain.status().await.map(Json).map_err(error_response)
}

async fn chain_verify(
    State(state): State<AppState>,
) -> Result<Json<ChainVerification>, ApiError> {
    state
        .chain
        .verify_detailed()
        .await
        .map(Json)
        .map_err(error_response)
}

async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegistrationRequest>,
) -> Result<(StatusCode, Json<Registration>), ApiError> {
    let registration = state
        .registry
        .register(&request)
        .await
        .map_err(error_response)?;
    Ok((StatusCode::CREATED, Json(registration)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (
                LedgerError::invalid_field("phone", "10 digits"),
                StatusCode::BAD_REQUEST,
            ),
            (
                LedgerError::AppendConflict { attempts: 5 },
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                LedgerError::UninitializedChain,
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                LedgerError::DatabaseError("disk I/O error".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            let message = err.to_string();
            let (status, Json(body)) = error_response(err);
            assert_eq!(status, expected);
            assert_eq!(body["error"], message);
        }
    }
}
