//! REST API module for the registry backend
//!
//! Exposes the registry mutation endpoints and read-only views over the
//! live on-chain state. Error mapping: 404 when no registry UTxO exists,
//! 409 when contention retries are exhausted, 422 for authorization and
//! state-transition violations, 500 for infrastructure failures.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

use registry_common::{ClinicId, KeyHash};
use registry_engine::{datum, ClinicEntry, Coordinator, CoordinatorError, Operation};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<Coordinator>,
}

/// API error type
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": self.message
        });

        (self.status, Json(body)).into_response()
    }
}

impl From<CoordinatorError> for ApiError {
    fn from(err: CoordinatorError) -> Self {
        let status = match &err {
            CoordinatorError::NoRegistryFound { .. } => StatusCode::NOT_FOUND,
            CoordinatorError::ContentionExhausted { .. } => StatusCode::CONFLICT,
            CoordinatorError::Apply(_) | CoordinatorError::Auth(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        ApiError {
            status,
            message: err.to_string(),
        }
    }
}

/// Request to register a new clinic
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterClinicRequest {
    pub clinic_id: String,
    pub acting_identity: String,
    /// Defaults to the current wall-clock time in POSIX milliseconds
    #[serde(default)]
    pub timestamp: Option<i64>,
}

/// Request to approve (re-attest) a clinic
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApproveClinicRequest {
    pub clinic_id: String,
    pub acting_identity: String,
    pub timestamp: i64,
}

/// Request to revoke a clinic
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevokeClinicRequest {
    pub clinic_id: String,
    pub acting_identity: String,
    pub timestamp: i64,
}

/// Successful mutation response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TxResponse {
    pub tx_hash: String,
}

/// One clinic as seen in the live registry
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClinicStatusResponse {
    pub clinic_id: String,
    pub approved_by: String,
    pub approved_at: i64,
    pub revoked_at: Option<i64>,
    pub active: bool,
}

/// The decoded live registry
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryResponse {
    pub authority: String,
    pub total: usize,
    pub clinics: Vec<ClinicStatusResponse>,
}

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/registry", get(get_registry_handler))
        .route("/clinic/{clinic_id}", get(get_clinic_handler))
        .route("/register-clinic", post(register_clinic_handler))
        .route("/approve-clinic", post(approve_clinic_handler))
        .route("/revoke-clinic", post(revoke_clinic_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Register a new clinic
///
/// POST /register-clinic
async fn register_clinic_handler(
    State(state): State<AppState>,
    Json(req): Json<RegisterClinicRequest>,
) -> Result<Json<TxResponse>, ApiError> {
    let clinic = parse_clinic_id(&req.clinic_id)?;
    let acting = parse_identity(&req.acting_identity)?;
    let timestamp = req
        .timestamp
        .unwrap_or_else(|| chrono::Utc::now().timestamp_millis());

    info!("Registering clinic {}", clinic);

    let operation = Operation::Register { clinic, timestamp };
    let tx_hash = state.coordinator.execute(operation, acting).await?;

    Ok(Json(TxResponse {
        tx_hash: tx_hash.to_hex(),
    }))
}

/// Approve a registered clinic
///
/// POST /approve-clinic
async fn approve_clinic_handler(
    State(state): State<AppState>,
    Json(req): Json<ApproveClinicRequest>,
) -> Result<Json<TxResponse>, ApiError> {
    let clinic = parse_clinic_id(&req.clinic_id)?;
    let acting = parse_identity(&req.acting_identity)?;

    info!("Approving clinic {}", clinic);

    let operation = Operation::Approve {
        clinic,
        approver: acting.clone(),
        timestamp: req.timestamp,
    };
    let tx_hash = state.coordinator.execute(operation, acting).await?;

    Ok(Json(TxResponse {
        tx_hash: tx_hash.to_hex(),
    }))
}

/// Revoke a registered clinic
///
/// POST /revoke-clinic
async fn revoke_clinic_handler(
    State(state): State<AppState>,
    Json(req): Json<RevokeClinicRequest>,
) -> Result<Json<TxResponse>, ApiError> {
    let clinic = parse_clinic_id(&req.clinic_id)?;
    let acting = parse_identity(&req.acting_identity)?;

    info!("Revoking clinic {}", clinic);

    let operation = Operation::Revoke {
        clinic,
        revoker: acting.clone(),
        timestamp: req.timestamp,
    };
    let tx_hash = state.coordinator.execute(operation, acting).await?;

    Ok(Json(TxResponse {
        tx_hash: tx_hash.to_hex(),
    }))
}

/// Decode and return the live registry
///
/// GET /registry
async fn get_registry_handler(
    State(state): State<AppState>,
) -> Result<Json<RegistryResponse>, ApiError> {
    let utxo = state.coordinator.fetch_registry().await?;
    let registry = datum::decode(&utxo.datum).map_err(CoordinatorError::from)?;

    let clinics = registry
        .clinics
        .iter()
        .map(|(clinic, entry)| clinic_status(clinic, entry))
        .collect::<Vec<_>>();

    Ok(Json(RegistryResponse {
        authority: registry.authority.to_hex(),
        total: clinics.len(),
        clinics,
    }))
}

/// Look up one clinic in the live registry
///
/// GET /clinic/:clinic_id
async fn get_clinic_handler(
    State(state): State<AppState>,
    Path(clinic_id): Path<String>,
) -> Result<Json<ClinicStatusResponse>, ApiError> {
    let clinic = parse_clinic_id(&clinic_id)?;

    let utxo = state.coordinator.fetch_registry().await?;
    let registry = datum::decode(&utxo.datum).map_err(CoordinatorError::from)?;

    match registry.get(&clinic) {
        Some(entry) => Ok(Json(clinic_status(&clinic, entry))),
        None => Err(ApiError {
            status: StatusCode::NOT_FOUND,
            message: format!("Clinic not registered: {}", clinic),
        }),
    }
}

fn clinic_status(clinic: &ClinicId, entry: &ClinicEntry) -> ClinicStatusResponse {
    ClinicStatusResponse {
        clinic_id: clinic.to_hex(),
        approved_by: entry.approved_by.to_hex(),
        approved_at: entry.approved_at,
        revoked_at: entry.revoked_at,
        active: entry.is_active(),
    }
}

/// Parse a clinic id from hex
fn parse_clinic_id(hex: &str) -> Result<ClinicId, ApiError> {
    ClinicId::from_hex(hex).map_err(|e| ApiError {
        status: StatusCode::BAD_REQUEST,
        message: format!("Invalid clinic id: {}", e),
    })
}

/// Parse an identity key hash from hex
fn parse_identity(hex: &str) -> Result<KeyHash, ApiError> {
    KeyHash::from_hex(hex).map_err(|e| ApiError {
        status: StatusCode::BAD_REQUEST,
        message: format!("Invalid identity key hash: {}", e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use registry_engine::{ApplyError, AuthError};

    #[test]
    fn test_parse_clinic_id() {
        let hex = hex::encode(b"clinic-1");
        let result = parse_clinic_id(&hex);
        assert!(result.is_ok());
    }

    #[test]
    fn test_parse_clinic_id_invalid_hex() {
        let result = parse_clinic_id("zzzz");
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_parse_identity_wrong_length() {
        let result = parse_identity("0102030405");
        assert!(result.is_err());
    }

    #[test]
    fn test_error_status_mapping() {
        let not_found = ApiError::from(CoordinatorError::NoRegistryFound { found: 0 });
        assert_eq!(not_found.status, StatusCode::NOT_FOUND);

        let contention = ApiError::from(CoordinatorError::ContentionExhausted { attempts: 5 });
        assert_eq!(contention.status, StatusCode::CONFLICT);

        let clinic = ClinicId::new(b"clinic-1".to_vec()).unwrap();
        let rejected = ApiError::from(CoordinatorError::Apply(ApplyError::AlreadyExists(clinic)));
        assert_eq!(rejected.status, StatusCode::UNPROCESSABLE_ENTITY);

        let unauthorized = ApiError::from(CoordinatorError::Auth(AuthError::WrongAuthority {
            acting: KeyHash::new([0xbb; 28]),
        }));
        assert_eq!(unauthorized.status, StatusCode::UNPROCESSABLE_ENTITY);

        let infrastructure = ApiError::from(CoordinatorError::Network("boom".to_string()));
        assert_eq!(infrastructure.status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
