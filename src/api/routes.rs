//! API route handlers.
//!
//! All endpoints return JSON. State is the shared `Arc<ContestService>`.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, warn};

use crate::contest::{ContestService, Prediction};
use crate::error::ContestError;
use crate::types::{ContestEntry, NewEntry};

pub type AppState = Arc<ContestService>;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct PredictionRequest {
    pub actual_price: Decimal,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntriesQuery {
    /// Include winners as well as open entries.
    #[serde(default)]
    pub all: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WinnersQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CurrentWinnerResponse {
    pub winner: Option<ContestEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RemoveWinnerResponse {
    pub id: i64,
    pub changed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExpiryResponse {
    pub expired: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub retryable: bool,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Maps contest errors onto HTTP status codes.
#[derive(Debug)]
pub struct ApiError(ContestError);

impl From<ContestError> for ApiError {
    fn from(err: ContestError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            ContestError::NotFound(_) => StatusCode::NOT_FOUND,
            ContestError::DuplicateEntry(_) => StatusCode::CONFLICT,
            ContestError::InvalidEntry(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ContestError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
        };

        if status.is_server_error() {
            error!(error = %self.0, "Request failed");
        } else {
            warn!(error = %self.0, "Request rejected");
        }

        let body = ErrorResponse {
            error: self.0.to_string(),
            retryable: self.0.is_retryable(),
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// GET /health
pub async fn health() -> StatusCode {
    StatusCode::OK
}

/// POST /api/entries
pub async fn submit_entry(
    State(state): State<AppState>,
    Json(entry): Json<NewEntry>,
) -> ApiResult<(StatusCode, Json<ContestEntry>)> {
    let created = state.submit_entry(entry).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/entries?all=true
pub async fn get_entries(
    State(state): State<AppState>,
    Query(query): Query<EntriesQuery>,
) -> ApiResult<Json<Vec<ContestEntry>>> {
    let entries = if query.all {
        state.all_entries().await?
    } else {
        state.open_entries().await?
    };
    Ok(Json(entries))
}

/// GET /api/winners
pub async fn get_winners(
    State(state): State<AppState>,
    Query(query): Query<WinnersQuery>,
) -> ApiResult<Json<Vec<ContestEntry>>> {
    Ok(Json(state.recent_winners(query.limit).await?))
}

/// GET /api/winners/current
pub async fn get_current_winner(
    State(state): State<AppState>,
) -> ApiResult<Json<CurrentWinnerResponse>> {
    let winner = state.current_winner().await?;
    Ok(Json(CurrentWinnerResponse { winner }))
}

/// PUT /api/winners/:id
pub async fn set_winner(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<ContestEntry>> {
    Ok(Json(state.set_winner(id).await?))
}

/// DELETE /api/winners/:id
pub async fn remove_winner(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<RemoveWinnerResponse>> {
    let changed = state.remove_winner(id).await?;
    Ok(Json(RemoveWinnerResponse { id, changed }))
}

/// POST /api/predictions
pub async fn predict(
    State(state): State<AppState>,
    Json(req): Json<PredictionRequest>,
) -> ApiResult<Json<Prediction>> {
    Ok(Json(state.evaluate(req.actual_price).await?))
}

/// POST /api/expiry
pub async fn run_expiry(State(state): State<AppState>) -> ApiResult<Json<ExpiryResponse>> {
    let expired = state.run_expiry_sweep(Utc::now()).await?;
    Ok(Json(ExpiryResponse { expired }))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
