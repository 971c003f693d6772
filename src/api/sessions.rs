use crate::api::errors::ApiError;
use crate::api::AppState;
use crate::model::{self, RawSession};
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// Result of a batch submission: how many records arrived and how many
/// survived validation.
#[derive(Debug, serde::Serialize)]
pub struct SubmitResult {
    pub received: usize,
    pub accepted: usize,
}

/// POST /api/sessions — Submit a batch of raw session records.
///
/// Validation is best-effort: malformed sessions are dropped with a warning
/// and the rest of the batch is accepted, so one bad producer record never
/// rejects a whole upload. Only an oversized batch is refused outright.
pub async fn submit_sessions(
    State(state): State<Arc<AppState>>,
    Json(batch): Json<Vec<RawSession>>,
) -> Result<(StatusCode, Json<SubmitResult>), ApiError> {
    if batch.len() > state.batch_limit {
        return Err(ApiError::BadRequest(format!(
            "Batch of {} sessions exceeds the limit of {}",
            batch.len(),
            state.batch_limit
        )));
    }

    let received = batch.len();
    let sessions = model::normalize(batch);
    let accepted = sessions.len();

    state.store.append(sessions);
    state
        .sessions_submitted_total
        .fetch_add(accepted as u64, Ordering::Relaxed);
    tracing::debug!(received, accepted, "Session batch accepted");

    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitResult { received, accepted }),
    ))
}
