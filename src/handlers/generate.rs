use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use tracing::warn;

use crate::errors::ApiError;
use crate::pipeline::GenerationOutcome;
use crate::state::AppState;
use crate::utils::timing::start_request_timer;

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub prompt: Option<String>,
}

pub async fn generate_handler(
    State(state): State<AppState>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Json<GenerationOutcome>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        warn!("Rejected /generate body: {}", rejection.body_text());
        ApiError::Validation("Request body must be a JSON object with a 'prompt' field".to_string())
    })?;

    let prompt = request.prompt.unwrap_or_default();
    let mut timer = start_request_timer("/generate", Some(&prompt));

    match state.orchestrator.build_and_search(&prompt).await {
        Ok(outcome) => {
            timer.mark_status("success", Some(format!("images={}", outcome.images.len())));
            Ok(Json(outcome))
        }
        Err(err) => {
            timer.mark_status(err.kind(), Some(err.to_string()));
            Err(err)
        }
    }
}
