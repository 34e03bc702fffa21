use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::AppError;
use crate::matching::engine::MatchingEngine;
use crate::matching::extraction::{extract_pdf_text, validate_pdf_upload, ExtractionError};
use crate::matching::models::{MatchConfig, MatchConfigOverrides, MatchResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct MatchRequest {
    pub resume_text: String,
    pub job_description_text: String,
    #[serde(default)]
    pub config: Option<MatchConfigOverrides>,
}

#[derive(Debug, Deserialize)]
pub struct BatchMatchRequest {
    pub resume_text: String,
    pub job_descriptions: Vec<String>,
    #[serde(default)]
    pub config: Option<MatchConfigOverrides>,
}

#[derive(Debug, Serialize)]
pub struct BatchMatchResponse {
    pub results: Vec<MatchResult>,
    pub total: usize,
}

/// POST /api/v1/match
pub async fn handle_match(
    State(state): State<AppState>,
    Json(req): Json<MatchRequest>,
) -> Result<Json<MatchResult>, AppError> {
    let engine = engine_for(&state, req.config.as_ref())?;
    let result =
        run_blocking(move || engine.match_texts(&req.resume_text, &req.job_description_text))
            .await?;
    Ok(Json(result))
}

/// POST /api/v1/match/batch
pub async fn handle_batch_match(
    State(state): State<AppState>,
    Json(req): Json<BatchMatchRequest>,
) -> Result<Json<BatchMatchResponse>, AppError> {
    if req.job_descriptions.is_empty() {
        return Err(AppError::Validation(
            "job_descriptions must contain at least one entry".to_string(),
        ));
    }

    let engine = engine_for(&state, req.config.as_ref())?;
    let results =
        run_blocking(move || engine.batch_match(&req.resume_text, &req.job_descriptions)).await?;
    Ok(Json(BatchMatchResponse {
        total: results.len(),
        results,
    }))
}

/// POST /api/v1/match/upload
/// Multipart: `resume_file` (PDF) and `job_description_text`.
pub async fn handle_upload_match(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<MatchResult>, AppError> {
    let mut resume_pdf: Option<Vec<u8>> = None;
    let mut jd_text: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "resume_file" => {
                validate_pdf_upload(field.file_name(), field.content_type())
                    .map_err(|e| AppError::Validation(e.to_string()))?;
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(e.body_text()))?;
                resume_pdf = Some(bytes.to_vec());
            }
            "job_description_text" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(e.body_text()))?;
                jd_text = Some(text);
            }
            _ => {}
        }
    }

    let resume_pdf = resume_pdf
        .ok_or_else(|| AppError::Validation("Missing multipart field 'resume_file'".to_string()))?;
    let jd_text = jd_text.ok_or_else(|| {
        AppError::Validation("Missing multipart field 'job_description_text'".to_string())
    })?;

    let resume_text = run_blocking(move || extract_pdf_text(&resume_pdf))
        .await?
        .map_err(|e| match e {
            ExtractionError::Pdf(_) => AppError::UnprocessableEntity(e.to_string()),
            _ => AppError::Validation(e.to_string()),
        })?;
    info!(chars = resume_text.chars().count(), "resume extracted from upload");

    let engine = Arc::clone(&state.engine);
    let result = run_blocking(move || engine.match_texts(&resume_text, &jd_text)).await?;
    Ok(Json(result))
}

/// GET /api/v1/match/config
pub async fn handle_get_config(State(state): State<AppState>) -> Json<MatchConfig> {
    Json(state.engine.config().clone())
}

/// The process engine, or a validated one-off engine when the request overrides config.
fn engine_for(
    state: &AppState,
    overrides: Option<&MatchConfigOverrides>,
) -> Result<Arc<MatchingEngine>, AppError> {
    match overrides {
        Some(o) if !o.is_empty() => Ok(Arc::new(state.engine.with_overrides(o)?)),
        _ => Ok(Arc::clone(&state.engine)),
    }
}

/// Matching is CPU-bound; keep it off the async executor.
async fn run_blocking<T, F>(f: F) -> Result<T, AppError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("spawn_blocking failed in matching: {e}")))
}
