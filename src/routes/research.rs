use axum::{Json, extract::State};

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::pipeline::normalize::ResearchReport;
use crate::pipeline::{ResearchConfig, research_report};

pub async fn create_research_report(
    State(state): State<AppState>,
    Json(mut config): Json<ResearchConfig>,
) -> AppResult<Json<ResearchReport>> {
    // Blank reference URLs are dropped rather than rejected.
    config.urls.retain(|url| !url.trim().is_empty());

    if config.regions.is_empty() {
        return Err(AppError::Validation("regions must not be empty".into()));
    }
    if config.industries.is_empty() {
        return Err(AppError::Validation("industries must not be empty".into()));
    }

    // Configuration failures are reported before any network attempt.
    if state.config.api_key.is_none() {
        return Err(AppError::MissingCredential);
    }

    let report = research_report(
        &state.llm_client,
        &state.config.model,
        state.config.thinking_budget,
        &config,
    )
    .await?;

    Ok(Json(report))
}
