//! HTTP request handlers and shared application state.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::response::Html;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

use super::errors::ApiError;
use crate::service::{
    NO_DOCUMENTS_ANSWER, NO_MATCH_ANSWER, QueryOutcome, ServiceContext, ServiceStatus,
};

/// Landing page served at `/`
pub const LANDING_PAGE: &str = "index.html";

/// Shared application state passed to every handler via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub context: Arc<ServiceContext>,
    pub static_dir: PathBuf,
}

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub question: String,
    /// Accepted for compatibility with older clients, not used
    #[serde(default)]
    pub mode: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryResponse {
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Squared L2 distance of the match; lower is more similar
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

impl From<QueryOutcome> for QueryResponse {
    fn from(outcome: QueryOutcome) -> Self {
        match outcome {
            QueryOutcome::Match {
                answer,
                source,
                score,
            } => Self {
                answer,
                source: Some(source),
                score: Some(score),
            },
            QueryOutcome::NoMatch => Self {
                answer: NO_MATCH_ANSWER.to_string(),
                source: None,
                score: None,
            },
            QueryOutcome::NoDocuments => Self {
                answer: NO_DOCUMENTS_ANSWER.to_string(),
                source: None,
                score: None,
            },
        }
    }
}

#[inline]
pub async fn query(
    State(state): State<AppState>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<QueryResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    if let Some(mode) = request.mode.as_deref() {
        debug!("Ignoring query mode {:?}", mode);
    }

    let outcome = state.context.query(&request.question).await?;
    Ok(Json(outcome.into()))
}

#[inline]
pub async fn landing_page(State(state): State<AppState>) -> Result<Html<String>, ApiError> {
    let path = state.static_dir.join(LANDING_PAGE);
    match tokio::fs::read_to_string(&path).await {
        Ok(html) => Ok(Html(html)),
        Err(e) => {
            warn!("Landing page {} unavailable: {}", path.display(), e);
            Err(ApiError::NotFound(format!(
                "Landing page not found: {}",
                path.display()
            )))
        }
    }
}

#[inline]
pub async fn health(State(state): State<AppState>) -> Json<ServiceStatus> {
    Json(state.context.status())
}
