//! HTTP surface
//!
//! # Routes
//!
//! - `GET /` - the feedback page
//! - `POST /translate` - `{text, language}` → `{translated_text}`
//! - `POST /analyze-feedback` - `{feedback}` → emotion, confidence, distribution and dominant words

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::service::{EmotionService, FeedbackAnalysis, ServiceError};
use crate::translate::Translator;

const INDEX_HTML: &str = include_str!("../../static/index.html");

/// Application state shared across handlers
pub struct AppState<T: Translator> {
    pub service: Arc<EmotionService>,
    pub translator: Arc<T>,
}

impl<T: Translator> AppState<T> {
    pub fn new(service: Arc<EmotionService>, translator: Arc<T>) -> Self {
        Self { service, translator }
    }
}

#[derive(Debug, Deserialize)]
pub struct TranslateRequest {
    #[serde(default)]
    pub text: String,
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_language() -> String {
    "en".to_string()
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TranslateResponse {
    pub translated_text: String,
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub feedback: String,
}

pub fn create_router<T: Translator>(state: Arc<AppState<T>>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/translate", post(translate::<T>))
        .route("/analyze-feedback", post(analyze_feedback::<T>))
        .with_state(state)
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn translate<T: Translator>(
    State(state): State<Arc<AppState<T>>>,
    payload: Result<Json<TranslateRequest>, JsonRejection>,
) -> Result<Json<TranslateResponse>, ServiceError> {
    let request = body_or(payload, "Invalid input")?;
    if request.text.is_empty() || request.language.is_empty() {
        return Err(ServiceError::Validation("Invalid input".into()));
    }
    let translated_text = state.translator.translate(&request.text, &request.language).await?;
    Ok(Json(TranslateResponse { translated_text }))
}

async fn analyze_feedback<T: Translator>(
    State(state): State<Arc<AppState<T>>>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<FeedbackAnalysis>, ServiceError> {
    let request = body_or(payload, "No feedback provided")?;
    let analysis = state.service.analyze(&request.feedback)?;
    info!(
        "Feedback classified as '{}' ({:.3})",
        analysis.feedback_type, analysis.emotion_score
    );
    Ok(Json(analysis))
}

/// Unreadable bodies are reported like empty ones.
fn body_or<R>(payload: Result<Json<R>, JsonRejection>, message: &str) -> Result<R, ServiceError> {
    match payload {
        Ok(Json(request)) => Ok(request),
        Err(rejection) => {
            debug!("Rejected request body: {}", rejection.body_text());
            Err(ServiceError::Validation(message.to_string()))
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
            ServiceError::Translate(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
