//! HTTP front end: a single `POST /predict` route backed by a shared
//! [`UrlClassifier`].

use crate::classifier::{Prediction, UrlClassifier};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;

pub const MISSING_URL: &str = "Missing URL";

#[derive(Clone)]
pub struct AppState {
    classifier: Arc<UrlClassifier>,
}

impl AppState {
    pub fn new(classifier: UrlClassifier) -> Self {
        Self {
            classifier: Arc::new(classifier),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PredictRequest {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            Self::BadRequest(error) => (StatusCode::BAD_REQUEST, error),
            Self::Internal(error) => (StatusCode::INTERNAL_SERVER_ERROR, error),
        };
        (status, Json(ErrorBody { error })).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/predict", post(predict))
        .with_state(state)
}

pub async fn predict(
    State(state): State<AppState>,
    body: Result<Json<PredictRequest>, JsonRejection>,
) -> Result<Json<Prediction>, ApiError> {
    let Json(request) = body.map_err(|rejection| {
        tracing::warn!("rejected predict body: {}", rejection.body_text());
        ApiError::BadRequest(rejection.body_text())
    })?;
    let url = match request.url {
        Some(url) if !url.is_empty() => url,
        _ => return Err(ApiError::BadRequest(MISSING_URL.to_string())),
    };

    let classifier = Arc::clone(&state.classifier);
    let prediction = tokio::task::spawn_blocking(move || classifier.predict(&url))
        .await
        .map_err(|err| {
            tracing::error!("inference task failed: {}", err);
            ApiError::Internal(err.to_string())
        })?
        .map_err(|err| {
            tracing::error!("inference failed: {}", err);
            ApiError::Internal(err.to_string())
        })?;

    tracing::info!(
        "predicted {} with confidence {:.4}",
        prediction.prediction,
        prediction.confidence
    );
    Ok(Json(prediction))
}

pub async fn serve(listener: TcpListener, state: AppState) -> std::io::Result<()> {
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
