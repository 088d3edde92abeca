//! HTTP surface: `GET /` and `POST /ask`.

use crate::graph::GraphError;
use crate::planner::TravelPlanner;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub planner: Arc<TravelPlanner>,
}

impl AppState {
    pub fn new(planner: TravelPlanner) -> Self {
        Self {
            planner: Arc::new(planner),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AskRequest {
    pub user_question: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AskResponse {
    pub final_answer: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InfoResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Planner(#[from] GraphError),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Planner(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.status_code();
        tracing::error!(error = %self, status = code.as_u16(), "request failed");
        let body = ErrorBody {
            error: crate::logging::redact_secrets(&self.to_string()),
        };
        (code, Json(body)).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(info))
        .route("/ask", post(ask))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

async fn info() -> Json<InfoResponse> {
    Json(InfoResponse {
        message: "Roamer travel planner API is running. Use POST /ask to query.".to_string(),
    })
}

async fn ask(
    State(state): State<AppState>,
    Json(request): Json<AskRequest>,
) -> Result<Json<AskResponse>, ApiError> {
    let final_answer = state.planner.ask(&request.user_question).await?;
    Ok(Json(AskResponse { final_answer }))
}

pub async fn serve(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}
