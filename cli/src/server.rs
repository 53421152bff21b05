//! HTTP upload service.
//!
//! `POST /upload-excel` takes a multipart form with one workbook file and
//! answers with `{"sheets": ...}`. Clients only ever see a generic error
//! message; the cause is logged.

use crate::config::ServerConfig;
use axum::{
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use hyper::Server;
use sheetjson::{process_upload, TempDirStaging, UploadResponse};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

/// Shared handler state.
#[derive(Clone)]
struct AppState {
    staging: Arc<TempDirStaging>,
}

/// Errors surfaced to upload clients.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request carried no file.
    #[error("No file uploaded")]
    MissingFile,

    /// Reading or normalizing the workbook failed; holds the logged cause.
    #[error("Excel processing failed")]
    Processing(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::MissingFile => StatusCode::BAD_REQUEST,
            ApiError::Processing(detail) => {
                error!(error = %detail, "Excel processing failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

/// Health check endpoint
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "sheetjson",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Workbook upload endpoint
async fn upload_excel(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    let bytes = read_upload(multipart).await?;

    let staging = state.staging.clone();
    let result = tokio::task::spawn_blocking(move || process_upload(staging.as_ref(), &bytes))
        .await
        .map_err(|e| ApiError::Processing(e.to_string()))?
        .map_err(|e| ApiError::Processing(e.to_string()))?;

    info!(sheets = result.len(), "Upload processed");
    Ok(Json(UploadResponse::from(&result)).into_response())
}

/// Take the first file field from the form.
async fn read_upload(
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Vec<u8>, ApiError> {
    let mut multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => {
            warn!(%rejection, "Upload is not a multipart form");
            return Err(ApiError::MissingFile);
        }
    };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Processing(e.to_string()))?
    {
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };

        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::Processing(e.to_string()))?;
        info!(file = %file_name, size = bytes.len(), "Received upload");
        return Ok(bytes.to_vec());
    }

    Err(ApiError::MissingFile)
}

/// Build the service router.
pub fn create_router(staging: TempDirStaging, body_limit: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/upload-excel", post(upload_excel))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .with_state(AppState {
            staging: Arc::new(staging),
        })
}

/// Run the upload service until Ctrl-C.
pub async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    let addr = config.addr()?;
    let staging = config.staging()?;
    info!(
        %addr,
        upload_dir = %staging.dir().display(),
        max_upload_mb = config.max_upload_mb,
        "Starting upload service"
    );

    let app = create_router(staging, config.body_limit());
    Server::try_bind(&addr)?
        .serve(app.into_make_service())
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Cannot listen for shutdown signal");
            }
        })
        .await?;

    info!("Upload service stopped");
    Ok(())
}
