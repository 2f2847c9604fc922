//! HTTP route handlers.

use axum::extract::multipart::{Multipart, MultipartRejection};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::Response;
use axum::Json;
use tracing::{debug, info, warn};

use crate::error::{PlantDocError, MISSING_UPLOAD_MESSAGE};
use crate::output::{AnalysisResult, ProbeResponse, ReportRequest};
use crate::pipeline::report::render_report;
use crate::pipeline::upload::receive_upload;
use crate::server::delivery::deliver;
use crate::server::AppState;

/// Health check endpoint.
pub async fn health() -> &'static str {
    "OK"
}

/// `GET /analyze`: liveness probe, touches nothing.
pub async fn probe() -> Json<ProbeResponse> {
    Json(ProbeResponse::default())
}

/// `POST /analyze`: store the photo, ask the model, echo the photo back.
///
/// The stored upload is deleted before the response goes out, whether the
/// model call succeeded or not.
pub async fn analyze(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<AnalysisResult>, PlantDocError> {
    let mut multipart = multipart.map_err(|e| {
        debug!("Rejected non-multipart upload: {}", e.body_text());
        PlantDocError::Validation(MISSING_UPLOAD_MESSAGE.to_string())
    })?;

    let upload = receive_upload(&mut multipart, &state.dirs.upload).await?;
    let encoded = upload.read_encoded().await?;

    let outcome = state.analyzer.analyze(&encoded).await;

    let shown = upload.path().display().to_string();
    if let Err(e) = upload.discard() {
        warn!("Failed to delete upload {}: {}", shown, e);
    }

    let result = outcome?;
    Ok(Json(AnalysisResult {
        result,
        image: encoded.data_uri(),
    }))
}

/// `POST /download`: render the analysis as a PDF and stream it back.
pub async fn download(
    State(state): State<AppState>,
    payload: Result<Json<ReportRequest>, JsonRejection>,
) -> Result<Response, PlantDocError> {
    let Json(request) =
        payload.map_err(|e| PlantDocError::InvalidReportRequest(e.body_text()))?;

    let report = render_report(&request, &state.dirs).await?;
    info!("Sending report as {}", report.download_name);
    deliver(report).await
}
